use super::RecordWriter;
use crate::error::OutputError;
use crate::extract::Row;
use crate::model::{FieldLayout, Mapping};
use log::debug;
use std::collections::HashMap;
use std::fs::File;
use std::io::{Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Collects rows whose columns are only known once every document has been
/// read. Rows are spooled to a temporary file as name/value pairs; `close`
/// merges their headers and writes the aligned CSV.
///
/// A name repeated within one row is a separate column per occurrence.
pub struct InlineCsvWriter {
    path: PathBuf,
    spool: Option<csv::Writer<File>>,
    columns: Vec<String>,
    index: HashMap<(String, usize), usize>,
    rows: usize,
}

impl InlineCsvWriter {
    /// Prepares to write `path`. With `append`, the rows already in the file are
    /// spooled first so they survive the rewrite at close.
    pub fn create(path: &Path, append: bool) -> Result<Self, OutputError> {
        let spool = csv::WriterBuilder::new()
            .flexible(true)
            .from_writer(tempfile::tempfile()?);
        let mut writer = Self {
            path: path.to_path_buf(),
            spool: Some(spool),
            columns: Vec::new(),
            index: HashMap::new(),
            rows: 0,
        };
        if append && path.is_file() {
            writer.load_existing()?;
        }
        Ok(writer)
    }

    fn load_existing(&mut self) -> Result<(), OutputError> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&self.path)?;
        let header: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        self.merge_header(&header);
        let mut loaded = 0;
        for record in reader.records() {
            let record = record?;
            self.spool_row(header.iter().map(String::as_str).zip(record.iter()))?;
            loaded += 1;
        }
        debug!("Kept {} existing rows of {}", loaded, self.path.display());
        Ok(())
    }

    fn merge_header<S: AsRef<str>>(&mut self, names: &[S]) {
        let mut seen: HashMap<&str, usize> = HashMap::new();
        for name in names {
            let name = name.as_ref();
            let occurrence = seen.entry(name).or_default();
            self.column(name, *occurrence);
            *occurrence += 1;
        }
    }

    fn column(&mut self, name: &str, occurrence: usize) -> usize {
        let next = self.columns.len();
        let position = *self
            .index
            .entry((name.to_string(), occurrence))
            .or_insert(next);
        if position == next {
            self.columns.push(name.to_string());
        }
        position
    }

    fn spool_row<'r>(&mut self, pairs: impl Iterator<Item = (&'r str, &'r str)>) -> Result<(), OutputError> {
        let mut seen: HashMap<&str, usize> = HashMap::new();
        let mut flat = Vec::new();
        for (name, value) in pairs {
            let occurrence = seen.entry(name).or_default();
            self.column(name, *occurrence);
            *occurrence += 1;
            flat.push(name);
            flat.push(value);
        }
        if let Some(spool) = self.spool.as_mut() {
            spool.write_record(&flat)?;
            self.rows += 1;
        }
        Ok(())
    }
}

impl RecordWriter for InlineCsvWriter {
    fn layout(&mut self, container: &Mapping) -> FieldLayout {
        FieldLayout::resolve(container)
    }

    fn write_records(
        &mut self,
        header: &[String],
        rows: &mut dyn Iterator<Item = Row>,
    ) -> Result<(), OutputError> {
        self.merge_header(header);
        for row in rows {
            self.spool_row(row.iter().map(|(name, value)| (name.as_str(), value.as_str())))?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), OutputError> {
        let Some(spool) = self.spool.take() else {
            return Ok(());
        };
        let mut file = spool.into_inner().map_err(|e| e.into_error())?;
        file.seek(SeekFrom::Start(0))?;

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(file);
        let mut out = csv::Writer::from_path(&self.path)?;
        if !self.columns.is_empty() {
            out.write_record(&self.columns)?;
        }
        for record in reader.records() {
            let record = record?;
            let mut values = vec![""; self.columns.len()];
            let mut seen: HashMap<&str, usize> = HashMap::new();
            for pair in record.iter().collect::<Vec<_>>().chunks(2) {
                let &[name, value] = pair else { continue };
                let occurrence = seen.entry(name).or_default();
                if let Some(&position) = self.index.get(&(name.to_string(), *occurrence)) {
                    values[position] = value;
                }
                *occurrence += 1;
            }
            if !values.is_empty() {
                out.write_record(&values)?;
            }
        }
        out.flush()?;
        debug!(
            "Wrote {} rows with {} columns to {}",
            self.rows,
            self.columns.len(),
            self.path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn pairs(values: &[(&str, &str)]) -> Row {
        values
            .iter()
            .map(|(n, v)| (n.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_headers_are_merged_at_close() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let mut writer = InlineCsvWriter::create(&path, false).unwrap();

        writer
            .write_records(
                &["Id".to_string(), "Note".to_string()],
                &mut vec![pairs(&[("Id", "1"), ("Note", "a")])].into_iter(),
            )
            .unwrap();
        writer
            .write_records(
                &["Id".to_string(), "Extra".to_string()],
                &mut vec![pairs(&[("Id", "2"), ("Extra", "x")])].into_iter(),
            )
            .unwrap();
        assert!(!path.exists() || fs::read_to_string(&path).unwrap().is_empty());
        writer.close().unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "Id,Note,Extra\n1,a,\n2,,x\n"
        );
    }

    #[test]
    fn test_repeated_names_get_their_own_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let mut writer = InlineCsvWriter::create(&path, false).unwrap();
        writer
            .write_records(
                &["V".to_string()],
                &mut vec![pairs(&[("V", "1"), ("V", "2")]), pairs(&[("V", "3")])].into_iter(),
            )
            .unwrap();
        writer.close().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "V,V\n1,2\n3,\n");
    }

    #[test]
    fn test_append_keeps_existing_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        fs::write(&path, "Id,Old\n0,kept\n").unwrap();

        let mut writer = InlineCsvWriter::create(&path, true).unwrap();
        writer
            .write_records(&["Id".to_string()], &mut vec![pairs(&[("Id", "1")])].into_iter())
            .unwrap();
        writer.close().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "Id,Old\n0,kept\n1,\n");
    }

    #[test]
    fn test_close_twice_is_harmless() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let mut writer = InlineCsvWriter::create(&path, false).unwrap();
        writer.close().unwrap();
        writer.close().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }
}
