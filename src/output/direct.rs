use super::RecordWriter;
use crate::error::OutputError;
use crate::extract::Row;
use crate::model::{FieldLayout, Mapping};
use log::debug;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// Streams rows straight to the CSV file.
///
/// The column layout is re-resolved for every document until one of them
/// yields a row. That layout is then kept for the rest of the run, so every row
/// lines up with the header.
pub struct DirectCsvWriter {
    path: PathBuf,
    writer: csv::Writer<File>,
    layout: Option<FieldLayout>,
    candidate: Option<FieldLayout>,
    header_pending: bool,
    pending_header: Vec<String>,
}

impl DirectCsvWriter {
    /// Opens `path` for writing. With `append`, existing content is kept and no
    /// second header is written when the file is not empty.
    pub fn create(path: &Path, append: bool) -> Result<Self, OutputError> {
        let file = if append {
            OpenOptions::new().create(true).append(true).open(path)?
        } else {
            File::create(path)?
        };
        let has_content = append && file.metadata()?.len() > 0;
        Ok(Self {
            path: path.to_path_buf(),
            writer: csv::WriterBuilder::new().from_writer(file),
            layout: None,
            candidate: None,
            header_pending: !has_content,
            pending_header: Vec::new(),
        })
    }

    fn write_header(&mut self, header: &[String]) -> Result<(), OutputError> {
        if self.header_pending {
            if !header.is_empty() {
                self.writer.write_record(header)?;
            }
            self.header_pending = false;
        }
        Ok(())
    }
}

impl RecordWriter for DirectCsvWriter {
    fn layout(&mut self, container: &Mapping) -> FieldLayout {
        if let Some(layout) = &self.layout {
            return layout.clone();
        }
        let layout = FieldLayout::resolve(container);
        self.candidate = Some(layout.clone());
        layout
    }

    fn write_records(
        &mut self,
        header: &[String],
        rows: &mut dyn Iterator<Item = Row>,
    ) -> Result<(), OutputError> {
        let mut rows = rows.filter(|row| !row.is_empty()).peekable();
        if self.layout.is_none() {
            if rows.peek().is_none() {
                // Nothing to freeze yet; keep the header in case no rows ever come.
                self.pending_header = header.to_vec();
                return Ok(());
            }
            self.layout = self.candidate.take();
            self.pending_header.clear();
        }
        self.write_header(header)?;

        let mut written = 0;
        for row in rows {
            self.writer.write_record(row.iter().map(|(_, value)| value.as_str()))?;
            written += 1;
        }
        debug!("Wrote {} rows to {}", written, self.path.display());
        Ok(())
    }

    fn close(&mut self) -> Result<(), OutputError> {
        let header = std::mem::take(&mut self.pending_header);
        self.write_header(&header)?;
        self.writer.flush()?;
        Ok(())
    }
}
