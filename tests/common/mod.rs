pub mod fixtures;

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use xml2csv::{
    ExtractionSummary, MappingConfiguration, MemorySink, OutputManager, XmlDataExtractor,
    XmlDocument, config,
};

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

/// A scratch workspace with an `in/` directory of documents and an `out/`
/// directory for the CSV files.
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> std::io::Result<Self> {
        let dir = tempfile::tempdir()?;
        fs::create_dir(dir.path().join("in"))?;
        fs::create_dir(dir.path().join("out"))?;
        Ok(Self { dir })
    }

    pub fn input_dir(&self) -> PathBuf {
        self.dir.path().join("in")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.dir.path().join("out")
    }

    /// Writes a document into `in/` and returns its path.
    pub fn add_document(&self, name: &str, xml: &str) -> std::io::Result<PathBuf> {
        let path = self.input_dir().join(name);
        fs::write(&path, xml)?;
        Ok(path)
    }

    /// Loads `config_xml` and runs it over `inputs`, writing into `out/`.
    pub fn run(
        &self,
        config_xml: &str,
        inputs: &[PathBuf],
        append: bool,
    ) -> Result<ExtractionSummary, Box<dyn std::error::Error>> {
        let config = config::load_str(config_xml)?;
        let mut outputs = OutputManager::initialise(&self.output_dir(), &config, append)?;
        let summary = XmlDataExtractor::new(&config)
            .with_trim_whitespace(true)
            .extract_files(inputs, &mut outputs);
        outputs.close()?;
        Ok(summary)
    }

    pub fn output(&self, name: &str) -> PathBuf {
        self.output_dir().join(format!("{}.csv", name))
    }

    pub fn read_output(&self, name: &str) -> Result<Vec<Vec<String>>, Box<dyn std::error::Error>> {
        read_csv(&self.output(name))
    }
}

/// Every record of a CSV file, header included.
pub fn read_csv(path: &Path) -> Result<Vec<Vec<String>>, Box<dyn std::error::Error>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;
    let mut records = Vec::new();
    for record in reader.records() {
        records.push(record?.iter().map(str::to_string).collect());
    }
    Ok(records)
}

/// Runs a configuration over an in-memory document without touching the disk.
pub fn extract_in_memory(config: &MappingConfiguration, xml: &str) -> Result<MemorySink, Box<dyn std::error::Error>> {
    let document = XmlDocument::parse(xml)?;
    let mut sink = MemorySink::new();
    XmlDataExtractor::new(config)
        .with_trim_whitespace(true)
        .extract_to(document.root_node(), &mut sink)?;
    Ok(sink)
}

/// Builds a row from string literals for comparisons.
pub fn row(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}
