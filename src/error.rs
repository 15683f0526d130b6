// src/error.rs
use std::path::PathBuf;
use thiserror::Error;
use xml2csv_xpath1::XPathError;

/// Problems in the mapping configuration. All of them are reported before any
/// document is processed.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("A mapping list named '{0}' already exists")]
    DuplicateName(String),

    #[error("Top-level mapping lists must have a non-empty name")]
    MissingName,

    #[error("Namespace prefix '{prefix}' is bound to '{existing}', cannot rebind it to '{uri}'")]
    NamespaceConflict {
        prefix: String,
        existing: String,
        uri: String,
    },

    #[error("Invalid XPath '{expression}' in '{mapping}': {source}")]
    InvalidXPath {
        mapping: String,
        expression: String,
        #[source]
        source: XPathError,
    },

    #[error("Mapping '{name}' has maxValueCount {max} below minValueCount {min}")]
    InvalidValueCounts { name: String, min: usize, max: usize },

    #[error("Unknown multi-value behaviour '{0}'")]
    UnknownBehaviour(String),

    #[error("Unknown name format '{0}'")]
    UnknownNameFormat(String),

    #[error("Invalid file name filter '{pattern}': {source}")]
    InvalidFileFilter {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Configuration XML could not be parsed: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures while extracting one document. They abort that document only.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Query '{expression}' of mapping '{mapping}' failed: {source}")]
    Query {
        mapping: String,
        expression: String,
        #[source]
        source: XPathError,
    },

    #[error("Document {path} could not be parsed: {source}")]
    Document {
        path: PathBuf,
        #[source]
        source: roxmltree::Error,
    },

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures of a single output. The output is disabled, the others carry on.
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Output directory {0} does not exist")]
    DirectoryMissing(PathBuf),

    #[error("Output path {0} is not a directory")]
    NotADirectory(PathBuf),

    #[error("Output directory {0} is not writable")]
    NotWritable(PathBuf),

    #[error("No output is configured for '{0}'")]
    UnknownOutput(String),

    #[error("Output '{0}' was disabled after an earlier failure")]
    Disabled(String),
}

/// A comprehensive error type for a whole extraction run.
#[derive(Error, Debug)]
pub enum Xml2CsvError {
    #[error("Configuration failed: {0}")]
    Config(#[from] ConfigError),

    #[error("Extraction failed: {0}")]
    Extract(#[from] ExtractError),

    #[error("Output failed: {0}")]
    Output(#[from] OutputError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
