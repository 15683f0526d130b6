//! Extracts tabular data from XML documents into CSV files.
//!
//! A [`MappingConfiguration`] names one output per top-level container and
//! describes, with XPath 1.0 queries, which values fill each column. The
//! [`XmlDataExtractor`] evaluates it against every document and hands the
//! results to an [`OutputSink`], normally an [`OutputManager`] writing one CSV
//! file per output.

pub mod config;
pub mod document;
pub mod error;
pub mod extract;
pub mod files;
pub mod model;
pub mod output;
pub mod query;

pub use document::{XmlDocument, XmlNode};
pub use error::{ConfigError, ExtractError, OutputError, Xml2CsvError};
pub use extract::{ExtractionSummary, ExtractionTree, Records, Row, XmlDataExtractor};
pub use model::{
    FieldLayout, InputFilter, Mapping, MappingConfiguration, MappingId, MappingKind,
    MultiValueBehaviour, NameFormat,
};
pub use output::{MemorySink, OutputManager, OutputSink, OutputStrategy, RecordWriter};
pub use query::{NamespaceMap, XPathQuery};
