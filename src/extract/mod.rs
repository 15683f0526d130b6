//! Drives extraction: evaluates every top-level container against each input
//! document and hands the resulting trees to an [`OutputSink`].

pub mod context;
pub mod records;

pub use context::{
    ContextId, ContextNode, ContextPayload, ExtractedField, ExtractionTree, RecordSet,
    evaluate_leaf,
};
pub use records::{Records, Row};

use crate::document::XmlDocument;
use crate::error::ExtractError;
use crate::model::MappingConfiguration;
use crate::output::OutputSink;
use log::{debug, error, info, warn};
use std::path::{Path, PathBuf};
use std::time::Instant;
use xml2csv_xpath1::DataSourceNode;

/// What happened to the files of one run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExtractionSummary {
    pub processed: usize,
    pub skipped: usize,
    pub failed: Vec<PathBuf>,
}

impl ExtractionSummary {
    pub fn total(&self) -> usize {
        self.processed + self.skipped + self.failed.len()
    }
}

/// Evaluates a [`MappingConfiguration`] against documents.
pub struct XmlDataExtractor<'c> {
    config: &'c MappingConfiguration,
    trim_whitespace: bool,
}

impl<'c> XmlDataExtractor<'c> {
    pub fn new(config: &'c MappingConfiguration) -> Self {
        Self {
            config,
            trim_whitespace: false,
        }
    }

    /// Trim leading and trailing whitespace from every extracted value.
    pub fn with_trim_whitespace(mut self, trim: bool) -> Self {
        self.trim_whitespace = trim;
        self
    }

    pub fn config(&self) -> &'c MappingConfiguration {
        self.config
    }

    /// Extracts every top-level container with `root` as the context node.
    ///
    /// A failing query aborts the document. A failing output is reported by the
    /// sink and skipped, the remaining containers are still written.
    pub fn extract_to<'a, N>(&self, root: N, sink: &mut dyn OutputSink) -> Result<(), ExtractError>
    where
        N: DataSourceNode<'a> + 'a,
    {
        let trees = self
            .config
            .containers()
            .iter()
            .map(|container| ExtractionTree::evaluate(container, root, self.trim_whitespace))
            .collect::<Result<Vec<_>, _>>()?;

        for tree in &trees {
            if let Err(e) = sink.write_tree(tree) {
                error!(
                    "Could not write '{}': {}",
                    tree.container().display_name(),
                    e
                );
            }
        }
        Ok(())
    }

    /// Extracts one file. Returns `Ok(false)` when an input filter skipped it.
    pub fn extract_file(&self, path: &Path, sink: &mut dyn OutputSink) -> Result<bool, ExtractError> {
        if !self.config.include_file(path) {
            debug!("Skipping {} (file name filter)", path.display());
            return Ok(false);
        }
        let text = std::fs::read_to_string(path).map_err(|source| ExtractError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let document = XmlDocument::parse(&text).map_err(|source| ExtractError::Document {
            path: path.to_path_buf(),
            source,
        })?;
        let root = document.root_node();
        if !self.config.include_document(root)? {
            debug!("Skipping {} (document filter)", path.display());
            return Ok(false);
        }
        self.extract_to(root, sink)?;
        Ok(true)
    }

    /// Extracts each file in turn. A file that fails is logged and recorded in
    /// the summary; the run carries on with the next one.
    pub fn extract_files<P: AsRef<Path>>(
        &self,
        paths: &[P],
        sink: &mut dyn OutputSink,
    ) -> ExtractionSummary {
        let start = Instant::now();
        let mut summary = ExtractionSummary::default();
        for path in paths.iter().map(AsRef::as_ref) {
            match self.extract_file(path, sink) {
                Ok(true) => {
                    info!("Processed {}", path.display());
                    summary.processed += 1;
                }
                Ok(false) => summary.skipped += 1,
                Err(e) => {
                    warn!("Failed to process {}: {}", path.display(), e);
                    summary.failed.push(path.to_path_buf());
                }
            }
        }
        info!(
            "Processed {} of {} files in {:.2?} ({} skipped, {} failed)",
            summary.processed,
            summary.total(),
            start.elapsed(),
            summary.skipped,
            summary.failed.len()
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{InputFilter, Mapping, MultiValueBehaviour};
    use crate::output::MemorySink;
    use crate::query::XPathQuery;
    use std::fs;

    const PEOPLE: &str = r#"<people>
        <person><name> Ada </name><tag>a</tag><tag>b</tag></person>
        <person><name>Linus</name></person>
    </people>"#;

    fn people_config() -> MappingConfiguration {
        let mut config = MappingConfiguration::new();
        config
            .add_container(
                Mapping::container()
                    .named("People")
                    .with_root("/people/person")
                    .with_child(Mapping::leaf("Name", "name"))
                    .with_child(Mapping::leaf("Tag", "tag").with_behaviour(MultiValueBehaviour::Greedy)),
            )
            .unwrap();
        config
    }

    #[test]
    fn test_extract_document() {
        let config = people_config();
        let document = XmlDocument::parse(PEOPLE).unwrap();
        let mut sink = MemorySink::new();
        XmlDataExtractor::new(&config)
            .with_trim_whitespace(true)
            .extract_to(document.root_node(), &mut sink)
            .unwrap();

        let output = sink.output("People").unwrap();
        assert_eq!(output.header, vec!["Name", "Tag", "Tag_2"]);
        assert_eq!(
            output.rows,
            vec![vec!["Ada", "a", "b"], vec!["Linus", "", ""]]
        );
    }

    #[test]
    fn test_untrimmed_values_are_kept() {
        let config = people_config();
        let document = XmlDocument::parse(PEOPLE).unwrap();
        let mut sink = MemorySink::new();
        XmlDataExtractor::new(&config)
            .extract_to(document.root_node(), &mut sink)
            .unwrap();
        assert_eq!(sink.output("People").unwrap().rows[0][0], " Ada ");
    }

    #[test]
    fn test_extract_files_reports_failures_and_skips() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.xml");
        let broken = dir.path().join("broken.xml");
        let ignored = dir.path().join("ignored.txt");
        fs::write(&good, PEOPLE).unwrap();
        fs::write(&broken, "<people><person>").unwrap();
        fs::write(&ignored, PEOPLE).unwrap();

        let mut config = people_config();
        config.add_filter(InputFilter::new().with_file_name(r"\.xml$").unwrap());
        let mut sink = MemorySink::new();
        let summary = XmlDataExtractor::new(&config).extract_files(
            &[good, broken.clone(), ignored, dir.path().join("missing.xml")],
            &mut sink,
        );

        assert_eq!(summary.processed, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.failed, vec![broken, dir.path().join("missing.xml")]);
        assert_eq!(sink.output("People").unwrap().rows.len(), 2);
    }

    #[test]
    fn test_document_filter_skips_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("people.xml");
        fs::write(&path, PEOPLE).unwrap();

        let mut config = people_config();
        let query = XPathQuery::compile("count(//person) > 5", config.namespaces()).unwrap();
        config.add_filter(InputFilter::new().with_document_query(query));
        let mut sink = MemorySink::new();
        let included = XmlDataExtractor::new(&config)
            .extract_file(&path, &mut sink)
            .unwrap();
        assert!(!included);
        assert!(sink.output("People").is_none());
    }
}
