//! Writing assembled rows to CSV files, one file per top-level container.
//!
//! Each output picks a strategy once, before any document is read:
//! - [`OutputStrategy::Direct`] streams rows under a header fixed by the first
//!   write. Used when every field yields a predictable number of columns.
//! - [`OutputStrategy::Inline`] spools rows and writes them at close under a
//!   header merged from every row. Used when inline fields make rows vary.

pub mod direct;
pub mod inline;
pub mod memory;

pub use direct::DirectCsvWriter;
pub use inline::InlineCsvWriter;
pub use memory::MemorySink;

use crate::error::OutputError;
use crate::extract::{ExtractionTree, Records, Row};
use crate::model::{FieldLayout, Mapping, MappingConfiguration, MappingKind, field_names};
use log::{error, info};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStrategy {
    Direct,
    Inline,
}

impl OutputStrategy {
    /// Inline if any leaf below `container` is inline or warn, Direct otherwise.
    pub fn select(container: &Mapping) -> Self {
        let inline = container.descendants().into_iter().any(|mapping| {
            matches!(mapping.kind(), MappingKind::Leaf { .. }) && mapping.behaviour().is_inline()
        });
        if inline {
            OutputStrategy::Inline
        } else {
            OutputStrategy::Direct
        }
    }
}

/// Receives the extraction tree of every top-level container for every document.
pub trait OutputSink {
    fn write_tree(&mut self, tree: &ExtractionTree<'_>) -> Result<(), OutputError>;
}

/// Persists the rows of one output.
pub trait RecordWriter {
    /// The layout rows for `container` should be assembled with.
    fn layout(&mut self, container: &Mapping) -> FieldLayout;

    fn write_records(
        &mut self,
        header: &[String],
        rows: &mut dyn Iterator<Item = Row>,
    ) -> Result<(), OutputError>;

    fn close(&mut self) -> Result<(), OutputError>;
}

/// Assembles `tree` under the writer's layout and hands the rows over.
pub fn write_tree_to(writer: &mut dyn RecordWriter, tree: &ExtractionTree<'_>) -> Result<(), OutputError> {
    let container = tree.container();
    let layout = writer.layout(container);
    let header = field_names(container, &layout);
    let mut rows = Records::new(tree, &layout);
    writer.write_records(&header, &mut rows)
}

/// The CSV file a top-level container is written to.
pub fn output_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{}.csv", name))
}

struct OutputSlot {
    strategy: OutputStrategy,
    writer: Box<dyn RecordWriter>,
    failed: bool,
}

/// Owns one writer per top-level container. A writer that fails is disabled;
/// the others keep working.
pub struct OutputManager {
    outputs: BTreeMap<String, OutputSlot>,
}

impl OutputManager {
    pub fn initialise(
        dir: &Path,
        config: &MappingConfiguration,
        append: bool,
    ) -> Result<Self, OutputError> {
        if !dir.is_dir() {
            return Err(OutputError::NotADirectory(dir.to_path_buf()));
        }
        let mut outputs = BTreeMap::new();
        for container in config.containers() {
            let name = container.name().unwrap_or_default().to_string();
            let path = output_path(dir, &name);
            let strategy = OutputStrategy::select(container);
            let writer: Box<dyn RecordWriter> = match strategy {
                OutputStrategy::Direct => Box::new(DirectCsvWriter::create(&path, append)?),
                OutputStrategy::Inline => Box::new(InlineCsvWriter::create(&path, append)?),
            };
            info!("Writing '{}' to {} using the {:?} strategy", name, path.display(), strategy);
            outputs.insert(
                name,
                OutputSlot {
                    strategy,
                    writer,
                    failed: false,
                },
            );
        }
        Ok(Self { outputs })
    }

    pub fn strategy(&self, name: &str) -> Option<OutputStrategy> {
        self.outputs.get(name).map(|slot| slot.strategy)
    }

    pub fn is_disabled(&self, name: &str) -> bool {
        self.outputs.get(name).is_some_and(|slot| slot.failed)
    }

    /// Closes every working writer and reports the first failure.
    pub fn close(&mut self) -> Result<(), OutputError> {
        let mut first_failure = None;
        for (name, slot) in self.outputs.iter_mut().filter(|(_, slot)| !slot.failed) {
            match slot.writer.close() {
                Ok(()) => info!("Closed output '{}'", name),
                Err(e) => {
                    error!("Failed to close output '{}': {}", name, e);
                    slot.failed = true;
                    first_failure.get_or_insert(e);
                }
            }
        }
        first_failure.map_or(Ok(()), Err)
    }
}

impl OutputSink for OutputManager {
    fn write_tree(&mut self, tree: &ExtractionTree<'_>) -> Result<(), OutputError> {
        let name = tree.container().name().unwrap_or_default();
        let slot = self
            .outputs
            .get_mut(name)
            .ok_or_else(|| OutputError::UnknownOutput(name.to_string()))?;
        if slot.failed {
            return Err(OutputError::Disabled(name.to_string()));
        }
        write_tree_to(slot.writer.as_mut(), tree).inspect_err(|e| {
            error!("Disabling output '{}': {}", name, e);
            slot.failed = true;
        })
    }
}
