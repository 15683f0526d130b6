use super::OutputSink;
use crate::error::OutputError;
use crate::extract::{ExtractionTree, Records};
use crate::model::{FieldLayout, field_names};
use std::collections::BTreeMap;

/// Everything written to one output of a [`MemorySink`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CollectedOutput {
    /// The header of the most recent write.
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Keeps rows in memory instead of writing files. The layout is resolved
/// again for every tree, so widths follow the counts observed so far.
#[derive(Debug, Default)]
pub struct MemorySink {
    outputs: BTreeMap<String, CollectedOutput>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn output(&self, name: &str) -> Option<&CollectedOutput> {
        self.outputs.get(name)
    }

    pub fn outputs(&self) -> &BTreeMap<String, CollectedOutput> {
        &self.outputs
    }
}

impl OutputSink for MemorySink {
    fn write_tree(&mut self, tree: &ExtractionTree<'_>) -> Result<(), OutputError> {
        let container = tree.container();
        let layout = FieldLayout::resolve(container);
        let output = self
            .outputs
            .entry(container.name().unwrap_or_default().to_string())
            .or_default();
        output.header = field_names(container, &layout);
        output.rows.extend(
            Records::new(tree, &layout).map(|row| row.into_iter().map(|(_, value)| value).collect()),
        );
        Ok(())
    }
}
