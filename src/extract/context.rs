//! The extraction context tree: the results of evaluating one top-level
//! container against one document.
//!
//! Contexts live in a flat arena and refer to each other by [`ContextId`].
//! The tree mirrors the mapping tree, except that a container context holds one
//! list of child contexts per matched root (an *iteration*).

use crate::error::ExtractError;
use crate::model::{Mapping, MappingId, MappingKind, MultiValueBehaviour};
use crate::query::QueryItem;
use itertools::Itertools;
use log::{debug, info, trace, warn};
use std::fmt;
use xml2csv_xpath1::DataSourceNode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(pub usize);

/// One extracted value and the iteration path that produced it, e.g. `0_2_1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedField {
    pub position: String,
    pub value: String,
}

/// The result of one leaf evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSet {
    pub mapping: MappingId,
    pub fields: Vec<ExtractedField>,
}

#[derive(Debug)]
pub enum ContextPayload {
    Leaf(Vec<ExtractedField>),
    Container { iterations: Vec<Vec<ContextId>> },
}

#[derive(Debug)]
pub struct ContextNode<'m> {
    pub mapping: &'m Mapping,
    pub parent: Option<ContextId>,
    /// Position among the children of the parent iteration.
    pub index: usize,
    /// Index of the parent iteration this context belongs to.
    pub parent_iteration: usize,
    pub payload: ContextPayload,
}

#[derive(Debug)]
pub struct ExtractionTree<'m> {
    nodes: Vec<ContextNode<'m>>,
}

impl<'m> ExtractionTree<'m> {
    /// Evaluates `container` with `context` as its context node.
    pub fn evaluate<'a, N>(
        container: &'m Mapping,
        context: N,
        trim_whitespace: bool,
    ) -> Result<Self, ExtractError>
    where
        N: DataSourceNode<'a> + 'a,
    {
        let mut builder = TreeBuilder {
            nodes: Vec::new(),
            trim_whitespace,
        };
        builder.evaluate(container, context, None, 0, 0, &[])?;
        let tree = ExtractionTree {
            nodes: builder.nodes,
        };
        trace!("Extraction tree for '{}':\n{}", container.display_name(), tree);
        Ok(tree)
    }

    pub fn root(&self) -> ContextId {
        ContextId(0)
    }

    /// The top-level container this tree was evaluated for.
    pub fn container(&self) -> &'m Mapping {
        self.nodes[0].mapping
    }

    pub fn node(&self, id: ContextId) -> &ContextNode<'m> {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The iterations of a container context. Empty for leaves.
    pub fn iterations(&self, id: ContextId) -> &[Vec<ContextId>] {
        match &self.node(id).payload {
            ContextPayload::Container { iterations } => iterations,
            ContextPayload::Leaf(_) => &[],
        }
    }

    /// The values of a leaf context. Empty for containers.
    pub fn fields(&self, id: ContextId) -> &[ExtractedField] {
        match &self.node(id).payload {
            ContextPayload::Leaf(fields) => fields,
            ContextPayload::Container { .. } => &[],
        }
    }

    fn fmt_node(&self, f: &mut fmt::Formatter<'_>, id: ContextId, depth: usize) -> fmt::Result {
        let node = self.node(id);
        let indent = "  ".repeat(depth);
        match &node.payload {
            ContextPayload::Leaf(fields) => writeln!(
                f,
                "{}{} = [{}]",
                indent,
                node.mapping.display_name(),
                fields
                    .iter()
                    .map(|field| format!("{}:{}", field.position, field.value))
                    .join(", ")
            ),
            ContextPayload::Container { iterations } => {
                writeln!(
                    f,
                    "{}{} ({} iterations)",
                    indent,
                    node.mapping.display_name(),
                    iterations.len()
                )?;
                for children in iterations {
                    for child in children {
                        self.fmt_node(f, *child, depth + 1)?;
                    }
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for ExtractionTree<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_node(f, self.root(), 0)
    }
}

struct TreeBuilder<'m> {
    nodes: Vec<ContextNode<'m>>,
    trim_whitespace: bool,
}

impl<'m> TreeBuilder<'m> {
    fn evaluate<'a, N>(
        &mut self,
        mapping: &'m Mapping,
        context: N,
        parent: Option<ContextId>,
        index: usize,
        parent_iteration: usize,
        path: &[usize],
    ) -> Result<ContextId, ExtractError>
    where
        N: DataSourceNode<'a> + 'a,
    {
        let id = ContextId(self.nodes.len());
        let payload = match mapping.kind() {
            MappingKind::Leaf { .. } => ContextPayload::Leaf(vec![]),
            MappingKind::Container { .. } => ContextPayload::Container { iterations: vec![] },
        };
        self.nodes.push(ContextNode {
            mapping,
            parent,
            index,
            parent_iteration,
            payload,
        });

        match mapping.kind() {
            MappingKind::Leaf { .. } => {
                let record_set = evaluate_leaf(mapping, Some(context), path, self.trim_whitespace)?;
                self.nodes[id.0].payload = ContextPayload::Leaf(record_set.fields);
            }
            MappingKind::Container { children } => {
                let roots = container_roots(mapping, context)?;
                debug!(
                    "Container '{}' matched {} root(s)",
                    mapping.display_name(),
                    roots.len()
                );
                let mut iterations = Vec::with_capacity(roots.len());
                for (iteration, root) in roots.into_iter().enumerate() {
                    let mut child_path = path.to_vec();
                    child_path.push(iteration);
                    let mut child_ids = Vec::with_capacity(children.len());
                    for (child_index, child) in children.iter().enumerate() {
                        child_ids.push(self.evaluate(
                            child,
                            root,
                            Some(id),
                            child_index,
                            iteration,
                            &child_path,
                        )?);
                    }
                    iterations.push(child_ids);
                }
                mapping.counter().observe(iterations.len());
                self.nodes[id.0].payload = ContextPayload::Container { iterations };
            }
        }
        Ok(id)
    }
}

/// The nodes a container iterates over: the matches of its root query, or the
/// context node itself when it has none.
fn container_roots<'a, N>(mapping: &Mapping, context: N) -> Result<Vec<N>, ExtractError>
where
    N: DataSourceNode<'a> + 'a,
{
    let Some(query) = mapping.query() else {
        return Ok(vec![context]);
    };
    let items = query.select(context).map_err(|source| ExtractError::Query {
        mapping: mapping.display_name().to_string(),
        expression: query.source().to_string(),
        source,
    })?;
    Ok(items
        .into_iter()
        .filter_map(|item| match item {
            QueryItem::Node(node) => Some(node),
            QueryItem::Value(value) => {
                warn!(
                    "Root query '{}' of '{}' returned the value '{}' instead of a node, skipping it",
                    query,
                    mapping.display_name(),
                    value
                );
                None
            }
        })
        .collect())
}

/// Evaluates a leaf mapping against `context`, which may be absent.
///
/// `path` holds the container iteration indices leading to this leaf; each
/// value's position appends its own index to it.
pub fn evaluate_leaf<'a, N>(
    mapping: &Mapping,
    context: Option<N>,
    path: &[usize],
    trim_whitespace: bool,
) -> Result<RecordSet, ExtractError>
where
    N: DataSourceNode<'a> + 'a,
{
    let mut values = Vec::new();
    if let (Some(context), Some(query)) = (context, mapping.query()) {
        let items = query.select(context).map_err(|source| ExtractError::Query {
            mapping: mapping.display_name().to_string(),
            expression: query.source().to_string(),
            source,
        })?;
        let max = mapping.max_value_count();
        let found = items.len();
        for item in items.iter().take(if max > 0 { max } else { found }) {
            let value = item.string_value();
            let value = if trim_whitespace {
                value.trim().to_string()
            } else {
                value
            };
            trace!("{} <- '{}'", mapping.display_name(), value);
            values.push(value);
        }
        if found > values.len() {
            warn!(
                "'{}' found {} values, discarding all beyond maxValueCount {}",
                mapping.display_name(),
                found,
                max
            );
        }
    }

    if mapping.behaviour() == MultiValueBehaviour::Warn && values.len() > 1 {
        warn!(
            "'{}' found {} values where one was expected",
            mapping.display_name(),
            values.len()
        );
    }
    mapping.counter().observe(values.len());
    if values.len() < mapping.min_value_count() {
        info!(
            "'{}' found {} of at least {} values, padding with empty fields",
            mapping.display_name(),
            values.len(),
            mapping.min_value_count()
        );
    }

    let prefix = path.iter().join("_");
    let fields = values
        .into_iter()
        .enumerate()
        .map(|(i, value)| ExtractedField {
            position: if prefix.is_empty() {
                i.to_string()
            } else {
                format!("{}_{}", prefix, i)
            },
            value,
        })
        .collect();
    Ok(RecordSet {
        mapping: mapping.id(),
        fields,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::XmlDocument;
    use crate::document::XmlNode;
    use crate::model::MappingConfiguration;

    const LIBRARY: &str = r#"<Library>
        <Book><Title> Dune </Title><Author>Herbert</Author></Book>
        <Book><Title>Emma</Title><Author>Austen</Author><Author>Anon</Author></Book>
    </Library>"#;

    fn library_config() -> MappingConfiguration {
        let mut config = MappingConfiguration::new();
        config
            .add_container(
                Mapping::container()
                    .named("Books")
                    .with_root("/Library/Book")
                    .with_child(Mapping::leaf("Title", "Title"))
                    .with_child(
                        Mapping::leaf("Author", "Author")
                            .with_behaviour(MultiValueBehaviour::Greedy),
                    ),
            )
            .unwrap();
        config
    }

    #[test]
    fn test_tree_mirrors_iterations() {
        let config = library_config();
        let doc = XmlDocument::parse(LIBRARY).unwrap();
        let tree = ExtractionTree::evaluate(&config.containers()[0], doc.root_node(), false).unwrap();

        let iterations = tree.iterations(tree.root());
        assert_eq!(iterations.len(), 2);
        let authors = iterations[1][1];
        assert_eq!(tree.node(authors).parent, Some(tree.root()));
        assert_eq!(tree.node(authors).index, 1);
        assert_eq!(tree.node(authors).parent_iteration, 1);
        assert_eq!(
            tree.fields(authors),
            &[
                ExtractedField {
                    position: "1_0".into(),
                    value: "Austen".into()
                },
                ExtractedField {
                    position: "1_1".into(),
                    value: "Anon".into()
                },
            ]
        );
        assert_eq!(config.containers()[0].counter().highest(), 2);
        assert_eq!(config.containers()[0].children()[1].counter().highest(), 2);
    }

    #[test]
    fn test_trim_whitespace() {
        let config = library_config();
        let doc = XmlDocument::parse(LIBRARY).unwrap();
        let container = &config.containers()[0];

        let raw = ExtractionTree::evaluate(container, doc.root_node(), false).unwrap();
        let first_title = raw.iterations(raw.root())[0][0];
        assert_eq!(raw.fields(first_title)[0].value, " Dune ");

        let trimmed = ExtractionTree::evaluate(container, doc.root_node(), true).unwrap();
        let first_title = trimmed.iterations(trimmed.root())[0][0];
        assert_eq!(trimmed.fields(first_title)[0].value, "Dune");
    }

    #[test]
    fn test_zero_roots_means_zero_iterations() {
        let mut config = MappingConfiguration::new();
        config
            .add_container(
                Mapping::container()
                    .named("Missing")
                    .with_root("/Library/Magazine")
                    .with_child(Mapping::leaf("Title", "Title")),
            )
            .unwrap();
        let doc = XmlDocument::parse(LIBRARY).unwrap();
        let tree = ExtractionTree::evaluate(&config.containers()[0], doc.root_node(), false).unwrap();
        assert!(tree.iterations(tree.root()).is_empty());
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_scalar_roots_are_skipped() {
        let mut config = MappingConfiguration::new();
        config
            .add_container(
                Mapping::container()
                    .named("Counts")
                    .with_root("count(//Book)")
                    .with_child(Mapping::leaf("Title", "Title")),
            )
            .unwrap();
        let doc = XmlDocument::parse(LIBRARY).unwrap();
        let tree = ExtractionTree::evaluate(&config.containers()[0], doc.root_node(), false).unwrap();
        assert!(tree.iterations(tree.root()).is_empty());
        assert_eq!(config.containers()[0].counter().highest(), 0);
    }

    #[test]
    fn test_leaf_truncates_at_max_and_handles_missing_context() {
        let mut config = MappingConfiguration::new();
        config
            .add_container(
                Mapping::container().named("Authors").with_child(
                    Mapping::leaf("Author", "//Author")
                        .with_behaviour(MultiValueBehaviour::Greedy)
                        .with_value_counts(0, 2)
                        .unwrap(),
                ),
            )
            .unwrap();
        let leaf = &config.containers()[0].children()[0];
        let doc = XmlDocument::parse(LIBRARY).unwrap();

        let records = evaluate_leaf(leaf, Some(doc.root_node()), &[3], false).unwrap();
        let values: Vec<_> = records.fields.iter().map(|f| f.value.as_str()).collect();
        assert_eq!(values, vec!["Herbert", "Austen"]);
        assert_eq!(records.fields[1].position, "3_1");
        assert_eq!(records.mapping, leaf.id());

        let nothing = evaluate_leaf::<XmlNode>(leaf, None, &[], false).unwrap();
        assert!(nothing.fields.is_empty());
    }

    #[test]
    fn test_scalar_leaf_query_yields_one_value() {
        let mut config = MappingConfiguration::new();
        config
            .add_container(
                Mapping::container()
                    .named("Stats")
                    .with_child(Mapping::leaf("Books", "count(/Library/Book)")),
            )
            .unwrap();
        let doc = XmlDocument::parse(LIBRARY).unwrap();
        let tree = ExtractionTree::evaluate(&config.containers()[0], doc.root_node(), false).unwrap();
        let leaf = tree.iterations(tree.root())[0][0];
        assert_eq!(tree.fields(leaf)[0].value, "2");
    }
}
