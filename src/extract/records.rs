//! Flattens an extraction tree into output rows.
//!
//! Each child of a container contributes a set of *fragments* (partial rows);
//! an iteration of the container yields the cartesian product of its children's
//! fragment sets, so repeated values either widen a row (greedy) or multiply
//! rows (inline and nested containers).

use super::context::{ContextId, ExtractionTree};
use crate::model::cardinality::collect_field_names;
use crate::model::{FieldLayout, MappingKind, MultiValueBehaviour};
use itertools::Itertools;
use log::warn;

/// An output row: field names paired with values, in header order.
pub type Row = Vec<(String, String)>;

type Fragment = Vec<(String, String)>;

/// A lazy iterator over the rows of one extraction tree. Build another one over
/// the same tree to start again.
pub struct Records<'t, 'm> {
    tree: &'t ExtractionTree<'m>,
    layout: &'t FieldLayout,
    next_iteration: usize,
    pending: Box<dyn Iterator<Item = Row> + 't>,
}

impl<'t, 'm> Records<'t, 'm> {
    pub fn new(tree: &'t ExtractionTree<'m>, layout: &'t FieldLayout) -> Self {
        Self {
            tree,
            layout,
            next_iteration: 0,
            pending: Box::new(std::iter::empty()),
        }
    }

    fn top_level_name(&self) -> Option<&'m str> {
        self.tree.container().name()
    }
}

impl Iterator for Records<'_, '_> {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        loop {
            if let Some(row) = self.pending.next() {
                return Some(row);
            }
            let iterations = self.tree.iterations(self.tree.root());
            let children = iterations.get(self.next_iteration)?;
            self.next_iteration += 1;

            let assembler = Assembler {
                tree: self.tree,
                layout: self.layout,
            };
            let sets: Vec<Vec<Fragment>> = children
                .iter()
                .map(|child| assembler.fragments(*child, self.top_level_name(), 0))
                .collect();
            self.pending = cross_join(sets);
        }
    }
}

/// Every combination of one fragment per set, each concatenated in set order.
/// No sets at all combine into a single empty fragment.
fn cross_join(sets: Vec<Vec<Fragment>>) -> Box<dyn Iterator<Item = Fragment>> {
    if sets.is_empty() {
        return Box::new(std::iter::once(Vec::new()));
    }
    Box::new(
        sets.into_iter()
            .map(Vec::into_iter)
            .multi_cartesian_product()
            .map(|combination| combination.concat()),
    )
}

struct Assembler<'t, 'm> {
    tree: &'t ExtractionTree<'m>,
    layout: &'t FieldLayout,
}

impl Assembler<'_, '_> {
    fn fragments(&self, id: ContextId, parent: Option<&str>, parent_index: usize) -> Vec<Fragment> {
        let node = self.tree.node(id);
        let mapping = node.mapping;
        match mapping.kind() {
            MappingKind::Leaf { .. } => self.leaf_fragments(id, parent, parent_index),
            MappingKind::Container { .. } => {
                let own_name = mapping.name().or(parent);
                let iterations = self.tree.iterations(id);
                if mapping.behaviour() == MultiValueBehaviour::Greedy {
                    let width = self.layout.width(mapping.id());
                    if iterations.len() > width {
                        warn!(
                            "'{}' matched {} roots but the layout has room for {}, dropping the rest",
                            mapping.display_name(),
                            iterations.len(),
                            width
                        );
                    }
                    let sets = (0..width)
                        .map(|i| match iterations.get(i) {
                            Some(children) => self.iteration_fragments(children, own_name, i),
                            None => vec![self.blank(id, parent, i)],
                        })
                        .collect();
                    cross_join(sets).collect()
                } else if iterations.is_empty() {
                    vec![self.blank(id, parent, parent_index)]
                } else {
                    iterations
                        .iter()
                        .flat_map(|children| self.iteration_fragments(children, own_name, parent_index))
                        .collect()
                }
            }
        }
    }

    fn iteration_fragments(
        &self,
        children: &[ContextId],
        parent: Option<&str>,
        parent_index: usize,
    ) -> Vec<Fragment> {
        let sets = children
            .iter()
            .map(|child| self.fragments(*child, parent, parent_index))
            .collect();
        cross_join(sets).collect()
    }

    fn leaf_fragments(&self, id: ContextId, parent: Option<&str>, parent_index: usize) -> Vec<Fragment> {
        let mapping = self.tree.node(id).mapping;
        let fields = self.tree.fields(id);
        let name = mapping.name().unwrap_or_default();
        let format = mapping.name_format();
        let named = |i: usize, value: &str| (format.format(name, i, parent, parent_index), value.to_string());

        match mapping.behaviour() {
            MultiValueBehaviour::Lazy => {
                if fields.len() > 1 {
                    warn!(
                        "'{}' is lazy, keeping the first of {} values",
                        mapping.display_name(),
                        fields.len()
                    );
                }
                let value = fields.first().map(|f| f.value.as_str()).unwrap_or_default();
                vec![vec![named(0, value)]]
            }
            MultiValueBehaviour::Greedy => {
                let width = self.layout.width(mapping.id());
                if fields.len() > width {
                    warn!(
                        "'{}' has {} values but the layout has {} columns, dropping the rest",
                        mapping.display_name(),
                        fields.len(),
                        width
                    );
                }
                let fragment = (0..width)
                    .map(|i| named(i, fields.get(i).map(|f| f.value.as_str()).unwrap_or_default()))
                    .collect();
                vec![fragment]
            }
            MultiValueBehaviour::Inline | MultiValueBehaviour::Warn => {
                if fields.is_empty() {
                    vec![vec![named(0, "")]]
                } else {
                    fields.iter().map(|f| vec![named(0, &f.value)]).collect()
                }
            }
        }
    }

    /// A fragment with every field of the subtree present and empty.
    fn blank(&self, id: ContextId, parent: Option<&str>, parent_index: usize) -> Fragment {
        let mapping = self.tree.node(id).mapping;
        let mut names = Vec::new();
        match mapping.kind() {
            MappingKind::Container { children } => {
                let own_name = mapping.name().or(parent);
                for child in children {
                    collect_field_names(child, self.layout, own_name, parent_index, &mut names);
                }
            }
            MappingKind::Leaf { .. } => {
                collect_field_names(mapping, self.layout, parent, parent_index, &mut names)
            }
        }
        names.into_iter().map(|name| (name, String::new())).collect()
    }
}
