//! Column-count resolution for repeating fields.
//!
//! Every mapping owns a [`ValueCounter`] that remembers the most values (or,
//! for containers, roots) any single evaluation produced during the run. A
//! [`FieldLayout`] freezes those counts into column widths so that a header and
//! the rows written under it always agree.

use super::behaviour::MultiValueBehaviour;
use super::mapping::{Mapping, MappingId, MappingKind};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Highest value count observed for one mapping. Shared across every document
/// processed with the same configuration until explicitly reset.
#[derive(Debug, Default)]
pub struct ValueCounter(AtomicUsize);

impl ValueCounter {
    pub fn observe(&self, count: usize) {
        self.0.fetch_max(count, Ordering::Relaxed);
    }

    pub fn highest(&self) -> usize {
        self.0.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.0.store(0, Ordering::Relaxed);
    }
}

/// Number of fields a leaf produces: the highest observed count clamped to its
/// minimum and (non-zero) maximum. Lazy and inline leaves always produce one.
pub fn effective_field_count(mapping: &Mapping) -> usize {
    match mapping.kind() {
        MappingKind::Leaf {
            min_value_count,
            max_value_count,
        } => match mapping.behaviour() {
            MultiValueBehaviour::Greedy => {
                let count = mapping.counter().highest().max(*min_value_count);
                if *max_value_count > 0 {
                    count.min(*max_value_count)
                } else {
                    count
                }
            }
            MultiValueBehaviour::Lazy | MultiValueBehaviour::Inline | MultiValueBehaviour::Warn => 1,
        },
        MappingKind::Container { .. } => match mapping.behaviour() {
            MultiValueBehaviour::Greedy => mapping.counter().highest(),
            MultiValueBehaviour::Lazy | MultiValueBehaviour::Inline | MultiValueBehaviour::Warn => 1,
        },
    }
}

/// A snapshot of resolved widths for every mapping below a top-level container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldLayout {
    widths: HashMap<MappingId, usize>,
}

impl FieldLayout {
    pub fn resolve(container: &Mapping) -> Self {
        let widths = container
            .descendants()
            .into_iter()
            .skip(1)
            .map(|m| (m.id(), effective_field_count(m)))
            .collect();
        Self { widths }
    }

    /// The frozen width of a mapping. Mappings unknown to this layout count as one field.
    pub fn width(&self, id: MappingId) -> usize {
        self.widths.get(&id).copied().unwrap_or(1)
    }
}

/// The header of a top-level container's output under `layout`.
pub fn field_names(container: &Mapping, layout: &FieldLayout) -> Vec<String> {
    let mut names = Vec::new();
    for child in container.children() {
        collect_field_names(child, layout, container.name(), 0, &mut names);
    }
    names
}

/// Appends the names `mapping` contributes to a row.
///
/// A greedy nested container repeats its children's names once per column
/// group, passing the group as the parent iteration index. Any other container
/// contributes its children's names once.
pub(crate) fn collect_field_names(
    mapping: &Mapping,
    layout: &FieldLayout,
    parent: Option<&str>,
    parent_index: usize,
    names: &mut Vec<String>,
) {
    match mapping.kind() {
        MappingKind::Leaf { .. } => {
            let name = mapping.name().unwrap_or_default();
            let format = mapping.name_format();
            let count = match mapping.behaviour() {
                MultiValueBehaviour::Greedy => layout.width(mapping.id()),
                MultiValueBehaviour::Lazy | MultiValueBehaviour::Inline | MultiValueBehaviour::Warn => 1,
            };
            names.extend((0..count).map(|i| format.format(name, i, parent, parent_index)));
        }
        MappingKind::Container { children } => {
            let own_name = mapping.name().or(parent);
            if mapping.behaviour() == MultiValueBehaviour::Greedy {
                for iteration in 0..layout.width(mapping.id()) {
                    for child in children {
                        collect_field_names(child, layout, own_name, iteration, names);
                    }
                }
            } else {
                for child in children {
                    collect_field_names(child, layout, own_name, parent_index, names);
                }
            }
        }
    }
}
