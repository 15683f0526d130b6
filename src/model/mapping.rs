use super::behaviour::MultiValueBehaviour;
use super::cardinality::ValueCounter;
use super::name_format::NameFormat;
use crate::error::ConfigError;
use crate::query::{NamespaceMap, XPathQuery};
use log::warn;
use std::fmt;

/// Identifies a mapping within its configuration. Assigned in pre-order when
/// the owning top-level container is added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct MappingId(pub usize);

/// A node of the mapping tree: a leaf producing a field, or a container
/// grouping other mappings.
#[derive(Debug)]
pub struct Mapping {
    id: MappingId,
    name: Option<String>,
    xpath: Option<String>,
    query: Option<XPathQuery>,
    behaviour: Option<MultiValueBehaviour>,
    name_format: Option<NameFormat>,
    group: usize,
    counter: ValueCounter,
    kind: MappingKind,
}

#[derive(Debug)]
pub enum MappingKind {
    Leaf {
        min_value_count: usize,
        /// 0 means unbounded.
        max_value_count: usize,
    },
    Container {
        children: Vec<Mapping>,
    },
}

impl Mapping {
    fn new(name: Option<String>, xpath: Option<String>, kind: MappingKind) -> Self {
        Self {
            id: MappingId::default(),
            name,
            xpath,
            query: None,
            behaviour: None,
            name_format: None,
            group: 0,
            counter: ValueCounter::default(),
            kind,
        }
    }

    /// A field named `name` whose values are selected by `xpath`.
    pub fn leaf(name: impl Into<String>, xpath: impl Into<String>) -> Self {
        Self::new(
            Some(name.into()),
            Some(xpath.into()),
            MappingKind::Leaf {
                min_value_count: 0,
                max_value_count: 0,
            },
        )
    }

    /// An unnamed container iterating over the current node.
    pub fn container() -> Self {
        Self::new(None, None, MappingKind::Container { children: vec![] })
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the root query of a container.
    pub fn with_root(mut self, xpath: impl Into<String>) -> Self {
        self.xpath = Some(xpath.into());
        self
    }

    pub fn with_child(mut self, child: Mapping) -> Self {
        match self.kind {
            MappingKind::Container { ref mut children } => children.push(child),
            MappingKind::Leaf { .. } => warn!(
                "'{}' is a field mapping and cannot hold '{}', ignoring it",
                self.display_name(),
                child.display_name()
            ),
        }
        self
    }

    pub fn with_behaviour(mut self, behaviour: MultiValueBehaviour) -> Self {
        self.behaviour = Some(behaviour);
        self
    }

    pub fn with_name_format(mut self, name_format: NameFormat) -> Self {
        self.name_format = Some(name_format);
        self
    }

    pub fn with_group(mut self, group: usize) -> Self {
        self.group = group;
        self
    }

    /// Sets the padding and truncation limits of a leaf. A `max` of 0 is unbounded.
    pub fn with_value_counts(mut self, min: usize, max: usize) -> Result<Self, ConfigError> {
        let name = self.display_name().to_string();
        match &mut self.kind {
            MappingKind::Leaf {
                min_value_count,
                max_value_count,
            } => {
                if max > 0 && max < min {
                    return Err(ConfigError::InvalidValueCounts { name, min, max });
                }
                *min_value_count = min;
                *max_value_count = max;
                Ok(self)
            }
            MappingKind::Container { .. } => Err(ConfigError::Invalid(format!(
                "Value counts only apply to field mappings, not to '{}'",
                name
            ))),
        }
    }

    pub fn id(&self) -> MappingId {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// A name for log messages, even for unnamed containers.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("(unnamed)")
    }

    pub fn xpath(&self) -> Option<&str> {
        self.xpath.as_deref()
    }

    /// The compiled query. `None` until the mapping is added to a configuration,
    /// and for containers that iterate over the current node.
    pub fn query(&self) -> Option<&XPathQuery> {
        self.query.as_ref()
    }

    pub fn behaviour(&self) -> MultiValueBehaviour {
        self.behaviour.unwrap_or_default()
    }

    pub fn name_format(&self) -> NameFormat {
        self.name_format.clone().unwrap_or_default()
    }

    pub fn group(&self) -> usize {
        self.group
    }

    pub fn counter(&self) -> &ValueCounter {
        &self.counter
    }

    pub fn kind(&self) -> &MappingKind {
        &self.kind
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, MappingKind::Leaf { .. })
    }

    /// Child mappings in declared order. Empty for leaves.
    pub fn children(&self) -> &[Mapping] {
        match &self.kind {
            MappingKind::Container { children } => children,
            MappingKind::Leaf { .. } => &[],
        }
    }

    pub fn min_value_count(&self) -> usize {
        match self.kind {
            MappingKind::Leaf {
                min_value_count, ..
            } => min_value_count,
            MappingKind::Container { .. } => 0,
        }
    }

    pub fn max_value_count(&self) -> usize {
        match self.kind {
            MappingKind::Leaf {
                max_value_count, ..
            } => max_value_count,
            MappingKind::Container { .. } => 0,
        }
    }

    /// True when the number of fields this mapping produces never depends on the data.
    pub fn has_fixed_output_cardinality(&self) -> bool {
        let (min, max) = (self.min_value_count(), self.max_value_count());
        self.behaviour() == MultiValueBehaviour::Lazy || (min == max && min > 0)
    }

    /// Walks the subtree in pre-order.
    pub fn descendants(&self) -> Vec<&Mapping> {
        let mut result = vec![self];
        for child in self.children() {
            result.extend(child.descendants());
        }
        result
    }

    /// Assigns ids in pre-order, fills in unset behaviours and name formats from
    /// `inherited`, and compiles every query against `namespaces`.
    pub(crate) fn prepare(
        &mut self,
        next_id: &mut usize,
        inherited: (MultiValueBehaviour, &NameFormat),
        namespaces: &NamespaceMap,
    ) -> Result<(), ConfigError> {
        self.id = MappingId(*next_id);
        *next_id += 1;

        let behaviour = *self.behaviour.get_or_insert(inherited.0);
        let name_format = self
            .name_format
            .get_or_insert_with(|| inherited.1.clone())
            .clone();

        if let Some(xpath) = &self.xpath {
            let query =
                XPathQuery::compile(xpath, namespaces).map_err(|source| ConfigError::InvalidXPath {
                    mapping: self.display_name().to_string(),
                    expression: xpath.clone(),
                    source,
                })?;
            self.query = Some(query);
        }

        if let MappingKind::Container { children } = &mut self.kind {
            for child in children {
                child.prepare(next_id, (behaviour, &name_format), namespaces)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Mapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_leaf() { "Mapping" } else { "MappingList" };
        write!(
            f,
            "{}({}, {}, xpath={}, behaviour={}, format={}, group={}",
            kind,
            self.id.0,
            self.display_name(),
            self.xpath().unwrap_or("."),
            self.behaviour(),
            self.name_format(),
            self.group
        )?;
        if self.is_leaf() {
            write!(f, ", min={}, max={}", self.min_value_count(), self.max_value_count())?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person() -> Mapping {
        Mapping::container()
            .named("Person")
            .with_root("/People/Person")
            .with_behaviour(MultiValueBehaviour::Greedy)
            .with_child(Mapping::leaf("Name", "Name"))
            .with_child(
                Mapping::container()
                    .with_root("Address")
                    .with_child(Mapping::leaf("Street", "Street").with_behaviour(MultiValueBehaviour::Lazy)),
            )
    }

    #[test]
    fn test_value_counts_are_validated() {
        let err = Mapping::leaf("Phone", "Phone").with_value_counts(3, 2).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValueCounts { min: 3, max: 2, .. }));
        // Zero maximum is unbounded, so any minimum is fine.
        assert!(Mapping::leaf("Phone", "Phone").with_value_counts(3, 0).is_ok());
        assert!(Mapping::container().with_value_counts(1, 1).is_err());
    }

    #[test]
    fn test_prepare_assigns_ids_and_inherits_settings() {
        let mut mapping = person();
        let mut next_id = 10;
        mapping
            .prepare(&mut next_id, (MultiValueBehaviour::Lazy, &NameFormat::WithCount), &NamespaceMap::new())
            .unwrap();

        let ids: Vec<usize> = mapping.descendants().iter().map(|m| m.id().0).collect();
        assert_eq!(ids, vec![10, 11, 12, 13]);
        assert_eq!(next_id, 14);

        let name = &mapping.children()[0];
        assert_eq!(name.behaviour(), MultiValueBehaviour::Greedy);
        assert_eq!(name.name_format(), NameFormat::WithCount);
        assert!(name.query().is_some());

        let street = &mapping.children()[1].children()[0];
        assert_eq!(street.behaviour(), MultiValueBehaviour::Lazy);
    }

    #[test]
    fn test_prepare_reports_bad_xpath() {
        let mut mapping = Mapping::container()
            .named("Broken")
            .with_child(Mapping::leaf("Bad", "x:Name"));
        let err = mapping
            .prepare(&mut 0, (MultiValueBehaviour::Lazy, &NameFormat::Compact), &NamespaceMap::new())
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidXPath { mapping, .. } if mapping == "Bad"));
    }

    #[test]
    fn test_fixed_output_cardinality() {
        let lazy = Mapping::leaf("A", "a");
        assert!(lazy.has_fixed_output_cardinality());

        let greedy = Mapping::leaf("A", "a").with_behaviour(MultiValueBehaviour::Greedy);
        assert!(!greedy.has_fixed_output_cardinality());

        let pinned = Mapping::leaf("A", "a")
            .with_behaviour(MultiValueBehaviour::Greedy)
            .with_value_counts(2, 2)
            .unwrap();
        assert!(pinned.has_fixed_output_cardinality());
    }

    #[test]
    fn test_leaf_ignores_child() {
        let leaf = Mapping::leaf("Name", "Name").with_child(Mapping::leaf("Inner", "Inner"));
        assert!(leaf.is_leaf());
        assert!(leaf.children().is_empty());
    }
}
