use super::behaviour::MultiValueBehaviour;
use super::filter::InputFilter;
use super::mapping::{Mapping, MappingId, MappingKind};
use super::name_format::NameFormat;
use crate::error::{ConfigError, ExtractError};
use crate::query::NamespaceMap;
use log::debug;
use std::path::Path;
use xml2csv_xpath1::DataSourceNode;

/// The validated set of top-level containers, each producing one output,
/// together with the namespace bindings, defaults and input filters they share.
#[derive(Debug, Default)]
pub struct MappingConfiguration {
    containers: Vec<Mapping>,
    namespaces: NamespaceMap,
    default_behaviour: MultiValueBehaviour,
    default_name_format: NameFormat,
    filters: Vec<InputFilter>,
    next_id: usize,
}

impl MappingConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `prefix` to `uri`. The empty prefix declares the default element
    /// namespace. A prefix may only be declared again with the same URI.
    pub fn add_namespace(&mut self, prefix: &str, uri: &str) -> Result<(), ConfigError> {
        if let Some(existing) = self.namespaces.get(prefix) {
            if existing != uri {
                return Err(ConfigError::NamespaceConflict {
                    prefix: prefix.to_string(),
                    existing: existing.clone(),
                    uri: uri.to_string(),
                });
            }
            return Ok(());
        }
        debug!("Binding namespace prefix '{}' to {}", prefix, uri);
        self.namespaces.insert(prefix.to_string(), uri.to_string());
        Ok(())
    }

    pub fn namespaces(&self) -> &NamespaceMap {
        &self.namespaces
    }

    /// Applies to containers added after this call.
    pub fn set_default_behaviour(&mut self, behaviour: MultiValueBehaviour) {
        self.default_behaviour = behaviour;
    }

    pub fn default_behaviour(&self) -> MultiValueBehaviour {
        self.default_behaviour
    }

    /// Applies to containers added after this call.
    pub fn set_default_name_format(&mut self, name_format: NameFormat) {
        self.default_name_format = name_format;
    }

    pub fn default_name_format(&self) -> &NameFormat {
        &self.default_name_format
    }

    pub fn add_filter(&mut self, filter: InputFilter) {
        debug!("Adding input filter {:?}", filter);
        self.filters.push(filter);
    }

    /// Adds a top-level container. Its name must be non-empty and unique. Its
    /// mappings receive ids, inherit unset settings and have their queries
    /// compiled against the namespaces declared so far.
    pub fn add_container(&mut self, mut container: Mapping) -> Result<MappingId, ConfigError> {
        if !matches!(container.kind(), MappingKind::Container { .. }) {
            return Err(ConfigError::Invalid(format!(
                "Field mapping '{}' must be placed inside a mapping list",
                container.display_name()
            )));
        }
        let name = match container.name() {
            Some(name) if !name.trim().is_empty() => name.to_string(),
            _ => return Err(ConfigError::MissingName),
        };
        if self.container(&name).is_some() {
            return Err(ConfigError::DuplicateName(name));
        }

        let mut next_id = self.next_id;
        container.prepare(
            &mut next_id,
            (self.default_behaviour, &self.default_name_format),
            &self.namespaces,
        )?;
        self.next_id = next_id;

        for mapping in container.descendants() {
            debug!("Configured {}", mapping);
        }
        let id = container.id();
        self.containers.push(container);
        Ok(id)
    }

    pub fn containers(&self) -> &[Mapping] {
        &self.containers
    }

    pub fn container(&self, name: &str) -> Option<&Mapping> {
        self.containers.iter().find(|c| c.name() == Some(name))
    }

    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }

    pub fn include_file(&self, path: &Path) -> bool {
        self.filters.iter().all(|f| f.include_file(path))
    }

    pub fn include_document<'a, N>(&self, root: N) -> Result<bool, ExtractError>
    where
        N: DataSourceNode<'a> + 'a,
    {
        for filter in &self.filters {
            if !filter.include_document(root)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Forgets every observed value count, as if the configuration had just been loaded.
    pub fn reset_counters(&self) {
        for container in &self.containers {
            for mapping in container.descendants() {
                mapping.counter().reset();
            }
        }
    }
}
