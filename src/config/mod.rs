//! Loads mapping configuration files.
//!
//! ```xml
//! <MappingConfiguration defaultMultiValueBehaviour="Lazy" defaultNameFormat="Compact">
//!   <Namespace prefix="p" uri="urn:people"/>
//!   <Filter fileNameRegex=".*\.xml">
//!     <Filter xPath="count(/p:People) = 1"/>
//!   </Filter>
//!   <MappingList name="People" mappingRoot="/p:People/p:Person">
//!     <Mapping name="Name" xPath="p:Name"/>
//!   </MappingList>
//! </MappingConfiguration>
//! ```
//!
//! Elements are matched by local name. Namespaces are bound before anything
//! else in the file is read, so their position in the file does not matter.

use crate::error::ConfigError;
use crate::model::{InputFilter, Mapping, MappingConfiguration, MultiValueBehaviour, NameFormat};
use crate::query::{NamespaceMap, XPathQuery};
use log::{debug, info, warn};
use roxmltree::{Document, Node, ParsingOptions};
use std::path::Path;
use std::str::FromStr;

const ROOT: &str = "MappingConfiguration";
const NAMESPACE: &str = "Namespace";
const FILTER: &str = "Filter";
const MAPPING_LIST: &str = "MappingList";
const MAPPING: &str = "Mapping";

/// Reads every file into one configuration. Output names must be unique
/// across all of them.
pub fn load_files<P: AsRef<Path>>(paths: &[P]) -> Result<MappingConfiguration, ConfigError> {
    let mut config = MappingConfiguration::new();
    for path in paths.iter().map(AsRef::as_ref) {
        info!("Loading mapping configuration from {}", path.display());
        let text = std::fs::read_to_string(path)?;
        parse_into(&text, &mut config)?;
    }
    if config.is_empty() {
        return Err(ConfigError::Invalid(
            "No mapping lists were found in the configuration".to_string(),
        ));
    }
    Ok(config)
}

/// Parses a single configuration document.
pub fn load_str(text: &str) -> Result<MappingConfiguration, ConfigError> {
    let mut config = MappingConfiguration::new();
    parse_into(text, &mut config)?;
    Ok(config)
}

/// Adds the contents of one configuration document to `config`.
pub fn parse_into(text: &str, config: &mut MappingConfiguration) -> Result<(), ConfigError> {
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    let document = Document::parse_with_options(text, options)?;
    let parser = ConfigParser { document: &document };
    parser.parse(config)
}

struct ConfigParser<'d, 'input> {
    document: &'d Document<'input>,
}

impl ConfigParser<'_, '_> {
    fn parse(&self, config: &mut MappingConfiguration) -> Result<(), ConfigError> {
        let root = self.document.root_element();
        if root.tag_name().name() != ROOT {
            return Err(self.error(root, format!("expected <{}> as the root element", ROOT)));
        }
        if let Some(value) = root.attribute("defaultMultiValueBehaviour") {
            config.set_default_behaviour(MultiValueBehaviour::from_str(value)?);
        }
        if let Some(value) = root.attribute("defaultNameFormat") {
            config.set_default_name_format(NameFormat::from_str(value)?);
        }

        for node in elements(root).filter(|n| n.tag_name().name() == NAMESPACE) {
            let prefix = node.attribute("prefix").unwrap_or_default();
            let uri = self.required(node, "uri")?;
            config.add_namespace(prefix, uri)?;
        }

        for node in elements(root) {
            match node.tag_name().name() {
                NAMESPACE => {}
                FILTER => {
                    let filter = self.filter(node, config.namespaces())?;
                    config.add_filter(filter);
                }
                MAPPING_LIST | MAPPING => {
                    let container = self.mapping(node)?;
                    config.add_container(container)?;
                }
                other => self.ignore(node, other),
            }
        }
        debug!("Configuration now holds {} mapping lists", config.containers().len());
        Ok(())
    }

    fn filter(&self, node: Node<'_, '_>, namespaces: &NamespaceMap) -> Result<InputFilter, ConfigError> {
        let mut filter = InputFilter::new();
        if let Some(pattern) = node.attribute("fileNameRegex") {
            filter = filter.with_file_name(pattern)?;
        }
        if let Some(xpath) = node.attribute("xPath") {
            let query =
                XPathQuery::compile(xpath, namespaces).map_err(|source| ConfigError::InvalidXPath {
                    mapping: FILTER.to_string(),
                    expression: xpath.to_string(),
                    source,
                })?;
            filter = filter.with_document_query(query);
        }
        for child in elements(node) {
            match child.tag_name().name() {
                FILTER => filter = filter.with_nested(self.filter(child, namespaces)?),
                other => self.ignore(child, other),
            }
        }
        Ok(filter)
    }

    fn mapping(&self, node: Node<'_, '_>) -> Result<Mapping, ConfigError> {
        let mut mapping = if node.tag_name().name() == MAPPING_LIST {
            let mut container = Mapping::container();
            if let Some(name) = node.attribute("name") {
                container = container.named(name);
            }
            if let Some(root) = node.attribute("mappingRoot") {
                container = container.with_root(root);
            }
            for child in elements(node) {
                match child.tag_name().name() {
                    MAPPING_LIST | MAPPING => container = container.with_child(self.mapping(child)?),
                    other => self.ignore(child, other),
                }
            }
            container
        } else {
            let leaf = Mapping::leaf(self.required(node, "name")?, self.required(node, "xPath")?);
            let min = self.count(node, "minValueCount")?;
            let max = self.count(node, "maxValueCount")?;
            leaf.with_value_counts(min.unwrap_or(0), max.unwrap_or(0))?
        };

        if let Some(value) = node.attribute("multiValueBehaviour") {
            mapping = mapping.with_behaviour(MultiValueBehaviour::from_str(value)?);
        }
        if let Some(value) = node.attribute("nameFormat") {
            mapping = mapping.with_name_format(NameFormat::from_str(value)?);
        }
        if let Some(group) = self.count(node, "group")? {
            mapping = mapping.with_group(group);
        }
        Ok(mapping)
    }

    fn count(&self, node: Node<'_, '_>, attribute: &str) -> Result<Option<usize>, ConfigError> {
        node.attribute(attribute)
            .map(|value| {
                value.trim().parse::<usize>().map_err(|_| {
                    self.error(
                        node,
                        format!("'{}' is not a valid {} (expected a non-negative integer)", value, attribute),
                    )
                })
            })
            .transpose()
    }

    fn required<'n>(&self, node: Node<'n, '_>, attribute: &str) -> Result<&'n str, ConfigError> {
        node.attribute(attribute).ok_or_else(|| {
            self.error(
                node,
                format!(
                    "missing required attribute '{}' on <{}>",
                    attribute,
                    node.tag_name().name()
                ),
            )
        })
    }

    fn ignore(&self, node: Node<'_, '_>, name: &str) {
        let pos = self.document.text_pos_at(node.range().start);
        warn!("Ignoring unexpected element <{}> at {}:{}", name, pos.row, pos.col);
    }

    fn error(&self, node: Node<'_, '_>, message: String) -> ConfigError {
        let pos = self.document.text_pos_at(node.range().start);
        ConfigError::Invalid(format!("{}:{}: {}", pos.row, pos.col, message))
    }
}

fn elements<'a, 'input>(node: Node<'a, 'input>) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(Node::is_element)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MappingKind;

    const PEOPLE: &str = r#"<?xml version="1.0"?>
<MappingConfiguration xmlns="urn:xml2csv" defaultMultiValueBehaviour="greedy" defaultNameFormat="WithCount">
  <MappingList name="People" mappingRoot="/p:People/p:Person">
    <Mapping name="Name" xPath="p:Name" minValueCount="1" maxValueCount="3" nameFormat="NoCounts"/>
    <MappingList mappingRoot="p:Address" multiValueBehaviour="Inline">
      <Mapping name="Street" xPath="p:Street" group="2"/>
    </MappingList>
  </MappingList>
  <Namespace prefix="p" uri="urn:people"/>
  <Filter fileNameRegex=".*\.xml">
    <Filter xPath="count(/p:People) = 1"/>
  </Filter>
  <Comment>ignored</Comment>
</MappingConfiguration>"#;

    #[test]
    fn test_load_full_configuration() {
        let config = load_str(PEOPLE).unwrap();
        assert_eq!(config.namespaces().get("p").map(String::as_str), Some("urn:people"));
        assert_eq!(config.default_behaviour(), MultiValueBehaviour::Greedy);

        let people = config.container("People").unwrap();
        assert_eq!(people.xpath(), Some("/p:People/p:Person"));
        let name = &people.children()[0];
        assert!(matches!(
            name.kind(),
            MappingKind::Leaf {
                min_value_count: 1,
                max_value_count: 3
            }
        ));
        assert_eq!(name.behaviour(), MultiValueBehaviour::Greedy);
        assert_eq!(name.name_format(), NameFormat::NoCounts);

        let address = &people.children()[1];
        assert_eq!(address.behaviour(), MultiValueBehaviour::Inline);
        let street = &address.children()[0];
        assert_eq!(street.behaviour(), MultiValueBehaviour::Inline);
        assert_eq!(street.name_format(), NameFormat::WithCount);
        assert_eq!(street.group(), 2);

        assert!(config.include_file(Path::new("people.xml")));
        assert!(!config.include_file(Path::new("people.json")));
    }

    #[test]
    fn test_unbound_prefix_is_rejected() {
        let text = r#"<MappingConfiguration>
            <MappingList name="X" mappingRoot="/q:Root"><Mapping name="A" xPath="a"/></MappingList>
        </MappingConfiguration>"#;
        assert!(matches!(load_str(text), Err(ConfigError::InvalidXPath { .. })));
    }

    #[test]
    fn test_missing_attribute_reports_position() {
        let text = "<MappingConfiguration>\n  <MappingList name=\"X\">\n    <Mapping xPath=\"a\"/>\n  </MappingList>\n</MappingConfiguration>";
        match load_str(text) {
            Err(ConfigError::Invalid(message)) => {
                assert!(message.starts_with("3:5:"), "{}", message);
                assert!(message.contains("'name'"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_invalid_values() {
        let bad_count = r#"<MappingConfiguration><MappingList name="X">
            <Mapping name="A" xPath="a" maxValueCount="-1"/></MappingList></MappingConfiguration>"#;
        assert!(matches!(load_str(bad_count), Err(ConfigError::Invalid(_))));

        let bad_behaviour = r#"<MappingConfiguration><MappingList name="X" multiValueBehaviour="Sometimes">
            <Mapping name="A" xPath="a"/></MappingList></MappingConfiguration>"#;
        assert!(matches!(load_str(bad_behaviour), Err(ConfigError::UnknownBehaviour(_))));

        let inverted = r#"<MappingConfiguration><MappingList name="X">
            <Mapping name="A" xPath="a" minValueCount="4" maxValueCount="2"/></MappingList></MappingConfiguration>"#;
        assert!(matches!(load_str(inverted), Err(ConfigError::InvalidValueCounts { .. })));

        assert!(matches!(load_str("<Other/>"), Err(ConfigError::Invalid(_))));
        assert!(matches!(load_str("<MappingConfiguration>"), Err(ConfigError::Xml(_))));
    }

    #[test]
    fn test_top_level_mapping_is_rejected() {
        let text = r#"<MappingConfiguration><Mapping name="A" xPath="a"/></MappingConfiguration>"#;
        assert!(matches!(load_str(text), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_files_merge_and_reject_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("a.xml");
        let second = dir.path().join("b.xml");
        std::fs::write(
            &first,
            r#"<MappingConfiguration><MappingList name="A"><Mapping name="x" xPath="x"/></MappingList></MappingConfiguration>"#,
        )
        .unwrap();
        std::fs::write(
            &second,
            r#"<MappingConfiguration><MappingList name="B"><Mapping name="y" xPath="y"/></MappingList></MappingConfiguration>"#,
        )
        .unwrap();

        let config = load_files(&[&first, &second]).unwrap();
        assert_eq!(config.containers().len(), 2);
        assert_eq!(config.container("B").unwrap().children()[0].id().0, 3);

        assert!(matches!(
            load_files(&[&first, &first]),
            Err(ConfigError::DuplicateName(name)) if name == "A"
        ));
    }
}
