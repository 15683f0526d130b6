use crate::error::{ConfigError, ExtractError};
use crate::query::XPathQuery;
use regex::Regex;
use std::path::Path;
use xml2csv_xpath1::DataSourceNode;

/// Decides whether an input file, and then its parsed document, is processed.
/// A filter passes when its own tests pass and every nested filter passes.
#[derive(Debug, Clone, Default)]
pub struct InputFilter {
    file_name: Option<Regex>,
    document: Option<XPathQuery>,
    nested: Vec<InputFilter>,
}

impl InputFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only files whose name (not path) matches `pattern` pass.
    pub fn with_file_name(mut self, pattern: &str) -> Result<Self, ConfigError> {
        let regex = Regex::new(pattern).map_err(|source| ConfigError::InvalidFileFilter {
            pattern: pattern.to_string(),
            source,
        })?;
        self.file_name = Some(regex);
        Ok(self)
    }

    /// Only documents for which `query` is true pass.
    pub fn with_document_query(mut self, query: XPathQuery) -> Self {
        self.document = Some(query);
        self
    }

    pub fn with_nested(mut self, filter: InputFilter) -> Self {
        self.nested.push(filter);
        self
    }

    pub fn include_file(&self, path: &Path) -> bool {
        let own = match &self.file_name {
            Some(regex) => path
                .file_name()
                .is_some_and(|name| regex.is_match(&name.to_string_lossy())),
            None => true,
        };
        own && self.nested.iter().all(|f| f.include_file(path))
    }

    pub fn include_document<'a, N>(&self, root: N) -> Result<bool, ExtractError>
    where
        N: DataSourceNode<'a> + 'a,
    {
        if let Some(query) = &self.document {
            let included = query.matches(root).map_err(|source| ExtractError::Query {
                mapping: "input filter".to_string(),
                expression: query.source().to_string(),
                source,
            })?;
            if !included {
                return Ok(false);
            }
        }
        for filter in &self.nested {
            if !filter.include_document(root)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::XmlDocument;
    use crate::query::NamespaceMap;

    #[test]
    fn test_file_name_filter_matches_name_only() {
        let filter = InputFilter::new().with_file_name(r"^orders_\d+\.xml$").unwrap();
        assert!(filter.include_file(Path::new("/data/in/orders_12.xml")));
        assert!(!filter.include_file(Path::new("/data/orders_12.xml/readme.txt")));
    }

    #[test]
    fn test_invalid_regex() {
        assert!(matches!(
            InputFilter::new().with_file_name("("),
            Err(ConfigError::InvalidFileFilter { .. })
        ));
    }

    #[test]
    fn test_nested_filters_must_all_pass() {
        let query = XPathQuery::compile("count(/Orders/Order) > 1", &NamespaceMap::new()).unwrap();
        let filter = InputFilter::new()
            .with_file_name(r"\.xml$")
            .unwrap()
            .with_nested(InputFilter::new().with_document_query(query));

        let one = XmlDocument::parse("<Orders><Order/></Orders>").unwrap();
        let two = XmlDocument::parse("<Orders><Order/><Order/></Orders>").unwrap();
        assert!(!filter.include_document(one.root_node()).unwrap());
        assert!(filter.include_document(two.root_node()).unwrap());
        assert!(!filter.include_file(Path::new("orders.csv")));
    }
}
