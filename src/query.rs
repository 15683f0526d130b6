//! XPath expressions compiled against a configuration's namespace map.

use std::collections::BTreeMap;
use std::fmt;
use xml2csv_xpath1::{
    DataSourceNode, EvaluationContext, Expression, XPathError, XPathValue, bind_namespaces,
    evaluate, parse_expression,
};

/// Namespace prefix to URI bindings. The empty prefix is the default element namespace.
pub type NamespaceMap = BTreeMap<String, String>;

/// One item of a query result, in document order.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryItem<N> {
    Node(N),
    /// The result of a query that evaluated to a string, number or boolean.
    Value(String),
}

impl<'a, N: DataSourceNode<'a>> QueryItem<N> {
    pub fn string_value(&self) -> String {
        match self {
            QueryItem::Node(node) => node.string_value(),
            QueryItem::Value(value) => value.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct XPathQuery {
    source: String,
    expression: Expression,
}

impl XPathQuery {
    pub fn compile(source: &str, namespaces: &NamespaceMap) -> Result<Self, XPathError> {
        let mut expression = parse_expression(source)?;
        bind_namespaces(&mut expression, &|prefix: &str| namespaces.get(prefix).cloned())?;
        Ok(Self {
            source: source.to_string(),
            expression,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn evaluate<'a, N>(&self, context: N) -> Result<XPathValue<N>, XPathError>
    where
        N: DataSourceNode<'a> + 'a,
    {
        evaluate(&self.expression, &EvaluationContext::for_node(context))
    }

    /// Evaluates relative to `context`. Node-sets come back node by node; any
    /// other result is a single value.
    pub fn select<'a, N>(&self, context: N) -> Result<Vec<QueryItem<N>>, XPathError>
    where
        N: DataSourceNode<'a> + 'a,
    {
        Ok(match self.evaluate(context)? {
            XPathValue::NodeSet(nodes) => nodes.into_iter().map(QueryItem::Node).collect(),
            other => vec![QueryItem::Value(other.to_string())],
        })
    }

    /// The boolean value of the query, as used by document filters.
    pub fn matches<'a, N>(&self, context: N) -> Result<bool, XPathError>
    where
        N: DataSourceNode<'a> + 'a,
    {
        Ok(self.evaluate(context)?.to_bool())
    }
}

impl fmt::Display for XPathQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
