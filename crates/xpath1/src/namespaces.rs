//! Resolves the prefixes of name tests to namespace URIs after parsing.
//!
//! The resolver is asked for a prefix and returns its URI. The empty prefix
//! stands for the default element namespace; when the resolver has none,
//! unprefixed names keep matching on local name alone. Attribute names never
//! pick up the default namespace.

use crate::ast::{Axis, Expression, LocationPath, NodeTest};
use crate::error::XPathError;

pub fn bind_namespaces<F>(expr: &mut Expression, resolver: &F) -> Result<(), XPathError>
where
    F: Fn(&str) -> Option<String>,
{
    match expr {
        Expression::Literal(_) | Expression::Number(_) => Ok(()),
        Expression::LocationPath(path) => bind_path(path, resolver),
        Expression::FunctionCall { args, .. } => {
            for arg in args {
                bind_namespaces(arg, resolver)?;
            }
            Ok(())
        }
        Expression::BinaryOp { left, right, .. } => {
            bind_namespaces(left, resolver)?;
            bind_namespaces(right, resolver)
        }
        Expression::UnaryOp { expr, .. } => bind_namespaces(expr, resolver),
    }
}

fn bind_path<F>(path: &mut LocationPath, resolver: &F) -> Result<(), XPathError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(start) = &mut path.start_point {
        bind_namespaces(start, resolver)?;
    }
    for step in &mut path.steps {
        if let NodeTest::Name(name_test) = &mut step.node_test {
            name_test.namespace = match &name_test.prefix {
                Some(prefix) => Some(
                    resolver(prefix).ok_or_else(|| XPathError::UnboundPrefix(prefix.clone()))?,
                ),
                None if step.axis == Axis::Attribute => None,
                None => resolver(""),
            };
        }
        for predicate in &mut step.predicates {
            bind_namespaces(predicate, resolver)?;
        }
    }
    Ok(())
}
