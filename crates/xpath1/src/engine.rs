//! The evaluation engine for executing a parsed XPath AST against a generic `DataSourceNode`.

use super::ast::{Axis, Expression, LocationPath, NodeTest, NodeTypeTest, Step, UnaryOperator};
use super::functions;
use super::{axes, operators};
use crate::datasource::{DataSourceNode, NodeType};
use crate::error::XPathError;
use std::fmt;
use std::marker::PhantomData;

/// Represents the possible result types of an XPath expression evaluation.
#[derive(Debug, Clone)]
pub enum XPathValue<N> {
    NodeSet(Vec<N>),
    String(String),
    Number(f64),
    Boolean(bool),
}

impl<'a, N: DataSourceNode<'a>> XPathValue<N> {
    /// Coerces the XPath value to a boolean as per XPath 1.0 rules.
    pub fn to_bool(&self) -> bool {
        match self {
            XPathValue::NodeSet(nodes) => !nodes.is_empty(),
            XPathValue::String(s) => !s.is_empty(),
            XPathValue::Number(n) => *n != 0.0 && !n.is_nan(),
            XPathValue::Boolean(b) => *b,
        }
    }

    /// Coerces the XPath value to a number as per XPath 1.0 rules.
    pub fn to_number(&self) -> f64 {
        match self {
            XPathValue::Number(n) => *n,
            XPathValue::String(s) => operators::string_to_number(s),
            XPathValue::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            XPathValue::NodeSet(nodes) => {
                let s = nodes.first().map(|n| n.string_value()).unwrap_or_default();
                operators::string_to_number(&s)
            }
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            XPathValue::NodeSet(_) => "node-set",
            XPathValue::String(_) => "string",
            XPathValue::Number(_) => "number",
            XPathValue::Boolean(_) => "boolean",
        }
    }
}

/// Formats a number the way XPath's `string()` does: integers without a
/// fractional part, `NaN`, `Infinity` and `-Infinity` spelled out.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else {
        n.to_string()
    }
}

impl<'a, N: DataSourceNode<'a>> fmt::Display for XPathValue<N> {
    /// Coerces the XPath value to a string as per XPath 1.0 rules.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XPathValue::NodeSet(nodes) => write!(
                f,
                "{}",
                nodes.first().map(|n| n.string_value()).unwrap_or_default()
            ),
            XPathValue::String(s) => write!(f, "{}", s),
            XPathValue::Number(n) => write!(f, "{}", format_number(*n)),
            XPathValue::Boolean(b) => write!(f, "{}", b),
        }
    }
}

/// The state needed while evaluating an expression.
/// `'a` is the lifetime of the underlying document.
pub struct EvaluationContext<'a, N: DataSourceNode<'a>> {
    pub context_node: N,
    pub root_node: N,
    pub context_position: usize, // 1-based index
    pub context_size: usize,
    _marker: PhantomData<&'a ()>,
}

impl<'a, N: DataSourceNode<'a>> EvaluationContext<'a, N> {
    pub fn new(context_node: N, root_node: N, context_position: usize, context_size: usize) -> Self {
        Self {
            context_node,
            root_node,
            context_position,
            context_size,
            _marker: PhantomData,
        }
    }

    /// A context positioned on a single node, as used to start a query.
    pub fn for_node(context_node: N) -> Self {
        Self::new(context_node, context_node.root(), 1, 1)
    }
}

/// Evaluates a compiled expression and returns a concrete `XPathValue`.
pub fn evaluate<'a, N>(
    expr: &Expression,
    e_ctx: &EvaluationContext<'a, N>,
) -> Result<XPathValue<N>, XPathError>
where
    N: DataSourceNode<'a> + 'a,
{
    match expr {
        Expression::Literal(s) => Ok(XPathValue::String(s.clone())),
        Expression::Number(n) => Ok(XPathValue::Number(*n)),
        Expression::LocationPath(path) => {
            let nodes = evaluate_location_path(path, e_ctx)?;
            Ok(XPathValue::NodeSet(nodes))
        }
        Expression::FunctionCall { name, args } => {
            let mut evaluated_args = Vec::with_capacity(args.len());
            for arg in args {
                evaluated_args.push(evaluate(arg, e_ctx)?);
            }
            functions::evaluate_function(name, evaluated_args, e_ctx)
        }
        Expression::BinaryOp { left, op, right } => {
            let left_val = evaluate(left, e_ctx)?;
            let right_val = evaluate(right, e_ctx)?;
            operators::evaluate(*op, left_val, right_val)
        }
        Expression::UnaryOp { op, expr } => {
            let val = evaluate(expr, e_ctx)?;
            match op {
                UnaryOperator::Minus => Ok(XPathValue::Number(-val.to_number())),
            }
        }
    }
}

fn evaluate_location_path<'a, N>(
    path: &LocationPath,
    e_ctx: &EvaluationContext<'a, N>,
) -> Result<Vec<N>, XPathError>
where
    N: DataSourceNode<'a> + 'a,
{
    let initial_context = if let Some(start_expr) = &path.start_point {
        match evaluate(start_expr, e_ctx)? {
            XPathValue::NodeSet(nodes) => nodes,
            other => {
                return Err(XPathError::TypeError(format!(
                    "A path can only continue from a node-set, got a {}",
                    other.type_name()
                )));
            }
        }
    } else if path.is_absolute {
        vec![e_ctx.root_node]
    } else {
        vec![e_ctx.context_node]
    };

    let mut current_nodes = initial_context;
    for step in &path.steps {
        current_nodes = evaluate_step(step, &current_nodes, e_ctx)?;
    }
    Ok(current_nodes)
}

/// Evaluates one step for every context node, then merges the per-node results
/// back into document order without duplicates.
fn evaluate_step<'a, N>(
    step: &Step,
    context_nodes: &[N],
    e_ctx: &EvaluationContext<'a, N>,
) -> Result<Vec<N>, XPathError>
where
    N: DataSourceNode<'a> + 'a,
{
    let mut merged = Vec::new();
    for &node in context_nodes {
        let axis_nodes = axes::collect(step.axis, node);
        let tested = filter_by_node_test(axis_nodes, &step.node_test, step.axis);
        merged.extend(apply_predicates(tested, &step.predicates, e_ctx)?);
    }
    if context_nodes.len() > 1 || step.axis.is_reverse() {
        merged.sort();
        merged.dedup();
    }
    Ok(merged)
}

fn filter_by_node_test<'a, N>(nodes: Vec<N>, test: &NodeTest, axis: Axis) -> Vec<N>
where
    N: DataSourceNode<'a> + 'a,
{
    let principal = match axis {
        Axis::Attribute => NodeType::Attribute,
        _ => NodeType::Element,
    };
    nodes
        .into_iter()
        .filter(|node| match test {
            NodeTest::Wildcard => node.node_type() == principal,
            NodeTest::Name(name_test) => {
                node.node_type() == principal
                    && node.name().is_some_and(|q_name| {
                        q_name.local_part == name_test.local_part
                            && match &name_test.namespace {
                                Some(uri) => q_name.namespace == Some(uri.as_str()),
                                None => true,
                            }
                    })
            }
            NodeTest::NodeType(ntt) => match ntt {
                NodeTypeTest::Text => node.node_type() == NodeType::Text,
                NodeTypeTest::Comment => node.node_type() == NodeType::Comment,
                NodeTypeTest::ProcessingInstruction => {
                    node.node_type() == NodeType::ProcessingInstruction
                }
                NodeTypeTest::Node => true,
            },
        })
        .collect()
}

/// Filters nodes (in axis order) by each predicate in turn. A numeric predicate
/// result selects by proximity position.
fn apply_predicates<'a, N>(
    nodes: Vec<N>,
    predicates: &[Expression],
    e_ctx: &EvaluationContext<'a, N>,
) -> Result<Vec<N>, XPathError>
where
    N: DataSourceNode<'a> + 'a,
{
    let mut final_nodes = nodes;
    for predicate in predicates {
        let context_size = final_nodes.len();
        let mut kept = Vec::with_capacity(context_size);
        for (i, node) in final_nodes.into_iter().enumerate() {
            let predicate_ctx = EvaluationContext::new(node, e_ctx.root_node, i + 1, context_size);
            let keep = match evaluate(predicate, &predicate_ctx)? {
                XPathValue::Number(n) => n == (i + 1) as f64,
                other => other.to_bool(),
            };
            if keep {
                kept.push(node);
            }
        }
        final_nodes = kept;
    }
    Ok(final_nodes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::tests::{MockTree, TEST_NS, create_test_tree};
    use crate::namespaces::bind_namespaces;
    use crate::parser::parse_expression;
    use std::collections::HashMap;

    fn ids<'a>(tree: &'a MockTree<'a>, source: &str) -> Vec<usize> {
        let expr = parse_expression(source).unwrap();
        let e_ctx = EvaluationContext::for_node(tree.node(0));
        match evaluate(&expr, &e_ctx).unwrap() {
            XPathValue::NodeSet(nodes) => nodes.iter().map(|n| n.id).collect(),
            other => panic!("Expected a node-set for '{}', got {:?}", source, other),
        }
    }

    #[test]
    fn test_filter_by_node_test() {
        let tree = create_test_tree();
        let catalog_children = axes::collect(Axis::Child, tree.node(1));

        let elements = filter_by_node_test(catalog_children.clone(), &NodeTest::Wildcard, Axis::Child);
        assert_eq!(elements.iter().map(|n| n.id).collect::<Vec<_>>(), vec![2, 7, 9]);

        let comments = filter_by_node_test(
            catalog_children,
            &NodeTest::NodeType(NodeTypeTest::Comment),
            Axis::Child,
        );
        assert_eq!(comments.iter().map(|n| n.id).collect::<Vec<_>>(), vec![6]);
    }

    #[test]
    fn test_absolute_and_relative_paths() {
        let tree = create_test_tree();
        assert_eq!(ids(&tree, "/catalog/item"), vec![2, 9]);
        assert_eq!(ids(&tree, "catalog/item/text()"), vec![5, 10]);
        assert_eq!(ids(&tree, "//item/@sku"), vec![3]);
    }

    #[test]
    fn test_predicate_position_is_per_context_node() {
        let tree = create_test_tree();
        // Each item has exactly one text child, so [1] must keep both.
        assert_eq!(ids(&tree, "/catalog/item/text()[1]"), vec![5, 10]);
        assert_eq!(ids(&tree, "/catalog/item[2]"), vec![9]);
        assert_eq!(ids(&tree, "/catalog/item[last()]"), vec![9]);
    }

    #[test]
    fn test_predicate_by_attribute() {
        let tree = create_test_tree();
        assert_eq!(ids(&tree, "/catalog/item[@sku='A1']"), vec![2]);
        assert_eq!(ids(&tree, "/catalog/item[not(@sku)]"), vec![9]);
    }

    #[test]
    fn test_reverse_axis_positions() {
        let tree = create_test_tree();
        let expr = parse_expression("preceding-sibling::*[1]").unwrap();
        let e_ctx = EvaluationContext::for_node(tree.node(9));
        match evaluate(&expr, &e_ctx).unwrap() {
            XPathValue::NodeSet(nodes) => assert_eq!(nodes[0].id, 7),
            other => panic!("Expected a node-set, got {:?}", other),
        }
    }

    #[test]
    fn test_parent_abbreviation() {
        let tree = create_test_tree();
        let expr = parse_expression("../item").unwrap();
        let e_ctx = EvaluationContext::for_node(tree.node(7));
        match evaluate(&expr, &e_ctx).unwrap() {
            XPathValue::NodeSet(nodes) => {
                assert_eq!(nodes.iter().map(|n| n.id).collect::<Vec<_>>(), vec![2, 9])
            }
            other => panic!("Expected a node-set, got {:?}", other),
        }
    }

    #[test]
    fn test_bound_prefix_matches_namespace() {
        let tree = create_test_tree();
        let mut expr = parse_expression("/catalog/c:box").unwrap();
        let namespaces = HashMap::from([("c".to_string(), TEST_NS.to_string())]);
        bind_namespaces(&mut expr, &|p: &str| namespaces.get(p).cloned()).unwrap();
        let e_ctx = EvaluationContext::for_node(tree.node(0));
        match evaluate(&expr, &e_ctx).unwrap() {
            XPathValue::NodeSet(nodes) => assert_eq!(nodes.len(), 1),
            other => panic!("Expected a node-set, got {:?}", other),
        }

        let mut wrong = parse_expression("/catalog/c:item").unwrap();
        bind_namespaces(&mut wrong, &|p: &str| namespaces.get(p).cloned()).unwrap();
        match evaluate(&wrong, &e_ctx).unwrap() {
            XPathValue::NodeSet(nodes) => assert!(nodes.is_empty()),
            other => panic!("Expected a node-set, got {:?}", other),
        }
    }

    #[test]
    fn test_scalar_results() {
        let tree = create_test_tree();
        let e_ctx = EvaluationContext::for_node(tree.node(0));
        let count = evaluate(&parse_expression("count(//item)").unwrap(), &e_ctx).unwrap();
        assert_eq!(count.to_string(), "2");
        let sum = evaluate(&parse_expression("1 + 2 * 3").unwrap(), &e_ctx).unwrap();
        assert_eq!(sum.to_number(), 7.0);
    }
}
