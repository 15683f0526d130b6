//! Binary operator semantics, including the XPath 1.0 node-set comparison rules.

use crate::ast::BinaryOperator;
use crate::datasource::DataSourceNode;
use crate::engine::XPathValue;
use crate::error::XPathError;

pub fn evaluate<'a, N: DataSourceNode<'a>>(
    op: BinaryOperator,
    left: XPathValue<N>,
    right: XPathValue<N>,
) -> Result<XPathValue<N>, XPathError> {
    match op {
        BinaryOperator::Or => Ok(XPathValue::Boolean(left.to_bool() || right.to_bool())),
        BinaryOperator::And => Ok(XPathValue::Boolean(left.to_bool() && right.to_bool())),
        BinaryOperator::Equals
        | BinaryOperator::NotEquals
        | BinaryOperator::LessThan
        | BinaryOperator::LessThanOrEqual
        | BinaryOperator::GreaterThan
        | BinaryOperator::GreaterThanOrEqual => Ok(XPathValue::Boolean(compare(op, &left, &right))),
        BinaryOperator::Plus => Ok(XPathValue::Number(left.to_number() + right.to_number())),
        BinaryOperator::Minus => Ok(XPathValue::Number(left.to_number() - right.to_number())),
        BinaryOperator::Multiply => Ok(XPathValue::Number(left.to_number() * right.to_number())),
        BinaryOperator::Divide => Ok(XPathValue::Number(left.to_number() / right.to_number())),
        BinaryOperator::Modulo => Ok(XPathValue::Number(left.to_number() % right.to_number())),
        BinaryOperator::Union => match (left, right) {
            (XPathValue::NodeSet(mut a), XPathValue::NodeSet(b)) => {
                a.extend(b);
                a.sort();
                a.dedup();
                Ok(XPathValue::NodeSet(a))
            }
            (l, r) => Err(XPathError::TypeError(format!(
                "The union operator requires two node-sets, got {} and {}",
                l.type_name(),
                r.type_name()
            ))),
        },
    }
}

/// An operand reduced to the atoms XPath compares: each node of a node-set
/// contributes its string-value.
enum Atoms {
    Strings(Vec<String>),
    Single(Scalar),
}

#[derive(Clone)]
enum Scalar {
    String(String),
    Number(f64),
    Boolean(bool),
}

fn atoms<'a, N: DataSourceNode<'a>>(value: &XPathValue<N>) -> Atoms {
    match value {
        XPathValue::NodeSet(nodes) => Atoms::Strings(nodes.iter().map(|n| n.string_value()).collect()),
        XPathValue::String(s) => Atoms::Single(Scalar::String(s.clone())),
        XPathValue::Number(n) => Atoms::Single(Scalar::Number(*n)),
        XPathValue::Boolean(b) => Atoms::Single(Scalar::Boolean(*b)),
    }
}

fn compare<'a, N: DataSourceNode<'a>>(
    op: BinaryOperator,
    left: &XPathValue<N>,
    right: &XPathValue<N>,
) -> bool {
    // A node-set compared with a boolean compares the node-set's emptiness.
    match (left, right) {
        (XPathValue::NodeSet(_), XPathValue::Boolean(b)) => {
            return compare_scalars(op, &Scalar::Boolean(left.to_bool()), &Scalar::Boolean(*b));
        }
        (XPathValue::Boolean(b), XPathValue::NodeSet(_)) => {
            return compare_scalars(op, &Scalar::Boolean(*b), &Scalar::Boolean(right.to_bool()));
        }
        _ => {}
    }

    match (atoms(left), atoms(right)) {
        (Atoms::Strings(l), Atoms::Strings(r)) => l.iter().any(|a| {
            r.iter()
                .any(|b| compare_scalars(op, &Scalar::String(a.clone()), &Scalar::String(b.clone())))
        }),
        (Atoms::Strings(l), Atoms::Single(s)) => l
            .into_iter()
            .any(|a| compare_scalars(op, &coerce_like(a, &s), &s)),
        (Atoms::Single(s), Atoms::Strings(r)) => r
            .into_iter()
            .any(|b| compare_scalars(op, &s, &coerce_like(b, &s))),
        (Atoms::Single(l), Atoms::Single(r)) => compare_scalars(op, &l, &r),
    }
}

/// Converts a node string-value to the type of the scalar it is compared with.
fn coerce_like(value: String, other: &Scalar) -> Scalar {
    match other {
        Scalar::Number(_) => Scalar::Number(string_to_number(&value)),
        Scalar::Boolean(_) => Scalar::Boolean(!value.is_empty()),
        Scalar::String(_) => Scalar::String(value),
    }
}

fn scalar_to_number(s: &Scalar) -> f64 {
    match s {
        Scalar::Number(n) => *n,
        Scalar::String(s) => string_to_number(s),
        Scalar::Boolean(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
    }
}

pub(crate) fn string_to_number(s: &str) -> f64 {
    s.trim().parse().unwrap_or(f64::NAN)
}

fn compare_scalars(op: BinaryOperator, left: &Scalar, right: &Scalar) -> bool {
    match op {
        BinaryOperator::Equals | BinaryOperator::NotEquals => {
            let equal = match (left, right) {
                (Scalar::Boolean(_), _) | (_, Scalar::Boolean(_)) => {
                    scalar_to_bool(left) == scalar_to_bool(right)
                }
                (Scalar::Number(_), _) | (_, Scalar::Number(_)) => {
                    scalar_to_number(left) == scalar_to_number(right)
                }
                (Scalar::String(a), Scalar::String(b)) => a == b,
            };
            if op == BinaryOperator::Equals { equal } else { !equal }
        }
        _ => {
            let (l, r) = (scalar_to_number(left), scalar_to_number(right));
            match op {
                BinaryOperator::LessThan => l < r,
                BinaryOperator::LessThanOrEqual => l <= r,
                BinaryOperator::GreaterThan => l > r,
                BinaryOperator::GreaterThanOrEqual => l >= r,
                _ => false,
            }
        }
    }
}

fn scalar_to_bool(s: &Scalar) -> bool {
    match s {
        Scalar::Boolean(b) => *b,
        Scalar::Number(n) => *n != 0.0 && !n.is_nan(),
        Scalar::String(s) => !s.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::tests::{MockNode, create_test_tree};

    type Value<'a> = XPathValue<MockNode<'a>>;

    #[test]
    fn test_node_set_equals_string_matches_any_member() {
        let tree = create_test_tree();
        let items: Value = XPathValue::NodeSet(vec![tree.node(2), tree.node(9)]);
        let gadget: Value = XPathValue::String("Gadget".into());
        let result = evaluate(BinaryOperator::Equals, items, gadget).unwrap();
        assert!(result.to_bool());
    }

    #[test]
    fn test_number_comparison_coerces_strings() {
        let result: Value = evaluate(
            BinaryOperator::LessThan,
            XPathValue::String("2".into()),
            XPathValue::Number(10.0),
        )
        .unwrap();
        assert!(result.to_bool());
    }

    #[test]
    fn test_empty_node_set_never_equals() {
        let empty: Value = XPathValue::NodeSet(vec![]);
        let result = evaluate(BinaryOperator::Equals, empty, XPathValue::String("".into())).unwrap();
        assert!(!result.to_bool());
    }

    #[test]
    fn test_union_sorts_and_dedups() {
        let tree = create_test_tree();
        let left: Value = XPathValue::NodeSet(vec![tree.node(9), tree.node(2)]);
        let right: Value = XPathValue::NodeSet(vec![tree.node(2)]);
        match evaluate(BinaryOperator::Union, left, right).unwrap() {
            XPathValue::NodeSet(nodes) => {
                assert_eq!(nodes.iter().map(|n| n.id).collect::<Vec<_>>(), vec![2, 9])
            }
            other => panic!("Expected a node-set, got {:?}", other),
        }
    }

    #[test]
    fn test_union_of_scalars_is_a_type_error() {
        let result: Result<Value, _> = evaluate(
            BinaryOperator::Union,
            XPathValue::Number(1.0),
            XPathValue::Number(2.0),
        );
        assert!(matches!(result, Err(XPathError::TypeError(_))));
    }
}
