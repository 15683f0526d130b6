//! Built-in implementations of the XPath 1.0 core function library.

use super::engine::{EvaluationContext, XPathValue};
use crate::datasource::{DataSourceNode, NodeType};
use crate::error::XPathError;
use crate::operators::string_to_number;

const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Dispatches a function call to the correct implementation.
pub fn evaluate_function<'a, N: DataSourceNode<'a>>(
    name: &str,
    args: Vec<XPathValue<N>>,
    e_ctx: &EvaluationContext<'a, N>,
) -> Result<XPathValue<N>, XPathError> {
    match name {
        // Node-set
        "count" => {
            let [nodes] = exact::<N, 1>(name, args)?;
            Ok(XPathValue::Number(node_set(name, nodes)?.len() as f64))
        }
        "position" => {
            exact::<N, 0>(name, args)?;
            Ok(XPathValue::Number(e_ctx.context_position as f64))
        }
        "last" => {
            exact::<N, 0>(name, args)?;
            Ok(XPathValue::Number(e_ctx.context_size as f64))
        }
        // Expanded names carry no prefix, so `name()` also yields the local part.
        "local-name" | "name" => {
            let node = optional_node(name, args, e_ctx)?;
            let local = node
                .and_then(|n| n.name().map(|q| q.local_part.to_string()))
                .unwrap_or_default();
            Ok(XPathValue::String(local))
        }
        "namespace-uri" => {
            let node = optional_node(name, args, e_ctx)?;
            let uri = node
                .and_then(|n| n.name().and_then(|q| q.namespace.map(str::to_string)))
                .unwrap_or_default();
            Ok(XPathValue::String(uri))
        }

        // String
        "string" => Ok(XPathValue::String(optional_string(name, args, e_ctx)?)),
        "concat" => {
            if args.len() < 2 {
                return Err(arity_error(name, "at least 2 arguments"));
            }
            Ok(XPathValue::String(args.iter().map(|v| v.to_string()).collect()))
        }
        "starts-with" => {
            let [s1, s2] = exact::<N, 2>(name, args)?;
            Ok(XPathValue::Boolean(s1.to_string().starts_with(&s2.to_string())))
        }
        "contains" => {
            let [s1, s2] = exact::<N, 2>(name, args)?;
            Ok(XPathValue::Boolean(s1.to_string().contains(&s2.to_string())))
        }
        "substring-before" => {
            let [s1, s2] = exact::<N, 2>(name, args)?;
            let (s1, s2) = (s1.to_string(), s2.to_string());
            let before = s1.find(&s2).map(|i| &s1[..i]).unwrap_or_default();
            Ok(XPathValue::String(before.to_string()))
        }
        "substring-after" => {
            let [s1, s2] = exact::<N, 2>(name, args)?;
            let (s1, s2) = (s1.to_string(), s2.to_string());
            let after = s1.find(&s2).map(|i| &s1[i + s2.len()..]).unwrap_or_default();
            Ok(XPathValue::String(after.to_string()))
        }
        "substring" => substring(args),
        "string-length" => {
            let s = optional_string(name, args, e_ctx)?;
            Ok(XPathValue::Number(s.chars().count() as f64))
        }
        "normalize-space" => {
            let s = optional_string(name, args, e_ctx)?;
            Ok(XPathValue::String(s.split_whitespace().collect::<Vec<_>>().join(" ")))
        }
        "translate" => {
            let [source, from, to] = exact::<N, 3>(name, args)?;
            let from: Vec<char> = from.to_string().chars().collect();
            let to: Vec<char> = to.to_string().chars().collect();
            let result = source
                .to_string()
                .chars()
                .filter_map(|c| match from.iter().position(|&fc| fc == c) {
                    Some(pos) => to.get(pos).copied(),
                    None => Some(c),
                })
                .collect();
            Ok(XPathValue::String(result))
        }

        // Boolean
        "boolean" => {
            let [value] = exact::<N, 1>(name, args)?;
            Ok(XPathValue::Boolean(value.to_bool()))
        }
        "not" => {
            let [value] = exact::<N, 1>(name, args)?;
            Ok(XPathValue::Boolean(!value.to_bool()))
        }
        "true" => {
            exact::<N, 0>(name, args)?;
            Ok(XPathValue::Boolean(true))
        }
        "false" => {
            exact::<N, 0>(name, args)?;
            Ok(XPathValue::Boolean(false))
        }
        "lang" => {
            let [lang] = exact::<N, 1>(name, args)?;
            Ok(XPathValue::Boolean(lang_matches(&lang.to_string(), e_ctx.context_node)))
        }

        // Number
        "number" => {
            let n = match args.len() {
                0 => string_to_number(&e_ctx.context_node.string_value()),
                1 => args[0].to_number(),
                _ => return Err(arity_error(name, "0 or 1 arguments")),
            };
            Ok(XPathValue::Number(n))
        }
        "sum" => {
            let [nodes] = exact::<N, 1>(name, args)?;
            let sum = node_set(name, nodes)?
                .iter()
                .map(|node| string_to_number(&node.string_value()))
                .sum();
            Ok(XPathValue::Number(sum))
        }
        "floor" => {
            let [n] = exact::<N, 1>(name, args)?;
            Ok(XPathValue::Number(n.to_number().floor()))
        }
        "ceiling" => {
            let [n] = exact::<N, 1>(name, args)?;
            Ok(XPathValue::Number(n.to_number().ceil()))
        }
        "round" => {
            let [n] = exact::<N, 1>(name, args)?;
            let n = n.to_number();
            if n.is_nan() || n.is_infinite() || n == 0.0 {
                return Ok(XPathValue::Number(n));
            }
            // Halves round towards positive infinity.
            Ok(XPathValue::Number((n + 0.5).floor()))
        }

        _ => Err(XPathError::FunctionError {
            function: name.to_string(),
            message: "Unknown function".to_string(),
        }),
    }
}

fn arity_error(function: &str, expected: &str) -> XPathError {
    XPathError::FunctionError {
        function: format!("{}()", function),
        message: format!("Expected {}", expected),
    }
}

/// Checks the argument count and hands the arguments back as an array.
fn exact<N, const ARITY: usize>(
    function: &str,
    args: Vec<XPathValue<N>>,
) -> Result<[XPathValue<N>; ARITY], XPathError> {
    args.try_into().map_err(|_: Vec<XPathValue<N>>| {
        let plural = if ARITY == 1 { "" } else { "s" };
        arity_error(function, &format!("{} argument{}", ARITY, plural))
    })
}

fn node_set<N>(function: &str, value: XPathValue<N>) -> Result<Vec<N>, XPathError> {
    match value {
        XPathValue::NodeSet(nodes) => Ok(nodes),
        XPathValue::String(_) | XPathValue::Number(_) | XPathValue::Boolean(_) => {
            Err(XPathError::TypeError(format!(
                "{}() argument must be a node-set",
                function
            )))
        }
    }
}

/// The first node of the optional node-set argument, or the context node.
fn optional_node<'a, N: DataSourceNode<'a>>(
    function: &str,
    mut args: Vec<XPathValue<N>>,
    e_ctx: &EvaluationContext<'a, N>,
) -> Result<Option<N>, XPathError> {
    match args.len() {
        0 => Ok(Some(e_ctx.context_node)),
        1 => Ok(node_set(function, args.remove(0))?.first().copied()),
        _ => Err(arity_error(function, "0 or 1 arguments")),
    }
}

/// The string value of the optional argument, or of the context node.
fn optional_string<'a, N: DataSourceNode<'a>>(
    function: &str,
    args: Vec<XPathValue<N>>,
    e_ctx: &EvaluationContext<'a, N>,
) -> Result<String, XPathError> {
    match args.as_slice() {
        [] => Ok(e_ctx.context_node.string_value()),
        [value] => Ok(value.to_string()),
        _ => Err(arity_error(function, "0 or 1 arguments")),
    }
}

fn substring<'a, N: DataSourceNode<'a>>(
    args: Vec<XPathValue<N>>,
) -> Result<XPathValue<N>, XPathError> {
    let (s, start, length) = match args.as_slice() {
        [s, start] => (s.to_string(), start.to_number(), None),
        [s, start, length] => (s.to_string(), start.to_number(), Some(length.to_number())),
        _ => return Err(arity_error("substring", "2 or 3 arguments")),
    };

    let first = (start + 0.5).floor();
    let last = length.map_or(f64::INFINITY, |l| first + (l + 0.5).floor());

    let result = s
        .chars()
        .enumerate()
        .filter_map(|(i, c)| {
            let pos = (i + 1) as f64;
            (pos >= first && pos < last).then_some(c)
        })
        .collect();
    Ok(XPathValue::String(result))
}

/// Walks up from the context node to the nearest `xml:lang` and compares it,
/// accepting sub-language codes (`en` matches `en-GB`).
fn lang_matches<'a, N: DataSourceNode<'a>>(test_lang: &str, context: N) -> bool {
    let test_lang = test_lang.to_lowercase();
    let mut current = Some(context);
    if context.node_type() != NodeType::Element {
        current = context.parent();
    }

    while let Some(node) = current {
        let lang = node.attributes().find(|attr| {
            attr.name()
                .is_some_and(|q| q.namespace == Some(XML_NAMESPACE) && q.local_part == "lang")
        });
        if let Some(attr) = lang {
            let node_lang = attr.string_value().to_lowercase();
            return node_lang == test_lang || node_lang.starts_with(&format!("{}-", test_lang));
        }
        current = node.parent();
    }
    false
}
