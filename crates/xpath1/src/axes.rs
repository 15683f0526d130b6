//! Pure functions collecting the nodes along each XPath axis.
//!
//! Every collector returns nodes in *axis order*: document order for forward
//! axes, nearest-first for reverse axes. Predicate positions are counted in
//! this order; the engine restores document order afterwards.

use crate::ast::Axis;
use crate::datasource::DataSourceNode;

pub fn collect<'a, N: DataSourceNode<'a>>(axis: Axis, node: N) -> Vec<N> {
    let mut results = Vec::new();
    match axis {
        Axis::Child => results.extend(node.children()),
        Axis::Attribute => results.extend(node.attributes()),
        Axis::Descendant => collect_descendants(node, &mut results),
        Axis::DescendantOrSelf => {
            results.push(node);
            collect_descendants(node, &mut results);
        }
        Axis::Parent => results.extend(node.parent()),
        Axis::Ancestor => collect_ancestors(node, &mut results),
        Axis::AncestorOrSelf => {
            results.push(node);
            collect_ancestors(node, &mut results);
        }
        Axis::SelfAxis => results.push(node),
        Axis::FollowingSibling => collect_following_siblings(node, &mut results),
        Axis::PrecedingSibling => collect_preceding_siblings(node, &mut results),
        Axis::Following => collect_following(node, &mut results),
        Axis::Preceding => collect_preceding(node, &mut results),
    }
    results
}

/// Pre-order walk, so descendants come out in document order.
fn collect_descendants<'a, N: DataSourceNode<'a>>(node: N, results: &mut Vec<N>) {
    for child in node.children() {
        results.push(child);
        collect_descendants(child, results);
    }
}

fn collect_ancestors<'a, N: DataSourceNode<'a>>(node: N, results: &mut Vec<N>) {
    let mut current = node.parent();
    while let Some(p) = current {
        results.push(p);
        current = p.parent();
    }
}

fn collect_following_siblings<'a, N: DataSourceNode<'a>>(node: N, results: &mut Vec<N>) {
    if let Some(parent) = node.parent() {
        results.extend(parent.children().skip_while(|s| *s != node).skip(1));
    }
}

fn collect_preceding_siblings<'a, N: DataSourceNode<'a>>(node: N, results: &mut Vec<N>) {
    if let Some(parent) = node.parent() {
        let mut siblings: Vec<N> = parent.children().take_while(|s| *s != node).collect();
        siblings.reverse();
        results.extend(siblings);
    }
}

fn collect_following<'a, N: DataSourceNode<'a>>(node: N, results: &mut Vec<N>) {
    let mut current = Some(node);
    while let Some(c) = current {
        let parent = c.parent();
        if let Some(p) = parent {
            for sibling in p.children().skip_while(|s| *s != c).skip(1) {
                results.push(sibling);
                collect_descendants(sibling, results);
            }
        }
        current = parent;
    }
}

fn collect_preceding<'a, N: DataSourceNode<'a>>(node: N, results: &mut Vec<N>) {
    let ancestors: Vec<N> = {
        let mut a = Vec::new();
        collect_ancestors(node, &mut a);
        a
    };
    let mut in_document_order = Vec::new();
    let mut current = Some(node);
    while let Some(c) = current {
        let parent = c.parent();
        if let Some(p) = parent {
            let mut chunk = Vec::new();
            for sibling in p.children().take_while(|s| *s != c) {
                chunk.push(sibling);
                collect_descendants(sibling, &mut chunk);
            }
            // Earlier levels precede later ones, so prepend.
            chunk.extend(in_document_order);
            in_document_order = chunk;
        }
        current = parent;
    }
    in_document_order.retain(|n| !ancestors.contains(n));
    in_document_order.reverse();
    results.extend(in_document_order);
}
