//! Axis traversal. Every function returns nodes in proximity order, so reverse
//! axes yield the nearest node first.

use crate::ast::Axis;
use crate::datasource::{DataSourceNode, NodeType};

pub fn collect<'a, N: DataSourceNode<'a> + 'a>(axis: Axis, node: N) -> Vec<N> {
    match axis {
        Axis::Child => node.children().collect(),
        Axis::Attribute => {
            if node.node_type() == NodeType::Element {
                node.attributes().collect()
            } else {
                Vec::new()
            }
        }
        Axis::SelfAxis => vec![node],
        Axis::Parent => node.parent().into_iter().collect(),
        Axis::Descendant => {
            let mut out = Vec::new();
            push_descendants(node, &mut out);
            out
        }
        Axis::DescendantOrSelf => {
            let mut out = vec![node];
            push_descendants(node, &mut out);
            out
        }
        Axis::Ancestor => ancestors(node),
        Axis::AncestorOrSelf => {
            let mut out = vec![node];
            out.extend(ancestors(node));
            out
        }
        Axis::FollowingSibling => siblings(node, true),
        Axis::PrecedingSibling => siblings(node, false),
        Axis::Following => following(node),
        Axis::Preceding => preceding(node),
        // Namespace nodes are not part of the data model exposed by `DataSourceNode`.
        Axis::Namespace => Vec::new(),
    }
}

fn push_descendants<'a, N: DataSourceNode<'a> + 'a>(node: N, out: &mut Vec<N>) {
    for child in node.children() {
        out.push(child);
        push_descendants(child, out);
    }
}

fn ancestors<'a, N: DataSourceNode<'a> + 'a>(node: N) -> Vec<N> {
    let mut out = Vec::new();
    let mut current = node.parent();
    while let Some(parent) = current {
        out.push(parent);
        current = parent.parent();
    }
    out
}

fn is_attribute<'a, N: DataSourceNode<'a>>(node: N) -> bool {
    node.node_type() == NodeType::Attribute
}

fn siblings<'a, N: DataSourceNode<'a> + 'a>(node: N, following: bool) -> Vec<N> {
    if is_attribute(node) {
        return Vec::new();
    }
    let Some(parent) = node.parent() else {
        return Vec::new();
    };
    let all: Vec<N> = parent.children().collect();
    let Some(index) = all.iter().position(|n| *n == node) else {
        return Vec::new();
    };
    if following {
        all[index + 1..].to_vec()
    } else {
        all[..index].iter().rev().copied().collect()
    }
}

fn following<'a, N: DataSourceNode<'a> + 'a>(node: N) -> Vec<N> {
    // An attribute's following nodes start with its owner's children.
    let mut out = Vec::new();
    let mut anchor = node;
    if is_attribute(node) {
        if let Some(owner) = node.parent() {
            push_descendants(owner, &mut out);
            anchor = owner;
        }
    }
    let mut current = Some(anchor);
    while let Some(n) = current {
        for sibling in siblings(n, true) {
            out.push(sibling);
            push_descendants(sibling, &mut out);
        }
        current = n.parent();
    }
    out
}

fn preceding<'a, N: DataSourceNode<'a> + 'a>(node: N) -> Vec<N> {
    let anchor = if is_attribute(node) {
        match node.parent() {
            Some(owner) => owner,
            None => return Vec::new(),
        }
    } else {
        node
    };
    let ancestors = ancestors(anchor);
    let Some(root) = ancestors.last().copied().or(Some(anchor)) else {
        return Vec::new();
    };
    let mut all = Vec::new();
    push_descendants(root, &mut all);
    let mut out: Vec<N> = all
        .into_iter()
        .filter(|n| *n < anchor && !ancestors.contains(n))
        .collect();
    out.reverse();
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::tests::create_test_tree;

    fn ids<'a>(nodes: Vec<crate::datasource::tests::MockNode<'a>>) -> Vec<usize> {
        nodes.into_iter().map(|n| n.id).collect()
    }

    #[test]
    fn test_forward_axes() {
        let tree = create_test_tree();
        assert_eq!(ids(collect(Axis::Child, tree.node(1))), vec![2, 6, 7, 8, 9]);
        assert_eq!(ids(collect(Axis::Descendant, tree.node(1))), vec![2, 5, 6, 7, 8, 9, 10]);
        assert_eq!(ids(collect(Axis::Attribute, tree.node(2))), vec![3, 4]);
        assert_eq!(ids(collect(Axis::FollowingSibling, tree.node(7))), vec![8, 9]);
        assert_eq!(ids(collect(Axis::Following, tree.node(5))), vec![6, 7, 8, 9, 10]);
    }

    #[test]
    fn test_reverse_axes_are_nearest_first() {
        let tree = create_test_tree();
        assert_eq!(ids(collect(Axis::Ancestor, tree.node(5))), vec![2, 1, 0]);
        assert_eq!(ids(collect(Axis::PrecedingSibling, tree.node(9))), vec![8, 7, 6, 2]);
        assert_eq!(ids(collect(Axis::Preceding, tree.node(7))), vec![6, 5, 2]);
    }

    #[test]
    fn test_attribute_has_no_siblings() {
        let tree = create_test_tree();
        assert!(collect(Axis::FollowingSibling, tree.node(3)).is_empty());
        assert_eq!(ids(collect(Axis::Parent, tree.node(3))), vec![2]);
        assert_eq!(ids(collect(Axis::Following, tree.node(3))), vec![5, 6, 7, 8, 9, 10]);
    }
}
