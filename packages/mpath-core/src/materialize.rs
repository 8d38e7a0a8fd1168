//! Single-pass folding of flat node sets into nested trees. Pure, no store access.

use std::collections::{BTreeMap, HashMap};

use crate::node::Node;
use crate::path::Path;

#[cfg(feature = "serde")]
use crate::error::{Error, Result};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

struct Links {
    top: Vec<usize>,
    children: Vec<Vec<usize>>,
}

/// Attaches every node to its parent when the parent is part of the input. Nodes without a
/// parent in the input are top-level only at the minimum level present; deeper orphans are
/// dropped.
fn link(nodes: &[Node]) -> Links {
    let mut index: HashMap<&Path, usize> = HashMap::with_capacity(nodes.len());
    let mut min_level: Option<usize> = None;
    for (i, node) in nodes.iter().enumerate() {
        index.insert(node.path(), i);
        let level = node.level();
        min_level = Some(min_level.map_or(level, |m| m.min(level)));
    }

    let mut top = Vec::new();
    let mut children = vec![Vec::new(); nodes.len()];
    for (i, node) in nodes.iter().enumerate() {
        match node.path().parent().and_then(|p| index.get(&p).copied()) {
            Some(parent) => children[parent].push(i),
            None if Some(node.level()) == min_level => top.push(i),
            None => {}
        }
    }
    Links { top, children }
}

fn build(i: usize, slots: &mut [Option<Node>], children: &[Vec<usize>]) -> Option<Node> {
    let mut node = slots[i].take()?;
    let kids = children[i]
        .iter()
        .filter_map(|&c| build(c, slots, children))
        .collect();
    node.set_children(kids);
    Some(node)
}

/// Folds `nodes` into top-level nodes whose `cached_children` hold the rest of the tree.
///
/// Sibling order follows input order, so sort the input to get sorted trees. Runs in
/// O(n) time and space.
pub fn materialize(nodes: impl IntoIterator<Item = Node>) -> Vec<Node> {
    let nodes: Vec<Node> = nodes.into_iter().collect();
    let links = link(&nodes);
    let mut slots: Vec<Option<Node>> = nodes.into_iter().map(Some).collect();
    links
        .top
        .iter()
        .filter_map(|&i| build(i, &mut slots, &links.children))
        .collect()
}

/// A node and its children keyed by label.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Nested {
    pub node: Node,
    pub children: BTreeMap<String, Nested>,
}

fn build_nested(
    i: usize,
    slots: &mut [Option<Node>],
    children: &[Vec<usize>],
) -> Option<Nested> {
    let mut node = slots[i].take()?;
    node.clear_children();
    let mut nested = BTreeMap::new();
    for &c in &children[i] {
        if let Some(child) = build_nested(c, slots, children) {
            nested.insert(child.node.label.clone(), child);
        }
    }
    Some(Nested {
        node,
        children: nested,
    })
}

/// Dictionary form of [`materialize`].
///
/// Top-level entries are keyed by full path (their labels may repeat when the input spans
/// several parents); entries below are keyed by label, which is unique among siblings.
pub fn nest(nodes: impl IntoIterator<Item = Node>) -> BTreeMap<String, Nested> {
    let nodes: Vec<Node> = nodes.into_iter().collect();
    let links = link(&nodes);
    let mut slots: Vec<Option<Node>> = nodes.into_iter().map(Some).collect();
    let mut out = BTreeMap::new();
    for &i in &links.top {
        if let Some(entry) = build_nested(i, &mut slots, &links.children) {
            out.insert(entry.node.path().to_string(), entry);
        }
    }
    out
}

/// JSON form of [`nest`]. Encoder failures surface as `Error::Storage`, like every other
/// serializer fault; `Nested` holds only strings and integers.
#[cfg(feature = "serde")]
pub fn nest_to_json(nested: &BTreeMap<String, Nested>) -> Result<serde_json::Value> {
    serde_json::to_value(nested).map_err(|e| Error::Storage(e.to_string()))
}

/// Joins node labels with `separator`, e.g. ancestors into a breadcrumb.
pub fn tree_path<'a>(nodes: impl IntoIterator<Item = &'a Node>, separator: &str) -> String {
    nodes
        .into_iter()
        .map(|n| n.label.as_str())
        .collect::<Vec<_>>()
        .join(separator)
}
