//! Typed query builder over path predicates, and the read façade of the repository.

use std::cmp::Ordering;

use crate::error::Result;
use crate::materialize::materialize;
use crate::node::Node;
use crate::path::Path;
use crate::pattern::PathPattern;
use crate::repository::TreeRepository;
use crate::traits::NodeStore;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Predicate {
    /// Direct children of the path (`path ~ 'p.*{1}'`).
    ChildOf(Path),
    /// The path and everything below it (`path <@ p`).
    DescendantOrEqual(Path),
    /// The path and everything above it (`path @> p`).
    AncestorOrEqual(Path),
    /// Arbitrary lquery pattern (`path ~ q`).
    Matches(PathPattern),
    /// Rows whose parent link equals the given path, or roots for `None`.
    ParentIs(Option<Path>),
    Level(usize),
    PathIs(Path),
    PathIsNot(Path),
}

impl Predicate {
    pub fn accepts(&self, node: &Node) -> bool {
        let path = node.path();
        match self {
            Predicate::ChildOf(p) => path.parent().as_ref() == Some(p),
            Predicate::DescendantOrEqual(p) => path.is_descendant_of(p, true),
            Predicate::AncestorOrEqual(p) => path.is_ancestor_of(p, true),
            Predicate::Matches(pattern) => pattern.matches(path),
            Predicate::ParentIs(parent) => node.parent.as_ref() == parent.as_ref(),
            Predicate::Level(level) => path.level() == *level,
            Predicate::PathIs(p) => path == p,
            Predicate::PathIsNot(p) => path != p,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderBy {
    Path,
    /// Label first, ties broken by path.
    Label,
}

/// Conjunction of predicates plus an optional ordering. Without an ordering, results come
/// back in whatever order the store produces.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NodeQuery {
    predicates: Vec<Predicate>,
    order: Option<OrderBy>,
}

impl NodeQuery {
    /// Matches every row.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn child_of(self, path: &Path) -> Self {
        self.filter(Predicate::ChildOf(path.clone()))
    }

    pub fn descendant_or_equal(self, path: &Path) -> Self {
        self.filter(Predicate::DescendantOrEqual(path.clone()))
    }

    pub fn ancestor_or_equal(self, path: &Path) -> Self {
        self.filter(Predicate::AncestorOrEqual(path.clone()))
    }

    pub fn matches(self, pattern: PathPattern) -> Self {
        self.filter(Predicate::Matches(pattern))
    }

    pub fn parent_is(self, parent: Option<&Path>) -> Self {
        self.filter(Predicate::ParentIs(parent.cloned()))
    }

    pub fn level(self, level: usize) -> Self {
        self.filter(Predicate::Level(level))
    }

    pub fn path_is(self, path: &Path) -> Self {
        self.filter(Predicate::PathIs(path.clone()))
    }

    pub fn exclude(self, path: &Path) -> Self {
        self.filter(Predicate::PathIsNot(path.clone()))
    }

    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order = Some(order);
        self
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn order(&self) -> Option<OrderBy> {
        self.order
    }

    pub fn accepts(&self, node: &Node) -> bool {
        self.predicates.iter().all(|p| p.accepts(node))
    }

    /// Applies the requested ordering in memory; a no-op for unordered queries.
    pub fn sort(&self, nodes: &mut [Node]) {
        match self.order {
            None => {}
            Some(OrderBy::Path) => nodes.sort_by(|a, b| a.path().cmp(b.path())),
            Some(OrderBy::Label) => nodes.sort_by(|a, b| match a.label.cmp(&b.label) {
                Ordering::Equal => a.path().cmp(b.path()),
                other => other,
            }),
        }
    }
}

impl<S: NodeStore> TreeRepository<S> {
    pub fn query(&self, query: &NodeQuery) -> Result<Vec<Node>> {
        self.store().select(query)
    }

    pub fn roots(&self) -> Result<Vec<Node>> {
        self.query(&NodeQuery::all().parent_is(None))
    }

    /// Direct children of `node`, always read from the store.
    pub fn children(&self, node: &Node) -> Result<Vec<Node>> {
        self.query(&NodeQuery::all().child_of(node.path()))
    }

    pub fn descendants(&self, node: &Node, include_self: bool) -> Result<Vec<Node>> {
        let mut query = NodeQuery::all().descendant_or_equal(node.path());
        if !include_self {
            query = query.exclude(node.path());
        }
        self.query(&query)
    }

    pub fn ancestors(&self, node: &Node, include_self: bool) -> Result<Vec<Node>> {
        let mut query = NodeQuery::all().ancestor_or_equal(node.path());
        if !include_self {
            query = query.exclude(node.path());
        }
        self.query(&query)
    }

    /// Nodes sharing `node`'s parent link; for a root, the other roots.
    pub fn siblings(&self, node: &Node, include_self: bool) -> Result<Vec<Node>> {
        let mut query = NodeQuery::all().parent_is(node.parent.as_ref());
        if !include_self {
            query = query.exclude(node.path());
        }
        self.query(&query)
    }

    /// Runs `query` once and folds the result into top-level nodes with cached children.
    pub fn cached_trees(&self, query: &NodeQuery) -> Result<Vec<Node>> {
        Ok(materialize(self.query(query)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::NodeId;

    fn node(id: i64, path: &str) -> Node {
        let path = Path::parse(path).unwrap();
        Node::from_row(
            NodeId(id),
            path.last_label().to_string(),
            path.clone(),
            path.parent(),
        )
    }

    #[test]
    fn predicates_follow_path_algebra() {
        let a = Path::parse("a").unwrap();
        let ab = node(2, "a.b");
        let abc = node(3, "a.b.c");

        assert!(Predicate::ChildOf(a.clone()).accepts(&ab));
        assert!(!Predicate::ChildOf(a.clone()).accepts(&abc));
        assert!(Predicate::DescendantOrEqual(a.clone()).accepts(&abc));
        assert!(Predicate::AncestorOrEqual(abc.path().clone()).accepts(&ab));
        assert!(!Predicate::AncestorOrEqual(a.clone()).accepts(&ab));
        assert!(Predicate::ParentIs(Some(a.clone())).accepts(&ab));
        assert!(Predicate::ParentIs(None).accepts(&node(1, "a")));
        assert!(Predicate::Level(2).accepts(&abc));
        assert!(Predicate::Matches(a.subtree_pattern()).accepts(&abc));
    }

    #[test]
    fn label_order_breaks_ties_by_path() {
        let mut nodes = vec![node(1, "b.x"), node(2, "a.y"), node(3, "a.x")];
        NodeQuery::all().order_by(OrderBy::Label).sort(&mut nodes);
        let paths: Vec<_> = nodes.iter().map(|n| n.path().to_string()).collect();
        assert_eq!(paths, vec!["a.x", "b.x", "a.y"]);
    }
}
