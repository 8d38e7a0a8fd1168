use crate::error::Result;
use crate::ids::NodeId;
use crate::path::{validate_label, Path};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A row of a materialized-path table.
///
/// `path` is always derived from `parent` and `label`; it has no public setter. Only the
/// repository (on save) and the move engine rewrite it.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Node {
    id: Option<NodeId>,
    pub label: String,
    path: Path,
    /// Path of the parent node, `None` for roots.
    pub parent: Option<Path>,
    /// Children assembled by the tree materializer. A throwaway view, never written back.
    #[cfg_attr(feature = "serde", serde(skip))]
    children: Option<Vec<Node>>,
}

impl Node {
    /// An unsaved node. Persist it with `TreeRepository::save`.
    pub fn new(label: &str, parent: Option<&Path>) -> Result<Self> {
        let path = Path::derive(parent, label)?;
        Ok(Self {
            id: None,
            label: label.to_string(),
            path,
            parent: parent.cloned(),
            children: None,
        })
    }

    /// Rebuilds a node from a stored row. Stores call this; the row is trusted as-is.
    pub fn from_row(id: NodeId, label: String, path: Path, parent: Option<Path>) -> Self {
        Self {
            id: Some(id),
            label,
            path,
            parent,
            children: None,
        }
    }

    pub fn id(&self) -> Option<NodeId> {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn level(&self) -> usize {
        self.path.level()
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Points this node at a new parent without touching the store.
    pub fn set_parent(&mut self, parent: Option<&Node>) {
        self.parent = parent.map(|p| p.path.clone());
    }

    /// `parent ++ label` from the node's current fields.
    pub fn derived_path(&self) -> Result<Path> {
        validate_label(&self.label)?;
        Path::derive(self.parent.as_ref(), &self.label)
    }

    /// Children cached by the tree materializer, if this node came out of one.
    pub fn cached_children(&self) -> Option<&[Node]> {
        self.children.as_deref()
    }

    pub fn into_cached_children(self) -> Option<Vec<Node>> {
        self.children
    }

    /// `false` against no node.
    pub fn is_ancestor_of(&self, other: Option<&Node>, include_self: bool) -> bool {
        match other {
            Some(other) => self.path.is_ancestor_of(&other.path, include_self),
            None => false,
        }
    }

    /// `true` against no node: a missing node behaves like a universal root above every tree.
    pub fn is_descendant_of(&self, other: Option<&Node>, include_self: bool) -> bool {
        match other {
            Some(other) => self.path.is_descendant_of(&other.path, include_self),
            None => true,
        }
    }

    pub(crate) fn assign(&mut self, id: NodeId, path: Path) {
        self.id = Some(id);
        self.path = path;
        self.children = None;
    }

    pub(crate) fn relocate(&mut self, parent: Option<Path>, path: Path) {
        self.parent = parent;
        self.path = path;
        self.children = None;
    }

    pub(crate) fn set_children(&mut self, children: Vec<Node>) {
        self.children = Some(children);
    }

    pub(crate) fn clear_children(&mut self) {
        self.children = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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
    fn none_is_a_universal_ancestor() {
        let a = node(1, "a");
        assert!(!a.is_ancestor_of(None, false));
        assert!(!a.is_ancestor_of(None, true));
        assert!(a.is_descendant_of(None, false));
        assert!(a.is_descendant_of(None, true));
    }

    #[test]
    fn ancestor_and_descendant_are_symmetric() {
        let a = node(1, "a");
        let aa = node(2, "a.a");
        let b = node(3, "b");
        for (x, y) in [(&a, &aa), (&aa, &a), (&a, &b), (&b, &aa), (&a, &a)] {
            assert_eq!(x.is_ancestor_of(Some(y), false), y.is_descendant_of(Some(x), false));
            assert_eq!(x.is_ancestor_of(Some(y), true), y.is_descendant_of(Some(x), true));
        }
        assert!(a.is_ancestor_of(Some(&aa), false));
        assert!(!a.is_ancestor_of(Some(&a), false));
        assert!(a.is_ancestor_of(Some(&a), true));
        assert!(!a.is_ancestor_of(Some(&b), true));
    }

    #[test]
    fn derived_path_follows_parent_and_label() {
        let a = node(1, "a");
        let mut child = Node::new("x", None).unwrap();
        child.set_parent(Some(&a));
        assert_eq!(child.derived_path().unwrap().as_str(), "a.x");
        child.label.clear();
        assert!(child.derived_path().is_err());
    }
}
