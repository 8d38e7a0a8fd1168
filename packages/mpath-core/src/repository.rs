use std::collections::HashMap;

use tracing::debug;

use crate::error::{Error, Result};
use crate::ids::NodeId;
use crate::node::Node;
use crate::path::Path;
use crate::query::NodeQuery;
use crate::traits::{in_transaction, NodeStore};

/// Invariant-enforcing write path over a [`NodeStore`].
///
/// Paths are always derived from `(parent, label)` here; a caller-supplied path is never
/// written. Reads live in [`crate::query`], subtree moves in [`crate::moves`].
pub struct TreeRepository<S> {
    store: S,
}

fn require_id(node: &Node) -> Result<NodeId> {
    node.id()
        .ok_or_else(|| Error::Validation(format!("node {} has not been saved", node.path())))
}

impl<S: NodeStore> TreeRepository<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Direct store access; writes through here bypass path derivation.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn create(&mut self, label: &str, parent: Option<&Node>) -> Result<Node> {
        self.create_at(label, parent.map(Node::path))
    }

    /// Like [`create`](Self::create), addressing the parent by path.
    pub fn create_at(&mut self, label: &str, parent: Option<&Path>) -> Result<Node> {
        let mut node = Node::new(label, parent)?;
        self.save(&mut node)?;
        Ok(node)
    }

    /// Inserts an unsaved node or overwrites a saved one, re-deriving its path first.
    ///
    /// Only safe for leaves: pointing a node with descendants at a new parent and saving it
    /// leaves the descendants' paths behind. Relocate subtrees with `move_subtree`.
    pub fn save(&mut self, node: &mut Node) -> Result<()> {
        let path = node.derived_path()?;
        let parent = node.parent.clone();
        let label = node.label.clone();
        let existing = node.id();

        let id = in_transaction(&mut self.store, |store| match existing {
            None => store.insert(&label, &path, parent.as_ref()),
            Some(id) => store.update(id, &label, &path, parent.as_ref()).map(|()| id),
        })?;

        debug!(%id, %path, inserted = existing.is_none(), "saved node");
        node.assign(id, path);
        Ok(())
    }

    /// Removes `node` and its whole subtree. Returns the number of rows deleted.
    pub fn delete(&mut self, node: &Node) -> Result<u64> {
        let id = require_id(node)?;
        let removed = in_transaction(&mut self.store, |store| store.delete(id))?;
        debug!(%id, path = %node.path(), removed, "deleted subtree");
        Ok(removed)
    }

    pub fn get(&self, id: NodeId) -> Result<Option<Node>> {
        self.store.get(id)
    }

    pub fn get_by_path(&self, path: &Path) -> Result<Option<Node>> {
        Ok(self
            .store
            .select(&NodeQuery::all().path_is(path))?
            .into_iter()
            .next())
    }

    /// Re-reads a saved node, e.g. a descendant left stale by a subtree move.
    pub fn refresh(&self, node: &mut Node) -> Result<()> {
        let id = require_id(node)?;
        *node = self
            .store
            .get(id)?
            .ok_or_else(|| Error::Conflict(format!("node {id} no longer exists")))?;
        Ok(())
    }

    pub fn all(&self) -> Result<Vec<Node>> {
        self.store.select(&NodeQuery::all())
    }

    /// Scans every row and checks path uniqueness, parent existence and
    /// `path == parent ++ label`. Intended for tests and debugging.
    pub fn validate_invariants(&self) -> Result<()> {
        let nodes = self.all()?;
        let mut by_path: HashMap<&Path, NodeId> = HashMap::with_capacity(nodes.len());
        for node in &nodes {
            let id = require_id(node)?;
            if let Some(other) = by_path.insert(node.path(), id) {
                return Err(Error::ConstraintViolation(format!(
                    "path {} shared by nodes {other} and {id}",
                    node.path()
                )));
            }
        }

        for node in &nodes {
            if let Some(parent) = &node.parent {
                if !by_path.contains_key(parent) {
                    return Err(Error::ConstraintViolation(format!(
                        "parent {parent} of {} does not exist",
                        node.path()
                    )));
                }
            }
            let derived = node.derived_path()?;
            if &derived != node.path() {
                return Err(Error::ConstraintViolation(format!(
                    "path {} does not match parent/label ({derived})",
                    node.path()
                )));
            }
        }
        Ok(())
    }
}
