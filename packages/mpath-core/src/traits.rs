use tracing::warn;

use crate::error::Result;
use crate::ids::NodeId;
use crate::moves::SubtreeMove;
use crate::node::Node;
use crate::path::Path;
use crate::query::NodeQuery;

/// Backing table of a materialized-path tree.
///
/// Implementations must enforce, independently of the repository:
/// - uniqueness of `path` at statement time (`Error::Conflict`);
/// - the row check `path == parent ++ label` (`Error::ConstraintViolation`);
/// - existence of every `parent` path, checked no later than commit
///   (`Error::ConstraintViolation` when it fails at commit).
pub trait NodeStore {
    fn begin(&mut self) -> Result<()>;
    /// Commits the open transaction. On failure the transaction must already be rolled back.
    fn commit(&mut self) -> Result<()>;
    fn rollback(&mut self) -> Result<()>;

    /// Serializes tree-restructuring writers until the end of the current transaction.
    /// Must be the first statement issued after `begin`.
    fn lock_tree(&mut self) -> Result<()>;

    /// Inserts a new row. A missing parent is reported immediately as `Error::Conflict`.
    fn insert(&mut self, label: &str, path: &Path, parent: Option<&Path>) -> Result<NodeId>;
    /// Overwrites label/path/parent of an existing row as given, without deriving anything.
    fn update(&mut self, id: NodeId, label: &str, path: &Path, parent: Option<&Path>)
        -> Result<()>;
    /// Deletes a row and, through the parent link, its whole subtree. Returns rows removed.
    fn delete(&mut self, id: NodeId) -> Result<u64>;

    fn get(&self, id: NodeId) -> Result<Option<Node>>;
    fn select(&self, query: &NodeQuery) -> Result<Vec<Node>>;

    /// Applies a subtree move as two statements: the moved row first, then its descendants.
    /// Returns the number of rows rewritten.
    fn rewrite_subtree(&mut self, plan: &SubtreeMove) -> Result<u64>;
}

/// Runs `f` between `begin` and `commit`, rolling back when it fails.
pub fn in_transaction<S, T, F>(store: &mut S, f: F) -> Result<T>
where
    S: NodeStore + ?Sized,
    F: FnOnce(&mut S) -> Result<T>,
{
    store.begin()?;
    match f(store) {
        Ok(v) => {
            store.commit()?;
            Ok(v)
        }
        Err(e) => {
            if let Err(rollback_err) = store.rollback() {
                warn!(error = %rollback_err, "rollback failed after {e}");
            }
            Err(e)
        }
    }
}
