//! Atomic relocation of a node together with its whole subtree.

use tracing::debug;

use crate::error::{Error, Result};
use crate::ids::NodeId;
use crate::node::Node;
use crate::path::Path;
use crate::query::NodeQuery;
use crate::repository::TreeRepository;
use crate::traits::{in_transaction, NodeStore};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved { rows: u64 },
    /// The node already sat under the requested parent; nothing was written.
    NoOp,
}

/// Path rewrite for one subtree move, shared by the engine and the stores that execute it.
///
/// Every path in the subtree loses the `strip` labels of the old parent path and, unless the
/// node becomes a root, gains `new_parent` in front.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubtreeMove {
    pub node: NodeId,
    pub old_path: Path,
    pub new_path: Path,
    pub new_parent: Option<Path>,
    /// Number of labels in the old parent path (0 when the node was a root).
    pub strip: usize,
}

impl SubtreeMove {
    pub fn plan(node: NodeId, old_path: &Path, new_parent: Option<&Path>) -> Result<Self> {
        Ok(Self {
            node,
            old_path: old_path.clone(),
            new_path: Path::derive(new_parent, old_path.last_label())?,
            new_parent: new_parent.cloned(),
            strip: old_path.level(),
        })
    }

    /// New location of `path`, which must lie in the moved subtree.
    pub fn rewrite(&self, path: &Path) -> Result<Path> {
        let tail = path
            .is_descendant_of(&self.old_path, true)
            .then(|| path.tail_after(self.strip))
            .flatten()
            .ok_or_else(|| {
                Error::Validation(format!("{path} is outside the moved subtree {}", self.old_path))
            })?;
        match &self.new_parent {
            Some(parent) => parent.join(&tail),
            None => Ok(tail),
        }
    }
}

fn check_move(path: &Path, new_parent: Option<&Path>) -> Result<()> {
    match new_parent {
        Some(target) if path.is_ancestor_of(target, true) => Err(Error::BadMove(format!(
            "{path} can't be made a child of {target}"
        ))),
        _ => Ok(()),
    }
}

impl<S: NodeStore> TreeRepository<S> {
    /// Moves `node` and all its descendants under `new_parent` (`None` makes it a root).
    ///
    /// Rejects moving a node onto itself or into its own subtree with `Error::BadMove`
    /// before anything is written. Inside the transaction the tree is locked and the move
    /// is validated again against the stored rows.
    ///
    /// Only `node` is updated in memory. Other loaded copies of its descendants keep their
    /// old paths; re-read them with `refresh`.
    pub fn move_subtree(
        &mut self,
        node: &mut Node,
        new_parent: Option<&Node>,
    ) -> Result<MoveOutcome> {
        let id = node
            .id()
            .ok_or_else(|| Error::Validation(format!("node {} has not been saved", node.path())))?;
        if node.is_ancestor_of(new_parent, true) {
            return Err(Error::BadMove(format!(
                "{} can't be made a child of {}",
                node.path(),
                new_parent.map(|p| p.path().to_string()).unwrap_or_default()
            )));
        }
        let target = new_parent.map(|p| p.path().clone());
        if node.parent == target {
            return Ok(MoveOutcome::NoOp);
        }

        let moved = in_transaction(self.store_mut(), |store| {
            store.lock_tree()?;

            let current = store
                .get(id)?
                .ok_or_else(|| Error::Conflict(format!("node {id} no longer exists")))?;
            if let Some(target) = &target {
                if store.select(&NodeQuery::all().path_is(target))?.is_empty() {
                    return Err(Error::Conflict(format!("new parent {target} does not exist")));
                }
            }
            check_move(current.path(), target.as_ref())?;
            if current.parent == target {
                return Ok(None);
            }

            let plan = SubtreeMove::plan(id, current.path(), target.as_ref())?;
            let subtree = store.select(&NodeQuery::all().descendant_or_equal(current.path()))?;
            for member in &subtree {
                plan.rewrite(member.path())?;
            }

            let rows = store.rewrite_subtree(&plan)?;
            if rows != subtree.len() as u64 {
                return Err(Error::Conflict(format!(
                    "subtree {} changed during move: expected {} rows, rewrote {rows}",
                    plan.old_path,
                    subtree.len()
                )));
            }
            Ok(Some((plan, current.label, rows)))
        })?;

        let Some((plan, label, rows)) = moved else {
            return Ok(MoveOutcome::NoOp);
        };
        debug!(node = %id, from = %plan.old_path, to = %plan.new_path, rows, "moved subtree");
        node.label = label;
        node.relocate(plan.new_parent, plan.new_path);
        Ok(MoveOutcome::Moved { rows })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> Path {
        Path::parse(s).unwrap()
    }

    #[test]
    fn plan_rewrites_under_new_parent() {
        let plan = SubtreeMove::plan(NodeId(1), &p("a.b"), Some(&p("x.y"))).unwrap();
        assert_eq!(plan.strip, 1);
        assert_eq!(plan.new_path, p("x.y.b"));
        assert_eq!(plan.rewrite(&p("a.b")).unwrap(), p("x.y.b"));
        assert_eq!(plan.rewrite(&p("a.b.c.d")).unwrap(), p("x.y.b.c.d"));
        assert!(plan.rewrite(&p("a.c")).is_err());
    }

    #[test]
    fn plan_rewrites_to_root() {
        let plan = SubtreeMove::plan(NodeId(1), &p("a.b"), None).unwrap();
        assert_eq!(plan.new_path, p("b"));
        assert_eq!(plan.rewrite(&p("a.b.c")).unwrap(), p("b.c"));

        let plan = SubtreeMove::plan(NodeId(1), &p("r"), Some(&p("s"))).unwrap();
        assert_eq!(plan.strip, 0);
        assert_eq!(plan.rewrite(&p("r.c")).unwrap(), p("s.r.c"));
    }

    #[test]
    fn rejects_cycles() {
        assert!(matches!(check_move(&p("a"), Some(&p("a"))), Err(Error::BadMove(_))));
        assert!(matches!(check_move(&p("a"), Some(&p("a.b"))), Err(Error::BadMove(_))));
        assert!(check_move(&p("a.b"), Some(&p("a"))).is_ok());
        assert!(check_move(&p("a"), None).is_ok());
    }
}
