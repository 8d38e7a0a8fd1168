use std::collections::{BTreeMap, HashSet};

use crate::error::{Error, Result};
use crate::ids::NodeId;
use crate::moves::SubtreeMove;
use crate::node::Node;
use crate::path::Path;
use crate::query::NodeQuery;
use crate::traits::NodeStore;

#[derive(Clone, Debug)]
struct Row {
    label: String,
    path: Path,
    parent: Option<Path>,
}

type Rows = BTreeMap<NodeId, Row>;

/// In-memory `NodeStore` for tests and prototyping.
///
/// Mirrors the constraint timing of the PostgreSQL schema: path uniqueness and the
/// path/parent check fail the statement, parent existence is deferred to commit (or to the
/// end of the statement outside a transaction). Ids, like a database sequence, are not
/// reused after a rollback.
#[derive(Default)]
pub struct MemoryNodeStore {
    rows: Rows,
    last_id: i64,
    /// Rows as of `begin`, present while a transaction is open.
    snapshot: Option<Rows>,
}

impl MemoryNodeStore {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn in_transaction(&self) -> bool {
        self.snapshot.is_some()
    }

    fn to_node(id: NodeId, row: &Row) -> Node {
        Node::from_row(id, row.label.clone(), row.path.clone(), row.parent.clone())
    }

    fn check_row(row: &Row) -> Result<()> {
        let consistent = !row.label.is_empty()
            && match &row.parent {
                None => row.path.as_str() == row.label,
                Some(parent) => {
                    row.path.as_str() == format!("{parent}.{}", row.label)
                }
            };
        if consistent {
            Ok(())
        } else {
            Err(Error::ConstraintViolation(format!(
                "path {} is inconsistent with parent {:?} and label {:?}",
                row.path,
                row.parent.as_ref().map(Path::as_str),
                row.label
            )))
        }
    }

    fn check_unique(rows: &Rows) -> Result<()> {
        let mut seen = HashSet::with_capacity(rows.len());
        for row in rows.values() {
            if !seen.insert(&row.path) {
                return Err(Error::Conflict(format!("path {} already exists", row.path)));
            }
        }
        Ok(())
    }

    fn check_parents(rows: &Rows) -> Result<()> {
        let paths: HashSet<&Path> = rows.values().map(|r| &r.path).collect();
        for row in rows.values() {
            if let Some(parent) = &row.parent {
                if !paths.contains(parent) {
                    return Err(Error::ConstraintViolation(format!(
                        "parent {parent} of {} does not exist",
                        row.path
                    )));
                }
            }
        }
        Ok(())
    }

    /// Runs one write statement: undone entirely if it or an immediate constraint fails.
    fn statement<T>(&mut self, f: impl FnOnce(&mut Rows) -> Result<T>) -> Result<T> {
        let before = self.rows.clone();
        let res = f(&mut self.rows).and_then(|v| {
            Self::check_unique(&self.rows)?;
            if self.snapshot.is_none() {
                Self::check_parents(&self.rows)?;
            }
            Ok(v)
        });
        if res.is_err() {
            self.rows = before;
        }
        res
    }
}

impl NodeStore for MemoryNodeStore {
    fn begin(&mut self) -> Result<()> {
        if self.snapshot.is_some() {
            return Err(Error::Storage("transaction already open".into()));
        }
        self.snapshot = Some(self.rows.clone());
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        let snapshot = self
            .snapshot
            .take()
            .ok_or_else(|| Error::Storage("no open transaction".into()))?;
        if let Err(e) = Self::check_parents(&self.rows) {
            self.rows = snapshot;
            return Err(e);
        }
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        let snapshot = self
            .snapshot
            .take()
            .ok_or_else(|| Error::Storage("no open transaction".into()))?;
        self.rows = snapshot;
        Ok(())
    }

    fn lock_tree(&mut self) -> Result<()> {
        // Exclusive access through `&mut self` already serializes writers.
        Ok(())
    }

    fn insert(&mut self, label: &str, path: &Path, parent: Option<&Path>) -> Result<NodeId> {
        let id = NodeId(self.last_id + 1);
        self.last_id += 1;
        let row = Row {
            label: label.to_string(),
            path: path.clone(),
            parent: parent.cloned(),
        };
        self.statement(|rows| {
            if let Some(parent) = parent {
                if !rows.values().any(|r| &r.path == parent) {
                    return Err(Error::Conflict(format!("parent {parent} does not exist")));
                }
            }
            Self::check_row(&row)?;
            rows.insert(id, row);
            Ok(id)
        })
    }

    fn update(
        &mut self,
        id: NodeId,
        label: &str,
        path: &Path,
        parent: Option<&Path>,
    ) -> Result<()> {
        self.statement(|rows| {
            let row = rows
                .get_mut(&id)
                .ok_or_else(|| Error::Conflict(format!("node {id} does not exist")))?;
            row.label = label.to_string();
            row.path = path.clone();
            row.parent = parent.cloned();
            Self::check_row(row)
        })
    }

    fn delete(&mut self, id: NodeId) -> Result<u64> {
        self.statement(|rows| {
            let Some(root) = rows.get(&id).map(|r| r.path.clone()) else {
                return Ok(0);
            };
            let before = rows.len();
            rows.retain(|_, r| !r.path.is_descendant_of(&root, true));
            Ok((before - rows.len()) as u64)
        })
    }

    fn get(&self, id: NodeId) -> Result<Option<Node>> {
        Ok(self.rows.get(&id).map(|row| Self::to_node(id, row)))
    }

    fn select(&self, query: &NodeQuery) -> Result<Vec<Node>> {
        let mut out: Vec<Node> = self
            .rows
            .iter()
            .map(|(id, row)| Self::to_node(*id, row))
            .filter(|node| query.accepts(node))
            .collect();
        query.sort(&mut out);
        Ok(out)
    }

    fn rewrite_subtree(&mut self, plan: &SubtreeMove) -> Result<u64> {
        let moved = self.statement(|rows| {
            let row = rows
                .get_mut(&plan.node)
                .ok_or_else(|| Error::Conflict(format!("node {} does not exist", plan.node)))?;
            row.path = plan.new_path.clone();
            row.parent = plan.new_parent.clone();
            Self::check_row(row)?;
            Ok(1u64)
        })?;

        let descendants = self.statement(|rows| {
            let mut n = 0u64;
            for (id, row) in rows.iter_mut() {
                if *id == plan.node || !row.path.is_descendant_of(&plan.old_path, false) {
                    continue;
                }
                row.path = plan.rewrite(&row.path)?;
                row.parent = row.path.parent();
                Self::check_row(row)?;
                n += 1;
            }
            Ok(n)
        })?;

        Ok(moved + descendants)
    }
}
