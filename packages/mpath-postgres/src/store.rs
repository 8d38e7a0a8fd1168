use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use postgres::error::SqlState;
use postgres::types::ToSql;
use postgres::{Client, Row, Statement};
use tracing::debug;

use mpath_core::{
    Error, Node, NodeId, NodeQuery, NodeStore, OrderBy, Path, Predicate, Result, SubtreeMove,
};

use crate::config::{MoveLocking, TreeTable};

fn storage_debug<E: std::fmt::Debug>(e: E) -> Error {
    Error::Storage(format!("{e:?}"))
}

fn describe(e: &postgres::Error) -> String {
    match e.as_db_error() {
        Some(db) => match db.detail() {
            Some(detail) => format!("{} ({detail})", db.message()),
            None => db.message().to_string(),
        },
        None => e.to_string(),
    }
}

/// Maps a failed statement. Outside an explicit transaction the statement commits on its
/// own, so a deferred foreign key failing there is a commit-time violation.
fn statement_error(e: postgres::Error, in_tx: bool) -> Error {
    match e.code() {
        Some(code) if *code == SqlState::UNIQUE_VIOLATION => Error::Conflict(describe(&e)),
        Some(code) if *code == SqlState::FOREIGN_KEY_VIOLATION && in_tx => {
            Error::Conflict(describe(&e))
        }
        Some(code) if *code == SqlState::FOREIGN_KEY_VIOLATION => {
            Error::ConstraintViolation(describe(&e))
        }
        Some(code) if *code == SqlState::CHECK_VIOLATION => {
            Error::ConstraintViolation(describe(&e))
        }
        _ => storage_debug(e),
    }
}

fn commit_error(e: postgres::Error) -> Error {
    match e.code() {
        Some(code) if code.code().starts_with("23") => Error::ConstraintViolation(describe(&e)),
        _ => storage_debug(e),
    }
}

fn row_to_node(row: &Row) -> Result<Node> {
    let id: i64 = row.get(0);
    let label: String = row.get(1);
    let path: String = row.get(2);
    let parent: Option<String> = row.get(3);
    let path = Path::parse(&path).map_err(storage_debug)?;
    let parent = parent
        .map(|p| Path::parse(&p))
        .transpose()
        .map_err(storage_debug)?;
    Ok(Node::from_row(NodeId(id), label, path, parent))
}

/// Fixed statements of one table, rendered once.
struct Sql {
    insert: String,
    update: String,
    delete: String,
    get: String,
    select: String,
    move_node: String,
    move_descendants: String,
}

impl Sql {
    fn new(table: &TreeTable) -> Self {
        let t = table.name();
        Self {
            insert: format!(
                "INSERT INTO {t} (label, path, parent) \
                 SELECT $1::text, $2::text::ltree, $3::text::ltree \
                 WHERE $3::text IS NULL OR EXISTS (SELECT 1 FROM {t} WHERE path = $3::text::ltree) \
                 RETURNING id"
            ),
            update: format!(
                "UPDATE {t} SET label = $2::text, path = $3::text::ltree, parent = $4::text::ltree \
                 WHERE id = $1"
            ),
            delete: format!(
                "DELETE FROM {t} WHERE path <@ (SELECT path FROM {t} WHERE id = $1)"
            ),
            get: format!("SELECT id, label, path::text, parent::text FROM {t} WHERE id = $1"),
            select: format!("SELECT id, label, path::text, parent::text FROM {t}"),
            move_node: format!(
                "UPDATE {t} SET path = $2::text::ltree, parent = $3::text::ltree WHERE id = $1"
            ),
            // $1 is the new parent path, '' (the empty ltree) when the node becomes a root.
            move_descendants: format!(
                "UPDATE {t} SET \
                   path = $1::text::ltree || subpath(path, $2::int4), \
                   parent = subpath($1::text::ltree || subpath(path, $2::int4), 0, -1) \
                 WHERE path <@ $3::text::ltree"
            ),
        }
    }
}

/// Renders the predicates of `query` as a WHERE clause over text parameters.
fn render(select: &str, query: &NodeQuery) -> (String, Vec<String>) {
    let mut params: Vec<String> = Vec::new();
    let mut clauses: Vec<String> = Vec::new();
    for predicate in query.predicates() {
        let mut bind = |value: String| {
            params.push(value);
            format!("${}", params.len())
        };
        let clause = match predicate {
            Predicate::ChildOf(p) => {
                format!("path ~ {}::text::lquery", bind(p.children_pattern().to_string()))
            }
            Predicate::DescendantOrEqual(p) => {
                format!("path <@ {}::text::ltree", bind(p.to_string()))
            }
            Predicate::AncestorOrEqual(p) => {
                format!("path @> {}::text::ltree", bind(p.to_string()))
            }
            Predicate::Matches(pattern) => {
                format!("path ~ {}::text::lquery", bind(pattern.to_string()))
            }
            Predicate::ParentIs(None) => "parent IS NULL".to_string(),
            Predicate::ParentIs(Some(p)) => {
                format!("parent = {}::text::ltree", bind(p.to_string()))
            }
            // nlevel counts labels, roots have one.
            Predicate::Level(level) => {
                format!("nlevel(path) = {}::text::int4", bind((level + 1).to_string()))
            }
            Predicate::PathIs(p) => format!("path = {}::text::ltree", bind(p.to_string())),
            Predicate::PathIsNot(p) => format!("path <> {}::text::ltree", bind(p.to_string())),
        };
        clauses.push(clause);
    }

    let mut sql = select.to_string();
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    // Byte order, matching `Path`'s ordering in memory.
    match query.order() {
        None => {}
        Some(OrderBy::Path) => sql.push_str(" ORDER BY path::text COLLATE \"C\""),
        Some(OrderBy::Label) => {
            sql.push_str(" ORDER BY label COLLATE \"C\", path::text COLLATE \"C\"")
        }
    }
    (sql, params)
}

/// `NodeStore` over one `ltree` table. Create the table first with [`crate::ensure_schema`].
pub struct PgNodeStore {
    client: Rc<RefCell<Client>>,
    table: TreeTable,
    sql: Sql,
    stmts: RefCell<HashMap<String, Statement>>,
    in_tx: bool,
}

impl PgNodeStore {
    pub fn new(client: Rc<RefCell<Client>>, table: TreeTable) -> Self {
        Self {
            sql: Sql::new(&table),
            client,
            table,
            stmts: RefCell::new(HashMap::new()),
            in_tx: false,
        }
    }

    pub fn table(&self) -> &TreeTable {
        &self.table
    }

    pub fn client(&self) -> &Rc<RefCell<Client>> {
        &self.client
    }

    fn stmt(&self, c: &mut Client, sql: &str) -> Result<Statement> {
        if let Some(stmt) = self.stmts.borrow().get(sql) {
            return Ok(stmt.clone());
        }
        let stmt = c.prepare(sql).map_err(|e| statement_error(e, self.in_tx))?;
        self.stmts.borrow_mut().insert(sql.to_string(), stmt.clone());
        Ok(stmt)
    }

    fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<u64> {
        let mut c = self.client.borrow_mut();
        let stmt = self.stmt(&mut c, sql)?;
        c.execute(&stmt, params)
            .map_err(|e| statement_error(e, self.in_tx))
    }

    fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<Vec<Row>> {
        let mut c = self.client.borrow_mut();
        let stmt = self.stmt(&mut c, sql)?;
        c.query(&stmt, params)
            .map_err(|e| statement_error(e, self.in_tx))
    }
}

impl NodeStore for PgNodeStore {
    fn begin(&mut self) -> Result<()> {
        if self.in_tx {
            return Err(Error::Storage("transaction already open".into()));
        }
        self.client
            .borrow_mut()
            .batch_execute("BEGIN")
            .map_err(storage_debug)?;
        self.in_tx = true;
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        if !self.in_tx {
            return Err(Error::Storage("no open transaction".into()));
        }
        // A failed COMMIT ends the transaction as well.
        self.in_tx = false;
        self.client
            .borrow_mut()
            .batch_execute("COMMIT")
            .map_err(commit_error)
    }

    fn rollback(&mut self) -> Result<()> {
        if !self.in_tx {
            return Err(Error::Storage("no open transaction".into()));
        }
        self.in_tx = false;
        self.client
            .borrow_mut()
            .batch_execute("ROLLBACK")
            .map_err(storage_debug)
    }

    fn lock_tree(&mut self) -> Result<()> {
        let mut c = self.client.borrow_mut();
        match self.table.locking() {
            MoveLocking::AdvisoryLock => {
                c.query_one("SELECT pg_advisory_xact_lock($1)", &[&self.table.lock_key()])
                    .map_err(storage_debug)?;
            }
            MoveLocking::Serializable => {
                c.batch_execute("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
                    .map_err(storage_debug)?;
            }
        }
        debug!(table = self.table.name(), locking = ?self.table.locking(), "locked tree");
        Ok(())
    }

    fn insert(&mut self, label: &str, path: &Path, parent: Option<&Path>) -> Result<NodeId> {
        let parent = parent.map(Path::as_str);
        let rows = self.query(&self.sql.insert, &[&label, &path.as_str(), &parent])?;
        let row = rows.first().ok_or_else(|| {
            Error::Conflict(format!("parent {} does not exist", parent.unwrap_or_default()))
        })?;
        Ok(NodeId(row.get(0)))
    }

    fn update(
        &mut self,
        id: NodeId,
        label: &str,
        path: &Path,
        parent: Option<&Path>,
    ) -> Result<()> {
        let parent = parent.map(Path::as_str);
        let n = self.execute(&self.sql.update, &[&id.0, &label, &path.as_str(), &parent])?;
        if n == 0 {
            return Err(Error::Conflict(format!("node {id} does not exist")));
        }
        Ok(())
    }

    fn delete(&mut self, id: NodeId) -> Result<u64> {
        self.execute(&self.sql.delete, &[&id.0])
    }

    fn get(&self, id: NodeId) -> Result<Option<Node>> {
        let rows = self.query(&self.sql.get, &[&id.0])?;
        rows.first().map(row_to_node).transpose()
    }

    fn select(&self, query: &NodeQuery) -> Result<Vec<Node>> {
        let (sql, params) = render(&self.sql.select, query);
        let params: Vec<&(dyn ToSql + Sync)> =
            params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();
        // Ad-hoc shapes are not cached.
        let rows = self
            .client
            .borrow_mut()
            .query(sql.as_str(), &params)
            .map_err(|e| statement_error(e, self.in_tx))?;
        rows.iter().map(row_to_node).collect()
    }

    fn rewrite_subtree(&mut self, plan: &SubtreeMove) -> Result<u64> {
        let new_parent = plan.new_parent.as_ref().map(Path::as_str);
        let moved = self.execute(
            &self.sql.move_node,
            &[&plan.node.0, &plan.new_path.as_str(), &new_parent],
        )?;
        if moved == 0 {
            return Err(Error::Conflict(format!("node {} does not exist", plan.node)));
        }

        let strip = i32::try_from(plan.strip).map_err(storage_debug)?;
        let descendants = self.execute(
            &self.sql.move_descendants,
            &[&new_parent.unwrap_or(""), &strip, &plan.old_path.as_str()],
        )?;
        Ok(moved + descendants)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> Path {
        Path::parse(s).unwrap()
    }

    #[test]
    fn renders_conjunctions_in_order() {
        let query = NodeQuery::all()
            .descendant_or_equal(&p("a.b"))
            .exclude(&p("a.b"))
            .order_by(OrderBy::Path);
        let (sql, params) = render("SELECT * FROM t", &query);
        assert_eq!(
            sql,
            "SELECT * FROM t WHERE path <@ $1::text::ltree AND path <> $2::text::ltree \
             ORDER BY path::text COLLATE \"C\""
        );
        assert_eq!(params, vec!["a.b", "a.b"]);
    }

    #[test]
    fn renders_children_and_levels() {
        let query = NodeQuery::all()
            .child_of(&p("a"))
            .parent_is(None)
            .level(0);
        let (sql, params) = render("SELECT * FROM t", &query);
        assert_eq!(
            sql,
            "SELECT * FROM t WHERE path ~ $1::text::lquery AND parent IS NULL \
             AND nlevel(path) = $2::text::int4"
        );
        assert_eq!(params, vec!["a.*{1}", "1"]);
    }

    #[test]
    fn unfiltered_query_has_no_where() {
        let (sql, params) = render("SELECT * FROM t", &NodeQuery::all().order_by(OrderBy::Label));
        assert_eq!(
            sql,
            "SELECT * FROM t ORDER BY label COLLATE \"C\", path::text COLLATE \"C\""
        );
        assert!(params.is_empty());
    }
}
