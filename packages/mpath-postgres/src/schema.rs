use postgres::Client;
use tracing::info;

use mpath_core::{Error, Result};

use crate::config::TreeTable;

const SCHEMA_LOCK_KEY: i64 = 0x6d70617468; // "mpath"

fn storage(e: postgres::Error) -> Error {
    Error::Storage(format!("{e:?}"))
}

fn create_table_sql(table: &TreeTable) -> String {
    let t = table.name();
    format!(
        "CREATE TABLE IF NOT EXISTS {t} (
           id BIGSERIAL PRIMARY KEY,
           path ltree NOT NULL UNIQUE,
           label VARCHAR(255) NOT NULL CHECK (label <> ''),
           parent ltree NULL REFERENCES {t}(path)
             ON DELETE CASCADE DEFERRABLE INITIALLY DEFERRED
         )"
    )
}

fn check_constraint_sql(table: &TreeTable) -> String {
    format!(
        "ALTER TABLE {} ADD CONSTRAINT {} CHECK (
           (parent IS NULL AND path::text = label)
           OR (parent IS NOT NULL AND path::text = parent::text || '.' || label)
         )",
        table.name(),
        table.check_constraint()
    )
}

fn ensure_check_constraint(client: &mut Client, table: &TreeTable) -> Result<()> {
    let exists = client
        .query_opt(
            "SELECT 1 FROM pg_constraint \
             WHERE conname = $1 AND conrelid = to_regclass($2)",
            &[&table.check_constraint(), &table.name()],
        )
        .map_err(storage)?
        .is_some();
    if exists {
        return Ok(());
    }
    client
        .batch_execute(&check_constraint_sql(table))
        .map_err(storage)?;
    info!(table = table.name(), constraint = %table.check_constraint(), "added path check");
    Ok(())
}

fn setup(client: &mut Client, table: &TreeTable) -> Result<()> {
    client
        .batch_execute("CREATE EXTENSION IF NOT EXISTS ltree")
        .map_err(storage)?;
    client
        .batch_execute(&create_table_sql(table))
        .map_err(storage)?;
    ensure_check_constraint(client, table)?;
    client
        .batch_execute(&format!(
            "CREATE INDEX IF NOT EXISTS {} ON {} USING GIST (path);
             CREATE INDEX IF NOT EXISTS {} ON {} USING GIST (parent);",
            table.path_index(),
            table.name(),
            table.parent_index(),
            table.name()
        ))
        .map_err(storage)?;
    Ok(())
}

/// Creates the `ltree` extension, the table, its path check and its GiST indexes, each only
/// if missing.
pub fn ensure_schema(client: &mut Client, table: &TreeTable) -> Result<()> {
    // Concurrent `IF NOT EXISTS` DDL can still collide in the catalogs; serialize setup
    // across processes.
    client
        .query_one("SELECT pg_advisory_lock($1)", &[&SCHEMA_LOCK_KEY])
        .map_err(storage)?;

    let res = setup(client, table);

    // Best-effort unlock. Session locks also go away with the connection.
    let _ = client.query_one("SELECT pg_advisory_unlock($1)", &[&SCHEMA_LOCK_KEY]);

    if res.is_ok() {
        info!(table = table.name(), "schema ready");
    }
    res
}

pub fn drop_table_for_tests(client: &mut Client, table: &TreeTable) -> Result<()> {
    client
        .batch_execute(&format!("DROP TABLE IF EXISTS {}", table.name()))
        .map_err(storage)
}
