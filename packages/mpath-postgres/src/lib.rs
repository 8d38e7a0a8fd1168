#![forbid(unsafe_code)]
//! PostgreSQL backend for `mpath-core`, storing paths in the `ltree` extension type.
//!
//! Path uniqueness, the `path == parent ++ label` check and the deferred parent foreign key
//! live in the schema, so the table stays consistent even for writers that bypass the
//! repository.

mod config;
mod schema;
mod store;

pub use config::{MoveLocking, TreeTable};
pub use schema::{drop_table_for_tests, ensure_schema};
pub use store::PgNodeStore;
