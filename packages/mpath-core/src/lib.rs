#![forbid(unsafe_code)]
//! Materialized-path trees stored in a flat relational table.
//!
//! Every node carries its full path (`a.b.c`) next to a denormalized parent link, so
//! ancestor, descendant and child lookups are path predicates and a subtree moves with one
//! bulk rewrite. This crate holds the path algebra, the invariant-enforcing repository, the
//! move engine and the tree materializer; storage backends implement [`NodeStore`].

pub mod error;
pub mod ids;
pub mod materialize;
pub mod memory;
pub mod moves;
pub mod node;
pub mod path;
pub mod pattern;
pub mod query;
pub mod repository;
pub mod traits;

pub use error::{Error, Result};
pub use ids::NodeId;
#[cfg(feature = "serde")]
pub use materialize::nest_to_json;
pub use materialize::{materialize, nest, tree_path, Nested};
pub use memory::MemoryNodeStore;
pub use moves::{MoveOutcome, SubtreeMove};
pub use node::Node;
pub use path::{validate_label, Path, MAX_LABEL_LEN, MAX_PATH_LEN, SEPARATOR};
pub use pattern::{PathPattern, PatternItem};
pub use query::{NodeQuery, OrderBy, Predicate};
pub use repository::TreeRepository;
pub use traits::{in_transaction, NodeStore};
