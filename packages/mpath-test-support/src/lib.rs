//! Backend conformance suite: every `NodeStore` must pass the same scenarios.
//!
//! Backends instantiate the suite with [`conformance_tests!`], passing an expression that
//! yields `Option<impl Harness>` over an empty table (`None` skips the test, e.g. when no
//! database is configured). A harness owning external state cleans it up on drop.

pub mod conformance;

use std::collections::BTreeSet;

use mpath_core::{Node, NodeStore, TreeRepository};
use tracing_subscriber::EnvFilter;

/// Gives the conformance scenarios a repository over an empty table.
pub trait Harness {
    type Store: NodeStore;

    fn repo(&mut self) -> &mut TreeRepository<Self::Store>;
}

impl<S: NodeStore> Harness for TreeRepository<S> {
    type Store = S;

    fn repo(&mut self) -> &mut TreeRepository<S> {
        self
    }
}

/// Installs a test subscriber honouring `RUST_LOG`. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Paths of `nodes` as a set, for order-independent comparisons.
pub fn paths(nodes: &[Node]) -> BTreeSet<String> {
    nodes.iter().map(|n| n.path().to_string()).collect()
}

pub fn path_set<const N: usize>(paths: [&str; N]) -> BTreeSet<String> {
    paths.iter().map(|p| p.to_string()).collect()
}

#[macro_export]
macro_rules! conformance_tests {
    ($fresh:expr) => {
        $crate::conformance_tests!(@tests $fresh;
            creates_root_nodes,
            rejects_empty_labels,
            rejects_overlong_labels,
            rejects_duplicate_roots,
            allows_same_label_under_different_parents,
            rejects_duplicate_siblings,
            rejects_missing_parent,
            rejects_parent_is_self,
            rejects_parent_is_descendant,
            rejects_raw_reparent,
            descendants_of_root,
            descendants_of_leaf,
            ancestors_of_root,
            ancestors_of_leaf,
            children_and_siblings,
            pattern_queries,
            cached_trees_use_one_query,
            move_to_self_is_bad,
            move_into_own_subtree_is_bad,
            move_root_to_root_is_noop,
            move_to_current_parent_is_noop,
            move_nonroot_to_nonroot,
            move_nonroot_to_root,
            move_root_to_nonroot,
            move_nonroot_with_children_to_root,
            move_root_with_children_to_nonroot,
            move_deep_subtree,
            move_onto_existing_path_conflicts,
            move_past_max_length_is_rejected,
            refresh_after_move,
            delete_cascades,
        );
    };
    (@tests $fresh:expr; $($name:ident),* $(,)?) => {
        $(
            #[test]
            fn $name() {
                $crate::init_tracing();
                let Some(mut harness) = $fresh else {
                    return;
                };
                $crate::conformance::$name($crate::Harness::repo(&mut harness));
            }
        )*
    };
}
