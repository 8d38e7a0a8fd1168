use mpath_core::{MemoryNodeStore, TreeRepository};

mpath_test_support::conformance_tests!(Some(TreeRepository::new(
    MemoryNodeStore::default()
)));
