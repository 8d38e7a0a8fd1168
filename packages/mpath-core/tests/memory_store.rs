use mpath_core::{Error, MemoryNodeStore, NodeQuery, NodeStore, Path};

fn p(s: &str) -> Path {
    Path::parse(s).unwrap()
}

#[test]
fn insert_reports_missing_parent_immediately() {
    let mut store = MemoryNodeStore::default();
    let err = store.insert("b", &p("a.b"), Some(&p("a"))).unwrap_err();
    assert!(matches!(err, Error::Conflict(_)), "{err:?}");
    assert!(store.is_empty());
}

#[test]
fn duplicate_path_fails_the_statement() {
    let mut store = MemoryNodeStore::default();
    store.insert("a", &p("a"), None).unwrap();
    let err = store.insert("a", &p("a"), None).unwrap_err();
    assert!(matches!(err, Error::Conflict(_)), "{err:?}");
    assert_eq!(store.len(), 1);
}

#[test]
fn inconsistent_row_fails_the_check() {
    let mut store = MemoryNodeStore::default();
    let a = store.insert("a", &p("a"), None).unwrap();
    store.insert("b", &p("b"), None).unwrap();
    let err = store.update(a, "a", &p("a"), Some(&p("b"))).unwrap_err();
    assert!(matches!(err, Error::ConstraintViolation(_)), "{err:?}");
    assert_eq!(store.get(a).unwrap().unwrap().parent, None);
}

#[test]
fn parent_existence_is_deferred_to_commit() {
    let mut store = MemoryNodeStore::default();
    let a = store.insert("a", &p("a"), None).unwrap();
    store.insert("b", &p("a.b"), Some(&p("a"))).unwrap();

    store.begin().unwrap();
    // Renaming the parent orphans `a.b` until commit.
    store.update(a, "z", &p("z"), None).unwrap();
    let err = store.commit().unwrap_err();
    assert!(matches!(err, Error::ConstraintViolation(_)), "{err:?}");
    assert!(!store.in_transaction());

    let names: Vec<String> = store
        .select(&NodeQuery::all())
        .unwrap()
        .iter()
        .map(|n| n.path().to_string())
        .collect();
    assert!(names.contains(&"a".to_string()));
    assert!(!names.contains(&"z".to_string()));
}

#[test]
fn parent_existence_is_checked_per_statement_outside_transactions() {
    let mut store = MemoryNodeStore::default();
    let a = store.insert("a", &p("a"), None).unwrap();
    store.insert("b", &p("a.b"), Some(&p("a"))).unwrap();
    let err = store.update(a, "z", &p("z"), None).unwrap_err();
    assert!(matches!(err, Error::ConstraintViolation(_)), "{err:?}");
    assert_eq!(store.get(a).unwrap().unwrap().path(), &p("a"));
}

#[test]
fn rollback_restores_rows_but_not_ids() {
    let mut store = MemoryNodeStore::default();
    store.begin().unwrap();
    let first = store.insert("a", &p("a"), None).unwrap();
    store.rollback().unwrap();
    assert!(store.is_empty());

    let second = store.insert("a", &p("a"), None).unwrap();
    assert!(second > first);
}

#[test]
fn nested_begin_is_rejected() {
    let mut store = MemoryNodeStore::default();
    store.begin().unwrap();
    assert!(matches!(store.begin(), Err(Error::Storage(_))));
    store.rollback().unwrap();
    assert!(matches!(store.commit(), Err(Error::Storage(_))));
}

#[test]
fn delete_cascades_to_subtree() {
    let mut store = MemoryNodeStore::default();
    let a = store.insert("a", &p("a"), None).unwrap();
    store.insert("b", &p("a.b"), Some(&p("a"))).unwrap();
    store.insert("c", &p("a.b.c"), Some(&p("a.b"))).unwrap();
    store.insert("ab", &p("ab"), None).unwrap();

    assert_eq!(store.delete(a).unwrap(), 3);
    assert_eq!(store.len(), 1);
    assert_eq!(store.delete(a).unwrap(), 0);
}
