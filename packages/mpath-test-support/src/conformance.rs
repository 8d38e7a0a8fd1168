//! Scenarios every backend must pass. Each function expects a repository over an empty table.

use mpath_core::{
    Error, MoveOutcome, Node, NodeQuery, NodeStore, OrderBy, Path, PathPattern, TreeRepository,
    MAX_LABEL_LEN, MAX_PATH_LEN,
};

use crate::{path_set, paths};

fn p(s: &str) -> Path {
    Path::parse(s).unwrap()
}

/// ```text
/// root1
/// ├── child1
/// └── child2
///     └── desc3
/// root2
/// └── child4
/// ```
pub struct Forest {
    pub root1: Node,
    pub child1: Node,
    pub child2: Node,
    pub desc3: Node,
    pub root2: Node,
    pub child4: Node,
}

pub fn forest<S: NodeStore>(repo: &mut TreeRepository<S>) -> Forest {
    let root1 = repo.create("root1", None).unwrap();
    let child1 = repo.create("child1", Some(&root1)).unwrap();
    let child2 = repo.create("child2", Some(&root1)).unwrap();
    let desc3 = repo.create("desc3", Some(&child2)).unwrap();
    let root2 = repo.create("root2", None).unwrap();
    let child4 = repo.create("child4", Some(&root2)).unwrap();
    Forest {
        root1,
        child1,
        child2,
        desc3,
        root2,
        child4,
    }
}

/// `a`, `a.a`, `a.a.a`, `a.a.a.a`, returned root first.
fn chain<S: NodeStore>(repo: &mut TreeRepository<S>) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::new();
    for _ in 0..4 {
        let node = repo.create("a", out.last()).unwrap();
        out.push(node);
    }
    out
}

fn all_paths<S: NodeStore>(repo: &TreeRepository<S>) -> std::collections::BTreeSet<String> {
    paths(&repo.all().unwrap())
}

const FOREST: [&str; 6] = [
    "root1",
    "root1.child1",
    "root1.child2",
    "root1.child2.desc3",
    "root2",
    "root2.child4",
];

pub fn creates_root_nodes<S: NodeStore>(repo: &mut TreeRepository<S>) {
    let root = repo.create("root", None).unwrap();
    assert!(root.id().is_some());
    assert_eq!(root.path(), &p("root"));
    assert_eq!(root.parent, None);
    assert!(root.is_root());

    let stored = repo.get(root.id().unwrap()).unwrap().unwrap();
    assert_eq!(stored, root);
    assert_eq!(repo.get_by_path(&p("root")).unwrap(), Some(root));
    assert_eq!(repo.get_by_path(&p("missing")).unwrap(), None);
}

pub fn rejects_empty_labels<S: NodeStore>(repo: &mut TreeRepository<S>) {
    assert!(matches!(repo.create("", None), Err(Error::Validation(_))));
    assert!(matches!(repo.create("a.b", None), Err(Error::Validation(_))));

    let mut root = repo.create("root", None).unwrap();
    root.label.clear();
    assert!(matches!(repo.save(&mut root), Err(Error::Validation(_))));
    assert_eq!(all_paths(repo), path_set(["root"]));
}

/// Labels wider than the label column fail validation before reaching the store.
pub fn rejects_overlong_labels<S: NodeStore>(repo: &mut TreeRepository<S>) {
    let widest = "x".repeat(MAX_LABEL_LEN);
    let root = repo.create(&widest, None).unwrap();
    assert_eq!(root.label.len(), MAX_LABEL_LEN);

    let too_wide = "y".repeat(MAX_LABEL_LEN + 1);
    assert!(matches!(
        repo.create(&too_wide, None),
        Err(Error::Validation(_))
    ));
    assert_eq!(all_paths(repo), path_set([widest.as_str()]));
}

pub fn rejects_duplicate_roots<S: NodeStore>(repo: &mut TreeRepository<S>) {
    repo.create("root", None).unwrap();
    assert!(matches!(repo.create("root", None), Err(Error::Conflict(_))));
    assert_eq!(repo.all().unwrap().len(), 1);
}

pub fn allows_same_label_under_different_parents<S: NodeStore>(repo: &mut TreeRepository<S>) {
    let f = forest(repo);
    let twin = repo.create("child1", Some(&f.root2)).unwrap();
    assert_eq!(twin.path(), &p("root2.child1"));
    repo.validate_invariants().unwrap();
}

pub fn rejects_duplicate_siblings<S: NodeStore>(repo: &mut TreeRepository<S>) {
    let f = forest(repo);
    assert!(matches!(
        repo.create("child1", Some(&f.root1)),
        Err(Error::Conflict(_))
    ));
    assert_eq!(all_paths(repo), path_set(FOREST));
}

pub fn rejects_missing_parent<S: NodeStore>(repo: &mut TreeRepository<S>) {
    assert!(matches!(
        repo.create_at("orphan", Some(&p("nowhere"))),
        Err(Error::Conflict(_))
    ));
    assert!(repo.all().unwrap().is_empty());
}

/// Saving a node as its own parent renames its row away from under its children, which the
/// parent link rejects at commit.
pub fn rejects_parent_is_self<S: NodeStore>(repo: &mut TreeRepository<S>) {
    let f = forest(repo);
    let mut root1 = f.root1.clone();
    root1.set_parent(Some(&f.root1));
    assert!(matches!(
        repo.save(&mut root1),
        Err(Error::ConstraintViolation(_))
    ));
    assert_eq!(all_paths(repo), path_set(FOREST));
    repo.validate_invariants().unwrap();
}

pub fn rejects_parent_is_descendant<S: NodeStore>(repo: &mut TreeRepository<S>) {
    let f = forest(repo);
    let mut child2 = f.child2.clone();
    child2.set_parent(Some(&f.desc3));
    assert!(matches!(
        repo.save(&mut child2),
        Err(Error::ConstraintViolation(_))
    ));

    repo.refresh(&mut child2).unwrap();
    assert_eq!(child2.path(), &p("root1.child2"));
    repo.validate_invariants().unwrap();
}

/// Writes that skip path derivation still hit the row check.
pub fn rejects_raw_reparent<S: NodeStore>(repo: &mut TreeRepository<S>) {
    let f = forest(repo);
    let id = f.desc3.id().unwrap();
    let res = repo
        .store_mut()
        .update(id, "desc3", f.desc3.path(), Some(f.root1.path()));
    assert!(matches!(res, Err(Error::ConstraintViolation(_))));
    assert_eq!(repo.get(id).unwrap(), Some(f.desc3));
}

pub fn descendants_of_root<S: NodeStore>(repo: &mut TreeRepository<S>) {
    let chain = chain(repo);
    let root = &chain[0];
    assert_eq!(
        paths(&repo.descendants(root, false).unwrap()),
        path_set(["a.a", "a.a.a", "a.a.a.a"])
    );
    assert_eq!(
        paths(&repo.descendants(root, true).unwrap()),
        path_set(["a", "a.a", "a.a.a", "a.a.a.a"])
    );
}

pub fn descendants_of_leaf<S: NodeStore>(repo: &mut TreeRepository<S>) {
    let chain = chain(repo);
    let leaf = &chain[3];
    assert!(repo.descendants(leaf, false).unwrap().is_empty());
    assert_eq!(
        paths(&repo.descendants(leaf, true).unwrap()),
        path_set(["a.a.a.a"])
    );
}

pub fn ancestors_of_root<S: NodeStore>(repo: &mut TreeRepository<S>) {
    let chain = chain(repo);
    assert!(repo.ancestors(&chain[0], false).unwrap().is_empty());
    assert_eq!(
        paths(&repo.ancestors(&chain[0], true).unwrap()),
        path_set(["a"])
    );
}

pub fn ancestors_of_leaf<S: NodeStore>(repo: &mut TreeRepository<S>) {
    let chain = chain(repo);
    let leaf = &chain[3];
    assert_eq!(
        paths(&repo.ancestors(leaf, false).unwrap()),
        path_set(["a", "a.a", "a.a.a"])
    );
    assert_eq!(
        paths(&repo.ancestors(leaf, true).unwrap()),
        path_set(["a", "a.a", "a.a.a", "a.a.a.a"])
    );
}

pub fn children_and_siblings<S: NodeStore>(repo: &mut TreeRepository<S>) {
    let f = forest(repo);
    assert_eq!(
        paths(&repo.children(&f.root1).unwrap()),
        path_set(["root1.child1", "root1.child2"])
    );
    assert!(repo.children(&f.child1).unwrap().is_empty());
    assert_eq!(
        paths(&repo.siblings(&f.child1, false).unwrap()),
        path_set(["root1.child2"])
    );
    assert_eq!(
        paths(&repo.siblings(&f.child1, true).unwrap()),
        path_set(["root1.child1", "root1.child2"])
    );
    assert_eq!(
        paths(&repo.siblings(&f.root1, false).unwrap()),
        path_set(["root2"])
    );
    assert!(repo.siblings(&f.child4, false).unwrap().is_empty());
    assert_eq!(paths(&repo.roots().unwrap()), path_set(["root1", "root2"]));
}

pub fn pattern_queries<S: NodeStore>(repo: &mut TreeRepository<S>) {
    forest(repo);
    let children: PathPattern = "root1.*{1}".parse().unwrap();
    assert_eq!(
        paths(&repo.query(&NodeQuery::all().matches(children)).unwrap()),
        path_set(["root1.child1", "root1.child2"])
    );

    let second_level: PathPattern = "*{2}".parse().unwrap();
    assert_eq!(
        paths(&repo.query(&NodeQuery::all().matches(second_level)).unwrap()),
        path_set(["root1.child1", "root1.child2", "root2.child4"])
    );

    let by_label = repo
        .query(&NodeQuery::all().level(2).order_by(OrderBy::Label))
        .unwrap();
    let labels: Vec<&str> = by_label.iter().map(|n| n.label.as_str()).collect();
    assert_eq!(labels, vec!["child1", "child2", "child4"]);

    let ordered = repo
        .query(&NodeQuery::all().parent_is(None).order_by(OrderBy::Path))
        .unwrap();
    let roots: Vec<String> = ordered.iter().map(|n| n.path().to_string()).collect();
    assert_eq!(roots, vec!["root1", "root2"]);
}

pub fn cached_trees_use_one_query<S: NodeStore>(repo: &mut TreeRepository<S>) {
    let f = forest(repo);
    let trees = repo
        .cached_trees(
            &NodeQuery::all()
                .descendant_or_equal(f.root1.path())
                .order_by(OrderBy::Path),
        )
        .unwrap();
    assert_eq!(trees.len(), 1);
    assert_eq!(trees[0].path(), f.root1.path());

    let children = trees[0].cached_children().unwrap();
    let labels: Vec<&str> = children.iter().map(|n| n.label.as_str()).collect();
    assert_eq!(labels, vec!["child1", "child2"]);
    assert_eq!(children[0].cached_children(), Some(&[][..]));
    let grandchildren = children[1].cached_children().unwrap();
    assert_eq!(grandchildren.len(), 1);
    assert_eq!(grandchildren[0].path(), f.desc3.path());

    let whole = repo
        .cached_trees(&NodeQuery::all().order_by(OrderBy::Path))
        .unwrap();
    assert_eq!(whole.len(), 2);
}

pub fn move_to_self_is_bad<S: NodeStore>(repo: &mut TreeRepository<S>) {
    let f = forest(repo);
    let mut root1 = f.root1.clone();
    assert!(matches!(
        repo.move_subtree(&mut root1, Some(&f.root1)),
        Err(Error::BadMove(_))
    ));
    assert_eq!(root1, f.root1);
    assert_eq!(all_paths(repo), path_set(FOREST));
}

pub fn move_into_own_subtree_is_bad<S: NodeStore>(repo: &mut TreeRepository<S>) {
    let f = forest(repo);
    let mut root1 = f.root1.clone();
    assert!(matches!(
        repo.move_subtree(&mut root1, Some(&f.desc3)),
        Err(Error::BadMove(_))
    ));
    let mut child2 = f.child2.clone();
    assert!(matches!(
        repo.move_subtree(&mut child2, Some(&f.desc3)),
        Err(Error::BadMove(_))
    ));
    assert_eq!(all_paths(repo), path_set(FOREST));
}

pub fn move_root_to_root_is_noop<S: NodeStore>(repo: &mut TreeRepository<S>) {
    let f = forest(repo);
    let mut root1 = f.root1.clone();
    assert_eq!(repo.move_subtree(&mut root1, None).unwrap(), MoveOutcome::NoOp);
    assert_eq!(root1, f.root1);
    assert_eq!(all_paths(repo), path_set(FOREST));
}

pub fn move_to_current_parent_is_noop<S: NodeStore>(repo: &mut TreeRepository<S>) {
    let f = forest(repo);
    let mut child1 = f.child1.clone();
    assert_eq!(
        repo.move_subtree(&mut child1, Some(&f.root1)).unwrap(),
        MoveOutcome::NoOp
    );
    assert_eq!(child1.path(), &p("root1.child1"));
}

/// `a.b` moved under `b` becomes `b.b`.
pub fn move_nonroot_to_nonroot<S: NodeStore>(repo: &mut TreeRepository<S>) {
    let a = repo.create("a", None).unwrap();
    let mut ab = repo.create("b", Some(&a)).unwrap();
    let b = repo.create("b", None).unwrap();

    assert_eq!(
        repo.move_subtree(&mut ab, Some(&b)).unwrap(),
        MoveOutcome::Moved { rows: 1 }
    );
    assert_eq!(ab.path(), &p("b.b"));
    assert_eq!(ab.parent.as_ref(), Some(b.path()));
    assert!(repo.children(&a).unwrap().is_empty());
    assert_eq!(paths(&repo.children(&b).unwrap()), path_set(["b.b"]));
    assert_eq!(repo.get(ab.id().unwrap()).unwrap(), Some(ab));
    repo.validate_invariants().unwrap();
}

pub fn move_nonroot_to_root<S: NodeStore>(repo: &mut TreeRepository<S>) {
    let f = forest(repo);
    let mut child1 = f.child1.clone();
    repo.move_subtree(&mut child1, None).unwrap();
    assert_eq!(child1.path(), &p("child1"));
    assert!(child1.is_root());
    assert_eq!(
        paths(&repo.roots().unwrap()),
        path_set(["child1", "root1", "root2"])
    );
    assert_eq!(
        paths(&repo.children(&f.root1).unwrap()),
        path_set(["root1.child2"])
    );
    repo.validate_invariants().unwrap();
}

pub fn move_root_to_nonroot<S: NodeStore>(repo: &mut TreeRepository<S>) {
    let lone = repo.create("lone", None).unwrap();
    let f = forest(repo);
    let mut moved = lone.clone();
    assert_eq!(
        repo.move_subtree(&mut moved, Some(&f.child4)).unwrap(),
        MoveOutcome::Moved { rows: 1 }
    );
    assert_eq!(moved.path(), &p("root2.child4.lone"));
    assert_eq!(moved.level(), 3);
    assert_eq!(paths(&repo.roots().unwrap()), path_set(["root1", "root2"]));
    repo.validate_invariants().unwrap();
}

/// Also checks that a stale copy of a descendant can't be written back over the move.
pub fn move_nonroot_with_children_to_root<S: NodeStore>(repo: &mut TreeRepository<S>) {
    let f = forest(repo);
    let mut child2 = f.child2.clone();
    assert_eq!(
        repo.move_subtree(&mut child2, None).unwrap(),
        MoveOutcome::Moved { rows: 2 }
    );
    assert_eq!(child2.path(), &p("child2"));
    assert_eq!(
        paths(&repo.descendants(&child2, false).unwrap()),
        path_set(["child2.desc3"])
    );

    let mut stale = f.desc3.clone();
    assert!(matches!(
        repo.save(&mut stale),
        Err(Error::ConstraintViolation(_))
    ));
    assert_eq!(
        all_paths(repo),
        path_set([
            "root1",
            "root1.child1",
            "child2",
            "child2.desc3",
            "root2",
            "root2.child4",
        ])
    );
    repo.validate_invariants().unwrap();
}

pub fn move_root_with_children_to_nonroot<S: NodeStore>(repo: &mut TreeRepository<S>) {
    let f = forest(repo);
    let mut root1 = f.root1.clone();
    assert_eq!(
        repo.move_subtree(&mut root1, Some(&f.root2)).unwrap(),
        MoveOutcome::Moved { rows: 4 }
    );
    assert_eq!(root1.path(), &p("root2.root1"));
    assert_eq!(
        all_paths(repo),
        path_set([
            "root2",
            "root2.child4",
            "root2.root1",
            "root2.root1.child1",
            "root2.root1.child2",
            "root2.root1.child2.desc3",
        ])
    );
    assert_eq!(paths(&repo.roots().unwrap()), path_set(["root2"]));
    repo.validate_invariants().unwrap();
}

pub fn move_deep_subtree<S: NodeStore>(repo: &mut TreeRepository<S>) {
    let chain = chain(repo);
    let x = repo.create("x", None).unwrap();
    let mut aa = chain[1].clone();
    assert_eq!(
        repo.move_subtree(&mut aa, Some(&x)).unwrap(),
        MoveOutcome::Moved { rows: 3 }
    );
    assert_eq!(aa.path(), &p("x.a"));
    assert_eq!(
        all_paths(repo),
        path_set(["a", "x", "x.a", "x.a.a", "x.a.a.a"])
    );

    let mut leaf = chain[3].clone();
    repo.refresh(&mut leaf).unwrap();
    assert_eq!(leaf.path(), &p("x.a.a.a"));
    assert_eq!(leaf.parent, Some(p("x.a.a")));

    let mut back = aa.clone();
    repo.move_subtree(&mut back, Some(&chain[0])).unwrap();
    assert_eq!(
        all_paths(repo),
        path_set(["a", "a.a", "a.a.a", "a.a.a.a", "x"])
    );
    repo.validate_invariants().unwrap();
}

pub fn move_onto_existing_path_conflicts<S: NodeStore>(repo: &mut TreeRepository<S>) {
    let a = repo.create("a", None).unwrap();
    let ab = repo.create("b", Some(&a)).unwrap();
    repo.create("c", Some(&ab)).unwrap();
    let b = repo.create("b", None).unwrap();
    repo.create("b", Some(&b)).unwrap();

    let mut moving = ab.clone();
    assert!(matches!(
        repo.move_subtree(&mut moving, Some(&b)),
        Err(Error::Conflict(_))
    ));
    assert_eq!(moving, ab);
    assert_eq!(all_paths(repo), path_set(["a", "a.b", "a.b.c", "b", "b.b"]));
}

/// A move whose rewritten descendants outgrow the path limit is rejected before any row
/// changes.
pub fn move_past_max_length_is_rejected<S: NodeStore>(repo: &mut TreeRepository<S>) {
    let target = repo.create(&"t".repeat(200), None).unwrap();
    let a = repo.create("a", None).unwrap();
    let b = repo.create(&"b".repeat(40), Some(&a)).unwrap();
    let c = repo.create(&"c".repeat(40), Some(&b)).unwrap();
    let before = all_paths(repo);

    // The moved node and its child still fit, the grandchild would not.
    assert!(target.path().as_str().len() + 1 + b.path().as_str().len() <= MAX_PATH_LEN);
    assert!(target.path().as_str().len() + 1 + c.path().as_str().len() > MAX_PATH_LEN);

    let mut moving = a.clone();
    assert!(matches!(
        repo.move_subtree(&mut moving, Some(&target)),
        Err(Error::Validation(_))
    ));
    assert_eq!(moving, a);
    assert_eq!(all_paths(repo), before);
    repo.validate_invariants().unwrap();
}

pub fn refresh_after_move<S: NodeStore>(repo: &mut TreeRepository<S>) {
    let f = forest(repo);
    let mut child2 = f.child2.clone();
    repo.move_subtree(&mut child2, Some(&f.root2)).unwrap();

    let mut desc3 = f.desc3.clone();
    assert_eq!(desc3.path(), &p("root1.child2.desc3"));
    repo.refresh(&mut desc3).unwrap();
    assert_eq!(desc3.path(), &p("root2.child2.desc3"));
    assert_eq!(desc3.parent.as_ref(), Some(child2.path()));

    repo.delete(&child2).unwrap();
    assert!(matches!(repo.refresh(&mut desc3), Err(Error::Conflict(_))));
}

pub fn delete_cascades<S: NodeStore>(repo: &mut TreeRepository<S>) {
    let f = forest(repo);
    assert_eq!(repo.delete(&f.root1).unwrap(), 4);
    assert_eq!(all_paths(repo), path_set(["root2", "root2.child4"]));
    assert_eq!(repo.get(f.desc3.id().unwrap()).unwrap(), None);

    let unsaved = Node::new("ghost", None).unwrap();
    assert!(matches!(repo.delete(&unsaved), Err(Error::Validation(_))));
    repo.validate_invariants().unwrap();
}
