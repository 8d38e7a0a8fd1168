use mpath_core::{materialize, nest, tree_path, Node, NodeId, Path};

fn node(id: i64, path: &str) -> Node {
    let path = Path::parse(path).unwrap();
    Node::from_row(
        NodeId(id),
        path.last_label().to_string(),
        path.clone(),
        path.parent(),
    )
}

fn labels(nodes: &[Node]) -> Vec<&str> {
    nodes.iter().map(|n| n.label.as_str()).collect()
}

#[test]
fn empty_input_gives_empty_forest() {
    assert!(materialize(Vec::new()).is_empty());
    assert!(nest(Vec::new()).is_empty());
}

#[test]
fn builds_nested_children() {
    let trees = materialize(vec![
        node(4, "r.b.x"),
        node(1, "r"),
        node(2, "r.a"),
        node(3, "r.b"),
    ]);
    assert_eq!(trees.len(), 1);
    let root = &trees[0];
    assert_eq!(root.path().as_str(), "r");

    let children = root.cached_children().unwrap();
    assert_eq!(labels(children), vec!["a", "b"]);
    assert_eq!(children[0].cached_children().unwrap().len(), 0);
    let grandchildren = children[1].cached_children().unwrap();
    assert_eq!(labels(grandchildren), vec!["x"]);
    assert!(grandchildren[0].cached_children().unwrap().is_empty());
}

#[test]
fn keeps_input_order_for_forests() {
    let trees = materialize(vec![
        node(1, "a"),
        node(2, "a.aa"),
        node(3, "a.aa.aaa"),
        node(4, "a.aa.aaz"),
        node(5, "b"),
        node(6, "b.bb"),
    ]);
    assert_eq!(labels(&trees), vec!["a", "b"]);
    let aa = &trees[0].cached_children().unwrap()[0];
    assert_eq!(labels(aa.cached_children().unwrap()), vec!["aaa", "aaz"]);
    let bb = &trees[1].cached_children().unwrap()[0];
    assert!(bb.cached_children().unwrap().is_empty());
}

#[test]
fn partial_subtrees_start_at_the_minimum_level() {
    // Children of `a` only: the minimum level is 1, so both become top-level.
    let trees = materialize(vec![node(2, "a.x"), node(3, "a.y"), node(4, "a.y.z")]);
    assert_eq!(labels(&trees), vec!["x", "y"]);
    assert_eq!(labels(trees[1].cached_children().unwrap()), vec!["z"]);
}

#[test]
fn deeper_orphans_are_dropped() {
    let trees = materialize(vec![node(1, "a"), node(5, "b.c.d")]);
    assert_eq!(labels(&trees), vec!["a"]);
    assert!(trees[0].cached_children().unwrap().is_empty());
}

#[test]
fn nest_keys_top_level_by_path_and_children_by_label() {
    let nested = nest(vec![
        node(1, "a"),
        node(2, "a.x"),
        node(3, "a.x.y"),
        node(4, "b"),
    ]);
    assert_eq!(nested.keys().collect::<Vec<_>>(), vec!["a", "b"]);
    let x = &nested["a"].children["x"];
    assert_eq!(x.node.path().as_str(), "a.x");
    assert!(x.node.cached_children().is_none());
    assert!(x.children["y"].children.is_empty());

    let partial = nest(vec![node(2, "p.same"), node(3, "q.same")]);
    assert_eq!(partial.keys().collect::<Vec<_>>(), vec!["p.same", "q.same"]);
}

#[test]
fn tree_path_joins_labels() {
    let nodes = vec![node(1, "a"), node(2, "a.b"), node(3, "a.b.c")];
    assert_eq!(tree_path(&nodes, " > "), "a > b > c");
    assert_eq!(tree_path(&nodes[..1], " > "), "a");
    assert_eq!(tree_path(std::iter::empty(), "/"), "");
}
