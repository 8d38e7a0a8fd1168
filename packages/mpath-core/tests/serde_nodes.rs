#[cfg(feature = "serde")]
#[test]
fn nested_tree_serializes_with_string_paths() {
    use mpath_core::{nest, nest_to_json, Node, NodeId, Path};

    let node = |id: i64, path: &str| {
        let path = Path::parse(path).unwrap();
        Node::from_row(NodeId(id), path.last_label().to_string(), path.clone(), path.parent())
    };
    let nested = nest(vec![node(1, "a"), node(2, "a.b")]);
    let json = nest_to_json(&nested).expect("serialize nested tree");

    assert_eq!(json["a"]["node"]["path"], "a");
    assert_eq!(json["a"]["children"]["b"]["node"]["parent"], "a");

    let roundtrip: Node = serde_json::from_value(json["a"]["children"]["b"]["node"].clone())
        .expect("deserialize Node");
    assert_eq!(roundtrip.path().as_str(), "a.b");
}

#[cfg(feature = "serde")]
#[test]
fn invalid_paths_fail_to_deserialize() {
    let err = serde_json::from_str::<mpath_core::Path>("\"a..b\"");
    assert!(err.is_err());
}
