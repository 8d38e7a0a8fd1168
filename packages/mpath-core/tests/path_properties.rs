use mpath_core::Path;
use proptest::prelude::*;

fn label() -> impl Strategy<Value = String> {
    "[a-z0-9_-]{1,6}"
}

fn path() -> impl Strategy<Value = Path> {
    prop::collection::vec(label(), 1..6).prop_map(|labels| Path::from_labels(labels).unwrap())
}

proptest! {
    #[test]
    fn child_inverts_parent(p in path(), l in label()) {
        let child = p.child(&l).unwrap();
        prop_assert_eq!(child.parent(), Some(p.clone()));
        prop_assert_eq!(child.level(), p.level() + 1);
        prop_assert_eq!(child.last_label(), l.as_str());
    }

    #[test]
    fn ancestor_is_mirror_of_descendant(a in path(), b in path(), include_self in any::<bool>()) {
        prop_assert_eq!(a.is_ancestor_of(&b, include_self), b.is_descendant_of(&a, include_self));
    }

    #[test]
    fn nothing_is_its_own_strict_ancestor(a in path()) {
        prop_assert!(!a.is_ancestor_of(&a, false));
        prop_assert!(a.is_ancestor_of(&a, true));
    }

    #[test]
    fn ancestor_matches_label_truncation(a in path(), b in path()) {
        let a_labels: Vec<&str> = a.labels().collect();
        let b_labels: Vec<&str> = b.labels().collect();
        let expected = b.level() > a.level() && b_labels[..a.level() + 1] == a_labels[..];
        prop_assert_eq!(a.is_ancestor_of(&b, false), expected);
    }

    #[test]
    fn tail_after_and_join_reassemble(p in path(), split in 1usize..6) {
        prop_assume!(split < p.depth());
        let tail = p.tail_after(split).unwrap();
        let head = Path::from_labels(p.labels().take(split)).unwrap();
        prop_assert_eq!(head.join(&tail).unwrap(), p.clone());
        prop_assert_eq!(tail.depth(), p.depth() - split);
    }

    #[test]
    fn patterns_agree_with_relationships(a in path(), b in path()) {
        prop_assert_eq!(a.subtree_pattern().matches(&b), b.is_descendant_of(&a, true));
        prop_assert_eq!(
            a.children_pattern().matches(&b),
            b.parent().as_ref() == Some(&a)
        );
    }

    #[test]
    fn display_parses_back(p in path()) {
        prop_assert_eq!(p.to_string().parse::<Path>().unwrap(), p);
    }
}
