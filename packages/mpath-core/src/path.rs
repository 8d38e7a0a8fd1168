use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::pattern::PathPattern;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Separator between labels in the serialized form.
pub const SEPARATOR: char = '.';

/// Maximum length of a serialized path, in bytes.
pub const MAX_PATH_LEN: usize = 256;

/// Maximum length of a single label, in bytes (the width of the stored label column).
pub const MAX_LABEL_LEN: usize = 255;

fn is_label_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Checks a single label: non-empty, at most [`MAX_LABEL_LEN`] bytes, restricted to
/// `[A-Za-z0-9_-]`.
///
/// `.` is the separator and is never valid inside a label.
pub fn validate_label(label: &str) -> Result<()> {
    if label.is_empty() {
        return Err(Error::Validation("label must not be empty".into()));
    }
    if label.len() > MAX_LABEL_LEN {
        return Err(Error::Validation(format!(
            "label exceeds {MAX_LABEL_LEN} characters: {} given",
            label.len()
        )));
    }
    if let Some(c) = label.chars().find(|c| !is_label_char(*c)) {
        return Err(Error::Validation(format!(
            "label {label:?} contains invalid character {c:?}"
        )));
    }
    Ok(())
}

/// Materialized path of a node: the ordered labels from its root down to itself.
///
/// Stored in serialized form (`a.b.c`); every constructor validates, so an existing `Path`
/// always has at least one label and never exceeds [`MAX_PATH_LEN`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(try_from = "String", into = "String")
)]
pub struct Path(String);

impl Path {
    fn bounded(serialized: String) -> Result<Self> {
        if serialized.len() > MAX_PATH_LEN {
            return Err(Error::Validation(format!(
                "path exceeds {MAX_PATH_LEN} characters: {} given",
                serialized.len()
            )));
        }
        Ok(Self(serialized))
    }

    pub fn parse(serialized: &str) -> Result<Self> {
        for label in serialized.split(SEPARATOR) {
            validate_label(label)?;
        }
        Self::bounded(serialized.to_string())
    }

    /// Path of a root node.
    pub fn root(label: &str) -> Result<Self> {
        validate_label(label)?;
        Self::bounded(label.to_string())
    }

    pub fn from_labels<I, S>(labels: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out = String::new();
        for (i, label) in labels.into_iter().enumerate() {
            let label = label.as_ref();
            validate_label(label)?;
            if i > 0 {
                out.push(SEPARATOR);
            }
            out.push_str(label);
        }
        if out.is_empty() {
            return Err(Error::Validation("path needs at least one label".into()));
        }
        Self::bounded(out)
    }

    /// `parent ++ label`, or just `label` without a parent.
    pub fn derive(parent: Option<&Path>, label: &str) -> Result<Self> {
        match parent {
            Some(parent) => parent.child(label),
            None => Self::root(label),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn labels(&self) -> impl DoubleEndedIterator<Item = &str> + '_ {
        self.0.split(SEPARATOR)
    }

    /// Root paths have level 0.
    pub fn level(&self) -> usize {
        self.0.matches(SEPARATOR).count()
    }

    /// Number of labels (`level + 1`).
    pub fn depth(&self) -> usize {
        self.level() + 1
    }

    pub fn is_root(&self) -> bool {
        !self.0.contains(SEPARATOR)
    }

    pub fn last_label(&self) -> &str {
        match self.0.rsplit_once(SEPARATOR) {
            Some((_, last)) => last,
            None => &self.0,
        }
    }

    pub fn parent(&self) -> Option<Path> {
        self.0
            .rsplit_once(SEPARATOR)
            .map(|(head, _)| Path(head.to_string()))
    }

    pub fn child(&self, label: &str) -> Result<Path> {
        validate_label(label)?;
        Self::bounded(format!("{}{SEPARATOR}{label}", self.0))
    }

    /// Concatenates two paths (`self ++ tail`).
    pub fn join(&self, tail: &Path) -> Result<Path> {
        Self::bounded(format!("{}{SEPARATOR}{}", self.0, tail.0))
    }

    /// The labels strictly after the first `depth` ones, or `None` when nothing remains.
    pub fn tail_after(&self, depth: usize) -> Option<Path> {
        if depth == 0 {
            return Some(self.clone());
        }
        let (idx, _) = self.0.match_indices(SEPARATOR).nth(depth - 1)?;
        Some(Path(self.0[idx + 1..].to_string()))
    }

    pub fn is_ancestor_of(&self, other: &Path, include_self: bool) -> bool {
        if self == other {
            return include_self;
        }
        // Label-wise prefix: `other` must continue past `self` with a separator.
        other.0.len() > self.0.len()
            && other.0.starts_with(&self.0)
            && other.0.as_bytes()[self.0.len()] == SEPARATOR as u8
    }

    pub fn is_descendant_of(&self, other: &Path, include_self: bool) -> bool {
        other.is_ancestor_of(self, include_self)
    }

    /// Pattern matching exactly the direct children of this path.
    pub fn children_pattern(&self) -> PathPattern {
        PathPattern::children_of(self)
    }

    /// Pattern matching this path and every descendant.
    pub fn subtree_pattern(&self) -> PathPattern {
        PathPattern::subtree_of(self)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Path {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Path::parse(s)
    }
}

impl AsRef<str> for Path {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Path {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Path::parse(&value)
    }
}

impl TryFrom<&str> for Path {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        Path::parse(value)
    }
}

impl From<Path> for String {
    fn from(path: Path) -> Self {
        path.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> Path {
        Path::parse(s).unwrap()
    }

    #[test]
    fn decomposes_into_labels_and_levels() {
        let path = p("a.b.c");
        assert_eq!(path.labels().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(path.level(), 2);
        assert_eq!(path.depth(), 3);
        assert_eq!(path.last_label(), "c");
        assert_eq!(path.parent(), Some(p("a.b")));
        assert_eq!(p("a").parent(), None);
        assert!(p("a").is_root());
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(matches!(Path::parse(""), Err(Error::Validation(_))));
        assert!(matches!(Path::parse("a..b"), Err(Error::Validation(_))));
        assert!(matches!(Path::parse("a.b."), Err(Error::Validation(_))));
        assert!(matches!(Path::root("a.b"), Err(Error::Validation(_))));
        assert!(matches!(Path::root("with space"), Err(Error::Validation(_))));
        assert!(matches!(p("a").child(""), Err(Error::Validation(_))));
        assert!(Path::from_labels(Vec::<&str>::new()).is_err());
    }

    #[test]
    fn enforces_max_length() {
        let label = "x".repeat(MAX_LABEL_LEN);
        let long = Path::root(&label).unwrap();
        assert!(matches!(
            Path::root(&"x".repeat(MAX_LABEL_LEN + 1)),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            validate_label(&"x".repeat(MAX_LABEL_LEN + 1)),
            Err(Error::Validation(_))
        ));

        assert_eq!(long.as_str().len(), MAX_PATH_LEN - 1);
        // 255 + separator + 1 = 257 bytes.
        assert!(matches!(long.child("y"), Err(Error::Validation(_))));
        let fits = Path::root(&"x".repeat(MAX_PATH_LEN - 2)).unwrap();
        assert_eq!(fits.child("y").unwrap().as_str().len(), MAX_PATH_LEN);
    }

    #[test]
    fn ancestor_tests_respect_label_boundaries() {
        assert!(p("a").is_ancestor_of(&p("a.b"), false));
        assert!(p("a").is_ancestor_of(&p("a.b.c"), false));
        assert!(!p("a").is_ancestor_of(&p("ab.c"), false));
        assert!(!p("a.b").is_ancestor_of(&p("a"), false));
        assert!(!p("a").is_ancestor_of(&p("a"), false));
        assert!(p("a").is_ancestor_of(&p("a"), true));
        assert!(p("a.b").is_descendant_of(&p("a"), false));
        assert!(!p("a").is_descendant_of(&p("a"), false));
    }

    #[test]
    fn tail_after_drops_leading_labels() {
        let path = p("a.b.c.d");
        assert_eq!(path.tail_after(0), Some(p("a.b.c.d")));
        assert_eq!(path.tail_after(2), Some(p("c.d")));
        assert_eq!(path.tail_after(3), Some(p("d")));
        assert_eq!(path.tail_after(4), None);
    }

    #[test]
    fn join_and_derive() {
        assert_eq!(p("x.y").join(&p("c.d")).unwrap(), p("x.y.c.d"));
        assert_eq!(Path::derive(None, "a").unwrap(), p("a"));
        assert_eq!(Path::derive(Some(&p("a")), "b").unwrap(), p("a.b"));
    }
}
