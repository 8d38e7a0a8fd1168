//! A subset of the `ltree` `lquery` language: literal labels and `*` quantifiers.
//!
//! Patterns render to lquery text for the database and can also be evaluated in memory
//! with [`PathPattern::matches`].

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::path::{validate_label, Path, SEPARATOR};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PatternItem {
    /// Exactly this label.
    Label(String),
    /// Between `min` and `max` (unbounded when `None`) arbitrary labels.
    Any { min: usize, max: Option<usize> },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathPattern {
    items: Vec<PatternItem>,
}

impl PathPattern {
    pub fn new(items: Vec<PatternItem>) -> Result<Self> {
        if items.is_empty() {
            return Err(Error::Validation("pattern needs at least one item".into()));
        }
        for item in &items {
            match item {
                PatternItem::Label(label) => validate_label(label)?,
                PatternItem::Any { min, max: Some(max) } if min > max => {
                    return Err(Error::Validation(format!(
                        "pattern quantifier {{{min},{max}}} has min > max"
                    )));
                }
                PatternItem::Any { .. } => {}
            }
        }
        Ok(Self { items })
    }

    fn prefixed(path: &Path, tail: PatternItem) -> Self {
        let mut items: Vec<PatternItem> = path
            .labels()
            .map(|label| PatternItem::Label(label.to_string()))
            .collect();
        items.push(tail);
        Self { items }
    }

    /// `path.*{1}`
    pub fn children_of(path: &Path) -> Self {
        Self::prefixed(
            path,
            PatternItem::Any {
                min: 1,
                max: Some(1),
            },
        )
    }

    /// `path.*`
    pub fn subtree_of(path: &Path) -> Self {
        Self::prefixed(path, PatternItem::Any { min: 0, max: None })
    }

    /// `*{1}`: every root path.
    pub fn roots() -> Self {
        Self {
            items: vec![PatternItem::Any {
                min: 1,
                max: Some(1),
            }],
        }
    }

    pub fn items(&self) -> &[PatternItem] {
        &self.items
    }

    pub fn matches(&self, path: &Path) -> bool {
        let labels: Vec<&str> = path.labels().collect();
        match_from(&self.items, &labels)
    }
}

fn match_from(items: &[PatternItem], labels: &[&str]) -> bool {
    match items.split_first() {
        None => labels.is_empty(),
        Some((PatternItem::Label(label), rest)) => match labels.split_first() {
            Some((head, tail)) => *head == label.as_str() && match_from(rest, tail),
            None => false,
        },
        Some((PatternItem::Any { min, max }, rest)) => {
            let upper = max.unwrap_or(labels.len()).min(labels.len());
            (*min..=upper).any(|n| match_from(rest, &labels[n..]))
        }
    }
}

fn parse_bound(raw: &str, pattern: &str) -> Result<Option<usize>> {
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<usize>()
        .map(Some)
        .map_err(|_| Error::Validation(format!("invalid quantifier in pattern {pattern:?}")))
}

fn parse_item(raw: &str, pattern: &str) -> Result<PatternItem> {
    let Some(quant) = raw.strip_prefix('*') else {
        return Ok(PatternItem::Label(raw.to_string()));
    };
    if quant.is_empty() {
        return Ok(PatternItem::Any { min: 0, max: None });
    }
    let inner = quant
        .strip_prefix('{')
        .and_then(|q| q.strip_suffix('}'))
        .ok_or_else(|| Error::Validation(format!("invalid quantifier in pattern {pattern:?}")))?;
    match inner.split_once(',') {
        None => {
            let n = parse_bound(inner, pattern)?
                .ok_or_else(|| Error::Validation(format!("empty quantifier in {pattern:?}")))?;
            Ok(PatternItem::Any {
                min: n,
                max: Some(n),
            })
        }
        Some((lo, hi)) => Ok(PatternItem::Any {
            min: parse_bound(lo, pattern)?.unwrap_or(0),
            max: parse_bound(hi, pattern)?,
        }),
    }
}

impl FromStr for PathPattern {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let items = s
            .split(SEPARATOR)
            .map(|raw| parse_item(raw, s))
            .collect::<Result<Vec<_>>>()?;
        PathPattern::new(items)
    }
}

impl fmt::Display for PatternItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternItem::Label(label) => f.write_str(label),
            PatternItem::Any { min: 0, max: None } => f.write_str("*"),
            PatternItem::Any { min, max: None } => write!(f, "*{{{min},}}"),
            PatternItem::Any { min, max: Some(max) } if min == max => write!(f, "*{{{min}}}"),
            PatternItem::Any { min: 0, max: Some(max) } => write!(f, "*{{,{max}}}"),
            PatternItem::Any { min, max: Some(max) } => write!(f, "*{{{min},{max}}}"),
        }
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                write!(f, "{SEPARATOR}")?;
            }
            write!(f, "{item}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> Path {
        Path::parse(s).unwrap()
    }

    #[test]
    fn children_pattern_matches_one_level_down() {
        let pattern = p("a.b").children_pattern();
        assert_eq!(pattern.to_string(), "a.b.*{1}");
        assert!(pattern.matches(&p("a.b.c")));
        assert!(!pattern.matches(&p("a.b")));
        assert!(!pattern.matches(&p("a.b.c.d")));
        assert!(!pattern.matches(&p("a.bc.d")));
    }

    #[test]
    fn subtree_pattern_includes_self() {
        let pattern = p("a").subtree_pattern();
        assert_eq!(pattern.to_string(), "a.*");
        assert!(pattern.matches(&p("a")));
        assert!(pattern.matches(&p("a.b.c")));
        assert!(!pattern.matches(&p("b.a")));
    }

    #[test]
    fn parses_lquery_quantifiers() {
        for text in ["*", "*{1}", "a.*{2,}", "*{,3}.z", "a.*{1,2}.c"] {
            let pattern: PathPattern = text.parse().unwrap();
            assert_eq!(pattern.to_string(), text);
        }
        let pattern: PathPattern = "a.*{1,2}.c".parse().unwrap();
        assert!(pattern.matches(&p("a.x.c")));
        assert!(pattern.matches(&p("a.x.y.c")));
        assert!(!pattern.matches(&p("a.c")));
        assert!(!pattern.matches(&p("a.x.y.z.c")));
    }

    #[test]
    fn rejects_bad_patterns() {
        assert!("".parse::<PathPattern>().is_err());
        assert!("a..b".parse::<PathPattern>().is_err());
        assert!("*{x}".parse::<PathPattern>().is_err());
        assert!("*{3,1}".parse::<PathPattern>().is_err());
        assert!("*{".parse::<PathPattern>().is_err());
    }

    #[test]
    fn roots_pattern() {
        assert!(PathPattern::roots().matches(&p("a")));
        assert!(!PathPattern::roots().matches(&p("a.b")));
    }
}
