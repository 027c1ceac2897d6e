//! Path patterns and the rule table.
//!
//! A pattern is an ordered sequence of element-name segments, optionally
//! ending in a `*` wildcard that matches exactly one arbitrary trailing
//! segment. The rule table maps patterns to rules while preserving global
//! registration order, which is the firing order; exactness carries no
//! priority of its own.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;

use crate::error::PatternError;
use crate::rule::Rule;

/// A registered path template. Immutable after construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Pattern {
    segments: Vec<String>,
    wildcard: bool,
}

/// Split slash-separated pattern text into segments, treating a
/// `{...}`-braced namespace qualifier as atomic so URIs containing slashes
/// (e.g. `{http://example.org/cfg}server`) stay one segment.
fn split_segments(text: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut in_braces = false;
    for c in text.chars() {
        match c {
            '{' => {
                in_braces = true;
                current.push(c);
            }
            '}' => {
                in_braces = false;
                current.push(c);
            }
            '/' if !in_braces => segments.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    segments.push(current);
    segments
}

impl Pattern {
    /// Parse a pattern from slash-separated text, e.g. `server/engine` or
    /// `server/engine/*`. A `{uri}`-qualified segment is atomic: slashes
    /// inside the braces do not separate segments.
    ///
    /// # Errors
    ///
    /// Empty patterns, empty segments, and wildcards in a non-final position
    /// are rejected.
    pub fn parse(text: &str) -> Result<Self, PatternError> {
        if text.is_empty() {
            return Err(PatternError::Empty);
        }
        let raw = split_segments(text);
        if raw.iter().any(|s| s.is_empty()) {
            return Err(PatternError::EmptySegment {
                pattern: text.to_string(),
            });
        }
        let wildcard = raw.last().map_or(false, |s| s == "*");
        let body = if wildcard { &raw[..raw.len() - 1] } else { &raw[..] };
        if body.iter().any(|s| s == "*") {
            return Err(PatternError::MisplacedWildcard {
                pattern: text.to_string(),
            });
        }
        Ok(Self {
            segments: body.to_vec(),
            wildcard,
        })
    }

    /// True if this pattern matches the concrete path.
    ///
    /// An exact pattern matches a path with identical segments. A wildcard
    /// pattern matches when the path is exactly one segment longer than the
    /// fixed prefix; `a/b/*` matches `a/b/x` but neither `a/b` nor
    /// `a/b/x/y`.
    pub fn matches(&self, path: &[String]) -> bool {
        if self.wildcard {
            path.len() == self.segments.len() + 1
                && path[..self.segments.len()] == self.segments[..]
        } else {
            path == self.segments
        }
    }

    pub fn is_wildcard(&self) -> bool {
        self.wildcard
    }

    /// Lookup key for exact patterns: the segment sequence itself. Joined
    /// strings would alias a segment containing `/` with a multi-segment
    /// path.
    fn exact_key(&self) -> Vec<String> {
        self.segments.clone()
    }

    /// Lookup key for wildcard patterns: the fixed prefix (empty for a bare
    /// `*`).
    fn prefix_key(&self) -> Vec<String> {
        self.segments.clone()
    }
}

impl FromStr for Pattern {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Pattern::parse(s)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.wildcard {
            if self.segments.is_empty() {
                write!(f, "*")
            } else {
                write!(f, "{}/*", self.segments.join("/"))
            }
        } else {
            write!(f, "{}", self.segments.join("/"))
        }
    }
}

/// Registry of (pattern, rule) pairs with order-preserving matching.
///
/// Rules live in a single vector so that global registration order is the
/// tiebreaker across exact and wildcard patterns; the two side indexes keyed
/// by path make matching a pair of map lookups plus an ordered merge.
#[derive(Default)]
pub struct RuleTable {
    entries: Vec<(Pattern, Rule)>,
    exact: IndexMap<Vec<String>, Vec<usize>>,
    by_prefix: IndexMap<Vec<String>, Vec<usize>>,
}

impl RuleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule for a pattern. Multiple rules may share a pattern; all
    /// fire, in registration order.
    pub fn register(&mut self, pattern: Pattern, rule: Rule) {
        let idx = self.entries.len();
        if pattern.is_wildcard() {
            self.by_prefix
                .entry(pattern.prefix_key())
                .or_default()
                .push(idx);
        } else {
            self.exact
                .entry(pattern.exact_key())
                .or_default()
                .push(idx);
        }
        self.entries.push((pattern, rule));
    }

    /// Parse-and-register convenience.
    pub fn register_str(&mut self, pattern: &str, rule: Rule) -> Result<(), PatternError> {
        let pattern = Pattern::parse(pattern)?;
        self.register(pattern, rule);
        Ok(())
    }

    /// Indices of every rule matching `path`, in global registration order.
    ///
    /// A path with no matching rules is legal and yields an empty list.
    pub fn matches_for(&self, path: &[String]) -> Vec<usize> {
        if path.is_empty() {
            return Vec::new();
        }
        let exact = self.exact.get(path).map(Vec::as_slice).unwrap_or(&[]);
        let wild = self
            .by_prefix
            .get(&path[..path.len() - 1])
            .map(Vec::as_slice)
            .unwrap_or(&[]);

        // Ordered merge of two already-sorted index lists.
        let mut merged = Vec::with_capacity(exact.len() + wild.len());
        let (mut i, mut j) = (0, 0);
        while i < exact.len() && j < wild.len() {
            if exact[i] < wild[j] {
                merged.push(exact[i]);
                i += 1;
            } else {
                merged.push(wild[j]);
                j += 1;
            }
        }
        merged.extend_from_slice(&exact[i..]);
        merged.extend_from_slice(&wild[j..]);
        // The indexes are a candidate pre-filter; Pattern::matches stays the
        // single authority on what a pattern accepts.
        merged.retain(|&idx| self.entries[idx].0.matches(path));
        merged
    }

    /// Access a rule by the index returned from [`RuleTable::matches_for`].
    pub fn rule(&self, idx: usize) -> &Rule {
        &self.entries[idx].1
    }

    /// Iterate registered (pattern, rule) pairs in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&Pattern, &Rule)> {
        self.entries.iter().map(|(p, r)| (p, r))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::Rule;

    fn path(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    fn marker_rule() -> Rule {
        Rule::bind_attributes()
    }

    #[test]
    fn test_parse_exact_pattern() {
        let p = Pattern::parse("server/engine").unwrap();
        assert!(!p.is_wildcard());
        assert_eq!(p.to_string(), "server/engine");
    }

    #[test]
    fn test_parse_wildcard_pattern() {
        let p = Pattern::parse("server/engine/*").unwrap();
        assert!(p.is_wildcard());
        assert_eq!(p.to_string(), "server/engine/*");
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert_eq!(Pattern::parse(""), Err(PatternError::Empty));
    }

    #[test]
    fn test_parse_rejects_empty_segment() {
        assert!(matches!(
            Pattern::parse("a//b"),
            Err(PatternError::EmptySegment { .. })
        ));
    }

    #[test]
    fn test_parse_rejects_inner_wildcard() {
        assert!(matches!(
            Pattern::parse("a/*/b"),
            Err(PatternError::MisplacedWildcard { .. })
        ));
    }

    #[test]
    fn test_exact_match() {
        let p = Pattern::parse("a/b").unwrap();
        assert!(p.matches(&path(&["a", "b"])));
        assert!(!p.matches(&path(&["a"])));
        assert!(!p.matches(&path(&["a", "b", "c"])));
        assert!(!p.matches(&path(&["a", "B"])));
    }

    #[test]
    fn test_wildcard_matches_single_trailing_segment() {
        let p = Pattern::parse("a/b/*").unwrap();
        assert!(p.matches(&path(&["a", "b", "x"])));
        assert!(p.matches(&path(&["a", "b", "y"])));
        assert!(!p.matches(&path(&["a", "b"])));
        assert!(!p.matches(&path(&["a", "b", "x", "y"])));
    }

    #[test]
    fn test_bare_wildcard_matches_any_root() {
        let p = Pattern::parse("*").unwrap();
        assert!(p.matches(&path(&["anything"])));
        assert!(!p.matches(&path(&["a", "b"])));
    }

    #[test]
    fn test_matches_for_returns_registration_order() {
        let mut table = RuleTable::new();
        table.register_str("a/b", marker_rule()).unwrap();
        table.register_str("a/b", marker_rule()).unwrap();
        assert_eq!(table.matches_for(&path(&["a", "b"])), vec![0, 1]);
        assert!(table.matches_for(&path(&["a"])).is_empty());
    }

    #[test]
    fn test_matches_for_merges_exact_and_wildcard_by_registration() {
        let mut table = RuleTable::new();
        table.register_str("a/*", marker_rule()).unwrap(); // 0
        table.register_str("a/b", marker_rule()).unwrap(); // 1
        table.register_str("a/*", marker_rule()).unwrap(); // 2
        // Exactness is not a priority signal; global order decides.
        assert_eq!(table.matches_for(&path(&["a", "b"])), vec![0, 1, 2]);
        assert_eq!(table.matches_for(&path(&["a", "z"])), vec![0, 2]);
    }

    #[test]
    fn test_parse_keeps_braced_namespace_segment_atomic() {
        let p = Pattern::parse("{http://example.org/cfg}server/engine").unwrap();
        assert!(!p.is_wildcard());
        assert!(p.matches(&path(&["{http://example.org/cfg}server", "engine"])));
        assert!(!p.matches(&path(&["{http:", "", "example.org", "cfg}server", "engine"])));
    }

    #[test]
    fn test_wildcard_after_braced_namespace_segment() {
        let p = Pattern::parse("{http://example.org/cfg}server/*").unwrap();
        assert!(p.is_wildcard());
        assert!(p.matches(&path(&["{http://example.org/cfg}server", "anything"])));
    }

    #[test]
    fn test_segment_containing_slash_does_not_alias_multi_segment_path() {
        let mut table = RuleTable::new();
        table.register_str("a/b", marker_rule()).unwrap();
        // A single path segment that happens to contain a slash is a
        // different path from ["a", "b"].
        assert!(table.matches_for(&path(&["a/b"])).is_empty());

        let mut qualified = RuleTable::new();
        qualified
            .register_str("{http://example.org/cfg}server", marker_rule())
            .unwrap();
        assert_eq!(
            qualified.matches_for(&path(&["{http://example.org/cfg}server"])),
            vec![0]
        );
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        let mut table = RuleTable::new();
        table.register_str("a/b", marker_rule()).unwrap();
        assert!(table.matches_for(&path(&["a", "B"])).is_empty());
    }

    #[test]
    fn test_empty_path_matches_nothing() {
        let mut table = RuleTable::new();
        table.register_str("*", marker_rule()).unwrap();
        assert!(table.matches_for(&[]).is_empty());
    }
}
