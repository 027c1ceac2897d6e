//! Placeholder expansion against layered property sources.
//!
//! Configuration text may carry `${NAME}` and `${NAME:-DEFAULT}` tokens.
//! Resolution consults a static map first, then dynamic providers in order;
//! the first hit wins. Unresolved tokens without a default are preserved
//! verbatim so dangling references stay visible instead of silently becoming
//! empty strings.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Matches `${...}` tokens. A bare `$`, or `${` with no closing brace, never
/// matches and passes through untouched.
static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([^}]*)\}").expect("placeholder regex is valid"));

/// A named string-value provider consulted during placeholder resolution.
///
/// Implementations must be side-effect free with respect to the expansion
/// pass; they are queried once per token occurrence.
pub trait PropertySource {
    /// Look up a value for `key`. `None` means this source has no opinion and
    /// the next source in the chain is consulted.
    fn lookup(&self, key: &str) -> Option<String>;
}

impl<F> PropertySource for F
where
    F: Fn(&str) -> Option<String>,
{
    fn lookup(&self, key: &str) -> Option<String> {
        self(key)
    }
}

/// Ordered chain of property sources: a static map first, then zero or more
/// dynamic providers queried in registration order.
#[derive(Default)]
pub struct SourceChain {
    statics: IndexMap<String, String>,
    dynamics: Vec<Box<dyn PropertySource + Send + Sync>>,
}

impl SourceChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a static key/value pair. Static entries take priority over every
    /// dynamic source.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.statics.insert(key.into(), value.into());
        self
    }

    /// Append a dynamic source to the end of the chain.
    pub fn push_source(&mut self, source: Box<dyn PropertySource + Send + Sync>) -> &mut Self {
        self.dynamics.push(source);
        self
    }

    /// Resolve a key against the chain: static map first, then dynamic
    /// sources in order. First non-`None` result wins.
    pub fn resolve(&self, key: &str) -> Option<String> {
        if let Some(v) = self.statics.get(key) {
            return Some(v.clone());
        }
        self.dynamics.iter().find_map(|s| s.lookup(key))
    }

    /// Expand every placeholder token in `text`. See [`expand`].
    pub fn expand(&self, text: &str) -> String {
        expand(text, self)
    }
}

/// Expand `${NAME}` and `${NAME:-DEFAULT}` tokens in `text` against `chain`.
///
/// Resolution per token: the full token content is looked up first; if that
/// misses and the content contains a `:-` separator, the left part is looked
/// up and the right part serves as a literal default. A token that still
/// resolves to nothing is left verbatim. Expansion is a single pass:
/// substituted values are never re-scanned, so sources cannot introduce
/// substitution loops.
///
/// # Example
///
/// ```
/// use grafter::{expand, SourceChain};
///
/// let mut chain = SourceChain::new();
/// chain.set("host", "db.internal");
///
/// assert_eq!(expand("${host}:${port:-5432}", &chain), "db.internal:5432");
/// assert_eq!(expand("${missing}", &chain), "${missing}");
/// ```
pub fn expand(text: &str, chain: &SourceChain) -> String {
    if !text.contains('$') {
        return text.to_string();
    }
    PLACEHOLDER
        .replace_all(text, |caps: &Captures<'_>| {
            let content = &caps[1];
            if let Some(value) = chain.resolve(content) {
                return value;
            }
            if let Some((key, default)) = content.split_once(":-") {
                return chain.resolve(key).unwrap_or_else(|| default.to_string());
            }
            // Unresolved, no default: keep the token visible.
            caps[0].to_string()
        })
        .into_owned()
}
