//! Markup event model for graph assembly.
//!
//! The assembly engine is fed a stream of pre-tokenized markup events; the
//! tokenizer itself lives outside this crate. Collaborating readers are
//! expected to deliver well-formed, balanced events with element names and
//! ordered attribute lists.

use std::fmt;

/// Qualified element or attribute name.
///
/// Carries the local name plus optional prefix and namespace URI as reported
/// by the event source. Path matching uses [`QName::segment`], which honors
/// the engine's namespace-awareness setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QName {
    /// Local name without prefix (e.g., "engine")
    pub local: String,
    /// Namespace prefix, if the source reported one (e.g., "cfg")
    pub prefix: Option<String>,
    /// Namespace URI bound to the prefix, if known
    pub namespace: Option<String>,
}

impl QName {
    /// Create a name with no namespace information.
    pub fn local(name: impl Into<String>) -> Self {
        Self {
            local: name.into(),
            prefix: None,
            namespace: None,
        }
    }

    /// Create a namespace-qualified name.
    pub fn qualified(
        name: impl Into<String>,
        prefix: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            local: name.into(),
            prefix: Some(prefix.into()),
            namespace: Some(namespace.into()),
        }
    }

    /// Compute the path segment this name contributes.
    ///
    /// With namespace awareness off, the segment is the bare local name and
    /// any prefix is ignored. With it on, a known namespace URI qualifies the
    /// segment as `{uri}local`; names without a URI fall back to the local
    /// name.
    pub fn segment(&self, namespace_aware: bool) -> String {
        if namespace_aware {
            if let Some(uri) = &self.namespace {
                return format!("{{{}}}{}", uri, self.local);
            }
        }
        self.local.clone()
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(p) => write!(f, "{}:{}", p, self.local),
            None => write!(f, "{}", self.local),
        }
    }
}

/// A single name/value attribute pair. Document order is preserved by
/// carrying attributes in a `Vec`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: QName,
    pub value: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: QName::local(name),
            value: value.into(),
        }
    }
}

/// One markup event as delivered by the external event source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// An element opened, with its ordered attribute list.
    StartElement {
        name: QName,
        attributes: Vec<Attribute>,
    },
    /// Character data inside the innermost open element.
    Characters(String),
    /// An element closed. The name must match the innermost open element.
    EndElement { name: QName },
    /// End of the document stream.
    EndDocument,
}

impl Event {
    /// Convenience constructor for a start element with plain-named
    /// attributes.
    ///
    /// # Example
    ///
    /// ```
    /// use grafter::Event;
    ///
    /// let ev = Event::start("child", &[("name", "n"), ("count", "3")]);
    /// ```
    pub fn start(name: impl Into<String>, attributes: &[(&str, &str)]) -> Self {
        Event::StartElement {
            name: QName::local(name),
            attributes: attributes
                .iter()
                .map(|(k, v)| Attribute::new(*k, *v))
                .collect(),
        }
    }

    /// Convenience constructor for character data.
    pub fn text(text: impl Into<String>) -> Self {
        Event::Characters(text.into())
    }

    /// Convenience constructor for an end element.
    pub fn end(name: impl Into<String>) -> Self {
        Event::EndElement {
            name: QName::local(name),
        }
    }
}
