//! Error taxonomy for graph assembly.
//!
//! Structural problems (malformed streams, unresolvable types, stack
//! underflow) abort a run and carry the path at which they occurred. Binding
//! problems are tolerated by default and collected as diagnostics; strict
//! mode promotes them to structural errors.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Fatal error kinds raised while processing a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildErrorKind {
    /// The event stream violated well-formedness assumptions
    /// (mismatched or extra end tags, truncated document, missing root).
    MalformedStream(String),
    /// A Create rule could not resolve any constructible type.
    TypeNotFound { name: String },
    /// A named body method or link operation is absent from the target's
    /// capability map.
    OperationNotFound {
        type_name: String,
        operation: String,
    },
    /// A body method or link operation was found but reported a failure.
    OperationFailed {
        type_name: String,
        operation: String,
        message: String,
    },
    /// An operation needed more objects than the stack holds.
    StackUnderflow { operation: String },
    /// Element nesting exceeded the configured depth cap.
    DocumentTooDeep { limit: usize },
    /// A binding failure promoted to fatal under strict validation.
    BindingRejected { property: String, reason: String },
}

impl fmt::Display for BuildErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildErrorKind::MalformedStream(msg) => write!(f, "Malformed event stream: {}", msg),
            BuildErrorKind::TypeNotFound { name } => {
                write!(f, "No constructible type named '{}'", name)
            }
            BuildErrorKind::OperationNotFound {
                type_name,
                operation,
            } => {
                write!(f, "Type '{}' has no operation '{}'", type_name, operation)
            }
            BuildErrorKind::OperationFailed {
                type_name,
                operation,
                message,
            } => {
                write!(
                    f,
                    "Operation '{}' on type '{}' failed: {}",
                    operation, type_name, message
                )
            }
            BuildErrorKind::StackUnderflow { operation } => {
                write!(f, "Object stack underflow during {}", operation)
            }
            BuildErrorKind::DocumentTooDeep { limit } => {
                write!(f, "Document nesting exceeds depth limit of {}", limit)
            }
            BuildErrorKind::BindingRejected { property, reason } => {
                write!(
                    f,
                    "Strict validation rejected binding of '{}': {}",
                    property, reason
                )
            }
        }
    }
}

/// A fatal assembly error with the slash-joined element path at which it
/// occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildError {
    /// Path from document root to the offending element (e.g., "server/engine")
    pub path: String,
    pub kind: BuildErrorKind,
}

impl BuildError {
    pub fn new(path: impl Into<String>, kind: BuildErrorKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Errors raised before the first start element have no path.
        if self.path.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{} (at {})", self.kind, self.path)
        }
    }
}

impl std::error::Error for BuildError {}

/// Error type for property binding operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindError {
    /// The target type registered no capability map.
    UnknownType { type_name: String },
    /// No setter candidate accepted the value and no generic fallback exists.
    NoSetter {
        property: String,
        type_name: String,
    },
    /// Every applicable setter, including the generic fallbacks, rejected the
    /// value.
    Rejected { property: String },
    /// The generic getter reported a genuine failure (distinct from the
    /// absent-storage signal, which is `Ok(None)` on the read path).
    GetterFailed { property: String, message: String },
}

impl fmt::Display for BindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindError::UnknownType { type_name } => {
                write!(f, "No capability map registered for type '{}'", type_name)
            }
            BindError::NoSetter {
                property,
                type_name,
            } => {
                write!(
                    f,
                    "No applicable setter for property '{}' on type '{}'",
                    property, type_name
                )
            }
            BindError::Rejected { property } => {
                write!(f, "Target rejected value for property '{}'", property)
            }
            BindError::GetterFailed { property, message } => {
                write!(f, "Failed to read property '{}': {}", property, message)
            }
        }
    }
}

impl std::error::Error for BindError {}

/// Record of a tolerated binding failure.
///
/// In default (non-strict) mode a failed attribute bind does not abort the
/// run; it is logged at warning level and collected on the build outcome so
/// callers can inspect what was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingDiagnostic {
    /// Element path at which the bind was attempted
    pub path: String,
    /// Property (attribute local name) that failed to bind
    pub property: String,
    /// Raw attribute value after placeholder expansion
    pub value: String,
    /// Registered type name of the bind target
    pub type_name: String,
    /// Human-readable failure reason
    pub message: String,
}

impl fmt::Display for BindingDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: could not bind '{}'='{}' on {}: {}",
            self.path, self.property, self.value, self.type_name, self.message
        )
    }
}

/// Error parsing a path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    Empty,
    EmptySegment { pattern: String },
    /// A wildcard may only appear as the final segment.
    MisplacedWildcard { pattern: String },
}

impl fmt::Display for PatternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternError::Empty => write!(f, "Pattern is empty"),
            PatternError::EmptySegment { pattern } => {
                write!(f, "Pattern '{}' contains an empty segment", pattern)
            }
            PatternError::MisplacedWildcard { pattern } => {
                write!(
                    f,
                    "Pattern '{}' has a wildcard in a non-final position",
                    pattern
                )
            }
        }
    }
}

impl std::error::Error for PatternError {}

/// Error loading a ruleset definition into a rule table.
#[derive(Debug)]
pub enum RulesetError {
    Io(std::io::Error),
    Yaml(serde_yaml::Error),
    Pattern(PatternError),
}

impl fmt::Display for RulesetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RulesetError::Io(e) => write!(f, "Failed to read ruleset: {}", e),
            RulesetError::Yaml(e) => write!(f, "Failed to parse ruleset YAML: {}", e),
            RulesetError::Pattern(e) => write!(f, "Invalid pattern in ruleset: {}", e),
        }
    }
}

impl std::error::Error for RulesetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RulesetError::Io(e) => Some(e),
            RulesetError::Yaml(e) => Some(e),
            RulesetError::Pattern(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for RulesetError {
    fn from(e: std::io::Error) -> Self {
        RulesetError::Io(e)
    }
}

impl From<serde_yaml::Error> for RulesetError {
    fn from(e: serde_yaml::Error) -> Self {
        RulesetError::Yaml(e)
    }
}

impl From<PatternError> for RulesetError {
    fn from(e: PatternError) -> Self {
        RulesetError::Pattern(e)
    }
}
