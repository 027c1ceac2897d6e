//! YAML ruleset definitions.
//!
//! The rule table is usually assembled by a per-schema configuration routine;
//! this module gives that routine a declarative, file-based form. A ruleset
//! document lists (pattern, action) pairs which load straight into a
//! [`RuleTable`], preserving document order as registration order.
//!
//! ```yaml
//! rules:
//!   - pattern: server/engine
//!     action:
//!       type: create
//!       class: EngineDescriptor
//!       override-attribute: className
//!   - pattern: server/engine
//!     action: { type: bind-attributes }
//!   - pattern: server/engine/notes
//!     action: { type: call-with-body, method: notes, trim: true }
//!   - pattern: server/engine
//!     action: { type: link-child, method: engine }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::RulesetError;
use crate::pattern::{Pattern, RuleTable};
use crate::rule::Rule;

/// A whole ruleset document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesetDef {
    pub rules: Vec<RuleDef>,
}

/// One (pattern, action) registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleDef {
    /// Slash-separated path pattern, optionally ending in `*`
    pub pattern: String,
    pub action: ActionDef,
}

/// Declarative form of the rule variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ActionDef {
    /// Instantiate a registered type and push it
    Create {
        /// Default type name
        class: String,
        /// Attribute that may override the type name
        #[serde(default, rename = "override-attribute")]
        override_attribute: Option<String>,
    },

    /// Bind element attributes as properties on the top object
    BindAttributes {
        /// Structural attributes to skip
        #[serde(default)]
        exclude: Vec<String>,
    },

    /// Invoke a named operation with the element body text
    CallWithBody {
        method: String,
        /// Trim surrounding whitespace from the body first
        #[serde(default)]
        trim: bool,
    },

    /// Pop the top object and hand it to a named operation on its parent
    LinkChild { method: String },
}

impl ActionDef {
    /// Convert the declarative action into an executable rule.
    pub fn into_rule(self) -> Rule {
        match self {
            ActionDef::Create {
                class,
                override_attribute,
            } => match override_attribute {
                Some(attr) => Rule::create_with_override(class, attr),
                None => Rule::create(class),
            },
            ActionDef::BindAttributes { exclude } => {
                if exclude.is_empty() {
                    Rule::bind_attributes()
                } else {
                    let refs: Vec<&str> = exclude.iter().map(String::as_str).collect();
                    Rule::bind_attributes_excluding(&refs)
                }
            }
            ActionDef::CallWithBody { method, trim } => Rule::call_with_body(method, trim),
            ActionDef::LinkChild { method } => Rule::link_child(method),
        }
    }
}

impl RulesetDef {
    /// Register every definition into a fresh rule table, in document order.
    pub fn into_table(self) -> Result<RuleTable, RulesetError> {
        let mut table = RuleTable::new();
        for def in self.rules {
            let pattern = Pattern::parse(&def.pattern)?;
            table.register(pattern, def.action.into_rule());
        }
        Ok(table)
    }
}

/// Parse a ruleset document from YAML text.
pub fn parse_ruleset(text: &str) -> Result<RulesetDef, RulesetError> {
    Ok(serde_yaml::from_str(text)?)
}

/// Load a ruleset document from a YAML file.
///
/// # Example
///
/// ```ignore
/// use grafter::ruleset::load_ruleset_from_file;
///
/// let def = load_ruleset_from_file("config/descriptor-rules.yaml")?;
/// let table = def.into_table()?;
/// ```
pub fn load_ruleset_from_file<P: AsRef<Path>>(path: P) -> Result<RulesetDef, RulesetError> {
    let contents = fs::read_to_string(path)?;
    parse_ruleset(&contents)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
rules:
  - pattern: server/engine
    action:
      type: create
      class: EngineDescriptor
      override-attribute: className
  - pattern: server/engine
    action: { type: bind-attributes }
  - pattern: server/engine/notes
    action: { type: call-with-body, method: notes, trim: true }
  - pattern: server/engine
    action: { type: link-child, method: engine }
  - pattern: server/*
    action: { type: bind-attributes, exclude: [className] }
"#;

    #[test]
    fn test_parse_sample_ruleset() {
        let def = parse_ruleset(SAMPLE).unwrap();
        assert_eq!(def.rules.len(), 5);
        assert_eq!(
            def.rules[0].action,
            ActionDef::Create {
                class: "EngineDescriptor".to_string(),
                override_attribute: Some("className".to_string()),
            }
        );
        assert_eq!(
            def.rules[2].action,
            ActionDef::CallWithBody {
                method: "notes".to_string(),
                trim: true,
            }
        );
        assert_eq!(
            def.rules[4].action,
            ActionDef::BindAttributes {
                exclude: vec!["className".to_string()],
            }
        );
    }

    #[test]
    fn test_into_table_preserves_document_order() {
        let table = parse_ruleset(SAMPLE).unwrap().into_table().unwrap();
        assert_eq!(table.len(), 5);
        let kinds: Vec<&str> = table.iter().map(|(_, r)| r.kind_name()).collect();
        assert_eq!(
            kinds,
            vec![
                "create",
                "bind-attributes",
                "call-with-body",
                "link-child",
                "bind-attributes"
            ]
        );
    }

    #[test]
    fn test_invalid_pattern_is_reported() {
        let def = parse_ruleset(
            "rules:\n  - pattern: 'a/*/b'\n    action: { type: bind-attributes }\n",
        )
        .unwrap();
        assert!(matches!(
            def.into_table(),
            Err(RulesetError::Pattern(_))
        ));
    }

    #[test]
    fn test_unknown_action_type_is_yaml_error() {
        let err = parse_ruleset("rules:\n  - pattern: a\n    action: { type: explode }\n")
            .unwrap_err();
        assert!(matches!(err, RulesetError::Yaml(_)));
    }
}
