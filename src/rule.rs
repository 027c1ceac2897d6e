//! Rule variants fired on matched elements.
//!
//! A rule is a unit of behavior with three hooks: enter (element opened),
//! body (accumulated character data, delivered when the element closes), and
//! exit (element closed). The variants are a closed set expressed as a tagged
//! enum with explicit no-op arms for the hooks a variant does not use. Rules
//! carry configuration only; all run state lives in the engine, so one rule
//! table can be shared read-only across builder instances.

use crate::engine::Scope;
use crate::error::{BindingDiagnostic, BuildErrorKind};
use crate::event::Attribute;

/// Instantiate a typed object and push it onto the object stack.
#[derive(Debug, Clone)]
pub struct CreateRule {
    type_name: String,
    override_attr: Option<String>,
}

/// Bind every element attribute as a property on the top-of-stack object.
#[derive(Debug, Clone)]
pub struct BindAttributesRule {
    exclude: Vec<String>,
}

/// Invoke a named operation on the top-of-stack object with the element's
/// accumulated body text.
#[derive(Debug, Clone)]
pub struct CallWithBodyRule {
    method: String,
    trim: bool,
}

/// Pop the top object and hand it to a named operation on the object beneath
/// it: the parent-adopts-child wiring step.
#[derive(Debug, Clone)]
pub struct LinkChildRule {
    method: String,
}

/// A registered unit of behavior.
#[derive(Debug, Clone)]
pub enum Rule {
    Create(CreateRule),
    BindAttributes(BindAttributesRule),
    CallWithBody(CallWithBodyRule),
    LinkChild(LinkChildRule),
}

impl Rule {
    /// Create rule with a fixed type name.
    pub fn create(type_name: impl Into<String>) -> Self {
        Rule::Create(CreateRule {
            type_name: type_name.into(),
            override_attr: None,
        })
    }

    /// Create rule whose type may be overridden by an attribute on the
    /// element, when that attribute is present and its value names a
    /// constructible type.
    pub fn create_with_override(
        type_name: impl Into<String>,
        override_attr: impl Into<String>,
    ) -> Self {
        Rule::Create(CreateRule {
            type_name: type_name.into(),
            override_attr: Some(override_attr.into()),
        })
    }

    /// Bind every attribute of the element as a property.
    pub fn bind_attributes() -> Self {
        Rule::BindAttributes(BindAttributesRule { exclude: Vec::new() })
    }

    /// Bind attributes, skipping the named structural/reserved attributes.
    pub fn bind_attributes_excluding(exclude: &[&str]) -> Self {
        Rule::BindAttributes(BindAttributesRule {
            exclude: exclude.iter().map(|s| s.to_string()).collect(),
        })
    }

    /// Invoke `method` with the element's body text when it closes.
    pub fn call_with_body(method: impl Into<String>, trim: bool) -> Self {
        Rule::CallWithBody(CallWithBodyRule {
            method: method.into(),
            trim,
        })
    }

    /// Pop the finished child and pass it to `method` on its parent.
    pub fn link_child(method: impl Into<String>) -> Self {
        Rule::LinkChild(LinkChildRule {
            method: method.into(),
        })
    }

    /// Short variant name for logs and validation listings.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Rule::Create(_) => "create",
            Rule::BindAttributes(_) => "bind-attributes",
            Rule::CallWithBody(_) => "call-with-body",
            Rule::LinkChild(_) => "link-child",
        }
    }

    pub(crate) fn on_enter(
        &self,
        scope: &mut Scope<'_>,
        path: &str,
        attrs: &[Attribute],
    ) -> Result<(), BuildErrorKind> {
        match self {
            Rule::Create(r) => r.on_enter(scope, attrs),
            Rule::BindAttributes(r) => r.on_enter(scope, path, attrs),
            // No enter behavior.
            Rule::CallWithBody(_) | Rule::LinkChild(_) => Ok(()),
        }
    }

    pub(crate) fn on_body(
        &self,
        scope: &mut Scope<'_>,
        _path: &str,
        text: &str,
    ) -> Result<(), BuildErrorKind> {
        match self {
            Rule::CallWithBody(r) => r.on_body(scope, text),
            // No body behavior.
            Rule::Create(_) | Rule::BindAttributes(_) | Rule::LinkChild(_) => Ok(()),
        }
    }

    pub(crate) fn on_exit(&self, scope: &mut Scope<'_>, _path: &str) -> Result<(), BuildErrorKind> {
        match self {
            Rule::LinkChild(r) => r.on_exit(scope),
            // No exit behavior.
            Rule::Create(_) | Rule::BindAttributes(_) | Rule::CallWithBody(_) => Ok(()),
        }
    }
}

impl CreateRule {
    fn on_enter(&self, scope: &mut Scope<'_>, attrs: &[Attribute]) -> Result<(), BuildErrorKind> {
        // An override attribute only wins when its value is constructible;
        // otherwise fall back to the configured default.
        let override_name = self.override_attr.as_ref().and_then(|attr| {
            attrs
                .iter()
                .find(|a| a.name.local == *attr)
                .map(|a| a.value.as_str())
                .filter(|name| scope.types.has_type(name))
        });
        let chosen = override_name.unwrap_or(&self.type_name);
        match scope.types.instantiate(chosen) {
            Some(obj) => {
                tracing::debug!(type_name = chosen, "created object");
                scope.objects.push(obj);
                Ok(())
            }
            None => Err(BuildErrorKind::TypeNotFound {
                name: chosen.to_string(),
            }),
        }
    }
}

impl BindAttributesRule {
    fn on_enter(
        &self,
        scope: &mut Scope<'_>,
        path: &str,
        attrs: &[Attribute],
    ) -> Result<(), BuildErrorKind> {
        if scope.objects.is_empty() {
            return Err(BuildErrorKind::StackUnderflow {
                operation: "attribute binding".to_string(),
            });
        }
        for attr in attrs {
            let property = &attr.name.local;
            if self.exclude.iter().any(|e| e == property) {
                continue;
            }
            // Split borrow: the binder expands and assigns, the diagnostics
            // sink records tolerated failures.
            let top = scope
                .objects
                .last_mut()
                .ok_or_else(|| BuildErrorKind::StackUnderflow {
                    operation: "attribute binding".to_string(),
                })?;
            if let Err(err) = scope.binder.bind(top.as_mut(), property, &attr.value) {
                if scope.strict {
                    return Err(BuildErrorKind::BindingRejected {
                        property: property.clone(),
                        reason: err.to_string(),
                    });
                }
                let diagnostic = BindingDiagnostic {
                    path: path.to_string(),
                    property: property.clone(),
                    value: scope.binder.sources().expand(&attr.value),
                    type_name: scope
                        .objects
                        .last()
                        .map(|o| o.type_name().to_string())
                        .unwrap_or_default(),
                    message: err.to_string(),
                };
                tracing::warn!("{}", diagnostic);
                scope.diagnostics.push(diagnostic);
            }
        }
        Ok(())
    }
}

impl CallWithBodyRule {
    /// Delivered when the element closes, before exit hooks run.
    fn on_body(&self, scope: &mut Scope<'_>, text: &str) -> Result<(), BuildErrorKind> {
        let top = scope
            .objects
            .last_mut()
            .ok_or_else(|| BuildErrorKind::StackUnderflow {
                operation: format!("body call '{}'", self.method),
            })?;
        let type_name = top.type_name().to_string();
        let body = if self.trim { text.trim() } else { text };
        match scope.binder.call_method(top.as_mut(), &self.method, body) {
            Ok(true) => Ok(()),
            Ok(false) => Err(BuildErrorKind::OperationNotFound {
                type_name,
                operation: self.method.clone(),
            }),
            Err(message) => Err(BuildErrorKind::OperationFailed {
                type_name,
                operation: self.method.clone(),
                message,
            }),
        }
    }
}

impl LinkChildRule {
    fn on_exit(&self, scope: &mut Scope<'_>) -> Result<(), BuildErrorKind> {
        if scope.objects.len() < 2 {
            return Err(BuildErrorKind::StackUnderflow {
                operation: format!("link via '{}'", self.method),
            });
        }
        let child = scope
            .objects
            .pop()
            .ok_or_else(|| BuildErrorKind::StackUnderflow {
                operation: format!("link via '{}'", self.method),
            })?;
        let child_type = child.type_name().to_string();
        let parent = scope
            .objects
            .last_mut()
            .ok_or_else(|| BuildErrorKind::StackUnderflow {
                operation: format!("link via '{}'", self.method),
            })?;
        let parent_type = parent.type_name().to_string();
        tracing::debug!(
            parent = parent_type.as_str(),
            child = child_type.as_str(),
            method = self.method.as_str(),
            "linking child into parent"
        );
        match scope.binder.call_link(parent.as_mut(), &self.method, child) {
            Ok(true) => Ok(()),
            Ok(false) => Err(BuildErrorKind::OperationNotFound {
                type_name: parent_type,
                operation: self.method.clone(),
            }),
            Err(message) => Err(BuildErrorKind::OperationFailed {
                type_name: parent_type,
                operation: self.method.clone(),
                message,
            }),
        }
    }
}
