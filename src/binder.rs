//! Dynamic property binding through per-type capability maps.
//!
//! String-typed attribute values are assigned onto arbitrary target objects
//! with type coercion. Instead of runtime type inspection, each bindable type
//! registers a capability map at construction time: ordered setter candidates
//! per property, optional generic set/get fallbacks, plus the named body
//! methods and link operations the rule variants invoke.
//!
//! Binding is deliberately forward- and backward-tolerant: target schemas
//! evolve independently of the markup schema, so a value that no candidate
//! accepts is reported, not fatal (unless the caller asks for strict
//! validation at the engine level).

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::net::{IpAddr, ToSocketAddrs};
use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::BindError;
use crate::expand::SourceChain;

/// An object that can live on the build stack and receive property binds.
///
/// Implement with the [`crate::impl_target!`] macro; the three accessor
/// methods are mechanical.
pub trait Target: Any {
    /// Registered type name, used in diagnostics and by `TypeRegistry`.
    fn type_name(&self) -> &'static str;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

/// Implement [`Target`] for a concrete type.
///
/// ```
/// #[derive(Default)]
/// struct EngineDescriptor { name: String }
/// grafter::impl_target!(EngineDescriptor);
/// ```
///
/// An alternate registered name may be given:
/// `grafter::impl_target!(EngineDescriptor as "Engine");`
#[macro_export]
macro_rules! impl_target {
    ($ty:ty) => {
        $crate::impl_target!($ty as stringify!($ty));
    };
    ($ty:ty as $name:expr) => {
        impl $crate::Target for $ty {
            fn type_name(&self) -> &'static str {
                $name
            }
            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }
            fn as_any_mut(&mut self) -> &mut dyn ::std::any::Any {
                self
            }
            fn into_any(self: ::std::boxed::Box<Self>) -> ::std::boxed::Box<dyn ::std::any::Any> {
                self
            }
        }
    };
}

/// A typed property value returned by the read path.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Int(i32),
    Long(i64),
    Flag(bool),
    Addr(IpAddr),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{}", s),
            Value::Int(v) => write!(f, "{}", v),
            Value::Long(v) => write!(f, "{}", v),
            Value::Flag(v) => write!(f, "{}", v),
            Value::Addr(v) => write!(f, "{}", v),
        }
    }
}

// --- Fixed coercion table ---------------------------------------------------

fn coerce_int(value: &str) -> Option<i32> {
    value.parse().ok()
}

fn coerce_long(value: &str) -> Option<i64> {
    value.parse().ok()
}

fn coerce_flag(value: &str) -> Option<bool> {
    if value.eq_ignore_ascii_case("true") {
        Some(true)
    } else if value.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Resolve an IP literal directly, otherwise go through name resolution.
/// Name resolution may fail transiently; failure is a candidate skip, never a
/// hard error.
fn coerce_addr(value: &str) -> Option<IpAddr> {
    if let Ok(ip) = value.parse::<IpAddr>() {
        return Some(ip);
    }
    (value, 0)
        .to_socket_addrs()
        .ok()
        .and_then(|mut addrs| addrs.next())
        .map(|sa| sa.ip())
}

// --- Capability map ---------------------------------------------------------

type TextSetter = Box<dyn Fn(&mut dyn Any, &str) + Send + Sync>;
type IntSetter = Box<dyn Fn(&mut dyn Any, i32) + Send + Sync>;
type LongSetter = Box<dyn Fn(&mut dyn Any, i64) + Send + Sync>;
type FlagSetter = Box<dyn Fn(&mut dyn Any, bool) + Send + Sync>;
type AddrSetter = Box<dyn Fn(&mut dyn Any, IpAddr) + Send + Sync>;
type Getter = Box<dyn Fn(&dyn Any) -> Option<Value> + Send + Sync>;
type CheckedGenericSetter = Box<dyn Fn(&mut dyn Any, &str, &str) -> bool + Send + Sync>;
type GenericSetter = Box<dyn Fn(&mut dyn Any, &str, &str) + Send + Sync>;
type GenericGetter = Box<dyn Fn(&dyn Any, &str) -> Result<Option<String>, String> + Send + Sync>;
type BodyMethod = Box<dyn Fn(&mut dyn Any, &str) -> Result<(), String> + Send + Sync>;
type LinkOp = Box<dyn Fn(&mut dyn Any, Box<dyn Target>) -> Result<(), String> + Send + Sync>;

/// One setter candidate. Candidates for a property are tried in declared
/// order; typed candidates that fail coercion are skipped so a later
/// candidate (or the generic fallback) can still succeed.
enum Setter {
    Text(TextSetter),
    Int(IntSetter),
    Long(LongSetter),
    Flag(FlagSetter),
    Addr(AddrSetter),
}

/// The capability map of one bindable type: what the binder and the rule
/// variants may invoke on it.
pub struct Capabilities {
    type_name: &'static str,
    setters: IndexMap<String, Vec<Setter>>,
    getters: IndexMap<String, Getter>,
    set_any_checked: Option<CheckedGenericSetter>,
    set_any: Option<GenericSetter>,
    get_any: Option<GenericGetter>,
    methods: IndexMap<String, BodyMethod>,
    links: IndexMap<String, LinkOp>,
}

impl Capabilities {
    /// Start building the capability map for `T`.
    pub fn of<T: Target>() -> CapabilitiesBuilder<T> {
        CapabilitiesBuilder {
            caps: Capabilities {
                type_name: std::any::type_name::<T>(),
                setters: IndexMap::new(),
                getters: IndexMap::new(),
                set_any_checked: None,
                set_any: None,
                get_any: None,
                methods: IndexMap::new(),
                links: IndexMap::new(),
            },
            _marker: PhantomData,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Layered bind: typed candidates in declared order, then the checked
    /// generic setter, then the void generic setter.
    fn bind(&self, target: &mut dyn Any, property: &str, value: &str) -> Result<(), BindError> {
        if let Some(candidates) = self.setters.get(property) {
            for setter in candidates {
                match setter {
                    Setter::Text(f) => {
                        f(target, value);
                        return Ok(());
                    }
                    Setter::Int(f) => {
                        if let Some(v) = coerce_int(value) {
                            f(target, v);
                            return Ok(());
                        }
                    }
                    Setter::Long(f) => {
                        if let Some(v) = coerce_long(value) {
                            f(target, v);
                            return Ok(());
                        }
                    }
                    Setter::Flag(f) => {
                        if let Some(v) = coerce_flag(value) {
                            f(target, v);
                            return Ok(());
                        }
                    }
                    Setter::Addr(f) => {
                        if let Some(v) = coerce_addr(value) {
                            f(target, v);
                            return Ok(());
                        }
                    }
                }
            }
        }
        if let Some(checked) = &self.set_any_checked {
            if checked(target, property, value) {
                return Ok(());
            }
            // The checked variant rejected the call; retry with the void
            // variant before giving up.
            if let Some(plain) = &self.set_any {
                plain(target, property, value);
                return Ok(());
            }
            return Err(BindError::Rejected {
                property: property.to_string(),
            });
        }
        if let Some(plain) = &self.set_any {
            plain(target, property, value);
            return Ok(());
        }
        Err(BindError::NoSetter {
            property: property.to_string(),
            type_name: self.type_name.to_string(),
        })
    }

    fn get(&self, target: &dyn Any, property: &str) -> Result<Option<Value>, BindError> {
        if let Some(getter) = self.getters.get(property) {
            return Ok(getter(target));
        }
        if let Some(generic) = &self.get_any {
            return match generic(target, property) {
                Ok(Some(text)) => Ok(Some(Value::Text(text))),
                // Absent-storage signal from the target: "absent", not a
                // failure.
                Ok(None) => Ok(None),
                Err(message) => Err(BindError::GetterFailed {
                    property: property.to_string(),
                    message,
                }),
            };
        }
        Ok(None)
    }

    fn method(&self, name: &str) -> Option<&BodyMethod> {
        self.methods.get(name)
    }

    fn link(&self, name: &str) -> Option<&LinkOp> {
        self.links.get(name)
    }
}

/// Typed builder for a [`Capabilities`] map.
///
/// Setter order is significant: candidates are tried in the order declared
/// here, so declare the text setter first when the literal string should win.
pub struct CapabilitiesBuilder<T: Target> {
    caps: Capabilities,
    _marker: PhantomData<fn(T)>,
}

impl<T: Target> CapabilitiesBuilder<T> {
    /// Override the reported type name (defaults to the Rust type path).
    pub fn named(mut self, name: &'static str) -> Self {
        self.caps.type_name = name;
        self
    }

    fn push_setter(mut self, property: &str, setter: Setter) -> Self {
        self.caps
            .setters
            .entry(property.to_string())
            .or_default()
            .push(setter);
        self
    }

    /// String-accepting setter; receives the literal (expanded) value.
    pub fn text(self, property: &str, f: impl Fn(&mut T, &str) + Send + Sync + 'static) -> Self {
        self.push_setter(
            property,
            Setter::Text(Box::new(move |any, v| {
                if let Some(t) = any.downcast_mut::<T>() {
                    f(t, v);
                }
            })),
        )
    }

    /// Integer setter; the candidate is skipped when the value does not
    /// coerce.
    pub fn int(self, property: &str, f: impl Fn(&mut T, i32) + Send + Sync + 'static) -> Self {
        self.push_setter(
            property,
            Setter::Int(Box::new(move |any, v| {
                if let Some(t) = any.downcast_mut::<T>() {
                    f(t, v);
                }
            })),
        )
    }

    /// Long-integer setter.
    pub fn long(self, property: &str, f: impl Fn(&mut T, i64) + Send + Sync + 'static) -> Self {
        self.push_setter(
            property,
            Setter::Long(Box::new(move |any, v| {
                if let Some(t) = any.downcast_mut::<T>() {
                    f(t, v);
                }
            })),
        )
    }

    /// Boolean setter (`"true"`/`"false"`, case-insensitive).
    pub fn flag(self, property: &str, f: impl Fn(&mut T, bool) + Send + Sync + 'static) -> Self {
        self.push_setter(
            property,
            Setter::Flag(Box::new(move |any, v| {
                if let Some(t) = any.downcast_mut::<T>() {
                    f(t, v);
                }
            })),
        )
    }

    /// Network-address setter; hostnames go through name resolution.
    pub fn addr(self, property: &str, f: impl Fn(&mut T, IpAddr) + Send + Sync + 'static) -> Self {
        self.push_setter(
            property,
            Setter::Addr(Box::new(move |any, v| {
                if let Some(t) = any.downcast_mut::<T>() {
                    f(t, v);
                }
            })),
        )
    }

    /// Typed getter for the read path.
    pub fn get(mut self, property: &str, f: impl Fn(&T) -> Value + Send + Sync + 'static) -> Self {
        self.caps.getters.insert(
            property.to_string(),
            Box::new(move |any| any.downcast_ref::<T>().map(&f)),
        );
        self
    }

    /// Generic two-argument setter that reports acceptance. Preferred over
    /// the void variant when both are present.
    pub fn set_any_checked(
        mut self,
        f: impl Fn(&mut T, &str, &str) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.caps.set_any_checked = Some(Box::new(move |any, k, v| {
            any.downcast_mut::<T>().map(|t| f(t, k, v)).unwrap_or(false)
        }));
        self
    }

    /// Generic two-argument setter with no result.
    pub fn set_any(mut self, f: impl Fn(&mut T, &str, &str) + Send + Sync + 'static) -> Self {
        self.caps.set_any = Some(Box::new(move |any, k, v| {
            if let Some(t) = any.downcast_mut::<T>() {
                f(t, k, v);
            }
        }));
        self
    }

    /// Generic getter. `Ok(None)` is the absent-storage signal; `Err` is a
    /// genuine failure.
    pub fn get_any(
        mut self,
        f: impl Fn(&T, &str) -> Result<Option<String>, String> + Send + Sync + 'static,
    ) -> Self {
        self.caps.get_any = Some(Box::new(move |any, k| match any.downcast_ref::<T>() {
            Some(t) => f(t, k),
            None => Ok(None),
        }));
        self
    }

    /// Named operation invoked with accumulated element body text.
    pub fn method(
        mut self,
        name: &str,
        f: impl Fn(&mut T, &str) -> Result<(), String> + Send + Sync + 'static,
    ) -> Self {
        self.caps.methods.insert(
            name.to_string(),
            Box::new(move |any, body| match any.downcast_mut::<T>() {
                Some(t) => f(t, body),
                None => Err("body method target type mismatch".to_string()),
            }),
        );
        self
    }

    /// Named parent-adopts-child operation receiving the popped child
    /// object.
    pub fn link(
        mut self,
        name: &str,
        f: impl Fn(&mut T, Box<dyn Target>) -> Result<(), String> + Send + Sync + 'static,
    ) -> Self {
        self.caps.links.insert(
            name.to_string(),
            Box::new(move |any, child| match any.downcast_mut::<T>() {
                Some(t) => f(t, child),
                None => Err("link operation target type mismatch".to_string()),
            }),
        );
        self
    }

    /// Typed convenience over [`CapabilitiesBuilder::link`]: downcasts the
    /// child and reports a mismatch as an operation failure.
    pub fn adopt<C: Target>(
        self,
        name: &str,
        f: impl Fn(&mut T, C) + Send + Sync + 'static,
    ) -> Self {
        self.link(name, move |parent, child| {
            let child_type = child.type_name();
            match child.into_any().downcast::<C>() {
                Ok(c) => {
                    f(parent, *c);
                    Ok(())
                }
                Err(_) => Err(format!(
                    "expected child of type '{}', got '{}'",
                    std::any::type_name::<C>(),
                    child_type
                )),
            }
        })
    }

    pub fn finish(self) -> Capabilities {
        self.caps
    }
}

// --- Binder -----------------------------------------------------------------

/// The type-coercing property binder.
///
/// Holds the per-type capability cache, keyed by type identity and explicitly
/// constructed via [`PropertyBinder::register`] (and cleared via
/// [`PropertyBinder::clear`]), plus the placeholder source chain applied to
/// every value before coercion.
#[derive(Default)]
pub struct PropertyBinder {
    caps: HashMap<TypeId, Arc<Capabilities>>,
    sources: SourceChain,
}

impl PropertyBinder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the capability map for `T`, replacing any previous entry.
    pub fn register<T: Target>(&mut self, caps: Capabilities) -> &mut Self {
        self.caps.insert(TypeId::of::<T>(), Arc::new(caps));
        self
    }

    /// Drop every registered capability map.
    pub fn clear(&mut self) {
        self.caps.clear();
    }

    /// Placeholder sources consulted before coercion.
    pub fn sources_mut(&mut self) -> &mut SourceChain {
        &mut self.sources
    }

    pub fn sources(&self) -> &SourceChain {
        &self.sources
    }

    fn capabilities_for(&self, target: &dyn Target) -> Result<&Capabilities, BindError> {
        self.caps
            .get(&target.as_any().type_id())
            .map(Arc::as_ref)
            .ok_or_else(|| BindError::UnknownType {
                type_name: target.type_name().to_string(),
            })
    }

    /// Assign `raw_value` (after placeholder expansion) to the named property
    /// of `target`, walking the layered fallback order.
    ///
    /// # Example
    ///
    /// ```
    /// use grafter::{Capabilities, PropertyBinder};
    ///
    /// #[derive(Default)]
    /// struct Engine { name: String }
    /// grafter::impl_target!(Engine);
    ///
    /// let mut binder = PropertyBinder::new();
    /// binder.register::<Engine>(
    ///     Capabilities::of::<Engine>()
    ///         .text("name", |e, v| e.name = v.to_string())
    ///         .finish(),
    /// );
    ///
    /// let mut engine = Engine::default();
    /// binder.bind(&mut engine, "name", "primary").unwrap();
    /// assert_eq!(engine.name, "primary");
    /// ```
    pub fn bind(
        &self,
        target: &mut dyn Target,
        property: &str,
        raw_value: &str,
    ) -> Result<(), BindError> {
        let caps = self
            .caps
            .get(&target.as_any().type_id())
            .map(Arc::as_ref)
            .ok_or_else(|| BindError::UnknownType {
                type_name: target.type_name().to_string(),
            })?;
        let value = self.sources.expand(raw_value);
        caps.bind(target.as_any_mut(), property, &value)
    }

    /// Read the named property back. `Ok(None)` means absent.
    pub fn get(&self, target: &dyn Target, property: &str) -> Result<Option<Value>, BindError> {
        let caps = self.capabilities_for(target)?;
        caps.get(target.as_any(), property)
    }

    /// Invoke a named body method on the target. `Ok(false)` means the
    /// capability map exists but has no such method; `Err` holds the method's
    /// own failure.
    pub(crate) fn call_method(
        &self,
        target: &mut dyn Target,
        name: &str,
        body: &str,
    ) -> Result<bool, String> {
        let caps = match self.caps.get(&target.as_any().type_id()) {
            Some(c) => c.clone(),
            None => return Ok(false),
        };
        match caps.method(name) {
            Some(f) => f(target.as_any_mut(), body).map(|_| true),
            None => Ok(false),
        }
    }

    /// Invoke a named link operation, handing `child` to `parent`.
    pub(crate) fn call_link(
        &self,
        parent: &mut dyn Target,
        name: &str,
        child: Box<dyn Target>,
    ) -> Result<bool, String> {
        let caps = match self.caps.get(&parent.as_any().type_id()) {
            Some(c) => c.clone(),
            None => return Ok(false),
        };
        match caps.link(name) {
            Some(f) => f(parent.as_any_mut(), child).map(|_| true),
            None => Ok(false),
        }
    }
}
