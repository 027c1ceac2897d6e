//! # Grafter: Declarative Object-Graph Assembly
//!
//! Grafter turns a stream of nested markup events into a graph of in-memory
//! objects by matching the current nesting path against a table of registered
//! rules, with a dynamic property-binding layer that assigns string-typed
//! attribute values onto target objects with type coercion and placeholder
//! substitution.
//!
//! ## Features
//!
//! - **Pattern-matched rules**: register Create / BindAttributes /
//!   CallWithBody / LinkChild rules against slash-separated path patterns,
//!   with single-segment trailing wildcards
//! - **Capability-map binding**: each bindable type registers typed setter
//!   closures at construction time; no runtime type inspection
//! - **Layered coercion fallback**: string setter, then typed setters with a
//!   fixed coercion table, then generic set-any fallbacks, tolerant of
//!   schema drift in both directions
//! - **Placeholder substitution**: `${NAME}` and `${NAME:-DEFAULT}` tokens
//!   resolved against layered property sources
//! - **YAML rulesets**: declare (pattern, action) pairs in a document and
//!   load them straight into a rule table
//!
//! ## Example
//!
//! ```
//! use grafter::{
//!     Capabilities, Event, GraphBuilder, PropertyBinder, Rule, RuleTable, Target, TypeRegistry,
//! };
//!
//! #[derive(Default)]
//! struct Root { children: Vec<Child> }
//! #[derive(Default)]
//! struct Child { name: String, count: i32 }
//! grafter::impl_target!(Root);
//! grafter::impl_target!(Child);
//!
//! let mut types = TypeRegistry::new();
//! types.register("Root", || Box::new(Root::default()));
//! types.register("Child", || Box::new(Child::default()));
//!
//! let mut binder = PropertyBinder::new();
//! binder.register::<Root>(
//!     Capabilities::of::<Root>()
//!         .adopt::<Child>("child", |r, c| r.children.push(c))
//!         .finish(),
//! );
//! binder.register::<Child>(
//!     Capabilities::of::<Child>()
//!         .text("name", |c, v| c.name = v.to_string())
//!         .int("count", |c, v| c.count = v)
//!         .finish(),
//! );
//!
//! let mut table = RuleTable::new();
//! table.register_str("root", Rule::create("Root")).unwrap();
//! table.register_str("root/child", Rule::create("Child")).unwrap();
//! table.register_str("root/child", Rule::bind_attributes()).unwrap();
//! table.register_str("root/child", Rule::link_child("child")).unwrap();
//!
//! let outcome = GraphBuilder::new(table)
//!     .with_types(types)
//!     .with_binder(binder)
//!     .run(vec![
//!         Event::start("root", &[]),
//!         Event::start("child", &[("name", "n"), ("count", "3")]),
//!         Event::end("child"),
//!         Event::end("root"),
//!         Event::EndDocument,
//!     ])
//!     .unwrap();
//!
//! let root = outcome.root.into_any().downcast::<Root>().unwrap();
//! assert_eq!(root.children[0].name, "n");
//! assert_eq!(root.children[0].count, 3);
//! ```

// Core modules
pub mod binder;
pub mod engine;
pub mod error;
pub mod event;
pub mod expand;
pub mod pattern;
pub mod registry;
pub mod rule;

// Declarative ruleset loading
pub mod ruleset;

// Re-export key types
pub use binder::{Capabilities, CapabilitiesBuilder, PropertyBinder, Target, Value};
pub use engine::{BuildOutcome, GraphBuilder, DEFAULT_MAX_DEPTH};
pub use error::{
    BindError, BindingDiagnostic, BuildError, BuildErrorKind, PatternError, RulesetError,
};
pub use event::{Attribute, Event, QName};
pub use expand::{expand, PropertySource, SourceChain};
pub use pattern::{Pattern, RuleTable};
pub use registry::TypeRegistry;
pub use rule::Rule;
pub use ruleset::{load_ruleset_from_file, parse_ruleset, ActionDef, RuleDef, RulesetDef};
