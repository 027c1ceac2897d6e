//! The graph assembly engine.
//!
//! `GraphBuilder` consumes one markup event stream and turns it into a graph
//! of target objects by matching the current nesting path against a rule
//! table. It maintains two parallel stacks: the path stack of open element
//! names and the object stack of created-but-unfinished objects. The match
//! list computed on entry at each depth is recorded so exactly the same rules
//! fire, in reverse order, on exit, even with several paths open at
//! different depths.
//!
//! A builder instance processes exactly one document and owns its stacks
//! exclusively for the duration; the rule table it references is immutable
//! and may be shared across instances.

use std::fmt;
use std::sync::Arc;

use crate::binder::{PropertyBinder, Target};
use crate::error::{BindingDiagnostic, BuildError, BuildErrorKind};
use crate::event::{Attribute, Event, QName};
use crate::pattern::RuleTable;
use crate::registry::TypeRegistry;

/// Default cap on element nesting depth. Depth is unbounded in principle;
/// the cap turns runaway nesting into a typed error instead of an overflow.
pub const DEFAULT_MAX_DEPTH: usize = 1024;

/// Mutable view of engine state handed to rule hooks.
pub(crate) struct Scope<'a> {
    pub objects: &'a mut Vec<Box<dyn Target>>,
    pub types: &'a TypeRegistry,
    pub binder: &'a PropertyBinder,
    pub strict: bool,
    pub diagnostics: &'a mut Vec<BindingDiagnostic>,
}

/// Result of a completed run: the graph root plus every tolerated binding
/// failure encountered along the way.
pub struct BuildOutcome {
    /// Bottom of the object stack (the seed object, in the seeded case).
    pub root: Box<dyn Target>,
    pub diagnostics: Vec<BindingDiagnostic>,
}

// The boxed root is opaque; report its registered type name.
impl fmt::Debug for BuildOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildOutcome")
            .field("root", &self.root.type_name())
            .field("diagnostics", &self.diagnostics)
            .finish()
    }
}

/// Assembles one object graph from one event stream.
pub struct GraphBuilder {
    table: Arc<RuleTable>,
    types: TypeRegistry,
    binder: PropertyBinder,
    strict: bool,
    namespace_aware: bool,
    max_depth: usize,

    // Run state, owned exclusively for the duration of one document.
    path: Vec<String>,
    objects: Vec<Box<dyn Target>>,
    match_stack: Vec<Vec<usize>>,
    body_stack: Vec<String>,
    diagnostics: Vec<BindingDiagnostic>,
    seeded: bool,
    ended: bool,
}

impl GraphBuilder {
    /// Create a builder over an immutable rule table. The table may be an
    /// `Arc` already shared with other builder instances.
    pub fn new(table: impl Into<Arc<RuleTable>>) -> Self {
        Self {
            table: table.into(),
            types: TypeRegistry::new(),
            binder: PropertyBinder::new(),
            strict: false,
            namespace_aware: false,
            max_depth: DEFAULT_MAX_DEPTH,
            path: Vec::new(),
            objects: Vec::new(),
            match_stack: Vec::new(),
            body_stack: Vec::new(),
            diagnostics: Vec::new(),
            seeded: false,
            ended: false,
        }
    }

    /// Install the type registry consulted by Create rules.
    pub fn with_types(mut self, types: TypeRegistry) -> Self {
        self.types = types;
        self
    }

    /// Install the property binder (capability maps and placeholder
    /// sources).
    pub fn with_binder(mut self, binder: PropertyBinder) -> Self {
        self.binder = binder;
        self
    }

    /// Promote binding failures to fatal errors.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Qualify path segments with namespace URIs instead of ignoring
    /// prefixes.
    pub fn namespace_aware(mut self, aware: bool) -> Self {
        self.namespace_aware = aware;
        self
    }

    /// Replace the nesting depth cap.
    pub fn max_depth(mut self, limit: usize) -> Self {
        self.max_depth = limit;
        self
    }

    /// Seed the object stack with an externally supplied root. The seed is
    /// never popped by link rules' children and is returned as the result.
    pub fn seed(mut self, root: Box<dyn Target>) -> Self {
        self.objects.insert(0, root);
        self.seeded = true;
        self
    }

    fn scope<'a>(
        objects: &'a mut Vec<Box<dyn Target>>,
        types: &'a TypeRegistry,
        binder: &'a PropertyBinder,
        strict: bool,
        diagnostics: &'a mut Vec<BindingDiagnostic>,
    ) -> Scope<'a> {
        Scope {
            objects,
            types,
            binder,
            strict,
            diagnostics,
        }
    }

    fn current_path(&self) -> String {
        self.path.join("/")
    }

    /// Dispatch a single event.
    pub fn process(&mut self, event: Event) -> Result<(), BuildError> {
        match event {
            Event::StartElement { name, attributes } => self.start_element(&name, &attributes),
            Event::Characters(text) => self.characters(&text),
            Event::EndElement { name } => self.end_element(&name),
            Event::EndDocument => self.end_document(),
        }
    }

    /// An element opened: extend the path, match rules for the new path, and
    /// fire their enter hooks in registration order.
    pub fn start_element(
        &mut self,
        name: &QName,
        attributes: &[Attribute],
    ) -> Result<(), BuildError> {
        self.check_open("start element")?;
        if self.path.len() >= self.max_depth {
            let segment = name.segment(self.namespace_aware);
            let path = if self.path.is_empty() {
                segment
            } else {
                format!("{}/{}", self.current_path(), segment)
            };
            return Err(BuildError::new(
                path,
                BuildErrorKind::DocumentTooDeep {
                    limit: self.max_depth,
                },
            ));
        }
        self.path.push(name.segment(self.namespace_aware));
        let path = self.current_path();
        let matches = self.table.matches_for(&self.path);
        tracing::debug!(path = path.as_str(), rules = matches.len(), "element opened");
        self.body_stack.push(String::new());

        let table = Arc::clone(&self.table);
        let mut scope = Self::scope(
            &mut self.objects,
            &self.types,
            &self.binder,
            self.strict,
            &mut self.diagnostics,
        );
        for &idx in &matches {
            if let Err(kind) = table.rule(idx).on_enter(&mut scope, &path, attributes) {
                self.ended = true;
                return Err(BuildError::new(path.clone(), kind));
            }
        }
        self.match_stack.push(matches);
        Ok(())
    }

    /// Character data accumulates on the innermost open element only.
    /// Text outside the root element is ignored.
    pub fn characters(&mut self, text: &str) -> Result<(), BuildError> {
        self.check_open("character data")?;
        if let Some(buffer) = self.body_stack.last_mut() {
            buffer.push_str(text);
        }
        Ok(())
    }

    /// An element closed: deliver body text, then fire exit hooks in
    /// reverse registration order, then pop this depth.
    ///
    /// Exit hooks are never partially applied across an error: the first
    /// failing hook aborts and the remaining hooks at this depth are
    /// skipped.
    pub fn end_element(&mut self, name: &QName) -> Result<(), BuildError> {
        self.check_open("end element")?;
        let expected = match self.path.last() {
            Some(seg) => seg.clone(),
            None => {
                self.ended = true;
                return Err(BuildError::new(
                    String::new(),
                    BuildErrorKind::MalformedStream(format!(
                        "end of element '{}' with no element open",
                        name.segment(self.namespace_aware)
                    )),
                ));
            }
        };
        let actual = name.segment(self.namespace_aware);
        let path = self.current_path();
        if expected != actual {
            self.ended = true;
            return Err(BuildError::new(
                path,
                BuildErrorKind::MalformedStream(format!(
                    "expected end of element '{}', found '{}'",
                    expected, actual
                )),
            ));
        }

        let matches = self.match_stack.pop().unwrap_or_default();
        let body = self.body_stack.pop().unwrap_or_default();

        let table = Arc::clone(&self.table);
        let mut scope = Self::scope(
            &mut self.objects,
            &self.types,
            &self.binder,
            self.strict,
            &mut self.diagnostics,
        );
        for &idx in &matches {
            if let Err(kind) = table.rule(idx).on_body(&mut scope, &path, &body) {
                self.ended = true;
                return Err(BuildError::new(path.clone(), kind));
            }
        }
        // Last entered, first exited: the rule that opened a resource is the
        // last to close it.
        for &idx in matches.iter().rev() {
            if let Err(kind) = table.rule(idx).on_exit(&mut scope, &path) {
                self.ended = true;
                return Err(BuildError::new(path.clone(), kind));
            }
        }
        self.path.pop();
        Ok(())
    }

    /// End of the event stream.
    pub fn end_document(&mut self) -> Result<(), BuildError> {
        self.check_open("end of document")?;
        if !self.path.is_empty() {
            let path = self.current_path();
            self.ended = true;
            return Err(BuildError::new(
                path,
                BuildErrorKind::MalformedStream(format!(
                    "document ended with {} element(s) still open",
                    self.path.len()
                )),
            ));
        }
        self.ended = true;
        Ok(())
    }

    fn check_open(&self, what: &str) -> Result<(), BuildError> {
        if self.ended {
            return Err(BuildError::new(
                self.current_path(),
                BuildErrorKind::MalformedStream(format!(
                    "{} after the document already ended",
                    what
                )),
            ));
        }
        Ok(())
    }

    /// Tolerated binding failures collected so far.
    pub fn diagnostics(&self) -> &[BindingDiagnostic] {
        &self.diagnostics
    }

    /// Complete the run and hand back the graph root.
    ///
    /// Calls [`GraphBuilder::end_document`] if the caller has not. The root
    /// is the bottom of the object stack (the seed, when one was supplied).
    pub fn finish(mut self) -> Result<BuildOutcome, BuildError> {
        if !self.ended {
            self.end_document()?;
        }
        let mut objects = std::mem::take(&mut self.objects);
        if objects.is_empty() {
            return Err(BuildError::new(
                String::new(),
                BuildErrorKind::MalformedStream("no root object was produced".to_string()),
            ));
        }
        let root = objects.remove(0);
        Ok(BuildOutcome {
            root,
            diagnostics: std::mem::take(&mut self.diagnostics),
        })
    }

    /// Feed a whole event stream and finish.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use grafter::{Event, GraphBuilder, RuleTable};
    ///
    /// let table = RuleTable::new();
    /// let builder = GraphBuilder::new(table);
    /// let outcome = builder.run(vec![
    ///     Event::start("root", &[]),
    ///     Event::end("root"),
    ///     Event::EndDocument,
    /// ]);
    /// # let _ = outcome;
    /// ```
    pub fn run(mut self, events: impl IntoIterator<Item = Event>) -> Result<BuildOutcome, BuildError> {
        for event in events {
            self.process(event)?;
        }
        self.finish()
    }
}
