//! `Function`, `Overload`, `Parameter`, `Property` (§3).
//!
//! Overload lists are append-only under a per-function lock (§5); a
//! property's read-only flag may only transition `true -> false` (§3
//! invariant 4). Both map onto a small `Mutex`-guarded state struct, the
//! same shape the teacher workspace uses for its class member tables.

use std::sync::{Mutex, Weak};

use crate::{
    location::{HasQualifiedName, SourceLocation},
    member::Member,
    types::{class::ClassMember, module::ModuleMember},
};

/// Parameter binding kind (§6 external API: "positional, var-positional,
/// keyword, var-keyword"). `is_var_positional`/`is_var_keyword` in §3's data
/// model are derived accessors over this single field rather than
/// independent booleans, so the two can never disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterKind {
    Positional,
    VarPositional,
    Keyword,
    VarKeyword,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub annotation_types: Vec<Member>,
    /// Normalised default-value source text. `...` is treated as "no
    /// default" per §3 and is represented as `None`, not `Some("...")`.
    pub default_source: Option<String>,
    pub kind: ParameterKind,
}

impl Parameter {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: ParameterKind) -> Self {
        Self { name: name.into(), annotation_types: Vec::new(), default_source: None, kind }
    }

    #[must_use]
    pub fn with_default(mut self, default_source: Option<String>) -> Self {
        self.default_source = default_source.filter(|text| text != "...");
        self
    }

    #[must_use]
    pub fn with_annotation(mut self, types: Vec<Member>) -> Self {
        self.annotation_types = types;
        self
    }

    #[must_use]
    pub const fn is_var_positional(&self) -> bool {
        matches!(self.kind, ParameterKind::VarPositional)
    }

    #[must_use]
    pub const fn is_var_keyword(&self) -> bool {
        matches!(self.kind, ParameterKind::VarKeyword)
    }
}

/// One signature of a function. Once constructed, `parameters` never
/// changes (§3 invariant 3); the return-type set is filled in later, lazily,
/// by the deferred function walker (C5), hence the interior `Mutex<Option<_>>`
/// rather than a field set at construction time.
#[derive(Debug)]
pub struct Overload {
    pub parameters: Box<[Parameter]>,
    pub return_annotation_source: Option<String>,
    pub documentation: Option<String>,
    return_types: Mutex<Option<Vec<Member>>>,
}

impl Overload {
    #[must_use]
    pub fn new(parameters: Vec<Parameter>) -> Self {
        Self {
            parameters: parameters.into_boxed_slice(),
            return_annotation_source: None,
            documentation: None,
            return_types: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn with_return_annotation(mut self, source: Option<String>) -> Self {
        self.return_annotation_source = source;
        self
    }

    #[must_use]
    pub fn with_documentation(mut self, doc: Option<String>) -> Self {
        self.documentation = doc;
        self
    }

    /// `None` means neither an explicit return annotation nor the deferred
    /// walker (C5) has filled this in yet; the walker registers a closure
    /// with `DeferredWalkerSet::add` that calls `finalize_return_types` once
    /// it runs, via `process_function`/`process_set`.
    #[must_use]
    pub fn return_types(&self) -> Option<Vec<Member>> {
        self.return_types.lock().unwrap().clone()
    }

    #[must_use]
    pub fn return_types_resolved(&self) -> bool {
        self.return_types.lock().unwrap().is_some()
    }

    /// Called once by the deferred walker after it finishes walking this
    /// overload's body. Idempotent: a second call (e.g. from `process_function`
    /// being invoked again defensively) overwrites rather than panicking,
    /// since body-walking is itself deterministic given the same scope.
    pub fn finalize_return_types(&self, types: Vec<Member>) {
        *self.return_types.lock().unwrap() = Some(types);
    }
}

#[derive(Debug)]
pub struct FunctionMember {
    pub name: String,
    pub declaring_module: Option<Weak<ModuleMember>>,
    pub declaring_class: Option<Weak<ClassMember>>,
    pub docstring: Option<String>,
    pub locations: Vec<SourceLocation>,
    state: Mutex<FunctionState>,
}

#[derive(Debug, Default)]
struct FunctionState {
    is_static: bool,
    is_class_method: bool,
    overloads: Vec<std::sync::Arc<Overload>>,
}

impl FunctionMember {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        declaring_module: Option<Weak<ModuleMember>>,
        declaring_class: Option<Weak<ClassMember>>,
        location: SourceLocation,
    ) -> Self {
        Self {
            name: name.into(),
            declaring_module,
            declaring_class,
            docstring: None,
            locations: vec![location],
            state: Mutex::new(FunctionState::default()),
        }
    }

    /// Appends a new overload (§4.2: "if present, add a new overload").
    /// Append-only under the per-function lock (§5).
    pub fn add_overload(&self, overload: Overload) -> std::sync::Arc<Overload> {
        let overload = std::sync::Arc::new(overload);
        self.state.lock().unwrap().overloads.push(overload.clone());
        overload
    }

    /// Appends an overload already shared via `Arc` (§4.6's function-union
    /// fusion: the overload objects being merged already belong to their
    /// original `FunctionMember`s and must keep identity, not be rebuilt).
    pub fn add_overload_shared(&self, overload: std::sync::Arc<Overload>) {
        self.state.lock().unwrap().overloads.push(overload);
    }

    #[must_use]
    pub fn overloads(&self) -> Vec<std::sync::Arc<Overload>> {
        self.state.lock().unwrap().overloads.clone()
    }

    #[must_use]
    pub fn is_static(&self) -> bool {
        self.state.lock().unwrap().is_static
    }

    #[must_use]
    pub fn is_class_method(&self) -> bool {
        self.state.lock().unwrap().is_class_method
    }

    pub fn set_static(&self) {
        self.state.lock().unwrap().is_static = true;
    }

    pub fn set_class_method(&self) {
        self.state.lock().unwrap().is_class_method = true;
    }

    /// §3: "For `__init__`, docstring falls back to the declaring class."
    #[must_use]
    pub fn effective_docstring(&self) -> Option<String> {
        if let Some(doc) = &self.docstring {
            return Some(doc.clone());
        }
        if self.name == "__init__" {
            if let Some(class) = self.declaring_class.as_ref().and_then(Weak::upgrade) {
                return class.docstring();
            }
        }
        None
    }
}

impl HasQualifiedName for FunctionMember {
    fn qualified_name(&self) -> String {
        let mut parts = Vec::new();
        if let Some(class) = self.declaring_class.as_ref().and_then(Weak::upgrade) {
            parts.push(class.qualified_name());
        } else if let Some(module) = self.declaring_module.as_ref().and_then(Weak::upgrade) {
            parts.push(module.name().to_string());
        }
        parts.push(self.name.clone());
        parts.join(".")
    }
}

/// `@property` getter plus an `IsReadOnly` flag flipped to `false` by a
/// later `@<name>.setter` (§3, §4.2, §8 scenario 4). The getter may only be
/// set once (§3 invariant 4); the underlying overload is therefore supplied
/// at construction time, not mutated afterward.
#[derive(Debug)]
pub struct PropertyMember {
    pub name: String,
    pub overload: Overload,
    pub locations: Vec<SourceLocation>,
    pub declaring_class: Option<Weak<ClassMember>>,
    read_only: Mutex<bool>,
}

impl PropertyMember {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        overload: Overload,
        location: SourceLocation,
        declaring_class: Option<Weak<ClassMember>>,
    ) -> Self {
        Self { name: name.into(), overload, locations: vec![location], declaring_class, read_only: Mutex::new(true) }
    }

    #[must_use]
    pub fn is_read_only(&self) -> bool {
        *self.read_only.lock().unwrap()
    }

    /// Handles a `@<name>.setter` decorator seen at any point relative to
    /// the getter (§8 scenario 4). One-way: calling this when already
    /// settable is a no-op, matching invariant 4's "may only transition
    /// `true -> false`".
    pub fn mark_settable(&self) {
        *self.read_only.lock().unwrap() = false;
    }

    #[must_use]
    pub fn return_member(&self) -> Member {
        self.overload
            .return_types()
            .and_then(|types| types.into_iter().next())
            .unwrap_or_else(|| Member::unknown(&self.name, self.locations.first().cloned().unwrap_or_else(SourceLocation::synthetic)))
    }
}
