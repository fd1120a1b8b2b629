//! `Module` (§3): source / nested-lazy / builtin / scraped forms.
//!
//! The fifth form from §3 — "sentinel module, an in-flight import marker" —
//! is not a `ModuleMember` variant here: it never becomes a visible `Member`
//! that the walker or scope stack can hold, it only ever occupies a slot in
//! the module cache while an import is in flight. It is modelled instead by
//! `pysem_resolver::cache::CacheSlot`, right where its concurrency semantics
//! (§5, §8 scenario 5) belong.

use std::sync::Mutex;

use indexmap::IndexMap;

use crate::{
    location::{HasQualifiedName, Locatable, SourceLocation},
    member::{Member, MemberContainer},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleOrigin {
    /// Parsed from a `.py`/`.pyi` source file.
    Source,
    /// A named placeholder resolved on first access (§3, §4.2's "nested
    /// member" import binding). Resolution itself is driven by the module
    /// cache; this tag just distinguishes the member for diagnostics.
    NestedLazy,
    /// Scraped names plus a hidden-name set used to suppress dunder
    /// aliases (§3 invariant 6).
    Builtin,
    /// Loaded from a textual introspection dump cached on disk (§4.7/§4.8
    /// "compiled" modules).
    Scraped,
}

#[derive(Debug)]
pub struct ModuleMember {
    name: String,
    pub origin: ModuleOrigin,
    pub docstring: Option<String>,
    locations: Vec<SourceLocation>,
    members: Mutex<IndexMap<String, Member>>,
    children: Mutex<IndexMap<String, Member>>,
    /// Builtins-only: names that exist in the scraped dump but must never
    /// appear in public enumeration (§3 invariant 6).
    hidden_names: Mutex<std::collections::HashSet<String>>,
}

impl ModuleMember {
    #[must_use]
    pub fn new(name: impl Into<String>, origin: ModuleOrigin, location: SourceLocation) -> Self {
        Self {
            name: name.into(),
            origin,
            docstring: None,
            locations: vec![location],
            members: Mutex::new(IndexMap::new()),
            children: Mutex::new(IndexMap::new()),
            hidden_names: Mutex::new(std::collections::HashSet::new()),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Insertion-ordered direct set — callers needing fusion semantics go
    /// through `scope::set_in_scope` instead, which applies §4.6's rules;
    /// this is the raw table write used once during the AST walk's own
    /// bookkeeping (pre-pass, completion).
    pub fn insert_raw(&self, name: impl Into<String>, member: Member) {
        self.members.lock().unwrap().insert(name.into(), member);
    }

    pub fn insert_child_module(&self, name: impl Into<String>, module: Member) {
        self.children.lock().unwrap().insert(name.into(), module);
    }

    #[must_use]
    pub fn children_modules(&self) -> Vec<Member> {
        self.children.lock().unwrap().values().cloned().collect()
    }

    pub fn hide_name(&self, name: impl Into<String>) {
        self.hidden_names.lock().unwrap().insert(name.into());
    }

    #[must_use]
    pub fn is_hidden(&self, name: &str) -> bool {
        self.hidden_names.lock().unwrap().contains(name)
    }

    #[must_use]
    pub fn docstring(&self) -> Option<String> {
        self.docstring.clone()
    }
}

impl MemberContainer for ModuleMember {
    fn get_member(&self, name: &str) -> Option<Member> {
        self.members.lock().unwrap().get(name).cloned()
    }

    fn public_names(&self) -> Vec<String> {
        let hidden = self.hidden_names.lock().unwrap();
        self.members
            .lock()
            .unwrap()
            .keys()
            .filter(|name| !name.starts_with('_') && !hidden.contains(name.as_str()))
            .cloned()
            .collect()
    }
}

impl Locatable for ModuleMember {
    fn locations(&self) -> &[SourceLocation] {
        &self.locations
    }
}

impl HasQualifiedName for ModuleMember {
    fn qualified_name(&self) -> String {
        self.name.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        builtin_id::BuiltinTypeId,
        constant::{ConstantMember, ConstantType},
    };

    #[test]
    fn hidden_names_excluded_from_public_enumeration() {
        let module = ModuleMember::new("builtins", ModuleOrigin::Builtin, SourceLocation::synthetic());
        module.insert_raw(
            "int",
            Member::Constant(ConstantMember::new(
                "int",
                ConstantType::Builtin(BuiltinTypeId::Type),
                SourceLocation::synthetic(),
            )),
        );
        module.insert_raw("__loader__", Member::unknown("__loader__", SourceLocation::synthetic()));
        module.hide_name("__loader__");

        let public = module.public_names();
        assert!(public.contains(&"int".to_string()));
        assert!(!public.contains(&"__loader__".to_string()));
    }
}
