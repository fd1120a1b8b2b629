//! Scope stack & name-lookup context (C2, §4.1).
//!
//! Mirrors the teacher's `Namespaces` stack-of-tables shape (`namespace.rs`)
//! but over symbolic `Member`s instead of runtime `Value`s, and with a
//! `clone(copy_contents)` operation in place of the VM's `deep_clone`.

use std::sync::{Arc, Mutex};

use indexmap::IndexMap;

use crate::{member::Member, types::module::ModuleMember, types::multiple};

pub type ScopeTable = Arc<Mutex<IndexMap<String, Member>>>;

/// Which scope ranges `lookup_name` is allowed to scan (§4.1's bitset).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookupOptions {
    pub local: bool,
    pub nonlocal: bool,
    pub global: bool,
    pub builtins: bool,
    /// Set while evaluating the builtins module's own body, so it doesn't
    /// recursively resolve against itself (§4.1: "if ... suppress-builtins
    /// is not active").
    pub suppress_builtins: bool,
}

impl LookupOptions {
    pub const ALL: Self =
        Self { local: true, nonlocal: true, global: true, builtins: true, suppress_builtins: false };

    pub const MODULE_BODY: Self =
        Self { local: false, nonlocal: false, global: true, builtins: true, suppress_builtins: false };

    #[must_use]
    pub const fn without_builtins(mut self) -> Self {
        self.suppress_builtins = true;
        self
    }
}

/// A stack of name → member tables with Python's LEGB-minus-Enclosing-named
/// resolution (§4.1: "the innermost is Local, the outermost is Global,
/// everything in-between is Nonlocal").
#[derive(Debug)]
pub struct LookupContext {
    tables: Vec<ScopeTable>,
    builtins: Option<Arc<ModuleMember>>,
}

impl LookupContext {
    #[must_use]
    pub fn new(builtins: Option<Arc<ModuleMember>>) -> Self {
        Self { tables: vec![Arc::new(Mutex::new(IndexMap::new()))], builtins }
    }

    /// Pushes either a caller-supplied table (to reuse a module's own
    /// top-level table as its global scope) or a fresh one.
    pub fn push_scope(&mut self, table: Option<ScopeTable>) -> ScopeTable {
        let table = table.unwrap_or_else(|| Arc::new(Mutex::new(IndexMap::new())));
        self.tables.push(table.clone());
        table
    }

    pub fn pop_scope(&mut self) -> Option<ScopeTable> {
        self.tables.pop()
    }

    #[must_use]
    fn top_index(&self) -> usize {
        self.tables.len().saturating_sub(1)
    }

    /// §4.1 `set_in_scope`: fuses via MultipleMember rules when `merge` is
    /// set and an existing binding is already known; replaces unconditionally
    /// over the Unknown sentinel; `None` deletes the binding.
    pub fn set_in_scope(&self, name: &str, member: Option<Member>, merge: bool, scope: Option<usize>) {
        let index = scope.unwrap_or_else(|| self.top_index());
        let Some(table) = self.tables.get(index) else { return };
        let mut table = table.lock().unwrap();
        match member {
            None => {
                table.shift_remove(name);
            }
            Some(incoming) => match table.get(name).cloned() {
                Some(existing) if merge && !existing.is_unknown() => {
                    table.insert(name.to_string(), multiple::fuse(name, existing, incoming));
                }
                _ => {
                    table.insert(name.to_string(), incoming);
                }
            },
        }
    }

    /// §4.1 `get_in_scope`: "direct lookup without walking outer scopes."
    #[must_use]
    pub fn get_in_scope(&self, name: &str, scope: Option<usize>) -> Option<Member> {
        let index = scope.unwrap_or_else(|| self.top_index());
        self.tables.get(index).and_then(|table| table.lock().unwrap().get(name).cloned())
    }

    /// §4.1 `lookup_name`: scans the selected Local/Nonlocal/Global ranges
    /// innermost-first, then falls back to builtins.
    #[must_use]
    pub fn lookup_name(&self, name: &str, options: LookupOptions) -> Option<Member> {
        let depth = self.tables.len();
        for (index, table) in self.tables.iter().enumerate().rev() {
            let is_local = index == depth - 1;
            let is_global = index == 0;
            let is_nonlocal = !is_local && !is_global;
            let selected = (is_local && options.local)
                || (is_global && options.global)
                || (is_nonlocal && options.nonlocal)
                // a single-scope stack has no nonlocal range; §4.1: "with one
                // scope, Global alone or Local alone suffices"
                || (depth == 1 && (options.local || options.global));
            if !selected {
                continue;
            }
            if let Some(member) = table.lock().unwrap().get(name).cloned() {
                return Some(member);
            }
        }
        if options.builtins && !options.suppress_builtins {
            if let Some(builtins) = &self.builtins {
                if let Some(member) = crate::member::MemberContainer::get_member(builtins.as_ref(), name) {
                    return Some(member);
                }
            }
        }
        None
    }

    /// §4.1 `clone(copy_contents)`: snapshot the stack, sharing tables (the
    /// cheap default, used when the callee only needs to read enclosing
    /// bindings) or deep-copying them (when the callee must mutate its own
    /// view without affecting the caller's scope, e.g. a per-function walk
    /// that shadows a comprehension variable).
    #[must_use]
    pub fn clone_stack(&self, copy_contents: bool) -> Self {
        let tables = if copy_contents {
            self.tables
                .iter()
                .map(|table| Arc::new(Mutex::new(table.lock().unwrap().clone())))
                .collect()
        } else {
            self.tables.clone()
        };
        Self { tables, builtins: self.builtins.clone() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::SourceLocation;

    #[test]
    fn set_in_scope_merges_distinct_bindings() {
        use crate::types::{builtin_id::BuiltinTypeId, constant::ConstantMember};

        let ctx = LookupContext::new(None);
        ctx.set_in_scope(
            "x",
            Some(Member::Constant(ConstantMember::builtin("x", BuiltinTypeId::Int, SourceLocation::synthetic()))),
            true,
            None,
        );
        ctx.set_in_scope(
            "x",
            Some(Member::Constant(ConstantMember::builtin("x", BuiltinTypeId::Str, SourceLocation::synthetic()))),
            true,
            None,
        );
        let merged = ctx.get_in_scope("x", None).unwrap();
        assert!(matches!(merged, Member::Multiple(_)));
    }

    #[test]
    fn unknown_binding_is_replaced_unconditionally() {
        let ctx = LookupContext::new(None);
        ctx.set_in_scope("x", Some(Member::unknown("x", SourceLocation::synthetic())), true, None);
        ctx.set_in_scope("x", Some(Member::unknown("x-2", SourceLocation::synthetic())), true, None);
        let current = ctx.get_in_scope("x", None).unwrap();
        assert_eq!(current.name(), "x-2");
    }

    #[test]
    fn lookup_name_resolves_innermost_first() {
        let mut ctx = LookupContext::new(None);
        ctx.set_in_scope("x", Some(Member::unknown("global-x", SourceLocation::synthetic())), true, Some(0));
        ctx.push_scope(None);
        ctx.set_in_scope("x", Some(Member::unknown("local-x", SourceLocation::synthetic())), true, None);
        let found = ctx.lookup_name("x", LookupOptions::ALL).unwrap();
        assert_eq!(found.name(), "local-x");
    }

    #[test]
    fn clone_with_copy_contents_is_independent() {
        let mut ctx = LookupContext::new(None);
        ctx.set_in_scope("x", Some(Member::unknown("x", SourceLocation::synthetic())), true, Some(0));
        let snapshot = ctx.clone_stack(true);
        ctx.set_in_scope("x", Some(Member::unknown("x-changed", SourceLocation::synthetic())), true, Some(0));
        assert_eq!(snapshot.get_in_scope("x", Some(0)).unwrap().name(), "x");
    }
}
