//! `Class` (§3): name, declaring module, docstring, location, ordered bases,
//! member table, lazily-materialised MRO, and a builtin-type-id tag.
//!
//! MRO computation itself (C3 linearisation) lives in `crate::mro`, grounded
//! on the teacher's `compute_c3_mro`; this module owns the class's storage
//! and the `__mro__`/member-lookup-through-MRO behaviour described in §4.4.

use std::{
    cell::RefCell,
    sync::{Arc, Mutex, OnceLock, Weak},
};

use indexmap::IndexMap;

use crate::{
    location::{HasQualifiedName, Locatable, SourceLocation},
    member::{Member, MemberContainer},
    types::{builtin_id::BuiltinTypeId, module::ModuleMember, wrappers::SequenceMember},
};

thread_local! {
    /// Per-thread in-progress guard for recursive MRO member lookups (§4.4:
    /// "use a per-thread/per-task in-progress flag to short-circuit
    /// recursive lookups on the same class"). Keyed by the class's address,
    /// since two distinct `Arc<ClassMember>` can never share one.
    static MRO_LOOKUP_GUARD: RefCell<std::collections::HashSet<usize>> = RefCell::new(std::collections::HashSet::new());
}

#[derive(Debug)]
pub struct ClassMember {
    name: String,
    pub declaring_module: Option<Weak<ModuleMember>>,
    pub docstring: Option<String>,
    locations: Vec<SourceLocation>,
    /// Ordered as written in the class statement (§3, used by C3 merge).
    /// Behind a `Mutex` rather than a plain field: a class definition
    /// revisited (e.g. the pre-pass placeholder, then the real walk) needs
    /// to replace its bases in place, since every other reference to the
    /// class holds the same `Arc`.
    bases: Mutex<Vec<Member>>,
    members: Mutex<IndexMap<String, Member>>,
    /// Materialised once, on first `__mro__` access or first MRO-based
    /// lookup, by `crate::mro::compute_mro` (§4.4).
    mro: OnceLock<Vec<Weak<ClassMember>>>,
    pub builtin_type_id: Option<BuiltinTypeId>,
    /// `Type[T]` representation (§3: "a boolean is-class-factory used to
    /// represent `Type[T]`").
    pub is_class_factory: bool,
}

impl ClassMember {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        declaring_module: Option<Weak<ModuleMember>>,
        bases: Vec<Member>,
        location: SourceLocation,
    ) -> Self {
        Self {
            name: name.into(),
            declaring_module,
            docstring: None,
            locations: vec![location],
            bases: Mutex::new(bases),
            members: Mutex::new(IndexMap::new()),
            mro: OnceLock::new(),
            builtin_type_id: None,
            is_class_factory: false,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ordered as written in the class statement, or as last set by
    /// `set_bases` (§3, used by C3 merge).
    #[must_use]
    pub fn bases(&self) -> Vec<Member> {
        self.bases.lock().unwrap().clone()
    }

    /// Replaces this class's bases in place. A class revisited after its
    /// pre-pass placeholder was installed (`walker::walk_class_def`) needs
    /// this: every other reference to the class already holds the same
    /// `Arc`, so the bases can't be supplied again through the constructor.
    pub fn set_bases(&self, bases: Vec<Member>) {
        *self.bases.lock().unwrap() = bases;
    }

    /// Builds the `Type[T]` representation of `original` (§3): a class
    /// member standing for the class object itself rather than an instance
    /// of it. Members are snapshotted from `original` at the point of the
    /// call; a member added to `original` afterwards won't retroactively
    /// appear here, the same limitation `resolver::fuse_stub` already
    /// accepts for the analogous reason (no raw-member-dump accessor).
    #[must_use]
    pub fn as_factory(original: &Arc<Self>) -> Arc<Self> {
        let mut clone = Self::new(
            original.name.clone(),
            original.declaring_module.clone(),
            original.bases(),
            original.locations.first().cloned().unwrap_or_else(SourceLocation::synthetic),
        );
        clone.builtin_type_id = original.builtin_type_id;
        clone.is_class_factory = true;
        for name in original.public_names() {
            if let Some(member) = original.own_member(&name) {
                clone.insert_member(name, member);
            }
        }
        if let Some(mro) = original.mro() {
            clone.install_mro(mro);
        }
        Arc::new(clone)
    }

    #[must_use]
    pub fn docstring(&self) -> Option<String> {
        self.docstring.clone()
    }

    pub fn insert_member(&self, name: impl Into<String>, member: Member) {
        self.members.lock().unwrap().insert(name.into(), member);
    }

    #[must_use]
    pub fn own_member(&self, name: &str) -> Option<Member> {
        self.members.lock().unwrap().get(name).cloned()
    }

    /// Returns the already-materialised MRO, or `None` if `crate::mro`
    /// hasn't computed it for this class yet.
    #[must_use]
    pub fn mro(&self) -> Option<Vec<Weak<ClassMember>>> {
        self.mro.get().cloned()
    }

    /// Installs the computed MRO. Called exactly once, by
    /// `crate::mro::compute_mro`, right after linearisation (§4.4).
    /// Idempotent under races: `OnceLock::set` silently loses to whichever
    /// caller wins, and both candidates are the same linearisation anyway.
    pub fn install_mro(&self, mro: Vec<Weak<ClassMember>>) {
        let _ = self.mro.set(mro);
    }

    /// §4.4: "For the special name `__mro__`, materialise a Tuple-shaped
    /// sequence over the MRO on first access and cache it."
    #[must_use]
    pub fn mro_tuple_member(self_arc: &Arc<Self>) -> Member {
        let mro = self_arc.mro().unwrap_or_else(|| vec![Arc::downgrade(self_arc)]);
        let element_types = mro.iter().filter_map(Weak::upgrade).map(Member::Class).collect();
        Member::Sequence(SequenceMember::new("__mro__", BuiltinTypeId::Tuple, element_types))
    }

    /// Member lookup through the MRO (§4.4): "walk the MRO in reverse,
    /// collecting the first non-null member." Reverse iteration with
    /// unconditional overwrite makes the last write the member from the
    /// most-derived class that defines it, i.e. the same result a forward
    /// first-match search would give, without early-exit bookkeeping.
    /// Returns `None` if a recursive MRO is detected for this class
    /// (§4.4's "recursive MRO returns `[self]` and surfaces a trace-level
    /// warning"); the caller is responsible for emitting that warning.
    #[must_use]
    pub fn lookup_through_mro(self_arc: &Arc<Self>, name: &str) -> Option<Member> {
        let key = Arc::as_ptr(self_arc) as usize;
        let already_in_progress = MRO_LOOKUP_GUARD.with(|guard| !guard.borrow_mut().insert(key));
        if already_in_progress {
            return None;
        }
        let mro = self_arc.mro().unwrap_or_else(|| vec![Arc::downgrade(self_arc)]);
        let mut found = None;
        for class in mro.iter().rev().filter_map(Weak::upgrade) {
            if let Some(member) = class.own_member(name) {
                found = Some(member);
            }
        }
        MRO_LOOKUP_GUARD.with(|guard| {
            guard.borrow_mut().remove(&key);
        });
        found
    }
}

impl MemberContainer for ClassMember {
    fn get_member(&self, name: &str) -> Option<Member> {
        if let Some(member) = self.own_member(name) {
            return Some(member);
        }
        None
    }

    fn public_names(&self) -> Vec<String> {
        self.members
            .lock()
            .unwrap()
            .keys()
            .filter(|name| !name.starts_with('_'))
            .cloned()
            .collect()
    }
}

impl Locatable for ClassMember {
    fn locations(&self) -> &[SourceLocation] {
        &self.locations
    }
}

impl HasQualifiedName for ClassMember {
    fn qualified_name(&self) -> String {
        let mut parts = Vec::new();
        if let Some(module) = self.declaring_module.as_ref().and_then(Weak::upgrade) {
            parts.push(module.name().to_string());
        }
        parts.push(self.name.clone());
        parts.join(".")
    }
}
