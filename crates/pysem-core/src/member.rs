//! The symbol model (C1, §3): a tagged-variant `Member` enum plus the small
//! capability traits recommended by spec.md §9 instead of a class hierarchy
//! of member kinds.

use std::sync::Arc;

use crate::{
    location::{HasQualifiedName, Locatable, SourceLocation},
    types::{
        class::ClassMember,
        constant::ConstantMember,
        function::{FunctionMember, PropertyMember},
        lazy::LazyMember,
        module::ModuleMember,
        multiple::MultipleMember,
        wrappers::{IterableMember, IteratorMember, LookupMember, SequenceMember},
    },
};

/// The closed set of member-kind tags from §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum MemberKind {
    Module,
    Class,
    Function,
    Method,
    Property,
    Constant,
    Instance,
    Multiple,
    Unknown,
    Lazy,
}

/// A symbolic entity. Concrete mutable kinds (`Module`, `Class`, `Function`,
/// `Property`, `Multiple`) are `Arc`-shared so that weak back-references
/// (declaring module/class, MRO entries) can point at them without an
/// ownership cycle, per §3's relationship rules. Immutable kinds are cheap
/// value types.
#[derive(Debug, Clone)]
pub enum Member {
    Module(Arc<ModuleMember>),
    Class(Arc<ClassMember>),
    Function(Arc<FunctionMember>),
    Property(Arc<PropertyMember>),
    Constant(ConstantMember),
    Sequence(SequenceMember),
    Iterable(IterableMember),
    Iterator(IteratorMember),
    Lookup(LookupMember),
    Multiple(Arc<MultipleMember>),
    Lazy(Arc<LazyMember>),
    Unknown(UnknownMember),
}

/// The Unknown-typed sentinel (§3, §4.8): "unresolved X produce a named
/// Unknown constant and a trace warning, never an exception."
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMember {
    pub name: String,
    pub location: SourceLocation,
}

impl Member {
    #[must_use]
    pub fn unknown(name: impl Into<String>, location: SourceLocation) -> Self {
        Self::Unknown(UnknownMember { name: name.into(), location })
    }

    #[must_use]
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown(_))
    }

    #[must_use]
    pub fn kind(&self) -> MemberKind {
        match self {
            Self::Module(_) => MemberKind::Module,
            Self::Class(_) => MemberKind::Class,
            Self::Function(func) if func.declaring_class.is_some() => MemberKind::Method,
            Self::Function(_) => MemberKind::Function,
            Self::Property(_) => MemberKind::Property,
            Self::Constant(_) | Self::Sequence(_) | Self::Iterable(_) | Self::Iterator(_) | Self::Lookup(_) => {
                MemberKind::Constant
            }
            Self::Multiple(_) => MemberKind::Multiple,
            Self::Lazy(_) => MemberKind::Lazy,
            Self::Unknown(_) => MemberKind::Unknown,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Module(module) => module.name(),
            Self::Class(class) => class.name(),
            Self::Function(func) => &func.name,
            Self::Property(prop) => &prop.name,
            Self::Constant(constant) => &constant.name,
            Self::Sequence(seq) => &seq.name,
            Self::Iterable(it) => &it.name,
            Self::Iterator(it) => &it.name,
            Self::Lookup(lk) => &lk.name,
            Self::Multiple(multi) => multi.name(),
            Self::Lazy(lazy) => &lazy.name,
            Self::Unknown(unknown) => &unknown.name,
        }
    }

    /// §4.1 "Member access": resolve through a property by substituting its
    /// return type, and through a `MultipleMember` by taking the first
    /// non-null element — used by both the scope's expression evaluator and
    /// by MRO member lookup so the rule lives in one place.
    #[must_use]
    pub fn resolve_for_access(&self) -> Member {
        match self {
            Self::Property(prop) => prop.return_member(),
            Self::Multiple(multi) => multi.first_non_null().unwrap_or_else(|| self.clone()),
            other => other.clone(),
        }
    }
}

impl Locatable for Member {
    fn locations(&self) -> &[SourceLocation] {
        match self {
            Self::Module(module) => module.locations(),
            Self::Class(class) => class.locations(),
            Self::Function(func) => &func.locations,
            Self::Property(prop) => &prop.locations,
            Self::Constant(constant) => &constant.locations,
            Self::Multiple(multi) => multi.locations(),
            Self::Lazy(_) | Self::Sequence(_) | Self::Iterable(_) | Self::Iterator(_) | Self::Lookup(_) => &[],
            Self::Unknown(unknown) => std::slice::from_ref(&unknown.location),
        }
    }
}

impl HasQualifiedName for Member {
    fn qualified_name(&self) -> String {
        match self {
            Self::Module(module) => module.name().to_string(),
            Self::Class(class) => class.qualified_name(),
            Self::Function(func) => func.qualified_name(),
            Self::Property(prop) => prop.name.clone(),
            Self::Constant(constant) => constant.name.clone(),
            Self::Multiple(multi) => multi.name().to_string(),
            other => other.name().to_string(),
        }
    }
}

/// Capability trait for anything that owns a name → member table: modules
/// and classes. Drives §4.1's "Member access" expression rule and the
/// walker's class-body / module-body population.
pub trait MemberContainer {
    /// Direct (non-MRO, non-import-cascading) lookup in this container's own table.
    fn get_member(&self, name: &str) -> Option<Member>;

    /// All public member names currently visible (§4.2 `from M import *`,
    /// §8's "public names of the fused module").
    fn public_names(&self) -> Vec<String>;
}
