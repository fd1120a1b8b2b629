//! `Constant` (§3): "a typed value placeholder — name, type. Used to
//! represent literals and annotation-declared variables."

use crate::{location::SourceLocation, member::Member, types::builtin_id::BuiltinTypeId};

/// One or more symbolic types a constant may hold. A plain variable has
/// exactly one; a union-typed one (via `Optional`/`Union` or branch fusion)
/// may carry several, matching §4.1's "Union ... exposes its members".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstantType {
    Builtin(BuiltinTypeId),
    Class(String),
    Union(Vec<ConstantType>),
    /// A `str`-literal-valued constant (§4.1: "unicode string → a
    /// string-literal constant carrying the string value"), used by the
    /// resolver to read `__builtin_module_names__`-style tuples.
    StringLiteral(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstantMember {
    pub name: String,
    pub ty: ConstantType,
    pub locations: Vec<SourceLocation>,
}

impl ConstantMember {
    #[must_use]
    pub fn new(name: impl Into<String>, ty: ConstantType, location: SourceLocation) -> Self {
        Self { name: name.into(), ty, locations: vec![location] }
    }

    #[must_use]
    pub fn builtin(name: impl Into<String>, id: BuiltinTypeId, location: SourceLocation) -> Self {
        Self::new(name, ConstantType::Builtin(id), location)
    }

    #[must_use]
    pub fn as_member(self) -> Member {
        Member::Constant(self)
    }
}
