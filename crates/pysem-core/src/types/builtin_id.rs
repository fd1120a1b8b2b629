//! The closed `BuiltinTypeId` enum (§3: "a builtin-type-id tag").

/// Tag distinguishing the handful of builtin types the engine has
/// specialised rules for (bytes-indexing, big-integer literals, `Type[T]`,
/// the container wrappers in `types::wrappers`) from everything else, which
/// is just `Unknown` or a plain user-defined `ClassMember`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
pub enum BuiltinTypeId {
    Object,
    Type,
    NoneType,
    Bool,
    Int,
    /// Arbitrary-precision integer, distinct from `Int` only for Python 2's
    /// `long` literal suffix (§4.1 literal typing rules).
    Long,
    Float,
    Complex,
    Str,
    Bytes,
    List,
    Tuple,
    Set,
    FrozenSet,
    Dict,
    Ellipsis,
    Function,
    Method,
    Property,
    Module,
    ListIterator,
    TupleIterator,
    SetIterator,
    DictKeysIterator,
    BytesIterator,
    StrIterator,
    Unknown,
}

impl BuiltinTypeId {
    /// `True`/`False` → `Bool` lookup table used by the literal-typing rules
    /// in §4.1 ("Literals" bullet list).
    #[must_use]
    pub const fn iterator_for(self) -> Option<Self> {
        Some(match self {
            Self::List => Self::ListIterator,
            Self::Tuple => Self::TupleIterator,
            Self::Set | Self::FrozenSet => Self::SetIterator,
            Self::Dict => Self::DictKeysIterator,
            Self::Bytes => Self::BytesIterator,
            Self::Str => Self::StrIterator,
            _ => return None,
        })
    }

    /// The builtins-module name for this type, where one exists (used by
    /// §4.1's `type(x)` rule to look the class back up by name). `None` for
    /// tags with no single corresponding builtin name (iterators, `Unknown`,
    /// `Object`, `Method`).
    #[must_use]
    pub const fn python_name(self) -> Option<&'static str> {
        Some(match self {
            Self::Type => "type",
            Self::NoneType => "NoneType",
            Self::Bool => "bool",
            Self::Int | Self::Long => "int",
            Self::Float => "float",
            Self::Complex => "complex",
            Self::Str => "str",
            Self::Bytes => "bytes",
            Self::List => "list",
            Self::Tuple => "tuple",
            Self::Set => "set",
            Self::FrozenSet => "frozenset",
            Self::Dict => "dict",
            Self::Function => "function",
            Self::Module => "module",
            _ => return None,
        })
    }
}
