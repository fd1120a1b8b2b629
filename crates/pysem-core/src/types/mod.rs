//! Concrete member kinds (§3). `member::Member` is the tagged union over
//! these; each submodule owns one kind's storage and behaviour.

pub mod builtin_id;
pub mod class;
pub mod constant;
pub mod function;
pub mod lazy;
pub mod module;
pub mod multiple;
pub mod wrappers;

pub use builtin_id::BuiltinTypeId;
pub use class::ClassMember;
pub use constant::{ConstantMember, ConstantType};
pub use function::{Overload, Parameter, ParameterKind, PropertyMember, FunctionMember};
pub use lazy::LazyMember;
pub use module::{ModuleMember, ModuleOrigin};
pub use multiple::MultipleMember;
pub use wrappers::{IterableMember, IteratorMember, LookupMember, SequenceMember};
