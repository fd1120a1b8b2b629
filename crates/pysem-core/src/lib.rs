#![doc = include_str!("../../../README.md")]
#![expect(clippy::module_name_repetitions, reason = "Member/Module/Class naming mirrors the glossary in SPEC_FULL.md")]
#![expect(clippy::too_many_arguments, reason = "walker dispatch signatures stay wide to avoid ad-hoc option structs")]

//! The core symbol-table engine (C1-C6 of SPEC_FULL.md): the `Member`
//! model, scope/lookup, expression and annotation evaluation, the deferred
//! function walker, class MRO linearisation, and the single-pass AST
//! walker that ties them together. Module resolution and the on-disk cache
//! (C7/C8) live in `pysem-resolver`, consumed here only through the
//! [`import_provider::ModuleProvider`] seam trait so this crate never
//! depends on filesystem or subprocess machinery.

pub mod annotation;
pub mod config;
pub mod deferred;
pub mod diagnostics;
pub mod expr_eval;
pub mod import_provider;
pub mod invariant;
pub mod location;
pub mod member;
pub mod mro;
pub mod scope;
pub mod types;
pub mod version;
pub mod walker;

pub use crate::{
    config::InterpreterConfiguration,
    deferred::{DeferredWalkerSet, Walker},
    diagnostics::{DiagnosticEvent, Diagnostics, NoopDiagnostics, RecordingDiagnostics},
    import_provider::{ImportResolution, ModuleProvider},
    invariant::EngineBug,
    location::{HasQualifiedName, Locatable, SourceLocation},
    member::{Member, MemberContainer, MemberKind, UnknownMember},
    scope::{LookupContext, LookupOptions},
    version::{PythonVersion, VersionCmpOp},
    walker::{WalkerState, walk_module},
};
