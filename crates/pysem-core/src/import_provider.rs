//! The seam between the AST walker (C3, in this crate) and the module
//! resolver/cache (C7+C8, in `pysem-resolver`): §4.2's "Imports" bullet
//! needs to resolve dotted names and materialise modules without this
//! crate depending on the resolver crate's disk/process machinery.

use crate::member::Member;

/// What a dotted import name resolved to, from the walker's point of view
/// (§4.2's "bind the chosen local name to: the current module (self-import),
/// a nested lazy module ..., a possible-module ..., or an Unknown constant").
pub enum ImportResolution {
    SelfImport,
    NestedLazy(Member),
    PossibleModule,
    Unknown,
}

/// Implemented by `pysem_resolver`'s cache/path-resolver pair. The walker
/// only ever needs this much of C7+C8's surface.
pub trait ModuleProvider {
    fn resolve_dotted_import(&self, dotted_name: &str, current_module: &str) -> ImportResolution;

    /// §4.2 `from M import *`: materialise `M` and return its public names
    /// plus each resolved member, or `None` if `M` could not be resolved.
    fn materialise_module_members(&self, dotted_name: &str) -> Option<Vec<(String, Member)>>;

    /// §4.2 "M is a namespace package": the set of submodule names known to
    /// exist under this namespace package, used to decide lazy-module vs
    /// Unknown for each imported name.
    fn namespace_package_children(&self, dotted_name: &str) -> Option<Vec<String>>;

    fn typing_shim_module(&self) -> Option<Member>;
}
