//! End-to-end scenarios through the public walker API only (§8): no
//! internal module path is reached except through `walk_module`,
//! `WalkerState`, and the `Member`/`MemberContainer` surface a downstream
//! crate (`pysem-resolver`, `pysem-cli`) would also use.

use std::sync::Arc;

use pysem_core::{
    diagnostics::NoopDiagnostics,
    import_provider::{ImportResolution, ModuleProvider},
    location::SourceLocation,
    member::{Member, MemberContainer},
    scope::LookupContext,
    types::module::{ModuleMember, ModuleOrigin},
    version::PythonVersion,
    walker::{WalkerState, walk_module},
};

struct NoImports;

impl ModuleProvider for NoImports {
    fn resolve_dotted_import(&self, _dotted_name: &str, _current_module: &str) -> ImportResolution {
        ImportResolution::Unknown
    }

    fn materialise_module_members(&self, _dotted_name: &str) -> Option<Vec<(String, Member)>> {
        None
    }

    fn namespace_package_children(&self, _dotted_name: &str) -> Option<Vec<String>> {
        None
    }

    fn typing_shim_module(&self) -> Option<Member> {
        None
    }
}

fn walk(source: &str, python_version: PythonVersion) -> Arc<ModuleMember> {
    let parsed = ruff_python_parser::parse_module(source).expect("valid test source");
    let body = parsed.into_syntax().body;
    let module = Arc::new(ModuleMember::new("m", ModuleOrigin::Source, SourceLocation::synthetic()));
    let provider = NoImports;
    let deferred = pysem_core::DeferredWalkerSet::default();
    let mut diagnostics = NoopDiagnostics;
    let mut state = WalkerState {
        module: module.clone(),
        scope: LookupContext::new(None),
        deferred: &deferred,
        provider: &provider,
        diagnostics: &mut diagnostics,
        python_version,
        path: None,
        typing_scope: std::sync::Mutex::new(indexmap::IndexMap::new()),
        is_stub_file: false,
    };
    walk_module(&mut state, &body);
    module
}

fn py3() -> PythonVersion {
    PythonVersion::new(3, 11)
}

/// §8 scenario 1: `Type[T]` annotation yields a class-factory return type.
#[test]
fn type_annotated_return_yields_a_class_factory() {
    let module = walk(
        "from typing import Type\n\
         class C: pass\n\
         def f() -> Type[C]: ...\n",
        py3(),
    );

    let Some(Member::Function(f)) = module.get_member("f") else { panic!("f not found") };
    let overload = f.overloads().into_iter().next().expect("f has one overload");
    let return_types = overload.return_types().expect("explicit annotation resolves eagerly");
    match return_types.into_iter().next() {
        Some(Member::Class(class)) => {
            assert_eq!(class.name(), "C");
            assert!(class.is_class_factory);
        }
        other => panic!("expected a class-factory Class, got {other:?}"),
    }
}

/// §8 scenario 3: a `sys.version_info` guard picks one branch's definition
/// depending on the configured language version.
#[test]
fn version_info_guard_picks_the_py3_branch_under_py3() {
    let module = walk(
        "import sys\n\
         if sys.version_info >= (3, 0):\n\
         \n    def g() -> int: ...\n\
         else:\n\
         \n    def g() -> bytes: ...\n",
        py3(),
    );

    let Some(Member::Function(g)) = module.get_member("g") else { panic!("g not found") };
    assert_eq!(g.overloads().len(), 1);
}

/// §8 scenario 4: a property whose setter decorator appears lexically
/// before its getter still ends up settable (decorator order shouldn't
/// matter to the final `is_read_only` flag).
#[test]
fn property_and_setter_combine_regardless_of_order() {
    let module = walk(
        "class Num: pass\n\
         class C:\n\
        \n    @property\n    def x(self) -> Num: ...\n\
        \n    @x.setter\n    def x(self, v): ...\n",
        py3(),
    );

    let Some(Member::Class(c)) = module.get_member("C") else { panic!("C not found") };
    match c.own_member("x") {
        Some(Member::Property(property)) => {
            assert!(!property.is_read_only());
            match property.return_member() {
                Member::Class(class) => assert_eq!(class.name(), "Num"),
                other => panic!("expected Num, got {other:?}"),
            }
        }
        other => panic!("expected a Property, got {other:?}"),
    }
}

/// §8 scenario 2, exercised only through the public walker surface (the
/// deeper `mro()`-vector assertions live in `walker.rs`'s own unit tests).
#[test]
fn diamond_inheritance_resolves_a_shared_ancestor_member() {
    let module = walk(
        "class A:\n    shared = 1\n\
         class B(A): pass\n\
         class C(A): pass\n\
         class D(B, C): pass\n",
        py3(),
    );

    let Some(Member::Class(d)) = module.get_member("D") else { panic!("D not found") };
    assert!(pysem_core::types::ClassMember::lookup_through_mro(&d, "shared").is_some());
}
