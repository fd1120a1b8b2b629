//! `MultipleMember` fusion (§4.6, part of C1): the result of merging two
//! bindings for the same name seen via `set_in_scope` or stub-merge.

use std::collections::HashMap;
use std::sync::Arc;

use crate::{
    location::{HasQualifiedName, Locatable, SourceLocation},
    member::{Member, MemberContainer},
    types::{
        builtin_id::BuiltinTypeId,
        class::ClassMember,
        function::FunctionMember,
        module::{ModuleMember, ModuleOrigin},
    },
};

#[derive(Debug)]
pub struct MultipleMember {
    name: String,
    /// Deduplicated element set (§4.6: "If one is a MultipleMember, union
    /// the element sets (deduplicated)").
    elements: Vec<Member>,
}

impl MultipleMember {
    #[must_use]
    pub fn new(name: impl Into<String>, elements: Vec<Member>) -> Self {
        Self { name: name.into(), elements }
    }

    #[must_use]
    pub fn elements(&self) -> &[Member] {
        &self.elements
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// §4.1 "Member access" / `resolve_for_access`'s fallback: "the first
    /// non-null element".
    #[must_use]
    pub fn first_non_null(&self) -> Option<Member> {
        self.elements.iter().find(|member| !member.is_unknown()).cloned()
    }
}

/// Structural equality over the unresolved element set (§4.6: "Equality is
/// structural on the unresolved element set"), approximated by name + kind
/// + source locations since the concrete member kinds don't carry a cheap
/// deep-equality beyond that.
fn members_structurally_equal(a: &Member, b: &Member) -> bool {
    a.kind() == b.kind() && a.name() == b.name() && a.locations() == b.locations()
}

/// Fuses two bindings for the same name (§4.6). This is the merge rule
/// `scope::set_in_scope` calls when asked to merge rather than overwrite.
#[must_use]
pub fn fuse(name: &str, existing: Member, incoming: Member) -> Member {
    if existing.is_unknown() {
        return incoming;
    }
    if incoming.is_unknown() {
        return existing;
    }
    if members_structurally_equal(&existing, &incoming) {
        return existing;
    }

    let mut elements = Vec::new();
    match existing {
        Member::Multiple(multi) => elements.extend(multi.elements.iter().cloned()),
        other => elements.push(other),
    }
    match incoming {
        Member::Multiple(multi) => {
            for element in &multi.elements {
                if !elements.iter().any(|existing| members_structurally_equal(existing, element)) {
                    elements.push(element.clone());
                }
            }
        }
        other => {
            if !elements.iter().any(|existing| members_structurally_equal(existing, &other)) {
                elements.push(other);
            }
        }
    }

    if elements.len() == 1 {
        return elements.into_iter().next().unwrap();
    }

    if let Some(specialised) = fuse_homogeneous(name, &elements) {
        return specialised;
    }

    Member::Multiple(Arc::new(MultipleMember::new(name, elements)))
}

/// §4.6: "Homogeneous unions (all functions, all modules, all types) use
/// specialised fusion classes that expose the combined capability" —
/// collapses to a single `Function`/`Module`/`Class` member rather than a
/// generic `MultipleMember`, so callers keep working through the ordinary
/// per-kind API instead of having to iterate elements by hand. `None` when
/// `elements` isn't homogeneous over one of these three kinds.
fn fuse_homogeneous(name: &str, elements: &[Member]) -> Option<Member> {
    if elements.iter().all(|element| matches!(element, Member::Function(_))) {
        return Some(fuse_functions(name, elements));
    }
    if elements.iter().all(|element| matches!(element, Member::Module(_))) {
        return Some(fuse_modules(name, elements));
    }
    if elements.iter().all(|element| matches!(element, Member::Class(_))) {
        return Some(fuse_classes(name, elements));
    }
    None
}

/// §4.6: "Functions union overloads and union declaring types/modules;
/// `IsStatic`/`IsClassMethod` are `any`; TypeId derived from class-method/
/// static-method/declaring-type signals." The declaring module/class is a
/// single slot on `FunctionMember` rather than a list, so "union declaring
/// types/modules" is approximated by keeping the first one any element
/// supplies — the same kind of single-slot approximation `ClassMember::
/// as_factory` already accepts for its own snapshot limitation.
fn fuse_functions(name: &str, elements: &[Member]) -> Member {
    let functions: Vec<Arc<FunctionMember>> =
        elements.iter().filter_map(|element| match element { Member::Function(f) => Some(f.clone()), _ => None }).collect();

    let location = functions
        .iter()
        .find_map(|function| function.locations.first().cloned())
        .unwrap_or_else(SourceLocation::synthetic);
    let declaring_module = functions.iter().find_map(|function| function.declaring_module.clone());
    let declaring_class = functions.iter().find_map(|function| function.declaring_class.clone());

    let mut fused = FunctionMember::new(name, declaring_module, declaring_class, location);
    fused.locations = functions.iter().flat_map(|function| function.locations.iter().cloned()).collect();
    fused.docstring = functions.iter().find_map(|function| function.docstring.clone());
    let fused = Arc::new(fused);

    for function in &functions {
        for overload in function.overloads() {
            fused.add_overload_shared(overload);
        }
        if function.is_static() {
            fused.set_static();
        }
        if function.is_class_method() {
            fused.set_class_method();
        }
    }

    Member::Function(fused)
}

/// §4.6: "Modules union child module lists and member enumerations;
/// importing cascades to all elements, aggregating errors." Overlapping
/// member names are themselves fused (recursively, through this same
/// `fuse`), rather than the last module's copy unconditionally winning.
fn fuse_modules(name: &str, elements: &[Member]) -> Member {
    let modules: Vec<Arc<ModuleMember>> =
        elements.iter().filter_map(|element| match element { Member::Module(m) => Some(m.clone()), _ => None }).collect();

    let location = modules.iter().find_map(|module| module.locations().first().cloned()).unwrap_or_else(SourceLocation::synthetic);
    let origin = modules.first().map(|module| module.origin.clone()).unwrap_or(ModuleOrigin::Source);
    let fused = ModuleMember::new(name, origin, location);

    let mut member_names: Vec<String> = Vec::new();
    for module in &modules {
        for candidate in module.public_names() {
            if !member_names.contains(&candidate) {
                member_names.push(candidate);
            }
        }
    }
    for member_name in &member_names {
        let mut merged: Option<Member> = None;
        for module in &modules {
            if let Some(member) = module.get_member(member_name) {
                merged = Some(match merged {
                    Some(existing) => fuse(member_name, existing, member),
                    None => member,
                });
            }
        }
        if let Some(member) = merged {
            fused.insert_raw(member_name.clone(), member);
        }
    }

    let mut children: Vec<Member> = Vec::new();
    for module in &modules {
        for child in module.children_modules() {
            if !children.iter().any(|existing| members_structurally_equal(existing, &child)) {
                children.push(child);
            }
        }
    }
    for child in children {
        let child_name = child.name().to_string();
        fused.insert_child_module(child_name, child);
    }

    Member::Module(Arc::new(fused))
}

/// §4.6: "Types pick the majority TypeId; member lookup returns the union of
/// non-null results." Ties fall to whichever tag appears first, since a true
/// tie has no well-defined majority.
fn fuse_classes(name: &str, elements: &[Member]) -> Member {
    let classes: Vec<Arc<ClassMember>> =
        elements.iter().filter_map(|element| match element { Member::Class(c) => Some(c.clone()), _ => None }).collect();

    let mut tag_counts: HashMap<BuiltinTypeId, usize> = HashMap::new();
    for class in &classes {
        if let Some(tag) = class.builtin_type_id {
            *tag_counts.entry(tag).or_insert(0) += 1;
        }
    }
    let majority_tag = tag_counts.into_iter().max_by_key(|(_, count)| *count).map(|(tag, _)| tag);

    let first = classes.first().expect("fuse_classes requires at least one Class element");
    let location = first.locations().first().cloned().unwrap_or_else(SourceLocation::synthetic);
    let mut fused = ClassMember::new(name, first.declaring_module.clone(), first.bases(), location);
    fused.builtin_type_id = majority_tag;
    fused.is_class_factory = classes.iter().any(|class| class.is_class_factory);

    let mut member_names: Vec<String> = Vec::new();
    for class in &classes {
        for candidate in class.public_names() {
            if !member_names.contains(&candidate) {
                member_names.push(candidate);
            }
        }
    }
    for member_name in &member_names {
        let mut merged: Option<Member> = None;
        for class in &classes {
            if let Some(member) = class.get_member(member_name) {
                merged = Some(match merged {
                    Some(existing) => fuse(member_name, existing, member),
                    None => member,
                });
            }
        }
        if let Some(member) = merged {
            fused.insert_member(member_name.clone(), member);
        }
    }

    Member::Class(Arc::new(fused))
}

impl MemberContainer for MultipleMember {
    /// §4.6: "Modules union child module lists and member enumerations;
    /// importing cascades to all elements" / "Types ... member lookup
    /// returns the union of non-null results" — both collapse, for direct
    /// lookup, to "first element that resolves the name wins", since a
    /// homogeneous union's elements agree on anything both define.
    fn get_member(&self, name: &str) -> Option<Member> {
        for element in &self.elements {
            let found = match element {
                Member::Module(module) => module.get_member(name),
                Member::Class(class) => class.get_member(name),
                Member::Multiple(multi) => multi.get_member(name),
                _ => None,
            };
            if found.is_some() {
                return found;
            }
        }
        None
    }

    fn public_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for element in &self.elements {
            let element_names = match element {
                Member::Module(module) => module.public_names(),
                Member::Class(class) => class.public_names(),
                Member::Multiple(multi) => multi.public_names(),
                _ => Vec::new(),
            };
            for name in element_names {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        names
    }
}

impl Locatable for MultipleMember {
    fn locations(&self) -> &[SourceLocation] {
        self.elements.first().map(Locatable::locations).unwrap_or(&[])
    }
}

impl HasQualifiedName for MultipleMember {
    fn qualified_name(&self) -> String {
        self.elements.first().map(HasQualifiedName::qualified_name).unwrap_or_else(|| self.name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_side_yields_the_other() {
        use crate::types::{builtin_id::BuiltinTypeId, constant::ConstantMember};

        let known = Member::Constant(ConstantMember::builtin("x", BuiltinTypeId::Int, SourceLocation::synthetic()));
        let unknown = Member::unknown("x", SourceLocation::synthetic());
        let fused = fuse("x", unknown, known);
        assert!(!fused.is_unknown());
    }

    #[test]
    fn two_distinct_members_produce_a_multiple() {
        use crate::types::{builtin_id::BuiltinTypeId, constant::ConstantMember, constant::ConstantType};

        let a = Member::Constant(ConstantMember::builtin("x", BuiltinTypeId::Int, SourceLocation::synthetic()));
        let b = Member::Constant(ConstantMember::new(
            "x",
            ConstantType::Builtin(BuiltinTypeId::Str),
            SourceLocation::synthetic(),
        ));
        let fused = fuse("x", a, b);
        match fused {
            Member::Multiple(multi) => assert_eq!(multi.elements().len(), 2),
            _ => panic!("expected MultipleMember"),
        }
    }

    /// Two distinct source locations, since `members_structurally_equal`
    /// (name + kind + locations) would otherwise treat two same-named,
    /// same-kind test fixtures as already-identical and skip the merge.
    fn loc_at(offset: u32) -> SourceLocation {
        let pos = ruff_text_size::TextSize::from(offset);
        SourceLocation::new(None, ruff_text_size::TextRange::new(pos, pos))
    }

    #[test]
    fn fusing_two_functions_unions_overloads_and_flags() {
        use crate::types::function::{FunctionMember, Overload};

        let a = Arc::new(FunctionMember::new("f", None, None, loc_at(1)));
        a.add_overload(Overload::new(Vec::new()));

        let b = Arc::new(FunctionMember::new("f", None, None, loc_at(2)));
        b.add_overload(Overload::new(Vec::new()));
        b.set_static();
        b.set_class_method();

        let fused = fuse("f", Member::Function(a), Member::Function(b));
        match fused {
            Member::Function(function) => {
                assert_eq!(function.overloads().len(), 2);
                assert!(function.is_static());
                assert!(function.is_class_method());
            }
            other => panic!("expected Function, got {other:?}"),
        }
    }

    #[test]
    fn fusing_two_modules_unions_members_and_children() {
        use crate::types::{constant::ConstantMember, module::{ModuleMember, ModuleOrigin}};

        let a = Arc::new(ModuleMember::new("pkg", ModuleOrigin::Source, loc_at(1)));
        a.insert_raw("x", Member::Constant(ConstantMember::builtin("x", crate::types::builtin_id::BuiltinTypeId::Int, loc_at(3))));
        let child_a = Arc::new(ModuleMember::new("pkg.sub_a", ModuleOrigin::Source, SourceLocation::synthetic()));
        a.insert_child_module("sub_a".to_string(), Member::Module(child_a));

        let b = Arc::new(ModuleMember::new("pkg", ModuleOrigin::Source, loc_at(2)));
        b.insert_raw("x", Member::Constant(ConstantMember::builtin("x", crate::types::builtin_id::BuiltinTypeId::Str, loc_at(4))));
        b.insert_raw("y", Member::Constant(ConstantMember::builtin("y", crate::types::builtin_id::BuiltinTypeId::Bool, SourceLocation::synthetic())));
        let child_b = Arc::new(ModuleMember::new("pkg.sub_b", ModuleOrigin::Source, SourceLocation::synthetic()));
        b.insert_child_module("sub_b".to_string(), Member::Module(child_b));

        let fused = fuse("pkg", Member::Module(a), Member::Module(b));
        match fused {
            Member::Module(module) => {
                assert!(module.get_member("y").is_some());
                match module.get_member("x") {
                    Some(Member::Multiple(multi)) => assert_eq!(multi.elements().len(), 2),
                    other => panic!("expected overlapping member x to fuse into a Multiple, got {other:?}"),
                }
                assert_eq!(module.children_modules().len(), 2);
            }
            other => panic!("expected Module, got {other:?}"),
        }
    }

    #[test]
    fn fusing_two_classes_picks_majority_builtin_tag_and_unions_members() {
        use crate::types::{builtin_id::BuiltinTypeId, class::ClassMember, constant::ConstantMember};

        let mut a = ClassMember::new("C", None, Vec::new(), loc_at(1));
        a.builtin_type_id = Some(BuiltinTypeId::Int);
        let a = Arc::new(a);
        a.insert_member(
            "x".to_string(),
            Member::Constant(ConstantMember::builtin("x", BuiltinTypeId::Int, SourceLocation::synthetic())),
        );

        let b = Arc::new(ClassMember::new("C", None, Vec::new(), loc_at(2)));
        b.insert_member(
            "y".to_string(),
            Member::Constant(ConstantMember::builtin("y", BuiltinTypeId::Str, SourceLocation::synthetic())),
        );

        let fused = fuse("C", Member::Class(a), Member::Class(b));
        match fused {
            Member::Class(class) => {
                assert_eq!(class.builtin_type_id, Some(BuiltinTypeId::Int));
                assert!(class.get_member("x").is_some());
                assert!(class.get_member("y").is_some());
            }
            other => panic!("expected Class, got {other:?}"),
        }
    }
}
