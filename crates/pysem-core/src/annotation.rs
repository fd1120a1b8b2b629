//! Annotation evaluator (C4, §4.3): converts a parsed annotation
//! expression into zero or more symbolic types.

use ruff_python_ast::{self as ast, Expr};

use crate::{
    diagnostics::{DiagnosticEvent, Diagnostics},
    expr_eval,
    location::SourceLocation,
    member::Member,
    scope::{LookupContext, LookupOptions},
    types::{
        builtin_id::BuiltinTypeId,
        class::ClassMember,
        wrappers::{IterableMember, IteratorMember, LookupMember, SequenceMember},
    },
};

/// `Finalize(t)` (§4.3): "strip Module wrappers; resolve a Name placeholder
/// by looking it up in scopes (Global + Builtins)."
pub fn finalize(scope: &LookupContext, diagnostics: &mut dyn Diagnostics, member: Member) -> Member {
    match member {
        Member::Module(_) => {
            diagnostics.emit(DiagnosticEvent::AnnotationStripped);
            Member::unknown("<module-annotation>", SourceLocation::synthetic())
        }
        Member::Unknown(unknown) => lookup_name(scope, &unknown.name).unwrap_or(Member::Unknown(unknown)),
        other => other,
    }
}

/// `LookupName(n)` (§4.3): `lookup_name` with Global+Builtins; wraps a
/// resolved module as a Module-shaped type rather than returning the module
/// value directly, so downstream consumers don't mistake a type annotation
/// for an importable namespace.
#[must_use]
pub fn lookup_name(scope: &LookupContext, name: &str) -> Option<Member> {
    let options = LookupOptions { local: false, nonlocal: false, global: true, builtins: true, suppress_builtins: false };
    scope.lookup_name(name, options)
}

/// `MakeUnion`/`GetUnionTypes` (§4.3): a union exposes its members for
/// downstream fusion; modelled directly as `MultipleMember` rather than a
/// distinct union type, since the fusion rules in §4.6 already define
/// exactly this "exposes its members" behaviour.
#[must_use]
pub fn make_union(name: &str, members: Vec<Member>) -> Member {
    let mut iter = members.into_iter();
    let Some(first) = iter.next() else {
        return Member::unknown(name, SourceLocation::synthetic());
    };
    iter.fold(first, |acc, next| crate::types::multiple::fuse(name, acc, next))
}

#[must_use]
pub fn union_types(member: &Member) -> Vec<Member> {
    match member {
        Member::Multiple(multi) => multi.elements().to_vec(),
        other => vec![other.clone()],
    }
}

fn is_string_like(member: &Member) -> bool {
    matches!(
        member,
        Member::Constant(constant)
            if constant.ty == crate::types::constant::ConstantType::Builtin(BuiltinTypeId::Str)
                || constant.ty == crate::types::constant::ConstantType::Builtin(BuiltinTypeId::Bytes)
    )
}

/// `MakeGeneric(base, args)` (§4.3): recognised `typing` forms.
#[must_use]
pub fn make_generic(diagnostics: &mut dyn Diagnostics, base_name: &str, args: Vec<Member>) -> Member {
    match base_name {
        "Tuple" | "Sequence" => Member::Sequence(SequenceMember::new(base_name, BuiltinTypeId::Tuple, args)),
        "List" => Member::Sequence(SequenceMember::new(base_name, BuiltinTypeId::List, args)),
        "Set" => Member::Sequence(SequenceMember::new(base_name, BuiltinTypeId::Set, args)),
        "Iterable" => {
            let element = args.into_iter().next().unwrap_or_else(|| Member::unknown("T", SourceLocation::synthetic()));
            let string_specialised = is_string_like(&element);
            Member::Iterable(IterableMember { name: base_name.to_string(), element_type: Box::new(element), string_specialised })
        }
        "Iterator" => {
            let element = args.into_iter().next().unwrap_or_else(|| Member::unknown("T", SourceLocation::synthetic()));
            let string_specialised = is_string_like(&element);
            Member::Iterator(IteratorMember { name: base_name.to_string(), element_type: Box::new(element), string_specialised })
        }
        "Dict" | "Mapping" => {
            let mut iter = args.into_iter();
            let key = iter.next().unwrap_or_else(|| Member::unknown("K", SourceLocation::synthetic()));
            let value = iter.next().unwrap_or_else(|| Member::unknown("V", SourceLocation::synthetic()));
            Member::Lookup(LookupMember::new(base_name, key, value))
        }
        "Optional" => args.into_iter().next().unwrap_or_else(|| Member::unknown("Optional", SourceLocation::synthetic())),
        "Union" => make_union("Union", args),
        "ByteString" => Member::unknown("bytes", SourceLocation::synthetic()),
        "Type" => match args.into_iter().next() {
            Some(Member::Class(class)) => Member::Class(ClassMember::as_factory(&class)),
            Some(other) => other,
            None => Member::unknown("Type", SourceLocation::synthetic()),
        },
        "Any" => args.into_iter().next().unwrap_or_else(|| Member::unknown("Any", SourceLocation::synthetic())),
        _ => {
            diagnostics.emit(DiagnosticEvent::UnrecognisedGeneric { name: base_name.to_string() });
            args.into_iter().next().unwrap_or_else(|| Member::unknown(base_name, SourceLocation::synthetic()))
        }
    }
}

/// Evaluates a full annotation AST expression end to end: resolves names,
/// recognises `typing` subscript forms, and finalises the result.
#[must_use]
pub fn evaluate_annotation(ctx: &expr_eval::EvalContext, diagnostics: &mut dyn Diagnostics, expr: &Expr) -> Member {
    match expr {
        Expr::Subscript(ast::ExprSubscript { value, slice, .. }) => {
            let base_name = match value.as_ref() {
                Expr::Name(ast::ExprName { id, .. }) => id.as_str().to_string(),
                Expr::Attribute(ast::ExprAttribute { attr, .. }) => attr.as_str().to_string(),
                _ => return finalize(ctx.scope, diagnostics, expr_eval::evaluate(ctx, expr, LookupOptions::ALL)),
            };
            let args: Vec<Member> = match slice.as_ref() {
                Expr::Tuple(ast::ExprTuple { elts, .. }) => {
                    elts.iter().map(|elt| evaluate_annotation(ctx, &mut *diagnostics, elt)).collect()
                }
                other => vec![evaluate_annotation(ctx, &mut *diagnostics, other)],
            };
            make_generic(diagnostics, &base_name, args)
        }
        Expr::Name(ast::ExprName { id, .. }) => {
            finalize(ctx.scope, diagnostics, lookup_name(ctx.scope, id.as_str()).unwrap_or_else(|| Member::unknown(id.as_str(), SourceLocation::synthetic())))
        }
        other => finalize(ctx.scope, diagnostics, expr_eval::evaluate(ctx, other, LookupOptions::ALL)),
    }
}
