//! Expression → member evaluation (C2 continued, §4.1's "Expression →
//! member evaluation" bullet list). Grounded on the teacher's
//! `Parser::parse_statement_impl`/`parse_expression` match-on-`ruff_python_ast::Expr`
//! shape (`parse.rs`), over symbolic members instead of the VM's `Expr` IR.

use ruff_python_ast::{self as ast, Expr};
use ruff_text_size::Ranged;

use crate::{
    location::SourceLocation,
    member::{Member, MemberContainer},
    scope::{LookupContext, LookupOptions},
    types::{
        builtin_id::BuiltinTypeId,
        class::ClassMember,
        constant::{ConstantMember, ConstantType},
        wrappers::SequenceMember,
    },
};

/// Evaluation environment threaded through every call: the lookup context,
/// the current module's own name (for the Name-resolves-to-self-module
/// special case), the source path (for locations) and the active Python
/// version (for the `bytes[i]` / big-integer-literal Py2/Py3 split).
pub struct EvalContext<'a> {
    pub scope: &'a LookupContext,
    pub module_name: &'a str,
    pub path: Option<&'a std::path::Path>,
    pub is_py2: bool,
}

impl EvalContext<'_> {
    fn location(&self, range: ruff_text_size::TextRange) -> SourceLocation {
        SourceLocation::new(self.path.map(std::path::Path::to_path_buf), range)
    }

    fn unknown(&self, name: &str, range: ruff_text_size::TextRange) -> Member {
        Member::unknown(name, self.location(range))
    }

    fn constant(&self, name: &str, id: BuiltinTypeId, range: ruff_text_size::TextRange) -> Member {
        Member::Constant(ConstantMember::builtin(name, id, self.location(range)))
    }
}

/// §4.1 "Expression → member evaluation".
pub fn evaluate(ctx: &EvalContext, expr: &Expr, options: LookupOptions) -> Member {
    match expr {
        Expr::Name(ast::ExprName { id, range, .. }) => {
            if id.as_str() == ctx.module_name {
                if let Some(module) = ctx.scope.lookup_name(ctx.module_name, LookupOptions::ALL) {
                    return module;
                }
            }
            ctx.scope.lookup_name(id.as_str(), options).unwrap_or_else(|| ctx.unknown(id.as_str(), *range))
        }
        Expr::Attribute(ast::ExprAttribute { value, attr, range, .. }) => {
            let target = evaluate(ctx, value, options);
            match &target {
                Member::Multiple(multi) => multi.first_non_null().unwrap_or_else(|| ctx.unknown(attr.as_str(), *range)),
                _ => {
                    let found = match &target {
                        Member::Module(module) => module.get_member(attr.as_str()),
                        Member::Class(class) => class.get_member(attr.as_str()),
                        _ => None,
                    };
                    found.map(|member| member.resolve_for_access()).unwrap_or_else(|| ctx.unknown(attr.as_str(), *range))
                }
            }
        }
        Expr::Call(ast::ExprCall { func, arguments, range, .. }) => {
            let target = evaluate(ctx, func, options);
            // §4.1 Call rule: `type(x)` with exactly one argument yields the
            // type of `x`, ahead of the general class/function rules below.
            if matches!(&target, Member::Class(class) if class.name() == "type") && arguments.args.len() == 1 {
                let argument = evaluate(ctx, &arguments.args[0], options);
                return type_of(ctx, &argument, *range);
            }
            match &target {
                Member::Class(class) => Member::Constant(ConstantMember::new(
                    class.name(),
                    ConstantType::Class(class.qualified_name()),
                    ctx.location(*range),
                )),
                Member::Function(function) => {
                    // The deferred body walker (§4.5) fills this in lazily,
                    // draining at module-completion time or on demand via
                    // `DeferredWalkerSet::process_function`; here we surface
                    // whatever return type is already known (an explicit
                    // annotation, or a deferred walk that already ran) and
                    // fall back to Unknown only when that's genuinely absent.
                    function
                        .overloads()
                        .iter()
                        .find_map(|overload| overload.return_types())
                        .and_then(|types| types.into_iter().next())
                        .unwrap_or_else(|| ctx.unknown("<call>", *range))
                }
                Member::Property(property) => property.return_member(),
                _ => ctx.unknown("<call>", *range),
            }
        }
        Expr::Subscript(ast::ExprSubscript { value, range, .. }) => {
            let target = evaluate(ctx, value, options);
            match &target {
                Member::Class(class) if class.qualified_name().starts_with("typing.") => target.clone(),
                Member::Constant(constant) if constant.ty == ConstantType::Builtin(BuiltinTypeId::Bytes) => {
                    if ctx.is_py2 {
                        ctx.constant("<subscript>", BuiltinTypeId::Bytes, *range)
                    } else {
                        ctx.constant("<subscript>", BuiltinTypeId::Int, *range)
                    }
                }
                Member::Constant(constant) if constant.ty == ConstantType::Builtin(BuiltinTypeId::Str) => target.clone(),
                Member::Class(_) => target.clone(),
                _ => ctx.unknown("<subscript>", *range),
            }
        }
        Expr::UnaryOp(ast::ExprUnaryOp { operand, range, .. }) => {
            let _ = range;
            evaluate(ctx, operand, options)
        }
        Expr::BoolOp(ast::ExprBoolOp { range, .. }) => ctx.constant("<boolop>", BuiltinTypeId::Bool, *range),
        Expr::Compare(ast::ExprCompare { range, .. }) => ctx.constant("<compare>", BuiltinTypeId::Bool, *range),
        Expr::BinOp(ast::ExprBinOp { left, right, range, .. }) => {
            let left_type = evaluate(ctx, left, options);
            if !left_type.is_unknown() {
                left_type
            } else {
                evaluate(ctx, right, options)
            }
        }
        Expr::If(ast::ExprIf { body, orelse, range, .. }) => {
            let _ = range;
            let then_branch = evaluate(ctx, body, options);
            let else_branch = evaluate(ctx, orelse, options);
            crate::types::multiple::fuse("<conditional>", then_branch, else_branch)
        }
        Expr::NoneLiteral(ast::ExprNoneLiteral { range }) => ctx.constant("None", BuiltinTypeId::NoneType, *range),
        Expr::BooleanLiteral(ast::ExprBooleanLiteral { range, .. }) => ctx.constant("<bool>", BuiltinTypeId::Bool, *range),
        Expr::NumberLiteral(ast::ExprNumberLiteral { value, range, .. }) => match value {
            ast::Number::Int(_) => ctx.constant("<int>", BuiltinTypeId::Int, *range),
            ast::Number::Float(_) => ctx.constant("<float>", BuiltinTypeId::Float, *range),
            ast::Number::Complex { .. } => ctx.constant("<complex>", BuiltinTypeId::Complex, *range),
        },
        Expr::BytesLiteral(ast::ExprBytesLiteral { range, .. }) => ctx.constant("<bytes>", BuiltinTypeId::Bytes, *range),
        Expr::StringLiteral(ast::ExprStringLiteral { value, range, .. }) => Member::Constant(ConstantMember::new(
            "<str>",
            ConstantType::StringLiteral(value.to_str().to_string()),
            ctx.location(*range),
        )),
        Expr::FString(ast::ExprFString { range, .. }) => ctx.constant("<fstring>", BuiltinTypeId::Str, *range),
        Expr::EllipsisLiteral(ast::ExprEllipsisLiteral { range }) => ctx.constant("...", BuiltinTypeId::Ellipsis, *range),
        Expr::List(ast::ExprList { range, .. }) | Expr::ListComp(ast::ExprListComp { range, .. }) => {
            ctx.constant("<list>", BuiltinTypeId::List, *range)
        }
        Expr::Dict(ast::ExprDict { range, .. }) | Expr::DictComp(ast::ExprDictComp { range, .. }) => {
            ctx.constant("<dict>", BuiltinTypeId::Dict, *range)
        }
        Expr::Set(ast::ExprSet { range, .. }) | Expr::SetComp(ast::ExprSetComp { range, .. }) => {
            ctx.constant("<set>", BuiltinTypeId::Set, *range)
        }
        Expr::Tuple(ast::ExprTuple { elts, range, .. }) => {
            let element_types = elts.iter().map(|elt| evaluate(ctx, elt, options)).collect();
            Member::Sequence(SequenceMember::new("<tuple>", BuiltinTypeId::Tuple, element_types))
        }
        Expr::Lambda(ast::ExprLambda { range, .. }) => ctx.constant("<lambda>", BuiltinTypeId::Function, *range),
        other => ctx.unknown("<expr>", other.range()),
    }
}

/// §4.1's `type(x)` rule: the type of a class is itself as a class factory
/// (`Type[T]`, §3); the type of a constant with a known builtin tag is that
/// builtin's class, looked up by name in scope. Anything else is Unknown —
/// this is a symbolic approximation, not exact runtime `type()` semantics.
fn type_of(ctx: &EvalContext, member: &Member, range: ruff_text_size::TextRange) -> Member {
    match member {
        Member::Class(class) => Member::Class(ClassMember::as_factory(class)),
        Member::Constant(constant) => match &constant.ty {
            ConstantType::Builtin(builtin) => builtin
                .python_name()
                .and_then(|name| ctx.scope.lookup_name(name, LookupOptions::ALL))
                .map(|found| match found {
                    Member::Class(class) => Member::Class(ClassMember::as_factory(&class)),
                    other => other,
                })
                .unwrap_or_else(|| ctx.unknown("<type>", range)),
            _ => ctx.unknown("<type>", range),
        },
        _ => ctx.unknown("<type>", range),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::SourceLocation;
    use crate::types::class::ClassMember;
    use crate::types::function::{FunctionMember, Overload};
    use std::sync::Arc;

    fn ctx<'a>(scope: &'a LookupContext, module_name: &'a str) -> EvalContext<'a> {
        EvalContext { scope, module_name, path: None, is_py2: false }
    }

    fn parse_expr(source: &str) -> Expr {
        let parsed = ruff_python_parser::parse_module(source).expect("valid test source");
        let mut body = parsed.into_syntax().body;
        match body.remove(0) {
            ast::Stmt::Expr(ast::StmtExpr { value, .. }) => *value,
            other => panic!("expected an expression statement, got {other:?}"),
        }
    }

    #[test]
    fn call_on_function_with_known_return_type_yields_that_type() {
        let scope = LookupContext::new(None);
        let class = Arc::new(ClassMember::new("C", None, Vec::new(), SourceLocation::synthetic()));
        let function = Arc::new(FunctionMember::new("f", None, None, SourceLocation::synthetic()));
        let overload = function.add_overload(Overload::new(Vec::new()));
        overload.finalize_return_types(vec![Member::Class(class)]);
        scope.set_in_scope("f", Some(Member::Function(function)), false, None);

        let evaluation_ctx = ctx(&scope, "m");
        let expr = parse_expr("f()");
        let result = evaluate(&evaluation_ctx, &expr, LookupOptions::ALL);
        match result {
            Member::Class(resolved) => assert_eq!(resolved.name(), "C"),
            other => panic!("expected Class, got {other:?}"),
        }
    }

    #[test]
    fn call_on_function_with_unresolved_return_type_yields_unknown() {
        let scope = LookupContext::new(None);
        let function = Arc::new(FunctionMember::new("f", None, None, SourceLocation::synthetic()));
        function.add_overload(Overload::new(Vec::new()));
        scope.set_in_scope("f", Some(Member::Function(function)), false, None);

        let evaluation_ctx = ctx(&scope, "m");
        let expr = parse_expr("f()");
        let result = evaluate(&evaluation_ctx, &expr, LookupOptions::ALL);
        assert!(result.is_unknown());
    }

    #[test]
    fn type_of_class_yields_a_class_factory() {
        let scope = LookupContext::new(None);
        let evaluation_ctx = ctx(&scope, "m");
        let class = Arc::new(ClassMember::new("C", None, Vec::new(), SourceLocation::synthetic()));
        let result = type_of(&evaluation_ctx, &Member::Class(class), ruff_text_size::TextRange::default());
        match result {
            Member::Class(factory) => assert!(factory.is_class_factory),
            other => panic!("expected Class, got {other:?}"),
        }
    }

    #[test]
    fn type_of_unknown_member_falls_back_to_unknown() {
        let scope = LookupContext::new(None);
        let evaluation_ctx = ctx(&scope, "m");
        let unknown = Member::unknown("x", SourceLocation::synthetic());
        let result = type_of(&evaluation_ctx, &unknown, ruff_text_size::TextRange::default());
        assert!(result.is_unknown());
    }

    #[test]
    fn type_builtin_call_yields_the_argument_type() {
        let scope = LookupContext::new(None);
        let type_class = Arc::new(ClassMember::new("type", None, Vec::new(), SourceLocation::synthetic()));
        let int_class = Arc::new(ClassMember::new("int", None, Vec::new(), SourceLocation::synthetic()));
        scope.set_in_scope("type", Some(Member::Class(type_class)), false, None);
        scope.set_in_scope("int", Some(Member::Class(int_class)), false, None);

        let evaluation_ctx = ctx(&scope, "m");
        let expr = parse_expr("type(1)");
        let result = evaluate(&evaluation_ctx, &expr, LookupOptions::ALL);
        match result {
            Member::Class(resolved) => {
                assert_eq!(resolved.name(), "int");
                assert!(resolved.is_class_factory);
            }
            other => panic!("expected Class, got {other:?}"),
        }
    }
}
