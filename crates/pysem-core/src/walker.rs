//! The AST walker (C3, §4.2): a single pass per module — pre-pass
//! collection, imports, the `sys.version_info` guard, assignments, class
//! and function definitions, and completion.

use std::sync::{Arc, Weak};

use ruff_python_ast::{self as ast, Expr, Stmt};
use ruff_text_size::Ranged;

use crate::{
    annotation,
    deferred::DeferredWalkerSet,
    diagnostics::{DiagnosticEvent, Diagnostics},
    expr_eval::{self, EvalContext},
    import_provider::{ImportResolution, ModuleProvider},
    location::{HasQualifiedName, Locatable, SourceLocation},
    member::{Member, MemberContainer},
    scope::{LookupContext, LookupOptions},
    types::{
        class::ClassMember,
        function::{FunctionMember, Overload, Parameter, ParameterKind, PropertyMember},
        module::ModuleMember,
    },
    version::{PythonVersion, VersionCmpOp},
};

pub struct WalkerState<'a> {
    pub module: Arc<ModuleMember>,
    pub scope: LookupContext,
    pub deferred: &'a DeferredWalkerSet,
    pub provider: &'a dyn ModuleProvider,
    pub diagnostics: &'a mut dyn Diagnostics,
    pub python_version: PythonVersion,
    pub path: Option<std::path::PathBuf>,
    /// Separate per-module scope for `from typing import ...` bindings
    /// (§4.2: "a separate per-module scope that a later cleanup step may
    /// hide"). Populated alongside the real module table, never searched by
    /// ordinary lookups.
    pub typing_scope: std::sync::Mutex<indexmap::IndexMap<String, Member>>,
    pub is_stub_file: bool,
}

impl<'a> WalkerState<'a> {
    fn eval_ctx(&self) -> EvalContext<'_> {
        EvalContext {
            scope: &self.scope,
            module_name: self.module.name(),
            path: self.path.as_deref(),
            is_py2: self.python_version.is_py2(),
        }
    }

    fn location(&self, range: ruff_text_size::TextRange) -> SourceLocation {
        SourceLocation::new(self.path.clone(), range)
    }
}

/// Builds an [`EvalContext`] borrowing only the scope/module/path/version
/// fields of `state`, expanded inline so the borrow checker sees disjoint
/// field projections rather than one opaque `&WalkerState` borrow. Needed
/// wherever a call also takes `&mut state.diagnostics` in the same
/// expression; `WalkerState::eval_ctx` is fine everywhere else.
macro_rules! eval_ctx_fields {
    ($state:expr) => {
        EvalContext {
            scope: &$state.scope,
            module_name: $state.module.name(),
            path: $state.path.as_deref(),
            is_py2: $state.python_version.is_py2(),
        }
    };
}

/// Runs the full walk over one module's top-level statements (§4.2).
pub fn walk_module(state: &mut WalkerState, body: &[Stmt]) {
    pre_pass(state, body);
    for stmt in body {
        walk_statement(state, stmt);
    }
    complete(state);
}

/// **Pre-pass** (§4.2): collect top-level function/class definitions up
/// front so forward references resolve, and alias bare `lhs = rhs` name
/// copies.
fn pre_pass(state: &mut WalkerState, body: &[Stmt]) {
    for stmt in body {
        match stmt {
            Stmt::FunctionDef(function) => {
                if state.module.get_member(function.name.as_str()).is_none() {
                    let placeholder = Arc::new(FunctionMember::new(
                        function.name.as_str(),
                        Some(Arc::downgrade(&state.module)),
                        None,
                        state.location(function.range),
                    ));
                    state.module.insert_raw(function.name.as_str(), Member::Function(placeholder));
                }
            }
            Stmt::ClassDef(class) => {
                if state.module.get_member(class.name.as_str()).is_none() {
                    let placeholder = Arc::new(ClassMember::new(
                        class.name.as_str(),
                        Some(Arc::downgrade(&state.module)),
                        Vec::new(),
                        state.location(class.range),
                    ));
                    state.module.insert_raw(class.name.as_str(), Member::Class(placeholder));
                }
            }
            Stmt::Assign(ast::StmtAssign { targets, value, .. }) => {
                if let (Some(Expr::Name(target)), Expr::Name(source)) = (targets.first(), value.as_ref()) {
                    if let Some(existing) = state.module.get_member(source.id.as_str()) {
                        state.module.insert_raw(target.id.as_str(), existing);
                    }
                }
            }
            _ => {}
        }
    }
}

fn walk_statement(state: &mut WalkerState, stmt: &Stmt) {
    match stmt {
        Stmt::Import(import) => walk_import(state, import),
        Stmt::ImportFrom(import_from) => walk_import_from(state, import_from),
        Stmt::If(if_stmt) => walk_version_guard_or_plain_if(state, if_stmt),
        Stmt::Assign(assign) => walk_assign(state, assign),
        Stmt::AnnAssign(ann_assign) => walk_ann_assign(state, ann_assign),
        Stmt::ClassDef(class) => walk_class_def(state, class),
        Stmt::FunctionDef(function) => walk_function_def(state, function, None),
        _ => {}
    }
}

fn walk_import(state: &mut WalkerState, import: &ast::StmtImport) {
    for alias in &import.names {
        let dotted = alias.name.as_str();
        let binding_name = alias
            .asname
            .as_ref()
            .map(|name| name.as_str().to_string())
            .unwrap_or_else(|| dotted.split('.').next().unwrap_or(dotted).to_string());
        let location = state.location(alias.range);
        let member = match state.provider.resolve_dotted_import(dotted, state.module.name()) {
            ImportResolution::SelfImport => Member::Module(state.module.clone()),
            ImportResolution::NestedLazy(module) => module,
            ImportResolution::PossibleModule => {
                state.diagnostics.emit(DiagnosticEvent::PossibleModuleImport { module: dotted.to_string() });
                Member::unknown(&binding_name, location)
            }
            ImportResolution::Unknown => {
                state.diagnostics.emit(DiagnosticEvent::UnresolvedImport { module: dotted.to_string() });
                Member::unknown(&binding_name, location)
            }
        };
        state.scope.set_in_scope(&binding_name, Some(member), true, None);
    }
}

fn walk_import_from(state: &mut WalkerState, import_from: &ast::StmtImportFrom) {
    let Some(module_name) = import_from.module.as_ref().map(|m| m.as_str()) else {
        return;
    };
    let location = state.location(import_from.range);

    if module_name == "__future__" {
        return;
    }

    if module_name == "typing" {
        if let Some(typing_module) = state.provider.typing_shim_module() {
            for alias in &import_from.names {
                if alias.name.as_str() == "*" {
                    if let Member::Module(typing) = &typing_module {
                        for name in typing.public_names() {
                            if let Some(member) = typing.get_member(&name) {
                                state.typing_scope.lock().unwrap().insert(name, member);
                            }
                        }
                    }
                    continue;
                }
                let binding = alias.asname.as_ref().map_or(alias.name.as_str(), |n| n.as_str());
                let resolved = match &typing_module {
                    Member::Module(typing) => {
                        typing.get_member(alias.name.as_str()).unwrap_or_else(|| Member::unknown(binding, location.clone()))
                    }
                    _ => Member::unknown(binding, location.clone()),
                };
                state.typing_scope.lock().unwrap().insert(binding.to_string(), resolved);
            }
        }
        return;
    }

    if module_name == "self" {
        for alias in &import_from.names {
            let Some(asname) = alias.asname.as_ref() else { continue };
            if let Some(existing) = state.module.get_member(alias.name.as_str()) {
                state.scope.set_in_scope(asname.as_str(), Some(existing), true, None);
            }
        }
        return;
    }

    if import_from.names.iter().any(|alias| alias.name.as_str() == "*") {
        if let Some(members) = state.provider.materialise_module_members(module_name) {
            for (name, member) in members {
                state.scope.set_in_scope(&name, Some(member), true, None);
            }
        } else {
            state.diagnostics.emit(DiagnosticEvent::StarImportOnUnresolvedModule { module: module_name.to_string() });
        }
        return;
    }

    if let Some(children) = state.provider.namespace_package_children(module_name) {
        for alias in &import_from.names {
            let binding = alias.asname.as_ref().map_or(alias.name.as_str(), |n| n.as_str());
            let member = if children.iter().any(|child| child == alias.name.as_str()) {
                match state.provider.resolve_dotted_import(&format!("{module_name}.{}", alias.name.as_str()), state.module.name()) {
                    ImportResolution::NestedLazy(module) => module,
                    _ => Member::unknown(binding, location.clone()),
                }
            } else {
                Member::unknown(binding, location.clone())
            };
            state.scope.set_in_scope(binding, Some(member), true, None);
        }
        return;
    }

    for alias in &import_from.names {
        let binding = alias.asname.as_ref().map_or(alias.name.as_str(), |n| n.as_str());
        let member = match state.provider.resolve_dotted_import(&format!("{module_name}.{}", alias.name.as_str()), state.module.name()) {
            ImportResolution::NestedLazy(module) => module,
            ImportResolution::SelfImport => Member::Module(state.module.clone()),
            _ => {
                state.diagnostics.emit(DiagnosticEvent::UnresolvedImport { module: format!("{module_name}.{}", alias.name.as_str()) });
                Member::unknown(binding, location.clone())
            }
        };
        state.scope.set_in_scope(binding, Some(member), true, None);
    }
}

/// §4.2: `if sys.version_info <op> (M, N): ...`. Recognises the comparison
/// and walks only the matching branch; falls back to walking all branches
/// when the guard isn't recognised.
fn walk_version_guard_or_plain_if(state: &mut WalkerState, if_stmt: &ast::StmtIf) {
    if let Some((op, version)) = recognise_version_guard(&if_stmt.test) {
        if op.evaluate(state.python_version, version) {
            for stmt in &if_stmt.body {
                walk_statement(state, stmt);
            }
        } else {
            for clause in &if_stmt.elif_else_clauses {
                for stmt in &clause.body {
                    walk_statement(state, stmt);
                }
            }
        }
        return;
    }

    for stmt in &if_stmt.body {
        walk_statement(state, stmt);
    }
    for clause in &if_stmt.elif_else_clauses {
        for stmt in &clause.body {
            walk_statement(state, stmt);
        }
    }
}

fn recognise_version_guard(test: &Expr) -> Option<(VersionCmpOp, PythonVersion)> {
    let Expr::Compare(compare) = test else { return None };
    let Expr::Attribute(ast::ExprAttribute { value, attr, .. }) = compare.left.as_ref() else { return None };
    let Expr::Name(ast::ExprName { id, .. }) = value.as_ref() else { return None };
    if id.as_str() != "sys" || attr.as_str() != "version_info" {
        return None;
    }
    let [op] = compare.ops.as_ref() else { return None };
    let op = match op {
        ast::CmpOp::Lt => VersionCmpOp::Lt,
        ast::CmpOp::LtE => VersionCmpOp::LtE,
        ast::CmpOp::Gt => VersionCmpOp::Gt,
        ast::CmpOp::GtE => VersionCmpOp::GtE,
        ast::CmpOp::Eq => VersionCmpOp::Eq,
        _ => return None,
    };
    let [rhs] = compare.comparators.as_ref() else { return None };
    let Expr::Tuple(ast::ExprTuple { elts, .. }) = rhs else { return None };
    let mut numbers = elts.iter().filter_map(|elt| match elt {
        Expr::NumberLiteral(ast::ExprNumberLiteral { value: ast::Number::Int(n), .. }) => n.to_string().parse::<u8>().ok(),
        _ => None,
    });
    let major = numbers.next()?;
    let minor = numbers.next().unwrap_or(0);
    Some((op, PythonVersion { major, minor }))
}

fn walk_assign(state: &mut WalkerState, assign: &ast::StmtAssign) {
    let rhs_member = expr_eval::evaluate(&state.eval_ctx(), &assign.value, LookupOptions::ALL);
    let rhs_is_ellipsis = matches!(assign.value.as_ref(), Expr::EllipsisLiteral(_));
    for target in &assign.targets {
        if let Expr::Name(name) = target {
            let value = if rhs_is_ellipsis { Member::unknown(name.id.as_str(), state.location(name.range)) } else { rhs_member.clone() };
            state.scope.set_in_scope(name.id.as_str(), Some(value), true, None);
        }
    }
}

fn walk_ann_assign(state: &mut WalkerState, ann_assign: &ast::StmtAnnAssign) {
    let Expr::Name(name) = ann_assign.target.as_ref() else { return };
    let location = state.location(name.range);
    let annotation_type = annotation::evaluate_annotation(&eval_ctx_fields!(state), &mut *state.diagnostics, &ann_assign.annotation);
    state.scope.set_in_scope(name.id.as_str(), Some(Member::Constant(crate::types::constant::ConstantMember::new(
        name.id.as_str(),
        match &annotation_type {
            Member::Constant(c) => c.ty.clone(),
            _ => crate::types::constant::ConstantType::Class(annotation_type.qualified_name_fallback()),
        },
        location,
    ))), true, None);

    if let Some(value) = &ann_assign.value {
        let rhs = expr_eval::evaluate(&state.eval_ctx(), value, LookupOptions::ALL);
        if !rhs.is_unknown() {
            state.scope.set_in_scope(name.id.as_str(), Some(rhs), true, None);
        }
    }
}

/// §4.2 "Class definition". The pre-pass already placed a same-named class
/// at the same source position when one exists; reuse it rather than
/// creating a duplicate.
fn walk_class_def(state: &mut WalkerState, class: &ast::StmtClassDef) {
    let existing = match state.module.get_member(class.name.as_str()) {
        Some(Member::Class(existing)) if existing.locations().first().map(|loc| loc.range.start()) == Some(class.range.start()) => {
            Some(existing)
        }
        _ => None,
    };

    let mut bases: Vec<Member> = Vec::new();
    if let Some(arguments) = class.arguments.as_ref() {
        for base_expr in &arguments.args {
            bases.push(annotation::evaluate_annotation(&eval_ctx_fields!(state), &mut *state.diagnostics, base_expr));
        }
    }

    let class_member = existing.unwrap_or_else(|| {
        Arc::new(ClassMember::new(
            class.name.as_str(),
            Some(Arc::downgrade(&state.module)),
            bases.clone(),
            state.location(class.range),
        ))
    });
    // The pre-pass placeholder (if that's what `existing` is) was installed
    // with empty bases; write the real ones in before linearising.
    class_member.set_bases(bases);

    let mro = crate::mro::compute_mro(&class_member);
    let _ = mro;

    state.scope.push_scope(None);
    state.scope.set_in_scope("__class__", Some(Member::Class(class_member.clone())), false, None);
    for stmt in &class.body {
        walk_statement(state, stmt);
    }
    let body_scope = state.scope.pop_scope();
    match body_scope {
        Some(table) => {
            for (name, member) in table.lock().unwrap().iter() {
                class_member.insert_member(name.clone(), member.clone());
            }
        }
        None => {
            // The scope we just pushed is gone; some other statement in this
            // class body popped more scopes than it pushed.
            let _bug = crate::invariant::check_state(
                false,
                "walk_class_def",
                format!("scope stack empty after walking class {}", class.name),
            );
        }
    }
    state.scope.set_in_scope(class.name.as_str(), Some(Member::Class(class_member.clone())), false, None);
    state.module.insert_raw(class.name.as_str(), Member::Class(class_member));
}

/// §4.2 "Function definition (non-lambda)".
fn walk_function_def(state: &mut WalkerState, function: &ast::StmtFunctionDef, declaring_class: Option<&Weak<ClassMember>>) {
    let name = function.name.as_str();

    let decorators: Vec<&Expr> = function.decorator_list.iter().map(|d| &d.expression).collect();

    if decorators.iter().any(|decorator| is_property_decorator(decorator)) {
        let overload = build_overload(state, function);
        let property = Arc::new(PropertyMember::new(name, overload, state.location(function.range), declaring_class.cloned()));
        state.scope.set_in_scope(name, Some(Member::Property(property)), false, None);
        return;
    }

    if let Some(property_name) = setter_target(&decorators) {
        if let Some(Member::Property(property)) = state.scope.get_in_scope(property_name, None) {
            property.mark_settable();
            return;
        }
    }

    let function_member = match state.scope.get_in_scope(name, None) {
        Some(Member::Function(existing)) => existing,
        _ => Arc::new(FunctionMember::new(
            name,
            Some(Arc::downgrade(&state.module)),
            declaring_class.cloned(),
            state.location(function.range),
        )),
    };

    if decorators.iter().any(|decorator| is_named(decorator, "classmethod")) {
        function_member.set_class_method();
    }
    if decorators.iter().any(|decorator| is_named(decorator, "staticmethod")) {
        function_member.set_static();
    }

    let overload = function_member.add_overload(build_overload(state, function));

    register_deferred_walk(state, &function_member, &overload, function);

    state.scope.set_in_scope(name, Some(Member::Function(function_member)), false, None);
}

fn is_named(expr: &Expr, name: &str) -> bool {
    matches!(expr, Expr::Name(n) if n.id.as_str() == name)
}

fn is_property_decorator(expr: &Expr) -> bool {
    is_named(expr, "property")
        || matches!(expr, Expr::Attribute(ast::ExprAttribute { value, attr, .. })
            if attr.as_str() == "abstractproperty" && matches!(value.as_ref(), Expr::Name(n) if n.id.as_str() == "abc"))
}

fn setter_target(decorators: &[&Expr]) -> Option<&str> {
    decorators.iter().find_map(|decorator| match decorator {
        Expr::Attribute(ast::ExprAttribute { value, attr, .. }) if attr.as_str() == "setter" => match value.as_ref() {
            Expr::Name(n) => Some(n.id.as_str()),
            _ => None,
        },
        _ => None,
    })
}

fn build_overload(state: &mut WalkerState, function: &ast::StmtFunctionDef) -> Overload {
    let params = &function.parameters;
    let mut parameters = Vec::new();
    for param in params.posonlyargs.iter().chain(params.args.iter()) {
        parameters.push(build_parameter(state, &param.parameter.name, param.parameter.annotation.as_deref(), param.default.as_deref(), ParameterKind::Positional));
    }
    if let Some(vararg) = &params.vararg {
        parameters.push(build_parameter(state, &vararg.name, vararg.annotation.as_deref(), None, ParameterKind::VarPositional));
    }
    for param in &params.kwonlyargs {
        parameters.push(build_parameter(state, &param.parameter.name, param.parameter.annotation.as_deref(), param.default.as_deref(), ParameterKind::Keyword));
    }
    if let Some(kwarg) = &params.kwarg {
        parameters.push(build_parameter(state, &kwarg.name, kwarg.annotation.as_deref(), None, ParameterKind::VarKeyword));
    }

    let return_annotation_source = function.returns.is_some().then(|| "<annotated>".to_string());
    let mut overload = Overload::new(parameters).with_return_annotation(return_annotation_source);
    if let Some(returns) = &function.returns {
        let return_type = annotation::evaluate_annotation(&eval_ctx_fields!(state), &mut *state.diagnostics, returns);
        overload.finalize_return_types(vec![return_type]);
    }
    overload
}

fn build_parameter(
    state: &mut WalkerState,
    name: &ast::Identifier,
    annotation_expr: Option<&Expr>,
    default_expr: Option<&Expr>,
    kind: ParameterKind,
) -> Parameter {
    let annotation_types = match annotation_expr {
        Some(expr) => vec![annotation::evaluate_annotation(&eval_ctx_fields!(state), &mut *state.diagnostics, expr)],
        None => Vec::new(),
    };
    let default_source = default_expr.map(|_| "<default>".to_string());
    Parameter::new(name.id.as_str(), kind).with_annotation(annotation_types).with_default(default_source)
}

/// §4.2: "Register the body with C5. Do not recurse into the function body;
/// bodies are handled lazily." An explicit return annotation already settles
/// the overload's return types (`build_overload`), so the registered walker
/// is a no-op in that case; otherwise it owns a cheap scope snapshot
/// (`LookupContext::clone_stack(false)`) plus a clone of the body, and walks
/// it to collect `return` statements into `overload`'s return-type set.
fn register_deferred_walk(
    state: &WalkerState,
    function_member: &Arc<FunctionMember>,
    overload: &Arc<Overload>,
    function: &ast::StmtFunctionDef,
) {
    let is_constructor = function.name.as_str() == "__init__" || function.name.as_str() == "__new__";
    let key = function_member.qualified_name();

    if overload.return_types_resolved() {
        state.deferred.add(key, is_constructor, Box::new(|| {}));
        return;
    }

    let mut scope = state.scope.clone_stack(false);
    scope.push_scope(None);
    for parameter in overload.parameters.iter() {
        let value = parameter
            .annotation_types
            .first()
            .cloned()
            .unwrap_or_else(|| Member::unknown(&parameter.name, SourceLocation::synthetic()));
        scope.set_in_scope(&parameter.name, Some(value), false, None);
    }

    let body = function.body.clone();
    let module_name = state.module.name().to_string();
    let path = state.path.clone();
    let is_py2 = state.python_version.is_py2();
    let overload = overload.clone();

    let walker: Box<dyn FnOnce() + Send> = Box::new(move || {
        let ctx = EvalContext { scope: &scope, module_name: &module_name, path: path.as_deref(), is_py2 };
        let mut return_types = Vec::new();
        collect_return_types(&ctx, &body, &mut return_types);
        overload.finalize_return_types(return_types);
    });

    state.deferred.add(key, is_constructor, walker);
}

/// Walks `stmts` collecting the types of every `return expr` reachable
/// without crossing into a nested function/class body (§4.5: "walking its
/// body with a private scope clone, collecting statements' effects on its
/// overload's return-type set"). A bare `return`/implicit fall-through
/// contributes `None` (§4.1's literal typing rule for the `None` builtin).
fn collect_return_types(ctx: &EvalContext, stmts: &[Stmt], out: &mut Vec<Member>) {
    for stmt in stmts {
        match stmt {
            Stmt::Return(ast::StmtReturn { value: Some(value), .. }) => {
                out.push(expr_eval::evaluate(ctx, value, LookupOptions::ALL));
            }
            Stmt::Return(ast::StmtReturn { value: None, range }) => {
                out.push(Member::Constant(crate::types::constant::ConstantMember::builtin(
                    "None",
                    crate::types::builtin_id::BuiltinTypeId::NoneType,
                    SourceLocation::new(ctx.path.map(std::path::Path::to_path_buf), *range),
                )));
            }
            Stmt::If(ast::StmtIf { body, elif_else_clauses, .. }) => {
                collect_return_types(ctx, body, out);
                for clause in elif_else_clauses {
                    collect_return_types(ctx, &clause.body, out);
                }
            }
            Stmt::For(ast::StmtFor { body, orelse, .. }) => {
                collect_return_types(ctx, body, out);
                collect_return_types(ctx, orelse, out);
            }
            Stmt::While(ast::StmtWhile { body, orelse, .. }) => {
                collect_return_types(ctx, body, out);
                collect_return_types(ctx, orelse, out);
            }
            Stmt::With(ast::StmtWith { body, .. }) => {
                collect_return_types(ctx, body, out);
            }
            Stmt::Try(ast::StmtTry { body, handlers, orelse, finalbody, .. }) => {
                collect_return_types(ctx, body, out);
                for handler in handlers {
                    let ast::ExceptHandler::ExceptHandler(handler) = handler;
                    collect_return_types(ctx, &handler.body, out);
                }
                collect_return_types(ctx, orelse, out);
                collect_return_types(ctx, finalbody, out);
            }
            Stmt::Match(ast::StmtMatch { cases, .. }) => {
                for case in cases {
                    collect_return_types(ctx, &case.body, out);
                }
            }
            // Nested definitions get their own deferred walk when `walk_statement`
            // reaches them through the normal pass; skip them here.
            Stmt::FunctionDef(_) | Stmt::ClassDef(_) => {}
            _ => {}
        }
    }
}

fn complete(state: &mut WalkerState) {
    state.deferred.process_set();
    if state.is_stub_file && state.module.name() != "typing" {
        state.typing_scope.lock().unwrap().clear();
    }
}

trait QualifiedNameFallback {
    fn qualified_name_fallback(&self) -> String;
}

impl QualifiedNameFallback for Member {
    fn qualified_name_fallback(&self) -> String {
        use crate::location::HasQualifiedName;
        self.qualified_name()
    }
}
