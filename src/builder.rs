//! IR builder.
//!
//! Walks a `component(...)` body and produces a [`Component`] in the arena:
//! props from the first parameter's destructuring pattern, locals classified
//! into raw/state/derived, macro calls into lifecycle and watch entries,
//! `use*` calls into hook statements, nested `component(...)` constructions
//! into child nodes, and the trailing JSX expression into a view tree.
//!
//! Build state is an explicit [`BuildCx`] value threaded through every call;
//! there is no ambient "current component" anywhere.

use oxc_ast::ast::{
    BindingPattern, CallExpression, Expression, FormalParameters, FunctionBody, PropertyKey,
    Statement, VariableDeclarationKind, VariableDeclarator,
};
use oxc_span::GetSpan;
use regex::Regex;

use crate::deps::{extract_expression, extract_statement, Extraction};
use crate::diagnostics::{
    line_col, CompilerError, Diagnostic, ERR_BIT_OVERFLOW, ERR_MACRO_ARG, ERR_PARAM_NOT_PATTERN,
    ERR_PARAM_REST,
};
use crate::ir::{
    ActionWrap, Binding, BindingKind, ComponentArena, ComponentId, Dependency, HookArg,
    LifecycleKind, LocalKind, Stmt, TextSpan,
};
use crate::view::lower_view;

lazy_static::lazy_static! {
    /// External custom hooks are recognized by the conventional `useXxx` name.
    static ref HOOK_NAME: Regex = Regex::new(r"^use[A-Z]").unwrap();
}

/// Mutable analysis state for one source file. One reactive-id counter per
/// top-level component tree; ids restart at zero for every root.
pub struct BuildCx<'s> {
    pub arena: ComponentArena,
    pub diagnostics: Vec<Diagnostic>,
    pub source: &'s str,
    pub file: &'s str,
    next_id: u32,
}

/// A deferred sub-component body; children build after the parent's own
/// statements and view so each scope's id range is one contiguous block.
struct PendingChild<'a, 'b> {
    id: ComponentId,
    params: Option<&'b FormalParameters<'a>>,
    body: &'b FunctionBody<'a>,
}

impl<'s> BuildCx<'s> {
    pub fn new(source: &'s str, file: &'s str) -> Self {
        BuildCx {
            arena: ComponentArena::new(),
            diagnostics: Vec::new(),
            source,
            file,
            next_id: 0,
        }
    }

    /// Analyze one top-level `component(...)` constructor expression.
    pub fn build_root(
        &mut self,
        name: &str,
        ctor: &Expression<'_>,
    ) -> Result<ComponentId, CompilerError> {
        self.next_id = 0;
        let id = self.arena.alloc(name.to_string(), None);
        let (params, body) = self.component_fn(ctor)?;
        self.build_component(id, params, body)?;
        Ok(id)
    }

    fn component_fn<'a, 'b>(
        &self,
        expr: &'b Expression<'a>,
    ) -> Result<(Option<&'b FormalParameters<'a>>, &'b FunctionBody<'a>), CompilerError> {
        match expr {
            Expression::ArrowFunctionExpression(arrow) => {
                Ok((Some(&*arrow.params), &*arrow.body))
            }
            Expression::FunctionExpression(func) => match &func.body {
                Some(body) => Ok((Some(&*func.params), &**body)),
                None => Err(self.error_at(
                    ERR_MACRO_ARG,
                    "component() function has no body.",
                    expr.span(),
                )),
            },
            _ => Err(self.error_at(
                ERR_MACRO_ARG,
                "component() requires a function argument.",
                expr.span(),
            )),
        }
    }

    fn error_at(&self, code: &str, message: &str, span: oxc_span::Span) -> CompilerError {
        let (line, column) = line_col(self.source, span.start);
        CompilerError::new(code, message, self.file, line, column)
    }

    fn alloc_bit(&mut self, span: oxc_span::Span) -> Result<u32, CompilerError> {
        if self.next_id >= 64 {
            return Err(self.error_at(
                ERR_BIT_OVERFLOW,
                "Component tree declares more than 64 reactive bindings.",
                span,
            ));
        }
        let id = self.next_id;
        self.next_id += 1;
        Ok(id)
    }

    fn extract_expr(&mut self, id: ComponentId, expr: &Expression<'_>) -> Option<Dependency> {
        let Extraction { deps, diagnostics } =
            extract_expression(expr, &self.arena, id, &[], self.source, self.file);
        self.diagnostics.extend(diagnostics);
        deps
    }

    fn extract_stmt(&mut self, id: ComponentId, stmt: &Statement<'_>) -> Option<Dependency> {
        let Extraction { deps, diagnostics } =
            extract_statement(stmt, &self.arena, id, &[], self.source, self.file);
        self.diagnostics.extend(diagnostics);
        deps
    }

    fn build_component(
        &mut self,
        id: ComponentId,
        params: Option<&FormalParameters<'_>>,
        body: &FunctionBody<'_>,
    ) -> Result<(), CompilerError> {
        if let Some(params) = params {
            if let Some(first) = params.items.first() {
                self.build_props(id, &first.pattern)?;
            }
        }

        let mut pending: Vec<PendingChild<'_, '_>> = Vec::new();
        let mut view_expr: Option<&Expression<'_>> = None;

        for stmt in &body.statements {
            match stmt {
                Statement::VariableDeclaration(decl) => {
                    let kw = decl_keyword(decl.kind);
                    let is_const = matches!(decl.kind, VariableDeclarationKind::Const);
                    for declarator in &decl.declarations {
                        self.build_declarator(id, kw, is_const, declarator, &mut pending)?;
                    }
                }
                Statement::ExpressionStatement(expr_stmt) => {
                    match &expr_stmt.expression {
                        Expression::CallExpression(call) => {
                            if !self.build_macro_call(id, call)? {
                                self.push_raw(id, expr_stmt.span.into(), None, None);
                            }
                        }
                        Expression::JSXElement(_) | Expression::JSXFragment(_) => {
                            view_expr = Some(&expr_stmt.expression);
                        }
                        _ => self.push_raw(id, expr_stmt.span.into(), None, None),
                    }
                }
                Statement::ReturnStatement(ret) => {
                    if let Some(arg) = &ret.argument {
                        view_expr = Some(arg);
                    }
                }
                Statement::FunctionDeclaration(func) => {
                    let name = func.id.as_ref().map(|ident| ident.name.to_string());
                    let write_mask = self
                        .extract_stmt(id, stmt)
                        .map(|d| d.write_mask)
                        .unwrap_or(0);
                    let wrap = match (&name, write_mask) {
                        (Some(fn_name), mask) if mask != 0 => Some(ActionWrap {
                            name: fn_name.clone(),
                            value: func.span.into(),
                            write_mask: mask,
                        }),
                        _ => None,
                    };
                    if let Some(fn_name) = name {
                        self.arena
                            .get_mut(id)
                            .scope
                            .locals
                            .insert(fn_name, LocalKind::Raw);
                    }
                    self.push_raw(id, func.span.into(), None, wrap);
                }
                _ => self.push_raw(id, stmt.span().into(), None, None),
            }
        }

        if let Some(expr) = view_expr {
            let lowered = lower_view(&self.arena, id, self.source, self.file, expr);
            self.diagnostics.extend(lowered.diagnostics);
            let comp = self.arena.get_mut(id);
            comp.scope.used_bits |= lowered.used_bits;
            comp.view = Some(lowered.particles);
        }

        for child in pending {
            self.build_component(child.id, child.params, child.body)?;
            let child_used = self.arena.get(child.id).scope.used_bits;
            self.arena.get_mut(id).scope.used_bits |= child_used;
        }

        Ok(())
    }

    // ───────────────────────────────────────────────────────────────────────
    // Props
    // ───────────────────────────────────────────────────────────────────────

    fn build_props(
        &mut self,
        id: ComponentId,
        pattern: &BindingPattern<'_>,
    ) -> Result<(), CompilerError> {
        let pattern = strip_default(pattern);
        let obj = match pattern {
            BindingPattern::ObjectPattern(obj) => obj,
            other => {
                return Err(self.error_at(
                    ERR_PARAM_NOT_PATTERN,
                    "The first component parameter must be an object destructuring pattern.",
                    other.span(),
                ));
            }
        };

        for prop in &obj.properties {
            let key = match &prop.key {
                PropertyKey::StaticIdentifier(ident) => ident.name.to_string(),
                PropertyKey::StringLiteral(lit) => lit.value.to_string(),
                other => {
                    return Err(self.error_at(
                        ERR_PARAM_NOT_PATTERN,
                        "Computed keys are not allowed in a props pattern.",
                        other.span(),
                    ));
                }
            };

            let (value, default) = split_default(&prop.value);
            match value {
                BindingPattern::BindingIdentifier(ident) => {
                    let bit = self.alloc_bit(ident.span)?;
                    let comp = self.arena.get_mut(id);
                    let binding = comp.scope.declare(Binding {
                        name: ident.name.to_string(),
                        kind: BindingKind::Prop,
                        reactive_id: bit,
                        mask: 1u64 << bit,
                        bit: 0,
                        pruned: false,
                        prop_key: Some(key),
                        default,
                    });
                    comp.statements.push(Stmt::Prop { binding });
                }
                BindingPattern::ObjectPattern(_) | BindingPattern::ArrayPattern(_) => {
                    let whole_bit = self.alloc_bit(prop.span)?;
                    let whole_mask = 1u64 << whole_bit;
                    let whole = self.arena.get_mut(id).scope.declare(Binding {
                        name: key.clone(),
                        kind: BindingKind::WholeProp,
                        reactive_id: whole_bit,
                        mask: whole_mask,
                        bit: 0,
                        pruned: false,
                        prop_key: Some(key),
                        default,
                    });

                    let mut leaf_names = Vec::new();
                    collect_pattern_names(value, &mut leaf_names);
                    let mut leaves = Vec::new();
                    for leaf in leaf_names {
                        let bit = self.alloc_bit(prop.span)?;
                        let ix = self.arena.get_mut(id).scope.declare(Binding {
                            name: leaf,
                            kind: BindingKind::PropLeaf,
                            reactive_id: bit,
                            mask: (1u64 << bit) | whole_mask,
                            bit: 0,
                            pruned: false,
                            prop_key: None,
                            default: None,
                        });
                        leaves.push(ix);
                    }
                    self.arena.get_mut(id).statements.push(Stmt::WholeProp {
                        binding: whole,
                        leaves,
                        pattern: value.span().into(),
                    });
                }
                other => {
                    return Err(self.error_at(
                        ERR_PARAM_NOT_PATTERN,
                        "Unsupported entry in the props pattern.",
                        other.span(),
                    ));
                }
            }
        }

        if let Some(rest) = &obj.rest {
            let ident = match &rest.argument {
                BindingPattern::BindingIdentifier(ident) => ident,
                other => {
                    return Err(self.error_at(
                        ERR_PARAM_REST,
                        "A props rest element must bind a plain identifier.",
                        other.span(),
                    ));
                }
            };
            let bit = self.alloc_bit(ident.span)?;
            let comp = self.arena.get_mut(id);
            let binding = comp.scope.declare(Binding {
                name: ident.name.to_string(),
                kind: BindingKind::RestProp,
                reactive_id: bit,
                mask: 1u64 << bit,
                bit: 0,
                pruned: false,
                prop_key: None,
                default: None,
            });
            comp.statements.push(Stmt::RestProp { binding });
        }

        Ok(())
    }

    // ───────────────────────────────────────────────────────────────────────
    // Local declarations
    // ───────────────────────────────────────────────────────────────────────

    fn build_declarator<'a, 'b>(
        &mut self,
        id: ComponentId,
        kw: &'static str,
        is_const: bool,
        declarator: &'b VariableDeclarator<'a>,
        pending: &mut Vec<PendingChild<'a, 'b>>,
    ) -> Result<(), CompilerError> {
        if let Some(Expression::CallExpression(call)) = &declarator.init {
            if let Expression::Identifier(callee) = &call.callee {
                if callee.name == "component" {
                    return self.build_sub_component(id, declarator, call, pending);
                }
                if HOOK_NAME.is_match(callee.name.as_str()) {
                    return self.build_hook(
                        id,
                        Some(&declarator.id),
                        callee.name.as_str(),
                        call,
                    );
                }
            }
        }

        let mut names = Vec::new();
        collect_pattern_names(&declarator.id, &mut names);

        let deps = match &declarator.init {
            Some(init) => self.extract_expr(id, init),
            None => None,
        };
        let has_reads = deps.as_ref().is_some_and(|d| !d.reads.is_empty());
        let fn_init = matches!(
            declarator.init,
            Some(Expression::ArrowFunctionExpression(_)) | Some(Expression::FunctionExpression(_))
        );

        if !has_reads && (is_const || fn_init) {
            // Never reactive: a constant or a function value. Functions that
            // write reactive bindings get the batching wrapper.
            let write_mask = deps.as_ref().map(|d| d.write_mask).unwrap_or(0);
            let wrap = match (&names[..], &declarator.init, write_mask) {
                ([name], Some(init), mask) if mask != 0 && fn_init => Some(ActionWrap {
                    name: name.clone(),
                    value: init.span().into(),
                    write_mask: mask,
                }),
                _ => None,
            };
            for name in &names {
                self.arena
                    .get_mut(id)
                    .scope
                    .locals
                    .insert(name.clone(), LocalKind::Raw);
            }
            self.push_raw(id, declarator.span.into(), Some(kw), wrap);
            return Ok(());
        }

        // One bit for the whole declarator; a destructured group always
        // changes together.
        let bit = self.alloc_bit(declarator.span)?;
        let kind = if has_reads {
            BindingKind::Derived
        } else {
            BindingKind::State
        };
        let mask = (1u64 << bit) | deps.as_ref().map(|d| d.mask).unwrap_or(0);

        let comp = self.arena.get_mut(id);
        let mut bindings = Vec::new();
        for name in names {
            let ix = comp.scope.declare(Binding {
                name,
                kind,
                reactive_id: bit,
                mask,
                bit: 0,
                pruned: false,
                prop_key: None,
                default: None,
            });
            bindings.push(ix);
        }

        if has_reads {
            let init = declarator
                .init
                .as_ref()
                .expect("derived declaration always has an initializer");
            let deps = deps.expect("derived declaration always has reads");
            self.arena.get_mut(id).statements.push(Stmt::Derived {
                bindings,
                decl: declarator.span.into(),
                kw,
                pattern: declarator.id.span().into(),
                init: init.span().into(),
                deps,
            });
        } else {
            self.arena.get_mut(id).statements.push(Stmt::State {
                bindings,
                decl: declarator.span.into(),
                kw,
            });
        }
        Ok(())
    }

    fn build_sub_component<'a, 'b>(
        &mut self,
        id: ComponentId,
        declarator: &'b VariableDeclarator<'a>,
        call: &'b CallExpression<'a>,
        pending: &mut Vec<PendingChild<'a, 'b>>,
    ) -> Result<(), CompilerError> {
        let name = match &declarator.id {
            BindingPattern::BindingIdentifier(ident) => ident.name.to_string(),
            other => {
                return Err(self.error_at(
                    ERR_MACRO_ARG,
                    "A nested component() must bind a plain identifier.",
                    other.span(),
                ));
            }
        };
        let ctor = call
            .arguments
            .first()
            .and_then(|arg| arg.as_expression())
            .ok_or_else(|| {
                self.error_at(ERR_MACRO_ARG, "component() requires a function argument.", call.span)
            })?;
        let (params, body) = self.component_fn(ctor)?;

        let child = self.arena.alloc(name.clone(), Some(id));
        let comp = self.arena.get_mut(id);
        comp.scope.locals.insert(name, LocalKind::SubComponent);
        comp.children.push(child);
        comp.statements.push(Stmt::SubComponent { child });
        pending.push(PendingChild {
            id: child,
            params,
            body,
        });
        Ok(())
    }

    fn build_hook(
        &mut self,
        id: ComponentId,
        pattern: Option<&BindingPattern<'_>>,
        callee: &str,
        call: &CallExpression<'_>,
    ) -> Result<(), CompilerError> {
        let bit_id = self.alloc_bit(call.span)?;
        let hook_bit = 1u64 << bit_id;

        let mut args = Vec::new();
        let mut arg_mask = 0u64;
        for arg in &call.arguments {
            let Some(expr) = arg.as_expression() else {
                continue;
            };
            let deps = self.extract_expr(id, expr);
            if let Some(deps) = &deps {
                // Forwarded arguments are observed by the hook instance.
                arg_mask |= deps.mask;
            }
            args.push(HookArg {
                span: expr.span().into(),
                deps,
            });
        }
        self.arena.get_mut(id).scope.used_bits |= arg_mask;

        let mut bindings = Vec::new();
        let mut pattern_span = None;
        if let Some(pattern) = pattern {
            pattern_span = Some(TextSpan::from(pattern.span()));
            let mut names = Vec::new();
            collect_pattern_names(pattern, &mut names);
            let comp = self.arena.get_mut(id);
            for name in names {
                let ix = comp.scope.declare(Binding {
                    name,
                    kind: BindingKind::Hook,
                    reactive_id: bit_id,
                    mask: hook_bit | arg_mask,
                    bit: 0,
                    pruned: false,
                    prop_key: None,
                    default: None,
                });
                bindings.push(ix);
            }
        }

        self.arena.get_mut(id).statements.push(Stmt::Hook {
            callee: callee.to_string(),
            bindings,
            pattern: pattern_span,
            args,
            bit_id,
            bit: 0,
        });
        Ok(())
    }

    // ───────────────────────────────────────────────────────────────────────
    // Macro calls
    // ───────────────────────────────────────────────────────────────────────

    /// Returns true when the call was recognized and recorded.
    fn build_macro_call(
        &mut self,
        id: ComponentId,
        call: &CallExpression<'_>,
    ) -> Result<bool, CompilerError> {
        let Expression::Identifier(callee) = &call.callee else {
            return Ok(false);
        };
        let name = callee.name.as_str();

        match name {
            "onMount" | "onCleanup" => {
                let callback = self.require_fn_argument(call, name)?;
                let write_mask = self
                    .extract_expr(id, callback)
                    .map(|d| d.write_mask)
                    .unwrap_or(0);
                let kind = if name == "onMount" {
                    LifecycleKind::Mount
                } else {
                    LifecycleKind::Unmount
                };
                let comp = self.arena.get_mut(id);
                let ix = comp.statements.len();
                comp.statements.push(Stmt::Lifecycle {
                    kind,
                    callback: callback.span().into(),
                    write_mask,
                });
                comp.lifecycles.push(ix);
                Ok(true)
            }
            "effect" => {
                let callback = self.require_fn_argument(call, name)?;
                let inferred = self.extract_expr(id, callback);
                let explicit_list = call.arguments.get(1).and_then(|arg| arg.as_expression());

                let (deps, explicit) = match explicit_list {
                    Some(Expression::ArrayExpression(array)) => {
                        let mut merged = Dependency::default();
                        for element in &array.elements {
                            if let Some(expr) = element.as_expression() {
                                if let Some(d) = self.extract_expr(id, expr) {
                                    merged.mask |= d.mask;
                                    merged.reads.extend(d.reads);
                                }
                            }
                        }
                        merged.write_mask = inferred.as_ref().map(|d| d.write_mask).unwrap_or(0);
                        let deps = if merged.is_empty() { None } else { Some(merged) };
                        (deps, true)
                    }
                    _ => (inferred, false),
                };

                let write_mask = deps.as_ref().map(|d| d.write_mask).unwrap_or(0);
                if let Some(deps) = &deps {
                    self.arena.get_mut(id).scope.used_bits |= deps.mask;
                }
                let comp = self.arena.get_mut(id);
                let ix = comp.statements.len();
                comp.statements.push(Stmt::Watch {
                    callback: callback.span().into(),
                    deps,
                    explicit,
                    write_mask,
                });
                comp.watches.push(ix);
                Ok(true)
            }
            _ if HOOK_NAME.is_match(name) => {
                self.build_hook(id, None, name, call)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn require_fn_argument<'a, 'b>(
        &self,
        call: &'b CallExpression<'a>,
        macro_name: &str,
    ) -> Result<&'b Expression<'a>, CompilerError> {
        let arg = call.arguments.first().and_then(|arg| arg.as_expression());
        match arg {
            Some(expr)
                if matches!(
                    expr,
                    Expression::ArrowFunctionExpression(_) | Expression::FunctionExpression(_)
                ) =>
            {
                Ok(expr)
            }
            _ => Err(self.error_at(
                ERR_MACRO_ARG,
                &format!("{}() requires a function argument.", macro_name),
                call.span,
            )),
        }
    }

    fn push_raw(
        &mut self,
        id: ComponentId,
        span: TextSpan,
        kw: Option<&'static str>,
        wrap: Option<ActionWrap>,
    ) {
        self.arena.get_mut(id).statements.push(Stmt::Raw { span, kw, wrap });
    }
}

fn decl_keyword(kind: VariableDeclarationKind) -> &'static str {
    match kind {
        VariableDeclarationKind::Const => "const",
        VariableDeclarationKind::Var => "var",
        _ => "let",
    }
}

fn strip_default<'a, 'b>(pattern: &'b BindingPattern<'a>) -> &'b BindingPattern<'a> {
    match pattern {
        BindingPattern::AssignmentPattern(assign) => &assign.left,
        other => other,
    }
}

/// A pattern entry with a default splits into the inner pattern and the
/// default expression span.
fn split_default<'a, 'b>(
    pattern: &'b BindingPattern<'a>,
) -> (&'b BindingPattern<'a>, Option<TextSpan>) {
    match pattern {
        BindingPattern::AssignmentPattern(assign) => {
            (&assign.left, Some(assign.right.span().into()))
        }
        other => (other, None),
    }
}

pub fn collect_pattern_names(pattern: &BindingPattern<'_>, out: &mut Vec<String>) {
    match pattern {
        BindingPattern::BindingIdentifier(ident) => out.push(ident.name.to_string()),
        BindingPattern::ObjectPattern(obj) => {
            for prop in &obj.properties {
                collect_pattern_names(&prop.value, out);
            }
            if let Some(rest) = &obj.rest {
                collect_pattern_names(&rest.argument, out);
            }
        }
        BindingPattern::ArrayPattern(arr) => {
            for elem in &arr.elements {
                if let Some(pattern) = elem {
                    collect_pattern_names(pattern, out);
                }
            }
            if let Some(rest) = &arr.rest {
                collect_pattern_names(&rest.argument, out);
            }
        }
        BindingPattern::AssignmentPattern(assign) => collect_pattern_names(&assign.left, out),
        #[allow(unreachable_patterns)]
        _ => {}
    }
}
