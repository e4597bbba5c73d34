//! Dependency extraction.
//!
//! Given any expression (or statement) and a scope chain, computes the set of
//! reactive bindings it reads and the set it writes. Names bound inside the
//! expression itself shadow outer bindings; references that resolve to no
//! reactive binding are non-reactive.

use std::collections::HashSet;

use oxc_ast::ast::{
    AssignmentExpression, AssignmentTarget, CallExpression, Expression, IdentifierReference,
    SimpleAssignmentTarget, Statement, UpdateExpression,
};
use oxc_ast_visit::{walk, Visit};

use crate::diagnostics::{line_col, Diagnostic, WARN_SELF_DEPENDENCY, WARN_UNRESOLVED_REF};
use crate::ir::{ComponentArena, ComponentId, DepRef, Dependency, TextSpan};

lazy_static::lazy_static! {
    /// Identifiers that legitimately resolve outside the component scope
    /// chain. References to these never produce a resolution warning.
    pub static ref PULSE_GLOBALS: HashSet<&'static str> = {
        let mut s = HashSet::new();
        // Pulse primitives
        s.insert("component");
        s.insert("effect");
        s.insert("onMount");
        s.insert("onCleanup");

        // Standard JS globals
        s.insert("Math");
        s.insert("console");
        s.insert("JSON");
        s.insert("Date");
        s.insert("String");
        s.insert("Number");
        s.insert("Boolean");
        s.insert("Array");
        s.insert("Object");
        s.insert("Promise");
        s.insert("Map");
        s.insert("Set");
        s.insert("Error");
        s.insert("Symbol");
        s.insert("undefined");
        s.insert("NaN");
        s.insert("Infinity");
        s.insert("parseInt");
        s.insert("parseFloat");
        s.insert("isNaN");
        s.insert("fetch");
        s.insert("setTimeout");
        s.insert("setInterval");
        s.insert("clearTimeout");
        s.insert("clearInterval");
        s.insert("window");
        s.insert("document");
        s.insert("globalThis");
        s
    };

    /// Collection methods that mutate their receiver. A call through one of
    /// these classifies the receiver as a write.
    static ref MUTATING_METHODS: HashSet<&'static str> = {
        let mut s = HashSet::new();
        s.insert("push");
        s.insert("pop");
        s.insert("shift");
        s.insert("unshift");
        s.insert("splice");
        s.insert("sort");
        s.insert("reverse");
        s.insert("add");
        s.insert("delete");
        s.insert("clear");
        s.insert("set");
        s
    };
}

pub struct Extraction {
    pub deps: Option<Dependency>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Collects identifier references and classifies each as a read or a write.
/// Bindings introduced inside the expression are collected separately and
/// subtracted afterwards.
struct RefCollector {
    reads: Vec<(String, TextSpan)>,
    writes: Vec<(String, TextSpan)>,
    bound: HashSet<String>,
}

impl RefCollector {
    fn new() -> Self {
        RefCollector {
            reads: Vec::new(),
            writes: Vec::new(),
            bound: HashSet::new(),
        }
    }

    fn mark_write(&mut self, name: &str, span: oxc_span::Span) {
        self.writes.push((name.to_string(), span.into()));
    }

    fn collect_assignment_target(&mut self, target: &AssignmentTarget<'_>) {
        match target {
            AssignmentTarget::AssignmentTargetIdentifier(id) => {
                self.mark_write(id.name.as_str(), id.span);
            }
            AssignmentTarget::StaticMemberExpression(st) => {
                // Mutating a property mutates the receiver's value.
                if let Expression::Identifier(obj) = &st.object {
                    self.mark_write(obj.name.as_str(), obj.span);
                } else {
                    self.visit_expression(&st.object);
                }
            }
            AssignmentTarget::ComputedMemberExpression(comp) => {
                if let Expression::Identifier(obj) = &comp.object {
                    self.mark_write(obj.name.as_str(), obj.span);
                } else {
                    self.visit_expression(&comp.object);
                }
                self.visit_expression(&comp.expression);
            }
            _ => {}
        }
    }
}

impl<'a> Visit<'a> for RefCollector {
    fn visit_identifier_reference(&mut self, ident: &IdentifierReference<'a>) {
        self.reads.push((ident.name.to_string(), ident.span.into()));
    }

    fn visit_binding_identifier(&mut self, ident: &oxc_ast::ast::BindingIdentifier<'a>) {
        self.bound.insert(ident.name.to_string());
    }

    fn visit_assignment_expression(&mut self, expr: &AssignmentExpression<'a>) {
        self.collect_assignment_target(&expr.left);
        self.visit_expression(&expr.right);
    }

    fn visit_update_expression(&mut self, expr: &UpdateExpression<'a>) {
        match &expr.argument {
            SimpleAssignmentTarget::AssignmentTargetIdentifier(id) => {
                self.mark_write(id.name.as_str(), id.span);
            }
            SimpleAssignmentTarget::StaticMemberExpression(st) => {
                if let Expression::Identifier(obj) = &st.object {
                    self.mark_write(obj.name.as_str(), obj.span);
                } else {
                    self.visit_expression(&st.object);
                }
            }
            SimpleAssignmentTarget::ComputedMemberExpression(comp) => {
                if let Expression::Identifier(obj) = &comp.object {
                    self.mark_write(obj.name.as_str(), obj.span);
                } else {
                    self.visit_expression(&comp.object);
                }
                self.visit_expression(&comp.expression);
            }
            _ => {}
        }
    }

    fn visit_call_expression(&mut self, call: &CallExpression<'a>) {
        if let Expression::StaticMemberExpression(st) = &call.callee {
            if MUTATING_METHODS.contains(st.property.name.as_str()) {
                if let Expression::Identifier(obj) = &st.object {
                    self.mark_write(obj.name.as_str(), obj.span);
                    for arg in &call.arguments {
                        if let Some(e) = arg.as_expression() {
                            self.visit_expression(e);
                        }
                    }
                    return;
                }
            }
        }
        walk::walk_call_expression(self, call);
    }
}

/// Extract the dependency record of a single expression against the scope
/// chain of `from`, with `extra_locals` (loop variables, callback params of
/// an enclosing view construct) shadowing everything.
pub fn extract_expression(
    expr: &Expression<'_>,
    arena: &ComponentArena,
    from: ComponentId,
    extra_locals: &[String],
    source: &str,
    file: &str,
) -> Extraction {
    let mut collector = RefCollector::new();
    collector.visit_expression(expr);
    resolve(collector, arena, from, extra_locals, source, file)
}

/// Same as [`extract_expression`] but over a whole statement.
pub fn extract_statement(
    stmt: &Statement<'_>,
    arena: &ComponentArena,
    from: ComponentId,
    extra_locals: &[String],
    source: &str,
    file: &str,
) -> Extraction {
    let mut collector = RefCollector::new();
    collector.visit_statement(stmt);
    resolve(collector, arena, from, extra_locals, source, file)
}

fn resolve(
    collector: RefCollector,
    arena: &ComponentArena,
    from: ComponentId,
    extra_locals: &[String],
    source: &str,
    file: &str,
) -> Extraction {
    let mut deps = Dependency::default();
    let mut diagnostics = Vec::new();
    let mut seen_reads: HashSet<String> = HashSet::new();
    let mut warned: HashSet<String> = HashSet::new();

    let shadowed = |name: &str| {
        collector.bound.contains(name) || extra_locals.iter().any(|l| l == name)
    };

    for (name, span) in &collector.reads {
        if shadowed(name) || !seen_reads.insert(name.clone()) {
            continue;
        }
        match arena.resolve(from, name) {
            Some((cid, ix)) => {
                let binding = arena.get(cid).binding(ix);
                deps.mask |= binding.mask;
                deps.reads.push(DepRef {
                    name: name.clone(),
                    span: *span,
                });
            }
            None => {
                if arena.resolve_local(from, name).is_none()
                    && !PULSE_GLOBALS.contains(name.as_str())
                    && warned.insert(name.clone())
                {
                    let (line, column) = line_col(source, span.start);
                    diagnostics.push(Diagnostic::warning(
                        WARN_UNRESOLVED_REF,
                        &format!("Unknown identifier '{}'; treated as non-reactive.", name),
                        file,
                        line,
                        column,
                    ));
                }
            }
        }
    }

    let mut seen_writes: HashSet<String> = HashSet::new();
    for (name, span) in &collector.writes {
        if shadowed(name) || !seen_writes.insert(name.clone()) {
            continue;
        }
        if let Some((cid, ix)) = arena.resolve(from, name) {
            let binding = arena.get(cid).binding(ix);
            // What changed is the binding itself, not its upstream inputs.
            deps.write_mask |= 1u64 << binding.reactive_id;
            deps.writes.push(name.clone());

            if let Some(pos) = deps.reads.iter().position(|r| &r.name == name) {
                // Read-before-write: drop the read so the statement can
                // never schedule itself.
                let (line, column) = line_col(source, span.start);
                diagnostics.push(Diagnostic::warning(
                    WARN_SELF_DEPENDENCY,
                    &format!(
                        "'{}' is read and written by the same statement; the read is not tracked.",
                        name
                    ),
                    file,
                    line,
                    column,
                ));
                deps.reads.remove(pos);
                deps.mask = 0;
                for r in &deps.reads {
                    if let Some((cid, ix)) = arena.resolve(from, &r.name) {
                        deps.mask |= arena.get(cid).binding(ix).mask;
                    }
                }
            }
        }
    }

    Extraction {
        deps: if deps.is_empty() { None } else { Some(deps) },
        diagnostics,
    }
}
