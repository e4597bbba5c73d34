//! Code generation.
//!
//! Emits, per compiled component, a JavaScript constructor that hands the
//! `__pulse` runtime an `updateState(changedMask)` procedure, an optional
//! `updateProp(name, value)` writer, lifecycle callback lists, and a
//! `getUpdateViews()` factory returning the initial view nodes plus a
//! `(changedMask) => nodes` incremental-update closure.
//!
//! User expressions are re-emitted by slicing their source spans; the
//! generator never reorders user-authored statements beyond grouping update
//! actions by their (mask, dependency-array) pair.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ir::{
    BindingKind, Component, ComponentArena, ComponentId, Dependency, LifecycleKind, Stmt,
};
use crate::view::{AttrValue, ViewParticle};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledComponent {
    pub name: String,
    pub props: Vec<String>,
    pub code: String,
}

pub fn generate(arena: &ComponentArena, id: ComponentId, source: &str) -> CompiledComponent {
    let comp = arena.get(id);
    let mut w = Emitter::new();
    emit_component(arena, id, source, &mut w, true);
    CompiledComponent {
        name: comp.name.clone(),
        props: comp.prop_keys(),
        code: w.finish(),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// EMITTER
// ═══════════════════════════════════════════════════════════════════════════════

struct Emitter {
    out: String,
    indent: usize,
}

impl Emitter {
    fn new() -> Self {
        Emitter {
            out: String::new(),
            indent: 0,
        }
    }

    fn line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.out.push_str("  ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn open(&mut self, text: &str) {
        self.line(text);
        self.indent += 1;
    }

    fn close(&mut self, text: &str) {
        self.indent -= 1;
        self.line(text);
    }

    fn finish(self) -> String {
        self.out
    }
}

fn js_quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for ch in text.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out.push('"');
    out
}

fn object_key(name: &str) -> String {
    let plain = !name.is_empty()
        && !name.chars().next().unwrap().is_ascii_digit()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');
    if plain {
        name.to_string()
    } else {
        js_quote(name)
    }
}

/// Statement slice with a terminator, whatever the parser left in the span.
fn terminated(slice: &str) -> String {
    let trimmed = slice.trim_end();
    if trimmed.ends_with(';') || trimmed.ends_with('}') {
        trimmed.to_string()
    } else {
        format!("{};", trimmed)
    }
}

fn deps_array(deps: &Dependency) -> String {
    let names: Vec<&str> = deps.reads.iter().map(|r| r.name.as_str()).collect();
    format!("[{}]", names.join(", "))
}

fn props_object(props: &[String]) -> String {
    if props.is_empty() {
        "{}".to_string()
    } else {
        format!("{{ {} }}", props.join(", "))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPONENT CONSTRUCTOR
// ═══════════════════════════════════════════════════════════════════════════════

fn emit_component(
    arena: &ComponentArena,
    id: ComponentId,
    source: &str,
    w: &mut Emitter,
    is_root: bool,
) {
    let comp = arena.get(id);
    let keyword = if is_root { "export function" } else { "function" };
    w.open(&format!("{} {}(__props) {{", keyword, comp.name));
    w.line("const __ctx = __pulse.context();");

    emit_setup(arena, id, source, w);
    emit_update(comp, source, w);
    let has_props = comp.statements.iter().any(|s| {
        matches!(
            s,
            Stmt::Prop { .. } | Stmt::WholeProp { .. } | Stmt::RestProp { .. }
        )
    });
    if has_props {
        emit_update_prop(comp, w);
    }
    let has_view = comp.view.is_some();
    if has_view {
        emit_views(arena, id, source, w);
    }

    w.open(&format!(
        "return __pulse.component({}, __ctx, {{",
        js_quote(&comp.name)
    ));
    w.line("updateState: __update,");
    if has_props {
        w.line("updateProp: __updateProp,");
    }
    emit_lifecycle(comp, source, w);
    if has_view {
        w.line("getUpdateViews: __views,");
    }
    w.close("});");
    w.close("}");
}

// ═══════════════════════════════════════════════════════════════════════════════
// SETUP
// ═══════════════════════════════════════════════════════════════════════════════

fn emit_setup(arena: &ComponentArena, id: ComponentId, source: &str, w: &mut Emitter) {
    let comp = arena.get(id);
    let mut hook_index = 0usize;

    for stmt in &comp.statements {
        match stmt {
            Stmt::Raw { span, kw, wrap } => {
                // A wrap whose write targets were all pruned has nothing left
                // to batch and decays to a plain declaration.
                if let Some(wrap) = wrap.as_ref().filter(|wrap| wrap.write_mask != 0) {
                    w.line(&format!(
                        "const {} = __pulse.action(__ctx, {}, ({}));",
                        wrap.name,
                        wrap.write_mask,
                        wrap.value.slice(source)
                    ));
                } else if let Some(wrap) = wrap {
                    w.line(&format!(
                        "const {} = ({});",
                        wrap.name,
                        wrap.value.slice(source)
                    ));
                } else if let Some(kw) = kw {
                    w.line(&format!("{} {};", kw, span.slice(source).trim_end()));
                } else {
                    w.line(&terminated(span.slice(source)));
                }
            }
            Stmt::State { decl, kw, .. } => {
                w.line(&format!("{} {};", kw, decl.slice(source).trim_end()));
            }
            Stmt::Derived { decl, .. } => {
                // Recomputed in __update, so the declaration is always `let`.
                w.line(&format!("let {};", decl.slice(source).trim_end()));
            }
            Stmt::Prop { binding } => {
                let b = comp.binding(*binding);
                let key = b.prop_key.as_deref().unwrap_or(&b.name);
                match &b.default {
                    Some(default) => w.line(&format!(
                        "let {} = __props.{} === undefined ? ({}) : __props.{};",
                        b.name,
                        key,
                        default.slice(source),
                        key
                    )),
                    None => w.line(&format!("let {} = __props.{};", b.name, key)),
                }
            }
            Stmt::WholeProp {
                binding, pattern, ..
            } => {
                let b = comp.binding(*binding);
                let key = b.prop_key.as_deref().unwrap_or(&b.name);
                match &b.default {
                    Some(default) => w.line(&format!(
                        "let {} = __props.{} === undefined ? ({}) : __props.{};",
                        b.name,
                        key,
                        default.slice(source),
                        key
                    )),
                    None => w.line(&format!("let {} = __props.{};", b.name, key)),
                }
                w.line(&format!("let {} = {};", pattern.slice(source), b.name));
            }
            Stmt::RestProp { binding } => {
                let b = comp.binding(*binding);
                let named: Vec<String> = comp
                    .scope
                    .bindings
                    .iter()
                    .filter(|other| {
                        matches!(other.kind, BindingKind::Prop | BindingKind::WholeProp)
                    })
                    .map(|other| js_quote(other.prop_key.as_deref().unwrap_or(&other.name)))
                    .collect();
                w.line(&format!(
                    "let {} = __pulse.rest(__props, [{}]);",
                    b.name,
                    named.join(", ")
                ));
            }
            Stmt::SubComponent { child } => {
                emit_component(arena, *child, source, w, false);
            }
            Stmt::Hook {
                callee,
                pattern,
                args,
                bit,
                ..
            } => {
                let arg_list: Vec<String> = args
                    .iter()
                    .map(|arg| format!("({})", arg.span.slice(source)))
                    .collect();
                w.line(&format!(
                    "const __h{} = __pulse.hook({}, [{}], {});",
                    hook_index,
                    callee,
                    arg_list.join(", "),
                    bit
                ));
                if let Some(pattern) = pattern {
                    w.line(&format!(
                        "let {} = __h{}.value;",
                        pattern.slice(source),
                        hook_index
                    ));
                }
                hook_index += 1;
            }
            Stmt::Watch { .. } | Stmt::Lifecycle { .. } => {}
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// UPDATE PROCEDURE
// ═══════════════════════════════════════════════════════════════════════════════

struct UpdateGroup {
    mask: u64,
    deps_key: Option<String>,
    slot: Option<usize>,
    actions: Vec<String>,
}

fn emit_update(comp: &Component, source: &str, w: &mut Emitter) {
    let mut groups: Vec<UpdateGroup> = Vec::new();
    let mut by_key: HashMap<(u64, Option<String>), usize> = HashMap::new();
    let mut slots = 0usize;

    let mut push = |groups: &mut Vec<UpdateGroup>, mask: u64, deps_key: Option<String>, action: String| {
        if mask == 0 {
            return;
        }
        let key = (mask, deps_key.clone());
        let ix = *by_key.entry(key).or_insert_with(|| {
            let slot = deps_key.as_ref().map(|_| {
                let s = slots;
                slots += 1;
                s
            });
            groups.push(UpdateGroup {
                mask,
                deps_key,
                slot,
                actions: Vec::new(),
            });
            groups.len() - 1
        });
        groups[ix].actions.push(action);
    };

    let mut hook_index = 0usize;
    for stmt in &comp.statements {
        match stmt {
            Stmt::Derived {
                bindings,
                pattern,
                init,
                deps,
                ..
            } => {
                let live = bindings.iter().any(|&ix| comp.binding(ix).bit != 0);
                if !live {
                    continue;
                }
                let pattern_text = pattern.slice(source);
                let action = if pattern_text.starts_with('{') || pattern_text.starts_with('[') {
                    format!("({} = ({}));", pattern_text, init.slice(source))
                } else {
                    format!("{} = ({});", pattern_text, init.slice(source))
                };
                push(&mut groups, deps.mask, Some(deps_array(deps)), action);
            }
            Stmt::WholeProp {
                binding,
                leaves,
                pattern,
            } => {
                let whole = comp.binding(*binding);
                let any_leaf_live = leaves.iter().any(|&ix| comp.binding(ix).bit != 0);
                if whole.bit == 0 || !any_leaf_live {
                    continue;
                }
                push(
                    &mut groups,
                    whole.bit,
                    Some(format!("[{}]", whole.name)),
                    format!("({} = {});", pattern.slice(source), whole.name),
                );
            }
            Stmt::Watch {
                callback,
                deps,
                write_mask,
                ..
            } => {
                let Some(deps) = deps else { continue };
                if deps.mask == 0 {
                    continue;
                }
                let action = if *write_mask != 0 {
                    format!(
                        "__pulse.action(__ctx, {}, ({}))();",
                        write_mask,
                        callback.slice(source)
                    )
                } else {
                    format!("({})();", callback.slice(source))
                };
                push(&mut groups, deps.mask, Some(deps_array(deps)), action);
            }
            Stmt::Hook {
                bindings,
                pattern,
                args,
                bit,
                ..
            } => {
                let mut arg_mask = 0u64;
                for (ai, arg) in args.iter().enumerate() {
                    let Some(deps) = &arg.deps else { continue };
                    if deps.mask == 0 {
                        continue;
                    }
                    arg_mask |= deps.mask;
                    push(
                        &mut groups,
                        deps.mask,
                        Some(deps_array(deps)),
                        format!(
                            "__h{}.updateProp({}, ({}), {}, __bits);",
                            hook_index,
                            ai,
                            arg.span.slice(source),
                            deps_array(deps)
                        ),
                    );
                }
                let live = bindings.iter().any(|&ix| comp.binding(ix).bit != 0);
                if live {
                    let pattern_text = pattern
                        .as_ref()
                        .map(|p| p.slice(source).to_string())
                        .unwrap_or_default();
                    let action = if pattern_text.starts_with('{') || pattern_text.starts_with('[') {
                        format!("({} = __h{}.value);", pattern_text, hook_index)
                    } else {
                        format!("{} = __h{}.value;", pattern_text, hook_index)
                    };
                    push(&mut groups, bit | arg_mask, None, action);
                }
                hook_index += 1;
            }
            _ => {}
        }
    }

    w.open("function __update(__bits) {");
    for group in &groups {
        w.open(&format!("if (__bits & {}) {{", group.mask));
        match (&group.deps_key, group.slot) {
            (Some(deps_key), Some(slot)) => {
                w.open(&format!(
                    "if (__pulse.changed(__ctx, {}, {})) {{",
                    slot, deps_key
                ));
                for action in &group.actions {
                    w.line(action);
                }
                w.close("}");
            }
            _ => {
                for action in &group.actions {
                    w.line(action);
                }
            }
        }
        w.close("}");
    }
    w.close("}");
}

fn emit_update_prop(comp: &Component, w: &mut Emitter) {
    w.open("function __updateProp(__name, __value) {");
    w.open("switch (__name) {");
    let mut rest: Option<(String, u64)> = None;
    for stmt in &comp.statements {
        match stmt {
            Stmt::Prop { binding } | Stmt::WholeProp { binding, .. } => {
                let b = comp.binding(*binding);
                let key = b.prop_key.as_deref().unwrap_or(&b.name);
                w.open(&format!("case {}: {{", js_quote(key)));
                w.line(&format!("{} = __value;", b.name));
                if b.bit != 0 {
                    w.line(&format!("__pulse.invalidate(__ctx, {});", b.bit));
                }
                w.line("break;");
                w.close("}");
            }
            Stmt::RestProp { binding } => {
                let b = comp.binding(*binding);
                rest = Some((b.name.clone(), b.bit));
            }
            _ => {}
        }
    }
    if let Some((name, bit)) = rest {
        w.open("default: {");
        w.line(&format!("{}[__name] = __value;", name));
        if bit != 0 {
            w.line(&format!("__pulse.invalidate(__ctx, {});", bit));
        }
        w.line("break;");
        w.close("}");
    }
    w.close("}");
    w.close("}");
}

fn emit_lifecycle(comp: &Component, source: &str, w: &mut Emitter) {
    let mut mount: Vec<String> = Vec::new();
    let mut unmount: Vec<String> = Vec::new();

    for stmt in &comp.statements {
        match stmt {
            Stmt::Lifecycle {
                kind,
                callback,
                write_mask,
            } => {
                let cb = wrap_callback(callback.slice(source), *write_mask);
                match kind {
                    LifecycleKind::Mount => mount.push(cb),
                    LifecycleKind::Unmount => unmount.push(cb),
                }
            }
            // A watch with no reactive dependency runs once, at mount.
            Stmt::Watch {
                callback,
                deps,
                write_mask,
                ..
            } if deps.as_ref().map(|d| d.mask).unwrap_or(0) == 0 => {
                mount.push(wrap_callback(callback.slice(source), *write_mask));
            }
            _ => {}
        }
    }

    if mount.is_empty() && unmount.is_empty() {
        return;
    }
    w.open("lifecycle: {");
    if !mount.is_empty() {
        w.line(&format!("mount: [{}],", mount.join(", ")));
    }
    if !unmount.is_empty() {
        w.line(&format!("unmount: [{}],", unmount.join(", ")));
    }
    w.close("},");
}

fn wrap_callback(slice: &str, write_mask: u64) -> String {
    if write_mask != 0 {
        format!("__pulse.action(__ctx, {}, ({}))", write_mask, slice)
    } else {
        format!("({})", slice)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// VIEWS
// ═══════════════════════════════════════════════════════════════════════════════

struct ViewEmit<'c> {
    source: &'c str,
    decls: Vec<String>,
    updates: Vec<(u64, String)>,
    node_counter: usize,
    mount_counter: usize,
}

fn emit_views(arena: &ComponentArena, id: ComponentId, source: &str, w: &mut Emitter) {
    let comp = arena.get(id);
    let Some(view) = &comp.view else { return };

    let mut ve = ViewEmit {
        source,
        decls: Vec::new(),
        updates: Vec::new(),
        node_counter: 0,
        mount_counter: 0,
    };
    let roots: Vec<String> = view.iter().map(|p| ve.emit_particle(p, false)).collect();
    let nodes = format!("[{}]", roots.join(", "));

    w.open("function __views() {");
    for decl in &ve.decls {
        w.line(decl);
    }
    w.open("return {");
    w.line(&format!("nodes: {},", nodes));
    w.open("update(__bits) {");
    let mut by_mask: Vec<(u64, Vec<String>)> = Vec::new();
    for (mask, action) in ve.updates {
        match by_mask.iter_mut().find(|(m, _)| *m == mask) {
            Some((_, actions)) => actions.push(action),
            None => by_mask.push((mask, vec![action])),
        }
    }
    for (mask, actions) in by_mask {
        w.open(&format!("if (__bits & {}) {{", mask));
        for action in actions {
            w.line(&action);
        }
        w.close("}");
    }
    w.line(&format!("return {};", nodes));
    w.close("},");
    w.close("};");
    w.close("}");
}

impl<'c> ViewEmit<'c> {
    fn next_node(&mut self) -> String {
        let name = format!("__n{}", self.node_counter);
        self.node_counter += 1;
        name
    }

    /// Returns a JS expression for the particle. Outside re-creation thunks,
    /// particles with live dynamic parts are hoisted into `const` node
    /// declarations so the update closure can address them.
    fn emit_particle(&mut self, particle: &ViewParticle, inline: bool) -> String {
        match particle {
            ViewParticle::Text(text) => format!("__pulse.text({})", js_quote(&text.value)),
            ViewParticle::Expression(expr) => {
                let mask = expr.deps.as_ref().map(|d| d.mask).unwrap_or(0);
                let code = format!("__pulse.expr(() => ({}))", expr.span.slice(self.source));
                if !inline && mask != 0 {
                    let name = self.next_node();
                    self.decls.push(format!("const {} = {};", name, code));
                    self.updates
                        .push((mask, format!("__pulse.refresh({});", name)));
                    name
                } else {
                    code
                }
            }
            ViewParticle::Element(el) => {
                let needs_ref = !inline
                    && el.attributes.iter().any(|attr| {
                        !attr.is_handler()
                            && matches!(
                                &attr.value,
                                AttrValue::Dynamic(d)
                                    if d.deps.as_ref().map(|x| x.mask).unwrap_or(0) != 0
                            )
                    });
                let name = if needs_ref {
                    Some(self.next_node())
                } else {
                    None
                };

                let mut props = Vec::new();
                for attr in &el.attributes {
                    match (&attr.value, attr.name.as_str()) {
                        (AttrValue::Dynamic(dyn_attr), "...") => {
                            props.push(format!("...({})", dyn_attr.span.slice(self.source)));
                            let mask = dyn_attr.deps.as_ref().map(|d| d.mask).unwrap_or(0);
                            if let Some(name) = &name {
                                if mask != 0 {
                                    self.updates
                                        .push((mask, format!("__pulse.refreshAttrs({});", name)));
                                }
                            }
                        }
                        (AttrValue::Static(value), _) => {
                            props.push(format!("{}: {}", object_key(&attr.name), js_quote(value)));
                        }
                        (AttrValue::Flag, _) => {
                            props.push(format!("{}: true", object_key(&attr.name)));
                        }
                        (AttrValue::Dynamic(dyn_attr), _) if attr.is_handler() => {
                            let write_mask =
                                dyn_attr.deps.as_ref().map(|d| d.write_mask).unwrap_or(0);
                            props.push(format!(
                                "{}: {}",
                                object_key(&attr.name),
                                wrap_callback(dyn_attr.span.slice(self.source), write_mask)
                            ));
                        }
                        (AttrValue::Dynamic(dyn_attr), _) => {
                            props.push(format!(
                                "{}: () => ({})",
                                object_key(&attr.name),
                                dyn_attr.span.slice(self.source)
                            ));
                            let mask = dyn_attr.deps.as_ref().map(|d| d.mask).unwrap_or(0);
                            if let Some(name) = &name {
                                if mask != 0 {
                                    self.updates.push((
                                        mask,
                                        format!(
                                            "__pulse.refreshAttr({}, {});",
                                            name,
                                            js_quote(&attr.name)
                                        ),
                                    ));
                                }
                            }
                        }
                    }
                }

                let children: Vec<String> = el
                    .children
                    .iter()
                    .map(|child| self.emit_particle(child, inline))
                    .collect();
                let code = format!(
                    "__pulse.element({}, {}, [{}])",
                    js_quote(&el.tag),
                    props_object(&props),
                    children.join(", ")
                );
                match name {
                    Some(name) => {
                        self.decls.push(format!("const {} = {};", name, code));
                        name
                    }
                    None => code,
                }
            }
            ViewParticle::Conditional(cond) => {
                let consequent: Vec<String> = cond
                    .consequent
                    .iter()
                    .map(|p| self.emit_particle(p, true))
                    .collect();
                let alternate: Vec<String> = cond
                    .alternate
                    .iter()
                    .map(|p| self.emit_particle(p, true))
                    .collect();
                let code = format!(
                    "__pulse.branch(() => ({}) ? __pulse.fragment([{}]) : __pulse.fragment([{}]))",
                    cond.test.slice(self.source),
                    consequent.join(", "),
                    alternate.join(", ")
                );
                let mask = cond.deps.as_ref().map(|d| d.mask).unwrap_or(0)
                    | subtree_mask(&cond.consequent)
                    | subtree_mask(&cond.alternate);
                self.hoist_refresh(code, mask, inline)
            }
            ViewParticle::Loop(lp) => {
                let body: Vec<String> =
                    lp.body.iter().map(|p| self.emit_particle(p, true)).collect();
                let code = format!(
                    "__pulse.each(() => ({}), ({}) => __pulse.fragment([{}]))",
                    lp.source_span.slice(self.source),
                    lp.params.join(", "),
                    body.join(", ")
                );
                let mask = lp.deps.as_ref().map(|d| d.mask).unwrap_or(0) | subtree_mask(&lp.body);
                self.hoist_refresh(code, mask, inline)
            }
            ViewParticle::Env(env) => {
                let children: Vec<String> = env
                    .children
                    .iter()
                    .map(|p| self.emit_particle(p, inline))
                    .collect();
                let (value, mask) = match &env.value {
                    Some(value) => (
                        format!("() => ({})", value.span.slice(self.source)),
                        value.deps.as_ref().map(|d| d.mask).unwrap_or(0),
                    ),
                    None => ("() => undefined".to_string(), 0),
                };
                let code = format!(
                    "__pulse.env({}, {}, [{}])",
                    js_quote(&env.key),
                    value,
                    children.join(", ")
                );
                self.hoist_refresh(code, mask, inline)
            }
            ViewParticle::Component(sub) => {
                let mut props = Vec::new();
                let mut writers: Vec<(u64, String, String)> = Vec::new();
                for attr in &sub.attributes {
                    match (&attr.value, attr.name.as_str()) {
                        (AttrValue::Dynamic(dyn_attr), "...") => {
                            props.push(format!("...({})", dyn_attr.span.slice(self.source)));
                        }
                        (AttrValue::Static(value), _) => {
                            props.push(format!("{}: {}", object_key(&attr.name), js_quote(value)));
                        }
                        (AttrValue::Flag, _) => {
                            props.push(format!("{}: true", object_key(&attr.name)));
                        }
                        (AttrValue::Dynamic(dyn_attr), _) if attr.is_handler() => {
                            let write_mask =
                                dyn_attr.deps.as_ref().map(|d| d.write_mask).unwrap_or(0);
                            props.push(format!(
                                "{}: {}",
                                object_key(&attr.name),
                                wrap_callback(dyn_attr.span.slice(self.source), write_mask)
                            ));
                        }
                        (AttrValue::Dynamic(dyn_attr), _) => {
                            let slice = dyn_attr.span.slice(self.source);
                            props.push(format!("{}: ({})", object_key(&attr.name), slice));
                            let mask = dyn_attr.deps.as_ref().map(|d| d.mask).unwrap_or(0);
                            if mask != 0 {
                                writers.push((mask, attr.name.clone(), slice.to_string()));
                            }
                        }
                    }
                }
                let children: Vec<String> = sub
                    .children
                    .iter()
                    .map(|p| self.emit_particle(p, inline))
                    .collect();
                let code = format!(
                    "__pulse.mount({}, {}, [{}])",
                    sub.name,
                    props_object(&props),
                    children.join(", ")
                );
                if inline || writers.is_empty() {
                    return code;
                }
                let name = format!("__c{}", self.mount_counter);
                self.mount_counter += 1;
                self.decls.push(format!("const {} = {};", name, code));
                for (mask, prop, slice) in writers {
                    self.updates.push((
                        mask,
                        format!("{}.updateProp({}, ({}));", name, js_quote(&prop), slice),
                    ));
                }
                name
            }
        }
    }

    fn hoist_refresh(&mut self, code: String, mask: u64, inline: bool) -> String {
        if inline || mask == 0 {
            return code;
        }
        let name = self.next_node();
        self.decls.push(format!("const {} = {};", name, code));
        self.updates
            .push((mask, format!("__pulse.refresh({});", name)));
        name
    }
}

/// OR of every read mask under the given particles. Handler dependencies are
/// excluded during lowering, so they never show up here.
fn subtree_mask(particles: &[ViewParticle]) -> u64 {
    let mut mask = 0u64;
    for particle in particles {
        match particle {
            ViewParticle::Element(el) => {
                for attr in &el.attributes {
                    if attr.is_handler() {
                        continue;
                    }
                    if let AttrValue::Dynamic(dyn_attr) = &attr.value {
                        mask |= dyn_attr.deps.as_ref().map(|d| d.mask).unwrap_or(0);
                    }
                }
                mask |= subtree_mask(&el.children);
            }
            ViewParticle::Component(sub) => {
                for attr in &sub.attributes {
                    if attr.is_handler() {
                        continue;
                    }
                    if let AttrValue::Dynamic(dyn_attr) = &attr.value {
                        mask |= dyn_attr.deps.as_ref().map(|d| d.mask).unwrap_or(0);
                    }
                }
                mask |= subtree_mask(&sub.children);
            }
            ViewParticle::Expression(expr) => {
                mask |= expr.deps.as_ref().map(|d| d.mask).unwrap_or(0);
            }
            ViewParticle::Conditional(cond) => {
                mask |= cond.deps.as_ref().map(|d| d.mask).unwrap_or(0);
                mask |= subtree_mask(&cond.consequent);
                mask |= subtree_mask(&cond.alternate);
            }
            ViewParticle::Loop(lp) => {
                mask |= lp.deps.as_ref().map(|d| d.mask).unwrap_or(0);
                mask |= subtree_mask(&lp.body);
            }
            ViewParticle::Env(env) => {
                if let Some(value) = &env.value {
                    mask |= value.deps.as_ref().map(|d| d.mask).unwrap_or(0);
                }
                mask |= subtree_mask(&env.children);
            }
            ViewParticle::Text(_) => {}
        }
    }
    mask
}
