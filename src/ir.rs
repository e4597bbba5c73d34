//! Analyzed component IR.
//!
//! Components live in a [`ComponentArena`] and refer to each other through
//! opaque [`ComponentId`] handles; parent links are ids, never references, so
//! the tree has a single owner and no cycles. Statement and binding data are
//! closed sum types matched exhaustively by the generator.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::view::ViewParticle;

/// Byte range into the component's source text. Codegen re-emits user
/// expressions by slicing these ranges, never by re-printing the AST.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextSpan {
    pub start: u32,
    pub end: u32,
}

impl TextSpan {
    pub fn slice<'s>(&self, source: &'s str) -> &'s str {
        &source[self.start as usize..self.end as usize]
    }
}

impl From<oxc_span::Span> for TextSpan {
    fn from(span: oxc_span::Span) -> Self {
        TextSpan {
            start: span.start,
            end: span.end,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComponentId(pub u32);

#[derive(Debug, Default)]
pub struct ComponentArena {
    nodes: Vec<Component>,
}

impl ComponentArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, name: String, parent: Option<ComponentId>) -> ComponentId {
        let id = ComponentId(self.nodes.len() as u32);
        self.nodes.push(Component {
            name,
            parent,
            statements: Vec::new(),
            scope: Scope::default(),
            view: None,
            watches: Vec::new(),
            lifecycles: Vec::new(),
            children: Vec::new(),
        });
        id
    }

    pub fn get(&self, id: ComponentId) -> &Component {
        &self.nodes[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: ComponentId) -> &mut Component {
        &mut self.nodes[id.0 as usize]
    }

    /// Nearest enclosing scope declaring `name`, innermost first.
    pub fn resolve(&self, from: ComponentId, name: &str) -> Option<(ComponentId, usize)> {
        let mut cur = Some(from);
        while let Some(id) = cur {
            let comp = self.get(id);
            if let Some(&ix) = comp.scope.by_name.get(name) {
                return Some((id, ix));
            }
            cur = comp.parent;
        }
        None
    }

    /// Like [`resolve`], but for non-reactive locals (raw declarations,
    /// sub-component constructors).
    pub fn resolve_local(&self, from: ComponentId, name: &str) -> Option<LocalKind> {
        let mut cur = Some(from);
        while let Some(id) = cur {
            let comp = self.get(id);
            if let Some(kind) = comp.scope.locals.get(name) {
                return Some(*kind);
            }
            if comp.scope.by_name.contains_key(name) {
                // Shadowed by a reactive binding in a nearer scope.
                return None;
            }
            cur = comp.parent;
        }
        None
    }
}

/// One analyzed component or sub-component occurrence.
#[derive(Debug)]
pub struct Component {
    pub name: String,
    pub parent: Option<ComponentId>,
    pub statements: Vec<Stmt>,
    pub scope: Scope,
    pub view: Option<Vec<ViewParticle>>,
    /// Indices into `statements` of the watch entries.
    pub watches: Vec<usize>,
    /// Indices into `statements` of the lifecycle blocks.
    pub lifecycles: Vec<usize>,
    pub children: Vec<ComponentId>,
}

impl Component {
    pub fn binding(&self, ix: usize) -> &Binding {
        &self.scope.bindings[ix]
    }

    /// Caller-facing prop keys, in declaration order.
    pub fn prop_keys(&self) -> Vec<String> {
        self.scope
            .bindings
            .iter()
            .filter(|b| {
                matches!(
                    b.kind,
                    BindingKind::Prop | BindingKind::WholeProp | BindingKind::RestProp
                )
            })
            .map(|b| b.prop_key.clone().unwrap_or_else(|| b.name.clone()))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    State,
    Derived,
    Prop,
    /// A prop whose pattern entry is itself destructured; the whole value
    /// gets this binding, the leaves get [`BindingKind::PropLeaf`] ones.
    WholeProp,
    PropLeaf,
    RestProp,
    Hook,
}

/// One reactive binding slot in a scope.
#[derive(Debug, Clone)]
pub struct Binding {
    pub name: String,
    pub kind: BindingKind,
    /// Pre-prune bit position, monotonically assigned at declaration time,
    /// unique within the component tree except for destructuring groups.
    pub reactive_id: u32,
    /// Accumulated mask: the binding's own bit OR'd with the full masks of
    /// everything its initializer reads. Compacted in place by the pruner.
    pub mask: u64,
    /// Post-prune single-bit mask, 0 once pruned. Bindings destructured from
    /// one statement share a reactive id and therefore prune together.
    pub bit: u64,
    pub pruned: bool,
    /// Caller-facing key for prop-sourced bindings (`{key: alias}`).
    pub prop_key: Option<String>,
    /// Default-value expression for props declared with `{a = expr}`.
    pub default: Option<TextSpan>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalKind {
    Raw,
    SubComponent,
}

/// A component's local name table: reactive bindings in declaration order
/// plus non-reactive locals, chained to the parent scope by component id.
#[derive(Debug, Default)]
pub struct Scope {
    pub bindings: Vec<Binding>,
    pub by_name: HashMap<String, usize>,
    pub locals: HashMap<String, LocalKind>,
    /// OR of every bit read by a watch, a view dependency, a hook argument,
    /// or a child scope that escaped upward.
    pub used_bits: u64,
    /// First post-prune slot of this scope's own range.
    pub base: u32,
    /// Live slots after pruning (destructuring groups count once).
    pub live: u32,
}

impl Scope {
    pub fn declare(&mut self, binding: Binding) -> usize {
        let ix = self.bindings.len();
        self.by_name.insert(binding.name.clone(), ix);
        self.bindings.push(binding);
        ix
    }
}

/// One original reference expression inside a dependency, in source order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepRef {
    pub name: String,
    pub span: TextSpan,
}

/// The reactive bindings an expression reads and writes, with the derived
/// mask integers. Masks hold pre-prune bits until the pruner compacts them.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dependency {
    pub reads: Vec<DepRef>,
    pub writes: Vec<String>,
    pub mask: u64,
    pub write_mask: u64,
}

impl Dependency {
    pub fn is_empty(&self) -> bool {
        self.reads.is_empty() && self.writes.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleKind {
    Mount,
    Unmount,
}

/// Wrap instruction for a raw function value that writes reactive bindings:
/// codegen re-emits it as `const name = __pulse.action(__ctx, mask, value)`.
#[derive(Debug, Clone)]
pub struct ActionWrap {
    pub name: String,
    pub value: TextSpan,
    pub write_mask: u64,
}

#[derive(Debug, Clone)]
pub struct HookArg {
    pub span: TextSpan,
    pub deps: Option<Dependency>,
}

/// IR statement. Dead reactive statements stay in the list after pruning;
/// their cleared bits make the generator skip their update actions.
#[derive(Debug)]
pub enum Stmt {
    /// Opaque passthrough, emitted verbatim (or action-wrapped). `kw` is set
    /// when the span is a single declarator sliced out of a declaration.
    Raw {
        span: TextSpan,
        kw: Option<&'static str>,
        wrap: Option<ActionWrap>,
    },
    /// Bare reactive declaration; `bindings` holds the destructuring group.
    State {
        bindings: Vec<usize>,
        decl: TextSpan,
        kw: &'static str,
    },
    /// Recomputed expression; `bindings` holds the whole destructuring group.
    Derived {
        bindings: Vec<usize>,
        decl: TextSpan,
        kw: &'static str,
        pattern: TextSpan,
        init: TextSpan,
        deps: Dependency,
    },
    /// One caller-supplied prop.
    Prop { binding: usize },
    /// A prop destructured further; leaves re-destructure when it changes.
    WholeProp {
        binding: usize,
        leaves: Vec<usize>,
        pattern: TextSpan,
    },
    /// Rest element of the props pattern.
    RestProp { binding: usize },
    /// Effect with an inferred or explicit dependency record.
    Watch {
        callback: TextSpan,
        deps: Option<Dependency>,
        explicit: bool,
        write_mask: u64,
    },
    Lifecycle {
        kind: LifecycleKind,
        callback: TextSpan,
        write_mask: u64,
    },
    /// Nested component construction, analyzed as its own arena node.
    SubComponent { child: ComponentId },
    /// External custom-hook invocation with an allocated bit.
    Hook {
        callee: String,
        bindings: Vec<usize>,
        pattern: Option<TextSpan>,
        args: Vec<HookArg>,
        bit_id: u32,
        bit: u64,
    },
}
