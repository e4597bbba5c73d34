//! # Pulse Reactivity Compiler
//!
//! ## Binding & Bit Invariants
//!
//! 1. **Arena ownership**: every analyzed component lives in a
//!    `ComponentArena` and is addressed by `ComponentId`. Parent links are
//!    ids, never references.
//!
//! 2. **Bit identity**: every reactive binding gets a monotonically
//!    increasing bit id at declaration time. A binding's accumulated mask is
//!    its own bit OR'd with the masks of everything its initializer reads,
//!    so referencing a binding carries its whole derivation history and one
//!    declaration-ordered update pass settles every chain.
//!
//! 3. **Scope chaining**: identifier resolution walks component scopes
//!    innermost-first. A child scope reads ancestor bindings by name but
//!    never allocates bits for them; child id ranges are contiguous blocks
//!    after the parent's.
//!
//! 4. **Pruning**: a binding survives only if its origin bit (the highest of
//!    its accumulated mask) is read by a watch, a view dependency, a hook
//!    argument, or a child scope that escaped upward. Pruning runs exactly
//!    once per tree, parent before children; surviving bits compact to a
//!    dense zero-based range per scope. Dead statements stay in the list
//!    with their bit cleared.
//!
//! 5. **Generated contract**: each component compiles to a constructor that
//!    hands the `__pulse` runtime `updateState(changedMask)`, an optional
//!    `updateProp(name, value)`, lifecycle callback lists, and a
//!    `getUpdateViews()` factory. Update actions group by their
//!    (mask, dependency-array) pair behind one shared cache check.

#[cfg(feature = "napi")]
use napi_derive::napi;

pub mod bits;
pub mod builder;
pub mod cache;
pub mod codegen;
pub mod compile;
pub mod deps;
pub mod diagnostics;
pub mod ir;
pub mod view;

#[cfg(test)]
mod builder_tests;
#[cfg(test)]
mod codegen_tests;
#[cfg(test)]
mod prune_tests;

pub use codegen::CompiledComponent;
pub use compile::{analyze, compile_many, compile_program, CompileInput, CompileOptions, ProgramOutput};
pub use diagnostics::{CompilerError, Diagnostic};

#[cfg(feature = "napi")]
#[napi]
pub fn compile_bridge() -> String {
    "Pulse Native Bridge Connected".to_string()
}
