//! Bit allocation bookkeeping and pruning.
//!
//! Pruning runs exactly once per component tree, parent before children:
//! first every binding whose origin bit never shows up in its scope's
//! used-bits is marked dead and its pre-prune position recorded, then every
//! mask in the tree is compacted by removing exactly those positions. Child
//! id ranges are contiguous blocks after the parent's, so compaction alone
//! produces the dense per-scope numbering.

use crate::ir::{ComponentArena, ComponentId, Dependency, Stmt};
use crate::view::{AttrValue, ViewParticle};

/// Remove the given bit positions from `mask`, left-shifting higher bits
/// down. `removed` must be sorted and deduplicated.
pub fn compact_mask(mask: u64, removed: &[u32]) -> u64 {
    let mut out = 0u64;
    let mut rest = mask;
    while rest != 0 {
        let pos = rest.trailing_zeros();
        rest &= rest - 1;
        if removed.binary_search(&pos).is_err() {
            let shift = removed.partition_point(|&r| r < pos) as u32;
            out |= 1u64 << (pos - shift);
        }
    }
    out
}

pub fn prune(arena: &mut ComponentArena, root: ComponentId) {
    let mut removed = Vec::new();
    decide(arena, root, &mut removed);
    removed.sort_unstable();
    removed.dedup();
    apply(arena, root, &removed);
}

/// Mark dead bindings, parent before children, recording their pre-prune
/// positions. A destructuring group shares one reactive id and therefore one
/// decision.
fn decide(arena: &mut ComponentArena, id: ComponentId, removed: &mut Vec<u32>) {
    let comp = arena.get_mut(id);
    let used = comp.scope.used_bits;
    for binding in &mut comp.scope.bindings {
        // The origin bit is the binding's own freshly allocated bit, the
        // highest of its accumulated mask.
        let origin = 1u64 << binding.reactive_id;
        if used & origin == 0 {
            binding.pruned = true;
            removed.push(binding.reactive_id);
        }
    }
    // A hook invoked purely for its side effects carries no result binding,
    // so its allocated bit can never be observed; reclaim the position.
    for stmt in &comp.statements {
        if let Stmt::Hook {
            bindings, bit_id, ..
        } = stmt
        {
            if bindings.is_empty() {
                removed.push(*bit_id);
            }
        }
    }
    let children = comp.children.clone();
    for child in children {
        decide(arena, child, removed);
    }
}

fn apply(arena: &mut ComponentArena, id: ComponentId, removed: &[u32]) {
    let comp = arena.get_mut(id);

    let mut live_ids: Vec<u32> = Vec::new();
    for binding in &mut comp.scope.bindings {
        binding.mask = compact_mask(binding.mask, removed);
        binding.bit = if binding.pruned {
            0
        } else {
            compact_mask(1u64 << binding.reactive_id, removed)
        };
        if !binding.pruned && !live_ids.contains(&binding.reactive_id) {
            live_ids.push(binding.reactive_id);
        }
    }
    comp.scope.used_bits = compact_mask(comp.scope.used_bits, removed);
    comp.scope.live = live_ids.len() as u32;
    comp.scope.base = comp
        .scope
        .bindings
        .iter()
        .filter(|b| !b.pruned)
        .map(|b| b.bit.trailing_zeros())
        .min()
        .unwrap_or(0);

    for stmt in &mut comp.statements {
        match stmt {
            Stmt::Derived { deps, .. } => compact_dependency(deps, removed),
            Stmt::Watch { deps, write_mask, .. } => {
                if let Some(deps) = deps {
                    compact_dependency(deps, removed);
                }
                *write_mask = compact_mask(*write_mask, removed);
            }
            Stmt::Lifecycle { write_mask, .. } => {
                *write_mask = compact_mask(*write_mask, removed);
            }
            Stmt::Raw { wrap, .. } => {
                if let Some(wrap) = wrap {
                    wrap.write_mask = compact_mask(wrap.write_mask, removed);
                }
            }
            Stmt::Hook { args, bit_id, bit, .. } => {
                for arg in args {
                    if let Some(deps) = &mut arg.deps {
                        compact_dependency(deps, removed);
                    }
                }
                *bit = compact_mask(1u64 << *bit_id, removed);
            }
            Stmt::State { .. }
            | Stmt::Prop { .. }
            | Stmt::WholeProp { .. }
            | Stmt::RestProp { .. }
            | Stmt::SubComponent { .. } => {}
        }
    }

    if let Some(mut view) = comp.view.take() {
        compact_view(&mut view, removed);
        arena.get_mut(id).view = Some(view);
    }

    let children = arena.get(id).children.clone();
    for child in children {
        apply(arena, child, removed);
    }
}

fn compact_dependency(deps: &mut Dependency, removed: &[u32]) {
    deps.mask = compact_mask(deps.mask, removed);
    deps.write_mask = compact_mask(deps.write_mask, removed);
}

fn compact_view(particles: &mut [ViewParticle], removed: &[u32]) {
    for particle in particles {
        match particle {
            ViewParticle::Element(el) => {
                for attr in &mut el.attributes {
                    if let AttrValue::Dynamic(dyn_attr) = &mut attr.value {
                        if let Some(deps) = &mut dyn_attr.deps {
                            compact_dependency(deps, removed);
                        }
                    }
                }
                compact_view(&mut el.children, removed);
            }
            ViewParticle::Component(comp) => {
                for attr in &mut comp.attributes {
                    if let AttrValue::Dynamic(dyn_attr) = &mut attr.value {
                        if let Some(deps) = &mut dyn_attr.deps {
                            compact_dependency(deps, removed);
                        }
                    }
                }
                compact_view(&mut comp.children, removed);
            }
            ViewParticle::Expression(expr) => {
                if let Some(deps) = &mut expr.deps {
                    compact_dependency(deps, removed);
                }
            }
            ViewParticle::Conditional(cond) => {
                if let Some(deps) = &mut cond.deps {
                    compact_dependency(deps, removed);
                }
                compact_view(&mut cond.consequent, removed);
                compact_view(&mut cond.alternate, removed);
            }
            ViewParticle::Loop(lp) => {
                if let Some(deps) = &mut lp.deps {
                    compact_dependency(deps, removed);
                }
                compact_view(&mut lp.body, removed);
            }
            ViewParticle::Env(env) => {
                if let Some(value) = &mut env.value {
                    if let Some(deps) = &mut value.deps {
                        compact_dependency(deps, removed);
                    }
                }
                compact_view(&mut env.children, removed);
            }
            ViewParticle::Text(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compact_identity_when_nothing_removed() {
        assert_eq!(compact_mask(0b1011, &[]), 0b1011);
    }

    #[test]
    fn test_compact_shifts_higher_bits_down() {
        // Remove position 1: bit 0 stays, bit 2 -> 1, bit 3 -> 2.
        assert_eq!(compact_mask(0b1101, &[1]), 0b111);
        // Removing a position the mask holds drops it.
        assert_eq!(compact_mask(0b0010, &[1]), 0);
    }

    #[test]
    fn test_compact_multiple_positions() {
        // Bits {0,2,4,5}, remove {0,2}: 4 -> 2, 5 -> 3.
        assert_eq!(compact_mask(0b11_0101, &[0, 2]), 0b1100);
    }

    #[test]
    fn test_compact_is_idempotent_for_recomputed_removed_set() {
        let mask = 0b1_0110_1001u64;
        let removed = [3u32, 5];
        let once = compact_mask(mask, &removed);
        // Recomputing the removed set from the compacted input yields no
        // positions, so a second pass is the identity.
        assert_eq!(compact_mask(once, &[]), once);
    }
}
