#[cfg(test)]
mod tests {
    use crate::compile::{analyze, Analysis};
    use crate::diagnostics::ERR_BIT_OVERFLOW;
    use crate::ir::{ComponentId, Stmt};

    fn analyze_ok(source: &str) -> (Analysis, ComponentId) {
        let analysis = analyze(source, "test.jsx");
        assert!(
            analysis.errors.is_empty(),
            "unexpected errors: {:?}",
            analysis.errors
        );
        let root = analysis.roots[0];
        (analysis, root)
    }

    fn bit(analysis: &Analysis, id: ComponentId, name: &str) -> u64 {
        let comp = analysis.arena.get(id);
        comp.scope.bindings[comp.scope.by_name[name]].bit
    }

    fn pruned(analysis: &Analysis, id: ComponentId, name: &str) -> bool {
        let comp = analysis.arena.get(id);
        comp.scope.bindings[comp.scope.by_name[name]].pruned
    }

    #[test]
    fn test_unobserved_state_is_pruned() {
        let source = r#"
export const Idle = component(() => {
  let unused = 0;
  return <p>static</p>;
});
"#;
        let (analysis, root) = analyze_ok(source);
        assert!(pruned(&analysis, root, "unused"));
        assert_eq!(bit(&analysis, root, "unused"), 0);
        assert_eq!(analysis.arena.get(root).scope.live, 0);
    }

    #[test]
    fn test_observed_derived_keeps_its_whole_chain() {
        let source = r#"
export const Chain = component(() => {
  let a = 1;
  let b = a;
  return <span>{b}</span>;
});
"#;
        let (analysis, root) = analyze_ok(source);
        // Both survive: a with bit 0, b with bit 1.
        assert_eq!(bit(&analysis, root, "a"), 1 << 0);
        assert_eq!(bit(&analysis, root, "b"), 1 << 1);

        let comp = analysis.arena.get(root);
        let deps = comp
            .statements
            .iter()
            .find_map(|s| match s {
                Stmt::Derived { deps, .. } => Some(deps),
                _ => None,
            })
            .expect("derived statement");
        // b recomputes when a changes.
        assert_eq!(deps.mask, 1 << 0);
    }

    #[test]
    fn test_nested_prop_destructuring_prunes_leaf_by_leaf() {
        let source = r#"
export const Picker = component(({ p1, p2: [x, y] }) => {
  return <i>{y}</i>;
});
"#;
        let (analysis, root) = analyze_ok(source);
        assert!(pruned(&analysis, root, "p1"));
        assert!(pruned(&analysis, root, "x"));
        assert_eq!(bit(&analysis, root, "p2"), 1 << 0);
        assert_eq!(bit(&analysis, root, "y"), 1 << 1);

        let comp = analysis.arena.get(root);
        assert_eq!(comp.scope.live, 2);
        // y's accumulated mask is the surviving bits of {p2, y}.
        assert_eq!(comp.scope.bindings[comp.scope.by_name["y"]].mask, 0b11);
    }

    #[test]
    fn test_live_bits_are_dense_after_interleaved_pruning() {
        let source = r#"
export const Dense = component(() => {
  let a = 1;
  let b = 2;
  let c = 3;
  let d = 4;
  return <p>{b + d}</p>;
});
"#;
        let (analysis, root) = analyze_ok(source);
        assert!(pruned(&analysis, root, "a"));
        assert!(pruned(&analysis, root, "c"));
        assert_eq!(bit(&analysis, root, "b"), 1 << 0);
        assert_eq!(bit(&analysis, root, "d"), 1 << 1);

        let comp = analysis.arena.get(root);
        assert_eq!(comp.scope.base, 0);
        assert_eq!(comp.scope.live, 2);
        let mut live: u64 = 0;
        for binding in &comp.scope.bindings {
            live |= binding.bit;
        }
        // Exactly {0, 1}: no gaps.
        assert_eq!(live, 0b11);
    }

    #[test]
    fn test_destructured_group_shares_one_bit_and_prunes_together() {
        let source = r#"
export const Pair = component(() => {
  let data = fetchData;
  let { m, n } = data;
  return <b>{m}</b>;
});
"#;
        let (analysis, root) = analyze_ok(source);
        let comp = analysis.arena.get(root);
        let m = &comp.scope.bindings[comp.scope.by_name["m"]];
        let n = &comp.scope.bindings[comp.scope.by_name["n"]];
        assert_eq!(m.reactive_id, n.reactive_id);
        assert_eq!(m.bit, n.bit);
        assert_ne!(m.bit, 0);
        // The view reads only m, but n rides along with the group.
        assert!(!n.pruned);
    }

    #[test]
    fn test_child_usage_escapes_upward_and_child_range_follows_parent() {
        let source = r#"
export const Outer = component(() => {
  let shared = 0;
  let local = 0;
  const Inner = component(({ tag }) => {
    return <p>{shared + tag}</p>;
  });
  return <div><Inner tag={local} /></div>;
});
"#;
        let (analysis, root) = analyze_ok(source);
        // `shared` is observed only by the child's view; the escape keeps it.
        assert_eq!(bit(&analysis, root, "shared"), 1 << 0);
        assert_eq!(bit(&analysis, root, "local"), 1 << 1);

        let comp = analysis.arena.get(root);
        let child = analysis.arena.get(comp.children[0]);
        // The child's own range starts after the parent's live count.
        assert_eq!(child.scope.base, 2);
        assert_eq!(child.scope.live, 1);
        assert_eq!(
            child.scope.bindings[child.scope.by_name["tag"]].bit,
            1 << 2
        );
    }

    #[test]
    fn test_more_than_64_bindings_is_a_structural_error() {
        let mut body = String::new();
        for i in 0..65 {
            body.push_str(&format!("  let v{} = {};\n", i, i));
        }
        let source = format!(
            "export const Big = component(() => {{\n{}  return <p>x</p>;\n}});\n",
            body
        );
        let analysis = analyze(&source, "test.jsx");
        assert_eq!(analysis.errors.len(), 1);
        assert_eq!(analysis.errors[0].code, ERR_BIT_OVERFLOW);
    }
}
