#[cfg(test)]
mod tests {
    use crate::compile::{analyze, Analysis};
    use crate::diagnostics::{ERR_MACRO_ARG, ERR_PARAM_NOT_PATTERN, WARN_UNRESOLVED_REF};
    use crate::ir::{BindingKind, ComponentId, LocalKind, Stmt};

    fn analyze_ok(source: &str) -> (Analysis, ComponentId) {
        let analysis = analyze(source, "test.jsx");
        assert!(
            analysis.errors.is_empty(),
            "unexpected errors: {:?}",
            analysis.errors
        );
        assert!(!analysis.roots.is_empty(), "no components recognized");
        let root = analysis.roots[0];
        (analysis, root)
    }

    #[test]
    fn test_classifies_raw_state_derived() {
        let source = r##"
export const App = component(() => {
  const fmt = (n) => "#" + n;
  let count = 0;
  let double = count * 2;
  return <div>{double}</div>;
});
"##;
        let (analysis, root) = analyze_ok(source);
        let comp = analysis.arena.get(root);

        assert_eq!(comp.scope.locals.get("fmt"), Some(&LocalKind::Raw));
        assert!(!comp.scope.by_name.contains_key("fmt"));

        let count = &comp.scope.bindings[comp.scope.by_name["count"]];
        assert_eq!(count.kind, BindingKind::State);
        assert_eq!(count.reactive_id, 0);

        let double = &comp.scope.bindings[comp.scope.by_name["double"]];
        assert_eq!(double.kind, BindingKind::Derived);
        assert_eq!(double.reactive_id, 1);
        // Accumulated mask: own bit plus everything the initializer reads.
        assert_eq!(double.mask, 0b11);

        let derived = comp
            .statements
            .iter()
            .find_map(|s| match s {
                Stmt::Derived { deps, .. } => Some(deps),
                _ => None,
            })
            .expect("derived statement recorded");
        assert_eq!(derived.reads.len(), 1);
        assert_eq!(derived.reads[0].name, "count");
    }

    #[test]
    fn test_non_pattern_first_param_is_fatal_for_that_component_only() {
        let source = r#"
export const Bad = component((props) => {
  return <div />;
});
export const Good = component(() => {
  return <div />;
});
"#;
        let analysis = analyze(source, "test.jsx");
        assert_eq!(analysis.errors.len(), 1);
        assert_eq!(analysis.errors[0].code, ERR_PARAM_NOT_PATTERN);
        // The sibling still compiles.
        assert_eq!(analysis.roots.len(), 1);
        assert_eq!(analysis.arena.get(analysis.roots[0]).name, "Good");
    }

    #[test]
    fn test_macro_without_function_argument_is_fatal() {
        let source = r#"
export const App = component(() => {
  effect(42);
  return <div />;
});
"#;
        let analysis = analyze(source, "test.jsx");
        assert_eq!(analysis.errors.len(), 1);
        assert_eq!(analysis.errors[0].code, ERR_MACRO_ARG);
        assert!(analysis.roots.is_empty());
    }

    #[test]
    fn test_watch_with_explicit_dependency_list() {
        let source = r#"
export const App = component(() => {
  let a = 1;
  let b = 2;
  effect(() => { console.log(a); }, [a, b]);
  return <p>x</p>;
});
"#;
        let (analysis, root) = analyze_ok(source);
        let comp = analysis.arena.get(root);
        assert_eq!(comp.watches.len(), 1);
        let Stmt::Watch { deps, explicit, .. } = &comp.statements[comp.watches[0]] else {
            panic!("watch statement expected");
        };
        assert!(*explicit);
        let deps = deps.as_ref().expect("explicit deps recorded");
        // Both a and b survive through the explicit list, bits 0 and 1.
        assert_eq!(deps.mask, 0b11);
        let names: Vec<&str> = deps.reads.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_lifecycle_macros_are_recorded() {
        let source = r#"
export const App = component(() => {
  let n = 0;
  onMount(() => { n = 1; });
  onCleanup(() => { console.log("bye"); });
  return <p>{n}</p>;
});
"#;
        let (analysis, root) = analyze_ok(source);
        let comp = analysis.arena.get(root);
        assert_eq!(comp.lifecycles.len(), 2);
        let Stmt::Lifecycle { write_mask, .. } = &comp.statements[comp.lifecycles[0]] else {
            panic!("lifecycle statement expected");
        };
        // The mount block writes `n`, which the view observes.
        assert_eq!(*write_mask, 1);
    }

    #[test]
    fn test_unresolved_reference_is_warning_not_error() {
        let source = r#"
export const App = component(() => {
  let x = window.innerWidth + offsetGlobal;
  return <p>{x}</p>;
});
"#;
        let (analysis, root) = analyze_ok(source);
        let warning = analysis
            .diagnostics
            .iter()
            .find(|d| d.code == WARN_UNRESOLVED_REF)
            .expect("unresolved reference warning");
        assert!(warning.message.contains("offsetGlobal"));
        // `window` is a known global and stays silent; `x` still counts as
        // plain state.
        assert_eq!(
            analysis
                .diagnostics
                .iter()
                .filter(|d| d.code == WARN_UNRESOLVED_REF)
                .count(),
            1
        );
        let comp = analysis.arena.get(root);
        let x = &comp.scope.bindings[comp.scope.by_name["x"]];
        assert_eq!(x.kind, BindingKind::State);
    }

    #[test]
    fn test_nested_component_builds_as_child_node() {
        let source = r#"
export const Outer = component(() => {
  let shared = 0;
  const Inner = component(() => {
    return <p>{shared}</p>;
  });
  return <div><Inner /></div>;
});
"#;
        let (analysis, root) = analyze_ok(source);
        let comp = analysis.arena.get(root);
        assert_eq!(comp.children.len(), 1);
        assert_eq!(comp.scope.locals.get("Inner"), Some(&LocalKind::SubComponent));

        let child = analysis.arena.get(comp.children[0]);
        assert_eq!(child.name, "Inner");
        assert_eq!(child.parent, Some(root));
        // The child allocated no bits of its own; it reads the parent's.
        assert!(child.scope.bindings.is_empty());
    }
}
