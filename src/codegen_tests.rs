#[cfg(test)]
mod tests {
    use crate::compile::{compile_program, CompileOptions};
    use crate::diagnostics::WARN_SELF_DEPENDENCY;

    fn compile_one(source: &str) -> String {
        let output = compile_program(source, &CompileOptions::default());
        assert!(
            output.errors.is_empty(),
            "unexpected errors: {:?}",
            output.errors
        );
        assert_eq!(output.components.len(), 1);
        output.components[0].code.clone()
    }

    #[test]
    fn test_pruned_component_update_is_a_noop() {
        let code = compile_one(
            r#"
export const Idle = component(() => {
  let unused = 0;
  return <p>static</p>;
});
"#,
        );
        // The dead statement stays in the setup region...
        assert!(code.contains("let unused = 0;"));
        // ...but no update block ever fires.
        assert!(!code.contains("__bits &"));
    }

    #[test]
    fn test_derived_recompute_runs_under_its_dependency_mask() {
        let code = compile_one(
            r#"
export const App = component(() => {
  let count = 0;
  let double = count * 2;
  return <div>{double}</div>;
});
"#,
        );
        assert!(code.contains("if (__bits & 1) {"));
        assert!(code.contains("if (__pulse.changed(__ctx, 0, [count])) {"));
        assert!(code.contains("double = (count * 2);"));
        // The view expression re-evaluates on either bit of the chain.
        assert!(code.contains("if (__bits & 3) {"));
        assert!(code.contains("__pulse.refresh(__n0);"));
    }

    #[test]
    fn test_equal_dependency_sets_share_one_cache_check() {
        let code = compile_one(
            r#"
export const Stats = component(() => {
  let list = [1, 2];
  let total = list.length;
  let twice = list.length * 2;
  effect(() => { console.log(total, twice); });
  return <div>{total}{twice}</div>;
});
"#,
        );
        // total and twice share the (mask, [list]) group; the watch gets its
        // own slot. Two cache checks in total, never three.
        assert_eq!(code.matches("__pulse.changed").count(), 2);
        assert!(code.contains("if (__pulse.changed(__ctx, 0, [list])) {"));
        assert!(code.contains("if (__pulse.changed(__ctx, 1, [total, twice])) {"));
        assert!(code.contains("total = (list.length);"));
        assert!(code.contains("twice = (list.length * 2);"));
        // Declaration order inside the shared block is preserved.
        let total_pos = code.find("total = (list.length);").unwrap();
        let twice_pos = code.find("twice = (list.length * 2);").unwrap();
        assert!(total_pos < twice_pos);
    }

    #[test]
    fn test_forwarded_prop_emits_writer_under_its_bit() {
        let code = compile_one(
            r#"
export const Parent = component(() => {
  let count = 0;
  const Child = component(({ count }) => {
    return <span>{count}</span>;
  });
  return <div><Child count={count} /><button onClick={() => count++}>+</button></div>;
});
"#,
        );
        // Parent side: mount plus a prop writer guarded by count's bit.
        assert!(code.contains("const __c0 = __pulse.mount(Child, { count: (count) }, []);"));
        assert!(code.contains("if (__bits & 1) {"));
        assert!(code.contains("__c0.updateProp(\"count\", (count));"));
        // The event handler batches its write through the runtime primitive.
        assert!(code.contains("onClick: __pulse.action(__ctx, 1, (() => count++))"));
        // Child side: its prop writer invalidates the child's own slot,
        // which sits after the parent's range.
        assert!(code.contains("function Child(__props) {"));
        assert!(code.contains("let count = __props.count;"));
        assert!(code.contains("__pulse.invalidate(__ctx, 2);"));
    }

    #[test]
    fn test_nested_prop_destructure_retains_dead_leaf_statement() {
        let code = compile_one(
            r#"
export const Picker = component(({ p1, p2: [x, y] }) => {
  return <i>{y}</i>;
});
"#,
        );
        // x is pruned but its statement survives syntactically.
        assert!(code.contains("let p2 = __props.p2;"));
        assert!(code.contains("let [x, y] = p2;"));
        // The group re-destructures under p2's bit behind one cache check.
        assert!(code.contains("if (__pulse.changed(__ctx, 0, [p2])) {"));
        assert!(code.contains("([x, y] = p2);"));
        // p1 is pruned, so only p2's case invalidates.
        assert_eq!(code.matches("__pulse.invalidate").count(), 1);
        assert!(code.contains("__pulse.invalidate(__ctx, 1);"));
    }

    #[test]
    fn test_hook_instantiation_and_argument_forwarding() {
        let code = compile_one(
            r#"
export const Tracker = component(() => {
  let page = "home";
  const geo = useGeo(page);
  return <em>{geo.city}</em>;
});
"#,
        );
        assert!(code.contains("const __h0 = __pulse.hook(useGeo, [(page)], 2);"));
        assert!(code.contains("let geo = __h0.value;"));
        assert!(code.contains("__h0.updateProp(0, (page), [page], __bits);"));
        // The hook result re-syncs under its own bit or any argument bit.
        assert!(code.contains("if (__bits & 3) {"));
        assert!(code.contains("geo = __h0.value;"));
    }

    #[test]
    fn test_side_effect_hook_reclaims_its_bit_but_still_forwards_arguments() {
        let code = compile_one(
            r#"
export const Title = component(() => {
  let name = "x";
  useTitle(name);
  return <p>{name}</p>;
});
"#,
        );
        // No result binding observes the hook, so its slot compacts away...
        assert!(code.contains("const __h0 = __pulse.hook(useTitle, [(name)], 0);"));
        // ...while argument changes still forward under name's bit.
        assert!(code.contains("__h0.updateProp(0, (name), [name], __bits);"));
    }

    #[test]
    fn test_conditional_fragment_refreshes_on_any_inner_bit() {
        let code = compile_one(
            r#"
export const Gate = component(({ open }) => {
  return <div>{open ? <b>yes</b> : <i>no</i>}</div>;
});
"#,
        );
        assert!(code.contains("__pulse.branch(() => (open) ?"));
        assert!(code.contains("case \"open\": {"));
        assert!(code.contains("__pulse.invalidate(__ctx, 1);"));
    }

    #[test]
    fn test_loop_lowering_and_mutating_method_instrumentation() {
        let code = compile_one(
            r#"
export const Todo = component(() => {
  let items = [];
  const add = () => items.push(1);
  return <ul>{items.map((i) => <li>{i}</li>)}</ul>;
});
"#,
        );
        // push() classifies items as a write; the helper batches it.
        assert!(code.contains("const add = __pulse.action(__ctx, 1, (() => items.push(1)));"));
        assert!(code.contains(
            "__pulse.each(() => (items), (i) => __pulse.fragment([__pulse.element(\"li\", {}, [__pulse.expr(() => (i))])]))"
        ));
        assert!(code.contains("__pulse.refresh(__n0);"));
    }

    #[test]
    fn test_self_dependent_watch_is_diagnosed_and_never_self_schedules() {
        let output = compile_program(
            r#"
export const Loopy = component(() => {
  let n = 0;
  effect(() => { n = n + 1; });
  return <p>{n}</p>;
});
"#,
            &CompileOptions::default(),
        );
        assert!(output.errors.is_empty());
        assert!(output
            .diagnostics
            .iter()
            .any(|d| d.code == WARN_SELF_DEPENDENCY));
        let code = &output.components[0].code;
        // With the read dropped, the effect runs once at mount and its write
        // still goes through the batching primitive.
        assert!(code.contains("mount: [__pulse.action(__ctx, 1, (() => { n = n + 1; }))],"));
    }

    #[test]
    fn test_rest_prop_and_update_prop_switch() {
        let code = compile_one(
            r#"
export const Field = component(({ label, ...rest }) => {
  return <label>{label}</label>;
});
"#,
        );
        assert!(code.contains("let rest = __pulse.rest(__props, [\"label\"]);"));
        assert!(code.contains("case \"label\": {"));
        assert!(code.contains("label = __value;"));
        assert!(code.contains("rest[__name] = __value;"));
    }

    #[test]
    fn test_env_provider_lowering() {
        let code = compile_one(
            r#"
export const Themed = component(() => {
  let theme = "dark";
  return <Theme.Provider value={theme}><p>hi</p></Theme.Provider>;
});
"#,
        );
        assert!(code.contains("__pulse.env(\"Theme\", () => (theme), "));
        assert!(code.contains("if (__bits & 1) {"));
        assert!(code.contains("__pulse.refresh(__n0);"));
    }

    #[test]
    fn test_explicit_watch_deps_guard_the_callback() {
        let code = compile_one(
            r#"
export const W = component(() => {
  let a = 1;
  let b = 2;
  effect(() => { console.log(a); }, [a, b]);
  return <p>x</p>;
});
"#,
        );
        assert!(code.contains("if (__bits & 3) {"));
        assert!(code.contains("if (__pulse.changed(__ctx, 0, [a, b])) {"));
        assert!(code.contains("(() => { console.log(a); })();"));
    }
}
