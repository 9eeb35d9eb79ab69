mod common;

use common::{catalog, element};
use rstest::rstest;
use std::sync::Arc;
use stylepath_xpath::engine::UnresolvedVariablePolicy;
use stylepath_xpath::{
    Axis, Context, ErrorCode, EvalConfig, ExpandedName, Expr, NodeSet, Step, Tree, Value, VariableRef,
    VariableSlot, VariableStack, evaluate, fixup, NodeTest,
};

fn names(list: &[&str]) -> Vec<ExpandedName> {
    list.iter().copied().map(ExpandedName::from).collect()
}

#[rstest]
#[case("x", VariableSlot::Global(0))]
#[case("y", VariableSlot::Local(0))]
#[case("z", VariableSlot::Local(1))]
fn fixup_splits_globals_and_locals(#[case] name: &str, #[case] slot: VariableSlot) {
    let mut r = VariableRef::new(name);
    assert!(!r.is_bound());
    r.fixup(&names(&["x", "y", "z"]), 1).unwrap();
    assert_eq!(r.slot(), slot);
}

#[rstest]
fn fixup_without_declaration_fails() {
    let mut r = VariableRef::new("q");
    let err = r.fixup(&names(&["x", "y", "z"]), 1).unwrap_err();
    assert_eq!(err.code, ErrorCode::Fixup);
    assert!(!r.is_bound());
}

#[rstest]
fn namespaced_names_do_not_collide() {
    let declared = vec![ExpandedName::ns("urn:a", "v"), ExpandedName::local("v")];
    let mut r = VariableRef::new(ExpandedName::ns("urn:a", "v"));
    r.fixup(&declared, 2).unwrap();
    assert_eq!(r.slot(), VariableSlot::Global(0));
}

#[rstest]
fn fixup_pass_binds_every_reference_in_an_expression() {
    let mut expr = Expr::and(
        Expr::eq(Expr::var("x"), Expr::number(1.0)),
        Expr::call("string", vec![Expr::var("z")]),
    );
    fixup(&mut expr, &names(&["x", "y", "z"]), 1).unwrap();
    let mut slots = Vec::new();
    expr.walk_variables(&mut |v| slots.push(v.slot()));
    assert_eq!(slots, [VariableSlot::Global(0), VariableSlot::Local(1)]);

    let mut broken = Expr::union(Expr::var("x"), Expr::var("missing"));
    assert_eq!(
        fixup(&mut broken, &names(&["x"]), 1).unwrap_err().code,
        ErrorCode::Fixup
    );
}

/// Globals `g`, then a frame with locals `a`, `b`.
fn populated() -> VariableStack {
    let mut stack = VariableStack::new();
    let g = stack.declare_global("g");
    stack.set_global(g, Value::string("global")).unwrap();
    stack.push_frame();
    stack.declare_local("a", Value::Number(1.0)).unwrap();
    stack.declare_local("b", Value::Number(2.0)).unwrap();
    stack
}

#[rstest]
#[case("g")]
#[case("a")]
#[case("b")]
fn indexed_and_by_name_resolution_agree(#[case] name: &str) {
    let stack = populated();
    let declared = stack.declared_names();
    let unbound = VariableRef::new(name);
    let mut bound = unbound.clone();
    bound.fixup(&declared, stack.global_count()).unwrap();
    let by_name = stack.resolve(&unbound).unwrap();
    let by_index = stack.resolve(&bound).unwrap();
    assert!(by_name.equals(&by_index).unwrap());
    assert_eq!(by_name.type_name(), by_index.type_name());
}

#[rstest]
fn locals_are_frame_relative() {
    let mut stack = populated();
    let mut b = VariableRef::new("b");
    b.fixup(&stack.declared_names(), stack.global_count()).unwrap();
    assert_eq!(b.slot(), VariableSlot::Local(1));

    stack.push_frame();
    stack.declare_local("a", Value::Number(10.0)).unwrap();
    stack.declare_local("b", Value::Number(20.0)).unwrap();
    assert_eq!(stack.resolve(&b).unwrap().as_number().unwrap(), 20.0);
    stack.pop_frame();
    assert_eq!(stack.resolve(&b).unwrap().as_number().unwrap(), 2.0);
}

#[rstest]
fn inner_declarations_shadow_outer_ones() {
    let mut stack = populated();
    stack.declare_local("g", Value::string("local")).unwrap();
    let mut r = VariableRef::new("g");
    r.fixup(&stack.declared_names(), stack.global_count()).unwrap();
    assert_eq!(r.slot(), VariableSlot::Local(2));
    assert_eq!(stack.resolve(&r).unwrap().as_string().unwrap(), "local");
    assert_eq!(
        stack.resolve(&VariableRef::new("g")).unwrap().as_string().unwrap(),
        "local"
    );
}

#[rstest]
fn dynamic_bindings_resolve_by_name_only() {
    let mut stack = populated();
    stack.declare_dynamic("late", Value::Boolean(true)).unwrap();
    assert!(stack.resolve(&VariableRef::new("late")).unwrap().as_boolean().unwrap());
    assert!(!stack.declared_names().contains(&ExpandedName::local("late")));
}

#[rstest]
fn declared_but_unset_global_is_unresolved() {
    let mut stack = VariableStack::new();
    stack.declare_global("pending");
    let err = stack.resolve(&VariableRef::new("pending")).unwrap_err();
    assert_eq!(err.code, ErrorCode::UnresolvedVariable);
    let mut bound = VariableRef::new("pending");
    bound.fixup(&stack.declared_names(), 1).unwrap();
    assert_eq!(stack.resolve(&bound).unwrap_err().code, ErrorCode::UnresolvedVariable);
}

#[rstest]
fn stored_node_sets_do_not_pin_iterators(catalog: Arc<Tree>) {
    let mut stack = VariableStack::new();
    let it = catalog
        .axis_iterator(element(&catalog, "catalog"), Axis::Child, None)
        .unwrap();
    stack.declare_local("kids", Value::NodeSet(NodeSet::lazy(it))).unwrap();
    assert_eq!(catalog.live_iterators(), 0);
    let kids = stack.resolve(&VariableRef::new("kids")).unwrap();
    assert_eq!(kids.as_node_set().unwrap().len().unwrap(), 5);
}

#[rstest]
fn variables_feed_evaluation(catalog: Arc<Tree>) {
    let mut stack = VariableStack::new();
    let i = stack.declare_global("wanted");
    stack.set_global(i, Value::string("b2")).unwrap();
    // //book[@id = $wanted]/title
    let mut expr = Expr::root_path(vec![
        Step::descendant_or_self(),
        Step::child(NodeTest::name("book")).with_predicate(Expr::eq(
            Expr::path(vec![Step::attribute(NodeTest::name("id"))]),
            Expr::var("wanted"),
        )),
        Step::child(NodeTest::name("title")),
    ]);
    fixup(&mut expr, &stack.declared_names(), stack.global_count()).unwrap();
    let mut ctx = Context::builder(Arc::clone(&catalog), &mut stack).build().unwrap();
    let v = evaluate(&expr, &mut ctx).unwrap();
    assert_eq!(v.as_string().unwrap(), "Beta");
}

#[rstest]
fn unresolved_variables_follow_the_configured_policy(catalog: Arc<Tree>) {
    let expr = Expr::call("count", vec![Expr::var("nowhere")]);
    let mut stack = VariableStack::new();
    let mut ctx = Context::builder(Arc::clone(&catalog), &mut stack).build().unwrap();
    assert_eq!(
        evaluate(&expr, &mut ctx).unwrap_err().code,
        ErrorCode::UnresolvedVariable
    );

    let lenient = EvalConfig::builder()
        .with_unresolved_variables(UnresolvedVariablePolicy::EmptyNodeSet)
        .build();
    let mut stack = VariableStack::new();
    let mut ctx = Context::builder(Arc::clone(&catalog), &mut stack)
        .with_config(lenient)
        .build()
        .unwrap();
    assert_eq!(evaluate(&expr, &mut ctx).unwrap().as_number().unwrap(), 0.0);
}

#[rstest]
fn generation_tracks_scope_changes() {
    let mut stack = VariableStack::new();
    let g0 = stack.generation();
    stack.push_frame();
    let g1 = stack.generation();
    stack.pop_frame();
    assert!(g0 < g1 && g1 < stack.generation());
}
