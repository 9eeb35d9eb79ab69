mod common;

use common::{NS, catalog, collect, element, elements};
use rstest::rstest;
use std::sync::Arc;
use stylepath_xpath::ast::ArithmeticOp;
use stylepath_xpath::pattern::{PatternTest, score_step};
use stylepath_xpath::{
    Axis, Context, EvalConfig, Expr, NodeHandle, NodeTest, PathPattern, Pattern, PatternMatcher, PatternScore,
    Step, StepPattern, Tree, Value, VariableStack, doc, elem_ns, ns, score_pattern,
};

fn score(tree: &Arc<Tree>, pattern: &Pattern, node: NodeHandle) -> PatternScore {
    let mut stack = VariableStack::new();
    let mut ctx = Context::builder(Arc::clone(tree), &mut stack).build().unwrap();
    score_pattern(pattern, node, &mut ctx).unwrap()
}

fn named(local: &str) -> StepPattern {
    StepPattern::child(NodeTest::name(local))
}

#[rstest]
fn qualified_wildcard_and_miss() {
    let tree = doc()
        .child(
            elem_ns("urn:ns", "ns:root")
                .namespace(ns("ns", "urn:ns"))
                .child(elem_ns("urn:ns", "ns:foo"))
                .child(elem_ns("urn:ns", "ns:bar")),
        )
        .build();
    let foo = collect(&tree, tree.root(), Axis::Descendant, Some(NodeTest::qualified("urn:ns", "foo")))[0];
    let bar = collect(&tree, tree.root(), Axis::Descendant, Some(NodeTest::qualified("urn:ns", "bar")))[0];
    let ns_foo = Pattern::from(StepPattern::child(NodeTest::qualified("urn:ns", "foo")));
    let ns_any = Pattern::from(StepPattern::child(NodeTest::ns_wildcard("urn:ns")));
    assert_eq!(score(&tree, &ns_foo, foo), PatternScore::QualifiedName);
    assert_eq!(score(&tree, &ns_foo, bar), PatternScore::None);
    assert_eq!(score(&tree, &ns_any, foo), PatternScore::NamespaceWildcard);
    assert_eq!(score(&tree, &ns_any, bar), PatternScore::NamespaceWildcard);
}

#[rstest]
fn scores_are_ordered_by_specificity() {
    assert!(PatternScore::None < PatternScore::Other);
    assert!(PatternScore::Other < PatternScore::NamespaceWildcard);
    assert!(PatternScore::NamespaceWildcard < PatternScore::QualifiedName);
    assert!(!PatternScore::None.is_match());
    assert_eq!(PatternScore::default(), PatternScore::None);
}

#[rstest]
#[case(NodeTest::AnyName, PatternScore::Other)]
#[case(NodeTest::AnyNode, PatternScore::Other)]
#[case(NodeTest::name("book"), PatternScore::QualifiedName)]
#[case(NodeTest::name("title"), PatternScore::None)]
#[case(NodeTest::Text, PatternScore::None)]
#[case(NodeTest::qualified(NS, "book"), PatternScore::None)]
fn element_step_scores(catalog: Arc<Tree>, #[case] test: NodeTest, #[case] expected: PatternScore) {
    let book = element(&catalog, "book");
    assert_eq!(score(&catalog, &Pattern::from(StepPattern::child(test)), book), expected);
}

#[rstest]
fn kind_tests(catalog: Arc<Tree>) {
    let root_el = element(&catalog, "catalog");
    let kids = collect(&catalog, root_el, Axis::Child, None);
    let (comment, pi) = (kids[2], kids[3]);
    let text_node = catalog.first_child(element(&catalog, "title")).unwrap();
    let cases = [
        (NodeTest::Comment, comment, PatternScore::Other),
        (NodeTest::Comment, pi, PatternScore::None),
        (NodeTest::ProcessingInstruction(None), pi, PatternScore::Other),
        (NodeTest::ProcessingInstruction(Some("target".into())), pi, PatternScore::QualifiedName),
        (NodeTest::ProcessingInstruction(Some("other".into())), pi, PatternScore::None),
        (NodeTest::Text, text_node, PatternScore::Other),
        (NodeTest::AnyName, text_node, PatternScore::None),
    ];
    for (test, node, expected) in cases {
        let p = Pattern::from(StepPattern::child(test.clone()));
        assert_eq!(score(&catalog, &p, node), expected, "{test:?}");
    }
}

#[rstest]
fn attribute_patterns_only_match_attributes(catalog: Arc<Tree>) {
    let book = element(&catalog, "book");
    let id = collect(&catalog, book, Axis::Attribute, Some(NodeTest::name("id")))[0];
    let at_id = Pattern::from(StepPattern::attribute(NodeTest::name("id")));
    let at_any = Pattern::from(StepPattern::attribute(NodeTest::AnyName));
    assert_eq!(score(&catalog, &at_id, id), PatternScore::QualifiedName);
    assert_eq!(score(&catalog, &at_any, id), PatternScore::Other);
    assert_eq!(score(&catalog, &at_id, book), PatternScore::None);
    // child-axis patterns never match attributes
    assert_eq!(score(&catalog, &Pattern::from(named("id")), id), PatternScore::None);
    assert_eq!(
        score(&catalog, &Pattern::from(StepPattern::child(NodeTest::AnyNode)), id),
        PatternScore::None
    );
}

#[rstest]
fn root_pattern(catalog: Arc<Tree>) {
    let root = Pattern::from(PathPattern::root());
    assert_eq!(score(&catalog, &root, catalog.root()), PatternScore::Other);
    assert_eq!(score(&catalog, &root, element(&catalog, "catalog")), PatternScore::None);
}

#[rstest]
fn compound_paths_score_as_their_last_step(catalog: Arc<Tree>) {
    let titles = elements(&catalog, "title");
    // book/title
    let parent = Pattern::from(PathPattern::step(named("book")).child(named("title")));
    assert_eq!(score(&catalog, &parent, titles[0]), PatternScore::QualifiedName);
    // catalog/title misses: title's parent is a book
    let wrong = Pattern::from(PathPattern::step(named("catalog")).child(named("title")));
    assert_eq!(score(&catalog, &wrong, titles[0]), PatternScore::None);
    // catalog//title
    let ancestor = Pattern::from(PathPattern::step(named("catalog")).descendant(named("title")));
    assert_eq!(score(&catalog, &ancestor, titles[1]), PatternScore::QualifiedName);
    // /catalog/book/*
    let absolute = Pattern::from(
        PathPattern::absolute(named("catalog"))
            .child(named("book"))
            .child(StepPattern::child(NodeTest::AnyName)),
    );
    assert_eq!(score(&catalog, &absolute, titles[0]), PatternScore::Other);
    // /book does not match a nested book
    let top_book = Pattern::from(PathPattern::absolute(named("book")));
    assert_eq!(score(&catalog, &top_book, element(&catalog, "book")), PatternScore::None);
    // //book does
    let any_book = Pattern::from(PathPattern {
        absolute: true,
        steps: vec![(stylepath_xpath::pattern::StepRelation::Ancestor, named("book"))],
    });
    assert_eq!(score(&catalog, &any_book, element(&catalog, "book")), PatternScore::QualifiedName);
}

#[rstest]
fn ancestor_links_backtrack(catalog: Arc<Tree>) {
    // catalog//book/ns:note: the nearest matching ancestor must also satisfy
    // the rest of the chain
    let p = Pattern::from(
        PathPattern::step(named("catalog"))
            .descendant(named("book"))
            .child(StepPattern::child(NodeTest::qualified(NS, "note"))),
    );
    let note = collect(&catalog, catalog.root(), Axis::Descendant, Some(NodeTest::qualified(NS, "note")))[0];
    assert_eq!(score(&catalog, &p, note), PatternScore::QualifiedName);
    let p = Pattern::from(
        PathPattern::step(named("magazine"))
            .descendant(StepPattern::child(NodeTest::qualified(NS, "note"))),
    );
    assert_eq!(score(&catalog, &p, note), PatternScore::None);
}

#[rstest]
fn alternatives_take_the_best_score(catalog: Arc<Tree>) {
    let book = element(&catalog, "book");
    let union = Pattern::new(vec![
        PathPattern::step(StepPattern::child(NodeTest::AnyName)),
        PathPattern::step(named("book")),
        PathPattern::step(named("magazine")),
    ]);
    assert_eq!(score(&catalog, &union, book), PatternScore::QualifiedName);
    assert_eq!(score(&catalog, &union, element(&catalog, "title")), PatternScore::Other);
}

#[rstest]
fn predicates_refine_without_changing_the_score(catalog: Arc<Tree>) {
    let books = elements(&catalog, "book");
    // book[2]
    let second = Pattern::from(named("book").with_predicate(Expr::number(2.0)));
    assert_eq!(score(&catalog, &second, books[0]), PatternScore::None);
    assert_eq!(score(&catalog, &second, books[1]), PatternScore::QualifiedName);
    // book[@price > 20]
    let pricey = Pattern::from(named("book").with_predicate(Expr::gt(
        Expr::path(vec![Step::attribute(NodeTest::name("price"))]),
        Expr::number(20.0),
    )));
    assert_eq!(score(&catalog, &pricey, books[0]), PatternScore::None);
    assert_eq!(score(&catalog, &pricey, books[1]), PatternScore::QualifiedName);
    // *[last()] counts among the element siblings
    let last = Pattern::from(StepPattern::child(NodeTest::AnyName).with_predicate(Expr::call("last", vec![])));
    assert_eq!(score(&catalog, &last, element(&catalog, "magazine")), PatternScore::Other);
    assert_eq!(score(&catalog, &last, books[1]), PatternScore::None);
}

#[rstest]
fn function_tests_match_members(catalog: Arc<Tree>) {
    let books = elements(&catalog, "book");
    // id('b2')
    let by_id = Pattern::from(StepPattern::function(Expr::call("id", vec![Expr::literal("b2")])));
    assert_eq!(score(&catalog, &by_id, books[1]), PatternScore::Other);
    assert_eq!(score(&catalog, &by_id, books[0]), PatternScore::None);
    // id('b1')/title
    let chained = Pattern::from(
        PathPattern::step(StepPattern::function(Expr::call("id", vec![Expr::literal("b1")])))
            .child(named("title")),
    );
    assert_eq!(score(&catalog, &chained, elements(&catalog, "title")[0]), PatternScore::QualifiedName);
    assert_eq!(score(&catalog, &chained, elements(&catalog, "title")[1]), PatternScore::None);
    assert_eq!(catalog.live_iterators(), 0);
}

#[rstest]
fn function_tests_release_lazy_results(catalog: Arc<Tree>) {
    // a variable-free function test evaluated from the candidate node:
    // ../child::book
    let siblings = Pattern::from(StepPattern::function(Expr::path(vec![
        Step::parent(),
        Step::child(NodeTest::name("book")),
    ])));
    let kids = Pattern::from(StepPattern::function(Expr::path(vec![Step::child(NodeTest::AnyName)])));
    let book = element(&catalog, "book");
    assert_eq!(score(&catalog, &siblings, book), PatternScore::Other);
    // child::* from the book itself never contains the book
    assert_eq!(score(&catalog, &kids, book), PatternScore::None);
    assert_eq!(catalog.live_iterators(), 0);
}

#[rstest]
fn function_tests_require_node_sets(catalog: Arc<Tree>) {
    let p = Pattern::from(StepPattern::function(Expr::arith(
        ArithmeticOp::Add,
        Expr::number(1.0),
        Expr::number(1.0),
    )));
    let mut stack = VariableStack::new();
    let mut ctx = Context::builder(Arc::clone(&catalog), &mut stack).build().unwrap();
    let err = score_pattern(&p, element(&catalog, "book"), &mut ctx).unwrap_err();
    assert_eq!(err.code, stylepath_xpath::ErrorCode::UnsupportedConversion);
}

#[rstest]
fn patterns_use_variables(catalog: Arc<Tree>) {
    let mut stack = VariableStack::new();
    let g = stack.declare_global("limit");
    stack.set_global(g, Value::Number(20.0)).unwrap();
    let mut p = Pattern::from(named("book").with_predicate(Expr::lt(
        Expr::path(vec![Step::attribute(NodeTest::name("price"))]),
        Expr::var("limit"),
    )));
    p.fixup_variables(&stack.declared_names(), stack.global_count()).unwrap();
    let mut ctx = Context::builder(Arc::clone(&catalog), &mut stack).build().unwrap();
    let books = elements(&catalog, "book");
    assert_eq!(score_pattern(&p, books[0], &mut ctx).unwrap(), PatternScore::QualifiedName);
    assert_eq!(score_pattern(&p, books[1], &mut ctx).unwrap(), PatternScore::None);
}

#[rstest]
fn context_focus_is_restored(catalog: Arc<Tree>) {
    let title = element(&catalog, "title");
    let mut stack = VariableStack::new();
    let mut ctx = Context::builder(Arc::clone(&catalog), &mut stack)
        .with_context_node(title)
        .build()
        .unwrap();
    let p = Pattern::from(named("book").with_predicate(Expr::number(1.0)));
    score_pattern(&p, element(&catalog, "book"), &mut ctx).unwrap();
    assert_eq!(ctx.context_node(), title);
    assert_eq!((ctx.position(), ctx.size()), (1, 1));
}

#[rstest]
fn single_steps_score_directly(catalog: Arc<Tree>) {
    let mut stack = VariableStack::new();
    let mut ctx = Context::builder(Arc::clone(&catalog), &mut stack).build().unwrap();
    let step = StepPattern::new(Axis::Child, PatternTest::Node(NodeTest::ns_wildcard(NS)));
    let note = collect(&catalog, catalog.root(), Axis::Descendant, Some(NodeTest::qualified(NS, "note")))[0];
    assert_eq!(
        score_step(&catalog, &step, note, &mut ctx).unwrap(),
        PatternScore::NamespaceWildcard
    );
}

#[rstest]
fn invalid_candidates_are_rejected(catalog: Arc<Tree>) {
    let mut stack = VariableStack::new();
    let mut ctx = Context::builder(Arc::clone(&catalog), &mut stack).build().unwrap();
    let err = score_pattern(&Pattern::from(named("book")), NodeHandle::NULL, &mut ctx).unwrap_err();
    assert_eq!(err.code, stylepath_xpath::ErrorCode::InvalidNodeHandle);
}

#[rstest]
fn matcher_caches_until_state_changes(catalog: Arc<Tree>) {
    let books = elements(&catalog, "book");
    let patterns = [
        Pattern::from(named("book")),
        Pattern::from(StepPattern::child(NodeTest::AnyName)),
        Pattern::from(named("magazine")),
    ];
    let mut matcher = PatternMatcher::new(&EvalConfig::default());
    let mut stack = VariableStack::new();
    {
        let mut ctx = Context::builder(Arc::clone(&catalog), &mut stack).build().unwrap();
        let scores = matcher.score_all(&patterns, books[0], &mut ctx).unwrap();
        assert_eq!(
            scores,
            [PatternScore::QualifiedName, PatternScore::Other, PatternScore::None]
        );
        assert_eq!(matcher.cached_entries(), 3);
        matcher.score_all(&patterns, books[0], &mut ctx).unwrap();
        assert_eq!(matcher.cache_hits(), 3);
    }
    // a variable mutation flushes the cache
    stack.declare_dynamic("x", Value::Boolean(true)).unwrap();
    {
        let mut ctx = Context::builder(Arc::clone(&catalog), &mut stack).build().unwrap();
        matcher.score(&patterns[0], books[0], &mut ctx).unwrap();
        assert_eq!(matcher.cache_hits(), 3);
        assert_eq!(matcher.cached_entries(), 1);
    }
    // so does switching trees
    let other = common::catalog();
    {
        let mut ctx = Context::builder(Arc::clone(&other), &mut stack).build().unwrap();
        let other_book = elements(&other, "book")[0];
        assert_eq!(
            matcher.score(&patterns[0], other_book, &mut ctx).unwrap(),
            PatternScore::QualifiedName
        );
        assert_eq!(matcher.cached_entries(), 1);
        assert_eq!(matcher.cache_hits(), 3);
    }
    matcher.clear();
    assert_eq!(matcher.cached_entries(), 0);
}

#[rstest]
fn disabled_cache_still_scores(catalog: Arc<Tree>) {
    let config = EvalConfig::builder().with_score_cache_capacity(0).build();
    let mut matcher = PatternMatcher::new(&config);
    let mut stack = VariableStack::new();
    let mut ctx = Context::builder(Arc::clone(&catalog), &mut stack).build().unwrap();
    let p = Pattern::from(named("magazine"));
    let magazine = element(&catalog, "magazine");
    assert_eq!(matcher.score(&p, magazine, &mut ctx).unwrap(), PatternScore::QualifiedName);
    assert_eq!(matcher.score(&p, magazine, &mut ctx).unwrap(), PatternScore::QualifiedName);
    assert_eq!(matcher.cached_entries(), 0);
    assert_eq!(matcher.cache_hits(), 0);
    let mut plain = PatternMatcher::uncached();
    assert_eq!(plain.score(&p, magazine, &mut ctx).unwrap(), PatternScore::QualifiedName);
}

#[rstest]
fn cloned_patterns_share_cache_identity(catalog: Arc<Tree>) {
    let p = Pattern::from(named("book"));
    let q = p.clone();
    assert_eq!(p.id(), q.id());
    assert_ne!(p.id(), Pattern::from(named("book")).id());
    let mut matcher = PatternMatcher::new(&EvalConfig::default());
    let mut stack = VariableStack::new();
    let mut ctx = Context::builder(Arc::clone(&catalog), &mut stack).build().unwrap();
    let book = element(&catalog, "book");
    matcher.score(&p, book, &mut ctx).unwrap();
    matcher.score(&q, book, &mut ctx).unwrap();
    assert_eq!(matcher.cache_hits(), 1);
}
