//! Pick the most specific template rule for every node of a small
//! document, the way a transformation engine dispatches `apply-templates`.
//!
//! Run with `RUST_LOG=stylepath_xpath=trace` to see pattern scoring.
use std::sync::Arc;
use stylepath_xpath::{
    Context, EvalConfig, Expr, NodeTest, PathPattern, Pattern, PatternMatcher, PatternScore, Result, Step,
    StepPattern, VariableStack, attr, doc, elem, elem_ns, ns, text,
};
use tracing_subscriber::EnvFilter;

const DOC_NS: &str = "urn:example:doc";

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let tree = doc()
        .child(
            elem("article")
                .namespace(ns("d", DOC_NS))
                .child(elem("title").child(text("Patterns")))
                .child(
                    elem("section")
                        .attr(attr("role", "intro"))
                        .child(elem("para").child(text("first"))),
                )
                .child(
                    elem("section")
                        .child(elem("para").child(text("second")))
                        .child(elem_ns(DOC_NS, "d:aside").child(text("note"))),
                ),
        )
        .build();

    let rules: Vec<(&str, Pattern)> = vec![
        ("any-node", Pattern::from(StepPattern::child(NodeTest::AnyNode))),
        ("any-element", Pattern::from(StepPattern::child(NodeTest::AnyName))),
        ("para", Pattern::from(StepPattern::child(NodeTest::name("para")))),
        (
            "intro-para",
            Pattern::from(
                PathPattern::step(StepPattern::child(NodeTest::name("section")).with_predicate(Expr::eq(
                    Expr::path(vec![Step::attribute(NodeTest::name("role"))]),
                    Expr::literal("intro"),
                )))
                .child(StepPattern::child(NodeTest::name("para"))),
            ),
        ),
        ("doc-namespace", Pattern::from(StepPattern::child(NodeTest::ns_wildcard(DOC_NS)))),
        ("root", Pattern::from(PathPattern::root())),
    ];

    let mut vars = VariableStack::new();
    let config = EvalConfig::default();
    let mut ctx = Context::builder(Arc::clone(&tree), &mut vars)
        .with_config(config)
        .build()?;
    let mut matcher = PatternMatcher::new(&config);

    let all: Vec<_> = tree
        .axis_iterator(tree.root(), stylepath_xpath::Axis::DescendantOrSelf, None)?
        .collect();
    for node in all {
        let scores = matcher.score_all(rules.iter().map(|(_, p)| p), node, &mut ctx)?;
        // highest score wins; later rules win ties
        let best = scores
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_match())
            .max_by_key(|(i, s)| (**s, *i))
            .map(|(i, s)| (rules[i].0, *s));
        let label = match tree.node_kind(node)? {
            stylepath_xpath::NodeKind::Text => format!("text {:?}", tree.string_value(node)?),
            _ => tree.qualified_name(node)?.to_string(),
        };
        match best {
            Some((rule, score)) => println!("{label:<16} -> {rule} ({score:?})"),
            None => println!("{label:<16} -> (no rule, {:?})", PatternScore::None),
        }
    }
    println!(
        "cache: {} entries, {} hits",
        matcher.cached_entries(),
        matcher.cache_hits()
    );
    Ok(())
}
