//! Evaluate a few expressions against a catalog, with a host extension
//! function and a bound variable.
use std::sync::Arc;
use stylepath_xpath::engine::fixup;
use stylepath_xpath::{
    Context, ExpandedName, Expr, ExtensionRegistry, NodeTest, Result, Step, Value, VariableStack, attr, doc,
    elem, evaluate, text,
};
use tracing_subscriber::EnvFilter;

const HOST_NS: &str = "urn:example:host";

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let tree = doc()
        .child(
            elem("catalog")
                .child(elem("book").attr(attr("price", "12.5")).child(text("Dune")))
                .child(elem("book").attr(attr("price", "30")).child(text("Hyperion")))
                .child(elem("book").attr(attr("price", "8")).child(text("Solaris"))),
        )
        .build();

    let mut registry = ExtensionRegistry::new();
    registry.register_ns(HOST_NS, "upper", 1, |_, args| {
        Ok(Value::String(args[0].as_string()?.to_uppercase()))
    });

    let mut vars = VariableStack::new();
    let budget = vars.declare_global("budget");
    vars.set_global(budget, Value::Number(15.0))?;

    let books = || {
        Expr::root_path(vec![
            Step::descendant_or_self(),
            Step::child(NodeTest::name("book")),
        ])
    };
    let price = || Expr::path(vec![Step::attribute(NodeTest::name("price"))]);
    let mut queries = vec![
        ("count(//book)", Expr::call("count", vec![books()])),
        ("sum(//book/@price)", Expr::call(
            "sum",
            vec![Expr::root_path(vec![
                Step::descendant_or_self(),
                Step::child(NodeTest::name("book")),
                Step::attribute(NodeTest::name("price")),
            ])],
        )),
        (
            "count(//book[@price < $budget])",
            Expr::call(
                "count",
                vec![Expr::root_path(vec![
                    Step::descendant_or_self(),
                    Step::child(NodeTest::name("book")).with_predicate(Expr::lt(price(), Expr::var("budget"))),
                ])],
            ),
        ),
        (
            "host:upper(//book[last()])",
            Expr::call_ext(
                ExpandedName::ns(HOST_NS, "upper"),
                vec![Expr::filter(books(), vec![Expr::call("last", vec![])])],
            ),
        ),
    ];

    let declared = vars.declared_names();
    for (_, expr) in &mut queries {
        fixup(expr, &declared, vars.global_count())?;
    }

    let mut ctx = Context::builder(Arc::clone(&tree), &mut vars)
        .with_extensions(&registry)
        .build()?;
    for (source, expr) in &queries {
        let value = evaluate(expr, &mut ctx)?;
        println!("{source:<36} => {}", value.as_string()?);
        value.detach();
    }
    Ok(())
}
