#![allow(dead_code)]

use rstest::fixture;
use std::sync::Arc;
use stylepath_xpath::model::XML_NS;
use stylepath_xpath::{
    Axis, Context, EvalConfig, Expr, NodeHandle, NodeTest, Result, Tree, Value, VariableStack, attr,
    attr_ns, comment, doc, elem, elem_ns, evaluate, ns, pi, text,
};

pub const NS: &str = "urn:stylepath:test";

/// ```xml
/// <catalog xmlns:ns="urn:stylepath:test" xml:lang="en-GB">
///   <book id="b1" price="10"><title>Alpha</title><ns:note>n1</ns:note></book>
///   <book id="b2" price="32"><title>Beta</title></book>
///   <!--c-->
///   <?target data?>
///   <magazine id="m1">42</magazine>
/// </catalog>
/// ```
#[fixture]
pub fn catalog() -> Arc<Tree> {
    doc()
        .child(
            elem("catalog")
                .namespace(ns("ns", NS))
                .attr(attr_ns(XML_NS, "xml:lang", "en-GB"))
                .child(
                    elem("book")
                        .attr(attr("id", "b1"))
                        .attr(attr("price", "10"))
                        .child(elem("title").child(text("Alpha")))
                        .child(elem_ns(NS, "ns:note").child(text("n1"))),
                )
                .child(
                    elem("book")
                        .attr(attr("id", "b2"))
                        .attr(attr("price", "32"))
                        .child(elem("title").child(text("Beta"))),
                )
                .child(comment("c"))
                .child(pi("target", "data"))
                .child(elem("magazine").attr(attr("id", "m1")).child(text("42"))),
        )
        .build()
}

/// Every node on `axis` from `start`, in axis order.
pub fn collect(tree: &Arc<Tree>, start: NodeHandle, axis: Axis, test: Option<NodeTest>) -> Vec<NodeHandle> {
    let mut it = tree.axis_iterator(start, axis, test).unwrap();
    let out: Vec<_> = it.by_ref().collect();
    it.detach();
    out
}

/// Elements named `local` in document order.
pub fn elements(tree: &Arc<Tree>, local: &str) -> Vec<NodeHandle> {
    collect(tree, tree.root(), Axis::Descendant, Some(NodeTest::name(local)))
}

pub fn element(tree: &Arc<Tree>, local: &str) -> NodeHandle {
    elements(tree, local)[0]
}

pub fn eval_at(tree: &Arc<Tree>, node: NodeHandle, expr: &Expr) -> Result<Value> {
    let mut vars = VariableStack::new();
    let mut ctx = Context::builder(Arc::clone(tree), &mut vars)
        .with_context_node(node)
        .build()?;
    evaluate(expr, &mut ctx)
}

pub fn eval(tree: &Arc<Tree>, expr: &Expr) -> Result<Value> {
    eval_at(tree, tree.root(), expr)
}

pub fn eval_with(tree: &Arc<Tree>, config: EvalConfig, expr: &Expr) -> Result<Value> {
    let mut vars = VariableStack::new();
    let mut ctx = Context::builder(Arc::clone(tree), &mut vars)
        .with_config(config)
        .build()?;
    evaluate(expr, &mut ctx)
}

pub fn string_of(tree: &Arc<Tree>, expr: &Expr) -> String {
    eval(tree, expr).unwrap().as_string().unwrap()
}

pub fn number_of(tree: &Arc<Tree>, expr: &Expr) -> f64 {
    eval(tree, expr).unwrap().as_number().unwrap()
}

pub fn boolean_of(tree: &Arc<Tree>, expr: &Expr) -> bool {
    eval(tree, expr).unwrap().as_boolean().unwrap()
}

/// Members of a node-set result in document order.
pub fn nodes_of(tree: &Arc<Tree>, expr: &Expr) -> Vec<NodeHandle> {
    let v = eval(tree, expr).unwrap();
    let out = v.as_node_set().unwrap().sorted().unwrap().to_vec();
    v.detach();
    out
}
