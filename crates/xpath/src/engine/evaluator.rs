use core::ops::Deref;
use itertools::Itertools;
use smallvec::SmallVec;
use std::sync::Arc;
use tracing::{trace, warn};

use super::config::UnresolvedVariablePolicy;
use super::context::Context;
use crate::ast::{Expr, FunctionCall, LocationPath, Step};
use crate::error::{Error, ErrorCode, Result};
use crate::model::{NodeHandle, Tree};
use crate::value::{NodeSet, Value};
use crate::variables::VariableRef;

/// Evaluate `expr` against the focus of `ctx`.
///
/// Operands are evaluated left to right; `and`/`or` short circuit. Every
/// intermediate value is detached before this returns, on success and on
/// error, so only the returned value may still hold an iterator.
pub fn evaluate(expr: &Expr, ctx: &mut Context<'_>) -> Result<Value> {
    match expr {
        Expr::Literal(s) => Ok(Value::String(s.clone())),
        Expr::Number(n) => Ok(Value::Number(*n)),
        Expr::ContextNode => Ok(Value::NodeSet(NodeSet::singleton(
            Arc::clone(ctx.tree()),
            ctx.context_node(),
        ))),
        Expr::Variable(var) => resolve_variable(var, ctx),
        Expr::Or(a, b) => {
            if operand(a, ctx)?.as_boolean()? {
                return Ok(Value::Boolean(true));
            }
            Ok(Value::Boolean(operand(b, ctx)?.as_boolean()?))
        }
        Expr::And(a, b) => {
            if !operand(a, ctx)?.as_boolean()? {
                return Ok(Value::Boolean(false));
            }
            Ok(Value::Boolean(operand(b, ctx)?.as_boolean()?))
        }
        Expr::Compare(op, a, b) => {
            let l = operand(a, ctx)?;
            let r = operand(b, ctx)?;
            Ok(Value::Boolean(l.compare(*op, &r)?))
        }
        Expr::Arithmetic(op, a, b) => {
            let l = operand(a, ctx)?.as_number()?;
            let r = operand(b, ctx)?.as_number()?;
            Ok(Value::Number(op.apply(l, r)))
        }
        Expr::Negate(a) => Ok(Value::Number(-operand(a, ctx)?.as_number()?)),
        Expr::Union(a, b) => union(a, b, ctx),
        Expr::Path(path) => location_path(path, ctx),
        Expr::Filter {
            primary,
            predicates,
            steps,
        } => filter(primary, predicates, steps, ctx),
        Expr::Call(call) => function_call(call, ctx),
    }
}

/// Intermediate result; detached when it goes out of scope.
pub(crate) struct Operand(Value);

impl Deref for Operand {
    type Target = Value;

    fn deref(&self) -> &Value {
        &self.0
    }
}

impl Drop for Operand {
    fn drop(&mut self) {
        self.0.detach();
    }
}

pub(crate) fn operand(expr: &Expr, ctx: &mut Context<'_>) -> Result<Operand> {
    evaluate(expr, ctx).map(Operand)
}

/// Function arguments, detached together when dropped.
struct Operands(SmallVec<[Value; 4]>);

impl Deref for Operands {
    type Target = [Value];

    fn deref(&self) -> &[Value] {
        &self.0
    }
}

impl Drop for Operands {
    fn drop(&mut self) {
        for v in &self.0 {
            v.detach();
        }
    }
}

fn operands(args: &[Expr], ctx: &mut Context<'_>) -> Result<Operands> {
    let mut out = Operands(SmallVec::with_capacity(args.len()));
    for a in args {
        out.0.push(evaluate(a, ctx)?);
    }
    Ok(out)
}

fn resolve_variable(var: &VariableRef, ctx: &mut Context<'_>) -> Result<Value> {
    match ctx.variables().resolve(var) {
        Ok(v) => Ok(v),
        Err(e)
            if e.code == ErrorCode::UnresolvedVariable
                && ctx.config().unresolved_variables == UnresolvedVariablePolicy::EmptyNodeSet =>
        {
            warn!(name = %var.name, "unresolved variable, substituting empty node-set");
            Ok(Value::NodeSet(NodeSet::empty(Arc::clone(ctx.tree()))))
        }
        Err(e) => Err(e),
    }
}

fn union(a: &Expr, b: &Expr, ctx: &mut Context<'_>) -> Result<Value> {
    let l = operand(a, ctx)?;
    let r = operand(b, ctx)?;
    let (ls, rs) = (l.as_node_set()?, r.as_node_set()?);
    if !Arc::ptr_eq(ls.tree(), rs.tree()) {
        return Err(Error::from_code(
            ErrorCode::UnsupportedConversion,
            "union of node-sets from different trees",
        ));
    }
    let (left, right) = (ls.sorted()?, rs.sorted()?);
    let merged: Vec<NodeHandle> = left
        .iter()
        .copied()
        .merge(right.iter().copied())
        .dedup()
        .collect();
    Ok(Value::NodeSet(NodeSet::from_sorted(
        Arc::clone(ls.tree()),
        merged,
    )))
}

fn location_path(path: &LocationPath, ctx: &mut Context<'_>) -> Result<Value> {
    let tree = Arc::clone(ctx.tree());
    let start = if path.absolute {
        tree.root()
    } else {
        ctx.context_node()
    };
    if let [step] = path.steps.as_slice()
        && step.predicates.is_empty()
        && ctx.config().lazy_node_sets
    {
        let iter = tree.axis_iterator(start, step.axis, Some(step.test.clone()))?;
        return Ok(Value::NodeSet(NodeSet::lazy(iter)));
    }
    let nodes = apply_steps(&tree, vec![start], &path.steps, ctx)?;
    Ok(Value::NodeSet(NodeSet::from_sorted(tree, nodes)))
}

/// Apply `steps` to a document-ordered context list; the result is again in
/// document order without duplicates.
fn apply_steps(
    tree: &Arc<Tree>,
    mut current: Vec<NodeHandle>,
    steps: &[Step],
    ctx: &mut Context<'_>,
) -> Result<Vec<NodeHandle>> {
    for step in steps {
        let mut next = Vec::new();
        for &node in &current {
            next.extend(select(tree, node, step, ctx)?);
        }
        current = if current.len() > 1 || step.axis.is_reverse() {
            next.into_iter().sorted_unstable().dedup().collect()
        } else {
            next
        };
    }
    Ok(current)
}

/// One step from one context node, predicates applied in axis order.
fn select(
    tree: &Arc<Tree>,
    node: NodeHandle,
    step: &Step,
    ctx: &mut Context<'_>,
) -> Result<SmallVec<[NodeHandle; 16]>> {
    let mut iter = tree.axis_iterator(node, step.axis, Some(step.test.clone()))?;
    let mut candidates: SmallVec<[NodeHandle; 16]> = iter.by_ref().collect();
    iter.detach();
    for pred in &step.predicates {
        candidates = apply_predicate(tree, &candidates, pred, ctx)?;
    }
    Ok(candidates)
}

fn apply_predicate(
    tree: &Arc<Tree>,
    nodes: &[NodeHandle],
    pred: &Expr,
    ctx: &mut Context<'_>,
) -> Result<SmallVec<[NodeHandle; 16]>> {
    let size = nodes.len();
    let mut kept = SmallVec::new();
    for (i, &node) in nodes.iter().enumerate() {
        if ctx.with_focus(tree, node, i + 1, size, |c| predicate_holds(pred, c))? {
            kept.push(node);
        }
    }
    Ok(kept)
}

/// A number selects by position; anything else by its boolean value.
pub(crate) fn predicate_holds(pred: &Expr, ctx: &mut Context<'_>) -> Result<bool> {
    let v = operand(pred, ctx)?;
    match &*v {
        Value::Number(n) => Ok(*n == ctx.position() as f64),
        other => other.as_boolean(),
    }
}

fn filter(primary: &Expr, predicates: &[Expr], steps: &[Step], ctx: &mut Context<'_>) -> Result<Value> {
    if predicates.is_empty() && steps.is_empty() {
        return evaluate(primary, ctx);
    }
    let base = operand(primary, ctx)?;
    let set = base.as_node_set()?;
    let tree = Arc::clone(set.tree());
    let mut nodes: SmallVec<[NodeHandle; 16]> = set.sorted()?.iter().copied().collect();
    // filter predicates count in document order
    for pred in predicates {
        nodes = apply_predicate(&tree, &nodes, pred, ctx)?;
    }
    let out = apply_steps(&tree, nodes.into_vec(), steps, ctx)?;
    Ok(Value::NodeSet(NodeSet::from_sorted(tree, out)))
}

fn function_call(call: &FunctionCall, ctx: &mut Context<'_>) -> Result<Value> {
    match call {
        FunctionCall::Core { function, args } => {
            let values = operands(args, ctx)?;
            function.invoke(ctx, &values)
        }
        FunctionCall::Extension { name, args, key } => {
            let Some(provider) = ctx.extensions() else {
                return Err(unknown_function(name));
            };
            if !provider.is_function_available(name) {
                return Err(unknown_function(name));
            }
            // the provider takes ownership of the arguments
            let mut values = operands(args, ctx)?;
            let values = std::mem::take(&mut values.0).into_vec();
            trace!(%name, key = key.get(), argc = values.len(), "extension call");
            provider.call(name, values, *key, ctx)
        }
    }
}

fn unknown_function(name: &impl core::fmt::Display) -> Error {
    Error::from_code(
        ErrorCode::UnknownFunction,
        format!("function {name} is not available"),
    )
}
