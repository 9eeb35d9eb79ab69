use compact_str::CompactString;
use std::sync::Arc;

use crate::engine::context::Context;
use crate::error::Result;
use crate::model::{NodeHandle, NodeKind, Tree};
use crate::value::{NodeSet, Value, is_xml_whitespace};

pub(super) fn last_fn(ctx: &mut Context<'_>, _args: &[Value]) -> Result<Value> {
    Ok(Value::Number(ctx.size() as f64))
}

pub(super) fn position_fn(ctx: &mut Context<'_>, _args: &[Value]) -> Result<Value> {
    Ok(Value::Number(ctx.position() as f64))
}

pub(super) fn count_fn(_ctx: &mut Context<'_>, args: &[Value]) -> Result<Value> {
    Ok(Value::Number(args[0].as_node_set()?.len()? as f64))
}

/// `id(object)`: whitespace-separated IDs from the argument's string-value
/// (every member's string-value for a node-set).
pub(super) fn id_fn(ctx: &mut Context<'_>, args: &[Value]) -> Result<Value> {
    let (tree, texts) = match &args[0] {
        Value::NodeSet(ns) => (Arc::clone(ns.tree()), ns.string_values()?),
        other => (Arc::clone(ctx.tree()), vec![other.as_string()?]),
    };
    let found = texts
        .iter()
        .flat_map(|t| t.split(is_xml_whitespace))
        .filter(|tok| !tok.is_empty())
        .filter_map(|tok| tree.element_by_id(tok));
    Ok(Value::NodeSet(NodeSet::from_nodes(Arc::clone(&tree), found)))
}

/// First node of the optional node-set argument, or the context node.
fn target(ctx: &Context<'_>, args: &[Value]) -> Result<Option<(Arc<Tree>, NodeHandle)>> {
    match args.first() {
        None => Ok(Some((Arc::clone(ctx.tree()), ctx.context_node()))),
        Some(v) => {
            let ns = v.as_node_set()?;
            Ok(ns.first()?.map(|h| (Arc::clone(ns.tree()), h)))
        }
    }
}

fn name_of(
    ctx: &Context<'_>,
    args: &[Value],
    f: impl FnOnce(&Tree, NodeHandle) -> Result<CompactString>,
) -> Result<Value> {
    let s = match target(ctx, args)? {
        Some((tree, h)) => f(&tree, h)?,
        None => CompactString::default(),
    };
    Ok(Value::String(s.into()))
}

pub(super) fn local_name_fn(ctx: &mut Context<'_>, args: &[Value]) -> Result<Value> {
    name_of(ctx, args, |t, h| t.local_name(h))
}

pub(super) fn namespace_uri_fn(ctx: &mut Context<'_>, args: &[Value]) -> Result<Value> {
    name_of(ctx, args, |t, h| {
        if t.node_kind(h)? == NodeKind::Namespace {
            return Ok(CompactString::default());
        }
        Ok(t.namespace_uri(h)?.unwrap_or_default())
    })
}

pub(super) fn name_fn(ctx: &mut Context<'_>, args: &[Value]) -> Result<Value> {
    name_of(ctx, args, |t, h| t.qualified_name(h))
}
