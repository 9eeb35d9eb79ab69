use crate::engine::context::Context;
use crate::error::Result;
use crate::model::{Axis, NodeKind, NodeTest, XML_NS};
use crate::value::Value;

pub(super) fn boolean_fn(_ctx: &mut Context<'_>, args: &[Value]) -> Result<Value> {
    Ok(Value::Boolean(args[0].as_boolean()?))
}

pub(super) fn not_fn(_ctx: &mut Context<'_>, args: &[Value]) -> Result<Value> {
    Ok(Value::Boolean(!args[0].as_boolean()?))
}

pub(super) fn true_fn(_ctx: &mut Context<'_>, _args: &[Value]) -> Result<Value> {
    Ok(Value::Boolean(true))
}

pub(super) fn false_fn(_ctx: &mut Context<'_>, _args: &[Value]) -> Result<Value> {
    Ok(Value::Boolean(false))
}

/// `lang(s)`: the nearest `xml:lang` on the context node or its ancestors
/// equals `s` or starts with `s-`, ignoring ASCII case.
pub(super) fn lang_fn(ctx: &mut Context<'_>, args: &[Value]) -> Result<Value> {
    let wanted = args[0].as_string()?.to_ascii_lowercase();
    let tree = ctx.tree();
    let mut lang = None;
    for node in tree.axis_iterator(ctx.context_node(), Axis::AncestorOrSelf, None)? {
        if tree.node_kind(node)? != NodeKind::Element {
            continue;
        }
        let mut attrs =
            tree.axis_iterator(node, Axis::Attribute, Some(NodeTest::qualified(XML_NS, "lang")))?;
        if let Some(a) = attrs.next() {
            lang = Some(tree.string_value(a)?.to_ascii_lowercase());
            break;
        }
    }
    let Some(lang) = lang else {
        return Ok(Value::Boolean(false));
    };
    let matches = lang == wanted
        || lang
            .strip_prefix(wanted.as_str())
            .is_some_and(|rest| rest.starts_with('-'));
    Ok(Value::Boolean(matches))
}
