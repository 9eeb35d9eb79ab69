use crate::engine::context::Context;
use crate::error::Result;
use crate::value::{Value, parse_number, round_half_up};

pub(super) fn number_fn(ctx: &mut Context<'_>, args: &[Value]) -> Result<Value> {
    let n = match args.first() {
        Some(v) => v.as_number()?,
        None => parse_number(&ctx.tree().string_value(ctx.context_node())?),
    };
    Ok(Value::Number(n))
}

pub(super) fn sum_fn(_ctx: &mut Context<'_>, args: &[Value]) -> Result<Value> {
    let ns = args[0].as_node_set()?;
    let total = ns
        .string_values()?
        .iter()
        .map(|s| parse_number(s))
        .sum::<f64>();
    Ok(Value::Number(total))
}

fn unary(args: &[Value], f: impl FnOnce(f64) -> f64) -> Result<Value> {
    Ok(Value::Number(f(args[0].as_number()?)))
}

pub(super) fn floor_fn(_ctx: &mut Context<'_>, args: &[Value]) -> Result<Value> {
    unary(args, f64::floor)
}

pub(super) fn ceiling_fn(_ctx: &mut Context<'_>, args: &[Value]) -> Result<Value> {
    unary(args, f64::ceil)
}

pub(super) fn round_fn(_ctx: &mut Context<'_>, args: &[Value]) -> Result<Value> {
    unary(args, round_half_up)
}
