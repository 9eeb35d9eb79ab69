use itertools::Itertools;

use super::string_or_context;
use crate::engine::context::Context;
use crate::error::Result;
use crate::value::{Value, is_xml_whitespace, round_half_up};

pub(super) fn string_fn(ctx: &mut Context<'_>, args: &[Value]) -> Result<Value> {
    Ok(Value::String(string_or_context(ctx, args, 0)?))
}

pub(super) fn concat_fn(_ctx: &mut Context<'_>, args: &[Value]) -> Result<Value> {
    let mut out = String::new();
    for a in args {
        out.push_str(&a.as_string()?);
    }
    Ok(Value::String(out))
}

fn two_strings(args: &[Value]) -> Result<(String, String)> {
    Ok((args[0].as_string()?, args[1].as_string()?))
}

pub(super) fn starts_with_fn(_ctx: &mut Context<'_>, args: &[Value]) -> Result<Value> {
    let (s, prefix) = two_strings(args)?;
    Ok(Value::Boolean(s.starts_with(&prefix)))
}

pub(super) fn contains_fn(_ctx: &mut Context<'_>, args: &[Value]) -> Result<Value> {
    let (s, needle) = two_strings(args)?;
    Ok(Value::Boolean(s.contains(&needle)))
}

pub(super) fn substring_before_fn(_ctx: &mut Context<'_>, args: &[Value]) -> Result<Value> {
    let (s, sep) = two_strings(args)?;
    let out = s.find(&sep).map(|i| &s[..i]).unwrap_or("");
    Ok(Value::string(out))
}

pub(super) fn substring_after_fn(_ctx: &mut Context<'_>, args: &[Value]) -> Result<Value> {
    let (s, sep) = two_strings(args)?;
    let out = s.find(&sep).map(|i| &s[i + sep.len()..]).unwrap_or("");
    Ok(Value::string(out))
}

/// Characters at 1-based position `p` with `round(start) <= p` and
/// `p < round(start) + round(len)`. NaN bounds select nothing; the
/// comparisons carry the IEEE semantics the XPath rules are written in.
pub(super) fn substring_fn(_ctx: &mut Context<'_>, args: &[Value]) -> Result<Value> {
    let s = args[0].as_string()?;
    let start = round_half_up(args[1].as_number()?);
    let end = match args.get(2) {
        Some(len) => start + round_half_up(len.as_number()?),
        None => f64::INFINITY,
    };
    let out: String = s
        .chars()
        .enumerate()
        .filter(|(i, _)| {
            let p = (*i + 1) as f64;
            p >= start && p < end
        })
        .map(|(_, c)| c)
        .collect();
    Ok(Value::String(out))
}

pub(super) fn string_length_fn(ctx: &mut Context<'_>, args: &[Value]) -> Result<Value> {
    let s = string_or_context(ctx, args, 0)?;
    Ok(Value::Number(s.chars().count() as f64))
}

pub(super) fn normalize_space_fn(ctx: &mut Context<'_>, args: &[Value]) -> Result<Value> {
    let s = string_or_context(ctx, args, 0)?;
    let out = s
        .split(is_xml_whitespace)
        .filter(|t| !t.is_empty())
        .join(" ");
    Ok(Value::String(out))
}

pub(super) fn translate_fn(_ctx: &mut Context<'_>, args: &[Value]) -> Result<Value> {
    let s = args[0].as_string()?;
    let from: Vec<char> = args[1].as_string()?.chars().collect();
    let to: Vec<char> = args[2].as_string()?.chars().collect();
    let out: String = s
        .chars()
        .filter_map(|c| match from.iter().position(|f| *f == c) {
            Some(i) => to.get(i).copied(),
            None => Some(c),
        })
        .collect();
    Ok(Value::String(out))
}
