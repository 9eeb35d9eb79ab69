//! XPath 1.0 core function library.
//!
//! Core functions resolve statically by name when the syntax tree is built;
//! arguments are evaluated left to right by the evaluator and detached
//! after the call.
use core::fmt;

use super::context::Context;
use crate::error::{Error, ErrorCode, Result};
use crate::value::Value;

mod boolean;
mod nodes;
mod numeric;
mod strings;

type CoreImpl = fn(&mut Context<'_>, &[Value]) -> Result<Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoreFunction {
    Last,
    Position,
    Count,
    Id,
    LocalName,
    NamespaceUri,
    Name,
    String,
    Concat,
    StartsWith,
    Contains,
    SubstringBefore,
    SubstringAfter,
    Substring,
    StringLength,
    NormalizeSpace,
    Translate,
    Boolean,
    Not,
    True,
    False,
    Lang,
    Number,
    Sum,
    Floor,
    Ceiling,
    Round,
}

// name, min arity, max arity (None = variadic), implementation
static TABLE: [(CoreFunction, &str, usize, Option<usize>, CoreImpl); 27] = [
    (CoreFunction::Last, "last", 0, Some(0), nodes::last_fn),
    (CoreFunction::Position, "position", 0, Some(0), nodes::position_fn),
    (CoreFunction::Count, "count", 1, Some(1), nodes::count_fn),
    (CoreFunction::Id, "id", 1, Some(1), nodes::id_fn),
    (CoreFunction::LocalName, "local-name", 0, Some(1), nodes::local_name_fn),
    (CoreFunction::NamespaceUri, "namespace-uri", 0, Some(1), nodes::namespace_uri_fn),
    (CoreFunction::Name, "name", 0, Some(1), nodes::name_fn),
    (CoreFunction::String, "string", 0, Some(1), strings::string_fn),
    (CoreFunction::Concat, "concat", 2, None, strings::concat_fn),
    (CoreFunction::StartsWith, "starts-with", 2, Some(2), strings::starts_with_fn),
    (CoreFunction::Contains, "contains", 2, Some(2), strings::contains_fn),
    (CoreFunction::SubstringBefore, "substring-before", 2, Some(2), strings::substring_before_fn),
    (CoreFunction::SubstringAfter, "substring-after", 2, Some(2), strings::substring_after_fn),
    (CoreFunction::Substring, "substring", 2, Some(3), strings::substring_fn),
    (CoreFunction::StringLength, "string-length", 0, Some(1), strings::string_length_fn),
    (CoreFunction::NormalizeSpace, "normalize-space", 0, Some(1), strings::normalize_space_fn),
    (CoreFunction::Translate, "translate", 3, Some(3), strings::translate_fn),
    (CoreFunction::Boolean, "boolean", 1, Some(1), boolean::boolean_fn),
    (CoreFunction::Not, "not", 1, Some(1), boolean::not_fn),
    (CoreFunction::True, "true", 0, Some(0), boolean::true_fn),
    (CoreFunction::False, "false", 0, Some(0), boolean::false_fn),
    (CoreFunction::Lang, "lang", 1, Some(1), boolean::lang_fn),
    (CoreFunction::Number, "number", 0, Some(1), numeric::number_fn),
    (CoreFunction::Sum, "sum", 1, Some(1), numeric::sum_fn),
    (CoreFunction::Floor, "floor", 1, Some(1), numeric::floor_fn),
    (CoreFunction::Ceiling, "ceiling", 1, Some(1), numeric::ceiling_fn),
    (CoreFunction::Round, "round", 1, Some(1), numeric::round_fn),
];

impl CoreFunction {
    fn entry(self) -> &'static (CoreFunction, &'static str, usize, Option<usize>, CoreImpl) {
        // TABLE is declared in enum order.
        &TABLE[self as usize]
    }

    pub fn from_name(name: &str) -> Option<Self> {
        TABLE.iter().find(|e| e.1 == name).map(|e| e.0)
    }

    pub fn name(self) -> &'static str {
        self.entry().1
    }

    /// `(min, max)`; `max` is `None` for variadic functions.
    pub fn arity(self) -> (usize, Option<usize>) {
        let e = self.entry();
        (e.2, e.3)
    }

    pub fn accepts(self, argc: usize) -> bool {
        let (min, max) = self.arity();
        argc >= min && max.is_none_or(|m| argc <= m)
    }

    pub(crate) fn invoke(self, ctx: &mut Context<'_>, args: &[Value]) -> Result<Value> {
        if !self.accepts(args.len()) {
            return Err(Error::from_code(
                ErrorCode::WrongArity,
                format!("{}() does not take {} arguments", self.name(), args.len()),
            ));
        }
        (self.entry().4)(ctx, args)
    }
}

impl fmt::Display for CoreFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// String argument `i`, or the context node's string-value when absent.
fn string_or_context(ctx: &Context<'_>, args: &[Value], i: usize) -> Result<String> {
    match args.get(i) {
        Some(v) => v.as_string(),
        None => ctx.tree().string_value(ctx.context_node()),
    }
}
