use core::fmt;

use super::{Value, parse_number};
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl ComparisonOp {
    /// Operator with the operands swapped: `a < b` ⟺ `b > a`.
    pub fn mirrored(self) -> Self {
        match self {
            ComparisonOp::Lt => ComparisonOp::Gt,
            ComparisonOp::Le => ComparisonOp::Ge,
            ComparisonOp::Gt => ComparisonOp::Lt,
            ComparisonOp::Ge => ComparisonOp::Le,
            other => other,
        }
    }

    pub fn is_equality(self) -> bool {
        matches!(self, ComparisonOp::Eq | ComparisonOp::Ne)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ComparisonOp::Eq => "=",
            ComparisonOp::Ne => "!=",
            ComparisonOp::Lt => "<",
            ComparisonOp::Le => "<=",
            ComparisonOp::Gt => ">",
            ComparisonOp::Ge => ">=",
        }
    }

    fn numbers(self, a: f64, b: f64) -> bool {
        match self {
            ComparisonOp::Eq => a == b,
            ComparisonOp::Ne => a != b,
            ComparisonOp::Lt => a < b,
            ComparisonOp::Le => a <= b,
            ComparisonOp::Gt => a > b,
            ComparisonOp::Ge => a >= b,
        }
    }

    fn booleans(self, a: bool, b: bool) -> bool {
        match self {
            ComparisonOp::Eq => a == b,
            ComparisonOp::Ne => a != b,
            _ => self.numbers(f64::from(u8::from(a)), f64::from(u8::from(b))),
        }
    }

    /// Strings compare as strings for `=`/`!=`, as numbers otherwise.
    fn strings(self, a: &str, b: &str) -> bool {
        match self {
            ComparisonOp::Eq => a == b,
            ComparisonOp::Ne => a != b,
            _ => self.numbers(parse_number(a), parse_number(b)),
        }
    }
}

impl fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One side of a comparison, with node-like values flattened to their
/// members' string-values.
enum Side<'a> {
    Nodes(Vec<String>),
    Scalar(&'a Value),
}

fn side(v: &Value) -> Result<Side<'_>> {
    Ok(match v {
        Value::NodeSet(ns) => Side::Nodes(ns.string_values()?),
        Value::Fragment(f) => Side::Nodes(vec![f.string_value()?]),
        other => Side::Scalar(other),
    })
}

impl Value {
    /// XPath 1.0 `=`.
    pub fn equals(&self, other: &Value) -> Result<bool> {
        self.compare(ComparisonOp::Eq, other)
    }

    pub fn not_equals(&self, other: &Value) -> Result<bool> {
        self.compare(ComparisonOp::Ne, other)
    }

    /// XPath 1.0 comparison (section 3.4). Node-sets compare existentially;
    /// a fragment behaves like a one-node set. The node-set side drives the
    /// dispatch regardless of operand order, so `a = b` ⟺ `b = a`.
    pub fn compare(&self, op: ComparisonOp, other: &Value) -> Result<bool> {
        match (side(self)?, side(other)?) {
            (Side::Nodes(a), Side::Nodes(b)) => Ok(a
                .iter()
                .any(|x| b.iter().any(|y| op.strings(x, y)))),
            (Side::Nodes(a), Side::Scalar(b)) => nodes_vs_scalar(op, &a, b),
            (Side::Scalar(a), Side::Nodes(b)) => nodes_vs_scalar(op.mirrored(), &b, a),
            (Side::Scalar(a), Side::Scalar(b)) => scalars(op, a, b),
        }
    }
}

fn nodes_vs_scalar(op: ComparisonOp, nodes: &[String], scalar: &Value) -> Result<bool> {
    Ok(match scalar {
        Value::Boolean(b) => op.booleans(!nodes.is_empty(), *b),
        Value::Number(n) => nodes.iter().any(|s| op.numbers(parse_number(s), *n)),
        other => {
            let s = other.as_string()?;
            nodes.iter().any(|x| op.strings(x, &s))
        }
    })
}

fn scalars(op: ComparisonOp, a: &Value, b: &Value) -> Result<bool> {
    if !op.is_equality() {
        return Ok(op.numbers(a.as_number()?, b.as_number()?));
    }
    Ok(match (a, b) {
        (Value::Boolean(_), _) | (_, Value::Boolean(_)) => {
            op.booleans(a.as_boolean()?, b.as_boolean()?)
        }
        (Value::Number(_), _) | (_, Value::Number(_)) => {
            op.numbers(a.as_number()?, b.as_number()?)
        }
        _ => op.strings(&a.as_string()?, &b.as_string()?),
    })
}
