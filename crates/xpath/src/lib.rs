pub mod ast;
pub mod engine;
pub mod error;
pub mod model;
pub mod names;
pub mod pattern;
pub mod symbols;
pub mod value;
pub mod variables;

pub use ast::{Expr, LocationPath, Step};
pub use engine::{Context, ContextBuilder, EvalConfig, ExtensionProvider, ExtensionRegistry, evaluate, fixup};
pub use error::{Error, ErrorCode, Result};
pub use model::builder::{attr, attr_ns, comment, doc, elem, elem_ns, ns, pi, text};
pub use model::{Axis, AxisIterator, NodeHandle, NodeKind, NodeTest, Tree};
pub use names::ExpandedName;
pub use pattern::{PathPattern, Pattern, PatternMatcher, PatternScore, StepPattern, score_pattern};
pub use value::{ComparisonOp, NodeSet, Value};
pub use variables::{VariableRef, VariableSlot, VariableStack};
