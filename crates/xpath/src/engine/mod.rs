pub mod config;
pub mod context;
pub mod evaluator;
pub mod extension;
pub mod functions;

pub use config::{EvalConfig, EvalConfigBuilder, UnresolvedVariablePolicy};
pub use context::{Context, ContextBuilder};
pub use evaluator::evaluate;
pub use extension::{CallSiteKey, ExtensionProvider, ExtensionRegistry};

use crate::ast::Expr;
use crate::error::Result;
use crate::names::ExpandedName;

/// Build-time binding pass over every variable reference in `expr`. Must run
/// before the first [`evaluate`] for bound (indexed) resolution; unbound
/// references still resolve by name.
pub fn fixup(expr: &mut Expr, declared: &[ExpandedName], globals_boundary: usize) -> Result<()> {
    expr.fixup_variables(declared, globals_boundary)
}
