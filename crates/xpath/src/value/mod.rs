//! Typed values produced by evaluation.
//!
//! Six variants cover the XPath 1.0 types plus the two host-facing extras:
//! result tree fragments and opaque host objects. Coercions follow XPath 1.0
//! section 4; node-set access on a fragment is refused.
use core::any::Any;
use core::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::model::{NodeHandle, Tree};

mod compare;
mod node_set;
mod number;

pub use compare::ComparisonOp;
pub use node_set::{Members, NodeSet};
pub use number::{format_number, parse_number};
pub(crate) use number::{is_xml_whitespace, round_half_up};

/// Object owned by the embedding application.
///
/// The engine never looks inside; it only asks for the string form.
pub trait HostObject: Any + fmt::Debug + Send + Sync {
    fn to_xpath_string(&self) -> String;

    fn as_any(&self) -> &dyn Any;
}

#[derive(Debug, Clone)]
pub struct OpaqueValue(Arc<dyn HostObject>);

impl OpaqueValue {
    pub fn new(obj: impl HostObject) -> Self {
        Self(Arc::new(obj))
    }

    pub fn object(&self) -> &Arc<dyn HostObject> {
        &self.0
    }

    pub fn downcast_ref<T: HostObject>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref::<T>()
    }
}

/// Document fragment built by the host and owned by its own tree.
///
/// Compares and converts like a single node (its document node), but is
/// never exposed as a node-set.
#[derive(Debug, Clone)]
pub struct ResultTreeFragment {
    tree: Arc<Tree>,
}

impl ResultTreeFragment {
    pub fn new(tree: Arc<Tree>) -> Self {
        Self { tree }
    }

    pub fn tree(&self) -> &Arc<Tree> {
        &self.tree
    }

    pub fn root(&self) -> NodeHandle {
        self.tree.root()
    }

    pub fn string_value(&self) -> Result<String> {
        self.tree.string_value(self.tree.root())
    }
}

#[derive(Debug, Clone)]
pub enum Value {
    Boolean(bool),
    Number(f64),
    String(String),
    NodeSet(NodeSet),
    Fragment(ResultTreeFragment),
    Opaque(OpaqueValue),
}

impl Value {
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::NodeSet(_) => "node-set",
            Value::Fragment(_) => "result tree fragment",
            Value::Opaque(_) => "opaque",
        }
    }

    pub fn as_boolean(&self) -> Result<bool> {
        match self {
            Value::Boolean(b) => Ok(*b),
            Value::Number(n) => Ok(*n != 0.0 && !n.is_nan()),
            Value::String(s) => Ok(!s.is_empty()),
            Value::NodeSet(ns) => Ok(!ns.is_empty()?),
            Value::Fragment(_) | Value::Opaque(_) => Ok(true),
        }
    }

    pub fn as_number(&self) -> Result<f64> {
        match self {
            Value::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
            Value::Number(n) => Ok(*n),
            Value::String(s) => Ok(parse_number(s)),
            Value::NodeSet(ns) => Ok(parse_number(&ns.first_string()?)),
            Value::Fragment(f) => Ok(parse_number(&f.string_value()?)),
            Value::Opaque(o) => Ok(parse_number(&o.0.to_xpath_string())),
        }
    }

    pub fn as_string(&self) -> Result<String> {
        match self {
            Value::Boolean(b) => Ok(if *b { "true" } else { "false" }.to_owned()),
            Value::Number(n) => Ok(format_number(*n)),
            Value::String(s) => Ok(s.clone()),
            Value::NodeSet(ns) => ns.first_string(),
            Value::Fragment(f) => f.string_value(),
            Value::Opaque(o) => Ok(o.0.to_xpath_string()),
        }
    }

    /// Node-set view. Fragments and scalars have none.
    pub fn as_node_set(&self) -> Result<&NodeSet> {
        match self {
            Value::NodeSet(ns) => Ok(ns),
            other => Err(Error::unsupported(other.type_name(), "node-set")),
        }
    }

    pub fn into_node_set(self) -> Result<NodeSet> {
        match self {
            Value::NodeSet(ns) => Ok(ns),
            other => Err(Error::unsupported(other.type_name(), "node-set")),
        }
    }

    /// Release node-set resources; a no-op for the other variants.
    /// Idempotent.
    pub fn detach(&self) {
        if let Value::NodeSet(ns) = self {
            ns.detach();
        }
    }

    /// Replace a lazy node-set by its realized form so the value no longer
    /// pins an iterator. Used before a value is stored beyond one
    /// evaluation.
    pub(crate) fn into_stable(self) -> Result<Value> {
        if let Value::NodeSet(ns) = &self {
            ns.realize()?;
        }
        Ok(self)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<NodeSet> for Value {
    fn from(ns: NodeSet) -> Self {
        Value::NodeSet(ns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::model::builder::{doc, elem, text};

    #[derive(Debug)]
    struct Handle(&'static str);

    impl HostObject for Handle {
        fn to_xpath_string(&self) -> String {
            self.0.to_owned()
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn scalar_coercions() {
        assert_eq!(Value::Number(42.0).as_string().unwrap(), "42");
        assert_eq!(Value::string("42").as_number().unwrap(), 42.0);
        assert!(Value::string("").as_number().unwrap().is_nan());
        assert!(!Value::Number(f64::NAN).as_boolean().unwrap());
        assert_eq!(Value::Boolean(true).as_number().unwrap(), 1.0);
        assert_eq!(Value::Boolean(false).as_string().unwrap(), "false");
    }

    #[test]
    fn fragment_has_no_node_set_view() {
        let tree = doc().child(elem("x").child(text("7"))).build();
        let v = Value::Fragment(ResultTreeFragment::new(tree));
        assert_eq!(v.as_string().unwrap(), "7");
        assert_eq!(v.as_number().unwrap(), 7.0);
        assert!(v.as_boolean().unwrap());
        let err = v.as_node_set().unwrap_err();
        assert_eq!(err.code, ErrorCode::UnsupportedConversion);
    }

    #[test]
    fn opaque_coerces_through_host_string() {
        let v = Value::Opaque(OpaqueValue::new(Handle("12")));
        assert_eq!(v.as_string().unwrap(), "12");
        assert_eq!(v.as_number().unwrap(), 12.0);
        assert!(v.as_boolean().unwrap());
        if let Value::Opaque(o) = &v {
            assert_eq!(o.downcast_ref::<Handle>().map(|h| h.0), Some("12"));
        }
    }
}
