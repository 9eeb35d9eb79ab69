//! Syntax tree consumed by the evaluator.
//!
//! Parsing lives outside this crate; callers build these values directly or
//! through the constructor helpers below.
//!
//! ```
//! use stylepath_xpath::ast::{Expr, Step};
//! use stylepath_xpath::model::NodeTest;
//!
//! // count(/doc/item[@id])
//! let expr = Expr::call(
//!     "count",
//!     vec![Expr::root_path(vec![
//!         Step::child(NodeTest::name("doc")),
//!         Step::child(NodeTest::name("item"))
//!             .with_predicate(Expr::path(vec![Step::attribute(NodeTest::name("id"))])),
//!     ])],
//! );
//! assert!(matches!(expr, Expr::Call(_)));
//! ```
use crate::engine::extension::CallSiteKey;
use crate::engine::functions::CoreFunction;
use crate::error::Result;
use crate::model::{Axis, NodeTest};
use crate::names::ExpandedName;
use crate::value::ComparisonOp;
use crate::variables::VariableRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithmeticOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl ArithmeticOp {
    /// IEEE-754 semantics; `mod` keeps the sign of the dividend.
    pub fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            ArithmeticOp::Add => a + b,
            ArithmeticOp::Sub => a - b,
            ArithmeticOp::Mul => a * b,
            ArithmeticOp::Div => a / b,
            ArithmeticOp::Mod => a % b,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub axis: Axis,
    pub test: NodeTest,
    pub predicates: Vec<Expr>,
}

impl Step {
    pub fn new(axis: Axis, test: NodeTest) -> Self {
        Self {
            axis,
            test,
            predicates: Vec::new(),
        }
    }

    pub fn child(test: NodeTest) -> Self {
        Self::new(Axis::Child, test)
    }

    pub fn attribute(test: NodeTest) -> Self {
        Self::new(Axis::Attribute, test)
    }

    /// The `//` abbreviation.
    pub fn descendant_or_self() -> Self {
        Self::new(Axis::DescendantOrSelf, NodeTest::AnyNode)
    }

    /// `..`
    pub fn parent() -> Self {
        Self::new(Axis::Parent, NodeTest::AnyNode)
    }

    pub fn with_predicate(mut self, predicate: Expr) -> Self {
        self.predicates.push(predicate);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocationPath {
    pub absolute: bool,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FunctionCall {
    Core {
        function: CoreFunction,
        args: Vec<Expr>,
    },
    Extension {
        name: ExpandedName,
        args: Vec<Expr>,
        key: CallSiteKey,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(String),
    Number(f64),
    Variable(VariableRef),
    /// `.`
    ContextNode,
    Or(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Compare(ComparisonOp, Box<Expr>, Box<Expr>),
    Arithmetic(ArithmeticOp, Box<Expr>, Box<Expr>),
    Negate(Box<Expr>),
    Union(Box<Expr>, Box<Expr>),
    Path(LocationPath),
    /// `primary[pred]*` optionally followed by `/step...`.
    Filter {
        primary: Box<Expr>,
        predicates: Vec<Expr>,
        steps: Vec<Step>,
    },
    Call(FunctionCall),
}

impl Expr {
    pub fn literal(s: impl Into<String>) -> Self {
        Expr::Literal(s.into())
    }

    pub fn number(n: f64) -> Self {
        Expr::Number(n)
    }

    pub fn var(name: impl Into<ExpandedName>) -> Self {
        Expr::Variable(VariableRef::new(name))
    }

    pub fn or(a: Expr, b: Expr) -> Self {
        Expr::Or(Box::new(a), Box::new(b))
    }

    pub fn and(a: Expr, b: Expr) -> Self {
        Expr::And(Box::new(a), Box::new(b))
    }

    pub fn compare(op: ComparisonOp, a: Expr, b: Expr) -> Self {
        Expr::Compare(op, Box::new(a), Box::new(b))
    }

    pub fn eq(a: Expr, b: Expr) -> Self {
        Self::compare(ComparisonOp::Eq, a, b)
    }

    pub fn ne(a: Expr, b: Expr) -> Self {
        Self::compare(ComparisonOp::Ne, a, b)
    }

    pub fn lt(a: Expr, b: Expr) -> Self {
        Self::compare(ComparisonOp::Lt, a, b)
    }

    pub fn gt(a: Expr, b: Expr) -> Self {
        Self::compare(ComparisonOp::Gt, a, b)
    }

    pub fn arith(op: ArithmeticOp, a: Expr, b: Expr) -> Self {
        Expr::Arithmetic(op, Box::new(a), Box::new(b))
    }

    pub fn neg(a: Expr) -> Self {
        Expr::Negate(Box::new(a))
    }

    pub fn union(a: Expr, b: Expr) -> Self {
        Expr::Union(Box::new(a), Box::new(b))
    }

    /// Relative location path.
    pub fn path(steps: Vec<Step>) -> Self {
        Expr::Path(LocationPath {
            absolute: false,
            steps,
        })
    }

    /// Absolute location path; no steps means `/`.
    pub fn root_path(steps: Vec<Step>) -> Self {
        Expr::Path(LocationPath {
            absolute: true,
            steps,
        })
    }

    pub fn filter(primary: Expr, predicates: Vec<Expr>) -> Self {
        Expr::Filter {
            primary: Box::new(primary),
            predicates,
            steps: Vec::new(),
        }
    }

    pub fn filter_path(primary: Expr, predicates: Vec<Expr>, steps: Vec<Step>) -> Self {
        Expr::Filter {
            primary: Box::new(primary),
            predicates,
            steps,
        }
    }

    /// Call by unprefixed name: core library functions resolve statically,
    /// every other name becomes an extension call.
    pub fn call(name: &str, args: Vec<Expr>) -> Self {
        match CoreFunction::from_name(name) {
            Some(function) => Expr::Call(FunctionCall::Core { function, args }),
            None => Self::call_ext(ExpandedName::local(name), args),
        }
    }

    /// Extension call with its own call-site key.
    pub fn call_ext(name: ExpandedName, args: Vec<Expr>) -> Self {
        Expr::Call(FunctionCall::Extension {
            name,
            args,
            key: CallSiteKey::next(),
        })
    }

    /// Bind every variable reference in this tree. See [`VariableRef::fixup`].
    pub fn fixup_variables(&mut self, declared: &[ExpandedName], globals_boundary: usize) -> Result<()> {
        let mut result = Ok(());
        self.walk_variables(&mut |v| {
            if result.is_ok() {
                result = v.fixup(declared, globals_boundary);
            }
        });
        result
    }

    /// Visit every variable reference, depth first, left to right.
    pub fn walk_variables(&mut self, f: &mut dyn FnMut(&mut VariableRef)) {
        match self {
            Expr::Literal(_) | Expr::Number(_) | Expr::ContextNode => {}
            Expr::Variable(v) => f(v),
            Expr::Or(a, b)
            | Expr::And(a, b)
            | Expr::Compare(_, a, b)
            | Expr::Arithmetic(_, a, b)
            | Expr::Union(a, b) => {
                a.walk_variables(f);
                b.walk_variables(f);
            }
            Expr::Negate(a) => a.walk_variables(f),
            Expr::Path(p) => walk_steps(&mut p.steps, f),
            Expr::Filter {
                primary,
                predicates,
                steps,
            } => {
                primary.walk_variables(f);
                for p in predicates {
                    p.walk_variables(f);
                }
                walk_steps(steps, f);
            }
            Expr::Call(FunctionCall::Core { args, .. } | FunctionCall::Extension { args, .. }) => {
                for a in args {
                    a.walk_variables(f);
                }
            }
        }
    }
}

fn walk_steps(steps: &mut [Step], f: &mut dyn FnMut(&mut VariableRef)) {
    for step in steps {
        for p in &mut step.predicates {
            p.walk_variables(f);
        }
    }
}

impl From<f64> for Expr {
    fn from(n: f64) -> Self {
        Expr::Number(n)
    }
}

impl From<&str> for Expr {
    fn from(s: &str) -> Self {
        Expr::Literal(s.to_owned())
    }
}
