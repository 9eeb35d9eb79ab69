//! Host extension functions.
//!
//! The evaluator only sees [`ExtensionProvider`]; [`ExtensionRegistry`] is a
//! ready-made provider storing closures by expanded name and arity range.
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::context::Context;
use crate::error::{Error, ErrorCode, Result};
use crate::names::ExpandedName;
use crate::value::Value;

/// Stable identity of one call site in a syntax tree. Providers may use it
/// to cache per-site bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallSiteKey(u64);

static NEXT_CALL_SITE: AtomicU64 = AtomicU64::new(1);

impl CallSiteKey {
    pub fn next() -> Self {
        CallSiteKey(NEXT_CALL_SITE.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

pub trait ExtensionProvider: Send + Sync {
    fn is_function_available(&self, name: &ExpandedName) -> bool;

    /// Invoked after every argument has been evaluated, left to right.
    fn call(
        &self,
        name: &ExpandedName,
        args: Vec<Value>,
        key: CallSiteKey,
        ctx: &mut Context<'_>,
    ) -> Result<Value>;
}

pub type Arity = usize;

pub type ExtensionImpl = Arc<dyn Fn(&mut Context<'_>, &[Value]) -> Result<Value> + Send + Sync>;

// (min_arity, max_arity, impl); `None` max means variadic
type Overload = (Arity, Option<Arity>, ExtensionImpl);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    Unknown(ExpandedName),
    WrongArity {
        name: ExpandedName,
        available: Vec<Arity>,
    },
}

impl From<ResolveError> for Error {
    fn from(e: ResolveError) -> Self {
        match e {
            ResolveError::Unknown(name) => Error::from_code(
                ErrorCode::UnknownFunction,
                format!("unknown function {name}"),
            ),
            ResolveError::WrongArity { name, available } => Error::from_code(
                ErrorCode::WrongArity,
                format!("function {name} accepts {available:?} arguments"),
            ),
        }
    }
}

#[derive(Default, Clone)]
pub struct ExtensionRegistry {
    fns: HashMap<ExpandedName, Vec<Overload>>,
}

impl std::fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionRegistry")
            .field("functions", &self.fns.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overlapping ranges are allowed; the most specific registration (higher
    /// minimum, then smaller maximum) wins.
    pub fn register_range(
        &mut self,
        name: ExpandedName,
        min_arity: Arity,
        max_arity: Option<Arity>,
        func: ExtensionImpl,
    ) {
        let overloads = match self.fns.entry(name) {
            Entry::Vacant(e) => e.insert(Vec::new()),
            Entry::Occupied(e) => e.into_mut(),
        };
        overloads.push((min_arity, max_arity, func));
        overloads.sort_by(|a, b| {
            b.0.cmp(&a.0).then_with(|| match (a.1, b.1) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => core::cmp::Ordering::Less,
                (None, Some(_)) => core::cmp::Ordering::Greater,
                (None, None) => core::cmp::Ordering::Equal,
            })
        });
    }

    pub fn register<F>(&mut self, name: ExpandedName, arity: Arity, f: F)
    where
        F: 'static + Send + Sync + Fn(&mut Context<'_>, &[Value]) -> Result<Value>,
    {
        self.register_range(name, arity, Some(arity), Arc::new(f));
    }

    pub fn register_ns<F>(&mut self, ns_uri: &str, local: &str, arity: Arity, f: F)
    where
        F: 'static + Send + Sync + Fn(&mut Context<'_>, &[Value]) -> Result<Value>,
    {
        self.register(ExpandedName::ns(ns_uri, local), arity, f);
    }

    pub fn register_variadic<F>(&mut self, name: ExpandedName, min_arity: Arity, f: F)
    where
        F: 'static + Send + Sync + Fn(&mut Context<'_>, &[Value]) -> Result<Value>,
    {
        self.register_range(name, min_arity, None, Arc::new(f));
    }

    pub fn resolve(&self, name: &ExpandedName, arity: Arity) -> Result<&ExtensionImpl, ResolveError> {
        let Some(cands) = self.fns.get(name) else {
            return Err(ResolveError::Unknown(name.clone()));
        };
        if let Some((_, _, f)) = cands
            .iter()
            .find(|(min, max, _)| arity >= *min && max.is_none_or(|m| arity <= m))
        {
            return Ok(f);
        }
        let mut available: Vec<Arity> = cands
            .iter()
            .flat_map(|(min, max, _)| max.map(|m| *min..=m).into_iter().flatten())
            .collect();
        available.sort_unstable();
        available.dedup();
        Err(ResolveError::WrongArity {
            name: name.clone(),
            available,
        })
    }
}

impl ExtensionProvider for ExtensionRegistry {
    fn is_function_available(&self, name: &ExpandedName) -> bool {
        self.fns.contains_key(name)
    }

    fn call(
        &self,
        name: &ExpandedName,
        args: Vec<Value>,
        _key: CallSiteKey,
        ctx: &mut Context<'_>,
    ) -> Result<Value> {
        let f = self.resolve(name, args.len())?;
        f(ctx, &args)
    }
}
