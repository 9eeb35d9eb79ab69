//! Bidirectional string ⟷ index interning for node names and namespace URIs.
//!
//! Trees store names as pairs of [`Symbol`]s so node records stay small and
//! name tests compare integers. Three backings share the [`SymbolPool`]
//! contract:
//!
//! - [`HashSymbolPool`]: owned strings in a hash map, the default.
//! - [`AtomSymbolPool`]: indices over process-wide `string_cache` atoms.
//! - [`SharedSymbolPool`]: wraps another pool behind a lock so several builders
//!   can intern concurrently. Interning is serialized (first writer wins).
//!   Building the pool before evaluation starts avoids the lock entirely.
//!
//! ```
//! use stylepath_xpath::symbols::{HashSymbolPool, Symbol, SymbolPool};
//!
//! let mut pool = HashSymbolPool::new();
//! let a = pool.intern("item");
//! assert_eq!(a, pool.intern("item"));
//! assert_eq!(pool.resolve(a).unwrap(), "item");
//! assert!(pool.resolve(Symbol::NULL).is_err());
//! ```
use compact_str::CompactString;
use core::fmt;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use string_cache::DefaultAtom;

use crate::error::{Error, ErrorCode, Result};

/// Index of an interned string. Never negative except [`Symbol::NULL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(i32);

impl Symbol {
    /// "No value", used for absent namespaces and prefixes.
    pub const NULL: Symbol = Symbol(-1);

    pub fn index(self) -> i32 {
        self.0
    }

    pub fn is_null(self) -> bool {
        self.0 < 0
    }

    fn from_position(pos: usize) -> Self {
        Symbol(i32::try_from(pos).expect("symbol pool exceeded i32::MAX entries"))
    }

    fn position(self) -> Option<usize> {
        usize::try_from(self.0).ok()
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

pub trait SymbolPool: Send + Sync + fmt::Debug {
    /// Stable index for `s`, allocating the next free index if unseen.
    fn intern(&mut self, s: &str) -> Symbol;

    /// Index for `s` if it was interned before; never allocates.
    fn lookup(&self, s: &str) -> Option<Symbol>;

    /// Inverse of [`intern`](Self::intern). Fails with `UnknownSymbol`.
    fn resolve(&self, sym: Symbol) -> Result<CompactString>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Interns an optional string, mapping `None` to [`Symbol::NULL`].
    fn intern_opt(&mut self, s: Option<&str>) -> Symbol {
        s.map_or(Symbol::NULL, |s| self.intern(s))
    }
}

fn unknown_symbol(sym: Symbol) -> Error {
    Error::from_code(
        ErrorCode::UnknownSymbol,
        format!("symbol {sym} was never interned"),
    )
}

#[derive(Debug, Clone, Default)]
pub struct HashSymbolPool {
    map: HashMap<CompactString, Symbol>,
    strings: Vec<CompactString>,
}

impl HashSymbolPool {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SymbolPool for HashSymbolPool {
    fn intern(&mut self, s: &str) -> Symbol {
        if let Some(&sym) = self.map.get(s) {
            return sym;
        }
        let sym = Symbol::from_position(self.strings.len());
        let owned = CompactString::from(s);
        self.strings.push(owned.clone());
        self.map.insert(owned, sym);
        sym
    }

    fn lookup(&self, s: &str) -> Option<Symbol> {
        self.map.get(s).copied()
    }

    fn resolve(&self, sym: Symbol) -> Result<CompactString> {
        sym.position()
            .and_then(|i| self.strings.get(i))
            .cloned()
            .ok_or_else(|| unknown_symbol(sym))
    }

    fn len(&self) -> usize {
        self.strings.len()
    }
}

/// Pool whose storage is the global `string_cache` atom table. Cloning atoms
/// is a refcount bump, which suits hosts that already intern names that way.
#[derive(Debug, Clone, Default)]
pub struct AtomSymbolPool {
    map: HashMap<DefaultAtom, Symbol>,
    atoms: Vec<DefaultAtom>,
}

impl AtomSymbolPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn atom(&self, sym: Symbol) -> Option<&DefaultAtom> {
        sym.position().and_then(|i| self.atoms.get(i))
    }
}

impl SymbolPool for AtomSymbolPool {
    fn intern(&mut self, s: &str) -> Symbol {
        let atom = DefaultAtom::from(s);
        if let Some(&sym) = self.map.get(&atom) {
            return sym;
        }
        let sym = Symbol::from_position(self.atoms.len());
        self.atoms.push(atom.clone());
        self.map.insert(atom, sym);
        sym
    }

    fn lookup(&self, s: &str) -> Option<Symbol> {
        self.map.get(&DefaultAtom::from(s)).copied()
    }

    fn resolve(&self, sym: Symbol) -> Result<CompactString> {
        self.atom(sym)
            .map(|a| CompactString::from(a.as_ref()))
            .ok_or_else(|| unknown_symbol(sym))
    }

    fn len(&self) -> usize {
        self.atoms.len()
    }
}

/// Lock-guarded handle onto a pool shared between threads.
///
/// Clones share the same underlying pool. `intern` takes the write lock only
/// when the string is missing and re-checks under it, so the first writer's
/// index is the one every thread observes.
#[derive(Debug, Default)]
pub struct SharedSymbolPool<P> {
    inner: Arc<RwLock<P>>,
}

impl<P> Clone for SharedSymbolPool<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P: SymbolPool> SharedSymbolPool<P> {
    pub fn new(pool: P) -> Self {
        Self {
            inner: Arc::new(RwLock::new(pool)),
        }
    }

    pub fn intern_shared(&self, s: &str) -> Symbol {
        if let Some(sym) = self.lookup(s) {
            return sym;
        }
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        guard.intern(s)
    }

    /// Copy of the current contents, e.g. to freeze the pool into a tree.
    pub fn snapshot(&self) -> P
    where
        P: Clone,
    {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl<P: SymbolPool> SymbolPool for SharedSymbolPool<P> {
    fn intern(&mut self, s: &str) -> Symbol {
        self.intern_shared(s)
    }

    fn lookup(&self, s: &str) -> Option<Symbol> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .lookup(s)
    }

    fn resolve(&self, sym: Symbol) -> Result<CompactString> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .resolve(sym)
    }

    fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise(pool: &mut dyn SymbolPool) {
        let a = pool.intern("div");
        let b = pool.intern("span");
        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);
        assert_eq!(pool.intern("div"), a);
        assert_eq!(pool.lookup("span"), Some(b));
        assert_eq!(pool.lookup("p"), None);
        assert_eq!(pool.resolve(b).unwrap(), "span");
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn hash_pool_contract() {
        exercise(&mut HashSymbolPool::new());
    }

    #[test]
    fn atom_pool_contract() {
        exercise(&mut AtomSymbolPool::new());
    }

    #[test]
    fn shared_pool_contract() {
        exercise(&mut SharedSymbolPool::new(HashSymbolPool::new()));
    }

    #[test]
    fn unknown_and_null_symbols_fail() {
        let pool = HashSymbolPool::new();
        let err = pool.resolve(Symbol::NULL).unwrap_err();
        assert_eq!(err.code, ErrorCode::UnknownSymbol);
        assert!(pool.resolve(Symbol(7)).is_err());
    }

    #[test]
    fn intern_opt_maps_none_to_null() {
        let mut pool = HashSymbolPool::new();
        assert_eq!(pool.intern_opt(None), Symbol::NULL);
        assert!(pool.intern_opt(None).is_null());
        assert_eq!(pool.intern_opt(Some("urn:a")).index(), 0);
    }

    #[test]
    fn shared_pool_threads_agree_on_indices() {
        let shared = SharedSymbolPool::new(HashSymbolPool::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let pool = shared.clone();
                std::thread::spawn(move || {
                    ["a", "b", "c"].map(|s| pool.intern_shared(s))
                })
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(results.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(shared.snapshot().len(), 3);
    }
}
