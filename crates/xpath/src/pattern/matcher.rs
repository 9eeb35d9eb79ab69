use lru::LruCache;
use std::sync::{Arc, Weak};

use super::{Pattern, PatternId, PatternScore, score_pattern};
use crate::engine::{Context, EvalConfig};
use crate::error::Result;
use crate::model::{NodeHandle, Tree};

/// Pattern scorer with an optional LRU cache of `(pattern, node)` scores.
///
/// Scores depend on tree content and visible variable bindings only. The
/// cache is tied to one tree at a time and is flushed whenever the tree
/// changes or the variable stack reports a new generation.
#[derive(Debug)]
pub struct PatternMatcher {
    cache: Option<LruCache<(PatternId, NodeHandle), PatternScore>>,
    tree: Weak<Tree>,
    generation: u64,
    hits: u64,
}

impl PatternMatcher {
    pub fn new(config: &EvalConfig) -> Self {
        Self {
            cache: config.score_cache_capacity.map(LruCache::new),
            tree: Weak::new(),
            generation: 0,
            hits: 0,
        }
    }

    /// Scorer without a cache; equivalent to calling [`score_pattern`].
    pub fn uncached() -> Self {
        Self {
            cache: None,
            tree: Weak::new(),
            generation: 0,
            hits: 0,
        }
    }

    pub fn score(&mut self, pattern: &Pattern, node: NodeHandle, ctx: &mut Context<'_>) -> Result<PatternScore> {
        let key = (pattern.id(), node);
        if let Some(cache) = self.cache.as_mut() {
            let generation = ctx.variables().generation();
            let same_tree = self.tree.upgrade().is_some_and(|t| Arc::ptr_eq(&t, ctx.tree()));
            if !same_tree || generation != self.generation {
                cache.clear();
                self.tree = Arc::downgrade(ctx.tree());
                self.generation = generation;
            }
            if let Some(score) = cache.get(&key) {
                self.hits += 1;
                return Ok(*score);
            }
        }
        let score = score_pattern(pattern, node, ctx)?;
        // A function test or predicate may have changed variable state.
        let generation = ctx.variables().generation();
        if let Some(cache) = self.cache.as_mut()
            && generation == self.generation
        {
            cache.put(key, score);
        }
        Ok(score)
    }

    /// Scores of every pattern in order, for rule selection by the caller.
    pub fn score_all<'p>(
        &mut self,
        patterns: impl IntoIterator<Item = &'p Pattern>,
        node: NodeHandle,
        ctx: &mut Context<'_>,
    ) -> Result<Vec<PatternScore>> {
        patterns
            .into_iter()
            .map(|p| self.score(p, node, ctx))
            .collect()
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.as_ref().map_or(0, LruCache::len)
    }

    pub fn cache_hits(&self) -> u64 {
        self.hits
    }

    pub fn clear(&mut self) {
        if let Some(cache) = self.cache.as_mut() {
            cache.clear();
        }
    }
}
