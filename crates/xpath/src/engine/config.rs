use core::num::NonZeroUsize;

/// What a variable reference with no visible binding evaluates to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnresolvedVariablePolicy {
    /// Surface `UnresolvedVariable`.
    #[default]
    Fail,
    /// Log a warning and substitute an empty node-set.
    EmptyNodeSet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalConfig {
    /// Single-step paths without predicates return iterator-backed
    /// node-sets instead of realizing them.
    pub lazy_node_sets: bool,
    pub unresolved_variables: UnresolvedVariablePolicy,
    /// Entries kept by `PatternMatcher`; `None` disables the cache.
    pub score_cache_capacity: Option<NonZeroUsize>,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            lazy_node_sets: true,
            unresolved_variables: UnresolvedVariablePolicy::Fail,
            score_cache_capacity: NonZeroUsize::new(1024),
        }
    }
}

impl EvalConfig {
    pub fn builder() -> EvalConfigBuilder {
        EvalConfigBuilder::new()
    }
}

#[derive(Debug, Default)]
pub struct EvalConfigBuilder {
    cfg: EvalConfig,
}

impl EvalConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lazy_node_sets(mut self, lazy: bool) -> Self {
        self.cfg.lazy_node_sets = lazy;
        self
    }

    pub fn with_unresolved_variables(mut self, policy: UnresolvedVariablePolicy) -> Self {
        self.cfg.unresolved_variables = policy;
        self
    }

    /// `0` disables score caching.
    pub fn with_score_cache_capacity(mut self, capacity: usize) -> Self {
        self.cfg.score_cache_capacity = NonZeroUsize::new(capacity);
        self
    }

    pub fn build(self) -> EvalConfig {
        self.cfg
    }
}
