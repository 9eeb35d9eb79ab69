use std::sync::Arc;

use super::config::EvalConfig;
use super::extension::ExtensionProvider;
use crate::error::Result;
use crate::model::{NodeHandle, Tree};
use crate::variables::VariableStack;

/// Evaluation focus plus the session state an expression may touch.
///
/// The focus (tree, node, position, size) changes while predicates run; the
/// variable stack, extension provider and config stay fixed for the
/// lifetime of the context.
pub struct Context<'a> {
    tree: Arc<Tree>,
    node: NodeHandle,
    position: usize,
    size: usize,
    variables: &'a mut VariableStack,
    extensions: Option<&'a dyn ExtensionProvider>,
    config: EvalConfig,
}

impl<'a> Context<'a> {
    pub fn builder(tree: Arc<Tree>, variables: &'a mut VariableStack) -> ContextBuilder<'a> {
        ContextBuilder::new(tree, variables)
    }

    pub fn tree(&self) -> &Arc<Tree> {
        &self.tree
    }

    pub fn context_node(&self) -> NodeHandle {
        self.node
    }

    /// 1-based proximity position.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn variables(&self) -> &VariableStack {
        self.variables
    }

    pub fn variables_mut(&mut self) -> &mut VariableStack {
        self.variables
    }

    pub fn extensions(&self) -> Option<&'a dyn ExtensionProvider> {
        self.extensions
    }

    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    /// Move the context node for subsequent evaluations.
    pub fn set_context_node(&mut self, node: NodeHandle) -> Result<()> {
        self.tree.record(node)?;
        self.node = node;
        self.position = 1;
        self.size = 1;
        Ok(())
    }

    /// Run `f` with a temporary focus; the previous focus is restored on
    /// every exit path.
    pub(crate) fn with_focus<T>(
        &mut self,
        tree: &Arc<Tree>,
        node: NodeHandle,
        position: usize,
        size: usize,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let saved_tree = if Arc::ptr_eq(&self.tree, tree) {
            None
        } else {
            Some(std::mem::replace(&mut self.tree, Arc::clone(tree)))
        };
        let saved = (self.node, self.position, self.size);
        self.node = node;
        self.position = position;
        self.size = size;
        let out = f(self);
        (self.node, self.position, self.size) = saved;
        if let Some(t) = saved_tree {
            self.tree = t;
        }
        out
    }
}

pub struct ContextBuilder<'a> {
    tree: Arc<Tree>,
    node: Option<NodeHandle>,
    variables: &'a mut VariableStack,
    extensions: Option<&'a dyn ExtensionProvider>,
    config: EvalConfig,
}

impl<'a> ContextBuilder<'a> {
    pub fn new(tree: Arc<Tree>, variables: &'a mut VariableStack) -> Self {
        Self {
            tree,
            node: None,
            variables,
            extensions: None,
            config: EvalConfig::default(),
        }
    }

    /// Defaults to the document node.
    pub fn with_context_node(mut self, node: NodeHandle) -> Self {
        self.node = Some(node);
        self
    }

    pub fn with_extensions(mut self, provider: &'a dyn ExtensionProvider) -> Self {
        self.extensions = Some(provider);
        self
    }

    pub fn with_config(mut self, config: EvalConfig) -> Self {
        self.config = config;
        self
    }

    /// Fails with `InvalidNodeHandle` when the context node is not in the
    /// tree.
    pub fn build(self) -> Result<Context<'a>> {
        let node = self.node.unwrap_or_else(|| self.tree.root());
        self.tree.record(node)?;
        Ok(Context {
            tree: self.tree,
            node,
            position: 1,
            size: 1,
            variables: self.variables,
            extensions: self.extensions,
            config: self.config,
        })
    }
}
