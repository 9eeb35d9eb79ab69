//! Match patterns and rule scoring.
//!
//! A [`Pattern`] is a union of [`PathPattern`]s; each path is a chain of
//! [`StepPattern`]s joined by parent (`/`) or ancestor (`//`) relations and
//! matched right to left from the candidate node. The score of a pattern is
//! the best score among its alternatives.
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

use crate::ast::Expr;
use crate::engine::Context;
use crate::engine::evaluator::{operand, predicate_holds};
use crate::error::Result;
use crate::model::{Axis, NodeHandle, NodeKind, NodeTest, Tree};
use crate::names::ExpandedName;

mod matcher;

pub use matcher::PatternMatcher;

/// How specifically a pattern matched; `None` means no match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum PatternScore {
    #[default]
    None,
    Other,
    NamespaceWildcard,
    QualifiedName,
}

impl PatternScore {
    pub fn is_match(self) -> bool {
        self != PatternScore::None
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PatternTest {
    Node(NodeTest),
    /// Expression evaluated to a node-set; matches nodes it contains.
    Function(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepPattern {
    pub axis: Axis,
    pub test: PatternTest,
    pub predicates: Vec<Expr>,
}

impl StepPattern {
    pub fn new(axis: Axis, test: PatternTest) -> Self {
        Self {
            axis,
            test,
            predicates: Vec::new(),
        }
    }

    /// Child-axis step, the default for `foo`, `*`, `text()`.
    pub fn child(test: NodeTest) -> Self {
        Self::new(Axis::Child, PatternTest::Node(test))
    }

    /// `@foo`
    pub fn attribute(test: NodeTest) -> Self {
        Self::new(Axis::Attribute, PatternTest::Node(test))
    }

    /// `id('x')`, `key(...)` and other function-headed steps.
    pub fn function(expr: Expr) -> Self {
        Self::new(Axis::SelfAxis, PatternTest::Function(expr))
    }

    pub fn with_predicate(mut self, predicate: Expr) -> Self {
        self.predicates.push(predicate);
        self
    }
}

/// Relation between a step and the step to its left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepRelation {
    /// `a/b`
    Parent,
    /// `a//b`
    Ancestor,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PathPattern {
    /// Anchored at the document node (`/a`, `//a`, `/`).
    pub absolute: bool,
    /// `(relation to the previous step, step)`; the first relation links
    /// to the document node when `absolute`.
    pub steps: Vec<(StepRelation, StepPattern)>,
}

impl PathPattern {
    pub fn step(step: StepPattern) -> Self {
        Self {
            absolute: false,
            steps: vec![(StepRelation::Parent, step)],
        }
    }

    /// The pattern `/`.
    pub fn root() -> Self {
        Self {
            absolute: true,
            steps: Vec::new(),
        }
    }

    /// `/step`
    pub fn absolute(step: StepPattern) -> Self {
        Self {
            absolute: true,
            steps: vec![(StepRelation::Parent, step)],
        }
    }

    /// `self/step`
    pub fn child(mut self, step: StepPattern) -> Self {
        self.steps.push((StepRelation::Parent, step));
        self
    }

    /// `self//step`
    pub fn descendant(mut self, step: StepPattern) -> Self {
        self.steps.push((StepRelation::Ancestor, step));
        self
    }
}

impl From<StepPattern> for PathPattern {
    fn from(step: StepPattern) -> Self {
        PathPattern::step(step)
    }
}

/// Identity used by score caches; clones share it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PatternId(u64);

static NEXT_PATTERN: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    id: PatternId,
    alternatives: Vec<PathPattern>,
}

impl Pattern {
    pub fn new(alternatives: Vec<PathPattern>) -> Self {
        Self {
            id: PatternId(NEXT_PATTERN.fetch_add(1, Ordering::Relaxed)),
            alternatives,
        }
    }

    pub fn id(&self) -> PatternId {
        self.id
    }

    pub fn alternatives(&self) -> &[PathPattern] {
        &self.alternatives
    }

    /// Bind variables in every predicate and function test.
    pub fn fixup_variables(&mut self, declared: &[ExpandedName], globals_boundary: usize) -> Result<()> {
        for path in &mut self.alternatives {
            for (_, step) in &mut path.steps {
                if let PatternTest::Function(expr) = &mut step.test {
                    expr.fixup_variables(declared, globals_boundary)?;
                }
                for p in &mut step.predicates {
                    p.fixup_variables(declared, globals_boundary)?;
                }
            }
        }
        Ok(())
    }
}

impl From<PathPattern> for Pattern {
    fn from(path: PathPattern) -> Self {
        Pattern::new(vec![path])
    }
}

impl From<StepPattern> for Pattern {
    fn from(step: StepPattern) -> Self {
        Pattern::new(vec![PathPattern::step(step)])
    }
}

/// Score `node` against every alternative of `pattern`; the best wins.
pub fn score_pattern(pattern: &Pattern, node: NodeHandle, ctx: &mut Context<'_>) -> Result<PatternScore> {
    let tree = Arc::clone(ctx.tree());
    tree.record(node)?;
    let mut best = PatternScore::None;
    for path in &pattern.alternatives {
        let score = score_path(&tree, path, node, ctx)?;
        best = best.max(score);
        if best == PatternScore::QualifiedName {
            break;
        }
    }
    trace!(pattern = ?pattern.id, %node, score = ?best, "pattern scored");
    Ok(best)
}

/// The final step's score when every step to its left matches too.
fn score_path(
    tree: &Arc<Tree>,
    path: &PathPattern,
    node: NodeHandle,
    ctx: &mut Context<'_>,
) -> Result<PatternScore> {
    let Some(((_, last), _)) = path.steps.split_last() else {
        let is_root = path.absolute && tree.node_kind(node)? == NodeKind::Document;
        return Ok(if is_root {
            PatternScore::Other
        } else {
            PatternScore::None
        });
    };
    let score = score_step(tree, last, node, ctx)?;
    if !score.is_match() || !links_match(tree, path, path.steps.len() - 1, node, ctx)? {
        return Ok(PatternScore::None);
    }
    Ok(score)
}

/// Whether the steps left of `idx` match around `node`, which already
/// matched step `idx`.
fn links_match(
    tree: &Arc<Tree>,
    path: &PathPattern,
    idx: usize,
    node: NodeHandle,
    ctx: &mut Context<'_>,
) -> Result<bool> {
    let relation = path.steps[idx].0;
    let parent = tree.parent(node)?;
    if idx == 0 {
        if !path.absolute {
            return Ok(true);
        }
        return Ok(match relation {
            StepRelation::Parent => parent == tree.root(),
            StepRelation::Ancestor => !parent.is_null(),
        });
    }
    let prev = &path.steps[idx - 1].1;
    let mut candidate = parent;
    while !candidate.is_null() {
        if score_step(tree, prev, candidate, ctx)?.is_match()
            && links_match(tree, path, idx - 1, candidate, ctx)?
        {
            return Ok(true);
        }
        if relation == StepRelation::Parent {
            break;
        }
        candidate = tree.parent(candidate)?;
    }
    Ok(false)
}

/// Structural score of one step, refined by its predicates.
pub fn score_step(
    tree: &Arc<Tree>,
    step: &StepPattern,
    node: NodeHandle,
    ctx: &mut Context<'_>,
) -> Result<PatternScore> {
    let structural = match &step.test {
        PatternTest::Node(test) => node_test_score(tree, step.axis, test, node)?,
        PatternTest::Function(expr) => function_score(tree, expr, node, ctx)?,
    };
    if !structural.is_match() || step.predicates.is_empty() {
        return Ok(structural);
    }
    let (position, size) = proximity(tree, step, node)?;
    for pred in &step.predicates {
        if !ctx.with_focus(tree, node, position, size, |c| predicate_holds(pred, c))? {
            return Ok(PatternScore::None);
        }
    }
    Ok(structural)
}

fn node_test_score(tree: &Tree, axis: Axis, test: &NodeTest, node: NodeHandle) -> Result<PatternScore> {
    let kind = tree.node_kind(node)?;
    let on_axis = match axis {
        Axis::Attribute => kind == NodeKind::Attribute,
        Axis::Namespace | Axis::NamespaceDecls => kind == NodeKind::Namespace,
        Axis::Child => !kind.is_attribute_like() && kind != NodeKind::Document,
        _ => true,
    };
    if !on_axis || !test.compile(tree.symbols()).matches(tree, node, axis.principal_kind()) {
        return Ok(PatternScore::None);
    }
    Ok(match test {
        NodeTest::Name { .. } | NodeTest::ProcessingInstruction(Some(_)) => PatternScore::QualifiedName,
        NodeTest::NamespaceWildcard(_) => PatternScore::NamespaceWildcard,
        _ => PatternScore::Other,
    })
}

/// Evaluate `expr` at `node` as a node-set and look for `node` in it. The
/// result set is detached before returning.
fn function_score(
    tree: &Arc<Tree>,
    expr: &Expr,
    node: NodeHandle,
    ctx: &mut Context<'_>,
) -> Result<PatternScore> {
    ctx.with_focus(tree, node, 1, 1, |c| {
        let value = operand(expr, c)?;
        let set = value.as_node_set()?;
        let found = Arc::ptr_eq(set.tree(), tree) && set.contains(node)?;
        value.detach();
        Ok(if found {
            PatternScore::Other
        } else {
            PatternScore::None
        })
    })
}

/// Position of `node` among its siblings on the step's axis that pass the
/// same node test. Function steps and other axes count as a single node.
fn proximity(tree: &Arc<Tree>, step: &StepPattern, node: NodeHandle) -> Result<(usize, usize)> {
    let PatternTest::Node(test) = &step.test else {
        return Ok((1, 1));
    };
    let axis = match step.axis {
        Axis::Child | Axis::Attribute => step.axis,
        Axis::Namespace | Axis::NamespaceDecls => Axis::NamespaceDecls,
        _ => return Ok((1, 1)),
    };
    let parent = tree.parent(node)?;
    if parent.is_null() {
        return Ok((1, 1));
    }
    let mut iter = tree.axis_iterator(parent, axis, Some(test.clone()))?;
    let (mut position, mut size) = (0, 0);
    for h in iter.by_ref() {
        size += 1;
        if h == node {
            position = size;
        }
    }
    iter.detach();
    Ok((position.max(1), size.max(1)))
}
