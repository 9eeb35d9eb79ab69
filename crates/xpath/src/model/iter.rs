//! Restartable axis cursors.
//!
//! Each [`AxisIterator`] is an explicit state machine rather than a closure
//! chain so it can be cloned, bookmarked and rewound. The cursor only holds
//! handles and counters; all structural lookups go through the shared tree.
use smallvec::SmallVec;
use std::sync::Arc;
use tracing::trace;

use super::node_test::CompiledTest;
use super::{Axis, NodeHandle, NodeKind, NodeTest, Tree};
use crate::error::{Error, ErrorCode, Result};
use crate::symbols::Symbol;

#[derive(Debug, Clone)]
enum Cursor {
    Done,
    Once(NodeHandle),
    // child / following-sibling / preceding-sibling via sibling links
    Siblings {
        next: NodeHandle,
        forward: bool,
    },
    // contiguous handle ranges; `end` is exclusive
    Range {
        next: u32,
        end: u32,
        content_only: bool,
    },
    Ancestors {
        next: NodeHandle,
    },
    // backwards scan; `skip` is the next ancestor to leave out
    Preceding {
        next: u32,
        skip: NodeHandle,
    },
    Buffered {
        nodes: SmallVec<[NodeHandle; 8]>,
        idx: usize,
    },
}

#[derive(Debug)]
pub struct AxisIterator {
    tree: Arc<Tree>,
    axis: Axis,
    test: Option<NodeTest>,
    compiled: CompiledTest,
    start: NodeHandle,
    cursor: Cursor,
    mark: Option<Cursor>,
    restartable: bool,
    open: bool,
}

impl AxisIterator {
    pub(crate) fn new(
        tree: Arc<Tree>,
        start: NodeHandle,
        axis: Axis,
        test: Option<NodeTest>,
    ) -> Result<Self> {
        tree.record(start)?;
        let compiled = test
            .as_ref()
            .map_or(CompiledTest::Any, |t| t.compile(tree.symbols()));
        let cursor = initial_cursor(&tree, axis, start);
        trace!(%axis, %start, ?compiled, "axis iterator created");
        tree.acquire_iterator();
        Ok(Self {
            tree,
            axis,
            test,
            compiled,
            start,
            cursor,
            mark: None,
            restartable: true,
            open: true,
        })
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    pub fn tree(&self) -> &Arc<Tree> {
        &self.tree
    }

    pub fn node_test(&self) -> Option<&NodeTest> {
        self.test.as_ref()
    }

    /// Current start node; `NULL` once the iterator is closed.
    pub fn start_node(&self) -> NodeHandle {
        self.start
    }

    pub fn is_reverse(&self) -> bool {
        self.axis.is_reverse()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Next handle in axis order, or [`NodeHandle::NULL`] at the end. Keeps
    /// returning `NULL` until the iterator is reset or rebound.
    pub fn next_node(&mut self) -> NodeHandle {
        if !self.open {
            return NodeHandle::NULL;
        }
        let principal = self.axis.principal_kind();
        loop {
            let candidate = self.advance();
            if candidate.is_null() || self.compiled.matches(&self.tree, candidate, principal) {
                return candidate;
            }
        }
    }

    fn advance(&mut self) -> NodeHandle {
        let tree = &*self.tree;
        let produced = match &mut self.cursor {
            Cursor::Done => None,
            Cursor::Once(h) => {
                let h = *h;
                self.cursor = Cursor::Done;
                Some(h)
            }
            Cursor::Siblings { next, forward } => {
                let cur = *next;
                if !cur.is_null() {
                    let rec = tree.rec(cur);
                    *next = if *forward {
                        rec.next_sibling
                    } else {
                        rec.prev_sibling
                    };
                }
                (!cur.is_null()).then_some(cur)
            }
            Cursor::Range {
                next,
                end,
                content_only,
            } => {
                let mut found = None;
                while *next < *end {
                    let h = NodeHandle(*next);
                    *next += 1;
                    if !*content_only || !tree.rec(h).kind.is_attribute_like() {
                        found = Some(h);
                        break;
                    }
                }
                found
            }
            Cursor::Ancestors { next } => {
                let cur = *next;
                if !cur.is_null() {
                    *next = tree.rec(cur).parent;
                }
                (!cur.is_null()).then_some(cur)
            }
            Cursor::Preceding { next, skip } => {
                let mut found = None;
                while *next > 0 {
                    let h = NodeHandle(*next);
                    *next -= 1;
                    if h == *skip {
                        *skip = tree.rec(h).parent;
                        continue;
                    }
                    if !tree.rec(h).kind.is_attribute_like() {
                        found = Some(h);
                        break;
                    }
                }
                found
            }
            Cursor::Buffered { nodes, idx } => {
                let out = nodes.get(*idx).copied();
                *idx += 1;
                out
            }
        };
        match produced {
            Some(h) => h,
            None => {
                self.cursor = Cursor::Done;
                NodeHandle::NULL
            }
        }
    }

    /// Rebind to a new context node. `NULL` closes the iterator and releases
    /// its traversal state.
    pub fn set_start_node(&mut self, handle: NodeHandle) -> Result<()> {
        if handle.is_null() {
            self.detach();
            return Ok(());
        }
        self.tree.record(handle)?;
        if !self.open {
            self.tree.acquire_iterator();
            self.open = true;
        }
        self.start = handle;
        self.cursor = initial_cursor(&self.tree, self.axis, handle);
        self.mark = None;
        Ok(())
    }

    /// Rewind to the last start node.
    pub fn reset(&mut self) -> Result<()> {
        self.ensure_restartable("reset")?;
        if self.open {
            self.cursor = initial_cursor(&self.tree, self.axis, self.start);
        }
        Ok(())
    }

    pub fn set_mark(&mut self) {
        self.mark = Some(self.cursor.clone());
    }

    /// Return to the position saved by [`set_mark`](Self::set_mark). Without
    /// a saved mark this is a no-op.
    pub fn goto_mark(&mut self) {
        if self.open
            && let Some(mark) = &self.mark
        {
            self.cursor = mark.clone();
        }
    }

    /// Independent cursor at the same start node and position.
    pub fn clone_iterator(&self) -> Result<Self> {
        self.ensure_restartable("clone_iterator")?;
        if self.open {
            self.tree.acquire_iterator();
        }
        Ok(Self {
            tree: Arc::clone(&self.tree),
            axis: self.axis,
            test: self.test.clone(),
            compiled: self.compiled,
            start: self.start,
            cursor: self.cursor.clone(),
            mark: self.mark.clone(),
            restartable: self.restartable,
            open: self.open,
        })
    }

    /// Single-pass mode: `reset` and `clone_iterator` become errors.
    pub fn set_restartable(&mut self, restartable: bool) {
        self.restartable = restartable;
    }

    pub fn is_restartable(&self) -> bool {
        self.restartable
    }

    /// Close the iterator. Idempotent.
    pub fn detach(&mut self) {
        if self.open {
            self.open = false;
            self.tree.release_iterator();
        }
        self.start = NodeHandle::NULL;
        self.cursor = Cursor::Done;
        self.mark = None;
    }

    fn ensure_restartable(&self, op: &str) -> Result<()> {
        if self.restartable {
            Ok(())
        } else {
            tracing::warn!(axis = %self.axis, op, "restart of single-pass iterator");
            Err(Error::from_code(
                ErrorCode::IteratorNotRestartable,
                format!("{op} on a non-restartable {} iterator", self.axis),
            ))
        }
    }
}

impl Iterator for AxisIterator {
    type Item = NodeHandle;

    fn next(&mut self) -> Option<NodeHandle> {
        let h = self.next_node();
        (!h.is_null()).then_some(h)
    }
}

impl Drop for AxisIterator {
    fn drop(&mut self) {
        if self.open {
            self.tree.release_iterator();
        }
    }
}

fn initial_cursor(tree: &Tree, axis: Axis, start: NodeHandle) -> Cursor {
    let rec = tree.rec(start);
    let end = tree.last_handle().0 + 1;
    let attribute_like = rec.kind.is_attribute_like();
    match axis {
        Axis::SelfAxis => Cursor::Once(start),
        Axis::Parent if rec.parent.is_null() => Cursor::Done,
        Axis::Parent => Cursor::Once(rec.parent),
        Axis::Root => Cursor::Once(tree.root()),
        Axis::Child => Cursor::Siblings {
            next: rec.first_child,
            forward: true,
        },
        Axis::FollowingSibling if attribute_like => Cursor::Done,
        Axis::FollowingSibling => Cursor::Siblings {
            next: rec.next_sibling,
            forward: true,
        },
        Axis::PrecedingSibling if attribute_like => Cursor::Done,
        Axis::PrecedingSibling => Cursor::Siblings {
            next: rec.prev_sibling,
            forward: false,
        },
        Axis::Attribute | Axis::NamespaceDecls if rec.kind != NodeKind::Element => Cursor::Done,
        Axis::Attribute => {
            let (next, end) = tree.attribute_range(start);
            Cursor::Range {
                next,
                end,
                content_only: false,
            }
        }
        Axis::NamespaceDecls => {
            let (next, end) = tree.namespace_range(start);
            Cursor::Range {
                next,
                end,
                content_only: false,
            }
        }
        Axis::Namespace if rec.kind != NodeKind::Element => Cursor::Done,
        Axis::Namespace => Cursor::Buffered {
            nodes: in_scope_namespaces(tree, start),
            idx: 0,
        },
        Axis::Descendant => Cursor::Range {
            next: start.0 + 1,
            end: rec.subtree_end.0 + 1,
            content_only: true,
        },
        Axis::DescendantOrSelf if attribute_like => Cursor::Once(start),
        Axis::DescendantOrSelf => Cursor::Range {
            next: start.0,
            end: rec.subtree_end.0 + 1,
            content_only: true,
        },
        Axis::Following => Cursor::Range {
            next: rec.subtree_end.0 + 1,
            end,
            content_only: true,
        },
        Axis::Preceding => Cursor::Preceding {
            next: start.0 - 1,
            skip: rec.parent,
        },
        Axis::Ancestor => Cursor::Ancestors { next: rec.parent },
        Axis::AncestorOrSelf => Cursor::Ancestors { next: start },
        Axis::All => Cursor::Range {
            next: tree.root().0,
            end,
            content_only: false,
        },
        Axis::DescendantsFromRoot => Cursor::Range {
            next: tree.root().0 + 1,
            end,
            content_only: true,
        },
        Axis::DescendantsOrSelfFromRoot => Cursor::Range {
            next: tree.root().0,
            end,
            content_only: true,
        },
    }
}

/// Namespace nodes in scope on `element`, nearest declaration per prefix
/// winning, in document order. Undeclarations (`xmlns=""`) hide the prefix.
fn in_scope_namespaces(tree: &Tree, element: NodeHandle) -> SmallVec<[NodeHandle; 8]> {
    let mut seen: SmallVec<[Symbol; 8]> = SmallVec::new();
    let mut out: SmallVec<[NodeHandle; 8]> = SmallVec::new();
    let mut cur = element;
    while !cur.is_null() && tree.rec(cur).kind == NodeKind::Element {
        let (from, to) = tree.namespace_range(cur);
        for h in from..to {
            let handle = NodeHandle(h);
            let rec = tree.rec(handle);
            let prefix = rec.name.local;
            if seen.contains(&prefix) {
                continue;
            }
            seen.push(prefix);
            if !rec.value.is_empty() {
                out.push(handle);
            }
        }
        cur = tree.rec(cur).parent;
    }
    out.sort_unstable();
    out
}
