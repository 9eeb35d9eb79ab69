use core::cell::RefCell;
use core::fmt;
use itertools::Itertools;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::model::{AxisIterator, NodeHandle, Tree};

enum State {
    /// Backed by a live cursor; members are read through clones so the
    /// original position is never disturbed.
    Lazy(AxisIterator),
    Realized {
        nodes: Arc<[NodeHandle]>,
        doc_order: bool,
    },
    Detached,
}

/// Unordered, duplicate-free set of nodes from one tree.
///
/// A node-set either wraps a live [`AxisIterator`] or a realized handle
/// slice. Realization happens on demand (`len`, document-order access) and
/// replaces the iterator, releasing its traversal state. After
/// [`detach`](Self::detach) every accessor fails with `UseAfterDetach`.
pub struct NodeSet {
    tree: Arc<Tree>,
    state: RefCell<State>,
}

impl NodeSet {
    pub fn lazy(iter: AxisIterator) -> Self {
        Self {
            tree: Arc::clone(iter.tree()),
            state: RefCell::new(State::Lazy(iter)),
        }
    }

    pub fn empty(tree: Arc<Tree>) -> Self {
        Self::realized(tree, Arc::from(Vec::new()), true)
    }

    pub fn singleton(tree: Arc<Tree>, node: NodeHandle) -> Self {
        Self::realized(tree, Arc::from(vec![node]), true)
    }

    /// Sorts into document order and removes duplicates.
    pub fn from_nodes(tree: Arc<Tree>, nodes: impl IntoIterator<Item = NodeHandle>) -> Self {
        let sorted: Vec<NodeHandle> = nodes.into_iter().sorted_unstable().dedup().collect();
        Self::realized(tree, Arc::from(sorted), true)
    }

    /// `nodes` must already be in document order without duplicates.
    pub(crate) fn from_sorted(tree: Arc<Tree>, nodes: Vec<NodeHandle>) -> Self {
        debug_assert!(nodes.windows(2).all(|w| w[0] < w[1]));
        Self::realized(tree, Arc::from(nodes), true)
    }

    fn realized(tree: Arc<Tree>, nodes: Arc<[NodeHandle]>, doc_order: bool) -> Self {
        Self {
            tree,
            state: RefCell::new(State::Realized { nodes, doc_order }),
        }
    }

    pub fn tree(&self) -> &Arc<Tree> {
        &self.tree
    }

    pub fn is_detached(&self) -> bool {
        matches!(*self.state.borrow(), State::Detached)
    }

    pub fn is_lazy(&self) -> bool {
        matches!(*self.state.borrow(), State::Lazy(_))
    }

    /// Release the backing iterator or slice. Idempotent.
    pub fn detach(&self) {
        // Dropping the iterator releases its slot on the tree.
        let old = self.state.replace(State::Detached);
        drop(old);
    }

    /// Members in iteration order: axis order while lazy, document order
    /// once realized.
    pub fn members(&self) -> Result<Members> {
        match &*self.state.borrow() {
            State::Lazy(iter) => Ok(Members::Cursor(iter.clone_iterator()?)),
            State::Realized { nodes, .. } => Ok(Members::Slice {
                nodes: Arc::clone(nodes),
                idx: 0,
            }),
            State::Detached => Err(Error::use_after_detach("node-set")),
        }
    }

    /// Drain a lazy iterator into a document-ordered slice. No-op when
    /// already realized.
    pub fn realize(&self) -> Result<()> {
        let mut state = self.state.borrow_mut();
        match &mut *state {
            State::Realized { .. } => Ok(()),
            State::Detached => Err(Error::use_after_detach("node-set")),
            State::Lazy(iter) => {
                let reverse = iter.is_reverse();
                let mut nodes: Vec<NodeHandle> = iter.by_ref().collect();
                if reverse {
                    nodes.reverse();
                }
                *state = State::Realized {
                    nodes: Arc::from(nodes),
                    doc_order: true,
                };
                Ok(())
            }
        }
    }

    /// Members in document order.
    pub fn sorted(&self) -> Result<Arc<[NodeHandle]>> {
        self.realize()?;
        let mut state = self.state.borrow_mut();
        match &mut *state {
            State::Realized { nodes, doc_order } => {
                if !*doc_order {
                    let sorted: Vec<NodeHandle> =
                        nodes.iter().copied().sorted_unstable().dedup().collect();
                    *nodes = Arc::from(sorted);
                    *doc_order = true;
                }
                Ok(Arc::clone(nodes))
            }
            State::Detached | State::Lazy(_) => Err(Error::use_after_detach("node-set")),
        }
    }

    /// First member in document order without realizing forward axes.
    pub fn first(&self) -> Result<Option<NodeHandle>> {
        let forward_lazy = match &*self.state.borrow() {
            State::Lazy(iter) if !iter.is_reverse() => Some(iter.clone_iterator()?),
            State::Detached => return Err(Error::use_after_detach("node-set")),
            _ => None,
        };
        match forward_lazy {
            Some(mut cursor) => Ok(cursor.next()),
            None => Ok(self.sorted()?.first().copied()),
        }
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.members()?.next().is_none())
    }

    pub fn len(&self) -> Result<usize> {
        self.realize()?;
        match &*self.state.borrow() {
            State::Realized { nodes, .. } => Ok(nodes.len()),
            _ => Err(Error::use_after_detach("node-set")),
        }
    }

    pub fn contains(&self, node: NodeHandle) -> Result<bool> {
        Ok(self.members()?.any(|h| h == node))
    }

    /// String-values of all members, in iteration order.
    pub fn string_values(&self) -> Result<Vec<String>> {
        self.members()?
            .map(|h| self.tree.string_value(h))
            .collect()
    }

    /// String-value of the first member in document order, or `""`.
    pub fn first_string(&self) -> Result<String> {
        match self.first()? {
            Some(h) => self.tree.string_value(h),
            None => Ok(String::new()),
        }
    }
}

impl Clone for NodeSet {
    /// Lazy sets clone their cursor; single-pass cursors are realized first
    /// and the slice is shared.
    fn clone(&self) -> Self {
        let cursor = match &*self.state.borrow() {
            State::Lazy(iter) => iter.clone_iterator().ok(),
            _ => None,
        };
        if let Some(cursor) = cursor {
            return NodeSet::lazy(cursor);
        }
        if self.realize().is_err() {
            return Self {
                tree: Arc::clone(&self.tree),
                state: RefCell::new(State::Detached),
            };
        }
        let state = match &*self.state.borrow() {
            State::Realized { nodes, doc_order } => State::Realized {
                nodes: Arc::clone(nodes),
                doc_order: *doc_order,
            },
            _ => State::Detached,
        };
        Self {
            tree: Arc::clone(&self.tree),
            state: RefCell::new(state),
        }
    }
}

impl fmt::Debug for NodeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.state.borrow() {
            State::Lazy(iter) => f
                .debug_struct("NodeSet")
                .field("axis", &iter.axis())
                .field("start", &iter.start_node())
                .finish(),
            State::Realized { nodes, .. } => f.debug_tuple("NodeSet").field(nodes).finish(),
            State::Detached => f.write_str("NodeSet(<detached>)"),
        }
    }
}

/// Iterator returned by [`NodeSet::members`].
#[derive(Debug)]
pub enum Members {
    Cursor(AxisIterator),
    Slice { nodes: Arc<[NodeHandle]>, idx: usize },
}

impl Iterator for Members {
    type Item = NodeHandle;

    fn next(&mut self) -> Option<NodeHandle> {
        match self {
            Members::Cursor(iter) => iter.next(),
            Members::Slice { nodes, idx } => {
                let out = nodes.get(*idx).copied();
                *idx += 1;
                out
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Axis;
    use crate::model::builder::{doc, elem};

    fn sample() -> Arc<Tree> {
        doc()
            .child(elem("r").child(elem("a")).child(elem("b")).child(elem("c")))
            .build()
    }

    #[test]
    fn lazy_members_do_not_move_the_cursor() {
        let tree = sample();
        let r = tree.first_child(tree.root()).unwrap();
        let set = NodeSet::lazy(tree.axis_iterator(r, Axis::Child, None).unwrap());
        assert_eq!(set.members().unwrap().count(), 3);
        assert_eq!(set.members().unwrap().count(), 3);
        assert!(set.is_lazy());
        assert_eq!(set.len().unwrap(), 3);
        assert!(!set.is_lazy());
    }

    #[test]
    fn reverse_axis_realizes_in_document_order() {
        let tree = sample();
        let c = NodeHandle(5);
        let set = NodeSet::lazy(tree.axis_iterator(c, Axis::PrecedingSibling, None).unwrap());
        assert_eq!(set.members().unwrap().next(), Some(NodeHandle(4)));
        assert_eq!(&*set.sorted().unwrap(), &[NodeHandle(3), NodeHandle(4)]);
        assert_eq!(set.first().unwrap(), Some(NodeHandle(3)));
    }

    #[test]
    fn detach_releases_and_blocks_access() {
        let tree = sample();
        let set = NodeSet::lazy(tree.axis_iterator(tree.root(), Axis::Descendant, None).unwrap());
        assert_eq!(tree.live_iterators(), 1);
        set.detach();
        set.detach();
        assert_eq!(tree.live_iterators(), 0);
        let err = set.members().unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::UseAfterDetach);
    }

    #[test]
    fn from_nodes_sorts_and_dedups() {
        let tree = sample();
        let set = NodeSet::from_nodes(
            Arc::clone(&tree),
            [NodeHandle(4), NodeHandle(3), NodeHandle(4)],
        );
        assert_eq!(&*set.sorted().unwrap(), &[NodeHandle(3), NodeHandle(4)]);
    }
}
