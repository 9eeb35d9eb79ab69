//! Compact node tree addressed by dense integer handles.
//!
//! A [`Tree`] is an immutable arena produced by [`builder::DocumentBuilder`].
//! Nodes are laid out depth-first: every element is followed by its namespace
//! nodes, then its attributes, then its children's subtrees. Handle order is
//! therefore document order, and every node's subtree is a contiguous handle
//! range, which keeps descendant/following/preceding scans index-based.
//!
//! Trees are `Send + Sync` and are shared read-only behind `Arc`.
use compact_str::CompactString;
use core::cmp::Ordering;
use core::fmt;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

use crate::error::{Error, Result};
use crate::symbols::{Symbol, SymbolPool};

pub mod axis;
pub mod builder;
pub mod iter;

pub use axis::Axis;
pub use iter::AxisIterator;
pub use node_test::NodeTest;

/// Namespace bound to the `xml` prefix.
pub const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// Opaque node identifier, valid for the lifetime of one tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct NodeHandle(pub(crate) u32);

impl NodeHandle {
    /// "No node"; also the end-of-iteration sentinel.
    pub const NULL: NodeHandle = NodeHandle(0);

    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    pub fn get(self) -> u32 {
        self.0
    }

    fn slot(self) -> Option<usize> {
        (self.0 as usize).checked_sub(1)
    }
}

impl fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Document,
    Element,
    Attribute,
    Text,
    Comment,
    ProcessingInstruction,
    Namespace,
}

impl NodeKind {
    /// Attribute and namespace nodes are not children of anything and are
    /// skipped by every content axis.
    pub fn is_attribute_like(self) -> bool {
        matches!(self, NodeKind::Attribute | NodeKind::Namespace)
    }
}

/// Expanded name as symbol indices; `ns` is [`Symbol::NULL`] when the node
/// has no namespace, both are `NULL` for unnamed nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeName {
    pub ns: Symbol,
    pub local: Symbol,
}

impl NodeName {
    pub const NONE: NodeName = NodeName {
        ns: Symbol::NULL,
        local: Symbol::NULL,
    };
}

#[derive(Debug, Clone)]
pub(crate) struct NodeRecord {
    pub(crate) kind: NodeKind,
    pub(crate) name: NodeName,
    pub(crate) prefix: Symbol,
    pub(crate) value: CompactString,
    pub(crate) parent: NodeHandle,
    pub(crate) first_child: NodeHandle,
    pub(crate) last_child: NodeHandle,
    pub(crate) next_sibling: NodeHandle,
    pub(crate) prev_sibling: NodeHandle,
    pub(crate) namespace_count: u32,
    pub(crate) attribute_count: u32,
    /// Last handle inside this node's subtree (the node itself for leaves).
    pub(crate) subtree_end: NodeHandle,
}

impl NodeRecord {
    pub(crate) fn new(kind: NodeKind, name: NodeName, prefix: Symbol, value: CompactString) -> Self {
        Self {
            kind,
            name,
            prefix,
            value,
            parent: NodeHandle::NULL,
            first_child: NodeHandle::NULL,
            last_child: NodeHandle::NULL,
            next_sibling: NodeHandle::NULL,
            prev_sibling: NodeHandle::NULL,
            namespace_count: 0,
            attribute_count: 0,
            subtree_end: NodeHandle::NULL,
        }
    }
}

pub struct Tree {
    nodes: Vec<NodeRecord>,
    symbols: Box<dyn SymbolPool>,
    ids: HashMap<CompactString, NodeHandle>,
    live_iterators: AtomicUsize,
}

impl fmt::Debug for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tree")
            .field("nodes", &self.nodes.len())
            .field("symbols", &self.symbols.len())
            .field("live_iterators", &self.live_iterators())
            .finish()
    }
}

impl Tree {
    pub(crate) fn from_parts(
        nodes: Vec<NodeRecord>,
        symbols: Box<dyn SymbolPool>,
        ids: HashMap<CompactString, NodeHandle>,
    ) -> Arc<Self> {
        Arc::new(Self {
            nodes,
            symbols,
            ids,
            live_iterators: AtomicUsize::new(0),
        })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The document node; every tree has exactly one.
    pub fn root(&self) -> NodeHandle {
        NodeHandle(1)
    }

    pub fn symbols(&self) -> &dyn SymbolPool {
        self.symbols.as_ref()
    }

    pub fn is_valid(&self, handle: NodeHandle) -> bool {
        handle.slot().is_some_and(|i| i < self.nodes.len())
    }

    pub(crate) fn record(&self, handle: NodeHandle) -> Result<&NodeRecord> {
        handle
            .slot()
            .and_then(|i| self.nodes.get(i))
            .ok_or_else(|| Error::invalid_handle(handle))
    }

    /// Unchecked access for handles already validated by the caller.
    pub(crate) fn rec(&self, handle: NodeHandle) -> &NodeRecord {
        &self.nodes[handle.0 as usize - 1]
    }

    pub(crate) fn last_handle(&self) -> NodeHandle {
        NodeHandle(u32::try_from(self.nodes.len()).unwrap_or(u32::MAX))
    }

    /// `NULL` for the document node and for nothing else.
    pub fn parent(&self, handle: NodeHandle) -> Result<NodeHandle> {
        Ok(self.record(handle)?.parent)
    }

    pub fn node_kind(&self, handle: NodeHandle) -> Result<NodeKind> {
        Ok(self.record(handle)?.kind)
    }

    pub fn expanded_name(&self, handle: NodeHandle) -> Result<NodeName> {
        Ok(self.record(handle)?.name)
    }

    /// Local part of the expanded name; empty for unnamed nodes.
    pub fn local_name(&self, handle: NodeHandle) -> Result<CompactString> {
        let name = self.record(handle)?.name;
        self.resolve_or_empty(name.local)
    }

    pub fn namespace_uri(&self, handle: NodeHandle) -> Result<Option<CompactString>> {
        let name = self.record(handle)?.name;
        if name.ns.is_null() {
            return Ok(None);
        }
        self.symbols.resolve(name.ns).map(Some)
    }

    pub fn prefix(&self, handle: NodeHandle) -> Result<Option<CompactString>> {
        let rec = self.record(handle)?;
        if rec.prefix.is_null() {
            return Ok(None);
        }
        self.symbols.resolve(rec.prefix).map(Some)
    }

    /// `prefix:local` as written in the source, or just `local`.
    pub fn qualified_name(&self, handle: NodeHandle) -> Result<CompactString> {
        let rec = self.record(handle)?;
        let local = self.resolve_or_empty(rec.name.local)?;
        if rec.prefix.is_null() || rec.kind == NodeKind::Namespace {
            return Ok(local);
        }
        let mut out = self.symbols.resolve(rec.prefix)?;
        out.push(':');
        out.push_str(&local);
        Ok(out)
    }

    fn resolve_or_empty(&self, sym: Symbol) -> Result<CompactString> {
        if sym.is_null() {
            Ok(CompactString::default())
        } else {
            self.symbols.resolve(sym)
        }
    }

    /// XPath string-value: concatenated descendant text for documents and
    /// elements, the literal value for every other kind.
    pub fn string_value(&self, handle: NodeHandle) -> Result<String> {
        let rec = self.record(handle)?;
        match rec.kind {
            NodeKind::Document | NodeKind::Element => {
                let mut out = String::new();
                for h in (handle.0 + 1)..=rec.subtree_end.0 {
                    let r = self.rec(NodeHandle(h));
                    if r.kind == NodeKind::Text {
                        out.push_str(&r.value);
                    }
                }
                Ok(out)
            }
            _ => Ok(rec.value.to_string()),
        }
    }

    /// Total order over one tree's nodes, identical to depth-first
    /// left-to-right traversal.
    pub fn document_order_compare(&self, a: NodeHandle, b: NodeHandle) -> Result<Ordering> {
        self.record(a)?;
        self.record(b)?;
        Ok(a.cmp(&b))
    }

    /// Whether `ancestor` is a proper ancestor of `node`.
    pub fn is_ancestor(&self, ancestor: NodeHandle, node: NodeHandle) -> Result<bool> {
        let arec = self.record(ancestor)?;
        self.record(node)?;
        if node <= ancestor || node > arec.subtree_end {
            return Ok(false);
        }
        Ok(self.parent_chain_contains(node, ancestor))
    }

    fn parent_chain_contains(&self, node: NodeHandle, ancestor: NodeHandle) -> bool {
        let mut cur = self.rec(node).parent;
        while !cur.is_null() {
            if cur == ancestor {
                return true;
            }
            cur = self.rec(cur).parent;
        }
        false
    }

    pub fn first_child(&self, handle: NodeHandle) -> Result<NodeHandle> {
        Ok(self.record(handle)?.first_child)
    }

    pub fn next_sibling(&self, handle: NodeHandle) -> Result<NodeHandle> {
        Ok(self.record(handle)?.next_sibling)
    }

    /// Element carrying `id` (unqualified `id` or `xml:id` attribute).
    pub fn element_by_id(&self, id: &str) -> Option<NodeHandle> {
        self.ids.get(id).copied()
    }

    /// Handles of the attribute nodes of `handle` (empty for non-elements).
    pub(crate) fn attribute_range(&self, handle: NodeHandle) -> (u32, u32) {
        let rec = self.rec(handle);
        let start = handle.0 + 1 + rec.namespace_count;
        (start, start + rec.attribute_count)
    }

    pub(crate) fn namespace_range(&self, handle: NodeHandle) -> (u32, u32) {
        let rec = self.rec(handle);
        (handle.0 + 1, handle.0 + 1 + rec.namespace_count)
    }

    /// Number of axis iterators currently holding traversal state on this tree.
    pub fn live_iterators(&self) -> usize {
        self.live_iterators.load(AtomicOrdering::Acquire)
    }

    pub(crate) fn acquire_iterator(&self) {
        self.live_iterators.fetch_add(1, AtomicOrdering::AcqRel);
    }

    pub(crate) fn release_iterator(&self) {
        self.live_iterators.fetch_sub(1, AtomicOrdering::AcqRel);
    }

    /// Create an iterator over `axis` starting at `handle`, optionally
    /// filtered by `test`.
    pub fn axis_iterator(
        self: &Arc<Self>,
        handle: NodeHandle,
        axis: Axis,
        test: Option<NodeTest>,
    ) -> Result<AxisIterator> {
        AxisIterator::new(Arc::clone(self), handle, axis, test)
    }
}
