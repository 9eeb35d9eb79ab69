//! Ergonomic construction of [`Tree`]s for hosts, tests and result fragments.
//!
//! ```
//! use stylepath_xpath::model::builder::{attr, doc, elem, text};
//! use stylepath_xpath::model::NodeKind;
//!
//! // <root id="r"><child>Hello</child><child world="yes"/></root>
//! let tree = doc()
//!     .child(
//!         elem("root")
//!             .attr(attr("id", "r"))
//!             .child(elem("child").child(text("Hello")))
//!             .child(elem("child").attr(attr("world", "yes"))),
//!     )
//!     .build();
//! let root = tree.first_child(tree.root()).unwrap();
//! assert_eq!(tree.node_kind(root).unwrap(), NodeKind::Element);
//! assert_eq!(tree.string_value(root).unwrap(), "Hello");
//! ```
//!
//! Namespaces:
//! ```
//! use stylepath_xpath::model::builder::{doc, elem_ns, ns};
//!
//! let tree = doc()
//!     .child(elem_ns("urn:one", "p:root").namespace(ns("p", "urn:one")))
//!     .build();
//! let root = tree.first_child(tree.root()).unwrap();
//! assert_eq!(tree.namespace_uri(root).unwrap().as_deref(), Some("urn:one"));
//! assert_eq!(tree.qualified_name(root).unwrap(), "p:root");
//! ```
use compact_str::CompactString;
use std::collections::HashMap;
use std::sync::Arc;

use super::{NodeHandle, NodeKind, NodeName, NodeRecord, Tree, XML_NS};
use crate::symbols::{HashSymbolPool, Symbol, SymbolPool};

/// Name as written: optional prefix, optional namespace URI, local part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QName {
    pub prefix: Option<CompactString>,
    pub ns_uri: Option<CompactString>,
    pub local: CompactString,
}

impl QName {
    pub fn local(local: &str) -> Self {
        Self {
            prefix: None,
            ns_uri: None,
            local: local.into(),
        }
    }

    /// Split `prefix:local` and attach `ns_uri`.
    pub fn qualified(ns_uri: &str, qname: &str) -> Self {
        let (prefix, local) = match qname.split_once(':') {
            Some((p, l)) => (Some(CompactString::from(p)), l),
            None => (None, qname),
        };
        Self {
            prefix,
            ns_uri: Some(ns_uri.into()),
            local: local.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AttributeSpec {
    name: QName,
    value: CompactString,
}

#[derive(Debug, Clone)]
pub struct NamespaceSpec {
    prefix: Option<CompactString>,
    uri: CompactString,
}

#[derive(Debug, Clone)]
pub enum NodeSpec {
    Element(ElementBuilder),
    Text(CompactString),
    Comment(CompactString),
    ProcessingInstruction {
        target: CompactString,
        data: CompactString,
    },
}

impl From<ElementBuilder> for NodeSpec {
    fn from(e: ElementBuilder) -> Self {
        NodeSpec::Element(e)
    }
}

#[derive(Debug, Clone)]
pub struct ElementBuilder {
    name: QName,
    namespaces: Vec<NamespaceSpec>,
    attributes: Vec<AttributeSpec>,
    children: Vec<NodeSpec>,
}

impl ElementBuilder {
    pub fn new(name: QName) -> Self {
        Self {
            name,
            namespaces: Vec::new(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn child(mut self, child: impl Into<NodeSpec>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn children<I: IntoIterator<Item = NodeSpec>>(mut self, it: I) -> Self {
        self.children.extend(it);
        self
    }

    pub fn attr(mut self, attr: AttributeSpec) -> Self {
        self.attributes.push(attr);
        self
    }

    pub fn namespace(mut self, ns: NamespaceSpec) -> Self {
        self.namespaces.push(ns);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct DocumentBuilder {
    children: Vec<NodeSpec>,
}

impl DocumentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn child(mut self, child: impl Into<NodeSpec>) -> Self {
        self.children.push(child.into());
        self
    }

    /// Build with a fresh [`HashSymbolPool`].
    pub fn build(self) -> Arc<Tree> {
        self.build_with(HashSymbolPool::new())
    }

    /// Build, interning names into `pool`. The pool is moved into the tree.
    pub fn build_with<P: SymbolPool + 'static>(self, pool: P) -> Arc<Tree> {
        let mut flat = Flattener {
            nodes: Vec::new(),
            pool,
            ids: HashMap::new(),
        };
        let root = flat.push(NodeRecord::new(
            NodeKind::Document,
            NodeName::NONE,
            Symbol::NULL,
            CompactString::default(),
        ));
        flat.append_children(root, self.children);
        flat.close(root);
        tracing::debug!(nodes = flat.nodes.len(), symbols = flat.pool.len(), "tree built");
        Tree::from_parts(flat.nodes, Box::new(flat.pool), flat.ids)
    }
}

struct Flattener<P> {
    nodes: Vec<NodeRecord>,
    pool: P,
    ids: HashMap<CompactString, NodeHandle>,
}

impl<P: SymbolPool> Flattener<P> {
    fn push(&mut self, rec: NodeRecord) -> NodeHandle {
        self.nodes.push(rec);
        let h = NodeHandle(u32::try_from(self.nodes.len()).unwrap_or(u32::MAX));
        self.slot(h).subtree_end = h;
        h
    }

    fn slot(&mut self, h: NodeHandle) -> &mut NodeRecord {
        &mut self.nodes[h.0 as usize - 1]
    }

    fn close(&mut self, h: NodeHandle) {
        let last = NodeHandle(u32::try_from(self.nodes.len()).unwrap_or(u32::MAX));
        self.slot(h).subtree_end = last;
    }

    fn intern_name(&mut self, name: &QName) -> (NodeName, Symbol) {
        let ns = self.pool.intern_opt(name.ns_uri.as_deref());
        let local = self.pool.intern(&name.local);
        let prefix = self.pool.intern_opt(name.prefix.as_deref());
        (NodeName { ns, local }, prefix)
    }

    fn append_children(&mut self, parent: NodeHandle, children: Vec<NodeSpec>) {
        for child in children {
            let h = match child {
                NodeSpec::Element(e) => self.element(parent, e),
                NodeSpec::Text(v) => self.leaf(NodeKind::Text, NodeName::NONE, v),
                NodeSpec::Comment(v) => self.leaf(NodeKind::Comment, NodeName::NONE, v),
                NodeSpec::ProcessingInstruction { target, data } => {
                    let local = self.pool.intern(&target);
                    let name = NodeName {
                        ns: Symbol::NULL,
                        local,
                    };
                    self.leaf(NodeKind::ProcessingInstruction, name, data)
                }
            };
            self.link_child(parent, h);
        }
    }

    fn leaf(&mut self, kind: NodeKind, name: NodeName, value: CompactString) -> NodeHandle {
        self.push(NodeRecord::new(kind, name, Symbol::NULL, value))
    }

    fn link_child(&mut self, parent: NodeHandle, child: NodeHandle) {
        let prev = self.slot(parent).last_child;
        {
            let rec = self.slot(child);
            rec.parent = parent;
            rec.prev_sibling = prev;
        }
        if prev.is_null() {
            self.slot(parent).first_child = child;
        } else {
            self.slot(prev).next_sibling = child;
        }
        self.slot(parent).last_child = child;
    }

    fn element(&mut self, parent: NodeHandle, e: ElementBuilder) -> NodeHandle {
        let (name, prefix) = self.intern_name(&e.name);
        let h = self.push(NodeRecord::new(
            NodeKind::Element,
            name,
            prefix,
            CompactString::default(),
        ));
        self.slot(h).parent = parent;
        let namespace_count = e.namespaces.len();
        for ns in e.namespaces {
            let local = self.pool.intern_opt(ns.prefix.as_deref());
            let name = NodeName {
                ns: Symbol::NULL,
                local,
            };
            let n = self.push(NodeRecord::new(NodeKind::Namespace, name, Symbol::NULL, ns.uri));
            self.slot(n).parent = h;
        }
        let attribute_count = e.attributes.len();
        for a in e.attributes {
            let is_id = a.name.local == "id"
                && (a.name.ns_uri.is_none() || a.name.ns_uri.as_deref() == Some(XML_NS));
            let (name, prefix) = self.intern_name(&a.name);
            let value = a.value;
            let n = self.push(NodeRecord::new(NodeKind::Attribute, name, prefix, value.clone()));
            self.slot(n).parent = h;
            if is_id {
                self.ids.entry(value).or_insert(h);
            }
        }
        {
            let rec = self.slot(h);
            rec.namespace_count = u32::try_from(namespace_count).unwrap_or(u32::MAX);
            rec.attribute_count = u32::try_from(attribute_count).unwrap_or(u32::MAX);
        }
        self.append_children(h, e.children);
        self.close(h);
        h
    }
}

// Convenience helper functions for concise host and test code

pub fn doc() -> DocumentBuilder {
    DocumentBuilder::new()
}

pub fn elem(local: &str) -> ElementBuilder {
    ElementBuilder::new(QName::local(local))
}

/// Element in namespace `ns_uri`; `qname` may carry a `prefix:`.
pub fn elem_ns(ns_uri: &str, qname: &str) -> ElementBuilder {
    ElementBuilder::new(QName::qualified(ns_uri, qname))
}

pub fn text(v: &str) -> NodeSpec {
    NodeSpec::Text(v.into())
}

pub fn comment(v: &str) -> NodeSpec {
    NodeSpec::Comment(v.into())
}

pub fn pi(target: &str, data: &str) -> NodeSpec {
    NodeSpec::ProcessingInstruction {
        target: target.into(),
        data: data.into(),
    }
}

pub fn attr(local: &str, v: &str) -> AttributeSpec {
    AttributeSpec {
        name: QName::local(local),
        value: v.into(),
    }
}

pub fn attr_ns(ns_uri: &str, qname: &str, v: &str) -> AttributeSpec {
    AttributeSpec {
        name: QName::qualified(ns_uri, qname),
        value: v.into(),
    }
}

/// Namespace declaration; an empty prefix declares the default namespace.
pub fn ns(prefix: &str, uri: &str) -> NamespaceSpec {
    NamespaceSpec {
        prefix: (!prefix.is_empty()).then(|| prefix.into()),
        uri: uri.into(),
    }
}
