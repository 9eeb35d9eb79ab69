use core::fmt;

use super::NodeKind;

/// Traversal directions over a tree.
///
/// The first fourteen variants are the standard axes. The remaining four are
/// whole-tree axes used internally (absolute location paths, `//` shortcuts);
/// their start node only selects the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Ancestor,
    AncestorOrSelf,
    Attribute,
    Child,
    Descendant,
    DescendantOrSelf,
    Following,
    FollowingSibling,
    /// In-scope namespaces, including those inherited from ancestors.
    Namespace,
    /// Namespace nodes declared on the element itself.
    NamespaceDecls,
    Parent,
    Preceding,
    PrecedingSibling,
    SelfAxis,
    Root,
    All,
    DescendantsFromRoot,
    DescendantsOrSelfFromRoot,
}

impl Axis {
    pub const STANDARD: [Axis; 14] = [
        Axis::Ancestor,
        Axis::AncestorOrSelf,
        Axis::Attribute,
        Axis::Child,
        Axis::Descendant,
        Axis::DescendantOrSelf,
        Axis::Following,
        Axis::FollowingSibling,
        Axis::Namespace,
        Axis::NamespaceDecls,
        Axis::Parent,
        Axis::Preceding,
        Axis::PrecedingSibling,
        Axis::SelfAxis,
    ];

    /// Results come in reverse document order.
    pub fn is_reverse(self) -> bool {
        matches!(
            self,
            Axis::Ancestor | Axis::AncestorOrSelf | Axis::Preceding | Axis::PrecedingSibling
        )
    }

    /// Results do not depend on the start node beyond the tree it belongs to.
    pub fn is_absolute(self) -> bool {
        matches!(
            self,
            Axis::Root | Axis::All | Axis::DescendantsFromRoot | Axis::DescendantsOrSelfFromRoot
        )
    }

    /// Kind selected by a name test (`foo`, `*`, `ns:*`) on this axis.
    pub fn principal_kind(self) -> NodeKind {
        match self {
            Axis::Attribute => NodeKind::Attribute,
            Axis::Namespace | Axis::NamespaceDecls => NodeKind::Namespace,
            _ => NodeKind::Element,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Axis::Ancestor => "ancestor",
            Axis::AncestorOrSelf => "ancestor-or-self",
            Axis::Attribute => "attribute",
            Axis::Child => "child",
            Axis::Descendant => "descendant",
            Axis::DescendantOrSelf => "descendant-or-self",
            Axis::Following => "following",
            Axis::FollowingSibling => "following-sibling",
            Axis::Namespace => "namespace",
            Axis::NamespaceDecls => "namespace-decls",
            Axis::Parent => "parent",
            Axis::Preceding => "preceding",
            Axis::PrecedingSibling => "preceding-sibling",
            Axis::SelfAxis => "self",
            Axis::Root => "root",
            Axis::All => "all",
            Axis::DescendantsFromRoot => "descendants-from-root",
            Axis::DescendantsOrSelfFromRoot => "descendants-or-self-from-root",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
