//! Graph node: identity, content, lexical kind, semantic roles, edges

use std::fmt;
use std::ops::BitOr;

use indexmap::IndexSet;

use crate::util::span::SourcePos;

/// A stable identifier for a node in the [`Graph`](super::Graph) arena.
///
/// Ids are never reused within one run; a removed node leaves a tombstone
/// behind so every surviving `NodeId` stays valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Exclusive lexical kind of a node.
///
/// Every node is exactly one of these; additive semantic roles live in the
/// separate [`TagSet`] because an assembled node may legitimately hold more
/// than one role (an EXPRESSION that is also an ENTITY, for instance).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// One physical, non-blank source line
    Line,
    /// Identifier or literal token
    Term,
    /// Operator token
    Operator,
    /// Node synthesized during assembly (expressions, wrappers, merges)
    Composite,
}

/// A category a node can carry, used for traversal filters and walls.
///
/// The first four mirror [`NodeKind`]; the rest are additive roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    Line,
    Term,
    Operator,
    Composite,
    Expression,
    Equality,
    Nonabelian,
    Entity,
    Inputs,
    Outputs,
    Number,
}

impl Tag {
    #[inline]
    const fn bit(self) -> u16 {
        1 << self as u16
    }
}

impl NodeKind {
    /// The tag corresponding to this lexical kind.
    #[inline]
    pub fn tag(self) -> Tag {
        match self {
            NodeKind::Line => Tag::Line,
            NodeKind::Term => Tag::Term,
            NodeKind::Operator => Tag::Operator,
            NodeKind::Composite => Tag::Composite,
        }
    }
}

/// A small set of [`Tag`]s.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct TagSet(u16);

impl TagSet {
    pub const EMPTY: TagSet = TagSet(0);

    #[inline]
    pub fn contains(self, tag: Tag) -> bool {
        self.0 & tag.bit() != 0
    }

    #[inline]
    pub fn intersects(self, other: TagSet) -> bool {
        self.0 & other.0 != 0
    }

    #[inline]
    pub fn insert(&mut self, tag: Tag) {
        self.0 |= tag.bit();
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl From<Tag> for TagSet {
    #[inline]
    fn from(tag: Tag) -> Self {
        TagSet(tag.bit())
    }
}

impl BitOr for Tag {
    type Output = TagSet;

    #[inline]
    fn bitor(self, rhs: Tag) -> TagSet {
        TagSet(self.bit() | rhs.bit())
    }
}

impl BitOr<Tag> for TagSet {
    type Output = TagSet;

    #[inline]
    fn bitor(self, rhs: Tag) -> TagSet {
        TagSet(self.0 | rhs.bit())
    }
}

impl fmt::Debug for TagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const ALL: [Tag; 11] = [
            Tag::Line,
            Tag::Term,
            Tag::Operator,
            Tag::Composite,
            Tag::Expression,
            Tag::Equality,
            Tag::Nonabelian,
            Tag::Entity,
            Tag::Inputs,
            Tag::Outputs,
            Tag::Number,
        ];
        let mut set = f.debug_set();
        for tag in ALL {
            if self.contains(tag) {
                set.entry(&tag);
            }
        }
        set.finish()
    }
}

/// A vertex of the analysis graph.
///
/// Edges are kept in both directions: `out` holds this node's forward
/// references, `inc` is the maintained back-index of nodes referencing it.
/// Both sides are updated together by [`Graph::link`](super::Graph::link)
/// and [`Graph::unlink`](super::Graph::unlink); nothing else touches them.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub content: String,
    pub kind: NodeKind,
    pub roles: TagSet,
    pub pos: SourcePos,
    pub(super) out: IndexSet<NodeId>,
    pub(super) inc: IndexSet<NodeId>,
}

impl Node {
    pub(super) fn new(
        id: NodeId,
        content: String,
        kind: NodeKind,
        roles: TagSet,
        pos: SourcePos,
    ) -> Self {
        Self {
            id,
            content,
            kind,
            roles,
            pos,
            out: IndexSet::new(),
            inc: IndexSet::new(),
        }
    }

    /// Whether the node carries this tag, either as its lexical kind or as
    /// a semantic role.
    #[inline]
    pub fn has(&self, tag: Tag) -> bool {
        self.kind.tag() == tag || self.roles.contains(tag)
    }

    /// Whether the node carries at least one of the given tags.
    #[inline]
    pub fn has_any(&self, tags: TagSet) -> bool {
        tags.contains(self.kind.tag()) || self.roles.intersects(tags)
    }

    /// Forward neighbors, in insertion order.
    #[inline]
    pub fn out(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.out.iter().copied()
    }

    /// Nodes referencing this one, in insertion order.
    #[inline]
    pub fn inc(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.inc.iter().copied()
    }

    /// Display label for external consumers (exporters, printers): LINE
    /// nodes display their line number, everything else its content.
    pub fn display_label(&self) -> String {
        match self.kind {
            NodeKind::Line => format!("line {}", self.pos.line),
            _ => self.content.clone(),
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}' at {}", self.id, self.display_label(), self.pos)
    }
}
