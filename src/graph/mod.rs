//! Graph & traversal substrate
//!
//! The analysis graph is an arena of [`Node`]s addressed by stable
//! [`NodeId`] indices. Every edge is recorded in both directions in one
//! step: `link(a, b)` makes `b` a forward neighbor of `a` and `a` a back
//! reference of `b`. Removing a node first detaches it from every neighbor
//! on both sides, so a dangling edge is never observable. Removed slots are
//! tombstoned, never reused.
//!
//! Edge conventions used by the passes built on top:
//!
//! - `line → token` and `line → next line`
//! - `token → next token` (flat per-file sequence)
//! - `expression → operator / operands / nonabelian wrapper / line`
//! - `nonabelian wrapper → left operand`

pub mod node;
pub mod pulse;

pub use node::{Node, NodeId, NodeKind, Tag, TagSet};
pub use pulse::{closest, Direction, Pulse, Walk};

use crate::util::span::{FileId, SourcePos};

/// Arena holding every node of one analysis run.
#[derive(Debug, Default)]
pub struct Graph {
    nodes: Vec<Option<Node>>,
    files: Vec<String>,
}

impl Graph {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a file name, returning its handle. Repeated names share one id.
    pub fn intern_file(&mut self, name: &str) -> FileId {
        if let Some(i) = self.files.iter().position(|f| f == name) {
            return FileId(i as u32);
        }
        self.files.push(name.to_string());
        FileId((self.files.len() - 1) as u32)
    }

    pub fn file_name(&self, file: FileId) -> &str {
        self.files
            .get(file.0 as usize)
            .map(String::as_str)
            .unwrap_or("<unknown>")
    }

    /// Create a node and return its id.
    pub fn add(
        &mut self,
        content: impl Into<String>,
        kind: NodeKind,
        roles: TagSet,
        pos: SourcePos,
    ) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes
            .push(Some(Node::new(id, content.into(), kind, roles, pos)));
        id
    }

    /// Node by id; panics on a tombstoned id, which is an engine bug.
    #[inline]
    pub fn node(&self, id: NodeId) -> &Node {
        self.nodes[id.index()]
            .as_ref()
            .expect("NodeId refers to a removed node")
    }

    #[inline]
    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        self.nodes[id.index()]
            .as_mut()
            .expect("NodeId refers to a removed node")
    }

    /// Node by id, `None` for tombstones.
    #[inline]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index()).and_then(Option::as_ref)
    }

    #[inline]
    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Arena size including tombstones (for visited bitmaps).
    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.nodes.len()
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live node ids in creation order (which is source order for tokens).
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, n)| n.as_ref().map(|_| NodeId(i as u32)))
    }

    /// Number of live nodes carrying `tag`.
    pub fn count(&self, tag: Tag) -> usize {
        self.ids().filter(|&id| self.node(id).has(tag)).count()
    }

    /// Create the directed edge `a → b` and its back reference in one step.
    pub fn link(&mut self, a: NodeId, b: NodeId) {
        if a == b {
            return;
        }
        self.node_mut(a).out.insert(b);
        self.node_mut(b).inc.insert(a);
    }

    /// Exact inverse of [`link`](Self::link).
    pub fn unlink(&mut self, a: NodeId, b: NodeId) {
        self.node_mut(a).out.shift_remove(&b);
        self.node_mut(b).inc.shift_remove(&a);
    }

    /// Remove a node, detaching it from every neighbor in both directions
    /// before the slot is tombstoned. Removing an already-removed id is a
    /// no-op.
    pub fn remove(&mut self, id: NodeId) {
        let node = match self.nodes[id.index()].take() {
            Some(node) => node,
            None => return,
        };
        for n in &node.out {
            if let Some(neighbor) = self.nodes[n.index()].as_mut() {
                neighbor.inc.shift_remove(&id);
            }
        }
        for n in &node.inc {
            if let Some(neighbor) = self.nodes[n.index()].as_mut() {
                neighbor.out.shift_remove(&id);
            }
        }
    }
}

#[cfg(test)]
mod tests;
