//! Breadth-first traversal over the analysis graph
//!
//! `pulse` visits every reachable node at most once, which makes it safe on
//! the cyclic graphs the assembler produces. The frontier is expanded in
//! `(SourcePos, NodeId)` order so a traversal is fully deterministic and
//! "first matching neighbor" means the same node on every run.

use std::collections::VecDeque;

use smallvec::SmallVec;

use super::node::{Node, NodeId, Tag, TagSet};
use super::Graph;

/// Which edges a pulse follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    Forward,
    Backward,
    #[default]
    Both,
}

/// Visitor verdict for one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Walk {
    Continue,
    /// Terminate the whole traversal early.
    Stop,
}

/// Configuration for one breadth-first traversal.
///
/// `filter` restricts expansion to neighbors carrying at least one of the
/// given tags; `wall` forbids crossing into neighbors carrying any of its
/// tags (a boundary, e.g. "never leave the current line"). The root itself
/// is always visited regardless of filter and wall.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pulse {
    pub direction: Direction,
    pub filter: Option<TagSet>,
    pub wall: Option<TagSet>,
}

impl Pulse {
    #[inline]
    pub fn forward() -> Self {
        Self { direction: Direction::Forward, ..Self::default() }
    }

    #[inline]
    pub fn backward() -> Self {
        Self { direction: Direction::Backward, ..Self::default() }
    }

    #[inline]
    pub fn filter(mut self, tags: impl Into<TagSet>) -> Self {
        self.filter = Some(tags.into());
        self
    }

    #[inline]
    pub fn wall(mut self, tags: impl Into<TagSet>) -> Self {
        self.wall = Some(tags.into());
        self
    }

    /// Run the traversal from `root`, calling `visit` on every node reached.
    pub fn run<F>(&self, graph: &Graph, root: NodeId, mut visit: F)
    where
        F: FnMut(&Node) -> Walk,
    {
        let mut visited = vec![false; graph.capacity()];
        let mut queue = VecDeque::new();

        visited[root.index()] = true;
        queue.push_back(root);

        while let Some(id) = queue.pop_front() {
            let node = match graph.get(id) {
                Some(node) => node,
                None => continue,
            };

            if visit(node) == Walk::Stop {
                return;
            }

            let mut next: SmallVec<[NodeId; 8]> = SmallVec::new();
            match self.direction {
                Direction::Forward => next.extend(node.out()),
                Direction::Backward => next.extend(node.inc()),
                Direction::Both => {
                    next.extend(node.out());
                    next.extend(node.inc());
                }
            }
            next.retain(|&mut n| self.admits(graph, n, &visited));
            next.sort_by_key(|&n| (graph.node(n).pos, n));

            for n in next {
                if !visited[n.index()] {
                    visited[n.index()] = true;
                    queue.push_back(n);
                }
            }
        }
    }

    fn admits(&self, graph: &Graph, id: NodeId, visited: &[bool]) -> bool {
        if visited[id.index()] {
            return false;
        }
        let node = match graph.get(id) {
            Some(node) => node,
            None => return false,
        };
        if let Some(wall) = self.wall {
            if node.has_any(wall) {
                return false;
            }
        }
        if let Some(filter) = self.filter {
            if !node.has_any(filter) {
                return false;
            }
        }
        true
    }
}

/// First node carrying `tag` in pulse order around `center` (both edge
/// directions), including `center` itself.
pub fn closest(graph: &Graph, center: NodeId, tag: Tag) -> Option<NodeId> {
    let mut found = None;
    Pulse::default().run(graph, center, |node| {
        if node.has(tag) {
            found = Some(node.id);
            Walk::Stop
        } else {
            Walk::Continue
        }
    });
    found
}
