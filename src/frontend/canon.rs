//! Occurrence canonicalization
//!
//! Every distinct TERM text keeps its first occurrence as the canonical
//! node; later duplicates are merged away after their EXPRESSION and
//! NONABELIAN referrers are repointed to the canonical one. The result is a
//! true sharing graph over identifiers, which the evaluator relies on for
//! consistent value propagation.

use std::collections::HashMap;

use tracing::debug;

use crate::graph::{Graph, NodeId, NodeKind, Tag};

/// Merge duplicate TERM occurrences; returns how many nodes were removed.
/// Running it again on an already-canonical graph removes nothing.
pub fn canonicalize(graph: &mut Graph) -> usize {
    let mut canonical: HashMap<String, NodeId> = HashMap::new();
    let mut duplicates: Vec<(NodeId, NodeId)> = Vec::new();

    for id in graph.ids() {
        let node = graph.node(id);
        if node.kind != NodeKind::Term {
            continue;
        }
        match canonical.get(&node.content) {
            None => {
                canonical.insert(node.content.clone(), id);
            }
            Some(&keeper) => duplicates.push((id, keeper)),
        }
    }

    for &(dup, keeper) in &duplicates {
        let referrers: Vec<NodeId> = graph
            .node(dup)
            .inc()
            .filter(|&p| graph.node(p).has_any(Tag::Expression | Tag::Nonabelian))
            .collect();
        for p in referrers {
            graph.unlink(p, dup);
            graph.link(p, keeper);
        }
        graph.remove(dup);
    }

    if !duplicates.is_empty() {
        debug!("canonicalized {} duplicate term occurrences", duplicates.len());
    }
    duplicates.len()
}
