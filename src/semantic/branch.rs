//! Composition branching (prototype)
//!
//! Spawns alternative-execution-path records for non-deterministic
//! composition. Only the aggregation operator `∘+` is modeled: its
//! expression splits into a producer branch (the left operand absorbs all
//! subsequent right-hand contributions by addition) and a consumer branch
//! (the right operand requires further downstream execution), linked by one
//! dependency edge. Branching for `=` is an explicit extension point, see
//! [`branch_equalities`].

use thiserror::Error;
use tracing::debug;

use super::eval::EvalLayer;
use crate::frontend::assemble::{nonabelian_left, operands_of, operator_of};
use crate::graph::{Graph, NodeId, Tag};
use crate::util::span::SourcePos;

/// Identifier of a branch within one [`BranchSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BranchId(pub u32);

/// One alternative execution path.
#[derive(Debug)]
pub struct Branch {
    pub label: String,
    /// The graph node this path executes around.
    pub node: NodeId,
    /// Branches this one feeds.
    pub forward: Vec<BranchId>,
    /// Branches feeding this one.
    pub backward: Vec<BranchId>,
}

/// All branches spawned from one evaluation layer.
#[derive(Debug, Default)]
pub struct BranchSet {
    branches: Vec<Branch>,
}

impl BranchSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, label: impl Into<String>, node: NodeId) -> BranchId {
        let id = BranchId(self.branches.len() as u32);
        self.branches.push(Branch {
            label: label.into(),
            node,
            forward: Vec::new(),
            backward: Vec::new(),
        });
        id
    }

    /// Record that `from` feeds `to`, on both ends.
    pub fn depend(&mut self, from: BranchId, to: BranchId) {
        self.branches[from.0 as usize].forward.push(to);
        self.branches[to.0 as usize].backward.push(from);
    }

    pub fn get(&self, id: BranchId) -> Option<&Branch> {
        self.branches.get(id.0 as usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Branch> {
        self.branches.iter()
    }

    pub fn len(&self) -> usize {
        self.branches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }
}

/// Branching errors.
#[derive(Debug, Error)]
pub enum BranchError {
    #[error("aggregation at {pos} is missing its operands")]
    MalformedAggregation { pos: SourcePos },

    #[error("branch enumeration for '=' at {pos} is not implemented")]
    EqualityEnumerationUnimplemented { pos: SourcePos },
}

/// Spawn producer/consumer branch pairs for every `∘+` aggregation in the
/// layer's graph.
pub fn branch_compositions(
    graph: &Graph,
    layer: &EvalLayer,
) -> Result<BranchSet, BranchError> {
    let mut set = BranchSet::new();

    for expr in graph.ids() {
        if !graph.node(expr).has(Tag::Expression) {
            continue;
        }
        let is_aggregation = operator_of(graph, expr)
            .map(|op| graph.node(op).content == "∘+")
            .unwrap_or(false);
        if !is_aggregation {
            continue;
        }

        let pos = graph.node(expr).pos;
        let operands = operands_of(graph, expr);
        let left = nonabelian_left(graph, expr)
            .ok_or(BranchError::MalformedAggregation { pos })?;
        let right = operands
            .into_iter()
            .find(|&o| o != left)
            .ok_or(BranchError::MalformedAggregation { pos })?;

        let producer = set.spawn(
            format!(
                "'{}' absorbs subsequent additive contributions",
                graph.node(left).display_label()
            ),
            left,
        );
        let consumer = set.spawn(
            format!(
                "'{}' requires downstream execution",
                graph.node(right).display_label()
            ),
            right,
        );
        set.depend(producer, consumer);
        debug!(
            "branched aggregation at {}: producer {:?}, consumer {:?} (layer has {} values)",
            pos,
            producer,
            consumer,
            layer.len()
        );
    }

    Ok(set)
}

/// Extension point: enumerate the assignments satisfying each `=`
/// expression, one branch per assignment.
///
/// The enumeration strategy is not settled, so a graph containing any
/// equality gets an explicit error instead of guessed behavior. A graph
/// without equalities yields an empty set.
pub fn branch_equalities(graph: &Graph, _layer: &EvalLayer) -> Result<BranchSet, BranchError> {
    if let Some(eq) = graph.ids().find(|&id| graph.node(id).has(Tag::Equality)) {
        return Err(BranchError::EqualityEnumerationUnimplemented {
            pos: graph.node(eq).pos,
        });
    }
    Ok(BranchSet::new())
}
