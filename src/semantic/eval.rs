//! Constraint evaluation
//!
//! Repeated flat passes over every TERM and EXPRESSION node until a pass
//! derives nothing new. Correctness does not depend on pass order, only on
//! exhaustion: directional operators propagate a known side onto the
//! unknown one, computational operators fire once both operands are known.
//! Whatever is still unevaluated at the fixpoint is reported as "stuck" —
//! a diagnostic about under-constrained input, not an engine failure.

use indexmap::{IndexMap, IndexSet};
use thiserror::Error;
use tracing::{debug, warn};

use crate::frontend::assemble::{nonabelian_left, operands_of, operator_of};
use crate::frontend::ops::{Fixity, OperatorTable};
use crate::graph::{Graph, NodeId, NodeKind, Tag};
use crate::util::span::SourcePos;

/// Fatal evaluation errors.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("operator '{content}' at {pos} is unknown to the operator table")]
    UnknownOperator { content: String, pos: SourcePos },

    #[error("operator '{content}' at {pos} has no evaluation rule")]
    UnsupportedOperator { content: String, pos: SourcePos },

    #[error("could not resolve the operands of '{content}' at {pos}")]
    MalformedOperands { content: String, pos: SourcePos },

    #[error("arithmetic overflow at {pos}")]
    ArithmeticOverflow { pos: SourcePos },

    #[error("division by zero at {pos}")]
    DivisionByZero { pos: SourcePos },

    #[error("conflicting equality at {pos}: {left} vs {right}")]
    ConflictingEquality {
        left: i64,
        right: i64,
        pos: SourcePos,
    },

    #[error("numeric literal '{content}' at {pos} does not fit an i64")]
    BadNumericLiteral { content: String, pos: SourcePos },
}

/// One evaluation run's results: the evaluated-node set plus the value map.
///
/// Monotonic within a run — an entry, once made, is never retracted or
/// changed.
#[derive(Debug, Default)]
pub struct EvalLayer {
    values: IndexMap<NodeId, i64>,
    evaluated: IndexSet<NodeId>,
}

impl EvalLayer {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn value(&self, id: NodeId) -> Option<i64> {
        self.values.get(&id).copied()
    }

    #[inline]
    pub fn is_evaluated(&self, id: NodeId) -> bool {
        self.evaluated.contains(&id)
    }

    /// Pre-value a node before evaluation (external drivers, tests).
    pub fn seed(&mut self, id: NodeId, value: i64) {
        self.record(id, Some(value));
    }

    /// Known values in insertion order.
    pub fn values(&self) -> impl Iterator<Item = (NodeId, i64)> + '_ {
        self.values.iter().map(|(&id, &v)| (id, v))
    }

    pub fn len(&self) -> usize {
        self.evaluated.len()
    }

    pub fn is_empty(&self) -> bool {
        self.evaluated.is_empty()
    }

    fn record(&mut self, id: NodeId, value: Option<i64>) {
        self.evaluated.insert(id);
        if let Some(v) = value {
            self.values.entry(id).or_insert(v);
        }
    }
}

/// Everything a downstream consumer needs from one run.
#[derive(Debug)]
pub struct EvalOutcome {
    pub layer: EvalLayer,
    /// TERM/EXPRESSION nodes still unevaluated at the fixpoint.
    pub stuck: Vec<NodeId>,
    /// Full passes taken, including the final pass that derived nothing.
    pub passes: usize,
}

/// Evaluate the whole graph from an empty layer.
pub fn evaluate(graph: &Graph, ops: &OperatorTable) -> Result<EvalOutcome, EvalError> {
    evaluate_seeded(graph, ops, EvalLayer::new())
}

/// Evaluate the whole graph starting from a pre-seeded layer.
pub fn evaluate_seeded(
    graph: &Graph,
    ops: &OperatorTable,
    mut layer: EvalLayer,
) -> Result<EvalOutcome, EvalError> {
    let mut passes = 0usize;
    loop {
        passes += 1;
        let mut moved = false;
        for id in graph.ids() {
            if layer.is_evaluated(id) {
                continue;
            }
            let node = graph.node(id);
            match node.kind {
                NodeKind::Term if node.has(Tag::Number) => {
                    let value = node.content.parse::<i64>().map_err(|_| {
                        EvalError::BadNumericLiteral {
                            content: node.content.clone(),
                            pos: node.pos,
                        }
                    })?;
                    layer.record(id, Some(value));
                    moved = true;
                }
                NodeKind::Composite if node.has(Tag::Expression) => {
                    moved |= eval_expression(graph, ops, &mut layer, id)?;
                }
                _ => {}
            }
        }
        if !moved {
            break;
        }
    }

    let stuck: Vec<NodeId> = graph
        .ids()
        .filter(|&id| {
            let node = graph.node(id);
            (node.kind == NodeKind::Term || node.has(Tag::Expression))
                && !layer.is_evaluated(id)
        })
        .collect();
    for &id in &stuck {
        let node = graph.node(id);
        warn!(
            "stuck: '{}' at {} in {}",
            node.display_label(),
            node.pos,
            graph.file_name(node.pos.file)
        );
    }
    debug!(
        "fixpoint after {} passes: {} evaluated, {} stuck",
        passes,
        layer.len(),
        stuck.len()
    );

    Ok(EvalOutcome { layer, stuck, passes })
}

/// Try to make progress on one expression. `Ok(true)` means the layer
/// changed; `Ok(false)` means "not yet" (or never, for operators with no
/// evaluation rule).
fn eval_expression(
    graph: &Graph,
    ops: &OperatorTable,
    layer: &mut EvalLayer,
    expr: NodeId,
) -> Result<bool, EvalError> {
    // Merged conditionals and entity absorbers have no operator of their
    // own; they are not evaluable and simply stay unevaluated.
    let op = match operator_of(graph, expr) {
        Some(op) => op,
        None => return Ok(false),
    };
    let op_node = graph.node(op);
    let def = ops
        .lookup(&op_node.content)
        .ok_or_else(|| EvalError::UnknownOperator {
            content: op_node.content.clone(),
            pos: op_node.pos,
        })?;

    match op_node.content.as_str() {
        "=" => {
            let (a, b) = infix_operands(graph, expr, def.commutative)?;
            match (layer.value(a), layer.value(b)) {
                (Some(v), None) => {
                    layer.record(b, Some(v));
                    layer.record(expr, Some(v));
                    Ok(true)
                }
                (None, Some(v)) => {
                    layer.record(a, Some(v));
                    layer.record(expr, Some(v));
                    Ok(true)
                }
                (Some(l), Some(r)) if l == r => {
                    // The same equality revisited through another
                    // composition path; nothing to do.
                    layer.record(expr, Some(l));
                    Ok(true)
                }
                (Some(l), Some(r)) => Err(EvalError::ConflictingEquality {
                    left: l,
                    right: r,
                    pos: op_node.pos,
                }),
                (None, None) => Ok(false),
            }
        }
        "->" | "<-" => {
            let (left, right) = infix_operands(graph, expr, def.commutative)?;
            let (source, target) = if op_node.content == "->" {
                (left, right)
            } else {
                (right, left)
            };
            match layer.value(source) {
                Some(v) => {
                    if layer.value(target).is_none() {
                        layer.record(target, Some(v));
                    }
                    layer.record(expr, Some(v));
                    Ok(true)
                }
                None => Ok(false),
            }
        }
        "+" | "-" | "*" | "/" | "∘+" => {
            let (left, right) = infix_operands(graph, expr, def.commutative)?;
            let (l, r) = match (layer.value(left), layer.value(right)) {
                (Some(l), Some(r)) => (l, r),
                _ => return Ok(false),
            };
            let value = match op_node.content.as_str() {
                "+" | "∘+" => l.checked_add(r),
                "-" => l.checked_sub(r),
                "*" => l.checked_mul(r),
                _ => {
                    if r == 0 {
                        return Err(EvalError::DivisionByZero { pos: op_node.pos });
                    }
                    l.checked_div(r)
                }
            }
            .ok_or(EvalError::ArithmeticOverflow { pos: op_node.pos })?;
            layer.record(expr, Some(value));
            Ok(true)
        }
        // Known to the table, but without an evaluation rule (comparisons,
        // the remaining compose family, prefix keywords, block markers).
        // Staying unevaluated is only legitimate while an operand is still
        // unknown; an infix operator that could fire but has no rule to
        // fire with is fatal.
        _ => match def.fixity {
            Some(Fixity::Infix) => {
                let (left, right) = infix_operands(graph, expr, def.commutative)?;
                if layer.value(left).is_some() && layer.value(right).is_some() {
                    return Err(EvalError::UnsupportedOperator {
                        content: op_node.content.clone(),
                        pos: op_node.pos,
                    });
                }
                Ok(false)
            }
            _ => Ok(false),
        },
    }
}

/// Left and right operands of an infix expression. Non-commutative
/// operators are disambiguated through their NONABELIAN wrapper; for
/// commutative ones source order is as good as any.
fn infix_operands(
    graph: &Graph,
    expr: NodeId,
    commutative: bool,
) -> Result<(NodeId, NodeId), EvalError> {
    let malformed = || {
        let node = graph.node(expr);
        EvalError::MalformedOperands {
            content: node.content.clone(),
            pos: node.pos,
        }
    };

    let mut operands = operands_of(graph, expr);
    if operands.len() != 2 {
        return Err(malformed());
    }
    if commutative {
        operands.sort_by_key(|&o| graph.node(o).pos);
        return Ok((operands[0], operands[1]));
    }
    let left = nonabelian_left(graph, expr).ok_or_else(malformed)?;
    if !operands.contains(&left) {
        return Err(malformed());
    }
    let right = operands
        .into_iter()
        .find(|&o| o != left)
        .ok_or_else(malformed)?;
    Ok((left, right))
}
