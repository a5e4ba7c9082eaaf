//! Expression assembly
//!
//! Consumes the per-file operator list in semantic precedence order and
//! composes EXPRESSION nodes over the token graph. Operand lookup walks a
//! token outward to its most-composed ancestor, so later (looser) operators
//! automatically pick up the structures earlier (tighter) ones built.
//!
//! Non-commutative operators get a NONABELIAN wrapper attached to their
//! expression and pointing at the left operand; plain edge sets cannot
//! otherwise tell left from right.
//!
//! Two follow-up passes run after the precedence pass: the if/then/else
//! merge, then block absorption (entities and the block-consuming
//! `inputs`/`outputs` operators). The merge goes first so an unmatched
//! `then` or `else` is caught before an entity could absorb it.

use indexmap::IndexSet;
use smallvec::SmallVec;
use thiserror::Error;
use tracing::debug;

use super::mapper::FileTokens;
use super::ops::{Fixity, OperatorTable};
use crate::graph::{Graph, NodeId, NodeKind, Tag, TagSet};
use crate::util::span::SourcePos;

/// Fatal assembly errors; assembly never recovers from any of these.
#[derive(Debug, Error)]
pub enum AssembleError {
    #[error("no {side} operand for operator '{content}' at {pos}")]
    MissingOperand {
        side: &'static str,
        content: String,
        pos: SourcePos,
    },
    #[error("operands of '{content}' at {pos} resolve to the same node")]
    CollapsedOperands { content: String, pos: SourcePos },
    #[error("'then' at {pos} has no 'if' expression at its left")]
    UnmatchedThen { pos: SourcePos },
    #[error("'else' at {pos} has no 'if-then' composite at its left")]
    UnmatchedElse { pos: SourcePos },
}

/// Assemble all expressions of one file.
pub fn assemble(
    graph: &mut Graph,
    ops: &OperatorTable,
    tokens: &FileTokens,
) -> Result<(), AssembleError> {
    precedence_pass(graph, ops, tokens)?;
    merge_conditionals(graph, tokens)?;
    absorption_pass(graph, ops, tokens);
    debug!(
        "assembled {} expressions in file {}",
        graph.count(Tag::Expression),
        tokens.file
    );
    Ok(())
}

/// The most-composed ancestor of a token: follow EXPRESSION parents until
/// none is left. A node wrapped by nothing is its own top.
pub fn top_of(graph: &Graph, id: NodeId) -> NodeId {
    let mut current = id;
    loop {
        match expression_parent(graph, current) {
            Some(parent) => current = parent,
            None => return current,
        }
    }
}

/// The (unique) expression referencing `id` as a constituent, if any.
pub fn expression_parent(graph: &Graph, id: NodeId) -> Option<NodeId> {
    graph
        .node(id)
        .inc()
        .find(|&p| graph.node(p).has(Tag::Expression))
}

/// The operator token an expression was built around, if any. Merged
/// if/then/else composites have none.
pub fn operator_of(graph: &Graph, expr: NodeId) -> Option<NodeId> {
    graph
        .node(expr)
        .out()
        .find(|&n| graph.node(n).kind == NodeKind::Operator)
}

/// Direct operands of an expression: forward neighbors that are terms or
/// expressions (the operator, the wrapper and the home line are not).
pub fn operands_of(graph: &Graph, expr: NodeId) -> SmallVec<[NodeId; 2]> {
    graph
        .node(expr)
        .out()
        .filter(|&n| {
            let node = graph.node(n);
            node.kind == NodeKind::Term || node.has(Tag::Expression)
        })
        .collect()
}

/// The node a NONABELIAN wrapper marks as the left operand, if the
/// expression carries a wrapper.
pub fn nonabelian_left(graph: &Graph, expr: NodeId) -> Option<NodeId> {
    let wrapper = graph
        .node(expr)
        .out()
        .find(|&n| graph.node(n).has(Tag::Nonabelian))?;
    graph.node(wrapper).out().next()
}

fn line_of(graph: &Graph, tokens: &FileTokens, pos: SourcePos) -> Option<NodeId> {
    tokens
        .lines
        .iter()
        .copied()
        .find(|&l| graph.node(l).pos.line == pos.line)
}

/// Consume operators in semantic precedence order (stable: source order
/// inside one class) and build their expressions.
fn precedence_pass(
    graph: &mut Graph,
    ops: &OperatorTable,
    tokens: &FileTokens,
) -> Result<(), AssembleError> {
    let mut agenda: Vec<(u8, usize, NodeId, Fixity, bool)> = Vec::new();
    for (seq, &id) in tokens.tokens.iter().enumerate() {
        let node = graph.node(id);
        if node.kind != NodeKind::Operator {
            continue;
        }
        if let Some(def) = ops.lookup(&node.content) {
            if let (Some(fixity), Some(prec)) = (def.fixity, def.precedence) {
                agenda.push((prec, seq, id, fixity, def.commutative));
            }
        }
    }
    agenda.sort_by_key(|&(prec, seq, ..)| (prec, seq));

    for (_, seq, op, fixity, commutative) in agenda {
        match fixity {
            Fixity::Infix => {
                let left = neighbor_top(graph, tokens, seq, Side::Left, op)?;
                let right = neighbor_top(graph, tokens, seq, Side::Right, op)?;
                if left == right {
                    let node = graph.node(op);
                    return Err(AssembleError::CollapsedOperands {
                        content: node.content.clone(),
                        pos: node.pos,
                    });
                }
                compose_infix(graph, tokens, op, left, right, commutative);
            }
            Fixity::Right => {
                let operand = neighbor_top(graph, tokens, seq, Side::Right, op)?;
                compose_unary(graph, tokens, op, operand, Side::Right);
            }
            Fixity::Left => {
                let operand = neighbor_top(graph, tokens, seq, Side::Left, op)?;
                compose_unary(graph, tokens, op, operand, Side::Left);
            }
            // Deferred to the absorption pass.
            Fixity::RightAll => {}
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

impl Side {
    fn name(self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }
}

/// Most-composed ancestor of the token adjacent to sequence slot `seq`.
fn neighbor_top(
    graph: &Graph,
    tokens: &FileTokens,
    seq: usize,
    side: Side,
    op: NodeId,
) -> Result<NodeId, AssembleError> {
    let neighbor = match side {
        Side::Left => seq.checked_sub(1).map(|i| tokens.tokens[i]),
        Side::Right => tokens.tokens.get(seq + 1).copied(),
    };
    match neighbor {
        Some(t) => Ok(top_of(graph, t)),
        None => {
            let node = graph.node(op);
            Err(AssembleError::MissingOperand {
                side: side.name(),
                content: node.content.clone(),
                pos: node.pos,
            })
        }
    }
}

fn compose_infix(
    graph: &mut Graph,
    tokens: &FileTokens,
    op: NodeId,
    left: NodeId,
    right: NodeId,
    commutative: bool,
) {
    let op_node = graph.node(op);
    let mut roles = TagSet::from(Tag::Expression);
    if op_node.content == "=" {
        roles.insert(Tag::Equality);
    }
    let content = format!(
        "{} {} {}",
        graph.node(left).content,
        op_node.content,
        graph.node(right).content
    );
    let pos = graph.node(left).pos.merge(&graph.node(right).pos);
    let expr = graph.add(content, NodeKind::Composite, roles, pos);
    graph.link(expr, op);
    graph.link(expr, left);
    graph.link(expr, right);
    if let Some(line) = line_of(graph, tokens, graph.node(op).pos) {
        graph.link(expr, line);
    }
    if !commutative {
        let wrapper = graph.add(
            "left",
            NodeKind::Composite,
            Tag::Nonabelian.into(),
            graph.node(left).pos,
        );
        graph.link(expr, wrapper);
        graph.link(wrapper, left);
    }
}

fn compose_unary(
    graph: &mut Graph,
    tokens: &FileTokens,
    op: NodeId,
    operand: NodeId,
    side: Side,
) {
    let op_node = graph.node(op);
    let content = match side {
        Side::Right => format!("{} {}", op_node.content, graph.node(operand).content),
        Side::Left => format!("{} {}", graph.node(operand).content, op_node.content),
    };
    let pos = graph.node(op).pos.merge(&graph.node(operand).pos);
    let expr = graph.add(content, NodeKind::Composite, Tag::Expression.into(), pos);
    graph.link(expr, op);
    graph.link(expr, operand);
    if let Some(line) = line_of(graph, tokens, graph.node(op).pos) {
        graph.link(expr, line);
    }
}

/// Second pass: block absorption, in source order per file.
///
/// Block-consuming operators (`inputs`, `outputs`) go first so their blocks
/// exist by the time an enclosing entity absorbs them; then every bare
/// top-level TERM absorbs what follows it. Absorption stops at the first
/// token that is neither on the starter's line nor more deeply indented.
fn absorption_pass(graph: &mut Graph, ops: &OperatorTable, tokens: &FileTokens) {
    for pick_operators in [true, false] {
        for (seq, &id) in tokens.tokens.iter().enumerate() {
            if expression_parent(graph, id).is_some() {
                continue;
            }
            let node = graph.node(id);
            let (roles, starter_is_op) = match node.kind {
                NodeKind::Operator if pick_operators => {
                    match ops.lookup(&node.content).and_then(|d| d.fixity) {
                        Some(Fixity::RightAll) => {
                            let role = match node.content.as_str() {
                                "inputs" => Tag::Inputs,
                                _ => Tag::Outputs,
                            };
                            (Tag::Expression | role, true)
                        }
                        _ => continue,
                    }
                }
                NodeKind::Term if !pick_operators => (Tag::Expression | Tag::Entity, false),
                _ => continue,
            };
            absorb_block(graph, tokens, seq, id, roles, starter_is_op);
        }
    }
}

fn absorb_block(
    graph: &mut Graph,
    tokens: &FileTokens,
    seq: usize,
    starter: NodeId,
    roles: TagSet,
    starter_is_op: bool,
) {
    let start_pos = graph.node(starter).pos;
    let start_indent = tokens.indents.get(&start_pos.line).copied().unwrap_or(1);

    let mut absorbed: IndexSet<NodeId> = IndexSet::new();
    for &token in &tokens.tokens[seq + 1..] {
        let pos = graph.node(token).pos;
        let same_line = pos.line == start_pos.line;
        let deeper = tokens
            .indents
            .get(&pos.line)
            .map(|&i| i > start_indent)
            .unwrap_or(false);
        if !same_line && !deeper {
            break;
        }
        let top = top_of(graph, token);
        if top == starter {
            continue;
        }
        absorbed.insert(top);
    }
    if absorbed.is_empty() {
        return;
    }

    let starter_node = graph.node(starter);
    let content = if starter_is_op {
        starter_node.content.clone()
    } else {
        format!("{} …", starter_node.content)
    };
    let expr = graph.add(content, NodeKind::Composite, roles, start_pos);
    graph.link(expr, starter);
    for member in absorbed {
        graph.link(expr, member);
    }
    if let Some(line) = line_of(graph, tokens, start_pos) {
        graph.link(expr, line);
    }
}

/// Merge top-level `then` expressions onto the `if` expression at their
/// left, then `else` expressions onto the resulting composite. A missing
/// counterpart on either side is fatal.
fn merge_conditionals(graph: &mut Graph, tokens: &FileTokens) -> Result<(), AssembleError> {
    for keyword in ["then", "else"] {
        let pending: Vec<NodeId> = graph
            .ids()
            .filter(|&id| {
                let node = graph.node(id);
                node.has(Tag::Expression)
                    && node.pos.file == tokens.file
                    && expression_parent(graph, id).is_none()
                    && operator_of(graph, id)
                        .map(|op| graph.node(op).content == keyword)
                        .unwrap_or(false)
            })
            .collect();

        for expr in pending {
            if keyword == "then" {
                merge_then(graph, tokens, expr)?;
            } else {
                merge_else(graph, tokens, expr)?;
            }
        }
    }
    Ok(())
}

/// Splice `if cond` and `then body` into one composite which replaces the
/// `if` expression in every previous referrer.
fn merge_then(
    graph: &mut Graph,
    tokens: &FileTokens,
    then_expr: NodeId,
) -> Result<(), AssembleError> {
    let pos = graph.node(then_expr).pos;
    let if_expr = left_ancestor(graph, tokens, then_expr)
        .filter(|&anc| {
            operator_of(graph, anc)
                .map(|op| graph.node(op).content == "if")
                .unwrap_or(false)
        })
        .ok_or(AssembleError::UnmatchedThen { pos })?;

    let content = format!(
        "{} {}",
        graph.node(if_expr).content,
        graph.node(then_expr).content
    );
    let merged_pos = graph.node(if_expr).pos.merge(&pos);
    let composite = graph.add(
        content,
        NodeKind::Composite,
        Tag::Expression.into(),
        merged_pos,
    );

    // Re-parent: whatever referenced the `if` expression now references the
    // composite instead.
    let referrers: Vec<NodeId> = graph
        .node(if_expr)
        .inc()
        .filter(|&p| {
            p != composite && graph.node(p).has_any(Tag::Expression | Tag::Nonabelian)
        })
        .collect();
    for p in referrers {
        graph.unlink(p, if_expr);
        graph.link(p, composite);
    }

    graph.link(composite, if_expr);
    graph.link(composite, then_expr);
    if let Some(line) = line_of(graph, tokens, graph.node(if_expr).pos) {
        graph.link(composite, line);
    }
    Ok(())
}

/// Attach `else other` to the nearest `if-then` composite at its left.
fn merge_else(
    graph: &mut Graph,
    tokens: &FileTokens,
    else_expr: NodeId,
) -> Result<(), AssembleError> {
    let pos = graph.node(else_expr).pos;
    let composite = left_ancestor(graph, tokens, else_expr)
        .filter(|&anc| is_if_then(graph, anc))
        .ok_or(AssembleError::UnmatchedElse { pos })?;

    let appended = format!(
        "{} {}",
        graph.node(composite).content,
        graph.node(else_expr).content
    );
    graph.node_mut(composite).content = appended;
    graph.link(composite, else_expr);
    Ok(())
}

/// Most-composed ancestor of the token immediately left of the given
/// expression's operator token.
fn left_ancestor(graph: &Graph, tokens: &FileTokens, expr: NodeId) -> Option<NodeId> {
    let op = operator_of(graph, expr)?;
    let seq = tokens.token_index(op)?;
    let prev = tokens.tokens.get(seq.checked_sub(1)?).copied()?;
    Some(top_of(graph, prev))
}

/// An if/then composite not yet carrying an `else` arm: no operator of its
/// own, exactly an `if` child and a `then` child.
fn is_if_then(graph: &Graph, id: NodeId) -> bool {
    let node = graph.node(id);
    if node.kind != NodeKind::Composite || !node.has(Tag::Expression) {
        return false;
    }
    if operator_of(graph, id).is_some() {
        return false;
    }
    let arms: Vec<&str> = operands_of(graph, id)
        .iter()
        .filter_map(|&child| operator_of(graph, child))
        .map(|op| graph.node(op).content.as_str())
        .collect();
    arms == ["if", "then"]
}
