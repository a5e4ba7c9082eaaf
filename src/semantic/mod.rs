//! Semantic passes over the assembled graph
//!
//! Runs after the front end: constraint evaluation to a fixpoint, then the
//! prototype composition brancher.

pub mod branch;
pub mod eval;

#[cfg(test)]
mod tests;

pub use branch::{branch_compositions, branch_equalities, Branch, BranchError, BranchId, BranchSet};
pub use eval::{evaluate, evaluate_seeded, EvalError, EvalLayer, EvalOutcome};
