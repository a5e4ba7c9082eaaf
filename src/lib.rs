//! Recompose analysis engine
//!
//! The front end of an experimental reactive composition language: source
//! text becomes a richly cross-referenced graph of terms and operators,
//! operator fixity and precedence are resolved into nested expression
//! structures, repeated identifiers are canonicalized into shared nodes and
//! a bidirectional fixpoint evaluator propagates values over the result.
//!
//! # Example
//!
//! ```
//! use recompose::{analyze_and_evaluate, Result};
//!
//! fn main() -> Result<()> {
//!     let (analysis, outcome) = analyze_and_evaluate("demo.rcl", "x = 2\ny = x + 3\n")?;
//!     assert_eq!(analysis.graph.count(recompose::graph::Tag::Equality), 2);
//!     assert!(outcome.stuck.is_empty());
//!     Ok(())
//! }
//! ```

#![warn(rust_2018_idioms)]

pub mod frontend;
pub mod graph;
pub mod semantic;
pub mod util;

// Re-exports
pub use anyhow::{Context, Result};
pub use thiserror::Error;

use tracing::debug;

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name
pub const NAME: &str = "recompose";

/// Analyze one source file and run the evaluator to its fixpoint.
pub fn analyze_and_evaluate(
    file_name: &str,
    source: &str,
) -> Result<(frontend::Analysis, semantic::EvalOutcome)> {
    let analyzer = frontend::Analyzer::new();
    debug!("analysis start: {}", file_name);
    let analysis = analyzer
        .analyze(file_name, source)
        .with_context(|| format!("Failed to analyze: {}", file_name))?;
    debug!("evaluation start: {}", file_name);
    let outcome = semantic::evaluate(&analysis.graph, analyzer.operators())
        .with_context(|| format!("Failed to evaluate: {}", file_name))?;
    debug!("evaluation complete: {} passes", outcome.passes);
    Ok((analysis, outcome))
}

/// Run the full pipeline on source code, logging a result summary.
pub fn run(file_name: &str, source: &str) -> Result<()> {
    let (analysis, outcome) = analyze_and_evaluate(file_name, source)?;
    debug!(
        "{}: {} nodes, {} values, {} stuck",
        file_name,
        analysis.graph.len(),
        outcome.layer.values().count(),
        outcome.stuck.len()
    );
    Ok(())
}

use std::fs;
use std::path::Path;

/// Run the full pipeline on a file.
pub fn run_file(path: &Path) -> Result<(frontend::Analysis, semantic::EvalOutcome)> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    analyze_and_evaluate(&path.display().to_string(), &source)
}
