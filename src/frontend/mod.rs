//! Front-end analysis pipeline
//!
//! Maps token text into the graph, assembles expressions in precedence
//! order and canonicalizes repeated identifiers. The result is the
//! cross-referenced graph the semantic passes run on.

use thiserror::Error;
use tracing::debug;

pub mod assemble;
pub mod canon;
pub mod mapper;
pub mod ops;


pub use assemble::{assemble, AssembleError};
pub use canon::canonicalize;
pub use mapper::{map_source, FileTokens, MapError};
pub use ops::{Fixity, OpDef, OperatorTable, DEFAULT_OPERATORS};

use crate::graph::Graph;

/// Front-end errors
#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error(transparent)]
    Map(#[from] MapError),

    #[error(transparent)]
    Assemble(#[from] AssembleError),
}

/// Result of analyzing one or more files into a shared graph.
#[derive(Debug)]
pub struct Analysis {
    pub graph: Graph,
    pub files: Vec<FileTokens>,
}

/// Analyzer context
pub struct Analyzer<'t> {
    ops: &'t OperatorTable,
}

impl Default for Analyzer<'static> {
    fn default() -> Self {
        Self { ops: &DEFAULT_OPERATORS }
    }
}

impl<'t> Analyzer<'t> {
    /// Analyzer over the default operator table.
    pub fn new() -> Analyzer<'static> {
        Analyzer::default()
    }

    /// Analyzer over a caller-provided operator table.
    pub fn with_table(ops: &'t OperatorTable) -> Self {
        Self { ops }
    }

    pub fn operators(&self) -> &OperatorTable {
        self.ops
    }

    /// Analyze a single source file.
    pub fn analyze(&self, file_name: &str, source: &str) -> Result<Analysis, AnalyzeError> {
        self.analyze_all(&[(file_name, source)])
    }

    /// Analyze several files into one graph. Each pass runs to completion
    /// over a file before the next pass starts; nothing interleaves.
    pub fn analyze_all(&self, sources: &[(&str, &str)]) -> Result<Analysis, AnalyzeError> {
        let mut graph = Graph::new();
        let mut files = Vec::with_capacity(sources.len());

        for (name, source) in sources {
            debug!("analyzing {} ({} bytes)", name, source.len());
            let tokens = map_source(&mut graph, self.ops, name, source)?;
            assemble(&mut graph, self.ops, &tokens)?;
            files.push(tokens);
        }

        let merged = canonicalize(&mut graph);
        debug!(
            "analysis done: {} nodes, {} duplicate terms merged",
            graph.len(),
            merged
        );
        Ok(Analysis { graph, files })
    }
}
