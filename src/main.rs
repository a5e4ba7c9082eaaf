//! Recompose - CLI

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use recompose::graph::{Graph, Tag, TagSet};
use recompose::util::logger;
use recompose::{analyze_and_evaluate, NAME, VERSION};

/// Analysis engine for the recompose reactive composition language
#[derive(Parser, Debug)]
#[command(name = "recompose")]
#[command(version = VERSION)]
#[command(about = NAME, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyze and evaluate a source file, printing resolved values
    Run {
        /// Source file to run
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Analyze and evaluate code from the command line
    Eval {
        /// Code to evaluate
        #[arg(value_name = "CODE")]
        code: String,
    },

    /// Emit a Graphviz dot rendering of the analyzed graph
    Graph {
        /// Source file to analyze
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Also include entity and block nodes
        #[arg(short, long)]
        full: bool,
    },

    /// Print version information
    Version,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.verbose {
        logger::init_debug();
    } else {
        logger::init();
    }

    match args.command {
        Commands::Run { file } => {
            let (analysis, outcome) = recompose::run_file(&file)
                .with_context(|| format!("Failed to run: {}", file.display()))?;
            print_values(&analysis.graph, &outcome);
        }
        Commands::Eval { code } => {
            let (analysis, outcome) =
                analyze_and_evaluate("<eval>", &code).context("Failed to evaluate code")?;
            print_values(&analysis.graph, &outcome);
        }
        Commands::Graph { file, full } => {
            let (analysis, _) = recompose::run_file(&file)
                .with_context(|| format!("Failed to analyze: {}", file.display()))?;
            let mut include = Tag::Expression | Tag::Term | Tag::Nonabelian;
            if full {
                include = include | Tag::Entity | Tag::Inputs | Tag::Outputs | Tag::Line;
            }
            let mut stdout = std::io::stdout().lock();
            emit_dot(&analysis.graph, include, &source_caption(&file), &mut stdout)?;
        }
        Commands::Version => {
            println!("{} {}", NAME, VERSION);
        }
    }

    Ok(())
}

/// Print every resolved term, in source order.
fn print_values(graph: &Graph, outcome: &recompose::semantic::EvalOutcome) {
    let mut terms: Vec<_> = graph
        .ids()
        .filter(|&id| graph.node(id).has(Tag::Term))
        .collect();
    terms.sort_by_key(|&id| graph.node(id).pos);
    for id in terms {
        if let Some(value) = outcome.layer.value(id) {
            println!("{} = {}", graph.node(id).content, value);
        }
    }
    if !outcome.stuck.is_empty() {
        eprintln!("{} nodes could not be resolved", outcome.stuck.len());
    }
}

/// Graph caption from a source path: "falcon" from "samples/falcon.rcl".
fn source_caption(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "graph".to_string())
}

/// Undirected dot rendering of the nodes carrying one of the included tags.
fn emit_dot(
    graph: &Graph,
    include: TagSet,
    name: &str,
    out: &mut impl std::io::Write,
) -> Result<()> {
    writeln!(out, "graph {} {{", name)?;
    let included: Vec<_> = graph
        .ids()
        .filter(|&id| graph.node(id).has_any(include))
        .collect();
    for &id in &included {
        writeln!(
            out,
            "    {} [label=\"{}\"];",
            id,
            graph.node(id).display_label().replace('"', "\\\"")
        )?;
    }
    let mut seen = std::collections::HashSet::new();
    for &id in &included {
        for next in graph.node(id).out() {
            if !graph.node(next).has_any(include) {
                continue;
            }
            if seen.insert((id.min(next), id.max(next))) {
                writeln!(out, "    {} -- {};", id, next)?;
            }
        }
    }
    writeln!(out, "}}")?;
    Ok(())
}
