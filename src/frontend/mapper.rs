//! Lexical-to-token mapping
//!
//! Turns raw source text into LINE, OPERATOR and TERM nodes. Blank and
//! fully-commented lines never produce a LINE node, so the surviving chain
//! is already spliced around them. Comment characters are masked out in
//! place, which keeps every column number true to the original text.
//!
//! Operators are matched longest-spelling-first; a candidate loses if its
//! span overlaps one already claimed on the line, or if it is an alphabetic
//! keyword glued to further alphabetic characters ("iffy" stays one term).
//! Whatever alphanumeric runs remain unclaimed become TERM nodes.

use indexmap::IndexMap;
use thiserror::Error;
use tracing::debug;

use super::ops::OperatorTable;
use crate::graph::{Graph, NodeId, NodeKind, Tag, TagSet};
use crate::util::span::{FileId, SourcePos};

/// Mapping errors
#[derive(Debug, Error)]
pub enum MapError {
    #[error("unterminated block comment starting at {pos} in {file}")]
    UnterminatedBlockComment { file: String, pos: SourcePos },
}

/// Per-file token index produced by mapping, consumed by the assembler.
///
/// All vectors are in source order. The index is only meaningful until
/// canonicalization, which may delete duplicate TERM nodes.
#[derive(Debug)]
pub struct FileTokens {
    pub file: FileId,
    /// Surviving LINE nodes
    pub lines: Vec<NodeId>,
    /// TERM and OPERATOR nodes, one flat sequence
    pub tokens: Vec<NodeId>,
    pub terms: Vec<NodeId>,
    pub operators: Vec<NodeId>,
    /// Line number → column of the first non-whitespace character
    pub indents: IndexMap<u32, u32>,
}

impl FileTokens {
    /// Sequence index of a token, if it belongs to this file.
    pub fn token_index(&self, id: NodeId) -> Option<usize> {
        self.tokens.iter().position(|&t| t == id)
    }
}

/// Map one source file into the graph.
pub fn map_source(
    graph: &mut Graph,
    ops: &OperatorTable,
    file_name: &str,
    source: &str,
) -> Result<FileTokens, MapError> {
    let file = graph.intern_file(file_name);
    let masked = mask_comments(file, file_name, source)?;

    let mut out = FileTokens {
        file,
        lines: Vec::new(),
        tokens: Vec::new(),
        terms: Vec::new(),
        operators: Vec::new(),
        indents: IndexMap::new(),
    };

    let mut prev_line: Option<NodeId> = None;
    for (line_no, chars) in &masked {
        let line_id = match spawn_line(graph, file, *line_no, chars) {
            Some(id) => id,
            None => continue,
        };
        if let Some(prev) = prev_line {
            graph.link(prev, line_id);
        }
        prev_line = Some(line_id);
        out.lines.push(line_id);

        let indent = chars
            .iter()
            .position(|c| !c.is_whitespace())
            .map(|i| i as u32 + 1)
            .unwrap_or(1);
        out.indents.insert(*line_no, indent);

        let mut claimed: Vec<(u32, u32)> = Vec::new();
        match_operators(graph, ops, line_id, chars, &mut claimed, &mut out);
        match_terms(graph, line_id, chars, &claimed, &mut out);
    }

    out.terms.sort_by_key(|&t| graph.node(t).pos);
    out.operators.sort_by_key(|&t| graph.node(t).pos);
    out.tokens = out
        .terms
        .iter()
        .chain(out.operators.iter())
        .copied()
        .collect();
    out.tokens.sort_by_key(|&t| graph.node(t).pos);

    // Chain the flat per-file token sequence.
    for pair in out.tokens.windows(2) {
        graph.link(pair[0], pair[1]);
    }

    debug!(
        "mapped {}: {} lines, {} terms, {} operators",
        file_name,
        out.lines.len(),
        out.terms.len(),
        out.operators.len()
    );
    Ok(out)
}

/// Split into physical lines and blank out comment characters, keeping
/// every remaining character at its original column. Block comments may
/// span lines; lines they swallow completely become blank and are later
/// dropped.
fn mask_comments(
    file: FileId,
    file_name: &str,
    source: &str,
) -> Result<Vec<(u32, Vec<char>)>, MapError> {
    let mut lines = Vec::new();
    let mut block_start: Option<SourcePos> = None;

    for (i, raw) in source.lines().enumerate() {
        let line_no = i as u32 + 1;
        let mut chars: Vec<char> = raw.chars().collect();
        let len = chars.len();
        let mut col = 0;
        while col < len {
            if block_start.is_some() {
                if chars[col] == '*' && col + 1 < len && chars[col + 1] == '/' {
                    block_start = None;
                    chars[col] = ' ';
                    chars[col + 1] = ' ';
                    col += 2;
                } else {
                    chars[col] = ' ';
                    col += 1;
                }
            } else if chars[col] == '/' && col + 1 < len && chars[col + 1] == '/' {
                for c in chars[col..].iter_mut() {
                    *c = ' ';
                }
                break;
            } else if chars[col] == '/' && col + 1 < len && chars[col + 1] == '*' {
                block_start = Some(SourcePos::new(file, line_no, col as u32 + 1, col as u32 + 3));
                chars[col] = ' ';
                chars[col + 1] = ' ';
                col += 2;
            } else {
                col += 1;
            }
        }
        lines.push((line_no, chars));
    }

    match block_start {
        Some(pos) => Err(MapError::UnterminatedBlockComment {
            file: file_name.to_string(),
            pos,
        }),
        None => Ok(lines),
    }
}

/// Create a LINE node unless the masked line is blank. The recorded span
/// ends at the last non-whitespace character, so stripping a trailing
/// comment shrinks the span.
fn spawn_line(graph: &mut Graph, file: FileId, line_no: u32, chars: &[char]) -> Option<NodeId> {
    let last = chars.iter().rposition(|c| !c.is_whitespace())?;
    let content: String = chars.iter().collect::<String>().trim_end().to_string();
    let pos = SourcePos::new(file, line_no, 1, last as u32 + 2);
    Some(graph.add(content, NodeKind::Line, TagSet::EMPTY, pos))
}

fn match_operators(
    graph: &mut Graph,
    ops: &OperatorTable,
    line_id: NodeId,
    chars: &[char],
    claimed: &mut Vec<(u32, u32)>,
    out: &mut FileTokens,
) {
    let line_pos = graph.node(line_id).pos;
    for def in ops.lexical() {
        let pattern: Vec<char> = def.text.chars().collect();
        let len = pattern.len();
        let mut i = 0usize;
        while i + len <= chars.len() {
            if chars[i..i + len] != pattern[..] {
                i += 1;
                continue;
            }
            let start = i as u32 + 1;
            let end = start + len as u32;
            let overlaps = claimed.iter().any(|&(s, e)| s < end && start < e);
            let glued = def.is_alphabetic()
                && ((i > 0 && chars[i - 1].is_alphabetic())
                    || (i + len < chars.len() && chars[i + len].is_alphabetic()));
            if overlaps || glued {
                i += 1;
                continue;
            }
            let pos = SourcePos::new(line_pos.file, line_pos.line, start, end);
            let op = graph.add(def.text, NodeKind::Operator, TagSet::EMPTY, pos);
            graph.link(line_id, op);
            claimed.push((start, end));
            out.operators.push(op);
            i += len;
        }
    }
}

/// Remaining maximal alphanumeric runs become TERM nodes; all-digit runs
/// also carry the NUMBER role.
fn match_terms(
    graph: &mut Graph,
    line_id: NodeId,
    chars: &[char],
    claimed: &[(u32, u32)],
    out: &mut FileTokens,
) {
    let line_pos = graph.node(line_id).pos;
    let taken = |col: u32| claimed.iter().any(|&(s, e)| s <= col && col < e);

    let mut run_start: Option<usize> = None;
    for i in 0..=chars.len() {
        let in_run = i < chars.len() && chars[i].is_alphanumeric() && !taken(i as u32 + 1);
        match (run_start, in_run) {
            (None, true) => run_start = Some(i),
            (Some(s), false) => {
                let text: String = chars[s..i].iter().collect();
                let mut roles = TagSet::EMPTY;
                if text.chars().all(|c| c.is_ascii_digit()) {
                    roles.insert(Tag::Number);
                }
                let pos =
                    SourcePos::new(line_pos.file, line_pos.line, s as u32 + 1, i as u32 + 1);
                let term = graph.add(text, NodeKind::Term, roles, pos);
                graph.link(line_id, term);
                out.terms.push(term);
                run_start = None;
            }
            _ => {}
        }
    }
}
