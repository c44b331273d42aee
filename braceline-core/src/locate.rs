//! Block location by brace depth
//!
//! Global invariants enforced:
//! - Never guesses: every miss is reported with the scanner state behind it
//! - Depth moves only on live `{`/`}` characters
//! - A block closes only after depth has exceeded the baseline at least once
//! - Identical input yields identical ranges or identical failures

use crate::error::{LocateError, ScanDiagnostics};
use crate::lexer::{ScanOptions, ScanState};
use crate::span::BlockRange;
use crate::trace::LineStep;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Default number of lines a depth scan may examine
pub const DEFAULT_MAX_LINES: usize = 200;

/// Default number of lines searched on each side of an approximate anchor
pub const DEFAULT_SEARCH_WINDOW: usize = 10;

/// Parameters of a depth-tracking scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockOptions {
    /// Depth considered "outside" the block (1 inside a `<script>` wrapper)
    pub baseline_depth: i64,
    /// Maximum number of lines examined, anchor line included
    pub max_lines: usize,
    pub scan: ScanOptions,
}

impl Default for BlockOptions {
    fn default() -> Self {
        BlockOptions {
            baseline_depth: 0,
            max_lines: DEFAULT_MAX_LINES,
            scan: ScanOptions::default(),
        }
    }
}

/// Request to find a named declaration near a line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorQuery {
    pub function_name: String,
    /// 1-indexed hint; may be off by a few lines
    pub approximate_line: usize,
    /// Lines searched before and after the hint
    pub search_window: usize,
}

impl AnchorQuery {
    pub fn new(function_name: impl Into<String>, approximate_line: usize, search_window: usize) -> Self {
        AnchorQuery {
            function_name: function_name.into(),
            approximate_line,
            search_window,
        }
    }

    /// Query whose window covers every line of a source of `total_lines`
    pub fn anywhere(function_name: impl Into<String>, total_lines: usize) -> Self {
        AnchorQuery::new(function_name, 1, total_lines)
    }

    /// Clamped 1-indexed (first, last) lines of the window
    fn window(&self, total_lines: usize) -> (usize, usize) {
        let first = self.approximate_line.saturating_sub(self.search_window).max(1);
        let last = self
            .approximate_line
            .saturating_add(self.search_window)
            .min(total_lines);
        (first, last)
    }
}

/// Which declaration form matched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclarationKind {
    /// `function name(` or `async function name(`
    Function,
    /// `const|let|var name =`
    Variable,
}

/// A resolved declaration line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anchor {
    pub line: usize,
    pub kind: DeclarationKind,
}

/// Compiled declaration patterns for one name
struct DeclarationPatterns {
    function: Regex,
    variable: Regex,
}

impl DeclarationPatterns {
    fn new(name: &str) -> Result<Self, LocateError> {
        if !is_identifier(name) {
            return Err(LocateError::InvalidFunctionName {
                name: name.to_string(),
            });
        }
        let escaped = regex::escape(name);
        let compile = |pattern: String| {
            Regex::new(&pattern).map_err(|e| LocateError::InvalidPattern {
                message: e.to_string(),
            })
        };
        Ok(DeclarationPatterns {
            function: compile(format!(r"^\s*(?:async\s+)?function\s+{}\s*\(", escaped))?,
            variable: compile(format!(r"^\s*(?:const|let|var)\s+{}\s*=", escaped))?,
        })
    }

    fn for_kind(&self, kind: DeclarationKind) -> &Regex {
        match kind {
            DeclarationKind::Function => &self.function,
            DeclarationKind::Variable => &self.variable,
        }
    }
}

/// JavaScript identifier check (ASCII letters, digits, `_` and `$`)
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// Find the declaration line for `query.function_name`
///
/// The whole window is searched for a `function` declaration before any
/// variable-style declaration is considered. The first matching line wins.
pub fn resolve_anchor<S: AsRef<str>>(lines: &[S], query: &AnchorQuery) -> Result<Anchor, LocateError> {
    let patterns = DeclarationPatterns::new(&query.function_name)?;
    let (first, last) = query.window(lines.len());
    let not_found = || LocateError::DeclarationNotFound {
        name: query.function_name.clone(),
        first_line: first,
        last_line: last,
    };

    if first > last {
        return Err(not_found());
    }

    for kind in [DeclarationKind::Function, DeclarationKind::Variable] {
        let pattern = patterns.for_kind(kind);
        let hit = lines[first - 1..last]
            .iter()
            .position(|line| pattern.is_match(line.as_ref()));
        if let Some(offset) = hit {
            let anchor = Anchor {
                line: first + offset,
                kind,
            };
            debug!(
                name = %query.function_name,
                line = anchor.line,
                kind = ?anchor.kind,
                "resolved declaration"
            );
            return Ok(anchor);
        }
    }

    Err(not_found())
}

/// Locate the block that opens at `anchor_line`
///
/// Depth starts at `options.baseline_depth`. The block closes on the first
/// line after which depth is back at baseline, provided depth rose above the
/// baseline at some point.
pub fn locate_block<S: AsRef<str>>(
    lines: &[S],
    anchor_line: usize,
    options: &BlockOptions,
) -> Result<BlockRange, LocateError> {
    walk_block(lines, anchor_line, options, |_| {})
}

/// Resolve a named declaration, then locate its block
pub fn locate_function<S: AsRef<str>>(
    lines: &[S],
    query: &AnchorQuery,
    options: &BlockOptions,
) -> Result<BlockRange, LocateError> {
    let anchor = resolve_anchor(lines, query)?;
    locate_block(lines, anchor.line, options)
}

/// Shared depth scan; `on_step` sees every examined line in order
pub(crate) fn walk_block<S, F>(
    lines: &[S],
    anchor_line: usize,
    options: &BlockOptions,
    mut on_step: F,
) -> Result<BlockRange, LocateError>
where
    S: AsRef<str>,
    F: FnMut(&LineStep),
{
    if anchor_line == 0 || anchor_line > lines.len() {
        return Err(LocateError::LineOutOfRange {
            line: anchor_line,
            total: lines.len(),
        });
    }
    if options.max_lines == 0 {
        return Err(LocateError::EmptySearchBudget);
    }

    let baseline = options.baseline_depth;
    let mut state = ScanState::new(baseline);
    let mut opened = false;
    let mut last_line = anchor_line;

    for (idx, line) in lines
        .iter()
        .enumerate()
        .skip(anchor_line - 1)
        .take(options.max_lines)
    {
        let depth_before = state.depth;
        let activity = state.advance(line.as_ref(), &options.scan);
        opened |= activity.peak > baseline;
        last_line = idx + 1;

        let step = LineStep {
            line: last_line,
            depth_before,
            depth_after: state.depth,
            opens: activity.opens,
            closes: activity.closes,
            mode_after: state.mode,
        };
        trace!(line = step.line, depth = step.depth_after, mode = %step.mode_after, "scanned line");
        on_step(&step);

        if opened && state.depth == baseline {
            debug!(start = anchor_line, end = last_line, "block closed");
            return Ok(BlockRange::new(anchor_line, last_line));
        }
    }

    let diagnostics = ScanDiagnostics {
        start_line: anchor_line,
        last_line,
        depth: state.depth,
        baseline_depth: baseline,
        mode: state.mode,
    };
    debug!(%diagnostics, "block did not close");

    if last_line >= lines.len() {
        Err(LocateError::UnterminatedBlock(diagnostics))
    } else {
        Err(LocateError::SearchBudgetExceeded {
            max_lines: options.max_lines,
            diagnostics,
        })
    }
}
