//! Failure values returned by the block locator
//!
//! Every failure carries enough scanner state to explain why no range was
//! produced. Nothing here is ever converted into a best-effort range.

use crate::lexer::ScanMode;
use crate::span::BlockRange;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Scanner state at the point a depth scan gave up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanDiagnostics {
    /// Anchor line the scan started from (1-indexed)
    pub start_line: usize,
    /// Last line examined (1-indexed)
    pub last_line: usize,
    /// Depth after the last line examined
    pub depth: i64,
    pub baseline_depth: i64,
    /// Mode after the last line examined
    pub mode: ScanMode,
}

impl ScanDiagnostics {
    /// The scan ended inside a string, template or block comment
    ///
    /// This usually means the scanner's classification diverged from the
    /// real grammar rather than a genuine brace imbalance.
    pub fn malformed_lexical_state(&self) -> bool {
        !self.mode.is_code()
    }
}

impl std::fmt::Display for ScanDiagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "started at line {}, stopped at line {} with depth {} (baseline {})",
            self.start_line, self.last_line, self.depth, self.baseline_depth
        )?;
        if self.malformed_lexical_state() {
            let inside = if self.mode.is_comment() {
                "an unclosed comment"
            } else if self.mode.is_string() {
                "an unclosed string"
            } else {
                "non-code text"
            };
            write!(
                f,
                "; scanner still in {} mode inside {}, likely a lexical misclassification",
                self.mode, inside
            )?;
        }
        Ok(())
    }
}

/// Why the locator could not produce a range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    DeclarationNotFound,
    UnterminatedBlock,
    SearchBudgetExceeded,
    InvalidQuery,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::DeclarationNotFound => "declaration_not_found",
            FailureReason::UnterminatedBlock => "unterminated_block",
            FailureReason::SearchBudgetExceeded => "search_budget_exceeded",
            FailureReason::InvalidQuery => "invalid_query",
        }
    }
}

/// Errors produced by anchor resolution and block location
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocateError {
    /// No declaration line matched inside the search window
    #[error("no declaration of `{name}` found in lines {first_line}-{last_line}")]
    DeclarationNotFound {
        name: String,
        first_line: usize,
        last_line: usize,
    },

    /// The source ended before depth returned to baseline
    #[error("unterminated block: {0}")]
    UnterminatedBlock(ScanDiagnostics),

    /// The line budget ran out while source lines remained
    #[error("search budget of {max_lines} lines exhausted: {diagnostics}")]
    SearchBudgetExceeded {
        max_lines: usize,
        diagnostics: ScanDiagnostics,
    },

    #[error("line {line} is outside the source ({total} lines)")]
    LineOutOfRange { line: usize, total: usize },

    #[error("cannot insert before line {line}: it lies in removed lines {range}")]
    InsertionInsideRemovedRange { line: usize, range: BlockRange },

    #[error("search budget must be at least one line")]
    EmptySearchBudget,

    #[error("`{name}` is not a valid JavaScript identifier")]
    InvalidFunctionName { name: String },

    #[error("failed to build declaration pattern: {message}")]
    InvalidPattern { message: String },
}

impl LocateError {
    /// Coarse classification used in reports
    pub fn reason(&self) -> FailureReason {
        match self {
            LocateError::DeclarationNotFound { .. } => FailureReason::DeclarationNotFound,
            LocateError::UnterminatedBlock(_) => FailureReason::UnterminatedBlock,
            LocateError::SearchBudgetExceeded { .. } => FailureReason::SearchBudgetExceeded,
            LocateError::LineOutOfRange { .. }
            | LocateError::InsertionInsideRemovedRange { .. }
            | LocateError::EmptySearchBudget
            | LocateError::InvalidFunctionName { .. }
            | LocateError::InvalidPattern { .. } => FailureReason::InvalidQuery,
        }
    }

    /// Scanner state for failures that happened mid-scan
    pub fn diagnostics(&self) -> Option<&ScanDiagnostics> {
        match self {
            LocateError::UnterminatedBlock(diagnostics)
            | LocateError::SearchBudgetExceeded { diagnostics, .. } => Some(diagnostics),
            _ => None,
        }
    }

    pub fn malformed_lexical_state(&self) -> bool {
        self.diagnostics()
            .is_some_and(ScanDiagnostics::malformed_lexical_state)
    }
}
