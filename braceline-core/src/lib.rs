//! Braceline core library - locate brace-delimited JavaScript blocks by line

#![deny(warnings)]

// Global invariants enforced in this crate:
// - Scanning is a pure function of the borrowed source lines
// - No global mutable state
// - No randomness, clocks, threads, or async
// - Failures are returned as values, never replaced by a guessed range
// - Identical input yields byte-for-byte identical output

pub mod config;
pub mod error;
pub mod extract;
pub mod lexer;
pub mod locate;
pub mod report;
pub mod span;
pub mod splice;
pub mod trace;

pub use config::ResolvedConfig;
pub use error::{FailureReason, LocateError, ScanDiagnostics};
pub use lexer::{EscapeRule, ScanMode, ScanOptions, ScanState};
pub use locate::{locate_block, locate_function, resolve_anchor, AnchorQuery, BlockOptions};
pub use report::{render_json, render_text, LocateReport};
pub use span::BlockRange;

use anyhow::{Context, Result};
use std::path::Path;

/// Read a UTF-8 source file into lines
///
/// Line terminators (`\n` or `\r\n`) are stripped; line numbers reported by
/// the locator index into the returned vector, 1-based.
pub fn load_source(path: &Path) -> Result<Vec<String>> {
    let src = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    Ok(src.lines().map(str::to_string).collect())
}

/// Write lines back out, each followed by `\n`
pub fn write_lines<S: AsRef<str>>(path: &Path, lines: &[S]) -> Result<()> {
    let mut out = String::with_capacity(lines.iter().map(|l| l.as_ref().len() + 1).sum());
    for line in lines {
        out.push_str(line.as_ref());
        out.push('\n');
    }
    std::fs::write(path, out).with_context(|| format!("Failed to write file: {}", path.display()))
}
