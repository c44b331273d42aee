//! Per-line depth traces and nesting profiles
//!
//! Used to see *why* a block closes where it does, and which baseline depth
//! a declaration deep inside a `<script>` element sits at.

use crate::error::LocateError;
use crate::lexer::{ScanMode, ScanOptions, ScanState};
use crate::locate::{walk_block, BlockOptions};
use crate::span::BlockRange;
use serde::{Deserialize, Serialize};

/// Depth change produced by a single line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineStep {
    /// 1-indexed line number
    pub line: usize,
    pub depth_before: i64,
    pub depth_after: i64,
    /// Live `{` on the line
    pub opens: usize,
    /// Live `}` on the line
    pub closes: usize,
    /// Mode carried into the next line
    pub mode_after: ScanMode,
}

impl LineStep {
    /// True if the line holds any live brace
    pub fn has_braces(&self) -> bool {
        self.opens > 0 || self.closes > 0
    }

    pub fn depth_changed(&self) -> bool {
        self.depth_before != self.depth_after
    }
}

/// Full record of a depth scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockTrace {
    pub anchor_line: usize,
    pub baseline_depth: i64,
    pub steps: Vec<LineStep>,
    /// Same outcome [`crate::locate::locate_block`] returns for these inputs
    pub outcome: Result<BlockRange, LocateError>,
}

impl BlockTrace {
    /// Step of the line that closed the block, if it closed
    pub fn closing_step(&self) -> Option<&LineStep> {
        let range = self.outcome.as_ref().ok()?;
        self.steps.iter().find(|s| s.line == range.end_line)
    }

    /// Compare the located end line against an expectation
    pub fn verify(&self, expected_end: usize) -> Verification {
        let actual = self.outcome.as_ref().ok().map(|r| r.end_line);
        Verification {
            expected: expected_end,
            actual,
            matches: actual == Some(expected_end),
        }
    }
}

/// Outcome of checking a located end line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verification {
    pub expected: usize,
    pub actual: Option<usize>,
    pub matches: bool,
}

/// Run a depth scan and record every examined line
pub fn trace_block<S: AsRef<str>>(lines: &[S], anchor_line: usize, options: &BlockOptions) -> BlockTrace {
    let mut steps = Vec::new();
    let outcome = walk_block(lines, anchor_line, options, |step| steps.push(*step));
    BlockTrace {
        anchor_line,
        baseline_depth: options.baseline_depth,
        steps,
        outcome,
    }
}

/// Depth changes over a stretch of source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NestingProfile {
    pub from_line: usize,
    /// Exclusive end; `depth` and `mode` describe the state entering it
    pub to_line: usize,
    pub depth: i64,
    pub mode: ScanMode,
    /// Lines whose net depth changed, in source order
    pub changes: Vec<LineStep>,
}

impl NestingProfile {
    /// Changes that land on one of `levels`
    pub fn changes_at_levels(&self, levels: &[i64]) -> Vec<&LineStep> {
        self.changes
            .iter()
            .filter(|s| levels.contains(&s.depth_after))
            .collect()
    }
}

/// Scan lines `from_line..to_line` starting at `start_depth`
///
/// `to_line` may be one past the last line to profile the whole tail.
pub fn nesting_profile<S: AsRef<str>>(
    lines: &[S],
    from_line: usize,
    to_line: usize,
    start_depth: i64,
    options: &ScanOptions,
) -> Result<NestingProfile, LocateError> {
    let total = lines.len();
    if from_line == 0 || from_line > total {
        return Err(LocateError::LineOutOfRange { line: from_line, total });
    }
    if to_line < from_line || to_line > total + 1 {
        return Err(LocateError::LineOutOfRange { line: to_line, total });
    }

    let mut state = ScanState::new(start_depth);
    let mut changes = Vec::new();

    for (idx, line) in lines[from_line - 1..to_line - 1].iter().enumerate() {
        let depth_before = state.depth;
        let activity = state.advance(line.as_ref(), options);
        let step = LineStep {
            line: from_line + idx,
            depth_before,
            depth_after: state.depth,
            opens: activity.opens,
            closes: activity.closes,
            mode_after: state.mode,
        };
        if step.depth_changed() {
            changes.push(step);
        }
    }

    Ok(NestingProfile {
        from_line,
        to_line,
        depth: state.depth,
        mode: state.mode,
        changes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locate::locate_block;

    const SAMPLE: [&str; 6] = [
        "<script>",
        "function outer() {",
        "  if (a) {",
        "    b('}');",
        "  }",
        "}",
    ];

    #[test]
    fn test_trace_agrees_with_locate() {
        let options = BlockOptions::default();
        let trace = trace_block(&SAMPLE, 2, &options);
        assert_eq!(trace.outcome, locate_block(&SAMPLE, 2, &options));
        assert_eq!(trace.outcome, Ok(BlockRange::new(2, 6)));
        assert_eq!(trace.steps.len(), 5);
    }

    #[test]
    fn test_trace_records_depths() {
        let trace = trace_block(&SAMPLE, 2, &BlockOptions::default());
        let depths: Vec<(i64, i64)> = trace
            .steps
            .iter()
            .map(|s| (s.depth_before, s.depth_after))
            .collect();
        assert_eq!(depths, vec![(0, 1), (1, 2), (2, 2), (2, 1), (1, 0)]);
        // The quoted brace on line 4 is not counted
        assert!(!trace.steps[2].has_braces());
    }

    #[test]
    fn test_closing_step_and_verify() {
        let trace = trace_block(&SAMPLE, 2, &BlockOptions::default());
        assert_eq!(trace.closing_step().map(|s| s.line), Some(6));

        let ok = trace.verify(6);
        assert!(ok.matches);
        let wrong = trace.verify(5);
        assert!(!wrong.matches);
        assert_eq!(wrong.actual, Some(6));
    }

    #[test]
    fn test_verify_failed_trace() {
        let options = BlockOptions {
            max_lines: 2,
            ..Default::default()
        };
        let trace = trace_block(&SAMPLE, 2, &options);
        assert!(trace.outcome.is_err());
        assert!(trace.closing_step().is_none());
        assert_eq!(trace.verify(6).actual, None);
        assert_eq!(trace.steps.len(), 2);
    }

    #[test]
    fn test_nesting_profile_reports_depth_entering_line() {
        let profile = nesting_profile(&SAMPLE, 1, 4, 0, &ScanOptions::default()).unwrap();
        assert_eq!(profile.depth, 2);
        assert_eq!(profile.mode, ScanMode::Code);
        let lines: Vec<usize> = profile.changes.iter().map(|s| s.line).collect();
        assert_eq!(lines, vec![2, 3]);
        assert_eq!(profile.changes_at_levels(&[2]).len(), 1);
    }

    #[test]
    fn test_nesting_profile_whole_tail() {
        let profile = nesting_profile(&SAMPLE, 1, SAMPLE.len() + 1, 1, &ScanOptions::default()).unwrap();
        assert_eq!(profile.depth, 1);
        assert_eq!(profile.changes.len(), 4);
    }

    #[test]
    fn test_nesting_profile_rejects_bad_range() {
        let options = ScanOptions::default();
        assert!(nesting_profile(&SAMPLE, 0, 2, 0, &options).is_err());
        assert!(nesting_profile(&SAMPLE, 3, 2, 0, &options).is_err());
        assert!(nesting_profile(&SAMPLE, 1, 9, 0, &options).is_err());
    }
}
