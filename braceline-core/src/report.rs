//! Reporting and output generation
//!
//! Global invariants enforced:
//! - Deterministic output ordering (reports keep caller order)
//! - Byte-for-byte identical output across runs

use crate::error::{FailureReason, LocateError};
use crate::extract::ExtractionPlan;
use crate::lexer::ScanMode;
use crate::span::BlockRange;
use crate::trace::{BlockTrace, NestingProfile, Verification};
use serde::{Deserialize, Serialize};

/// Width of source excerpts in trace output
const EXCERPT_WIDTH: usize = 100;

/// Outcome of locating one target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LocateReport {
    /// Function name, or `line N` for anchor-line queries
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<BlockRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureReport>,
}

/// Failure details in report format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct FailureReport {
    pub reason: FailureReason,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<ScanMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_line: Option<usize>,
    pub malformed_lexical_state: bool,
}

impl From<&LocateError> for FailureReport {
    fn from(error: &LocateError) -> Self {
        let diagnostics = error.diagnostics();
        FailureReport {
            reason: error.reason(),
            message: error.to_string(),
            depth: diagnostics.map(|d| d.depth),
            mode: diagnostics.map(|d| d.mode),
            last_line: diagnostics.map(|d| d.last_line),
            malformed_lexical_state: error.malformed_lexical_state(),
        }
    }
}

impl LocateReport {
    pub fn new(target: impl Into<String>, outcome: &Result<BlockRange, LocateError>) -> Self {
        let (range, failure) = match outcome {
            Ok(range) => (Some(*range), None),
            Err(error) => (None, Some(FailureReport::from(error))),
        };
        LocateReport {
            target: target.into(),
            range,
            failure,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.range.is_some()
    }
}

/// Render locate reports as an aligned table
pub fn render_text(reports: &[LocateReport]) -> String {
    let mut output = String::new();
    output.push_str(&format!(
        "{:<30} {:<7} {:<7} {}\n",
        "TARGET", "START", "END", "STATUS"
    ));

    for report in reports {
        let (start, end) = match report.range {
            Some(range) => (range.start_line.to_string(), range.end_line.to_string()),
            None => ("-".to_string(), "-".to_string()),
        };
        let status = match &report.failure {
            Some(failure) => format!("{}: {}", failure.reason.as_str(), failure.message),
            None => "ok".to_string(),
        };
        output.push_str(&format!(
            "{:<30} {:<7} {:<7} {}\n",
            truncate_or_pad(&report.target, 30),
            start,
            end,
            status
        ));
    }

    output
}

/// Render locate reports as JSON output
pub fn render_json(reports: &[LocateReport]) -> String {
    serde_json::to_string_pretty(reports).unwrap_or_else(|_| "[]".to_string())
}

/// Render a block trace, showing only lines with brace activity
pub fn render_trace<S: AsRef<str>>(
    trace: &BlockTrace,
    lines: &[S],
    verification: Option<&Verification>,
) -> String {
    let rule = "=".repeat(80);
    let mut output = String::new();
    output.push_str(&format!(
        "Tracing block from line {} (baseline depth {})\n{}\n\n",
        trace.anchor_line, trace.baseline_depth, rule
    ));

    let closing_line = trace.closing_step().map(|s| s.line);
    for step in trace.steps.iter().filter(|s| s.has_braces()) {
        let marker = if Some(step.line) == closing_line {
            "  <- block closes"
        } else {
            ""
        };
        output.push_str(&format!(
            "Line {:5}: [{}→{}] +{}/-{}  mode={}{}\n",
            step.line,
            step.depth_before,
            step.depth_after,
            step.opens,
            step.closes,
            step.mode_after,
            marker
        ));
        output.push_str(&format!("  {}\n\n", excerpt(lines, step.line)));
    }

    output.push_str(&rule);
    output.push('\n');
    match &trace.outcome {
        Ok(range) => output.push_str(&format!("Block closes at line {} (lines {})\n", range.end_line, range)),
        Err(error) => output.push_str(&format!("ERROR: {}\n", error)),
    }

    if let Some(v) = verification {
        let actual = v
            .actual
            .map(|l| l.to_string())
            .unwrap_or_else(|| "none".to_string());
        output.push_str(&format!(
            "Expected end line: {}\nActual end line: {}\nMatch: {}\n",
            v.expected, actual, v.matches
        ));
    }

    output
}

/// Render a nesting profile; `levels` narrows the listed changes when non-empty
pub fn render_profile<S: AsRef<str>>(profile: &NestingProfile, lines: &[S], levels: &[i64]) -> String {
    let mut output = String::new();
    output.push_str(&format!(
        "Depth entering line {}: {} (mode {})\n",
        profile.to_line, profile.depth, profile.mode
    ));

    let changes: Vec<_> = if levels.is_empty() {
        profile.changes.iter().collect()
    } else {
        profile.changes_at_levels(levels)
    };

    output.push_str(&format!(
        "Depth changes between lines {} and {}: {}\n\n",
        profile.from_line,
        profile.to_line,
        changes.len()
    ));
    for step in changes {
        output.push_str(&format!(
            "Line {}: {} → {}\n  {}\n\n",
            step.line,
            step.depth_before,
            step.depth_after,
            excerpt(lines, step.line).trim()
        ));
    }

    output
}

/// Summarize an extraction plan, one line per manifest entry
pub fn render_plan(plan: &ExtractionPlan) -> String {
    let mut output = String::new();
    for module in &plan.modules {
        output.push_str(&format!("{}\n", module.file));
        for function in &module.functions {
            output.push_str(&format!("  ✓ {}: lines {}\n", function.name, function.range));
        }
        for miss in plan.misses.iter().filter(|m| m.module == module.file) {
            output.push_str(&format!("  ✗ {}: {}\n", miss.function, miss.error));
        }
    }
    output.push_str(&format!(
        "\nLocated {} function(s), {} missing\n",
        plan.located_count(),
        plan.misses.len()
    ));
    output
}

/// Source line trimmed on the right and cut to the excerpt width
fn excerpt<S: AsRef<str>>(lines: &[S], line: usize) -> String {
    line.checked_sub(1)
        .and_then(|idx| lines.get(idx))
        .map(|l| l.as_ref().trim_end().chars().take(EXCERPT_WIDTH).collect())
        .unwrap_or_default()
}

/// Truncate or pad string to fixed width
fn truncate_or_pad(s: &str, width: usize) -> String {
    if s.chars().count() > width {
        let kept: String = s.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", kept)
    } else {
        format!("{:<width$}", s, width = width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{plan_extraction, ModuleSpec};
    use crate::locate::{locate_block, BlockOptions};
    use crate::trace::trace_block;

    const LINES: [&str; 4] = [
        "function generateAssetName(type) {",
        r#"  const s = "a}b"; // } comment brace"#,
        "  return `tmpl${1}`;",
        "}",
    ];

    #[test]
    fn test_report_from_success() {
        let report = LocateReport::new("generateAssetName", &Ok(BlockRange::new(1, 4)));
        assert!(report.is_ok());
        assert!(report.failure.is_none());
    }

    #[test]
    fn test_report_from_failure() {
        let options = BlockOptions {
            max_lines: 3,
            ..Default::default()
        };
        let outcome = locate_block(&LINES[..3], 1, &options);
        let report = LocateReport::new("line 1", &outcome);
        let failure = report.failure.unwrap();
        assert_eq!(failure.reason, FailureReason::UnterminatedBlock);
        assert_eq!(failure.depth, Some(1));
        assert_eq!(failure.mode, Some(ScanMode::Code));
        assert_eq!(failure.last_line, Some(3));
        assert!(!failure.malformed_lexical_state);
    }

    #[test]
    fn test_render_text_table() {
        let reports = vec![
            LocateReport::new("generateAssetName", &Ok(BlockRange::new(1, 4))),
            LocateReport::new(
                "missing",
                &Err(LocateError::DeclarationNotFound {
                    name: "missing".to_string(),
                    first_line: 1,
                    last_line: 4,
                }),
            ),
        ];
        let text = render_text(&reports);
        let rows: Vec<&str> = text.lines().collect();
        assert_eq!(rows.len(), 3);
        assert!(rows[0].starts_with("TARGET"));
        assert!(rows[1].starts_with("generateAssetName"));
        assert!(rows[1].ends_with("ok"));
        assert!(rows[2].contains("declaration_not_found"));
    }

    #[test]
    fn test_render_json_is_deterministic() {
        let reports = vec![LocateReport::new("f", &Ok(BlockRange::new(2, 9)))];
        let first = render_json(&reports);
        assert_eq!(first, render_json(&reports));
        let value: serde_json::Value = serde_json::from_str(&first).unwrap();
        assert_eq!(value[0]["range"]["start_line"], 2);
        assert_eq!(value[0]["range"]["end_line"], 9);
        assert!(value[0].get("failure").is_none());
    }

    #[test]
    fn test_render_trace_marks_closing_line() {
        let trace = trace_block(&LINES, 1, &BlockOptions::default());
        let verification = trace.verify(4);
        let text = render_trace(&trace, &LINES, Some(&verification));
        assert!(text.contains("Line     1: [0→1] +1/-0  mode=code"));
        assert!(text.contains("Line     4: [1→0] +0/-1  mode=code  <- block closes"));
        // Lines without live braces are not listed
        assert!(!text.contains("Line     2:"));
        assert!(text.contains("Block closes at line 4 (lines 1-4)"));
        assert!(text.contains("Match: true"));
    }

    #[test]
    fn test_render_plan_lists_misses() {
        let modules = vec![ModuleSpec {
            file: "cc-llm.js".to_string(),
            description: None,
            functions: vec!["generateAssetName".to_string(), "nope".to_string()],
        }];
        let plan = plan_extraction(&LINES, &modules, &BlockOptions::default());
        let text = render_plan(&plan);
        assert!(text.contains("  ✓ generateAssetName: lines 1-4"));
        assert!(text.contains("  ✗ nope: no declaration of `nope`"));
        assert!(text.ends_with("Located 1 function(s), 1 missing\n"));
    }

    #[test]
    fn test_truncate_or_pad() {
        assert_eq!(truncate_or_pad("abc", 5), "abc  ");
        assert_eq!(truncate_or_pad("abcdefgh", 6), "abc...");
    }
}
