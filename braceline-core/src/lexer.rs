//! Line-oriented lexical scanner for JavaScript source
//!
//! Global invariants enforced:
//! - Classification is a pure function of (line, incoming mode, options)
//! - Brace depth only moves on live characters
//! - Line comments end with their line; strings, templates and block
//!   comments carry over to the next line
//!
//! Known simplifications:
//! - A backtick toggles template mode; `${...}` interpolation is not tracked,
//!   so code inside an interpolation is treated as template text.
//! - With [`EscapeRule::SingleLookback`] only the single preceding character
//!   is inspected, so `\\"` reports the quote as escaped.

use serde::{Deserialize, Serialize};

/// Scanner mode carried across characters and lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScanMode {
    #[default]
    Code,
    #[serde(rename = "single-quote")]
    InSingleQuote,
    #[serde(rename = "double-quote")]
    InDoubleQuote,
    #[serde(rename = "template")]
    InTemplate,
    #[serde(rename = "line-comment")]
    InLineComment,
    #[serde(rename = "block-comment")]
    InBlockComment,
}

impl ScanMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanMode::Code => "code",
            ScanMode::InSingleQuote => "single-quote",
            ScanMode::InDoubleQuote => "double-quote",
            ScanMode::InTemplate => "template",
            ScanMode::InLineComment => "line-comment",
            ScanMode::InBlockComment => "block-comment",
        }
    }

    /// True when characters in this mode count toward brace depth
    pub fn is_code(&self) -> bool {
        matches!(self, ScanMode::Code)
    }

    /// True inside any string or template literal
    pub fn is_string(&self) -> bool {
        matches!(
            self,
            ScanMode::InSingleQuote | ScanMode::InDoubleQuote | ScanMode::InTemplate
        )
    }

    /// True inside a line or block comment
    pub fn is_comment(&self) -> bool {
        matches!(self, ScanMode::InLineComment | ScanMode::InBlockComment)
    }

    /// Delimiter that closes a string mode
    fn closing_delimiter(&self) -> Option<char> {
        match self {
            ScanMode::InSingleQuote => Some('\''),
            ScanMode::InDoubleQuote => Some('"'),
            ScanMode::InTemplate => Some('`'),
            _ => None,
        }
    }

    /// Mode carried into the next line
    fn at_line_end(self) -> ScanMode {
        match self {
            ScanMode::InLineComment => ScanMode::Code,
            other => other,
        }
    }
}

impl std::fmt::Display for ScanMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a backslash before a string delimiter is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EscapeRule {
    /// A delimiter is escaped when the character right before it is `\`
    #[default]
    SingleLookback,
    /// A delimiter is escaped when preceded by an odd run of `\`
    CountBackslashes,
}

impl EscapeRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            EscapeRule::SingleLookback => "single-lookback",
            EscapeRule::CountBackslashes => "count-backslashes",
        }
    }

    fn is_escaped(&self, chars: &[char], index: usize) -> bool {
        let preceding = &chars[..index.min(chars.len())];
        match self {
            EscapeRule::SingleLookback => preceding.last() == Some(&'\\'),
            EscapeRule::CountBackslashes => {
                preceding.iter().rev().take_while(|c| **c == '\\').count() % 2 == 1
            }
        }
    }
}

/// Options shared by every scanning entry point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScanOptions {
    #[serde(default)]
    pub escapes: EscapeRule,
}

/// Classification of a single character
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScannedChar {
    pub ch: char,
    /// Whether the character counts as code
    pub live: bool,
    /// Mode after this character was consumed
    pub mode: ScanMode,
}

/// Result of scanning one line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineScan {
    pub chars: Vec<ScannedChar>,
    /// Mode to carry into the next line
    pub mode_after: ScanMode,
}

impl LineScan {
    /// Iterate over characters that count as code
    pub fn live_chars(&self) -> impl Iterator<Item = &ScannedChar> {
        self.chars.iter().filter(|c| c.live)
    }

    /// Live brace activity of this line when entered at `depth`
    pub fn activity(&self, depth: i64) -> BraceActivity {
        let mut running = depth;
        let mut activity = BraceActivity {
            peak: depth,
            ..Default::default()
        };
        for c in self.live_chars() {
            match c.ch {
                '{' => {
                    running += 1;
                    activity.opens += 1;
                    activity.peak = activity.peak.max(running);
                }
                '}' => {
                    running -= 1;
                    activity.closes += 1;
                }
                _ => {}
            }
        }
        activity
    }
}

/// Scan a line with default options
pub fn scan_line(line: &str, mode: ScanMode) -> LineScan {
    scan_line_with(line, mode, &ScanOptions::default())
}

/// Scan a line, starting in `mode`
///
/// Delimiters are recognised in this order while in code: `/*`, `//`,
/// backtick, then `'`/`"`. Delimiter characters themselves are inert.
pub fn scan_line_with(line: &str, mode: ScanMode, options: &ScanOptions) -> LineScan {
    let chars: Vec<char> = line.chars().collect();
    let mut scanned = Vec::with_capacity(chars.len());
    // A line comment can never be carried in
    let mut mode = mode.at_line_end();
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        let next = chars.get(i + 1).copied();

        match mode {
            ScanMode::Code => {
                if ch == '/' && next == Some('*') {
                    mode = ScanMode::InBlockComment;
                    push_pair(&mut scanned, ch, '*', mode);
                    i += 2;
                    continue;
                }
                if ch == '/' && next == Some('/') {
                    mode = ScanMode::InLineComment;
                    scanned.extend(chars[i..].iter().map(|rest| inert(*rest, mode)));
                    break;
                }

                let opened = match ch {
                    '`' => Some(ScanMode::InTemplate),
                    '\'' => Some(ScanMode::InSingleQuote),
                    '"' => Some(ScanMode::InDoubleQuote),
                    _ => None,
                };
                match opened {
                    Some(string_mode) if !options.escapes.is_escaped(&chars, i) => {
                        mode = string_mode;
                        scanned.push(inert(ch, mode));
                    }
                    _ => scanned.push(ScannedChar {
                        ch,
                        live: true,
                        mode,
                    }),
                }
            }
            ScanMode::InBlockComment => {
                if ch == '*' && next == Some('/') {
                    mode = ScanMode::Code;
                    push_pair(&mut scanned, ch, '/', mode);
                    i += 2;
                    continue;
                }
                scanned.push(inert(ch, mode));
            }
            ScanMode::InLineComment => scanned.push(inert(ch, mode)),
            ScanMode::InSingleQuote | ScanMode::InDoubleQuote | ScanMode::InTemplate => {
                if mode.closing_delimiter() == Some(ch) && !options.escapes.is_escaped(&chars, i) {
                    mode = ScanMode::Code;
                }
                scanned.push(inert(ch, mode));
            }
        }

        i += 1;
    }

    LineScan {
        chars: scanned,
        mode_after: mode.at_line_end(),
    }
}

fn inert(ch: char, mode: ScanMode) -> ScannedChar {
    ScannedChar {
        ch,
        live: false,
        mode,
    }
}

fn push_pair(scanned: &mut Vec<ScannedChar>, first: char, second: char, mode: ScanMode) {
    scanned.push(inert(first, mode));
    scanned.push(inert(second, mode));
}

/// Brace activity observed while advancing over one line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BraceActivity {
    pub opens: usize,
    pub closes: usize,
    /// Highest depth reached at any point within the line
    pub peak: i64,
}

/// Running scanner state for a multi-line scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScanState {
    pub mode: ScanMode,
    pub depth: i64,
}

impl ScanState {
    /// Fresh state in code mode at the given depth
    pub fn new(depth: i64) -> Self {
        ScanState {
            mode: ScanMode::Code,
            depth,
        }
    }

    /// Consume one line, updating mode and depth
    pub fn advance(&mut self, line: &str, options: &ScanOptions) -> BraceActivity {
        let scan = scan_line_with(line, self.mode, options);
        let activity = scan.activity(self.depth);
        self.depth += activity.opens as i64 - activity.closes as i64;
        self.mode = scan.mode_after;
        activity
    }
}

#[cfg(test)]
#[path = "lexer/tests.rs"]
mod tests;
