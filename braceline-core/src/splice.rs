//! Removing located ranges from a source
//!
//! Global invariants enforced:
//! - Overlapping and adjacent ranges are merged before anything is removed
//! - Lines outside every range are kept verbatim and in order
//! - A range that does not fit the source is rejected, never clipped

use crate::error::LocateError;
use crate::span::BlockRange;

/// Sort ranges and merge the ones that overlap or sit back to back
pub fn merge_ranges(ranges: &[BlockRange]) -> Vec<BlockRange> {
    let mut sorted: Vec<BlockRange> = ranges.iter().copied().filter(|r| !r.is_empty()).collect();
    sorted.sort();

    let mut merged: Vec<BlockRange> = Vec::with_capacity(sorted.len());
    for range in sorted {
        match merged.last_mut() {
            Some(last) if last.touches(&range) => {
                last.end_line = last.end_line.max(range.end_line);
            }
            _ => merged.push(range),
        }
    }
    merged
}

/// Return `lines` with every range removed
pub fn strip_ranges<'a, S: AsRef<str>>(
    lines: &'a [S],
    ranges: &[BlockRange],
) -> Result<Vec<&'a str>, LocateError> {
    let merged = checked_merge(lines.len(), ranges)?;
    Ok(kept_lines(lines, &merged)
        .into_iter()
        .map(|(_, line)| line)
        .collect())
}

/// Remove every range, then insert `inserted` before line `before_line`
///
/// `before_line` is numbered against `lines`; `lines.len() + 1` appends.
/// The insertion point must survive the removal.
pub fn strip_and_insert<'a, S: AsRef<str>, T: AsRef<str>>(
    lines: &'a [S],
    ranges: &[BlockRange],
    before_line: usize,
    inserted: &'a [T],
) -> Result<Vec<&'a str>, LocateError> {
    let total = lines.len();
    if before_line == 0 || before_line > total + 1 {
        return Err(LocateError::LineOutOfRange {
            line: before_line,
            total,
        });
    }

    let merged = checked_merge(total, ranges)?;
    if let Some(range) = merged.iter().find(|r| r.contains_line(before_line)) {
        return Err(LocateError::InsertionInsideRemovedRange {
            line: before_line,
            range: *range,
        });
    }

    let mut output = Vec::with_capacity(total + inserted.len());
    for (line_no, line) in kept_lines(lines, &merged) {
        if line_no == before_line {
            output.extend(inserted.iter().map(|l| l.as_ref()));
        }
        output.push(line);
    }
    if before_line == total + 1 {
        output.extend(inserted.iter().map(|l| l.as_ref()));
    }
    Ok(output)
}

/// Merge ranges, rejecting any that does not fit `total` lines
fn checked_merge(total: usize, ranges: &[BlockRange]) -> Result<Vec<BlockRange>, LocateError> {
    let merged = merge_ranges(ranges);
    if let Some(bad) = merged.iter().find(|r| r.start_line == 0 || r.end_line > total) {
        let line = if bad.start_line == 0 { 0 } else { bad.end_line };
        return Err(LocateError::LineOutOfRange { line, total });
    }
    Ok(merged)
}

/// Lines outside every merged range, with their 1-indexed numbers
fn kept_lines<'a, S: AsRef<str>>(lines: &'a [S], merged: &[BlockRange]) -> Vec<(usize, &'a str)> {
    lines
        .iter()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.as_ref()))
        .filter(|(line_no, _)| !merged.iter().any(|r| r.contains_line(*line_no)))
        .collect()
}
