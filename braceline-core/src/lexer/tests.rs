//! Tests for the lexical scanner

#[cfg(test)]
mod lexer_tests {
    use crate::lexer::{
        scan_line, scan_line_with, EscapeRule, LineScan, ScanMode, ScanOptions, ScanState,
    };

    fn live_string(line: &str, mode: ScanMode) -> String {
        scan_line(line, mode).live_chars().map(|c| c.ch).collect()
    }

    fn braces(scan: &LineScan) -> (usize, usize) {
        let activity = scan.activity(0);
        (activity.opens, activity.closes)
    }

    fn counted() -> ScanOptions {
        ScanOptions {
            escapes: EscapeRule::CountBackslashes,
        }
    }

    #[test]
    fn test_plain_code_is_live() {
        let scan = scan_line("if (a) { b(); }", ScanMode::Code);
        assert!(scan.chars.iter().all(|c| c.live));
        assert_eq!(braces(&scan), (1, 1));
        assert_eq!(scan.mode_after, ScanMode::Code);
    }

    #[test]
    fn test_braces_in_double_quotes_are_inert() {
        let scan = scan_line(r#"const s = "a{b}c{";"#, ScanMode::Code);
        assert_eq!(braces(&scan), (0, 0));
        assert_eq!(scan.mode_after, ScanMode::Code);
    }

    #[test]
    fn test_braces_in_single_quotes_are_inert() {
        let scan = scan_line("const s = '}}';", ScanMode::Code);
        assert_eq!(braces(&scan), (0, 0));
    }

    #[test]
    fn test_braces_in_template_are_inert() {
        let scan = scan_line("return `tmpl${1}`;", ScanMode::Code);
        assert_eq!(braces(&scan), (0, 0));
        assert_eq!(scan.mode_after, ScanMode::Code);
    }

    #[test]
    fn test_delimiters_themselves_are_inert() {
        let scan = scan_line(r#""x""#, ScanMode::Code);
        assert!(scan.chars.iter().all(|c| !c.live));
    }

    #[test]
    fn test_line_comment_masks_rest_of_line() {
        assert_eq!(live_string("a { // } b", ScanMode::Code), "a { ");
        let scan = scan_line("a { // }", ScanMode::Code);
        assert_eq!(scan.chars.last().map(|c| c.mode), Some(ScanMode::InLineComment));
        // Line comments never carry over
        assert_eq!(scan.mode_after, ScanMode::Code);
    }

    #[test]
    fn test_url_in_string_is_not_a_comment() {
        let scan = scan_line(r#"fetch("http://example.com"); {"#, ScanMode::Code);
        assert_eq!(braces(&scan), (1, 0));
        assert_eq!(scan.mode_after, ScanMode::Code);
    }

    #[test]
    fn test_block_comment_on_one_line() {
        assert_eq!(live_string("a /* { */ b", ScanMode::Code), "a  b");
    }

    #[test]
    fn test_block_comment_spans_lines() {
        let first = scan_line("x /* open {", ScanMode::Code);
        assert_eq!(first.mode_after, ScanMode::InBlockComment);
        assert_eq!(braces(&first), (0, 0));

        let second = scan_line("still } */ }", first.mode_after);
        assert_eq!(braces(&second), (0, 1));
        assert_eq!(second.mode_after, ScanMode::Code);
    }

    #[test]
    fn test_comment_markers_inside_strings_are_ignored() {
        let scan = scan_line(r#"const a = "/* not a comment"; {"#, ScanMode::Code);
        assert_eq!(braces(&scan), (1, 0));
        assert_eq!(scan.mode_after, ScanMode::Code);
    }

    #[test]
    fn test_line_comment_marker_inside_block_comment() {
        let scan = scan_line("/* // */ {", ScanMode::Code);
        assert_eq!(braces(&scan), (1, 0));
    }

    #[test]
    fn test_template_spans_lines() {
        let first = scan_line("const t = `line {", ScanMode::Code);
        assert_eq!(first.mode_after, ScanMode::InTemplate);
        let middle = scan_line("} more { text", first.mode_after);
        assert_eq!(braces(&middle), (0, 0));
        assert_eq!(middle.mode_after, ScanMode::InTemplate);
        let last = scan_line("end`; {", middle.mode_after);
        assert_eq!(braces(&last), (1, 0));
        assert_eq!(last.mode_after, ScanMode::Code);
    }

    #[test]
    fn test_other_quotes_inside_string_are_content() {
        let scan = scan_line(r#"const s = "it's `fine` {"; }"#, ScanMode::Code);
        assert_eq!(braces(&scan), (0, 1));
        assert_eq!(scan.mode_after, ScanMode::Code);
    }

    #[test]
    fn test_quotes_inside_template_are_content() {
        let scan = scan_line(r#"`a "b" 'c'` {"#, ScanMode::Code);
        assert_eq!(braces(&scan), (1, 0));
    }

    #[test]
    fn test_escaped_quote_stays_in_string() {
        let scan = scan_line(r#"const s = "say \"{\""; }"#, ScanMode::Code);
        assert_eq!(braces(&scan), (0, 1));
        assert_eq!(scan.mode_after, ScanMode::Code);
    }

    #[test]
    fn test_single_lookback_misreads_escaped_backslash() {
        // "\\"{" : escaped backslash, closing quote, then a brace in code.
        // Single lookback sees `\` before the quote and stays in the string.
        let line = r#"x = "\\"{"#;
        let scan = scan_line(line, ScanMode::Code);
        assert_eq!(braces(&scan), (0, 0));
        assert_eq!(scan.mode_after, ScanMode::InDoubleQuote);
    }

    #[test]
    fn test_counted_backslashes_close_after_escaped_backslash() {
        let line = r#"x = "\\"{"#;
        let scan = scan_line_with(line, ScanMode::Code, &counted());
        assert_eq!(braces(&scan), (1, 0));
        assert_eq!(scan.mode_after, ScanMode::Code);
    }

    #[test]
    fn test_counted_backslashes_still_honour_single_escape() {
        let scan = scan_line_with(r#""a\"{" }"#, ScanMode::Code, &counted());
        assert_eq!(braces(&scan), (0, 1));
    }

    #[test]
    fn test_template_interpolation_is_not_tracked() {
        // The `{` inside the interpolated string literal is template text,
        // and so is the interpolation's own closing brace.
        let scan = scan_line(r#"`text ${a + "{"} more` {"#, ScanMode::Code);
        assert_eq!(braces(&scan), (1, 0));
        assert_eq!(scan.mode_after, ScanMode::Code);
    }

    #[test]
    fn test_unterminated_string_carries_mode() {
        let scan = scan_line("const s = 'abc {", ScanMode::Code);
        assert_eq!(scan.mode_after, ScanMode::InSingleQuote);
    }

    #[test]
    fn test_incoming_line_comment_mode_is_reset() {
        let scan = scan_line("{", ScanMode::InLineComment);
        assert_eq!(braces(&scan), (1, 0));
    }

    #[test]
    fn test_non_ascii_is_scanned_per_char() {
        let scan = scan_line("é{", ScanMode::Code);
        assert_eq!(scan.chars.len(), 2);
        assert_eq!(scan.chars[1].ch, '{');
        assert!(scan.chars[1].live);
    }

    #[test]
    fn test_activity_tracks_peak_from_entry_depth() {
        let scan = scan_line("} else { if (a) { b(); } }", ScanMode::Code);
        let activity = scan.activity(3);
        assert_eq!(activity.opens, 2);
        assert_eq!(activity.closes, 3);
        assert_eq!(activity.peak, 4);
    }

    #[test]
    fn test_empty_line_keeps_mode() {
        let scan = scan_line("", ScanMode::InTemplate);
        assert!(scan.chars.is_empty());
        assert_eq!(scan.mode_after, ScanMode::InTemplate);
    }

    #[test]
    fn test_state_tracks_depth_and_peak() {
        let options = ScanOptions::default();
        let mut state = ScanState::new(0);

        let activity = state.advance("function f() { if (x) { y(); }", &options);
        assert_eq!(state.depth, 1);
        assert_eq!(activity.opens, 2);
        assert_eq!(activity.closes, 1);
        assert_eq!(activity.peak, 2);

        let activity = state.advance("} // done {", &options);
        assert_eq!(state.depth, 0);
        assert_eq!(activity.peak, 1);
        assert_eq!(state.mode, ScanMode::Code);
    }

    #[test]
    fn test_state_matches_naive_count_without_noise() {
        let lines = [
            "function a() {",
            "  for (;;) { if (b) { c(); } }",
            "  d({ e: 1 });",
            "}",
        ];
        let options = ScanOptions::default();
        let mut state = ScanState::new(0);
        let mut naive = 0i64;
        for line in lines {
            state.advance(line, &options);
            naive += line.matches('{').count() as i64 - line.matches('}').count() as i64;
            assert_eq!(state.depth, naive);
        }
    }

    #[test]
    fn test_mode_names() {
        assert_eq!(ScanMode::InBlockComment.as_str(), "block-comment");
        assert_eq!(ScanMode::InTemplate.to_string(), "template");
        assert!(ScanMode::InTemplate.is_string());
        assert!(!ScanMode::InTemplate.is_comment());
        assert!(ScanMode::InLineComment.is_comment());
        assert!(ScanMode::Code.is_code());
    }

    #[test]
    fn test_escape_rule_serializes_kebab_case() {
        let json = serde_json::to_string(&EscapeRule::CountBackslashes).unwrap();
        assert_eq!(json, "\"count-backslashes\"");
        let options: ScanOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options.escapes, EscapeRule::SingleLookback);
    }
}
