/// Marker appended to any text shortened by [`truncate`] so downstream
/// consumers (and the model reading the prompt) can tell data was cut.
pub const TRUNCATION_SUFFIX: &str = "\n... (truncated for analysis)";

/// Fraction of `max_chars` that must survive for a cut at a line boundary
/// to be preferred over a hard mid-line cut.
const LINE_BOUNDARY_KEEP_RATIO: f64 = 0.8;

/// Bounds `text` to at most `max_chars` characters before it is embedded in
/// a prompt.
///
/// Texts within the limit are returned unchanged. Longer texts are cut at
/// `max_chars`; if the last line break in the kept prefix falls at or after
/// 80% of the limit, the cut moves back to that break so lines are not split
/// mid-sentence. Truncated results always end with [`TRUNCATION_SUFFIX`].
///
/// Lengths are measured in characters, not bytes, so multibyte input never
/// splits a code point.
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let mut truncated: String = text.chars().take(max_chars).collect();

    if let Some(pos) = truncated.rfind('\n') {
        let kept_chars = truncated[..pos].chars().count();
        if kept_chars as f64 >= max_chars as f64 * LINE_BOUNDARY_KEEP_RATIO {
            truncated.truncate(pos);
        }
    }

    truncated.push_str(TRUNCATION_SUFFIX);
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_unchanged() {
        let text = "Date,Region,Revenue\n2024-01-01,North,1200.50";
        assert_eq!(truncate(text, 100), text);
    }

    #[test]
    fn test_exact_length_unchanged() {
        let text = "a".repeat(50);
        assert_eq!(truncate(&text, 50), text);
    }

    #[test]
    fn test_long_text_bounded_and_marked() {
        let text = "x".repeat(500);
        let result = truncate(&text, 100);
        assert!(result.ends_with(TRUNCATION_SUFFIX));
        assert!(result.chars().count() <= 100 + TRUNCATION_SUFFIX.chars().count());
    }

    #[test]
    fn test_cuts_at_late_line_boundary() {
        // One line break between 80% and 100% of the limit: the cut should
        // land there instead of mid-line.
        let mut text = "a".repeat(90);
        text.push('\n');
        text.push_str(&"b".repeat(100));
        let result = truncate(&text, 100);
        assert_eq!(result, format!("{}{}", "a".repeat(90), TRUNCATION_SUFFIX));
    }

    #[test]
    fn test_ignores_early_line_boundary() {
        // A break before 80% of the limit costs too much content to use.
        let mut text = "a".repeat(40);
        text.push('\n');
        text.push_str(&"b".repeat(200));
        let result = truncate(&text, 100);
        let expected_body: String = text.chars().take(100).collect();
        assert_eq!(result, format!("{}{}", expected_body, TRUNCATION_SUFFIX));
    }

    #[test]
    fn test_raw_export_scenario() {
        // 3000 chars of data with a line break at char 1400: 1400 >= 1200
        // (80% of 1500), so the cut moves back to the break.
        let mut text = "r".repeat(1400);
        text.push('\n');
        text.push_str(&"s".repeat(1599));
        assert_eq!(text.chars().count(), 3000);

        let result = truncate(&text, 1500);
        assert_eq!(result, format!("{}{}", "r".repeat(1400), TRUNCATION_SUFFIX));
    }

    #[test]
    fn test_multibyte_safe() {
        let text = "é".repeat(300);
        let result = truncate(&text, 100);
        assert!(result.starts_with(&"é".repeat(100)));
        assert!(result.ends_with(TRUNCATION_SUFFIX));
    }
}
