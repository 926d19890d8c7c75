/// Label given to lines that carry no speaker marker of their own.
pub const DEFAULT_SPEAKER: &str = "Person";

/// Reshape raw OCR text into a speaker-labeled transcript.
///
/// Lines containing `:` or `-` are assumed to already name their speaker
/// and are kept as is; every other line gets `Person: ` in front. Line order
/// is preserved. This is a heuristic, not a parser, and it is not
/// idempotent: running it twice prefixes unlabeled lines twice.
pub fn format_dialog(text: &str) -> String {
    text.split('\n')
        .map(|line| {
            if line.contains(':') || line.contains('-') {
                line.to_string()
            } else {
                format!("{}: {}", DEFAULT_SPEAKER, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlabeled_line_gets_placeholder_speaker() {
        assert_eq!(format_dialog("Hello there"), "Person: Hello there");
    }

    #[test]
    fn colon_line_is_left_alone() {
        assert_eq!(format_dialog("Alice: hi"), "Alice: hi");
    }

    #[test]
    fn hyphen_line_is_left_alone() {
        assert_eq!(format_dialog("Bob - see you"), "Bob - see you");
        assert_eq!(format_dialog("well-known"), "well-known");
    }

    #[test]
    fn mixed_lines_keep_order() {
        let raw = "Alice: hi\nhow are you\nBob - fine\nthanks";
        assert_eq!(
            format_dialog(raw),
            "Alice: hi\nPerson: how are you\nBob - fine\nPerson: thanks"
        );
    }

    #[test]
    fn one_block_per_screenshot() {
        let raw = "Привет как дела\nМаша: нормально";
        assert_eq!(
            format_dialog(raw),
            "Person: Привет как дела\nМаша: нормально"
        );
    }

    #[test]
    fn empty_lines_are_labeled_too() {
        assert_eq!(format_dialog(""), "Person: ");
        assert_eq!(format_dialog("a\n\nb"), "Person: a\nPerson: \nPerson: b");
    }

    #[test]
    fn carriage_returns_are_not_line_breaks() {
        assert_eq!(format_dialog("hi\r\nyo"), "Person: hi\r\nPerson: yo");
    }

    // Documents current behavior: a second pass is a no-op only because the
    // first pass adds a colon to every line it touches.
    #[test]
    fn second_pass_output_matches_first_pass() {
        let once = format_dialog("hello\nAlice: hi");
        let twice = format_dialog(&once);
        assert_eq!(once, "Person: hello\nAlice: hi");
        assert_eq!(twice, once);
    }

    // Documents current behavior: a line already prefixed with a label but
    // holding no ':' or '-' is labeled again.
    #[test]
    fn label_without_marker_is_prefixed_again() {
        assert_eq!(format_dialog("Person hello"), "Person: Person hello");
    }
}
