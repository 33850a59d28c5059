//! Title to filename sanitization.

const MAX_TITLE_CHARS: usize = 200;
const FALLBACK_TITLE: &str = "video";

/// Sanitizes a video title for use as a file stem on Windows and Unix.
///
/// - Drops `<>:"/\|?*`, parentheses, and control characters
/// - Collapses whitespace runs to a single space and trims
/// - Keeps at most 200 characters, then strips trailing dots
/// - Falls back to `video` when nothing is left
pub fn sanitize_title(title: &str) -> String {
    let filtered: String = title
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' | '(' | ')'))
        .filter(|c| (*c as u32) >= 0x20)
        .collect();

    let collapsed = filtered.split_whitespace().collect::<Vec<_>>().join(" ");
    let truncated: String = collapsed.chars().take(MAX_TITLE_CHARS).collect();
    let stripped = truncated.trim_end_matches('.');

    if stripped.is_empty() {
        FALLBACK_TITLE.to_string()
    } else {
        stripped.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_reserved_characters() {
        assert_eq!(
            sanitize_title("What? A/B \"test\" (live) <4K>: part|2*"),
            "What AB test live 4K part2"
        );
    }

    #[test]
    fn collapses_whitespace_and_drops_controls() {
        assert_eq!(sanitize_title("  a \t\n b   c  "), "a b c");
        assert_eq!(sanitize_title("x\u{0}y"), "xy");
    }

    #[test]
    fn caps_length_and_trailing_dots() {
        let long = "a".repeat(250);
        assert_eq!(sanitize_title(&long).chars().count(), 200);
        assert_eq!(sanitize_title("Ends with dots..."), "Ends with dots");
    }

    #[test]
    fn empty_falls_back() {
        assert_eq!(sanitize_title(""), "video");
        assert_eq!(sanitize_title("???"), "video");
        assert_eq!(sanitize_title("..."), "video");
    }

    #[test]
    fn keeps_unicode() {
        assert_eq!(sanitize_title("Canção ñ 日本"), "Canção ñ 日本");
    }
}
