//! Quote punctuation cleanup applied before typesetting.

use once_cell::sync::Lazy;
use regex::Regex;

// A delimiter pair counts only when the opening mark follows start-of-text,
// whitespace or an opening bracket, and the closing mark precedes
// whitespace, closing punctuation or end-of-text.
static RE_STRAIGHT_PAIR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(^|[\s(\[{])"([^"\n]+)"([\s)\]}.,;:!?]|$)"#).unwrap()
});

static RE_CURLY_PAIR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(^|[\s(\[{])\x{201C}([^\x{201C}\x{201D}]+)\x{201D}([\s)\]}.,;:!?]|$)"#).unwrap()
});

/// Turn double-quote delimiters around quoted spans into single quotes.
///
/// Both straight (`"…"`) and curly (`“…”`) pairs are converted. Apostrophes
/// inside words (`don't`, `Smith's`) are never touched.
pub fn normalize_quotes(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let text = replace_until_stable(&RE_CURLY_PAIR, text);
    replace_until_stable(&RE_STRAIGHT_PAIR, &text)
}

// The trailing boundary is consumed by a match, so two adjacent spans
// ("a" "b") need a second pass.
fn replace_until_stable(re: &Regex, text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let next = re.replace_all(&current, "$1'$2'$3").into_owned();
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Wrap the whole trimmed text in one pair of straight double quotes.
///
/// An existing straight or curly wrapper is replaced rather than doubled,
/// so the function is idempotent. Empty input is returned unchanged.
pub fn ensure_wrapped(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let trimmed = text.trim();
    let inner = strip_wrapper(trimmed).unwrap_or(trimmed);
    format!("\"{inner}\"")
}

fn strip_wrapper(s: &str) -> Option<&str> {
    let mut chars = s.chars();
    let first = chars.next()?;
    let last = chars.next_back()?;
    if matches!(first, '"' | '\u{201C}') && matches!(last, '"' | '\u{201D}') {
        Some(&s[first.len_utf8()..s.len() - last.len_utf8()])
    } else {
        None
    }
}

/// Byline as drawn: leading hyphens, dashes and spaces collapse into a
/// single em-dash. A blank byline yields an empty string.
pub fn format_byline(byline: &str) -> String {
    let name = byline
        .trim_start_matches(['-', '\u{2013}', '\u{2014}', ' '])
        .trim();
    if name.is_empty() {
        String::new()
    } else {
        format!("\u{2014}{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inner_double_quotes_become_single() {
        assert_eq!(
            normalize_quotes(r#"She said "hello world" to me"#),
            "She said 'hello world' to me"
        );
    }

    #[test]
    fn apostrophes_are_untouched() {
        assert_eq!(normalize_quotes("don't stop"), "don't stop");
        assert_eq!(normalize_quotes("Smith's plan"), "Smith's plan");
    }

    #[test]
    fn curly_pairs_are_converted() {
        assert_eq!(
            normalize_quotes("He called it \u{201C}unprecedented\u{201D}."),
            "He called it 'unprecedented'."
        );
    }

    #[test]
    fn pairs_need_boundaries() {
        assert_eq!(normalize_quotes(r#"a"b"c"#), r#"a"b"c"#);
        assert_eq!(normalize_quotes(r#"("quoted")"#), "('quoted')");
    }

    #[test]
    fn adjacent_pairs_both_convert() {
        assert_eq!(normalize_quotes(r#""one" "two""#), "'one' 'two'");
    }

    #[test]
    fn spans_do_not_cross_lines() {
        let s = "\"open\nclose\"";
        assert_eq!(normalize_quotes(s), s);
    }

    #[test]
    fn empty_input_unchanged() {
        assert_eq!(normalize_quotes(""), "");
        assert_eq!(ensure_wrapped(""), "");
    }

    #[test]
    fn wraps_bare_text() {
        assert_eq!(ensure_wrapped("  It is late. "), "\"It is late.\"");
    }

    #[test]
    fn rewraps_curly_and_straight() {
        assert_eq!(ensure_wrapped("\u{201C}It is late.\u{201D}"), "\"It is late.\"");
        assert_eq!(ensure_wrapped("\"It is late.\""), "\"It is late.\"");
    }

    #[test]
    fn ensure_wrapped_is_idempotent() {
        let cases = [
            "plain",
            "\"straight\"",
            "\u{201C}curly\u{201D}",
            "\"",
            "\"\"",
            "\"\"\"",
            "\u{201C}",
            "\"mixed\u{201D}",
            " 'single' ",
            "\"inner \" quote\"",
            "x",
        ];
        for s in cases {
            let once = ensure_wrapped(s);
            assert_eq!(ensure_wrapped(&once), once, "input: {s:?}");
        }
    }

    #[test]
    fn byline_dashes_collapse_to_em_dash() {
        assert_eq!(format_byline("--Jane Doe"), "\u{2014}Jane Doe");
        assert_eq!(format_byline("\u{2014} \u{2013}- Jane Doe "), "\u{2014}Jane Doe");
        assert_eq!(format_byline("Jane Doe"), "\u{2014}Jane Doe");
        assert_eq!(format_byline(" -- "), "");
    }
}
