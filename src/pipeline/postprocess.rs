//! Post-processing: deterministic cleanup of generated text.
//!
//! Even well-prompted models wrap answers in code fences, emit `\r\n` line
//! endings or sprinkle zero-width characters through the text. The rules
//! here fix those quirks without touching content, and each one is
//! independently testable.
//!
//! ## Rule Order
//!
//! Fences are stripped before line endings are normalised so the fence regex
//! only has to match `\n`. Invisible characters go last so trimming sees the
//! real text boundaries.

use crate::error::GenerationError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

/// Apply all cleanup rules to a stage's raw output.
///
/// Rules (applied in order):
/// 1. Strip outer code fences (```` ```text ````, ```` ```json ````, bare)
/// 2. Normalise line endings (CRLF → LF)
/// 3. Trim trailing whitespace per line
/// 4. Collapse 3+ consecutive blank lines down to 1
/// 5. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 6. Trim leading and trailing blank space
pub fn clean_text(input: &str) -> String {
    let s = strip_fences(input);
    let s = normalise_line_endings(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    let s = remove_invisible_chars(&s);
    s.trim().to_string()
}

// ── Rule 1: Strip outer fences ───────────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z0-9_-]*\r?\n(.*?)\r?\n```\s*$").unwrap());

fn strip_fences(input: &str) -> String {
    if let Some(caps) = RE_OUTER_FENCES.captures(input.trim()) {
        caps[1].to_string()
    } else {
        input.to_string()
    }
}

// ── Rule 2: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 3: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 4: Collapse excessive blank lines ───────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").to_string()
}

// ── Rule 5: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Structured quote lists ──────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(untagged)]
enum QuoteList {
    Object { quotes: Vec<String> },
    Bare(Vec<String>),
}

/// Parse the quote extractor's response into an ordered list of quotes.
///
/// Accepts `{"quotes": [...]}` (the requested schema) or a bare JSON array
/// of strings, optionally inside a code fence. Anything else is
/// [`GenerationError::MalformedOutput`].
pub fn parse_quotes(raw: &str) -> Result<Vec<String>, GenerationError> {
    let cleaned = clean_text(raw);
    match serde_json::from_str::<QuoteList>(&cleaned) {
        Ok(QuoteList::Object { quotes }) | Ok(QuoteList::Bare(quotes)) => Ok(quotes
            .iter()
            .map(|q| remove_invisible_chars(q.trim()))
            .collect()),
        Err(e) => {
            let preview: String = cleaned.chars().take(80).collect();
            Err(GenerationError::MalformedOutput(format!(
                "expected a JSON list of quotes ({e}); got: {preview}"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_fences_with_language_tag() {
        assert_eq!(clean_text("```text\nHello\n```"), "Hello");
        assert_eq!(clean_text("```\nHello\n```\n"), "Hello");
    }

    #[test]
    fn inner_fences_survive() {
        let s = "Intro\n```\ncode\n```\nOutro";
        assert_eq!(clean_text(s), s);
    }

    #[test]
    fn normalises_crlf_and_blank_runs() {
        let s = "Para one.\r\n\r\n\r\n\r\nPara two.  \r\n";
        assert_eq!(clean_text(s), "Para one.\n\nPara two.");
    }

    #[test]
    fn removes_invisible_characters() {
        assert_eq!(clean_text("\u{FEFF}Dr.\u{200B} Smith"), "Dr. Smith");
    }

    #[test]
    fn parses_schema_object() {
        let q = parse_quotes(r#"{"quotes": ["one", " two "]}"#).unwrap();
        assert_eq!(q, vec!["one", "two"]);
    }

    #[test]
    fn parses_fenced_bare_array() {
        let q = parse_quotes("```json\n[\"a\", \"b\"]\n```").unwrap();
        assert_eq!(q, vec!["a", "b"]);
    }

    #[test]
    fn free_text_is_malformed() {
        let err = parse_quotes("Here are some quotes: one, two").unwrap_err();
        assert!(matches!(err, GenerationError::MalformedOutput(_)));
    }

    #[test]
    fn wrong_shape_is_malformed() {
        assert!(parse_quotes(r#"{"items": ["a"]}"#).is_err());
        assert!(parse_quotes("[1, 2]").is_err());
    }
}
