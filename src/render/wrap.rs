//! Greedy word wrapping against a measured pixel width.

/// Split `text` into lines no wider than `max_width` under `measure`.
///
/// Words are separated by any whitespace in the input and by single spaces
/// in the output. A word wider than `max_width` on its own is placed alone
/// on its line, never split. Empty or blank input yields no lines.
pub fn wrap_lines<F>(text: &str, measure: F, max_width: f32) -> Vec<String>
where
    F: Fn(&str) -> f32,
{
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
            continue;
        }
        let candidate = format!("{current} {word}");
        if measure(&candidate) <= max_width {
            current = candidate;
        } else {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> f32 {
        s.chars().count() as f32
    }

    #[test]
    fn empty_input_has_no_lines() {
        assert!(wrap_lines("", chars, 10.0).is_empty());
        assert!(wrap_lines("  \n\t", chars, 10.0).is_empty());
    }

    #[test]
    fn greedy_fill() {
        let lines = wrap_lines("the quick brown fox jumps over", chars, 10.0);
        assert_eq!(lines, vec!["the quick", "brown fox", "jumps over"]);
    }

    #[test]
    fn whitespace_runs_collapse() {
        let lines = wrap_lines("a \n  b\tc", chars, 100.0);
        assert_eq!(lines, vec!["a b c"]);
    }

    #[test]
    fn oversized_word_stands_alone() {
        let lines = wrap_lines("hi extraordinarily ok", chars, 5.0);
        assert_eq!(lines, vec!["hi", "extraordinarily", "ok"]);
    }

    #[test]
    fn oversized_first_word() {
        let lines = wrap_lines("supercalifragilistic is long", chars, 8.0);
        assert_eq!(lines, vec!["supercalifragilistic", "is long"]);
    }

    #[test]
    fn every_line_fits_unless_single_word() {
        let text = "Experts warn of rising costs. 'This is unprecedented,' said Dr. Smith. \
                    The policy takes effect next year, a pneumonoultramicroscopic change.";
        for width in [1.0, 4.0, 9.0, 13.0, 20.0, 37.0, 80.0, 500.0] {
            let lines = wrap_lines(text, chars, width);
            assert!(!lines.is_empty());
            for line in &lines {
                assert!(!line.is_empty());
                assert!(
                    chars(line) <= width || !line.contains(' '),
                    "line {line:?} exceeds {width}"
                );
            }
            assert_eq!(
                lines.join(" "),
                text.split_whitespace().collect::<Vec<_>>().join(" ")
            );
        }
    }
}
