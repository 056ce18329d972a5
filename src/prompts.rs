//! System instructions for the three generation stages.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth** — changing a stage's behaviour (word counts,
//!    tone rules, output format) requires editing exactly one place.
//!
//! 2. **Testability** — unit tests can import and inspect prompts directly
//!    without spinning up a real model.
//!
//! Callers can override each instruction via the `*_prompt` fields of
//! [`crate::config::PostConfig`]; the constants here are used only when no
//! override is provided.

/// Instruction for the quote extractor.
///
/// The response shape is enforced separately through [`QUOTES_SCHEMA`].
pub const QUOTE_EXTRACTOR_PROMPT: &str = r#"You are a helpful assistant that generates article pull-out quotes.

Follow these rules precisely:

1. Each pull-out quote should be 30-70 words and capture the main themes of the article.
2. A quote can be 1-3 sentences long.
3. The pull-out quotes MUST be direct quotations from the article, copied character for character.
4. DO NOT summarize, paraphrase, reorder, or otherwise modify the quoted text in any way.
5. Return between 3 and 6 quotes, ordered as they appear in the article."#;

/// Instruction for the summarizer.
pub const SUMMARIZER_PROMPT: &str = r#"You are a helpful assistant for a student publication.
Your task is to summarize the article provided by the user.
A summary should be 2-3 paragraphs and should capture all the main themes of the article.
Note that some articles are op-eds and others are informative: say which kind this is and keep the summary faithful to its tone.
Output only the summary text."#;

/// Instruction for the caption synthesizer.
pub const CAPTION_SYNTHESIZER_PROMPT: &str = r#"You are a helpful assistant for a student publication.
Your task is to generate a caption for an Instagram post advertising one of the publication's articles.

Requirements:
- The caption should be 80-250 words, split into multiple lines and paragraphs.
- You receive a summary of the article followed by a few direct quotes from it. Use both.
- Reference the author of the article.
- If the piece is an opinion piece, make clear that the caption describes the author's views, not the publication's.
- Do not use hashtags or emojis.
- Output only the caption, no additional commentary.

Example:
On Saturday, February 22, a campus committee hosted a controversial keynote speaker at its winter showcase. The speaker has drawn criticism for past statements about the LGBTQ community.

The committee marketed the event as "a cross between an indoor carnival, a dinner party, and a showcase" for students to "mingle and celebrate."

The speech did not directly address LGBTQ issues. However, several students told us they took issue with the committee's decision to invite the speaker.

Full article at the link in bio."#;

/// JSON schema the quote extractor's response must satisfy.
pub const QUOTES_SCHEMA: &str = r#"{
  "type": "object",
  "properties": {
    "quotes": {
      "type": "array",
      "items": { "type": "string" }
    }
  },
  "required": ["quotes"],
  "additionalProperties": false
}"#;

/// Output contract appended to a system instruction when a schema is requested.
pub fn schema_contract(schema: &str) -> String {
    format!(
        "\n\nRespond with a single JSON document that validates against this JSON schema \
and nothing else (no prose, no code fences):\n{schema}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_prompt_demands_verbatim_quotes() {
        assert!(QUOTE_EXTRACTOR_PROMPT.contains("30-70 words"));
        assert!(QUOTE_EXTRACTOR_PROMPT.contains("1-3 sentences"));
        assert!(QUOTE_EXTRACTOR_PROMPT.contains("DO NOT summarize"));
    }

    #[test]
    fn caption_prompt_forbids_hashtags() {
        assert!(CAPTION_SYNTHESIZER_PROMPT.contains("80-250 words"));
        assert!(CAPTION_SYNTHESIZER_PROMPT.contains("hashtags"));
        assert!(CAPTION_SYNTHESIZER_PROMPT.contains("author"));
    }

    #[test]
    fn schema_is_valid_json() {
        let v: serde_json::Value = serde_json::from_str(QUOTES_SCHEMA).expect("valid schema");
        assert_eq!(v["required"][0], "quotes");
    }

    #[test]
    fn contract_embeds_schema() {
        let c = schema_contract(QUOTES_SCHEMA);
        assert!(c.contains("\"quotes\""));
        assert!(c.contains("JSON schema"));
    }
}
