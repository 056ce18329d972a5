//! Generation stages: one text-generation call each.
//!
//! A stage is data, not code: a role instruction, the state fields it reads
//! and the one field it writes. [`GenerationStage::request`] turns the
//! current state into a [`GenerationRequest`];
//! [`GenerationStage::interpret`] turns the response into a
//! [`StageOutput`]. Neither retries; that is the orchestrator's job.

use crate::config::{PostConfig, QuoteCheck};
use crate::error::GenerationError;
use crate::generate::{GenerationRequest, Generated};
use crate::pipeline::postprocess::{clean_text, parse_quotes};
use crate::pipeline::state::{PipelineState, StageOutput, StateField};
use crate::prompts::{
    CAPTION_SYNTHESIZER_PROMPT, QUOTES_SCHEMA, QUOTE_EXTRACTOR_PROMPT, SUMMARIZER_PROMPT,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, warn};

/// Identity of a generation stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StageKind {
    QuoteExtractor,
    Summarizer,
    CaptionSynthesizer,
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StageKind::QuoteExtractor => "quote extractor",
            StageKind::Summarizer => "summarizer",
            StageKind::CaptionSynthesizer => "caption synthesizer",
        })
    }
}

/// One unit of the pipeline.
#[derive(Debug, Clone)]
pub struct GenerationStage {
    pub kind: StageKind,
    /// Fixed role instruction sent as the system message.
    pub instruction: String,
    /// Fields read, in the order they are sent as user turns.
    pub inputs: Vec<StateField>,
    /// The single field this stage writes.
    pub output: StateField,
    /// JSON schema the response must satisfy, if any.
    pub response_schema: Option<String>,
}

impl GenerationStage {
    /// Extracts verbatim pull-quotes from the article.
    pub fn quote_extractor(instruction: impl Into<String>) -> Self {
        Self {
            kind: StageKind::QuoteExtractor,
            instruction: instruction.into(),
            inputs: vec![StateField::Article],
            output: StateField::Quotes,
            response_schema: Some(QUOTES_SCHEMA.to_string()),
        }
    }

    /// Summarizes the article in two or three paragraphs.
    pub fn summarizer(instruction: impl Into<String>) -> Self {
        Self {
            kind: StageKind::Summarizer,
            instruction: instruction.into(),
            inputs: vec![StateField::Article],
            output: StateField::Summary,
            response_schema: None,
        }
    }

    /// Writes the post caption from the summary and the quotes.
    pub fn caption_synthesizer(instruction: impl Into<String>) -> Self {
        Self {
            kind: StageKind::CaptionSynthesizer,
            instruction: instruction.into(),
            inputs: vec![StateField::Summary, StateField::Quotes],
            output: StateField::Caption,
            response_schema: None,
        }
    }

    /// The three stages of a post run, with any prompt overrides applied.
    ///
    /// Declaration order is also the order failures are reported in when
    /// several stages of one wave fail together.
    pub fn standard(config: &PostConfig) -> Vec<GenerationStage> {
        vec![
            Self::quote_extractor(
                config
                    .quote_prompt
                    .as_deref()
                    .unwrap_or(QUOTE_EXTRACTOR_PROMPT),
            ),
            Self::summarizer(config.summary_prompt.as_deref().unwrap_or(SUMMARIZER_PROMPT)),
            Self::caption_synthesizer(
                config
                    .caption_prompt
                    .as_deref()
                    .unwrap_or(CAPTION_SYNTHESIZER_PROMPT),
            ),
        ]
    }

    /// Whether every declared input is present in `state`.
    pub fn is_ready(&self, state: &PipelineState) -> bool {
        self.inputs.iter().all(|f| state.has(*f))
    }

    /// Build the generation request from the stage's inputs.
    ///
    /// Returns [`GenerationError::EmptyInput`] without building anything when
    /// an input is missing or whitespace-only.
    pub fn request(
        &self,
        state: &PipelineState,
        temperature: f32,
        max_tokens: usize,
    ) -> Result<GenerationRequest, GenerationError> {
        let mut user = Vec::with_capacity(self.inputs.len());
        for field in &self.inputs {
            match state.text_of(*field) {
                Some(text) if !text.trim().is_empty() => user.push(text),
                _ => {
                    debug!("Stage {}: input '{}' is empty", self.kind, field);
                    return Err(GenerationError::EmptyInput);
                }
            }
        }

        Ok(GenerationRequest {
            stage: self.kind,
            system: self.instruction.clone(),
            user,
            response_schema: self.response_schema.clone(),
            temperature,
            max_tokens,
        })
    }

    /// Turn a raw response into the value written to [`Self::output`].
    pub fn interpret(
        &self,
        generated: &Generated,
        article: &str,
        policy: QuoteCheck,
    ) -> Result<StageOutput, GenerationError> {
        match self.output {
            StateField::Quotes => {
                let quotes = parse_quotes(&generated.text)?;
                let kept = verify_quotes(quotes, article, policy)?;
                if kept.is_empty() {
                    return Err(GenerationError::MalformedOutput(
                        "response contained no quotes".into(),
                    ));
                }
                Ok(StageOutput::Quotes(kept))
            }
            _ => {
                let text = clean_text(&generated.text);
                if text.is_empty() {
                    return Err(GenerationError::MalformedOutput(
                        "response was empty".into(),
                    ));
                }
                Ok(StageOutput::Text(text))
            }
        }
    }
}

// ── Verbatim quote check ─────────────────────────────────────────────────

/// Drop empty and duplicate quotes, then apply the verbatim policy.
///
/// Under [`QuoteCheck::Reject`], fails with
/// [`GenerationError::NoVerbatimQuotes`] when quotes were offered but none
/// survive.
pub fn verify_quotes(
    quotes: Vec<String>,
    article: &str,
    policy: QuoteCheck,
) -> Result<Vec<String>, GenerationError> {
    let mut seen = HashSet::new();
    let candidates: Vec<String> = quotes
        .into_iter()
        .filter(|q| !q.trim().is_empty())
        .filter(|q| seen.insert(canonical(q)))
        .collect();

    if policy == QuoteCheck::Off {
        return Ok(candidates);
    }

    let haystack = canonical(article);
    let offered = candidates.len();
    let mut kept = Vec::with_capacity(offered);
    for (i, quote) in candidates.into_iter().enumerate() {
        if haystack.contains(&canonical(&quote)) {
            kept.push(quote);
            continue;
        }
        match policy {
            QuoteCheck::Reject => warn!("Quote {} is not verbatim in the article, dropped", i + 1),
            _ => {
                warn!("Quote {} is not verbatim in the article", i + 1);
                kept.push(quote);
            }
        }
    }

    if offered > 0 && kept.is_empty() {
        return Err(GenerationError::NoVerbatimQuotes { rejected: offered });
    }
    Ok(kept)
}

/// Collapse whitespace runs and fold every quote character to `"`.
fn canonical(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            pending_space = !out.is_empty();
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        out.push(match c {
            '\'' | '\u{2018}' | '\u{2019}' | '\u{201C}' | '\u{201D}' => '"',
            other => other,
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARTICLE: &str = "Experts warn of rising costs. 'This is unprecedented,' said Dr. Smith. \
The policy takes effect next year.";

    #[test]
    fn caption_depends_on_summary_and_quotes() {
        let stages = GenerationStage::standard(&PostConfig::default());
        let caption = &stages[2];
        assert_eq!(caption.kind, StageKind::CaptionSynthesizer);
        assert_eq!(caption.inputs, vec![StateField::Summary, StateField::Quotes]);

        let mut state = PipelineState::new(ARTICLE);
        assert!(stages[0].is_ready(&state));
        assert!(stages[1].is_ready(&state));
        assert!(!caption.is_ready(&state));

        state.summary = Some("sum".into());
        assert!(!caption.is_ready(&state));
        state.quotes = Some(vec!["q".into()]);
        assert!(caption.is_ready(&state));
    }

    #[test]
    fn only_quote_extractor_requests_schema() {
        let stages = GenerationStage::standard(&PostConfig::default());
        assert!(stages[0].response_schema.is_some());
        assert!(stages[1].response_schema.is_none());
        assert!(stages[2].response_schema.is_none());
    }

    #[test]
    fn prompt_overrides_apply() {
        let config = PostConfig::builder()
            .summary_prompt("Summarize in one line.")
            .build()
            .unwrap();
        let stages = GenerationStage::standard(&config);
        assert_eq!(stages[1].instruction, "Summarize in one line.");
        assert_eq!(stages[0].instruction, QUOTE_EXTRACTOR_PROMPT);
    }

    #[test]
    fn whitespace_article_short_circuits() {
        let stage = GenerationStage::summarizer(SUMMARIZER_PROMPT);
        let err = stage
            .request(&PipelineState::new("  \n\t "), 0.0, 100)
            .unwrap_err();
        assert!(matches!(err, GenerationError::EmptyInput));
    }

    #[test]
    fn caption_request_carries_both_inputs() {
        let stage = GenerationStage::caption_synthesizer(CAPTION_SYNTHESIZER_PROMPT);
        let mut state = PipelineState::new(ARTICLE);
        state.summary = Some("The summary.".into());
        state.quotes = Some(vec!["first".into(), "second".into()]);
        let req = stage.request(&state, 0.0, 100).unwrap();
        assert_eq!(req.user, vec!["The summary.", "first\n\nsecond"]);
        assert_eq!(req.stage, StageKind::CaptionSynthesizer);
    }

    #[test]
    fn interpret_cleans_text() {
        let stage = GenerationStage::summarizer(SUMMARIZER_PROMPT);
        let out = stage
            .interpret(&Generated::text("```\nA summary.\n```"), ARTICLE, QuoteCheck::Warn)
            .unwrap();
        assert_eq!(out, StageOutput::Text("A summary.".into()));
    }

    #[test]
    fn blank_response_is_malformed() {
        let stage = GenerationStage::summarizer(SUMMARIZER_PROMPT);
        let err = stage
            .interpret(&Generated::text("  \n "), ARTICLE, QuoteCheck::Warn)
            .unwrap_err();
        assert!(matches!(err, GenerationError::MalformedOutput(_)));
    }

    #[test]
    fn quote_response_must_be_structured() {
        let stage = GenerationStage::quote_extractor(QUOTE_EXTRACTOR_PROMPT);
        let err = stage
            .interpret(&Generated::text("one great quote"), ARTICLE, QuoteCheck::Warn)
            .unwrap_err();
        assert!(matches!(err, GenerationError::MalformedOutput(_)));
    }

    #[test]
    fn verbatim_match_ignores_quote_style_and_spacing() {
        let quotes = vec!["\u{201C}This is  unprecedented,\u{201D} said Dr. Smith.".to_string()];
        let kept = verify_quotes(quotes, ARTICLE, QuoteCheck::Reject).unwrap();
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn paraphrase_is_dropped_under_reject() {
        let quotes = vec![
            "Experts warn of rising costs.".to_string(),
            "Costs are going up a lot.".to_string(),
        ];
        let kept = verify_quotes(quotes, ARTICLE, QuoteCheck::Reject).unwrap();
        assert_eq!(kept, vec!["Experts warn of rising costs."]);
    }

    #[test]
    fn paraphrase_is_kept_under_warn() {
        let quotes = vec!["Costs are going up a lot.".to_string()];
        let kept = verify_quotes(quotes, ARTICLE, QuoteCheck::Warn).unwrap();
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn reject_fails_when_nothing_survives() {
        let quotes = vec!["Invented.".to_string(), "Also invented.".to_string()];
        let err = verify_quotes(quotes, ARTICLE, QuoteCheck::Reject).unwrap_err();
        assert!(matches!(err, GenerationError::NoVerbatimQuotes { rejected: 2 }));
    }

    #[test]
    fn empty_and_duplicate_quotes_always_drop() {
        let quotes = vec![
            "Experts warn of rising costs.".to_string(),
            "   ".to_string(),
            "Experts  warn of rising costs.".to_string(),
        ];
        let kept = verify_quotes(quotes, ARTICLE, QuoteCheck::Off).unwrap();
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn canonical_form() {
        assert_eq!(canonical("  a\n\t b \u{2019}c\u{2019} "), "a b \"c\"");
    }

    #[test]
    fn display_names() {
        assert_eq!(StageKind::QuoteExtractor.to_string(), "quote extractor");
        assert_eq!(StageKind::CaptionSynthesizer.to_string(), "caption synthesizer");
    }
}
