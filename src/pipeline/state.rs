//! Shared state accumulated across generation stages.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Names of the fields of [`PipelineState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StateField {
    Article,
    Summary,
    Quotes,
    Caption,
}

impl fmt::Display for StateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StateField::Article => "article",
            StateField::Summary => "summary",
            StateField::Quotes => "quotes",
            StateField::Caption => "caption",
        })
    }
}

/// The value a stage writes into its output field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutput {
    Text(String),
    Quotes(Vec<String>),
}

impl StageOutput {
    /// Byte length of the produced text, quotes summed.
    pub fn len(&self) -> usize {
        match self {
            StageOutput::Text(t) => t.len(),
            StageOutput::Quotes(q) => q.iter().map(String::len).sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Mutable state owned by the orchestrator for one run.
///
/// Starts with only `article` set. Each optional field is written exactly
/// once, by the stage that declares it as output; [`PipelineState::apply`]
/// refuses a second write.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineState {
    pub article: String,
    pub summary: Option<String>,
    pub quotes: Option<Vec<String>>,
    pub caption: Option<String>,
}

impl PipelineState {
    /// Initial state: only `article` populated.
    pub fn new(article: impl Into<String>) -> Self {
        Self {
            article: article.into(),
            ..Default::default()
        }
    }

    /// Whether `field` has been written.
    pub fn has(&self, field: StateField) -> bool {
        match field {
            StateField::Article => true,
            StateField::Summary => self.summary.is_some(),
            StateField::Quotes => self.quotes.is_some(),
            StateField::Caption => self.caption.is_some(),
        }
    }

    /// Render a field as the text a stage receives as one user turn.
    ///
    /// Quotes are joined with a blank line between each one. Returns `None`
    /// for a field that has not been written.
    pub fn text_of(&self, field: StateField) -> Option<String> {
        match field {
            StateField::Article => Some(self.article.clone()),
            StateField::Summary => self.summary.clone(),
            StateField::Quotes => self.quotes.as_ref().map(|q| q.join("\n\n")),
            StateField::Caption => self.caption.clone(),
        }
    }

    /// Write a stage output into `field`.
    ///
    /// Fails if the field is already populated or the output kind does not
    /// fit the field. `article` is never writable.
    pub fn apply(&mut self, field: StateField, output: StageOutput) -> Result<(), String> {
        if self.has(field) {
            return Err(format!("field '{field}' is already written"));
        }
        match (field, output) {
            (StateField::Summary, StageOutput::Text(t)) => self.summary = Some(t),
            (StateField::Caption, StageOutput::Text(t)) => self.caption = Some(t),
            (StateField::Quotes, StageOutput::Quotes(q)) => self.quotes = Some(q),
            (field, _) => return Err(format!("output kind does not fit field '{field}'")),
        }
        Ok(())
    }

    /// Whether every output field has been written.
    pub fn is_complete(&self) -> bool {
        self.summary.is_some() && self.quotes.is_some() && self.caption.is_some()
    }

    /// Convert a complete state into its generated content.
    pub fn into_complete(self) -> Option<PostContent> {
        match (self.summary, self.quotes, self.caption) {
            (Some(summary), Some(quotes), Some(caption)) => Some(PostContent {
                summary,
                quotes,
                caption,
            }),
            _ => None,
        }
    }
}

/// Text produced by a successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostContent {
    pub summary: String,
    pub quotes: Vec<String>,
    pub caption: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_has_only_article() {
        let s = PipelineState::new("text");
        assert!(s.has(StateField::Article));
        assert!(!s.has(StateField::Summary));
        assert!(!s.has(StateField::Quotes));
        assert!(!s.has(StateField::Caption));
        assert!(!s.is_complete());
    }

    #[test]
    fn fields_are_write_once() {
        let mut s = PipelineState::new("text");
        s.apply(StateField::Summary, StageOutput::Text("a".into()))
            .unwrap();
        let err = s
            .apply(StateField::Summary, StageOutput::Text("b".into()))
            .unwrap_err();
        assert!(err.contains("already written"));
        assert_eq!(s.summary.as_deref(), Some("a"));
    }

    #[test]
    fn article_is_read_only() {
        let mut s = PipelineState::new("text");
        assert!(s
            .apply(StateField::Article, StageOutput::Text("x".into()))
            .is_err());
    }

    #[test]
    fn output_kind_must_fit_field() {
        let mut s = PipelineState::new("text");
        assert!(s
            .apply(StateField::Quotes, StageOutput::Text("x".into()))
            .is_err());
        assert!(!s.has(StateField::Quotes));
    }

    #[test]
    fn quotes_join_with_blank_line() {
        let mut s = PipelineState::new("text");
        s.apply(
            StateField::Quotes,
            StageOutput::Quotes(vec!["one".into(), "two".into()]),
        )
        .unwrap();
        assert_eq!(s.text_of(StateField::Quotes).as_deref(), Some("one\n\ntwo"));
        assert_eq!(s.text_of(StateField::Caption), None);
    }

    #[test]
    fn complete_state_converts() {
        let mut s = PipelineState::new("text");
        assert!(s.clone().into_complete().is_none());
        s.apply(StateField::Summary, StageOutput::Text("sum".into()))
            .unwrap();
        s.apply(StateField::Quotes, StageOutput::Quotes(vec!["q".into()]))
            .unwrap();
        s.apply(StateField::Caption, StageOutput::Text("cap".into()))
            .unwrap();
        let content = s.into_complete().unwrap();
        assert_eq!(content.caption, "cap");
        assert_eq!(content.quotes, vec!["q"]);
    }
}
