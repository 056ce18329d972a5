//! Configuration types for article-to-post generation.
//!
//! Every knob lives in [`PostConfig`], built via [`PostConfigBuilder`]. The
//! same config drives text generation, rendering and output, so two runs
//! can be compared by diffing their configs.

use crate::error::PostError;
use crate::progress::ProgressCallback;
use crate::render::theme::Theme;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration for one article-to-post run.
///
/// Built via [`PostConfig::builder()`] or using [`PostConfig::default()`].
///
/// # Example
/// ```rust
/// use pdf2post::{PostConfig, QuoteCheck, Theme};
///
/// let config = PostConfig::builder()
///     .byline("Jane Doe")
///     .theme(Theme::Headline)
///     .quote_check(QuoteCheck::Reject)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct PostConfig {
    /// LLM model identifier, e.g. "gpt-4o". If None, uses [`crate::generate::DEFAULT_MODEL`].
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    /// If None along with `provider`, the environment decides.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature for every stage. Default: 0.0.
    ///
    /// Quotes must be copied verbatim, so the default keeps the model as
    /// literal as it can be.
    pub temperature: f32,

    /// Maximum tokens a stage may generate. Default: 1024.
    pub max_tokens: usize,

    /// Retry attempts after a transient generation failure. Default: 2.
    ///
    /// Only provider errors and timeouts are retried. Malformed output and
    /// empty input fail the stage immediately.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds. Doubles on each attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Per-call generation timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Visual theme for quote cards. Default: [`Theme::Default`].
    pub theme: Theme,

    /// Author line drawn under each quote. Empty means no byline.
    pub byline: String,

    /// Directory receiving images and the caption file. Default: `output`.
    pub output_dir: PathBuf,

    /// Also write `images.zip` next to the images. Default: false.
    pub bundle: bool,

    /// What to do with quotes that do not appear verbatim in the article.
    pub quote_check: QuoteCheck,

    /// Truncate the article to this many characters before generation.
    pub max_article_chars: Option<usize>,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Override for the quote extractor instruction.
    pub quote_prompt: Option<String>,

    /// Override for the summarizer instruction.
    pub summary_prompt: Option<String>,

    /// Override for the caption synthesizer instruction.
    pub caption_prompt: Option<String>,

    /// Extra directories scanned for font files.
    pub font_dirs: Vec<PathBuf>,

    /// Load fonts installed on the system. Default: true.
    ///
    /// Disabling this makes rendering depend only on `font_dirs`, falling back
    /// to built-in glyphs when those hold nothing usable.
    pub system_fonts: bool,

    /// Optional progress callback for stage and image events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for PostConfig {
    fn default() -> Self {
        Self {
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.0,
            max_tokens: 1024,
            max_retries: 2,
            retry_backoff_ms: 500,
            api_timeout_secs: 60,
            download_timeout_secs: 120,
            theme: Theme::default(),
            byline: String::new(),
            output_dir: PathBuf::from("output"),
            bundle: false,
            quote_check: QuoteCheck::default(),
            max_article_chars: None,
            password: None,
            quote_prompt: None,
            summary_prompt: None,
            caption_prompt: None,
            font_dirs: Vec::new(),
            system_fonts: true,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for PostConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("theme", &self.theme)
            .field("byline", &self.byline)
            .field("output_dir", &self.output_dir)
            .field("bundle", &self.bundle)
            .field("quote_check", &self.quote_check)
            .field("max_article_chars", &self.max_article_chars)
            .field("font_dirs", &self.font_dirs)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn PipelineProgressCallback>"),
            )
            .finish()
    }
}

impl PostConfig {
    /// Create a new builder for `PostConfig`.
    pub fn builder() -> PostConfigBuilder {
        PostConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`PostConfig`].
pub struct PostConfigBuilder {
    config: PostConfig,
}

impl fmt::Debug for PostConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl PostConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn theme(mut self, theme: Theme) -> Self {
        self.config.theme = theme;
        self
    }

    pub fn byline(mut self, byline: impl Into<String>) -> Self {
        self.config.byline = byline.into();
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn bundle(mut self, v: bool) -> Self {
        self.config.bundle = v;
        self
    }

    pub fn quote_check(mut self, policy: QuoteCheck) -> Self {
        self.config.quote_check = policy;
        self
    }

    pub fn max_article_chars(mut self, n: usize) -> Self {
        self.config.max_article_chars = Some(n);
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn quote_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.quote_prompt = Some(prompt.into());
        self
    }

    pub fn summary_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.summary_prompt = Some(prompt.into());
        self
    }

    pub fn caption_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.caption_prompt = Some(prompt.into());
        self
    }

    pub fn font_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.font_dirs.push(dir.into());
        self
    }

    pub fn system_fonts(mut self, v: bool) -> Self {
        self.config.system_fonts = v;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PostConfig, PostError> {
        let c = &self.config;
        if c.max_tokens == 0 {
            return Err(PostError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if c.api_timeout_secs == 0 {
            return Err(PostError::InvalidConfig(
                "api_timeout_secs must be ≥ 1".into(),
            ));
        }
        if c.max_article_chars == Some(0) {
            return Err(PostError::InvalidConfig(
                "max_article_chars must be ≥ 1 when set".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Policy for quotes that cannot be found verbatim in the article.
///
/// Matching ignores differences in whitespace runs and in the style of quote
/// characters, so a quote the model re-punctuated with curly quotes still
/// counts as verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum QuoteCheck {
    /// No check.
    Off,
    /// Keep the quote and log a warning. (default)
    #[default]
    Warn,
    /// Drop the quote. The stage fails if no quote survives.
    Reject,
}
