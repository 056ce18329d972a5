//! The text-generation capability behind every pipeline stage.
//!
//! Stages never talk to a model directly. They build a [`GenerationRequest`]
//! and hand it to a [`TextGenerator`], which the orchestrator receives at
//! construction time. Production code wraps an `edgequake_llm` provider in
//! [`EdgequakeGenerator`]; tests substitute deterministic fakes.

use crate::config::PostConfig;
use crate::error::{GenerationError, PostError};
use crate::pipeline::stage::StageKind;
use crate::prompts::schema_contract;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::sync::Arc;
use tracing::debug;

/// One prompt-in / text-out call.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Stage issuing the request; used for logging and by test fakes.
    pub stage: StageKind,
    /// Fixed role instruction.
    pub system: String,
    /// User turns, sent in order.
    pub user: Vec<String>,
    /// JSON schema the response must satisfy, if structured output is wanted.
    pub response_schema: Option<String>,
    pub temperature: f32,
    pub max_tokens: usize,
}

/// Text returned by a [`TextGenerator`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Generated {
    pub text: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl Generated {
    /// A response with no token accounting.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }
}

/// Prompt-in / text-out capability.
///
/// Implementations must not retry; the orchestrator owns retry and timeout
/// policy.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<Generated, GenerationError>;
}

/// [`TextGenerator`] backed by an `edgequake_llm` provider.
pub struct EdgequakeGenerator {
    provider: Arc<dyn LLMProvider>,
}

impl EdgequakeGenerator {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl TextGenerator for EdgequakeGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<Generated, GenerationError> {
        let messages = build_messages(request);
        let options = CompletionOptions {
            temperature: Some(request.temperature),
            max_tokens: Some(request.max_tokens),
            ..Default::default()
        };

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| GenerationError::Provider(e.to_string()))?;

        debug!(
            "Stage {}: {} input tokens, {} output tokens",
            request.stage, response.prompt_tokens, response.completion_tokens
        );

        Ok(Generated {
            text: response.content,
            input_tokens: response.prompt_tokens as u64,
            output_tokens: response.completion_tokens as u64,
        })
    }
}

/// Lay out the chat turns for a request.
///
/// The schema contract rides on the system message so every provider sees
/// it, whether or not it supports native structured output.
fn build_messages(request: &GenerationRequest) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(request.user.len() + 1);
    messages.push(ChatMessage::system(system_instruction(request)));
    for turn in &request.user {
        messages.push(ChatMessage::user(turn.clone()));
    }
    messages
}

fn system_instruction(request: &GenerationRequest) -> String {
    match request.response_schema {
        Some(ref schema) => format!("{}{}", request.system, schema_contract(schema)),
        None => request.system.clone(),
    }
}

// ── Provider resolution ──────────────────────────────────────────────────

/// Default model when the caller names a provider but not a model.
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Build the generator for `config`, resolving the provider first.
pub fn resolve_generator(config: &PostConfig) -> Result<Arc<dyn TextGenerator>, PostError> {
    let provider = resolve_provider(config)?;
    Ok(Arc::new(EdgequakeGenerator::new(provider)))
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`), used as-is.
/// 2. **Named provider + model** (`config.provider_name`).
/// 3. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`).
/// 4. **OpenAI key present** (`OPENAI_API_KEY`).
/// 5. **Full auto-detection** (`ProviderFactory::from_env`).
pub fn resolve_provider(config: &PostConfig) -> Result<Arc<dyn LLMProvider>, PostError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return create_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, &model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
            return create_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| PostError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, PostError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        PostError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(schema: Option<&str>) -> GenerationRequest {
        GenerationRequest {
            stage: StageKind::CaptionSynthesizer,
            system: "be helpful".into(),
            user: vec!["summary".into(), "quotes".into()],
            response_schema: schema.map(str::to_string),
            temperature: 0.0,
            max_tokens: 512,
        }
    }

    #[test]
    fn one_message_per_user_turn() {
        let messages = build_messages(&request(None));
        assert_eq!(messages.len(), 3);
    }

    #[test]
    fn plain_request_keeps_instruction() {
        assert_eq!(system_instruction(&request(None)), "be helpful");
    }

    #[test]
    fn schema_rides_on_system_message() {
        let system = system_instruction(&request(Some("{\"type\":\"object\"}")));
        assert!(system.starts_with("be helpful"));
        assert!(system.contains("{\"type\":\"object\"}"));
    }

    #[test]
    fn generated_text_helper() {
        let g = Generated::text("hi");
        assert_eq!(g.text, "hi");
        assert_eq!(g.input_tokens, 0);
    }
}
