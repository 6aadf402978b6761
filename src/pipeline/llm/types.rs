use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::LlmError;
use super::{OllamaClient, OpenAiClient};
use crate::config::{LlmProvider, Settings};

/// Sampling temperature for report drafting.
pub const DEFAULT_TEMPERATURE: f32 = 0.3;

/// Completion budget per section.
pub const DEFAULT_MAX_TOKENS: u32 = 4000;

/// One system + user exchange with the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmRequest {
    pub system: String,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl LlmRequest {
    pub fn new(system: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            prompt: prompt.into(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

/// LLM client abstraction (allows mocking)
pub trait LlmClient: Send + Sync {
    fn generate(&self, request: &LlmRequest) -> Result<String, LlmError>;
    fn is_model_available(&self, model: &str) -> Result<bool, LlmError>;
    fn list_models(&self) -> Result<Vec<String>, LlmError>;
    /// Model every `generate` call targets.
    fn model(&self) -> &str;
}

pub type SharedLlm = Arc<dyn LlmClient>;

/// Build the configured client. `None` when OpenAI is selected without a key.
pub fn build_llm_client(settings: &Settings) -> Result<Option<SharedLlm>, LlmError> {
    match settings.llm_provider {
        LlmProvider::OpenAi => match &settings.openai_api_key {
            Some(key) => {
                let client: SharedLlm = Arc::new(OpenAiClient::new(
                    &settings.openai_base_url,
                    key,
                    &settings.model,
                    180,
                )?);
                Ok(Some(client))
            }
            None => {
                tracing::warn!("OPENAI_API_KEY not set, report generation disabled");
                Ok(None)
            }
        },
        LlmProvider::Ollama => {
            let client: SharedLlm =
                Arc::new(OllamaClient::new(&settings.ollama_url, &settings.model, 300)?);
            Ok(Some(client))
        }
    }
}
