use serde::{Deserialize, Serialize};

use super::types::{LlmClient, LlmRequest};
use super::{map_transport_error, service_error, LlmError};

/// Chat-completions client for OpenAI-compatible endpoints.
pub struct OpenAiClient {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl OpenAiClient {
    pub fn new(
        base_url: &str,
        api_key: &str,
        model: &str,
        timeout_secs: u64,
    ) -> Result<Self, LlmError> {
        if api_key.trim().is_empty() {
            return Err(LlmError::MissingApiKey);
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| LlmError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            client,
            timeout_secs,
        })
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ModelsResponse {
    data: Vec<ModelEntry>,
}

#[derive(Deserialize)]
struct ModelEntry {
    id: String,
}

fn build_body<'a>(model: &'a str, request: &'a LlmRequest) -> ChatCompletionRequest<'a> {
    ChatCompletionRequest {
        model,
        messages: vec![
            ChatMessage {
                role: "system",
                content: &request.system,
            },
            ChatMessage {
                role: "user",
                content: &request.prompt,
            },
        ],
        temperature: request.temperature,
        max_tokens: request.max_tokens,
    }
}

fn first_choice(parsed: ChatCompletionResponse) -> Result<String, LlmError> {
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| LlmError::MalformedResponse("response has no message content".into()))
}

impl LlmClient for OpenAiClient {
    fn generate(&self, request: &LlmRequest) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&build_body(&self.model, request))
            .send()
            .map_err(|e| map_transport_error(e, &self.base_url, self.timeout_secs))?;

        if !response.status().is_success() {
            return Err(service_error(response));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .map_err(|e| LlmError::MalformedResponse(e.to_string()))?;

        first_choice(parsed)
    }

    fn is_model_available(&self, model: &str) -> Result<bool, LlmError> {
        Ok(self.list_models()?.iter().any(|m| m == model))
    }

    fn list_models(&self) -> Result<Vec<String>, LlmError> {
        let url = format!("{}/models", self.base_url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .map_err(|e| map_transport_error(e, &self.base_url, self.timeout_secs))?;

        if !response.status().is_success() {
            return Err(service_error(response));
        }

        let parsed: ModelsResponse = response
            .json()
            .map_err(|e| LlmError::MalformedResponse(e.to_string()))?;

        Ok(parsed.data.into_iter().map(|m| m.id).collect())
    }

    fn model(&self) -> &str {
        &self.model
    }
}
