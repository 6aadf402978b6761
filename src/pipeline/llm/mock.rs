use std::collections::VecDeque;
use std::sync::Mutex;

use super::types::{LlmClient, LlmRequest};
use super::LlmError;

/// Scripted LLM client for tests and offline runs.
///
/// Returns queued responses in order, then the fallback response. Every
/// request is recorded so tests can inspect the prompts that were built.
pub struct MockLlmClient {
    fallback: String,
    queued: Mutex<VecDeque<Result<String, String>>>,
    requests: Mutex<Vec<LlmRequest>>,
    available_models: Vec<String>,
}

impl MockLlmClient {
    pub fn new(response: &str) -> Self {
        Self {
            fallback: response.to_string(),
            queued: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            available_models: vec!["mock-model".to_string()],
        }
    }

    /// Queue a successful response ahead of the fallback.
    pub fn then_respond(self, response: &str) -> Self {
        if let Ok(mut queued) = self.queued.lock() {
            queued.push_back(Ok(response.to_string()));
        }
        self
    }

    /// Queue a failing call ahead of the fallback.
    pub fn then_fail(self, message: &str) -> Self {
        if let Ok(mut queued) = self.queued.lock() {
            queued.push_back(Err(message.to_string()));
        }
        self
    }

    pub fn with_models(mut self, models: Vec<String>) -> Self {
        self.available_models = models;
        self
    }

    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }
}

impl LlmClient for MockLlmClient {
    fn generate(&self, request: &LlmRequest) -> Result<String, LlmError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        let next = self.queued.lock().ok().and_then(|mut q| q.pop_front());
        match next {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(LlmError::Service {
                status: 500,
                body: message,
            }),
            None => Ok(self.fallback.clone()),
        }
    }

    fn is_model_available(&self, model: &str) -> Result<bool, LlmError> {
        Ok(self.available_models.iter().any(|m| m.starts_with(model)))
    }

    fn list_models(&self) -> Result<Vec<String>, LlmError> {
        Ok(self.available_models.clone())
    }

    fn model(&self) -> &str {
        self.available_models
            .first()
            .map(String::as_str)
            .unwrap_or("mock-model")
    }
}
