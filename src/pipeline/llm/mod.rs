pub mod types;
pub mod openai;
pub mod ollama;
pub mod mock;

pub use types::*;
pub use openai::OpenAiClient;
pub use ollama::OllamaClient;
pub use mock::MockLlmClient;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Cannot reach model service at {0}")]
    Connection(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Model service returned error (status {status}): {body}")]
    Service { status: u16, body: String },

    #[error("Malformed model response: {0}")]
    MalformedResponse(String),

    #[error("OPENAI_API_KEY is not set")]
    MissingApiKey,

    #[error("HTTP client error: {0}")]
    HttpClient(String),
}

/// Map a transport failure the way every client reports it.
pub(crate) fn map_transport_error(e: reqwest::Error, base_url: &str, timeout_secs: u64) -> LlmError {
    if e.is_connect() {
        LlmError::Connection(base_url.to_string())
    } else if e.is_timeout() {
        LlmError::Timeout(timeout_secs)
    } else {
        LlmError::HttpClient(e.to_string())
    }
}

/// Read a non-success response into a service error.
pub(crate) fn service_error(response: reqwest::blocking::Response) -> LlmError {
    let status = response.status().as_u16();
    let body = response.text().unwrap_or_default();
    LlmError::Service { status, body }
}
