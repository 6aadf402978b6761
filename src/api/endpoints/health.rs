//! Health check endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::types::ApiContext;
use crate::pipeline::llm::{LlmClient, SharedLlm};
use crate::pipeline::storage::EmbeddingModel;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub llm_configured: bool,
    pub model: Option<String>,
    /// Whether the model service lists the configured model; `None` when
    /// no LLM is configured or the service could not be asked.
    pub model_available: Option<bool>,
    pub embedding_dimension: usize,
    pub workspaces: usize,
}

/// Ask the model service for its model list off the async runtime.
async fn check_model(llm: SharedLlm) -> Option<bool> {
    let result = tokio::task::spawn_blocking(move || llm.is_model_available(llm.model())).await;
    match result {
        Ok(Ok(available)) => Some(available),
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Model availability check failed");
            None
        }
        Err(e) => {
            tracing::warn!(error = %e, "Model availability task failed");
            None
        }
    }
}

/// `GET /api/health`
pub async fn check(State(ctx): State<ApiContext>) -> Json<HealthResponse> {
    let model_available = match ctx.llm.clone() {
        Some(llm) => check_model(llm).await,
        None => None,
    };

    Json(HealthResponse {
        status: "ok",
        version: crate::config::APP_VERSION,
        llm_configured: ctx.llm_configured(),
        model: ctx.llm.as_ref().map(|llm| llm.model().to_string()),
        model_available,
        embedding_dimension: ctx.embedder.dimension(),
        workspaces: ctx.workspaces.len(),
    })
}
