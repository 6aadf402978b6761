//! API error types with structured JSON responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::pipeline::extraction::ExtractionError;
use crate::pipeline::generation::GenerationError;
use crate::pipeline::llm::LlmError;
use crate::pipeline::refinement::RefinementError;
use crate::pipeline::storage::StorageError;
use crate::toc::TocError;
use crate::workspace::WorkspaceError;

/// Structured error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Workspace not ready: {0}")]
    NotReady(String),
    #[error("Upstream service error: {0}")]
    Upstream(String),
    #[error("Service unavailable: {0}")]
    Unavailable(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, "NOT_FOUND", detail),
            ApiError::BadRequest(detail) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", detail),
            ApiError::Conflict(detail) => (StatusCode::CONFLICT, "CONFLICT", detail),
            ApiError::NotReady(detail) => (StatusCode::CONFLICT, "NOT_READY", detail),
            ApiError::Upstream(detail) => {
                tracing::warn!(detail, "Upstream model service error");
                (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", detail)
            }
            ApiError::Unavailable(detail) => {
                (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE", detail)
            }
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorBody {
            error: ErrorDetail { code, message },
        };
        (status, Json(body)).into_response()
    }
}

impl From<WorkspaceError> for ApiError {
    fn from(err: WorkspaceError) -> Self {
        match err {
            WorkspaceError::NotFound(_) | WorkspaceError::NoReport => {
                ApiError::NotFound(err.to_string())
            }
            WorkspaceError::GenerationInProgress | WorkspaceError::IndexingInProgress => {
                ApiError::Conflict(err.to_string())
            }
            WorkspaceError::NotReady(missing) => ApiError::NotReady(missing.join(", ")),
            WorkspaceError::LockPoisoned => ApiError::Internal("lock poisoned".into()),
        }
    }
}

impl From<TocError> for ApiError {
    fn from(err: TocError) -> Self {
        match err {
            TocError::ParentNotFound(_) | TocError::IndexOutOfRange { .. } => {
                ApiError::NotFound(err.to_string())
            }
            _ => ApiError::BadRequest(err.to_string()),
        }
    }
}

impl From<ExtractionError> for ApiError {
    fn from(err: ExtractionError) -> Self {
        match err {
            ExtractionError::Io(e) => ApiError::Internal(e.to_string()),
            _ => ApiError::BadRequest(err.to_string()),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::EmptyChunks => ApiError::BadRequest(err.to_string()),
            StorageError::EmbeddingService { .. } => ApiError::Upstream(err.to_string()),
            StorageError::ModelNotFound(_) | StorageError::ModelInit(_) => {
                ApiError::Unavailable(err.to_string())
            }
            _ => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<LlmError> for ApiError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Connection(_) | LlmError::Timeout(_) | LlmError::MissingApiKey => {
                ApiError::Unavailable(err.to_string())
            }
            LlmError::Service { .. } | LlmError::MalformedResponse(_) => {
                ApiError::Upstream(err.to_string())
            }
            LlmError::HttpClient(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<GenerationError> for ApiError {
    fn from(err: GenerationError) -> Self {
        match err {
            GenerationError::Llm(e) => e.into(),
            GenerationError::Retrieval(e) => e.into(),
            GenerationError::EmptyToc | GenerationError::InvalidStartIndex { .. } => {
                ApiError::BadRequest(err.to_string())
            }
        }
    }
}

impl From<RefinementError> for ApiError {
    fn from(err: RefinementError) -> Self {
        match err {
            RefinementError::EmptyRequest | RefinementError::EmptyReport => {
                ApiError::BadRequest(err.to_string())
            }
            RefinementError::SectionNotFound(_) => ApiError::NotFound(err.to_string()),
            RefinementError::Generation(e) => e.into(),
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(format!("background task failed: {err}"))
    }
}
