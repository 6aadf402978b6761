//! Workspace lifecycle endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::{parse_workspace_id, ApiContext};
use crate::pipeline::storage::VectorStore;
use crate::workspace::{lock, Readiness, WorkspaceSummary};

#[derive(Serialize)]
pub struct DeletedResponse {
    pub deleted: bool,
}

/// Drop a workspace's vector collection off the async runtime.
async fn clear_collection(ctx: &ApiContext, name: String) -> Result<(), ApiError> {
    let collection = ctx.collection(&name);
    tokio::task::spawn_blocking(move || collection.clear()).await??;
    tracing::debug!(collection = %name, "Vector collection cleared");
    Ok(())
}

/// `POST /api/workspaces`
pub async fn create(
    State(ctx): State<ApiContext>,
) -> Result<(StatusCode, Json<WorkspaceSummary>), ApiError> {
    let shared = ctx.workspaces.create()?;
    let summary = lock(&shared)?.summary();
    Ok((StatusCode::CREATED, Json(summary)))
}

/// `GET /api/workspaces/:id`
pub async fn get(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<WorkspaceSummary>, ApiError> {
    let shared = ctx.workspace(&id)?;
    let summary = lock(&shared)?.summary();
    Ok(Json(summary))
}

/// `DELETE /api/workspaces/:id`
pub async fn delete(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<DeletedResponse>, ApiError> {
    let id = parse_workspace_id(&id)?;
    let collection = {
        let shared = ctx.workspaces.get(id)?;
        let ws = lock(&shared)?;
        ws.ensure_idle()?;
        ws.collection_name()
    };

    ctx.workspaces.delete(id)?;
    clear_collection(&ctx, collection).await?;
    Ok(Json(DeletedResponse { deleted: true }))
}

/// `POST /api/workspaces/:id/reset`: drop documents, TOC and report.
pub async fn reset(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<WorkspaceSummary>, ApiError> {
    let shared = ctx.workspace(&id)?;
    let collection = {
        let mut ws = lock(&shared)?;
        ws.ensure_idle()?;
        ws.reset();
        ws.collection_name()
    };

    clear_collection(&ctx, collection).await?;
    tracing::info!(workspace = %id, "Workspace reset");

    let summary = lock(&shared)?.summary();
    Ok(Json(summary))
}

/// `GET /api/workspaces/:id/readiness`
pub async fn readiness(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<Readiness>, ApiError> {
    let shared = ctx.workspace(&id)?;
    let readiness = lock(&shared)?.readiness(ctx.llm_configured());
    Ok(Json(readiness))
}
