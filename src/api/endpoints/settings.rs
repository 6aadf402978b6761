//! Generation settings endpoints.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::pipeline::generation::{GenerationSettings, YearContext};
use crate::pipeline::llm::LlmClient;
use crate::workspace::{lock, Workspace};

#[derive(Serialize)]
pub struct SettingsResponse {
    pub settings: GenerationSettings,
    /// Year rules the current TOC produces with these settings.
    pub years: YearContext,
    pub max_token_limit: usize,
    pub model: Option<String>,
}

fn respond(ctx: &ApiContext, ws: &Workspace) -> SettingsResponse {
    SettingsResponse {
        years: YearContext::new(&ws.settings, &ws.toc.ordered()),
        settings: ws.settings.clone(),
        max_token_limit: ctx.settings.max_token_limit,
        model: ctx.llm.as_ref().map(|llm| llm.model().to_string()),
    }
}

/// `GET /api/workspaces/:id/settings`
pub async fn get(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<SettingsResponse>, ApiError> {
    let shared = ctx.workspace(&id)?;
    let ws = lock(&shared)?;
    Ok(Json(respond(&ctx, &ws)))
}

/// `PUT /api/workspaces/:id/settings`
pub async fn put(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
    Json(mut settings): Json<GenerationSettings>,
) -> Result<Json<SettingsResponse>, ApiError> {
    settings.validate().map_err(ApiError::BadRequest)?;
    settings.organization = settings
        .organization
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty());

    let shared = ctx.workspace(&id)?;
    let mut ws = lock(&shared)?;
    ws.ensure_idle()?;
    ws.settings = settings;

    tracing::info!(
        workspace = %id,
        current_year = ws.settings.current_year,
        total_years = ws.settings.total_years,
        year_filter = ws.settings.year_filter,
        "Generation settings updated"
    );
    Ok(Json(respond(&ctx, &ws)))
}
