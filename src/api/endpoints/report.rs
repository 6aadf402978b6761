//! Report generation endpoints.
//!
//! Generation and refinement snapshot the workspace, mark it busy, run the
//! LLM calls on the blocking pool and write the result back. The workspace
//! lock is never held while a model call is in flight.

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::pipeline::generation::{
    extract_image_suggestions, render_report, GeneratedSection, GenerationProgress,
    ImageSuggestion, ReportGenerator, ReportInputs, StopReason,
};
use crate::pipeline::refinement::{
    parse_report_sections, refine_report_with_request, ModificationRequest,
};
use crate::workspace::{lock, GenerationSnapshot, SharedWorkspace, Workspace};

/// File name offered by the download endpoint.
pub const REPORT_FILE_NAME: &str = "generated_report.txt";

#[derive(Serialize)]
pub struct ReportResponse {
    pub sections: Vec<GeneratedSection>,
    pub progress: GenerationProgress,
    pub is_complete: bool,
    pub stop_reason: Option<StopReason>,
    /// Combined report text.
    pub text: String,
}

impl ReportResponse {
    fn from_workspace(ws: &Workspace) -> Self {
        Self {
            is_complete: ws.is_report_complete(),
            sections: ws.sections.clone(),
            stop_reason: ws.last_stop.clone(),
            text: render_report(&ws.sections),
            progress: ws.progress.clone(),
        }
    }
}

#[derive(Deserialize)]
pub struct RefineRequest {
    pub request: String,
    /// Edited report text; replaces the stored sections when present.
    #[serde(default)]
    pub report: Option<String>,
}

#[derive(Serialize)]
pub struct RefineResponse {
    pub modification: ModificationRequest,
    pub refined_sections: Vec<String>,
    pub report: ReportResponse,
}

fn inputs(snapshot: &GenerationSnapshot, max_token_limit: usize) -> ReportInputs<'_> {
    ReportInputs {
        style: &snapshot.style,
        technical_terms: &snapshot.technical_terms,
        source_text: &snapshot.source_text,
        settings: &snapshot.settings,
        max_token_limit,
    }
}

/// Release the busy flag when a background run fails.
fn abort_run(shared: &SharedWorkspace, err: ApiError) -> ApiError {
    if let Ok(mut ws) = lock(shared) {
        ws.end_generation();
    }
    err
}

async fn run_generation(
    ctx: ApiContext,
    id: String,
    restart: bool,
) -> Result<Json<ReportResponse>, ApiError> {
    let llm = ctx.llm()?;
    let shared = ctx.workspace(&id)?;
    let snapshot = lock(&shared)?.begin_generation(restart, true)?;

    let collection = ctx.collection(&snapshot.collection);
    let embedder = ctx.embedder.clone();
    let max_token_limit = ctx.settings.max_token_limit;

    let result = tokio::task::spawn_blocking(move || {
        let generator = ReportGenerator::new(
            &*llm,
            &*embedder,
            &collection,
            inputs(&snapshot, max_token_limit),
            &snapshot.toc,
        );
        generator.generate_full_report(
            &snapshot.toc,
            snapshot.start_index,
            snapshot.sections.clone(),
            None,
        )
    })
    .await;

    let outcome = match result {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(e)) => return Err(abort_run(&shared, e.into())),
        Err(e) => return Err(abort_run(&shared, e.into())),
    };

    let mut ws = lock(&shared)?;
    ws.apply_outcome(&outcome);
    tracing::info!(
        workspace = %id,
        completed = outcome.completed,
        total = outcome.total,
        tokens = outcome.total_tokens,
        "Report run stored"
    );
    Ok(Json(ReportResponse::from_workspace(&ws)))
}

/// `POST /api/workspaces/:id/report/generate`: start over from the first section.
pub async fn generate(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<ReportResponse>, ApiError> {
    run_generation(ctx, id, true).await
}

/// `POST /api/workspaces/:id/report/continue`: resume a paused run.
pub async fn resume(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<ReportResponse>, ApiError> {
    run_generation(ctx, id, false).await
}

/// `GET /api/workspaces/:id/report`
pub async fn get(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<ReportResponse>, ApiError> {
    let shared = ctx.workspace(&id)?;
    let ws = lock(&shared)?;
    Ok(Json(ReportResponse::from_workspace(&ws)))
}

/// `GET /api/workspaces/:id/report/download`
pub async fn download(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let shared = ctx.workspace(&id)?;
    let text = lock(&shared)?.report_text()?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{REPORT_FILE_NAME}\""),
            ),
        ],
        text,
    ))
}

/// `GET /api/workspaces/:id/report/images`
pub async fn images(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<Vec<ImageSuggestion>>, ApiError> {
    let shared = ctx.workspace(&id)?;
    let ws = lock(&shared)?;
    Ok(Json(extract_image_suggestions(&ws.sections)))
}

/// `POST /api/workspaces/:id/report/refine`
pub async fn refine(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
    Json(body): Json<RefineRequest>,
) -> Result<Json<RefineResponse>, ApiError> {
    if body.request.trim().is_empty() {
        return Err(ApiError::BadRequest("Modification request is empty".into()));
    }
    let llm = ctx.llm()?;
    let shared = ctx.workspace(&id)?;
    let mut snapshot = lock(&shared)?.begin_refinement(true)?;

    if let Some(text) = body.report.as_deref().filter(|t| !t.trim().is_empty()) {
        snapshot.sections = parse_report_sections(text);
    }

    let collection = ctx.collection(&snapshot.collection);
    let embedder = ctx.embedder.clone();
    let max_token_limit = ctx.settings.max_token_limit;
    let request = body.request;

    let result = tokio::task::spawn_blocking(move || {
        let generator = ReportGenerator::new(
            &*llm,
            &*embedder,
            &collection,
            inputs(&snapshot, max_token_limit),
            &snapshot.toc,
        );
        refine_report_with_request(&generator, &snapshot.toc, &snapshot.sections, &request)
    })
    .await;

    let outcome = match result {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(e)) => return Err(abort_run(&shared, e.into())),
        Err(e) => return Err(abort_run(&shared, e.into())),
    };

    let mut ws = lock(&shared)?;
    match &outcome.regeneration {
        Some(regeneration) => ws.apply_outcome(regeneration),
        None => ws.apply_sections(outcome.sections.clone()),
    }
    tracing::info!(
        workspace = %id,
        kind = ?outcome.request,
        refined = outcome.refined.len(),
        "Report refined"
    );

    Ok(Json(RefineResponse {
        modification: outcome.request,
        refined_sections: outcome.refined,
        report: ReportResponse::from_workspace(&ws),
    }))
}
