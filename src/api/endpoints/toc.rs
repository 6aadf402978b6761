//! Table-of-contents editing endpoints.
//!
//! Sections are addressed by their insertion index, the position shown in
//! `sections` of [`TocResponse`].

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::toc::{
    detect_next_year_sections, SectionUpdate, TableOfContents, TocSection, TocValidation,
};
use crate::workspace::lock;

#[derive(Serialize)]
pub struct IndexedSection {
    pub index: usize,
    #[serde(flatten)]
    pub section: TocSection,
}

#[derive(Serialize)]
pub struct TocResponse {
    /// Editing order; `index` addresses a section in PATCH/DELETE.
    pub sections: Vec<IndexedSection>,
    /// Document order, as generated.
    pub ordered: Vec<TocSection>,
    pub validation: TocValidation,
    pub next_year_sections: Vec<String>,
}

impl TocResponse {
    fn from_toc(toc: &TableOfContents) -> Self {
        let ordered = toc.ordered();
        let (_, next_year_sections) = detect_next_year_sections(&ordered);
        Self {
            sections: toc
                .sections()
                .iter()
                .enumerate()
                .map(|(index, section)| IndexedSection {
                    index,
                    section: section.clone(),
                })
                .collect(),
            ordered,
            validation: toc.validate(),
            next_year_sections,
        }
    }
}

#[derive(Deserialize)]
pub struct AddSectionRequest {
    pub level: u8,
    /// Parent section number; required for levels 2 and 3.
    pub parent: Option<String>,
    pub title: Option<String>,
}

#[derive(Serialize)]
pub struct DeleteSectionResponse {
    pub removed: Vec<TocSection>,
    pub toc: TocResponse,
}

/// `GET /api/workspaces/:id/toc`
pub async fn get(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<TocResponse>, ApiError> {
    let shared = ctx.workspace(&id)?;
    let ws = lock(&shared)?;
    Ok(Json(TocResponse::from_toc(&ws.toc)))
}

/// `POST /api/workspaces/:id/toc/sections`
pub async fn add_section(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
    Json(request): Json<AddSectionRequest>,
) -> Result<Json<TocResponse>, ApiError> {
    let shared = ctx.workspace(&id)?;
    let mut ws = lock(&shared)?;
    ws.ensure_idle()?;

    let number = ws
        .toc
        .add_section(request.level, request.parent.as_deref())?
        .number
        .clone();
    if let Some(title) = request.title {
        let index = ws.toc.len() - 1;
        ws.toc.update_section(
            index,
            SectionUpdate {
                title: Some(title),
                ..Default::default()
            },
        )?;
    }

    tracing::info!(workspace = %id, number = %number, "TOC section added");
    Ok(Json(TocResponse::from_toc(&ws.toc)))
}

/// `PATCH /api/workspaces/:id/toc/sections/:index`
pub async fn update_section(
    State(ctx): State<ApiContext>,
    Path((id, index)): Path<(String, usize)>,
    Json(update): Json<SectionUpdate>,
) -> Result<Json<TocResponse>, ApiError> {
    let shared = ctx.workspace(&id)?;
    let mut ws = lock(&shared)?;
    ws.ensure_idle()?;

    ws.toc.update_section(index, update)?;
    Ok(Json(TocResponse::from_toc(&ws.toc)))
}

/// `DELETE /api/workspaces/:id/toc/sections/:index`: removes descendants too.
pub async fn delete_section(
    State(ctx): State<ApiContext>,
    Path((id, index)): Path<(String, usize)>,
) -> Result<Json<DeleteSectionResponse>, ApiError> {
    let shared = ctx.workspace(&id)?;
    let mut ws = lock(&shared)?;
    ws.ensure_idle()?;

    let removed = ws.toc.delete_section(index)?;
    tracing::info!(workspace = %id, removed = removed.len(), "TOC sections deleted");
    Ok(Json(DeleteSectionResponse {
        removed,
        toc: TocResponse::from_toc(&ws.toc),
    }))
}

/// `POST /api/workspaces/:id/toc/from-reference`: replace the TOC with the
/// reference document's headings.
pub async fn from_reference(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<TocResponse>, ApiError> {
    let shared = ctx.workspace(&id)?;
    let mut ws = lock(&shared)?;
    ws.ensure_idle()?;

    let toc = {
        let reference = ws
            .reference
            .as_ref()
            .ok_or_else(|| ApiError::BadRequest("Upload a reference document first".into()))?;
        TableOfContents::from_headings(&reference.style.headings)
    };
    if toc.is_empty() {
        return Err(ApiError::BadRequest(
            "No numbered headings were found in the reference document".into(),
        ));
    }

    ws.toc = toc;
    tracing::info!(workspace = %id, sections = ws.toc.len(), "TOC built from reference");
    Ok(Json(TocResponse::from_toc(&ws.toc)))
}

/// `GET /api/workspaces/:id/toc/validation`
pub async fn validation(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<TocValidation>, ApiError> {
    let shared = ctx.workspace(&id)?;
    let ws = lock(&shared)?;
    Ok(Json(ws.toc.validate()))
}
