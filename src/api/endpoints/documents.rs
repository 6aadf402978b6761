//! Document upload endpoints.
//!
//! `POST /api/workspaces/:id/reference` and `POST /api/workspaces/:id/source`
//! take a multipart form with one `file` field holding a PDF. Parsing,
//! embedding and vector writes run on the blocking pool. The workspace is
//! marked as indexing from before the body is read until the result is
//! stored, so generation, reset and edits wait for the upload to finish.

use axum::extract::{Multipart, Path, State};
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::pipeline::extraction::{extract_text_from_pdf, PdfTextExtractor};
use crate::pipeline::storage::chunker::SourceChunker;
use crate::pipeline::storage::index_document;
use crate::workspace::{lock, ReferenceAnalysis, SharedWorkspace, SourceAnalysis};

/// Multipart field carrying the PDF.
const FILE_FIELD: &str = "file";

/// Read the `file` field of a multipart upload.
async fn read_pdf_upload(mut multipart: Multipart, max_bytes: usize) -> Result<Vec<u8>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Cannot read upload: {e}")))?;

        if bytes.is_empty() {
            return Err(ApiError::BadRequest("Uploaded file is empty".into()));
        }
        if bytes.len() > max_bytes {
            return Err(ApiError::BadRequest(format!(
                "Uploaded file exceeds {} MB limit ({} bytes)",
                max_bytes / (1024 * 1024),
                bytes.len()
            )));
        }
        return Ok(bytes.to_vec());
    }

    Err(ApiError::BadRequest(format!(
        "Missing multipart field '{FILE_FIELD}'"
    )))
}

/// Holds the workspace's indexing flag until dropped, including when the
/// request is cancelled mid-upload.
struct IndexingGuard {
    workspace: SharedWorkspace,
}

impl IndexingGuard {
    fn acquire(workspace: &SharedWorkspace) -> Result<Self, ApiError> {
        lock(workspace)?.begin_indexing()?;
        Ok(Self {
            workspace: workspace.clone(),
        })
    }
}

impl Drop for IndexingGuard {
    fn drop(&mut self) {
        if let Ok(mut ws) = lock(&self.workspace) {
            ws.end_indexing();
        }
    }
}

/// `POST /api/workspaces/:id/reference`: analyse the style reference.
pub async fn upload_reference(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<ReferenceAnalysis>, ApiError> {
    let shared = ctx.workspace(&id)?;
    let _indexing = IndexingGuard::acquire(&shared)?;
    let bytes = read_pdf_upload(multipart, ctx.settings.max_upload_bytes).await?;

    let analysis = tokio::task::spawn_blocking(move || -> Result<ReferenceAnalysis, ApiError> {
        let document = extract_text_from_pdf(&PdfTextExtractor, &bytes)?;
        Ok(ReferenceAnalysis::from_document(&document))
    })
    .await??;

    tracing::info!(
        workspace = %id,
        pages = analysis.page_count,
        endings = analysis.style.itemized_endings.len(),
        headings = analysis.style.headings.len(),
        "Reference document analysed"
    );

    lock(&shared)?.reference = Some(analysis.clone());
    Ok(Json(analysis))
}

/// `POST /api/workspaces/:id/source`: extract, chunk and index the source.
pub async fn upload_source(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<SourceAnalysis>, ApiError> {
    let shared = ctx.workspace(&id)?;
    let _indexing = IndexingGuard::acquire(&shared)?;
    let collection_name = lock(&shared)?.collection_name();
    let bytes = read_pdf_upload(multipart, ctx.settings.max_upload_bytes).await?;

    let collection = ctx.collection(&collection_name);
    let embedder = ctx.embedder.clone();
    let analysis = tokio::task::spawn_blocking(move || -> Result<SourceAnalysis, ApiError> {
        let document = extract_text_from_pdf(&PdfTextExtractor, &bytes)?;
        let stored = index_document(
            &document.full_text,
            &SourceChunker::new(),
            &*embedder,
            &collection,
        )?;
        Ok(SourceAnalysis::from_document(&document, stored))
    })
    .await??;

    tracing::info!(
        workspace = %id,
        pages = analysis.page_count,
        chunks = analysis.chunk_count,
        "Source document indexed"
    );

    lock(&shared)?.source = Some(analysis.clone());
    Ok(Json(analysis))
}
