//! Shared state for the HTTP API.

use std::sync::Arc;

use uuid::Uuid;

use crate::api::error::ApiError;
use crate::config::Settings;
use crate::pipeline::llm::{build_llm_client, SharedLlm};
use crate::pipeline::storage::embedder::{build_embedder, SharedEmbedder};
use crate::pipeline::storage::vectordb::{SqliteCollection, SqliteVectorDb};
use crate::workspace::{SharedWorkspace, WorkspaceManager};

// ═══════════════════════════════════════════════════════════
// API context — shared state for the router
// ═══════════════════════════════════════════════════════════

/// Shared context for all API routes. Cheap to clone.
#[derive(Clone)]
pub struct ApiContext {
    pub settings: Arc<Settings>,
    pub workspaces: Arc<WorkspaceManager>,
    pub embedder: SharedEmbedder,
    pub vectors: SqliteVectorDb,
    /// `None` when no model is configured (e.g. missing API key).
    pub llm: Option<SharedLlm>,
}

impl ApiContext {
    pub fn new(
        settings: Settings,
        embedder: SharedEmbedder,
        vectors: SqliteVectorDb,
        llm: Option<SharedLlm>,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            workspaces: Arc::new(WorkspaceManager::new()),
            embedder,
            vectors,
            llm,
        }
    }

    /// Build every service the settings describe.
    pub fn from_settings(settings: Settings) -> Result<Self, String> {
        let embedder =
            build_embedder(&settings).map_err(|e| format!("Cannot initialise embedder: {e}"))?;
        let vectors = SqliteVectorDb::open(&settings.vector_db_path)
            .map_err(|e| format!("Cannot open vector database: {e}"))?;
        let stale = vectors
            .purge()
            .map_err(|e| format!("Cannot purge vector database: {e}"))?;
        if stale > 0 {
            tracing::info!(chunks = stale, "Dropped vector chunks from a previous run");
        }
        let llm =
            build_llm_client(&settings).map_err(|e| format!("Cannot initialise LLM client: {e}"))?;

        tracing::info!(
            provider = ?settings.llm_provider,
            model = %settings.model,
            embedder = ?settings.embedder,
            vector_db = %settings.vector_db_path.display(),
            llm_configured = llm.is_some(),
            "API context ready"
        );

        Ok(Self::new(settings, embedder, vectors, llm))
    }

    pub fn llm_configured(&self) -> bool {
        self.llm.is_some()
    }

    /// The configured LLM, or 503 when there is none.
    pub fn llm(&self) -> Result<SharedLlm, ApiError> {
        self.llm.clone().ok_or_else(|| {
            ApiError::Unavailable("No LLM is configured; set OPENAI_API_KEY or use Ollama".into())
        })
    }

    pub fn workspace(&self, id: &str) -> Result<SharedWorkspace, ApiError> {
        Ok(self.workspaces.get(parse_workspace_id(id)?)?)
    }

    pub fn collection(&self, name: &str) -> SqliteCollection {
        self.vectors.collection(name)
    }
}

pub fn parse_workspace_id(id: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(id).map_err(|_| ApiError::BadRequest(format!("Invalid workspace id: {id}")))
}


#[cfg(test)]
mod tests {
    use super::test_support::test_context;
    use super::*;
    use crate::pipeline::llm::MockLlmClient;

    #[test]
    fn invalid_workspace_id_is_bad_request() {
        assert!(matches!(parse_workspace_id("nope"), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn unknown_workspace_is_not_found() {
        let ctx = test_context(None);
        let id = Uuid::new_v4().to_string();
        assert!(matches!(ctx.workspace(&id), Err(ApiError::NotFound(_))));
    }

    #[test]
    fn startup_purges_unreachable_collections() {
        use crate::pipeline::storage::{TextChunk, VectorStore};

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vectors.db");
        {
            let db = SqliteVectorDb::open(&path).unwrap();
            let chunk = TextChunk {
                content: "이전 실행의 청크".into(),
                chunk_index: 0,
                section_title: None,
                char_offset: 0,
            };
            db.collection("ws_previous")
                .store_chunks(&[chunk], &[vec![1.0, 0.0]])
                .unwrap();
        }

        let db_path = path.to_string_lossy().to_string();
        let settings = Settings::from_lookup(|key| match key {
            "REPORTGEN_VECTOR_DB" => Some(db_path.clone()),
            "REPORTGEN_EMBEDDER" => Some("hash".into()),
            _ => None,
        });
        let ctx = ApiContext::from_settings(settings).unwrap();
        assert_eq!(ctx.collection("ws_previous").count().unwrap(), 0);
    }

    #[test]
    fn missing_llm_is_unavailable() {
        let ctx = test_context(None);
        assert!(!ctx.llm_configured());
        assert!(matches!(ctx.llm(), Err(ApiError::Unavailable(_))));

        let ctx = test_context(Some(MockLlmClient::new("ok")));
        assert!(ctx.llm().is_ok());
    }
}
