use std::net::SocketAddr;
use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "ReportGen";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default token ceiling for a generated report.
pub const DEFAULT_MAX_TOKEN_LIMIT: usize = 128_000;

/// Default upload ceiling for a single PDF (MB).
pub const DEFAULT_MAX_UPLOAD_MB: usize = 50;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8501";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";
pub const DEFAULT_OPENAI_EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.1";

/// Default tracing filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "reportgen_lib=info,reportgen=info,tower_http=info"
}

/// Get the application data directory.
/// ~/ReportGen/ on all platforms, unless `REPORTGEN_DATA_DIR` is set.
pub fn app_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("REPORTGEN_DATA_DIR") {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// SQLite file backing every workspace's vector collection.
pub fn vector_db_path() -> PathBuf {
    app_data_dir().join("vectors.db")
}

/// Get the embedding model directory (all-MiniLM-L6-v2)
pub fn embedding_model_dir() -> PathBuf {
    app_data_dir().join("models").join("all-MiniLM-L6-v2")
}

/// Which hosted or local model answers generation requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    OpenAi,
    Ollama,
}

/// Which embedding backend indexes source documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedderKind {
    OpenAi,
    Onnx,
    Hash,
}

/// Runtime settings, read once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub bind_addr: SocketAddr,
    pub llm_provider: LlmProvider,
    pub embedder: EmbedderKind,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub model: String,
    pub embedding_model: String,
    pub ollama_url: String,
    pub max_token_limit: usize,
    pub max_upload_bytes: usize,
    pub vector_db_path: PathBuf,
}

impl Settings {
    /// Build settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup (tests inject a map).
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let openai_api_key = get("OPENAI_API_KEY");

        let llm_provider = match get("REPORTGEN_LLM_PROVIDER").as_deref() {
            Some("ollama") => LlmProvider::Ollama,
            Some("openai") | None => LlmProvider::OpenAi,
            Some(other) => {
                tracing::warn!(value = other, "Unknown LLM provider, falling back to openai");
                LlmProvider::OpenAi
            }
        };

        let embedder = match get("REPORTGEN_EMBEDDER").as_deref() {
            Some("openai") => EmbedderKind::OpenAi,
            Some("onnx") => EmbedderKind::Onnx,
            Some("hash") => EmbedderKind::Hash,
            Some(other) => {
                tracing::warn!(value = other, "Unknown embedder, choosing from available keys");
                default_embedder(openai_api_key.is_some())
            }
            None => default_embedder(openai_api_key.is_some()),
        };

        let model = get("REPORTGEN_MODEL").unwrap_or_else(|| match llm_provider {
            LlmProvider::OpenAi => DEFAULT_OPENAI_MODEL.to_string(),
            LlmProvider::Ollama => DEFAULT_OLLAMA_MODEL.to_string(),
        });

        let bind_addr = get("REPORTGEN_BIND")
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(|| {
                DEFAULT_BIND_ADDR
                    .parse()
                    .unwrap_or_else(|_| SocketAddr::from(([127, 0, 0, 1], 8501)))
            });

        let max_token_limit = get("MAX_TOKEN_LIMIT")
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_TOKEN_LIMIT);

        let max_upload_mb = get("REPORTGEN_MAX_UPLOAD_MB")
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_UPLOAD_MB);

        Self {
            bind_addr,
            llm_provider,
            embedder,
            openai_api_key,
            openai_base_url: get("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            model,
            embedding_model: get("REPORTGEN_EMBEDDING_MODEL")
                .unwrap_or_else(|| DEFAULT_OPENAI_EMBEDDING_MODEL.to_string()),
            ollama_url: get("OLLAMA_URL").unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
            max_token_limit,
            max_upload_bytes: max_upload_mb * 1024 * 1024,
            vector_db_path: get("REPORTGEN_VECTOR_DB")
                .map(PathBuf::from)
                .unwrap_or_else(vector_db_path),
        }
    }
}

fn default_embedder(has_openai_key: bool) -> EmbedderKind {
    if has_openai_key {
        EmbedderKind::OpenAi
    } else if cfg!(feature = "onnx-embeddings") {
        EmbedderKind::Onnx
    } else {
        EmbedderKind::Hash
    }
}
