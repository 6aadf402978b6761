use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::StorageError;
use super::types::EmbeddingModel;
use crate::config::{EmbedderKind, Settings};

/// Embedding dimension for all-MiniLM-L6-v2 and the hashing embedder
pub const EMBEDDING_DIM: usize = 384;

/// Inputs per request to the hosted embeddings endpoint.
const OPENAI_BATCH_SIZE: usize = 96;

pub type SharedEmbedder = Arc<dyn EmbeddingModel + Send + Sync>;

/// Build the embedder selected in the runtime settings.
pub fn build_embedder(settings: &Settings) -> Result<SharedEmbedder, StorageError> {
    match settings.embedder {
        EmbedderKind::OpenAi => {
            let key = settings.openai_api_key.clone().ok_or_else(|| {
                StorageError::ModelInit("OPENAI_API_KEY is required for OpenAI embeddings".into())
            })?;
            Ok(Arc::new(OpenAiEmbedder::new(
                &settings.openai_base_url,
                &key,
                &settings.embedding_model,
            )?))
        }
        EmbedderKind::Onnx => build_onnx_embedder(),
        EmbedderKind::Hash => Ok(Arc::new(HashEmbedder::new())),
    }
}

#[cfg(feature = "onnx-embeddings")]
fn build_onnx_embedder() -> Result<SharedEmbedder, StorageError> {
    Ok(Arc::new(OnnxEmbedder::load(&crate::config::embedding_model_dir())?))
}

#[cfg(not(feature = "onnx-embeddings"))]
fn build_onnx_embedder() -> Result<SharedEmbedder, StorageError> {
    Err(StorageError::ModelInit(
        "built without the onnx-embeddings feature".into(),
    ))
}

fn l2_normalize(vec: &mut [f32]) {
    let norm: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for val in vec.iter_mut() {
            *val /= norm;
        }
    }
}

// ═══════════════════════════════════════════════════════════
// OpenAI embeddings API
// ═══════════════════════════════════════════════════════════

/// Hosted embeddings (`text-embedding-3-small` by default).
pub struct OpenAiEmbedder {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::blocking::Client,
}

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAiEmbedder {
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Result<Self, StorageError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .map_err(|e| StorageError::ModelInit(format!("HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            client,
        })
    }

    fn request(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, StorageError> {
        let url = format!("{}/embeddings", self.base_url);
        let body = EmbeddingsRequest {
            model: &self.model,
            input: texts,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(|e| StorageError::Embedding(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(StorageError::EmbeddingService {
                status: status.as_u16(),
                body,
            });
        }

        let mut parsed: EmbeddingsResponse = response
            .json()
            .map_err(|e| StorageError::Embedding(format!("Malformed response: {e}")))?;

        if parsed.data.len() != texts.len() {
            return Err(StorageError::Embedding(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                parsed.data.len()
            )));
        }

        parsed.data.sort_by_key(|item| item.index);
        Ok(parsed.data.into_iter().map(|item| item.embedding).collect())
    }
}

impl EmbeddingModel for OpenAiEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, StorageError> {
        self.request(&[text])?
            .pop()
            .ok_or_else(|| StorageError::Embedding("Empty embedding response".into()))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, StorageError> {
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(OPENAI_BATCH_SIZE) {
            out.extend(self.request(batch)?);
        }
        tracing::debug!(count = out.len(), model = %self.model, "Embedded batch");
        Ok(out)
    }

    fn dimension(&self) -> usize {
        if self.model.contains("3-large") {
            3072
        } else {
            1536
        }
    }
}

// ═══════════════════════════════════════════════════════════
// ONNX Embedder, behind the `onnx-embeddings` feature
// ═══════════════════════════════════════════════════════════

#[cfg(feature = "onnx-embeddings")]
mod onnx {
    use super::{l2_normalize, EmbeddingModel, StorageError, EMBEDDING_DIM};
    use ort::session::Session;
    use std::path::Path;
    use std::sync::Mutex;

    /// Local all-MiniLM-L6-v2 inference.
    ///
    /// `model_dir` holds `model.onnx` and `tokenizer.json`. The session sits
    /// behind a Mutex because `Session::run` takes `&mut self`.
    pub struct OnnxEmbedder {
        session: Mutex<Session>,
        tokenizer: tokenizers::Tokenizer,
    }

    impl OnnxEmbedder {
        pub fn load(model_dir: &Path) -> Result<Self, StorageError> {
            let model_path = model_dir.join("model.onnx");
            let tokenizer_path = model_dir.join("tokenizer.json");

            for path in [&model_path, &tokenizer_path] {
                if !path.exists() {
                    return Err(StorageError::ModelNotFound(path.clone()));
                }
            }

            let session = Session::builder()
                .and_then(|b| b.with_intra_threads(2))
                .and_then(|b| b.commit_from_file(&model_path))
                .map_err(|e: ort::Error| StorageError::ModelInit(format!("ONNX load failed: {e}")))?;

            let tokenizer = tokenizers::Tokenizer::from_file(&tokenizer_path)
                .map_err(|e| StorageError::ModelInit(format!("Tokenizer load failed: {e}")))?;

            tracing::info!(dir = %model_dir.display(), "ONNX embedder loaded");

            Ok(Self {
                session: Mutex::new(session),
                tokenizer,
            })
        }

        fn infer(&self, text: &str) -> Result<Vec<f32>, StorageError> {
            use ort::value::TensorRef;

            let encoding = self
                .tokenizer
                .encode(text, true)
                .map_err(|e| StorageError::Tokenization(e.to_string()))?;

            let to_i64 = |v: &[u32]| v.iter().map(|&x| x as i64).collect::<Vec<i64>>();
            let input_ids = to_i64(encoding.get_ids());
            let attention_mask = to_i64(encoding.get_attention_mask());
            let token_type_ids = to_i64(encoding.get_type_ids());
            let seq_len = input_ids.len();

            let shaped = |v: Vec<i64>| {
                ndarray::Array2::from_shape_vec((1, seq_len), v)
                    .map_err(|e| StorageError::Embedding(e.to_string()))
            };
            let ids_array = shaped(input_ids)?;
            let mask_array = shaped(attention_mask.clone())?;
            let type_array = shaped(token_type_ids)?;

            let tensor_err = |e: ort::Error| StorageError::Embedding(e.to_string());
            let ids_tensor = TensorRef::from_array_view(&ids_array).map_err(tensor_err)?;
            let mask_tensor = TensorRef::from_array_view(&mask_array).map_err(tensor_err)?;
            let type_tensor = TensorRef::from_array_view(&type_array).map_err(tensor_err)?;

            let mut session = self
                .session
                .lock()
                .map_err(|_| StorageError::Embedding("Session lock poisoned".to_string()))?;

            let outputs = session
                .run(ort::inputs![ids_tensor, mask_tensor, type_tensor])
                .map_err(|e| StorageError::Embedding(format!("ONNX inference failed: {e}")))?;

            // [1, seq_len, 384] token states
            let (shape, states) = outputs[0]
                .try_extract_tensor::<f32>()
                .map_err(|e| StorageError::Embedding(format!("Output extraction: {e}")))?;

            if shape.len() != 3 || shape[2] as usize != EMBEDDING_DIM {
                return Err(StorageError::Embedding(format!(
                    "Unexpected output shape: {shape:?}"
                )));
            }

            Ok(mean_pool(states, &attention_mask))
        }
    }

    /// Attention-masked mean over token states, then L2 normalization.
    fn mean_pool(states: &[f32], mask: &[i64]) -> Vec<f32> {
        let mut pooled = vec![0.0f32; EMBEDDING_DIM];
        let mut mask_sum = 0.0f32;

        for (token_idx, &m) in mask.iter().enumerate() {
            let weight = m as f32;
            mask_sum += weight;
            let row = &states[token_idx * EMBEDDING_DIM..(token_idx + 1) * EMBEDDING_DIM];
            for (p, s) in pooled.iter_mut().zip(row) {
                *p += s * weight;
            }
        }

        if mask_sum > 0.0 {
            pooled.iter_mut().for_each(|v| *v /= mask_sum);
        }
        l2_normalize(&mut pooled);
        pooled
    }

    impl EmbeddingModel for OnnxEmbedder {
        fn embed(&self, text: &str) -> Result<Vec<f32>, StorageError> {
            self.infer(text)
        }

        fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, StorageError> {
            texts.iter().map(|t| self.infer(t)).collect()
        }

        fn dimension(&self) -> usize {
            EMBEDDING_DIM
        }
    }
}

#[cfg(feature = "onnx-embeddings")]
pub use onnx::OnnxEmbedder;

// ═══════════════════════════════════════════════════════════
// Hashing embedder (offline, deterministic)
// ═══════════════════════════════════════════════════════════

/// Feature-hashing embedder over words and character bigrams.
///
/// Needs no model or network. Texts sharing vocabulary land close together,
/// which is enough for section-title retrieval in offline runs and tests.
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new() -> Self {
        Self {
            dimension: EMBEDDING_DIM,
        }
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

impl EmbeddingModel for HashEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, StorageError> {
        Ok(hashed_vector(text, self.dimension))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, StorageError> {
        Ok(texts
            .iter()
            .map(|t| hashed_vector(t, self.dimension))
            .collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for b in bytes {
        hash ^= *b as u64;
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    hash
}

fn add_feature(vec: &mut [f32], feature: &str, weight: f32) {
    let hash = fnv1a(feature.as_bytes());
    let slot = (hash % vec.len() as u64) as usize;
    let sign = if (hash >> 63) == 0 { 1.0 } else { -1.0 };
    vec[slot] += sign * weight;
}

fn hashed_vector(text: &str, dim: usize) -> Vec<f32> {
    let mut vec = vec![0.0f32; dim];
    let lowered = text.to_lowercase();

    for word in lowered
        .split(|c: char| !c.is_alphanumeric() && c != '-')
        .filter(|w| !w.is_empty())
    {
        add_feature(&mut vec, word, 1.0);

        let chars: Vec<char> = word.chars().collect();
        for pair in chars.windows(2) {
            let bigram: String = pair.iter().collect();
            add_feature(&mut vec, &bigram, 0.5);
        }
    }

    l2_normalize(&mut vec);
    vec
}
