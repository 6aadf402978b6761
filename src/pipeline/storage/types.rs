use serde::{Deserialize, Serialize};

use super::StorageError;

/// A chunk of source-document text, the unit of retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextChunk {
    pub content: String,
    pub chunk_index: usize,
    pub section_title: Option<String>,
    pub char_offset: usize,
}

impl TextChunk {
    /// Stable id inside a collection.
    pub fn id(&self) -> String {
        format!("chunk_{}", self.chunk_index)
    }
}

/// A chunk with its relevance score (from vector search)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk_id: String,
    pub content: String,
    pub score: f32,
    pub section_title: Option<String>,
}

/// Chunking strategy trait
pub trait Chunker {
    fn chunk(&self, text: &str) -> Vec<TextChunk>;
}

/// Embedding model abstraction
pub trait EmbeddingModel {
    fn embed(&self, text: &str) -> Result<Vec<f32>, StorageError>;
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, StorageError>;
    fn dimension(&self) -> usize;
}

/// Allow a shared embedder to be used as `&impl EmbeddingModel`.
impl EmbeddingModel for std::sync::Arc<dyn EmbeddingModel + Send + Sync> {
    fn embed(&self, text: &str) -> Result<Vec<f32>, StorageError> {
        (**self).embed(text)
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, StorageError> {
        (**self).embed_batch(texts)
    }

    fn dimension(&self) -> usize {
        (**self).dimension()
    }
}

/// Write side of a document collection.
pub trait VectorStore {
    fn store_chunks(
        &self,
        chunks: &[TextChunk],
        embeddings: &[Vec<f32>],
    ) -> Result<usize, StorageError>;

    /// Swap the whole collection for `chunks` in one step. On error the
    /// previous contents stay in place.
    fn replace_chunks(
        &self,
        chunks: &[TextChunk],
        embeddings: &[Vec<f32>],
    ) -> Result<usize, StorageError>;

    /// Drop every chunk in the collection.
    fn clear(&self) -> Result<(), StorageError>;

    fn count(&self) -> Result<usize, StorageError>;
}

/// Read side of a document collection.
pub trait VectorSearch {
    fn search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>, StorageError>;
}

/// Cosine similarity; 0.0 for mismatched or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

/// Chunk, embed and store a document into a collection, replacing what was there.
pub fn index_document(
    text: &str,
    chunker: &dyn Chunker,
    embedder: &dyn EmbeddingModel,
    store: &dyn VectorStore,
) -> Result<usize, StorageError> {
    let chunks = chunker.chunk(text);
    if chunks.is_empty() {
        return Err(StorageError::EmptyChunks);
    }

    let texts: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
    let embeddings = embedder.embed_batch(&texts)?;

    let stored = store.replace_chunks(&chunks, &embeddings)?;

    tracing::info!(chunks = stored, "Source document indexed");
    Ok(stored)
}
