pub mod types;
pub mod chunker;
pub mod embedder;
pub mod vectordb;

pub use types::*;

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Vector DB error: {0}")]
    VectorDb(String),

    #[error("Embedding model not found: {0}")]
    ModelNotFound(PathBuf),

    #[error("Embedding model initialization: {0}")]
    ModelInit(String),

    #[error("Tokenization error: {0}")]
    Tokenization(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Embedding service returned error (status {status}): {body}")]
    EmbeddingService { status: u16, body: String },

    #[error("Chunking produced no results")]
    EmptyChunks,
}
