pub mod types;
pub mod tokens;
pub mod year_filter;
pub mod prompt;
pub mod images;
pub mod orchestrator;

pub use types::*;
pub use tokens::*;
pub use year_filter::*;
pub use prompt::*;
pub use images::*;
pub use orchestrator::*;

use thiserror::Error;

use crate::pipeline::llm::LlmError;
use crate::pipeline::storage::StorageError;

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Retrieval error: {0}")]
    Retrieval(#[from] StorageError),

    #[error("Table of contents is empty")]
    EmptyToc,

    #[error("Start index {start} is past the end of the table of contents ({total} sections)")]
    InvalidStartIndex { start: usize, total: usize },
}
