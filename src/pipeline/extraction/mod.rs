pub mod types;
pub mod sanitize;
pub mod pdf;
pub mod terms;
pub mod structure;
pub mod style;

pub use types::*;
pub use sanitize::*;
pub use pdf::*;
pub use terms::*;
pub use structure::*;
pub use style::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF parsing failed: {0}")]
    PdfParsing(String),

    #[error("PDF contains no extractable text")]
    NoText,

    #[error("Unsupported format for extraction: {0}")]
    UnsupportedFormat(String),
}
