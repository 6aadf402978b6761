pub mod sections;
pub mod request;
pub mod orchestrator;

pub use sections::*;
pub use request::*;
pub use orchestrator::*;

use thiserror::Error;

use crate::pipeline::generation::GenerationError;

#[derive(Error, Debug)]
pub enum RefinementError {
    #[error("Modification request is empty")]
    EmptyRequest,

    #[error("Report has no sections to refine")]
    EmptyReport,

    #[error("Section {0} is not in the report")]
    SectionNotFound(String),

    #[error(transparent)]
    Generation(#[from] GenerationError),
}
