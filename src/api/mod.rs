//! HTTP API.
//!
//! JSON endpoints over workspaces: document upload, TOC editing,
//! generation settings, report generation and refinement. Routes are
//! nested under `/api/`; `api_router()` returns a `Router` that can be
//! mounted on any axum server.

pub mod endpoints;
pub mod error;
pub mod router;
pub mod server;
pub mod types;

pub use router::api_router;
pub use server::{start_server, ApiServer};
pub use types::ApiContext;
