//! API endpoint handlers.
//!
//! Each module covers one workspace resource.

pub mod documents;
pub mod health;
pub mod report;
pub mod settings;
pub mod toc;
pub mod workspaces;
