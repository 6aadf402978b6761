//! HTTP API router.
//!
//! Every route lives under `/api/`. Handlers take `State<ApiContext>`.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, patch, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::endpoints;
use crate::api::types::ApiContext;

/// Room for multipart boundaries and headers on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Build the API router.
pub fn api_router(ctx: ApiContext) -> Router {
    let body_limit = ctx.settings.max_upload_bytes + MULTIPART_OVERHEAD_BYTES;

    // NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
    let api = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/workspaces", post(endpoints::workspaces::create))
        .route(
            "/workspaces/:id",
            get(endpoints::workspaces::get).delete(endpoints::workspaces::delete),
        )
        .route("/workspaces/:id/reset", post(endpoints::workspaces::reset))
        .route(
            "/workspaces/:id/readiness",
            get(endpoints::workspaces::readiness),
        )
        .route(
            "/workspaces/:id/reference",
            post(endpoints::documents::upload_reference),
        )
        .route(
            "/workspaces/:id/source",
            post(endpoints::documents::upload_source),
        )
        .route("/workspaces/:id/toc", get(endpoints::toc::get))
        .route(
            "/workspaces/:id/toc/sections",
            post(endpoints::toc::add_section),
        )
        .route(
            "/workspaces/:id/toc/sections/:index",
            patch(endpoints::toc::update_section).delete(endpoints::toc::delete_section),
        )
        .route(
            "/workspaces/:id/toc/from-reference",
            post(endpoints::toc::from_reference),
        )
        .route(
            "/workspaces/:id/toc/validation",
            get(endpoints::toc::validation),
        )
        .route(
            "/workspaces/:id/settings",
            get(endpoints::settings::get).put(endpoints::settings::put),
        )
        .route("/workspaces/:id/report", get(endpoints::report::get))
        .route(
            "/workspaces/:id/report/generate",
            post(endpoints::report::generate),
        )
        .route(
            "/workspaces/:id/report/continue",
            post(endpoints::report::resume),
        )
        .route(
            "/workspaces/:id/report/download",
            get(endpoints::report::download),
        )
        .route(
            "/workspaces/:id/report/images",
            get(endpoints::report::images),
        )
        .route(
            "/workspaces/:id/report/refine",
            post(endpoints::report::refine),
        )
        .with_state(ctx);

    Router::new()
        .nest("/api", api)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
