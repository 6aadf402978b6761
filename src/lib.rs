pub mod api;
pub mod config;
pub mod pipeline;
pub mod toc;
pub mod workspace;

use tracing_subscriber::EnvFilter;

use crate::config::Settings;

/// Start the report service and run until Ctrl-C.
pub async fn run() -> Result<(), String> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let settings = Settings::from_env();
    let addr = settings.bind_addr;
    let ctx = api::ApiContext::from_settings(settings)?;
    let server = api::start_server(ctx, addr).await?;
    tracing::info!(addr = %server.addr, "Listening");

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Cannot listen for shutdown signal: {e}");
    }
    server.shutdown().await;
    Ok(())
}
