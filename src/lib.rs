pub mod access; // Row-level scoped store
pub mod api; // HTTP surface
pub mod authorization; // Access policy predicates
pub mod config;
pub mod core_state;
pub mod crypto;
pub mod db;
pub mod identity; // Accounts and sessions
pub mod models;
pub mod navigation;
pub mod pages; // List/dashboard view-models

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

/// Failures that stop the server from starting.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    #[error(transparent)]
    Core(#[from] core_state::CoreError),
    #[error("Cannot bind API server: {0}")]
    Bind(#[from] std::io::Error),
}

/// Start the portal: tracing, config, database, HTTP server. Returns
/// after Ctrl-C once in-flight requests are done and the audit buffer
/// has been flushed.
pub async fn run() -> Result<(), StartupError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = config::AppConfig::from_env()?;
    let bind_addr = config.bind_addr;
    let core = Arc::new(core_state::CoreState::new(config));
    core.initialize()?;

    let mut server = api::start_server(core.clone(), bind_addr).await?;
    tracing::info!(addr = %server.session.server_addr, "Listening");

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Cannot listen for shutdown signal: {e}");
    }
    server.shutdown();
    server.stopped().await;

    if let Err(e) = core.flush_and_prune_audit() {
        tracing::warn!("Final audit flush failed: {e}");
    }
    tracing::info!("{} stopped", config::APP_NAME);
    Ok(())
}
