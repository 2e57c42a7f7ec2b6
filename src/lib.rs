pub mod api;
pub mod config;
pub mod core_state;
pub mod db;
pub mod models;
pub mod pipeline;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::config::{AppConfig, ConfigError};
use crate::core_state::{CoreError, CoreState};

/// Failures that stop the service before or while it serves.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Startup failed: {0}")]
    Core(#[from] CoreError),
    #[error("Async runtime error: {0}")]
    Runtime(#[from] std::io::Error),
    #[error("Server error: {0}")]
    Server(String),
}

/// Process entry point: logging, configuration, then serve until Ctrl-C.
pub fn run() -> Result<(), RunError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = AppConfig::from_env()?;
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(serve(config))
}

/// Build the shared state from `config` and serve the API until Ctrl-C.
pub async fn serve(config: AppConfig) -> Result<(), RunError> {
    tracing::info!(
        database = %config.database_path.display(),
        model = %config.text_model,
        min_ingredients = config.min_ingredients,
        images_enabled = config.images_enabled,
        "Configuration loaded"
    );

    let core = Arc::new(CoreState::from_config(&config)?);
    let mut server = api::start_api_server_on(core, config.bind_addr)
        .await
        .map_err(RunError::Server)?;
    tracing::info!(addr = %server.addr, "Listening");

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Cannot listen for shutdown signal: {e}");
    }

    server.shutdown();
    server.stopped().await;
    Ok(())
}
