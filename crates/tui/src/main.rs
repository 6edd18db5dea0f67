mod app;
mod form;

use std::{fs::OpenOptions, sync::Mutex};

use anyhow::{Context, Result};
use gamedb_core::{
    config::{self, AppConfig},
    resource::ApiClient,
    session::{FileTokenStore, SessionGuard},
};
use tracing::info;
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    config::ensure_default_config()?;
    let config = AppConfig::load()?;
    init_logging(&config)?;
    info!(api = %config.api_base_url, "starting gamedb");

    let session = SessionGuard::restore(FileTokenStore::new(config.token_path()));
    let api = ApiClient::new(&config, session)?;

    let mut app = app::GamedbApp::new(api);
    app.run().await
}

/// Log to `<state_dir>/logs/gamedb.log`; the terminal belongs to the UI.
fn init_logging(config: &AppConfig) -> Result<()> {
    let log_dir = config.log_dir();
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create {}", log_dir.display()))?;
    let log_path = log_dir.join("gamedb.log");
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open {}", log_path.display()))?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .compact()
        .with_writer(Mutex::new(file));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .init();

    Ok(())
}
