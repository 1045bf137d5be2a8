use color_eyre::eyre::Result;
use dotenv::dotenv;
use officehours_api::{config::ApiConfig, init_tracing, start_server, ApiState};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Load environment variables
    dotenv().ok();

    // Load configuration
    let config = ApiConfig::from_env()?;
    init_tracing(config.log_level)?;

    // Storage and services
    let state = ApiState::from_config(&config).await?;

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown requested");
        }
        signal.cancel();
    });

    // Start API server
    start_server(config, Arc::new(state), shutdown).await?;

    Ok(())
}
