use anyhow::Result;
use tracing::info;

mod config;
mod server;
mod telemetry;

use config::ServerConfig;

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init();

    info!("Parley server starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = ServerConfig::from_env()
        .map_err(|e| anyhow::anyhow!("Failed to load server configuration: {}", e))?;
    config.log_config();

    server::start(config).await
}
