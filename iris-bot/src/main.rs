//! Iris Bot - Main entry point.

use anyhow::Result;
use iris_common::config::Config;
use iris_common::logging::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::load_with_env()?;

    // Initialize logging
    init_logging(
        &config.observability.log_level,
        &config.observability.log_format,
    );

    tracing::info!("Iris Bot v{}", env!("CARGO_PKG_VERSION"));

    // Start the long-poll loop
    iris_bot::run(&config).await
}
