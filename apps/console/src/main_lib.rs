use std::path::Path;

use prime_market_data::{MarketDataConfig, MarketDataService};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

pub fn init_tracing() {
    let log_format = std::env::var("PRIME_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    // Output goes to stderr so stdout carries only command results.
    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_line_number(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

pub fn build_service(config_path: &Path) -> anyhow::Result<MarketDataService> {
    let config = MarketDataConfig::from_file(config_path)?;
    tracing::info!(
        "Loaded {} exchange descriptions from {}",
        config.exchanges.len(),
        config_path.display()
    );
    Ok(MarketDataService::from_config(&config)?)
}
