mod commands;
mod config;
mod main_lib;

use clap::Parser;
use commands::Cli;
use config::Config;
use main_lib::{build_service, init_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env();
    init_tracing();

    let config_path = cli.config.clone().unwrap_or(config.config_path);
    let service = build_service(&config_path)?;

    let output = commands::run(&service, cli.cmd).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
