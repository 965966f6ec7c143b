mod auth;
mod cli;
mod error;
mod executor;
mod output;
mod providers;
mod report;
mod results;
mod uploader;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use log::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    cli.init_logger();

    info!("Starting allure-publisher");
    cli.execute().await?;

    Ok(())
}
