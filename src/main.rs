use anyhow::Result;
use clap::Parser;
use tracing::info;

mod config;
mod discord;
mod error;
mod importer;
mod models;
mod transcoder;

use config::{Cli, Config};
use discord::DiscordWebhook;
use importer::ChatImporter;
use models::ChatExport;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = Config::from(Cli::parse());

    info!("Loading chat export from {}", config.export_path.display());
    let export = ChatExport::from_path(&config.export_path)?;

    let webhook = DiscordWebhook::new(config.webhook_url, config.max_rate_limit_retries);
    let importer = ChatImporter::new(webhook, config.shape, config.progress);

    importer.run(&export).await?;

    Ok(())
}
