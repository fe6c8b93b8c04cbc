use std::path::PathBuf;

use clap::Parser;

use crate::transcoder::OutputShape;

const DEFAULT_MAX_RETRIES: u32 = 5;

/// Replays a JSON chat export through a Discord webhook
#[derive(Debug, Parser)]
#[command(name = "chat-replay", version)]
pub struct Cli {
    /// JSON file written by the chat export tool
    #[arg(short, long, value_name = "FILE")]
    pub file: PathBuf,

    /// Webhook URL
    #[arg(short, long, env = "DISCORD_WEBHOOK_URL", value_name = "URL")]
    pub url: String,

    /// Payload layout
    #[arg(long, value_enum, default_value_t = OutputShape::Legacy)]
    pub shape: OutputShape,

    /// Show progress and echo every webhook response
    #[arg(long)]
    pub progress: bool,

    /// Give up on a message after this many rate-limited attempts
    #[arg(long, default_value_t = DEFAULT_MAX_RETRIES)]
    pub max_retries: u32,
}

/// Resolved run settings.
#[derive(Debug, Clone)]
pub struct Config {
    pub export_path: PathBuf,
    pub webhook_url: String,
    pub shape: OutputShape,
    pub progress: bool,
    pub max_rate_limit_retries: u32,
}

impl From<Cli> for Config {
    fn from(cli: Cli) -> Self {
        Self {
            export_path: cli.file,
            webhook_url: cli.url,
            shape: cli.shape,
            progress: cli.progress,
            max_rate_limit_retries: cli.max_retries,
        }
    }
}
