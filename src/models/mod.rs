//! Data models for chat exports and Discord webhook payloads

pub mod export;
pub mod webhook;

pub use export::{Author, ChatExport, Message, SourceEmbed};
pub use webhook::{DiscordAuthor, DiscordEmbed, DiscordFooter, DiscordThumbnail, WebhookMessage};
