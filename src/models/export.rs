//! Input side: the JSON document written by the chat export tool.
//!
//! Every optional property is an explicit `Option`. Whether an optional
//! string actually carries a value is decided by
//! [`crate::transcoder::is_present`], so an empty string and a missing key
//! behave the same way.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// A full channel export.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatExport {
    #[serde(default)]
    pub guild: Option<GuildInfo>,
    #[serde(default)]
    pub channel: Option<ChannelInfo>,
    pub messages: Vec<Message>,
    #[serde(default)]
    pub message_count: Option<u64>,
}

impl ChatExport {
    /// Reads the whole file into memory, then parses it.
    ///
    /// The file handle is dropped before parsing starts.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read export file {}", path.display()))?;

        Self::from_json(&raw).with_context(|| format!("Invalid export file {}", path.display()))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let export = serde_json::from_str(raw).context("Failed to parse chat export JSON")?;
        Ok(export)
    }

    /// Human readable `guild / #channel` label, if the export names them.
    pub fn source_label(&self) -> Option<String> {
        match (&self.guild, &self.channel) {
            (Some(guild), Some(channel)) => Some(format!("{} / #{}", guild.name, channel.name)),
            (None, Some(channel)) => Some(format!("#{}", channel.name)),
            (Some(guild), None) => Some(guild.name.clone()),
            (None, None) => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GuildInfo {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChannelInfo {
    pub name: String,
}

/// One exported chat message.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(default)]
    pub id: Option<String>,
    pub timestamp: String,
    #[serde(default)]
    pub timestamp_edited: Option<String>,
    #[serde(default)]
    pub is_pinned: bool,
    #[serde(default)]
    pub content: Option<String>,
    /// `None` only for malformed records; transcoding rejects it.
    #[serde(default)]
    pub author: Option<Author>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    /// A missing `embeds` key is the same as an empty list.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub embeds: Vec<SourceEmbed>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub id: String,
    pub name: String,
    /// Legacy four digit tag.
    #[serde(default)]
    pub discriminator: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
    /// `#RRGGBB`
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// Exported file attachment. Carried through parsing but never replayed.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub url: String,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub file_size_bytes: Option<u64>,
}

impl Attachment {
    pub fn display_name(&self) -> &str {
        self.file_name.as_deref().unwrap_or(&self.url)
    }
}

/// Rich embed as it appeared in the original channel.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceEmbed {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<EmbedThumbnail>,
    #[serde(default)]
    pub footer: Option<EmbedFooter>,
    #[serde(default)]
    pub fields: Option<Vec<EmbedField>>,
    /// Parsed but intentionally never mapped onto the outbound embed.
    #[allow(dead_code)]
    #[serde(default)]
    pub author: Option<EmbedAuthor>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbedThumbnail {
    pub url: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbedFooter {
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub is_inline: bool,
}

#[allow(dead_code)]
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbedAuthor {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub icon_url: Option<String>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
