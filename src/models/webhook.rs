//! Outbound side: Discord webhook execute payloads.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Discord webhook message payload
#[derive(Debug, Clone, Default, Serialize)]
pub struct WebhookMessage {
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub embeds: Vec<DiscordEmbed>,
}

/// Discord embed structure. Unset properties are left out of the JSON so the
/// client falls back to its own defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DiscordEmbed {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Six hex digits, no leading `#`.
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_color"
    )]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<DiscordThumbnail>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<DiscordFooter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<DiscordAuthor>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<DiscordField>,
}

impl DiscordEmbed {
    pub fn add_field(&mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) {
        self.fields.push(DiscordField {
            name: name.into(),
            value: value.into(),
            inline,
        });
    }
}

/// Small thumbnail image for Discord embeds
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscordThumbnail {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscordFooter {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscordAuthor {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

/// Key-value field for Discord embeds
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscordField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

// The API takes colors as integers.
fn serialize_color<S>(color: &Option<String>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match color {
        Some(hex) => {
            let value = u32::from_str_radix(hex, 16).map_err(serde::ser::Error::custom)?;
            serializer.serialize_u32(value)
        }
        None => serializer.serialize_none(),
    }
}
