//! # Message Transcoder
//!
//! Turns one exported chat message into one Discord webhook payload that
//! looks as close as possible to the original post.
//!
//! ## Output shapes
//!
//! - **Legacy**: identity embed first, then an "Edited" embed when the message
//!   was edited, then the text as an embed description (keeps the author
//!   color), then the copied source embeds.
//! - **Compact**: text goes into the native `content` field, the copied source
//!   embeds follow, and a single identity embed closes the list. Edits become
//!   an "Edited" field holding a `<t:epoch>` token.
//!
//! Source embeds are copied property by property. Their nested `author` block
//! is never copied.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::TranscodeError;
use crate::models::{
    Author, DiscordAuthor, DiscordEmbed, DiscordFooter, DiscordThumbnail, Message, SourceEmbed,
    WebhookMessage,
};

/// Payload layout used when replaying messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputShape {
    #[default]
    Legacy,
    Compact,
}

/// "Not null and not the empty string."
pub fn is_present(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.is_empty())
}

fn present(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|v| is_present(Some(*v)))
}

/// Drops everything from the first `?`, e.g. the `?size=128` the export tool
/// appends to avatar URLs.
pub fn strip_query(url: &str) -> &str {
    url.split_once('?').map_or(url, |(base, _)| base)
}

/// `#1A2B3C` becomes `1A2B3C`.
pub fn color_hex(color: &str) -> Result<String, TranscodeError> {
    let hex = color.trim_start_matches('#');
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(TranscodeError::InvalidColor {
            value: color.to_string(),
        });
    }
    Ok(hex.to_string())
}

/// ISO-8601 with an offset, either `+hh:mm` or `+hhmm`. A bare local time
/// is read as UTC.
pub fn parse_timestamp(field: &'static str, value: &str) -> Result<DateTime<Utc>, TranscodeError> {
    let source = match DateTime::parse_from_rfc3339(value) {
        Ok(parsed) => return Ok(parsed.with_timezone(&Utc)),
        Err(source) => source,
    };

    DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f%z")
        .map(|parsed| parsed.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").map(|naive| naive.and_utc())
        })
        .map_err(|_| TranscodeError::InvalidTimestamp {
            field,
            value: value.to_string(),
            source,
        })
}

pub fn profile_url(user_id: &str) -> String {
    format!("https://discordapp.com/users/{user_id}")
}

/// Builds the webhook payload for a single message.
pub fn transcode(message: &Message, shape: OutputShape) -> Result<WebhookMessage, TranscodeError> {
    let author = message.author.as_ref().ok_or(TranscodeError::MissingAuthor)?;

    let timestamp = parse_timestamp("timestamp", &message.timestamp)?;
    let edited = present(message.timestamp_edited.as_ref())
        .map(|value| parse_timestamp("timestampEdited", value))
        .transpose()?;
    let color = present(author.color.as_ref()).map(color_hex).transpose()?;
    let avatar_url = present(author.avatar_url.as_ref()).map(|url| strip_query(url).to_string());
    let content = present(message.content.as_ref());

    let source_embeds = message
        .embeds
        .iter()
        .map(map_source_embed)
        .collect::<Result<Vec<_>, _>>()?;

    let mut payload = WebhookMessage {
        username: author.name.clone(),
        avatar_url: avatar_url.clone(),
        content: None,
        embeds: Vec::with_capacity(source_embeds.len() + 3),
    };

    let mut identity = DiscordEmbed {
        color: color.clone(),
        timestamp: Some(timestamp),
        author: Some(DiscordAuthor {
            name: author.name.clone(),
            url: Some(profile_url(&author.id)),
            icon_url: avatar_url,
        }),
        ..DiscordEmbed::default()
    };

    match shape {
        OutputShape::Legacy => {
            add_identity_fields(&mut identity, author, message.is_pinned, &author.name);
            payload.embeds.push(identity);

            if let Some(edited) = edited {
                payload.embeds.push(DiscordEmbed {
                    color: color.clone(),
                    timestamp: Some(edited),
                    footer: Some(DiscordFooter {
                        text: "Edited".to_string(),
                    }),
                    ..DiscordEmbed::default()
                });
            }

            if let Some(content) = content {
                payload.embeds.push(DiscordEmbed {
                    description: Some(content.to_string()),
                    color,
                    ..DiscordEmbed::default()
                });
            }

            payload.embeds.extend(source_embeds);
        }
        OutputShape::Compact => {
            payload.content = content.map(str::to_string);
            payload.embeds.extend(source_embeds);

            let display_name = match present(author.discriminator.as_ref()) {
                Some(discriminator) => format!("{}#{discriminator}", author.name),
                None => author.name.clone(),
            };
            add_identity_fields(&mut identity, author, message.is_pinned, &display_name);
            if let Some(edited) = edited {
                identity.add_field("Edited", format!("<t:{}>", edited.timestamp()), true);
            }
            payload.embeds.push(identity);
        }
    }

    Ok(payload)
}

fn add_identity_fields(embed: &mut DiscordEmbed, author: &Author, is_pinned: bool, name: &str) {
    embed.add_field("Discord User", format!("<@{}>", author.id), true);
    embed.add_field("Name", name, true);

    if let Some(nickname) = present(author.nickname.as_ref())
        && nickname != author.name
    {
        embed.add_field("Nickname", nickname, true);
    }
    if author.is_bot {
        embed.add_field("isBot", "True", false);
    }
    if is_pinned {
        embed.add_field("isPinned", "True", author.is_bot);
    }
}

/// Copies one source embed. The nested `author` block is dropped.
pub fn map_source_embed(source: &SourceEmbed) -> Result<DiscordEmbed, TranscodeError> {
    let mut embed = DiscordEmbed {
        title: present(source.title.as_ref()).map(str::to_string),
        url: present(source.url.as_ref()).map(str::to_string),
        description: present(source.description.as_ref()).map(str::to_string),
        timestamp: present(source.timestamp.as_ref())
            .map(|value| parse_timestamp("embed timestamp", value))
            .transpose()?,
        color: present(source.color.as_ref()).map(color_hex).transpose()?,
        thumbnail: source.thumbnail.as_ref().map(|thumb| DiscordThumbnail {
            url: thumb.url.clone(),
            width: thumb.width,
            height: thumb.height,
        }),
        footer: source.footer.as_ref().map(|footer| DiscordFooter {
            text: footer.text.clone(),
        }),
        ..DiscordEmbed::default()
    };

    for field in source.fields.iter().flatten() {
        embed.add_field(&field.name, &field.value, field.is_inline);
    }

    Ok(embed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::export::{EmbedAuthor, EmbedField, EmbedFooter, EmbedThumbnail};

    fn author() -> Author {
        Author {
            id: "42".to_string(),
            name: "ferris".to_string(),
            discriminator: None,
            nickname: None,
            color: None,
            is_bot: false,
            avatar_url: Some("https://x/img.png?size=128".to_string()),
        }
    }

    fn message() -> Message {
        Message {
            id: Some("1".to_string()),
            timestamp: "2021-05-01T12:00:00+00:00".to_string(),
            timestamp_edited: Some(String::new()),
            is_pinned: false,
            content: Some("hello".to_string()),
            author: Some(author()),
            attachments: Vec::new(),
            embeds: vec![SourceEmbed {
                description: Some("quoted".to_string()),
                ..SourceEmbed::default()
            }],
        }
    }

    fn field_names(embed: &DiscordEmbed) -> Vec<&str> {
        embed.fields.iter().map(|f| f.name.as_str()).collect()
    }

    #[test]
    fn strips_query_string() {
        assert_eq!(strip_query("https://x/img.png?size=128"), "https://x/img.png");
        assert_eq!(strip_query("https://x/img.png"), "https://x/img.png");
    }

    #[test]
    fn color_loses_hash() {
        assert_eq!(color_hex("#1A2B3C").unwrap(), "1A2B3C");
        assert!(matches!(
            color_hex("#12345"),
            Err(TranscodeError::InvalidColor { .. })
        ));
    }

    #[test]
    fn presence_treats_empty_as_missing() {
        assert!(!is_present(None));
        assert!(!is_present(Some("")));
        assert!(is_present(Some("x")));
    }

    #[test]
    fn parses_offsets_and_naive_times() {
        let offset = parse_timestamp("t", "2021-05-01T14:00:00.500+02:00").unwrap();
        assert_eq!(offset.timestamp(), 1_619_870_400);
        assert_eq!(offset.timestamp_subsec_millis(), 500);

        let basic = parse_timestamp("t", "2021-05-01T12:00:00+0000").unwrap();
        assert_eq!(basic.timestamp(), 1_619_870_400);

        let basic_offset = parse_timestamp("t", "2021-05-01T14:00:00.250+0200").unwrap();
        assert_eq!(basic_offset.timestamp(), 1_619_870_400);
        assert_eq!(basic_offset.timestamp_subsec_millis(), 250);

        let naive = parse_timestamp("t", "2021-05-01T12:00:00").unwrap();
        assert_eq!(naive.timestamp(), 1_619_870_400);

        assert!(matches!(
            parse_timestamp("t", "yesterday"),
            Err(TranscodeError::InvalidTimestamp { field: "t", .. })
        ));
    }

    #[test]
    fn legacy_round_trip_scenario() {
        let payload = transcode(&message(), OutputShape::Legacy).unwrap();

        assert_eq!(payload.username, "ferris");
        assert_eq!(payload.avatar_url.as_deref(), Some("https://x/img.png"));
        assert!(payload.content.is_none());
        assert_eq!(payload.embeds.len(), 3);

        let identity = &payload.embeds[0];
        assert_eq!(field_names(identity), ["Discord User", "Name"]);
        assert_eq!(identity.fields[0].value, "<@42>");
        let identity_author = identity.author.as_ref().unwrap();
        assert_eq!(identity_author.url.as_deref(), Some("https://discordapp.com/users/42"));
        assert_eq!(identity_author.icon_url.as_deref(), Some("https://x/img.png"));
        assert_eq!(identity.timestamp.unwrap().timestamp(), 1_619_870_400);

        assert_eq!(payload.embeds[1].description.as_deref(), Some("hello"));
        assert_eq!(payload.embeds[2].description.as_deref(), Some("quoted"));
    }

    #[test]
    fn compact_round_trip_scenario() {
        let payload = transcode(&message(), OutputShape::Compact).unwrap();

        assert_eq!(payload.content.as_deref(), Some("hello"));
        assert_eq!(payload.embeds.len(), 2);
        assert_eq!(payload.embeds[0].description.as_deref(), Some("quoted"));
        assert_eq!(field_names(&payload.embeds[1]), ["Discord User", "Name"]);
    }

    #[test]
    fn legacy_edited_message_gets_footer_embed() {
        let mut msg = message();
        msg.timestamp_edited = Some("2021-05-01T12:05:00+00:00".to_string());
        msg.author.as_mut().unwrap().color = Some("#1A2B3C".to_string());

        let payload = transcode(&msg, OutputShape::Legacy).unwrap();
        assert_eq!(payload.embeds.len(), 4);

        let edited = &payload.embeds[1];
        assert_eq!(edited.footer.as_ref().unwrap().text, "Edited");
        assert_eq!(edited.timestamp.unwrap().timestamp(), 1_619_870_700);
        assert!(edited.description.is_none());
        assert!(
            payload.embeds[..3]
                .iter()
                .all(|e| e.color.as_deref() == Some("1A2B3C"))
        );
        // source embed keeps its own (absent) color
        assert!(payload.embeds[3].color.is_none());
    }

    #[test]
    fn compact_folds_edit_and_discriminator_into_identity() {
        let mut msg = message();
        msg.timestamp_edited = Some("2021-05-01T12:05:00.750+00:00".to_string());
        msg.content = Some(String::new());
        msg.author.as_mut().unwrap().discriminator = Some("0001".to_string());

        let payload = transcode(&msg, OutputShape::Compact).unwrap();
        assert!(payload.content.is_none());
        assert_eq!(payload.embeds.len(), 2);

        let identity = payload.embeds.last().unwrap();
        assert_eq!(field_names(identity), ["Discord User", "Name", "Edited"]);
        assert_eq!(identity.fields[1].value, "ferris#0001");
        assert_eq!(identity.fields[2].value, "<t:1619870700>");
        assert_eq!(payload.username, "ferris");
    }

    #[test]
    fn legacy_ignores_discriminator() {
        let mut msg = message();
        msg.author.as_mut().unwrap().discriminator = Some("0001".to_string());

        let payload = transcode(&msg, OutputShape::Legacy).unwrap();
        assert_eq!(payload.embeds[0].fields[1].value, "ferris");
    }

    #[test]
    fn nickname_only_when_different_and_non_empty() {
        let cases = [
            (None, false),
            (Some(""), false),
            (Some("ferris"), false),
            (Some("Crab"), true),
        ];
        for (nickname, expected) in cases {
            let mut msg = message();
            msg.author.as_mut().unwrap().nickname = nickname.map(str::to_string);

            let payload = transcode(&msg, OutputShape::Legacy).unwrap();
            assert_eq!(field_names(&payload.embeds[0]).contains(&"Nickname"), expected);
        }
    }

    #[test]
    fn pinned_inline_follows_bot_flag() {
        let mut msg = message();
        msg.is_pinned = true;

        let payload = transcode(&msg, OutputShape::Legacy).unwrap();
        let identity = &payload.embeds[0];
        assert_eq!(field_names(identity), ["Discord User", "Name", "isPinned"]);
        assert!(!identity.fields[2].inline);

        msg.author.as_mut().unwrap().is_bot = true;
        let payload = transcode(&msg, OutputShape::Compact).unwrap();
        let identity = payload.embeds.last().unwrap();
        assert_eq!(field_names(identity), ["Discord User", "Name", "isBot", "isPinned"]);
        assert!(!identity.fields[2].inline);
        assert!(identity.fields[3].inline);
    }

    #[test]
    fn embed_count_matches_shape() {
        let mut msg = message();
        msg.embeds = vec![SourceEmbed::default(); 4];
        msg.timestamp_edited = Some("2021-05-01T12:05:00+00:00".to_string());

        assert_eq!(transcode(&msg, OutputShape::Legacy).unwrap().embeds.len(), 4 + 3);
        assert_eq!(transcode(&msg, OutputShape::Compact).unwrap().embeds.len(), 4 + 1);

        msg.content = None;
        msg.timestamp_edited = None;
        msg.embeds.clear();
        assert_eq!(transcode(&msg, OutputShape::Legacy).unwrap().embeds.len(), 1);
        assert_eq!(transcode(&msg, OutputShape::Compact).unwrap().embeds.len(), 1);
    }

    #[test]
    fn missing_author_is_fatal() {
        let mut msg = message();
        msg.author = None;
        assert!(matches!(
            transcode(&msg, OutputShape::Legacy),
            Err(TranscodeError::MissingAuthor)
        ));
    }

    #[test]
    fn bad_message_timestamp_is_fatal() {
        let mut msg = message();
        msg.timestamp = String::new();
        assert!(matches!(
            transcode(&msg, OutputShape::Compact),
            Err(TranscodeError::InvalidTimestamp { field: "timestamp", .. })
        ));
    }

    #[test]
    fn missing_avatar_leaves_payload_without_one() {
        let mut msg = message();
        msg.author.as_mut().unwrap().avatar_url = Some(String::new());

        let payload = transcode(&msg, OutputShape::Legacy).unwrap();
        assert!(payload.avatar_url.is_none());
        assert!(payload.embeds[0].author.as_ref().unwrap().icon_url.is_none());
    }

    #[test]
    fn source_embed_copies_every_mapped_property() {
        let source = SourceEmbed {
            title: Some("Title".to_string()),
            url: Some("https://example.com".to_string()),
            timestamp: Some("2021-05-01T12:00:00+00:00".to_string()),
            description: Some("Body".to_string()),
            color: Some("#00FF00".to_string()),
            thumbnail: Some(EmbedThumbnail {
                url: "https://example.com/t.png".to_string(),
                width: Some(64),
                height: Some(32),
            }),
            footer: Some(EmbedFooter {
                text: "foot".to_string(),
            }),
            fields: Some(vec![
                EmbedField {
                    name: "a".to_string(),
                    value: "1".to_string(),
                    is_inline: true,
                },
                EmbedField {
                    name: "b".to_string(),
                    value: "2".to_string(),
                    is_inline: false,
                },
            ]),
            author: Some(EmbedAuthor {
                name: Some("dropped".to_string()),
                url: None,
                icon_url: None,
            }),
        };

        let embed = map_source_embed(&source).unwrap();
        assert_eq!(embed.title.as_deref(), Some("Title"));
        assert_eq!(embed.url.as_deref(), Some("https://example.com"));
        assert_eq!(embed.description.as_deref(), Some("Body"));
        assert_eq!(embed.color.as_deref(), Some("00FF00"));
        assert_eq!(embed.timestamp.unwrap().timestamp(), 1_619_870_400);
        assert_eq!(
            embed.thumbnail,
            Some(DiscordThumbnail {
                url: "https://example.com/t.png".to_string(),
                width: Some(64),
                height: Some(32),
            })
        );
        assert_eq!(embed.footer.as_ref().unwrap().text, "foot");
        assert_eq!(field_names(&embed), ["a", "b"]);
        assert!(embed.fields[0].inline);
        assert!(!embed.fields[1].inline);
        assert!(embed.author.is_none());
    }

    #[test]
    fn empty_strings_behave_like_missing_properties() {
        let empty = SourceEmbed {
            title: Some(String::new()),
            url: Some(String::new()),
            timestamp: Some(String::new()),
            description: Some(String::new()),
            color: Some(String::new()),
            fields: Some(Vec::new()),
            ..SourceEmbed::default()
        };

        assert_eq!(
            map_source_embed(&empty).unwrap(),
            map_source_embed(&SourceEmbed::default()).unwrap()
        );
        assert_eq!(map_source_embed(&empty).unwrap(), DiscordEmbed::default());
    }

    #[test]
    fn bad_embed_timestamp_is_fatal() {
        let mut msg = message();
        msg.embeds[0].timestamp = Some("not a date".to_string());

        assert!(matches!(
            transcode(&msg, OutputShape::Legacy),
            Err(TranscodeError::InvalidTimestamp { field: "embed timestamp", .. })
        ));
    }
}
