use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::discord::Transport;
use crate::models::ChatExport;
use crate::transcoder::{OutputShape, transcode};

/// Discord refuses messages with more embeds than this.
const MAX_EMBEDS_PER_MESSAGE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImportSummary {
    pub messages: usize,
    pub embeds: usize,
}

/// Replays an export through a webhook, one message at a time.
pub struct ChatImporter<T> {
    transport: T,
    shape: OutputShape,
    progress: bool,
}

impl<T: Transport> ChatImporter<T> {
    pub fn new(transport: T, shape: OutputShape, progress: bool) -> Self {
        Self {
            transport,
            shape,
            progress,
        }
    }

    /// Transcodes and submits every message in file order.
    ///
    /// Stops at the first message that cannot be transcoded or delivered;
    /// nothing after it is sent.
    pub async fn run(&self, export: &ChatExport) -> Result<ImportSummary> {
        let total = export.messages.len();
        match export.source_label() {
            Some(label) => info!("Replaying {} messages from {}", total, label),
            None => info!("Replaying {} messages", total),
        }

        if let Some(declared) = export.message_count
            && declared != total as u64
        {
            warn!(
                "Export declares {} messages but contains {}",
                declared, total
            );
        }

        let mut summary = ImportSummary::default();

        for (index, message) in export.messages.iter().enumerate() {
            let label = message.id.as_deref().unwrap_or("<no id>");

            let payload = transcode(message, self.shape)
                .with_context(|| format!("Message #{} ({label}) is malformed", index + 1))?;

            if !message.attachments.is_empty() {
                let names: Vec<_> = message.attachments.iter().map(|a| a.display_name()).collect();
                let bytes: u64 = message
                    .attachments
                    .iter()
                    .filter_map(|a| a.file_size_bytes)
                    .sum();
                debug!(
                    "Message {} has {} attachments ({} bytes) that are not replayed: {}",
                    label,
                    message.attachments.len(),
                    bytes,
                    names.join(", ")
                );
            }
            if payload.embeds.len() > MAX_EMBEDS_PER_MESSAGE {
                warn!(
                    "Message {} carries {} embeds, Discord accepts at most {}",
                    label,
                    payload.embeds.len(),
                    MAX_EMBEDS_PER_MESSAGE
                );
            }

            let response = self
                .transport
                .execute(&payload)
                .await
                .with_context(|| format!("Failed to submit message #{} ({label})", index + 1))?;

            summary.messages += 1;
            summary.embeds += payload.embeds.len();

            if self.progress {
                println!("[{}/{}] {}", index + 1, total, response);
            }
        }

        info!(
            "Replayed {} messages with {} embeds",
            summary.messages, summary.embeds
        );
        Ok(summary)
    }
}
