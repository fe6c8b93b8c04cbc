use thiserror::Error;

/// Reasons a single exported message cannot be turned into a webhook payload.
///
/// All of these abort the replay: skipping a record would silently drop
/// chat history.
#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("message has no author")]
    MissingAuthor,

    #[error("invalid {field} timestamp {value:?}")]
    InvalidTimestamp {
        field: &'static str,
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("invalid color {value:?}, expected #RRGGBB")]
    InvalidColor { value: String },
}
