//! Error types for the chat client.

use thiserror::Error;

/// Chat client error type.
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A JSON Patch operation could not be applied.
    #[error("patch error: {0}")]
    Patch(#[from] json_patch::PatchError),

    /// A patch produced a document that is no longer a page schema.
    #[error("invalid page schema: {0}")]
    InvalidSchema(String),

    /// Backend returned a non-success status.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, if readable.
        message: String,
    },

    /// I/O error while reading a stream or a local file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The dispatcher was asked to send a turn with no messages.
    #[error("conversation is empty")]
    EmptyConversation,

    /// The turn was abandoned because shutdown was requested.
    #[error("turn interrupted")]
    Interrupted,

    /// Invalid configuration value.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for chat client operations.
pub type Result<T> = std::result::Result<T, Error>;
