//! Backend transport.
//!
//! The [`ChatBackend`] trait is the seam between the dispatcher and the
//! network. [`HttpBackend`] talks to the chat endpoint over HTTP; tests plug
//! in their own implementations.

mod http;

pub use http::HttpBackend;

use serde::Serialize;

use crate::error::Result;
use crate::session::Message;
use crate::stream::ByteStream;

/// Body of a single-message request (JSON path).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    /// Content of the latest message.
    pub message: String,
    /// Identifier of the sending session.
    pub session_id: String,
}

/// Body of a full-history request (streaming path).
#[derive(Debug, Clone, Serialize)]
pub struct StreamRequest {
    /// The whole conversation, oldest first.
    pub messages: Vec<Message>,
}

/// Transport used by the dispatcher to reach the chat backend.
#[async_trait::async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send one message and return the parsed JSON response body.
    async fn send_message(&self, request: &ChatRequest) -> Result<serde_json::Value>;

    /// Send the conversation and return the raw streamed response body.
    async fn stream_messages(&self, request: &StreamRequest) -> Result<ByteStream>;
}
