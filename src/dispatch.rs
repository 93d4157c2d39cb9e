//! Request dispatch for chat turns.
//!
//! The [`Dispatcher`] owns a [`ChatBackend`] and the fixed reply texts. Each
//! call sends exactly one request; there is no retry and no timeout.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::{ChatBackend, ChatRequest, StreamRequest};
use crate::error::{Error, Result};
use crate::interpret::{Interpretation, ReplyTexts};
use crate::session::ChatSession;
use crate::stream::{FragmentStream, decode_fragments};

/// Reply to a JSON-path turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnReply {
    /// Text to show as the assistant's answer.
    pub text: String,
    /// Whether the page schema was patched by this turn.
    pub schema_updated: bool,
}

impl TurnReply {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            schema_updated: false,
        }
    }
}

/// Sends chat turns to a backend and interprets the results.
#[derive(Debug, Clone)]
pub struct Dispatcher<B> {
    backend: B,
    replies: ReplyTexts,
}

impl<B: ChatBackend> Dispatcher<B> {
    /// Create a dispatcher with the default reply texts.
    pub fn new(backend: B) -> Self {
        Self::with_replies(backend, ReplyTexts::default())
    }

    /// Create a dispatcher with custom reply texts.
    pub fn with_replies(backend: B, replies: ReplyTexts) -> Self {
        Self { backend, replies }
    }

    /// The underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The configured reply texts.
    pub fn replies(&self) -> &ReplyTexts {
        &self.replies
    }

    /// Send the latest message of the conversation (JSON path).
    ///
    /// Without a session identifier no request is made and the
    /// uninitialized reply is returned instead. A patch in the response is
    /// applied to the session's page schema.
    pub async fn send_turn(&self, session: &mut ChatSession) -> Result<TurnReply> {
        let Some(session_id) = session.id() else {
            warn!(name: "chat.turn.uninitialized", "Turn sent before session initialization");
            return Ok(TurnReply::text(self.replies.uninitialized.clone()));
        };

        let last = session
            .conversation()
            .last()
            .ok_or(Error::EmptyConversation)?;

        let request = ChatRequest {
            message: last.content.clone(),
            session_id: session_id.to_string(),
        };
        info!(
            name: "chat.turn.sent",
            session_id = %request.session_id,
            chars = request.message.chars().count(),
            "Sending chat turn"
        );

        let body = self.backend.send_message(&request).await?;
        let interpretation = Interpretation::from_body(&body)?;
        let schema_updated = matches!(interpretation, Interpretation::Patch(_));
        if let Interpretation::Patch(patch) = &interpretation {
            debug!(name: "schema.patch.received", operations = patch.0.len(), "Applying schema patch");
        }

        let text = interpretation.resolve(session, &self.replies)?;
        if schema_updated {
            info!(
                name: "schema.patch.applied",
                title = %session.schema().title(),
                components = session.schema().components().len(),
                "Page schema updated"
            );
        }

        Ok(TurnReply {
            text,
            schema_updated,
        })
    }

    /// Send the whole conversation and stream the reply (streaming path).
    ///
    /// The returned stream closes at end of body or when `cancel` fires.
    pub async fn stream_turn(
        &self,
        session: &ChatSession,
        cancel: CancellationToken,
    ) -> Result<FragmentStream> {
        if session.conversation().is_empty() {
            return Err(Error::EmptyConversation);
        }

        let request = StreamRequest {
            messages: session.conversation().messages().to_vec(),
        };
        info!(
            name: "chat.stream.sent",
            messages = request.messages.len(),
            "Sending streaming chat turn"
        );

        let body = self.backend.stream_messages(&request).await?;
        Ok(decode_fragments(body, cancel))
    }
}
