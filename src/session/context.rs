//! The chat session context handed to the dispatcher.

use chrono::{DateTime, Utc};
use json_patch::Patch;
use serde::Serialize;
use uuid::Uuid;

use super::message::{Conversation, Message};
use crate::error::Result;
use crate::schema::PageSchema;

/// Everything a chat turn reads or updates.
///
/// A session starts without an identifier; [`ChatSession::initialize`]
/// generates one. The JSON dispatch path refuses to contact the backend until
/// that has happened.
#[derive(Debug, Clone)]
pub struct ChatSession {
    id: Option<String>,
    schema: PageSchema,
    conversation: Conversation,
    created_at: DateTime<Utc>,
    last_activity: DateTime<Utc>,
}

/// Serializable view of a session.
#[derive(Debug, Serialize)]
pub struct SessionSnapshot<'a> {
    /// Session identifier, `None` before initialization.
    pub id: Option<&'a str>,
    /// The conversation so far.
    pub messages: &'a Conversation,
    /// The current page schema.
    pub schema: &'a PageSchema,
    /// Creation time as an RFC 3339 timestamp.
    pub created_at: String,
    /// Time of the last message or schema update, RFC 3339.
    pub last_activity: String,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatSession {
    /// Create an uninitialized session with the default page schema.
    #[must_use]
    pub fn new() -> Self {
        Self::with_schema(PageSchema::default())
    }

    /// Create an uninitialized session around an existing schema.
    #[must_use]
    pub fn with_schema(schema: PageSchema) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            schema,
            conversation: Conversation::new(),
            created_at: now,
            last_activity: now,
        }
    }

    /// Create a session and assign it an identifier straight away.
    #[must_use]
    pub fn started(schema: PageSchema) -> Self {
        let mut session = Self::with_schema(schema);
        session.initialize();
        session
    }

    /// Generate the session identifier if it is not set yet.
    ///
    /// Returns the identifier; calling this again keeps the first one.
    pub fn initialize(&mut self) -> &str {
        self.id.get_or_insert_with(|| Uuid::new_v4().to_string())
    }

    /// The session identifier, if initialized.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// The current page schema.
    #[must_use]
    pub fn schema(&self) -> &PageSchema {
        &self.schema
    }

    /// Apply a backend patch to the page schema.
    pub fn apply_patch(&mut self, patch: &Patch) -> Result<()> {
        self.schema.apply(patch)?;
        self.touch();
        Ok(())
    }

    /// The conversation so far.
    #[must_use]
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Append a user message.
    pub fn add_user_message(&mut self, content: impl Into<String>) {
        self.add_message(Message::user(content));
    }

    /// Append an assistant message.
    pub fn add_assistant_message(&mut self, content: impl Into<String>) {
        self.add_message(Message::assistant(content));
    }

    /// Append a message to the conversation.
    pub fn add_message(&mut self, message: Message) {
        self.conversation.push(message);
        self.touch();
    }

    /// Borrowing snapshot for display.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot<'_> {
        SessionSnapshot {
            id: self.id(),
            messages: &self.conversation,
            schema: &self.schema,
            created_at: self.created_at.to_rfc3339(),
            last_activity: self.last_activity.to_rfc3339(),
        }
    }

    fn touch(&mut self) {
        self.last_activity = Utc::now();
    }
}
