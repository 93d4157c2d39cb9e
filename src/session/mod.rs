//! Session state and conversation management.
//!
//! A [`ChatSession`] is the explicit context for a chat: the session
//! identifier, the page schema and the conversation. It is passed by
//! reference into the dispatcher instead of living in global state.
//!
//! # Example
//!
//! ```rust
//! use schema_chat::session::ChatSession;
//!
//! let mut session = ChatSession::new();
//! assert!(session.id().is_none());
//!
//! session.initialize();
//! session.add_user_message("Hello!");
//! assert_eq!(session.conversation().len(), 1);
//! ```

mod context;
mod message;

pub use context::{ChatSession, SessionSnapshot};
pub use message::{Conversation, Message, MessageRole};
