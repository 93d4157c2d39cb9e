//! Schema Chat
//!
//! A terminal chat client for a UI-building backend. Each turn is sent to a
//! single chat endpoint; the reply is either text, a stream of text fragments,
//! or a JSON Patch that updates the client's page schema.
//!
//! # Architecture
//!
//! - **Session**: explicit context holding the session id, page schema and conversation
//! - **Dispatcher**: sends one request per turn through a [`client::ChatBackend`]
//! - **Interpreter**: turns a JSON reply into a schema patch, a message, or a fallback
//! - **Stream decoder**: splits a `data:`-delimited body into text fragments
//! - **REPL**: line-oriented front-end over any async reader and writer
//!
//! # Modules
//!
//! - [`client`]: backend trait and HTTP transport
//! - [`config`]: layered configuration and CLI flags
//! - [`dispatch`]: chat turn dispatch
//! - [`interpret`]: JSON reply interpretation
//! - [`repl`]: interactive loop
//! - [`schema`]: page schema and patch application
//! - [`session`]: session context and conversation
//! - [`stream`]: streamed reply decoding

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::cargo_common_metadata)]
#![allow(clippy::multiple_crate_versions)]

pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod interpret;
pub mod repl;
pub mod schema;
pub mod session;
pub mod stream;

pub use error::{Error, Result};
