//! Line-oriented chat front-end.
//!
//! Every non-command line becomes a user message and one chat turn. Replies
//! are written to the output as they arrive; in JSON mode a schema update is
//! followed by the updated schema. Turn failures are reported inline and the
//! loop continues; a shutdown request ends it, even mid-turn.

use futures::StreamExt;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::client::ChatBackend;
use crate::config::ChatMode;
use crate::dispatch::Dispatcher;
use crate::error::{Error, Result};
use crate::session::ChatSession;

const PROMPT: &str = "> ";

const HELP: &str = "\
commands:
  /schema   show the current page schema
  /session  show the session id, messages and schema
  /history  list the conversation
  /help     show this help
  /quit     leave (also /exit)";

/// A parsed input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command<'a> {
    Schema,
    Session,
    History,
    Help,
    Quit,
    Unknown(&'a str),
    Chat(&'a str),
    Empty,
}

impl<'a> Command<'a> {
    fn parse(line: &'a str) -> Self {
        let line = line.trim();
        match line {
            "" => Self::Empty,
            "/schema" => Self::Schema,
            "/session" => Self::Session,
            "/history" => Self::History,
            "/help" => Self::Help,
            "/quit" | "/exit" => Self::Quit,
            cmd if cmd.starts_with('/') => Self::Unknown(cmd),
            text => Self::Chat(text),
        }
    }
}

/// Interactive chat loop over a dispatcher and a session.
#[derive(Debug)]
pub struct Repl<B> {
    dispatcher: Dispatcher<B>,
    session: ChatSession,
    mode: ChatMode,
    shutdown: CancellationToken,
}

impl<B: ChatBackend> Repl<B> {
    /// Create a loop for the given session.
    pub fn new(dispatcher: Dispatcher<B>, session: ChatSession, mode: ChatMode) -> Self {
        Self {
            dispatcher,
            session,
            mode,
            shutdown: CancellationToken::new(),
        }
    }

    /// Use `token` to stop the loop and any in-flight stream.
    #[must_use]
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    /// The session driven by this loop.
    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    /// Read lines from `input` until end of input, `/quit` or shutdown.
    pub async fn run<R, W>(&mut self, input: R, out: &mut W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = input.lines();

        loop {
            out.write_all(PROMPT.as_bytes()).await?;
            out.flush().await?;

            let line = tokio::select! {
                biased;
                () = self.shutdown.cancelled() => break,
                line = lines.next_line() => line?,
            };
            let Some(line) = line else { break };

            match Command::parse(&line) {
                Command::Empty => {}
                Command::Quit => break,
                Command::Help => write_line(out, HELP).await?,
                Command::Schema => {
                    write_line(out, &self.session.schema().to_pretty_string()).await?;
                }
                Command::Session => {
                    let snapshot = serde_json::to_string_pretty(&self.session.snapshot())?;
                    write_line(out, &snapshot).await?;
                }
                Command::History => {
                    for message in self.session.conversation().messages() {
                        let role = serde_json::to_value(message.role)?;
                        let role = role.as_str().unwrap_or("?");
                        write_line(out, &format!("{role}: {}", message.content)).await?;
                    }
                }
                Command::Unknown(cmd) => {
                    write_line(out, &format!("unknown command {cmd} (try /help)")).await?;
                }
                Command::Chat(text) => match self.turn(text, out).await {
                    Ok(()) => {}
                    Err(Error::Interrupted) => break,
                    Err(e) => {
                        error!(name: "chat.turn.failed", error = %e, "Chat turn failed");
                        write_line(out, &format!("error: {e}")).await?;
                    }
                },
            }
        }

        info!(
            name: "repl.finished",
            messages = self.session.conversation().len(),
            "Chat loop finished"
        );
        Ok(())
    }

    /// Run one chat turn for `text` and write the reply to `out`.
    ///
    /// Shutdown abandons the turn with [`Error::Interrupted`], including
    /// while the backend has not answered yet.
    pub async fn turn<W>(&mut self, text: &str, out: &mut W) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        self.session.add_user_message(text);

        match self.mode {
            ChatMode::Json => {
                let reply = tokio::select! {
                    biased;
                    () = self.shutdown.cancelled() => return Err(Error::Interrupted),
                    reply = self.dispatcher.send_turn(&mut self.session) => reply?,
                };
                write_line(out, &reply.text).await?;
                self.session.add_assistant_message(reply.text);
                if reply.schema_updated {
                    write_line(out, &self.session.schema().to_pretty_string()).await?;
                }
            }
            ChatMode::Stream => {
                let cancel = self.shutdown.child_token();
                let mut fragments = tokio::select! {
                    biased;
                    () = cancel.cancelled() => return Err(Error::Interrupted),
                    fragments = self.dispatcher.stream_turn(&self.session, cancel.clone()) => fragments?,
                };

                let mut reply = String::new();
                let mut failure = None;
                while let Some(fragment) = fragments.next().await {
                    match fragment {
                        Ok(fragment) => {
                            out.write_all(fragment.as_bytes()).await?;
                            out.flush().await?;
                            reply.push_str(&fragment);
                        }
                        Err(e) => {
                            failure = Some(e);
                            break;
                        }
                    }
                }
                out.write_all(b"\n").await?;

                // Keep whatever arrived, even if the stream broke off.
                if !reply.is_empty() {
                    self.session.add_assistant_message(reply);
                }
                if let Some(e) = failure {
                    return Err(e);
                }
                if cancel.is_cancelled() {
                    return Err(Error::Interrupted);
                }
            }
        }

        Ok(())
    }
}

async fn write_line<W>(out: &mut W, text: &str) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    out.write_all(text.as_bytes()).await?;
    out.write_all(b"\n").await?;
    out.flush().await?;
    Ok(())
}
