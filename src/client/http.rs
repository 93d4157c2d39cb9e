//! HTTP implementation of [`ChatBackend`].

use reqwest::header::{ACCEPT, HeaderValue};
use tracing::{debug, warn};
use url::Url;

use super::{ChatBackend, ChatRequest, StreamRequest};
use crate::error::{Error, Result};
use crate::stream::{self, ByteStream};

/// Media type requested on the streaming path.
const EVENT_STREAM: &str = "text/event-stream";

/// Chat backend reached over HTTP.
///
/// # Example
///
/// ```rust,no_run
/// use schema_chat::client::{ChatBackend, ChatRequest, HttpBackend};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = HttpBackend::new("http://127.0.0.1:8000/chat", "http://localhost:8000/chat")?;
/// let body = backend
///     .send_message(&ChatRequest {
///         message: "Hello!".into(),
///         session_id: "3f1c...".into(),
///     })
///     .await?;
/// println!("{body}");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpBackend {
    endpoint: Url,
    stream_endpoint: Url,
    http: reqwest::Client,
}

impl HttpBackend {
    /// Create a backend for the given JSON and streaming endpoints.
    pub fn new(endpoint: impl AsRef<str>, stream_endpoint: impl AsRef<str>) -> Result<Self> {
        Self::with_client(endpoint, stream_endpoint, reqwest::Client::new())
    }

    /// Create a backend with a custom reqwest client.
    pub fn with_client(
        endpoint: impl AsRef<str>,
        stream_endpoint: impl AsRef<str>,
        http: reqwest::Client,
    ) -> Result<Self> {
        Ok(Self {
            endpoint: parse_url(endpoint.as_ref())?,
            stream_endpoint: parse_url(stream_endpoint.as_ref())?,
            http,
        })
    }

    /// The JSON endpoint.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// The streaming endpoint.
    pub fn stream_endpoint(&self) -> &Url {
        &self.stream_endpoint
    }
}

fn parse_url(raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|e| Error::Config(format!("invalid endpoint `{raw}`: {e}")))
}

#[async_trait::async_trait]
impl ChatBackend for HttpBackend {
    async fn send_message(&self, request: &ChatRequest) -> Result<serde_json::Value> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            // The body is still interpreted; backends report failures in it.
            warn!(
                name: "backend.status.unexpected",
                status = status.as_u16(),
                "Chat endpoint returned a non-success status"
            );
        }

        let raw = response.bytes().await?;
        debug!(name: "backend.response", status = status.as_u16(), bytes = raw.len(), "Chat response received");
        Ok(serde_json::from_slice(&raw)?)
    }

    async fn stream_messages(&self, request: &StreamRequest) -> Result<ByteStream> {
        let response = self
            .http
            .post(self.stream_endpoint.clone())
            .header(ACCEPT, HeaderValue::from_static(EVENT_STREAM))
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".into());
            return Err(Error::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(stream::from_response(response))
    }
}
