//! Decoding of streamed chat replies.
//!
//! The streaming endpoint answers with a chunked text body in which reply
//! fragments are separated by the literal token `data:` and terminated by a
//! `[DONE]` sentinel. [`decode_fragments`] turns the raw byte stream into a
//! stream of trimmed text fragments.
//!
//! The returned stream is either *reading* or *closed*. It closes when the
//! source ends (after flushing the last buffered fragment), when the
//! cancellation token fires (without flushing), or after yielding a transport
//! error.
//!
//! # Example
//!
//! ```rust
//! use bytes::Bytes;
//! use futures::{StreamExt, stream};
//! use schema_chat::stream::decode_fragments;
//! use tokio_util::sync::CancellationToken;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let body = stream::iter([Ok::<_, schema_chat::Error>(Bytes::from_static(
//!     b"data: chunk1\ndata: [DONE]",
//! ))]);
//! let fragments: Vec<_> = decode_fragments(Box::pin(body), CancellationToken::new())
//!     .collect()
//!     .await;
//! assert_eq!(fragments.len(), 1);
//! assert_eq!(fragments[0].as_ref().unwrap(), "chunk1");
//! # }
//! ```

mod codec;

pub use codec::{DATA_DELIMITER, DONE_SENTINEL, DataFrameCodec};

use std::pin::Pin;

use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use tokio_util::codec::Decoder;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{Error, Result};

/// Raw response body chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Decoded reply fragments.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Decode a `data:`-delimited byte stream into text fragments.
pub fn decode_fragments(mut body: ByteStream, cancel: CancellationToken) -> FragmentStream {
    let out = async_stream::try_stream! {
        let mut buf = BytesMut::new();
        let mut codec = DataFrameCodec::new();
        let mut cancelled = false;
        let mut forwarded = 0usize;

        loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => None,
                chunk = body.next() => Some(chunk),
            };

            let chunk = match next {
                None => {
                    cancelled = true;
                    break;
                }
                Some(None) => break,
                Some(Some(chunk)) => chunk?,
            };

            buf.extend_from_slice(&chunk);
            while let Some(fragment) = codec.decode(&mut buf)? {
                forwarded += 1;
                yield fragment;
            }
        }

        if cancelled {
            debug!(name: "stream.cancelled", forwarded, "Reply stream cancelled");
        } else {
            while let Some(fragment) = codec.decode_eof(&mut buf)? {
                forwarded += 1;
                yield fragment;
            }
            debug!(name: "stream.closed", forwarded, "Reply stream closed");
        }
    };

    Box::pin(out)
}

/// Adapt a reqwest body stream into a [`ByteStream`].
pub fn from_response(response: reqwest::Response) -> ByteStream {
    Box::pin(response.bytes_stream().map(|chunk| chunk.map_err(Error::from)))
}
