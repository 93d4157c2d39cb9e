//! Framing for `data:`-delimited reply streams.

use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;

use crate::error::Error;

/// Delimiter between fragments.
pub const DATA_DELIMITER: &[u8] = b"data:";

/// Terminal sentinel; dropped like an empty fragment.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Splits a byte stream on `data:` and yields trimmed text fragments.
///
/// A fragment is complete once the following delimiter arrives, once the
/// buffered text ends in a blank line, or at end of stream. Framing works on
/// raw bytes, so a multi-byte character split across
/// reads is reassembled before it is decoded. Empty fragments and
/// [`DONE_SENTINEL`] are skipped.
#[derive(Debug, Default)]
pub struct DataFrameCodec {
    /// Offset from which to resume scanning for the delimiter.
    next_index: usize,
}

impl DataFrameCodec {
    /// Create a codec with an empty scan position.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn find_delimiter(&self, buf: &[u8]) -> Option<usize> {
        buf.get(self.next_index..)?
            .windows(DATA_DELIMITER.len())
            .position(|w| w == DATA_DELIMITER)
            .map(|pos| pos + self.next_index)
    }
}

/// Whether `buf` ends with an event terminator (`\n\n` or `\r\n\r\n`).
fn ends_with_blank_line(buf: &[u8]) -> bool {
    buf.ends_with(b"\n\n") || buf.ends_with(b"\r\n\r\n")
}

/// Decode and trim one fragment, or `None` if it should be dropped.
fn keep_fragment(raw: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(raw);
    let text = text.trim();
    (!text.is_empty() && text != DONE_SENTINEL).then(|| text.to_string())
}

impl Decoder for DataFrameCodec {
    type Item = String;
    type Error = Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<String>, Error> {
        while let Some(pos) = self.find_delimiter(buf) {
            let frame = buf.split_to(pos);
            buf.advance(DATA_DELIMITER.len());
            self.next_index = 0;
            if let Some(fragment) = keep_fragment(&frame) {
                return Ok(Some(fragment));
            }
        }

        if ends_with_blank_line(buf) {
            self.next_index = 0;
            let frame = buf.split();
            return Ok(keep_fragment(&frame));
        }

        // A delimiter may straddle the next read; rescan its possible prefix.
        self.next_index = buf.len().saturating_sub(DATA_DELIMITER.len() - 1);
        Ok(None)
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<String>, Error> {
        if let Some(fragment) = self.decode(buf)? {
            return Ok(Some(fragment));
        }
        self.next_index = 0;
        if buf.is_empty() {
            return Ok(None);
        }
        let rest = buf.split();
        Ok(keep_fragment(&rest))
    }
}
