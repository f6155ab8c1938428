//! Incremental decoder for `data:`-framed completion streams.
//!
//! Bytes arrive in arbitrary chunks. The decoder appends them to a buffer,
//! splits on `\n`, and keeps the trailing (possibly incomplete) line for the
//! next chunk. Splitting happens on raw bytes, so a multi-byte character cut
//! in half by the transport is reassembled before it is decoded.
//!
//! Lines without a `data:` prefix (comments, `event:` fields, blank
//! separators) are ignored. Malformed payloads are skipped: one bad chunk
//! must not end an otherwise healthy reply.
use bytes::BytesMut;
use tracing::trace;

use crate::api_v1::ChatCompletionChunkResponse;

/// Payload of the line that closes a stream normally.
pub(crate) const DONE_SENTINEL: &str = "[DONE]";

const DATA_PREFIX: &str = "data:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Frame {
    /// Incremental text from `choices[0].delta.content`.
    Fragment(String),
    /// The terminal sentinel was seen.
    Done,
}

#[derive(Debug, thiserror::Error)]
enum DecodeError {
    #[error("line is not valid UTF-8")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("payload is not a completion chunk: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Default)]
pub(crate) struct EventDecoder {
    buf: BytesMut,
    skipped: usize,
    done: bool,
}

impl EventDecoder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Feed one transport chunk and return the frames it completed.
    ///
    /// Nothing is returned after [`Frame::Done`].
    pub(crate) fn feed(&mut self, chunk: &[u8]) -> Vec<Frame> {
        if self.done {
            return Vec::new();
        }
        self.buf.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let line = self.buf.split_to(pos + 1);
            if let Some(frame) = self.decode_line(&line[..pos]) {
                frames.push(frame);
                if self.done {
                    self.buf.clear();
                    break;
                }
            }
        }
        frames
    }

    /// Flush a final line that was not newline-terminated.
    pub(crate) fn finish(&mut self) -> Vec<Frame> {
        if self.done || self.buf.is_empty() {
            return Vec::new();
        }
        let rest = self.buf.split();
        self.decode_line(&rest).into_iter().collect()
    }

    /// Number of `data:` lines dropped as malformed so far.
    pub(crate) fn skipped(&self) -> usize {
        self.skipped
    }

    fn decode_line(&mut self, line: &[u8]) -> Option<Frame> {
        match parse_line(line) {
            Ok(Some(Frame::Done)) => {
                self.done = true;
                Some(Frame::Done)
            }
            Ok(frame) => frame,
            Err(err) => {
                self.skipped += 1;
                trace!(error = %err, "skipping malformed stream line");
                None
            }
        }
    }
}

fn parse_line(line: &[u8]) -> Result<Option<Frame>, DecodeError> {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    let line = std::str::from_utf8(line)?;

    let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
        return Ok(None);
    };
    let payload = payload.trim();

    if payload == DONE_SENTINEL {
        return Ok(Some(Frame::Done));
    }

    let chunk: ChatCompletionChunkResponse = serde_json::from_str(payload)?;
    Ok(chunk.into_fragment().map(Frame::Fragment))
}
