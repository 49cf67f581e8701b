//! Splitting a peer's byte stream into JSON envelopes
//!
//! Peers write envelopes back to back with no length prefix and no separator.
//! Each connection owns one [`FrameDecoder`]: received bytes are pushed in and
//! complete frames are pulled out lazily. Object boundaries are found by
//! actually parsing JSON, so a `}{` inside a string value does not split a
//! message. Bytes after the last complete frame stay buffered until the rest
//! of that frame arrives. After a syntax error only the bad bytes are dropped:
//! decoding resumes at the next `{` past the error.

use crate::error::{BlockchainError, Result};
use serde_json::{Deserializer, Value};

#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> FrameDecoder {
        FrameDecoder { buffer: Vec::new() }
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Bytes received but not yet consumed by a complete frame
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Next complete frame, or `None` when more bytes are needed.
    ///
    /// A syntax error that no further input could fix is returned once as a
    /// protocol fault; decoding then resumes at the next `{` after the error.
    pub fn next_frame(&mut self) -> Option<Result<Value>> {
        let start = match self.buffer.iter().position(|b| !b.is_ascii_whitespace()) {
            Some(start) => start,
            None => {
                self.buffer.clear();
                return None;
            }
        };
        self.buffer.drain(..start);

        let (item, consumed) = {
            let mut stream = Deserializer::from_slice(&self.buffer).into_iter::<Value>();
            let item = stream.next();
            (item, stream.byte_offset())
        };

        match item? {
            Ok(value) => {
                self.buffer.drain(..consumed);
                Some(Ok(value))
            }
            Err(e) if e.is_eof() => None,
            Err(e) => {
                let at = self.byte_offset(e.line(), e.column());
                let dropped = self.resync_after(at);
                Some(Err(BlockchainError::Protocol(format!(
                    "malformed envelope ({e}), dropped {dropped} bytes"
                ))))
            }
        }
    }

    /// Lazily drain every frame that is complete right now
    pub fn frames(&mut self) -> impl Iterator<Item = Result<Value>> + '_ {
        std::iter::from_fn(move || self.next_frame())
    }

    // serde_json reports 1-based line and byte column
    fn byte_offset(&self, line: usize, column: usize) -> usize {
        let line_start = match line {
            0 | 1 => 0,
            n => self
                .buffer
                .iter()
                .enumerate()
                .filter(|(_, b)| **b == b'\n')
                .nth(n - 2)
                .map_or(self.buffer.len(), |(i, _)| i + 1),
        };
        (line_start + column.saturating_sub(1)).min(self.buffer.len())
    }

    /// Drop everything before the first `{` past `at`. Always drops at least one byte.
    fn resync_after(&mut self, at: usize) -> usize {
        let from = at.max(1).min(self.buffer.len());
        match self.buffer[from..].iter().position(|b| *b == b'{') {
            Some(pos) => self.buffer.drain(..from + pos).count(),
            None => self.buffer.drain(..).count(),
        }
    }
}
