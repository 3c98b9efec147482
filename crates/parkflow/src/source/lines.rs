//! Incremental line splitting over a chunked byte stream.
//!
//! Chunks are appended to an accumulator and complete lines are handed out as
//! soon as their terminating `\n` arrives. The unterminated tail stays in the
//! buffer until more bytes come in or the stream ends. Splitting happens on
//! raw bytes: `\n` never occurs inside a multi-byte UTF-8 sequence, so a chunk
//! boundary that cuts a character in half is reassembled before decoding.

use bytes::{Bytes, BytesMut};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Accumulates chunks and yields complete lines without their terminator.
#[derive(Debug, Default)]
pub struct LineSplitter {
    buffer: BytesMut,
    /// Bytes at the front of `buffer` already known to contain no `\n`.
    scanned: usize,
    /// Whether any line has been produced yet (for BOM stripping).
    started: bool,
}

impl LineSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk read from the input.
    pub fn push(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Take the next complete line, if one is buffered.
    ///
    /// The trailing `\n` and an optional preceding `\r` are removed.
    pub fn next_line(&mut self) -> Option<Bytes> {
        let offset = self.buffer[self.scanned..]
            .iter()
            .position(|b| *b == b'\n');

        match offset {
            Some(offset) => {
                let end = self.scanned + offset;
                let mut line = self.buffer.split_to(end + 1);
                line.truncate(end);
                self.scanned = 0;
                Some(self.finish_line(line))
            }
            None => {
                self.scanned = self.buffer.len();
                None
            }
        }
    }

    /// Take the final unterminated fragment once the input is exhausted.
    pub fn finish(&mut self) -> Option<Bytes> {
        if self.buffer.is_empty() {
            return None;
        }
        self.scanned = 0;
        let line = self.buffer.split();
        Some(self.finish_line(line))
    }

    /// Bytes currently held back waiting for a terminator.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    fn finish_line(&mut self, mut line: BytesMut) -> Bytes {
        if line.last() == Some(&b'\r') {
            line.truncate(line.len() - 1);
        }
        let mut line = line.freeze();
        if !self.started {
            self.started = true;
            if line.starts_with(UTF8_BOM) {
                line = line.slice(UTF8_BOM.len()..);
            }
        }
        line
    }
}
