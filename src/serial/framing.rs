//! # Line Framing
//!
//! Splits the raw serial byte stream into newline-terminated lines.

use bytes::{Buf, Bytes, BytesMut};
use std::io;

/// Longest line accepted before the buffer is discarded
pub const MAX_LINE_LEN: usize = 1024;

/// Accumulates serial bytes until a full line is available
#[derive(Debug, Default)]
pub struct LineFramer {
    buf: BytesMut,
}

impl LineFramer {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(MAX_LINE_LEN),
        }
    }

    /// Buffer for reads to append into
    pub fn buffer_mut(&mut self) -> &mut BytesMut {
        &mut self.buf
    }

    /// Append received bytes
    pub fn extend(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Bytes held but not yet returned as a line
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Whether a complete line (or an oversized run to discard) is buffered
    pub fn has_line(&self) -> bool {
        self.buf.len() > MAX_LINE_LEN || self.buf.contains(&b'\n')
    }

    /// Take the next complete line, without its `\n`
    ///
    /// # Errors
    ///
    /// Returns `InvalidData` if more than [`MAX_LINE_LEN`] bytes arrive
    /// without a newline. The oversized data is dropped.
    pub fn next_line(&mut self) -> io::Result<Option<Bytes>> {
        match self.buf.iter().position(|&b| b == b'\n') {
            Some(pos) if pos <= MAX_LINE_LEN => {
                let mut line = self.buf.split_to(pos + 1);
                line.truncate(pos);
                Ok(Some(line.freeze()))
            }
            Some(pos) => {
                self.buf.advance(pos + 1);
                Err(oversized())
            }
            None if self.buf.len() > MAX_LINE_LEN => {
                self.buf.clear();
                Err(oversized())
            }
            None => Ok(None),
        }
    }
}

fn oversized() -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("line exceeds {} bytes without newline", MAX_LINE_LEN),
    )
}
