//! Push-style ingest.
//!
//! Some sources hand bytes over in pieces: a pipe from a decompressor, a
//! network body, an event-driven reader. [`StreamCollector`] accumulates
//! those pieces and decodes once the source is exhausted. Decoding itself
//! is never incremental.

use super::Decoder;
use crate::dump::Dump;
use crate::error::{Error, Result};
use bytes::{BufMut, BytesMut};
use std::io;
use tracing::trace;

/// Collects dump bytes pushed in chunks, then decodes them
#[derive(Debug, Default)]
pub struct StreamCollector {
    decoder: Decoder,
    buffer: BytesMut,
}

impl StreamCollector {
    /// Creates an empty collector that will decode with `decoder`
    pub fn new(decoder: Decoder) -> Self {
        Self {
            decoder,
            buffer: BytesMut::new(),
        }
    }

    /// Creates an empty collector with room for `capacity` bytes
    pub fn with_capacity(decoder: Decoder, capacity: usize) -> Self {
        Self {
            decoder,
            buffer: BytesMut::with_capacity(capacity),
        }
    }

    /// Append one chunk
    pub fn push(&mut self, chunk: &[u8]) {
        self.buffer.put_slice(chunk);
    }

    /// Bytes collected so far
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns true if nothing has been pushed
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Decode everything collected, passing packet-level errors to `on_error`
    pub fn finish(self, on_error: impl FnMut(Error)) -> Result<Dump> {
        let Self { decoder, buffer } = self;
        let data = buffer.freeze();
        trace!("Collected {} bytes", data.len());
        decoder.decode_with_hook(&data, on_error)
    }
}

impl io::Write for StreamCollector {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.push(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
