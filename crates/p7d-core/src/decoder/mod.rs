//! Dump decoding.
//!
//! ## Stream Layout
//!
//! | Offset | Size    | Field                              |
//! |--------|---------|------------------------------------|
//! | 0      | 8       | Magic, selects the byte order      |
//! | 8      | 4       | Process id                         |
//! | 12     | 8       | Creation time                      |
//! | 20     | 0x200   | Process name, two-byte text        |
//! | 532    | 0x200   | Host name, two-byte text           |
//! | 1044   | ...     | Packets                            |
//!
//! The magic is always read little-endian. Its byte-swapped form marks a
//! big-endian dump, and everything after it follows that order.
//!
//! ## Error Hook
//!
//! Only a bad magic or a truncated prologue fails the whole decode. Every
//! other problem is handed to the caller's error hook and decoding resumes
//! at the next packet. [`Decoder::decode`] installs a hook that logs at
//! `warn` level.

mod ingest;
mod packet;
mod record;

use crate::dump::{Dump, DumpBuilder, ProcessInfo};
use crate::error::{Error, Result};
use crate::reader::{BigEndian, ByteOrder, Cursor, Endian, LittleEndian};
use encoding_rs::Encoding;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

pub use ingest::StreamCollector;
pub use packet::PacketHeader;
pub use record::{arg, RecordType};

/// Magic of a little-endian dump, read little-endian
pub const MAGIC_LE: u64 = 0x45D2_AC71_ECF3_2CA6;

/// Magic of a big-endian dump, read little-endian
pub const MAGIC_BE: u64 = MAGIC_LE.swap_bytes();

/// Alternate header values accepted for little- and big-endian dumps
pub const MAGIC_ALIASES: [(u64, Endian); 2] = [
    (0x45CC_7D11_B702_3D26, Endian::Little),
    (0xA636_CBAA_19B4_B945, Endian::Big),
];

const MAGIC_LEN: usize = 8;
const NAME_WIDTH: usize = 0x200;

/// Bytes taken by the magic and process-info prologue
pub const PROLOGUE_LEN: usize = MAGIC_LEN + 4 + 8 + NAME_WIDTH * 2;

/// Byte order used for two-byte strings.
///
/// Producers write UTF-16LE text even into big-endian dumps, so only the
/// integer fields follow the magic by default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WideOrder {
    /// Always little-endian, regardless of the stream
    #[default]
    Little,
    /// Follow the stream's byte order
    Stream,
}

/// Configuration for the decoder
#[derive(Debug, Clone)]
pub struct DecoderConfig {
    /// Encoding of single-byte strings
    pub narrow_encoding: &'static Encoding,
    /// Byte order of two-byte strings
    pub wide_order: WideOrder,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            narrow_encoding: encoding_rs::WINDOWS_1252,
            wide_order: WideOrder::Little,
        }
    }
}

impl DecoderConfig {
    /// Creates a new decoder config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the encoding of single-byte strings
    pub fn narrow_encoding(mut self, encoding: &'static Encoding) -> Self {
        self.narrow_encoding = encoding;
        self
    }

    /// Sets the byte order of two-byte strings
    pub fn wide_order(mut self, order: WideOrder) -> Self {
        self.wide_order = order;
        self
    }
}

/// Text encodings resolved for one decode pass
#[derive(Debug, Clone, Copy)]
pub(crate) struct Codec {
    pub(crate) narrow: &'static Encoding,
    pub(crate) wide: &'static Encoding,
}

impl Codec {
    pub(crate) fn for_order<O: ByteOrder>(config: &DecoderConfig) -> Self {
        let wide = match config.wide_order {
            WideOrder::Stream => O::wide_encoding(),
            WideOrder::Little => encoding_rs::UTF_16LE,
        };
        Self {
            narrow: config.narrow_encoding,
            wide,
        }
    }
}

/// Error hook that logs each packet-level error
pub fn log_error(err: Error) {
    warn!("{}", err);
}

/// Decoder for P7 dumps
#[derive(Debug, Clone, Default)]
pub struct Decoder {
    config: DecoderConfig,
}

impl Decoder {
    /// Creates a new decoder with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new decoder with custom configuration
    pub fn with_config(config: DecoderConfig) -> Self {
        Self { config }
    }

    /// Returns the active configuration
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Decode a dump held in memory, logging packet-level errors
    pub fn decode(&self, data: &[u8]) -> Result<Dump> {
        self.decode_with_hook(data, log_error)
    }

    /// Decode a dump held in memory, passing packet-level errors to `on_error`
    pub fn decode_with_hook(&self, data: &[u8], mut on_error: impl FnMut(Error)) -> Result<Dump> {
        match read_magic(data)? {
            Endian::Little => self.decode_stream::<LittleEndian>(data, &mut on_error),
            Endian::Big => self.decode_stream::<BigEndian>(data, &mut on_error),
        }
    }

    /// Read a file fully, then decode it
    pub fn decode_file(
        &self,
        path: impl AsRef<Path>,
        on_error: impl FnMut(Error),
    ) -> Result<Dump> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| Error::file_read(path, e))?;
        debug!("Read {} bytes from {}", data.len(), path.display());
        self.decode_with_hook(&data, on_error)
    }

    /// Drain `reader` to completion, then decode what it produced
    pub fn decode_reader(&self, mut reader: impl Read, on_error: impl FnMut(Error)) -> Result<Dump> {
        let mut collector = StreamCollector::new(self.clone());
        std::io::copy(&mut reader, &mut collector).map_err(Error::stream_read)?;
        collector.finish(on_error)
    }

    fn decode_stream<O: ByteOrder>(
        &self,
        data: &[u8],
        on_error: &mut dyn FnMut(Error),
    ) -> Result<Dump> {
        debug!("Decoding {} bytes as {}", data.len(), O::ENDIAN);

        if data.len() < PROLOGUE_LEN {
            return Err(Error::TruncatedPrologue {
                needed: PROLOGUE_LEN,
                available: data.len(),
            });
        }

        let codec = Codec::for_order::<O>(&self.config);
        let mut cur = Cursor::<O>::at(data, MAGIC_LEN);
        let process = ProcessInfo {
            process_id: cur.u32()?,
            creation_time: cur.u64()?,
            process_name: cur.fixed_string(NAME_WIDTH, codec.wide)?,
            host_name: cur.fixed_string(NAME_WIDTH, codec.wide)?,
        };
        debug!(
            "Process '{}' ({}) on host '{}'",
            process.process_name, process.process_id, process.host_name
        );

        let mut builder = DumpBuilder::new(O::ENDIAN, process);
        let mut report = |builder: &mut DumpBuilder, err: Error| {
            builder.stats_mut().errors += 1;
            on_error(err);
        };
        packet::frame_packets(&mut cur, &mut builder, &codec, &mut report);

        let dump = builder.finish();
        let stats = dump.stats();
        debug!(
            "Decode complete: {} packets, {} records, {} lines, {} errors",
            stats.packets,
            stats.records,
            dump.line_count(),
            stats.errors
        );
        Ok(dump)
    }
}

/// Select the byte order from the leading magic value
fn read_magic(data: &[u8]) -> Result<Endian> {
    let Some(head) = data.get(..MAGIC_LEN) else {
        return Err(Error::TruncatedPrologue {
            needed: PROLOGUE_LEN,
            available: data.len(),
        });
    };
    let magic = Cursor::<LittleEndian>::new(head).u64()?;
    match magic {
        MAGIC_LE => Ok(Endian::Little),
        MAGIC_BE => Ok(Endian::Big),
        _ => MAGIC_ALIASES
            .iter()
            .find(|(alias, _)| *alias == magic)
            .map(|&(_, endian)| endian)
            .ok_or(Error::InvalidHeader { magic }),
    }
}

/// Decode a dump held in memory with the default configuration
pub fn decode_bytes(data: &[u8]) -> Result<Dump> {
    Decoder::new().decode(data)
}

/// Decode a dump file with the default configuration
///
/// This is a convenience function that reads the file and decodes it,
/// logging packet-level errors.
pub fn decode_file(path: impl AsRef<Path>) -> Result<Dump> {
    Decoder::new().decode_file(path, log_error)
}
