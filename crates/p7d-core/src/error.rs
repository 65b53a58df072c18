//! Error types for the p7d-core library.
//!
//! Decoding distinguishes between fatal conditions, which prevent a dump
//! from being produced at all, and packet-level conditions, which are
//! handed to the error hook while the decoder skips to the next packet.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for p7d operations
pub type Result<T> = std::result::Result<T, Error>;

/// Comprehensive error type for all p7d operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The leading magic value does not name a known byte order
    #[error("invalid p7d header: magic 0x{magic:016x}")]
    InvalidHeader {
        /// The magic value read little-endian
        magic: u64,
    },

    /// The stream ends inside the fixed process-info prologue
    #[error("truncated p7d prologue: need {needed} bytes, have {available}")]
    TruncatedPrologue {
        /// Bytes required for magic and prologue
        needed: usize,
        /// Bytes actually present
        available: usize,
    },

    /// A packet starts with a record tag this decoder does not know
    #[error("invalid p7d packet: id(0x{tag:02x}), offset({offset}), unread({left})")]
    UnknownRecordType {
        /// The leading record tag
        tag: u8,
        /// Absolute offset just past the tag
        offset: usize,
        /// Payload bytes left unread
        left: usize,
    },

    /// A format descriptor carries a type tag with no known decoding
    #[error("unknown formatting type: {type_tag}, offset({offset})")]
    UnknownFormatDescriptorType {
        /// The descriptor type tag
        type_tag: u8,
        /// Absolute offset of the value
        offset: usize,
    },

    /// A fixed-width format descriptor declares the wrong byte width
    #[error("invalid size {size} for formatting type {type_tag}, offset({offset})")]
    InvalidFormatDescriptorSize {
        /// The descriptor type tag
        type_tag: u8,
        /// The declared size
        size: u8,
        /// Absolute offset of the value
        offset: usize,
    },

    /// Structurally malformed packet framing
    #[error("invalid p7d packet at offset({offset}), size({size}): {details}")]
    InvalidPacket {
        /// Absolute offset of the packet header word
        offset: usize,
        /// Declared packet size
        size: usize,
        /// Detailed description of the issue
        details: String,
    },

    /// A lower-level read failed while decoding a packet
    #[error("unhandled p7d reader failure at offset({offset}): {source}")]
    ReaderFailure {
        /// Absolute offset of the failing record
        offset: usize,
        /// Underlying reader error
        #[source]
        source: Box<Error>,
    },

    /// A read would run past the end of the cursor
    #[error("read of {wanted} bytes at offset {offset} exceeds {available} available")]
    OutOfRange {
        /// Absolute offset of the attempted read
        offset: usize,
        /// Bytes requested
        wanted: usize,
        /// Bytes remaining
        available: usize,
    },

    /// A line index past the end of the dump
    #[error("line {index} out of range: dump has {count} lines")]
    LineOutOfRange {
        /// Requested line index
        index: usize,
        /// Number of lines in the dump
        count: usize,
    },

    /// A log line references a string id that was never defined
    #[error("no string definition for id {str_id}")]
    UnknownString {
        /// The dangling string id
        str_id: u16,
    },

    /// Failed to read input file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        /// Path to the file that failed to read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to read from an input stream
    #[error("failed to read input stream: {source}")]
    StreamRead {
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Creates a new file read error
    pub fn file_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source,
        }
    }

    /// Creates a new stream read error
    pub fn stream_read(source: std::io::Error) -> Self {
        Self::StreamRead { source }
    }

    /// Creates a new invalid packet error
    pub fn invalid_packet(offset: usize, size: usize, details: impl Into<String>) -> Self {
        Self::InvalidPacket {
            offset,
            size,
            details: details.into(),
        }
    }

    /// Wraps a lower-level error with the offset it occurred at
    pub fn reader_failure(offset: usize, source: Error) -> Self {
        Self::ReaderFailure {
            offset,
            source: Box::new(source),
        }
    }

    /// Returns true if decoding can continue with the next packet
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::UnknownRecordType { .. }
                | Self::UnknownFormatDescriptorType { .. }
                | Self::InvalidFormatDescriptorSize { .. }
                | Self::InvalidPacket { .. }
                | Self::ReaderFailure { .. }
        )
    }
}
