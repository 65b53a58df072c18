//! # p7d-core
//!
//! A library for decoding P7 binary trace dumps (`.p7d`).
//!
//! This crate provides the core functionality for:
//! - Reading the dump prologue in either byte order
//! - Framing the packet stream and decoding its records
//! - Querying and rendering the decoded log lines
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`reader`]: Bounds-checked cursor, generic over byte order
//! - [`decoder`]: Header check, packet framing and record decoding
//! - [`dump`]: The decoded model, its query API and the formatter hook
//! - [`error`]: Error types and handling
//!
//! ## Example
//!
//! ```no_run
//! use p7d_core::{Decoder, IdentityFormatter};
//!
//! let data = std::fs::read("./session.p7d")?;
//!
//! let dump = Decoder::new().decode_with_hook(&data, |err| eprintln!("{}", err))?;
//! println!("{} on {}", dump.process_name(), dump.host_name());
//!
//! dump.for_each_verbosity(
//!     |verbosity| verbosity >= 3,
//!     |index| {
//!         if let Ok(line) = dump.render_ex(index, &IdentityFormatter) {
//!             println!("[{}] {}: {}", line.verbosity, line.module, line.text);
//!         }
//!     },
//! );
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Extensibility
//!
//! - [`Formatter`]: Substitute arguments into format text at render time
//! - [`ByteOrder`]: The primitive-read strategy behind [`Cursor`]
//!

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod decoder;
pub mod dump;
pub mod error;
pub mod reader;

#[cfg(test)]
mod testutil;

// Re-export primary types for convenience
pub use decoder::{
    decode_bytes, decode_file, log_error, Decoder, DecoderConfig, StreamCollector, WideOrder,
};
pub use dump::{
    level_name, AppendArgsFormatter, DecodeStats, Dump, FormatDescriptor, Formatter,
    IdentityFormatter, Level, LineView, LogLine, ProcessInfo, StringDef, Value,
};
pub use error::{Error, Result};
pub use reader::{BigEndian, ByteOrder, Cursor, Endian, LittleEndian};

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
