//! Packet framing.
//!
//! After the prologue, a dump is a sequence of packets. Each packet opens
//! with a 32-bit header word packing two fields:
//!
//! - bits 24..29: channel
//! - all other bits: packet size in bytes, header word included
//!
//! The framer always advances by the declared size, whatever happened while
//! decoding the payload. A corrupt record therefore costs at most its own
//! packet.

use super::record::decode_record;
use super::Codec;
use crate::dump::DumpBuilder;
use crate::error::{Error, Result};
use crate::reader::{ByteOrder, Cursor};
use tracing::{debug, trace};

/// Size of the packet header word, in bytes
pub(crate) const HEADER_LEN: usize = 4;

const CHANNEL_MASK: u32 = 0x1F00_0000;
const SIZE_MASK: u32 = 0xE0FF_FFFF;

/// Decoded packet header word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    /// Channel bits, left in place
    pub channel: u32,
    /// Packet size including the header word
    pub size: u32,
}

impl PacketHeader {
    /// Splits a raw header word into its fields
    pub fn from_word(word: u32) -> Self {
        Self {
            channel: word & CHANNEL_MASK,
            size: word & SIZE_MASK,
        }
    }

    /// Channel number, shifted down
    pub fn channel_index(&self) -> u8 {
        (self.channel >> 24) as u8
    }
}

/// Frames every packet after the prologue and decodes its records.
///
/// Packet-level errors go to `report`. Framing ends early only when it
/// cannot make forward progress: a zero size or a partial header word.
/// A size below the header length is reported and skipped like any other.
pub(crate) fn frame_packets<O: ByteOrder>(
    cur: &mut Cursor<'_, O>,
    builder: &mut DumpBuilder,
    codec: &Codec,
    report: &mut dyn FnMut(&mut DumpBuilder, Error),
) {
    while !cur.is_empty() {
        let offset = cur.tell_absolute();
        let Ok(word) = cur.peek_u32() else {
            report(
                builder,
                Error::invalid_packet(offset, cur.left(), "trailing bytes shorter than a packet header"),
            );
            break;
        };

        let header = PacketHeader::from_word(word);
        let size = header.size as usize;
        builder.stats_mut().packets += 1;
        trace!(
            "Packet at offset {}: channel {}, {} bytes",
            offset,
            header.channel_index(),
            size
        );

        if size == 0 {
            report(builder, Error::invalid_packet(offset, size, "zero-length packet"));
            break;
        }

        if size < HEADER_LEN {
            report(
                builder,
                Error::invalid_packet(offset, size, "declared size smaller than the header word"),
            );
        } else {
            if size > cur.left() {
                debug!(
                    "Packet at offset {} declares {} bytes, only {} remain",
                    offset,
                    size,
                    cur.left()
                );
                report(
                    builder,
                    Error::invalid_packet(
                        offset,
                        size,
                        format!("payload runs {} bytes past the end of the stream", size - cur.left()),
                    ),
                );
            }

            match payload(cur, size) {
                Ok(mut data) => decode_payload(&mut data, builder, codec, report),
                Err(err) => report(builder, Error::reader_failure(offset, err)),
            }
        }

        let advance = size.min(cur.left());
        if let Err(err) = cur.skip(advance) {
            report(builder, Error::reader_failure(offset, err));
            break;
        }
    }
}

/// Cursor over a packet's payload, positioned past the header word
fn payload<'a, O: ByteOrder>(cur: &Cursor<'a, O>, size: usize) -> Result<Cursor<'a, O>> {
    let mut data = cur.subrange(cur.tell() + size)?;
    data.skip(HEADER_LEN)?;
    Ok(data)
}

/// Decodes records until the payload is consumed or a record fails
fn decode_payload<O: ByteOrder>(
    data: &mut Cursor<'_, O>,
    builder: &mut DumpBuilder,
    codec: &Codec,
    report: &mut dyn FnMut(&mut DumpBuilder, Error),
) {
    while !data.is_empty() {
        let offset = data.tell_absolute();
        match decode_record(data, builder, codec) {
            Ok(()) => builder.stats_mut().records += 1,
            Err(err @ Error::OutOfRange { .. }) => {
                report(builder, Error::reader_failure(offset, err));
                break;
            }
            Err(err) => {
                report(builder, err);
                break;
            }
        }
    }
}
