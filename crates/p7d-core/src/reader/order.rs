//! Byte-order strategies for the [`Cursor`](super::Cursor).
//!
//! A dump is written entirely in one byte order, chosen by the producer and
//! announced through the magic header. Each strategy is a zero-sized type so
//! the decoder is monomorphized once per order instead of branching on every
//! primitive read.

use bytes::Buf;
use encoding_rs::Encoding;
use std::fmt;

/// Byte order of a dump, as a plain value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endian {
    /// Least significant byte first
    Little,
    /// Most significant byte first
    Big,
}

impl Endian {
    /// Returns the lowercase name of the byte order
    pub fn as_str(&self) -> &'static str {
        match self {
            Endian::Little => "little-endian",
            Endian::Big => "big-endian",
        }
    }
}

impl fmt::Display for Endian {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strategy for decoding multi-byte integers.
///
/// Implementations read from the front of `buf` and advance it. Callers
/// guarantee that `buf` holds enough bytes.
pub trait ByteOrder: Copy + fmt::Debug + Default + Send + Sync + 'static {
    /// The order as a plain value
    const ENDIAN: Endian;

    /// Two-byte text encoding matching this order
    fn wide_encoding() -> &'static Encoding;

    /// Read a 16-bit unsigned integer
    fn read_u16(buf: &mut &[u8]) -> u16;

    /// Read a 32-bit unsigned integer
    fn read_u32(buf: &mut &[u8]) -> u32;

    /// Read a 64-bit unsigned integer
    fn read_u64(buf: &mut &[u8]) -> u64;
}

/// Little-endian byte order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LittleEndian;

/// Big-endian byte order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BigEndian;

impl ByteOrder for LittleEndian {
    const ENDIAN: Endian = Endian::Little;

    fn wide_encoding() -> &'static Encoding {
        encoding_rs::UTF_16LE
    }

    fn read_u16(buf: &mut &[u8]) -> u16 {
        buf.get_u16_le()
    }

    fn read_u32(buf: &mut &[u8]) -> u32 {
        buf.get_u32_le()
    }

    fn read_u64(buf: &mut &[u8]) -> u64 {
        buf.get_u64_le()
    }
}

impl ByteOrder for BigEndian {
    const ENDIAN: Endian = Endian::Big;

    fn wide_encoding() -> &'static Encoding {
        encoding_rs::UTF_16BE
    }

    fn read_u16(buf: &mut &[u8]) -> u16 {
        buf.get_u16()
    }

    fn read_u32(buf: &mut &[u8]) -> u32 {
        buf.get_u32()
    }

    fn read_u64(buf: &mut &[u8]) -> u64 {
        buf.get_u64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_little_endian_reads() {
        let data = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
        let mut buf = &data[..];
        assert_eq!(LittleEndian::read_u16(&mut buf), 0x0201);
        assert_eq!(LittleEndian::read_u16(&mut buf), 0x0403);
        assert_eq!(buf.len(), 4);

        let mut buf = &data[..];
        assert_eq!(LittleEndian::read_u64(&mut buf), 0x0807_0605_0403_0201);
    }

    #[test]
    fn test_big_endian_reads() {
        let data = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
        let mut buf = &data[..];
        assert_eq!(BigEndian::read_u32(&mut buf), 0x0102_0304);
        assert_eq!(BigEndian::read_u32(&mut buf), 0x0506_0708);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_wide_encoding_follows_order() {
        assert_eq!(LittleEndian::wide_encoding(), encoding_rs::UTF_16LE);
        assert_eq!(BigEndian::wide_encoding(), encoding_rs::UTF_16BE);
        assert_eq!(BigEndian::ENDIAN.to_string(), "big-endian");
    }
}
