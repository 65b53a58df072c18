//! Sequential reading over dump bytes.
//!
//! [`Cursor`] wraps a byte slice with a read offset. All reads are bounds
//! checked and fail with [`Error::OutOfRange`] instead of panicking, so a
//! corrupt packet can be abandoned without taking the whole decode down.
//!
//! ## Sub-ranges
//!
//! [`Cursor::subrange`] carves a child cursor out of the bytes ahead of the
//! current offset. The child remembers the absolute offset it starts at, so
//! [`Cursor::tell_absolute`] reports positions relative to the original
//! input no matter how deeply sub-ranges are nested.
//!
//! ## Strings
//!
//! Two string layouts appear in dumps:
//!
//! - fixed-width fields, zero padded ([`Cursor::fixed_string`])
//! - zero-terminated runs with no declared length ([`Cursor::zero_string`])
//!
//! Both take the text encoding to use. Two-byte encodings terminate on a
//! zero code unit, everything else on a single zero byte.

mod order;

use crate::error::{Error, Result};
use encoding_rs::Encoding;
use std::marker::PhantomData;

pub use order::{BigEndian, ByteOrder, Endian, LittleEndian};

/// Width in bytes of one code unit of `encoding`
fn unit_width(encoding: &'static Encoding) -> usize {
    if encoding == encoding_rs::UTF_16LE || encoding == encoding_rs::UTF_16BE {
        2
    } else {
        1
    }
}

/// Find the offset of the first all-zero code unit in `bytes`
fn find_terminator(bytes: &[u8], unit: usize) -> Option<usize> {
    bytes
        .chunks_exact(unit)
        .position(|chunk| chunk.iter().all(|&b| b == 0))
        .map(|index| index * unit)
}

fn decode_text(bytes: &[u8], encoding: &'static Encoding) -> String {
    let (text, _had_errors) = encoding.decode_without_bom_handling(bytes);
    text.into_owned()
}

/// Bounds-checked sequential reader, generic over byte order
#[derive(Debug, Clone)]
pub struct Cursor<'a, O> {
    data: &'a [u8],
    pos: usize,
    /// Absolute offset of `data[0]` in the outermost input
    origin: usize,
    order: PhantomData<O>,
}

impl<'a, O: ByteOrder> Cursor<'a, O> {
    /// Creates a cursor at the start of `data`
    pub fn new(data: &'a [u8]) -> Self {
        Self::at(data, 0)
    }

    /// Creates a cursor at `pos` within `data`, clamped to its length
    pub fn at(data: &'a [u8], pos: usize) -> Self {
        Self {
            data,
            pos: pos.min(data.len()),
            origin: 0,
            order: PhantomData,
        }
    }

    /// Byte order this cursor reads with
    pub fn endian(&self) -> Endian {
        O::ENDIAN
    }

    /// Current offset within this cursor's slice
    pub fn tell(&self) -> usize {
        self.pos
    }

    /// Current offset within the outermost input
    pub fn tell_absolute(&self) -> usize {
        self.origin + self.pos
    }

    /// Number of unread bytes
    pub fn left(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Returns true when every byte has been consumed
    pub fn is_empty(&self) -> bool {
        self.left() == 0
    }

    fn ensure(&self, wanted: usize) -> Result<()> {
        if wanted > self.left() {
            return Err(Error::OutOfRange {
                offset: self.tell_absolute(),
                wanted,
                available: self.left(),
            });
        }
        Ok(())
    }

    fn peek_with<T>(&self, width: usize, read: impl FnOnce(&mut &'a [u8]) -> T) -> Result<T> {
        self.ensure(width)?;
        let mut buf = &self.data[self.pos..self.pos + width];
        Ok(read(&mut buf))
    }

    fn read_with<T>(&mut self, width: usize, read: impl FnOnce(&mut &'a [u8]) -> T) -> Result<T> {
        let value = self.peek_with(width, read)?;
        self.pos += width;
        Ok(value)
    }

    /// Read one byte
    pub fn u8(&mut self) -> Result<u8> {
        self.read_with(1, |buf| buf[0])
    }

    /// Read a 16-bit unsigned integer
    pub fn u16(&mut self) -> Result<u16> {
        self.read_with(2, O::read_u16)
    }

    /// Read a 32-bit unsigned integer
    pub fn u32(&mut self) -> Result<u32> {
        self.read_with(4, O::read_u32)
    }

    /// Read a 64-bit unsigned integer
    pub fn u64(&mut self) -> Result<u64> {
        self.read_with(8, O::read_u64)
    }

    /// Read one byte without advancing
    pub fn peek_u8(&self) -> Result<u8> {
        self.peek_with(1, |buf| buf[0])
    }

    /// Read a 16-bit unsigned integer without advancing
    pub fn peek_u16(&self) -> Result<u16> {
        self.peek_with(2, O::read_u16)
    }

    /// Read a 32-bit unsigned integer without advancing
    pub fn peek_u32(&self) -> Result<u32> {
        self.peek_with(4, O::read_u32)
    }

    /// Read a 64-bit unsigned integer without advancing
    pub fn peek_u64(&self) -> Result<u64> {
        self.peek_with(8, O::read_u64)
    }

    /// Advance by `count` bytes without interpreting them.
    ///
    /// Returns the new offset.
    pub fn skip(&mut self, count: usize) -> Result<usize> {
        self.ensure(count)?;
        self.pos += count;
        Ok(self.pos)
    }

    /// Abandon the rest of the slice
    pub fn finish(&mut self) -> usize {
        self.pos = self.data.len();
        self.pos
    }

    /// Creates a child cursor over `[tell(), end)`.
    ///
    /// `end` is an offset in this cursor's coordinates and is clamped to the
    /// slice length. The child starts at offset zero and reports absolute
    /// offsets through its parent's position.
    pub fn subrange(&self, end: usize) -> Result<Cursor<'a, O>> {
        if end < self.pos {
            return Err(Error::OutOfRange {
                offset: self.tell_absolute(),
                wanted: 0,
                available: self.left(),
            });
        }
        let end = end.min(self.data.len());
        Ok(Cursor {
            data: &self.data[self.pos..end],
            pos: 0,
            origin: self.tell_absolute(),
            order: PhantomData,
        })
    }

    /// Read a zero-padded string field of exactly `width` bytes.
    ///
    /// Text stops at the first terminator inside the field. A field with no
    /// terminator is decoded in full. The cursor always moves by `width`.
    pub fn fixed_string(&mut self, width: usize, encoding: &'static Encoding) -> Result<String> {
        self.ensure(width)?;
        let unit = unit_width(encoding);
        let field = &self.data[self.pos..self.pos + width];
        let end = find_terminator(field, unit).unwrap_or(field.len() - field.len() % unit);
        let text = decode_text(&field[..end], encoding);
        self.pos += width;
        Ok(text)
    }

    /// Read a zero-terminated string and step past its terminator.
    ///
    /// Fails without moving if no terminator occurs before the end of the
    /// slice.
    pub fn zero_string(&mut self, encoding: &'static Encoding) -> Result<String> {
        let unit = unit_width(encoding);
        let rest = &self.data[self.pos..];
        let Some(end) = find_terminator(rest, unit) else {
            return Err(Error::OutOfRange {
                offset: self.tell_absolute(),
                wanted: rest.len() - rest.len() % unit + unit,
                available: rest.len(),
            });
        };
        let text = decode_text(&rest[..end], encoding);
        self.pos += end + unit;
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::{UTF_16BE, UTF_16LE, WINDOWS_1252};

    fn utf16le(text: &str) -> Vec<u8> {
        text.encode_utf16().flat_map(u16::to_le_bytes).collect()
    }

    #[test]
    fn test_primitive_reads_advance() {
        let data = [0xAA, 0x01, 0x00, 0x02, 0x00, 0x00, 0x00];
        let mut cur = Cursor::<LittleEndian>::new(&data);
        assert_eq!(cur.u8().unwrap(), 0xAA);
        assert_eq!(cur.u16().unwrap(), 1);
        assert_eq!(cur.u32().unwrap(), 2);
        assert_eq!(cur.tell(), 7);
        assert!(cur.is_empty());
    }

    #[test]
    fn test_byte_order_selects_layout() {
        let data = [0x00, 0x00, 0x00, 0x2A];
        assert_eq!(Cursor::<BigEndian>::new(&data).u32().unwrap(), 42);
        assert_eq!(
            Cursor::<LittleEndian>::new(&data).u32().unwrap(),
            0x2A00_0000
        );
    }

    #[test]
    fn test_peek_does_not_advance() {
        let data = 0x1122_3344_5566_7788u64.to_be_bytes();
        let cur = Cursor::<BigEndian>::new(&data);
        assert_eq!(cur.peek_u64().unwrap(), 0x1122_3344_5566_7788);
        assert_eq!(cur.peek_u16().unwrap(), 0x1122);
        assert_eq!(cur.peek_u8().unwrap(), 0x11);
        assert_eq!(cur.tell(), 0);
    }

    #[test]
    fn test_out_of_range_read() {
        let data = [0x01, 0x02, 0x03];
        let mut cur = Cursor::<LittleEndian>::at(&data, 1);
        match cur.u32() {
            Err(Error::OutOfRange {
                offset,
                wanted,
                available,
            }) => {
                assert_eq!(offset, 1);
                assert_eq!(wanted, 4);
                assert_eq!(available, 2);
            }
            other => panic!("expected OutOfRange, got {:?}", other),
        }
        // A failed read leaves the offset alone
        assert_eq!(cur.tell(), 1);
        assert!(cur.skip(3).is_err());
        assert_eq!(cur.skip(2).unwrap(), 3);
    }

    #[test]
    fn test_subrange_absolute_offsets() {
        let data = [0u8; 32];
        let mut outer = Cursor::<LittleEndian>::at(&data, 8);
        let mut child = outer.subrange(24).unwrap();
        assert_eq!(child.left(), 16);
        child.skip(4).unwrap();
        assert_eq!(child.tell(), 4);
        assert_eq!(child.tell_absolute(), 12);

        let mut grandchild = child.subrange(10).unwrap();
        grandchild.skip(2).unwrap();
        assert_eq!(grandchild.left(), 4);
        assert_eq!(grandchild.tell_absolute(), 14);

        // Parent position is independent of the child
        outer.skip(1).unwrap();
        assert_eq!(outer.tell(), 9);
    }

    #[test]
    fn test_subrange_clamps_to_slice() {
        let data = [0u8; 10];
        let cur = Cursor::<LittleEndian>::at(&data, 6);
        assert_eq!(cur.subrange(100).unwrap().left(), 4);
        assert!(cur.subrange(2).is_err());
    }

    #[test]
    fn test_finish() {
        let data = [1u8, 2, 3, 4];
        let mut cur = Cursor::<LittleEndian>::new(&data);
        cur.u8().unwrap();
        assert_eq!(cur.finish(), 4);
        assert_eq!(cur.left(), 0);
        assert!(cur.u8().is_err());
    }

    #[test]
    fn test_fixed_string_advances_by_width() {
        let mut data = utf16le("host");
        data.resize(16, 0);
        data.push(0x7F);
        let mut cur = Cursor::<LittleEndian>::new(&data);
        assert_eq!(cur.fixed_string(16, UTF_16LE).unwrap(), "host");
        assert_eq!(cur.tell(), 16);
        assert_eq!(cur.u8().unwrap(), 0x7F);
    }

    #[test]
    fn test_fixed_string_without_terminator_uses_full_width() {
        let data = b"corelib!";
        let mut cur = Cursor::<LittleEndian>::new(data);
        assert_eq!(cur.fixed_string(4, WINDOWS_1252).unwrap(), "core");
        assert_eq!(cur.tell(), 4);
        assert!(cur.fixed_string(8, WINDOWS_1252).is_err());
    }

    #[test]
    fn test_zero_string_narrow_and_wide() {
        let mut data = b"main.cpp\0".to_vec();
        data.extend(utf16le("x=%u"));
        data.extend([0, 0]);
        data.push(0xEE);

        let mut cur = Cursor::<LittleEndian>::new(&data);
        assert_eq!(cur.zero_string(WINDOWS_1252).unwrap(), "main.cpp");
        assert_eq!(cur.tell(), 9);
        assert_eq!(cur.zero_string(UTF_16LE).unwrap(), "x=%u");
        assert_eq!(cur.left(), 1);
    }

    #[test]
    fn test_zero_string_big_endian_wide() {
        let mut data: Vec<u8> = "ok".encode_utf16().flat_map(u16::to_be_bytes).collect();
        data.extend([0, 0]);
        let mut cur = Cursor::<BigEndian>::new(&data);
        assert_eq!(cur.zero_string(UTF_16BE).unwrap(), "ok");
        assert!(cur.is_empty());
    }

    #[test]
    fn test_zero_string_unterminated_fails() {
        let data = b"no end";
        let mut cur = Cursor::<LittleEndian>::new(data);
        assert!(matches!(
            cur.zero_string(WINDOWS_1252),
            Err(Error::OutOfRange { .. })
        ));
        assert_eq!(cur.tell(), 0);
    }
}
