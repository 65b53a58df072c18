//! Synthetic dump encoding for tests.

use crate::decoder::{arg, MAGIC_BE, MAGIC_LE};
use crate::dump::{FormatDescriptor, Value};
use crate::reader::Endian;
use bytes::{BufMut, BytesMut};

/// A log-line argument together with its wire encoding
#[derive(Debug, Clone)]
pub(crate) enum Arg {
    Null,
    U32(u32),
    U64(u64),
    Wide(String),
    Narrow(String),
}

impl Arg {
    pub(crate) fn descriptor(&self) -> FormatDescriptor {
        let (type_tag, size) = match self {
            Arg::Null => (arg::NULL, 0),
            Arg::U32(_) => (arg::U32, 4),
            Arg::U64(_) => (arg::U64, 8),
            Arg::Wide(_) => (arg::WIDE_STR, 0),
            Arg::Narrow(_) => (arg::NARROW_STR, 0),
        };
        FormatDescriptor { type_tag, size }
    }

    pub(crate) fn value(&self) -> Value {
        match self {
            Arg::Null => Value::Null,
            Arg::U32(v) => Value::U32(*v),
            Arg::U64(v) => Value::U64(*v),
            Arg::Wide(s) | Arg::Narrow(s) => Value::Str(s.clone()),
        }
    }
}

/// Byte writer that follows a dump's byte order.
///
/// Two-byte text is written little-endian unless set otherwise, as
/// producers do on every platform.
pub(crate) struct Writer {
    endian: Endian,
    text: Endian,
    buf: BytesMut,
}

impl Writer {
    pub(crate) fn new(endian: Endian) -> Self {
        Self::with_text(endian, Endian::Little)
    }

    pub(crate) fn with_text(endian: Endian, text: Endian) -> Self {
        Self {
            endian,
            text,
            buf: BytesMut::new(),
        }
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub(crate) fn u8(&mut self, v: u8) -> &mut Self {
        self.buf.put_u8(v);
        self
    }

    pub(crate) fn u16(&mut self, v: u16) -> &mut Self {
        match self.endian {
            Endian::Little => self.buf.put_u16_le(v),
            Endian::Big => self.buf.put_u16(v),
        }
        self
    }

    pub(crate) fn u32(&mut self, v: u32) -> &mut Self {
        match self.endian {
            Endian::Little => self.buf.put_u32_le(v),
            Endian::Big => self.buf.put_u32(v),
        }
        self
    }

    pub(crate) fn u64(&mut self, v: u64) -> &mut Self {
        match self.endian {
            Endian::Little => self.buf.put_u64_le(v),
            Endian::Big => self.buf.put_u64(v),
        }
        self
    }

    pub(crate) fn zeros(&mut self, count: usize) -> &mut Self {
        self.buf.put_bytes(0, count);
        self
    }

    pub(crate) fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.put_slice(bytes);
        self
    }

    fn wide(&mut self, text: &str) -> usize {
        let mut written = 0;
        for unit in text.encode_utf16() {
            match self.text {
                Endian::Little => self.buf.put_u16_le(unit),
                Endian::Big => self.buf.put_u16(unit),
            }
            written += 2;
        }
        written
    }

    pub(crate) fn wide_z(&mut self, text: &str) -> &mut Self {
        self.wide(text);
        self.zeros(2)
    }

    pub(crate) fn narrow_z(&mut self, text: &str) -> &mut Self {
        self.raw(text.as_bytes()).u8(0)
    }

    pub(crate) fn wide_fixed(&mut self, width: usize, text: &str) -> &mut Self {
        let written = self.wide(text);
        assert!(written < width, "'{}' does not fit in {} bytes", text, width);
        self.zeros(width - written)
    }

    pub(crate) fn narrow_fixed(&mut self, width: usize, text: &str) -> &mut Self {
        assert!(text.len() < width, "'{}' does not fit in {} bytes", text, width);
        self.raw(text.as_bytes()).zeros(width - text.len())
    }

    pub(crate) fn stream_info(&mut self, name: &str) -> &mut Self {
        self.u8(0x00).zeros(35).wide_fixed(128, name)
    }

    pub(crate) fn module(&mut self, id: u16, name: &str) -> &mut Self {
        self.u8(0xE0)
            .zeros(3)
            .u16(id)
            .zeros(4)
            .narrow_fixed(0x36, name)
    }

    pub(crate) fn string_def(
        &mut self,
        id: u16,
        module_id: u16,
        text: &str,
        descriptors: &[FormatDescriptor],
    ) -> &mut Self {
        self.u8(0x20)
            .zeros(2)
            .u16(id)
            .zeros(1)
            .u16(10)
            .u16(module_id)
            .u16(descriptors.len() as u16);
        for descriptor in descriptors {
            self.u8(descriptor.type_tag).u8(descriptor.size);
        }
        self.wide_z(text).narrow_z("main.cpp").narrow_z("main")
    }

    pub(crate) fn log_line(
        &mut self,
        str_id: u16,
        verbosity: u8,
        thread_id: u32,
        args: &[Arg],
    ) -> &mut Self {
        self.u8(0x40)
            .zeros(2)
            .u16(str_id)
            .zeros(1)
            .u8(verbosity)
            .zeros(1)
            .u32(thread_id)
            .zeros(12);
        for value in args {
            match value {
                Arg::Null => {}
                Arg::U32(v) => {
                    self.u32(*v).zeros(4);
                }
                Arg::U64(v) => {
                    self.u64(*v);
                }
                Arg::Wide(s) => {
                    self.wide_z(s);
                }
                Arg::Narrow(s) => {
                    self.narrow_z(s);
                }
            }
        }
        self
    }
}

/// Builds a complete synthetic dump, one packet per call
pub(crate) struct StreamBuilder {
    endian: Endian,
    text: Endian,
    out: Writer,
    channel: u8,
}

impl StreamBuilder {
    pub(crate) fn new(endian: Endian) -> Self {
        let magic = match endian {
            Endian::Little => MAGIC_LE,
            Endian::Big => MAGIC_BE,
        };
        let mut out = Writer::new(endian);
        out.raw(&magic.to_le_bytes());
        Self {
            endian,
            text: Endian::Little,
            out,
            channel: 0,
        }
    }

    /// Write two-byte text in the stream's byte order from here on
    pub(crate) fn stream_order_text(mut self) -> Self {
        self.text = self.endian;
        self.out.text = self.endian;
        self
    }

    pub(crate) fn prologue(mut self, process_id: u32, creation_time: u64, process: &str, host: &str) -> Self {
        self.out
            .u32(process_id)
            .u64(creation_time)
            .wide_fixed(0x200, process)
            .wide_fixed(0x200, host);
        self
    }

    /// Channel for the packets that follow
    pub(crate) fn channel(mut self, channel: u8) -> Self {
        self.channel = channel;
        self
    }

    pub(crate) fn packet(mut self, fill: impl FnOnce(&mut Writer)) -> Self {
        let mut payload = Writer::with_text(self.endian, self.text);
        fill(&mut payload);
        let size = (payload.as_bytes().len() + 4) as u32;
        assert!(size <= 0x00FF_FFFF, "packet too large for the size field");
        let word = size | (u32::from(self.channel) << 24 & 0x1F00_0000);
        self.out.u32(word).raw(payload.as_bytes());
        self
    }

    /// Bytes outside any packet
    pub(crate) fn raw(mut self, bytes: &[u8]) -> Self {
        self.out.raw(bytes);
        self
    }

    /// A bare header word with no payload
    pub(crate) fn raw_word(mut self, word: u32) -> Self {
        self.out.u32(word);
        self
    }

    pub(crate) fn stream_info(self, name: &str) -> Self {
        self.packet(|w| {
            w.stream_info(name);
        })
    }

    pub(crate) fn module(self, id: u16, name: &str) -> Self {
        self.packet(|w| {
            w.module(id, name);
        })
    }

    pub(crate) fn string(self, id: u16, module_id: u16, text: &str, args: &[Arg]) -> Self {
        let descriptors: Vec<_> = args.iter().map(Arg::descriptor).collect();
        self.packet(|w| {
            w.string_def(id, module_id, text, &descriptors);
        })
    }

    /// String definition with raw `(type_tag, size)` descriptors
    pub(crate) fn string_with(self, id: u16, module_id: u16, text: &str, descriptors: &[(u8, u8)]) -> Self {
        let descriptors: Vec<_> = descriptors
            .iter()
            .map(|&(type_tag, size)| FormatDescriptor { type_tag, size })
            .collect();
        self.packet(|w| {
            w.string_def(id, module_id, text, &descriptors);
        })
    }

    pub(crate) fn log_line(self, str_id: u16, verbosity: u8, thread_id: u32, args: &[Arg]) -> Self {
        self.packet(|w| {
            w.log_line(str_id, verbosity, thread_id, args);
        })
    }

    pub(crate) fn build(self) -> Vec<u8> {
        self.out.buf.to_vec()
    }
}
