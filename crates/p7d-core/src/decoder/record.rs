//! Record decoding.
//!
//! Every record starts with a one-byte type tag. Records either consume
//! exactly their own bytes or abandon the rest of the packet payload, so a
//! packet may carry several definition records back to back.
//!
//! | Tag    | Record                |
//! |--------|-----------------------|
//! | `0x00` | Stream info           |
//! | `0x20` | String definition     |
//! | `0x40` | Log line              |
//! | `0x60` | Reserved, ignored     |
//! | `0x80` | Terminator, ignored   |
//! | `0xE0` | Module registration   |

use super::Codec;
use crate::dump::{DumpBuilder, FormatDescriptor, LogLine, StringDef, Value};
use crate::error::{Error, Result};
use crate::reader::{ByteOrder, Cursor};
use tracing::{debug, trace};

/// Width of the stream name field, in bytes
const STREAM_NAME_WIDTH: usize = 128;

/// Width of the module name field, in bytes
const MODULE_NAME_WIDTH: usize = 0x36;

/// Record types carried in packet payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RecordType {
    /// Stream description
    StreamInfo = 0x00,
    /// Interned format string
    StringDef = 0x20,
    /// Log event
    LogLine = 0x40,
    /// Undocumented, skipped
    Reserved = 0x60,
    /// End-of-stream marker, skipped
    Terminator = 0x80,
    /// Module id to name mapping
    Module = 0xE0,
}

impl TryFrom<u8> for RecordType {
    type Error = u8;

    fn try_from(value: u8) -> std::result::Result<Self, u8> {
        match value {
            0x00 => Ok(RecordType::StreamInfo),
            0x20 => Ok(RecordType::StringDef),
            0x40 => Ok(RecordType::LogLine),
            0x60 => Ok(RecordType::Reserved),
            0x80 => Ok(RecordType::Terminator),
            0xE0 => Ok(RecordType::Module),
            other => Err(other),
        }
    }
}

/// Argument type tags used by format descriptors
pub mod arg {
    /// Declared, never materialized
    pub const NULL: u8 = 1;
    /// 32-bit value followed by 4 reserved bytes
    pub const U32: u8 = 4;
    /// 64-bit value, descriptor size must be 8
    pub const U64: u8 = 5;
    /// Zero-terminated two-byte string
    pub const WIDE_STR: u8 = 8;
    /// Zero-terminated single-byte string
    pub const NARROW_STR: u8 = 9;
}

/// Decode one record from `data` into `builder`
pub(crate) fn decode_record<O: ByteOrder>(
    data: &mut Cursor<'_, O>,
    builder: &mut DumpBuilder,
    codec: &Codec,
) -> Result<()> {
    let tag = data.u8()?;
    let Ok(record) = RecordType::try_from(tag) else {
        return Err(Error::UnknownRecordType {
            tag,
            offset: data.tell_absolute(),
            left: data.left(),
        });
    };
    trace!("Record {:?} at offset {}", record, data.tell_absolute() - 1);

    match record {
        RecordType::StreamInfo => {
            data.skip(35)?;
            let name = data.fixed_string(STREAM_NAME_WIDTH, codec.wide)?;
            builder.set_stream_name(name);
        }
        RecordType::Module => {
            data.skip(3)?;
            let id = data.u16()?;
            data.skip(4)?;
            let name = data.fixed_string(MODULE_NAME_WIDTH, codec.narrow)?;
            builder.register_module(id, name);
        }
        RecordType::StringDef => {
            let def = decode_string_def(data, codec)?;
            builder.define_string(def);
        }
        RecordType::LogLine => {
            let line = decode_log_line(data, builder, codec)?;
            builder.push_line(line);
            data.finish();
        }
        RecordType::Reserved | RecordType::Terminator => {
            data.finish();
        }
    }

    Ok(())
}

fn decode_string_def<O: ByteOrder>(data: &mut Cursor<'_, O>, codec: &Codec) -> Result<StringDef> {
    data.skip(2)?;
    let id = data.u16()?;
    data.skip(1)?;
    let file_line = data.u16()?;
    let module_id = data.u16()?;
    let count = data.u16()?;

    let descriptors = if count > 0 {
        let mut descriptors = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let type_tag = data.u8()?;
            let size = data.u8()?;
            descriptors.push(FormatDescriptor { type_tag, size });
        }
        Some(descriptors)
    } else {
        None
    };

    let text = data.zero_string(codec.wide)?;
    let file_name = data.zero_string(codec.narrow)?;
    let func_name = data.zero_string(codec.narrow)?;

    Ok(StringDef {
        id,
        module_id,
        text,
        descriptors,
        file_name,
        file_line,
        func_name,
    })
}

fn decode_log_line<O: ByteOrder>(
    data: &mut Cursor<'_, O>,
    builder: &DumpBuilder,
    codec: &Codec,
) -> Result<LogLine> {
    data.skip(2)?;
    let str_id = data.u16()?;
    data.skip(1)?;
    let verbosity = data.u8()?;
    data.skip(1)?;
    let thread_id = data.u32()?;
    data.skip(12)?;

    let descriptors = match builder.string_by_id(str_id) {
        Some(def) => def.descriptors.as_deref(),
        None => {
            debug!("Log line references undefined string id {}", str_id);
            None
        }
    };

    let values = match descriptors {
        Some(descriptors) => Some(
            descriptors
                .iter()
                .map(|descriptor| decode_value(data, *descriptor, codec))
                .collect::<Result<Vec<_>>>()?,
        ),
        None => None,
    };

    Ok(LogLine {
        str_id,
        thread_id,
        verbosity,
        values,
    })
}

fn decode_value<O: ByteOrder>(
    data: &mut Cursor<'_, O>,
    descriptor: FormatDescriptor,
    codec: &Codec,
) -> Result<Value> {
    match descriptor.type_tag {
        arg::NULL => Ok(Value::Null),
        arg::U32 => {
            let value = data.u32()?;
            data.skip(4)?;
            Ok(Value::U32(value))
        }
        arg::U64 => {
            if descriptor.size != 8 {
                return Err(Error::InvalidFormatDescriptorSize {
                    type_tag: descriptor.type_tag,
                    size: descriptor.size,
                    offset: data.tell_absolute(),
                });
            }
            Ok(Value::U64(data.u64()?))
        }
        arg::WIDE_STR => Ok(Value::Str(data.zero_string(codec.wide)?)),
        arg::NARROW_STR => Ok(Value::Str(data.zero_string(codec.narrow)?)),
        type_tag => Err(Error::UnknownFormatDescriptorType {
            type_tag,
            offset: data.tell_absolute(),
        }),
    }
}
