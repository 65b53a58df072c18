//! The decoded dump model and its query API.
//!
//! A [`Dump`] is built once by the decoder and is read-only afterwards. It
//! holds the process prologue, the module table, every string definition
//! in arrival order and the log lines in stream order.
//!
//! Lines are rendered lazily: [`Dump::render`] and [`Dump::render_ex`]
//! resolve the line's string definition and hand its format text and the
//! decoded arguments to a [`Formatter`].

mod format;

use crate::error::{Error, Result};
use crate::reader::Endian;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

pub use format::{AppendArgsFormatter, Formatter, IdentityFormatter};

/// Name reported for module ids that were never registered
pub const UNKNOWN_MODULE: &str = "unknown";

/// Name reported for verbosity values outside the level table
pub const UNKNOWN_LEVEL: &str = "unknown";

/// Verbosity level of a log line
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Level {
    /// Finest-grained tracing
    Trace = 0,
    /// Debugging detail
    Debug = 1,
    /// Informational
    Info = 2,
    /// Warning
    Warn = 3,
    /// Error
    Err = 4,
    /// Critical failure
    Crit = 5,
}

impl Level {
    /// All levels, in ascending severity
    pub const ALL: [Level; 6] = [
        Level::Trace,
        Level::Debug,
        Level::Info,
        Level::Warn,
        Level::Err,
        Level::Crit,
    ];

    /// Returns the symbolic name of the level
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Err => "err",
            Level::Crit => "crit",
        }
    }
}

impl TryFrom<u8> for Level {
    type Error = u8;

    fn try_from(value: u8) -> std::result::Result<Self, u8> {
        Level::ALL.get(value as usize).copied().ok_or(value)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Symbolic name for a raw verbosity value, `"unknown"` if out of range
pub fn level_name(verbosity: u8) -> &'static str {
    Level::try_from(verbosity)
        .map(|level| level.as_str())
        .unwrap_or(UNKNOWN_LEVEL)
}

/// Process information from the dump prologue
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessInfo {
    /// Process id of the traced application
    pub process_id: u32,
    /// Creation timestamp, as written by the producer
    pub creation_time: u64,
    /// Process name
    pub process_name: String,
    /// Host name
    pub host_name: String,
}

/// How one positional argument of a log line is encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatDescriptor {
    /// Argument type tag
    pub type_tag: u8,
    /// Declared argument size in bytes
    pub size: u8,
}

/// One interned, possibly parameterized, format string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringDef {
    /// Producer-assigned id, not guaranteed unique
    pub id: u16,
    /// Module the string belongs to
    pub module_id: u16,
    /// Literal or format text
    pub text: String,
    /// Argument layout, `None` for literal strings
    pub descriptors: Option<Vec<FormatDescriptor>>,
    /// Source file of the logging call
    pub file_name: String,
    /// Source line of the logging call
    pub file_line: u16,
    /// Function containing the logging call
    pub func_name: String,
}

impl StringDef {
    /// Returns true if the string takes no arguments
    pub fn is_literal(&self) -> bool {
        self.descriptors.is_none()
    }
}

/// A decoded log-line argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Declared by the format but not materialized by the producer
    Null,
    /// 32-bit integer
    U32(u32),
    /// 64-bit integer
    U64(u64),
    /// Text argument
    Str(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::U32(v) => write!(f, "{}", v),
            Value::U64(v) => write!(f, "{}", v),
            Value::Str(s) => write!(f, "{:?}", s),
        }
    }
}

/// One decoded log event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    /// Id of the referenced string definition
    pub str_id: u16,
    /// Id of the logging thread
    pub thread_id: u32,
    /// Raw verbosity value
    pub verbosity: u8,
    /// Arguments, `None` when the definition takes none
    pub values: Option<Vec<Value>>,
}

impl LogLine {
    /// Arguments as a slice, empty when there are none
    pub fn values(&self) -> &[Value] {
        self.values.as_deref().unwrap_or(&[])
    }

    /// Verbosity as a [`Level`], if in range
    pub fn level(&self) -> Option<Level> {
        Level::try_from(self.verbosity).ok()
    }
}

/// Counters collected while decoding
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeStats {
    /// Packets framed
    pub packets: usize,
    /// Records applied to the model
    pub records: usize,
    /// Errors passed to the error hook
    pub errors: usize,
}

/// Structured view of one rendered line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineView<'a> {
    /// Module name, or [`UNKNOWN_MODULE`]
    pub module: &'a str,
    /// Source file
    pub file: &'a str,
    /// Source function
    pub function: &'a str,
    /// Source line
    pub line: u16,
    /// Logging thread
    pub thread_id: u32,
    /// Raw verbosity
    pub verbosity_num: u8,
    /// Verbosity name, or [`UNKNOWN_LEVEL`]
    pub verbosity: &'static str,
    /// Decoded arguments
    pub values: &'a [Value],
    /// Rendered text
    pub text: String,
}

/// A fully decoded P7 dump
#[derive(Debug, Clone)]
pub struct Dump {
    endian: Endian,
    process: ProcessInfo,
    stream_name: Option<String>,
    modules: BTreeMap<u16, String>,
    strings: Vec<StringDef>,
    /// First definition index per string id
    string_index: HashMap<u16, usize>,
    lines: Vec<LogLine>,
    stats: DecodeStats,
}

impl Dump {
    /// Byte order the dump was written in
    pub fn endian(&self) -> Endian {
        self.endian
    }

    /// Prologue process information
    pub fn process(&self) -> &ProcessInfo {
        &self.process
    }

    /// Name of the traced process
    pub fn process_name(&self) -> &str {
        &self.process.process_name
    }

    /// Id of the traced process
    pub fn process_id(&self) -> u32 {
        self.process.process_id
    }

    /// Host the process ran on
    pub fn host_name(&self) -> &str {
        &self.process.host_name
    }

    /// Creation timestamp, opaque
    pub fn creation_time(&self) -> u64 {
        self.process.creation_time
    }

    /// Stream name, if a stream-info record was present
    pub fn stream_name(&self) -> Option<&str> {
        self.stream_name.as_deref()
    }

    /// Decode counters
    pub fn stats(&self) -> DecodeStats {
        self.stats
    }

    /// Number of registered modules
    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    /// Module name for `id`, or [`UNKNOWN_MODULE`]
    pub fn module_name(&self, id: u16) -> &str {
        self.modules.get(&id).map(String::as_str).unwrap_or(UNKNOWN_MODULE)
    }

    /// Lowest module id registered under `name`
    pub fn module_id(&self, name: &str) -> Option<u16> {
        self.modules
            .iter()
            .find(|(_, module)| module.as_str() == name)
            .map(|(&id, _)| id)
    }

    /// Registered modules in id order
    pub fn modules(&self) -> impl Iterator<Item = (u16, &str)> + '_ {
        self.modules.iter().map(|(&id, name)| (id, name.as_str()))
    }

    /// Every string definition, duplicates included, in arrival order
    pub fn strings(&self) -> &[StringDef] {
        &self.strings
    }

    /// First string definition carrying `id`
    pub fn string_by_id(&self, id: u16) -> Option<&StringDef> {
        self.string_index.get(&id).map(|&index| &self.strings[index])
    }

    /// Number of log lines
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Log lines in stream order
    pub fn lines(&self) -> &[LogLine] {
        &self.lines
    }

    /// Log line at `index`
    pub fn line(&self, index: usize) -> Result<&LogLine> {
        self.lines.get(index).ok_or(Error::LineOutOfRange {
            index,
            count: self.lines.len(),
        })
    }

    fn resolve(&self, index: usize) -> Result<(&LogLine, &StringDef)> {
        let line = self.line(index)?;
        let def = self
            .string_by_id(line.str_id)
            .ok_or(Error::UnknownString {
                str_id: line.str_id,
            })?;
        Ok((line, def))
    }

    fn render_text(line: &LogLine, def: &StringDef, formatter: &impl Formatter) -> String {
        if def.is_literal() {
            def.text.clone()
        } else {
            formatter.format(&def.text, line.values())
        }
    }

    /// Render the text of line `index`.
    ///
    /// Literal strings are returned as stored. Parameterized strings go
    /// through `formatter`.
    pub fn render(&self, index: usize, formatter: &impl Formatter) -> Result<String> {
        let (line, def) = self.resolve(index)?;
        Ok(Self::render_text(line, def, formatter))
    }

    /// Render line `index` together with its metadata
    pub fn render_ex(&self, index: usize, formatter: &impl Formatter) -> Result<LineView<'_>> {
        let (line, def) = self.resolve(index)?;
        Ok(LineView {
            module: self.module_name(def.module_id),
            file: &def.file_name,
            function: &def.func_name,
            line: def.file_line,
            thread_id: line.thread_id,
            verbosity_num: line.verbosity,
            verbosity: level_name(line.verbosity),
            values: line.values(),
            text: Self::render_text(line, def, formatter),
        })
    }

    /// Call `callback` with the index of every line whose verbosity passes
    /// `test`, in line order
    pub fn for_each_verbosity(
        &self,
        mut test: impl FnMut(u8) -> bool,
        mut callback: impl FnMut(usize),
    ) {
        for (index, line) in self.lines.iter().enumerate() {
            if test(line.verbosity) {
                callback(index);
            }
        }
    }

    /// Indices of lines whose verbosity passes `test`, in line order
    pub fn lines_matching<'a>(
        &'a self,
        mut test: impl FnMut(u8) -> bool + 'a,
    ) -> impl Iterator<Item = usize> + 'a {
        self.lines
            .iter()
            .enumerate()
            .filter(move |(_, line)| test(line.verbosity))
            .map(|(index, _)| index)
    }
}

/// In-progress dump, owned by a single decode pass
#[derive(Debug)]
pub(crate) struct DumpBuilder {
    dump: Dump,
}

impl DumpBuilder {
    pub(crate) fn new(endian: Endian, process: ProcessInfo) -> Self {
        Self {
            dump: Dump {
                endian,
                process,
                stream_name: None,
                modules: BTreeMap::new(),
                strings: Vec::new(),
                string_index: HashMap::new(),
                lines: Vec::new(),
                stats: DecodeStats::default(),
            },
        }
    }

    pub(crate) fn set_stream_name(&mut self, name: String) {
        self.dump.stream_name = Some(name);
    }

    pub(crate) fn register_module(&mut self, id: u16, name: String) {
        self.dump.modules.insert(id, name);
    }

    pub(crate) fn define_string(&mut self, def: StringDef) {
        let index = self.dump.strings.len();
        self.dump.string_index.entry(def.id).or_insert(index);
        self.dump.strings.push(def);
    }

    pub(crate) fn string_by_id(&self, id: u16) -> Option<&StringDef> {
        self.dump.string_by_id(id)
    }

    pub(crate) fn push_line(&mut self, line: LogLine) {
        self.dump.lines.push(line);
    }

    pub(crate) fn stats_mut(&mut self) -> &mut DecodeStats {
        &mut self.dump.stats
    }

    pub(crate) fn finish(self) -> Dump {
        self.dump
    }
}
