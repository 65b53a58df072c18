//! p7d - Inspect P7 binary trace dumps
//!
//! This tool decodes `.p7d` dumps and prints their process information
//! and log lines, optionally filtered by verbosity.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, ValueEnum};
use p7d_core::{
    AppendArgsFormatter, Decoder, DecoderConfig, Dump, Formatter, IdentityFormatter, Level,
    WideOrder,
};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace, warn};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

/// Decode and print P7 binary trace dumps
#[derive(Parser, Debug)]
#[command(name = "p7d")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(flatten)]
    input: InputMode,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Output format
    #[arg(long, value_enum, default_value = "lines")]
    format: OutputFormat,

    /// Only print lines at or above this level
    #[arg(long, value_enum)]
    min_level: Option<MinLevel>,

    /// Append decoded arguments to every formatted line
    #[arg(long)]
    show_args: bool,

    /// Fail if any packet could not be decoded
    #[arg(long)]
    strict: bool,

    /// Decode two-byte text in the dump's byte order instead of little-endian
    #[arg(long)]
    stream_order_text: bool,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct InputMode {
    /// Path to a single dump file, or `-` for standard input
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Path to a directory searched recursively for .p7d files
    #[arg(short, long)]
    directory: Option<PathBuf>,
}

/// Output format for decoded dumps
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Process information and counters only
    Summary,
    /// Summary followed by one rendered line per record
    Lines,
    /// Summary followed by lines with module, source and thread
    Detailed,
}

/// Minimum verbosity filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum MinLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Err,
    Crit,
}

impl From<MinLevel> for Level {
    fn from(level: MinLevel) -> Self {
        match level {
            MinLevel::Trace => Level::Trace,
            MinLevel::Debug => Level::Debug,
            MinLevel::Info => Level::Info,
            MinLevel::Warn => Level::Warn,
            MinLevel::Err => Level::Err,
            MinLevel::Crit => Level::Crit,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    // Dispatch based on input mode
    if let Some(ref file) = cli.input.file {
        process_single_file(&cli, file)
    } else if let Some(ref directory) = cli.input.directory {
        process_directory(&cli, directory)
    } else {
        bail!("Either --file or --directory must be specified")
    }
}

fn decoder(cli: &Cli) -> Decoder {
    let mut config = DecoderConfig::new();
    if cli.stream_order_text {
        config = config.wide_order(WideOrder::Stream);
    }
    Decoder::with_config(config)
}

/// Process a single dump file or standard input
fn process_single_file(cli: &Cli, file: &Path) -> Result<()> {
    let (name, dump) = if file == Path::new("-") {
        let name = "<stdin>".to_string();
        let dump = decode_source(cli, &name, |decoder, hook| {
            decoder.decode_reader(io::stdin().lock(), hook)
        })?;
        (name, dump)
    } else {
        if !file.exists() {
            bail!("Input file does not exist: {}", file.display());
        }
        if !file.is_file() {
            bail!("Input path is not a file: {}", file.display());
        }
        let name = file.display().to_string();
        let dump = decode_source(cli, &name, |decoder, hook| decoder.decode_file(file, hook))?;
        (name, dump)
    };

    let mut out = io::stdout().lock();
    print_dump(cli, &name, &dump, &mut out)
}

/// Process a directory of dumps recursively
fn process_directory(cli: &Cli, directory: &Path) -> Result<()> {
    if !directory.exists() {
        bail!("Directory does not exist: {}", directory.display());
    }
    if !directory.is_dir() {
        bail!("Path is not a directory: {}", directory.display());
    }

    info!("Scanning directory: {}", directory.display());

    let mut out = io::stdout().lock();
    let mut dumps_processed = 0;
    let mut failures = 0;

    for entry in WalkDir::new(directory)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();

        if !path.is_file() || !is_dump_file(path) {
            trace!("Skipping: {}", path.display());
            continue;
        }

        debug!("Processing dump: {}", path.display());
        let name = path.display().to_string();
        let result = decode_source(cli, &name, |decoder, hook| decoder.decode_file(path, hook))
            .and_then(|dump| print_dump(cli, &name, &dump, &mut out));
        if let Err(e) = result {
            // Log error but continue with other files
            warn!("Error processing {}: {:#}", path.display(), e);
            failures += 1;
        }
        dumps_processed += 1;
    }

    info!(
        "Processed {} dumps, {} failed",
        dumps_processed, failures
    );

    if cli.strict && failures > 0 {
        bail!("{} of {} dumps failed to decode", failures, dumps_processed);
    }

    Ok(())
}

/// Returns true for visible files with a `.p7d` extension
fn is_dump_file(path: &Path) -> bool {
    let hidden = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(false);
    let is_p7d = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("p7d"))
        .unwrap_or(false);
    !hidden && is_p7d
}

/// Decode through `decode`, counting packet-level errors.
///
/// In strict mode any reported error fails the whole source.
fn decode_source(
    cli: &Cli,
    name: &str,
    decode: impl FnOnce(&Decoder, &mut dyn FnMut(p7d_core::Error)) -> p7d_core::Result<Dump>,
) -> Result<Dump> {
    let mut errors = 0usize;
    let mut hook = |err: p7d_core::Error| {
        warn!("{}: {}", name, err);
        errors += 1;
    };
    let dump = decode(&decoder(cli), &mut hook)
        .with_context(|| format!("Failed to decode dump: {}", name))?;

    if cli.strict && errors > 0 {
        bail!("{}: {} packet(s) could not be decoded", name, errors);
    }
    Ok(dump)
}

/// Indices of the lines passing the level filter
fn selected_lines(dump: &Dump, min_level: Option<MinLevel>) -> Vec<usize> {
    let threshold = min_level.map(|level| Level::from(level) as u8).unwrap_or(0);
    let mut selected = Vec::new();
    dump.for_each_verbosity(|verbosity| verbosity >= threshold, |index| selected.push(index));
    selected
}

fn write_summary(name: &str, dump: &Dump, out: &mut impl Write) -> io::Result<()> {
    let stats = dump.stats();
    writeln!(out, "Dump: {} ({})", name, dump.endian())?;
    writeln!(out, "Hostname: {}", dump.host_name())?;
    writeln!(out, "Process: {} (pid {})", dump.process_name(), dump.process_id())?;
    if let Some(stream) = dump.stream_name() {
        writeln!(out, "Stream: {}", stream)?;
    }
    writeln!(
        out,
        "Modules: {}, strings: {}, lines: {}",
        dump.module_count(),
        dump.strings().len(),
        dump.line_count()
    )?;
    writeln!(
        out,
        "Packets: {}, records: {}, errors: {}",
        stats.packets, stats.records, stats.errors
    )
}

fn write_lines(
    dump: &Dump,
    indices: &[usize],
    detailed: bool,
    formatter: &impl Formatter,
    out: &mut impl Write,
) -> io::Result<()> {
    for &index in indices {
        match dump.render_ex(index, formatter) {
            Ok(view) if detailed => writeln!(
                out,
                "[{}] {} {}:{} {} ({}) {}",
                view.verbosity,
                view.module,
                view.file,
                view.line,
                view.function,
                view.thread_id,
                view.text
            )?,
            Ok(view) => writeln!(out, "{}", view.text)?,
            Err(e) => warn!("Line {}: {}", index, e),
        }
    }
    Ok(())
}

/// Print one decoded dump in the selected format
fn print_dump(cli: &Cli, name: &str, dump: &Dump, out: &mut impl Write) -> Result<()> {
    write_summary(name, dump, out).context("Failed to write output")?;
    if cli.format == OutputFormat::Summary {
        return Ok(());
    }

    let indices = selected_lines(dump, cli.min_level);
    let detailed = cli.format == OutputFormat::Detailed;
    let written = if cli.show_args {
        write_lines(dump, &indices, detailed, &AppendArgsFormatter, out)
    } else {
        write_lines(dump, &indices, detailed, &IdentityFormatter, out)
    };
    written.context("Failed to write output")?;

    Ok(())
}
