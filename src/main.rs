use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::PathBuf,
};

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;

use cpuident_core::{aggregate, get_identification, IdentificationRecord, NativeInvoker, RawLeafRecord, RecordingInvoker};
use cpuident_logging::{get_logger, log_info, set_logger, LogCategory, LogLevel, Logger};

pub const LOG_CAT : LogCategory = LogCategory::new("Main");

static LOGGER : Logger = Logger::with_max_level(LogLevel::Warning);

/// Print what the processor reports about itself through the `cpuid` instruction.
#[derive(Parser, Debug)]
#[command(name = "cpuident", version)]
struct Options {
    /// Print the identification record as JSON instead of a text report.
    #[arg(long)]
    json: bool,

    /// Also print the raw registers of every leaf that was queried.
    #[arg(long)]
    raw: bool,

    /// Maximum level of log messages: severe, error, warning, info, verbose, or debug.
    #[arg(long, value_parser = parse_log_level, default_value = "warning")]
    log_level: LogLevel,

    /// Also write log messages to this file.
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn parse_log_level(s: &str) -> Result<LogLevel, String> {
    LogLevel::parse(&s.to_ascii_lowercase()).ok_or_else(|| format!("unknown log level '{s}'"))
}

fn setup_logger(options: &Options) -> Result<()> {
    LOGGER.set_max_level(options.log_level);
    set_logger(&LOGGER);

    if let Some(path) = &options.log_file {
        let file = File::create(path).with_context(|| format!("failed to create log file '{}'", path.display()))?;
        // Can only fail when all writer slots are taken, which can't happen for a freshly installed logger
        _ = get_logger().add_writer(Box::new(BufWriter::new(file)));
    }
    Ok(())
}

fn identify(raw: bool) -> Result<(IdentificationRecord, Vec<RawLeafRecord>)> {
    if raw {
        let recording = RecordingInvoker::new(NativeInvoker::new()?);
        let record = aggregate(&recording);
        Ok((record, recording.take_records()))
    } else {
        Ok((get_identification()?, Vec::new()))
    }
}

fn print_text(out: &mut impl Write, record: &IdentificationRecord, raw: &[RawLeafRecord]) -> io::Result<()> {
    writeln!(out, "{record}")?;
    if !raw.is_empty() {
        writeln!(out, "Raw leaves:")?;
        for entry in raw {
            let res = entry.result;
            writeln!(out, "    {:08X}.{:02X}: eax={:08X} ebx={:08X} ecx={:08X} edx={:08X}", entry.leaf, entry.subleaf, res.eax, res.ebx, res.ecx, res.edx)?;
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct RawOutput<'a> {
    record: &'a IdentificationRecord,
    raw:    &'a [RawLeafRecord],
}

fn print_json(out: &mut impl Write, record: &IdentificationRecord, raw: &[RawLeafRecord], include_raw: bool) -> Result<()> {
    if include_raw {
        serde_json::to_writer_pretty(&mut *out, &RawOutput { record, raw })?;
    } else {
        serde_json::to_writer_pretty(&mut *out, record)?;
    }
    writeln!(out)?;
    Ok(())
}

fn main() -> Result<()> {
    let options = Options::parse();
    setup_logger(&options)?;

    let result = run(&options);
    get_logger().flush();
    result
}

fn run(options: &Options) -> Result<()> {
    let (record, raw) = identify(options.raw)?;
    log_info!(LOG_CAT, "Identified {} processor \"{}\"", record.vendor.short_name(), record.brand);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if options.json {
        print_json(&mut out, &record, &raw, options.raw)?;
    } else {
        print_text(&mut out, &record, &raw)?;
    }
    out.flush()?;
    Ok(())
}
