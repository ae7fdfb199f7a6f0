// dmmlog -- stream readings from a Brymen BM25x multimeter and append them
// to a tab-separated log.
//
// Usage:
//   dmmlog --port /dev/ttyUSB0
//   dmmlog --port /dev/ttyUSB0 --extended --output readings.txt
//   dmmlog --port COM3 --model BM257 --count 100 --output logs/
//   dmmlog list

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use time::OffsetDateTime;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use dmmlog_brymen::builder::SessionBuilder;
use dmmlog_brymen::io::{DEFAULT_EVENT_CAPACITY, spawn_session};
use dmmlog_brymen::models::{self, BrymenModel};
use dmmlog_core::{LogFormat, MeterEvent, Transport, format_log_line};
use dmmlog_transport::{DataBits, Parity, SerialConfig, StopBits};

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// dmmlog -- logs Brymen multimeter readings from the serial interface.
#[derive(Parser, Debug)]
#[command(name = "dmmlog", version, about)]
struct Cli {
    /// Serial port path (e.g. /dev/ttyUSB0, COM3).
    /// Required unless a subcommand is given.
    #[arg(short, long)]
    port: Option<String>,

    /// Meter model (see `dmmlog list`).
    #[arg(short, long, default_value = "BM257s")]
    model: String,

    /// Override the default baud rate for this model.
    #[arg(long)]
    baud: Option<u32>,

    #[arg(long, value_enum, default_value_t = ParityArg::None)]
    parity: ParityArg,

    #[arg(long, default_value_t = 1)]
    stop_bits: u8,

    #[arg(long, default_value_t = 8)]
    data_bits: u8,

    /// Timeout for one frame read, in milliseconds.
    #[arg(long, default_value_t = 1000)]
    timeout_ms: u64,

    /// Give up after this many consecutive resyncs (default: never).
    #[arg(long)]
    max_resyncs: Option<u32>,

    /// Stop after this many readings (default: run until Ctrl-C).
    #[arg(short, long)]
    count: Option<u64>,

    /// Append to this file. If it names a directory, a file named after the
    /// start time and port is created inside it. Defaults to stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also log the display text and lit annunciators.
    #[arg(short, long)]
    extended: bool,

    /// More diagnostics on stderr (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List supported meter models.
    List,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum ParityArg {
    None,
    Odd,
    Even,
}

impl From<ParityArg> for Parity {
    fn from(p: ParityArg) -> Self {
        match p {
            ParityArg::None => Parity::None,
            ParityArg::Odd => Parity::Odd,
            ParityArg::Even => Parity::Even,
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn lookup_model(name: &str) -> Result<BrymenModel> {
    models::find_model(name).with_context(|| {
        let known: Vec<&str> = models::all_brymen_models().iter().map(|m| m.name).collect();
        format!("unknown model '{name}'. Supported: {}", known.join(", "))
    })
}

/// File name for a new log: start time in UTC plus the port's base name,
/// e.g. `2024_05_01 13_45_09 ttyUSB0.txt`.
fn log_file_name(port: &str, started: OffsetDateTime) -> Result<String> {
    let format = time::format_description::parse(
        "[year]_[month]_[day] [hour]_[minute]_[second]",
    )
    .context("invalid timestamp format")?;
    let stamp = started
        .to_offset(time::UtcOffset::UTC)
        .format(&format)
        .context("failed to format timestamp")?;
    let base = Path::new(port)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(port);
    Ok(format!("{stamp} {base}.txt"))
}

fn resolve_output(output: &Path, port: &str) -> Result<PathBuf> {
    if output.is_dir() {
        Ok(output.join(log_file_name(port, OffsetDateTime::now_utc())?))
    } else {
        Ok(output.to_path_buf())
    }
}

/// Port settings from the command line. The baud rate falls back to the
/// model's default when `--baud` is not given.
fn serial_config(cli: &Cli, model: &BrymenModel) -> Result<SerialConfig> {
    Ok(SerialConfig {
        baud_rate: cli.baud.unwrap_or(model.default_baud_rate),
        data_bits: DataBits::try_from(cli.data_bits)?,
        stop_bits: StopBits::try_from(cli.stop_bits)?,
        parity: cli.parity.into(),
        read_timeout: Duration::from_millis(cli.timeout_ms),
        ..Default::default()
    })
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn cmd_list() -> Result<()> {
    println!("{:<8}  {:>6}  {:<10}  Segments", "Model", "Baud", "Framing");
    println!("{:<8}  {:>6}  {:<10}  --------", "-----", "----", "-------");
    for model in models::all_brymen_models() {
        println!(
            "{:<8}  {:>6}  {:<10}  {}",
            model.name,
            model.default_baud_rate,
            format!("{:?}", model.validation).to_lowercase(),
            model.segments.name,
        );
    }
    Ok(())
}

async fn cmd_log(cli: &Cli) -> Result<()> {
    let Some(port) = cli.port.as_deref() else {
        bail!("--port is required (or use `dmmlog list`)");
    };
    let model = lookup_model(&cli.model)?;
    let format = if cli.extended {
        LogFormat::Extended
    } else {
        LogFormat::Basic
    };

    let config = serial_config(cli, &model)?;
    let session = SessionBuilder::new(model)
        .serial_port(port)
        .serial_config(config)
        .max_resyncs(cli.max_resyncs)
        .probe(true)
        .build()
        .await
        .with_context(|| format!("failed to start session on {port}"))?;

    let mut out: Box<dyn AsyncWrite + Unpin + Send> = match &cli.output {
        Some(path) => {
            let path = resolve_output(path, port)?;
            info!(path = %path.display(), "appending readings");
            let file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .await
                .with_context(|| format!("failed to open {}", path.display()))?;
            Box::new(file)
        }
        None => Box::new(tokio::io::stdout()),
    };

    let mut handle = spawn_session(session, DEFAULT_EVENT_CAPACITY);
    let cancel = handle.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupted, stopping");
            cancel.cancel();
        }
    });

    let mut written: u64 = 0;
    let mut failure = None;
    while let Some(event) = handle.recv().await {
        match event {
            MeterEvent::Reading(reading) => {
                out.write_all(format_log_line(&reading, format).as_bytes())
                    .await
                    .context("failed to write log line")?;
                out.flush().await.context("failed to flush log")?;
                written += 1;
                if cli.count.is_some_and(|n| written >= n) {
                    break;
                }
            }
            MeterEvent::Resynced { attempt } => {
                debug!(attempt, "resynchronized");
                if attempt % 10 == 0 {
                    warn!(attempt, "no valid frame yet; is the meter's PC link on?");
                }
            }
            MeterEvent::Disconnected { reason } => {
                error!(%reason, "meter session ended");
                failure = Some(reason);
            }
        }
    }

    let mut transport = handle.shutdown().await?;
    transport.close().await.ok();
    info!(readings = written, "done");

    match failure {
        Some(reason) => bail!("session ended: {reason}"),
        None => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Some(Command::List) => cmd_list(),
        None => cmd_log(&cli).await,
    }
}
