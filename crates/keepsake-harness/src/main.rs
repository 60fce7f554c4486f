#![forbid(unsafe_code)]

use std::io::{self, BufWriter, Write as _};
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use keepsake_harness::report::{config_summary, countdown_line};
use keepsake_harness::{RunOptions, Scenario, run};
use keepsake_runtime::{FileStorage, MemoryStorage, PageConfig, StorageBackend};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "keepsake", version, about = "Drive a Keepsake invitation page headlessly")]
struct Cli {
    /// Log line format on stderr.
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    /// Log filter directive, overridden by `RUST_LOG`.
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay a scripted visit and print its transcript as JSON lines.
    Run(RunArgs),
    /// Print the time left until the configured instant.
    Countdown(CountdownArgs),
    /// Validate a page configuration and print a summary.
    CheckConfig(CheckArgs),
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Page configuration JSON.
    #[arg(long)]
    config: PathBuf,

    /// Scenario JSON.
    #[arg(long)]
    scenario: PathBuf,

    /// Preference file; kept in memory when omitted.
    #[arg(long)]
    state: Option<PathBuf>,

    /// Include particle repaint effects in the transcript.
    #[arg(long, default_value_t = false)]
    frames: bool,
}

#[derive(Parser, Debug)]
struct CountdownArgs {
    /// Page configuration JSON.
    #[arg(long)]
    config: PathBuf,

    /// Evaluate at this RFC 3339 instant instead of now.
    #[arg(long)]
    now: Option<String>,
}

#[derive(Parser, Debug)]
struct CheckArgs {
    /// Page configuration JSON.
    #[arg(long)]
    config: PathBuf,
}

fn init_logging(format: LogFormat, level: &str) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level).with_context(|| format!("invalid log filter '{level}'"))?,
    };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);
    let installed = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|e| anyhow::anyhow!("failed to install log subscriber: {e}"))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_format, &cli.log_level)?;
    match cli.cmd {
        Command::Run(args) => cmd_run(args),
        Command::Countdown(args) => cmd_countdown(args),
        Command::CheckConfig(args) => cmd_check(args),
    }
}

fn load_config(path: &Path) -> anyhow::Result<PageConfig> {
    PageConfig::load(path).with_context(|| format!("load config '{}'", path.display()))
}

fn cmd_run(args: RunArgs) -> anyhow::Result<()> {
    let config = load_config(&args.config)?;
    let scenario = Scenario::load(&args.scenario)
        .with_context(|| format!("load scenario '{}'", args.scenario.display()))?;
    let storage: Box<dyn StorageBackend> = match &args.state {
        Some(path) => Box::new(FileStorage::new(path)),
        None => Box::new(MemoryStorage::new()),
    };
    let options = RunOptions {
        include_frames: args.frames,
    };
    let transcript = run(config, &scenario, storage, options).context("run scenario")?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for entry in &transcript {
        serde_json::to_writer(&mut out, entry).context("encode transcript")?;
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}

fn cmd_countdown(args: CountdownArgs) -> anyhow::Result<()> {
    let config = load_config(&args.config)?;
    let now = match &args.now {
        Some(input) => DateTime::parse_from_rfc3339(input)
            .with_context(|| format!("parse --now '{input}'"))?
            .with_timezone(&Utc),
        None => Utc::now(),
    };
    let mut engine = config.countdown_engine()?;
    println!("{}", countdown_line(&mut engine, now));
    Ok(())
}

fn cmd_check(args: CheckArgs) -> anyhow::Result<()> {
    let config = load_config(&args.config)?;
    println!("{}", config_summary(&config));
    eprintln!("ok {}", args.config.display());
    Ok(())
}
