//! portmon CLI - show the local connection table, filtered and sorted by port.

use anyhow::{Context, Result};
use clap::Parser;
use portmon::{
    Config, ConnectionState, FilterCriteria, PortList, RecordParser, RecordPipeline, Refresher,
    StateSet, TableSource, TextSource,
    render::{render_json, render_table},
};
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

/// portmon - show listening and established TCP connections by local port
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Only show these local ports (comma-separated; bad entries are ignored)
    #[arg(short, long)]
    ports: Option<String>,

    /// Connection states to show (default: LISTEN,ESTABLISHED)
    #[arg(short, long, value_delimiter = ',', value_parser = parse_state)]
    states: Option<Vec<ConnectionState>>,

    /// Show every named connection state
    #[arg(long, conflicts_with = "states")]
    all_states: bool,

    /// Read netstat output from a file ("-" for stdin) instead of running netstat
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Print JSON instead of a table
    #[arg(long)]
    json: bool,

    /// Config file (default: ~/.config/portmon/config.toml)
    #[arg(short, long, env = "PORTMON_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn parse_state(name: &str) -> Result<ConnectionState, String> {
    ConnectionState::from_name(name).ok_or_else(|| {
        let known: Vec<String> = ConnectionState::KNOWN
            .iter()
            .map(ToString::to_string)
            .collect();
        format!("unknown state '{}', expected one of {}", name, known.join(", "))
    })
}

impl Args {
    /// Combine command-line filters with the configured defaults.
    fn criteria(&self, configured: &FilterCriteria) -> FilterCriteria {
        let mut criteria = configured.clone();
        if let Some(ref ports) = self.ports {
            criteria.ports = PortList::parse(ports);
        }
        if self.all_states {
            criteria.states = StateSet::all_known();
        } else if let Some(ref states) = self.states {
            criteria.states = states.iter().cloned().collect();
        }
        criteria
    }
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let config = match args.config {
        Some(ref path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    config.validate()?;
    debug!("Configuration: {:?}", config);

    let pipeline = RecordPipeline::new(args.criteria(&config.filter));
    let parser = RecordParser::new(config.layout.clone());

    let mut stdout = io::stdout().lock();
    match args.input {
        Some(ref path) => {
            let source = read_input(path)?;
            run(source, parser, &pipeline, args.json, &mut stdout)
        }
        None => run(config.command, parser, &pipeline, args.json, &mut stdout),
    }
}

/// Load saved table text from a file or stdin.
fn read_input(path: &Path) -> Result<TextSource> {
    if path == Path::new("-") {
        return TextSource::from_reader(io::stdin().lock()).context("Failed to read stdin");
    }
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    TextSource::from_reader(file).with_context(|| format!("Failed to read {}", path.display()))
}

/// Run one refresh cycle and print the result.
///
/// A failed refresh is reported and turned into a failing exit code.
fn run<S: TableSource>(
    source: S,
    parser: RecordParser,
    pipeline: &RecordPipeline,
    json: bool,
    out: &mut impl Write,
) -> Result<ExitCode> {
    let refresher = Refresher::new(source, parser);

    let snapshot = match refresher.refresh() {
        Ok(snapshot) => snapshot,
        Err(e) => {
            error!("{}", e);
            return Ok(ExitCode::FAILURE);
        }
    };

    let view = snapshot.view(pipeline);
    info!(
        "Showing {} of {} connections (taken at {})",
        view.count,
        snapshot.records.len(),
        snapshot.taken_at.format("%H:%M:%S")
    );

    if json {
        writeln!(out, "{}", render_json(&view)?)?;
    } else {
        write!(out, "{}", render_table(&view))?;
    }
    Ok(ExitCode::SUCCESS)
}
