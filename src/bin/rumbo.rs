//! Rumbo CLI - Command-line interface for Rumbo scoring
//!
//! Commands:
//! - score: Score a batch of trips into a driver score report
//! - validate: Check trip records without scoring them
//! - config: Print the default configuration or check a configuration file

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use rumbo_scoring::pipeline::FleetScorer;
use rumbo_scoring::{ComputeError, ConfigError, ScoringConfig, RUMBO_VERSION};

/// Rumbo - Driver scoring engine for commercial fleets
#[derive(Parser)]
#[command(name = "rumbo")]
#[command(version = RUMBO_VERSION)]
#[command(about = "Score fleet drivers from trip telemetry", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score a batch of trips into a driver score report
    Score {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "json")]
        input_format: InputFormat,

        /// Output format (defaults to pretty JSON on a terminal, compact JSON otherwise)
        #[arg(long)]
        output_format: Option<OutputFormat>,

        /// Scoring configuration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Seed for cluster initialization
        #[arg(long)]
        seed: Option<u64>,

        /// Fit exactly this many clusters instead of selecting K
        #[arg(long)]
        k: Option<usize>,
    },

    /// Check trip records without scoring them
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "json")]
        input_format: InputFormat,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the default configuration, or check a configuration file
    Config {
        /// Configuration file to validate
        #[arg(long)]
        check: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum InputFormat {
    /// JSON array of trip records
    Json,
    /// Newline-delimited JSON (one trip record per line)
    Ndjson,
    /// Scania Driver Evaluation Report payload
    Scania,
}

impl From<InputFormat> for rumbo_scoring::InputFormat {
    fn from(format: InputFormat) -> Self {
        match format {
            InputFormat::Json => rumbo_scoring::InputFormat::Json,
            InputFormat::Ndjson => rumbo_scoring::InputFormat::Ndjson,
            InputFormat::Scania => rumbo_scoring::InputFormat::Scania,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Single JSON report
    Json,
    /// Pretty-printed JSON report
    JsonPretty,
    /// One driver record per line followed by one fleet record
    Ndjson,
}

impl From<OutputFormat> for rumbo_scoring::OutputFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Json => rumbo_scoring::OutputFormat::Json,
            OutputFormat::JsonPretty => rumbo_scoring::OutputFormat::JsonPretty,
            OutputFormat::Ndjson => rumbo_scoring::OutputFormat::Ndjson,
        }
    }
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

/// Human-readable logs on stderr, filtered by RUST_LOG (default info)
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr_layer = fmt::layer()
        .with_target(false)
        .with_ansi(atty::is(atty::Stream::Stderr))
        .with_writer(io::stderr)
        .with_filter(filter);

    tracing_subscriber::registry().with(stderr_layer).init();
}

fn run(cli: Cli) -> Result<(), RumboCliError> {
    match cli.command {
        Commands::Score {
            input,
            output,
            input_format,
            output_format,
            config,
            seed,
            k,
        } => cmd_score(
            &input,
            &output,
            input_format,
            output_format,
            config.as_deref(),
            seed,
            k,
        ),

        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&input, input_format, json),

        Commands::Config { check } => cmd_config(check.as_deref()),
    }
}

fn cmd_score(
    input: &Path,
    output: &Path,
    input_format: InputFormat,
    output_format: Option<OutputFormat>,
    config_path: Option<&Path>,
    seed: Option<u64>,
    k: Option<usize>,
) -> Result<(), RumboCliError> {
    let mut config = load_config(config_path)?;
    if let Some(seed) = seed {
        config.clustering.seed = seed;
    }
    if let Some(k) = k {
        config.clustering.k_override = Some(k);
    }
    let scorer = FleetScorer::new(config)?;

    let input_data = read_input(input)?;
    let run = scorer.score_input(&input_data, input_format.into())?;

    if run.results.is_empty() {
        return Err(RumboCliError::NoDrivers(run.rejections.count));
    }

    let format = output_format.unwrap_or_else(|| default_output_format(output));
    let report = scorer.encode(&run, format.into())?;

    if is_stdio(output) {
        let mut stdout = io::stdout();
        stdout.write_all(report.as_bytes())?;
        if !report.ends_with('\n') {
            writeln!(stdout)?;
        }
    } else {
        fs::write(output, report)?;
        info!(path = %output.display(), "report written");
    }

    Ok(())
}

fn cmd_validate(input: &Path, input_format: InputFormat, json: bool) -> Result<(), RumboCliError> {
    let scorer = FleetScorer::new(ScoringConfig::default())?;
    let input_data = read_input(input)?;
    let report = scorer.validate_input(&input_data, input_format.into())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total records:    {}", report.total_records);
        println!("Accepted records: {}", report.accepted_records);
        println!("Rejected records: {}", report.rejected_records.count);
        println!("Drivers:          {}", report.driver_count);

        if !report.rejected_records.samples.is_empty() {
            println!("\nErrors:");
            for sample in &report.rejected_records.samples {
                println!(
                    "  - Record {} (driver {}): {}",
                    sample.index,
                    sample.driver_id.as_deref().unwrap_or("unknown"),
                    sample.reason
                );
            }
        }
    }

    if report.is_clean() {
        Ok(())
    } else {
        Err(RumboCliError::ValidationFailed(report.rejected_records.count))
    }
}

fn cmd_config(check: Option<&Path>) -> Result<(), RumboCliError> {
    match check {
        Some(path) => {
            ScoringConfig::from_file(path)?;
            println!("{}: ok", path.display());
        }
        None => println!("{}", ScoringConfig::default().to_json()?),
    }
    Ok(())
}

// Helper functions

fn load_config(path: Option<&Path>) -> Result<ScoringConfig, RumboCliError> {
    match path {
        Some(path) => {
            debug!(path = %path.display(), "loading configuration");
            Ok(ScoringConfig::from_file(path)?)
        }
        None => Ok(ScoringConfig::default()),
    }
}

fn read_input(input: &Path) -> Result<String, RumboCliError> {
    if is_stdio(input) {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn is_stdio(path: &Path) -> bool {
    path.to_string_lossy() == "-"
}

fn default_output_format(output: &Path) -> OutputFormat {
    if is_stdio(output) && atty::is(atty::Stream::Stdout) {
        OutputFormat::JsonPretty
    } else {
        OutputFormat::Json
    }
}

// Error types

#[derive(Debug)]
enum RumboCliError {
    Io(io::Error),
    Compute(ComputeError),
    Config(ConfigError),
    Json(serde_json::Error),
    NoDrivers(usize),
    ValidationFailed(usize),
}

impl From<io::Error> for RumboCliError {
    fn from(e: io::Error) -> Self {
        RumboCliError::Io(e)
    }
}

impl From<ComputeError> for RumboCliError {
    fn from(e: ComputeError) -> Self {
        match e {
            ComputeError::Config(e) => RumboCliError::Config(e),
            other => RumboCliError::Compute(other),
        }
    }
}

impl From<ConfigError> for RumboCliError {
    fn from(e: ConfigError) -> Self {
        RumboCliError::Config(e)
    }
}

impl From<serde_json::Error> for RumboCliError {
    fn from(e: serde_json::Error) -> Self {
        RumboCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<RumboCliError> for CliError {
    fn from(e: RumboCliError) -> Self {
        match e {
            RumboCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            RumboCliError::Compute(e) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Ensure input matches fleet.trip_record.v1 or the selected --input-format".to_string()),
            },
            RumboCliError::Config(e) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Run 'rumbo config' to see a valid configuration".to_string()),
            },
            RumboCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            RumboCliError::NoDrivers(rejected) => CliError {
                code: "NO_DRIVERS".to_string(),
                message: format!("No scorable trips in input ({} records rejected)", rejected),
                hint: Some("Run 'rumbo validate' for details".to_string()),
            },
            RumboCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} records failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
        }
    }
}
