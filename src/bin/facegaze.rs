//! facegaze CLI - Command-line interface for facegaze
//!
//! Commands:
//! - analyze: Run the full pipeline on one participant's logs
//! - batch: Analyze every participant found in a data directory
//! - inspect: Summarize logs and landmark windows without aggregation
//! - config: Print the default analysis configuration

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use facegaze::encoder::{self, GazePointTable, ReportEncoder};
use facegaze::loaders::{load_event_log, load_gaze_stream};
use facegaze::normalizer::ClockNormalizer;
use facegaze::pipeline::{discover_participants, AnalysisProcessor, ParticipantInput};
use facegaze::windows::WindowExtractor;
use facegaze::{AnalysisConfig, AnalysisError, GazeFormat, VERSION};

/// facegaze - Offline gaze analysis for face-imagery experiments
#[derive(Parser)]
#[command(name = "facegaze")]
#[command(version = VERSION)]
#[command(about = "Align event logs with eye-tracker streams and estimate imagined face size", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline on one participant's logs
    Analyze {
        /// Event log CSV (event,label,unix_time)
        #[arg(short, long)]
        events: PathBuf,

        /// Raw eye-tracker stream
        #[arg(short, long)]
        gaze: PathBuf,

        /// Participant name used in reports
        #[arg(short, long, default_value = "participant")]
        participant: String,

        /// Analysis config JSON (defaults apply for omitted fields)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Hardware specs JSON overriding the screen resolution
        #[arg(long)]
        hardware: Option<PathBuf>,

        /// Gaze stream layout (overrides the config)
        #[arg(long)]
        gaze_format: Option<CliGazeFormat>,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,

        /// Also write the gaze points as CSV
        #[arg(long)]
        points_csv: Option<PathBuf>,
    },

    /// Analyze every participant found in a data directory
    Batch {
        /// Directory holding participant logs (searched one level deep)
        #[arg(short, long)]
        data_dir: PathBuf,

        /// Directory for reports and combined tables (defaults to the data directory)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Analysis config JSON
        #[arg(long)]
        config: Option<PathBuf>,

        /// Gaze stream layout (overrides the config)
        #[arg(long)]
        gaze_format: Option<CliGazeFormat>,
    },

    /// Summarize logs and landmark windows without aggregation
    Inspect {
        /// Event log CSV
        #[arg(short, long)]
        events: PathBuf,

        /// Raw eye-tracker stream
        #[arg(short, long)]
        gaze: Option<PathBuf>,

        /// Analysis config JSON
        #[arg(long)]
        config: Option<PathBuf>,

        /// Gaze stream layout (overrides the config)
        #[arg(long)]
        gaze_format: Option<CliGazeFormat>,
    },

    /// Print the default analysis configuration
    Config,
}

#[derive(Clone, Copy, ValueEnum)]
enum CliGazeFormat {
    /// One Unix timestamp per line, written by the tracker reader
    Timestamped,
    /// Start time on the first line, device milliseconds per record
    Legacy,
}

impl From<CliGazeFormat> for GazeFormat {
    fn from(format: CliGazeFormat) -> Self {
        match format {
            CliGazeFormat::Timestamped => GazeFormat::Timestamped,
            CliGazeFormat::Legacy => GazeFormat::Legacy,
        }
    }
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Plain-text summary
    Text,
    /// Compact JSON report
    Json,
    /// Pretty-printed JSON report
    JsonPretty,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

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

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

fn run(cli: Cli) -> Result<(), FacegazeCliError> {
    match cli.command {
        Commands::Analyze {
            events,
            gaze,
            participant,
            config,
            hardware,
            gaze_format,
            output,
            format,
            points_csv,
        } => {
            let config = load_config(config.as_deref(), gaze_format)?;
            let mut input = ParticipantInput::new(participant, events, gaze);
            input.hardware_path = hardware;
            cmd_analyze(config, &input, &output, format, points_csv.as_deref())
        }

        Commands::Batch {
            data_dir,
            output_dir,
            config,
            gaze_format,
        } => {
            let config = load_config(config.as_deref(), gaze_format)?;
            let output_dir = output_dir.unwrap_or_else(|| data_dir.clone());
            cmd_batch(config, &data_dir, &output_dir)
        }

        Commands::Inspect {
            events,
            gaze,
            config,
            gaze_format,
        } => {
            let config = load_config(config.as_deref(), gaze_format)?;
            cmd_inspect(&config, &events, gaze.as_deref())
        }

        Commands::Config => {
            println!("{}", AnalysisConfig::default().to_json_pretty()?);
            Ok(())
        }
    }
}

fn load_config(
    path: Option<&Path>,
    gaze_format: Option<CliGazeFormat>,
) -> Result<AnalysisConfig, FacegazeCliError> {
    let mut config = match path {
        Some(path) => AnalysisConfig::load(path)?,
        None => AnalysisConfig::default(),
    };
    if let Some(format) = gaze_format {
        config.gaze_format = format.into();
    }
    Ok(config)
}

fn cmd_analyze(
    config: AnalysisConfig,
    input: &ParticipantInput,
    output: &Path,
    format: OutputFormat,
    points_csv: Option<&Path>,
) -> Result<(), FacegazeCliError> {
    let trailing = config.trailing_window_secs;
    let processor = AnalysisProcessor::new(config);
    let analysis = processor.analyze_files(input)?;

    if let Some(path) = points_csv {
        let mut table = GazePointTable::new(BufWriter::new(File::create(path)?));
        table.append(&analysis.participant, &analysis.points)?;
        table.finish()?;
    }

    let report = ReportEncoder::new().encode(analysis, trailing);
    let output_data = match format {
        OutputFormat::Text => encoder::render_text(&report),
        OutputFormat::Json => encoder::to_json(&report, false)? + "\n",
        OutputFormat::JsonPretty => encoder::to_json(&report, true)? + "\n",
    };

    if output.to_string_lossy() == "-" {
        print!("{}", output_data);
    } else {
        fs::write(output, output_data)?;
    }

    Ok(())
}

fn cmd_batch(config: AnalysisConfig, data_dir: &Path, output_dir: &Path) -> Result<(), FacegazeCliError> {
    let inputs = discover_participants(data_dir)?;
    if inputs.is_empty() {
        return Err(FacegazeCliError::NoParticipants(data_dir.to_path_buf()));
    }

    let trailing = config.trailing_window_secs;
    let processor = AnalysisProcessor::new(config);
    let outcome = processor.run_batch(&inputs);

    fs::create_dir_all(output_dir)?;
    let report_encoder = ReportEncoder::new();

    for analysis in &outcome.analyses {
        let report = report_encoder.encode(analysis.clone(), trailing);
        let path = output_dir.join(format!("{}_gaze_report.json", analysis.participant));
        fs::write(&path, encoder::to_json(&report, true)?)?;

        let points_path = output_dir.join(format!("{}_gaze_points.csv", analysis.participant));
        let mut table = GazePointTable::new(BufWriter::new(File::create(points_path)?));
        table.append(&analysis.participant, &analysis.points)?;
        table.finish()?;

        println!("{}", encoder::render_text(&report));
    }

    outcome.write_tables(output_dir)?;

    let summary = report_encoder.encode_batch(outcome.entries.clone());
    fs::write(
        output_dir.join("batch_summary.json"),
        encoder::to_json(&summary, true)?,
    )?;

    println!("=== Batch summary ===");
    println!("Participants: {}", summary.entries.len());
    println!("Succeeded:    {}", summary.succeeded());
    println!("Failed:       {}", summary.failed());
    for entry in summary.entries.iter().filter(|e| !e.succeeded) {
        println!(
            "  - {}: {}",
            entry.participant,
            entry.error.as_deref().unwrap_or("unknown error")
        );
    }
    println!("Outputs written to {}", output_dir.display());

    if outcome.all_failed() {
        Err(FacegazeCliError::AllFailed(summary.failed()))
    } else {
        Ok(())
    }
}

fn cmd_inspect(config: &AnalysisConfig, events_path: &Path, gaze: Option<&Path>) -> Result<(), FacegazeCliError> {
    let events = load_event_log(events_path)?;
    println!("Event log: {}", events_path.display());
    println!("  Events: {}", events.len());

    if let Some(gaze_path) = gaze {
        let stream = load_gaze_stream(gaze_path, config.gaze_format, &config.gaze_marker)?;
        println!("Gaze stream: {}", gaze_path.display());
        println!("  Samples: {}", stream.samples.len());
        println!("  Skipped lines: {}", stream.skipped_lines);
        if let (Some(first), Some(last)) = (stream.samples.first(), stream.samples.last()) {
            println!("  Span: {:.6} .. {:.6}", first.time, last.time);
        }
    }

    let (events, anchor) = match ClockNormalizer::find_anchor(&events, &config.anchor_event) {
        Ok(t0) => {
            println!("Anchor '{}': {:.6}", config.anchor_event, t0);
            (ClockNormalizer::normalize(&[], &events, t0).1, Some(t0))
        }
        Err(e) => {
            println!("Anchor: {}", e);
            (events, None)
        }
    };

    let windows = WindowExtractor::new(&config.vocabulary).extract(&events);
    let unit = if anchor.is_some() { "s since anchor" } else { "unix s" };
    println!("Landmark windows: {} ({})", windows.len(), unit);
    for window in &windows {
        println!(
            "  {:<10} {:<14} {:.3} .. {:.3}",
            window.identity.as_deref().unwrap_or("-"),
            window.landmark,
            window.start,
            window.end
        );
    }

    Ok(())
}

// Error types

#[derive(Debug)]
enum FacegazeCliError {
    Io(io::Error),
    Analysis(AnalysisError),
    NoParticipants(PathBuf),
    AllFailed(usize),
}

impl From<io::Error> for FacegazeCliError {
    fn from(e: io::Error) -> Self {
        FacegazeCliError::Io(e)
    }
}

impl From<AnalysisError> for FacegazeCliError {
    fn from(e: AnalysisError) -> Self {
        FacegazeCliError::Analysis(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<FacegazeCliError> for CliError {
    fn from(e: FacegazeCliError) -> Self {
        match e {
            FacegazeCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            FacegazeCliError::Analysis(e) => {
                let (code, hint) = match &e {
                    AnalysisError::MalformedLog(_) => (
                        "MALFORMED_LOG",
                        "Event logs need an event,label,unix_time header",
                    ),
                    AnalysisError::MissingAnchor(_) => (
                        "MISSING_ANCHOR",
                        "Set anchor_event in the config to an event present in the log",
                    ),
                    AnalysisError::MissingInput(_) => (
                        "MISSING_INPUT",
                        "Check that both the event log and gaze stream exist",
                    ),
                    AnalysisError::InvalidConfig(_) => (
                        "INVALID_CONFIG",
                        "Run 'facegaze config' to see the expected fields",
                    ),
                    AnalysisError::JsonError(_) => ("JSON_ERROR", "Check JSON syntax"),
                    AnalysisError::Csv(_) => ("CSV_ERROR", "Check the event log CSV syntax"),
                    AnalysisError::Io(_) => ("IO_ERROR", "Check file paths and permissions"),
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            FacegazeCliError::NoParticipants(dir) => CliError {
                code: "NO_PARTICIPANTS".to_string(),
                message: format!("No *_event_log.csv files found in {}", dir.display()),
                hint: Some("Point --data-dir at the experiment's data folder".to_string()),
            },
            FacegazeCliError::AllFailed(count) => CliError {
                code: "ALL_FAILED".to_string(),
                message: format!("All {} participants failed", count),
                hint: Some("Review batch_summary.json for per-participant errors".to_string()),
            },
        }
    }
}
