//! botscore CLI - Command-line interface for botscore
//!
//! Commands:
//! - score: Score recorded sessions and emit reports
//! - features: Dump the extracted feature record of a session
//! - validate: List malformed events in recorded sessions
//! - config: Print the effective configuration
//! - doctor: Diagnose configuration and environment

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use botscore::session::{parse_sessions_ndjson, SessionValidation};
use botscore::{
    parse_session, validate_session, PipelineConfig, PipelineOutcome, RawSession, ScoreError,
    SessionScorer, PRODUCER_NAME, VERSION,
};

/// botscore - Heuristic bot-likeness scoring for recorded mouse sessions
#[derive(Parser)]
#[command(name = "botscore")]
#[command(version = VERSION)]
#[command(about = "Score recorded mouse sessions for bot-likeness", long_about = None)]
struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score sessions and emit one report per session
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

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,

        /// Configuration file (defaults are used when omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print the feature record extracted from each session
    Features {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "json")]
        input_format: InputFormat,

        /// Print the flat name → value mapping instead of the full record
        #[arg(long)]
        flat: bool,

        /// Configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// List malformed events in recorded sessions
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

    /// Print the effective configuration as JSON
    Config {
        /// Configuration file to resolve against defaults
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Diagnose configuration and environment
    Doctor {
        /// Configuration file to check
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// A single session JSON document
    Json,
    /// Newline-delimited JSON (one session per line)
    Ndjson,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one report per line)
    Ndjson,
    /// JSON array of reports
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string()));
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), BotscoreCliError> {
    match cli.command {
        Commands::Score {
            input,
            output,
            input_format,
            output_format,
            config,
        } => cmd_score(&input, &output, input_format, output_format, config.as_deref()),

        Commands::Features {
            input,
            input_format,
            flat,
            config,
        } => cmd_features(&input, input_format, flat, config.as_deref()),

        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&input, input_format, json),

        Commands::Config { config } => cmd_config(config.as_deref()),

        Commands::Doctor { config, json } => cmd_doctor(config.as_deref(), json),
    }
}

fn cmd_score(
    input: &Path,
    output: &Path,
    input_format: InputFormat,
    output_format: OutputFormat,
    config: Option<&Path>,
) -> Result<(), BotscoreCliError> {
    let scorer = SessionScorer::new(load_config(config)?)?;
    let input_data = read_input(input)?;

    // A malformed single document still yields a preprocessing failure report
    let outcomes: Vec<PipelineOutcome> = match input_format {
        InputFormat::Json => vec![scorer.score_json(&input_data)],
        InputFormat::Ndjson => {
            let sessions = parse_sessions_ndjson(&input_data)?;
            if sessions.is_empty() {
                return Err(BotscoreCliError::NoSessions);
            }
            sessions.iter().map(|s| scorer.score(s)).collect()
        }
    };

    let output_data = format_output(&outcomes, &output_format)?;
    if output.to_string_lossy() == "-" {
        print!("{}", output_data);
    } else {
        fs::write(output, output_data)?;
    }

    let failed = outcomes.iter().filter(|o| !o.is_success()).count();
    if failed > 0 {
        Err(BotscoreCliError::ScoringFailed(failed))
    } else {
        Ok(())
    }
}

fn cmd_features(
    input: &Path,
    input_format: InputFormat,
    flat: bool,
    config: Option<&Path>,
) -> Result<(), BotscoreCliError> {
    let scorer = SessionScorer::new(load_config(config)?)?;
    let sessions = read_sessions(input, input_format)?;

    for session in &sessions {
        let features = scorer.extract_features(session)?;
        let rendered = if flat {
            serde_json::to_string_pretty(&features.to_map())?
        } else {
            serde_json::to_string_pretty(&features)?
        };
        println!("{}", rendered);
    }
    Ok(())
}

fn cmd_validate(input: &Path, input_format: InputFormat, json: bool) -> Result<(), BotscoreCliError> {
    let sessions = read_sessions(input, input_format)?;

    let reports: Vec<SessionValidationReport> = sessions
        .iter()
        .enumerate()
        .map(|(index, session)| SessionValidationReport {
            index,
            session_id: session.session_id.clone(),
            validation: validate_session(session),
        })
        .collect();

    let report = ValidationReport {
        total_sessions: reports.len(),
        total_events: reports.iter().map(|r| r.validation.total_events).sum(),
        invalid_events: reports.iter().map(|r| r.validation.invalid_events()).sum(),
        sessions: reports,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total sessions: {}", report.total_sessions);
        println!("Total events:   {}", report.total_events);
        println!("Invalid events: {}", report.invalid_events);

        for session in report.sessions.iter().filter(|s| !s.validation.is_clean()) {
            println!(
                "\nSession {} (index {}):",
                session.session_id.as_deref().unwrap_or("unknown"),
                session.index
            );
            let collections = [
                ("mouse_movements", &session.validation.mouse_movements),
                ("mouse_clicks", &session.validation.mouse_clicks),
                ("mouse_down", &session.validation.mouse_down),
            ];
            for (name, issues) in collections {
                for issue in issues {
                    println!("  - {} {}", name, issue);
                }
            }
        }
    }

    if report.invalid_events > 0 {
        Err(BotscoreCliError::ValidationFailed(report.invalid_events))
    } else {
        Ok(())
    }
}

fn cmd_config(config: Option<&Path>) -> Result<(), BotscoreCliError> {
    let config = load_config(config)?;
    println!("{}", config.to_json_pretty()?);
    Ok(())
}

fn cmd_doctor(config: Option<&Path>, json: bool) -> Result<(), BotscoreCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "version".to_string(),
        status: CheckStatus::Ok,
        message: format!("{} version {}", PRODUCER_NAME, VERSION),
    });

    let (source, loaded) = match config {
        Some(path) => (path.display().to_string(), PipelineConfig::load(path)),
        None => ("built-in defaults".to_string(), Ok(PipelineConfig::default())),
    };
    match loaded {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Ok,
                message: format!(
                    "Configuration valid ({}, {} click targets, total weight {})",
                    source,
                    config.actions.click_targets().len(),
                    config.heuristics.total_weight()
                ),
            });
            for warning in config.warnings() {
                checks.push(DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Warning,
                    message: warning,
                });
            }
        }
        Err(e) => checks.push(DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Error,
            message: e.to_string(),
        }),
    }

    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (pass sessions with --input <file>)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (--input - ready)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("botscore Doctor Report");
        println!("======================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");
        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report.checks.iter().any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(BotscoreCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

// Helper functions

fn read_input(input: &Path) -> Result<String, BotscoreCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn read_sessions(input: &Path, input_format: InputFormat) -> Result<Vec<RawSession>, BotscoreCliError> {
    let input_data = read_input(input)?;
    let sessions = match input_format {
        InputFormat::Json => vec![parse_session(&input_data)?],
        InputFormat::Ndjson => parse_sessions_ndjson(&input_data)?,
    };
    if sessions.is_empty() {
        return Err(BotscoreCliError::NoSessions);
    }
    Ok(sessions)
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig, BotscoreCliError> {
    match path {
        Some(path) => Ok(PipelineConfig::load(path)?),
        None => Ok(PipelineConfig::default()),
    }
}

fn format_output(outcomes: &[PipelineOutcome], format: &OutputFormat) -> Result<String, BotscoreCliError> {
    match format {
        OutputFormat::Ndjson => {
            let mut lines: Vec<String> = Vec::new();
            for outcome in outcomes {
                lines.push(outcome.to_json()?);
            }
            Ok(lines.join("\n") + "\n")
        }
        OutputFormat::Json => Ok(serde_json::to_string(outcomes)?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(outcomes)?),
    }
}

// Error types

#[derive(Debug)]
enum BotscoreCliError {
    Io(io::Error),
    Score(ScoreError),
    Json(serde_json::Error),
    NoSessions,
    ScoringFailed(usize),
    ValidationFailed(usize),
    DoctorFailed,
}

impl From<io::Error> for BotscoreCliError {
    fn from(e: io::Error) -> Self {
        BotscoreCliError::Io(e)
    }
}

impl From<ScoreError> for BotscoreCliError {
    fn from(e: ScoreError) -> Self {
        BotscoreCliError::Score(e)
    }
}

impl From<serde_json::Error> for BotscoreCliError {
    fn from(e: serde_json::Error) -> Self {
        BotscoreCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<BotscoreCliError> for CliError {
    fn from(e: BotscoreCliError) -> Self {
        match e {
            BotscoreCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            BotscoreCliError::Score(e @ ScoreError::InvalidConfig(_))
            | BotscoreCliError::Score(e @ ScoreError::InvalidRule(_)) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Run 'botscore doctor --config <file>' for details".to_string()),
            },
            BotscoreCliError::Score(e) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Ensure input contains mouse_movements, mouse_clicks and mouse_down arrays".to_string()),
            },
            BotscoreCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            BotscoreCliError::NoSessions => CliError {
                code: "NO_SESSIONS".to_string(),
                message: "No sessions found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            BotscoreCliError::ScoringFailed(count) => CliError {
                code: "SCORING_FAILED".to_string(),
                message: format!("{} sessions could not be scored", count),
                hint: Some("See the failure reports for the failing stage".to_string()),
            },
            BotscoreCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} events failed validation", count),
                hint: Some("Malformed events degrade scoring; fix them and retry".to_string()),
            },
            BotscoreCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_sessions: usize,
    total_events: usize,
    invalid_events: usize,
    sessions: Vec<SessionValidationReport>,
}

#[derive(serde::Serialize)]
struct SessionValidationReport {
    index: usize,
    session_id: Option<String>,
    validation: SessionValidation,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
