//! Proctor CLI - Command-line interface for proctor-risk
//!
//! Commands:
//! - score: Score observations one by one (batch mode)
//! - tick: Score one sampling tick and aggregate it into an overall verdict
//! - session: Run a proctoring session over a stream of events on stdin
//! - stats: Roll session summaries up into counters
//! - rules: Print the scoring rule table

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, BufRead, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use proctor_risk::rules::describe_rules;
use proctor_risk::{
    Observation, ProctorConfig, ProctoringSession, RiskError, RiskScorer, SessionEvent,
    SessionStats, SessionSummary, PROCTOR_VERSION, PRODUCER_NAME,
};
use tracing::{info, warn};

/// Proctor - Rule-based risk scoring for exam proctoring telemetry
#[derive(Parser)]
#[command(name = "proctor")]
#[command(version = PROCTOR_VERSION)]
#[command(about = "Score proctoring telemetry into risk assessments", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score each observation independently
    Score {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Include the rules that fired for each observation
        #[arg(long)]
        explain: bool,
    },

    /// Score all observations as one tick and print the overall assessment
    Tick {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "json")]
        input_format: InputFormat,
    },

    /// Run a proctoring session over NDJSON events read from stdin
    Session {
        /// Student identifier (defaults to the config file value)
        #[arg(long)]
        user_id: Option<String>,

        /// Exam identifier (defaults to the config file value)
        #[arg(long)]
        exam_id: Option<String>,

        /// Buffer output instead of flushing after each event
        #[arg(long)]
        no_flush: bool,
    },

    /// Aggregate NDJSON session summaries (one compact summary per line) into counters
    Stats {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Print the scoring rule table
    Rules {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one observation per line)
    Ndjson,
    /// JSON array of observations
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), ProctorCliError> {
    let config = match &cli.config {
        Some(path) => ProctorConfig::from_file(path)?,
        None => ProctorConfig::default(),
    };
    init_tracing(&config.log.filter);

    let pretty = cli.pretty || config.output.pretty;

    match cli.command {
        Commands::Score {
            input,
            output,
            input_format,
            explain,
        } => cmd_score(&input, &output, input_format, explain),

        Commands::Tick {
            input,
            input_format,
        } => cmd_tick(&input, input_format, pretty),

        Commands::Session {
            user_id,
            exam_id,
            no_flush,
        } => cmd_session(
            user_id.unwrap_or(config.session.user_id),
            exam_id.unwrap_or(config.session.exam_id),
            pretty,
            !no_flush,
        ),

        Commands::Stats { input } => cmd_stats(&input, pretty),

        Commands::Rules { json } => cmd_rules(json, pretty),
    }
}

fn init_tracing(default_filter: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(io::stderr)
        .init();
}

fn cmd_score(
    input: &Path,
    output: &Path,
    input_format: InputFormat,
    explain: bool,
) -> Result<(), ProctorCliError> {
    let observations = read_observations(input, &input_format)?;
    if observations.is_empty() {
        return Err(ProctorCliError::NoObservations);
    }

    let mut lines: Vec<String> = Vec::with_capacity(observations.len());
    let mut alerts = 0;
    for observation in &observations {
        let assessment = RiskScorer::score(observation)?;
        if assessment.alert {
            alerts += 1;
        }
        let line = if explain {
            let mut value = serde_json::to_value(&assessment)?;
            value["triggered_rules"] = serde_json::to_value(RiskScorer::explain(observation))?;
            serde_json::to_string(&value)?
        } else {
            serde_json::to_string(&assessment)?
        };
        lines.push(line);
    }

    info!(observations = observations.len(), alerts, "scored observations");

    let output_data = lines.join("\n") + "\n";
    if output.to_string_lossy() == "-" {
        print!("{}", output_data);
    } else {
        fs::write(output, output_data)?;
    }

    Ok(())
}

fn cmd_tick(input: &Path, input_format: InputFormat, pretty: bool) -> Result<(), ProctorCliError> {
    let observations = read_observations(input, &input_format)?;
    if observations.is_empty() {
        return Err(ProctorCliError::NoObservations);
    }

    let overall = RiskScorer::score_tick(&observations)?;
    if overall.high_risk {
        warn!(
            overall_risk_score = overall.overall_risk_score,
            "tick flagged as high risk"
        );
    }

    println!("{}", to_json(&overall, pretty)?);
    Ok(())
}

fn cmd_session(
    user_id: String,
    exam_id: String,
    pretty: bool,
    flush: bool,
) -> Result<(), ProctorCliError> {
    if atty::is(atty::Stream::Stdin) {
        warn!("reading session events from an interactive terminal; end input with Ctrl-D");
    }

    let mut session = ProctoringSession::start(user_id, exam_id);
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for (index, line) in stdin.lock().lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();

        if trimmed.is_empty() {
            continue;
        }

        let event: SessionEvent = serde_json::from_str(trimmed).map_err(|e| {
            ProctorCliError::ParseError(format!("Failed to parse event on line {}: {}", index + 1, e))
        })?;

        let outcome = session.handle(&event)?;
        writeln!(stdout, "{}", serde_json::to_string(&outcome)?)?;
        if flush {
            stdout.flush()?;
        }
    }

    let summary = session.end();
    writeln!(stdout, "{}", to_json(&summary, pretty)?)?;
    stdout.flush()?;

    Ok(())
}

fn cmd_stats(input: &Path, pretty: bool) -> Result<(), ProctorCliError> {
    let data = read_input(input)?;
    let summaries = data
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str::<SessionSummary>(line).map_err(|e| {
                ProctorCliError::ParseError(format!(
                    "Failed to parse session summary on line {}: {}",
                    index + 1,
                    e
                ))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let stats = SessionStats::from_summaries(&summaries);
    info!(sessions = stats.total_sessions, "aggregated session summaries");

    println!("{}", to_json(&stats, pretty)?);
    Ok(())
}

fn cmd_rules(json: bool, pretty: bool) -> Result<(), ProctorCliError> {
    let rules = describe_rules();

    if json {
        println!("{}", to_json(&rules, pretty)?);
        return Ok(());
    }

    println!("{} {} scoring rules", PRODUCER_NAME, PROCTOR_VERSION);
    println!("Alert threshold: score > {}", proctor_risk::RISK_THRESHOLD);
    println!();

    let mut current = "";
    for rule in &rules {
        if rule.category != current {
            current = rule.category;
            println!("{}:", current);
        }
        println!(
            "  +{:.2}  {:<24} {}",
            rule.increment, rule.name, rule.condition
        );
    }

    Ok(())
}

// Helper functions

fn read_input(input: &Path) -> Result<String, ProctorCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn read_observations(
    input: &Path,
    input_format: &InputFormat,
) -> Result<Vec<Observation>, ProctorCliError> {
    let data = read_input(input)?;

    match input_format {
        InputFormat::Json => Ok(serde_json::from_str(&data)?),
        InputFormat::Ndjson => data
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(index, line)| {
                serde_json::from_str(line).map_err(|e| {
                    ProctorCliError::ParseError(format!(
                        "Failed to parse observation on line {}: {}",
                        index + 1,
                        e
                    ))
                })
            })
            .collect(),
    }
}

fn to_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<String, ProctorCliError> {
    if pretty {
        Ok(serde_json::to_string_pretty(value)?)
    } else {
        Ok(serde_json::to_string(value)?)
    }
}

// Error types

#[derive(Debug)]
enum ProctorCliError {
    Io(io::Error),
    Risk(RiskError),
    Json(serde_json::Error),
    NoObservations,
    ParseError(String),
}

impl From<io::Error> for ProctorCliError {
    fn from(e: io::Error) -> Self {
        ProctorCliError::Io(e)
    }
}

impl From<RiskError> for ProctorCliError {
    fn from(e: RiskError) -> Self {
        ProctorCliError::Risk(e)
    }
}

impl From<serde_json::Error> for ProctorCliError {
    fn from(e: serde_json::Error) -> Self {
        ProctorCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<ProctorCliError> for CliError {
    fn from(e: ProctorCliError) -> Self {
        match e {
            ProctorCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            ProctorCliError::Risk(e @ RiskError::ConfigError(_)) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check the --config file syntax".to_string()),
            },
            ProctorCliError::Risk(e) => CliError {
                code: "VALIDATION_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Run 'proctor rules' to see the expected fields".to_string()),
            },
            ProctorCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            ProctorCliError::NoObservations => CliError {
                code: "NO_OBSERVATIONS".to_string(),
                message: "No observations found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            ProctorCliError::ParseError(msg) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: msg,
                hint: Some("Each line must be a JSON object tagged with \"channel\" or \"type\"".to_string()),
            },
        }
    }
}
