use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Duration;
use rand::SeedableRng;
use rand::rngs::StdRng;

use drill_core::EngineConfig;
use drill_core::time::Clock;
use services::PracticeService;
use storage::sink::{AnswerSink, ChannelSink, JsonLinesSink};

mod logging;
mod sim;

use sim::{ArithmeticSource, SimulatedLearner};

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidNumber { flag: &'static str, raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidNumber { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_number<T: std::str::FromStr>(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<T, ArgsError> {
    let raw = require_value(args, flag)?;
    raw.parse()
        .map_err(|_| ArgsError::InvalidNumber { flag, raw })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!(
        "  drill-sim [--questions <n>] [--skill <level>] [--seed <u64>] [--config <file.toml>] [--no-calibration]"
    );
    eprintln!();
    eprintln!("Simulates a learner and prints one JSON answer event per line on stdout.");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --questions 60");
    eprintln!("  --skill 9");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  DRILL_CONFIG, RUST_LOG");
}

struct Args {
    questions: u32,
    skill: f64,
    seed: Option<u64>,
    config: Option<PathBuf>,
    calibrate: bool,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut parsed = Self {
            questions: 60,
            skill: 9.0,
            seed: None,
            config: std::env::var_os("DRILL_CONFIG").map(PathBuf::from),
            calibrate: true,
        };

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--questions" | "-n" => parsed.questions = parse_number(args, "--questions")?,
                "--skill" => {
                    let raw = require_value(args, "--skill")?;
                    parsed.skill = raw
                        .parse::<f64>()
                        .ok()
                        .filter(|skill| skill.is_finite())
                        .ok_or(ArgsError::InvalidNumber {
                            flag: "--skill",
                            raw,
                        })?;
                }
                "--seed" => parsed.seed = Some(parse_number(args, "--seed")?),
                "--config" => parsed.config = Some(PathBuf::from(require_value(args, "--config")?)),
                "--no-calibration" => parsed.calibrate = false,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(parsed)
    }
}

/// Engine settings from `path`, or the defaults.
fn load_config(path: Option<&Path>) -> Result<EngineConfig, drill_core::Error> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    tracing::info!(path = %path.display(), "loading config");
    Ok(EngineConfig::from_path(path)?)
}

fn rng_for(seed: Option<u64>, stream: u64) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(stream)),
        None => StdRng::from_rng(&mut rand::rng()),
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);
    let args = Args::parse(&mut argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let config = load_config(args.config.as_deref())?;

    // Events flow: service -> channel -> writer task -> stdout.
    let (channel, mut rx) = ChannelSink::channel();
    let writer = tokio::spawn(async move {
        let stdout = JsonLinesSink::new(std::io::stdout());
        let mut written = 0_u64;
        while let Some(event) = rx.recv().await {
            stdout.record(event);
            written += 1;
        }
        written
    });

    // Simulated time so breaks and summaries behave as in a long session.
    let start = chrono::Utc::now();
    let mut service = match args.seed {
        Some(seed) => PracticeService::seeded(config, Arc::new(channel), seed)?,
        None => PracticeService::new(config, Arc::new(channel))?,
    }
    .with_clock(Clock::fixed(start));

    let mut source = ArithmeticSource::new(rng_for(args.seed, 1));
    let mut learner = SimulatedLearner::new(args.skill, rng_for(args.seed, 2));
    let mut session = if args.calibrate {
        service.start_calibration()
    } else {
        service.start_session()
    };
    tracing::info!(
        session_id = %session.id(),
        mode = ?session.mode(),
        skill = learner.skill(),
        "session started"
    );

    for _ in 0..args.questions {
        let picked = service.next_question(&mut session, &mut source)?;
        let reply = learner.answer(picked.band);

        #[allow(clippy::cast_possible_truncation)]
        let elapsed_ms = (reply.response_time_secs * 1000.0) as i64;
        service.advance_clock(Duration::milliseconds(elapsed_ms));

        service.answer_with_error(
            &mut session,
            Some(reply.outcome),
            reply.response_time_secs,
            reply.error_type,
        )?;

        if service.should_suggest_break(&session) {
            service.take_break(&mut session);
            service.advance_clock(Duration::minutes(5));
        }
    }

    let summary = service.summary(&session)?;
    tracing::info!(
        answers = summary.total_answers(),
        correct = summary.correct(),
        incorrect = summary.incorrect(),
        skipped = summary.skipped(),
        start_level = summary.start_level(),
        end_level = summary.end_level(),
        peak_level = summary.peak_level(),
        accuracy_pct = summary.accuracy_pct().unwrap_or(0.0),
        "session finished"
    );

    // Dropping the service closes the channel so the writer can finish.
    drop(service);
    let written = writer.await?;
    tracing::debug!(written, "event stream closed");

    Ok(())
}

#[tokio::main]
async fn main() {
    logging::init_tracing("info");
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
