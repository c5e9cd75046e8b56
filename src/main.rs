//! photorank CLI
//!
//! Usage:
//!   photorank --serve                        # HTTP API server
//!   photorank --replay events.ndjson         # Replay verification events
//!   photorank --replay - --json              # Replay from stdin, JSON output
//!   photorank --elo 1200 1000                # One ELO update

use clap::Parser;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use tracing::{info, warn};

use photorank::config::Config;
use photorank::core::{elo, run_server, VerificationEvent, VerificationSession};
use photorank::logging::{init_logging, LogFormat};
use photorank::types::VerificationDecision;
use photorank::VERSION;

#[derive(Parser, Debug)]
#[command(
    name = "photorank",
    version = VERSION,
    about = "photorank - capture verification and pairwise photo rating",
    long_about = "photorank turns per-frame detector signals into capture guidance,\n\
                  authenticates the captured photo with a liveness check, and keeps\n\
                  ELO ratings for photos in a comparison pool.\n\n\
                  Modes:\n  \
                  --serve        HTTP API server mode\n  \
                  --replay FILE  Replay newline-delimited verification events (- for stdin)\n  \
                  --elo W L      Print the ratings after W beats L"
)]
struct Args {
    /// Run as HTTP API server
    #[arg(short, long)]
    serve: bool,

    /// Server address (overrides the config file)
    #[arg(long)]
    addr: Option<String>,

    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level filter, e.g. info or photorank=debug
    #[arg(long)]
    log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    /// Replay verification events from a file, or - for stdin
    #[arg(short, long, value_name = "FILE")]
    replay: Option<String>,

    /// Output as JSON
    #[arg(long)]
    json: bool,

    /// Disable colors in output
    #[arg(long)]
    no_color: bool,

    /// Winner and loser ratings
    #[arg(long, num_args = 2, value_names = ["WINNER", "LOSER"], allow_negative_numbers = true)]
    elo: Option<Vec<i32>>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => match Config::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Config error ({}): {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => Config::default(),
    };
    if let Some(addr) = &args.addr {
        config.server.addr = addr.clone();
    }
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }
    if args.log_json {
        config.logging.json = true;
    }

    let format = if config.logging.json { LogFormat::Json } else { LogFormat::Human };
    init_logging(format, &config.logging.level);

    if args.no_color {
        colored::control::set_override(false);
    }

    if args.serve {
        run_serve(config).await;
    } else if let Some(source) = &args.replay {
        if let Err(e) = run_replay(source, &config, &args) {
            eprintln!("Replay error: {}", e);
            std::process::exit(1);
        }
    } else if let Some(ratings) = &args.elo {
        run_elo(ratings, &config, &args);
    } else {
        eprintln!("No mode given; try --serve, --replay or --elo (see --help)");
        std::process::exit(2);
    }
}

/// Feed events through one session and print a decision per event
fn run_replay(source: &str, config: &Config, args: &Args) -> photorank::Result<()> {
    let reader: Box<dyn BufRead> = if source == "-" {
        Box::new(BufReader::new(io::stdin()))
    } else {
        Box::new(BufReader::new(File::open(source)?))
    };

    let mut session = VerificationSession::new("replay", config);
    let mut line_no = 0usize;

    for line in reader.lines() {
        let line = line?;
        line_no += 1;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let event: VerificationEvent = match serde_json::from_str(line) {
            Ok(event) => event,
            Err(e) => {
                warn!(line = line_no, error = %e, "skipping malformed event");
                continue;
            }
        };

        let decision = match event {
            VerificationEvent::Frame(frame) => match session.offer_frame(frame) {
                Some(decision) => decision,
                None => continue,
            },
            other => session.handle(other),
        };
        print_decision(&decision, args)?;
        if decision.is_final() {
            info!(line = line_no, status = ?decision.status, "session reached a final decision");
        }
    }

    info!(
        events = line_no,
        dropped = session.dropped_frames(),
        state = %session.state(),
        "replay finished"
    );
    Ok(())
}

fn print_decision(decision: &VerificationDecision, args: &Args) -> photorank::Result<()> {
    if args.json {
        println!("{}", serde_json::to_string(decision)?);
    } else if args.no_color {
        println!("{}", decision.to_parseable_string());
    } else {
        println!("{}", decision.to_terminal_string());
    }
    Ok(())
}

fn run_elo(ratings: &[i32], config: &Config, args: &Args) {
    let [winner, loser] = ratings else {
        eprintln!("--elo takes exactly two ratings");
        std::process::exit(2);
    };
    let (new_winner, new_loser) = elo::update(*winner, *loser, config.rating.k_factor);

    if args.json {
        println!(
            "{}",
            serde_json::json!({
                "winner": { "before": winner, "after": new_winner },
                "loser": { "before": loser, "after": new_loser },
                "k_factor": config.rating.k_factor,
            })
        );
    } else {
        println!("winner {} -> {} ({:+})", winner, new_winner, i64::from(new_winner) - i64::from(*winner));
        println!("loser  {} -> {} ({:+})", loser, new_loser, i64::from(new_loser) - i64::from(*loser));
    }
}

/// Run HTTP API server
async fn run_serve(config: Config) {
    let addr = config.server.addr.clone();
    if let Err(e) = run_server(&addr, config).await {
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }
}
