//! cell28 CLI
//!
//! Usage:
//!   cell28 --ticks 12                          # Run 12 ticks, print a line per tick
//!   cell28 --ticks 12 --json                   # Print the sealed frame log as JSON
//!   cell28 --tokens "a:1.0,b:0.5" --entropy 0.4
//!   cell28 --ticks 24 --save ./logs --dump run.bin
//!   cell28 --verify ./logs/log_....json        # Replay-verify a saved log
//!   cell28 --verify run.json --expect-fingerprint SCXQ2-v1:...
//!   cell28 --serve                             # HTTP API server

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use cell28::core::{
    encode_dump, fingerprint, load_log, parse_tokens, run_server, save_log, verify,
    verify_fingerprint, Engine, EngineConfig, TickReport,
};
use cell28::types::{default_tokens, EngineError, Frame, Phase, TickInput, VerifyReport};
use cell28::VERSION;

#[derive(Parser, Debug)]
#[command(
    name = "cell28",
    version = VERSION,
    about = "cell28 - deterministic, replay-verifiable 28-cell micro-execution engine",
    long_about = "Runs 28 compute cells through the six-phase lattice\n\
                  (perceive, represent, reason, decide, act, reflect).\n\n\
                  Every executed cell emits a proof record. Decide exit collapses\n\
                  proposals into one Answer; reflect exit propagates reward.\n\n\
                  Modes:\n  \
                  (default)      Run --ticks ticks on a constant input\n  \
                  --verify FILE  Replay-verify a saved frame log\n  \
                  --serve        HTTP API server mode"
)]
struct Args {
    /// Number of ticks to run
    #[arg(short, long, default_value_t = 12)]
    ticks: u64,

    /// Entropy fed to every tick
    #[arg(short, long, default_value_t = 0.32)]
    entropy: f64,

    /// Global reward bias fed to every tick
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    reward_bias: f64,

    /// Token stream as glyph:weight,... (default: the 4-token stream)
    #[arg(long)]
    tokens: Option<String>,

    /// Cluster id (overrides the config file)
    #[arg(long)]
    cluster_id: Option<u32>,

    /// Cluster count (overrides the config file)
    #[arg(long)]
    cluster_count: Option<u32>,

    /// Engine config JSON
    #[arg(short, long)]
    config: Option<String>,

    /// Output as JSON
    #[arg(long)]
    json: bool,

    /// Disable colors in output
    #[arg(long)]
    no_color: bool,

    /// Save the frame log into this directory
    #[arg(long)]
    save: Option<String>,

    /// Write the binary dump to this file
    #[arg(long)]
    dump: Option<String>,

    /// Verify a saved frame log instead of running
    #[arg(long)]
    verify: Option<String>,

    /// Fail unless the log's fingerprint equals this value
    #[arg(long)]
    expect_fingerprint: Option<String>,

    /// Run as HTTP API server
    #[arg(short, long)]
    serve: bool,

    /// Server address
    #[arg(long, default_value = "127.0.0.1:3000")]
    addr: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // stdout stays parseable; diagnostics go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    if args.no_color {
        colored::control::set_override(false);
    }

    let result = if args.serve {
        run_serve(&args).await
    } else if let Some(path) = &args.verify {
        run_verify(path, &args)
    } else {
        run_engine(&args)
    };

    if let Err(e) = result {
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}

/// Run the engine on a constant input
fn run_engine(args: &Args) -> Result<(), EngineError> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if let Some(id) = args.cluster_id {
        config.cluster_id = id;
    }
    if let Some(count) = args.cluster_count {
        config.cluster_count = count;
    }

    let tokens = match &args.tokens {
        Some(spec) => parse_tokens(spec)?,
        None => default_tokens(),
    };
    let input = TickInput::new(args.entropy, args.reward_bias, config.cluster_id)
        .with_cluster_count(config.cluster_count)
        .with_tokens(tokens);

    let mut engine = Engine::new(config)?;

    if !args.json {
        print_header(&engine, args.no_color);
    }

    let mut reports = Vec::with_capacity(args.ticks as usize);
    for _ in 0..args.ticks {
        let report = engine.tick(&input)?;
        if !args.json {
            print_report(&report, args.no_color);
        }
        reports.push(report);
    }

    let frames = engine.into_log();

    if let Some(dir) = &args.save {
        let path = save_log(&frames, dir)?;
        if !args.json {
            println!("{} {}", "saved".cyan(), path.display());
        }
    }
    if let Some(path) = &args.dump {
        std::fs::write(path, encode_dump(&frames)?)?;
        if !args.json {
            println!("{} {}", "dumped".cyan(), path);
        }
    }

    check_expected_fingerprint(&frames, args)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&frames)?);
        return Ok(());
    }

    println!();
    print_verification(&frames)
}

/// Verify a saved frame log
fn run_verify(path: &str, args: &Args) -> Result<(), EngineError> {
    let frames = load_log(path)?;
    check_expected_fingerprint(&frames, args)?;

    if args.json {
        let value = match verify(&frames) {
            Ok(report) => serde_json::json!({ "ok": true, "report": report, "fingerprint": fingerprint(&frames)? }),
            Err(failure) => serde_json::json!({ "ok": false, "failure": failure }),
        };
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("Verifying {} ({} frames)", path, frames.len());
    print_verification(&frames)
}

/// Run HTTP API server
async fn run_serve(args: &Args) -> Result<(), EngineError> {
    println!();
    println!("{}", format!("cell28 v{} API Server", VERSION).bold());
    println!();

    run_server(&args.addr)
        .await
        .map_err(|e| EngineError::Protocol(format!("server: {}", e)))
}

/// Compare against --expect-fingerprint; a mismatch exits like a failed verify
fn check_expected_fingerprint(frames: &[Frame], args: &Args) -> Result<(), EngineError> {
    let Some(expected) = &args.expect_fingerprint else {
        return Ok(());
    };
    if !verify_fingerprint(frames, expected)? {
        eprintln!(
            "{} fingerprint mismatch: expected {} computed {}",
            "FAIL".red().bold(),
            expected,
            fingerprint(frames)?
        );
        std::process::exit(2);
    }
    Ok(())
}

/// Print the verifier outcome; a failed log exits non-zero
fn print_verification(frames: &[Frame]) -> Result<(), EngineError> {
    match verify(frames) {
        Ok(report) => {
            print_report_summary(&report);
            println!("  fingerprint: {}", fingerprint(frames)?);
            Ok(())
        }
        Err(failure) => {
            println!("{} {}", "FAIL".red().bold(), failure);
            println!("  {}", failure.stage.description());
            std::process::exit(2);
        }
    }
}

fn print_report_summary(report: &VerifyReport) {
    println!(
        "{} {} | frames={} proofs={} answers={} rewards={}",
        "PASS".green().bold(),
        report.stage.code(),
        report.frames,
        report.proofs,
        report.answers,
        report.rewards
    );
    println!("  last proof: {}", report.last_proof_hash);
    for warning in &report.warnings {
        println!("  {} {:?}", "warn".yellow(), warning);
    }
}

/// Print header
fn print_header(engine: &Engine, no_color: bool) {
    let config = engine.config();
    let title = format!(
        "cell28 v{} | cluster {}/{} | policy {}",
        VERSION, config.cluster_id, config.cluster_count, config.policy_hash
    );
    if no_color {
        println!("{}", title);
    } else {
        println!("{}", title.bold());
    }
    println!();
}

/// One line per tick, plus the answer or reward when one was emitted
fn print_report(report: &TickReport, no_color: bool) {
    let (color, reset) = if no_color {
        ("", "")
    } else {
        (report.phase.color_code(), Phase::color_reset())
    };

    println!(
        "{}t={:<4} {:<9}{} mask={:07x} ran={:<2} {:?}",
        color,
        report.tick,
        report.phase.to_string(),
        reset,
        report.mask_bits,
        report.executed.len(),
        report.executed
    );

    if let Some(answer) = &report.answer {
        let content = answer.content.as_deref().unwrap_or("<no proposal>");
        println!(
            "  {} {} proof={}",
            "answer".green(),
            content,
            answer.proof_hash
        );
    }
    if let Some(reward) = &report.reward {
        println!(
            "  {} {:.6} credited={} proof={}",
            "reward".magenta(),
            reward.reward,
            reward.credits.len(),
            reward.proof_hash
        );
    }
}
