//! Verity CLI
//!
//! Usage:
//!   verity                                  # Live session, Ctrl-C to stop
//!   verity --profile enhanced --ticks 20    # Stop after 20 analyses
//!   verity --headless --seed 7 --ticks 50   # Simulated clock, reproducible
//!   verity --config verity.json --json      # Config file, JSON lines
//!   verity --serve                          # HTTP + WebSocket API

use anyhow::{bail, Context, Result};
use clap::Parser;
use colored::*;
use log::info;
use tokio::sync::broadcast;

use verity::core::{
    run_server, spawn_session, EngineConfig, ManualClock, ManualScheduler, RuleProfile, Session,
};
use verity::types::{AnalysisRecord, SessionSnapshot, VerdictLabel};
use verity::VERSION;

/// Ticks run headless when --ticks is not given
const DEFAULT_HEADLESS_TICKS: u64 = 10;

#[derive(Parser, Debug)]
#[command(
    name = "verity",
    version = VERSION,
    about = "Verity - periodic behavioral-signal truth/lie scoring",
    long_about = "Verity samples synthetic behavioral signals on a fixed cadence,\n\
                  scores each sample against a weighted rule profile and keeps a\n\
                  bounded history of TRUTH/LIE verdicts.\n\n\
                  Profiles:\n  \
                  basic        - facial expression and micro-expression cues\n  \
                  enhanced     - adds eye movement, asymmetry, lip tension\n  \
                  landmark     - 68-point landmark motion\n  \
                  demographic  - 468-point mesh, emotion and age channels"
)]
struct Args {
    /// Rule profile (basic, enhanced, landmark, demographic)
    #[arg(short, long, env = "VERITY_PROFILE")]
    profile: Option<String>,

    /// Override the profile's tick interval
    #[arg(short, long, env = "VERITY_TICK_MS")]
    interval_ms: Option<u64>,

    /// History capacity
    #[arg(short, long)]
    capacity: Option<usize>,

    /// Seed for reproducible runs
    #[arg(long, env = "VERITY_SEED")]
    seed: Option<u64>,

    /// JSON config file (flags override its values)
    #[arg(long)]
    config: Option<String>,

    /// Stop after this many analyses
    #[arg(short, long)]
    ticks: Option<u64>,

    /// Drive the session with a simulated clock instead of real timers
    #[arg(long)]
    headless: bool,

    /// Run as HTTP API server
    #[arg(short, long)]
    serve: bool,

    /// Server address (default: 127.0.0.1:3000)
    #[arg(long, default_value = "127.0.0.1:3000")]
    addr: String,

    /// List built-in profiles and exit
    #[arg(long)]
    list_profiles: bool,

    /// Output as JSON
    #[arg(long)]
    json: bool,

    /// Disable colors in output
    #[arg(long)]
    no_color: bool,

    /// Show per-channel signal values
    #[arg(long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Reads RUST_LOG
    env_logger::Builder::from_default_env()
        .filter_level(if args.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .init();

    if args.no_color {
        colored::control::set_override(false);
    }

    if args.list_profiles {
        list_profiles();
        return Ok(());
    }

    if args.serve {
        info!("starting API server on {}", args.addr);
        return run_server(&args.addr)
            .await
            .with_context(|| format!("API server on {} failed", args.addr));
    }

    let config = build_config(&args)?;
    if args.headless {
        run_headless(config, &args)
    } else {
        run_live(config, &args).await
    }
}

/// File first, then flags on top
fn build_config(args: &Args) -> Result<EngineConfig> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::from_file(path).context("loading config file")?,
        None => EngineConfig::default(),
    };

    if let Some(name) = &args.profile {
        config.rule_profile = name.parse::<RuleProfile>()?;
    }
    if let Some(ms) = args.interval_ms {
        config.tick_interval_ms = Some(ms);
    }
    if let Some(capacity) = args.capacity {
        config.history_capacity = capacity;
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }

    config.validate().context("invalid configuration")?;
    Ok(config)
}

/// Real timers; runs until --ticks analyses or Ctrl-C
async fn run_live(config: EngineConfig, args: &Args) -> Result<()> {
    if !args.json {
        print_header(&config);
        println!("Recording. Press Ctrl-C to stop.");
        println!();
    }

    let handle = spawn_session(config)?;
    let mut updates = handle.subscribe();
    handle.start().await?;

    let mut last_tick = 0;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
            update = updates.recv() => match update {
                Ok(snapshot) => {
                    if let Some(fault) = &snapshot.fault {
                        eprintln!("{} {}", "capture lost:".red().bold(), fault);
                        break;
                    }
                    if snapshot.tick_count > last_tick {
                        last_tick = snapshot.tick_count;
                        if let Some(record) = snapshot.latest() {
                            print_record(record, args)?;
                        }
                        if args.ticks.is_some_and(|n| last_tick >= n) {
                            break;
                        }
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    let snapshot = handle.stop().await?;
    handle.shutdown();
    print_summary(&snapshot, args)
}

/// Simulated clock, timer fired by hand. Same seed, same output.
fn run_headless(config: EngineConfig, args: &Args) -> Result<()> {
    let ticks = args.ticks.unwrap_or(DEFAULT_HEADLESS_TICKS);
    if ticks == 0 {
        bail!("--ticks must be positive in headless mode");
    }
    if !args.json {
        print_header(&config);
    }

    let interval_ms = config.tick_interval_ms();
    let clock = ManualClock::default();
    let mut session = Session::new(config, Box::new(ManualScheduler::new()))?
        .with_clock(clock.clone());

    session.start();
    for _ in 0..ticks {
        clock.advance_ms(interval_ms);
        if let Some(record) = session.fire()? {
            print_record(&record, args)?;
        }
    }
    session.stop();

    print_summary(&session.snapshot(), args)
}

fn list_profiles() {
    for profile in RuleProfile::BUILT_IN {
        let def = profile.definition();
        println!(
            "{:<12} {:>5}ms  {:>2} rules  {} overrides",
            def.name.bold(),
            def.tick_interval_ms,
            def.rules.rules.len(),
            def.rules.overrides.len()
        );
    }
}

fn print_header(config: &EngineConfig) {
    let title = format!(
        "Verity v{} - {} profile, every {}ms",
        VERSION,
        config.rule_profile.name(),
        config.tick_interval_ms()
    );
    println!("{}", "=".repeat(title.len() + 4).bold());
    println!("  {}", title.bold());
    println!("{}", "=".repeat(title.len() + 4).bold());
    println!();
}

fn print_record(record: &AnalysisRecord, args: &Args) -> Result<()> {
    if args.json {
        println!("{}", serde_json::to_string(record)?);
        return Ok(());
    }

    if args.no_color {
        println!("{}", record.to_parseable_string());
    } else {
        println!("{}", record.to_terminal_string());
    }

    if args.verbose {
        for (channel, value) in &record.sample.intensities {
            println!("    {:<18} {:.3}", channel.to_string().dimmed(), value);
        }
        if let Some(micro) = record.sample.micro_expression {
            println!("    {:<18} {}", "micro".dimmed(), micro.as_str());
        }
        if let Some(motion) = record.sample.motion {
            println!("    {:<18} {:.2}px", "motion".dimmed(), motion);
        }
        println!(
            "    {:<18} deception={:.1} truth={:.1} lie={}%",
            "scores".dimmed(),
            record.verdict.deception_score,
            record.verdict.truth_score,
            record.verdict.lie_confidence
        );
    }
    Ok(())
}

fn print_summary(snapshot: &SessionSnapshot, args: &Args) -> Result<()> {
    if args.json {
        println!("{}", serde_json::to_string_pretty(snapshot)?);
        return Ok(());
    }

    let lies = snapshot
        .history
        .iter()
        .filter(|r| r.verdict.label == VerdictLabel::Lie)
        .count();
    let truths = snapshot.history.len() - lies;

    println!();
    println!("{}", "Session summary".bold());
    println!("  Analyses:     {}", snapshot.tick_count);
    println!("  Blink rate:   {}/min", snapshot.blink_rate);
    match &snapshot.verdict {
        Some(v) => {
            let label = match v.label {
                VerdictLabel::Lie => v.label.to_string().red().bold(),
                VerdictLabel::Truth => v.label.to_string().green().bold(),
            };
            println!("  Last verdict: {} {}%", label, v.confidence);
        }
        None => println!("  Last verdict: -"),
    }
    if let Some(expr) = &snapshot.dominant_expression {
        println!("  Expression:   {}", expr);
    }
    println!(
        "  History:      {} kept ({} {}, {} {})",
        snapshot.history.len(),
        truths,
        "TRUTH".green(),
        lies,
        "LIE".red()
    );
    Ok(())
}
