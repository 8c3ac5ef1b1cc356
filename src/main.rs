use lane_rush::autoplay::Autoplay;
use lane_rush::chart::Chart;
use lane_rush::clock::SessionClock;
use lane_rush::config::GameConfig;
use lane_rush::console_display;
use lane_rush::coordinator::{Coordinator, Frame};
use lane_rush::executor::{AudioExecutor, ExecutorContext, LogSoundBank};
use lane_rush::input;
use lane_rush::session_log;
use lane_rush::types::*;

use clap::Parser;
use crossbeam_channel::{bounded, never, unbounded, Sender};
use log::{error, info};
use std::path::PathBuf;
use std::process;
use std::thread;

#[derive(Parser)]
#[command(name = "lane-rush")]
#[command(about = "Four-lane falling-note rhythm game engine")]
struct Cli {
    /// Chart file (CSV: user_played,instrument,velocity,pitch,start,end)
    chart: PathBuf,

    /// JSON config file; missing keys keep their defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the clock period (ms)
    #[arg(long)]
    tick_ms: Option<u64>,

    /// Override the note travel time (ms)
    #[arg(long)]
    travel_ms: Option<u64>,

    /// Read key edges from stdin instead of autoplay
    /// (lowercase = key down, uppercase = key up)
    #[arg(long)]
    stdin_keys: bool,

    /// Autoplay: let every n-th player note through (0 = play all)
    #[arg(long, default_value_t = 0)]
    miss_every: usize,

    /// Run in virtual time as fast as possible (autoplay only)
    #[arg(long)]
    fast: bool,

    /// Enable console display (terminal playfield)
    #[arg(long)]
    console: bool,

    /// Console display refresh rate (Hz)
    #[arg(long, default_value_t = 20)]
    display_hz: u32,

    /// Enable session logging
    #[arg(long)]
    log_data: bool,

    /// Output directory for logged sessions
    #[arg(long, default_value = "./sessions")]
    output_dir: PathBuf,
}

fn load_config(cli: &Cli) -> Result<GameConfig, lane_rush::error::GameError> {
    let mut config = match &cli.config {
        Some(path) => GameConfig::load(path)?,
        None => GameConfig::default(),
    };
    if let Some(tick_ms) = cli.tick_ms {
        config.tick_ms = tick_ms;
    }
    if let Some(travel_ms) = cli.travel_ms {
        config.travel_ms = travel_ms;
    }
    config.validate()?;
    Ok(config)
}

fn main() {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
    .format_timestamp_millis()
    .init();

    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(c) => c,
        Err(e) => {
            error!("Bad configuration: {}", e);
            process::exit(1);
        }
    };
    let chart = match Chart::load(&cli.chart) {
        Ok(c) => c,
        Err(e) => {
            error!("Cannot load chart {:?}: {}", cli.chart, e);
            process::exit(1);
        }
    };
    let chart_name = cli
        .chart
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let fast = cli.fast && !cli.stdin_keys;
    if cli.fast && cli.stdin_keys {
        error!("--fast needs scripted input; running live");
    }

    info!("═══════════════════════════════════════════════");
    info!("  LANE RUSH v{}", env!("CARGO_PKG_VERSION"));
    info!("  Chart: {} ({} notes, {:.1}s)", chart_name, chart.notes.len(), chart.duration());
    info!("  Input: {}", if cli.stdin_keys { "STDIN" } else { "AUTOPLAY" });
    info!("  Time: {}", if fast { "VIRTUAL" } else { "LIVE" });
    info!(
        "  Keys: {}",
        config.key_bindings.iter().map(|k| k.to_string()).collect::<Vec<_>>().join(" ")
    );
    if cli.console { info!("  UI: Console TUI"); }
    info!("═══════════════════════════════════════════════");

    // Channels: coordinator → consumers
    let mut frame_txs: Vec<Sender<Frame>> = Vec::new();
    let mut handles = Vec::new();

    // ─── Audio executor ─────────────────────────────────────────────
    {
        let (tx, rx) = bounded::<Frame>(1024);
        frame_txs.push(tx);
        let ctx = ExecutorContext::new(LogSoundBank::new(&config.instruments), &config);
        handles.push(thread::Builder::new().name("audio".into()).spawn(move || {
            AudioExecutor::new(rx, ctx).run();
        }));
    }

    // ─── Console display (opt-in) ───────────────────────────────────
    if cli.console {
        let (tx, rx) = bounded::<Frame>(256);
        frame_txs.push(tx);
        let hz = cli.display_hz;
        let cfg = config.clone();
        handles.push(thread::Builder::new().name("display".into()).spawn(move || {
            console_display::ConsoleDisplay::new(rx, hz, cfg).run();
        }));
    }

    // ─── Session logger ─────────────────────────────────────────────
    if cli.log_data {
        let (tx, rx) = bounded::<Frame>(4096);
        match session_log::SessionLogger::new(rx, &cli.output_dir, config.clone(), &chart_name) {
            Ok(logger) => {
                frame_txs.push(tx);
                handles.push(thread::Builder::new().name("logger".into()).spawn(move || {
                    logger.run_logged();
                }));
            }
            Err(e) => error!("Session logging disabled: {}", e),
        }
    }

    // ─── Coordinator ────────────────────────────────────────────────
    let mut coord = Coordinator::new(config.clone(), &chart, frame_txs);

    let keys = if cli.stdin_keys {
        let (key_tx, key_rx) = unbounded::<KeyEdge>();
        // Not joined: it stays blocked on stdin after the game ends.
        let spawned = thread::Builder::new().name("stdin-keys".into()).spawn(move || {
            input::read_key_edges(std::io::stdin().lock(), key_tx);
        });
        if let Err(e) = spawned {
            error!("Cannot start key reader: {}", e);
            process::exit(1);
        }
        key_rx
    } else {
        info!("Starting autoplay...");
        coord.schedule_keys(Autoplay::new(&config).with_miss_every(cli.miss_every).key_edges(&chart));
        never()
    };

    let coordinator = thread::Builder::new().name("coordinator".into()).spawn(move || {
        if fast {
            coord.run_virtual()
        } else {
            coord.run_live(keys, SessionClock::new())
        }
    });

    let final_state = match coordinator.map(|h| h.join()) {
        Ok(Ok(state)) => state,
        Ok(Err(_)) => {
            error!("Coordinator thread panicked");
            process::exit(1);
        }
        Err(e) => {
            error!("Cannot start coordinator: {}", e);
            process::exit(1);
        }
    };

    for h in handles {
        match h {
            Ok(h) => { let _ = h.join(); }
            Err(e) => error!("Consumer thread failed to start: {}", e),
        }
    }

    info!(
        "Final score {:.1} (x{:.1}, {} misses)",
        final_state.score, final_state.multiplier, final_state.misses
    );
}
