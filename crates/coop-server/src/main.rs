use std::path::PathBuf;
use std::sync::mpsc::RecvTimeoutError;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use log::info;

use coop_core::commands::PlayerCommand;
use coop_core::config::MatchConfig;
use coop_core::enums::WaveState;
use coop_core::events::{ChangeEvent, ChangeListener};
use coop_core::types::PlayerId;
use coop_server::logging;
use coop_server::state::ServerState;
use coop_sim::arena::LogCosmetics;
use coop_sim::ObserverSession;

/// Headless host for a co-op arena match
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Match config file (JSON). Built-in defaults when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Players joined at start
    #[arg(short, long, default_value_t = 1)]
    players: u32,
    /// Seconds to run before shutting down
    #[arg(short, long, default_value_t = 60.0)]
    seconds: f64,
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Logs wave transitions seen by the observer mirror.
struct WaveLog;

impl ChangeListener for WaveLog {
    fn on_changed(&mut self, change: &ChangeEvent) {
        if let ChangeEvent::WaveState { new, old } = change {
            info!("observer saw wave state {old:?} -> {new:?}");
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<MatchConfig> {
    match path {
        Some(path) => MatchConfig::load(path)
            .with_context(|| format!("loading match config from {}", path.display())),
        None => Ok(MatchConfig::default()),
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init(args.verbose);

    let config = load_config(args.config.as_ref())?;
    info!("seed {}, {} player(s)", config.seed, args.players);

    let server = ServerState::new();
    server.start(config)?;
    let frames = server.subscribe()?;

    let mut observer = ObserverSession::new(PlayerId(1), Box::new(LogCosmetics));
    observer.subscribe(None, Box::new(WaveLog));

    for id in 1..=args.players {
        let player = PlayerId(id);
        server.send_command(PlayerCommand::Join { player })?;
        server.send_command(PlayerCommand::StartFire { player })?;
    }
    server.send_command(PlayerCommand::StartMatch)?;

    let deadline = Instant::now() + Duration::from_secs_f64(args.seconds.max(0.0));
    while Instant::now() < deadline {
        match frames.recv_timeout(Duration::from_millis(100)) {
            Ok(bytes) => observer
                .apply_bytes(&bytes)
                .context("applying replication frame")?,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
        if observer.wave_state() == WaveState::GameOver {
            break;
        }
    }

    server.shutdown()?;
    if let Some(snapshot) = server.latest_snapshot()? {
        info!(
            "finished at tick {}: {:?}, wave {}, {} bots killed, {} players lost",
            snapshot.time.tick,
            snapshot.wave_state,
            snapshot.counters.wave_count,
            snapshot.score.bots_killed,
            snapshot.score.players_lost
        );
    }
    Ok(())
}
