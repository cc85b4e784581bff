//! Game loop thread: runs the match at 30Hz and fans frames out.
//!
//! The session is created inside this thread and never leaves it. Commands
//! arrive via `mpsc` channel. Each non-empty replication frame is encoded
//! once and sent to every subscribed observer; the snapshot is stored in
//! shared state for polling.

use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use coop_core::config::MatchConfig;
use coop_core::constants::TICK_RATE;
use coop_core::state::MatchSnapshot;
use coop_sim::MatchSession;

use crate::state::GameLoopCommand;

/// Nominal duration of one tick.
const TICK_DURATION: Duration = Duration::from_nanos(1_000_000_000 / TICK_RATE as u64);

/// Spawns the game loop in a new thread and returns its command sender.
pub fn spawn_game_loop(
    config: MatchConfig,
    latest_snapshot: Arc<Mutex<Option<MatchSnapshot>>>,
) -> std::io::Result<mpsc::Sender<GameLoopCommand>> {
    let (cmd_tx, cmd_rx) = mpsc::channel::<GameLoopCommand>();

    std::thread::Builder::new()
        .name("coop-game-loop".into())
        .spawn(move || {
            run_game_loop(config, cmd_rx, &latest_snapshot);
        })?;

    Ok(cmd_tx)
}

/// What the loop should do after draining its inbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControl {
    Continue,
    Stop,
}

/// The session plus its observer fan-out. Owned by the loop thread.
pub struct Host {
    session: MatchSession,
    subscribers: Vec<mpsc::Sender<Vec<u8>>>,
}

impl Host {
    pub fn new(config: MatchConfig) -> Self {
        Self {
            session: MatchSession::headless(config),
            subscribers: Vec::new(),
        }
    }

    pub fn session(&self) -> &MatchSession {
        &self.session
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Apply one inbox command.
    pub fn handle(&mut self, command: GameLoopCommand) -> LoopControl {
        match command {
            GameLoopCommand::Player(cmd) => {
                self.session.queue_command(cmd);
            }
            GameLoopCommand::Subscribe(tx) => {
                match self.session.full_state_frame().encode() {
                    Ok(bytes) => {
                        if tx.send(bytes).is_ok() {
                            self.subscribers.push(tx);
                            info!("observer subscribed ({} total)", self.subscribers.len());
                        }
                    }
                    Err(err) => warn!("cannot encode full state: {err}"),
                }
            }
            GameLoopCommand::Shutdown => return LoopControl::Stop,
        }
        LoopControl::Continue
    }

    /// Advance one tick and broadcast its frame.
    pub fn step(&mut self) -> MatchSnapshot {
        let snapshot = self.session.tick();
        if !snapshot.replication.is_empty() {
            match snapshot.replication.encode() {
                Ok(bytes) => self.broadcast(&bytes),
                Err(err) => warn!("cannot encode frame {}: {err}", snapshot.replication.tick),
            }
        }
        snapshot
    }

    /// Send to every observer, dropping those that hung up.
    fn broadcast(&mut self, bytes: &[u8]) {
        let before = self.subscribers.len();
        self.subscribers.retain(|tx| tx.send(bytes.to_vec()).is_ok());
        let dropped = before - self.subscribers.len();
        if dropped > 0 {
            debug!("{dropped} observer(s) disconnected");
        }
    }
}

/// The game loop. Runs until Shutdown command or channel disconnect.
fn run_game_loop(
    config: MatchConfig,
    cmd_rx: mpsc::Receiver<GameLoopCommand>,
    latest_snapshot: &Mutex<Option<MatchSnapshot>>,
) {
    let mut host = Host::new(config);
    let mut next_tick_time = Instant::now();
    info!("game loop running at {TICK_RATE}Hz");

    loop {
        // 1. Drain all pending commands
        loop {
            match cmd_rx.try_recv() {
                Ok(command) => {
                    if host.handle(command) == LoopControl::Stop {
                        info!("game loop stopped");
                        return;
                    }
                }
                Err(mpsc::TryRecvError::Empty) => break,
                Err(mpsc::TryRecvError::Disconnected) => {
                    info!("command channel closed; game loop stopped");
                    return;
                }
            }
        }

        // 2. Advance one tick and fan out its frame
        let snapshot = host.step();

        // 3. Store latest snapshot for polling
        if let Ok(mut lock) = latest_snapshot.lock() {
            *lock = Some(snapshot);
        }

        // 4. Sleep until next tick
        next_tick_time += TICK_DURATION;
        let now = Instant::now();
        if next_tick_time > now {
            std::thread::sleep(next_tick_time - now);
        } else if now - next_tick_time > TICK_DURATION * 2 {
            // Too far behind: reset to avoid catch-up spiral
            next_tick_time = now;
        }
    }
}
