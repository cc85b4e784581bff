//! Server state shared between the caller and the game loop thread.

use std::sync::mpsc;
use std::sync::{Arc, Mutex};

use log::info;
use thiserror::Error;

use coop_core::commands::PlayerCommand;
use coop_core::config::MatchConfig;
use coop_core::state::MatchSnapshot;

use crate::game_loop;

/// Commands sent to the game loop thread.
#[derive(Debug)]
pub enum GameLoopCommand {
    /// A player command to forward to the match.
    Player(PlayerCommand),
    /// Register an observer. It receives the full state first, then every
    /// non-empty frame as encoded bytes.
    Subscribe(mpsc::Sender<Vec<u8>>),
    /// Stop the game loop thread.
    Shutdown,
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("match already running")]
    AlreadyRunning,
    #[error("match not started")]
    NotStarted,
    #[error("game loop has stopped")]
    LoopStopped,
    #[error("server state lock poisoned")]
    Poisoned,
    #[error("cannot spawn game loop thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Shared server state.
///
/// `Sender` is not `Sync`, so it sits behind a `Mutex`; it is `None` until
/// `start` runs. The latest snapshot is shared with the game loop thread.
pub struct ServerState {
    pub command_tx: Mutex<Option<mpsc::Sender<GameLoopCommand>>>,
    /// Updated by the game loop thread after each tick.
    pub latest_snapshot: Arc<Mutex<Option<MatchSnapshot>>>,
    pub running: Mutex<bool>,
}

impl Default for ServerState {
    fn default() -> Self {
        Self {
            command_tx: Mutex::new(None),
            latest_snapshot: Arc::new(Mutex::new(None)),
            running: Mutex::new(false),
        }
    }
}

impl ServerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn the game loop for a new match.
    pub fn start(&self, config: MatchConfig) -> Result<(), ServerError> {
        let mut running = self.running.lock().map_err(|_| ServerError::Poisoned)?;
        if *running {
            return Err(ServerError::AlreadyRunning);
        }

        let cmd_tx = game_loop::spawn_game_loop(config, self.latest_snapshot.clone())?;

        let mut tx_lock = self.command_tx.lock().map_err(|_| ServerError::Poisoned)?;
        *tx_lock = Some(cmd_tx);
        *running = true;
        info!("match host started");
        Ok(())
    }

    fn send(&self, command: GameLoopCommand) -> Result<(), ServerError> {
        let tx_lock = self.command_tx.lock().map_err(|_| ServerError::Poisoned)?;
        match tx_lock.as_ref() {
            Some(tx) => tx.send(command).map_err(|_| ServerError::LoopStopped),
            None => Err(ServerError::NotStarted),
        }
    }

    /// Queue a player command for the next tick.
    pub fn send_command(&self, command: PlayerCommand) -> Result<(), ServerError> {
        self.send(GameLoopCommand::Player(command))
    }

    /// Open a frame stream for a new observer.
    pub fn subscribe(&self) -> Result<mpsc::Receiver<Vec<u8>>, ServerError> {
        let (tx, rx) = mpsc::channel();
        self.send(GameLoopCommand::Subscribe(tx))?;
        Ok(rx)
    }

    /// Stop the game loop. The last snapshot stays readable.
    pub fn shutdown(&self) -> Result<(), ServerError> {
        let mut running = self.running.lock().map_err(|_| ServerError::Poisoned)?;
        if !*running {
            return Ok(());
        }
        self.send(GameLoopCommand::Shutdown)?;
        let mut tx_lock = self.command_tx.lock().map_err(|_| ServerError::Poisoned)?;
        *tx_lock = None;
        *running = false;
        Ok(())
    }

    /// The latest snapshot, for polling.
    pub fn latest_snapshot(&self) -> Result<Option<MatchSnapshot>, ServerError> {
        let lock = self.latest_snapshot.lock().map_err(|_| ServerError::Poisoned)?;
        Ok(lock.clone())
    }
}
