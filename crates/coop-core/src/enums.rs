//! Enumeration types used throughout the simulation.

use serde::{Deserialize, Serialize};

/// Lifecycle of the match-level wave cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WaveState {
    /// Counting down to the next wave.
    #[default]
    WaitingToStart,
    /// Bots are being spawned.
    WaveInProgress,
    /// Every bot of the wave has spawned; waiting for them to die.
    WaitingToComplete,
    /// All bots of the wave are dead.
    WaveComplete,
    /// No player controls a living body. Terminal.
    GameOver,
}

impl WaveState {
    /// Whether no further transitions are possible.
    pub fn is_terminal(self) -> bool {
        self == WaveState::GameOver
    }
}

/// Physical surface reported by a hit-test.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SurfaceKind {
    #[default]
    Default,
    FleshDefault,
    /// Weak spot. Bullets deal multiplied damage here.
    FleshVulnerable,
}

/// What kind of hit produced a damage event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DamageKind {
    #[default]
    Generic,
    Bullet,
    Explosion,
    SelfDestruct,
}

/// Which side of the network a session runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetRole {
    /// Owns canonical state.
    Authority,
    /// Mirrors replicated state; never mutates gameplay.
    Observer,
}

/// Timer slots an actor (or the match) can own. One active timer per slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TimerKey {
    NextWaveStart,
    BotSpawner,
    FireRepeat,
    PowerupTick,
    PickupRespawn,
    PathRefresh,
    SelfDestruct,
}
