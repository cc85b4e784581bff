//! Match snapshot: the complete host-side view produced after each tick.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::enums::WaveState;
use crate::events::GameEvent;
use crate::replication::ReplicationFrame;
use crate::types::{NetId, PlayerId, SimTime, TeamId};

/// Wave bookkeeping mutated only by the host's wave state machine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchCounters {
    pub wave_count: u32,
    pub bots_remaining_to_spawn: u32,
}

/// Running kill tally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreView {
    pub bots_killed: u32,
    pub players_lost: u32,
}

/// Complete match state after a host tick.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchSnapshot {
    pub time: SimTime,
    pub started: bool,
    pub wave_state: WaveState,
    pub counters: MatchCounters,
    pub combatants: Vec<CombatantView>,
    pub players: Vec<PlayerView>,
    pub score: ScoreView,
    pub events: Vec<GameEvent>,
    /// Deltas this tick produced for observers.
    pub replication: ReplicationFrame,
}

/// A damageable actor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombatantView {
    pub net_id: NetId,
    pub position: Vec3,
    pub health: f32,
    pub max_health: f32,
    pub team: TeamId,
    pub is_dead: bool,
    pub is_bot: bool,
}

/// A connected player session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerView {
    pub player: PlayerId,
    pub controller: NetId,
    pub pawn: Option<NetId>,
    pub kills: u32,
}

impl MatchSnapshot {
    /// Number of bots that still have health.
    pub fn living_bots(&self) -> usize {
        self.combatants
            .iter()
            .filter(|c| c.is_bot && c.health > 0.0)
            .count()
    }
}
