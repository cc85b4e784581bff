//! Events emitted by the simulation.
//!
//! `ChangeEvent` is the single notification type for replicated state. The
//! host raises it when it mutates a value; an observer raises it when an
//! inbound delta actually changes its mirror. Listeners implement
//! `ChangeListener` once and work on both sides.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::components::HitTrace;
use crate::enums::*;
use crate::types::{NetId, PlayerId};

/// A health value moved.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HealthChanged {
    pub actor: NetId,
    /// Health after the change.
    pub health: f32,
    /// Negative for damage, positive for healing.
    pub delta: f32,
    /// `None` for heals and for changes observed through replication.
    pub kind: Option<DamageKind>,
    pub instigator: Option<NetId>,
    pub causer: Option<NetId>,
}

/// An actor's health reached zero. Raised once per actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorKilled {
    pub victim: NetId,
    /// The actor that dealt the final blow.
    pub killer: Option<NetId>,
    /// The player controller behind the killer, if any.
    pub killer_controller: Option<NetId>,
}

/// A replicated value transitioned.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ChangeEvent {
    Health(HealthChanged),
    /// A character's death flag flipped.
    Died { actor: NetId },
    WaveState { new: WaveState, old: WaveState },
    PowerupActive { powerup: NetId, active: bool },
    /// A weapon resolved a shot. Cosmetic only.
    HitTrace { weapon: NetId, trace: HitTrace },
}

impl ChangeEvent {
    /// The actor the change belongs to; `None` for match-level changes.
    pub fn actor(&self) -> Option<NetId> {
        match self {
            ChangeEvent::Health(changed) => Some(changed.actor),
            ChangeEvent::Died { actor } => Some(*actor),
            ChangeEvent::WaveState { .. } => None,
            ChangeEvent::PowerupActive { powerup, .. } => Some(*powerup),
            ChangeEvent::HitTrace { weapon, .. } => Some(*weapon),
        }
    }
}

/// Receives change notifications, in subscription order, synchronously.
pub trait ChangeListener {
    fn on_changed(&mut self, change: &ChangeEvent);
}

/// Fire-and-forget presentation requests. Nothing in the core reads them back.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CosmeticCue {
    MuzzleFlash { weapon: NetId },
    Trail { weapon: NetId, end: Vec3 },
    Impact { surface: SurfaceKind, point: Vec3 },
    CameraShake { player: PlayerId },
    /// Tracker bot material pulse on damage.
    DamagePulse { actor: NetId },
    SelfDestructWarning { actor: NetId },
    Explosion { at: Vec3 },
    PowerupState { powerup: NetId, active: bool },
}

/// Gameplay events collected per tick for the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GameEvent {
    PlayerJoined { player: PlayerId, pawn: NetId },
    PlayerLeft { player: PlayerId },
    ActorKilled(ActorKilled),
    WaveStateChanged { new: WaveState, old: WaveState },
    BotSpawned { bot: NetId, wave: u32 },
    PowerupActivated { powerup: NetId, target: NetId },
    PowerupExpired { powerup: NetId },
    PickupRespawned { pickup: NetId, powerup: NetId },
    Exploded { bot: NetId },
}
