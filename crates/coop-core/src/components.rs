//! ECS components for hecs entities.
//!
//! Components are plain data structs. Game logic lives in the sim systems.
//! Components that point at other entities live in `coop-sim::actors`, since
//! this crate has no ECS dependency.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::enums::SurfaceKind;
use crate::types::{NetId, TeamId};

/// Health ledger of an actor that can take damage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Combatant {
    pub current_health: f32,
    pub max_health: f32,
    pub team: TeamId,
    /// Set when health first reaches zero. Never cleared.
    pub is_dead: bool,
}

impl Combatant {
    /// A full-health combatant on the given team.
    pub fn new(max_health: f32, team: TeamId) -> Self {
        Self {
            current_health: max_health,
            max_health,
            team,
            is_dead: false,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.current_health > 0.0
    }
}

impl Default for Combatant {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HEALTH, TeamId::default())
    }
}

/// World placement written by the embedding engine (or the headless arena).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    /// Viewpoint used for aiming.
    pub eye: Vec3,
    /// Unit aim direction.
    pub aim: Vec3,
}

impl Transform {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            eye: position,
            aim: Vec3::X,
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::at(Vec3::ZERO)
    }
}

/// Linear velocity (units/s).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity(pub Vec3);

/// Sphere collider used by the headless arena for traces and overlaps.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Collider {
    pub radius: f32,
    pub surface: SurfaceKind,
}

/// Overlap volume that reports begin-overlap edges.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriggerSphere {
    pub radius: f32,
    /// Actors overlapping as of the last overlap pass.
    pub overlapping: Vec<NetId>,
}

impl TriggerSphere {
    pub fn new(radius: f32) -> Self {
        Self {
            radius,
            overlapping: Vec::new(),
        }
    }
}

/// Movement modifiers powerups can touch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Movement {
    pub speed_multiplier: f32,
}

impl Default for Movement {
    fn default() -> Self {
        Self {
            speed_multiplier: 1.0,
        }
    }
}

/// Marks an AI-controlled pawn counted by the wave liveness scan.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Bot;

/// Actor is removed at the first step where `now >= expires_at`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Lifespan {
    pub expires_at: f64,
}

/// Weapon tuning that does not change while firing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeaponTuning {
    pub base_damage: f32,
    /// Seconds between automatic shots (60 / rounds per minute).
    pub time_between_shots: f64,
    pub vulnerable_multiplier: f32,
    pub trace_range: f32,
}

impl Default for WeaponTuning {
    fn default() -> Self {
        Self {
            base_damage: WEAPON_BASE_DAMAGE,
            time_between_shots: 60.0 / WEAPON_FIRE_RATE,
            vulnerable_multiplier: VULNERABLE_DAMAGE_MULTIPLIER,
            trace_range: WEAPON_TRACE_RANGE,
        }
    }
}

/// Spread carried across shots. Host-only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BulletSpread {
    pub current: f32,
    /// Floor, equal to the initial spread.
    pub min: f32,
    pub max: f32,
    pub increase_rate: f32,
    pub decrease_rate: f32,
    pub cool_down_time: f32,
}

impl Default for BulletSpread {
    fn default() -> Self {
        Self {
            current: INITIAL_BULLET_SPREAD,
            min: INITIAL_BULLET_SPREAD,
            max: MAX_BULLET_SPREAD,
            increase_rate: BULLET_SPREAD_INCREASE_RATE,
            decrease_rate: BULLET_SPREAD_DECREASE_RATE,
            cool_down_time: BULLET_SPREAD_COOL_DOWN_TIME,
        }
    }
}

/// Resolved end of the last authoritative shot, replayed cosmetically by
/// observers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HitTrace {
    pub end_point: Vec3,
    pub surface: SurfaceKind,
    /// Bumped every shot so identical consecutive shots still replicate.
    pub sequence: u32,
}

/// What a powerup does to the actor that picked it up.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PowerupEffect {
    /// Heal the target every tick.
    Heal { per_tick: f32 },
    /// Scale the target's movement speed while active.
    SpeedBoost { multiplier: f32 },
}

/// Blueprint a pickup spawns powerups from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerupSpec {
    /// Seconds between ticks; zero applies a single tick on activation.
    pub tick_interval: f64,
    pub total_ticks: u32,
    pub effect: PowerupEffect,
}

/// Runtime state of a spawned powerup.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerupSession {
    pub tick_interval: f64,
    pub total_ticks: u32,
    pub ticks_processed: u32,
    pub is_active: bool,
    /// Powerups are single use; set on the first activation.
    pub activated: bool,
    pub effect: PowerupEffect,
}

impl PowerupSession {
    pub fn from_spec(spec: &PowerupSpec) -> Self {
        Self {
            tick_interval: spec.tick_interval.max(0.0),
            total_ticks: spec.total_ticks,
            ticks_processed: 0,
            is_active: false,
            activated: false,
            effect: spec.effect,
        }
    }
}

/// Pursuit state of a tracker bot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackerState {
    pub next_path_point: Vec3,
    pub exploded: bool,
    pub self_destruct_started: bool,
}

impl TrackerState {
    pub fn new(position: Vec3) -> Self {
        Self {
            next_path_point: position,
            exploded: false,
            self_destruct_started: false,
        }
    }
}
