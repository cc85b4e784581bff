//! Tracker bot behavior state machine.
//!
//! Pure functions that decide what a tracker bot does next given its current
//! state and situation. Operates on plain data with no ECS dependency. The
//! sim applies the resulting decisions.

use glam::Vec3;

use coop_core::components::TrackerState;
use coop_core::config::TrackerConfig;

/// Coarse phase derived from the tracker's flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerPhase {
    /// Chasing the nearest hostile.
    Pursuing,
    /// Self-damage countdown running; still chasing.
    CountingDown,
    /// Blown up. Terminal.
    Exploded,
}

/// Input to the steering step for a single bot.
pub struct SteeringContext {
    pub position: Vec3,
    pub state: TrackerState,
}

/// What the bot should do this step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Steering {
    /// Exploded bots stay put.
    Idle,
    /// Current path point reached; ask for a fresh one.
    RefreshPath,
    /// Push toward the current path point with this force.
    Push(Vec3),
}

/// Reaction to something entering the proximity trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerResponse {
    Ignore,
    StartCountdown,
}

/// Reaction to a health change on the bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageResponse {
    /// Flash the damage pulse only.
    Pulse,
    /// Flash and blow up.
    PulseAndExplode,
}

pub fn phase(state: &TrackerState) -> TrackerPhase {
    if state.exploded {
        TrackerPhase::Exploded
    } else if state.self_destruct_started {
        TrackerPhase::CountingDown
    } else {
        TrackerPhase::Pursuing
    }
}

/// Evaluate steering for one bot.
pub fn steer(ctx: &SteeringContext, tuning: &TrackerConfig) -> Steering {
    if phase(&ctx.state) == TrackerPhase::Exploded {
        return Steering::Idle;
    }

    let to_target = ctx.state.next_path_point - ctx.position;
    if to_target.length() <= tuning.min_distance_to_target {
        return Steering::RefreshPath;
    }

    Steering::Push(to_target.normalize_or_zero() * tuning.force_magnitude)
}

/// Decide whether an overlapping actor starts the self-destruct countdown.
/// Only player-owned actors count, and only once.
pub fn on_trigger_overlap(state: &TrackerState, other_is_player: bool) -> TriggerResponse {
    if phase(state) != TrackerPhase::Pursuing || !other_is_player {
        return TriggerResponse::Ignore;
    }
    TriggerResponse::StartCountdown
}

/// Decide the reaction to a health change.
pub fn on_health_changed(state: &TrackerState, health: f32) -> DamageResponse {
    if health <= 0.0 && !state.exploded {
        DamageResponse::PulseAndExplode
    } else {
        DamageResponse::Pulse
    }
}
