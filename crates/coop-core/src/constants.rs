//! Simulation constants and tuning defaults.
//!
//! Every tunable here is also a `MatchConfig` default; the constants are the
//! values the match uses when no config file overrides them.

/// Host simulation tick rate (Hz).
pub const TICK_RATE: u32 = 30;

/// Seconds per tick.
pub const DT: f64 = 1.0 / TICK_RATE as f64;

/// Slack used when comparing timer due times against the session clock.
pub const TIME_EPSILON: f64 = 1e-9;

// --- Health ---

/// Max health of a freshly spawned combatant.
pub const DEFAULT_MAX_HEALTH: f32 = 100.0;

/// Team assigned to combatants that were never given one.
pub const DEFAULT_TEAM: u8 = 255;

/// Team of player characters.
pub const PLAYER_TEAM: u8 = 0;

/// Team of spawned bots.
pub const BOT_TEAM: u8 = DEFAULT_TEAM;

// --- Match / waves ---

/// Delay between the end of one wave and the start of the next (seconds).
pub const TIME_BETWEEN_WAVES: f64 = 2.0;

/// Interval between bot spawns while a wave is in progress (seconds).
pub const BOT_SPAWN_INTERVAL: f64 = 1.0;

/// Bots spawned per wave = factor * wave number.
pub const BOTS_PER_WAVE_FACTOR: u32 = 2;

/// How long a dead character lingers before removal (seconds).
pub const CHARACTER_CORPSE_LIFESPAN: f64 = 10.0;

// --- Weapon ---

/// Damage of a single body shot.
pub const WEAPON_BASE_DAMAGE: f32 = 20.0;

/// Rounds per minute.
pub const WEAPON_FIRE_RATE: f64 = 600.0;

/// Damage multiplier on a vulnerable surface.
pub const VULNERABLE_DAMAGE_MULTIPLIER: f32 = 4.0;

/// Hitscan trace length (world units).
pub const WEAPON_TRACE_RANGE: f32 = 10_000.0;

/// Spread floor; spread never drops below this.
pub const INITIAL_BULLET_SPREAD: f32 = 0.05;

/// Spread cap.
pub const MAX_BULLET_SPREAD: f32 = 0.1;

/// Growth rate applied when firing faster than the cool-down window.
pub const BULLET_SPREAD_INCREASE_RATE: f32 = 1.5;

/// Decay rate applied when idle longer than the cool-down window.
pub const BULLET_SPREAD_DECREASE_RATE: f32 = 3.0;

/// Window (seconds) separating "firing too fast" from "idle".
pub const BULLET_SPREAD_COOL_DOWN_TIME: f32 = 0.2;

// --- Tracker bot ---

/// Path refresh cadence (seconds).
pub const TRACKER_PATH_REFRESH_SECS: f64 = 5.0;

/// Distance at which the current path point counts as reached.
pub const TRACKER_MIN_DISTANCE_TO_TARGET: f32 = 100.0;

/// Magnitude of the steering force.
pub const TRACKER_FORCE_MAGNITUDE: f32 = 1000.0;

/// Radius of the proximity trigger that starts the self-destruct countdown.
pub const TRACKER_TRIGGER_RADIUS: f32 = 200.0;

/// Interval between self-damage pulses once the countdown started (seconds).
pub const TRACKER_SELF_DAMAGE_INTERVAL: f64 = 0.5;

/// Damage of each self-damage pulse.
pub const TRACKER_SELF_DAMAGE: f32 = 20.0;

/// Explosion damage applied to everything in range.
pub const TRACKER_EXPLOSION_DAMAGE: f32 = 100.0;

/// Explosion radius.
pub const TRACKER_EXPLOSION_RADIUS: f32 = 200.0;

/// Time an exploded bot lingers before removal (seconds).
pub const TRACKER_DEBRIS_LIFESPAN: f64 = 2.0;

// --- Pickups ---

/// Delay before a consumed pickup produces a fresh powerup (seconds).
pub const PICKUP_RESPAWN_INTERVAL: f64 = 5.0;

/// Overlap radius of a pickup.
pub const PICKUP_RADIUS: f32 = 75.0;

// --- Headless arena ---

/// Collision radius of a character capsule.
pub const CHARACTER_RADIUS: f32 = 42.0;

/// Collision radius of a tracker bot.
pub const TRACKER_RADIUS: f32 = 40.0;

/// Mass used to turn tracker steering force into acceleration.
pub const TRACKER_MASS: f32 = 10.0;

/// Tracker velocity cap.
pub const TRACKER_MAX_SPEED: f32 = 600.0;

/// Eye height above a character's position.
pub const CHARACTER_EYE_HEIGHT: f32 = 64.0;

/// Radius of the ring bots spawn on around the arena origin.
pub const BOT_SPAWN_RING_RADIUS: f32 = 2_000.0;
