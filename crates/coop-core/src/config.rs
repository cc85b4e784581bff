//! Match configuration.
//!
//! Every field has a default taken from `constants`, so a config file only
//! needs to name what it overrides.

use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::components::{BulletSpread, PowerupEffect, PowerupSpec, WeaponTuning};
use crate::constants::*;
use crate::types::TeamId;

/// Errors raised while loading a config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config value `{field}`: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

/// Top-level configuration of a match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// RNG seed. Same seed and same inputs = same match.
    pub seed: u64,
    pub waves: WaveConfig,
    pub player_team: TeamId,
    pub bot_team: TeamId,
    pub character: CharacterConfig,
    pub weapon: WeaponConfig,
    pub tracker: TrackerConfig,
    pub pickups: Vec<PickupConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveConfig {
    pub time_between_waves: f64,
    pub bot_spawn_interval: f64,
    pub bots_per_wave_factor: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterConfig {
    pub max_health: f32,
    pub corpse_lifespan: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeaponConfig {
    pub base_damage: f32,
    /// Rounds per minute.
    pub fire_rate: f64,
    pub vulnerable_multiplier: f32,
    pub trace_range: f32,
    pub initial_spread: f32,
    pub max_spread: f32,
    pub spread_increase_rate: f32,
    pub spread_decrease_rate: f32,
    pub spread_cool_down_time: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub max_health: f32,
    pub path_refresh_secs: f64,
    pub min_distance_to_target: f32,
    pub force_magnitude: f32,
    pub trigger_radius: f32,
    pub self_damage_interval: f64,
    pub self_damage: f32,
    pub explosion_damage: f32,
    pub explosion_radius: f32,
}

/// A pickup placed in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PickupConfig {
    pub position: Vec3,
    /// `None` is allowed; the pickup then never produces anything.
    pub powerup: Option<PowerupSpec>,
    pub respawn_interval: f64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            waves: WaveConfig::default(),
            player_team: TeamId(PLAYER_TEAM),
            bot_team: TeamId(BOT_TEAM),
            character: CharacterConfig::default(),
            weapon: WeaponConfig::default(),
            tracker: TrackerConfig::default(),
            pickups: Vec::new(),
        }
    }
}

impl Default for WaveConfig {
    fn default() -> Self {
        Self {
            time_between_waves: TIME_BETWEEN_WAVES,
            bot_spawn_interval: BOT_SPAWN_INTERVAL,
            bots_per_wave_factor: BOTS_PER_WAVE_FACTOR,
        }
    }
}

impl Default for CharacterConfig {
    fn default() -> Self {
        Self {
            max_health: DEFAULT_MAX_HEALTH,
            corpse_lifespan: CHARACTER_CORPSE_LIFESPAN,
        }
    }
}

impl Default for WeaponConfig {
    fn default() -> Self {
        Self {
            base_damage: WEAPON_BASE_DAMAGE,
            fire_rate: WEAPON_FIRE_RATE,
            vulnerable_multiplier: VULNERABLE_DAMAGE_MULTIPLIER,
            trace_range: WEAPON_TRACE_RANGE,
            initial_spread: INITIAL_BULLET_SPREAD,
            max_spread: MAX_BULLET_SPREAD,
            spread_increase_rate: BULLET_SPREAD_INCREASE_RATE,
            spread_decrease_rate: BULLET_SPREAD_DECREASE_RATE,
            spread_cool_down_time: BULLET_SPREAD_COOL_DOWN_TIME,
        }
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_health: DEFAULT_MAX_HEALTH,
            path_refresh_secs: TRACKER_PATH_REFRESH_SECS,
            min_distance_to_target: TRACKER_MIN_DISTANCE_TO_TARGET,
            force_magnitude: TRACKER_FORCE_MAGNITUDE,
            trigger_radius: TRACKER_TRIGGER_RADIUS,
            self_damage_interval: TRACKER_SELF_DAMAGE_INTERVAL,
            self_damage: TRACKER_SELF_DAMAGE,
            explosion_damage: TRACKER_EXPLOSION_DAMAGE,
            explosion_radius: TRACKER_EXPLOSION_RADIUS,
        }
    }
}

impl Default for PickupConfig {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            powerup: Some(PowerupSpec {
                tick_interval: 0.5,
                total_ticks: 4,
                effect: PowerupEffect::Heal { per_tick: 10.0 },
            }),
            respawn_interval: PICKUP_RESPAWN_INTERVAL,
        }
    }
}

impl MatchConfig {
    /// Parse and validate a JSON config.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: MatchConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Reject values the simulation cannot run with. NaN fails every check.
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn invalid(field: &'static str, reason: &'static str) -> Result<(), ConfigError> {
            Err(ConfigError::Invalid { field, reason })
        }

        if !(self.waves.time_between_waves >= 0.0) {
            return invalid("waves.time_between_waves", "must not be negative");
        }
        if !(self.waves.bot_spawn_interval > 0.0) {
            return invalid("waves.bot_spawn_interval", "must be positive");
        }
        if !(self.character.max_health > 0.0) {
            return invalid("character.max_health", "must be positive");
        }
        if !(self.tracker.max_health > 0.0) {
            return invalid("tracker.max_health", "must be positive");
        }
        if !(self.weapon.fire_rate > 0.0 && self.weapon.fire_rate.is_finite()) {
            return invalid("weapon.fire_rate", "must be positive");
        }
        if !(self.weapon.initial_spread >= 0.0 && self.weapon.initial_spread <= self.weapon.max_spread) {
            return invalid("weapon.initial_spread", "must lie within [0, max_spread]");
        }
        if !(self.tracker.self_damage_interval > 0.0) {
            return invalid("tracker.self_damage_interval", "must be positive");
        }
        if self
            .pickups
            .iter()
            .filter_map(|p| p.powerup)
            .any(|spec| !(spec.tick_interval >= 0.0))
        {
            return invalid("pickups.powerup.tick_interval", "must not be negative");
        }
        Ok(())
    }

    /// Fixed weapon tuning derived from the weapon section.
    pub fn weapon_tuning(&self) -> WeaponTuning {
        WeaponTuning {
            base_damage: self.weapon.base_damage,
            time_between_shots: 60.0 / self.weapon.fire_rate,
            vulnerable_multiplier: self.weapon.vulnerable_multiplier,
            trace_range: self.weapon.trace_range,
        }
    }

    /// Initial spread state of a freshly spawned weapon.
    pub fn bullet_spread(&self) -> BulletSpread {
        BulletSpread {
            current: self.weapon.initial_spread,
            min: self.weapon.initial_spread,
            max: self.weapon.max_spread,
            increase_rate: self.weapon.spread_increase_rate,
            decrease_rate: self.weapon.spread_decrease_rate,
            cool_down_time: self.weapon.spread_cool_down_time,
        }
    }
}
