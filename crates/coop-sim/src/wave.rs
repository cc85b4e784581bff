//! Wave/match state machine.
//!
//! Host only. Drives spawn cadence through the match timer table, checks
//! for a cleared wave and for a wiped team after every step, and ends in
//! `GameOver`, which no transition leaves.

use log::{debug, info, warn};

use coop_core::components::{Bot, Combatant};
use coop_core::enums::{TimerKey, WaveState};
use coop_core::events::{ChangeEvent, GameEvent};

use crate::actors::PlayerController;
use crate::engine::{CommandError, MatchSession};
use crate::world_setup;

/// Bots in wave `wave_count`.
pub fn bots_for_wave(wave_count: u32, factor: u32) -> u32 {
    factor.saturating_mul(wave_count)
}

impl MatchSession {
    /// Begin the wave cycle.
    pub fn start_match(&mut self) -> Result<(), CommandError> {
        if self.wave.started {
            return Err(CommandError::AlreadyStarted);
        }
        self.wave.started = true;
        info!("match started");
        self.prepare_for_next_wave();
        Ok(())
    }

    /// Arm the countdown to the next wave.
    pub fn prepare_for_next_wave(&mut self) {
        if self.wave.state.is_terminal() {
            return;
        }
        let delay = self.config.waves.time_between_waves;
        self.wave
            .timers
            .set(TimerKey::NextWaveStart, self.now, delay, None);
        self.set_wave_state(WaveState::WaitingToStart);
    }

    /// Open a wave: bump the counter, size it and start spawning.
    pub fn start_wave(&mut self) {
        if self.wave.state.is_terminal() {
            return;
        }
        let counters = &mut self.wave.counters;
        counters.wave_count += 1;
        counters.bots_remaining_to_spawn =
            bots_for_wave(counters.wave_count, self.config.waves.bots_per_wave_factor);
        info!(
            "wave {} started with {} bots",
            counters.wave_count, counters.bots_remaining_to_spawn
        );

        let interval = self.config.waves.bot_spawn_interval;
        self.wave
            .timers
            .set(TimerKey::BotSpawner, self.now, 0.0, Some(interval));
        self.set_wave_state(WaveState::WaveInProgress);
    }

    /// One spawner tick: one bot, and close the wave once all are out.
    pub fn spawn_tick(&mut self) {
        if self.wave.state.is_terminal() {
            return;
        }
        self.spawn_bot();
        let remaining = &mut self.wave.counters.bots_remaining_to_spawn;
        *remaining = remaining.saturating_sub(1);
        if *remaining == 0 {
            self.end_wave();
        }
    }

    /// Stop spawning and wait for the wave's bots to die.
    pub fn end_wave(&mut self) {
        self.wave.timers.clear(TimerKey::BotSpawner);
        self.set_wave_state(WaveState::WaitingToComplete);
    }

    /// Spawn one tracker bot where the spawn collaborator says.
    pub fn spawn_bot(&mut self) -> hecs::Entity {
        let wave = self.wave.counters.wave_count;
        let position = self.collab.spawner.spawn_location(wave);
        let net_id = self.allocate_net_id();
        let bot = world_setup::spawn_tracker(&mut self.world, net_id, position, &self.config);
        debug!("spawned bot {net_id} at {position}");
        self.events.push(GameEvent::BotSpawned { bot: net_id, wave });
        self.refresh_path(bot);
        bot
    }

    /// Mark the wave complete once nothing is left to spawn, no countdown is
    /// pending and every bot is dead.
    pub fn check_wave_state(&mut self) {
        if self.wave.counters.bots_remaining_to_spawn > 0
            || self.wave.timers.is_active(TimerKey::NextWaveStart)
        {
            return;
        }

        let any_bot_alive = self
            .world
            .query::<(&Bot, &Combatant)>()
            .iter()
            .any(|(_, (_, combatant))| combatant.current_health > 0.0);
        if any_bot_alive {
            return;
        }

        self.set_wave_state(WaveState::WaveComplete);
        self.prepare_for_next_wave();
    }

    /// End the match when no connected player controls a living body.
    pub fn check_any_player_alive(&mut self) {
        let any_alive = self
            .world
            .query::<&PlayerController>()
            .iter()
            .filter_map(|(_, pc)| pc.pawn)
            .any(|pawn| {
                self.world
                    .get::<&Combatant>(pawn)
                    .map(|c| c.current_health > 0.0)
                    .unwrap_or(false)
            });
        if !any_alive {
            self.game_over();
        }
    }

    /// Terminal transition: stop every match timer.
    pub fn game_over(&mut self) {
        self.wave.timers.clear(TimerKey::BotSpawner);
        self.wave.timers.clear(TimerKey::NextWaveStart);
        self.set_wave_state(WaveState::GameOver);
        warn!(
            "game over after {} waves: {} bots killed, {} players lost",
            self.wave.counters.wave_count, self.score.bots_killed, self.score.players_lost
        );
    }

    /// Per-step checks, wave completion first.
    pub(crate) fn run_match_checks(&mut self) {
        if !self.wave.started || self.wave.state.is_terminal() {
            return;
        }
        self.check_wave_state();
        self.check_any_player_alive();
    }

    /// Change the replicated wave state. Re-setting the current state and
    /// leaving `GameOver` are both ignored.
    pub(crate) fn set_wave_state(&mut self, new: WaveState) {
        let old = self.wave.state;
        if old == new || old.is_terminal() {
            return;
        }
        self.wave.state = new;
        info!("wave state {old:?} -> {new:?}");
        self.events.push(GameEvent::WaveStateChanged { new, old });
        self.notify(None, ChangeEvent::WaveState { new, old });
    }
}
