//! Tracker bot: pursuit, proximity countdown and self destruct.
//!
//! Decisions come from `coop_tracker_ai`; this module gathers their inputs
//! from the world and applies the results.

use hecs::Entity;
use log::{debug, info};

use coop_core::components::{
    Collider, Combatant, Lifespan, TrackerState, Transform, TriggerSphere, Velocity,
};
use coop_core::constants::TRACKER_DEBRIS_LIFESPAN;
use coop_core::enums::{DamageKind, TimerKey};
use coop_core::events::{CosmeticCue, GameEvent};
use coop_tracker_ai::fsm::{self, DamageResponse, Steering, SteeringContext, TriggerResponse};
use coop_tracker_ai::pursuit::{self, Candidate};

use crate::actors::{self, Pickup};
use crate::engine::MatchSession;
use crate::health::DamageEvent;

impl MatchSession {
    /// Pick the nearest hostile and ask navigation for a way there.
    pub fn refresh_path(&mut self, bot: Entity) {
        let Ok(origin) = self.world.get::<&Transform>(bot).map(|t| t.position) else {
            return;
        };

        let others: Vec<(Entity, Candidate)> = self
            .world
            .query::<(&actors::Replicated, &Transform, &Combatant)>()
            .iter()
            .filter(|(entity, _)| *entity != bot)
            .map(|(entity, (replicated, transform, combatant))| {
                (
                    entity,
                    Candidate {
                        id: replicated.net_id,
                        position: transform.position,
                        health: combatant.current_health,
                        friendly: false,
                    },
                )
            })
            .collect();
        let mut candidates: Vec<Candidate> = others
            .into_iter()
            .map(|(entity, mut candidate)| {
                candidate.friendly = self.is_friendly(Some(bot), Some(entity));
                candidate
            })
            .collect();
        candidates.sort_by_key(|c| c.id);

        let next_point = match pursuit::select_target(origin, &candidates) {
            Some(target) => {
                let path = self
                    .collab
                    .navigation
                    .find_path(&self.world, origin, target.position);
                let refresh = self.config.tracker.path_refresh_secs;
                self.clear_timer(bot, TimerKey::PathRefresh);
                self.set_timer(bot, TimerKey::PathRefresh, refresh, None);
                pursuit::next_path_point(path.as_deref(), origin)
            }
            None => origin,
        };

        if let Ok(mut state) = self.world.get::<&mut TrackerState>(bot) {
            state.next_path_point = next_point;
        }
    }

    /// Steering step for every tracker bot.
    pub(crate) fn steer_trackers(&mut self) {
        let bots: Vec<(Entity, SteeringContext)> = self
            .world
            .query::<(&Transform, &TrackerState)>()
            .iter()
            .map(|(entity, (transform, state))| {
                (
                    entity,
                    SteeringContext {
                        position: transform.position,
                        state: *state,
                    },
                )
            })
            .collect();

        let dt = self.time.dt();
        for (bot, ctx) in bots {
            match fsm::steer(&ctx, &self.config.tracker) {
                Steering::Idle => {}
                Steering::RefreshPath => self.refresh_path(bot),
                Steering::Push(force) => self.collab.motor.add_force(&mut self.world, bot, force, dt),
            }
        }
    }

    /// Begin-overlap on the proximity trigger.
    pub(crate) fn on_tracker_overlap(&mut self, bot: Entity, other: Entity) {
        let Ok(state) = self.world.get::<&TrackerState>(bot).map(|s| *s) else {
            return;
        };
        let other_is_player = actors::is_player_pawn(&self.world, other);
        if fsm::on_trigger_overlap(&state, other_is_player) != TriggerResponse::StartCountdown {
            return;
        }

        if let Ok(mut state) = self.world.get::<&mut TrackerState>(bot) {
            state.self_destruct_started = true;
        }
        let interval = self.config.tracker.self_damage_interval;
        self.set_timer(bot, TimerKey::SelfDestruct, 0.0, Some(interval));
        if let Some(actor) = self.net_id(bot) {
            debug!("tracker {actor} starting self destruct");
            self.play(CosmeticCue::SelfDestructWarning { actor });
        }
    }

    /// One pulse of the countdown.
    pub(crate) fn self_damage_tick(&mut self, bot: Entity) {
        let amount = self.config.tracker.self_damage;
        self.apply_damage(
            bot,
            DamageEvent {
                amount,
                instigator: None,
                causer: Some(bot),
                kind: DamageKind::SelfDestruct,
            },
        );
    }

    /// Reaction to the bot's own health changing.
    pub(crate) fn on_tracker_health_changed(&mut self, bot: Entity, health: f32) {
        let Ok(state) = self.world.get::<&TrackerState>(bot).map(|s| *s) else {
            return;
        };
        if let Some(actor) = self.net_id(bot) {
            self.play(CosmeticCue::DamagePulse { actor });
        }
        if fsm::on_health_changed(&state, health) == DamageResponse::PulseAndExplode {
            self.self_destruct(bot);
        }
    }

    /// Blow up once: radial damage around the bot, then linger as debris.
    pub fn self_destruct(&mut self, bot: Entity) {
        let position = match self.world.query_one_mut::<(&mut TrackerState, &Transform)>(bot) {
            Ok((state, transform)) if !state.exploded => {
                state.exploded = true;
                transform.position
            }
            _ => return,
        };

        if let Some(actor) = self.net_id(bot) {
            info!("tracker {actor} exploded at {position}");
            self.events.push(GameEvent::Exploded { bot: actor });
        }
        self.play(CosmeticCue::Explosion { at: position });
        if let Ok(mut velocity) = self.world.get::<&mut Velocity>(bot) {
            velocity.0 = glam::Vec3::ZERO;
        }

        let tuning = self.config.tracker;
        self.apply_radial_damage(
            position,
            tuning.explosion_radius,
            tuning.explosion_damage,
            &[bot],
            None,
            Some(bot),
            DamageKind::Explosion,
        );

        self.clear_timer(bot, TimerKey::SelfDestruct);
        // Debris neither blocks traces nor triggers.
        let _ = self.world.remove_one::<Collider>(bot);
        let _ = self.world.remove_one::<TriggerSphere>(bot);
        let expires_at = self.now + TRACKER_DEBRIS_LIFESPAN;
        let _ = self.world.insert_one(bot, Lifespan { expires_at });
    }

    /// Route a begin-overlap edge to whatever owns the trigger.
    pub(crate) fn on_begin_overlap(&mut self, trigger: Entity, other: Entity) {
        if self.world.get::<&TrackerState>(trigger).is_ok() {
            self.on_tracker_overlap(trigger, other);
        } else if self.world.get::<&Pickup>(trigger).is_ok()
            && self.world.get::<&Combatant>(other).is_ok()
        {
            self.on_pickup_overlap(trigger, other);
        }
    }
}
