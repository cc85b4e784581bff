//! Powerup timer engine and pickup containers.

use hecs::Entity;
use log::{debug, info, warn};

use coop_core::components::{Lifespan, Movement, PowerupEffect, PowerupSession, Transform};
use coop_core::enums::TimerKey;
use coop_core::events::{ChangeEvent, CosmeticCue, GameEvent};

use crate::actors::{Pickup, Powerup};
use crate::engine::MatchSession;
use crate::world_setup;

/// Count one tick. Returns whether the session has now run out.
pub fn advance_session(session: &mut PowerupSession) -> bool {
    session.ticks_processed = (session.ticks_processed + 1).min(session.total_ticks);
    session.ticks_processed >= session.total_ticks
}

impl MatchSession {
    /// Start a powerup on `target`. Single use; absent targets are ignored.
    pub fn activate_powerup(&mut self, powerup: Entity, target: Option<Entity>) {
        let Some(target) = target else {
            return;
        };
        let session = match self.world.get::<&mut Powerup>(powerup) {
            Ok(mut p) if !p.session.activated => {
                p.session.activated = true;
                p.session.is_active = true;
                p.target = Some(target);
                p.session
            }
            _ => return,
        };

        // on_activated
        if let PowerupEffect::SpeedBoost { multiplier } = session.effect {
            if let Ok(mut movement) = self.world.get::<&mut Movement>(target) {
                movement.speed_multiplier = multiplier;
            }
        }
        self.announce_powerup(powerup, true);
        if let (Some(powerup_id), Some(target_id)) = (self.net_id(powerup), self.net_id(target)) {
            info!("powerup {powerup_id} activated on {target_id}");
            self.events.push(GameEvent::PowerupActivated {
                powerup: powerup_id,
                target: target_id,
            });
        }

        if session.tick_interval > 0.0 {
            self.set_timer(
                powerup,
                TimerKey::PowerupTick,
                session.tick_interval,
                Some(session.tick_interval),
            );
        } else {
            self.tick_powerup(powerup);
        }
    }

    /// One powerup tick; expires the powerup on the last one.
    pub fn tick_powerup(&mut self, powerup: Entity) {
        let ticked = match self.world.get::<&mut Powerup>(powerup) {
            Ok(mut p) if p.session.is_active => {
                let expired = advance_session(&mut p.session);
                Some((p.session.effect, p.target, expired))
            }
            _ => None,
        };
        let Some((effect, target, expired)) = ticked else {
            return;
        };

        // on_ticked
        if let (PowerupEffect::Heal { per_tick }, Some(target)) = (effect, target) {
            self.heal(target, per_tick);
        }
        if expired {
            self.expire_powerup(powerup);
        }
    }

    fn expire_powerup(&mut self, powerup: Entity) {
        let Ok((effect, target)) = self.world.get::<&mut Powerup>(powerup).map(|mut p| {
            p.session.is_active = false;
            (p.session.effect, p.target)
        }) else {
            return;
        };

        // on_expired
        if let (PowerupEffect::SpeedBoost { .. }, Some(target)) = (effect, target) {
            if let Ok(mut movement) = self.world.get::<&mut Movement>(target) {
                movement.speed_multiplier = 1.0;
            }
        }
        self.clear_timer(powerup, TimerKey::PowerupTick);
        self.announce_powerup(powerup, false);
        if let Some(powerup_id) = self.net_id(powerup) {
            debug!("powerup {powerup_id} expired");
            self.events.push(GameEvent::PowerupExpired {
                powerup: powerup_id,
            });
        }
        let expires_at = self.now;
        let _ = self.world.insert_one(powerup, Lifespan { expires_at });
    }

    fn announce_powerup(&mut self, powerup: Entity, active: bool) {
        let Some(powerup_id) = self.net_id(powerup) else {
            return;
        };
        self.play(CosmeticCue::PowerupState {
            powerup: powerup_id,
            active,
        });
        self.notify(
            Some(powerup),
            ChangeEvent::PowerupActive {
                powerup: powerup_id,
                active,
            },
        );
    }

    /// Put a fresh powerup in a pickup. Without a configured powerup the
    /// pickup stays empty.
    pub fn respawn_pickup(&mut self, pickup: Entity) {
        let Ok((spec, position)) = self
            .world
            .query_one_mut::<(&Pickup, &Transform)>(pickup)
            .map(|(p, t)| (p.powerup, t.position))
        else {
            return;
        };
        let pickup_id = self.net_id(pickup);
        let Some(spec) = spec else {
            warn!("pickup {pickup_id:?} has no powerup configured; nothing to respawn");
            return;
        };

        let net_id = self.allocate_net_id();
        let instance = world_setup::spawn_powerup(&mut self.world, net_id, position, &spec);
        if let Ok(mut p) = self.world.get::<&mut Pickup>(pickup) {
            p.instance = Some(instance);
        }
        if let Some(pickup_id) = pickup_id {
            self.events.push(GameEvent::PickupRespawned {
                pickup: pickup_id,
                powerup: net_id,
            });
        }
    }

    /// Hand the held powerup to whoever touched the pickup.
    pub(crate) fn on_pickup_overlap(&mut self, pickup: Entity, other: Entity) {
        let (instance, respawn_interval) = match self.world.get::<&mut Pickup>(pickup) {
            Ok(mut p) => match p.instance.take() {
                Some(instance) => (instance, p.respawn_interval),
                None => return,
            },
            Err(_) => return,
        };
        self.activate_powerup(instance, Some(other));
        self.set_timer(pickup, TimerKey::PickupRespawn, respawn_interval, None);
    }
}
