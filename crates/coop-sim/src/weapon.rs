//! Weapon fire session: cool-down, spread and authoritative hit resolution.

use glam::Vec3;
use hecs::Entity;
use log::{debug, trace, warn};
use rand::Rng;

use coop_core::components::{BulletSpread, HitTrace, Transform};
use coop_core::enums::{DamageKind, SurfaceKind, TimerKey};
use coop_core::events::{ChangeEvent, CosmeticCue};
use coop_core::types::{NetId, PlayerId};

use crate::actors::{self, PlayerController, Weapon};
use crate::engine::{CommandError, MatchSession};
use crate::health::DamageEvent;

/// Update spread for a shot fired `since_last_shot` seconds after the
/// previous one. Firing inside the cool-down window grows the spread,
/// idling past it shrinks it; the result stays within `[min, max]`.
pub fn update_spread(spread: &mut BulletSpread, since_last_shot: f32) {
    let rate = if since_last_shot > spread.cool_down_time {
        spread.decrease_rate
    } else {
        spread.increase_rate
    };
    let next = spread.current + (spread.cool_down_time - since_last_shot) * rate * spread.min;
    spread.current = next.clamp(spread.min, spread.max);
}

/// Delay before the first shot of a trigger pull so the fire rate holds
/// across release and re-press.
pub fn first_shot_delay(last_fire_time: f64, time_between_shots: f64, now: f64) -> f64 {
    (last_fire_time + time_between_shots - now).max(0.0)
}

impl MatchSession {
    /// Hold the trigger.
    pub fn start_firing(&mut self, weapon: Entity) {
        let Ok(w) = self.world.get::<&Weapon>(weapon).map(|w| *w) else {
            return;
        };
        let delay = first_shot_delay(w.last_fire_time, w.tuning.time_between_shots, self.now);
        self.set_timer(
            weapon,
            TimerKey::FireRepeat,
            delay,
            Some(w.tuning.time_between_shots),
        );
    }

    /// Release the trigger. Idempotent.
    pub fn stop_firing(&mut self, weapon: Entity) {
        self.clear_timer(weapon, TimerKey::FireRepeat);
    }

    /// Fire one authoritative shot.
    pub fn fire(&mut self, weapon: Entity) {
        let Ok(mut w) = self.world.get::<&Weapon>(weapon).map(|w| *w) else {
            return;
        };
        let Some(owner) = w.owner else {
            debug!("weapon without owner cannot fire");
            return;
        };
        let Ok(view) = self.world.get::<&Transform>(owner).map(|t| *t) else {
            return;
        };

        let since = (self.now - w.last_fire_time) as f32;
        update_spread(&mut w.spread, since);

        let spread = w.spread.current;
        let mut direction = view.aim.try_normalize().unwrap_or(Vec3::X);
        if spread > 0.0 {
            direction.y += self.rng.gen_range(-spread..=spread);
            direction.z += self.rng.gen_range(-spread..=spread);
        }
        let direction = direction.try_normalize().unwrap_or(Vec3::X);
        let trace_end = view.eye + direction * w.tuning.trace_range;

        let hit = self
            .collab
            .hit_test
            .line_trace(&self.world, view.eye, trace_end, &[owner, weapon]);

        let weapon_id = self.net_id(weapon);
        let (end_point, surface) = match hit {
            Some(hit) => {
                if let Some(victim) = hit.actor {
                    let mut damage = w.tuning.base_damage;
                    if hit.surface == SurfaceKind::FleshVulnerable {
                        damage *= w.tuning.vulnerable_multiplier;
                    }
                    let instigator = actors::controller_of(&self.world, owner);
                    self.apply_damage(
                        victim,
                        DamageEvent {
                            amount: damage,
                            instigator,
                            causer: Some(owner),
                            kind: DamageKind::Bullet,
                        },
                    );
                }
                self.play(CosmeticCue::Impact {
                    surface: hit.surface,
                    point: hit.point,
                });
                (hit.point, hit.surface)
            }
            None => (trace_end, SurfaceKind::Default),
        };

        if let Some(weapon_id) = weapon_id {
            self.play(CosmeticCue::MuzzleFlash { weapon: weapon_id });
            self.play(CosmeticCue::Trail {
                weapon: weapon_id,
                end: end_point,
            });
        }
        if let Some(controller) = actors::controller_of(&self.world, owner) {
            let player = self
                .world
                .get::<&PlayerController>(controller)
                .map(|pc| pc.player)
                .ok();
            if let Some(player) = player {
                self.play(CosmeticCue::CameraShake { player });
            }
        }

        let sequence = w.hit_trace.map_or(0, |t| t.sequence).wrapping_add(1);
        let trace = HitTrace {
            end_point,
            surface,
            sequence,
        };
        trace!("shot {sequence} ended at {end_point} on {surface:?}, spread {spread}");

        // Damage may have reacted on this weapon (owner death stops firing),
        // so write back only the fields a shot owns.
        if let Ok(mut stored) = self.world.get::<&mut Weapon>(weapon) {
            stored.spread = w.spread;
            stored.last_fire_time = self.now;
            stored.hit_trace = Some(trace);
        }
        if let Some(weapon_id) = weapon_id {
            self.notify(
                Some(weapon),
                ChangeEvent::HitTrace {
                    weapon: weapon_id,
                    trace,
                },
            );
        }
    }

    /// A fire request forwarded by an observer. Only the weapon held by the
    /// requesting player's pawn may fire.
    pub fn handle_fire_request(&mut self, player: PlayerId, weapon: NetId) -> Result<(), CommandError> {
        let pawn = self
            .player_pawn(player)
            .ok_or(CommandError::NoPawn(player))?;
        let entity = self
            .find_actor(weapon)
            .ok_or(CommandError::UnknownActor(weapon))?;
        let owner = self.world.get::<&Weapon>(entity).ok().and_then(|w| w.owner);
        if owner != Some(pawn) {
            warn!("{player} asked to fire {weapon} which they do not hold");
            return Err(CommandError::NotWeaponOwner { player, weapon });
        }
        self.fire(entity);
        Ok(())
    }
}
