//! Health ledger and damage router.
//!
//! `apply_damage` is the single point deciding whether damage lands. The
//! friendly check, clamping and death edge all happen inside one call, and
//! the host never runs two calls at once.

use glam::Vec3;
use hecs::Entity;
use log::{debug, info};

use coop_core::components::{Bot, Combatant};
use coop_core::enums::DamageKind;
use coop_core::events::{ActorKilled, ChangeEvent, GameEvent, HealthChanged};
use coop_core::types::NetId;

use crate::actors::{self, Character, PlayerController};
use crate::engine::MatchSession;

/// One hit, consumed immediately.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageEvent {
    pub amount: f32,
    /// The controller responsible for the hit.
    pub instigator: Option<Entity>,
    /// The actor that dealt the hit.
    pub causer: Option<Entity>,
    pub kind: DamageKind,
}

/// Result of a damage call that landed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LedgerOutcome {
    pub health: f32,
    pub applied: f32,
    /// This call took the combatant to zero.
    pub killed: bool,
}

/// Subtract `amount` from the ledger. `None` when nothing changes.
pub fn damage_ledger(combatant: &mut Combatant, amount: f32) -> Option<LedgerOutcome> {
    if !(amount > 0.0) || combatant.is_dead {
        return None;
    }
    let old = combatant.current_health;
    let new = (old - amount).clamp(0.0, combatant.max_health);
    combatant.current_health = new;
    let killed = new <= 0.0;
    if killed {
        combatant.is_dead = true;
    }
    Some(LedgerOutcome {
        health: new,
        applied: old - new,
        killed,
    })
}

/// Add `amount` to the ledger, bounded by max health. `None` when nothing
/// changes.
pub fn heal_ledger(combatant: &mut Combatant, amount: f32) -> Option<f32> {
    if !(amount > 0.0) || combatant.current_health <= 0.0 || combatant.is_dead {
        return None;
    }
    combatant.current_health = (combatant.current_health + amount).min(combatant.max_health);
    Some(combatant.current_health)
}

impl MatchSession {
    /// Route one hit to `target`. Returns the health actually removed.
    pub fn apply_damage(&mut self, target: Entity, damage: DamageEvent) -> f32 {
        if !(damage.amount > 0.0) {
            return 0.0;
        }
        if let Some(causer) = damage.causer {
            if causer != target && self.is_friendly(Some(target), Some(causer)) {
                debug!("friendly fire suppressed on {:?}", self.net_id(target));
                return 0.0;
            }
        }
        let Some(actor) = self.net_id(target) else {
            return 0.0;
        };

        let outcome = match self.world.get::<&mut Combatant>(target) {
            Ok(mut combatant) => damage_ledger(&mut combatant, damage.amount),
            Err(_) => None,
        };
        let Some(outcome) = outcome else {
            return 0.0;
        };

        let instigator = damage.instigator.and_then(|e| self.net_id(e));
        let causer = damage.causer.and_then(|e| self.net_id(e));
        debug!(
            "{actor} took {} ({:?}), health {}",
            outcome.applied, damage.kind, outcome.health
        );
        self.notify(
            Some(target),
            ChangeEvent::Health(HealthChanged {
                actor,
                health: outcome.health,
                delta: -damage.amount,
                kind: Some(damage.kind),
                instigator,
                causer,
            }),
        );

        if outcome.killed {
            self.on_actor_killed(target, actor, damage.causer, damage.instigator);
        }
        outcome.applied
    }

    /// Restore health on `target`. Dead actors stay dead.
    pub fn heal(&mut self, target: Entity, amount: f32) {
        let Some(actor) = self.net_id(target) else {
            return;
        };
        let health = match self.world.get::<&mut Combatant>(target) {
            Ok(mut combatant) => heal_ledger(&mut combatant, amount),
            Err(_) => None,
        };
        let Some(health) = health else {
            return;
        };
        self.notify(
            Some(target),
            ChangeEvent::Health(HealthChanged {
                actor,
                health,
                delta: amount,
                kind: None,
                instigator: None,
                causer: None,
            }),
        );
    }

    /// Two actors are friendly when they share a team. An actor that is
    /// missing or has no health ledger counts as friendly.
    pub fn is_friendly(&self, a: Option<Entity>, b: Option<Entity>) -> bool {
        let (Some(a), Some(b)) = (a, b) else {
            return true;
        };
        let team_of = |e: Entity| self.world.get::<&Combatant>(e).ok().map(|c| c.team);
        match (team_of(a), team_of(b)) {
            (Some(team_a), Some(team_b)) => team_a == team_b,
            _ => true,
        }
    }

    /// Full damage to every actor overlapping the sphere. Returns how many
    /// actors lost health.
    #[allow(clippy::too_many_arguments)]
    pub fn apply_radial_damage(
        &mut self,
        center: Vec3,
        radius: f32,
        amount: f32,
        ignored: &[Entity],
        instigator: Option<Entity>,
        causer: Option<Entity>,
        kind: DamageKind,
    ) -> usize {
        let victims = self
            .collab
            .hit_test
            .overlap_sphere(&self.world, center, radius, ignored);
        let damage = DamageEvent {
            amount,
            instigator,
            causer,
            kind,
        };
        victims
            .into_iter()
            .filter(|victim| self.apply_damage(*victim, damage) > 0.0)
            .count()
    }

    /// Kill bookkeeping at the match level.
    fn on_actor_killed(
        &mut self,
        victim: Entity,
        victim_id: NetId,
        killer: Option<Entity>,
        killer_controller: Option<Entity>,
    ) {
        if let Some(controller) = killer_controller {
            if let Ok(mut pc) = self.world.get::<&mut PlayerController>(controller) {
                pc.kills += 1;
            }
        }
        if self.world.get::<&Bot>(victim).is_ok() {
            self.score.bots_killed += 1;
        } else if self.world.get::<&Character>(victim).is_ok() {
            self.score.players_lost += 1;
        }

        let killed = ActorKilled {
            victim: victim_id,
            killer: killer.and_then(|e| actors::net_id_of(&self.world, e)),
            killer_controller: killer_controller.and_then(|e| actors::net_id_of(&self.world, e)),
        };
        info!(
            "{} killed by {:?} (controller {:?})",
            killed.victim, killed.killer, killed.killer_controller
        );
        self.events.push(GameEvent::ActorKilled(killed));
    }
}
