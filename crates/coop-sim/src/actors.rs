//! Components that reference other entities.
//!
//! These live here rather than in `coop-core` because they hold
//! `hecs::Entity` handles. Only `NetId`s ever leave the host.

use hecs::{Entity, World};
use serde::{Deserialize, Serialize};

use coop_core::components::{BulletSpread, HitTrace, PowerupSession, PowerupSpec, WeaponTuning};
use coop_core::replication::ActorKind;
use coop_core::types::{NetId, PlayerId};

/// Replicated identity. Every actor the host spawns carries one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Replicated {
    pub net_id: NetId,
    pub kind: ActorKind,
}

/// A connected player session.
#[derive(Debug, Clone, Copy)]
pub struct PlayerController {
    pub player: PlayerId,
    /// The body this player currently controls.
    pub pawn: Option<Entity>,
    pub kills: u32,
}

/// A player body.
#[derive(Debug, Clone, Copy, Default)]
pub struct Character {
    /// Replicated death flag.
    pub died: bool,
    pub weapon: Option<Entity>,
}

/// A hitscan weapon held by a pawn.
#[derive(Debug, Clone, Copy)]
pub struct Weapon {
    pub owner: Option<Entity>,
    pub tuning: WeaponTuning,
    pub last_fire_time: f64,
    pub spread: BulletSpread,
    /// Last authoritative shot. `None` until the first shot.
    pub hit_trace: Option<HitTrace>,
}

/// Container that hands out powerups on overlap and respawns them.
#[derive(Debug, Clone, Copy)]
pub struct Pickup {
    pub powerup: Option<PowerupSpec>,
    /// The powerup currently sitting in the container.
    pub instance: Option<Entity>,
    pub respawn_interval: f64,
}

/// A spawned powerup instance.
#[derive(Debug, Clone, Copy)]
pub struct Powerup {
    pub session: PowerupSession,
    pub target: Option<Entity>,
}

/// Internal handlers run after an actor's own health changes, before the
/// kill reaches the match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reaction {
    /// Character death: detach from controller, stop firing, linger.
    CharacterDeath,
    /// Tracker bot: damage pulse, self destruct at zero health.
    TrackerPulse,
}

/// Ordered reaction list of an actor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reactions(pub Vec<Reaction>);

/// Find the entity carrying a replicated id.
pub fn find_actor(world: &World, net_id: NetId) -> Option<Entity> {
    world
        .query::<&Replicated>()
        .iter()
        .find(|(_, replicated)| replicated.net_id == net_id)
        .map(|(entity, _)| entity)
}

/// The replicated id of an entity, if it still exists.
pub fn net_id_of(world: &World, entity: Entity) -> Option<NetId> {
    world.get::<&Replicated>(entity).ok().map(|r| r.net_id)
}

/// The controller currently possessing `pawn`.
pub fn controller_of(world: &World, pawn: Entity) -> Option<Entity> {
    world
        .query::<&PlayerController>()
        .iter()
        .find(|(_, controller)| controller.pawn == Some(pawn))
        .map(|(entity, _)| entity)
}

/// Whether `pawn` is controlled by a connected player.
pub fn is_player_pawn(world: &World, pawn: Entity) -> bool {
    controller_of(world, pawn).is_some()
}
