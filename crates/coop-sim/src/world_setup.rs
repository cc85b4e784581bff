//! Entity spawn factories.
//!
//! Builds the component bundle of every actor kind the host spawns. Each
//! factory takes the replicated id the session allocated for it.

use glam::Vec3;
use hecs::{Entity, World};

use coop_core::components::*;
use coop_core::config::{MatchConfig, PickupConfig};
use coop_core::constants::*;
use coop_core::enums::SurfaceKind;
use coop_core::replication::ActorKind;
use coop_core::types::{NetId, PlayerId};

use crate::actors::*;
use crate::scheduler::Timers;

/// Spawn a player controller with no pawn yet.
pub fn spawn_controller(world: &mut World, net_id: NetId, player: PlayerId) -> Entity {
    world.spawn((
        Replicated {
            net_id,
            kind: ActorKind::PlayerController { player },
        },
        PlayerController {
            player,
            pawn: None,
            kills: 0,
        },
    ))
}

/// Spawn a player character on the player team.
pub fn spawn_character(
    world: &mut World,
    net_id: NetId,
    position: Vec3,
    config: &MatchConfig,
) -> Entity {
    let mut transform = Transform::at(position);
    transform.eye = position + Vec3::Z * CHARACTER_EYE_HEIGHT;

    world.spawn((
        Replicated {
            net_id,
            kind: ActorKind::Character,
        },
        Character::default(),
        Combatant::new(config.character.max_health, config.player_team),
        transform,
        Velocity::default(),
        Collider {
            radius: CHARACTER_RADIUS,
            surface: SurfaceKind::FleshDefault,
        },
        Movement::default(),
        Reactions(vec![Reaction::CharacterDeath]),
    ))
}

/// Spawn a weapon held by `owner`. The cool-down starts at `now`.
pub fn spawn_weapon(
    world: &mut World,
    net_id: NetId,
    owner: Entity,
    config: &MatchConfig,
    now: f64,
) -> Entity {
    let tuning = config.weapon_tuning();
    let owner_net_id = net_id_of(world, owner);

    world.spawn((
        Replicated {
            net_id,
            kind: ActorKind::Weapon {
                owner: owner_net_id,
                time_between_shots: tuning.time_between_shots,
            },
        },
        Weapon {
            owner: Some(owner),
            tuning,
            last_fire_time: now,
            spread: config.bullet_spread(),
            hit_trace: None,
        },
        Timers::default(),
    ))
}

/// Spawn a tracker bot on the bot team.
pub fn spawn_tracker(
    world: &mut World,
    net_id: NetId,
    position: Vec3,
    config: &MatchConfig,
) -> Entity {
    world.spawn((
        Replicated {
            net_id,
            kind: ActorKind::TrackerBot,
        },
        Bot,
        Combatant::new(config.tracker.max_health, config.bot_team),
        Transform::at(position),
        Velocity::default(),
        Collider {
            radius: TRACKER_RADIUS,
            surface: SurfaceKind::Default,
        },
        TriggerSphere::new(config.tracker.trigger_radius),
        TrackerState::new(position),
        Timers::default(),
        Reactions(vec![Reaction::TrackerPulse]),
    ))
}

/// Spawn an empty pickup container.
pub fn spawn_pickup(world: &mut World, net_id: NetId, pickup: &PickupConfig) -> Entity {
    world.spawn((
        Replicated {
            net_id,
            kind: ActorKind::Pickup,
        },
        Transform::at(pickup.position),
        TriggerSphere::new(PICKUP_RADIUS),
        Pickup {
            powerup: pickup.powerup,
            instance: None,
            respawn_interval: pickup.respawn_interval,
        },
        Timers::default(),
    ))
}

/// Spawn an inactive powerup instance.
pub fn spawn_powerup(world: &mut World, net_id: NetId, position: Vec3, spec: &PowerupSpec) -> Entity {
    world.spawn((
        Replicated {
            net_id,
            kind: ActorKind::Powerup,
        },
        Transform::at(position),
        Powerup {
            session: PowerupSession::from_spec(spec),
            target: None,
        },
        Timers::default(),
    ))
}
