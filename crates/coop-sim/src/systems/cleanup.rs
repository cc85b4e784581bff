//! Cleanup system: removes actors whose lifespan ran out.

use hecs::{Entity, World};

use coop_core::components::Lifespan;
use coop_core::constants::TIME_EPSILON;
use coop_core::types::NetId;

use crate::actors::Replicated;

/// Despawn every entity whose `Lifespan` expired by `now`. Returns the
/// replicated ids that went away so their listeners can be dropped.
/// Uses a pre-allocated buffer to avoid per-tick allocation.
pub fn run(world: &mut World, despawn_buffer: &mut Vec<Entity>, now: f64) -> Vec<NetId> {
    despawn_buffer.clear();

    for (entity, lifespan) in world.query_mut::<&Lifespan>() {
        if now + TIME_EPSILON >= lifespan.expires_at {
            despawn_buffer.push(entity);
        }
    }

    let mut despawned = Vec::new();
    for entity in despawn_buffer.drain(..) {
        if let Ok(replicated) = world.get::<&Replicated>(entity) {
            despawned.push(replicated.net_id);
        }
        let _ = world.despawn(entity);
    }
    despawned
}
