//! Overlap system: detects begin-overlap edges of trigger spheres.
//!
//! A trigger overlaps an actor when the actor's collider sphere touches the
//! trigger sphere. Only actors that were not overlapping on the previous
//! pass produce an edge.

use hecs::{Entity, World};

use coop_core::components::{Collider, Transform, TriggerSphere};
use coop_core::types::NetId;

use crate::actors::Replicated;

/// Refresh every trigger's overlap set and return the new edges as
/// `(trigger, other)`, ordered by replicated id.
pub fn run(world: &mut World) -> Vec<(Entity, Entity)> {
    let bodies: Vec<(Entity, NetId, glam::Vec3, f32)> = world
        .query::<(&Replicated, &Transform, &Collider)>()
        .iter()
        .map(|(entity, (replicated, transform, collider))| {
            (entity, replicated.net_id, transform.position, collider.radius)
        })
        .collect();

    let mut edges: Vec<(NetId, NetId, Entity, Entity)> = Vec::new();
    for (trigger_entity, (replicated, transform, trigger)) in
        world.query_mut::<(&Replicated, &Transform, &mut TriggerSphere)>()
    {
        let mut now_overlapping: Vec<NetId> = Vec::new();
        for (other, other_id, position, radius) in &bodies {
            if *other == trigger_entity {
                continue;
            }
            if transform.position.distance(*position) > trigger.radius + radius {
                continue;
            }
            now_overlapping.push(*other_id);
            if !trigger.overlapping.contains(other_id) {
                edges.push((replicated.net_id, *other_id, trigger_entity, *other));
            }
        }
        now_overlapping.sort();
        trigger.overlapping = now_overlapping;
    }

    edges.sort_by_key(|(trigger, other, _, _)| (*trigger, *other));
    edges
        .into_iter()
        .map(|(_, _, trigger, other)| (trigger, other))
        .collect()
}
