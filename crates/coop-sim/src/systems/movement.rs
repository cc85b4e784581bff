//! Kinematic integration system.
//!
//! Updates position from velocity each tick: position += velocity * dt.
//! The eye follows the body for actors that do not report their own view.

use hecs::World;

use coop_core::components::{Movement, Transform, Velocity};

/// Run kinematic integration for all entities with Transform + Velocity.
pub fn run(world: &mut World, dt: f64) {
    let dt = dt as f32;
    for (_entity, (transform, vel, movement)) in
        world.query_mut::<(&mut Transform, &Velocity, Option<&Movement>)>()
    {
        if vel.0 == glam::Vec3::ZERO {
            continue;
        }
        let multiplier = movement.map_or(1.0, |m| m.speed_multiplier);
        let step = vel.0 * multiplier * dt;
        transform.position += step;
        transform.eye += step;
        if let Some(aim) = vel.0.try_normalize() {
            transform.aim = aim;
        }
    }
}
