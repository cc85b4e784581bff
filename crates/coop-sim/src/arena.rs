//! Headless arena: minimal collaborators for the dedicated server and tests.
//!
//! Actors are spheres (`Collider`), paths are straight lines, bots appear on
//! a ring around the origin and cosmetics go to the log.

use glam::Vec3;
use hecs::{Entity, World};
use log::trace;

use coop_core::components::{Collider, Transform, Velocity};
use coop_core::constants::*;
use coop_core::events::CosmeticCue;

use crate::collab::{BotSpawner, Cosmetics, HitTest, Motor, Navigation, TraceHit};

/// Golden angle in radians; spreads consecutive spawns around the ring.
const GOLDEN_ANGLE: f32 = 2.399_963;

/// Spawns bots on a ring around the origin.
#[derive(Debug, Clone)]
pub struct RingSpawner {
    pub radius: f32,
    spawned: u32,
}

impl Default for RingSpawner {
    fn default() -> Self {
        Self {
            radius: BOT_SPAWN_RING_RADIUS,
            spawned: 0,
        }
    }
}

impl BotSpawner for RingSpawner {
    fn spawn_location(&mut self, _wave: u32) -> Vec3 {
        let angle = self.spawned as f32 * GOLDEN_ANGLE;
        self.spawned += 1;
        Vec3::new(angle.cos() * self.radius, angle.sin() * self.radius, 0.0)
    }
}

/// Open floor: the path is the straight segment.
#[derive(Debug, Clone, Copy, Default)]
pub struct StraightPaths;

impl Navigation for StraightPaths {
    fn find_path(&self, _world: &World, from: Vec3, to: Vec3) -> Option<Vec<Vec3>> {
        Some(vec![from, to])
    }
}

/// Ray and overlap queries against sphere colliders.
#[derive(Debug, Clone, Copy, Default)]
pub struct SphereQueries;

/// Distance along `dir` (unit) from `origin` to the first intersection with
/// the sphere, if any.
fn ray_sphere(origin: Vec3, dir: Vec3, center: Vec3, radius: f32) -> Option<f32> {
    let to_center = origin - center;
    let b = to_center.dot(dir);
    let c = to_center.length_squared() - radius * radius;
    if c <= 0.0 {
        // Starts inside.
        return Some(0.0);
    }
    let discriminant = b * b - c;
    if discriminant < 0.0 {
        return None;
    }
    let t = -b - discriminant.sqrt();
    (t >= 0.0).then_some(t)
}

impl HitTest for SphereQueries {
    fn line_trace(
        &self,
        world: &World,
        start: Vec3,
        end: Vec3,
        ignored: &[Entity],
    ) -> Option<TraceHit> {
        let segment = end - start;
        let length = segment.length();
        if length <= f32::EPSILON {
            return None;
        }
        let dir = segment / length;

        let mut nearest: Option<(f32, TraceHit)> = None;
        for (entity, (transform, collider)) in world.query::<(&Transform, &Collider)>().iter() {
            if ignored.contains(&entity) {
                continue;
            }
            let Some(t) = ray_sphere(start, dir, transform.position, collider.radius) else {
                continue;
            };
            if t > length {
                continue;
            }
            if nearest.as_ref().is_some_and(|(best, _)| *best <= t) {
                continue;
            }
            nearest = Some((
                t,
                TraceHit {
                    actor: Some(entity),
                    point: start + dir * t,
                    surface: collider.surface,
                },
            ));
        }
        nearest.map(|(_, hit)| hit)
    }

    fn overlap_sphere(
        &self,
        world: &World,
        center: Vec3,
        radius: f32,
        ignored: &[Entity],
    ) -> Vec<Entity> {
        world
            .query::<(&Transform, &Collider)>()
            .iter()
            .filter(|(entity, _)| !ignored.contains(entity))
            .filter(|(_, (transform, collider))| {
                transform.position.distance(center) <= radius + collider.radius
            })
            .map(|(entity, _)| entity)
            .collect()
    }
}

/// Turns forces into velocity for rolling bots.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArenaMotor;

impl Motor for ArenaMotor {
    fn add_force(&mut self, world: &mut World, actor: Entity, force: Vec3, dt: f64) {
        if let Ok(velocity) = world.query_one_mut::<&mut Velocity>(actor) {
            let accel = force / TRACKER_MASS;
            velocity.0 = (velocity.0 + accel * dt as f32).clamp_length_max(TRACKER_MAX_SPEED);
        }
    }
}

/// Writes cues to the log at trace level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogCosmetics;

impl Cosmetics for LogCosmetics {
    fn play(&mut self, cue: &CosmeticCue) {
        trace!("cosmetic {cue:?}");
    }
}
