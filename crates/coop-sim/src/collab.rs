//! Capabilities the match calls into but does not implement.
//!
//! Physics queries, navigation, bot placement, force application and
//! presentation all belong to the embedding engine. The headless `arena`
//! module provides simple stand-ins.

use glam::Vec3;
use hecs::{Entity, World};

use coop_core::enums::SurfaceKind;
use coop_core::events::CosmeticCue;

use crate::arena;

/// Nearest blocking hit of a line trace.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceHit {
    /// The actor that was hit, if the blocker is an actor.
    pub actor: Option<Entity>,
    pub point: Vec3,
    pub surface: SurfaceKind,
}

/// Picks where the next bot of a wave appears. The host spawns the actor.
pub trait BotSpawner {
    fn spawn_location(&mut self, wave: u32) -> Vec3;
}

/// Path queries. Only the path result is consumed.
pub trait Navigation {
    fn find_path(&self, world: &World, from: Vec3, to: Vec3) -> Option<Vec<Vec3>>;
}

/// Collision queries.
pub trait HitTest {
    /// Nearest blocking hit between `start` and `end`.
    fn line_trace(&self, world: &World, start: Vec3, end: Vec3, ignored: &[Entity])
        -> Option<TraceHit>;

    /// Actors overlapping a sphere.
    fn overlap_sphere(&self, world: &World, center: Vec3, radius: f32, ignored: &[Entity])
        -> Vec<Entity>;
}

/// Applies forces to physically simulated actors.
pub trait Motor {
    fn add_force(&mut self, world: &mut World, actor: Entity, force: Vec3, dt: f64);
}

/// Fire-and-forget presentation.
pub trait Cosmetics {
    fn play(&mut self, cue: &CosmeticCue);
}

/// Everything the host needs from the outside world.
pub struct Collaborators {
    pub spawner: Box<dyn BotSpawner>,
    pub navigation: Box<dyn Navigation>,
    pub hit_test: Box<dyn HitTest>,
    pub motor: Box<dyn Motor>,
    pub cosmetics: Box<dyn Cosmetics>,
}

impl Collaborators {
    /// The headless arena stand-ins.
    pub fn arena() -> Self {
        Self {
            spawner: Box::new(arena::RingSpawner::default()),
            navigation: Box::new(arena::StraightPaths),
            hit_test: Box::new(arena::SphereQueries),
            motor: Box::new(arena::ArenaMotor),
            cosmetics: Box::new(arena::LogCosmetics),
        }
    }

    /// Arena stand-ins with a custom cosmetics sink.
    pub fn arena_with_cosmetics(cosmetics: Box<dyn Cosmetics>) -> Self {
        Self {
            cosmetics,
            ..Self::arena()
        }
    }
}
