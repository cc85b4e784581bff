//! Target selection and path consumption.

use glam::Vec3;

use coop_core::types::NetId;

/// A pawn the tracker could chase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub id: NetId,
    pub position: Vec3,
    pub health: f32,
    /// Result of the friendly check against the tracker.
    pub friendly: bool,
}

/// Nearest living, non-friendly candidate. On equal distance the earlier
/// candidate wins.
pub fn select_target(origin: Vec3, candidates: &[Candidate]) -> Option<Candidate> {
    let mut best: Option<(Candidate, f32)> = None;
    for candidate in candidates {
        if candidate.friendly || candidate.health <= 0.0 {
            continue;
        }
        let distance = origin.distance(candidate.position);
        match best {
            Some((_, nearest)) if nearest <= distance => {}
            _ => best = Some((*candidate, distance)),
        }
    }
    best.map(|(candidate, _)| candidate)
}

/// The point to steer toward from a navigation result: the second path point
/// (the first is the bot's own position), or `current` when the path is
/// missing or too short.
pub fn next_path_point(path: Option<&[Vec3]>, current: Vec3) -> Vec3 {
    match path {
        Some(points) if points.len() > 1 => points[1],
        _ => current,
    }
}
