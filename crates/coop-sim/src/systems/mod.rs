//! ECS systems that operate on the match world each tick.
//!
//! Systems are free functions that take `&mut World` (or `&World` for
//! read-only). Gameplay reactions that need the whole session live on
//! `MatchSession` instead.

pub mod cleanup;
pub mod movement;
pub mod overlap;
pub mod replication;
pub mod snapshot;
