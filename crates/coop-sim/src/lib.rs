//! Authoritative match host for the co-op arena.
//!
//! Owns the hecs ECS world, runs timers and systems at a fixed tick rate,
//! routes damage, drives the wave cycle and produces replication frames
//! and `MatchSnapshot`s. `ObserverSession` mirrors the host from frames.

pub mod actors;
pub mod arena;
pub mod character;
pub mod collab;
pub mod engine;
pub mod health;
pub mod listeners;
pub mod observer;
pub mod powerup;
pub mod scheduler;
pub mod systems;
pub mod tracker;
pub mod wave;
pub mod weapon;
pub mod world_setup;

pub use coop_core as core;
pub use engine::{CommandError, MatchSession};
pub use observer::ObserverSession;

#[cfg(test)]
mod tests;
