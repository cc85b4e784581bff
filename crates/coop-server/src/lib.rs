//! Headless dedicated server for co-op matches.
//!
//! Runs the authoritative `MatchSession` on its own thread at the fixed tick
//! rate and fans replication frames out to subscribed observers.

pub mod game_loop;
pub mod logging;
pub mod state;

pub use coop_core as core;
