//! Tracker bot AI for the co-op arena.
//!
//! Implements the tracker's pursuit decisions (target choice, path point
//! consumption, steering) and its self-destruct state machine.

pub mod fsm;
pub mod pursuit;

pub use coop_core as core;
