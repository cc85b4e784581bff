//! Commands delivered to the authoritative host.
//!
//! Commands are queued and processed at the next tick boundary.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::types::{NetId, PlayerId};

/// All inputs the host accepts from the transport or a local player.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PlayerCommand {
    // --- Sessions ---
    /// A player connected; spawn a controller and a character for them.
    Join { player: PlayerId },
    /// A player disconnected.
    Leave { player: PlayerId },

    // --- Match ---
    /// Begin the wave cycle.
    StartMatch,

    // --- Input owned by the host ---
    /// Hold the trigger of the player's weapon.
    StartFire { player: PlayerId },
    /// Release the trigger.
    StopFire { player: PlayerId },
    /// The player's authoritative view transform.
    UpdateView {
        player: PlayerId,
        position: Vec3,
        eye: Vec3,
        aim: Vec3,
    },

    /// A request forwarded by a non-authoritative session.
    Request {
        player: PlayerId,
        request: ClientRequest,
    },
}

/// Requests an observer forwards to the host. Unacknowledged, at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientRequest {
    /// Fire one shot. The host re-derives aim and outcome itself.
    Fire { weapon: NetId },
}
