//! Replication wire model.
//!
//! The host diffs each actor's replicated fields against what it last sent
//! and emits only the changes. Delivery is latest-value-wins: observers
//! converge on the final value, with no ordering guarantee beyond that.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::components::HitTrace;
use crate::enums::WaveState;
use crate::types::{NetId, PlayerId};

/// Kind of actor announced in a spawn message.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ActorKind {
    PlayerController { player: PlayerId },
    Character,
    Weapon {
        owner: Option<NetId>,
        time_between_shots: f64,
    },
    TrackerBot,
    Pickup,
    Powerup,
}

impl ActorKind {
    /// Replicated fields of this kind, in the order they are diffed and sent.
    pub fn replicated_fields(&self) -> &'static [FieldKind] {
        match self {
            ActorKind::Character => &[FieldKind::Health, FieldKind::Died],
            ActorKind::TrackerBot => &[FieldKind::Health],
            ActorKind::Weapon { .. } => &[FieldKind::HitTrace],
            ActorKind::Powerup => &[FieldKind::PowerupActive],
            ActorKind::PlayerController { .. } | ActorKind::Pickup => &[],
        }
    }
}

/// Identifies one replicated field of an actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FieldKind {
    Health,
    Died,
    PowerupActive,
    HitTrace,
}

/// A replicated field value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value")]
pub enum FieldValue {
    Health(f32),
    Died(bool),
    PowerupActive(bool),
    HitTrace(HitTrace),
}

impl FieldValue {
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::Health(_) => FieldKind::Health,
            FieldValue::Died(_) => FieldKind::Died,
            FieldValue::PowerupActive(_) => FieldKind::PowerupActive,
            FieldValue::HitTrace(_) => FieldKind::HitTrace,
        }
    }
}

/// One host-to-observer delta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ReplicationMessage {
    Spawn { net_id: NetId, kind: ActorKind },
    Despawn { net_id: NetId },
    Field { net_id: NetId, value: FieldValue },
    WaveState { state: WaveState },
}

/// All deltas produced by one host step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplicationFrame {
    pub tick: u64,
    pub messages: Vec<ReplicationMessage>,
}

/// Errors raised while moving replication data across the wire.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("malformed wire payload: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("empty wire payload")]
    Empty,
}

impl ReplicationFrame {
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Serialize the frame for the transport.
    pub fn encode(&self) -> Result<Vec<u8>, WireError> {
        encode(self)
    }

    /// Parse a frame received from the transport.
    pub fn decode(bytes: &[u8]) -> Result<Self, WireError> {
        decode(bytes)
    }
}

/// Serialize any wire payload.
pub fn encode<T: Serialize>(payload: &T) -> Result<Vec<u8>, WireError> {
    Ok(serde_json::to_vec(payload)?)
}

/// Parse any wire payload.
pub fn decode<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<T, WireError> {
    if bytes.is_empty() {
        return Err(WireError::Empty);
    }
    Ok(serde_json::from_slice(bytes)?)
}
