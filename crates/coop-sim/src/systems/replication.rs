//! Replication system: diffs replicated fields against what was last sent.
//!
//! Each actor kind names a fixed, ordered list of replicated fields. Every
//! step the current value of each field is compared with the last value
//! sent, and only changes go out. Newly seen actors are announced with a
//! spawn message first; actors that disappeared get a despawn message last.

use std::collections::{BTreeMap, BTreeSet};

use hecs::{Entity, World};

use coop_core::components::Combatant;
use coop_core::enums::WaveState;
use coop_core::replication::{
    ActorKind, FieldKind, FieldValue, ReplicationFrame, ReplicationMessage,
};
use coop_core::types::NetId;

use crate::actors::{Character, Powerup, Replicated, Weapon};

/// Host-side record of what observers have been sent.
#[derive(Debug, Default)]
pub struct ReplicationTracker {
    known: BTreeMap<NetId, ActorKind>,
    last_sent: BTreeMap<(NetId, FieldKind), FieldValue>,
    wave_state: Option<WaveState>,
}

impl ReplicationTracker {
    /// Whether an actor has been announced.
    pub fn is_known(&self, net_id: NetId) -> bool {
        self.known.contains_key(&net_id)
    }
}

/// Current value of one replicated field, if the actor has it yet.
pub fn read_field(world: &World, entity: Entity, field: FieldKind) -> Option<FieldValue> {
    match field {
        FieldKind::Health => world
            .get::<&Combatant>(entity)
            .ok()
            .map(|c| FieldValue::Health(c.current_health)),
        FieldKind::Died => world
            .get::<&Character>(entity)
            .ok()
            .map(|c| FieldValue::Died(c.died)),
        FieldKind::PowerupActive => world
            .get::<&Powerup>(entity)
            .ok()
            .map(|p| FieldValue::PowerupActive(p.session.is_active)),
        FieldKind::HitTrace => world
            .get::<&Weapon>(entity)
            .ok()
            .and_then(|w| w.hit_trace)
            .map(FieldValue::HitTrace),
    }
}

/// Build the frame for this step and record it as sent.
pub fn run(
    world: &World,
    tracker: &mut ReplicationTracker,
    wave_state: WaveState,
    tick: u64,
) -> ReplicationFrame {
    let mut actors: Vec<(NetId, ActorKind, Entity)> = world
        .query::<&Replicated>()
        .iter()
        .map(|(entity, replicated)| (replicated.net_id, replicated.kind, entity))
        .collect();
    actors.sort_by_key(|(net_id, _, _)| *net_id);

    let mut messages = Vec::new();

    // Spawns
    for (net_id, kind, _) in &actors {
        if !tracker.known.contains_key(net_id) {
            tracker.known.insert(*net_id, *kind);
            messages.push(ReplicationMessage::Spawn {
                net_id: *net_id,
                kind: *kind,
            });
        }
    }

    // Field deltas, in each kind's field order
    for (net_id, kind, entity) in &actors {
        for field in kind.replicated_fields() {
            let Some(value) = read_field(world, *entity, *field) else {
                continue;
            };
            let key = (*net_id, *field);
            if tracker.last_sent.get(&key) == Some(&value) {
                continue;
            }
            tracker.last_sent.insert(key, value);
            messages.push(ReplicationMessage::Field {
                net_id: *net_id,
                value,
            });
        }
    }

    // Match state
    if tracker.wave_state != Some(wave_state) {
        tracker.wave_state = Some(wave_state);
        messages.push(ReplicationMessage::WaveState { state: wave_state });
    }

    // Despawns
    let present: BTreeSet<NetId> = actors.iter().map(|(net_id, _, _)| *net_id).collect();
    let gone: Vec<NetId> = tracker
        .known
        .keys()
        .filter(|net_id| !present.contains(*net_id))
        .copied()
        .collect();
    for net_id in gone {
        tracker.known.remove(&net_id);
        tracker.last_sent.retain(|(id, _), _| *id != net_id);
        messages.push(ReplicationMessage::Despawn { net_id });
    }

    ReplicationFrame { tick, messages }
}

/// Full state as a single frame, for an observer that connects mid-match.
pub fn full_frame(world: &World, wave_state: WaveState, tick: u64) -> ReplicationFrame {
    let mut fresh = ReplicationTracker::default();
    run(world, &mut fresh, wave_state, tick)
}
