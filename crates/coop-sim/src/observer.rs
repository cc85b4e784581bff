//! Observer session: a read-only mirror of the host.
//!
//! Applies replication frames, raises `ChangeEvent`s only when a mirrored
//! value actually changes, and replays shots cosmetically. Never touches
//! gameplay state. Fire input is forwarded to the host as requests, paced by
//! local timers so the request rate matches the weapon's fire rate.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, trace};

use coop_core::commands::{ClientRequest, PlayerCommand};
use coop_core::components::HitTrace;
use coop_core::constants::TIME_EPSILON;
use coop_core::enums::{NetRole, WaveState};
use coop_core::events::{ChangeEvent, ChangeListener, CosmeticCue, HealthChanged};
use coop_core::replication::{
    ActorKind, FieldKind, FieldValue, ReplicationFrame, ReplicationMessage, WireError,
};
use coop_core::types::{NetId, PlayerId};

use crate::collab::Cosmetics;
use crate::listeners::{ListenerTable, SubscriptionId};
use crate::weapon::first_shot_delay;

/// Mirrored state of one actor.
#[derive(Debug, Clone, PartialEq)]
pub struct MirroredActor {
    pub kind: ActorKind,
    pub fields: BTreeMap<FieldKind, FieldValue>,
}

/// Local trigger state of a weapon this observer fires.
#[derive(Debug, Clone, Copy)]
struct LocalFire {
    last_fire_time: f64,
    /// Next request time while the trigger is held.
    next_shot: Option<f64>,
}

pub struct ObserverSession {
    player: PlayerId,
    actors: BTreeMap<NetId, MirroredActor>,
    wave_state: WaveState,
    last_tick: Option<u64>,
    listeners: ListenerTable,
    cosmetics: Box<dyn Cosmetics>,
    now: f64,
    firing: BTreeMap<NetId, LocalFire>,
    outbox: Vec<PlayerCommand>,
}

impl ObserverSession {
    pub fn new(player: PlayerId, cosmetics: Box<dyn Cosmetics>) -> Self {
        Self {
            player,
            actors: BTreeMap::new(),
            wave_state: WaveState::default(),
            last_tick: None,
            listeners: ListenerTable::new(),
            cosmetics,
            now: 0.0,
            firing: BTreeMap::new(),
            outbox: Vec::new(),
        }
    }

    pub fn role(&self) -> NetRole {
        NetRole::Observer
    }

    pub fn player(&self) -> PlayerId {
        self.player
    }

    pub fn subscribe(
        &mut self,
        actor: Option<NetId>,
        listener: Box<dyn ChangeListener>,
    ) -> SubscriptionId {
        self.listeners.subscribe(actor, listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.listeners.unsubscribe(id)
    }

    // ---- Mirror ----

    pub fn wave_state(&self) -> WaveState {
        self.wave_state
    }

    /// Tick of the last applied frame.
    pub fn last_tick(&self) -> Option<u64> {
        self.last_tick
    }

    pub fn actor(&self, net_id: NetId) -> Option<&MirroredActor> {
        self.actors.get(&net_id)
    }

    pub fn actor_ids(&self) -> impl Iterator<Item = NetId> + '_ {
        self.actors.keys().copied()
    }

    pub fn health(&self, net_id: NetId) -> Option<f32> {
        match self.field(net_id, FieldKind::Health)? {
            FieldValue::Health(health) => Some(health),
            _ => None,
        }
    }

    pub fn died(&self, net_id: NetId) -> Option<bool> {
        match self.field(net_id, FieldKind::Died)? {
            FieldValue::Died(died) => Some(died),
            _ => None,
        }
    }

    pub fn powerup_active(&self, net_id: NetId) -> Option<bool> {
        match self.field(net_id, FieldKind::PowerupActive)? {
            FieldValue::PowerupActive(active) => Some(active),
            _ => None,
        }
    }

    pub fn hit_trace(&self, net_id: NetId) -> Option<HitTrace> {
        match self.field(net_id, FieldKind::HitTrace)? {
            FieldValue::HitTrace(trace) => Some(trace),
            _ => None,
        }
    }

    fn field(&self, net_id: NetId, field: FieldKind) -> Option<FieldValue> {
        self.actors.get(&net_id)?.fields.get(&field).copied()
    }

    /// Decode and apply a frame received from the transport.
    pub fn apply_bytes(&mut self, bytes: &[u8]) -> Result<(), WireError> {
        let frame = ReplicationFrame::decode(bytes)?;
        self.apply_frame(&frame);
        Ok(())
    }

    /// Apply every message of a frame in order. Field values arriving in the
    /// same frame as their actor's spawn are initial state and raise nothing.
    pub fn apply_frame(&mut self, frame: &ReplicationFrame) {
        let mut spawned_now: BTreeSet<NetId> = BTreeSet::new();
        for message in &frame.messages {
            match message {
                ReplicationMessage::Spawn { net_id, kind } => {
                    if !self.actors.contains_key(net_id) {
                        trace!("mirror spawn {net_id} {kind:?}");
                        self.actors.insert(
                            *net_id,
                            MirroredActor {
                                kind: *kind,
                                fields: BTreeMap::new(),
                            },
                        );
                        spawned_now.insert(*net_id);
                    }
                }
                ReplicationMessage::Despawn { net_id } => {
                    if self.actors.remove(net_id).is_some() {
                        trace!("mirror despawn {net_id}");
                        self.listeners.drop_actor(*net_id);
                        self.firing.remove(net_id);
                    }
                }
                ReplicationMessage::Field { net_id, value } => {
                    let initial = spawned_now.contains(net_id);
                    self.apply_field(*net_id, *value, initial);
                }
                ReplicationMessage::WaveState { state } => {
                    let old = self.wave_state;
                    if old != *state {
                        self.wave_state = *state;
                        self.listeners.notify(&ChangeEvent::WaveState { new: *state, old });
                    }
                }
            }
        }
        self.last_tick = Some(frame.tick);
    }

    fn apply_field(&mut self, net_id: NetId, value: FieldValue, initial: bool) {
        let Some(actor) = self.actors.get_mut(&net_id) else {
            debug!("field for unknown actor {net_id} dropped");
            return;
        };
        let old = actor.fields.insert(value.kind(), value);
        if old == Some(value) || initial {
            return;
        }

        let change = match value {
            FieldValue::Health(health) => {
                let previous = match old {
                    Some(FieldValue::Health(previous)) => previous,
                    _ => health,
                };
                ChangeEvent::Health(HealthChanged {
                    actor: net_id,
                    health,
                    delta: health - previous,
                    kind: None,
                    instigator: None,
                    causer: None,
                })
            }
            FieldValue::Died(died) => {
                if !died {
                    return;
                }
                ChangeEvent::Died { actor: net_id }
            }
            FieldValue::PowerupActive(active) => {
                self.cosmetics.play(&CosmeticCue::PowerupState {
                    powerup: net_id,
                    active,
                });
                ChangeEvent::PowerupActive {
                    powerup: net_id,
                    active,
                }
            }
            FieldValue::HitTrace(trace) => {
                self.replay_shot(net_id, trace);
                ChangeEvent::HitTrace {
                    weapon: net_id,
                    trace,
                }
            }
        };
        self.listeners.notify(&change);
    }

    /// Cosmetic replay of a host shot. No gameplay effect.
    fn replay_shot(&mut self, weapon: NetId, trace: HitTrace) {
        self.cosmetics.play(&CosmeticCue::MuzzleFlash { weapon });
        self.cosmetics.play(&CosmeticCue::Trail {
            weapon,
            end: trace.end_point,
        });
        self.cosmetics.play(&CosmeticCue::Impact {
            surface: trace.surface,
            point: trace.end_point,
        });
    }

    // ---- Fire forwarding ----

    /// Shot period of a mirrored weapon. `None` for unknown actors and for
    /// periods that could never advance the local clock.
    fn time_between_shots(&self, weapon: NetId) -> Option<f64> {
        match self.actors.get(&weapon)?.kind {
            ActorKind::Weapon {
                time_between_shots, ..
            } if time_between_shots.is_finite() && time_between_shots > 0.0 => {
                Some(time_between_shots)
            }
            _ => None,
        }
    }

    /// Hold the trigger of a mirrored weapon.
    pub fn start_firing(&mut self, weapon: NetId) {
        let Some(period) = self.time_between_shots(weapon) else {
            debug!("cannot fire {weapon}: not a known weapon or no usable fire rate");
            return;
        };
        let now = self.now;
        let fire = self.firing.entry(weapon).or_insert(LocalFire {
            last_fire_time: f64::NEG_INFINITY,
            next_shot: None,
        });
        fire.next_shot = Some(now + first_shot_delay(fire.last_fire_time, period, now));
    }

    /// Release the trigger. Idempotent.
    pub fn stop_firing(&mut self, weapon: NetId) {
        if let Some(fire) = self.firing.get_mut(&weapon) {
            fire.next_shot = None;
        }
    }

    /// Forward one shot to the host. Fire-and-forget: nothing is
    /// acknowledged or retried.
    pub fn fire(&mut self, weapon: NetId) {
        self.cosmetics.play(&CosmeticCue::MuzzleFlash { weapon });
        self.outbox.push(PlayerCommand::Request {
            player: self.player,
            request: ClientRequest::Fire { weapon },
        });
        let now = self.now;
        self.firing
            .entry(weapon)
            .or_insert(LocalFire {
                last_fire_time: now,
                next_shot: None,
            })
            .last_fire_time = now;
    }

    /// Advance the local clock, forwarding every shot due meanwhile.
    pub fn advance(&mut self, dt: f64) {
        let horizon = self.now + dt;
        loop {
            let due = self
                .firing
                .iter()
                .filter_map(|(weapon, fire)| fire.next_shot.map(|at| (at, *weapon)))
                .filter(|(at, _)| *at <= horizon + TIME_EPSILON)
                .min_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
            let Some((at, weapon)) = due else {
                break;
            };
            let Some(period) = self.time_between_shots(weapon) else {
                self.firing.remove(&weapon);
                continue;
            };
            self.now = at;
            self.fire(weapon);
            if let Some(fire) = self.firing.get_mut(&weapon) {
                fire.next_shot = fire.next_shot.map(|next| next + period);
            }
        }
        self.now = horizon;
    }

    /// Requests waiting to be sent to the host.
    pub fn drain_requests(&mut self) -> Vec<PlayerCommand> {
        std::mem::take(&mut self.outbox)
    }
}
