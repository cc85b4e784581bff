//! Per-owner timer tables.
//!
//! Each actor that schedules work carries a `Timers` component; the match
//! owns one more. A slot holds at most one timer: setting a slot replaces
//! whatever was there, clearing it is idempotent, and despawning the owner
//! drops the table with everything still pending.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use hecs::{Entity, World};
use serde::{Deserialize, Serialize};

use coop_core::enums::TimerKey;

use crate::actors::Replicated;

/// One scheduled invocation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Timer {
    pub due_at: f64,
    /// Re-arm interval; `None` for one-shot timers.
    pub period: Option<f64>,
}

/// Timer slots of one owner.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Timers {
    slots: BTreeMap<TimerKey, Timer>,
}

impl Timers {
    /// Schedule `key` to run `delay` seconds after `now`, then every `period`
    /// seconds if given. Replaces any timer already in the slot.
    pub fn set(&mut self, key: TimerKey, now: f64, delay: f64, period: Option<f64>) {
        let timer = Timer {
            due_at: now + delay.max(0.0),
            period: period.filter(|p| *p > 0.0),
        };
        self.slots.insert(key, timer);
    }

    /// Cancel `key`. Returns whether a timer was pending.
    pub fn clear(&mut self, key: TimerKey) -> bool {
        self.slots.remove(&key).is_some()
    }

    pub fn is_active(&self, key: TimerKey) -> bool {
        self.slots.contains_key(&key)
    }

    pub fn get(&self, key: TimerKey) -> Option<&Timer> {
        self.slots.get(&key)
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Earliest pending timer of this table.
    pub fn next_due(&self) -> Option<(f64, TimerKey)> {
        self.slots
            .iter()
            .map(|(key, timer)| (timer.due_at, *key))
            .min_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)))
    }

    /// Consume the timer in `key` for an invocation at its due time: one-shot
    /// timers are removed, repeating timers re-armed one period later.
    pub fn fire(&mut self, key: TimerKey) -> Option<f64> {
        let timer = *self.slots.get(&key)?;
        match timer.period {
            Some(period) => {
                self.slots.insert(
                    key,
                    Timer {
                        due_at: timer.due_at + period,
                        period: Some(period),
                    },
                );
            }
            None => {
                self.slots.remove(&key);
            }
        }
        Some(timer.due_at)
    }
}

/// Who a timer belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerOwner {
    Match,
    Actor(Entity),
}

/// A timer ready to run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DueTimer {
    pub due_at: f64,
    pub owner: TimerOwner,
    pub key: TimerKey,
    /// Orders owners: the match first, then actors by replicated id.
    order: u64,
}

impl DueTimer {
    fn cmp_order(&self, other: &DueTimer) -> Ordering {
        self.due_at
            .total_cmp(&other.due_at)
            .then(self.order.cmp(&other.order))
            .then(self.key.cmp(&other.key))
    }
}

/// The next timer due at or before `horizon` across the match table and every
/// actor table, ordered by `(due_at, owner, key)`.
pub fn next_due(world: &World, match_timers: &Timers, horizon: f64) -> Option<DueTimer> {
    let mut best: Option<DueTimer> = match_timers.next_due().map(|(due_at, key)| DueTimer {
        due_at,
        owner: TimerOwner::Match,
        key,
        order: 0,
    });

    for (entity, (replicated, timers)) in world.query::<(&Replicated, &Timers)>().iter() {
        let Some((due_at, key)) = timers.next_due() else {
            continue;
        };
        let candidate = DueTimer {
            due_at,
            owner: TimerOwner::Actor(entity),
            key,
            order: replicated.net_id.0 as u64 + 1,
        };
        let better = match &best {
            Some(current) => candidate.cmp_order(current) == Ordering::Less,
            None => true,
        };
        if better {
            best = Some(candidate);
        }
    }

    best.filter(|timer| timer.due_at <= horizon)
}
