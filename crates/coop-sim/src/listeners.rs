//! Change listener tables.
//!
//! Listeners subscribe either to one actor or to everything. Notification
//! walks the table in subscription order and runs synchronously. The host
//! and the observer mirror both use this table, so a listener written once
//! reacts the same way on either side.

use coop_core::events::{ChangeEvent, ChangeListener};
use coop_core::types::NetId;

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

struct Subscription {
    id: SubscriptionId,
    /// `None` receives every change.
    actor: Option<NetId>,
    listener: Box<dyn ChangeListener>,
}

#[derive(Default)]
pub struct ListenerTable {
    next_id: u64,
    subscriptions: Vec<Subscription>,
}

impl ListenerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` for changes of `actor`, or of everything when
    /// `actor` is `None`.
    pub fn subscribe(
        &mut self,
        actor: Option<NetId>,
        listener: Box<dyn ChangeListener>,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscriptions.push(Subscription {
            id,
            actor,
            listener,
        });
        id
    }

    /// Returns whether the subscription existed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.id != id);
        self.subscriptions.len() != before
    }

    /// Drop every listener bound to a despawned actor.
    pub fn drop_actor(&mut self, actor: NetId) {
        self.subscriptions.retain(|s| s.actor != Some(actor));
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Deliver `change` to matching listeners in subscription order.
    pub fn notify(&mut self, change: &ChangeEvent) {
        let actor = change.actor();
        for subscription in &mut self.subscriptions {
            let matches = match subscription.actor {
                None => true,
                Some(bound) => actor == Some(bound),
            };
            if matches {
                subscription.listener.on_changed(change);
            }
        }
    }
}
