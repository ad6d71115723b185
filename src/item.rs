//! Items handed to consumers and their acknowledgment tokens

use crate::partition::Gate;
use std::fmt;
use tracing::{debug, warn};

/// A value together with its partition key
///
/// Items returned by [Queue::get](crate::Queue::get) hold their partition's
/// in-flight slot. No other item with the same key is delivered until
/// [Item::done] is called.
pub struct Item<K, V> {
    key: K,
    value: V,
    ack: Ack,
}

impl<K, V> Item<K, V> {
    /// Create an item that belongs to no partition
    ///
    /// Calling [Item::done] on it does nothing.
    pub fn new(key: K, value: V) -> Self {
        Self {
            key,
            value,
            ack: Ack::detached(),
        }
    }

    pub(crate) fn bound(key: K, value: V, ack: Ack) -> Self {
        Self { key, value, ack }
    }

    /// The partition key
    pub fn key(&self) -> &K {
        &self.key
    }

    /// The payload
    pub fn value(&self) -> &V {
        &self.value
    }

    /// Returns true if the item belongs to no partition
    pub fn is_detached(&self) -> bool {
        self.ack.is_detached()
    }

    /// Signal that processing is finished so the next item with the same key
    /// may be delivered, possibly to another consumer
    pub fn done(self) {
        self.ack.done();
    }

    /// Split into key, value, and the obligation to acknowledge
    pub fn into_parts(self) -> (K, V, Ack) {
        (self.key, self.value, self.ack)
    }

    pub(crate) fn arm(&mut self) {
        self.ack.armed = true;
    }
}

impl<K: Default, V: Default> Default for Item<K, V> {
    fn default() -> Self {
        Self::new(K::default(), V::default())
    }
}

impl<K: fmt::Display, V: fmt::Display> fmt::Display for Item<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{key: {}, value: {}}}", self.key, self.value)
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for Item<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Item")
            .field("key", &self.key)
            .field("value", &self.value)
            .field("ack", &self.ack)
            .finish()
    }
}

/// Obligation to release a partition's in-flight slot
///
/// Obtained from [Item::into_parts]. Call [Ack::done] once the value has been
/// processed. Dropping an unacknowledged token stalls its partition unless the
/// queue was built with `release_on_drop`.
pub struct Ack {
    gate: Option<Gate>,
    armed: bool,
    release_on_drop: bool,
}

impl Ack {
    fn detached() -> Self {
        Self {
            gate: None,
            armed: false,
            release_on_drop: false,
        }
    }

    pub(crate) fn new(gate: Gate, release_on_drop: bool) -> Self {
        Self {
            gate: Some(gate),
            armed: false,
            release_on_drop,
        }
    }

    /// Returns true if the token belongs to no partition
    pub fn is_detached(&self) -> bool {
        self.gate.is_none()
    }

    /// Release the in-flight slot
    pub fn done(mut self) {
        if let Some(gate) = self.gate.take() {
            if self.armed {
                gate.decrement_inflight();
            }
        }
    }
}

impl Drop for Ack {
    fn drop(&mut self) {
        // Undelivered items never held the slot.
        let Some(gate) = self.gate.take() else {
            return;
        };
        if !self.armed {
            return;
        }

        if self.release_on_drop {
            debug!(
                partition = gate.partition(),
                "releasing slot of item dropped without done"
            );
            gate.decrement_inflight();
        } else if gate.is_closed() {
            debug!(
                partition = gate.partition(),
                "item dropped without done after queue closed"
            );
        } else {
            warn!(
                partition = gate.partition(),
                "item dropped without done; partition is stalled"
            );
        }
    }
}

impl fmt::Debug for Ack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ack")
            .field("partition", &self.gate.as_ref().map(Gate::partition))
            .field("armed", &self.armed)
            .finish()
    }
}
