//! Queue counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Cache line size for padding (typically 64 bytes on x86-64)
const CACHE_LINE_SIZE: usize = 64;

/// Live counters shared by the queue, its partitions, and delivered items
#[repr(align(64))]
#[derive(Debug)]
pub(crate) struct Stats {
    put: AtomicU64,
    delivered: AtomicU64,
    acknowledged: AtomicU64,
    canceled_puts: AtomicU64,
    canceled_gets: AtomicU64,

    _padding: [u8; CACHE_LINE_SIZE - 40],
}

impl Default for Stats {
    fn default() -> Self {
        Self {
            put: AtomicU64::new(0),
            delivered: AtomicU64::new(0),
            acknowledged: AtomicU64::new(0),
            canceled_puts: AtomicU64::new(0),
            canceled_gets: AtomicU64::new(0),
            _padding: [0; CACHE_LINE_SIZE - 40],
        }
    }
}

impl Stats {
    pub(crate) fn record_put(&self) {
        self.put.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_delivery(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_ack(&self) {
        self.acknowledged.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_canceled_put(&self) {
        self.canceled_puts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_canceled_get(&self) {
        self.canceled_gets.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> QueueStats {
        QueueStats {
            items_put: self.put.load(Ordering::Relaxed),
            items_delivered: self.delivered.load(Ordering::Relaxed),
            items_acknowledged: self.acknowledged.load(Ordering::Relaxed),
            canceled_puts: self.canceled_puts.load(Ordering::Relaxed),
            canceled_gets: self.canceled_gets.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of a queue's counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Items accepted into a partition buffer
    pub items_put: u64,

    /// Items handed to consumers by `get`
    pub items_delivered: u64,

    /// Items whose in-flight slot has been released
    pub items_acknowledged: u64,

    /// Puts that gave up because a scope fired
    pub canceled_puts: u64,

    /// Gets that gave up because a scope fired
    pub canceled_gets: u64,
}

impl QueueStats {
    /// Items held by consumers that have not been acknowledged yet
    pub fn unacknowledged(&self) -> u64 {
        self.items_delivered.saturating_sub(self.items_acknowledged)
    }
}
