//! The partitioned queue
//!
//! Producers put values under a key; any number of consumers get items from
//! one shared output. Items with the same key come out in the order they were
//! put, and only one of them can be out with a consumer at a time. Items with
//! different keys flow independently.

use crate::channel::{self, Interrupt};
use crate::config::Config;
use crate::error::{Cause, Error, Result};
use crate::item::Item;
use crate::partition::Partition;
use crate::scope::{Canceler, Scope};
use crate::stats::{QueueStats, Stats};
use ahash::RandomState;
use crossbeam::channel::{bounded, Receiver, Sender};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Position of the caller's scope in the watched slice; the queue's own
/// lifetime scope always follows it.
const CALLER: usize = 0;

/// A partitioned blocking queue
///
/// Partitions are created on the first put for a key and live as long as the
/// queue. Each one owns a forwarding thread, so memory and thread count grow
/// with the number of distinct keys ever seen.
///
/// Dropping the queue stops every forwarding thread.
pub struct Queue<K, V> {
    /// Cancels `scope` when the queue is dropped; declared first so it fires
    /// before the channels go away
    _lifetime: Canceler,

    /// Fires when the caller's lifetime scope does or when the queue drops
    scope: Scope,

    config: Config,

    /// Partition registry indexed by key
    partitions: RwLock<HashMap<K, Arc<Partition<K, V>>, RandomState>>,

    next_partition_id: AtomicU64,

    output_tx: Sender<Item<K, V>>,
    output_rx: Receiver<Item<K, V>>,

    stats: Arc<Stats>,
}

impl<K, V> Queue<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Send + 'static,
{
    /// Create a queue that is functional until `scope` fires
    pub fn new(scope: &Scope, config: Config) -> Self {
        let (scope, lifetime) = scope.with_cancel();
        let (output_tx, output_rx) = bounded(config.buffer_capacity);

        Self {
            _lifetime: lifetime,
            scope,
            config,
            partitions: RwLock::new(HashMap::default()),
            next_partition_id: AtomicU64::new(0),
            output_tx,
            output_rx,
            stats: Arc::new(Stats::default()),
        }
    }

    /// Put `value` into the partition for `key`
    ///
    /// Blocks while the partition buffer is full, until there is room or
    /// `scope` fires.
    pub fn put(&self, scope: &Scope, key: K, value: V) -> Result<()> {
        if self.scope.is_canceled() {
            self.stats.record_canceled_put();
            return Err(Error::Canceled(Cause::Closed));
        }

        let partition = self.get_or_create_partition(&key)?;
        let item = partition.bind(key, value);

        match partition.put(&[scope, &self.scope], item) {
            Ok(()) => {
                self.stats.record_put();
                Ok(())
            }
            Err(interrupt) => {
                self.stats.record_canceled_put();
                Err(Self::interrupted(interrupt))
            }
        }
    }

    /// Take the next available item from any partition
    ///
    /// Blocks until an item is available or `scope` fires. The returned item
    /// holds its partition until [Item::done] is called.
    pub fn get(&self, scope: &Scope) -> Result<Item<K, V>> {
        match channel::recv(&[scope, &self.scope], &self.output_rx) {
            Ok(item) => {
                self.stats.record_delivery();
                Ok(item)
            }
            Err(interrupt) => {
                self.stats.record_canceled_get();
                Err(Self::interrupted(interrupt))
            }
        }
    }

    /// Number of partitions created so far
    pub fn partition_count(&self) -> usize {
        self.partitions.read().len()
    }

    /// Snapshot of the queue counters
    pub fn stats(&self) -> QueueStats {
        self.stats.snapshot()
    }

    /// The configuration the queue was built with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns true once the queue's lifetime scope has fired
    pub fn is_closed(&self) -> bool {
        self.scope.is_canceled()
    }

    /// Return the partition for `key`, creating it if it doesn't exist yet
    fn get_or_create_partition(&self, key: &K) -> Result<Arc<Partition<K, V>>> {
        if let Some(partition) = self.partitions.read().get(key) {
            return Ok(Arc::clone(partition));
        }

        let mut partitions = self.partitions.write();

        // Another producer may have created it while we waited for the lock.
        if let Some(partition) = partitions.get(key) {
            return Ok(Arc::clone(partition));
        }

        let id = self.next_partition_id.fetch_add(1, Ordering::Relaxed);
        let partition = Arc::new(Partition::spawn(
            id,
            &self.scope,
            &self.config,
            self.output_tx.clone(),
            Arc::clone(&self.stats),
        )?);
        partitions.insert(key.clone(), Arc::clone(&partition));

        debug!(
            partition = partition.id(),
            partitions = partitions.len(),
            "created partition"
        );
        Ok(partition)
    }

    fn interrupted(interrupt: Interrupt) -> Error {
        match interrupt {
            Interrupt::Fired {
                index: CALLER,
                cause,
            } => Error::Canceled(cause),
            Interrupt::Fired { .. } | Interrupt::Disconnected => Error::Canceled(Cause::Closed),
        }
    }
}
