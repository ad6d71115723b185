//! Per-key sequencing
//!
//! A [Partition] owns the pending buffer of one key and a forwarding thread
//! that moves its items into the shared output one at a time.
//!
//! The in-flight gate is a single-slot channel. The forwarding loop parks a
//! token in it before taking the next item, so it cannot get past
//! [Stage::AcquireSlot] while a delivered item is unacknowledged. An item's
//! acknowledgment takes the token back out.
//!
//! ```text
//!            put                      get
//!  producer ─────▶ buffer ─▶ [gate] ─▶ output ─────▶ consumer
//!                             ▲                         │
//!                             └──────── done ───────────┘
//! ```

use crate::channel::{self, Interrupt};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::item::{Ack, Item};
use crate::scope::Scope;
use crate::stats::Stats;
use crossbeam::channel::{bounded, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use tracing::{debug, trace, warn};

/// Unique identifier for a partition within its queue
pub(crate) type PartitionId = u64;

/// Release side of a partition's in-flight slot
#[derive(Clone)]
pub(crate) struct Gate {
    partition: PartitionId,
    slot: Receiver<()>,
    scope: Scope,
    stats: Arc<Stats>,
}

impl Gate {
    pub(crate) fn partition(&self) -> PartitionId {
        self.partition
    }

    /// Returns true once the owning queue has stopped forwarding
    pub(crate) fn is_closed(&self) -> bool {
        self.scope.is_canceled()
    }

    /// Free the slot so the forwarding loop can deliver the next item
    pub(crate) fn decrement_inflight(&self) {
        match self.slot.try_recv() {
            Ok(()) => {
                self.stats.record_ack();
                trace!(partition = self.partition, "in-flight slot released");
            }
            Err(_) => warn!(
                partition = self.partition,
                "released a partition with no item in flight"
            ),
        }
    }
}

/// Where the forwarding loop was when it stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    /// Waiting for the previous item to be acknowledged
    AcquireSlot,

    /// Holding the slot, waiting for a buffered item
    AwaitItem,

    /// Waiting for room in the shared output
    Deliver,
}

/// The producer-facing half of a partition
pub(crate) struct Partition<K, V> {
    id: PartitionId,
    buffer: Sender<Item<K, V>>,
    gate: Gate,
    release_on_drop: bool,
}

impl<K, V> Partition<K, V>
where
    K: Send + 'static,
    V: Send + 'static,
{
    /// Create a partition and start its forwarding thread
    ///
    /// The thread runs until `scope` fires or every handle to the buffer and
    /// output is gone.
    pub(crate) fn spawn(
        id: PartitionId,
        scope: &Scope,
        config: &Config,
        output: Sender<Item<K, V>>,
        stats: Arc<Stats>,
    ) -> Result<Self> {
        let (buffer_tx, buffer_rx) = bounded(config.partition_capacity);
        let (slot_tx, slot_rx) = bounded(1);

        let forwarder = Forwarder {
            id,
            scope: scope.clone(),
            slot: slot_tx,
            buffer: buffer_rx,
            output,
        };

        let mut thread_builder =
            thread::Builder::new().name(format!("{}-{}", config.thread_name, id));
        if let Some(stack_size) = config.stack_size {
            thread_builder = thread_builder.stack_size(stack_size);
        }
        thread_builder
            .spawn(move || forwarder.run())
            .map_err(|err| Error::Spawn(err.to_string()))?;

        Ok(Self {
            id,
            buffer: buffer_tx,
            gate: Gate {
                partition: id,
                slot: slot_rx,
                scope: scope.clone(),
                stats,
            },
            release_on_drop: config.release_on_drop,
        })
    }

    pub(crate) fn id(&self) -> PartitionId {
        self.id
    }

    /// Wrap a value into an item bound to this partition's gate
    pub(crate) fn bind(&self, key: K, value: V) -> Item<K, V> {
        Item::bound(key, value, Ack::new(self.gate.clone(), self.release_on_drop))
    }

    /// Enqueue into the pending buffer, blocking while it is full
    pub(crate) fn put(
        &self,
        scopes: &[&Scope],
        item: Item<K, V>,
    ) -> std::result::Result<(), Interrupt> {
        channel::send(scopes, &self.buffer, item)
    }
}

/// The forwarding-thread half of a partition
struct Forwarder<K, V> {
    id: PartitionId,
    scope: Scope,
    slot: Sender<()>,
    buffer: Receiver<Item<K, V>>,
    output: Sender<Item<K, V>>,
}

impl<K, V> Forwarder<K, V>
where
    K: Send + 'static,
    V: Send + 'static,
{
    fn run(self) {
        let scopes = [&self.scope];

        let stage = loop {
            // Make sure only one item is in flight.
            if channel::send(&scopes, &self.slot, ()).is_err() {
                break Stage::AcquireSlot;
            }
            trace!(partition = self.id, "in-flight slot acquired");

            let mut item = match channel::recv(&scopes, &self.buffer) {
                Ok(item) => item,
                Err(_) => break Stage::AwaitItem,
            };

            item.arm();
            if channel::send(&scopes, &self.output, item).is_err() {
                break Stage::Deliver;
            }
        };

        debug!(partition = self.id, ?stage, "forwarding loop stopped");
    }
}
