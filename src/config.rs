//! Queue configuration

#[cfg(feature = "serialization")]
use serde::{Deserialize, Serialize};

/// Default capacity of each partition buffer (rendezvous)
pub const DEFAULT_PARTITION_CAPACITY: usize = 0;

/// Default capacity of the shared output buffer (rendezvous)
pub const DEFAULT_BUFFER_CAPACITY: usize = 0;

/// Queue configuration
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serialization", serde(default))]
pub struct Config {
    /// Items each partition buffers before `put` blocks
    pub partition_capacity: usize,

    /// Items the shared output buffers before forwarding blocks
    pub buffer_capacity: usize,

    /// Release the in-flight slot when a delivered item is dropped without
    /// being acknowledged, instead of stalling its partition
    pub release_on_drop: bool,

    /// Prefix for forwarding thread names
    pub thread_name: String,

    /// Stack size for forwarding threads (None = default)
    pub stack_size: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            partition_capacity: DEFAULT_PARTITION_CAPACITY,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            release_on_drop: false,
            thread_name: "partition".to_string(),
            stack_size: None,
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the buffer capacity of each partition
    ///
    /// Once a partition holds this many items, `put` blocks for that key
    /// until consumers make room. Zero makes it unbuffered.
    pub fn with_partition_capacity(mut self, capacity: usize) -> Self {
        self.partition_capacity = capacity;
        self
    }

    /// Set the shared output capacity
    ///
    /// The number of consumers is a good starting point. Zero makes it
    /// unbuffered.
    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    /// Release the in-flight slot when a delivered item is dropped
    pub fn with_release_on_drop(mut self, release: bool) -> Self {
        self.release_on_drop = release;
        self
    }

    /// Set the forwarding thread name prefix
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Set the forwarding thread stack size
    pub fn with_stack_size(mut self, size: usize) -> Self {
        self.stack_size = Some(size);
        self
    }
}
