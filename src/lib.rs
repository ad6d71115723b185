//! # Partitioned Queue
//!
//! An in-process blocking queue that processes partitioned items in order.
//!
//! Producers put values into the queue along with a partition key, and a set
//! of consumers takes them from a single shared output. Values with the same
//! key are delivered in the order they were put, and only one of them can be
//! out with a consumer at a time: a consumer signals it is done with an item,
//! which lets the next item of that partition through, possibly to another
//! consumer. Items with different keys are consumed in parallel.
//!
//! ## Architecture
//!
//! ```text
//!                ┌──────────────────┐
//!  put(k1, v) ──▶│ partition k1     │──┐
//!                │ buffer ▶ [slot]  │  │     ┌────────┐
//!                └──────────────────┘  ├───▶ │ output │ ───▶ get() ───▶ consumers
//!                ┌──────────────────┐  │     └────────┘                 │
//!  put(k2, v) ──▶│ partition k2     │──┘                                │
//!                │ buffer ▶ [slot]  │ ◀────────── item.done() ──────────┘
//!                └──────────────────┘
//! ```
//!
//! Every blocking call takes a [Scope] that bounds how long it may wait. The
//! queue itself lives until the scope it was built with fires.
//!
//! ## Example
//!
//! ```rust
//! use partitioned_queue::prelude::*;
//! use std::time::Duration;
//!
//! let (lifetime, _stop) = Scope::background().with_cancel();
//! let queue = Queue::new(&lifetime, Config::new().with_partition_capacity(4));
//!
//! let (scope, _timeout) = Scope::background().with_timeout(Duration::from_secs(1));
//! queue.put(&scope, "user-1", 10)?;
//! queue.put(&scope, "user-1", 11)?;
//!
//! let item = queue.get(&scope)?;
//! assert_eq!(*item.value(), 10);
//! // Must call done, otherwise no more items from "user-1" are delivered.
//! item.done();
//!
//! let item = queue.get(&scope)?;
//! assert_eq!(*item.value(), 11);
//! item.done();
//! # Ok::<(), partitioned_queue::Error>(())
//! ```

#![warn(missing_docs, rust_2018_idioms)]

mod channel;
pub mod config;
pub mod error;
pub mod item;
mod partition;
pub mod queue;
pub mod scope;
pub mod stats;

// Re-exports
pub use config::Config;
pub use error::{Cause, Error, Result};
pub use item::{Ack, Item};
pub use queue::Queue;
pub use scope::{Canceler, Scope};
pub use stats::QueueStats;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Cause, Error, Result};
    pub use crate::item::{Ack, Item};
    pub use crate::queue::Queue;
    pub use crate::scope::{Canceler, Scope};
}
