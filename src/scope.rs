//! Cancellation scopes for blocking operations
//!
//! A [Scope] bounds how long a blocking call may wait. Scopes form a tree: a
//! child fires when its parent fires, when its [Canceler] is canceled or
//! dropped, or when its deadline passes.
//!
//! Each level of the tree contributes one signal channel. Nothing is ever sent
//! on it; the only sender lives inside the [Canceler], so dropping the
//! canceler disconnects the channel and wakes every thread selecting on it.
//!
//! ```rust
//! use partitioned_queue::Scope;
//! use std::time::Duration;
//!
//! let (scope, canceler) = Scope::background().with_timeout(Duration::from_secs(5));
//! assert!(!scope.is_canceled());
//!
//! canceler.cancel();
//! assert!(scope.is_canceled());
//! ```

use crate::error::Cause;
use crossbeam::channel::{self, Receiver, Select, Sender, TryRecvError};
use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// A cancellation and deadline context passed to every blocking call
#[derive(Clone)]
pub struct Scope {
    signals: Arc<[Receiver<()>]>,
    deadline: Option<Instant>,
}

impl Scope {
    /// A scope that never fires
    pub fn background() -> Self {
        Self {
            signals: Arc::from(Vec::new()),
            deadline: None,
        }
    }

    /// Derive a child that fires when `self` does or when the returned
    /// [Canceler] is canceled or dropped
    pub fn with_cancel(&self) -> (Scope, Canceler) {
        self.derive(self.deadline)
    }

    /// Derive a child that also fires at `deadline`
    ///
    /// A child never outlives its parent: if the parent already has an earlier
    /// deadline, that one is kept.
    pub fn with_deadline(&self, deadline: Instant) -> (Scope, Canceler) {
        let deadline = match self.deadline {
            Some(parent) if parent < deadline => parent,
            _ => deadline,
        };
        self.derive(Some(deadline))
    }

    /// Derive a child that also fires after `timeout` has elapsed
    pub fn with_timeout(&self, timeout: Duration) -> (Scope, Canceler) {
        self.with_deadline(Instant::now() + timeout)
    }

    fn derive(&self, deadline: Option<Instant>) -> (Scope, Canceler) {
        let (tx, rx) = channel::bounded(0);

        let mut signals = Vec::with_capacity(self.signals.len() + 1);
        signals.extend(self.signals.iter().cloned());
        signals.push(rx);

        let scope = Scope {
            signals: signals.into(),
            deadline,
        };
        (scope, Canceler { _signal: tx })
    }

    /// The instant at which this scope expires, if any
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Why this scope fired, or `None` while it is still live
    pub fn cause(&self) -> Option<Cause> {
        let disconnected = |signal: &Receiver<()>| {
            matches!(signal.try_recv(), Err(TryRecvError::Disconnected))
        };
        if self.signals.iter().any(disconnected) {
            return Some(Cause::Canceled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(Cause::DeadlineExceeded),
            _ => None,
        }
    }

    /// Returns true once the scope has fired
    pub fn is_canceled(&self) -> bool {
        self.cause().is_some()
    }

    /// Block the current thread until the scope fires
    ///
    /// Blocks forever on [Scope::background].
    pub fn wait(&self) -> Cause {
        if let Some(cause) = self.cause() {
            return cause;
        }

        if self.signals.is_empty() {
            return match self.deadline {
                Some(deadline) => {
                    thread::sleep(deadline.saturating_duration_since(Instant::now()));
                    Cause::DeadlineExceeded
                }
                None => loop {
                    thread::park();
                },
            };
        }

        let mut select = Select::new();
        for signal in self.signals.iter() {
            select.recv(signal);
        }

        let operation = match self.deadline {
            Some(deadline) => match select.select_deadline(deadline) {
                Ok(operation) => operation,
                Err(_) => return Cause::DeadlineExceeded,
            },
            None => select.select(),
        };

        // Operations are indexed in registration order.
        let signal = &self.signals[operation.index()];
        let _ = operation.recv(signal);
        Cause::Canceled
    }

    pub(crate) fn signals(&self) -> &[Receiver<()>] {
        &self.signals
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::background()
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("depth", &self.signals.len())
            .field("deadline", &self.deadline)
            .field("cause", &self.cause())
            .finish()
    }
}

/// Fires the [Scope] it was created with
///
/// Dropping a `Canceler` cancels its scope, so bind it to a named variable
/// (`_canceler`, not `_`) for as long as the scope should stay live.
pub struct Canceler {
    _signal: Sender<()>,
}

impl Canceler {
    /// Cancel the scope and every scope derived from it
    pub fn cancel(self) {}
}

impl fmt::Debug for Canceler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Canceler").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_background_never_fires() {
        let scope = Scope::background();
        assert_eq!(scope.cause(), None);
        assert_eq!(scope.deadline(), None);
    }

    #[test]
    fn test_cancel_fires_child() {
        let (scope, canceler) = Scope::background().with_cancel();
        assert!(!scope.is_canceled());

        canceler.cancel();
        assert_eq!(scope.cause(), Some(Cause::Canceled));
        assert_eq!(scope.wait(), Cause::Canceled);
    }

    #[test]
    fn test_drop_canceler_fires() {
        let (scope, canceler) = Scope::background().with_cancel();
        drop(canceler);
        assert!(scope.is_canceled());
    }

    #[test]
    fn test_parent_cancel_reaches_grandchild() {
        let (parent, parent_canceler) = Scope::background().with_cancel();
        let (child, _child_canceler) = parent.with_cancel();
        let (grandchild, _grandchild_canceler) = child.with_timeout(Duration::from_secs(60));

        parent_canceler.cancel();
        assert_eq!(child.cause(), Some(Cause::Canceled));
        assert_eq!(grandchild.cause(), Some(Cause::Canceled));
    }

    #[test]
    fn test_child_cancel_leaves_parent_live() {
        let (parent, _parent_canceler) = Scope::background().with_cancel();
        let (child, child_canceler) = parent.with_cancel();

        child_canceler.cancel();
        assert!(child.is_canceled());
        assert!(!parent.is_canceled());
    }

    #[test]
    fn test_timeout_expires() {
        let (scope, _canceler) = Scope::background().with_timeout(Duration::from_millis(10));
        assert_eq!(scope.wait(), Cause::DeadlineExceeded);
        assert_eq!(scope.cause(), Some(Cause::DeadlineExceeded));
    }

    #[test]
    fn test_child_keeps_earlier_parent_deadline() {
        let (parent, _parent_canceler) =
            Scope::background().with_timeout(Duration::from_millis(10));
        let (child, _child_canceler) = parent.with_timeout(Duration::from_secs(60));
        assert_eq!(child.deadline(), parent.deadline());
    }

    #[test]
    fn test_wait_wakes_on_cancel_from_other_thread() {
        let (scope, canceler) = Scope::background().with_cancel();

        let waiter = thread::spawn(move || scope.wait());
        thread::sleep(Duration::from_millis(20));
        canceler.cancel();

        assert_eq!(waiter.join().unwrap(), Cause::Canceled);
    }
}
