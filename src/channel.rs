//! Scope-aware blocking operations over bounded crossbeam channels
//!
//! Every blocking step in the queue (buffering a put, acquiring the in-flight
//! slot, delivering to the output, taking from the output) is a single
//! crossbeam selection over the data channel, the signal channel of every
//! watched scope, and the nearest deadline among them. A selection completes
//! exactly one operation, so a message is either handed over or the call is
//! interrupted, never both.

use crate::error::Cause;
use crate::scope::Scope;
use crossbeam::channel::{Receiver, Select, SelectedOperation, Sender};

/// Why a blocking channel operation stopped without completing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Interrupt {
    /// The scope at `index` of the watched slice fired
    Fired { index: usize, cause: Cause },

    /// The other side of the channel is gone
    Disconnected,
}

/// Send `msg` on `tx`, blocking until there is room or a scope fires
///
/// On interruption the message is dropped without having been handed over.
pub(crate) fn send<T>(scopes: &[&Scope], tx: &Sender<T>, msg: T) -> Result<(), Interrupt> {
    fired(scopes)?;

    let mut select = Select::new();
    let data = select.send(tx);
    let operation = select_or_fire(scopes, &mut select, data)?;

    operation.send(tx, msg).map_err(|_| Interrupt::Disconnected)
}

/// Receive from `rx`, blocking until a value arrives or a scope fires
pub(crate) fn recv<T>(scopes: &[&Scope], rx: &Receiver<T>) -> Result<T, Interrupt> {
    fired(scopes)?;

    let mut select = Select::new();
    let data = select.recv(rx);
    let operation = select_or_fire(scopes, &mut select, data)?;

    operation.recv(rx).map_err(|_| Interrupt::Disconnected)
}

fn fired(scopes: &[&Scope]) -> Result<(), Interrupt> {
    for (index, scope) in scopes.iter().enumerate() {
        if let Some(cause) = scope.cause() {
            return Err(Interrupt::Fired { index, cause });
        }
    }
    Ok(())
}

/// Wait until either the data operation at `data` or a scope is ready
///
/// Returns the selected data operation for the caller to complete. A selected
/// signal operation is completed here.
fn select_or_fire<'a>(
    scopes: &[&'a Scope],
    select: &mut Select<'a>,
    data: usize,
) -> Result<SelectedOperation<'a>, Interrupt> {
    let mut signals = Vec::new();
    for (index, &scope) in scopes.iter().enumerate() {
        for signal in scope.signals() {
            signals.push((select.recv(signal), index, signal));
        }
    }

    let nearest = scopes
        .iter()
        .enumerate()
        .filter_map(|(index, scope)| scope.deadline().map(|deadline| (deadline, index)))
        .min();

    let operation = match nearest {
        Some((deadline, index)) => match select.select_deadline(deadline) {
            Ok(operation) => operation,
            Err(_) => {
                return Err(Interrupt::Fired {
                    index,
                    cause: Cause::DeadlineExceeded,
                })
            }
        },
        None => select.select(),
    };

    let selected = operation.index();
    if selected == data {
        return Ok(operation);
    }

    // Selected operations must be completed with their own channel.
    match signals.iter().find(|(signal_index, _, _)| *signal_index == selected) {
        Some(&(_, index, signal)) => {
            let _ = operation.recv(signal);
            Err(Interrupt::Fired {
                index,
                cause: Cause::Canceled,
            })
        }
        None => unreachable!("selected an operation that was never registered"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam::channel;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_send_and_recv_with_room() {
        let (tx, rx) = channel::bounded(1);
        let scope = Scope::background();

        send(&[&scope], &tx, 42).unwrap();
        assert_eq!(recv(&[&scope], &rx).unwrap(), 42);
    }

    #[test]
    fn test_recv_times_out_on_empty_channel() {
        let (_tx, rx) = channel::bounded::<u32>(1);
        let (scope, _canceler) = Scope::background().with_timeout(Duration::from_millis(10));

        let err = recv(&[&scope], &rx).unwrap_err();
        assert_eq!(
            err,
            Interrupt::Fired {
                index: 0,
                cause: Cause::DeadlineExceeded
            }
        );
    }

    #[test]
    fn test_rendezvous_send_blocks_without_receiver() {
        let (tx, _rx) = channel::bounded(0);
        let (scope, _canceler) = Scope::background().with_timeout(Duration::from_millis(10));

        assert!(send(&[&scope], &tx, 1).is_err());
    }

    #[test]
    fn test_rendezvous_send_meets_receiver() {
        let (tx, rx) = channel::bounded(0);
        let receiver = thread::spawn(move || rx.recv().unwrap());

        let (scope, _canceler) = Scope::background().with_timeout(Duration::from_secs(5));
        send(&[&scope], &tx, 7).unwrap();
        assert_eq!(receiver.join().unwrap(), 7);
    }

    #[test]
    fn test_reports_which_scope_fired() {
        let (_tx, rx) = channel::bounded::<u32>(1);
        let caller = Scope::background();
        let (owner, canceler) = Scope::background().with_cancel();

        let waiter = thread::spawn(move || recv(&[&caller, &owner], &rx));
        thread::sleep(Duration::from_millis(20));
        canceler.cancel();

        assert_eq!(
            waiter.join().unwrap().unwrap_err(),
            Interrupt::Fired {
                index: 1,
                cause: Cause::Canceled
            }
        );
    }

    #[test]
    fn test_fired_scope_fails_without_waiting() {
        let (tx, rx) = channel::bounded(8);
        let (scope, canceler) = Scope::background().with_cancel();
        canceler.cancel();

        assert!(send(&[&scope], &tx, 1).is_err());
        assert!(rx.is_empty());
    }

    #[test]
    fn test_disconnected_receiver() {
        let (tx, rx) = channel::bounded::<u32>(0);
        drop(rx);
        let scope = Scope::background();

        assert_eq!(send(&[&scope], &tx, 1), Err(Interrupt::Disconnected));
    }

    #[test]
    fn test_interrupted_rendezvous_send_is_never_received() {
        let (tx, rx) = channel::bounded::<u32>(0);
        let sent = Arc::new(AtomicUsize::new(0));
        let total = 5_000;

        let sender = {
            let sent = Arc::clone(&sent);
            thread::spawn(move || {
                for i in 0..total {
                    let (scope, _canceler) =
                        Scope::background().with_timeout(Duration::from_micros(10));
                    if send(&[&scope], &tx, i).is_ok() {
                        sent.fetch_add(1, Ordering::Relaxed);
                    }
                }
            })
        };

        let mut received = 0;
        while rx.recv().is_ok() {
            received += 1;
        }
        sender.join().unwrap();

        assert_eq!(received, sent.load(Ordering::Relaxed));
    }
}
