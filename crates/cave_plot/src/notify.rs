//! Multi-subscriber change notifications over crossbeam channels.
//!
//! A [`Notifier`] is held by whatever emits changes (a cave, a region, a
//! manager). Observers call [`Notifier::subscribe`] and drain the returned
//! receiver from their own thread. Dropping the receiver unsubscribes; the
//! dead sender is pruned on the next emit. When the last clone of a notifier
//! is dropped, every receiver reports `Disconnected`, which observers use to
//! detect that the source is gone.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use crossbeam_channel::{self as channel, Receiver, Sender};

/// Cloneable event bus. Clones share one subscriber list.
pub struct Notifier<E> {
  subscribers: Arc<Mutex<Vec<Sender<E>>>>,
}

impl<E> Notifier<E> {
  pub fn new() -> Self {
    Self {
      subscribers: Arc::new(Mutex::new(Vec::new())),
    }
  }

  /// Register a new observer.
  pub fn subscribe(&self) -> Receiver<E> {
    let (sender, receiver) = channel::unbounded();
    self
      .subscribers
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .push(sender);
    receiver
  }

  /// Number of registered senders, including ones whose receiver was dropped
  /// since the last emit.
  pub fn subscriber_count(&self) -> usize {
    self
      .subscribers
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .len()
  }

  /// True when both handles share one subscriber list.
  pub fn same_bus(&self, other: &Notifier<E>) -> bool {
    Arc::ptr_eq(&self.subscribers, &other.subscribers)
  }
}

impl<E: Clone> Notifier<E> {
  /// Deliver an event to every live subscriber.
  pub fn emit(&self, event: E) {
    let mut subscribers = self
      .subscribers
      .lock()
      .unwrap_or_else(PoisonError::into_inner);
    subscribers.retain(|sender| sender.send(event.clone()).is_ok());
  }
}

impl<E> Clone for Notifier<E> {
  fn clone(&self) -> Self {
    Self {
      subscribers: Arc::clone(&self.subscribers),
    }
  }
}

impl<E> Default for Notifier<E> {
  fn default() -> Self {
    Self::new()
  }
}

impl<E> fmt::Debug for Notifier<E> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Notifier")
      .field("subscribers", &self.subscriber_count())
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use crossbeam_channel::TryRecvError;

  use super::*;

  #[test]
  fn test_every_subscriber_receives() {
    let notifier = Notifier::new();
    let a = notifier.subscribe();
    let b = notifier.subscribe();

    notifier.emit(7u32);

    assert_eq!(a.try_recv(), Ok(7));
    assert_eq!(b.try_recv(), Ok(7));
  }

  #[test]
  fn test_dropped_receiver_is_pruned() {
    let notifier = Notifier::new();
    let kept = notifier.subscribe();
    let dropped = notifier.subscribe();
    assert_eq!(notifier.subscriber_count(), 2);

    drop(dropped);
    notifier.emit(1u32);

    assert_eq!(notifier.subscriber_count(), 1);
    assert_eq!(kept.try_recv(), Ok(1));
  }

  #[test]
  fn test_dropping_all_clones_disconnects() {
    let notifier = Notifier::<u32>::new();
    let clone = notifier.clone();
    let receiver = notifier.subscribe();

    drop(notifier);
    assert_eq!(receiver.try_recv(), Err(TryRecvError::Empty));

    drop(clone);
    assert_eq!(receiver.try_recv(), Err(TryRecvError::Disconnected));
  }
}
