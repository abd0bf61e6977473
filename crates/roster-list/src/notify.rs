//! Delivery of change notifications to observers and subscribers.
//!
//! Two delivery paths exist side by side:
//!
//! - **Observers** are called synchronously, in registration order, while the
//!   list is mid-operation. A begin-event reaches them before the backend is
//!   touched; the matching end-event after it settled.
//! - **Subscribers** receive clones of the same events over a
//!   `tokio::sync::broadcast` channel and read them whenever they like.

use roster_types::{ChangeEvent, ChangeKind};
use tokio::sync::broadcast;
use tracing::trace;

/// A synchronous receiver of change events.
pub trait ChangeObserver: Send {
    fn on_event(&mut self, event: &ChangeEvent);
}

impl<F> ChangeObserver for F
where
    F: FnMut(&ChangeEvent) + Send,
{
    fn on_event(&mut self, event: &ChangeEvent) {
        self(event)
    }
}

/// A broadcast channel receiver for change events.
pub type EventStream = broadcast::Receiver<ChangeEvent>;

/// Fan-out of one list's events.
pub struct Notifier {
    observers: Vec<Box<dyn ChangeObserver>>,
    sender: broadcast::Sender<ChangeEvent>,
    open: Option<ChangeKind>,
}

impl Notifier {
    /// Create a notifier whose subscriber channels buffer `capacity` events.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            observers: Vec::new(),
            sender,
            open: None,
        }
    }

    /// Register a synchronous observer.
    pub fn observe(&mut self, observer: Box<dyn ChangeObserver>) {
        self.observers.push(observer);
    }

    /// Open a new subscription. Only events emitted after this call are
    /// delivered.
    pub fn subscribe(&self) -> EventStream {
        self.sender.subscribe()
    }

    /// Number of registered observers.
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Deliver `event` to every observer, then to every subscriber.
    pub fn emit(&mut self, event: ChangeEvent) {
        if event.is_begin() {
            debug_assert!(self.open.is_none(), "nested bracket: {event}");
            self.open = event.kind();
        } else if event.is_end() {
            debug_assert_eq!(self.open, event.kind(), "unbalanced bracket: {event}");
            self.open = None;
        }
        trace!(%event, "emit");
        for observer in self.observers.iter_mut() {
            observer.on_event(&event);
        }
        if self.sender.receiver_count() > 0 {
            // Only fails when every receiver is gone; nothing to deliver then.
            let _ = self.sender.send(event);
        }
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("observers", &self.observers.len())
            .field("subscribers", &self.sender.receiver_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn observers_see_events_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut notifier = Notifier::new(8);
        notifier.observe(Box::new(move |e: &ChangeEvent| {
            sink.lock().unwrap().push(e.clone());
        }));

        notifier.emit(ChangeEvent::begin_insert(0..1));
        notifier.emit(ChangeEvent::EndInsert);

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![ChangeEvent::begin_insert(0..1), ChangeEvent::EndInsert]
        );
    }

    #[test]
    fn subscribers_receive_clones() {
        let mut notifier = Notifier::new(8);
        let mut rx = notifier.subscribe();
        assert_eq!(notifier.subscriber_count(), 1);

        notifier.emit(ChangeEvent::changed(2..3));
        assert_eq!(rx.try_recv().unwrap(), ChangeEvent::changed(2..3));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn late_subscriber_misses_earlier_events() {
        let mut notifier = Notifier::new(8);
        notifier.emit(ChangeEvent::BeginReset);
        notifier.emit(ChangeEvent::EndReset);
        let mut rx = notifier.subscribe();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn emitting_without_listeners_is_fine() {
        let mut notifier = Notifier::new(0);
        notifier.emit(ChangeEvent::HasMoreChanged { has_more: true });
        assert_eq!(notifier.observer_count(), 0);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "nested bracket")]
    fn nested_brackets_are_caught() {
        let mut notifier = Notifier::new(1);
        notifier.emit(ChangeEvent::begin_insert(0..1));
        notifier.emit(ChangeEvent::begin_remove(0..1));
    }
}
