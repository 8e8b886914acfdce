//! Bounded hop between two pipeline stages.
//!
//! Sends never wait for downstream capacity: a full relay drops the item and
//! hands it back to the caller for logging. This bounds memory and keeps a
//! slow store from stalling the listener, at the cost of losing items under
//! sustained overload.

use metrics::counter;
use tokio::sync::mpsc::{self, error::TrySendError};

/// Outcome of [`Relay::offer`].
#[derive(Debug, PartialEq, Eq)]
pub enum Offer<T> {
    /// Enqueued for the next stage.
    Sent,
    /// The relay was full; the item is returned and will not be retried.
    Dropped(T),
    /// The receiving stage has stopped.
    Closed(T),
}

/// Sending half of a relay.
pub struct Relay<T> {
    hop: &'static str,
    sender: mpsc::Sender<T>,
}

impl<T> Clone for Relay<T> {
    fn clone(&self) -> Self {
        Self {
            hop: self.hop,
            sender: self.sender.clone(),
        }
    }
}

/// Create a relay named `hop` holding at most `capacity` in-flight items.
///
/// A zero capacity is raised to one.
pub fn relay<T>(hop: &'static str, capacity: usize) -> (Relay<T>, mpsc::Receiver<T>) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    (Relay { hop, sender }, receiver)
}

impl<T> Relay<T> {
    /// Enqueue without blocking.
    pub fn offer(&self, item: T) -> Offer<T> {
        match self.sender.try_send(item) {
            Ok(()) => Offer::Sent,
            Err(TrySendError::Full(item)) => {
                counter!("ingest_relay_dropped_total", "hop" => self.hop).increment(1);
                Offer::Dropped(item)
            }
            Err(TrySendError::Closed(item)) => Offer::Closed(item),
        }
    }

    pub fn hop(&self) -> &'static str {
        self.hop
    }
}
