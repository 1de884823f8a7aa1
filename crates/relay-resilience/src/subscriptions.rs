//! Replay ledger for subscription intent.
//!
//! A reconnect gives the client a blank session: the relay forgot every
//! subscription the moment the transport dropped. The ledger remembers what
//! the caller subscribed to, keyed by a caller-chosen id, so the supervisor
//! can replay the whole set against the fresh connection without the caller
//! re-expressing anything.
//!
//! Filter descriptors are opaque to the ledger: stored as given, returned
//! verbatim, never interpreted.

use crate::events::{EventListeners, ResilienceEvent};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// A recorded subscription, as returned by snapshots.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionEntry<F> {
    /// Caller-chosen identifier; equal ids denote the same subscription.
    pub id: String,
    /// Opaque filter descriptors, exactly as recorded.
    pub filters: Vec<F>,
    /// When the entry was recorded, refreshed on re-record.
    pub recorded_at: Instant,
}

#[derive(Debug)]
struct LedgerEntry<F> {
    filters: Vec<F>,
    recorded_at: Instant,
}

/// Thread-safe ledger of active subscriptions, generic over the filter type.
///
/// Cloning returns a handle to the same ledger, so the piece of the client
/// that issues subscriptions and the supervisor that replays them share one
/// view. The ledger deliberately outlives any single connection.
///
/// # Examples
///
/// ```rust
/// use relay_resilience::SubscriptionLedger;
///
/// let ledger: SubscriptionLedger<String> = SubscriptionLedger::new();
/// ledger.record("timeline", vec!["kinds:[1]".to_string()]);
/// ledger.record("mentions", vec!["#p:self".to_string()]);
///
/// // After a reconnect, replay everything still on the books.
/// for entry in ledger.entries() {
///     // reissue entry.filters under entry.id
/// #   let _ = entry;
/// }
/// assert_eq!(ledger.len(), 2);
/// ```
pub struct SubscriptionLedger<F> {
    name: String,
    entries: Arc<Mutex<HashMap<String, LedgerEntry<F>>>>,
    listeners: EventListeners,
}

impl<F> SubscriptionLedger<F> {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self {
            name: String::from("<unnamed>"),
            entries: Arc::new(Mutex::new(HashMap::new())),
            listeners: EventListeners::default(),
        }
    }

    /// Gives this ledger a human-readable name for observability.
    /// Default: `<unnamed>`.
    pub fn with_name<N: Into<String>>(mut self, name: N) -> Self {
        self.name = name.into();
        self
    }

    /// Attaches event listeners notified on every ledger change.
    pub fn with_listeners(mut self, listeners: EventListeners) -> Self {
        self.listeners = listeners;
        self
    }

    /// Records a subscription under `id`, replacing any previous entry with
    /// the same id and refreshing its timestamp.
    pub fn record(&self, id: impl Into<String>, filters: Vec<F>) {
        let id = id.into();
        let mut entries = self.entries.lock().unwrap();
        entries.insert(
            id.clone(),
            LedgerEntry {
                filters,
                recorded_at: Instant::now(),
            },
        );
        #[cfg(feature = "metrics")]
        let count = entries.len();
        drop(entries);

        self.listeners
            .emit(&ResilienceEvent::SubscriptionRecorded { id: id.clone() });
        #[cfg(feature = "tracing")]
        tracing::debug!(relay = %self.name, id = %id, "subscriptions: recorded");
        #[cfg(feature = "metrics")]
        metrics::gauge!(
            "relay_subscriptions",
            "relay" => self.name.clone()
        )
        .set(count as f64);
    }

    /// Removes the subscription recorded under `id`, returning whether it was
    /// present. Removing an unknown id is a no-op.
    pub fn remove(&self, id: &str) -> bool {
        let mut entries = self.entries.lock().unwrap();
        let removed = entries.remove(id).is_some();
        #[cfg(feature = "metrics")]
        let count = entries.len();
        drop(entries);

        if removed {
            self.listeners.emit(&ResilienceEvent::SubscriptionRemoved {
                id: id.to_string(),
            });
            #[cfg(feature = "tracing")]
            tracing::debug!(relay = %self.name, id = %id, "subscriptions: removed");
            #[cfg(feature = "metrics")]
            metrics::gauge!(
                "relay_subscriptions",
                "relay" => self.name.clone()
            )
            .set(count as f64);
        }
        removed
    }

    /// Drops every entry at least `age` old, returning how many were removed.
    ///
    /// An entry exactly `age` old is dropped. Useful before a replay, so a
    /// client that was offline for hours does not reissue interest nobody
    /// holds anymore.
    pub fn prune_older_than(&self, age: Duration) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|_, entry| now.duration_since(entry.recorded_at) < age);
        let removed = before - entries.len();
        #[cfg(feature = "metrics")]
        let count = entries.len();
        drop(entries);

        if removed > 0 {
            self.listeners
                .emit(&ResilienceEvent::SubscriptionsPruned { removed });
            #[cfg(feature = "tracing")]
            tracing::debug!(
                relay = %self.name,
                removed,
                "subscriptions: pruned aged entries"
            );
            #[cfg(feature = "metrics")]
            metrics::gauge!(
                "relay_subscriptions",
                "relay" => self.name.clone()
            )
            .set(count as f64);
        }
        removed
    }

    /// Drops every entry.
    pub fn clear(&self) {
        let mut entries = self.entries.lock().unwrap();
        let had_entries = !entries.is_empty();
        entries.clear();
        drop(entries);

        if had_entries {
            self.listeners.emit(&ResilienceEvent::SubscriptionsCleared);
            #[cfg(feature = "tracing")]
            tracing::debug!(relay = %self.name, "subscriptions: cleared");
            #[cfg(feature = "metrics")]
            metrics::gauge!(
                "relay_subscriptions",
                "relay" => self.name.clone()
            )
            .set(0.0);
        }
    }

    /// Number of recorded subscriptions.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    /// Returns `true` when nothing is recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }
}

impl<F: Clone> SubscriptionLedger<F> {
    /// Snapshot of every recorded subscription, for replay. Order is not
    /// significant.
    pub fn entries(&self) -> Vec<SubscriptionEntry<F>> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .map(|(id, entry)| SubscriptionEntry {
                id: id.clone(),
                filters: entry.filters.clone(),
                recorded_at: entry.recorded_at,
            })
            .collect()
    }

    /// Snapshot of the subscription recorded under `id`, if any.
    pub fn get(&self, id: &str) -> Option<SubscriptionEntry<F>> {
        self.entries
            .lock()
            .unwrap()
            .get(id)
            .map(|entry| SubscriptionEntry {
                id: id.to_string(),
                filters: entry.filters.clone(),
                recorded_at: entry.recorded_at,
            })
    }
}

impl<F> Clone for SubscriptionLedger<F> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            entries: Arc::clone(&self.entries),
            listeners: self.listeners.clone(),
        }
    }
}

impl<F> Default for SubscriptionLedger<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F> fmt::Debug for SubscriptionLedger<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionLedger")
            .field("name", &self.name)
            .field("len", &self.len())
            .finish()
    }
}
