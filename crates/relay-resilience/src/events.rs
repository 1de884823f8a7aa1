//! Event system for observing the resilience managers.
//!
//! The managers emit events at their decision points; what to do with them is
//! the supervisor's business (log them, feed a
//! [`StatsRecorder`](crate::StatsRecorder), drive a status display). Emission
//! is synchronous and best-effort: a panicking listener is contained and never
//! disturbs the manager that emitted.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Events emitted by the resilience managers.
#[derive(Debug, Clone, PartialEq)]
pub enum ResilienceEvent {
    /// A reconnect delay was computed for the given attempt.
    ReconnectDelayComputed { attempt: u32, delay: Duration },
    /// The attempt budget is spent; no delay was produced.
    BackoffExhausted { attempts: u32 },
    /// The backoff state returned to its initial values.
    BackoffReset,
    /// A liveness probe was handed to the transport.
    ProbeSent,
    /// An inbound acknowledgment reset the heartbeat clock.
    AckRecorded,
    /// No acknowledgment arrived within the deadline; monitoring stopped and
    /// the timeout callback is about to run.
    HeartbeatTimedOut { elapsed: Duration },
    /// Monitoring was stopped explicitly.
    HeartbeatStopped,
    /// A subscription was recorded, or refreshed under an existing id.
    SubscriptionRecorded { id: String },
    /// A subscription was removed.
    SubscriptionRemoved { id: String },
    /// Aged-out subscriptions were pruned from the ledger.
    SubscriptionsPruned { removed: usize },
    /// Every subscription was dropped at once.
    SubscriptionsCleared,
}

impl ResilienceEvent {
    /// Returns the type of event as a string, for logging and filtering.
    pub fn event_type(&self) -> &'static str {
        match self {
            ResilienceEvent::ReconnectDelayComputed { .. } => "ReconnectDelayComputed",
            ResilienceEvent::BackoffExhausted { .. } => "BackoffExhausted",
            ResilienceEvent::BackoffReset => "BackoffReset",
            ResilienceEvent::ProbeSent => "ProbeSent",
            ResilienceEvent::AckRecorded => "AckRecorded",
            ResilienceEvent::HeartbeatTimedOut { .. } => "HeartbeatTimedOut",
            ResilienceEvent::HeartbeatStopped => "HeartbeatStopped",
            ResilienceEvent::SubscriptionRecorded { .. } => "SubscriptionRecorded",
            ResilienceEvent::SubscriptionRemoved { .. } => "SubscriptionRemoved",
            ResilienceEvent::SubscriptionsPruned { .. } => "SubscriptionsPruned",
            ResilienceEvent::SubscriptionsCleared => "SubscriptionsCleared",
        }
    }
}

/// A collection of event listeners shared by the managers.
///
/// Build the collection once, add listeners, and hand clones to each manager
/// via their `with_listeners` constructors. Cloning is cheap; listeners are
/// reference-counted.
///
/// # Examples
///
/// ```rust
/// use relay_resilience::{EventListeners, ResilienceEvent};
///
/// let mut listeners = EventListeners::new();
/// listeners.add(|event: &ResilienceEvent| {
///     println!("resilience event: {}", event.event_type());
/// });
/// ```
#[derive(Clone, Default)]
pub struct EventListeners {
    listeners: Vec<Arc<dyn Fn(&ResilienceEvent) + Send + Sync>>,
}

impl EventListeners {
    /// Creates an empty listener collection.
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    /// Adds a listener invoked for every emitted event.
    pub fn add<F>(&mut self, listener: F)
    where
        F: Fn(&ResilienceEvent) + Send + Sync + 'static,
    {
        self.listeners.push(Arc::new(listener));
    }

    /// Emits an event to all listeners.
    pub fn emit(&self, event: &ResilienceEvent) {
        for listener in &self.listeners {
            // Catch panics so one bad listener cannot take down the manager
            // loop or starve the remaining listeners.
            let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                listener(event);
            }));
        }
    }

    /// Returns the number of registered listeners.
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Returns `true` if no listeners are registered.
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl fmt::Debug for EventListeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventListeners")
            .field("len", &self.listeners.len())
            .finish()
    }
}
