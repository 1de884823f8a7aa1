//! Reconnect delay calculation: jittered exponential backoff with an attempt
//! budget.

use crate::config::ResilienceConfig;
use crate::events::{EventListeners, ResilienceEvent};
use rand::RngExt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Floor applied to every returned delay, in seconds.
const MIN_DELAY_SECS: f64 = 0.1;

/// Stateful delay calculator for reconnect attempts.
///
/// Each call to [`next_delay`](ReconnectBackoff::next_delay) consumes one
/// attempt from the budget and returns how long to wait before dialing again,
/// with uniform jitter applied so a fleet of clients dropped by the same
/// relay outage does not dial back in lockstep. Once the budget is spent it
/// returns `None` until [`reset`](ReconnectBackoff::reset).
///
/// Growth is steeper than textbook exponential backoff: the stored delay
/// already carries the scaling from earlier calls and is scaled again by
/// `multiplier^(attempt - 1)`, so the sequence races to `max_delay` within a
/// few attempts. With the default config the pre-jitter delays run 1s, 2s,
/// 8s, then pin at 60s. Long-lived clients want exactly that shape: probe
/// quickly at first, then get out of the relay's way.
///
/// Cloning returns a handle to the same state, so a reconnect timer and a
/// manual "retry now" path serialize on one attempt counter.
///
/// # Examples
///
/// ```rust
/// use relay_resilience::{ReconnectBackoff, ResilienceConfig};
///
/// let backoff = ReconnectBackoff::new(ResilienceConfig::default());
///
/// while let Some(delay) = backoff.next_delay() {
///     // wait out `delay`, redial, and on success:
///     backoff.reset();
///     break;
/// }
/// ```
pub struct ReconnectBackoff {
    config: ResilienceConfig,
    name: String,
    state: Arc<Mutex<BackoffState>>,
    listeners: EventListeners,
}

#[derive(Debug)]
struct BackoffState {
    attempts: u32,
    current_delay: Duration,
}

impl ReconnectBackoff {
    /// Creates a backoff calculator with a fresh attempt budget.
    pub fn new(config: ResilienceConfig) -> Self {
        let initial_delay = config.initial_delay;
        Self {
            config,
            name: String::from("<unnamed>"),
            state: Arc::new(Mutex::new(BackoffState {
                attempts: 0,
                current_delay: initial_delay,
            })),
            listeners: EventListeners::default(),
        }
    }

    /// Gives this calculator a human-readable name for observability.
    /// Default: `<unnamed>`.
    pub fn with_name<N: Into<String>>(mut self, name: N) -> Self {
        self.name = name.into();
        self
    }

    /// Attaches event listeners notified on every computed delay, exhaustion,
    /// and reset.
    pub fn with_listeners(mut self, listeners: EventListeners) -> Self {
        self.listeners = listeners;
        self
    }

    /// Consumes one attempt and returns the jittered delay to wait before the
    /// next reconnect, or `None` when the budget is spent.
    ///
    /// An exhausted call mutates nothing, so polling after exhaustion is
    /// harmless and [`reset`](ReconnectBackoff::reset) still restores the
    /// full budget.
    pub fn next_delay(&self) -> Option<Duration> {
        let mut state = self.state.lock().unwrap();
        if state.attempts >= self.config.max_attempts {
            let attempts = state.attempts;
            drop(state);
            self.listeners
                .emit(&ResilienceEvent::BackoffExhausted { attempts });
            #[cfg(feature = "tracing")]
            tracing::debug!(
                relay = %self.name,
                attempts,
                "backoff: attempt budget exhausted"
            );
            #[cfg(feature = "metrics")]
            metrics::counter!(
                "relay_backoff_exhausted_total",
                "relay" => self.name.clone()
            )
            .increment(1);
            return None;
        }

        state.attempts += 1;
        let attempt = state.attempts;

        // The stored delay is scaled by the full multiplier ladder again, not
        // just one multiplier step, so growth compounds twice per attempt.
        let factor = self.config.backoff_multiplier.powi(attempt as i32 - 1);
        let scaled = state.current_delay.as_secs_f64() * factor;
        let base = scaled.min(self.config.max_delay.as_secs_f64());
        state.current_delay = Duration::from_secs_f64(base);
        drop(state);

        let spread = base * self.config.jitter_factor;
        let jittered = if spread > 0.0 {
            rand::rng().random_range(base - spread..=base + spread)
        } else {
            base
        };
        let delay = Duration::from_secs_f64(jittered.max(MIN_DELAY_SECS));

        self.listeners
            .emit(&ResilienceEvent::ReconnectDelayComputed { attempt, delay });
        #[cfg(feature = "tracing")]
        tracing::debug!(
            relay = %self.name,
            attempt,
            delay_ms = delay.as_millis() as u64,
            "backoff: reconnect delay computed"
        );
        #[cfg(feature = "metrics")]
        {
            metrics::counter!(
                "relay_reconnect_delays_total",
                "relay" => self.name.clone()
            )
            .increment(1);
            metrics::gauge!(
                "relay_reconnect_attempts",
                "relay" => self.name.clone()
            )
            .set(attempt as f64);
        }

        Some(delay)
    }

    /// Restores the initial delay and the full attempt budget. Call this
    /// after a successful reconnect.
    pub fn reset(&self) {
        let mut state = self.state.lock().unwrap();
        state.attempts = 0;
        state.current_delay = self.config.initial_delay;
        drop(state);

        self.listeners.emit(&ResilienceEvent::BackoffReset);
        #[cfg(feature = "tracing")]
        tracing::debug!(relay = %self.name, "backoff: reset");
        #[cfg(feature = "metrics")]
        metrics::gauge!(
            "relay_reconnect_attempts",
            "relay" => self.name.clone()
        )
        .set(0.0);
    }

    /// Attempts consumed since the last reset.
    pub fn attempts(&self) -> u32 {
        self.state.lock().unwrap().attempts
    }

    /// The stored pre-jitter delay the next attempt will scale from.
    pub fn current_delay(&self) -> Duration {
        self.state.lock().unwrap().current_delay
    }

    /// Returns `true` once the attempt budget is spent.
    pub fn is_exhausted(&self) -> bool {
        self.state.lock().unwrap().attempts >= self.config.max_attempts
    }

    /// The policy this calculator runs under.
    pub fn config(&self) -> &ResilienceConfig {
        &self.config
    }
}

impl Clone for ReconnectBackoff {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            name: self.name.clone(),
            state: Arc::clone(&self.state),
            listeners: self.listeners.clone(),
        }
    }
}

impl std::fmt::Debug for ReconnectBackoff {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock().unwrap();
        f.debug_struct("ReconnectBackoff")
            .field("name", &self.name)
            .field("attempts", &state.attempts)
            .field("current_delay", &state.current_delay)
            .finish()
    }
}
