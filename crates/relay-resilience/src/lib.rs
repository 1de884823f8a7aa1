//! Connection resilience for long-lived publish/subscribe clients.
//!
//! A client that stays subscribed to a remote message relay for hours has
//! three recurring problems: the transport drops and must be reopened
//! without hammering the relay, the transport dies silently and nobody
//! notices, and every reconnect forgets what the caller was subscribed to.
//! This crate provides the policy and bookkeeping for all three and leaves
//! the transport itself to the caller:
//!
//! - [`ReconnectBackoff`] decides how long to wait before the next attempt,
//!   with jittered super-exponential growth and an attempt budget.
//! - [`HeartbeatMonitor`] probes the transport on a cadence and reports,
//!   through a callback, when acknowledgments stop arriving.
//! - [`SubscriptionLedger`] remembers subscription intent so the supervisor
//!   can replay it after a reconnect.
//! - [`ConnectionState`], [`ResilienceStats`], and [`ResilienceEvent`] are
//!   the reporting surface a supervisor publishes from those outputs.
//!
//! All policy comes from one immutable [`ResilienceConfig`], built by hand
//! or taken from the [`aggressive`](ResilienceConfig::aggressive) and
//! [`conservative`](ResilienceConfig::conservative) presets. The crate
//! performs no I/O: probes, liveness checks, and reconnects all go through
//! supervisor-supplied callbacks, which keeps every piece testable without a
//! relay on the wire.
//!
//! # Examples
//!
//! ```rust
//! use relay_resilience::{ReconnectBackoff, ResilienceConfig, SubscriptionLedger};
//!
//! let config = ResilienceConfig::builder()
//!     .max_attempts(5)
//!     .build();
//!
//! let backoff = ReconnectBackoff::new(config);
//! let ledger: SubscriptionLedger<String> = SubscriptionLedger::new();
//!
//! ledger.record("timeline", vec!["kinds:[1]".to_string()]);
//!
//! // On disconnect: wait out the delay, then redial.
//! let delay = backoff.next_delay().expect("budget not spent yet");
//! assert!(delay >= std::time::Duration::from_millis(100));
//!
//! // On success: restore the budget and replay every recorded subscription.
//! backoff.reset();
//! for entry in ledger.entries() {
//!     // reissue entry.filters under entry.id
//! #   let _ = entry;
//! }
//! ```
//!
//! # Feature flags
//!
//! - `tracing`: structured logs at the managers' decision points.
//! - `metrics`: counters and gauges for reconnects, probes, and ledger size,
//!   labeled by the name given through each manager's `with_name`.

mod backoff;
mod config;
mod error;
mod events;
mod heartbeat;
mod state;
mod stats;
mod subscriptions;

pub use backoff::ReconnectBackoff;
pub use config::{ResilienceConfig, ResilienceConfigBuilder};
pub use error::{BoxError, ProbeError};
pub use events::{EventListeners, ResilienceEvent};
pub use heartbeat::HeartbeatMonitor;
pub use state::ConnectionState;
pub use stats::{ResilienceStats, StatsRecorder};
pub use subscriptions::{SubscriptionEntry, SubscriptionLedger};
