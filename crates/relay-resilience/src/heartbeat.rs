//! Liveness monitoring for an open transport.
//!
//! A connection can die without the socket noticing: the transport stays
//! open while the far side stopped answering. [`HeartbeatMonitor`] catches
//! this by periodically handing a probe to a supervisor-supplied callback and
//! watching for acknowledgments reported through
//! [`record_ack`](HeartbeatMonitor::record_ack). When no acknowledgment
//! arrives within the deadline, a timeout callback runs exactly once and
//! monitoring stops; reconnecting and starting a fresh session is the
//! supervisor's move.

use crate::config::ResilienceConfig;
use crate::error::ProbeError;
use crate::events::{EventListeners, ResilienceEvent};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Periodic liveness prober for one connection session.
///
/// [`start`](HeartbeatMonitor::start) spawns a background loop that wakes
/// every `heartbeat_interval`. On each wake it first checks how long ago the
/// last acknowledgment arrived: silence longer than
/// `heartbeat_timeout + heartbeat_interval` means the connection is presumed
/// dead, the timeout callback runs, and the loop ends. Otherwise the loop
/// asks the liveness callback whether the transport still believes itself
/// open, sends a probe, and goes back to sleep. All shutdown paths leave the
/// monitor idle and ready for another `start`.
///
/// The monitor owns no transport. Probes, liveness checks, and the reaction
/// to a timeout all go through callbacks handed to `start`, so a session
/// over any transport can be monitored the same way.
///
/// # Examples
///
/// ```rust
/// use relay_resilience::{HeartbeatMonitor, ProbeError, ResilienceConfig};
///
/// # async fn example() {
/// let monitor = HeartbeatMonitor::new(ResilienceConfig::default());
///
/// monitor.start(
///     || async { Ok::<_, ProbeError>(()) }, // hand a probe to the transport
///     || true,                              // transport still believes itself open
///     || async { /* reconnect */ },         // silence exceeded the deadline
/// );
///
/// // Whenever the transport sees an inbound acknowledgment:
/// monitor.record_ack();
///
/// // On a clean disconnect:
/// monitor.stop();
/// # }
/// ```
pub struct HeartbeatMonitor {
    config: ResilienceConfig,
    name: String,
    shared: Arc<MonitorShared>,
    listeners: EventListeners,
}

#[derive(Debug)]
struct MonitorShared {
    monitoring: AtomicBool,
    last_ack: Mutex<Option<Instant>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl MonitorShared {
    /// Terminal shutdown performed from inside the monitor loop.
    fn shut_down(&self) {
        self.monitoring.store(false, Ordering::SeqCst);
        *self.last_ack.lock().unwrap() = None;
        // Detach the loop's own handle so a reentrant `stop` from inside the
        // timeout callback cannot abort the callback mid-flight.
        drop(self.task.lock().unwrap().take());
    }
}

impl HeartbeatMonitor {
    /// Creates an idle monitor.
    pub fn new(config: ResilienceConfig) -> Self {
        Self {
            config,
            name: String::from("<unnamed>"),
            shared: Arc::new(MonitorShared {
                monitoring: AtomicBool::new(false),
                last_ack: Mutex::new(None),
                task: Mutex::new(None),
            }),
            listeners: EventListeners::default(),
        }
    }

    /// Gives this monitor a human-readable name for observability.
    /// Default: `<unnamed>`.
    pub fn with_name<N: Into<String>>(mut self, name: N) -> Self {
        self.name = name.into();
        self
    }

    /// Attaches event listeners notified on probes, acks, timeouts, and
    /// stops.
    pub fn with_listeners(mut self, listeners: EventListeners) -> Self {
        self.listeners = listeners;
        self
    }

    /// Starts the monitoring loop for a fresh session.
    ///
    /// `send_probe` hands one liveness probe to the transport. `check_live`
    /// reports whether the transport still believes itself open; answering
    /// `false` ends monitoring silently, on the grounds that the transport's
    /// own error path is already driving a reconnect. `on_timeout` runs
    /// exactly once if silence outlasts the deadline or a probe fails, after
    /// the monitor has already returned to idle, so it may call `start`
    /// again for the next session.
    ///
    /// Calling `start` while a session is already being monitored is a
    /// no-op; the running session keeps its callbacks.
    ///
    /// # Panics
    ///
    /// Panics if called from outside a Tokio runtime.
    pub fn start<P, PFut, L, T, TFut>(&self, send_probe: P, check_live: L, on_timeout: T)
    where
        P: Fn() -> PFut + Send + 'static,
        PFut: Future<Output = Result<(), ProbeError>> + Send + 'static,
        L: Fn() -> bool + Send + 'static,
        T: FnOnce() -> TFut + Send + 'static,
        TFut: Future<Output = ()> + Send + 'static,
    {
        if self.shared.monitoring.swap(true, Ordering::SeqCst) {
            return;
        }
        *self.shared.last_ack.lock().unwrap() = Some(Instant::now());

        let shared = Arc::clone(&self.shared);
        let listeners = self.listeners.clone();
        let interval = self.config.heartbeat_interval;
        let deadline = self.config.heartbeat_timeout + interval;
        #[cfg(any(feature = "tracing", feature = "metrics"))]
        let name = self.name.clone();

        let task = tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;

                if !shared.monitoring.load(Ordering::SeqCst) {
                    // A stop raced this wake-up.
                    break;
                }

                let last_ack = *shared.last_ack.lock().unwrap();
                let Some(elapsed) = last_ack.map(|ack| ack.elapsed()) else {
                    break;
                };

                if elapsed > deadline {
                    shared.shut_down();
                    listeners.emit(&ResilienceEvent::HeartbeatTimedOut { elapsed });
                    #[cfg(feature = "tracing")]
                    tracing::debug!(
                        relay = %name,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "heartbeat: no ack within the deadline"
                    );
                    #[cfg(feature = "metrics")]
                    metrics::counter!(
                        "relay_heartbeat_timeouts_total",
                        "relay" => name.clone()
                    )
                    .increment(1);
                    on_timeout().await;
                    break;
                }

                if !check_live() {
                    // The transport already knows it is closed; its own error
                    // path reports that, not the timeout callback.
                    shared.shut_down();
                    break;
                }

                match send_probe().await {
                    Ok(()) => {
                        listeners.emit(&ResilienceEvent::ProbeSent);
                        #[cfg(feature = "tracing")]
                        tracing::trace!(relay = %name, "heartbeat: probe sent");
                        #[cfg(feature = "metrics")]
                        metrics::counter!(
                            "relay_heartbeat_probes_total",
                            "relay" => name.clone()
                        )
                        .increment(1);
                    }
                    Err(_err) => {
                        shared.shut_down();
                        listeners.emit(&ResilienceEvent::HeartbeatTimedOut { elapsed });
                        #[cfg(feature = "tracing")]
                        tracing::debug!(
                            relay = %name,
                            error = %_err,
                            "heartbeat: probe send failed"
                        );
                        #[cfg(feature = "metrics")]
                        metrics::counter!(
                            "relay_heartbeat_timeouts_total",
                            "relay" => name.clone()
                        )
                        .increment(1);
                        on_timeout().await;
                        break;
                    }
                }
            }
        });

        *self.shared.task.lock().unwrap() = Some(task);
    }

    /// Records an inbound acknowledgment, resetting the timeout clock.
    ///
    /// Acknowledgments arriving while the monitor is idle are ignored: an
    /// ack cannot revive a session that already timed out or was stopped.
    pub fn record_ack(&self) {
        let mut last_ack = self.shared.last_ack.lock().unwrap();
        if last_ack.is_some() {
            *last_ack = Some(Instant::now());
            drop(last_ack);
            self.listeners.emit(&ResilienceEvent::AckRecorded);
            #[cfg(feature = "tracing")]
            tracing::trace!(relay = %self.name, "heartbeat: ack recorded");
            #[cfg(feature = "metrics")]
            metrics::counter!(
                "relay_heartbeat_acks_total",
                "relay" => self.name.clone()
            )
            .increment(1);
        }
    }

    /// Stops monitoring and aborts the background loop. Safe to call at any
    /// time, from any thread; stopping an idle monitor is a no-op.
    pub fn stop(&self) {
        let was_monitoring = self.shared.monitoring.swap(false, Ordering::SeqCst);
        if let Some(task) = self.shared.task.lock().unwrap().take() {
            task.abort();
        }
        *self.shared.last_ack.lock().unwrap() = None;

        if was_monitoring {
            self.listeners.emit(&ResilienceEvent::HeartbeatStopped);
            #[cfg(feature = "tracing")]
            tracing::debug!(relay = %self.name, "heartbeat: monitoring stopped");
        }
    }

    /// Returns `true` while a session is being monitored.
    pub fn is_monitoring(&self) -> bool {
        self.shared.monitoring.load(Ordering::SeqCst)
    }

    /// When the last acknowledgment arrived, or `None` while idle.
    pub fn last_ack_at(&self) -> Option<Instant> {
        *self.shared.last_ack.lock().unwrap()
    }

    /// The policy this monitor runs under.
    pub fn config(&self) -> &ResilienceConfig {
        &self.config
    }
}

impl Drop for HeartbeatMonitor {
    fn drop(&mut self) {
        if let Ok(mut task) = self.shared.task.lock() {
            if let Some(task) = task.take() {
                task.abort();
            }
        }
    }
}

impl std::fmt::Debug for HeartbeatMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeartbeatMonitor")
            .field("name", &self.name)
            .field("monitoring", &self.is_monitoring())
            .finish()
    }
}
