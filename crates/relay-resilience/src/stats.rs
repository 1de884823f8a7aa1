//! Aggregated reconnection and heartbeat statistics.

use crate::events::ResilienceEvent;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Point-in-time snapshot of what the resilience layer has been through.
///
/// The managers only define this shape; the numbers are accumulated by the
/// supervisor, typically through a [`StatsRecorder`]. A snapshot is detached:
/// it never changes after [`StatsRecorder::snapshot`] returns.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResilienceStats {
    /// Reconnect cycles finished, successful or not.
    pub total_reconnections: u64,
    /// Cycles that ended with an open transport.
    pub successful_reconnections: u64,
    /// Cycles that gave up.
    pub failed_reconnections: u64,
    /// Liveness probes handed to the transport.
    pub total_heartbeats_sent: u64,
    /// Acknowledgments recorded.
    pub total_heartbeats_received: u64,
    /// Mean time from losing the transport to getting it back, over
    /// successful cycles only. `None` before the first success.
    pub average_reconnection_time: Option<Duration>,
    /// When the transport was last lost.
    pub last_disconnection: Option<Instant>,
    /// When a reconnect last succeeded.
    pub last_reconnection: Option<Instant>,
    /// How long the current transport has been up, `None` while down.
    pub current_uptime: Option<Duration>,
}

/// Thread-safe accumulator behind [`ResilienceStats`].
///
/// The supervisor drives the reconnect-cycle markers directly and routes
/// manager events into [`observe`](StatsRecorder::observe) for the heartbeat
/// counters. Cloning returns a handle to the same tallies.
///
/// # Examples
///
/// ```rust
/// use relay_resilience::{EventListeners, StatsRecorder};
///
/// let recorder = StatsRecorder::new();
///
/// let mut listeners = EventListeners::new();
/// let sink = recorder.clone();
/// listeners.add(move |event| sink.observe(event));
/// // hand `listeners` to the managers via their `with_listeners`
/// ```
#[derive(Debug, Clone, Default)]
pub struct StatsRecorder {
    inner: Arc<Mutex<RecorderState>>,
}

#[derive(Debug, Default)]
struct RecorderState {
    total_reconnections: u64,
    successful_reconnections: u64,
    failed_reconnections: u64,
    heartbeats_sent: u64,
    heartbeats_received: u64,
    reconnect_time_total: Duration,
    last_disconnection: Option<Instant>,
    last_reconnection: Option<Instant>,
    connected_since: Option<Instant>,
}

impl StatsRecorder {
    /// Creates a recorder with all tallies at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the transport lost. Uptime stops accruing until the next
    /// successful reconnect.
    pub fn record_disconnection(&self) {
        let mut state = self.inner.lock().unwrap();
        state.last_disconnection = Some(Instant::now());
        state.connected_since = None;
    }

    /// Marks a reconnect cycle that ended with an open transport, with how
    /// long the whole cycle took.
    pub fn record_reconnect_success(&self, elapsed: Duration) {
        let mut state = self.inner.lock().unwrap();
        let now = Instant::now();
        state.total_reconnections += 1;
        state.successful_reconnections += 1;
        state.reconnect_time_total += elapsed;
        state.last_reconnection = Some(now);
        state.connected_since = Some(now);
    }

    /// Marks a reconnect cycle that gave up.
    pub fn record_reconnect_failure(&self) {
        let mut state = self.inner.lock().unwrap();
        state.total_reconnections += 1;
        state.failed_reconnections += 1;
    }

    /// Routes manager events into the heartbeat counters. Events other than
    /// probes and acks are ignored.
    pub fn observe(&self, event: &ResilienceEvent) {
        let mut state = self.inner.lock().unwrap();
        match event {
            ResilienceEvent::ProbeSent => state.heartbeats_sent += 1,
            ResilienceEvent::AckRecorded => state.heartbeats_received += 1,
            _ => {}
        }
    }

    /// Returns a detached snapshot. Averages and uptime are computed at read
    /// time.
    pub fn snapshot(&self) -> ResilienceStats {
        let state = self.inner.lock().unwrap();
        let average_reconnection_time = if state.successful_reconnections > 0 {
            let mean_nanos =
                state.reconnect_time_total.as_nanos() / u128::from(state.successful_reconnections);
            Some(Duration::from_nanos(mean_nanos as u64))
        } else {
            None
        };
        ResilienceStats {
            total_reconnections: state.total_reconnections,
            successful_reconnections: state.successful_reconnections,
            failed_reconnections: state.failed_reconnections,
            total_heartbeats_sent: state.heartbeats_sent,
            total_heartbeats_received: state.heartbeats_received,
            average_reconnection_time,
            last_disconnection: state.last_disconnection,
            last_reconnection: state.last_reconnection,
            current_uptime: state.connected_since.map(|since| since.elapsed()),
        }
    }
}
