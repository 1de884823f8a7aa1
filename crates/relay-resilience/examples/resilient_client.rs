//! A resilient relay client loop against a scripted flaky relay.
//!
//! The relay refuses the first two dials and stops answering liveness probes
//! after the third one, so one run shows the whole lifecycle: backoff-paced
//! reconnects, subscription replay, heartbeat acks, and a heartbeat timeout
//! that kicks off the next session. Run with:
//!
//! ```sh
//! cargo run --example resilient_client -p relay-resilience
//! ```

use relay_resilience::{
    ConnectionState, EventListeners, HeartbeatMonitor, ProbeError, ReconnectBackoff,
    ResilienceConfig, StatsRecorder, SubscriptionLedger,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Stand-in for a relay transport with a fixed script.
struct ScriptedRelay {
    dials: AtomicUsize,
    probes: AtomicUsize,
}

impl ScriptedRelay {
    fn new() -> Self {
        Self {
            dials: AtomicUsize::new(0),
            probes: AtomicUsize::new(0),
        }
    }

    /// Refuses the first two dials, accepts every one after that.
    fn dial(&self) -> bool {
        self.dials.fetch_add(1, Ordering::SeqCst) >= 2
    }

    /// Acks the first three probes of the process, then goes silent.
    fn probe(&self) -> bool {
        self.probes.fetch_add(1, Ordering::SeqCst) < 3
    }
}

/// Dials until the relay answers or the attempt budget runs out.
async fn connect(relay: &ScriptedRelay, backoff: &ReconnectBackoff) -> ConnectionState {
    loop {
        let attempt = backoff.attempts() + 1;
        if relay.dial() {
            backoff.reset();
            return ConnectionState::Connected {
                since: Instant::now(),
            };
        }
        match backoff.next_delay() {
            Some(delay) => {
                println!("  attempt {} refused, retrying in {:?}", attempt, delay);
                tokio::time::sleep(delay).await;
            }
            None => {
                return ConnectionState::Failed {
                    reason: format!("gave up after {} attempts", backoff.attempts()),
                };
            }
        }
    }
}

#[tokio::main]
async fn main() {
    let config = ResilienceConfig::builder()
        .initial_delay(Duration::from_millis(100))
        .max_delay(Duration::from_secs(1))
        .jitter_factor(0.2)
        .max_attempts(5)
        .heartbeat_interval(Duration::from_millis(300))
        .heartbeat_timeout(Duration::from_millis(150))
        .build();

    let recorder = StatsRecorder::new();
    let mut listeners = EventListeners::new();
    let sink = recorder.clone();
    listeners.add(move |event| sink.observe(event));
    listeners.add(|event| println!("  [event] {}", event.event_type()));

    let relay = Arc::new(ScriptedRelay::new());
    let backoff = ReconnectBackoff::new(config.clone())
        .with_name("relay.example.com")
        .with_listeners(listeners.clone());
    let monitor = Arc::new(
        HeartbeatMonitor::new(config.clone())
            .with_name("relay.example.com")
            .with_listeners(listeners),
    );

    let ledger: SubscriptionLedger<String> =
        SubscriptionLedger::new().with_name("relay.example.com");
    ledger.record(
        "timeline",
        vec!["kinds:[1,6]".to_string(), "limit:50".to_string()],
    );
    ledger.record("mentions", vec!["#p:self".to_string()]);

    let (timeout_tx, mut timeout_rx) = tokio::sync::mpsc::channel(1);

    for session in 1..=2 {
        println!("session {}: connecting", session);
        let started = Instant::now();
        let state = connect(&relay, &backoff).await;
        println!("session {}: {}", session, state);
        if state.is_terminal() {
            break;
        }
        recorder.record_reconnect_success(started.elapsed());

        if config.auto_resubscribe() {
            for entry in ledger.entries() {
                println!(
                    "session {}: replaying {} ({} filters)",
                    session,
                    entry.id,
                    entry.filters.len()
                );
            }
        }

        // Probes go out on the heartbeat cadence. The relay acks until its
        // script runs dry, and the timeout callback wakes this loop for the
        // next session.
        let probe_relay = Arc::clone(&relay);
        let probe_monitor = Arc::clone(&monitor);
        let tx = timeout_tx.clone();
        monitor.start(
            move || {
                let relay = Arc::clone(&probe_relay);
                let monitor = Arc::clone(&probe_monitor);
                async move {
                    if relay.probe() {
                        monitor.record_ack();
                    }
                    Ok::<_, ProbeError>(())
                }
            },
            || true,
            move || async move {
                let _ = tx.send(()).await;
            },
        );

        timeout_rx.recv().await;
        recorder.record_disconnection();
        println!("session {}: heartbeat timed out, transport presumed dead", session);
    }

    monitor.stop();

    println!("\nfinal stats: {:#?}", recorder.snapshot());
}
