//! A miniature connection supervisor wired the way a real relay client would
//! be: dial under backoff, replay subscriptions, monitor liveness, and keep
//! the books on what happened.

use relay_resilience::{
    ConnectionState, EventListeners, HeartbeatMonitor, ProbeError, ReconnectBackoff,
    ResilienceConfig, StatsRecorder, SubscriptionLedger,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Transport stub that refuses the first `refusals` dials and accepts the
/// rest.
struct FlakyRelay {
    refusals: usize,
    dials: AtomicUsize,
    subscribed: Mutex<Vec<String>>,
}

impl FlakyRelay {
    fn new(refusals: usize) -> Self {
        Self {
            refusals,
            dials: AtomicUsize::new(0),
            subscribed: Mutex::new(Vec::new()),
        }
    }

    fn dial(&self) -> bool {
        self.dials.fetch_add(1, Ordering::SeqCst) >= self.refusals
    }

    fn subscribe(&self, id: &str) {
        self.subscribed.lock().unwrap().push(id.to_string());
    }
}

/// One reconnect cycle: wait out each delay, dial, and either come back
/// connected or park in `Failed` once the budget is spent.
async fn run_reconnect_cycle(
    relay: &FlakyRelay,
    backoff: &ReconnectBackoff,
    trace: &mut Vec<ConnectionState>,
) -> ConnectionState {
    loop {
        let Some(delay) = backoff.next_delay() else {
            let state = ConnectionState::Failed {
                reason: format!("gave up after {} attempts", backoff.attempts()),
            };
            trace.push(state.clone());
            return state;
        };
        let attempt = backoff.attempts();
        if attempt > 1 {
            trace.push(ConnectionState::Reconnecting {
                attempt: attempt - 1,
                next_retry_at: Instant::now() + delay,
            });
        }
        tokio::time::sleep(delay).await;
        trace.push(ConnectionState::Connecting { attempt });
        if relay.dial() {
            backoff.reset();
            let state = ConnectionState::Connected {
                since: Instant::now(),
            };
            trace.push(state.clone());
            return state;
        }
    }
}

fn kind(state: &ConnectionState) -> &'static str {
    match state {
        ConnectionState::Disconnected => "disconnected",
        ConnectionState::Connecting { .. } => "connecting",
        ConnectionState::Connected { .. } => "connected",
        ConnectionState::Reconnecting { .. } => "reconnecting",
        ConnectionState::Failed { .. } => "failed",
    }
}

#[tokio::test(start_paused = true)]
async fn a_reconnect_cycle_replays_recorded_subscriptions() {
    let config = ResilienceConfig::builder()
        .initial_delay(Duration::from_millis(200))
        .max_delay(Duration::from_secs(2))
        .jitter_factor(0.0)
        .max_attempts(5)
        .build();

    let relay = FlakyRelay::new(2);
    let backoff = ReconnectBackoff::new(config.clone());
    let ledger: SubscriptionLedger<String> = SubscriptionLedger::new();
    ledger.record("timeline", vec!["kinds:[1]".to_string()]);
    ledger.record("mentions", vec!["#p:self".to_string()]);

    let mut trace = vec![ConnectionState::Disconnected];
    let state = run_reconnect_cycle(&relay, &backoff, &mut trace).await;

    assert!(state.is_connected());
    assert_eq!(relay.dials.load(Ordering::SeqCst), 3);
    // Success restored the budget for the next outage.
    assert_eq!(backoff.attempts(), 0);

    if config.auto_resubscribe() {
        for entry in ledger.entries() {
            relay.subscribe(&entry.id);
        }
    }
    let mut subscribed = relay.subscribed.lock().unwrap().clone();
    subscribed.sort();
    assert_eq!(subscribed, vec!["mentions", "timeline"]);

    let kinds: Vec<&str> = trace.iter().map(kind).collect();
    assert_eq!(
        kinds,
        vec![
            "disconnected",
            "connecting",
            "reconnecting",
            "connecting",
            "reconnecting",
            "connecting",
            "connected",
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn budget_exhaustion_parks_the_connection_in_failed() {
    let config = ResilienceConfig::builder()
        .initial_delay(Duration::from_millis(100))
        .max_delay(Duration::from_secs(1))
        .jitter_factor(0.0)
        .max_attempts(3)
        .build();

    let relay = FlakyRelay::new(usize::MAX);
    let backoff = ReconnectBackoff::new(config);
    let recorder = StatsRecorder::new();

    let mut trace = vec![ConnectionState::Disconnected];
    let state = run_reconnect_cycle(&relay, &backoff, &mut trace).await;

    assert!(state.is_terminal());
    assert!(!state.is_connected());
    assert_eq!(relay.dials.load(Ordering::SeqCst), 3);
    assert!(backoff.is_exhausted());
    match &state {
        ConnectionState::Failed { reason } => {
            assert!(reason.contains("3 attempts"), "reason: {}", reason);
        }
        other => panic!("expected failed, got {}", other),
    }
    assert_eq!(kind(trace.last().unwrap()), "failed");

    recorder.record_reconnect_failure();
    let stats = recorder.snapshot();
    assert_eq!(stats.total_reconnections, 1);
    assert_eq!(stats.failed_reconnections, 1);
    assert!(stats.average_reconnection_time.is_none());
}

#[tokio::test(start_paused = true)]
async fn stats_reflect_a_full_session() {
    let config = ResilienceConfig::builder()
        .initial_delay(Duration::from_millis(200))
        .jitter_factor(0.0)
        .max_attempts(5)
        .heartbeat_interval(Duration::from_secs(20))
        .heartbeat_timeout(Duration::from_secs(5))
        .build();

    let recorder = StatsRecorder::new();
    let mut listeners = EventListeners::new();
    let sink = recorder.clone();
    listeners.add(move |event| sink.observe(event));

    let relay = FlakyRelay::new(1);
    let backoff = ReconnectBackoff::new(config.clone());
    let monitor = Arc::new(HeartbeatMonitor::new(config).with_listeners(listeners));

    recorder.record_disconnection();
    let started = tokio::time::Instant::now();
    let mut trace = Vec::new();
    let state = run_reconnect_cycle(&relay, &backoff, &mut trace).await;
    assert!(state.is_connected());
    recorder.record_reconnect_success(started.elapsed());
    assert!(recorder.snapshot().current_uptime.is_some());

    // The relay acks the first two probes, then goes silent until the
    // monitor gives up on it.
    let (timeout_tx, mut timeout_rx) = tokio::sync::mpsc::channel(1);
    let probe_monitor = Arc::clone(&monitor);
    let answered = Arc::new(AtomicUsize::new(0));
    monitor.start(
        move || {
            let monitor = Arc::clone(&probe_monitor);
            let answered = Arc::clone(&answered);
            async move {
                if answered.fetch_add(1, Ordering::SeqCst) < 2 {
                    monitor.record_ack();
                }
                Ok::<_, ProbeError>(())
            }
        },
        || true,
        move || async move {
            let _ = timeout_tx.send(()).await;
        },
    );

    timeout_rx.recv().await;
    recorder.record_disconnection();

    let stats = recorder.snapshot();
    assert_eq!(stats.total_reconnections, 1);
    assert_eq!(stats.successful_reconnections, 1);
    assert_eq!(stats.failed_reconnections, 0);
    // One refused dial, then success: delays of 200ms and 400ms.
    let average = stats.average_reconnection_time.unwrap();
    assert!(
        average >= Duration::from_millis(600) && average <= Duration::from_millis(700),
        "average reconnection time {:?}",
        average
    );
    // Probes at t=20/40/60; acks for the first two; timeout at t=80.
    assert_eq!(stats.total_heartbeats_sent, 3);
    assert_eq!(stats.total_heartbeats_received, 2);
    assert!(stats.last_reconnection.is_some());
    assert!(stats.last_disconnection.is_some());
    assert!(stats.current_uptime.is_none());
}
