//! Property tests for the backoff calculator.
//!
//! Invariants tested:
//! - Exhaustion happens exactly at the attempt budget
//! - Every delay respects the 100ms floor and the jittered cap
//! - Exhausted calls mutate nothing
//! - Reset always restores the full sequence

use proptest::prelude::*;
use relay_resilience::{ReconnectBackoff, ResilienceConfig};
use std::time::Duration;

/// Configs with sane shapes: the initial delay never sits below the floor
/// and the cap never sits below the initial delay.
fn arb_config() -> impl Strategy<Value = ResilienceConfig> {
    (
        100u64..=5_000,
        1u64..=120,
        1.0f64..=3.0,
        0.0f64..=1.0,
        1u32..=12,
    )
        .prop_map(|(initial_ms, max_secs, multiplier, jitter, attempts)| {
            let initial = Duration::from_millis(initial_ms);
            let max = Duration::from_secs(max_secs).max(initial);
            ResilienceConfig::builder()
                .initial_delay(initial)
                .max_delay(max)
                .backoff_multiplier(multiplier)
                .jitter_factor(jitter)
                .max_attempts(attempts)
                .build()
        })
}

/// Same shapes with the jitter stripped, for exact-value properties.
fn arb_jitterless_config() -> impl Strategy<Value = ResilienceConfig> {
    arb_config().prop_map(|config| {
        ResilienceConfig::builder()
            .initial_delay(config.initial_delay())
            .max_delay(config.max_delay())
            .backoff_multiplier(config.backoff_multiplier())
            .jitter_factor(0.0)
            .max_attempts(config.max_attempts())
            .build()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// Property: the budget grants exactly max_attempts delays, then nothing.
    #[test]
    fn exhaustion_happens_exactly_at_the_budget(config in arb_config()) {
        let backoff = ReconnectBackoff::new(config.clone());
        for i in 0..config.max_attempts() {
            prop_assert!(backoff.next_delay().is_some());
            prop_assert_eq!(backoff.attempts(), i + 1);
        }
        prop_assert!(backoff.is_exhausted());
        prop_assert_eq!(backoff.next_delay(), None);
        prop_assert_eq!(backoff.attempts(), config.max_attempts());
    }

    /// Property: every delay lies in [100ms, max_delay * (1 + jitter)].
    #[test]
    fn delays_respect_the_floor_and_the_cap(config in arb_config()) {
        let backoff = ReconnectBackoff::new(config.clone());
        let cap = config.max_delay().as_secs_f64() * (1.0 + config.jitter_factor());
        while let Some(delay) = backoff.next_delay() {
            prop_assert!(
                delay >= Duration::from_millis(100),
                "Delay {:?} fell under the 100ms floor",
                delay
            );
            // Tiny slack for float rounding in the jitter draw.
            prop_assert!(
                delay.as_secs_f64() <= cap + 1e-9,
                "Delay {:?} exceeded the jittered cap of {}s",
                delay,
                cap
            );
        }
    }

    /// Property: exhausted calls are observationally pure.
    #[test]
    fn exhausted_calls_mutate_nothing(config in arb_config()) {
        let backoff = ReconnectBackoff::new(config);
        while backoff.next_delay().is_some() {}
        let frozen = format!("{:?}", backoff);

        for _ in 0..3 {
            prop_assert_eq!(backoff.next_delay(), None);
            prop_assert_eq!(format!("{:?}", backoff), frozen.clone());
        }
    }

    /// Property: without jitter, reset replays the exact same sequence.
    #[test]
    fn reset_always_restores_the_full_sequence(config in arb_jitterless_config()) {
        let backoff = ReconnectBackoff::new(config);
        let first: Vec<Duration> = std::iter::from_fn(|| backoff.next_delay()).collect();

        backoff.reset();
        prop_assert_eq!(backoff.attempts(), 0);
        prop_assert!(!backoff.is_exhausted());

        let second: Vec<Duration> = std::iter::from_fn(|| backoff.next_delay()).collect();
        prop_assert_eq!(first, second);
    }
}
