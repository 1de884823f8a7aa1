//! Configuration for the resilience managers.

use std::time::Duration;

/// Immutable policy shared by the resilience managers: backoff shape, attempt
/// budget, heartbeat cadence, and the replay switch.
///
/// A config is plain data; the behavior lives in the managers that consume
/// it. Clone it freely and hand the clones out, or build one per manager if
/// they should follow different policies.
///
/// # Examples
///
/// ```rust
/// use relay_resilience::ResilienceConfig;
/// use std::time::Duration;
///
/// let config = ResilienceConfig::builder()
///     .initial_delay(Duration::from_millis(250))
///     .max_attempts(8)
///     .build();
///
/// assert_eq!(config.max_attempts(), 8);
/// assert_eq!(config.max_delay(), Duration::from_secs(60));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ResilienceConfig {
    pub(crate) initial_delay: Duration,
    pub(crate) max_delay: Duration,
    pub(crate) backoff_multiplier: f64,
    pub(crate) jitter_factor: f64,
    pub(crate) max_attempts: u32,
    pub(crate) heartbeat_interval: Duration,
    pub(crate) heartbeat_timeout: Duration,
    pub(crate) auto_resubscribe: bool,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            jitter_factor: 0.3,
            max_attempts: 10,
            heartbeat_interval: Duration::from_secs(30),
            heartbeat_timeout: Duration::from_secs(10),
            auto_resubscribe: true,
        }
    }
}

impl ResilienceConfig {
    /// Creates a builder with all values unset, falling back to the defaults
    /// of [`ResilienceConfig::default`].
    pub fn builder() -> ResilienceConfigBuilder {
        ResilienceConfigBuilder::default()
    }

    /// Preset for interactive clients that want the connection back fast:
    /// short delays, gentle growth, a deep attempt budget, and a tight
    /// heartbeat cadence.
    pub fn aggressive() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(15),
            backoff_multiplier: 1.5,
            jitter_factor: 0.2,
            max_attempts: 20,
            heartbeat_interval: Duration::from_secs(15),
            heartbeat_timeout: Duration::from_secs(5),
            auto_resubscribe: true,
        }
    }

    /// Preset for background consumers that would rather wait than hammer a
    /// struggling relay: long delays, wide jitter, a small attempt budget,
    /// and a relaxed heartbeat cadence.
    pub fn conservative() -> Self {
        Self {
            initial_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(300),
            backoff_multiplier: 2.0,
            jitter_factor: 0.5,
            max_attempts: 5,
            heartbeat_interval: Duration::from_secs(60),
            heartbeat_timeout: Duration::from_secs(30),
            auto_resubscribe: true,
        }
    }

    /// Delay before the first reconnect attempt.
    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    /// Upper bound on the pre-jitter delay.
    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Per-attempt growth factor.
    pub fn backoff_multiplier(&self) -> f64 {
        self.backoff_multiplier
    }

    /// Fraction of the delay used as the jitter band, in `[0.0, 1.0]`.
    pub fn jitter_factor(&self) -> f64 {
        self.jitter_factor
    }

    /// Reconnect attempts before the budget is exhausted.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Gap between liveness probes.
    pub fn heartbeat_interval(&self) -> Duration {
        self.heartbeat_interval
    }

    /// Grace period for an acknowledgment, on top of one interval.
    pub fn heartbeat_timeout(&self) -> Duration {
        self.heartbeat_timeout
    }

    /// Whether the supervisor should replay recorded subscriptions after a
    /// reconnect.
    pub fn auto_resubscribe(&self) -> bool {
        self.auto_resubscribe
    }
}

/// Builder for [`ResilienceConfig`].
#[derive(Debug, Clone, Default)]
pub struct ResilienceConfigBuilder {
    initial_delay: Option<Duration>,
    max_delay: Option<Duration>,
    backoff_multiplier: Option<f64>,
    jitter_factor: Option<f64>,
    max_attempts: Option<u32>,
    heartbeat_interval: Option<Duration>,
    heartbeat_timeout: Option<Duration>,
    auto_resubscribe: Option<bool>,
}

impl ResilienceConfigBuilder {
    /// Delay before the first reconnect attempt. Default: 1s.
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = Some(delay);
        self
    }

    /// Upper bound on the pre-jitter delay. Default: 60s.
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = Some(delay);
        self
    }

    /// Per-attempt growth factor. Default: 2.0.
    pub fn backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = Some(multiplier);
        self
    }

    /// Jitter band as a fraction of the delay, clamped to `[0.0, 1.0]` at
    /// build time. Default: 0.3.
    pub fn jitter_factor(mut self, factor: f64) -> Self {
        self.jitter_factor = Some(factor);
        self
    }

    /// Reconnect attempts before the budget is exhausted. Default: 10.
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    /// Gap between liveness probes. Default: 30s.
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = Some(interval);
        self
    }

    /// Grace period for an acknowledgment, on top of one interval.
    /// Default: 10s.
    pub fn heartbeat_timeout(mut self, timeout: Duration) -> Self {
        self.heartbeat_timeout = Some(timeout);
        self
    }

    /// Whether to replay recorded subscriptions after a reconnect.
    /// Default: true.
    pub fn auto_resubscribe(mut self, enabled: bool) -> Self {
        self.auto_resubscribe = Some(enabled);
        self
    }

    /// Builds the config, filling unset values from the defaults.
    pub fn build(self) -> ResilienceConfig {
        let default = ResilienceConfig::default();
        ResilienceConfig {
            initial_delay: self.initial_delay.unwrap_or(default.initial_delay),
            max_delay: self.max_delay.unwrap_or(default.max_delay),
            backoff_multiplier: self
                .backoff_multiplier
                .unwrap_or(default.backoff_multiplier),
            jitter_factor: self
                .jitter_factor
                .unwrap_or(default.jitter_factor)
                .clamp(0.0, 1.0),
            max_attempts: self.max_attempts.unwrap_or(default.max_attempts),
            heartbeat_interval: self
                .heartbeat_interval
                .unwrap_or(default.heartbeat_interval),
            heartbeat_timeout: self.heartbeat_timeout.unwrap_or(default.heartbeat_timeout),
            auto_resubscribe: self.auto_resubscribe.unwrap_or(default.auto_resubscribe),
        }
    }
}
