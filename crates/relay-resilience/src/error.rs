//! Error types for the resilience layer.

/// Boxed error type carried across callback boundaries.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure reported by a probe callback when a liveness probe could not be
/// handed to the transport.
///
/// This is the only error type that crosses into this crate: expected
/// lifecycle conditions (an exhausted attempt budget, a missing ledger entry)
/// are not errors and surface as `None` or a no-op instead.
#[derive(Debug, thiserror::Error)]
#[error("liveness probe failed: {source}")]
pub struct ProbeError {
    #[source]
    source: BoxError,
}

impl ProbeError {
    /// Wraps any transport error as a probe failure.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use relay_resilience::ProbeError;
    ///
    /// let err = ProbeError::new("connection reset by peer");
    /// assert!(err.to_string().contains("connection reset"));
    /// ```
    pub fn new(source: impl Into<BoxError>) -> Self {
        Self {
            source: source.into(),
        }
    }
}
