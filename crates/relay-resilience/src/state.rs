//! Connection lifecycle reporting.

use std::fmt;
use std::time::Instant;

/// Lifecycle of one logical connection, as published by the connection
/// supervisor.
///
/// Exactly one variant is active at a time. The managers in this crate never
/// own a `ConnectionState`; they supply the attempt counters and timestamps a
/// supervisor embeds when it reports a transition.
///
/// `failed` is terminal: the supervisor stops retrying once the attempt
/// budget is spent and leaves that state only on an explicit restart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// No transport is open and no retry is in progress.
    Disconnected,
    /// A connect attempt is in flight.
    Connecting {
        /// 1-based attempt number.
        attempt: u32,
    },
    /// The transport is open and believed healthy.
    Connected {
        /// When the transport came up.
        since: Instant,
    },
    /// Waiting out a backoff delay before the next attempt.
    Reconnecting {
        /// The attempt that just failed.
        attempt: u32,
        /// When the next attempt is due.
        next_retry_at: Instant,
    },
    /// The attempt budget is spent; no further automatic retries.
    Failed {
        /// Human-readable reason for giving up.
        reason: String,
    },
}

impl ConnectionState {
    /// Returns `true` exactly when the state is
    /// [`Connected`](ConnectionState::Connected).
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected { .. })
    }

    /// Returns `true` for [`Failed`](ConnectionState::Failed), the only state
    /// a supervisor does not leave on its own.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConnectionState::Failed { .. })
    }

    /// The attempt counter carried by the retry-phase states, `None`
    /// elsewhere.
    pub fn attempt(&self) -> Option<u32> {
        match self {
            ConnectionState::Connecting { attempt }
            | ConnectionState::Reconnecting { attempt, .. } => Some(*attempt),
            _ => None,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting { attempt } => {
                write!(f, "connecting (attempt {})", attempt)
            }
            ConnectionState::Connected { .. } => write!(f, "connected"),
            ConnectionState::Reconnecting { attempt, .. } => {
                write!(f, "reconnecting (attempt {})", attempt)
            }
            ConnectionState::Failed { reason } => write!(f, "failed: {}", reason),
        }
    }
}
