//! Bounded polling for wait-until-idle conditions
//!
//! The loop has several places that must wait for hardware or a remote
//! collaborator to settle (speaker drain, reconnect). Those waits are
//! expressed as a bounded poll that always terminates, never an open spin.

use std::time::Duration;

/// Policy for a bounded condition poll
///
/// Controls how many times a condition is re-checked and how long to
/// sleep between checks.
#[derive(Debug, Clone)]
pub struct PollPolicy {
    /// Maximum number of checks before giving up
    pub max_attempts: u32,
    /// Sleep between checks
    pub interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 200,
            interval: Duration::from_millis(50),
        }
    }
}

impl PollPolicy {
    /// Policy that checks once and never sleeps
    #[must_use]
    pub const fn immediate() -> Self {
        Self {
            max_attempts: 1,
            interval: Duration::ZERO,
        }
    }

    /// Total wall-clock budget of this policy
    #[must_use]
    pub fn budget(&self) -> Duration {
        self.interval.saturating_mul(self.max_attempts)
    }
}

/// Outcome of a bounded poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Condition became true within the attempt budget
    Satisfied,
    /// Attempt budget exhausted with the condition still false
    TimedOut,
}

impl PollOutcome {
    /// Whether the condition was met
    #[must_use]
    pub const fn is_satisfied(self) -> bool {
        matches!(self, Self::Satisfied)
    }
}

/// Poll `condition` until it returns true or the policy's budget runs out.
///
/// The condition is checked before each sleep, so a condition that already
/// holds returns immediately without sleeping.
pub async fn poll_until<F>(policy: &PollPolicy, mut condition: F) -> PollOutcome
where
    F: FnMut() -> bool,
{
    for attempt in 0..policy.max_attempts {
        if condition() {
            return PollOutcome::Satisfied;
        }
        if attempt + 1 < policy.max_attempts {
            tokio::time::sleep(policy.interval).await;
        }
    }

    PollOutcome::TimedOut
}
