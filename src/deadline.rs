//! Explicit wall-clock budgets threaded through every bounded operation,
//! replacing any notion of signal-based alarms or global timers.

use std::time::{Duration, Instant};

/// A point in time after which in-progress work must be abandoned.
///
/// Copyable by design: every stage of a submission's pipeline receives the
/// same deadline and clamps its own timeout to what remains.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    end: Instant,
}

impl Deadline {
    pub fn after(budget: Duration) -> Self {
        Self {
            end: Instant::now() + budget,
        }
    }

    /// Time left before expiry; zero once expired.
    pub fn remaining(&self) -> Duration {
        self.end.saturating_duration_since(Instant::now())
    }

    pub fn expired(&self) -> bool {
        self.remaining().is_zero()
    }

    /// A step's effective timeout: its own configured bound or the remaining
    /// budget, whichever is shorter.
    pub fn clamp(&self, step: Duration) -> Duration {
        step.min(self.remaining())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_step_timeout_to_remaining_budget() {
        let deadline = Deadline::after(Duration::from_secs(2));
        assert_eq!(deadline.clamp(Duration::from_secs(1)), Duration::from_secs(1));
        assert!(deadline.clamp(Duration::from_secs(60)) <= Duration::from_secs(2));
    }

    #[test]
    fn zero_budget_is_immediately_expired() {
        let deadline = Deadline::after(Duration::ZERO);
        assert!(deadline.expired());
        assert_eq!(deadline.remaining(), Duration::ZERO);
        assert_eq!(deadline.clamp(Duration::from_secs(5)), Duration::ZERO);
    }
}
