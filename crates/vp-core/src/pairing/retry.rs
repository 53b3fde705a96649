//! Bounded retry policy for code fetches and identity saves.

use std::time::Duration;

/// Retry limits and delays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay before re-requesting a code after a failed fetch.
    pub code_fetch_retry_delay: Duration,
    /// Retries allowed after the initial fetch attempt.
    pub max_code_fetch_retries: u32,
    /// Delay before re-saving the identity after a failed save.
    pub save_retry_delay: Duration,
    /// Total save attempts, the first one included.
    pub max_save_attempts: u32,
}

/// What to do after a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Try again after the delay.
    RetryAfter(Duration),
    /// Budget spent; escalate.
    Exhausted,
}

/// Fetch-failure counter that spans the retry chain.
///
/// The chain re-enters pairing with a brand new session on every retry, so
/// the counter lives here rather than on a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetryTracker {
    code_fetch_retries: u32,
}

impl RetryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn code_fetch_retries(&self) -> u32 {
        self.code_fetch_retries
    }

    /// Record a failed fetch. The counter resets when the budget runs out.
    pub fn record_code_fetch_failure(&mut self, policy: &RetryPolicy) -> RetryDecision {
        if self.code_fetch_retries < policy.max_code_fetch_retries {
            self.code_fetch_retries += 1;
            RetryDecision::RetryAfter(policy.code_fetch_retry_delay)
        } else {
            self.code_fetch_retries = 0;
            RetryDecision::Exhausted
        }
    }

    pub fn record_code_fetch_success(&mut self) {
        self.code_fetch_retries = 0;
    }
}

/// Decide on a save retry given how many saves have failed so far.
pub fn save_retry_decision(failed_saves: u32, policy: &RetryPolicy) -> RetryDecision {
    if failed_saves < policy.max_save_attempts {
        RetryDecision::RetryAfter(policy.save_retry_delay)
    } else {
        RetryDecision::Exhausted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            code_fetch_retry_delay: Duration::from_secs(10),
            max_code_fetch_retries: max_retries,
            save_retry_delay: Duration::from_secs(2),
            max_save_attempts: 2,
        }
    }

    #[test]
    fn fetch_failures_retry_up_to_the_cap_then_exhaust() {
        let policy = policy(3);
        let mut tracker = RetryTracker::new();

        for expected in 1..=3 {
            assert_eq!(
                tracker.record_code_fetch_failure(&policy),
                RetryDecision::RetryAfter(Duration::from_secs(10))
            );
            assert_eq!(tracker.code_fetch_retries(), expected);
        }
        assert_eq!(
            tracker.record_code_fetch_failure(&policy),
            RetryDecision::Exhausted
        );
        assert_eq!(tracker.code_fetch_retries(), 0);
    }

    #[test]
    fn fetch_success_resets_counter() {
        let policy = policy(3);
        let mut tracker = RetryTracker::new();
        tracker.record_code_fetch_failure(&policy);
        tracker.record_code_fetch_failure(&policy);
        tracker.record_code_fetch_success();
        assert_eq!(tracker.code_fetch_retries(), 0);
    }

    #[test]
    fn zero_retries_exhausts_immediately() {
        let mut tracker = RetryTracker::new();
        assert_eq!(
            tracker.record_code_fetch_failure(&policy(0)),
            RetryDecision::Exhausted
        );
    }

    #[test]
    fn save_is_retried_once_with_two_attempts() {
        let policy = policy(3);
        assert_eq!(
            save_retry_decision(1, &policy),
            RetryDecision::RetryAfter(Duration::from_secs(2))
        );
        assert_eq!(save_retry_decision(2, &policy), RetryDecision::Exhausted);
    }
}
