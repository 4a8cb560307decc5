//! Escalating lockout for brute-force protection
//!
//! Once the failure count reaches the threshold, each further failure opens
//! a window of `step * failures`, capped:
//!
//! - 1-2 failures: no lockout
//! - 3 failures: 30 seconds
//! - 4 failures: 40 seconds
//! - 5 failures: 50 seconds
//! - 6+ failures: 60 seconds

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Escalating lockout policy
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockoutPolicy {
    /// Failure count at which the first lockout opens
    pub threshold: u32,
    /// Lockout added per failure (milliseconds)
    pub step_ms: u64,
    /// Upper bound on a single lockout window (milliseconds)
    pub cap_ms: u64,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            threshold: 3,
            step_ms: 10_000,
            cap_ms: 60_000,
        }
    }
}

impl LockoutPolicy {
    /// Get the lockout duration for the given number of failed attempts
    /// Returns None if not yet locked out
    pub fn lockout_duration(&self, failed_attempts: u32) -> Option<Duration> {
        if failed_attempts < self.threshold {
            return None;
        }

        let ms = self
            .step_ms
            .saturating_mul(u64::from(failed_attempts))
            .min(self.cap_ms);
        Some(Duration::from_millis(ms))
    }

    /// Describe what the next failure would do after `failed_attempts`
    pub fn describe_lockout(&self, failed_attempts: u32) -> String {
        match self.lockout_duration(failed_attempts.saturating_add(1)) {
            Some(duration) => format!("next failure locks for {} seconds", duration.as_secs()),
            None => format!(
                "lockout after {} more failures",
                self.threshold.saturating_sub(failed_attempts)
            ),
        }
    }
}

/// Persisted failure counter and lockout deadline
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LockoutState {
    /// Consecutive failed logins since the last success
    pub failure_count: u32,
    /// Unix milliseconds until which logins are refused
    pub locked_until: Option<i64>,
}

impl LockoutState {
    /// Whether a login at `now_ms` falls inside the lockout window
    pub fn is_locked(&self, now_ms: i64) -> bool {
        matches!(self.locked_until, Some(until) if now_ms < until)
    }

    /// Time left in the lockout window, if one is open
    pub fn remaining(&self, now_ms: i64) -> Option<Duration> {
        match self.locked_until {
            Some(until) if now_ms < until => Some(Duration::from_millis((until - now_ms) as u64)),
            _ => None,
        }
    }

    /// Count a failure and open a window if the policy says so
    ///
    /// Returns the new window length when one was opened.
    pub fn record_failure(&mut self, now_ms: i64, policy: &LockoutPolicy) -> Option<Duration> {
        self.failure_count = self.failure_count.saturating_add(1);
        let duration = policy.lockout_duration(self.failure_count)?;
        self.locked_until = Some(now_ms.saturating_add(duration.as_millis() as i64));
        Some(duration)
    }

    /// Clear everything after a successful login
    pub fn reset(&mut self) {
        self.failure_count = 0;
        self.locked_until = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_no_lockout_initially() {
        let policy = LockoutPolicy::default();
        assert!(policy.lockout_duration(0).is_none());
        assert!(policy.lockout_duration(1).is_none());
        assert!(policy.lockout_duration(2).is_none());
    }

    #[test]
    fn test_default_policy_escalates_and_caps() {
        let policy = LockoutPolicy::default();

        assert_eq!(policy.lockout_duration(3).unwrap().as_millis(), 30_000);
        assert_eq!(policy.lockout_duration(4).unwrap().as_millis(), 40_000);
        assert_eq!(policy.lockout_duration(5).unwrap().as_millis(), 50_000);
        assert_eq!(policy.lockout_duration(6).unwrap().as_millis(), 60_000);
        assert_eq!(policy.lockout_duration(100).unwrap().as_millis(), 60_000);
        assert_eq!(policy.lockout_duration(u32::MAX).unwrap().as_millis(), 60_000);
    }

    #[test]
    fn test_describe_lockout() {
        let policy = LockoutPolicy::default();
        assert_eq!(policy.describe_lockout(0), "lockout after 3 more failures");
        assert_eq!(policy.describe_lockout(1), "lockout after 2 more failures");
        assert_eq!(policy.describe_lockout(2), "next failure locks for 30 seconds");
        assert_eq!(policy.describe_lockout(4), "next failure locks for 50 seconds");
        assert_eq!(policy.describe_lockout(9), "next failure locks for 60 seconds");
    }

    #[test]
    fn test_state_window() {
        let policy = LockoutPolicy::default();
        let mut state = LockoutState::default();

        assert!(state.record_failure(1_000, &policy).is_none());
        assert!(state.record_failure(2_000, &policy).is_none());
        assert!(!state.is_locked(2_000));

        let opened = state.record_failure(3_000, &policy).unwrap();
        assert_eq!(opened, Duration::from_secs(30));
        assert_eq!(state.locked_until, Some(33_000));
        assert!(state.is_locked(32_999));
        assert!(!state.is_locked(33_000));
        assert_eq!(state.remaining(23_000), Some(Duration::from_secs(10)));
        assert_eq!(state.remaining(40_000), None);

        state.reset();
        assert_eq!(state, LockoutState::default());
    }
}
