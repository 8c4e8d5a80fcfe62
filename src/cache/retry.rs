use std::time::Duration;

use crate::error::Error;

/// Exponential backoff for failed queries: `min(base * 2^attempt, max)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// `failures` counts failed attempts so far, starting at 0.
    pub fn should_retry(&self, failures: u32, error: &Error) -> bool {
        failures < self.max_retries && error.is_retryable()
    }

    pub fn delay(&self, failures: u32) -> Duration {
        let factor = 2u32.saturating_pow(failures);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorDetail;

    #[test]
    fn delays_double_and_cap() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay(0), Duration::from_secs(1));
        assert_eq!(policy.delay(1), Duration::from_secs(2));
        assert_eq!(policy.delay(2), Duration::from_secs(4));
        assert_eq!(policy.delay(5), Duration::from_secs(30));
        assert_eq!(policy.delay(40), Duration::from_secs(30));
    }

    #[test]
    fn auth_failures_are_never_retried() {
        let policy = RetryPolicy::default();
        let forbidden = Error::Api {
            status: 403,
            detail: ErrorDetail::message("Admin or HR privileges required"),
        };
        assert!(!policy.should_retry(0, &forbidden));
        assert!(!policy.should_retry(0, &Error::AuthenticationRequired));
        assert!(policy.should_retry(0, &Error::Timeout));
        assert!(policy.should_retry(2, &Error::Timeout));
        assert!(!policy.should_retry(3, &Error::Timeout));
    }
}
