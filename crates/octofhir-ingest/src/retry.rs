//! Fixed-interval retry policy for probing and job polling.

use std::time::Duration;

use tokio::time::Instant;

/// Retry on a fixed interval, optionally giving up after `max_duration`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub interval: Duration,
    /// `None` retries forever
    pub max_duration: Option<Duration>,
}

impl RetryPolicy {
    pub fn fixed(interval: Duration) -> Self {
        Self {
            interval,
            max_duration: None,
        }
    }

    pub fn with_max_duration(mut self, max_duration: Duration) -> Self {
        self.max_duration = Some(max_duration);
        self
    }

    /// Start counting attempts from now.
    pub fn start(&self) -> Attempts {
        Attempts {
            policy: *self,
            started: Instant::now(),
            attempts: 1,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(Duration::from_secs(5))
    }
}

/// Returned when the next attempt would start after the policy's deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Exhausted {
    pub elapsed: Duration,
    pub attempts: u32,
}

/// Running attempt counter for one retried operation
#[derive(Debug)]
pub struct Attempts {
    policy: RetryPolicy,
    started: Instant,
    attempts: u32,
}

impl Attempts {
    /// Number of attempts made so far (the first attempt counts).
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Sleep for one interval before the next attempt.
    pub async fn wait(&mut self) -> Result<(), Exhausted> {
        if let Some(max) = self.policy.max_duration {
            let elapsed = self.elapsed();
            if elapsed + self.policy.interval > max {
                return Err(Exhausted {
                    elapsed,
                    attempts: self.attempts,
                });
            }
        }
        tokio::time::sleep(self.policy.interval).await;
        self.attempts += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unbounded_policy_keeps_waiting() {
        let mut attempts = RetryPolicy::fixed(Duration::from_millis(1)).start();
        for _ in 0..5 {
            attempts.wait().await.unwrap();
        }
        assert_eq!(attempts.attempts(), 6);
    }

    #[tokio::test]
    async fn test_bounded_policy_gives_up() {
        let policy = RetryPolicy::fixed(Duration::from_millis(30))
            .with_max_duration(Duration::from_millis(50));
        let mut attempts = policy.start();

        attempts.wait().await.unwrap();
        let exhausted = attempts.wait().await.unwrap_err();

        assert_eq!(exhausted.attempts, 2);
        assert!(exhausted.elapsed >= Duration::from_millis(30));
    }

    #[test]
    fn test_default_interval() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.interval, Duration::from_secs(5));
        assert!(policy.max_duration.is_none());
    }
}
