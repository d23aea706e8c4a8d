use std::time::Duration;

/// A bounded fixed-interval retry schedule.
///
/// Carried as a plain value so the same schedule can back different probes
/// without each call site growing its own loop constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    interval: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
        }
    }

    /// Schedule used while waiting for a freshly spawned local browser to
    /// bring up its debug endpoint: one probe per second, ten attempts.
    pub fn local_attach() -> Self {
        Self::new(10, Duration::from_secs(1))
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Upper bound on time spent sleeping if every attempt fails.
    pub fn total_wait(&self) -> Duration {
        self.interval * self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_attach_policy_is_ten_one_second_attempts() {
        let policy = RetryPolicy::local_attach();
        assert_eq!(policy.max_attempts(), 10);
        assert_eq!(policy.interval(), Duration::from_secs(1));
        assert_eq!(policy.total_wait(), Duration::from_secs(10));
    }

    #[test]
    fn test_total_wait_scales_with_attempts() {
        let policy = RetryPolicy::new(3, Duration::from_millis(250));
        assert_eq!(policy.total_wait(), Duration::from_millis(750));
    }
}
