use crate::{Error, Result};
use kestrel_core::RetryPolicy;
use std::time::Duration;

/// Port a debug-enabled browser exposes its CDP endpoint on by default.
pub const DEFAULT_DEBUG_PORT: u16 = 9222;

/// Liveness probe for a local browser debug endpoint.
///
/// Success criterion is an HTTP success status from `/json/version`.
pub struct DebugProbe {
    client: reqwest::Client,
    version_url: String,
}

impl DebugProbe {
    pub fn new(port: u16) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| Error::Connection(format!("failed to build probe client: {e}")))?;

        Ok(Self {
            client,
            version_url: format!("http://localhost:{port}/json/version"),
        })
    }

    pub fn version_url(&self) -> &str {
        &self.version_url
    }

    /// Single probe attempt.
    pub async fn is_live(&self) -> bool {
        match self.client.get(&self.version_url).send().await {
            Ok(response) => {
                let live = response.status().is_success();
                tracing::debug!(
                    url = %self.version_url,
                    status = %response.status(),
                    "debug endpoint probe"
                );
                live
            }
            Err(e) => {
                tracing::debug!(url = %self.version_url, "debug endpoint not reachable: {e}");
                false
            }
        }
    }

    /// Probe repeatedly per `policy`, stopping on the first success.
    ///
    /// Strictly sequential with a fixed interval; returns whether the
    /// endpoint came up within the attempt budget.
    pub async fn wait_until_live(&self, policy: &RetryPolicy) -> bool {
        for attempt in 1..=policy.max_attempts() {
            if self.is_live().await {
                tracing::debug!("debug endpoint live after {attempt} attempt(s)");
                return true;
            }
            if attempt < policy.max_attempts() {
                tokio::time::sleep(policy.interval()).await;
            }
        }

        tracing::warn!(
            "debug endpoint {} not live after {} attempts",
            self.version_url,
            policy.max_attempts()
        );
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_targets_json_version() {
        let probe = DebugProbe::new(DEFAULT_DEBUG_PORT).unwrap();
        assert_eq!(probe.version_url(), "http://localhost:9222/json/version");

        let probe = DebugProbe::new(13337).unwrap();
        assert_eq!(probe.version_url(), "http://localhost:13337/json/version");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_not_live() {
        // Port 1 is reserved and virtually never bound.
        let probe = DebugProbe::new(1).unwrap();
        assert!(!probe.is_live().await);
    }

    #[tokio::test]
    async fn test_wait_until_live_respects_attempt_budget() {
        let probe = DebugProbe::new(1).unwrap();
        let policy = RetryPolicy::new(2, Duration::from_millis(10));

        let started = std::time::Instant::now();
        assert!(!probe.wait_until_live(&policy).await);
        // Two attempts, one interval sleep between them.
        assert!(started.elapsed() >= Duration::from_millis(10));
    }
}
