//! Navigation with bounded retries.
//!
//! Search pages on the target site time out or reset often under rate
//! limiting. [`Navigator::goto`] retries a fixed number of times with a
//! fixed backoff; the backoff is abandoned as soon as the run is cancelled.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::browser::{Browser, BrowserError};

#[derive(Debug, Error)]
pub enum NavigationError {
    #[error("navigation to {url} failed after {attempts} attempts: {last}")]
    Exhausted {
        url: String,
        attempts: u32,
        #[source]
        last: BrowserError,
    },
    #[error("navigation cancelled")]
    Cancelled,
}

/// Retry settings for page loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    #[serde(with = "secs")]
    pub backoff: Duration,
    /// Limit for one attempt, including the network-idle wait.
    #[serde(with = "secs")]
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(10),
            timeout: Duration::from_secs(60),
        }
    }
}

/// Serde adapter for durations written as whole seconds.
pub(crate) mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

/// Drives page loads on a shared browser.
pub struct Navigator {
    browser: Arc<dyn Browser>,
    policy: RetryPolicy,
    blocking: bool,
    cancel: CancellationToken,
}

impl Navigator {
    pub fn new(browser: Arc<dyn Browser>, policy: RetryPolicy, cancel: CancellationToken) -> Self {
        Self {
            browser,
            policy,
            blocking: false,
            cancel,
        }
    }

    pub fn browser(&self) -> &dyn Browser {
        self.browser.as_ref()
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_blocking(&self) -> bool {
        self.blocking
    }

    /// Load `url`, retrying on failure.
    pub async fn goto(&self, url: &str) -> Result<(), NavigationError> {
        let attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            if self.cancel.is_cancelled() {
                return Err(NavigationError::Cancelled);
            }

            debug!("Navigating to {} (attempt {}/{})", url, attempt, attempts);
            let result = tokio::select! {
                _ = self.cancel.cancelled() => return Err(NavigationError::Cancelled),
                r = self.browser.navigate(url, self.policy.timeout) => r,
            };

            let err = match result {
                Ok(()) => return Ok(()),
                Err(e) => e,
            };

            if attempt >= attempts {
                return Err(NavigationError::Exhausted {
                    url: url.to_string(),
                    attempts,
                    last: err,
                });
            }

            warn!(
                "Navigation to {} failed (attempt {}/{}): {}; retrying in {:?}",
                url, attempt, attempts, err, self.policy.backoff
            );
            if !sleep_or_cancel(&self.cancel, self.policy.backoff).await {
                return Err(NavigationError::Cancelled);
            }
            attempt += 1;
        }
    }

    /// Switch resource blocking, forwarding only actual changes.
    pub async fn set_resource_blocking(&mut self, enabled: bool) -> Result<(), BrowserError> {
        if self.blocking == enabled {
            return Ok(());
        }
        self.browser.set_request_blocking(enabled).await?;
        self.blocking = enabled;
        debug!(
            "Resource blocking {}",
            if enabled { "enabled" } else { "disabled" }
        );
        Ok(())
    }
}

/// Sleep for `duration` unless cancelled first. Returns `false` on cancel.
pub async fn sleep_or_cancel(cancel: &CancellationToken, duration: Duration) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fake::FakeBrowser;
    use tokio::time::Instant;

    const URL: &str = "https://x.com/search?q=banjir";

    fn navigator(browser: Arc<FakeBrowser>) -> Navigator {
        Navigator::new(browser, RetryPolicy::default(), CancellationToken::new())
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausts_attempts_and_keeps_last_error() {
        let browser = Arc::new(FakeBrowser::new().with(|s| {
            s.always_fail.insert(URL.to_string());
        }));
        let nav = navigator(browser.clone());
        let started = Instant::now();

        let err = nav.goto(URL).await.unwrap_err();

        match err {
            NavigationError::Exhausted { url, attempts, last } => {
                assert_eq!(url, URL);
                assert_eq!(attempts, 3);
                assert!(last.to_string().contains("ERR_CONNECTION_RESET"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(browser.state().navigations.len(), 3);
        // Two backoffs, none after the final attempt
        assert_eq!(started.elapsed(), Duration::from_secs(20));
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_on_second_attempt() {
        let browser = Arc::new(FakeBrowser::new().with(|s| {
            s.failures.insert(URL.to_string(), 1);
        }));
        let nav = navigator(browser.clone());
        let started = Instant::now();

        nav.goto(URL).await.unwrap();

        assert_eq!(browser.state().navigations.len(), 2);
        assert_eq!(browser.state().url, URL);
        assert_eq!(started.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_backoff() {
        let browser = Arc::new(FakeBrowser::new().with(|s| {
            s.always_fail.insert(URL.to_string());
        }));
        let cancel = CancellationToken::new();
        let nav = Navigator::new(browser.clone(), RetryPolicy::default(), cancel.clone());

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            trigger.cancel();
        });

        let err = nav.goto(URL).await.unwrap_err();
        assert!(matches!(err, NavigationError::Cancelled));
        assert_eq!(browser.state().navigations.len(), 1);
    }

    #[tokio::test]
    async fn test_blocking_forwards_only_changes() {
        let browser = Arc::new(FakeBrowser::new());
        let mut nav = navigator(browser.clone());

        nav.set_resource_blocking(true).await.unwrap();
        nav.set_resource_blocking(true).await.unwrap();
        nav.set_resource_blocking(false).await.unwrap();
        nav.set_resource_blocking(false).await.unwrap();

        assert_eq!(browser.state().blocking_calls, vec![true, false]);
        assert!(!nav.is_blocking());
    }

    #[test]
    fn test_policy_reads_seconds() {
        let policy: RetryPolicy = toml::from_str("max_attempts = 5\nbackoff = 2").unwrap();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.backoff, Duration::from_secs(2));
        assert_eq!(policy.timeout, Duration::from_secs(60));
    }
}
