use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use tracing::warn;

use crate::config;

/// key: retry -> fixed-delay linear retry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    pub fn from_env() -> Self {
        Self::new(
            *config::SEED_MAX_RETRIES,
            Duration::from_millis(*config::SEED_RETRY_DELAY_MS),
        )
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

/// Runs `operation` until it succeeds or `policy.max_retries` retries are spent,
/// then returns the last error.
pub async fn retry_operation<T, F, Fut>(policy: &RetryPolicy, label: &str, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut remaining = policy.max_retries;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if remaining > 0 => {
                remaining -= 1;
                warn!(?err, operation = label, retries_left = remaining, "operation failed, retrying");
                tokio::time::sleep(policy.delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(max_retries, Duration::ZERO)
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let attempts = AtomicU32::new(0);
        let counter = &attempts;
        let value = retry_operation(&fast(3), "flaky", move || async move {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(anyhow!("transient"))
            } else {
                Ok(7)
            }
        })
        .await
        .unwrap();

        assert_eq!(value, 7);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let attempts = AtomicU32::new(0);
        let counter = &attempts;
        let result: Result<()> = retry_operation(&fast(3), "broken", move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(anyhow!("permanent"))
        })
        .await;

        assert_eq!(result.unwrap_err().to_string(), "permanent");
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn default_policy_matches_seeding_contract() {
        assert_eq!(RetryPolicy::default(), RetryPolicy::new(3, Duration::from_secs(1)));
    }
}
