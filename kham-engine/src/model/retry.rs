//! Retry layer for responses that fail to parse.
//!
//! Models occasionally wrap their JSON in prose or code fences. Asking again
//! usually fixes that, so malformed responses get a fixed number of extra
//! attempts with a constant delay. Rate limits, overload and connection errors
//! are handled by the HTTP client's own backoff and pass through untouched.

use std::future::Future;

use super::error::Result;
use super::port::{CardEnricher, Enrichment, SenseClassifier, SenseReport};
use crate::config::RetrySettings;

/// Run `op`, re-running it while it fails with a retryable error.
pub async fn retry_malformed<T, F, Fut>(policy: &RetrySettings, label: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < policy.max_attempts => {
                attempt += 1;
                tracing::warn!("Retry {} for {}: {}", attempt, label, e);
                tokio::time::sleep(policy.delay()).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Wraps a model so both capabilities go through [`retry_malformed`].
#[derive(Debug, Clone)]
pub struct RetryingModel<M> {
    inner: M,
    policy: RetrySettings,
}

impl<M> RetryingModel<M> {
    pub fn new(inner: M, policy: RetrySettings) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &M {
        &self.inner
    }
}

impl<M: SenseClassifier> SenseClassifier for RetryingModel<M> {
    async fn classify(&self, word: &str) -> Result<SenseReport> {
        let inner = &self.inner;
        retry_malformed(&self.policy, word, move || inner.classify(word)).await
    }
}

impl<M: CardEnricher> CardEnricher for RetryingModel<M> {
    async fn enrich(&self, word: &str, sense: &str) -> Result<Enrichment> {
        let inner = &self.inner;
        let label = format!("{word} ({sense})");
        retry_malformed(&self.policy, &label, move || inner.enrich(word, sense)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelError;
    use std::cell::Cell;

    fn policy(max_attempts: u32) -> RetrySettings {
        RetrySettings {
            max_attempts,
            delay_ms: 0,
        }
    }

    #[tokio::test]
    async fn test_retries_malformed_then_succeeds() {
        let calls = Cell::new(0);
        let result = retry_malformed(&policy(3), "test", || {
            calls.set(calls.get() + 1);
            let n = calls.get();
            async move {
                if n < 3 {
                    Err(ModelError::MalformedResponse("not json".into()))
                } else {
                    Ok(n)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let calls = Cell::new(0);
        let result: Result<()> = retry_malformed(&policy(3), "test", || {
            calls.set(calls.get() + 1);
            async { Err(ModelError::MalformedResponse("not json".into())) }
        })
        .await;
        assert!(matches!(result, Err(ModelError::MalformedResponse(_))));
        // First attempt plus three retries
        assert_eq!(calls.get(), 4);
    }

    #[tokio::test]
    async fn test_other_errors_not_retried() {
        let calls = Cell::new(0);
        let result: Result<()> = retry_malformed(&policy(3), "test", || {
            calls.set(calls.get() + 1);
            async { Err(ModelError::QuotaExhausted("credit balance too low".into())) }
        })
        .await;
        assert!(matches!(result, Err(ModelError::QuotaExhausted(_))));
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test]
    async fn test_zero_attempts_means_single_call() {
        let calls = Cell::new(0);
        let result: Result<()> = retry_malformed(&policy(0), "test", || {
            calls.set(calls.get() + 1);
            async { Err(ModelError::MalformedResponse("x".into())) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.get(), 1);
    }
}
