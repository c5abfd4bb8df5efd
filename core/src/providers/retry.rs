//! Retry with exponential backoff for transient provider failures.

use crate::error::{ServiceError, is_transient};
use crate::traits::{ChatRequest, ChatResponse, Provider};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay_ms: 500,
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay_ms: 0,
        }
    }

    /// Delay before retry number `attempt` (0-based): base * 2^attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.min(16);
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor))
    }
}

/// Wraps a provider with a per-attempt timeout and retries transient errors.
pub struct RetryingProvider {
    inner: Arc<dyn Provider>,
    policy: RetryPolicy,
    attempt_timeout: Duration,
}

impl RetryingProvider {
    pub fn new(inner: Arc<dyn Provider>, policy: RetryPolicy, attempt_timeout: Duration) -> Self {
        Self {
            inner,
            policy,
            attempt_timeout,
        }
    }
}

#[async_trait]
impl Provider for RetryingProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn chat(
        &self,
        request: ChatRequest<'_>,
        model: &str,
        temperature: f64,
    ) -> anyhow::Result<ChatResponse> {
        let mut attempt = 0;

        loop {
            let result = match tokio::time::timeout(
                self.attempt_timeout,
                self.inner.chat(request, model, temperature),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(ServiceError::Transient {
                    service: "completion",
                    message: format!(
                        "no response within {}ms",
                        self.attempt_timeout.as_millis()
                    ),
                }
                .into()),
            };

            match result {
                Ok(response) => return Ok(response),
                Err(e) if is_transient(&e) && attempt < self.policy.max_retries => {
                    let delay = self.policy.delay_for(attempt);
                    warn!(
                        provider = %self.inner.name(),
                        attempt = attempt + 1,
                        max_retries = self.policy.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transient completion failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
