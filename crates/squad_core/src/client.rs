//! Rate-limited, retrying access to a gateway.

use std::sync::Arc;

use squad_llm::{CompletionRequest, CompletionResponse, Gateway, GatewayError};
use tokio::sync::Semaphore;
use tracing::{error, warn};

use crate::error::ProviderError;
use crate::retry::RetryPolicy;

/// Shared handle every role agent uses to reach the model backend.
///
/// A semaphore caps outstanding calls; when it is saturated callers wait.
/// The permit is released while sleeping between retries.
pub struct GatewayClient {
    gateway: Arc<dyn Gateway>,
    permits: Semaphore,
    max_concurrent: usize,
    policy: RetryPolicy,
}

impl GatewayClient {
    pub fn new(gateway: Arc<dyn Gateway>, max_concurrent: usize, policy: RetryPolicy) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            gateway,
            permits: Semaphore::new(max_concurrent),
            max_concurrent,
            policy,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Calls currently holding a permit.
    pub fn in_flight(&self) -> usize {
        self.max_concurrent - self.permits.available_permits()
    }

    /// Run a completion, retrying transient failures per the policy.
    pub async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let result = {
                let _permit = self.permits.acquire().await.map_err(|_| {
                    ProviderError::Fatal(GatewayError::ProviderUnavailable(
                        "gateway client closed".to_string(),
                    ))
                })?;
                self.gateway.complete(request).await
            };

            match result {
                Ok(response) => return Ok(response),
                Err(err) if err.is_transient() => {
                    if attempt >= max_attempts {
                        warn!(
                            "{} call for {} gave up after {} attempts: {}",
                            self.gateway.name(),
                            request.agent,
                            attempt,
                            err
                        );
                        return Err(ProviderError::Exhausted {
                            attempts: attempt,
                            last: err,
                        });
                    }
                    let delay = self.policy.backoff(attempt - 1);
                    warn!(
                        "{} call for {} failed (attempt {}/{}), retrying in {:?}: {}",
                        self.gateway.name(),
                        request.agent,
                        attempt,
                        max_attempts,
                        delay,
                        err
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    error!(
                        "{} call for {} failed fatally: {}",
                        self.gateway.name(),
                        request.agent,
                        err
                    );
                    return Err(ProviderError::Fatal(err));
                }
            }
        }
    }
}

impl std::fmt::Debug for GatewayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayClient")
            .field("gateway", &self.gateway.name())
            .field("max_concurrent", &self.max_concurrent)
            .field("policy", &self.policy)
            .finish()
    }
}
