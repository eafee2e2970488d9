//! The gateway contract every provider implements.

use async_trait::async_trait;

use crate::error::GatewayResult;
use crate::types::{CompletionRequest, CompletionResponse};

/// Uniform completion call over a language-model backend.
///
/// Implementations perform exactly one provider call per invocation. Retrying
/// transient failures and limiting concurrency belong to the caller.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Short provider name used in logs.
    fn name(&self) -> &str;

    /// Run one completion.
    async fn complete(&self, request: &CompletionRequest) -> GatewayResult<CompletionResponse>;
}
