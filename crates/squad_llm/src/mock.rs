//! Scripted gateway for testing.
//!
//! Replays a queue of canned responses and errors in order, then falls back
//! to a fixed completion (or `ProviderUnavailable` when none is set). Every
//! request is captured for later inspection.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{GatewayError, GatewayResult};
use crate::gateway::Gateway;
use crate::types::{CompletionRequest, CompletionResponse, TokenUsage};

const MOCK_MODEL: &str = "scripted";

/// A gateway whose answers are decided up front.
#[derive(Default)]
pub struct ScriptedGateway {
    script: Mutex<VecDeque<GatewayResult<CompletionResponse>>>,
    fallback: Option<String>,
    requests: Mutex<Vec<CompletionRequest>>,
    calls: AtomicUsize,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Completion returned once the script runs out.
    pub fn with_fallback(mut self, completion: impl Into<String>) -> Self {
        self.fallback = Some(completion.into());
        self
    }

    /// Queue a successful completion.
    pub fn push_completion(&self, completion: impl Into<String>) -> &Self {
        let response = CompletionResponse::new(completion, MOCK_MODEL)
            .with_usage(TokenUsage::new(10, 20));
        self.script.lock().push_back(Ok(response));
        self
    }

    /// Queue a failure.
    pub fn push_error(&self, error: GatewayError) -> &Self {
        self.script.lock().push_back(Err(error));
        self
    }

    /// Number of calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().clone()
    }

    /// Scripted entries not yet consumed.
    pub fn remaining(&self) -> usize {
        self.script.lock().len()
    }
}

#[async_trait]
impl Gateway for ScriptedGateway {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &CompletionRequest) -> GatewayResult<CompletionResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.clone());

        let next = self.script.lock().pop_front();
        match next {
            Some(result) => result,
            None => match &self.fallback {
                Some(text) => Ok(CompletionResponse::new(text.clone(), MOCK_MODEL)),
                None => Err(GatewayError::ProviderUnavailable(
                    "scripted gateway exhausted".to_string(),
                )),
            },
        }
    }
}
