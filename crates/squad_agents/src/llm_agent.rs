//! Role agent backed by a language model.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use squad_core::{
    ArtifactError, ArtifactStore, GatewayClient, Outcome, OutcomeStatus, Role, RoleAgent,
    RoleError, Task, TaskContext,
};
use squad_llm::{CompletionRequest, DEFAULT_MAX_TOKENS};

use crate::prompt::RolePrompt;

/// Runs one [`RolePrompt`] through the shared gateway client.
///
/// The artifact is recorded for rejections too, so the next attempt can be
/// handed the review or test report as feedback.
pub struct LlmRoleAgent<P> {
    prompt: P,
    client: Arc<GatewayClient>,
    store: Arc<ArtifactStore>,
    max_tokens: u32,
}

impl<P: RolePrompt> LlmRoleAgent<P> {
    pub fn new(prompt: P, client: Arc<GatewayClient>, store: Arc<ArtifactStore>) -> Self {
        Self {
            prompt,
            client,
            store,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn prompt(&self) -> &P {
        &self.prompt
    }

    /// Write generated project files. Paths outside the workspace are skipped.
    fn write_files(&self, files: &[(String, String)]) -> Result<usize, RoleError> {
        let mut written = 0;
        for (path, content) in files {
            match self.store.write_file(Path::new(path), content) {
                Ok(Some(full)) => {
                    debug!("Wrote project file {:?}", full);
                    written += 1;
                }
                Ok(None) => {}
                Err(ArtifactError::InvalidPath(path)) => {
                    warn!("Skipping file outside the workspace: {}", path.display());
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(written)
    }
}

#[async_trait]
impl<P: RolePrompt + 'static> RoleAgent for LlmRoleAgent<P> {
    fn role(&self) -> Role {
        self.prompt.role()
    }

    async fn perform(&self, task: &Task, context: &TaskContext) -> Result<Outcome, RoleError> {
        let role = self.role();
        let request = CompletionRequest::new(role.as_str(), self.prompt.messages(task, context))
            .with_max_tokens(self.max_tokens);

        debug!(
            role = %role,
            work_item = %task.work_item_id,
            attempt = task.attempt,
            "Requesting completion"
        );
        let response = self.client.complete(&request).await?;

        let reading = self.prompt.interpret(task, &response.completion)?;
        let artifact = self
            .store
            .put(task.work_item_id, reading.kind, reading.content, role)?;
        if reading.status == OutcomeStatus::Succeeded && !reading.files.is_empty() {
            let written = self.write_files(&reading.files)?;
            debug!(role = %role, "Wrote {} of {} project files", written, reading.files.len());
        }

        info!(
            role = %role,
            work_item = %task.work_item_id.short(),
            status = ?reading.status,
            "{}",
            reading.summary
        );

        let outcome = match reading.status {
            OutcomeStatus::Succeeded => Outcome::succeeded(role),
            OutcomeStatus::Failed => Outcome::failed(role),
        };
        let outcome = reading
            .issues
            .into_iter()
            .fold(outcome, Outcome::with_issue)
            .with_artifact(artifact)
            .with_features(reading.features)
            .with_summary(reading.summary)
            .with_usage(response.usage);
        Ok(outcome)
    }
}

impl<P> std::fmt::Debug for LlmRoleAgent<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmRoleAgent")
            .field("max_tokens", &self.max_tokens)
            .finish_non_exhaustive()
    }
}
