//! Role agent trait and the types passed across it.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use squad_llm::TokenUsage;
use thiserror::Error;
use tracing::debug;

use crate::artifact::Artifact;
use crate::error::{ArtifactError, CoreError, CoreResult, ProviderError};
use crate::issue::IssueStage;
use crate::role::Role;
use crate::work_item::{WorkItemId, WorkItemKind};

/// What a role is asked to do.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub work_item_id: WorkItemId,
    pub kind: WorkItemKind,
    pub role: Role,
    pub description: String,
    /// 1-based dispatch count of the work item.
    pub attempt: u32,
}

/// Everything a role may read while performing a task.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskContext {
    pub requirements: String,
    /// Structured project specification, `Null` when none was given.
    pub spec: serde_json::Value,
    /// Artifacts produced upstream of this step.
    pub artifacts: Vec<Artifact>,
    /// Artifacts from the rejection that caused this retry.
    pub feedback: Vec<Artifact>,
}

impl TaskContext {
    pub fn new(requirements: impl Into<String>) -> Self {
        Self {
            requirements: requirements.into(),
            ..Default::default()
        }
    }

    pub fn with_spec(mut self, spec: serde_json::Value) -> Self {
        self.spec = spec;
        self
    }

    pub fn with_artifacts(mut self, artifacts: Vec<Artifact>) -> Self {
        self.artifacts = artifacts;
        self
    }

    pub fn is_retry(&self) -> bool {
        !self.feedback.is_empty()
    }
}

/// Verdict of one role step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Succeeded,
    /// The role rejected the work (review or tests did not pass).
    Failed,
}

/// An issue a role reports alongside its outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaisedIssue {
    pub description: String,
    pub stage: Option<IssueStage>,
}

impl RaisedIssue {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            stage: None,
        }
    }

    pub fn at(mut self, stage: IssueStage) -> Self {
        self.stage = Some(stage);
        self
    }
}

/// Result of one role step. Artifacts listed here are already stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Outcome {
    pub role: Role,
    pub status: OutcomeStatus,
    pub artifacts: Vec<Artifact>,
    pub issues: Vec<RaisedIssue>,
    /// Feature tasks proposed by planning roles.
    pub features: Vec<String>,
    pub summary: String,
    pub usage: TokenUsage,
}

impl Outcome {
    pub fn succeeded(role: Role) -> Self {
        Self {
            role,
            status: OutcomeStatus::Succeeded,
            artifacts: Vec::new(),
            issues: Vec::new(),
            features: Vec::new(),
            summary: String::new(),
            usage: TokenUsage::default(),
        }
    }

    pub fn failed(role: Role) -> Self {
        Self {
            status: OutcomeStatus::Failed,
            ..Self::succeeded(role)
        }
    }

    pub fn with_artifact(mut self, artifact: Artifact) -> Self {
        self.artifacts.push(artifact);
        self
    }

    pub fn with_issue(mut self, issue: RaisedIssue) -> Self {
        self.issues.push(issue);
        self
    }

    pub fn with_features(mut self, features: Vec<String>) -> Self {
        self.features = features;
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = usage;
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Succeeded
    }
}

/// Why a role could not produce an outcome.
#[derive(Error, Debug)]
pub enum RoleError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Artifact error: {0}")]
    Artifact(#[from] ArtifactError),

    #[error("Malformed response from {role}: {message}")]
    Malformed { role: Role, message: String },
}

impl RoleError {
    pub fn malformed(role: Role, message: impl Into<String>) -> Self {
        Self::Malformed {
            role,
            message: message.into(),
        }
    }
}

/// One team role.
///
/// Implementations write their artifacts to the artifact store before
/// returning, and never touch the queue or the run.
#[async_trait]
pub trait RoleAgent: Send + Sync {
    fn role(&self) -> Role;

    async fn perform(&self, task: &Task, context: &TaskContext) -> Result<Outcome, RoleError>;
}

/// Maps roles to their agents.
#[derive(Default)]
pub struct AgentRegistry {
    agents: HashMap<Role, Arc<dyn RoleAgent>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self {
            agents: HashMap::new(),
        }
    }

    /// Register an agent under its `role()`, replacing any previous one.
    pub fn register(&mut self, agent: Arc<dyn RoleAgent>) {
        let role = agent.role();
        debug!("Registering agent: {}", role);
        self.agents.insert(role, agent);
    }

    pub fn get(&self, role: Role) -> Option<Arc<dyn RoleAgent>> {
        self.agents.get(&role).cloned()
    }

    pub fn get_required(&self, role: Role) -> CoreResult<Arc<dyn RoleAgent>> {
        self.get(role).ok_or(CoreError::MissingAgent(role))
    }

    pub fn contains(&self, role: Role) -> bool {
        self.agents.contains_key(&role)
    }

    /// Roles with no agent registered.
    pub fn missing(&self) -> Vec<Role> {
        Role::all()
            .iter()
            .copied()
            .filter(|r| !self.contains(*r))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

impl std::fmt::Debug for AgentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut roles: Vec<_> = self.agents.keys().collect();
        roles.sort();
        f.debug_struct("AgentRegistry").field("roles", &roles).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo(Role);

    #[async_trait]
    impl RoleAgent for Echo {
        fn role(&self) -> Role {
            self.0
        }

        async fn perform(&self, task: &Task, _context: &TaskContext) -> Result<Outcome, RoleError> {
            Ok(Outcome::succeeded(self.0).with_summary(task.description.clone()))
        }
    }

    #[test]
    fn test_registry_reports_missing_roles() {
        let mut registry = AgentRegistry::new();
        registry.register(Arc::new(Echo(Role::Developer)));
        registry.register(Arc::new(Echo(Role::QaEngineer)));

        assert_eq!(registry.len(), 2);
        assert!(registry.contains(Role::Developer));
        assert_eq!(
            registry.missing(),
            vec![Role::ProjectManager, Role::Architect, Role::TechLead]
        );
        assert!(matches!(
            registry.get_required(Role::Architect),
            Err(CoreError::MissingAgent(Role::Architect))
        ));
    }

    #[tokio::test]
    async fn test_agent_through_registry() {
        let mut registry = AgentRegistry::new();
        registry.register(Arc::new(Echo(Role::TechLead)));

        let task = Task {
            work_item_id: WorkItemId::new(),
            kind: WorkItemKind::Feature,
            role: Role::TechLead,
            description: "review login".to_string(),
            attempt: 1,
        };
        let agent = registry.get_required(Role::TechLead).unwrap();
        let outcome = agent.perform(&task, &TaskContext::new("reqs")).await.unwrap();
        assert!(outcome.is_success());
        assert_eq!(outcome.summary, "review login");
    }

    #[test]
    fn test_failed_outcome_builder() {
        let outcome = Outcome::failed(Role::QaEngineer)
            .with_issue(RaisedIssue::new("login test fails").at(IssueStage::Testing));
        assert!(!outcome.is_success());
        assert_eq!(outcome.issues[0].stage, Some(IssueStage::Testing));
    }
}
