//! Integration issues raised during a run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::role::Role;
use crate::work_item::{WorkItemId, WorkItemKind};

/// Unique identifier for an integration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IssueId(Uuid);

impl IssueId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for IssueId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for IssueId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where in the process an issue surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueStage {
    Requirements,
    Architecture,
    Implementation,
    CodeReview,
    Testing,
    IntegrationReview,
}

impl IssueStage {
    /// Role that fixes issues raised at this stage.
    pub fn target_role(&self) -> Role {
        match self {
            IssueStage::Testing => Role::QaEngineer,
            IssueStage::CodeReview => Role::TechLead,
            _ => Role::Developer,
        }
    }

    /// Stage to blame when `role` gave up on an item of `kind`.
    pub fn for_failure(kind: WorkItemKind, role: Role) -> Self {
        match (kind, role) {
            (_, Role::QaEngineer) => IssueStage::Testing,
            (_, Role::TechLead) => IssueStage::CodeReview,
            (_, Role::Developer) => IssueStage::Implementation,
            (WorkItemKind::IntegrationReview, _) => IssueStage::IntegrationReview,
            (_, Role::Architect) => IssueStage::Architecture,
            (_, Role::ProjectManager) => IssueStage::Requirements,
        }
    }

    /// Parse the loose labels models tend to produce.
    pub fn parse_label(label: &str) -> Option<Self> {
        let normalized = label.trim().to_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "requirements" | "requirements_analysis" => Some(IssueStage::Requirements),
            "architecture" | "architecture_review" | "design" => Some(IssueStage::Architecture),
            "implementation" | "development" | "code" => Some(IssueStage::Implementation),
            "code_review" | "review" => Some(IssueStage::CodeReview),
            "testing" | "test" | "tests" | "qa" => Some(IssueStage::Testing),
            "integration" | "integration_review" => Some(IssueStage::IntegrationReview),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IssueStage::Requirements => "requirements",
            IssueStage::Architecture => "architecture",
            IssueStage::Implementation => "implementation",
            IssueStage::CodeReview => "code_review",
            IssueStage::Testing => "testing",
            IssueStage::IntegrationReview => "integration_review",
        }
    }
}

impl std::fmt::Display for IssueStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A problem that needs its own work item to fix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrationIssue {
    pub id: IssueId,
    pub description: String,
    /// Work item whose outcome surfaced the issue.
    pub origin: WorkItemId,
    pub stage: IssueStage,
    resolved: bool,
    /// Most recent work item spawned to fix the issue.
    pub fix_item: Option<WorkItemId>,
    /// Fix items that ended Failed.
    pub failed_fixes: u32,
    pub raised_at: DateTime<Utc>,
}

impl IntegrationIssue {
    pub fn new(description: impl Into<String>, origin: WorkItemId, stage: IssueStage) -> Self {
        Self {
            id: IssueId::new(),
            description: description.into(),
            origin,
            stage,
            resolved: false,
            fix_item: None,
            failed_fixes: 0,
            raised_at: Utc::now(),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    pub(crate) fn resolve(&mut self) {
        self.resolved = true;
    }
}
