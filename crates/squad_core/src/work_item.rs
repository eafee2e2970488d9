//! Work items and their lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::artifact::Artifact;
use crate::error::{CoreError, CoreResult};
use crate::issue::IssueId;
use crate::role::Role;

/// Unique identifier for a work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkItemId(Uuid);

impl WorkItemId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// First eight hex digits, for logs and file names.
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Default for WorkItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for WorkItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status of a work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkItemStatus {
    Pending,
    InProgress,
    Succeeded,
    Failed,
    Cancelled,
}

impl WorkItemStatus {
    /// Whether `self -> to` is a legal lifecycle step.
    ///
    /// `InProgress -> Pending` is the requeue step.
    pub fn can_transition_to(&self, to: WorkItemStatus) -> bool {
        use WorkItemStatus::*;
        matches!(
            (self, to),
            (Pending, InProgress)
                | (Pending, Cancelled)
                | (InProgress, Succeeded)
                | (InProgress, Failed)
                | (InProgress, Pending)
                | (InProgress, Cancelled)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for WorkItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a work item exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkItemKind {
    Requirements,
    Architecture,
    Feature,
    IssueFix,
    IntegrationReview,
}

impl WorkItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Requirements => "requirements",
            Self::Architecture => "architecture",
            Self::Feature => "feature",
            Self::IssueFix => "issue_fix",
            Self::IntegrationReview => "integration_review",
        }
    }
}

impl std::fmt::Display for WorkItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One entry of a work item's status history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub status: WorkItemStatus,
    pub at: DateTime<Utc>,
}

/// A unit of work targeting one role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: WorkItemId,
    pub role: Role,
    pub kind: WorkItemKind,
    pub description: String,
    /// Issue this item was spawned to fix.
    pub parent: Option<IssueId>,
    /// Artifacts handed to every attempt.
    pub context: Vec<Artifact>,
    /// Artifacts attached by the most recent rejection.
    pub feedback: Vec<Artifact>,
    status: WorkItemStatus,
    attempts: u32,
    history: Vec<StatusChange>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkItem {
    /// Create a pending work item.
    pub fn new(role: Role, kind: WorkItemKind, description: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: WorkItemId::new(),
            role,
            kind,
            description: description.into(),
            parent: None,
            context: Vec::new(),
            feedback: Vec::new(),
            status: WorkItemStatus::Pending,
            attempts: 0,
            history: vec![StatusChange {
                status: WorkItemStatus::Pending,
                at: now,
            }],
            created_at: now,
            updated_at: now,
        }
    }

    /// Mark the item as spawned from an integration issue.
    pub fn with_parent(mut self, issue: IssueId) -> Self {
        self.parent = Some(issue);
        self
    }

    /// Attach context artifacts.
    pub fn with_context(mut self, artifacts: Vec<Artifact>) -> Self {
        self.context = artifacts;
        self
    }

    pub fn status(&self) -> WorkItemStatus {
        self.status
    }

    /// Number of times the item has been dispatched.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Status history, oldest first. Starts with `Pending`.
    pub fn history(&self) -> &[StatusChange] {
        &self.history
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Roles this item runs through, in order.
    pub fn pipeline(&self) -> &'static [Role] {
        self.role.pipeline()
    }

    /// Move to `to`, counting an attempt on every dispatch.
    pub(crate) fn transition(&mut self, to: WorkItemStatus) -> CoreResult<()> {
        if !self.status.can_transition_to(to) {
            return Err(CoreError::InvalidTransition {
                item: self.id,
                from: self.status,
                to,
            });
        }
        if to == WorkItemStatus::InProgress {
            self.attempts += 1;
        }
        let now = Utc::now();
        self.status = to;
        self.updated_at = now;
        self.history.push(StatusChange { status: to, at: now });
        Ok(())
    }
}
