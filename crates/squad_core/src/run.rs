//! Workflow run state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::issue::{IntegrationIssue, IssueId};
use crate::work_item::WorkItemId;

/// Stage of a workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    RequirementsAnalysis,
    ArchitectureReview,
    DevelopmentCycle,
    IntegrationReview,
    WorkPlanning,
    Done,
    Failed,
}

impl Stage {
    /// Whether the state machine allows `self -> to`.
    pub fn can_transition_to(&self, to: Stage) -> bool {
        use Stage::*;
        if to == Failed {
            return !self.is_terminal();
        }
        matches!(
            (self, to),
            (RequirementsAnalysis, ArchitectureReview)
                | (ArchitectureReview, DevelopmentCycle)
                | (DevelopmentCycle, IntegrationReview)
                | (IntegrationReview, Done)
                | (IntegrationReview, WorkPlanning)
                | (WorkPlanning, DevelopmentCycle)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Done | Stage::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::RequirementsAnalysis => "requirements_analysis",
            Stage::ArchitectureReview => "architecture_review",
            Stage::DevelopmentCycle => "development_cycle",
            Stage::IntegrationReview => "integration_review",
            Stage::WorkPlanning => "work_planning",
            Stage::Done => "done",
            Stage::Failed => "failed",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One entry in the transition log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub stage: Stage,
    pub timestamp: DateTime<Utc>,
    pub work_item_id: Option<WorkItemId>,
    pub reason: Option<String>,
}

/// A single end-to-end run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRun {
    pub id: Uuid,
    stage: Stage,
    transitions: Vec<TransitionRecord>,
    issues: Vec<IntegrationIssue>,
    cycles: u32,
    failure: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl WorkflowRun {
    /// Start a run in `RequirementsAnalysis`, logging the initial stage.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            stage: Stage::RequirementsAnalysis,
            transitions: vec![TransitionRecord {
                stage: Stage::RequirementsAnalysis,
                timestamp: now,
                work_item_id: None,
                reason: None,
            }],
            issues: Vec::new(),
            cycles: 0,
            failure: None,
            started_at: now,
            finished_at: None,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn transitions(&self) -> &[TransitionRecord] {
        &self.transitions
    }

    /// Every issue raised, resolved or not.
    pub fn issues(&self) -> &[IntegrationIssue] {
        &self.issues
    }

    pub fn open_issues(&self) -> impl Iterator<Item = &IntegrationIssue> {
        self.issues.iter().filter(|i| !i.is_resolved())
    }

    pub fn open_issue_count(&self) -> usize {
        self.open_issues().count()
    }

    /// Visits to `DevelopmentCycle` so far.
    pub fn cycles(&self) -> u32 {
        self.cycles
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    pub fn is_terminal(&self) -> bool {
        self.stage.is_terminal()
    }

    /// Move to `to`, appending to the transition log first.
    ///
    /// `Done` is refused while any issue is open.
    pub fn transition(
        &mut self,
        to: Stage,
        work_item_id: Option<WorkItemId>,
        reason: Option<String>,
    ) -> CoreResult<&TransitionRecord> {
        if !self.stage.can_transition_to(to) {
            return Err(CoreError::InvalidStage {
                from: self.stage,
                to,
            });
        }
        if to == Stage::Done && self.open_issue_count() > 0 {
            return Err(CoreError::InvalidState(format!(
                "{} integration issues still open",
                self.open_issue_count()
            )));
        }

        let now = Utc::now();
        self.transitions.push(TransitionRecord {
            stage: to,
            timestamp: now,
            work_item_id,
            reason: reason.clone(),
        });
        self.stage = to;

        match to {
            Stage::DevelopmentCycle => self.cycles += 1,
            Stage::Failed => self.failure = reason,
            _ => {}
        }
        if to.is_terminal() {
            self.finished_at = Some(now);
        }

        Ok(&self.transitions[self.transitions.len() - 1])
    }

    /// Record a new integration issue.
    pub fn raise_issue(&mut self, issue: IntegrationIssue) -> IssueId {
        let id = issue.id;
        self.issues.push(issue);
        id
    }

    pub fn issue(&self, id: IssueId) -> Option<&IntegrationIssue> {
        self.issues.iter().find(|i| i.id == id)
    }

    pub(crate) fn issue_mut(&mut self, id: IssueId) -> Option<&mut IntegrationIssue> {
        self.issues.iter_mut().find(|i| i.id == id)
    }

    pub(crate) fn open_issues_mut(&mut self) -> impl Iterator<Item = &mut IntegrationIssue> {
        self.issues.iter_mut().filter(|i| !i.is_resolved())
    }
}

impl Default for WorkflowRun {
    fn default() -> Self {
        Self::new()
    }
}
