//! Sprint planning: turning features and open issues into work items.

use tracing::{debug, info, warn};

use crate::artifact::Artifact;
use crate::issue::{IntegrationIssue, IssueId};
use crate::queue::{Priority, WorkQueue};
use crate::role::Role;
use crate::run::WorkflowRun;
use crate::work_item::{WorkItem, WorkItemId, WorkItemKind};

/// Creates work items and keeps issues in step with their fixes.
#[derive(Debug, Default)]
pub struct SprintPlanner {
    sprint: u32,
}

impl SprintPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Planning passes run so far.
    pub fn sprint(&self) -> u32 {
        self.sprint
    }

    /// Enqueue one Developer work item per feature.
    pub fn plan_features(
        &self,
        queue: &mut WorkQueue,
        features: &[String],
        context: &[Artifact],
    ) -> Vec<WorkItemId> {
        features
            .iter()
            .map(|feature| {
                let item = WorkItem::new(Role::Developer, WorkItemKind::Feature, feature.clone())
                    .with_context(context.to_vec());
                queue.enqueue(item, Priority::Normal)
            })
            .collect()
    }

    /// Create exactly one work item per open issue, ahead of normal work.
    ///
    /// `context_for` supplies the artifacts a fix item starts from.
    pub fn plan_issues<F>(
        &mut self,
        run: &mut WorkflowRun,
        queue: &mut WorkQueue,
        context_for: F,
    ) -> Vec<WorkItemId>
    where
        F: Fn(&IntegrationIssue) -> Vec<Artifact>,
    {
        self.sprint += 1;
        let mut planned = Vec::new();

        for issue in run.open_issues_mut() {
            let role = issue.stage.target_role();
            let item = WorkItem::new(
                role,
                WorkItemKind::IssueFix,
                format!("Resolve {} issue: {}", issue.stage, issue.description),
            )
            .with_parent(issue.id)
            .with_context(context_for(issue));

            issue.fix_item = Some(item.id);
            debug!(
                "Sprint {}: issue {} routed to {} as item {}",
                self.sprint,
                issue.id,
                role,
                item.id.short()
            );
            planned.push(queue.enqueue(item, Priority::Issue));
        }

        info!("Sprint {} planned {} issue fixes", self.sprint, planned.len());
        planned
    }

    /// Resolve the issue whose fix item just succeeded, if any.
    pub fn record_success(&self, run: &mut WorkflowRun, issue: Option<IssueId>, item: WorkItemId) {
        let Some(issue_id) = issue else { return };
        if let Some(issue) = run.issue_mut(issue_id) {
            if issue.fix_item == Some(item) {
                issue.resolve();
                info!("Issue {} resolved by item {}", issue_id, item.short());
            }
        }
    }

    /// Note a failed fix; the issue stays open for the next pass.
    pub fn record_failed_fix(&self, run: &mut WorkflowRun, issue_id: IssueId, reason: &str) {
        if let Some(issue) = run.issue_mut(issue_id) {
            issue.failed_fixes += 1;
            warn!(
                "Fix for issue {} failed ({} so far): {}",
                issue_id, issue.failed_fixes, reason
            );
        }
    }
}
