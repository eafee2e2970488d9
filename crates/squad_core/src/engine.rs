//! Workflow engine.
//!
//! The engine owns the [`WorkflowRun`] and the [`WorkQueue`]. It walks the
//! run through its stages, dispatching work items to a bounded pool of
//! tokio tasks. Workers only call role agents; they report back over a
//! channel and the engine alone applies the results:
//!
//! ```text
//! RequirementsAnalysis -> ArchitectureReview -> DevelopmentCycle -> IntegrationReview -> Done
//!                                                      ^                    |
//!                                                      +--- WorkPlanning <--+
//! ```
//!
//! Any stage may end in `Failed` on a fatal provider error, cancellation, or
//! when the development cycle has been visited `max_cycles` times.

use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use squad_llm::TokenUsage;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::agent::{AgentRegistry, Outcome, RoleError, Task, TaskContext};
use crate::artifact::{Artifact, ArtifactStore};
use crate::config::EngineConfig;
use crate::error::{CoreError, CoreResult, ProviderError};
use crate::issue::{IntegrationIssue, IssueId, IssueStage};
use crate::journal::RunJournal;
use crate::planner::SprintPlanner;
use crate::queue::{Priority, WorkQueue};
use crate::role::Role;
use crate::run::{Stage, WorkflowRun};
use crate::work_item::{WorkItem, WorkItemId, WorkItemKind, WorkItemStatus};

/// Reason recorded when the cycle guard trips.
pub const CYCLE_LIMIT_REASON: &str = "cycle limit exceeded";
/// Reason recorded when the run is cancelled.
pub const CANCELLED_REASON: &str = "run cancelled";

/// Input to a run.
#[derive(Debug, Clone, Default)]
pub struct ProjectBrief {
    pub requirements: String,
    pub spec: serde_json::Value,
}

impl ProjectBrief {
    pub fn new(requirements: impl Into<String>) -> Self {
        Self {
            requirements: requirements.into(),
            spec: serde_json::Value::Null,
        }
    }

    pub fn with_spec(mut self, spec: serde_json::Value) -> Self {
        self.spec = spec;
        self
    }
}

/// Everything known about a finished run.
#[derive(Debug)]
pub struct RunReport {
    pub run: WorkflowRun,
    pub work_items: Vec<WorkItem>,
    pub usage: BTreeMap<Role, TokenUsage>,
    pub features: Vec<String>,
    pub journal_dir: Option<PathBuf>,
    /// At least one transition could not be appended to the journal.
    pub journal_degraded: bool,
}

impl RunReport {
    pub fn stage(&self) -> Stage {
        self.run.stage()
    }

    pub fn succeeded(&self) -> bool {
        self.run.stage() == Stage::Done
    }

    /// Process exit code: 0 when Done, 1 otherwise.
    pub fn exit_code(&self) -> u8 {
        if self.succeeded() {
            0
        } else {
            1
        }
    }

    pub fn count(&self, status: WorkItemStatus) -> usize {
        self.work_items
            .iter()
            .filter(|i| i.status() == status)
            .count()
    }

    /// Work items that reached Succeeded or Failed.
    pub fn processed_count(&self) -> usize {
        self.count(WorkItemStatus::Succeeded) + self.count(WorkItemStatus::Failed)
    }

    pub fn resolved_issues(&self) -> Vec<&IntegrationIssue> {
        self.run.issues().iter().filter(|i| i.is_resolved()).collect()
    }

    pub fn unresolved_issues(&self) -> Vec<&IntegrationIssue> {
        self.run.open_issues().collect()
    }

    pub fn total_usage(&self) -> TokenUsage {
        let mut total = TokenUsage::default();
        for usage in self.usage.values() {
            total.add(*usage);
        }
        total
    }

    pub fn work_item(&self, id: WorkItemId) -> Option<&WorkItem> {
        self.work_items.iter().find(|i| i.id == id)
    }

    /// Serializable digest written to `summary.json`.
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            run_id: self.run.id,
            stage: self.run.stage(),
            failure_reason: self.run.failure_reason().map(str::to_string),
            started_at: self.run.started_at,
            finished_at: self.run.finished_at,
            cycles: self.run.cycles(),
            features: self.features.clone(),
            work_items: self
                .work_items
                .iter()
                .map(|i| WorkItemSummary {
                    id: i.id,
                    role: i.role,
                    kind: i.kind,
                    description: i.description.clone(),
                    status: i.status(),
                    attempts: i.attempts(),
                    parent: i.parent,
                })
                .collect(),
            issues: self.run.issues().to_vec(),
            usage: self.usage.clone(),
            journal_degraded: self.journal_degraded,
        }
    }
}

/// Persisted digest of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub stage: Stage,
    pub failure_reason: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub cycles: u32,
    pub features: Vec<String>,
    pub work_items: Vec<WorkItemSummary>,
    pub issues: Vec<IntegrationIssue>,
    pub usage: BTreeMap<Role, TokenUsage>,
    /// `transitions.jsonl` is missing records for this run.
    #[serde(default)]
    pub journal_degraded: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkItemSummary {
    pub id: WorkItemId,
    pub role: Role,
    pub kind: WorkItemKind,
    pub description: String,
    pub status: WorkItemStatus,
    pub attempts: u32,
    pub parent: Option<IssueId>,
}

/// How a worker's pass over a work item ended.
#[derive(Debug)]
enum Verdict {
    Completed,
    Rejected {
        role: Role,
        feedback: Vec<Artifact>,
        reason: String,
    },
    Exhausted {
        role: Role,
        reason: String,
    },
    Errored {
        role: Role,
        reason: String,
    },
    Fatal {
        role: Role,
        reason: String,
    },
    /// The run was halted before `role` could start its step.
    Cancelled {
        role: Role,
    },
}

#[derive(Debug)]
struct WorkerReport {
    item_id: WorkItemId,
    outcomes: Vec<Outcome>,
    verdict: Verdict,
}

enum Abort {
    Fatal(String),
    Cancelled,
}

impl Abort {
    fn reason(&self) -> String {
        match self {
            Abort::Fatal(reason) => reason.clone(),
            Abort::Cancelled => CANCELLED_REASON.to_string(),
        }
    }
}

/// Items that finished during one drain of the queue.
#[derive(Default)]
struct Drained {
    succeeded: Vec<(WorkItemId, Vec<Outcome>)>,
    failed: Vec<WorkItemId>,
}

struct RunState {
    run: WorkflowRun,
    queue: WorkQueue,
    planner: SprintPlanner,
    usage: BTreeMap<Role, TokenUsage>,
    features: Vec<String>,
    /// Requirements and architecture artifacts every delivery item sees.
    baseline: Vec<Artifact>,
    /// Items finished in the latest development cycle.
    cycle_succeeded: Vec<WorkItemId>,
    cycle_failed: Vec<WorkItemId>,
    journal: Option<RunJournal>,
    journal_degraded: bool,
    abort: Option<Abort>,
    /// Stops workers between pipeline steps. Cancelled with the engine
    /// token or on a fatal provider error.
    halt: CancellationToken,
}

/// Drives a run from requirements to a terminal stage.
pub struct WorkflowEngine {
    agents: Arc<AgentRegistry>,
    store: Arc<ArtifactStore>,
    config: EngineConfig,
    cancel: CancellationToken,
    journal_root: Option<PathBuf>,
}

impl WorkflowEngine {
    /// Create an engine. Every role must have an agent.
    pub fn new(
        agents: AgentRegistry,
        store: Arc<ArtifactStore>,
        config: EngineConfig,
    ) -> CoreResult<Self> {
        config.validate()?;
        if let Some(role) = agents.missing().first() {
            return Err(CoreError::MissingAgent(*role));
        }

        Ok(Self {
            agents: Arc::new(agents),
            store,
            config,
            cancel: CancellationToken::new(),
            journal_root: None,
        })
    }

    /// Persist transitions and the summary under `output/.squad/runs`.
    pub fn with_journal(mut self, output: impl Into<PathBuf>) -> Self {
        self.journal_root = Some(output.into());
        self
    }

    /// Token that aborts the run when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn store(&self) -> &Arc<ArtifactStore> {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run the whole workflow. Always ends in `Done` or `Failed`.
    pub async fn run(&self, brief: ProjectBrief) -> RunReport {
        let brief = Arc::new(brief);
        let run = WorkflowRun::new();
        let (journal, journal_degraded) = match self.journal_root.as_deref() {
            Some(root) => open_journal(root, &run),
            None => (None, false),
        };

        let mut state = RunState {
            run,
            queue: WorkQueue::new(),
            planner: SprintPlanner::new(),
            usage: BTreeMap::new(),
            features: Vec::new(),
            baseline: Vec::new(),
            cycle_succeeded: Vec::new(),
            cycle_failed: Vec::new(),
            journal,
            journal_degraded,
            abort: None,
            halt: self.cancel.child_token(),
        };

        info!("Starting run {}", state.run.id);

        while !state.run.is_terminal() {
            let step = match state.run.stage() {
                Stage::RequirementsAnalysis => self.analyze_requirements(&mut state, &brief).await,
                Stage::ArchitectureReview => self.review_architecture(&mut state, &brief).await,
                Stage::DevelopmentCycle => self.develop(&mut state, &brief).await,
                Stage::IntegrationReview => self.review_integration(&mut state, &brief).await,
                Stage::WorkPlanning => self.plan_work(&mut state),
                Stage::Done | Stage::Failed => break,
            };
            if let Err(e) = step {
                error!("Run {} hit an internal error: {}", state.run.id, e);
                self.fail(&mut state, format!("internal error: {}", e));
            }
        }

        let report = RunReport {
            journal_dir: state.journal.as_ref().map(|j| j.dir().to_path_buf()),
            run: state.run,
            work_items: state.queue.into_items(),
            usage: state.usage,
            features: state.features,
            journal_degraded: state.journal_degraded,
        };

        if let Some(journal) = &state.journal {
            if let Err(e) = journal.write_summary(&report.summary()) {
                warn!("Failed to write run summary: {}", e);
            }
        }

        match report.stage() {
            Stage::Done => info!(
                "Run {} done: {} items succeeded, {} issues resolved",
                report.run.id,
                report.count(WorkItemStatus::Succeeded),
                report.resolved_issues().len()
            ),
            _ => warn!(
                "Run {} failed: {}",
                report.run.id,
                report.run.failure_reason().unwrap_or("unknown")
            ),
        }
        report
    }

    async fn analyze_requirements(
        &self,
        state: &mut RunState,
        brief: &Arc<ProjectBrief>,
    ) -> CoreResult<()> {
        let item = WorkItem::new(
            Role::ProjectManager,
            WorkItemKind::Requirements,
            "Analyze the requirements and break them into features",
        );
        let id = state.queue.enqueue(item, Priority::Normal);

        let Some(drained) = self.drain(state, brief).await? else {
            return Ok(());
        };
        self.absorb(state, &drained, IssueStage::Requirements);
        state.baseline.extend(self.store.for_work_item(id));

        self.advance(state, Stage::ArchitectureReview, Some(id), None)
    }

    async fn review_architecture(
        &self,
        state: &mut RunState,
        brief: &Arc<ProjectBrief>,
    ) -> CoreResult<()> {
        let item = WorkItem::new(
            Role::Architect,
            WorkItemKind::Architecture,
            "Design the project structure, components and dependencies",
        )
        .with_context(state.baseline.clone());
        let id = state.queue.enqueue(item, Priority::Normal);

        let Some(drained) = self.drain(state, brief).await? else {
            return Ok(());
        };
        self.absorb(state, &drained, IssueStage::Architecture);
        state.baseline.extend(self.store.for_work_item(id));

        if state.features.is_empty() {
            info!("No features proposed; planning a single feature for the whole requirements");
            state.features = vec!["Implement the project as described in the requirements".to_string()];
        }

        if !self.enter_development(state, Some(id), None)? {
            return Ok(());
        }
        let planned = state
            .planner
            .plan_features(&mut state.queue, &state.features, &state.baseline);
        info!("Planned {} feature work items", planned.len());
        Ok(())
    }

    async fn develop(&self, state: &mut RunState, brief: &Arc<ProjectBrief>) -> CoreResult<()> {
        state.cycle_succeeded.clear();
        state.cycle_failed.clear();

        let Some(drained) = self.drain(state, brief).await? else {
            return Ok(());
        };
        state.cycle_succeeded = drained.succeeded.iter().map(|(id, _)| *id).collect();
        state.cycle_failed = drained.failed;

        self.advance(state, Stage::IntegrationReview, None, None)
    }

    async fn review_integration(
        &self,
        state: &mut RunState,
        brief: &Arc<ProjectBrief>,
    ) -> CoreResult<()> {
        let mut context = state.baseline.clone();
        for id in &state.cycle_succeeded {
            context.extend(self.store.for_work_item(*id));
        }

        let failed: Vec<String> = state
            .cycle_failed
            .iter()
            .filter_map(|id| state.queue.get(*id))
            .map(|i| format!("- {}", i.description))
            .collect();
        let mut description = format!(
            "Review the integration of {} completed work items",
            state.cycle_succeeded.len()
        );
        if !failed.is_empty() {
            description.push_str(&format!("\nWork items that failed:\n{}", failed.join("\n")));
        }

        let item = WorkItem::new(Role::Architect, WorkItemKind::IntegrationReview, description)
            .with_context(context);
        let id = state.queue.enqueue(item, Priority::Normal);

        let Some(drained) = self.drain(state, brief).await? else {
            return Ok(());
        };
        self.absorb(state, &drained, IssueStage::IntegrationReview);

        let open = state.run.open_issue_count();
        if open == 0 {
            self.advance(state, Stage::Done, Some(id), None)
        } else {
            self.advance(
                state,
                Stage::WorkPlanning,
                Some(id),
                Some(format!("{} open integration issues", open)),
            )
        }
    }

    fn plan_work(&self, state: &mut RunState) -> CoreResult<()> {
        if state.run.cycles() >= self.config.max_cycles {
            self.fail(state, CYCLE_LIMIT_REASON);
            return Ok(());
        }

        let store = &self.store;
        let baseline = &state.baseline;
        let planned = state
            .planner
            .plan_issues(&mut state.run, &mut state.queue, |issue| {
                let mut context = baseline.clone();
                context.extend(store.for_work_item(issue.origin));
                context
            });

        self.enter_development(
            state,
            planned.first().copied(),
            Some(format!("{} issue fixes planned", planned.len())),
        )?;
        Ok(())
    }

    /// Move into `DevelopmentCycle` unless the cycle guard trips.
    fn enter_development(
        &self,
        state: &mut RunState,
        trigger: Option<WorkItemId>,
        reason: Option<String>,
    ) -> CoreResult<bool> {
        if state.run.cycles() >= self.config.max_cycles {
            self.fail(state, CYCLE_LIMIT_REASON);
            return Ok(false);
        }
        self.advance(state, Stage::DevelopmentCycle, trigger, reason)?;
        Ok(true)
    }

    /// Pull features and issues out of planning and review outcomes.
    fn absorb(&self, state: &mut RunState, drained: &Drained, default_stage: IssueStage) {
        for (item_id, outcomes) in &drained.succeeded {
            for outcome in outcomes {
                if !outcome.features.is_empty() {
                    debug!("{} proposed {} features", outcome.role, outcome.features.len());
                    state.features = outcome.features.clone();
                }
                for raised in &outcome.issues {
                    let stage = raised.stage.unwrap_or(default_stage);
                    let issue = IntegrationIssue::new(raised.description.clone(), *item_id, stage);
                    info!("{} raised {} issue: {}", outcome.role, stage, raised.description);
                    state.run.raise_issue(issue);
                }
            }
        }
    }

    /// Record a transition, then persist it.
    fn advance(
        &self,
        state: &mut RunState,
        to: Stage,
        trigger: Option<WorkItemId>,
        reason: Option<String>,
    ) -> CoreResult<()> {
        let from = state.run.stage();
        let record = state.run.transition(to, trigger, reason)?.clone();
        if let Some(journal) = &state.journal {
            if let Err(e) = journal.append(&record) {
                warn!("Failed to journal transition to {}: {}", to, e);
                state.journal_degraded = true;
            }
        }
        info!("Run {}: {} -> {}", state.run.id, from, to);
        Ok(())
    }

    /// End the run in `Failed`, cancelling whatever is still queued.
    fn fail(&self, state: &mut RunState, reason: impl Into<String>) {
        if state.run.is_terminal() {
            return;
        }
        let reason = reason.into();
        let cancelled = state.queue.cancel_pending();
        if !cancelled.is_empty() {
            info!("Cancelled {} pending work items", cancelled.len());
        }
        error!("Run {} failing: {}", state.run.id, reason);
        if let Err(e) = self.advance(state, Stage::Failed, None, Some(reason)) {
            warn!("Could not record failure: {}", e);
        }
    }

    /// Dispatch queued items until the queue is empty and nothing is in flight.
    ///
    /// Returns `None` when the run was aborted; the run is already `Failed`.
    async fn drain(
        &self,
        state: &mut RunState,
        brief: &Arc<ProjectBrief>,
    ) -> CoreResult<Option<Drained>> {
        let workers = self.config.workers.max(1);
        let (tx, mut rx) = mpsc::channel::<WorkerReport>(workers);
        let mut in_flight = 0usize;
        let mut drained = Drained::default();

        loop {
            while state.abort.is_none() && in_flight < workers {
                if state.halt.is_cancelled() {
                    warn!("Cancellation requested; dispatching stops");
                    state.abort.get_or_insert(Abort::Cancelled);
                    break;
                }
                let Some(item) = state.queue.claim_next() else {
                    break;
                };

                info!(
                    "Dispatching {} item {} to {} (attempt {})",
                    item.kind,
                    item.id.short(),
                    item.role,
                    item.attempts()
                );

                let context = TaskContext {
                    requirements: brief.requirements.clone(),
                    spec: brief.spec.clone(),
                    artifacts: item.context.clone(),
                    feedback: item.feedback.clone(),
                };
                let agents = Arc::clone(&self.agents);
                let halt = state.halt.clone();
                let tx = tx.clone();
                tokio::spawn(async move {
                    let item_id = item.id;
                    let role = item.role;
                    let report = AssertUnwindSafe(execute(agents, item, context, halt))
                        .catch_unwind()
                        .await
                        .unwrap_or_else(|_| WorkerReport {
                            item_id,
                            outcomes: Vec::new(),
                            verdict: Verdict::Errored {
                                role,
                                reason: "worker panicked".to_string(),
                            },
                        });
                    let _ = tx.send(report).await;
                });
                in_flight += 1;
            }

            if in_flight == 0 {
                break;
            }
            match rx.recv().await {
                Some(report) => {
                    in_flight -= 1;
                    self.apply(state, report, &mut drained)?;
                }
                None => break,
            }
        }

        match state.abort.take() {
            Some(abort) => {
                self.fail(state, abort.reason());
                Ok(None)
            }
            None => Ok(Some(drained)),
        }
    }

    /// Fold one worker report into the queue and run.
    fn apply(
        &self,
        state: &mut RunState,
        report: WorkerReport,
        drained: &mut Drained,
    ) -> CoreResult<()> {
        for outcome in &report.outcomes {
            state.usage.entry(outcome.role).or_default().add(outcome.usage);
        }

        let id = report.item_id;
        let item = state
            .queue
            .get(id)
            .cloned()
            .ok_or(CoreError::WorkItemNotFound(id))?;

        match report.verdict {
            Verdict::Completed => {
                state.queue.complete(id)?;
                state.planner.record_success(&mut state.run, item.parent, id);
                info!(
                    "Work item {} succeeded after {} attempt(s)",
                    id.short(),
                    item.attempts()
                );
                drained.succeeded.push((id, report.outcomes));
            }
            Verdict::Rejected {
                role,
                feedback,
                reason,
            } => {
                warn!(
                    "{} rejected work item {} (attempt {}/{}): {}",
                    role,
                    id.short(),
                    item.attempts(),
                    self.config.max_attempts,
                    reason
                );
                self.retry_or_escalate(state, &item, role, feedback, reason, drained)?;
            }
            Verdict::Errored { role, reason } => {
                warn!(
                    "{} could not process work item {} (attempt {}/{}): {}",
                    role,
                    id.short(),
                    item.attempts(),
                    self.config.max_attempts,
                    reason
                );
                self.retry_or_escalate(state, &item, role, Vec::new(), reason, drained)?;
            }
            Verdict::Exhausted { role, reason } => {
                state.queue.fail(id)?;
                self.escalate(state, &item, role, &reason);
                drained.failed.push(id);
            }
            Verdict::Fatal { role, reason } => {
                state.queue.cancel(id)?;
                if state.abort.is_none() {
                    state.abort = Some(Abort::Fatal(format!(
                        "fatal provider error at {}: {}",
                        role, reason
                    )));
                }
                state.halt.cancel();
            }
            Verdict::Cancelled { role } => {
                info!(
                    "Work item {} stopped before its {} step",
                    id.short(),
                    role
                );
                state.queue.cancel(id)?;
                state.abort.get_or_insert(Abort::Cancelled);
            }
        }
        Ok(())
    }

    fn retry_or_escalate(
        &self,
        state: &mut RunState,
        item: &WorkItem,
        role: Role,
        feedback: Vec<Artifact>,
        reason: String,
        drained: &mut Drained,
    ) -> CoreResult<()> {
        if item.attempts() < self.config.max_attempts {
            state.queue.requeue(item.id, feedback)?;
        } else {
            state.queue.fail(item.id)?;
            self.escalate(state, item, role, &reason);
            drained.failed.push(item.id);
        }
        Ok(())
    }

    /// Turn a failed work item into an integration issue.
    ///
    /// A failed fix counts against its existing issue instead.
    fn escalate(&self, state: &mut RunState, item: &WorkItem, role: Role, reason: &str) {
        match item.parent {
            Some(issue_id) => state.planner.record_failed_fix(&mut state.run, issue_id, reason),
            None => {
                let stage = IssueStage::for_failure(item.kind, role);
                let issue = IntegrationIssue::new(
                    format!("{}: {}", item.description, reason),
                    item.id,
                    stage,
                );
                warn!(
                    "Work item {} failed after {} attempt(s); raised {} issue",
                    item.id.short(),
                    item.attempts(),
                    stage
                );
                state.run.raise_issue(issue);
            }
        }
    }
}

impl std::fmt::Debug for WorkflowEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowEngine")
            .field("agents", &self.agents)
            .field("config", &self.config)
            .field("journal_root", &self.journal_root)
            .finish()
    }
}

/// Open the run's journal and record its initial stage. The flag is set
/// when that first record could not be written.
fn open_journal(root: &Path, run: &WorkflowRun) -> (Option<RunJournal>, bool) {
    let journal = match RunJournal::create(root, run.id) {
        Ok(journal) => journal,
        Err(e) => {
            warn!("Run journal disabled: {}", e);
            return (None, false);
        }
    };
    let mut degraded = false;
    for record in run.transitions() {
        if let Err(e) = journal.append(record) {
            warn!("Failed to journal initial stage: {}", e);
            degraded = true;
        }
    }
    (Some(journal), degraded)
}

/// Run a work item through its pipeline. Steps run in order; the first
/// rejection or error ends the pass. `halt` is checked before every step,
/// so a step already talking to the provider finishes but no new one starts.
async fn execute(
    agents: Arc<AgentRegistry>,
    item: WorkItem,
    base: TaskContext,
    halt: CancellationToken,
) -> WorkerReport {
    let mut outcomes: Vec<Outcome> = Vec::new();
    let mut upstream: Vec<Artifact> = Vec::new();

    for &role in item.pipeline() {
        let finish = |outcomes: Vec<Outcome>, verdict: Verdict| WorkerReport {
            item_id: item.id,
            outcomes,
            verdict,
        };

        if halt.is_cancelled() {
            return finish(outcomes, Verdict::Cancelled { role });
        }

        let agent = match agents.get_required(role) {
            Ok(agent) => agent,
            Err(e) => {
                return finish(
                    outcomes,
                    Verdict::Errored {
                        role,
                        reason: e.to_string(),
                    },
                )
            }
        };

        let task = Task {
            work_item_id: item.id,
            kind: item.kind,
            role,
            description: item.description.clone(),
            attempt: item.attempts(),
        };
        let mut context = base.clone();
        context.artifacts.extend(upstream.iter().cloned());

        match agent.perform(&task, &context).await {
            Ok(outcome) if outcome.is_success() => {
                debug!("{} finished step for item {}", role, item.id.short());
                upstream.extend(outcome.artifacts.iter().cloned());
                outcomes.push(outcome);
            }
            Ok(outcome) => {
                let feedback = outcome.artifacts.clone();
                let reason = if outcome.summary.is_empty() {
                    format!("rejected by {}", role)
                } else {
                    outcome.summary.clone()
                };
                outcomes.push(outcome);
                return finish(
                    outcomes,
                    Verdict::Rejected {
                        role,
                        feedback,
                        reason,
                    },
                );
            }
            Err(RoleError::Provider(ProviderError::Fatal(e))) => {
                return finish(
                    outcomes,
                    Verdict::Fatal {
                        role,
                        reason: e.to_string(),
                    },
                )
            }
            Err(RoleError::Provider(e @ ProviderError::Exhausted { .. })) => {
                return finish(
                    outcomes,
                    Verdict::Exhausted {
                        role,
                        reason: e.to_string(),
                    },
                )
            }
            Err(e) => {
                return finish(
                    outcomes,
                    Verdict::Errored {
                        role,
                        reason: e.to_string(),
                    },
                )
            }
        }
    }

    WorkerReport {
        item_id: item.id,
        outcomes,
        verdict: Verdict::Completed,
    }
}
