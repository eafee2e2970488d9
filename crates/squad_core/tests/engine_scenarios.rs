//! End-to-end engine scenarios driven by scripted role agents.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use squad_core::{
    AgentRegistry, Artifact, ArtifactKind, ArtifactStore, CoreError, EngineConfig, IssueStage,
    Outcome, ProjectBrief, ProviderError, RaisedIssue, Role, RoleAgent, RoleError, RunJournal,
    RunReport, Stage, Task, TaskContext, WorkItemKind, WorkItemStatus, WorkflowEngine,
    CANCELLED_REASON, CYCLE_LIMIT_REASON,
};
use squad_llm::{GatewayError, TokenUsage};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

type Behavior =
    Arc<dyn Fn(&ArtifactStore, &Task, &TaskContext, usize) -> Result<Outcome, RoleError> + Send + Sync>;

struct ScriptedAgent {
    role: Role,
    store: Arc<ArtifactStore>,
    calls: AtomicUsize,
    behavior: Behavior,
}

#[async_trait]
impl RoleAgent for ScriptedAgent {
    fn role(&self) -> Role {
        self.role
    }

    async fn perform(&self, task: &Task, context: &TaskContext) -> Result<Outcome, RoleError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        (self.behavior)(&self.store, task, context, call)
    }
}

fn write(store: &ArtifactStore, task: &Task, kind: ArtifactKind, content: &str) -> Artifact {
    store.put(task.work_item_id, kind, content, task.role).unwrap()
}

fn default_behavior(role: Role) -> Behavior {
    Arc::new(move |store: &ArtifactStore, task: &Task, _ctx: &TaskContext, _call: usize| {
        let usage = TokenUsage::new(10, 5);
        let outcome = match role {
            Role::ProjectManager => Outcome::succeeded(role)
                .with_artifact(write(store, task, ArtifactKind::Document, "requirements"))
                .with_features(vec!["login".to_string()]),
            Role::Architect => Outcome::succeeded(role)
                .with_artifact(write(store, task, ArtifactKind::Document, "structure")),
            Role::Developer => Outcome::succeeded(role)
                .with_artifact(write(store, task, ArtifactKind::Code, "fn login() {}")),
            Role::TechLead => Outcome::succeeded(role)
                .with_artifact(write(store, task, ArtifactKind::ReviewReport, "approved")),
            Role::QaEngineer => Outcome::succeeded(role)
                .with_artifact(write(store, task, ArtifactKind::TestResult, "passed")),
        };
        Ok(outcome.with_usage(usage))
    })
}

/// Wrap the default behavior of `role`, counting its calls.
fn counted(role: Role, calls: Arc<AtomicUsize>) -> Behavior {
    let inner = default_behavior(role);
    Arc::new(move |store: &ArtifactStore, task: &Task, ctx: &TaskContext, call: usize| {
        calls.fetch_add(1, Ordering::SeqCst);
        inner(store, task, ctx, call)
    })
}

/// Project manager proposing `count` features.
fn features(count: usize) -> Behavior {
    Arc::new(move |store: &ArtifactStore, task: &Task, _ctx: &TaskContext, _call: usize| {
        Ok(Outcome::succeeded(Role::ProjectManager)
            .with_artifact(write(store, task, ArtifactKind::Document, "requirements"))
            .with_features((1..=count).map(|n| format!("feature {}", n)).collect()))
    })
}

/// Developer that sleeps while recording how many calls overlap.
struct SlowDeveloper {
    store: Arc<ArtifactStore>,
    current: AtomicUsize,
    peak: AtomicUsize,
}

#[async_trait]
impl RoleAgent for SlowDeveloper {
    fn role(&self) -> Role {
        Role::Developer
    }

    async fn perform(&self, task: &Task, _context: &TaskContext) -> Result<Outcome, RoleError> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        self.current.fetch_sub(1, Ordering::SeqCst);
        Ok(Outcome::succeeded(Role::Developer)
            .with_artifact(write(&self.store, task, ArtifactKind::Code, "fn feature() {}")))
    }
}

fn qa_reject(store: &ArtifactStore, task: &Task) -> Result<Outcome, RoleError> {
    Ok(Outcome::failed(Role::QaEngineer)
        .with_artifact(write(store, task, ArtifactKind::TestResult, "login test fails"))
        .with_summary("login test fails"))
}

struct Team {
    store: Arc<ArtifactStore>,
    behaviors: HashMap<Role, Behavior>,
}

impl Team {
    fn new() -> Self {
        let behaviors = Role::all()
            .iter()
            .map(|role| (*role, default_behavior(*role)))
            .collect();
        Self {
            store: Arc::new(ArtifactStore::in_memory()),
            behaviors,
        }
    }

    fn with(mut self, role: Role, behavior: Behavior) -> Self {
        self.behaviors.insert(role, behavior);
        self
    }

    fn registry(&self) -> AgentRegistry {
        let mut registry = AgentRegistry::new();
        for (role, behavior) in &self.behaviors {
            registry.register(Arc::new(ScriptedAgent {
                role: *role,
                store: Arc::clone(&self.store),
                calls: AtomicUsize::new(0),
                behavior: Arc::clone(behavior),
            }));
        }
        registry
    }

    fn engine(&self, config: EngineConfig) -> WorkflowEngine {
        WorkflowEngine::new(self.registry(), Arc::clone(&self.store), config).unwrap()
    }

    async fn run(&self) -> RunReport {
        self.engine(EngineConfig::default())
            .run(ProjectBrief::new("Build a login page"))
            .await
    }
}

fn stages(report: &RunReport) -> Vec<Stage> {
    report.run.transitions().iter().map(|t| t.stage).collect()
}

fn assert_histories_valid(report: &RunReport) {
    for item in &report.work_items {
        let history = item.history();
        assert_eq!(history[0].status, WorkItemStatus::Pending);
        for pair in history.windows(2) {
            assert!(
                pair[0].status.can_transition_to(pair[1].status),
                "illegal step {} -> {} for {}",
                pair[0].status,
                pair[1].status,
                item.description
            );
        }
    }
}

#[tokio::test]
async fn test_happy_path_reaches_done() {
    let team = Team::new();
    let report = team.run().await;

    assert_eq!(report.stage(), Stage::Done);
    assert_eq!(report.exit_code(), 0);
    assert_eq!(
        stages(&report),
        vec![
            Stage::RequirementsAnalysis,
            Stage::ArchitectureReview,
            Stage::DevelopmentCycle,
            Stage::IntegrationReview,
            Stage::Done,
        ]
    );
    assert_eq!(report.features, vec!["login".to_string()]);
    assert_eq!(report.count(WorkItemStatus::Succeeded), report.work_items.len());
    assert!(report.run.issues().is_empty());

    // PM, Architect x2, Developer, TechLead, QA
    assert_eq!(report.total_usage(), TokenUsage::new(60, 30));
    assert_eq!(report.usage[&Role::Architect], TokenUsage::new(20, 10));
    assert_histories_valid(&report);
}

#[tokio::test]
async fn test_scenario_a_qa_fails_once() {
    let team = Team::new().with(
        Role::QaEngineer,
        Arc::new(|store: &ArtifactStore, task: &Task, _ctx: &TaskContext, call: usize| {
            if call == 0 {
                qa_reject(store, task)
            } else {
                Ok(Outcome::succeeded(Role::QaEngineer)
                    .with_artifact(write(store, task, ArtifactKind::TestResult, "passed")))
            }
        }),
    );
    let report = team.run().await;

    assert_eq!(report.stage(), Stage::Done);
    let feature = report
        .work_items
        .iter()
        .find(|i| i.kind == WorkItemKind::Feature)
        .unwrap();
    assert_eq!(feature.status(), WorkItemStatus::Succeeded);
    assert_eq!(feature.attempts(), 2);

    let results = team.store.history(feature.id, ArtifactKind::TestResult);
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].revision, 1);
    assert_eq!(results[1].revision, 2);
    assert_eq!(
        team.store.get_latest(feature.id, ArtifactKind::TestResult).unwrap(),
        results[1]
    );
    assert_eq!(team.store.history(feature.id, ArtifactKind::Code).len(), 2);
    assert!(report.run.issues().is_empty());
    assert_histories_valid(&report);
}

#[tokio::test]
async fn test_rejection_feedback_reaches_developer() {
    let saw_feedback = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&saw_feedback);

    let team = Team::new()
        .with(
            Role::TechLead,
            Arc::new(|store: &ArtifactStore, task: &Task, _ctx: &TaskContext, call: usize| {
                let report = write(store, task, ArtifactKind::ReviewReport, "needs tests");
                if call == 0 {
                    Ok(Outcome::failed(Role::TechLead).with_artifact(report))
                } else {
                    Ok(Outcome::succeeded(Role::TechLead).with_artifact(report))
                }
            }),
        )
        .with(
            Role::Developer,
            Arc::new(move |store: &ArtifactStore, task: &Task, ctx: &TaskContext, _call: usize| {
                if ctx
                    .feedback
                    .iter()
                    .any(|a| a.kind == ArtifactKind::ReviewReport && a.content == "needs tests")
                {
                    seen.fetch_add(1, Ordering::SeqCst);
                }
                Ok(Outcome::succeeded(Role::Developer)
                    .with_artifact(write(store, task, ArtifactKind::Code, "fn login() {}")))
            }),
        );
    let report = team.run().await;

    assert_eq!(report.stage(), Stage::Done);
    assert_eq!(saw_feedback.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_scenario_b_issues_routed_and_resolved() {
    let team = Team::new().with(
        Role::Architect,
        Arc::new(|store: &ArtifactStore, task: &Task, _ctx: &TaskContext, call: usize| {
            let doc = write(store, task, ArtifactKind::Document, "review");
            let outcome = Outcome::succeeded(Role::Architect).with_artifact(doc);
            // call 0 is the architecture design, call 1 the first review
            if task.kind == WorkItemKind::IntegrationReview && call == 1 {
                Ok(outcome
                    .with_issue(RaisedIssue::new("handler lacks error mapping").at(IssueStage::CodeReview))
                    .with_issue(RaisedIssue::new("login test is flaky").at(IssueStage::Testing)))
            } else {
                Ok(outcome)
            }
        }),
    );
    let report = team.run().await;

    assert_eq!(report.stage(), Stage::Done);
    assert_eq!(report.run.issues().len(), 2);
    assert!(report.run.issues().iter().all(|i| i.is_resolved()));
    assert_eq!(report.resolved_issues().len(), 2);
    assert!(report.unresolved_issues().is_empty());

    let fixes: Vec<_> = report
        .work_items
        .iter()
        .filter(|i| i.kind == WorkItemKind::IssueFix)
        .collect();
    assert_eq!(fixes.len(), 2);
    for fix in &fixes {
        assert_eq!(fix.status(), WorkItemStatus::Succeeded);
        let issue = report.run.issue(fix.parent.unwrap()).unwrap();
        assert_eq!(issue.fix_item, Some(fix.id));
        assert_eq!(fix.role, issue.stage.target_role());
    }
    let mut roles: Vec<Role> = fixes.iter().map(|f| f.role).collect();
    roles.sort();
    assert_eq!(roles, vec![Role::TechLead, Role::QaEngineer]);

    assert_eq!(
        stages(&report),
        vec![
            Stage::RequirementsAnalysis,
            Stage::ArchitectureReview,
            Stage::DevelopmentCycle,
            Stage::IntegrationReview,
            Stage::WorkPlanning,
            Stage::DevelopmentCycle,
            Stage::IntegrationReview,
            Stage::Done,
        ]
    );
    assert_eq!(report.run.cycles(), 2);
    assert_histories_valid(&report);
}

#[tokio::test]
async fn test_scenario_c_auth_error_fails_run() {
    let team = Team::new().with(
        Role::ProjectManager,
        Arc::new(|_store: &ArtifactStore, _task: &Task, _ctx: &TaskContext, _call: usize| {
            Err(RoleError::Provider(ProviderError::Fatal(GatewayError::AuthError(
                "invalid key".to_string(),
            ))))
        }),
    );
    let report = team.run().await;

    assert_eq!(report.stage(), Stage::Failed);
    assert_eq!(report.exit_code(), 1);
    assert_eq!(report.processed_count(), 0);
    assert_eq!(stages(&report), vec![Stage::RequirementsAnalysis, Stage::Failed]);
    assert!(report
        .run
        .failure_reason()
        .unwrap()
        .contains("fatal provider error"));
    assert!(report
        .work_items
        .iter()
        .all(|i| i.status() == WorkItemStatus::Cancelled));
    assert!(team.store.is_empty());
}

#[tokio::test]
async fn test_k_failures_then_success() {
    let team = Team::new().with(
        Role::QaEngineer,
        Arc::new(|store: &ArtifactStore, task: &Task, _ctx: &TaskContext, call: usize| {
            if call < 2 {
                qa_reject(store, task)
            } else {
                Ok(Outcome::succeeded(Role::QaEngineer)
                    .with_artifact(write(store, task, ArtifactKind::TestResult, "passed")))
            }
        }),
    );
    let report = team.run().await;

    let feature = report
        .work_items
        .iter()
        .find(|i| i.kind == WorkItemKind::Feature)
        .unwrap();
    assert_eq!(feature.status(), WorkItemStatus::Succeeded);
    assert_eq!(feature.attempts(), 3);
    assert!(report.run.issues().is_empty());
    assert_eq!(report.stage(), Stage::Done);
}

#[tokio::test]
async fn test_max_attempts_exhausted_raises_one_issue() {
    let team = Team::new().with(
        Role::QaEngineer,
        Arc::new(|store: &ArtifactStore, task: &Task, _ctx: &TaskContext, _call: usize| {
            if task.kind == WorkItemKind::Feature {
                qa_reject(store, task)
            } else {
                Ok(Outcome::succeeded(Role::QaEngineer)
                    .with_artifact(write(store, task, ArtifactKind::TestResult, "passed")))
            }
        }),
    );
    let report = team.run().await;

    let feature = report
        .work_items
        .iter()
        .find(|i| i.kind == WorkItemKind::Feature)
        .unwrap();
    assert_eq!(feature.status(), WorkItemStatus::Failed);
    assert_eq!(feature.attempts(), 3);

    assert_eq!(report.run.issues().len(), 1);
    let issue = &report.run.issues()[0];
    assert_eq!(issue.origin, feature.id);
    assert_eq!(issue.stage, IssueStage::Testing);
    assert!(issue.is_resolved());

    let fix = report.work_item(issue.fix_item.unwrap()).unwrap();
    assert_eq!(fix.role, Role::QaEngineer);
    assert_eq!(fix.status(), WorkItemStatus::Succeeded);
    assert_eq!(report.stage(), Stage::Done);
    assert_histories_valid(&report);
}

#[tokio::test]
async fn test_cycle_guard_ends_replanning_loop() {
    let team = Team::new().with(
        Role::QaEngineer,
        Arc::new(|store: &ArtifactStore, task: &Task, _ctx: &TaskContext, _call: usize| {
            qa_reject(store, task)
        }),
    );
    let report = team
        .engine(EngineConfig::default().with_max_cycles(2))
        .run(ProjectBrief::new("Build a login page"))
        .await;

    assert_eq!(report.stage(), Stage::Failed);
    assert_eq!(report.run.failure_reason(), Some(CYCLE_LIMIT_REASON));
    assert_eq!(report.run.cycles(), 2);

    // The failed fix counts against the original issue
    assert_eq!(report.run.issues().len(), 1);
    assert_eq!(report.run.issues()[0].failed_fixes, 1);
    assert_eq!(report.unresolved_issues().len(), 1);
    assert_histories_valid(&report);
}

#[tokio::test]
async fn test_provider_exhaustion_fails_item_immediately() {
    let team = Team::new().with(
        Role::Developer,
        Arc::new(|_store: &ArtifactStore, task: &Task, _ctx: &TaskContext, _call: usize| {
            if task.kind == WorkItemKind::Feature {
                Err(RoleError::Provider(ProviderError::Exhausted {
                    attempts: 3,
                    last: GatewayError::RateLimited("slow down".to_string()),
                }))
            } else {
                Ok(Outcome::succeeded(Role::Developer))
            }
        }),
    );
    let report = team.run().await;

    let feature = report
        .work_items
        .iter()
        .find(|i| i.kind == WorkItemKind::Feature)
        .unwrap();
    assert_eq!(feature.status(), WorkItemStatus::Failed);
    assert_eq!(feature.attempts(), 1);
    assert_eq!(report.run.issues()[0].stage, IssueStage::Implementation);
    assert_eq!(report.stage(), Stage::Done);
}

#[tokio::test]
async fn test_cancellation_before_dispatch() {
    let team = Team::new();
    let engine = team.engine(EngineConfig::default());
    engine.cancellation_token().cancel();

    let report = engine.run(ProjectBrief::new("Build a login page")).await;

    assert_eq!(report.stage(), Stage::Failed);
    assert_eq!(report.run.failure_reason(), Some(CANCELLED_REASON));
    assert_eq!(report.work_items.len(), 1);
    assert_eq!(report.work_items[0].status(), WorkItemStatus::Cancelled);
    assert_eq!(report.work_items[0].attempts(), 0);
}

#[tokio::test]
async fn test_cancel_during_development_skips_remaining_steps() {
    let token: Arc<OnceLock<CancellationToken>> = Arc::new(OnceLock::new());
    let slot = Arc::clone(&token);
    let later_steps = Arc::new(AtomicUsize::new(0));

    let team = Team::new()
        .with(
            Role::Developer,
            Arc::new(move |store: &ArtifactStore, task: &Task, _ctx: &TaskContext, _call: usize| {
                if let Some(token) = slot.get() {
                    token.cancel();
                }
                Ok(Outcome::succeeded(Role::Developer)
                    .with_artifact(write(store, task, ArtifactKind::Code, "fn login() {}"))
                    .with_usage(TokenUsage::new(10, 5)))
            }),
        )
        .with(Role::TechLead, counted(Role::TechLead, Arc::clone(&later_steps)))
        .with(Role::QaEngineer, counted(Role::QaEngineer, Arc::clone(&later_steps)));
    let engine = team.engine(EngineConfig::default());
    assert!(token.set(engine.cancellation_token()).is_ok());

    let report = engine.run(ProjectBrief::new("Build a login page")).await;

    assert_eq!(report.stage(), Stage::Failed);
    assert_eq!(report.run.failure_reason(), Some(CANCELLED_REASON));
    assert_eq!(later_steps.load(Ordering::SeqCst), 0);

    let feature = report
        .work_items
        .iter()
        .find(|i| i.kind == WorkItemKind::Feature)
        .unwrap();
    assert_eq!(feature.status(), WorkItemStatus::Cancelled);
    assert_eq!(feature.attempts(), 1);
    // The developer's finished step still counts
    assert_eq!(team.store.history(feature.id, ArtifactKind::Code).len(), 1);
    assert_eq!(report.usage[&Role::Developer], TokenUsage::new(10, 5));
    assert!(!report.usage.contains_key(&Role::TechLead));
    assert_histories_valid(&report);
}

#[tokio::test]
async fn test_features_run_concurrently_up_to_worker_limit() {
    let team = Team::new().with(Role::ProjectManager, features(4));
    let developer = Arc::new(SlowDeveloper {
        store: Arc::clone(&team.store),
        current: AtomicUsize::new(0),
        peak: AtomicUsize::new(0),
    });
    let mut registry = team.registry();
    registry.register(developer.clone());

    let report = WorkflowEngine::new(
        registry,
        Arc::clone(&team.store),
        EngineConfig::default().with_workers(2),
    )
    .unwrap()
    .run(ProjectBrief::new("Build a todo app"))
    .await;

    assert_eq!(report.stage(), Stage::Done);
    let peak = developer.peak.load(Ordering::SeqCst);
    assert!(peak <= 2, "{} developer calls overlapped", peak);
    assert!(peak > 1, "features never ran concurrently");

    let features: Vec<_> = report
        .work_items
        .iter()
        .filter(|i| i.kind == WorkItemKind::Feature)
        .collect();
    assert_eq!(features.len(), 4);
    assert!(features.iter().all(|f| f.status() == WorkItemStatus::Succeeded));
    assert_histories_valid(&report);
}

#[tokio::test]
async fn test_cancel_lets_in_flight_item_finish_and_cancels_queue() {
    let token: Arc<OnceLock<CancellationToken>> = Arc::new(OnceLock::new());
    let slot = Arc::clone(&token);
    let developer_calls = Arc::new(AtomicUsize::new(0));

    let team = Team::new()
        .with(Role::ProjectManager, features(3))
        .with(Role::Developer, counted(Role::Developer, Arc::clone(&developer_calls)))
        .with(
            Role::QaEngineer,
            Arc::new(move |store: &ArtifactStore, task: &Task, _ctx: &TaskContext, _call: usize| {
                // Last step of the busy worker's item
                if let Some(token) = slot.get() {
                    token.cancel();
                }
                Ok(Outcome::succeeded(Role::QaEngineer)
                    .with_artifact(write(store, task, ArtifactKind::TestResult, "passed")))
            }),
        );
    let engine = team.engine(EngineConfig::default().with_workers(1));
    assert!(token.set(engine.cancellation_token()).is_ok());

    let report = engine.run(ProjectBrief::new("Build a todo app")).await;

    assert_eq!(report.stage(), Stage::Failed);
    assert_eq!(report.run.failure_reason(), Some(CANCELLED_REASON));
    assert_eq!(developer_calls.load(Ordering::SeqCst), 1);

    let features: Vec<_> = report
        .work_items
        .iter()
        .filter(|i| i.kind == WorkItemKind::Feature)
        .collect();
    assert_eq!(features.len(), 3);
    let succeeded: Vec<_> = features
        .iter()
        .filter(|f| f.status() == WorkItemStatus::Succeeded)
        .collect();
    let cancelled: Vec<_> = features
        .iter()
        .filter(|f| f.status() == WorkItemStatus::Cancelled)
        .collect();
    assert_eq!(succeeded.len(), 1);
    assert_eq!(cancelled.len(), 2);
    assert!(cancelled.iter().all(|f| f.attempts() == 0));
    assert_histories_valid(&report);
}

#[tokio::test]
async fn test_fallback_feature_when_none_proposed() {
    let team = Team::new().with(
        Role::ProjectManager,
        Arc::new(|store: &ArtifactStore, task: &Task, _ctx: &TaskContext, _call: usize| {
            Ok(Outcome::succeeded(Role::ProjectManager)
                .with_artifact(write(store, task, ArtifactKind::Document, "free text")))
        }),
    );
    let report = team.run().await;

    assert_eq!(report.stage(), Stage::Done);
    assert_eq!(report.features.len(), 1);
    assert_eq!(
        report
            .work_items
            .iter()
            .filter(|i| i.kind == WorkItemKind::Feature)
            .count(),
        1
    );
}

#[tokio::test]
async fn test_architect_features_take_precedence() {
    let team = Team::new().with(
        Role::Architect,
        Arc::new(|store: &ArtifactStore, task: &Task, _ctx: &TaskContext, _call: usize| {
            let outcome = Outcome::succeeded(Role::Architect)
                .with_artifact(write(store, task, ArtifactKind::Document, "structure"));
            if task.kind == WorkItemKind::Architecture {
                Ok(outcome.with_features(vec!["auth module".into(), "session store".into()]))
            } else {
                Ok(outcome)
            }
        }),
    );
    let report = team.run().await;

    assert_eq!(
        report.features,
        vec!["auth module".to_string(), "session store".to_string()]
    );
    let features: Vec<_> = report
        .work_items
        .iter()
        .filter(|i| i.kind == WorkItemKind::Feature)
        .collect();
    assert_eq!(features.len(), 2);
    assert!(features.iter().all(|f| f.status() == WorkItemStatus::Succeeded));
}

#[tokio::test]
async fn test_journal_replays_to_final_stage() {
    let temp = TempDir::new().unwrap();
    let team = Team::new();
    let report = team
        .engine(EngineConfig::default())
        .with_journal(temp.path())
        .run(ProjectBrief::new("Build a login page"))
        .await;

    let dir = report.journal_dir.clone().unwrap();
    assert!(dir.starts_with(RunJournal::runs_dir(temp.path())));

    let records = RunJournal::load(&dir.join("transitions.jsonl")).unwrap();
    assert_eq!(records, report.run.transitions());
    assert_eq!(RunJournal::replay(&records).unwrap(), Stage::Done);

    let summary: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.join("summary.json")).unwrap()).unwrap();
    assert_eq!(summary["stage"], "done");
    assert_eq!(summary["run_id"], report.run.id.to_string());
    assert_eq!(summary["journal_degraded"], false);
    assert!(!report.journal_degraded);
}

#[tokio::test]
async fn test_lost_journal_marks_summary_degraded() {
    let temp = TempDir::new().unwrap();
    let runs: PathBuf = RunJournal::runs_dir(temp.path());
    let team = Team::new().with(
        Role::ProjectManager,
        Arc::new(move |store: &ArtifactStore, task: &Task, _ctx: &TaskContext, _call: usize| {
            std::fs::remove_dir_all(&runs).unwrap();
            Ok(Outcome::succeeded(Role::ProjectManager)
                .with_artifact(write(store, task, ArtifactKind::Document, "requirements"))
                .with_features(vec!["login".to_string()]))
        }),
    );
    let report = team
        .engine(EngineConfig::default())
        .with_journal(temp.path())
        .run(ProjectBrief::new("Build a login page"))
        .await;

    assert_eq!(report.stage(), Stage::Done);
    assert!(report.journal_degraded);
    assert!(report.summary().journal_degraded);
}

#[test]
fn test_engine_requires_every_role() {
    let mut registry = AgentRegistry::new();
    let store = Arc::new(ArtifactStore::in_memory());
    registry.register(Arc::new(ScriptedAgent {
        role: Role::Developer,
        store: Arc::clone(&store),
        calls: AtomicUsize::new(0),
        behavior: default_behavior(Role::Developer),
    }));

    let err = WorkflowEngine::new(registry, store, EngineConfig::default()).unwrap_err();
    assert!(matches!(err, CoreError::MissingAgent(Role::ProjectManager)));
}

#[test]
fn test_engine_rejects_invalid_config() {
    let team = Team::new();
    let err = WorkflowEngine::new(
        team.registry(),
        Arc::clone(&team.store),
        EngineConfig::default().with_workers(0),
    )
    .unwrap_err();
    assert!(matches!(err, CoreError::Config(_)));
}
