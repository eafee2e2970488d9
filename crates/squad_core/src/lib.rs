//! # squad_core
//!
//! Workflow orchestration engine for squad.
//!
//! A fixed team of roles (Project Manager, Architect, Tech Lead, Developer,
//! QA Engineer) turns a requirements document into project artifacts. This
//! crate provides the state machine that moves a run through its stages,
//! the per-role work queue and sprint planner, the artifact store, and the
//! retry and escalation policy applied when review or tests reject work.
//!
//! # Architecture
//!
//! - **Engine**: owns the run and the queue, dispatches work items to a
//!   bounded worker pool and folds their outcomes back in
//! - **Queue / Planner**: per-role FIFO lanes; open integration issues become
//!   new work items
//! - **Artifact Store**: append-only, revisioned artifacts per work item
//! - **Role Agents**: one trait, one implementation per role, reached through
//!   a rate-limited [`GatewayClient`]
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use squad_core::{AgentRegistry, ArtifactStore, EngineConfig, ProjectBrief, WorkflowEngine};
//!
//! let store = Arc::new(ArtifactStore::in_memory());
//! let mut agents = AgentRegistry::new();
//! // register one agent per role ...
//!
//! let engine = WorkflowEngine::new(agents, store, EngineConfig::default())?;
//! let report = engine.run(ProjectBrief::new("Build a todo app")).await;
//! std::process::exit(report.exit_code() as i32);
//! ```

pub mod agent;
pub mod artifact;
pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod issue;
pub mod journal;
pub mod planner;
pub mod queue;
pub mod retry;
pub mod role;
pub mod run;
pub mod work_item;
pub mod workspace;

// Re-export main types for convenience
pub use agent::{AgentRegistry, Outcome, OutcomeStatus, RaisedIssue, RoleAgent, RoleError, Task, TaskContext};
pub use artifact::{Artifact, ArtifactKind, ArtifactStore};
pub use client::GatewayClient;
pub use config::EngineConfig;
pub use engine::{
    ProjectBrief, RunReport, RunSummary, WorkItemSummary, WorkflowEngine, CANCELLED_REASON,
    CYCLE_LIMIT_REASON,
};
pub use error::{ArtifactError, CoreError, CoreResult, ProviderError};
pub use issue::{IntegrationIssue, IssueId, IssueStage};
pub use journal::RunJournal;
pub use planner::SprintPlanner;
pub use queue::{Priority, WorkQueue};
pub use retry::RetryPolicy;
pub use role::Role;
pub use run::{Stage, TransitionRecord, WorkflowRun};
pub use work_item::{StatusChange, WorkItem, WorkItemId, WorkItemKind, WorkItemStatus};
pub use workspace::{FsWorkspace, Workspace};
