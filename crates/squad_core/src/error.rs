//! Error types for the core module.

use std::path::PathBuf;

use squad_llm::GatewayError;
use thiserror::Error;

use crate::artifact::ArtifactKind;
use crate::role::Role;
use crate::run::Stage;
use crate::work_item::{WorkItemId, WorkItemStatus};

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur during core operations.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Work item not found: {0}")]
    WorkItemNotFound(WorkItemId),

    #[error("Invalid status transition for work item {item}: {from} -> {to}")]
    InvalidTransition {
        item: WorkItemId,
        from: WorkItemStatus,
        to: WorkItemStatus,
    },

    #[error("Invalid stage transition: {from} -> {to}")]
    InvalidStage { from: Stage, to: Stage },

    #[error("Invalid workflow state: {0}")]
    InvalidState(String),

    #[error("No agent registered for role {0}")]
    MissingAgent(Role),

    #[error("Invalid engine configuration: {0}")]
    Config(String),

    #[error("Artifact error: {0}")]
    Artifact(#[from] ArtifactError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Errors surfaced by the artifact store and workspace.
#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("No {kind} artifact for work item {work_item}")]
    NotFound {
        work_item: WorkItemId,
        kind: ArtifactKind,
    },

    #[error("Invalid artifact path: {0}")]
    InvalidPath(PathBuf),

    #[error("Failed to write artifact {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Workspace error: {0}")]
    Workspace(#[from] std::io::Error),
}

/// A gateway call that could not be completed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Transient failures persisted through every allowed attempt.
    #[error("Provider call failed after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: GatewayError },

    /// The provider refused the call outright; retrying cannot help.
    #[error("Fatal provider error: {0}")]
    Fatal(GatewayError),
}

impl ProviderError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }
}
