//! Error types for agents module.

use squad_core::{Role, RoleError};
use thiserror::Error;

/// Result type alias for agent operations.
pub type AgentResult<T> = Result<T, AgentError>;

/// Errors raised while interpreting a model response.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Empty response for {0}")]
    EmptyResponse(Role),

    #[error("Malformed response from {role}: {message}")]
    Malformed { role: Role, message: String },
}

impl AgentError {
    /// Create a malformed response error.
    pub fn malformed(role: Role, message: impl Into<String>) -> Self {
        Self::Malformed {
            role,
            message: message.into(),
        }
    }
}

impl From<AgentError> for RoleError {
    fn from(err: AgentError) -> Self {
        match err {
            AgentError::EmptyResponse(role) => RoleError::malformed(role, "empty response"),
            AgentError::Malformed { role, message } => RoleError::malformed(role, message),
        }
    }
}
