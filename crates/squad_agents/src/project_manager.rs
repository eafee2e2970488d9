//! Project Manager: turns raw requirements into a feature list.

use squad_core::{ArtifactKind, Role, Task, TaskContext};

use crate::error::{AgentError, AgentResult};
use crate::parse::{artifact_content, extract_json, string_list};
use crate::prompt::{compose, Reading, RolePrompt};

/// Prompt strategy for the Project Manager.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProjectManagerPrompt;

impl ProjectManagerPrompt {
    pub fn new() -> Self {
        Self
    }
}

impl RolePrompt for ProjectManagerPrompt {
    fn role(&self) -> Role {
        Role::ProjectManager
    }

    fn system_prompt(&self, _task: &Task) -> String {
        "You are the project manager of a small software team. You analyze \
         requirements and break them into features the developers can build \
         one at a time."
            .to_string()
    }

    fn user_prompt(&self, task: &Task, context: &TaskContext) -> String {
        compose(
            task,
            context,
            "Analyze the requirements above. Produce a JSON object with these keys:\n\
             - features: list of independently buildable features, one short sentence each\n\
             - technical_requirements: list of technical constraints\n\
             - dependencies: list of external libraries or services needed\n\
             - risks: list of risks and open questions",
        )
    }

    fn interpret(&self, _task: &Task, completion: &str) -> AgentResult<Reading> {
        if completion.trim().is_empty() {
            return Err(AgentError::EmptyResponse(self.role()));
        }

        let parsed = extract_json(completion);
        let features = parsed
            .as_ref()
            .map(|v| string_list(v, "features"))
            .unwrap_or_default();
        let risks = parsed
            .as_ref()
            .map(|v| string_list(v, "risks").len())
            .unwrap_or(0);

        let summary = if parsed.is_some() {
            format!("{} features identified, {} risks", features.len(), risks)
        } else {
            "requirements analysis recorded as text".to_string()
        };

        Ok(Reading::accepted(
            ArtifactKind::Document,
            artifact_content(parsed.as_ref(), completion),
        )
        .with_features(features)
        .with_summary(summary))
    }
}
