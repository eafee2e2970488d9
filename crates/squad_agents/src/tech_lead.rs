//! Tech Lead: code review with an approve/reject verdict.

use serde_json::Value;

use squad_core::{ArtifactKind, Role, Task, TaskContext};

use crate::error::{AgentError, AgentResult};
use crate::parse::{artifact_content, bool_field, extract_json, string_list};
use crate::prompt::{compose, Reading, RolePrompt};

/// Score at or above which a review without an explicit verdict passes.
pub const APPROVAL_SCORE: f64 = 70.0;

/// Prompt strategy for the Tech Lead.
#[derive(Debug, Default, Clone, Copy)]
pub struct TechLeadPrompt;

impl TechLeadPrompt {
    pub fn new() -> Self {
        Self
    }
}

impl RolePrompt for TechLeadPrompt {
    fn role(&self) -> Role {
        Role::TechLead
    }

    fn system_prompt(&self, _task: &Task) -> String {
        "You are the tech lead reviewing code written by your team. You approve \
         code only when it is correct, readable and covered by tests."
            .to_string()
    }

    fn user_prompt(&self, task: &Task, context: &TaskContext) -> String {
        compose(
            task,
            context,
            "Review the latest code above. Produce a JSON object with these keys:\n\
             - issues: list of problems that must be fixed\n\
             - suggestions: list of optional improvements\n\
             - score: quality score from 0 to 100\n\
             - approved: true if the code can move on to testing",
        )
    }

    fn interpret(&self, _task: &Task, completion: &str) -> AgentResult<Reading> {
        if completion.trim().is_empty() {
            return Err(AgentError::EmptyResponse(self.role()));
        }

        let parsed = extract_json(completion)
            .ok_or_else(|| AgentError::malformed(self.role(), "review is not a JSON object"))?;

        let score = parsed.get("score").and_then(Value::as_f64);
        let approved = bool_field(&parsed, "approved")
            .or_else(|| score.map(|s| s >= APPROVAL_SCORE))
            .ok_or_else(|| AgentError::malformed(self.role(), "review has no verdict"))?;

        let issues = string_list(&parsed, "issues");
        let summary = match (approved, score) {
            (true, Some(score)) => format!("approved with score {}", score),
            (true, None) => "approved".to_string(),
            (false, _) => format!("changes requested: {} issues", issues.len()),
        };

        let content = artifact_content(Some(&parsed), completion);
        let reading = if approved {
            Reading::accepted(ArtifactKind::ReviewReport, content)
        } else {
            Reading::rejected(ArtifactKind::ReviewReport, content)
        };
        Ok(reading.with_summary(summary))
    }
}
