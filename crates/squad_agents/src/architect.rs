//! Architect: project structure up front, integration review after each cycle.

use serde_json::Value;

use squad_core::{ArtifactKind, RaisedIssue, Role, Task, TaskContext, WorkItemKind};

use crate::error::{AgentError, AgentResult};
use crate::parse::{
    artifact_content, bool_field, extract_json, file_map, issue_list, string_list,
};
use crate::prompt::{compose, Reading, RolePrompt};

/// Prompt strategy for the Architect.
#[derive(Debug, Default, Clone, Copy)]
pub struct ArchitectPrompt;

impl ArchitectPrompt {
    pub fn new() -> Self {
        Self
    }

    fn interpret_design(&self, completion: &str) -> AgentResult<Reading> {
        let parsed = extract_json(completion);
        let features = parsed
            .as_ref()
            .map(|v| {
                let features = string_list(v, "features");
                if features.is_empty() {
                    string_list(v, "components")
                } else {
                    features
                }
            })
            .unwrap_or_default();

        let scaffold = parsed
            .as_ref()
            .map(|v| file_map(v, "files"))
            .unwrap_or_default();
        let summary = match &parsed {
            Some(v) => format!(
                "{} directories, {} files planned",
                string_list(v, "directories").len(),
                string_list(v, "files").len().max(scaffold.len())
            ),
            None => "architecture recorded as text".to_string(),
        };

        Ok(Reading::accepted(
            ArtifactKind::Document,
            artifact_content(parsed.as_ref(), completion),
        )
        .with_features(features)
        .with_summary(summary)
        .with_files(scaffold))
    }

    fn interpret_review(&self, completion: &str) -> AgentResult<Reading> {
        let parsed = extract_json(completion).ok_or_else(|| {
            AgentError::malformed(self.role(), "integration review is not a JSON object")
        })?;

        let mut issues = issue_list(&parsed, "conflicts");
        let success = bool_field(&parsed, "success").or_else(|| bool_field(&parsed, "approved"));

        if success == Some(false) && issues.is_empty() {
            let feedback = parsed
                .get("feedback")
                .and_then(Value::as_str)
                .filter(|s| !s.trim().is_empty())
                .unwrap_or("integration review failed without details");
            issues.push(RaisedIssue::new(feedback));
        }

        let summary = if issues.is_empty() {
            "integration clean".to_string()
        } else {
            format!("{} integration issues", issues.len())
        };

        Ok(
            Reading::accepted(ArtifactKind::ReviewReport, artifact_content(Some(&parsed), completion))
                .with_issues(issues)
                .with_summary(summary),
        )
    }
}

impl RolePrompt for ArchitectPrompt {
    fn role(&self) -> Role {
        Role::Architect
    }

    fn system_prompt(&self, task: &Task) -> String {
        match task.kind {
            WorkItemKind::IntegrationReview => {
                "You are the software architect reviewing how several independently \
                 built features fit together. You look for conflicts between them, \
                 missing dependencies and untested seams."
                    .to_string()
            }
            _ => "You are the software architect designing the initial structure of a \
                  project from its analyzed requirements."
                .to_string(),
        }
    }

    fn user_prompt(&self, task: &Task, context: &TaskContext) -> String {
        let instructions = match task.kind {
            WorkItemKind::IntegrationReview => {
                "Review the integration of the implementations above. Produce a JSON object with these keys:\n\
                 - conflicts: list of problems to fix; each either a string or an object with \
                 \"description\" and \"stage\" (one of implementation, code_review, testing)\n\
                 - dependencies: list of dependency problems\n\
                 - test_coverage: short assessment of coverage across features\n\
                 - success: true if the features integrate cleanly\n\
                 - feedback: overall feedback"
            }
            _ => {
                "Design the project structure. Produce a JSON object with these keys:\n\
                 - directories: list of directories to create\n\
                 - files: map from file path to initial contents for the scaffolding files\n\
                 - dependencies: list of libraries to use\n\
                 - configuration: build and runtime configuration\n\
                 - features: ordered list of features to implement, refining the \
                 project manager's list where needed"
            }
        };
        compose(task, context, instructions)
    }

    fn interpret(&self, task: &Task, completion: &str) -> AgentResult<Reading> {
        if completion.trim().is_empty() {
            return Err(AgentError::EmptyResponse(self.role()));
        }
        match task.kind {
            WorkItemKind::IntegrationReview => self.interpret_review(completion),
            _ => self.interpret_design(completion),
        }
    }
}
