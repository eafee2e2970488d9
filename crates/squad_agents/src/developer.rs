//! Developer: implements features and issue fixes.

use squad_core::{ArtifactKind, Role, Task, TaskContext, WorkItemKind};

use crate::error::{AgentError, AgentResult};
use crate::parse::{artifact_content, extract_json, file_map, string_list};
use crate::prompt::{compose, Reading, RolePrompt};

/// Prompt strategy for the Developer.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeveloperPrompt;

impl DeveloperPrompt {
    pub fn new() -> Self {
        Self
    }
}

impl RolePrompt for DeveloperPrompt {
    fn role(&self) -> Role {
        Role::Developer
    }

    fn system_prompt(&self, task: &Task) -> String {
        let focus = match task.kind {
            WorkItemKind::IssueFix => "fixing an issue found during integration",
            _ => "implementing a feature",
        };
        format!(
            "You are a software developer {}. You write complete, working code \
             with tests, following the agreed project structure.",
            focus
        )
    }

    fn user_prompt(&self, task: &Task, context: &TaskContext) -> String {
        compose(
            task,
            context,
            "Implement the task above. Produce a JSON object with these keys:\n\
             - implementation: the source code, as a map from file path to contents\n\
             - tests: the test code, as a map from file path to contents\n\
             - docs: documentation for the change\n\
             - integration: notes on how this fits with the rest of the project",
        )
    }

    fn interpret(&self, _task: &Task, completion: &str) -> AgentResult<Reading> {
        if completion.trim().is_empty() {
            return Err(AgentError::EmptyResponse(self.role()));
        }

        let parsed = extract_json(completion);
        let (summary, files) = match &parsed {
            Some(v) => {
                let implementation = file_map(v, "implementation");
                let count = if implementation.is_empty() {
                    string_list(v, "implementation").len()
                } else {
                    implementation.len()
                };
                let mut files = implementation;
                files.extend(file_map(v, "tests"));
                (format!("{} files implemented", count), files)
            }
            None => ("implementation recorded as text".to_string(), Vec::new()),
        };

        Ok(
            Reading::accepted(ArtifactKind::Code, artifact_content(parsed.as_ref(), completion))
                .with_summary(summary)
                .with_files(files),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use squad_core::{ArtifactStore, OutcomeStatus, WorkItemId};

    fn task(kind: WorkItemKind) -> Task {
        Task {
            work_item_id: WorkItemId::new(),
            kind,
            role: Role::Developer,
            description: "Implement login".to_string(),
            attempt: 1,
        }
    }

    #[test]
    fn test_code_artifact() {
        let reply = r#"{"implementation": {"src/login.rs": "fn login() {}"}, "tests": {}, "docs": "", "integration": ""}"#;
        let reading = DeveloperPrompt
            .interpret(&task(WorkItemKind::Feature), reply)
            .unwrap();
        assert_eq!(reading.kind, ArtifactKind::Code);
        assert_eq!(reading.status, OutcomeStatus::Succeeded);
        assert_eq!(reading.summary, "1 files implemented");
        assert_eq!(
            reading.files,
            vec![("src/login.rs".to_string(), "fn login() {}".to_string())]
        );
    }

    #[test]
    fn test_tests_map_becomes_files() {
        let reply = r#"{"implementation": {"src/a.rs": "a"}, "tests": {"tests/a.rs": "t"}}"#;
        let reading = DeveloperPrompt
            .interpret(&task(WorkItemKind::Feature), reply)
            .unwrap();
        let paths: Vec<&str> = reading.files.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(paths, vec!["src/a.rs", "tests/a.rs"]);
    }

    #[test]
    fn test_raw_code_accepted() {
        let reading = DeveloperPrompt
            .interpret(&task(WorkItemKind::Feature), "fn main() {}")
            .unwrap();
        assert_eq!(reading.content, "fn main() {}");
        assert!(reading.files.is_empty());
    }

    #[test]
    fn test_retry_prompt_carries_feedback() {
        let store = ArtifactStore::in_memory();
        let review = store
            .put(WorkItemId::new(), ArtifactKind::ReviewReport, "handle empty password", Role::TechLead)
            .unwrap();
        let mut context = TaskContext::new("login");
        context.feedback.push(review);

        let prompt = DeveloperPrompt.user_prompt(&task(WorkItemKind::Feature), &context);
        assert!(prompt.contains("handle empty password"));
    }

    #[test]
    fn test_issue_fix_system_prompt() {
        let prompt = DeveloperPrompt.system_prompt(&task(WorkItemKind::IssueFix));
        assert!(prompt.contains("fixing an issue"));
    }
}
