//! QA Engineer: runs the tests and reports pass or fail.

use squad_core::{ArtifactKind, Role, Task, TaskContext};

use crate::error::{AgentError, AgentResult};
use crate::parse::{artifact_content, bool_field, extract_json, file_map, string_list};
use crate::prompt::{compose, Reading, RolePrompt};

/// Prompt strategy for the QA Engineer.
#[derive(Debug, Default, Clone, Copy)]
pub struct QaEngineerPrompt;

impl QaEngineerPrompt {
    pub fn new() -> Self {
        Self
    }
}

impl RolePrompt for QaEngineerPrompt {
    fn role(&self) -> Role {
        Role::QaEngineer
    }

    fn system_prompt(&self, _task: &Task) -> String {
        "You are a QA engineer. You exercise the implementation against its tests \
         and requirements and report every failure you find."
            .to_string()
    }

    fn user_prompt(&self, task: &Task, context: &TaskContext) -> String {
        compose(
            task,
            context,
            "Test the latest implementation above. Produce a JSON object with these keys:\n\
             - test_results: list of test cases with their outcome\n\
             - coverage: estimated coverage as a percentage\n\
             - performance: notes on performance\n\
             - issues: list of failures the developer must fix\n\
             - test_files: the test suite, as a map from file path to contents\n\
             - passed: true if every test passed",
        )
    }

    fn interpret(&self, _task: &Task, completion: &str) -> AgentResult<Reading> {
        if completion.trim().is_empty() {
            return Err(AgentError::EmptyResponse(self.role()));
        }

        let parsed = extract_json(completion)
            .ok_or_else(|| AgentError::malformed(self.role(), "test report is not a JSON object"))?;
        let passed = bool_field(&parsed, "passed")
            .ok_or_else(|| AgentError::malformed(self.role(), "test report has no verdict"))?;

        let content = artifact_content(Some(&parsed), completion);
        let reading = if passed {
            Reading::accepted(ArtifactKind::TestResult, content)
                .with_summary("tests passed")
                .with_files(file_map(&parsed, "test_files"))
        } else {
            let failures = string_list(&parsed, "issues").len();
            Reading::rejected(ArtifactKind::TestResult, content)
                .with_summary(format!("tests failed: {} issues", failures))
        };
        Ok(reading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use squad_core::{OutcomeStatus, WorkItemId, WorkItemKind};

    fn task() -> Task {
        Task {
            work_item_id: WorkItemId::new(),
            kind: WorkItemKind::Feature,
            role: Role::QaEngineer,
            description: "login".to_string(),
            attempt: 1,
        }
    }

    #[test]
    fn test_passing_report() {
        let reading = QaEngineerPrompt
            .interpret(&task(), "```json\n{\"test_results\": [], \"passed\": true}\n```")
            .unwrap();
        assert_eq!(reading.status, OutcomeStatus::Succeeded);
        assert_eq!(reading.kind, ArtifactKind::TestResult);
    }

    #[test]
    fn test_failing_report() {
        let reading = QaEngineerPrompt
            .interpret(&task(), r#"{"issues": ["login accepts empty password"], "passed": false}"#)
            .unwrap();
        assert_eq!(reading.status, OutcomeStatus::Failed);
        assert_eq!(reading.summary, "tests failed: 1 issues");
    }

    #[test]
    fn test_suite_kept_only_when_passing() {
        let passing = r#"{"test_files": {"tests/login.rs": "fn t() {}"}, "passed": true}"#;
        let reading = QaEngineerPrompt.interpret(&task(), passing).unwrap();
        assert_eq!(reading.files.len(), 1);

        let failing = r#"{"test_files": {"tests/login.rs": "fn t() {}"}, "passed": false}"#;
        let reading = QaEngineerPrompt.interpret(&task(), failing).unwrap();
        assert!(reading.files.is_empty());
    }

    #[test]
    fn test_verdict_required() {
        let err = QaEngineerPrompt
            .interpret(&task(), r#"{"coverage": 80}"#)
            .unwrap_err();
        assert!(matches!(err, AgentError::Malformed { role: Role::QaEngineer, .. }));
    }
}
