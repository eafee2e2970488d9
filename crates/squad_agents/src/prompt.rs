//! Prompt strategy shared by the role agents.
//!
//! Each role supplies its system prompt, renders the task into a user
//! message, and reads the model's answer back into a [`Reading`].

use std::fmt::Write as _;

use squad_core::{Artifact, ArtifactKind, OutcomeStatus, RaisedIssue, Role, Task, TaskContext};
use squad_llm::Message;

use crate::error::AgentResult;

/// Closing instruction appended to every user prompt.
pub const JSON_INSTRUCTION: &str =
    "Respond with a single JSON object in a ```json fenced block. Do not add commentary.";

/// What a role made of a completion.
#[derive(Debug, Clone)]
pub struct Reading {
    /// Kind of artifact to record
    pub kind: ArtifactKind,
    /// Content to record
    pub content: String,
    pub status: OutcomeStatus,
    pub issues: Vec<RaisedIssue>,
    pub features: Vec<String>,
    pub summary: String,
    /// Project files to write once the step succeeds, as `(path, contents)`
    pub files: Vec<(String, String)>,
}

impl Reading {
    /// A successful reading with the given artifact.
    pub fn accepted(kind: ArtifactKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
            status: OutcomeStatus::Succeeded,
            issues: Vec::new(),
            features: Vec::new(),
            summary: String::new(),
            files: Vec::new(),
        }
    }

    /// A rejection carrying the artifact that explains it.
    pub fn rejected(kind: ArtifactKind, content: impl Into<String>) -> Self {
        Self {
            status: OutcomeStatus::Failed,
            ..Self::accepted(kind, content)
        }
    }

    pub fn with_issues(mut self, issues: Vec<RaisedIssue>) -> Self {
        self.issues = issues;
        self
    }

    pub fn with_features(mut self, features: Vec<String>) -> Self {
        self.features = features;
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    pub fn with_files(mut self, files: Vec<(String, String)>) -> Self {
        self.files = files;
        self
    }
}

/// How one role talks to the model.
pub trait RolePrompt: Send + Sync {
    /// The role this strategy speaks for.
    fn role(&self) -> Role;

    fn system_prompt(&self, task: &Task) -> String;

    fn user_prompt(&self, task: &Task, context: &TaskContext) -> String;

    /// Messages sent for a task.
    fn messages(&self, task: &Task, context: &TaskContext) -> Vec<Message> {
        vec![
            Message::system(self.system_prompt(task)),
            Message::user(self.user_prompt(task, context)),
        ]
    }

    /// Read a completion back into a result.
    fn interpret(&self, task: &Task, completion: &str) -> AgentResult<Reading>;
}

/// Render requirements, structured spec and task description.
pub fn render_brief(task: &Task, context: &TaskContext) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "## Requirements\n\n{}\n", context.requirements.trim());

    if !context.spec.is_null() {
        let spec = serde_json::to_string_pretty(&context.spec).unwrap_or_default();
        let _ = writeln!(out, "## Specification\n\n```json\n{}\n```\n", spec);
    }

    let _ = writeln!(out, "## Task\n\n{}\n", task.description.trim());
    out
}

/// Render artifacts under a heading; nothing when the list is empty.
pub fn render_artifacts(heading: &str, artifacts: &[Artifact]) -> String {
    if artifacts.is_empty() {
        return String::new();
    }

    let mut out = format!("## {}\n\n", heading);
    for artifact in artifacts {
        let _ = writeln!(
            out,
            "### {} {} (revision {})\n\n{}\n",
            artifact.role.display_name(),
            artifact.kind,
            artifact.revision,
            artifact.content.trim()
        );
    }
    out
}

/// Render review or test feedback from a previous attempt.
pub fn render_feedback(context: &TaskContext) -> String {
    if !context.is_retry() {
        return String::new();
    }
    let mut out = render_artifacts("Feedback From Previous Attempt", &context.feedback);
    out.push_str("Address every point in the feedback above.\n\n");
    out
}

/// Assemble a user prompt from its parts.
pub fn compose(task: &Task, context: &TaskContext, instructions: &str) -> String {
    let mut out = render_brief(task, context);
    out.push_str(&render_artifacts("Context", &context.artifacts));
    out.push_str(&render_feedback(context));
    out.push_str(instructions.trim());
    out.push_str("\n\n");
    out.push_str(JSON_INSTRUCTION);
    out
}
