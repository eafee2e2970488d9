//! # squad_agents
//!
//! LLM-backed implementations of the five team roles.
//!
//! Each role is a [`RolePrompt`]: it renders a task and its context into
//! messages and reads the model's reply back into an artifact, a verdict,
//! and any features or integration issues it names. [`LlmRoleAgent`] wraps a
//! prompt with the shared [`squad_core::GatewayClient`] and artifact store.
//!
//! | Role | Artifact | Rejects when |
//! |------|----------|--------------|
//! | Project Manager | Document | never |
//! | Architect | Document / ReviewReport | never (raises issues instead) |
//! | Tech Lead | ReviewReport | `approved` is false |
//! | Developer | Code | never |
//! | QA Engineer | TestResult | `passed` is false |

pub mod architect;
pub mod developer;
pub mod error;
pub mod llm_agent;
pub mod parse;
pub mod project_manager;
pub mod prompt;
pub mod qa_engineer;
pub mod team;
pub mod tech_lead;

pub use architect::ArchitectPrompt;
pub use developer::DeveloperPrompt;
pub use error::{AgentError, AgentResult};
pub use llm_agent::LlmRoleAgent;
pub use project_manager::ProjectManagerPrompt;
pub use prompt::{Reading, RolePrompt};
pub use qa_engineer::QaEngineerPrompt;
pub use team::assemble_team;
pub use tech_lead::TechLeadPrompt;
