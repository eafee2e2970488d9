//! Assembling the full team behind one gateway client.

use std::sync::Arc;

use squad_core::{AgentRegistry, ArtifactStore, GatewayClient};

use crate::architect::ArchitectPrompt;
use crate::developer::DeveloperPrompt;
use crate::llm_agent::LlmRoleAgent;
use crate::project_manager::ProjectManagerPrompt;
use crate::qa_engineer::QaEngineerPrompt;
use crate::tech_lead::TechLeadPrompt;

/// Register an LLM-backed agent for every role.
pub fn assemble_team(
    client: Arc<GatewayClient>,
    store: Arc<ArtifactStore>,
    max_tokens: u32,
) -> AgentRegistry {
    let mut registry = AgentRegistry::new();

    registry.register(Arc::new(
        LlmRoleAgent::new(ProjectManagerPrompt, client.clone(), store.clone())
            .with_max_tokens(max_tokens),
    ));
    registry.register(Arc::new(
        LlmRoleAgent::new(ArchitectPrompt, client.clone(), store.clone())
            .with_max_tokens(max_tokens),
    ));
    registry.register(Arc::new(
        LlmRoleAgent::new(TechLeadPrompt, client.clone(), store.clone())
            .with_max_tokens(max_tokens),
    ));
    registry.register(Arc::new(
        LlmRoleAgent::new(DeveloperPrompt, client.clone(), store.clone())
            .with_max_tokens(max_tokens),
    ));
    registry.register(Arc::new(
        LlmRoleAgent::new(QaEngineerPrompt, client, store).with_max_tokens(max_tokens),
    ));

    registry
}
