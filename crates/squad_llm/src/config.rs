//! Provider configuration and gateway construction.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::LlmError;
use crate::gateway::Gateway;
use crate::openai::OpenAiGateway;
use crate::types::DEFAULT_MAX_TOKENS;

/// Supported providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    Bedrock,
    #[serde(rename = "openai")]
    OpenAi,
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bedrock => "bedrock",
            Self::OpenAi => "openai",
        }
    }
}

impl std::fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for LlmProvider {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bedrock" => Ok(Self::Bedrock),
            "openai" => Ok(Self::OpenAi),
            other => Err(LlmError::UnknownProvider(other.to_string())),
        }
    }
}

/// The `llm` section of the configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: Option<String>,
    pub bedrock_model_id: String,
    pub bedrock_region: String,
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::OpenAi,
            openai_api_key: None,
            openai_model: "gpt-4-turbo".to_string(),
            openai_base_url: None,
            bedrock_model_id: "anthropic.claude-3-sonnet-20240229-v1:0".to_string(),
            bedrock_region: "us-east-1".to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

impl LlmConfig {
    /// The OpenAI key from config, falling back to `OPENAI_API_KEY`.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.openai_api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty()))
    }

    /// Check the configuration without contacting the provider.
    pub fn validate(&self) -> Result<(), LlmError> {
        if self.max_tokens == 0 {
            return Err(LlmError::InvalidConfig("max_tokens must be positive".to_string()));
        }
        match self.provider {
            LlmProvider::OpenAi => {
                if self.resolved_api_key().is_none() {
                    return Err(LlmError::MissingApiKey(self.provider.to_string()));
                }
                if self.openai_model.trim().is_empty() {
                    return Err(LlmError::InvalidConfig("openai_model is empty".to_string()));
                }
            }
            LlmProvider::Bedrock => {
                if self.bedrock_model_id.trim().is_empty() {
                    return Err(LlmError::InvalidConfig("bedrock_model_id is empty".to_string()));
                }
                if self.bedrock_region.trim().is_empty() {
                    return Err(LlmError::InvalidConfig("bedrock_region is empty".to_string()));
                }
            }
        }
        Ok(())
    }
}

/// Build the gateway selected by `config`.
pub async fn connect(config: &LlmConfig) -> Result<Arc<dyn Gateway>, LlmError> {
    config.validate()?;

    match config.provider {
        LlmProvider::OpenAi => {
            let api_key = config
                .resolved_api_key()
                .ok_or_else(|| LlmError::MissingApiKey(config.provider.to_string()))?;
            let mut gateway = OpenAiGateway::new(api_key, config.openai_model.clone());
            if let Some(url) = &config.openai_base_url {
                gateway = gateway.with_base_url(url.clone());
            }
            info!("Using OpenAI gateway with model {}", config.openai_model);
            Ok(Arc::new(gateway))
        }
        LlmProvider::Bedrock => connect_bedrock(config).await,
    }
}

#[cfg(feature = "bedrock")]
async fn connect_bedrock(config: &LlmConfig) -> Result<Arc<dyn Gateway>, LlmError> {
    let gateway = crate::bedrock::BedrockGateway::new(
        config.bedrock_model_id.clone(),
        config.bedrock_region.clone(),
    )
    .await;
    Ok(Arc::new(gateway))
}

#[cfg(not(feature = "bedrock"))]
async fn connect_bedrock(_config: &LlmConfig) -> Result<Arc<dyn Gateway>, LlmError> {
    Err(LlmError::ProviderDisabled(LlmProvider::Bedrock.to_string()))
}
