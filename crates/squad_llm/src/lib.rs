//! # squad_llm
//!
//! Language-model gateway for squad.
//!
//! The [`Gateway`] trait is the only thing the orchestration engine knows
//! about a model backend: a request carries the calling role, ordered context
//! messages and a generation limit; the answer is either a completion or a
//! typed [`GatewayError`].
//!
//! Providers:
//! - [`OpenAiGateway`]: OpenAI chat completions over HTTP
//! - `BedrockGateway`: Amazon Bedrock Converse API (feature `bedrock`)
//! - [`ScriptedGateway`]: canned responses for tests

pub mod config;
pub mod error;
pub mod gateway;
pub mod mock;
pub mod openai;
pub mod types;

#[cfg(feature = "bedrock")]
pub mod bedrock;

pub use config::{connect, LlmConfig, LlmProvider};
pub use error::{GatewayError, GatewayErrorKind, GatewayResult, LlmError};
pub use gateway::Gateway;
pub use mock::ScriptedGateway;
pub use openai::OpenAiGateway;
pub use types::{
    CompletionRequest, CompletionResponse, Message, MessageRole, TokenUsage, DEFAULT_MAX_TOKENS,
};

#[cfg(feature = "bedrock")]
pub use bedrock::BedrockGateway;
