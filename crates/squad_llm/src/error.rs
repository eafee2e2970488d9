//! Error types for gateway operations.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for gateway calls.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Typed failure returned by a provider.
///
/// `RateLimited`, `Timeout` and `ProviderUnavailable` are transient and may be
/// retried; `AuthError` and `InvalidRequest` are fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("Rate limited by provider: {0}")]
    RateLimited(String),

    #[error("Provider request timed out: {0}")]
    Timeout(String),

    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Provider rejected credentials: {0}")]
    AuthError(String),

    #[error("Invalid provider request: {0}")]
    InvalidRequest(String),
}

impl GatewayError {
    /// The serializable kind of this error.
    pub fn kind(&self) -> GatewayErrorKind {
        match self {
            Self::RateLimited(_) => GatewayErrorKind::RateLimited,
            Self::Timeout(_) => GatewayErrorKind::Timeout,
            Self::ProviderUnavailable(_) => GatewayErrorKind::ProviderUnavailable,
            Self::AuthError(_) => GatewayErrorKind::AuthError,
            Self::InvalidRequest(_) => GatewayErrorKind::InvalidRequest,
        }
    }

    /// Whether a retry may succeed.
    pub fn is_transient(&self) -> bool {
        self.kind().is_transient()
    }

    /// Map an HTTP status code to an error, for providers spoken to over HTTP.
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        let message = format!("HTTP {}: {}", status, body);
        match status {
            429 => Self::RateLimited(message),
            408 | 504 => Self::Timeout(message),
            401 | 403 => Self::AuthError(message),
            s if s >= 500 => Self::ProviderUnavailable(message),
            _ => Self::InvalidRequest(message),
        }
    }
}

/// Kind of a gateway failure, without the provider message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayErrorKind {
    RateLimited,
    Timeout,
    ProviderUnavailable,
    AuthError,
    InvalidRequest,
}

impl GatewayErrorKind {
    /// Whether errors of this kind are worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimited | Self::Timeout | Self::ProviderUnavailable
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RateLimited => "rate_limited",
            Self::Timeout => "timeout",
            Self::ProviderUnavailable => "provider_unavailable",
            Self::AuthError => "auth_error",
            Self::InvalidRequest => "invalid_request",
        }
    }
}

impl std::fmt::Display for GatewayErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors raised while turning configuration into a gateway.
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Unknown LLM provider: {0}")]
    UnknownProvider(String),

    #[error("Missing API key for provider {0}")]
    MissingApiKey(String),

    #[error("Provider {0} is not compiled in (enable the `{0}` feature)")]
    ProviderDisabled(String),

    #[error("Invalid LLM configuration: {0}")]
    InvalidConfig(String),
}
