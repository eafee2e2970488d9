//! Amazon Bedrock provider using the Converse API.

use async_trait::async_trait;
use aws_sdk_bedrockruntime::error::SdkError;
use aws_sdk_bedrockruntime::operation::converse::ConverseError;
use aws_sdk_bedrockruntime::types::{
    ContentBlock, ConversationRole, InferenceConfiguration, Message as BedrockMessage,
    SystemContentBlock,
};
use tracing::{debug, info};

use crate::error::{GatewayError, GatewayResult};
use crate::gateway::Gateway;
use crate::types::{CompletionRequest, CompletionResponse, MessageRole, TokenUsage};

/// Gateway backed by `aws_sdk_bedrockruntime`.
pub struct BedrockGateway {
    client: aws_sdk_bedrockruntime::Client,
    model_id: String,
    region: String,
}

impl BedrockGateway {
    /// Build a client from the standard AWS credential chain.
    pub async fn new(model_id: impl Into<String>, region: impl Into<String>) -> Self {
        let model_id = model_id.into();
        let region = region.into();

        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(region.clone()))
            .load()
            .await;
        let client = aws_sdk_bedrockruntime::Client::new(&sdk_config);

        info!("Bedrock gateway created for region={}, model={}", region, model_id);

        Self {
            client,
            model_id,
            region,
        }
    }

    fn classify(&self, err: SdkError<ConverseError>) -> GatewayError {
        let context = format!("region={}, model={}", self.region, self.model_id);
        match &err {
            SdkError::TimeoutError(_) => return GatewayError::Timeout(context),
            SdkError::DispatchFailure(_) => {
                return GatewayError::ProviderUnavailable(format!("{}: dispatch failure", context))
            }
            _ => {}
        }

        let message = format!("{}: {}", context, err);
        match err.into_service_error() {
            ConverseError::ThrottlingException(_) => GatewayError::RateLimited(message),
            ConverseError::ModelTimeoutException(_) => GatewayError::Timeout(message),
            ConverseError::ServiceUnavailableException(_)
            | ConverseError::InternalServerException(_)
            | ConverseError::ModelNotReadyException(_) => GatewayError::ProviderUnavailable(message),
            ConverseError::AccessDeniedException(_) => GatewayError::AuthError(message),
            _ => GatewayError::InvalidRequest(message),
        }
    }
}

#[async_trait]
impl Gateway for BedrockGateway {
    fn name(&self) -> &str {
        "bedrock"
    }

    async fn complete(&self, request: &CompletionRequest) -> GatewayResult<CompletionResponse> {
        let system: Vec<SystemContentBlock> = request
            .system_prompt()
            .map(|s| vec![SystemContentBlock::Text(s.to_string())])
            .unwrap_or_default();

        let mut messages = Vec::new();
        for message in request.conversation() {
            let role = match message.role {
                MessageRole::Assistant => ConversationRole::Assistant,
                _ => ConversationRole::User,
            };
            let built = BedrockMessage::builder()
                .role(role)
                .content(ContentBlock::Text(message.content.clone()))
                .build()
                .map_err(|e| GatewayError::InvalidRequest(e.to_string()))?;
            messages.push(built);
        }

        let inference = InferenceConfiguration::builder()
            .max_tokens(i32::try_from(request.max_tokens).unwrap_or(i32::MAX))
            .build();

        debug!(
            "Bedrock converse for {} ({} messages, model {})",
            request.agent,
            messages.len(),
            self.model_id
        );

        let response = self
            .client
            .converse()
            .model_id(&self.model_id)
            .set_messages(Some(messages))
            .set_system(Some(system))
            .inference_config(inference)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let output = response.output.ok_or_else(|| {
            GatewayError::ProviderUnavailable(format!(
                "Bedrock response missing output for model={}",
                self.model_id
            ))
        })?;

        let completion = output
            .as_message()
            .map(|m| {
                m.content
                    .iter()
                    .filter_map(|block| block.as_text().ok().cloned())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .map_err(|_| GatewayError::ProviderUnavailable("Bedrock returned no message".to_string()))?;

        let usage = response
            .usage
            .map(|u| TokenUsage::new(u.input_tokens.max(0) as u64, u.output_tokens.max(0) as u64))
            .unwrap_or_default();

        Ok(CompletionResponse::new(completion, self.model_id.clone()).with_usage(usage))
    }
}
