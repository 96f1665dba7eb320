//! Anthropic Messages API backend.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    non_empty, send_json, CompletionRequest, LlmError, ProviderBackend, ProviderId, MAX_TOKENS,
};

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct AnthropicResponse {
    pub content: Vec<ContentBlock>,
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl AnthropicResponse {
    /// Extracts the text content from the first text block.
    pub fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text.as_deref())
    }
}

#[derive(Clone)]
pub struct AnthropicBackend {
    client: Client,
    api_key: String,
}

impl AnthropicBackend {
    pub fn new(client: Client, api_key: String) -> Self {
        Self { client, api_key }
    }
}

#[async_trait]
impl ProviderBackend for AnthropicBackend {
    async fn invoke(&self, request: &CompletionRequest<'_>) -> Result<String, LlmError> {
        let spec = ProviderId::Claude.spec();
        let body = AnthropicRequest {
            model: spec.model,
            max_tokens: MAX_TOKENS,
            system: request.system,
            messages: vec![AnthropicMessage {
                role: "user",
                content: request.prompt,
            }],
        };

        let response: AnthropicResponse = send_json(
            self.client
                .post(spec.endpoint)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .header("content-type", "application/json")
                .json(&body),
        )
        .await?;

        if let Some(usage) = &response.usage {
            debug!(
                "Anthropic call succeeded: input_tokens={}, output_tokens={}",
                usage.input_tokens, usage.output_tokens
            );
        }

        let text = response.text().ok_or(LlmError::EmptyContent)?;
        non_empty(text.to_string())
    }
}
