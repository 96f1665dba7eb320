//! OpenAI Chat Completions backend.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{non_empty, send_json, CompletionRequest, LlmError, ProviderBackend, ProviderId};

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
pub struct ChoiceMessage {
    pub content: Option<String>,
}

impl ChatResponse {
    pub fn into_text(self) -> Option<String> {
        self.choices.into_iter().next().and_then(|c| c.message.content)
    }
}

#[derive(Clone)]
pub struct OpenAiBackend {
    client: Client,
    api_key: String,
}

impl OpenAiBackend {
    pub fn new(client: Client, api_key: String) -> Self {
        Self { client, api_key }
    }
}

#[async_trait]
impl ProviderBackend for OpenAiBackend {
    async fn invoke(&self, request: &CompletionRequest<'_>) -> Result<String, LlmError> {
        let spec = ProviderId::Gpt.spec();
        let body = ChatRequest {
            model: spec.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: request.system,
                },
                ChatMessage {
                    role: "user",
                    content: request.prompt,
                },
            ],
            response_format: ResponseFormat {
                format_type: "json_object",
            },
        };

        let response: ChatResponse = send_json(
            self.client
                .post(spec.endpoint)
                .bearer_auth(&self.api_key)
                .json(&body),
        )
        .await?;

        non_empty(response.into_text().ok_or(LlmError::EmptyContent)?)
    }
}
