//! Google Gemini `generateContent` backend.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{non_empty, send_json, CompletionRequest, LlmError, ProviderBackend, ProviderId};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
pub struct CandidatePart {
    pub text: Option<String>,
}

impl GenerateContentResponse {
    /// Joins the text parts of the first candidate.
    pub fn into_text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
        Some(text)
    }
}

#[derive(Clone)]
pub struct GeminiBackend {
    client: Client,
    api_key: String,
}

impl GeminiBackend {
    pub fn new(client: Client, api_key: String) -> Self {
        Self { client, api_key }
    }
}

#[async_trait]
impl ProviderBackend for GeminiBackend {
    async fn invoke(&self, request: &CompletionRequest<'_>) -> Result<String, LlmError> {
        let spec = ProviderId::Gemini.spec();
        let body = GenerateContentRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: request.system,
                }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part {
                    text: request.prompt,
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
            },
        };

        let response: GenerateContentResponse = send_json(
            self.client
                .post(spec.endpoint)
                .header("x-goog-api-key", &self.api_key)
                .json(&body),
        )
        .await?;

        non_empty(response.into_text().ok_or(LlmError::EmptyContent)?)
    }
}
