//! LLM client layer: one backend per supported text-generation provider.
//!
//! Every provider receives the same `CompletionRequest` (system instructions +
//! user prompt) and hands back the raw text of its first answer. How the
//! request is shaped on the wire and how the answer is dug out of the
//! provider's JSON is each backend's business.
//!
//! No retries happen here: a failed call surfaces to the router as-is.
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub mod anthropic;
pub mod gemini;
pub mod openai;
pub mod prompts;

pub use anthropic::AnthropicBackend;
pub use gemini::GeminiBackend;
pub use openai::OpenAiBackend;

const MAX_TOKENS: u32 = 4096;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("request timed out")]
    Timeout,

    #[error("LLM returned empty content")]
    EmptyContent,
}

/// The closed set of providers a caller may pick from.
/// Wire ids match the model names offered to users; vendor names are accepted as aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderId {
    #[serde(rename = "claude-sonnet-4-0", alias = "anthropic")]
    Claude,
    #[serde(rename = "gpt-5.2", alias = "openai")]
    Gpt,
    #[serde(rename = "gemini-3-flash-preview", alias = "gemini")]
    Gemini,
}

/// Static connection parameters for one provider.
#[derive(Debug)]
pub struct ProviderSpec {
    pub endpoint: &'static str,
    /// Environment variable holding the API key.
    pub credential_key: &'static str,
    pub model: &'static str,
}

const CLAUDE_SPEC: ProviderSpec = ProviderSpec {
    endpoint: "https://api.anthropic.com/v1/messages",
    credential_key: "ANTHROPIC_API_KEY",
    model: "claude-sonnet-4-0",
};

const GPT_SPEC: ProviderSpec = ProviderSpec {
    endpoint: "https://api.openai.com/v1/chat/completions",
    credential_key: "OPENAI_API_KEY",
    model: "gpt-5.2",
};

const GEMINI_SPEC: ProviderSpec = ProviderSpec {
    endpoint: "https://generativelanguage.googleapis.com/v1beta/models/gemini-3-flash-preview:generateContent",
    credential_key: "GEMINI_API_KEY",
    model: "gemini-3-flash-preview",
};

impl ProviderId {
    pub const ALL: [ProviderId; 3] = [ProviderId::Claude, ProviderId::Gpt, ProviderId::Gemini];

    pub fn spec(self) -> &'static ProviderSpec {
        match self {
            ProviderId::Claude => &CLAUDE_SPEC,
            ProviderId::Gpt => &GPT_SPEC,
            ProviderId::Gemini => &GEMINI_SPEC,
        }
    }

    pub fn as_str(self) -> &'static str {
        self.spec().model
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "claude-sonnet-4-0" | "anthropic" => Ok(ProviderId::Claude),
            "gpt-5.2" | "openai" => Ok(ProviderId::Gpt),
            "gemini-3-flash-preview" | "gemini" => Ok(ProviderId::Gemini),
            other => Err(format!("unknown model '{other}'")),
        }
    }
}

/// The uniform request every backend accepts.
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    pub system: &'a str,
    pub prompt: &'a str,
}

/// One text-generation provider. Returns the raw text of the model's reply.
#[async_trait]
pub trait ProviderBackend: Send + Sync {
    async fn invoke(&self, request: &CompletionRequest<'_>) -> Result<String, LlmError>;
}

/// Builds the HTTP client shared by all backends. `timeout` bounds each provider call.
pub fn build_http_client(timeout: Duration) -> Result<Client, LlmError> {
    Ok(Client::builder().timeout(timeout).build()?)
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Sends a prepared request and deserializes a 2xx JSON body.
/// All three vendors wrap failures as `{"error": {"message": ...}}`.
async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, LlmError> {
    let response = request.send().await.map_err(transport_error)?;
    let status = response.status();

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(api_error(status.as_u16(), body));
    }

    let body = response.text().await.map_err(transport_error)?;
    debug!("provider responded with {} bytes", body.len());
    Ok(serde_json::from_str(&body)?)
}

/// Uses the vendor's `error.message` when the body carries one, else the raw body.
fn api_error(status: u16, body: String) -> LlmError {
    let message = serde_json::from_str::<ErrorEnvelope>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body);
    LlmError::Api { status, message }
}

fn transport_error(e: reqwest::Error) -> LlmError {
    if e.is_timeout() {
        LlmError::Timeout
    } else {
        LlmError::Http(e)
    }
}

fn non_empty(text: String) -> Result<String, LlmError> {
    if text.trim().is_empty() {
        Err(LlmError::EmptyContent)
    } else {
        Ok(text)
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
pub fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}
