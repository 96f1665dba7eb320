//! Provider Router: maps a `ProviderId` to the backend that serves it.
//!
//! Only providers with a configured credential get a backend, so the lookup
//! itself is the credential check and happens before any network call.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::errors::AppError;
use crate::generation::prompts::{build_cover_letter_prompt, cover_letter_system};
use crate::llm_client::{
    build_http_client, AnthropicBackend, CompletionRequest, GeminiBackend, LlmError,
    OpenAiBackend, ProviderBackend, ProviderId,
};
use crate::models::letter::{DraftLetter, ParsedRequirements};

/// The four inputs every provider sees.
#[derive(Debug, Clone, Copy)]
pub struct LetterInputs<'a> {
    pub resume_text: &'a str,
    pub job_description: &'a str,
    pub requirements: &'a ParsedRequirements,
    pub draft: &'a DraftLetter,
}

#[derive(Clone)]
pub struct ProviderRouter {
    backends: HashMap<ProviderId, Arc<dyn ProviderBackend>>,
    timeout: Duration,
}

impl ProviderRouter {
    /// Registers a backend for every provider that has a credential.
    pub fn from_credentials(
        credentials: &HashMap<ProviderId, String>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let client = build_http_client(timeout)?;
        let mut backends: HashMap<ProviderId, Arc<dyn ProviderBackend>> = HashMap::new();

        for (&provider, key) in credentials {
            let backend: Arc<dyn ProviderBackend> = match provider {
                ProviderId::Claude => Arc::new(AnthropicBackend::new(client.clone(), key.clone())),
                ProviderId::Gpt => Arc::new(OpenAiBackend::new(client.clone(), key.clone())),
                ProviderId::Gemini => Arc::new(GeminiBackend::new(client.clone(), key.clone())),
            };
            backends.insert(provider, backend);
        }

        Ok(Self { backends, timeout })
    }

    /// Builds a router over explicit backends.
    pub fn with_backends(
        backends: HashMap<ProviderId, Arc<dyn ProviderBackend>>,
        timeout: Duration,
    ) -> Self {
        Self { backends, timeout }
    }

    pub fn available(&self) -> Vec<ProviderId> {
        ProviderId::ALL
            .into_iter()
            .filter(|p| self.backends.contains_key(p))
            .collect()
    }

    /// Fails with `MissingCredential` when `provider` has no configured key.
    pub fn ensure_available(&self, provider: ProviderId) -> Result<(), AppError> {
        self.backend(provider).map(|_| ())
    }

    /// Sends the polishing prompt to `provider` and returns its raw reply.
    pub async fn generate(
        &self,
        provider: ProviderId,
        inputs: &LetterInputs<'_>,
    ) -> Result<String, AppError> {
        let backend = self.backend(provider)?;

        let requirements_json = serde_json::to_string_pretty(inputs.requirements).map_err(|e| {
            AppError::Internal(anyhow::anyhow!("Failed to serialize requirements: {e}"))
        })?;
        let system = cover_letter_system();
        let prompt = build_cover_letter_prompt(
            inputs.resume_text,
            inputs.job_description,
            &requirements_json,
            inputs.draft.as_str(),
        );
        let request = CompletionRequest {
            system: &system,
            prompt: &prompt,
        };

        info!("Calling {provider} for cover letter polish");
        let raw = tokio::time::timeout(self.timeout, backend.invoke(&request))
            .await
            .map_err(|_| LlmError::Timeout)
            .and_then(|r| r)
            .map_err(|e| AppError::ProviderRequestFailed {
                provider,
                message: e.to_string(),
            })?;

        info!("{provider} replied with {} chars", raw.len());
        Ok(raw)
    }

    fn backend(&self, provider: ProviderId) -> Result<&Arc<dyn ProviderBackend>, AppError> {
        self.backends
            .get(&provider)
            .ok_or(AppError::MissingCredential {
                provider,
                key: provider.spec().credential_key,
            })
    }
}
