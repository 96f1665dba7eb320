use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::llm_client::ProviderId;

/// One cover-letter generation request, as supplied by the caller.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationRequest {
    pub resume_text: String,
    pub job_description: String,
    pub provider: ProviderId,
    #[serde(default)]
    pub link: Option<String>,
}

impl GenerationRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.resume_text.trim().is_empty() {
            return Err(AppError::Validation("resume_text cannot be empty".to_string()));
        }
        if self.job_description.trim().is_empty() {
            return Err(AppError::Validation(
                "job_description cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// The applicant identity passed to the draft tool. Comes from configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub email: String,
}

/// Structured output of the requirements tool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedRequirements {
    #[serde(default, alias = "title")]
    pub job_title: String,
    #[serde(default, alias = "company")]
    pub company_name: String,
    /// Required skills and qualifications, in the order the posting lists them.
    #[serde(
        default,
        alias = "skills",
        alias = "qualifications",
        alias = "required_skills"
    )]
    pub requirements: Vec<String>,
}

/// Unpolished draft text produced by the draft tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DraftLetter(pub String);

impl DraftLetter {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Final pipeline output. `job_id` is `None` when the posting states no id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverLetterResult {
    pub cover_letter: String,
    pub company_name: String,
    pub role_applied: String,
    pub job_id: Option<String>,
}
