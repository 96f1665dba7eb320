use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::llm_client::ProviderId;

/// Application-level error type.
/// Every pipeline stage and ledger operation reports through this enum;
/// implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    /// The extractor process could not be started or refused the handshake.
    #[error("Requirement tool unavailable: {0}")]
    ToolUnavailable(String),

    /// A tool call failed, returned garbage, or the session timed out.
    #[error("Requirement tool call failed: {0}")]
    ToolExecution(String),

    #[error("No credential configured for provider {provider}: set {key}")]
    MissingCredential { provider: ProviderId, key: &'static str },

    #[error("Provider {provider} request failed: {message}")]
    ProviderRequestFailed { provider: ProviderId, message: String },

    #[error("Provider response could not be parsed into a cover letter")]
    UnparsableResponse { raw: String },

    #[error("Application #{0} not found")]
    RecordNotFound(u32),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::ToolUnavailable(msg) => {
                tracing::error!("Requirement tool unavailable: {msg}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "TOOL_UNAVAILABLE",
                    "The requirements tool could not be started".to_string(),
                )
            }
            AppError::ToolExecution(msg) => {
                tracing::error!("Requirement tool error: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "TOOL_EXECUTION_ERROR",
                    "The requirements tool failed".to_string(),
                )
            }
            AppError::MissingCredential { .. } => (
                StatusCode::SERVICE_UNAVAILABLE,
                "MISSING_CREDENTIAL",
                self.to_string(),
            ),
            AppError::ProviderRequestFailed { provider, message } => {
                tracing::error!("Provider {provider} error: {message}");
                (
                    StatusCode::BAD_GATEWAY,
                    "PROVIDER_REQUEST_FAILED",
                    format!("The {provider} request failed"),
                )
            }
            AppError::UnparsableResponse { raw } => {
                tracing::error!("Unparsable provider response: {raw}");
                (
                    StatusCode::BAD_GATEWAY,
                    "UNPARSABLE_RESPONSE",
                    "The model reply could not be turned into a cover letter".to_string(),
                )
            }
            AppError::RecordNotFound(_) => (StatusCode::NOT_FOUND, "RECORD_NOT_FOUND", self.to_string()),
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_credential_names_provider_and_key() {
        let err = AppError::MissingCredential {
            provider: ProviderId::Gpt,
            key: "OPENAI_API_KEY",
        };
        let msg = err.to_string();
        assert!(msg.contains("gpt-5.2"));
        assert!(msg.contains("OPENAI_API_KEY"));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::RecordNotFound(7).into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::UnparsableResponse { raw: "x".into() }
                .into_response()
                .status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::ToolUnavailable("uvx missing".into())
                .into_response()
                .status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
