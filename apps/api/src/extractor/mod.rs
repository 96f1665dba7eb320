//! Requirement Extractor: first phase of generation.
//!
//! Runs the external requirements/draft tool: one process per call, handshake,
//! two tool invocations in order, then teardown. Either both outputs come back
//! or the call fails as a whole. A tool that never finishes the handshake is
//! unavailable; one that stalls mid-call is an execution failure.

pub mod session;

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{timeout_at, Instant};
use tracing::info;

use crate::errors::AppError;
use crate::models::letter::{DraftLetter, ParsedRequirements, UserProfile};

pub use session::ToolSession;

#[async_trait]
pub trait RequirementExtractor: Send + Sync {
    async fn extract(
        &self,
        job_description: &str,
        profile: &UserProfile,
    ) -> Result<(ParsedRequirements, DraftLetter), AppError>;
}

/// Production extractor backed by a spawned tool process.
pub struct ToolExtractor {
    command: String,
    timeout: Duration,
}

impl ToolExtractor {
    pub fn new(command: String, timeout: Duration) -> Self {
        Self { command, timeout }
    }
}

#[async_trait]
impl RequirementExtractor for ToolExtractor {
    async fn extract(
        &self,
        job_description: &str,
        profile: &UserProfile,
    ) -> Result<(ParsedRequirements, DraftLetter), AppError> {
        // One budget covers the handshake and both calls.
        let deadline = Instant::now() + self.timeout;

        let session = timeout_at(deadline, ToolSession::connect(&self.command))
            .await
            .map_err(|_| {
                AppError::ToolUnavailable(format!(
                    "extractor handshake timed out after {}s",
                    self.timeout.as_secs()
                ))
            })??;

        let outcome = timeout_at(deadline, run_calls(&session, job_description, profile)).await;
        session.close().await;

        let (requirements, draft) = outcome.map_err(|_| {
            AppError::ToolExecution(format!(
                "extractor session timed out after {}s",
                self.timeout.as_secs()
            ))
        })??;

        info!(
            "Extracted {} requirements for '{}' at '{}'",
            requirements.requirements.len(),
            requirements.job_title,
            requirements.company_name
        );
        Ok((requirements, draft))
    }
}

async fn run_calls(
    session: &ToolSession,
    job_description: &str,
    profile: &UserProfile,
) -> Result<(ParsedRequirements, DraftLetter), AppError> {
    let requirements = session.parse_job_requirements(job_description).await?;
    let draft = session.generate_cover_letter(&requirements, profile).await?;
    Ok((requirements, draft))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> UserProfile {
        UserProfile {
            name: "Jane Doe".to_string(),
            email: "jane@example.com".to_string(),
        }
    }

    #[tokio::test]
    async fn test_missing_tool_binary_is_unavailable() {
        let extractor = ToolExtractor::new(
            "no-such-requirements-tool-binary".to_string(),
            Duration::from_secs(5),
        );
        let err = extractor.extract("jd", &profile()).await.unwrap_err();
        assert!(matches!(err, AppError::ToolUnavailable(_)));
    }

    /// Shell tool that echoes each request id back with a canned result.
    #[cfg(unix)]
    const SCRIPT_PRELUDE: &str = r#"reply() {
  id=$(printf '%s' "$1" | sed 's/.*"id":\([0-9]*\).*/\1/')
  printf '{"jsonrpc":"2.0","id":%s,"result":%s}\n' "$id" "$2"
}
read line
reply "$line" '{"protocolVersion":"2024-11-05","capabilities":{"tools":{}},"serverInfo":{"name":"fake","version":"0"}}'
read line
"#;

    #[cfg(unix)]
    fn script_tool(dir: &tempfile::TempDir, body: &str) -> String {
        let script = dir.path().join("tool.sh");
        std::fs::write(&script, format!("{SCRIPT_PRELUDE}{body}")).unwrap();
        format!("sh {}", script.display())
    }

    /// Drives a real child process that replays a scripted session.
    #[cfg(unix)]
    #[tokio::test]
    async fn test_extract_against_scripted_process() {
        let dir = tempfile::tempdir().unwrap();
        let command = script_tool(
            &dir,
            r#"read line
reply "$line" '{"content":[{"type":"text","text":"{\"job_title\":\"Analyst\",\"company_name\":\"Globex\",\"requirements\":[\"SQL\"]}"}]}'
read line
reply "$line" '{"content":[{"type":"text","text":"Dear Globex team"}]}'
read line
"#,
        );

        let extractor = ToolExtractor::new(command, Duration::from_secs(10));
        let (requirements, draft) = extractor.extract("Globex jd", &profile()).await.unwrap();

        assert_eq!(requirements.job_title, "Analyst");
        assert_eq!(requirements.company_name, "Globex");
        assert_eq!(requirements.requirements, vec!["SQL"]);
        assert_eq!(draft.as_str(), "Dear Globex team");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_silent_tool_times_out_as_unavailable() {
        let extractor = ToolExtractor::new("sleep 30".to_string(), Duration::from_millis(300));
        let err = extractor.extract("jd", &profile()).await.unwrap_err();
        assert!(matches!(err, AppError::ToolUnavailable(ref m) if m.contains("timed out")));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_tool_hanging_mid_call_times_out_as_execution_error() {
        let dir = tempfile::tempdir().unwrap();
        let command = script_tool(&dir, "read line\nsleep 30\n");

        let extractor = ToolExtractor::new(command, Duration::from_secs(2));
        let err = extractor.extract("jd", &profile()).await.unwrap_err();
        assert!(matches!(err, AppError::ToolExecution(ref m) if m.contains("timed out")));
    }
}
