//! One short-lived MCP client session with the requirements/draft tool.
//!
//! The tool is an MCP server spoken to over its stdio. A session completes the
//! `initialize` handshake on start, then runs any number of tool calls, then
//! closes.

use std::fmt::Display;
use std::process::Stdio;

use rmcp::model::{CallToolRequestParam, CallToolResult};
use rmcp::service::{RoleClient, RunningService, ServiceExt};
use rmcp::transport::child_process::TokioChildProcess;
use rmcp::transport::IntoTransport;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::process::Command;
use tracing::debug;

use crate::errors::AppError;
use crate::llm_client::strip_json_fences;
use crate::models::letter::{DraftLetter, ParsedRequirements, UserProfile};

const PARSE_REQUIREMENTS_TOOL: &str = "parse_job_requirements";
const GENERATE_DRAFT_TOOL: &str = "generate_cover_letter";

/// The parts of a tool result the extractor reads, taken from its wire form.
#[derive(Debug, Default, Deserialize)]
struct ToolReply {
    #[serde(default)]
    content: Vec<ContentItem>,
    #[serde(default, rename = "isError")]
    is_error: Option<bool>,
    #[serde(default, rename = "structuredContent")]
    structured_content: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ContentItem {
    #[serde(rename = "type")]
    item_type: String,
    text: Option<String>,
}

impl ToolReply {
    fn from_result(name: &str, result: &CallToolResult) -> Result<Self, AppError> {
        serde_json::to_value(result)
            .and_then(serde_json::from_value)
            .map_err(|e| AppError::ToolExecution(format!("{name} returned a malformed result: {e}")))
    }

    fn text(&self) -> String {
        self.content
            .iter()
            .filter(|c| c.item_type == "text")
            .filter_map(|c| c.text.as_deref())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub struct ToolSession {
    service: RunningService<RoleClient, ()>,
}

impl ToolSession {
    /// Spawns `command_line` (program followed by whitespace-separated args)
    /// and completes the handshake. The child is killed when the session goes away.
    pub async fn connect(command_line: &str) -> Result<Self, AppError> {
        let mut parts = command_line.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| AppError::ToolUnavailable("extractor command is empty".to_string()))?;

        let mut cmd = Command::new(program);
        cmd.args(parts)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        let transport = TokioChildProcess::new(cmd)
            .map_err(|e| AppError::ToolUnavailable(format!("failed to start '{program}': {e}")))?;

        Self::start(transport).await
    }

    /// Runs the `initialize` handshake over any client transport.
    /// Any failure here means the tool is unusable.
    pub async fn start<T, E, A>(transport: T) -> Result<Self, AppError>
    where
        T: IntoTransport<RoleClient, E, A>,
        E: std::error::Error + Send + Sync + 'static,
    {
        let service = ().serve(transport).await.map_err(handshake_failed)?;
        debug!("tool handshake complete: {:?}", service.peer_info());
        Ok(Self { service })
    }

    /// `parse_job_requirements(job_description) -> requirements`
    pub async fn parse_job_requirements(
        &self,
        job_description: &str,
    ) -> Result<ParsedRequirements, AppError> {
        let reply = self
            .call_tool(
                PARSE_REQUIREMENTS_TOOL,
                json!({ "job_description": job_description }),
            )
            .await?;

        let text = reply.text();
        let parsed = match reply.structured_content {
            Some(value) => serde_json::from_value(value),
            None => serde_json::from_str(strip_json_fences(&text)),
        };

        parsed.map_err(|e| {
            AppError::ToolExecution(format!(
                "{PARSE_REQUIREMENTS_TOOL} returned unparsable requirements: {e}"
            ))
        })
    }

    /// `generate_cover_letter(requirements, profile) -> draft text`
    pub async fn generate_cover_letter(
        &self,
        requirements: &ParsedRequirements,
        profile: &UserProfile,
    ) -> Result<DraftLetter, AppError> {
        let reply = self
            .call_tool(
                GENERATE_DRAFT_TOOL,
                json!({ "requirements": requirements, "profile": profile }),
            )
            .await?;

        let mut draft = reply.text();
        if draft.trim().is_empty() {
            if let Some(value) = reply.structured_content {
                draft = match value {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
            }
        }

        if draft.trim().is_empty() {
            return Err(AppError::ToolExecution(format!(
                "{GENERATE_DRAFT_TOOL} returned an empty draft"
            )));
        }
        Ok(DraftLetter(draft))
    }

    /// Ends the session and reaps the tool process.
    pub async fn close(self) {
        match self.service.cancel().await {
            Ok(reason) => debug!("tool session closed: {reason:?}"),
            Err(e) => debug!("tool session did not shut down cleanly: {e}"),
        }
    }

    async fn call_tool(&self, name: &'static str, arguments: Value) -> Result<ToolReply, AppError> {
        let arguments = match arguments {
            Value::Object(map) => Some(map),
            _ => None,
        };

        debug!("calling tool {name}");
        let result = self
            .service
            .call_tool(CallToolRequestParam {
                name: name.into(),
                arguments,
            })
            .await
            .map_err(|e| AppError::ToolExecution(format!("{name} failed: {e}")))?;

        let reply = ToolReply::from_result(name, &result)?;
        if reply.is_error.unwrap_or(false) {
            return Err(AppError::ToolExecution(format!("{name} failed: {}", reply.text())));
        }
        Ok(reply)
    }
}

fn handshake_failed(e: impl Display) -> AppError {
    AppError::ToolUnavailable(format!("handshake failed: {e}"))
}
