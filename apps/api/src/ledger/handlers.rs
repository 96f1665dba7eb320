use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::application::{ApplicationRecord, ApplicationStatus, LEDGER_HEADERS};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ApplicationView {
    pub seq: u32,
    pub label: String,
    pub company: String,
    pub role: String,
    pub job_id: Option<String>,
    pub link: Option<String>,
    pub status: Option<ApplicationStatus>,
}

impl From<ApplicationRecord> for ApplicationView {
    fn from(record: ApplicationRecord) -> Self {
        Self {
            label: record.label(),
            seq: record.seq,
            company: record.company,
            role: record.role,
            job_id: record.job_id,
            link: record.link,
            status: record.status,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApplicationListResponse {
    pub headers: [&'static str; 6],
    pub applications: Vec<ApplicationView>,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    /// `accepted` or `rejected`, any case.
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct StatusUpdateResponse {
    pub message: String,
}

/// GET /api/v1/applications
pub async fn handle_list_applications(
    State(state): State<AppState>,
) -> Result<Json<ApplicationListResponse>, AppError> {
    let applications = state
        .ledger
        .list()
        .await?
        .into_iter()
        .map(ApplicationView::from)
        .collect();

    Ok(Json(ApplicationListResponse {
        headers: LEDGER_HEADERS,
        applications,
    }))
}

/// PATCH /api/v1/applications/:seq/status
pub async fn handle_update_status(
    State(state): State<AppState>,
    seq: Result<Path<u32>, PathRejection>,
    payload: Result<Json<StatusUpdateRequest>, JsonRejection>,
) -> Result<Json<StatusUpdateResponse>, AppError> {
    let Path(seq) = seq.map_err(|e| AppError::Validation(e.body_text()))?;
    let Json(req) = payload.map_err(|e| AppError::Validation(e.body_text()))?;
    let status: ApplicationStatus = req.status.parse().map_err(AppError::Validation)?;
    state.ledger.update_status(seq, status).await?;

    Ok(Json(StatusUpdateResponse {
        message: format!("Marked #{seq} as {status}."),
    }))
}
