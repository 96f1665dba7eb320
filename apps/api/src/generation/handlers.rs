//! Axum route handlers for cover-letter generation.

use axum::{
    extract::{multipart::MultipartError, rejection::JsonRejection, Multipart, State},
    Json,
};
use chrono::Local;
use serde::Serialize;
use tracing::{debug, info, info_span, Instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::generation::pipeline::{generate_cover_letter, suggested_filename};
use crate::llm_client::ProviderId;
use crate::models::application::NewApplication;
use crate::models::letter::{CoverLetterResult, GenerationRequest};
use crate::state::AppState;

const ACCEPTED_RESUME_TYPES: [&str; 2] = ["application/pdf", "application/octet-stream"];

#[derive(Debug, Serialize)]
pub struct CoverLetterResponse {
    #[serde(flatten)]
    pub result: CoverLetterResult,
    pub filename: String,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub cover_letter: String,
    pub company_name: String,
}

/// POST /api/v1/cover-letters
pub async fn handle_generate(
    State(state): State<AppState>,
    payload: Result<Json<GenerationRequest>, JsonRejection>,
) -> Result<Json<CoverLetterResponse>, AppError> {
    let Json(request) = payload.map_err(|e| AppError::Validation(e.body_text()))?;

    let result = run_generation(&state, &request).await?;
    let filename = suggested_filename(&result.company_name, Local::now().date_naive());

    Ok(Json(CoverLetterResponse { result, filename }))
}

/// POST /api/generate
///
/// Multipart form: `resume` (PDF), `job_description`, `model`, optional `link`.
pub async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut resume: Option<Vec<u8>> = None;
    let mut job_description: Option<String> = None;
    let mut model: Option<String> = None;
    let mut link: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(bad_form)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "resume" => {
                ensure_pdf(field.content_type())?;
                resume = Some(field.bytes().await.map_err(bad_form)?.to_vec());
            }
            "job_description" => job_description = Some(field.text().await.map_err(bad_form)?),
            "model" => model = Some(field.text().await.map_err(bad_form)?),
            "link" => link = Some(field.text().await.map_err(bad_form)?),
            _ => debug!("Ignoring unexpected form field '{name}'"),
        }
    }

    let resume = resume.ok_or_else(|| missing_field("resume"))?;
    let job_description = job_description.ok_or_else(|| missing_field("job_description"))?;
    let provider: ProviderId = model
        .ok_or_else(|| missing_field("model"))?
        .parse()
        .map_err(AppError::Validation)?;

    let request = GenerationRequest {
        resume_text: extract_resume_text(resume).await?,
        job_description,
        provider,
        link,
    };

    let result = run_generation(&state, &request).await?;
    Ok(Json(UploadResponse {
        cover_letter: result.cover_letter,
        company_name: result.company_name,
    }))
}

/// Runs the pipeline under a request span and queues the ledger append on success.
async fn run_generation(
    state: &AppState,
    request: &GenerationRequest,
) -> Result<CoverLetterResult, AppError> {
    let request_id = Uuid::new_v4();
    let span = info_span!("generation", %request_id, provider = %request.provider);

    let result = generate_cover_letter(
        state.extractor.as_ref(),
        &state.router,
        &state.config.profile,
        request,
    )
    .instrument(span)
    .await?;

    state.ledger_queue.submit(NewApplication::new(
        &result.company_name,
        &result.role_applied,
        result.job_id.as_deref(),
        request.link.as_deref(),
    ));
    Ok(result)
}

fn ensure_pdf(content_type: Option<&str>) -> Result<(), AppError> {
    let mime = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase())
        .unwrap_or_default();

    if ACCEPTED_RESUME_TYPES.contains(&mime.as_str()) {
        Ok(())
    } else {
        Err(AppError::Validation("Resume must be a PDF.".to_string()))
    }
}

/// PDF parsing is CPU-bound, so it runs on the blocking pool.
async fn extract_resume_text(bytes: Vec<u8>) -> Result<String, AppError> {
    let size = bytes.len();
    let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await
        .map_err(|e| AppError::Validation(format!("Could not read resume PDF: {e}")))?
        .map_err(|e| AppError::Validation(format!("Could not read resume PDF: {e:?}")))?;

    if text.trim().is_empty() {
        return Err(AppError::Validation(
            "Resume PDF contains no extractable text".to_string(),
        ));
    }

    info!("Extracted {} chars of resume text from {size} byte PDF", text.len());
    Ok(text)
}

fn bad_form(err: MultipartError) -> AppError {
    AppError::Validation(format!("Invalid form data: {}", err.body_text()))
}

fn missing_field(name: &str) -> AppError {
    AppError::Validation(format!("Missing form field '{name}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pdf_content_types_accepted() {
        assert!(ensure_pdf(Some("application/pdf")).is_ok());
        assert!(ensure_pdf(Some("Application/PDF; name=cv.pdf")).is_ok());
        assert!(ensure_pdf(Some("application/octet-stream")).is_ok());
    }

    #[test]
    fn test_other_content_types_rejected() {
        for ct in [Some("text/plain"), Some("image/png"), None] {
            assert!(matches!(ensure_pdf(ct), Err(AppError::Validation(_))), "{ct:?}");
        }
    }

    #[tokio::test]
    async fn test_garbage_pdf_is_validation_error() {
        let err = extract_resume_text(b"not a pdf at all".to_vec()).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_response_flattens_result_and_filename() {
        let response = CoverLetterResponse {
            result: CoverLetterResult {
                cover_letter: "Dear team".to_string(),
                company_name: "Acme".to_string(),
                role_applied: "Engineer".to_string(),
                job_id: None,
            },
            filename: "Acme_0101.txt".to_string(),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["company_name"], "Acme");
        assert_eq!(json["role_applied"], "Engineer");
        assert!(json["job_id"].is_null());
        assert_eq!(json["filename"], "Acme_0101.txt");
    }
}
