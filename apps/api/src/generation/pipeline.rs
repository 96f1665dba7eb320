//! Cover-letter generation pipeline.
//!
//! Flow: credential check → extract (requirements + draft) → provider polish →
//! parse. Each stage failure aborts the request; nothing is logged to the
//! ledger unless the whole pipeline succeeds (the caller enqueues the append).

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::info;

use crate::errors::AppError;
use crate::extractor::RequirementExtractor;
use crate::generation::parser;
use crate::generation::router::{LetterInputs, ProviderRouter};
use crate::models::letter::{CoverLetterResult, GenerationRequest, UserProfile};

static UNSAFE_FILENAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[<>:"/\\|?*\s]+"#).expect("valid filename regex"));

/// Runs both generation phases for one request.
pub async fn generate_cover_letter(
    extractor: &dyn RequirementExtractor,
    router: &ProviderRouter,
    profile: &UserProfile,
    request: &GenerationRequest,
) -> Result<CoverLetterResult, AppError> {
    request.validate()?;

    // Before spawning anything: an unconfigured provider should cost nothing.
    router.ensure_available(request.provider)?;

    // Phase 1: structured requirements + rough draft
    let (requirements, draft) = extractor
        .extract(&request.job_description, profile)
        .await?;

    // Phase 2: provider polish
    let raw = router
        .generate(
            request.provider,
            &LetterInputs {
                resume_text: &request.resume_text,
                job_description: &request.job_description,
                requirements: &requirements,
                draft: &draft,
            },
        )
        .await?;

    let result = parser::parse(&raw)?;
    info!(
        "Generated cover letter for {} / {} via {}",
        result.company_name, result.role_applied, request.provider
    );
    Ok(result)
}

/// Download name for a letter: `{Company}_{MMDD}.txt`.
pub fn suggested_filename(company_name: &str, date: NaiveDate) -> String {
    let sanitized = UNSAFE_FILENAME_CHARS.replace_all(company_name.trim(), "_");
    let base = if sanitized.is_empty() {
        "cover_letter"
    } else {
        sanitized.as_ref()
    };
    format!("{base}_{}.txt", date.format("%m%d"))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::generation::router::tests::{router_with, CannedBackend};
    use crate::llm_client::ProviderId;
    use crate::models::letter::{DraftLetter, ParsedRequirements};

    struct CountingExtractor {
        calls: AtomicUsize,
        fail_with: Option<fn() -> AppError>,
    }

    impl CountingExtractor {
        fn healthy() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_with: None,
            }
        }
    }

    #[async_trait]
    impl RequirementExtractor for CountingExtractor {
        async fn extract(
            &self,
            _job_description: &str,
            profile: &UserProfile,
        ) -> Result<(ParsedRequirements, DraftLetter), AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(fail) = self.fail_with {
                return Err(fail());
            }
            Ok((
                ParsedRequirements {
                    job_title: "Analyst".to_string(),
                    company_name: "Globex".to_string(),
                    requirements: vec!["SQL".to_string()],
                },
                DraftLetter(format!("Dear Globex, I am {}.", profile.name)),
            ))
        }
    }

    fn profile() -> UserProfile {
        UserProfile {
            name: "Jane Doe".to_string(),
            email: "jane@example.com".to_string(),
        }
    }

    fn request(provider: ProviderId) -> GenerationRequest {
        GenerationRequest {
            resume_text: "Jane Doe. Five years of SQL.".to_string(),
            job_description: "Globex is hiring a Data Analyst.".to_string(),
            provider,
            link: Some("http://x".to_string()),
        }
    }

    const REPLY: &str = r#"{"cover_letter": "Dear Globex team,\n\nI would love to help.", "company_name": "Globex", "role_applied": "Analyst", "job_id": null}"#;

    #[tokio::test]
    async fn test_healthy_pipeline_returns_full_result() {
        let extractor = CountingExtractor::healthy();
        let backend = CannedBackend::ok(REPLY);
        let router = router_with(ProviderId::Claude, backend.clone());

        let result = generate_cover_letter(&extractor, &router, &profile(), &request(ProviderId::Claude))
            .await
            .unwrap();

        assert!(!result.cover_letter.is_empty());
        assert_eq!(result.company_name, "Globex");
        assert_eq!(result.role_applied, "Analyst");
        assert_eq!(result.job_id, None);
        assert_eq!(extractor.calls.load(Ordering::SeqCst), 1);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
        assert!(backend
            .last_prompt
            .lock()
            .unwrap()
            .contains("Dear Globex, I am Jane Doe."));
    }

    #[tokio::test]
    async fn test_missing_credential_skips_extractor_and_network() {
        let extractor = CountingExtractor::healthy();
        let backend = CannedBackend::ok(REPLY);
        let router = router_with(ProviderId::Claude, backend.clone());

        let err = generate_cover_letter(&extractor, &router, &profile(), &request(ProviderId::Gpt))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AppError::MissingCredential {
                provider: ProviderId::Gpt,
                key: "OPENAI_API_KEY"
            }
        ));
        assert_eq!(extractor.calls.load(Ordering::SeqCst), 0);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_extractor_failure_aborts_before_provider() {
        let extractor = CountingExtractor {
            calls: AtomicUsize::new(0),
            fail_with: Some(|| AppError::ToolUnavailable("uvx not found".to_string())),
        };
        let backend = CannedBackend::ok(REPLY);
        let router = router_with(ProviderId::Gemini, backend.clone());

        let err = generate_cover_letter(&extractor, &router, &profile(), &request(ProviderId::Gemini))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::ToolUnavailable(_)));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unrecoverable_reply_fails_whole_request() {
        let extractor = CountingExtractor::healthy();
        let router = router_with(
            ProviderId::Claude,
            CannedBackend::ok("I'm sorry, I can't help with that."),
        );

        let err = generate_cover_letter(&extractor, &router, &profile(), &request(ProviderId::Claude))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UnparsableResponse { .. }));
    }

    #[tokio::test]
    async fn test_blank_resume_is_rejected_before_any_work() {
        let extractor = CountingExtractor::healthy();
        let router = router_with(ProviderId::Claude, CannedBackend::ok(REPLY));
        let mut req = request(ProviderId::Claude);
        req.resume_text = "  ".to_string();

        let err = generate_cover_letter(&extractor, &router, &profile(), &req)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(extractor.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_suggested_filename() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 7).unwrap();
        assert_eq!(suggested_filename("Globex Corp", date), "Globex_Corp_0307.txt");
        assert_eq!(suggested_filename("A/B: <Labs", date), "A_B_Labs_0307.txt");
        assert_eq!(suggested_filename("   ", date), "cover_letter_0307.txt");
    }
}
