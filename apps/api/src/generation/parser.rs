//! Response Parser: turns a provider's raw reply into a `CoverLetterResult`.
//!
//! The strict path expects the JSON object the prompt asks for. When that
//! fails, recovery tries, in order: the outermost `{...}` slice, per-field
//! `"key": "value"` extraction, then labelled lines (`Company: ...`) with the
//! letter body taken from a `Cover Letter:` label or the salutation onward.
//! A required field that cannot be recovered fails the whole parse; `job_id`
//! alone may stay `None`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::errors::AppError;
use crate::llm_client::strip_json_fences;
use crate::models::letter::CoverLetterResult;

#[derive(Debug, Deserialize)]
struct RawLetter {
    #[serde(alias = "letter")]
    cover_letter: Option<String>,
    #[serde(alias = "company")]
    company_name: Option<String>,
    #[serde(alias = "role", alias = "job_title")]
    role_applied: Option<String>,
    #[serde(default)]
    job_id: Option<Value>,
}

impl RawLetter {
    fn into_result(self) -> Option<CoverLetterResult> {
        let job_id = match self.job_id {
            Some(Value::String(s)) => normalize_job_id(&s),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };
        assemble(self.cover_letter, self.company_name, self.role_applied, job_id)
    }
}

static LETTER_FIELD: Lazy<Regex> = Lazy::new(|| json_string_field(r"cover_letter|letter"));
static COMPANY_FIELD: Lazy<Regex> = Lazy::new(|| json_string_field(r"company_name|company"));
static ROLE_FIELD: Lazy<Regex> = Lazy::new(|| json_string_field(r"role_applied|role|job_title"));
static JOB_ID_FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""job_id"\s*:\s*(?:"((?:[^"\\]|\\.)*)"|(-?\d+))"#).expect("valid job_id regex")
});

static COMPANY_LINE: Lazy<Regex> = Lazy::new(|| labelled_line(r"company(?:[ _]name)?"));
static ROLE_LINE: Lazy<Regex> =
    Lazy::new(|| labelled_line(r"role(?:[ _]applied)?|position|job[ _]title"));
static JOB_ID_LINE: Lazy<Regex> = Lazy::new(|| labelled_line(r"job[ _]?id"));
static LETTER_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?mi)^[\s*#-]*cover[ _]letter[\s*]*:[\s*]*").expect("valid letter label regex")
});
static SALUTATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*Dear\b").expect("valid salutation regex"));
static METADATA_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^[\s*#-]*(?:company(?:[ _]name)?|role(?:[ _]applied)?|position|job[ _]title|job[ _]?id)[\s*]*:",
    )
    .expect("valid metadata label regex")
});

fn json_string_field(keys: &str) -> Regex {
    Regex::new(&format!(r#""(?:{keys})"\s*:\s*"((?:[^"\\]|\\.)*)""#)).expect("valid field regex")
}

fn labelled_line(label: &str) -> Regex {
    Regex::new(&format!(r"(?mi)^[\s*#-]*(?:{label})[\s*]*:[\s*]*(.+?)[\s*]*$"))
        .expect("valid label regex")
}

/// Parses a provider reply. Fails with `UnparsableResponse` carrying `raw`.
pub fn parse(raw: &str) -> Result<CoverLetterResult, AppError> {
    if let Some(result) = parse_structured(strip_json_fences(raw)) {
        return Ok(result);
    }

    debug!("structured parse failed; attempting recovery");
    if let Some(result) = recover(raw) {
        info!("Recovered cover letter from malformed reply for {}", result.company_name);
        return Ok(result);
    }

    Err(AppError::UnparsableResponse {
        raw: raw.to_string(),
    })
}

fn parse_structured(text: &str) -> Option<CoverLetterResult> {
    serde_json::from_str::<RawLetter>(text).ok()?.into_result()
}

fn recover(raw: &str) -> Option<CoverLetterResult> {
    if let (Some(start), Some(end)) = (raw.find('{'), raw.rfind('}')) {
        if start < end {
            if let Some(result) = parse_structured(&raw[start..=end]) {
                return Some(result);
            }
        }
    }

    let letter = capture_json_string(&LETTER_FIELD, raw).or_else(|| letter_body(raw));
    let company = capture_json_string(&COMPANY_FIELD, raw).or_else(|| capture_line(&COMPANY_LINE, raw));
    let role = capture_json_string(&ROLE_FIELD, raw).or_else(|| capture_line(&ROLE_LINE, raw));
    let job_id = capture_job_id(raw);

    assemble(letter, company, role, job_id)
}

/// Requires the three logged fields to be present and non-blank.
fn assemble(
    letter: Option<String>,
    company: Option<String>,
    role: Option<String>,
    job_id: Option<String>,
) -> Option<CoverLetterResult> {
    let required = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    Some(CoverLetterResult {
        cover_letter: required(letter)?,
        company_name: required(company)?,
        role_applied: required(role)?,
        job_id,
    })
}

fn normalize_job_id(value: &str) -> Option<String> {
    let trimmed = value.trim();
    match trimmed.to_ascii_lowercase().as_str() {
        "" | "null" | "none" | "n/a" | "na" | "not specified" | "not stated" => None,
        _ => Some(trimmed.to_string()),
    }
}

fn unescape_json(fragment: &str) -> Option<String> {
    serde_json::from_str::<String>(&format!("\"{fragment}\"")).ok()
}

fn capture_json_string(pattern: &Regex, raw: &str) -> Option<String> {
    let fragment = pattern.captures(raw)?.get(1)?.as_str();
    unescape_json(fragment)
}

fn capture_line(pattern: &Regex, raw: &str) -> Option<String> {
    Some(pattern.captures(raw)?.get(1)?.as_str().trim().to_string())
}

fn capture_job_id(raw: &str) -> Option<String> {
    if let Some(caps) = JOB_ID_FIELD.captures(raw) {
        if let Some(s) = caps.get(1) {
            return unescape_json(s.as_str()).and_then(|v| normalize_job_id(&v));
        }
        return caps.get(2).map(|n| n.as_str().to_string());
    }
    capture_line(&JOB_ID_LINE, raw).and_then(|v| normalize_job_id(&v))
}

/// Letter text after a `Cover Letter:` label, else from the salutation on.
/// Stops at the next metadata label line.
fn letter_body(raw: &str) -> Option<String> {
    let start = LETTER_LABEL
        .find(raw)
        .map(|m| m.end())
        .or_else(|| SALUTATION.find(raw).map(|m| m.start()))?;

    let body = raw[start..]
        .lines()
        .take_while(|line| !METADATA_LABEL.is_match(line))
        .collect::<Vec<_>>()
        .join("\n");
    Some(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLEAN: &str = r#"{
        "cover_letter": "Dear Hiring Manager,\n\nI am excited to apply.\n\nSincerely,\nJane",
        "company_name": "Globex",
        "role_applied": "Data Analyst",
        "job_id": "R-2231"
    }"#;

    fn clean_result() -> CoverLetterResult {
        CoverLetterResult {
            cover_letter: "Dear Hiring Manager,\n\nI am excited to apply.\n\nSincerely,\nJane".to_string(),
            company_name: "Globex".to_string(),
            role_applied: "Data Analyst".to_string(),
            job_id: Some("R-2231".to_string()),
        }
    }

    #[test]
    fn test_clean_json() {
        assert_eq!(parse(CLEAN).unwrap(), clean_result());
    }

    #[test]
    fn test_fenced_json() {
        let raw = format!("```json\n{CLEAN}\n```");
        assert_eq!(parse(&raw).unwrap(), clean_result());
    }

    #[test]
    fn test_null_and_placeholder_job_ids_become_none() {
        for job_id in ["null", "\"\"", "\"N/A\"", "\"  none \""] {
            let raw = format!(
                r#"{{"cover_letter": "Dear team", "company_name": "Acme", "role_applied": "Engineer", "job_id": {job_id}}}"#
            );
            assert_eq!(parse(&raw).unwrap().job_id, None, "job_id {job_id}");
        }
    }

    #[test]
    fn test_missing_job_id_is_none() {
        let raw = r#"{"cover_letter": "Dear team", "company_name": "Acme", "role_applied": "Engineer"}"#;
        assert_eq!(parse(raw).unwrap().job_id, None);
    }

    #[test]
    fn test_numeric_job_id_is_kept() {
        let raw = r#"{"cover_letter": "Dear team", "company_name": "Acme", "role_applied": "Engineer", "job_id": 12345}"#;
        assert_eq!(parse(raw).unwrap().job_id.as_deref(), Some("12345"));
    }

    #[test]
    fn test_prose_wrapped_json_matches_primary_shape() {
        let raw = format!("Sure! Here is your letter:\n\n{CLEAN}\n\nLet me know if you want changes.");
        assert_eq!(parse(&raw).unwrap(), clean_result());
    }

    #[test]
    fn test_invalid_json_recovered_field_by_field() {
        // Trailing comma makes this invalid JSON.
        let raw = r#"{"cover_letter": "Dear Globex team,\n\nI \"love\" data.", "company_name": "Globex", "role_applied": "Analyst", "job_id": null,}"#;
        let result = parse(raw).unwrap();
        assert_eq!(result.cover_letter, "Dear Globex team,\n\nI \"love\" data.");
        assert_eq!(result.company_name, "Globex");
        assert_eq!(result.role_applied, "Analyst");
        assert_eq!(result.job_id, None);
    }

    #[test]
    fn test_labelled_text_recovery() {
        let raw = "**Company:** Initech\n**Role:** Backend Engineer\nJob ID: 7781\n\nCover Letter:\nDear Initech team,\n\nI build reliable services.\n\nBest,\nJane";
        let result = parse(raw).unwrap();
        assert_eq!(result.company_name, "Initech");
        assert_eq!(result.role_applied, "Backend Engineer");
        assert_eq!(result.job_id.as_deref(), Some("7781"));
        assert_eq!(
            result.cover_letter,
            "Dear Initech team,\n\nI build reliable services.\n\nBest,\nJane"
        );
    }

    #[test]
    fn test_salutation_recovery_stops_at_metadata() {
        let raw = "Dear Acme recruiters,\n\nHello.\n\nCompany: Acme\nPosition: Engineer";
        let result = parse(raw).unwrap();
        assert_eq!(result.cover_letter, "Dear Acme recruiters,\n\nHello.");
        assert_eq!(result.company_name, "Acme");
        assert_eq!(result.role_applied, "Engineer");
        assert_eq!(result.job_id, None);
    }

    #[test]
    fn test_missing_company_is_unparsable_and_keeps_raw() {
        let raw = "Role: Engineer\n\nDear team,\n\nI would love to join.";
        match parse(raw) {
            Err(AppError::UnparsableResponse { raw: kept }) => assert_eq!(kept, raw),
            other => panic!("expected UnparsableResponse, got {other:?}"),
        }
    }

    #[test]
    fn test_blank_required_field_is_not_fabricated() {
        let raw = r#"{"cover_letter": "Dear team", "company_name": "  ", "role_applied": "Engineer", "job_id": null}"#;
        assert!(matches!(parse(raw), Err(AppError::UnparsableResponse { .. })));
    }

    #[test]
    fn test_empty_reply_is_unparsable() {
        assert!(matches!(parse(""), Err(AppError::UnparsableResponse { .. })));
    }
}
