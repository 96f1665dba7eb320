// All LLM prompt constants for the cover-letter polishing call.
// Reuses cross-cutting fragments from llm_client::prompts.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::llm_client::prompts::{GROUNDING_INSTRUCTION, JSON_ONLY_SYSTEM};

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{(grounding_instruction|resume_text|job_description|requirements_json|draft)\}")
        .expect("valid placeholder regex")
});

/// Role description for the polishing call. Combined with `JSON_ONLY_SYSTEM`.
pub const COVER_LETTER_ROLE: &str = "You are an expert career writer. \
    You turn a rough cover-letter draft into a polished, specific, one-page letter \
    written in the candidate's voice.";

/// Polishing prompt template.
/// Replace: {grounding_instruction}, {resume_text}, {job_description},
///          {requirements_json}, {draft}
pub const COVER_LETTER_PROMPT_TEMPLATE: &str = r#"{grounding_instruction}

CANDIDATE RESUME:
{resume_text}

JOB DESCRIPTION:
{job_description}

EXTRACTED REQUIREMENTS:
{requirements_json}

DRAFT COVER LETTER (rewrite and improve; keep what is accurate):
{draft}

Return a JSON object with this EXACT schema (no extra fields):
{
  "cover_letter": "Dear Hiring Manager, ...",
  "company_name": "Company the letter is addressed to",
  "role_applied": "Exact job title from the posting",
  "job_id": "Requisition / job id from the posting, or null if none is stated"
}

HARD RULES:
1. `cover_letter` is the complete letter, plain text, paragraphs separated by blank lines
2. `company_name` and `role_applied` come from the job description, never guessed
3. `job_id` is null unless the job description states an id explicitly
4. Address the top requirements with concrete evidence from the resume
5. Keep it under 400 words"#;

/// Full system prompt for the polishing call.
pub fn cover_letter_system() -> String {
    format!("{COVER_LETTER_ROLE} {JSON_ONLY_SYSTEM}")
}

/// Fills the polishing template in a single pass, so placeholder-like text
/// inside the inputs reaches the provider verbatim.
pub fn build_cover_letter_prompt(
    resume_text: &str,
    job_description: &str,
    requirements_json: &str,
    draft: &str,
) -> String {
    PLACEHOLDER
        .replace_all(COVER_LETTER_PROMPT_TEMPLATE, |caps: &Captures| match &caps[1] {
            "grounding_instruction" => GROUNDING_INSTRUCTION,
            "resume_text" => resume_text.trim(),
            "job_description" => job_description.trim(),
            "requirements_json" => requirements_json,
            _ => draft.trim(),
        })
        .into_owned()
}
