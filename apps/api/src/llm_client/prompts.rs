// Shared prompt fragments used across provider calls.
// The cover-letter prompt itself lives in generation/prompts.rs.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Instruction appended to every letter prompt to keep claims honest.
pub const GROUNDING_INSTRUCTION: &str = "\
    CRITICAL: Every claim about the candidate must be supported by the resume. \
    Do NOT invent employers, titles, dates, metrics, or skills. \
    If the resume does not support a requirement, leave it out rather than stretch.";
