// Shared prompt fragments. Each service that needs LLM calls defines its own
// prompts.rs alongside it; this file only holds cross-cutting pieces.

/// System instruction that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Appended to every extraction prompt.
pub const EXTRACT_ONLY_INSTRUCTION: &str = "\
    CRITICAL: Extract, never infer. If a field cannot be found in the source, \
    return an empty string (or an empty list) instead of inventing a value.";
