// Shared prompt constants and prompt-building utilities.
// Each service that needs LLM calls defines its own prompts.rs alongside it.
// This file contains cross-cutting prompt fragments.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Instruction appended to every rewrite prompt.
pub const TRUTHFULNESS_INSTRUCTION: &str = "\
    CRITICAL: Stay truthful to the source resume. Do NOT invent employers, titles, \
    dates, degrees, certifications or metrics that are not present in the resume. \
    Rephrase and reorder; never fabricate.";
