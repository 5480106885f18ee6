// Shared prompt constants and prompt-building utilities.
// Each service that needs LLM calls defines its own prompts.rs alongside it.
// This file contains cross-cutting prompt fragments.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Instruction appended to prompts that answer from retrieved documents.
pub const GROUNDING_INSTRUCTION: &str = "\
    Answer ONLY from the documents provided. \
    If the documents do not contain the answer, say so plainly. \
    Refer to documents by their id when you use them.";
