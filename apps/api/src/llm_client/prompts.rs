// Shared prompt fragments used across providers and callers.
// Each caller that needs LLM calls defines its own prompts.rs alongside it.

/// System message sent when the caller supplies none and the provider requires one.
pub const DEFAULT_SYSTEM: &str = "You are a helpful assistant.";

/// Output contract appended to every prompt that expects a JSON object back.
pub const JSON_ONLY_INSTRUCTION: &str = "\
OUTPUT: Reply with ONLY a valid JSON object. No explanation, no markdown, \
no text before or after.";
