//! Verdict extraction — recovers one JSON object from free-form model output.
//!
//! Models wrap their JSON in code fences or commentary no matter what the
//! prompt says. Tiers are tried in order and the first one that finds a
//! candidate wins; a candidate that then fails to parse is an error; a lower
//! tier is never tried after that.
//!
//! 1. A ```` ```json ```` fenced block.
//! 2. The first fenced block, if its interior starts with `{`.
//! 3. The first `{` up to the brace that brings nesting depth back to zero.
//! 4. The whole trimmed text.

use std::fmt;

use serde_json::{Map, Value};
use thiserror::Error;

const FENCE: &str = "```";
const JSON_FENCE: &str = "```json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractTier {
    JsonFence,
    PlainFence,
    BraceScan,
    RawText,
}

impl fmt::Display for ExtractTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExtractTier::JsonFence => "json fence",
            ExtractTier::PlainFence => "plain fence",
            ExtractTier::BraceScan => "brace scan",
            ExtractTier::RawText => "raw text",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("JSON parse error ({tier}): {source}")]
    Json {
        tier: ExtractTier,
        #[source]
        source: serde_json::Error,
    },

    #[error("Model output is valid JSON but not an object ({tier})")]
    NotAnObject { tier: ExtractTier },
}

/// Extracts the verdict object from `text`.
pub fn extract_json_object(text: &str) -> Result<Map<String, Value>, ExtractError> {
    let text = text.trim();
    let (tier, candidate) = locate_candidate(text);

    let value: Value =
        serde_json::from_str(candidate).map_err(|source| ExtractError::Json { tier, source })?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(ExtractError::NotAnObject { tier }),
    }
}

/// Picks the substring to parse and the tier that chose it.
fn locate_candidate(text: &str) -> (ExtractTier, &str) {
    if let Some(inner) = json_fence_interior(text) {
        return (ExtractTier::JsonFence, inner);
    }
    if let Some(inner) = first_fence_interior(text).filter(|s| s.starts_with('{')) {
        return (ExtractTier::PlainFence, inner);
    }
    if let Some(block) = balanced_object(text) {
        return (ExtractTier::BraceScan, block);
    }
    (ExtractTier::RawText, text)
}

/// Interior of the first ```` ```json ```` block, trimmed.
fn json_fence_interior(text: &str) -> Option<&str> {
    let start = text.find(JSON_FENCE)? + JSON_FENCE.len();
    let rest = &text[start..];
    let end = rest.find(FENCE)?;
    Some(rest[..end].trim())
}

/// Interior of the first ```` ``` ```` block, trimmed. A language tag, if
/// any, stays part of the interior.
fn first_fence_interior(text: &str) -> Option<&str> {
    let start = text.find(FENCE)? + FENCE.len();
    let rest = &text[start..];
    let end = rest.find(FENCE)?;
    Some(rest[..end].trim())
}

/// From the first `{` to the brace that closes it. Braces inside strings are
/// counted too, matching how models are prompted to answer.
fn balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth: usize = 0;
    for (offset, ch) in text[start..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}
