use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Rendered in prompts for any absent lead field.
pub const UNKNOWN: &str = "Unknown";

/// One candidate signal (post or message) plus sender metadata.
///
/// Supplied by an external collaborator and never validated: every field may
/// be absent, and any JSON value is accepted for the named fields (numbers and
/// booleans become their text). Keys this struct does not name are kept in
/// `extra` and written back out unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    #[serde(
        default,
        deserialize_with = "deserialize_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub name: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub title: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub company: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub source: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub content: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub url: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub date: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// `null` is absent; strings pass through; anything else is kept as its JSON text.
fn deserialize_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(text) => Some(text),
        other => Some(other.to_string()),
    })
}

impl Lead {
    /// Identifier used for tracing: `id`, else `url`, else `"unknown"`.
    pub fn trace_id(&self) -> &str {
        self.id
            .as_deref()
            .or(self.url.as_deref())
            .unwrap_or("unknown")
    }

    pub fn name_or_unknown(&self) -> &str {
        self.name.as_deref().unwrap_or(UNKNOWN)
    }

    pub fn title_or_unknown(&self) -> &str {
        self.title.as_deref().unwrap_or(UNKNOWN)
    }

    pub fn company_or_unknown(&self) -> &str {
        self.company.as_deref().unwrap_or(UNKNOWN)
    }

    pub fn source_or_unknown(&self) -> &str {
        self.source.as_deref().unwrap_or(UNKNOWN)
    }

    pub fn date_or_unknown(&self) -> &str {
        self.date.as_deref().unwrap_or(UNKNOWN)
    }

    /// Post text; empty when absent.
    pub fn content_text(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }
}
