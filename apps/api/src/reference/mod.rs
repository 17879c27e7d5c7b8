//! Reference context — the static business knowledge embedded in every prompt.
//!
//! Three JSON documents, loaded once at start-up and only ever read:
//! `company.json` (product, value propositions, communication style),
//! `audience.json` (target industries, titles, locations) and
//! `pain_points.json` (the pain-point taxonomy with example leads).

use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::info;

// ────────────────────────────────────────────────────────────────────────────
// company.json
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct CompanyProfile {
    pub company: CompanyIdentity,
    pub value_propositions: ValuePropositions,
    pub communication_style: CommunicationStyle,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompanyIdentity {
    pub name: String,
    pub product: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ValuePropositions {
    pub primary: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommunicationStyle {
    pub tone: String,
    pub language: String,
    #[serde(default)]
    pub avoid: Vec<String>,
    #[serde(default)]
    pub prefer: Vec<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// audience.json
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct AudienceProfile {
    pub audience: Audience,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Audience {
    pub industries: Industries,
    pub titles: Tiered,
    pub locations: Tiered,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Industries {
    pub high_priority: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Tiered {
    pub primary: Vec<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// pain_points.json
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct PainPointCatalog {
    pub pain_points: PainPoints,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PainPoints {
    pub primary_pains: Vec<PainPointDefinition>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PainPointDefinition {
    pub name: String,
    #[serde(default)]
    pub ideal_lead_examples: Vec<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Loader
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ReferenceContext {
    pub company: CompanyProfile,
    pub audience: AudienceProfile,
    pub pain_points: PainPointCatalog,
}

impl ReferenceContext {
    /// Loads the three reference documents from `dir`.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let context = Self {
            company: load_json(&dir.join("company.json"))?,
            audience: load_json(&dir.join("audience.json"))?,
            pain_points: load_json(&dir.join("pain_points.json"))?,
        };
        info!(
            "Reference context loaded from {} ({} pain-point categories)",
            dir.display(),
            context.pain_points.pain_points.primary_pains.len()
        );
        Ok(context)
    }
}

fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read reference file '{}'", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Reference file '{}' is missing required keys", path.display()))
}

/// Fixture shared by the prompt, processor and handler tests.
#[cfg(test)]
pub mod fixtures {
    use super::*;
    use serde_json::json;

    pub fn company_json() -> serde_json::Value {
        json!({
            "company": {"name": "OrderFlow", "product": "Dealer order management for distributors"},
            "value_propositions": {"primary": ["No more lost orders", "One inbox for every dealer"]},
            "communication_style": {
                "tone": "Peer-to-peer, practical",
                "language": "Simple English",
                "avoid": ["synergy", "book a demo"],
                "prefer": ["happy to share", "what worked for others"]
            }
        })
    }

    pub fn audience_json() -> serde_json::Value {
        json!({
            "audience": {
                "industries": {"high_priority": ["Auto parts distribution", "Industrial supplies"]},
                "titles": {"primary": ["Owner", "Managing Director"]},
                "locations": {"primary": ["India"]}
            }
        })
    }

    pub fn pain_points_json() -> serde_json::Value {
        json!({
            "pain_points": {
                "primary_pains": [
                    {
                        "name": "Order Chaos",
                        "ideal_lead_examples": [
                            "Orders arrive on WhatsApp, calls and email",
                            "Lost orders because messages got buried",
                            "Third example never shown"
                        ]
                    },
                    {
                        "name": "Inventory Blindness",
                        "ideal_lead_examples": ["Manual stock counts across warehouses"]
                    },
                    {"name": "Dealer Payment Delays"}
                ]
            }
        })
    }

    pub fn reference() -> ReferenceContext {
        ReferenceContext {
            company: serde_json::from_value(company_json()).unwrap(),
            audience: serde_json::from_value(audience_json()).unwrap(),
            pain_points: serde_json::from_value(pain_points_json()).unwrap(),
        }
    }
}
