//! Verdict and result types produced by the qualification workflow.
//!
//! The model's declared `score` is trusted as-is. Tier rules live in the
//! qualification prompt, not here; nothing in this module re-scores a lead.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::models::lead::Lead;

// ────────────────────────────────────────────────────────────────────────────
// Enumerations
// ────────────────────────────────────────────────────────────────────────────

/// Quality tier, strictest first. `Error` means no usable verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ScoreTier {
    #[serde(rename = "A+")]
    APlus,
    #[serde(rename = "A")]
    A,
    #[serde(rename = "B")]
    B,
    #[serde(rename = "C")]
    C,
    #[serde(rename = "ERROR")]
    Error,
}

impl ScoreTier {
    /// Maps a score label onto a tier; missing or unrecognised labels are `Error`.
    pub fn from_label(label: Option<&str>) -> Self {
        match label.map(str::trim) {
            Some("A+") => ScoreTier::APlus,
            Some("A") => ScoreTier::A,
            Some("B") => ScoreTier::B,
            Some("C") => ScoreTier::C,
            _ => ScoreTier::Error,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ScoreTier::APlus => "A+",
            ScoreTier::A => "A",
            ScoreTier::B => "B",
            ScoreTier::C => "C",
            ScoreTier::Error => "ERROR",
        }
    }

    /// Tiers that get an outreach draft. Wider than `is_qualified` on purpose:
    /// B leads get a draft for manual review.
    pub fn drafts_message(self) -> bool {
        matches!(self, ScoreTier::APlus | ScoreTier::A | ScoreTier::B)
    }

    /// Tiers counted as qualified in aggregates and exports.
    pub fn is_qualified(self) -> bool {
        matches!(self, ScoreTier::APlus | ScoreTier::A)
    }
}

/// Accepts only A+/A/B/C for a model-produced verdict.
fn deserialize_assessed_tier<'de, D>(deserializer: D) -> Result<ScoreTier, D::Error>
where
    D: Deserializer<'de>,
{
    let label = String::deserialize(deserializer)?;
    match ScoreTier::from_label(Some(&label)) {
        ScoreTier::Error => Err(serde::de::Error::custom(format!(
            "unrecognized score tier '{label}'"
        ))),
        tier => Ok(tier),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE", from = "String")]
pub enum PainClarity {
    Explicit,
    Implicit,
    #[default]
    None,
}

impl From<String> for PainClarity {
    fn from(label: String) -> Self {
        match label.trim().to_ascii_uppercase().as_str() {
            "EXPLICIT" => PainClarity::Explicit,
            "IMPLICIT" => PainClarity::Implicit,
            _ => PainClarity::None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE", from = "String")]
pub enum Urgency {
    High,
    Medium,
    Low,
    #[default]
    None,
}

impl From<String> for Urgency {
    fn from(label: String) -> Self {
        match label.trim().to_ascii_uppercase().as_str() {
            "HIGH" => Urgency::High,
            "MEDIUM" => Urgency::Medium,
            "LOW" => Urgency::Low,
            _ => Urgency::None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", from = "String")]
pub enum Authority {
    DecisionMaker,
    Influencer,
    #[default]
    Unknown,
    Low,
}

impl From<String> for Authority {
    fn from(label: String) -> Self {
        match label.trim().to_ascii_uppercase().as_str() {
            "DECISION_MAKER" => Authority::DecisionMaker,
            "INFLUENCER" => Authority::Influencer,
            "LOW" => Authority::Low,
            _ => Authority::Unknown,
        }
    }
}

/// Integer, float (rounded) or numeric string; anything else is 0.
fn deserialize_lenient_score<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let number = match &value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(number.map(|n| n.round().max(0.0) as u32).unwrap_or(0))
}

/// `null` or a value of the wrong shape falls back to the field's default.
fn deserialize_or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

// ────────────────────────────────────────────────────────────────────────────
// Verdict
// ────────────────────────────────────────────────────────────────────────────

/// The semantic fields of a verdict, as declared by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    #[serde(deserialize_with = "deserialize_assessed_tier")]
    pub score: ScoreTier,
    #[serde(default, deserialize_with = "deserialize_or_default")]
    pub pain_points: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_or_default")]
    pub pain_clarity: PainClarity,
    #[serde(default, deserialize_with = "deserialize_or_default")]
    pub urgency: Urgency,
    #[serde(default, deserialize_with = "deserialize_or_default")]
    pub authority: Authority,
    #[serde(default, deserialize_with = "deserialize_lenient_score")]
    pub specificity_score: u32,
    #[serde(default, deserialize_with = "deserialize_or_default")]
    pub industry_fit: bool,
    #[serde(default, deserialize_with = "deserialize_or_default")]
    pub size_fit: bool,
    #[serde(default, deserialize_with = "deserialize_or_default")]
    pub disqualify: bool,
    #[serde(default, deserialize_with = "deserialize_or_default")]
    pub disqualify_reason: String,
    #[serde(default, deserialize_with = "deserialize_or_default")]
    pub reasoning: String,
    #[serde(default, deserialize_with = "deserialize_or_default")]
    pub key_signals: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_or_default")]
    pub missing_signals: Vec<String>,
}

/// Why no assessment is available. Always serialises with `score: "ERROR"`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisFailure {
    score: ScoreTier,
    pub error: String,
}

impl AnalysisFailure {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            score: ScoreTier::Error,
            error: error.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum VerdictOutcome {
    Assessed(Assessment),
    Failed(AnalysisFailure),
}

/// Analysis result for one lead, stamped with when and for which lead it was made.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    #[serde(flatten)]
    pub outcome: VerdictOutcome,
    pub analyzed_at: DateTime<Utc>,
    pub lead_id: String,
}

impl Verdict {
    pub fn assessed(assessment: Assessment, lead_id: impl Into<String>) -> Self {
        Self {
            outcome: VerdictOutcome::Assessed(assessment),
            analyzed_at: Utc::now(),
            lead_id: lead_id.into(),
        }
    }

    pub fn failed(error: impl Into<String>, lead_id: impl Into<String>) -> Self {
        Self {
            outcome: VerdictOutcome::Failed(AnalysisFailure::new(error)),
            analyzed_at: Utc::now(),
            lead_id: lead_id.into(),
        }
    }

    pub fn score(&self) -> ScoreTier {
        match &self.outcome {
            VerdictOutcome::Assessed(a) => a.score,
            VerdictOutcome::Failed(_) => ScoreTier::Error,
        }
    }

    pub fn assessment(&self) -> Option<&Assessment> {
        match &self.outcome {
            VerdictOutcome::Assessed(a) => Some(a),
            VerdictOutcome::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            VerdictOutcome::Assessed(_) => None,
            VerdictOutcome::Failed(f) => Some(&f.error),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Process result
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessStatus {
    Success,
    Error,
}

/// Terminal workflow state of one lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadOutcome {
    QualifiedWithMessage,
    QualifiedNoMessage,
    Disqualified,
    Error,
}

/// Everything the workflow produced for one lead. Immutable once built.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessResult {
    pub lead: Lead,
    pub analysis: Verdict,
    pub message: Option<String>,
    pub status: ProcessStatus,
    pub processed_at: DateTime<Utc>,
}

impl ProcessResult {
    pub fn outcome(&self) -> LeadOutcome {
        let score = self.analysis.score();
        if self.status == ProcessStatus::Error || score == ScoreTier::Error {
            LeadOutcome::Error
        } else if !score.drafts_message() {
            LeadOutcome::Disqualified
        } else if self.message.is_some() {
            LeadOutcome::QualifiedWithMessage
        } else {
            LeadOutcome::QualifiedNoMessage
        }
    }
}
