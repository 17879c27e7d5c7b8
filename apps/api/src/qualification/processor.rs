//! Lead Processor — runs one lead through analysis and, if it passes the gate,
//! outreach drafting.
//!
//! Flow: qualification prompt → backend → extract JSON → Verdict
//!       → gate (A+/A/B) → message prompt → backend → strip preamble.
//!
//! Failures never escape: a failed analysis becomes an ERROR verdict, a failed
//! draft becomes "no message".

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::llm_client::LlmBackend;
use crate::models::lead::Lead;
use crate::qualification::extractor::extract_json_object;
use crate::qualification::prompts::{
    build_message_prompt, build_qualification_prompt, OUTREACH_SYSTEM, QUALIFICATION_SYSTEM,
};
use crate::qualification::verdict::{Assessment, ProcessResult, ProcessStatus, Verdict};
use crate::reference::ReferenceContext;

/// Conversational lead-ins models put in front of the actual message.
/// Matched case-insensitively as a prefix; at most one is removed.
const PREAMBLES: &[&str] = &[
    "here is the personalized outreach message:",
    "here is a personalized outreach message:",
    "here's the personalized outreach message:",
    "here's a personalized outreach message:",
    "here is the outreach message:",
    "sure, here is",
    "sure! here is",
];

/// Removes the first known preamble from the start of `text`.
pub fn strip_preamble(text: &str) -> &str {
    let text = text.trim();
    for preamble in PREAMBLES {
        let matches = text
            .get(..preamble.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(preamble));
        if matches {
            return text[preamble.len()..].trim();
        }
    }
    text
}

/// Stateless per-lead workflow. Cheap to share across concurrent batches.
#[derive(Clone)]
pub struct LeadProcessor {
    backend: Arc<dyn LlmBackend>,
    reference: Arc<ReferenceContext>,
}

impl LeadProcessor {
    pub fn new(backend: Arc<dyn LlmBackend>, reference: Arc<ReferenceContext>) -> Self {
        Self { backend, reference }
    }

    pub fn backend(&self) -> &dyn LlmBackend {
        self.backend.as_ref()
    }

    /// Same reference context, different backend.
    pub fn with_backend(&self, backend: Arc<dyn LlmBackend>) -> Self {
        Self {
            backend,
            reference: self.reference.clone(),
        }
    }

    /// Analyzes one lead. Any backend or parse failure yields an ERROR verdict.
    pub async fn analyze_lead(&self, lead: &Lead) -> Verdict {
        let lead_id = lead.trace_id();
        match self.try_analyze(lead).await {
            Ok(assessment) => Verdict::assessed(assessment, lead_id),
            Err(message) => {
                warn!("Error analyzing lead {lead_id}: {message}");
                Verdict::failed(message, lead_id)
            }
        }
    }

    async fn try_analyze(&self, lead: &Lead) -> Result<Assessment, String> {
        let prompt = build_qualification_prompt(lead, &self.reference);
        let response = self
            .backend
            .generate(&prompt, Some(QUALIFICATION_SYSTEM))
            .await
            .map_err(|e| e.to_string())?;
        let object = extract_json_object(&response).map_err(|e| e.to_string())?;
        serde_json::from_value(serde_json::Value::Object(object))
            .map_err(|e| format!("Invalid verdict: {e}"))
    }

    /// Drafts an outreach message. `None` when the verdict is outside the gate
    /// or the backend call fails.
    pub async fn draft_message(&self, lead: &Lead, verdict: &Verdict) -> Option<String> {
        let assessment = verdict.assessment()?;
        if !assessment.score.drafts_message() {
            return None;
        }

        let prompt = build_message_prompt(lead, assessment, &self.reference);
        match self.backend.generate(&prompt, Some(OUTREACH_SYSTEM)).await {
            Ok(text) => Some(strip_preamble(&text).to_string()),
            Err(e) => {
                warn!("Error generating message for lead {}: {e}", lead.trace_id());
                None
            }
        }
    }

    /// Full workflow for one lead.
    pub async fn process_lead(&self, lead: &Lead) -> ProcessResult {
        let verdict = self.analyze_lead(lead).await;
        let score = verdict.score();

        if verdict.error().is_some() {
            return ProcessResult {
                lead: lead.clone(),
                analysis: verdict,
                message: None,
                status: ProcessStatus::Error,
                processed_at: Utc::now(),
            };
        }

        let message = if score.drafts_message() {
            self.draft_message(lead, &verdict).await
        } else {
            None
        };

        let result = ProcessResult {
            lead: lead.clone(),
            analysis: verdict,
            message,
            status: ProcessStatus::Success,
            processed_at: Utc::now(),
        };
        info!(
            "Lead {} scored {} ({:?})",
            lead.trace_id(),
            score.as_str(),
            result.outcome()
        );
        result
    }
}
