//! Batch orchestration: runs the lead workflow over many leads and tallies tiers.
//!
//! Results always come back in input order, whatever the concurrency. A lead
//! that fails is recorded as an ERROR result and the batch keeps going.

use futures_util::{future, stream, StreamExt};
use serde::Serialize;
use tokio::sync::watch;
use tracing::info;
use uuid::Uuid;

use crate::models::lead::Lead;
use crate::qualification::processor::LeadProcessor;
use crate::qualification::verdict::{ProcessResult, ScoreTier};

/// Per-tier counts over a set of results. Recomputed on demand, never stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchStats {
    pub total: usize,
    pub a_plus: usize,
    pub a: usize,
    pub b: usize,
    pub c: usize,
    pub error: usize,
}

impl BatchStats {
    pub fn record(&mut self, tier: ScoreTier) {
        self.total += 1;
        match tier {
            ScoreTier::APlus => self.a_plus += 1,
            ScoreTier::A => self.a += 1,
            ScoreTier::B => self.b += 1,
            ScoreTier::C => self.c += 1,
            ScoreTier::Error => self.error += 1,
        }
    }

    pub fn from_results(results: &[ProcessResult]) -> Self {
        let mut stats = Self::default();
        for result in results {
            stats.record(result.analysis.score());
        }
        stats
    }

    /// A+ and A only. B leads get a draft but are not counted here.
    pub fn qualified(&self) -> usize {
        self.tiers()
            .into_iter()
            .filter(|(tier, _)| tier.is_qualified())
            .map(|(_, count)| count)
            .sum()
    }

    /// Qualified share as a percentage; 0 for an empty batch.
    pub fn qualification_rate(&self) -> f64 {
        percentage(self.qualified(), self.total)
    }

    fn tiers(&self) -> [(ScoreTier, usize); 5] {
        [
            (ScoreTier::APlus, self.a_plus),
            (ScoreTier::A, self.a),
            (ScoreTier::B, self.b),
            (ScoreTier::C, self.c),
            (ScoreTier::Error, self.error),
        ]
    }
}

fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 * 100.0 / total as f64
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BatchOptions {
    /// Lead workflows in flight at once. 1 is strictly sequential.
    pub concurrency: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self { concurrency: 1 }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub batch_id: Uuid,
    pub results: Vec<ProcessResult>,
    pub stats: BatchStats,
    /// Set when the stop signal cut the batch short.
    pub interrupted: bool,
}

impl BatchReport {
    pub fn messages_drafted(&self) -> usize {
        self.results.iter().filter(|r| r.message.is_some()).count()
    }
}

/// Processes every lead.
pub async fn process_batch(
    processor: &LeadProcessor,
    leads: &[Lead],
    options: BatchOptions,
) -> BatchReport {
    let (_stop_tx, stop_rx) = watch::channel(false);
    process_batch_interruptible(processor, leads, options, stop_rx).await
}

/// Processes leads until `stop` reads `true`. Workflows already started run to
/// completion; no new lead is started after the signal.
pub async fn process_batch_interruptible(
    processor: &LeadProcessor,
    leads: &[Lead],
    options: BatchOptions,
    stop: watch::Receiver<bool>,
) -> BatchReport {
    let batch_id = Uuid::new_v4();
    let concurrency = options.concurrency.max(1);
    info!(
        "Batch {batch_id}: processing {} leads with {} (concurrency {concurrency})",
        leads.len(),
        processor.backend().kind()
    );

    // Handlers need a `Send` future: the stream owns its leads and processor.
    let worker = processor.clone();
    let results: Vec<ProcessResult> = stream::iter(leads.to_vec())
        .take_while(move |_| future::ready(!*stop.borrow()))
        .map(move |lead| {
            let worker = worker.clone();
            async move { worker.process_lead(&lead).await }
        })
        .buffered(concurrency)
        .collect()
        .await;

    let interrupted = results.len() < leads.len();
    if interrupted {
        info!(
            "Batch {batch_id} interrupted after {} of {} leads",
            results.len(),
            leads.len()
        );
    }

    let report = BatchReport {
        batch_id,
        stats: BatchStats::from_results(&results),
        results,
        interrupted,
    };
    log_summary(&report);
    report
}

fn log_summary(report: &BatchReport) {
    let stats = &report.stats;
    info!("Batch {} summary: {} leads", report.batch_id, stats.total);
    for (tier, count) in stats.tiers() {
        info!(
            "  {:<5} {count:>4} ({:.1}%)",
            tier.as_str(),
            percentage(count, stats.total)
        );
    }
    info!(
        "  Qualified (A+/A): {} ({:.1}%), messages drafted: {}",
        stats.qualified(),
        stats.qualification_rate(),
        report.messages_drafted()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::mock::MockBackend;
    use crate::llm_client::LlmError;
    use crate::qualification::prompts::QUALIFICATION_SYSTEM;
    use crate::qualification::verdict::ProcessStatus;
    use crate::reference::fixtures::reference;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn lead(id: &str) -> Lead {
        Lead {
            id: Some(id.to_string()),
            name: Some(format!("Lead {id}")),
            content: Some("Orders are chaos".to_string()),
            ..Lead::default()
        }
    }

    /// Scores each lead by the `score:<tier>` marker used as its name.
    /// `score:ERROR` makes the analysis call fail.
    fn tier_backend() -> MockBackend {
        MockBackend::new(|prompt, system| {
            if system != Some(QUALIFICATION_SYSTEM) {
                return Ok("Hi, happy to share what worked for others.".to_string());
            }
            let tier = ["A+", "A", "B", "C", "ERROR"]
                .into_iter()
                .find(|t| prompt.contains(&format!("score:{t}\n")))
                .unwrap_or("C");
            if tier == "ERROR" {
                return Err(LlmError::Api {
                    status: 500,
                    message: "upstream failure".to_string(),
                });
            }
            Ok(json!({"score": tier, "pain_points": ["Order Chaos"]}).to_string())
        })
    }

    fn scored_lead(tier: &str, n: usize) -> Lead {
        Lead {
            name: Some(format!("score:{tier}")),
            ..lead(&format!("lead-{n}"))
        }
    }

    fn processor(backend: MockBackend) -> (LeadProcessor, Arc<MockBackend>) {
        let backend = Arc::new(backend);
        (
            LeadProcessor::new(backend.clone(), Arc::new(reference())),
            backend,
        )
    }

    fn mixed_batch() -> Vec<Lead> {
        ["A+", "A+", "B", "C", "ERROR"]
            .iter()
            .enumerate()
            .map(|(n, tier)| scored_lead(tier, n))
            .collect()
    }

    #[tokio::test]
    async fn test_mixed_batch_stats_and_messages() {
        let (processor, backend) = processor(tier_backend());

        let report = process_batch(&processor, &mixed_batch(), BatchOptions::default()).await;
        assert_eq!(
            report.stats,
            BatchStats {
                total: 5,
                a_plus: 2,
                a: 0,
                b: 1,
                c: 1,
                error: 1
            }
        );
        assert_eq!(report.messages_drafted(), 3);
        assert!(report.results[0].message.is_some());
        assert!(report.results[2].message.is_some());
        assert!(report.results[3].message.is_none());
        assert_eq!(report.results[4].status, ProcessStatus::Error);
        assert!(!report.interrupted);
        // 5 analyses + 3 drafts
        assert_eq!(backend.calls(), 8);
    }

    #[tokio::test]
    async fn test_batch_runs_on_spawned_task() {
        let (processor, _) = processor(tier_backend());
        let leads = mixed_batch();

        let report = tokio::spawn(async move {
            let (_tx, rx) = watch::channel(false);
            process_batch_interruptible(&processor, &leads, BatchOptions { concurrency: 2 }, rx)
                .await
        })
        .await
        .unwrap();
        assert_eq!(report.stats.total, 5);
        assert_eq!(report.messages_drafted(), 3);
    }

    #[tokio::test]
    async fn test_results_keep_input_order() {
        let (processor, _) = processor(tier_backend());
        let leads = mixed_batch();

        let report = process_batch(&processor, &leads, BatchOptions { concurrency: 3 }).await;
        let ids: Vec<_> = report.results.iter().map(|r| r.lead.id.clone()).collect();
        let expected: Vec<_> = leads.iter().map(|l| l.id.clone()).collect();
        assert_eq!(ids, expected);
        assert_eq!(report.stats.total, 5);
    }

    #[tokio::test]
    async fn test_all_failures_do_not_abort_batch() {
        let (processor, _) = processor(MockBackend::failing(503, "down"));
        let leads: Vec<_> = (0..4).map(|n| lead(&n.to_string())).collect();

        let report = process_batch(&processor, &leads, BatchOptions::default()).await;
        assert_eq!(report.results.len(), 4);
        assert_eq!(report.stats.error, 4);
        assert_eq!(report.stats.qualification_rate(), 0.0);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let (processor, backend) = processor(tier_backend());
        let report = process_batch(&processor, &[], BatchOptions::default()).await;
        assert!(report.results.is_empty());
        assert_eq!(report.stats, BatchStats::default());
        assert_eq!(report.stats.qualification_rate(), 0.0);
        assert!(!report.interrupted);
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn test_stop_signal_prevents_new_leads() {
        let (stop_tx, stop_rx) = watch::channel(false);
        let analyses = AtomicUsize::new(0);
        let backend = MockBackend::new(move |_, _| {
            if analyses.fetch_add(1, Ordering::SeqCst) + 1 == 2 {
                stop_tx.send_replace(true);
            }
            Ok(json!({"score": "C"}).to_string())
        });
        let (processor, backend) = processor(backend);
        let leads: Vec<_> = (0..5).map(|n| lead(&n.to_string())).collect();

        let report =
            process_batch_interruptible(&processor, &leads, BatchOptions::default(), stop_rx)
                .await;
        assert!(report.interrupted);
        assert_eq!(report.results.len(), 2);
        assert_eq!(report.results[1].lead.id.as_deref(), Some("1"));
        assert_eq!(report.stats.total, 2);
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn test_stop_before_start_processes_nothing() {
        let (processor, backend) = processor(tier_backend());
        let (_tx, rx) = watch::channel(true);

        let report =
            process_batch_interruptible(&processor, &mixed_batch(), BatchOptions::default(), rx)
                .await;
        assert!(report.interrupted);
        assert!(report.results.is_empty());
        assert_eq!(backend.calls(), 0);
    }

    #[test]
    fn test_qualified_excludes_b() {
        let stats = BatchStats {
            total: 4,
            a_plus: 1,
            a: 1,
            b: 2,
            c: 0,
            error: 0,
        };
        assert_eq!(stats.qualified(), 2);
        assert_eq!(stats.qualification_rate(), 50.0);
    }

    #[test]
    fn test_stats_serialize_with_bucket_names() {
        let mut stats = BatchStats::default();
        stats.record(ScoreTier::APlus);
        stats.record(ScoreTier::Error);
        let value = serde_json::to_value(stats).unwrap();
        assert_eq!(
            value,
            json!({"total": 2, "a_plus": 1, "a": 0, "b": 0, "c": 0, "error": 1})
        );
    }
}
