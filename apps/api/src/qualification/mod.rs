// Lead qualification pipeline.
// Prompt composition, verdict extraction, the per-lead workflow and batch runs.
// All model calls go through llm_client; nothing here touches the network directly.

pub mod batch;
pub mod extractor;
pub mod handlers;
pub mod processor;
pub mod prompts;
pub mod verdict;
