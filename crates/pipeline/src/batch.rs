//! Batch fan-out across pipeline requests (spec §5 "Scheduling model":
//! "batch mode fans out across pipeline requests with a caller-supplied
//! concurrency cap (default 5, max 10, request cap 20)").
//!
//! This is plain fan-out over [`PipelineCoordinator::run`], not a distinct
//! pipeline mode — each request still dispatches through its own mode
//! (`enhanced_chat`, `rag_analysis`, ...) and carries its own deadline.

use futures::stream::{self, StreamExt};

use newsagent_fetch::ContentFetcher;
use newsagent_llm::{ChatPort, EmbedPort};
use newsagent_search::SearchPort;

use crate::coordinator::PipelineCoordinator;
use crate::request::PipelineRequest;
use crate::response::PipelineResponse;

/// Default concurrency when the caller doesn't specify one.
pub const DEFAULT_BATCH_CONCURRENCY: usize = 5;
/// Hard ceiling on concurrency regardless of caller input.
pub const MAX_BATCH_CONCURRENCY: usize = 10;
/// Hard ceiling on how many requests one batch call will run; anything
/// beyond this is dropped rather than silently queued.
pub const MAX_BATCH_REQUESTS: usize = 20;

/// Outcome of [`PipelineCoordinator::run_batch`]: the responses for the
/// requests that ran, plus how many trailing requests were dropped for
/// exceeding [`MAX_BATCH_REQUESTS`].
pub struct BatchResult {
    pub responses: Vec<PipelineResponse>,
    pub dropped: usize,
}

impl<S, F, C, E> PipelineCoordinator<S, F, C, E>
where
    S: SearchPort + Clone,
    F: ContentFetcher + Clone,
    C: ChatPort + Clone,
    E: EmbedPort + Clone,
{
    /// Runs `requests` concurrently, at most `max_concurrent` in flight at
    /// once (clamped to [`MAX_BATCH_CONCURRENCY`], defaulting to
    /// [`DEFAULT_BATCH_CONCURRENCY`] when zero). Requests past
    /// [`MAX_BATCH_REQUESTS`] are dropped, not queued — the caller sees how
    /// many in [`BatchResult::dropped`]. Responses are returned in the same
    /// order as `requests`; each request's own mode, limits, and deadline
    /// still apply independently (a slow or timed-out request in the batch
    /// never blocks the others beyond the concurrency cap).
    pub async fn run_batch(&self, requests: &[PipelineRequest], max_concurrent: usize) -> BatchResult {
        let concurrency = if max_concurrent == 0 { DEFAULT_BATCH_CONCURRENCY } else { max_concurrent.min(MAX_BATCH_CONCURRENCY) };
        let dropped = requests.len().saturating_sub(MAX_BATCH_REQUESTS);
        let accepted = &requests[..requests.len().min(MAX_BATCH_REQUESTS)];

        let responses = stream::iter(accepted.iter().map(|request| self.run(request))).buffered(concurrency).collect().await;

        BatchResult { responses, dropped }
    }
}
