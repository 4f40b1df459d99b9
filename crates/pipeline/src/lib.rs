//! Pipeline Coordinator (spec §4.11): mode dispatch over the rest of this
//! workspace's component crates, an explicit `Services` bundle instead of
//! hidden globals (spec §9), uniform response shape, and an SSE-style
//! streaming surface for chat.

pub mod batch;
pub mod coordinator;
pub mod request;
pub mod response;
pub mod scoring;
pub mod services;
pub mod streaming;

pub use batch::{BatchResult, DEFAULT_BATCH_CONCURRENCY, MAX_BATCH_CONCURRENCY, MAX_BATCH_REQUESTS};
pub use coordinator::PipelineCoordinator;
pub use request::{CustomFlags, PipelineLimits, PipelineMode, PipelineRequest};
pub use response::{ApiLogRecord, FeatureReport, PipelineResponse, SearchHistoryRecord};
pub use scoring::{context_relevance_score, response_quality_score};
pub use services::Services;
pub use streaming::{stream_enhanced_chat, PipelineEvent};
