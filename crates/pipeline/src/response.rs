//! Uniform pipeline response shape (spec §4.11): every mode returns the
//! same fields; a feature the mode didn't run reports `enabled=false,
//! success=true, time_ms=0` rather than omitting the field.

use newsagent_core::card::Card;

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureReport {
    pub enabled: bool,
    pub success: bool,
    pub time_ms: u64,
    pub error: Option<String>,
}

impl FeatureReport {
    pub fn disabled() -> Self {
        Self { enabled: false, success: true, time_ms: 0, error: None }
    }

    pub fn ok(time_ms: u64) -> Self {
        Self { enabled: true, success: true, time_ms, error: None }
    }

    pub fn failed(time_ms: u64, error: impl Into<String>) -> Self {
        Self { enabled: true, success: false, time_ms, error: Some(error.into()) }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineResponse {
    /// `true` if a coherent answer was produced even if some sub-features
    /// failed (spec §7 "the overall run returns success=true if the main
    /// response can be produced").
    pub success: bool,
    pub response_text: String,
    pub chat: FeatureReport,
    pub rag: FeatureReport,
    pub cards: FeatureReport,
    pub news_retrieved: usize,
    pub cards_generated: usize,
    pub memories_used: usize,
    pub related_news: Vec<String>,
    pub card_data: Vec<Card>,
    pub quality_score: f64,
    pub context_relevance_score: f64,
    pub total_time_ms: u64,
}

impl PipelineResponse {
    /// A response shape with every feature reporting `disabled`, for the
    /// caller to fill in as each stage runs.
    pub fn empty() -> Self {
        Self {
            success: false,
            response_text: String::new(),
            chat: FeatureReport::disabled(),
            rag: FeatureReport::disabled(),
            cards: FeatureReport::disabled(),
            news_retrieved: 0,
            cards_generated: 0,
            memories_used: 0,
            related_news: Vec::new(),
            card_data: Vec::new(),
            quality_score: 0.0,
            context_relevance_score: 0.0,
            total_time_ms: 0,
        }
    }
}

/// One `search_history` record (spec §6, SPEC_FULL.md §2): one per
/// ingest-driving pipeline run.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SearchHistoryRecord {
    pub session_id: String,
    pub user_id: Option<String>,
    pub message: String,
    pub keywords: Vec<String>,
    pub found: u32,
    pub saved: u32,
    pub timestamp: String,
}

/// One `api_logs` record (spec §6, SPEC_FULL.md §2): one per top-level
/// pipeline invocation.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ApiLogRecord {
    pub session_id: String,
    pub user_id: Option<String>,
    pub mode: String,
    pub success: bool,
    pub total_time_ms: u64,
    pub timestamp: String,
}
