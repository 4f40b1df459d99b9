//! Pipeline request shape (spec §4.11): `{user, session, message, mode,
//! flags, limits}`.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CustomFlags {
    pub rag: bool,
    pub cards: bool,
    pub chat: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineMode {
    EnhancedChat,
    RagAnalysis,
    CardGeneration,
    UnifiedComplete,
    Custom(CustomFlags),
}

/// Caller-supplied result-size limits, independent of the fixed per-stage
/// constants each component crate already enforces.
#[derive(Debug, Clone, Copy)]
pub struct PipelineLimits {
    pub max_related: usize,
    pub max_cards: usize,
}

impl Default for PipelineLimits {
    fn default() -> Self {
        Self { max_related: 5, max_cards: 3 }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineRequest {
    /// Required for any mode that writes interests or memories (spec §4.9,
    /// §4.10); `rag_analysis` and anonymous `card_generation` are the only
    /// modes that tolerate `None` — see DESIGN.md.
    pub user_id: Option<String>,
    pub session_id: String,
    pub message: String,
    pub mode: PipelineMode,
    pub limits: PipelineLimits,
    /// Overrides the coordinator's configured request timeout (spec §5
    /// "Cancellation", `PIPELINE_REQUEST_TIMEOUT_SECONDS`). `None` means
    /// use the coordinator's default (chat default 120s).
    pub deadline_seconds: Option<u64>,
}

impl PipelineRequest {
    pub fn new(session_id: impl Into<String>, message: impl Into<String>, mode: PipelineMode) -> Self {
        Self {
            user_id: None,
            session_id: session_id.into(),
            message: message.into(),
            mode,
            limits: PipelineLimits::default(),
            deadline_seconds: None,
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_limits(mut self, limits: PipelineLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_deadline_seconds(mut self, seconds: u64) -> Self {
        self.deadline_seconds = Some(seconds);
        self
    }
}
