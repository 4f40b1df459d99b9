use thiserror::Error;

/// The closed set of error kinds produced anywhere in the pipeline (spec §7).
///
/// Stage-local failures are caught and folded into a stage result with
/// `success=false` rather than propagated as a hard `Err` wherever the
/// calling component can still produce a degraded-but-coherent answer —
/// see each crate's `*Result` struct for how that contract is honoured.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum NewsAgentError {
    #[error("required configuration missing: {0}")]
    ConfigMissing(String),

    #[error("upstream service unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("could not interpret external response: {0}")]
    ParseFailed(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("record stale or expired: {0}")]
    StaleOrExpired(String),

    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("deadline exceeded: {0}")]
    Timeout(String),

    #[error("dependency unreachable: {0}")]
    DependencyDown(String),
}

pub type Result<T> = std::result::Result<T, NewsAgentError>;
