use serde::{Deserialize, Serialize};

pub const MAX_SEARCH_COUNT: u32 = 50;

/// Upstream search result shape after normalization (spec §4.1). Records
/// lacking title or url never reach this type — the adapter drops them
/// before construction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawArticle {
    pub title: String,
    pub url: String,
    pub source: String,
    pub snippet: String,
    /// Unnormalized date exactly as the upstream provider returned it.
    pub date: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TimeWindow {
    OneDay,
    OneWeek,
    OneMonth,
    OneYear,
}

impl TimeWindow {
    /// Upstream single-letter code (spec §4.1).
    pub fn upstream_code(&self) -> &'static str {
        match self {
            Self::OneDay => "d",
            Self::OneWeek => "w",
            Self::OneMonth => "m",
            Self::OneYear => "y",
        }
    }

    /// `window → expire-days` table used by `search_precise` (spec §4.9).
    pub fn expire_days(&self) -> i64 {
        match self {
            Self::OneDay => 1,
            Self::OneWeek => 7,
            Self::OneMonth => 30,
            Self::OneYear => 365,
        }
    }

    /// Parse `{1d, 1w, 1m, 1y}`, defaulting unknown input to `1w` (spec §4.9,
    /// §8 "Boundary behaviours").
    pub fn parse_or_default(raw: &str) -> Self {
        match raw.trim() {
            "1d" => Self::OneDay,
            "1m" => Self::OneMonth,
            "1y" => Self::OneYear,
            _ => Self::OneWeek,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneDay => "1d",
            Self::OneWeek => "1w",
            Self::OneMonth => "1m",
            Self::OneYear => "1y",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchRequest {
    pub scope: String,
    pub keywords: Vec<String>,
    pub count: u32,
    pub language: String,
    pub country: String,
    pub time_window: TimeWindow,
    pub expire_days: i64,
}

impl SearchRequest {
    pub fn new(
        scope: String,
        keywords: Vec<String>,
        count: u32,
        language: String,
        country: String,
        time_window: TimeWindow,
        expire_days: i64,
    ) -> Self {
        Self {
            scope,
            keywords,
            count: count.min(MAX_SEARCH_COUNT),
            language,
            country,
            time_window,
            expire_days,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum IngestStatus {
    Ok,
    ConfigMissing,
    UpstreamUnavailable,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IngestResult {
    pub found: u32,
    pub saved: u32,
    pub updated: u32,
    pub saved_ids: Vec<String>,
    pub updated_ids: Vec<String>,
    pub elapsed_ms: u64,
    pub status: IngestStatus,
}

impl IngestResult {
    pub fn empty(status: IngestStatus) -> Self {
        Self {
            found: 0,
            saved: 0,
            updated: 0,
            saved_ids: Vec::new(),
            updated_ids: Vec::new(),
            elapsed_ms: 0,
            status,
        }
    }
}
