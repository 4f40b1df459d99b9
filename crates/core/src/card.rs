use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ImportanceLevel {
    Critical,
    High,
    Medium,
    Low,
    Minimal,
}

impl ImportanceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::Minimal => "minimal",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
    Mixed,
}

impl SentimentLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Neutral => "neutral",
            Self::Mixed => "mixed",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SentimentConfidence {
    Low,
    Medium,
    High,
}

impl SentimentConfidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CredibilityLevel {
    Verified,
    Reliable,
    Moderate,
    Questionable,
    Unverified,
}

impl CredibilityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Verified => "verified",
            Self::Reliable => "reliable",
            Self::Moderate => "moderate",
            Self::Questionable => "questionable",
            Self::Unverified => "unverified",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DifficultyLevel {
    Easy,
    Medium,
    Hard,
}

impl DifficultyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Person,
    Organization,
    Location,
    Other,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Person => "person",
            Self::Organization => "organization",
            Self::Location => "location",
            Self::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Theme {
    pub primary: String,
    pub secondaries: Vec<String>,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Sentiment {
    pub label: SentimentLabel,
    /// Clamped to `[-1, 1]`.
    pub score: f64,
    pub confidence: SentimentConfidence,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Importance {
    /// Clamped to `[0, 10]`.
    pub score: f64,
    pub level: ImportanceLevel,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Credibility {
    /// Clamped to `[0, 10]`.
    pub score: f64,
    pub level: CredibilityLevel,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Entity {
    pub name: String,
    pub entity_type: EntityType,
    pub mention_count: u32,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Timeliness {
    pub urgency: String,
    pub freshness: String,
    pub time_sensitive: bool,
}

/// Trend-analysis result (spec.md §4.6 names it; treated as RAG metadata,
/// not a top-level card field — see SPEC_FULL.md §2).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrendAnalysis {
    pub direction: String,
    pub summary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct RagMetadata {
    pub related_news_ids: Vec<String>,
    pub similarity_scores: BTreeMap<String, f64>,
    pub rag_context: Option<String>,
    pub trend_analysis: Option<TrendAnalysis>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct GenerationMetadata {
    pub generated_at: String,
    pub generation_ms: u64,
    pub rag_enhanced: bool,
    /// One entry per sub-analysis that fell back to its default, per
    /// spec §4.6 "Failure semantics".
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Card {
    pub id: String,
    pub article_id: String,
    pub summary: String,
    pub enhanced_summary: String,
    pub key_points: Vec<String>,
    pub keywords: Vec<String>,
    pub hashtags: Vec<String>,
    pub theme: Theme,
    pub sentiment: Sentiment,
    pub importance: Importance,
    pub credibility: Credibility,
    pub entities: Vec<Entity>,
    pub timeliness: Timeliness,
    pub audience: String,
    pub reading_time_minutes: u32,
    pub difficulty: DifficultyLevel,
    pub related_article_ids: Vec<String>,
    pub similarity_scores: BTreeMap<String, f64>,
    pub rag: Option<RagMetadata>,
    pub generation_metadata: GenerationMetadata,
}

/// `card_<article_id>_<unix_seconds>` (spec §4.6 "Determinism").
pub fn card_id(article_id: &str, unix_seconds: i64) -> String {
    format!("card_{article_id}_{unix_seconds}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn card_id_is_deterministic_in_article_and_time() {
        assert_eq!(card_id("abc123", 1_000), card_id("abc123", 1_000));
        assert_ne!(card_id("abc123", 1_000), card_id("abc123", 1_001));
    }

    #[test]
    fn enum_as_str_round_trips_through_serde_rename() {
        let json = serde_json::to_string(&ImportanceLevel::Critical).unwrap();
        assert_eq!(json, "\"critical\"");
        assert_eq!(ImportanceLevel::Critical.as_str(), "critical");
    }
}
