//! The seven (plus RAG-mode trend) card sub-analyses (spec §4.6). Each
//! issues one focused language-model prompt, extracts the first JSON object
//! from the reply, and falls back to a deterministic low-confidence default
//! on any parse or call failure — generation never fails outright because
//! one sub-analysis did.

use serde_json::Value;

use newsagent_core::card::{
    Credibility, CredibilityLevel, Entity, Importance, ImportanceLevel, Sentiment, SentimentConfidence,
    SentimentLabel, Theme, Timeliness, TrendAnalysis,
};
use newsagent_core::enum_map;
use newsagent_core::Article;
use newsagent_llm::{extract_json_output, ChatMessage, ChatOptions, ChatPort};

use crate::lists::{normalize_entity_pairs, normalize_string_list};

pub struct SummaryBundle {
    pub summary: String,
    pub enhanced_summary: String,
    pub key_points: Vec<String>,
    pub keywords: Vec<String>,
    pub hashtags: Vec<String>,
    pub audience: String,
    pub reading_time_minutes: u32,
    pub difficulty: newsagent_core::card::DifficultyLevel,
}

async fn call_for_value<C: ChatPort>(chat: &C, system: &str, user: &str) -> Option<Value> {
    let messages = vec![ChatMessage::system(system), ChatMessage::user(user)];
    let completion = chat.chat(&messages, &ChatOptions::default()).await.ok()?;
    extract_json_output::<Value>(&completion.content)
}

fn build_user_prompt(article: &Article, rag_context: Option<&str>) -> String {
    let body_excerpt: String = article.body.as_deref().unwrap_or("").chars().take(2000).collect();
    let mut prompt = format!("Title: {}\nSource: {}\nDate: {}\n\n{body_excerpt}", article.title, article.source, article.date);
    if let Some(ctx) = rag_context {
        prompt.push_str("\n\n");
        prompt.push_str(ctx);
    }
    prompt
}

fn default_summary_text(article: &Article) -> String {
    let excerpt: String = article.body.as_deref().unwrap_or(&article.title).chars().take(200).collect();
    excerpt
}

fn estimate_reading_time(article: &Article) -> u32 {
    let words = article.body.as_deref().unwrap_or("").split_whitespace().count();
    ((words as f64 / 200.0).ceil() as u32).max(1)
}

pub async fn summary<C: ChatPort>(chat: &C, article: &Article, rag_context: Option<&str>) -> (SummaryBundle, Option<String>) {
    let system = "You are a news analysis engine. Reply with exactly one JSON object with keys: \
        summary, enhanced_summary, key_points, keywords, hashtags, audience, reading_time_minutes, difficulty. \
        `difficulty` must be one of easy, medium, hard. No prose outside the JSON.";
    let user = build_user_prompt(article, rag_context);

    match call_for_value(chat, system, &user).await {
        Some(value) => {
            let difficulty = enum_map::normalize_difficulty_level(value.get("difficulty").and_then(|v| v.as_str()).unwrap_or(""));
            let keywords = {
                let parsed = normalize_string_list(value.get("keywords"));
                if parsed.is_empty() { article.keywords.iter().cloned().collect() } else { parsed }
            };
            let bundle = SummaryBundle {
                summary: value.get("summary").and_then(|v| v.as_str()).map(str::to_string).unwrap_or_else(|| default_summary_text(article)),
                enhanced_summary: value
                    .get("enhanced_summary")
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
                    .unwrap_or_else(|| default_summary_text(article)),
                key_points: normalize_string_list(value.get("key_points")),
                keywords,
                hashtags: normalize_string_list(value.get("hashtags")),
                audience: value.get("audience").and_then(|v| v.as_str()).unwrap_or("general").to_string(),
                reading_time_minutes: value
                    .get("reading_time_minutes")
                    .and_then(|v| v.as_u64())
                    .map(|n| n as u32)
                    .unwrap_or_else(|| estimate_reading_time(article)),
                difficulty: difficulty.value,
            };
            let warning = difficulty.fell_back.then(|| "summary: difficulty label unrecognized, defaulted to medium".to_string());
            (bundle, warning)
        }
        None => {
            let bundle = SummaryBundle {
                summary: default_summary_text(article),
                enhanced_summary: default_summary_text(article),
                key_points: Vec::new(),
                keywords: article.keywords.iter().cloned().collect(),
                hashtags: Vec::new(),
                audience: "general".to_string(),
                reading_time_minutes: estimate_reading_time(article),
                difficulty: newsagent_core::card::DifficultyLevel::Medium,
            };
            (bundle, Some("summary: language model call failed or returned unparseable output, used defaults".to_string()))
        }
    }
}

pub async fn sentiment<C: ChatPort>(chat: &C, article: &Article) -> (Sentiment, Option<String>) {
    let system = "You are a news analysis engine. Reply with exactly one JSON object with keys: \
        sentiment_label (positive, negative, neutral, or mixed), sentiment_score (-1 to 1), \
        sentiment_confidence (low, medium, or high). No prose outside the JSON.";
    match call_for_value(chat, system, &build_user_prompt(article, None)).await {
        Some(value) => {
            let label = enum_map::normalize_sentiment_label(value.get("sentiment_label").and_then(|v| v.as_str()).unwrap_or(""));
            let confidence =
                enum_map::normalize_sentiment_confidence(value.get("sentiment_confidence").and_then(|v| v.as_str()).unwrap_or(""));
            let score = enum_map::clamp_score(value.get("sentiment_score").and_then(|v| v.as_f64()).unwrap_or(0.0), -1.0, 1.0);
            let warning = (label.fell_back || confidence.fell_back)
                .then(|| "sentiment: label or confidence unrecognized, defaulted".to_string());
            (Sentiment { label: label.value, score, confidence: confidence.value }, warning)
        }
        None => (
            Sentiment { label: SentimentLabel::Neutral, score: 0.0, confidence: SentimentConfidence::Low },
            Some("sentiment: language model call failed or returned unparseable output, used defaults".to_string()),
        ),
    }
}

pub async fn themes<C: ChatPort>(chat: &C, article: &Article) -> (Theme, Option<String>) {
    let system = "You are a news analysis engine. Reply with exactly one JSON object with keys: \
        primary_theme, secondary_themes (array), theme_confidence (0 to 1). No prose outside the JSON.";
    match call_for_value(chat, system, &build_user_prompt(article, None)).await {
        Some(value) => {
            let primary = value.get("primary_theme").and_then(|v| v.as_str()).unwrap_or("general").to_string();
            let secondaries = normalize_string_list(value.get("secondary_themes"));
            let confidence = enum_map::clamp_score(value.get("theme_confidence").and_then(|v| v.as_f64()).unwrap_or(0.5), 0.0, 1.0);
            (Theme { primary, secondaries, confidence }, None)
        }
        None => (
            Theme { primary: "general".to_string(), secondaries: Vec::new(), confidence: 0.3 },
            Some("themes: language model call failed or returned unparseable output, used defaults".to_string()),
        ),
    }
}

pub async fn importance<C: ChatPort>(chat: &C, article: &Article) -> (Importance, Option<String>) {
    let system = "You are a news analysis engine. Reply with exactly one JSON object with keys: \
        importance_score (0 to 10), importance_level (critical, high, medium, low, or minimal). No prose outside the JSON.";
    match call_for_value(chat, system, &build_user_prompt(article, None)).await {
        Some(value) => {
            let level = enum_map::normalize_importance_level(value.get("importance_level").and_then(|v| v.as_str()).unwrap_or(""));
            let score = enum_map::clamp_score(value.get("importance_score").and_then(|v| v.as_f64()).unwrap_or(5.0), 0.0, 10.0);
            let warning = level.fell_back.then(|| "importance: level unrecognized, defaulted to medium".to_string());
            (Importance { score, level: level.value }, warning)
        }
        None => (
            Importance { score: 5.0, level: ImportanceLevel::Medium },
            Some("importance: language model call failed or returned unparseable output, used defaults".to_string()),
        ),
    }
}

pub async fn credibility<C: ChatPort>(chat: &C, article: &Article) -> (Credibility, Option<String>) {
    let system = "You are a news analysis engine. Reply with exactly one JSON object with keys: \
        credibility_score (0 to 10), credibility_level (verified, reliable, moderate, questionable, or unverified). \
        No prose outside the JSON.";
    match call_for_value(chat, system, &build_user_prompt(article, None)).await {
        Some(value) => {
            let level = enum_map::normalize_credibility_level(value.get("credibility_level").and_then(|v| v.as_str()).unwrap_or(""));
            let score = enum_map::clamp_score(value.get("credibility_score").and_then(|v| v.as_f64()).unwrap_or(5.0), 0.0, 10.0);
            let warning = level.fell_back.then(|| "credibility: level unrecognized, defaulted to moderate".to_string());
            (Credibility { score, level: level.value }, warning)
        }
        None => (
            Credibility { score: 5.0, level: CredibilityLevel::Moderate },
            Some("credibility: language model call failed or returned unparseable output, used defaults".to_string()),
        ),
    }
}

pub async fn entities<C: ChatPort>(chat: &C, article: &Article) -> (Vec<Entity>, Option<String>) {
    let system = "You are a news analysis engine. Reply with exactly one JSON object with a key `entities` \
        holding a list of {name, entity_type (person, organization, location, or other)} records. No prose outside the JSON.";
    match call_for_value(chat, system, &build_user_prompt(article, None)).await {
        Some(value) => {
            let source = value.get("entities").unwrap_or(&value);
            let mut fell_back_any = false;
            let entities = normalize_entity_pairs(Some(source))
                .into_iter()
                .map(|(name, raw_type)| {
                    let mapped = enum_map::normalize_entity_type(&raw_type);
                    fell_back_any |= mapped.fell_back;
                    Entity { name, entity_type: mapped.value, mention_count: 1, confidence: 0.6 }
                })
                .collect();
            let warning = fell_back_any.then(|| "entities: one or more entity types unrecognized, defaulted to other".to_string());
            (entities, warning)
        }
        None => (Vec::new(), Some("entities: language model call failed or returned unparseable output, used defaults".to_string())),
    }
}

pub async fn timeliness<C: ChatPort>(chat: &C, article: &Article) -> (Timeliness, Option<String>) {
    let system = "You are a news analysis engine. Reply with exactly one JSON object with keys: \
        urgency, freshness, time_sensitive (boolean). No prose outside the JSON.";
    match call_for_value(chat, system, &build_user_prompt(article, None)).await {
        Some(value) => {
            let urgency = value.get("urgency").and_then(|v| v.as_str()).unwrap_or("normal").to_string();
            let freshness = value.get("freshness").and_then(|v| v.as_str()).unwrap_or("recent").to_string();
            let time_sensitive = value.get("time_sensitive").and_then(|v| v.as_bool()).unwrap_or(false);
            (Timeliness { urgency, freshness, time_sensitive }, None)
        }
        None => (
            Timeliness { urgency: "normal".to_string(), freshness: "recent".to_string(), time_sensitive: false },
            Some("timeliness: language model call failed or returned unparseable output, used defaults".to_string()),
        ),
    }
}

pub async fn trend<C: ChatPort>(chat: &C, article: &Article, rag_context: Option<&str>) -> (TrendAnalysis, Option<String>) {
    let system = "You are a news trend-analysis engine. Given an article and related-news context, reply with \
        exactly one JSON object with keys: direction, summary. No prose outside the JSON.";
    match call_for_value(chat, system, &build_user_prompt(article, rag_context)).await {
        Some(value) => {
            let direction = value.get("direction").and_then(|v| v.as_str()).unwrap_or("stable").to_string();
            let summary = value.get("summary").and_then(|v| v.as_str()).unwrap_or("No discernible trend.").to_string();
            (TrendAnalysis { direction, summary }, None)
        }
        None => (
            TrendAnalysis { direction: "stable".to_string(), summary: "No discernible trend.".to_string() },
            Some("trend: language model call failed or returned unparseable output, used defaults".to_string()),
        ),
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use newsagent_core::NewsAgentError;
    use newsagent_llm::ChatCompletion;

    use super::*;

    struct StubChat(&'static str);

    #[async_trait]
    impl ChatPort for StubChat {
        async fn chat(&self, _messages: &[ChatMessage], _options: &ChatOptions) -> Result<ChatCompletion, NewsAgentError> {
            Ok(ChatCompletion { content: self.0.to_string(), tokens_used: 5 })
        }
    }

    struct FailingChat;

    #[async_trait]
    impl ChatPort for FailingChat {
        async fn chat(&self, _messages: &[ChatMessage], _options: &ChatOptions) -> Result<ChatCompletion, NewsAgentError> {
            Err(NewsAgentError::UpstreamUnavailable("down".into()))
        }
    }

    fn article() -> Article {
        Article::new("Title".into(), "https://x.example/a".into(), "Wire".into(), "2026-07-20".into(), "scope".into())
    }

    #[tokio::test]
    async fn importance_maps_chinese_critical_synonym() {
        let chat = StubChat(r#"{"importance_score": 9.5, "importance_level": "极高"}"#);
        let (importance, warning) = importance(&chat, &article()).await;
        assert_eq!(importance.level, ImportanceLevel::Critical);
        assert!(warning.is_none());
    }

    #[tokio::test]
    async fn sentiment_maps_chinese_positive_synonym() {
        let chat = StubChat(r#"{"sentiment_label": "积极", "sentiment_score": 0.8, "sentiment_confidence": "high"}"#);
        let (sentiment, _) = sentiment(&chat, &article()).await;
        assert_eq!(sentiment.label, SentimentLabel::Positive);
    }

    #[tokio::test]
    async fn failing_chat_yields_default_with_warning() {
        let (importance, warning) = importance(&FailingChat, &article()).await;
        assert_eq!(importance.level, ImportanceLevel::Medium);
        assert!(warning.is_some());
    }

    #[tokio::test]
    async fn entities_map_form_is_parsed_and_typed() {
        let chat = StubChat(r#"{"entities": {"OpenAI": "organization", "Paris": "location"}}"#);
        let (entities, warning) = entities(&chat, &article()).await;
        assert_eq!(entities.len(), 2);
        assert!(warning.is_none());
        assert!(entities.iter().any(|e| e.name == "OpenAI" && e.entity_type == newsagent_core::card::EntityType::Organization));
    }

    #[tokio::test]
    async fn summary_keywords_fall_back_to_article_keywords_when_model_omits_them() {
        let mut a = article();
        a.keywords = ["ai".to_string()].into_iter().collect();
        let chat = StubChat(r#"{"summary": "s", "enhanced_summary": "e"}"#);
        let (bundle, _) = summary(&chat, &a, None).await;
        assert_eq!(bundle.keywords, vec!["ai".to_string()]);
    }

    #[tokio::test]
    async fn prose_wrapped_json_is_still_parsed() {
        let chat = StubChat("Sure, here you go:\n```json\n{\"urgency\": \"high\", \"freshness\": \"breaking\", \"time_sensitive\": true}\n```");
        let (timeliness, warning) = timeliness(&chat, &article()).await;
        assert_eq!(timeliness.urgency, "high");
        assert!(timeliness.time_sensitive);
        assert!(warning.is_none());
    }
}
