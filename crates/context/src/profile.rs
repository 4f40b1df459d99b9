//! User Memory Profile (spec §3, §4.10): a bounded, typed, embedding-bearing
//! collection of memory items per user, retrieved by similarity-weighted
//! search. Memory items are owned by the profile; the profile is persisted
//! under the `user_preferences` collection, keyed by user ID (spec §6:
//! "`user_preferences` documents hold category-weighted tag frequencies" —
//! generalized here to the full response-style + category + memory profile,
//! see DESIGN.md).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use newsagent_core::NewsAgentError;
use newsagent_llm::EmbedPort;
use newsagent_store::collections::USER_PREFERENCES;
use newsagent_store::{DocumentStore, Filter};
use newsagent_vectorindex::cosine_similarity;

use crate::conversation::{ConversationContext, ConversationContextStore};

/// Hard cap on active memories per user (spec §3: "bounded by a retention
/// policy"). The source leaves the exact ceiling unspecified; fixed here in
/// the spirit of the teacher's fixed tier ceilings (`KV_TIER_LIMIT`).
pub const MAX_MEMORIES: usize = 500;
/// A memory with no explicit `expires_at` still lapses after this many days
/// (time-based expiry half of the retention policy).
pub const RETENTION_DAYS: i64 = 180;
/// Matches below this cosine similarity are dropped from retrieval results
/// (spec §4.10).
pub const SIMILARITY_FLOOR: f64 = 0.3;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MemoryType {
    Preference,
    Interaction,
    Fact,
    Context,
    Knowledge,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryItem {
    pub id: String,
    pub memory_type: MemoryType,
    pub body: String,
    /// Clamped to `[0, 1]`.
    pub importance: f64,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub embedding: Vec<f32>,
}

impl MemoryItem {
    pub fn new(memory_type: MemoryType, body: String, importance: f64, embedding: Vec<f32>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            memory_type,
            body,
            importance: importance.clamp(0.0, 1.0),
            created_at: Utc::now(),
            expires_at: None,
            embedding,
        }
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    fn is_active(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expiry) => expiry > now,
            None => now - self.created_at < chrono::Duration::days(RETENTION_DAYS),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    Concise,
    Detailed,
    Bulleted,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisDepth {
    Shallow,
    Standard,
    Deep,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResponseStyle {
    pub communication_style: String,
    pub response_format: ResponseFormat,
    pub analysis_depth: AnalysisDepth,
}

impl Default for ResponseStyle {
    fn default() -> Self {
        Self {
            communication_style: "neutral".to_string(),
            response_format: ResponseFormat::Concise,
            analysis_depth: AnalysisDepth::Standard,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct UserMemoryProfile {
    pub user_id: String,
    pub memories: Vec<MemoryItem>,
    pub preferred_categories: Vec<String>,
    pub disliked_categories: Vec<String>,
    pub style: ResponseStyle,
    /// Invariant: always equals `|memories|` after [`enforce_retention`] runs.
    pub total_memories: usize,
}

/// A fused bundle of retrieval results handed to prompt-construction code
/// (spec §4.10 `get_relevant_context`).
#[derive(Debug, Clone)]
pub struct ContextBundle {
    pub memories: Vec<(MemoryItem, f64)>,
    pub conversation: Option<ConversationContext>,
    pub preferred_categories: Vec<String>,
    pub disliked_categories: Vec<String>,
}

/// Optional filters applied before scoring in [`ContextManager::query_memories`].
#[derive(Debug, Clone, Default)]
pub struct MemoryQuery {
    pub type_filter: Option<MemoryType>,
    pub min_importance: Option<f64>,
    /// Only memories created within the last `date_window_days` days.
    pub date_window_days: Option<i64>,
}

pub struct ContextManager<E> {
    store: Arc<dyn DocumentStore>,
    embedder: E,
    conversations: ConversationContextStore,
}

impl<E: EmbedPort> ContextManager<E> {
    pub fn new(store: Arc<dyn DocumentStore>, embedder: E) -> Self {
        let conversations = ConversationContextStore::new(store.clone());
        Self { store, embedder, conversations }
    }

    pub async fn profile(&self, user: &str) -> Result<UserMemoryProfile, NewsAgentError> {
        let doc = self.store.find_one(USER_PREFERENCES, &Filter::new().eq("_id", user)).await?;
        Ok(doc
            .and_then(|d| serde_json::from_value(d).ok())
            .unwrap_or_else(|| UserMemoryProfile { user_id: user.to_string(), ..Default::default() }))
    }

    /// Appends `item`, then enforces the retention policy (spec §3:
    /// `total_memories = |active memories|`).
    pub async fn add_memory(&self, user: &str, item: MemoryItem) -> Result<UserMemoryProfile, NewsAgentError> {
        let mut profile = self.profile(user).await?;
        profile.user_id = user.to_string();
        profile.memories.push(item);
        enforce_retention(&mut profile);
        self.write_profile(&profile).await?;
        Ok(profile)
    }

    pub async fn set_categories(
        &self,
        user: &str,
        preferred: Vec<String>,
        disliked: Vec<String>,
    ) -> Result<UserMemoryProfile, NewsAgentError> {
        let mut profile = self.profile(user).await?;
        profile.user_id = user.to_string();
        profile.preferred_categories = preferred;
        profile.disliked_categories = disliked;
        self.write_profile(&profile).await?;
        Ok(profile)
    }

    /// `query_memories(user, query, k, type_filter, min_importance,
    /// date_window) -> [memory, score]` (spec §4.10). Filters apply before
    /// scoring; matches below [`SIMILARITY_FLOOR`] are dropped.
    pub async fn query_memories(
        &self,
        user: &str,
        query: &str,
        k: usize,
        filter: &MemoryQuery,
    ) -> Result<Vec<(MemoryItem, f64)>, NewsAgentError> {
        let profile = self.profile(user).await?;
        let now = Utc::now();

        let candidates: Vec<&MemoryItem> = profile
            .memories
            .iter()
            .filter(|m| m.is_active(now))
            .filter(|m| filter.type_filter.is_none_or(|t| m.memory_type == t))
            .filter(|m| filter.min_importance.is_none_or(|min| m.importance >= min))
            .filter(|m| {
                filter
                    .date_window_days
                    .is_none_or(|days| now - m.created_at <= chrono::Duration::days(days))
            })
            .collect();

        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let query_vector = self.embedder.embed_batch(&[query.to_string()]).await?;
        let Some(query_vector) = query_vector.into_iter().next() else {
            return Ok(Vec::new());
        };

        let mut scored: Vec<(MemoryItem, f64)> = candidates
            .into_iter()
            .map(|m| (m.clone(), cosine_similarity(&query_vector, &m.embedding) as f64))
            .filter(|(_, score)| *score >= SIMILARITY_FLOOR)
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }

    /// Fuses memories, session conversation context, and category
    /// preferences into one bundle (spec §4.10 `get_relevant_context`).
    pub async fn get_relevant_context(
        &self,
        user: &str,
        query: &str,
        session: &str,
    ) -> Result<ContextBundle, NewsAgentError> {
        let profile = self.profile(user).await?;
        let memories = self.query_memories(user, query, 5, &MemoryQuery::default()).await?;
        let conversation = self.conversations.get(session).await?;

        Ok(ContextBundle {
            memories,
            conversation,
            preferred_categories: profile.preferred_categories,
            disliked_categories: profile.disliked_categories,
        })
    }

    pub fn conversations(&self) -> &ConversationContextStore {
        &self.conversations
    }

    async fn write_profile(&self, profile: &UserMemoryProfile) -> Result<(), NewsAgentError> {
        let mut doc = serde_json::to_value(profile).unwrap_or_else(|_| json!({}));
        doc["_id"] = json!(profile.user_id);
        let filter = Filter::new().eq("_id", profile.user_id.clone());
        if !self.store.update_one(USER_PREFERENCES, &filter, doc.clone()).await? {
            self.store.insert_one(USER_PREFERENCES, doc).await?;
        }
        Ok(())
    }
}

/// Drop inactive memories, truncate to [`MAX_MEMORIES`] keeping the most
/// recent, and recompute `total_memories` (spec §3 invariant).
fn enforce_retention(profile: &mut UserMemoryProfile) {
    let now = Utc::now();
    profile.memories.retain(|m| m.is_active(now));
    if profile.memories.len() > MAX_MEMORIES {
        let overflow = profile.memories.len() - MAX_MEMORIES;
        profile.memories.drain(0..overflow);
    }
    profile.total_memories = profile.memories.len();
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use newsagent_store::InMemoryDocumentStore;

    struct StubEmbed;

    #[async_trait]
    impl EmbedPort for StubEmbed {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, NewsAgentError> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }
        fn dimension(&self) -> usize {
            2
        }
    }

    fn manager() -> ContextManager<StubEmbed> {
        ContextManager::new(Arc::new(InMemoryDocumentStore::new()), StubEmbed)
    }

    #[tokio::test]
    async fn add_memory_updates_total_count() {
        let ctx = manager();
        let item = MemoryItem::new(MemoryType::Preference, "likes ai news".into(), 0.8, vec![1.0, 0.0]);
        let profile = ctx.add_memory("u1", item).await.unwrap();
        assert_eq!(profile.total_memories, 1);
        assert_eq!(profile.memories.len(), 1);
    }

    #[tokio::test]
    async fn total_memories_always_equals_active_memory_count() {
        let ctx = manager();
        for i in 0..3 {
            let item = MemoryItem::new(MemoryType::Fact, format!("fact {i}"), 0.5, vec![1.0, 0.0]);
            ctx.add_memory("u1", item).await.unwrap();
        }
        let profile = ctx.profile("u1").await.unwrap();
        assert_eq!(profile.total_memories, profile.memories.len());
        assert_eq!(profile.total_memories, 3);
    }

    #[tokio::test]
    async fn expired_memory_is_dropped_on_next_add() {
        let ctx = manager();
        let expired = MemoryItem::new(MemoryType::Context, "old".into(), 0.5, vec![1.0, 0.0])
            .with_expiry(Utc::now() - chrono::Duration::days(1));
        ctx.add_memory("u1", expired).await.unwrap();
        let fresh = MemoryItem::new(MemoryType::Context, "new".into(), 0.5, vec![1.0, 0.0]);
        let profile = ctx.add_memory("u1", fresh).await.unwrap();
        assert_eq!(profile.total_memories, 1);
        assert_eq!(profile.memories[0].body, "new");
    }

    #[tokio::test]
    async fn query_memories_filters_low_similarity_matches() {
        let ctx = manager();
        let aligned = MemoryItem::new(MemoryType::Fact, "aligned".into(), 0.9, vec![1.0, 0.0]);
        let orthogonal = MemoryItem::new(MemoryType::Fact, "orthogonal".into(), 0.9, vec![0.0, 1.0]);
        ctx.add_memory("u1", aligned).await.unwrap();
        ctx.add_memory("u1", orthogonal).await.unwrap();

        let results = ctx.query_memories("u1", "query", 5, &MemoryQuery::default()).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0.body, "aligned");
    }

    #[tokio::test]
    async fn query_memories_applies_type_and_importance_filters() {
        let ctx = manager();
        ctx.add_memory("u1", MemoryItem::new(MemoryType::Preference, "pref".into(), 0.9, vec![1.0, 0.0])).await.unwrap();
        ctx.add_memory("u1", MemoryItem::new(MemoryType::Fact, "fact".into(), 0.2, vec![1.0, 0.0])).await.unwrap();

        let filter = MemoryQuery { type_filter: Some(MemoryType::Preference), ..Default::default() };
        let results = ctx.query_memories("u1", "query", 5, &filter).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0.memory_type, MemoryType::Preference);

        let filter = MemoryQuery { min_importance: Some(0.5), ..Default::default() };
        let results = ctx.query_memories("u1", "query", 5, &filter).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0.body, "pref");
    }

    #[tokio::test]
    async fn get_relevant_context_fuses_memories_and_categories() {
        let ctx = manager();
        ctx.add_memory("u1", MemoryItem::new(MemoryType::Preference, "likes chips".into(), 0.9, vec![1.0, 0.0])).await.unwrap();
        ctx.set_categories("u1", vec!["technology".into()], vec![]).await.unwrap();

        let bundle = ctx.get_relevant_context("u1", "query", "s1").await.unwrap();
        assert_eq!(bundle.memories.len(), 1);
        assert_eq!(bundle.preferred_categories, vec!["technology".to_string()]);
        assert!(bundle.conversation.is_none());
    }
}
