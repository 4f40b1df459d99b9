//! Vector Index (spec §4.5): upsert vectors with metadata, query top-K by
//! cosine similarity. Content-addressed by `(article_id, chunk_index)` —
//! re-upserting a chunk overwrites its prior vector rather than duplicating.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use newsagent_core::NewsAgentError;
use newsagent_embed::EmbeddingResult;
use newsagent_llm::EmbedPort;

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredMatch {
    pub article_id: String,
    pub score: f32,
    pub metadata: Value,
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn upsert(&self, results: Vec<EmbeddingResult>) -> Result<(), NewsAgentError>;
    /// Embeds `query_text` and returns the top `top_k` articles by cosine
    /// similarity, one entry per article (the best-scoring chunk wins).
    async fn query(&self, query_text: &str, top_k: usize) -> Result<Vec<ScoredMatch>, NewsAgentError>;
}

pub struct InMemoryVectorIndex<E> {
    embedder: E,
    entries: RwLock<HashMap<(String, usize), EmbeddingResult>>,
}

impl<E: EmbedPort> InMemoryVectorIndex<E> {
    pub fn new(embedder: E) -> Self {
        Self { embedder, entries: RwLock::new(HashMap::new()) }
    }
}

#[async_trait]
impl<E: EmbedPort> VectorIndex for InMemoryVectorIndex<E> {
    async fn upsert(&self, results: Vec<EmbeddingResult>) -> Result<(), NewsAgentError> {
        let mut entries = self.entries.write().await;
        for result in results {
            entries.insert((result.source_id.clone(), result.chunk_index), result);
        }
        Ok(())
    }

    async fn query(&self, query_text: &str, top_k: usize) -> Result<Vec<ScoredMatch>, NewsAgentError> {
        let query_vector = self
            .embedder
            .embed_batch(&[query_text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| NewsAgentError::ParseFailed("embedding port returned no vector".into()))?;

        let entries = self.entries.read().await;
        let mut best_per_article: HashMap<&str, ScoredMatch> = HashMap::new();

        for entry in entries.values() {
            let score = cosine_similarity(&query_vector, &entry.vector);
            best_per_article
                .entry(entry.source_id.as_str())
                .and_modify(|existing| {
                    if score > existing.score {
                        *existing = ScoredMatch {
                            article_id: entry.source_id.clone(),
                            score,
                            metadata: entry.metadata.clone(),
                        };
                    }
                })
                .or_insert(ScoredMatch {
                    article_id: entry.source_id.clone(),
                    score,
                    metadata: entry.metadata.clone(),
                });
        }

        let mut matches: Vec<ScoredMatch> = best_per_article.into_values().collect();
        matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        matches.truncate(top_k);
        Ok(matches)
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
