//! Embedding Service (spec §4.4): token-aware chunking plus batch embedding
//! on top of [`newsagent_llm::EmbedPort`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use newsagent_core::NewsAgentError;
use newsagent_llm::EmbedPort;

/// Target chunk size and overlap, both in approximate tokens (spec §4.4).
/// The teacher workspace dropped its `tokenizers`/`candle` dependency group
/// when this crate was built (see DESIGN.md), so "tokens" here are
/// whitespace-separated words — close enough for chunk boundaries, which
/// only need to be approximately 512/100, not exact.
pub const CHUNK_SIZE_TOKENS: usize = 512;
pub const CHUNK_OVERLAP_TOKENS: usize = 100;
/// Upstream embedding batch size ceiling (spec §4.4).
pub const MAX_BATCH_SIZE: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    pub index: usize,
    pub text: String,
    pub metadata: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingResult {
    pub source_id: String,
    pub chunk_index: usize,
    pub vector: Vec<f32>,
    pub model: String,
    pub dimension: usize,
    pub metadata: Value,
}

/// Recursive word-window splitter. Steps by `CHUNK_SIZE_TOKENS -
/// CHUNK_OVERLAP_TOKENS` words per chunk so consecutive chunks share a
/// `CHUNK_OVERLAP_TOKENS`-word tail.
pub fn chunk(text: &str, metadata: Value) -> Vec<Chunk> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return Vec::new();
    }

    let stride = CHUNK_SIZE_TOKENS.saturating_sub(CHUNK_OVERLAP_TOKENS).max(1);
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut index = 0;

    while start < words.len() {
        let end = (start + CHUNK_SIZE_TOKENS).min(words.len());
        chunks.push(Chunk {
            index,
            text: words[start..end].join(" "),
            metadata: metadata.clone(),
        });
        index += 1;
        if end == words.len() {
            break;
        }
        start += stride;
    }

    chunks
}

pub struct EmbeddingService<P> {
    port: P,
    model_name: String,
}

impl<P: EmbedPort> EmbeddingService<P> {
    pub fn new(port: P, model_name: impl Into<String>) -> Self {
        Self { port, model_name: model_name.into() }
    }

    pub async fn embed_one(&self, text: &str) -> Result<Vec<f32>, NewsAgentError> {
        let mut vectors = self.embed_batch(std::slice::from_ref(&text.to_string())).await?;
        vectors.pop().ok_or_else(|| NewsAgentError::ParseFailed("embedding port returned no vector".into()))
    }

    /// Embeds `texts` in batches of at most [`MAX_BATCH_SIZE`], preserving
    /// input order across batch boundaries.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, NewsAgentError> {
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(MAX_BATCH_SIZE) {
            let vectors = self.port.embed_batch(batch).await?;
            out.extend(vectors);
        }
        Ok(out)
    }

    /// `process(text, source_id, metadata) -> [EmbeddingResult]` (spec §4.4):
    /// chunk, embed each chunk, pair vectors back up with their chunk and
    /// model info.
    pub async fn process(
        &self,
        text: &str,
        source_id: &str,
        metadata: Value,
    ) -> Result<Vec<EmbeddingResult>, NewsAgentError> {
        let chunks = chunk(text, metadata);
        if chunks.is_empty() {
            return Ok(Vec::new());
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embed_batch(&texts).await?;

        Ok(chunks
            .into_iter()
            .zip(vectors)
            .map(|(c, vector)| EmbeddingResult {
                source_id: source_id.to_string(),
                chunk_index: c.index,
                vector,
                model: self.model_name.clone(),
                dimension: self.port.dimension(),
                metadata: c.metadata,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::json;

    use super::*;

    struct StubEmbedPort;

    #[async_trait]
    impl EmbedPort for StubEmbedPort {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, NewsAgentError> {
            Ok(texts.iter().map(|t| vec![t.len() as f32]).collect())
        }

        fn dimension(&self) -> usize {
            1
        }
    }

    #[test]
    fn short_text_yields_single_chunk() {
        let chunks = chunk("one two three", json!({}));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "one two three");
    }

    #[test]
    fn long_text_yields_overlapping_chunks() {
        let text = (0..1000).map(|i| i.to_string()).collect::<Vec<_>>().join(" ");
        let chunks = chunk(&text, json!({}));
        assert!(chunks.len() > 1);
        let first_words: Vec<&str> = chunks[0].text.split_whitespace().collect();
        let second_words: Vec<&str> = chunks[1].text.split_whitespace().collect();
        let stride = CHUNK_SIZE_TOKENS - CHUNK_OVERLAP_TOKENS;
        assert_eq!(second_words[0], first_words[stride]);
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(chunk("   ", json!({})).is_empty());
    }

    #[tokio::test]
    async fn process_pairs_vectors_with_chunks_and_model_info() {
        let service = EmbeddingService::new(StubEmbedPort, "test-model");
        let results = service.process("alpha beta gamma", "article-1", json!({"k": "v"})).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].source_id, "article-1");
        assert_eq!(results[0].model, "test-model");
        assert_eq!(results[0].dimension, 1);
    }

    #[tokio::test]
    async fn embed_batch_splits_into_upstream_batch_size() {
        struct CountingPort;
        #[async_trait]
        impl EmbedPort for CountingPort {
            async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, NewsAgentError> {
                assert!(texts.len() <= MAX_BATCH_SIZE);
                Ok(texts.iter().map(|_| vec![0.0]).collect())
            }
            fn dimension(&self) -> usize {
                1
            }
        }
        let service = EmbeddingService::new(CountingPort, "m");
        let texts: Vec<String> = (0..25).map(|i| i.to_string()).collect();
        let vectors = service.embed_batch(&texts).await.unwrap();
        assert_eq!(vectors.len(), 25);
    }
}
