//! RAG-enhanced mode (spec §4.6): four vector queries over the index — by
//! title, by the leading 500 characters of body, by category keywords, by
//! article keywords — merged, deduped by article ID keeping the first-seen
//! (best-angle) score, sorted descending, truncated to the top 10.

use std::collections::{BTreeMap, HashSet};

use newsagent_core::Article;
use newsagent_vectorindex::{ScoredMatch, VectorIndex};

const TITLE_TOP_K: usize = 5;
const CONTENT_TOP_K: usize = 5;
const CATEGORY_TOP_K: usize = 3;
const KEYWORD_TOP_K: usize = 3;
const CONTENT_PREFIX_CHARS: usize = 500;
const MERGED_TOP_K: usize = 10;
const KEYWORD_QUERY_TERMS: usize = 5;

pub struct RagContext {
    pub related_news_ids: Vec<String>,
    pub similarity_scores: BTreeMap<String, f64>,
    pub context_text: Option<String>,
}

pub async fn build_rag_context(index: &dyn VectorIndex, article: &Article) -> RagContext {
    let content_query: String = article.body.as_deref().unwrap_or("").chars().take(CONTENT_PREFIX_CHARS).collect();
    let category_query = article
        .category
        .as_deref()
        .and_then(newsagent_search::category_keywords)
        .map(|kws| kws.join(" "))
        .unwrap_or_default();
    let keyword_query: String = article.keywords.iter().take(KEYWORD_QUERY_TERMS).cloned().collect::<Vec<_>>().join(" ");

    let (by_title, by_content, by_category, by_keywords) = tokio::join!(
        query_or_empty(index, &article.title, TITLE_TOP_K),
        query_or_empty(index, &content_query, CONTENT_TOP_K),
        query_or_empty(index, &category_query, CATEGORY_TOP_K),
        query_or_empty(index, &keyword_query, KEYWORD_TOP_K),
    );

    let merged = merge_search_results(vec![by_title, by_content, by_category, by_keywords]);
    let context_text = if merged.is_empty() { None } else { Some(build_context_text(&merged)) };

    RagContext {
        related_news_ids: merged.iter().map(|m| m.article_id.clone()).collect(),
        similarity_scores: merged.iter().map(|m| (m.article_id.clone(), m.score as f64)).collect(),
        context_text,
    }
}

async fn query_or_empty(index: &dyn VectorIndex, text: &str, top_k: usize) -> Vec<ScoredMatch> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    match index.query(text, top_k).await {
        Ok(matches) => matches,
        Err(e) => {
            tracing::warn!(error = %e, "rag: vector query failed, treating as no matches");
            Vec::new()
        }
    }
}

/// Dedupe by article ID keeping the first-seen score (the angle that finds
/// an article first wins over a later, possibly lower-scoring angle), sort
/// by score descending, truncate to [`MERGED_TOP_K`].
fn merge_search_results(groups: Vec<Vec<ScoredMatch>>) -> Vec<ScoredMatch> {
    let mut seen = HashSet::new();
    let mut merged = Vec::new();
    for group in groups {
        for m in group {
            if seen.insert(m.article_id.clone()) {
                merged.push(m);
            }
        }
    }
    merged.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    merged.truncate(MERGED_TOP_K);
    merged
}

fn build_context_text(matches: &[ScoredMatch]) -> String {
    let mut lines = vec!["相关新闻上下文:".to_string()];
    for (i, m) in matches.iter().enumerate() {
        let title = m.metadata.get("title").and_then(|v| v.as_str()).unwrap_or(&m.article_id);
        lines.push(format!("{}. {} (similarity: {:.2})", i + 1, title, m.score));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use newsagent_core::NewsAgentError;
    use serde_json::json;

    use super::*;

    struct StubIndex(Vec<ScoredMatch>);

    #[async_trait]
    impl VectorIndex for StubIndex {
        async fn upsert(&self, _results: Vec<newsagent_embed::EmbeddingResult>) -> Result<(), NewsAgentError> {
            Ok(())
        }
        async fn query(&self, _query_text: &str, top_k: usize) -> Result<Vec<ScoredMatch>, NewsAgentError> {
            Ok(self.0.iter().take(top_k).cloned().collect())
        }
    }

    fn article() -> Article {
        let mut a = Article::new(
            "Big Tech News".into(),
            "https://x.example/a".into(),
            "Wire".into(),
            "2026-07-20".into(),
            "scope".into(),
        );
        a.category = Some("technology".into());
        a.body = Some("A long article body about chips and AI.".into());
        a.keywords = ["ai".to_string(), "chips".to_string()].into_iter().collect();
        a
    }

    #[tokio::test]
    async fn merges_and_dedupes_across_all_four_queries() {
        let index = StubIndex(vec![
            ScoredMatch { article_id: "a1".into(), score: 0.9, metadata: json!({"title": "A1"}) },
            ScoredMatch { article_id: "a2".into(), score: 0.5, metadata: json!({"title": "A2"}) },
        ]);
        let ctx = build_rag_context(&index, &article()).await;
        assert_eq!(ctx.related_news_ids, vec!["a1".to_string(), "a2".to_string()]);
        assert!(ctx.context_text.unwrap().contains("A1"));
    }

    #[tokio::test]
    async fn no_matches_yields_no_context_text() {
        let index = StubIndex(vec![]);
        let ctx = build_rag_context(&index, &article()).await;
        assert!(ctx.related_news_ids.is_empty());
        assert!(ctx.context_text.is_none());
    }
}
