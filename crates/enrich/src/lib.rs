//! C6 Enrichment/Card Engine (spec §4.6): turns one ingested article into a
//! [`Card`] by running a handful of focused language-model analyses
//! concurrently, optionally grounding them in vector-index context (RAG
//! mode), and normalizing every free-form label through
//! `newsagent_core::enum_map`.
//!
//! Holds a port handle (`Arc<dyn VectorIndex>`), not the coordinator that
//! populated it — the engine never triggers ingestion or embedding itself.

pub mod analyses;
pub mod lists;
pub mod rag;

use std::sync::Arc;
use std::time::Instant;

use newsagent_core::card::{card_id, Card, GenerationMetadata, RagMetadata};
use newsagent_core::Article;
use newsagent_llm::ChatPort;
use newsagent_vectorindex::VectorIndex;

/// Per-call knobs for [`CardEngine::generate_card`].
#[derive(Debug, Clone)]
pub struct CardOptions {
    /// Ground the card in related-article context from the vector index.
    pub rag_enhanced: bool,
    /// Run the (separately priced) entity-extraction analysis.
    pub include_entities: bool,
}

impl Default for CardOptions {
    fn default() -> Self {
        Self { rag_enhanced: false, include_entities: true }
    }
}

pub struct CardEngine<C> {
    chat: C,
    vector_index: Option<Arc<dyn VectorIndex>>,
}

impl<C: ChatPort> CardEngine<C> {
    pub fn new(chat: C) -> Self {
        Self { chat, vector_index: None }
    }

    pub fn with_vector_index(chat: C, vector_index: Arc<dyn VectorIndex>) -> Self {
        Self { chat, vector_index: Some(vector_index) }
    }

    pub async fn generate_card(&self, article: &Article, options: &CardOptions) -> Card {
        let started = Instant::now();
        let mut warnings = Vec::new();

        let rag_context = if options.rag_enhanced {
            match &self.vector_index {
                Some(index) => Some(rag::build_rag_context(index.as_ref(), article).await),
                None => {
                    warnings.push("rag_enhanced requested but no vector index is configured, skipped".to_string());
                    None
                }
            }
        } else {
            None
        };
        let rag_context_text = rag_context.as_ref().and_then(|r| r.context_text.as_deref());

        let entities_fut = async {
            if options.include_entities {
                analyses::entities(&self.chat, article).await
            } else {
                (Vec::new(), None)
            }
        };
        let trend_fut = async {
            if rag_context.is_some() {
                Some(analyses::trend(&self.chat, article, rag_context_text).await)
            } else {
                None
            }
        };

        let (summary, sentiment, theme, importance, credibility, timeliness, entities, trend) = tokio::join!(
            analyses::summary(&self.chat, article, rag_context_text),
            analyses::sentiment(&self.chat, article),
            analyses::themes(&self.chat, article),
            analyses::importance(&self.chat, article),
            analyses::credibility(&self.chat, article),
            analyses::timeliness(&self.chat, article),
            entities_fut,
            trend_fut,
        );

        let (entities, entities_warning) = entities;
        warnings.extend(entities_warning);
        let (trend, trend_warning) = match trend {
            Some((t, w)) => (Some(t), w),
            None => (None, None),
        };
        warnings.extend(trend_warning);

        let (summary, summary_warning) = summary;
        let (sentiment, sentiment_warning) = sentiment;
        let (theme, theme_warning) = theme;
        let (importance, importance_warning) = importance;
        let (credibility, credibility_warning) = credibility;
        let (timeliness, timeliness_warning) = timeliness;
        warnings.extend(
            [summary_warning, sentiment_warning, theme_warning, importance_warning, credibility_warning, timeliness_warning]
                .into_iter()
                .flatten(),
        );

        let unix_seconds = chrono::Utc::now().timestamp();
        let id = card_id(&article.id, unix_seconds);

        let (related_article_ids, similarity_scores, rag) = match rag_context {
            Some(ctx) => (
                ctx.related_news_ids.clone(),
                ctx.similarity_scores.clone(),
                Some(RagMetadata {
                    related_news_ids: ctx.related_news_ids,
                    similarity_scores: ctx.similarity_scores,
                    rag_context: ctx.context_text,
                    trend_analysis: trend,
                }),
            ),
            None => (Vec::new(), Default::default(), None),
        };

        Card {
            id,
            article_id: article.id.clone(),
            summary: summary.summary,
            enhanced_summary: summary.enhanced_summary,
            key_points: summary.key_points,
            keywords: summary.keywords,
            hashtags: summary.hashtags,
            theme,
            sentiment,
            importance,
            credibility,
            entities,
            timeliness,
            audience: summary.audience,
            reading_time_minutes: summary.reading_time_minutes,
            difficulty: summary.difficulty,
            related_article_ids,
            similarity_scores,
            rag,
            generation_metadata: GenerationMetadata {
                generated_at: chrono::Utc::now().to_rfc3339(),
                generation_ms: started.elapsed().as_millis() as u64,
                rag_enhanced: options.rag_enhanced,
                warnings,
            },
        }
    }
}
