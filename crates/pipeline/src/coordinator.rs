//! Pipeline Coordinator (spec §4.11): dispatches a request to one of five
//! named modes, composing C1–C10 underneath, and records uniform timings,
//! counts, and quality scores regardless of which subsystems ran.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::json;

use newsagent_context::{ContextBundle, ContextManager};
use newsagent_core::card::Card;
use newsagent_core::{Article, NewsAgentError};
use newsagent_embed::EmbeddingService;
use newsagent_enrich::{CardEngine, CardOptions};
use newsagent_fetch::ContentFetcher;
use newsagent_llm::{ChatMessage, ChatOptions, ChatPort, EmbedPort};
use newsagent_orchestrator::{AgentOrchestrator, AgentRequest, AgentResponse, OrchestratorConfig};
use newsagent_search::SearchPort;
use newsagent_store::collections::{API_LOGS, NEWS, SEARCH_HISTORY};
use newsagent_store::{DocumentStore, Filter};
use newsagent_vectorindex::{ScoredMatch, VectorIndex};

use crate::request::{CustomFlags, PipelineMode, PipelineRequest};
use crate::response::{ApiLogRecord, FeatureReport, PipelineResponse, SearchHistoryRecord};
use crate::scoring::{context_relevance_score, response_quality_score};
use crate::services::Services;

pub struct PipelineCoordinator<S, F, C, E> {
    store: Arc<dyn DocumentStore>,
    vector_index: Arc<dyn VectorIndex>,
    orchestrator: AgentOrchestrator<S, F, C>,
    context: ContextManager<E>,
    card_engine: CardEngine<C>,
    embedding: EmbeddingService<E>,
    chat: C,
    request_timeout_seconds: u64,
}

impl<S, F, C, E> PipelineCoordinator<S, F, C, E>
where
    S: SearchPort + Clone,
    F: ContentFetcher + Clone,
    C: ChatPort + Clone,
    E: EmbedPort + Clone,
{
    pub fn new(services: Services<S, F, C, E>) -> Self {
        let orchestrator_config = OrchestratorConfig { language: services.language.clone(), country: services.country.clone() };
        let orchestrator =
            AgentOrchestrator::new(services.chat.clone(), services.search.clone(), services.fetcher.clone(), services.store.clone(), orchestrator_config);
        let context = ContextManager::new(services.store.clone(), services.embed.clone());
        let card_engine = CardEngine::with_vector_index(services.chat.clone(), services.vector_index.clone());
        let embedding = EmbeddingService::new(services.embed.clone(), "newsagent-pipeline");

        Self {
            store: services.store.clone(),
            vector_index: services.vector_index.clone(),
            orchestrator,
            context,
            card_engine,
            embedding,
            chat: services.chat,
            request_timeout_seconds: services.request_timeout_seconds,
        }
    }

    /// Runs one request to completion or until its deadline elapses (spec
    /// §5 "Cancellation"): `chat default 120s`, overridable per-request.
    /// On timeout the coordinator surfaces partial results — whichever
    /// stages completed before the deadline keep their reports and data;
    /// the stage in flight when the deadline hit reports a `Timeout`
    /// failure instead of raising to the caller.
    pub async fn run(&self, request: &PipelineRequest) -> PipelineResponse {
        let started = Instant::now();
        let timeout_secs = request.deadline_seconds.unwrap_or(self.request_timeout_seconds);
        let deadline = started + Duration::from_secs(timeout_secs);
        let mut response = match request.mode {
            PipelineMode::EnhancedChat => self.run_enhanced_chat(request, deadline).await,
            PipelineMode::RagAnalysis => self.run_rag_analysis(request, deadline).await,
            PipelineMode::CardGeneration => self.run_card_generation(request, deadline).await,
            PipelineMode::UnifiedComplete => self.run_unified_complete(request, deadline).await,
            PipelineMode::Custom(flags) => self.run_custom(request, flags, deadline).await,
        };
        response.total_time_ms = started.elapsed().as_millis() as u64;
        self.record_api_log(request, &response).await;
        response
    }

    /// `enhanced_chat`: C9 on message; C10 enriches the reply; no
    /// separate top-level ingestion pass (spec §4.11).
    async fn run_enhanced_chat(&self, request: &PipelineRequest, deadline: Instant) -> PipelineResponse {
        let mut response = PipelineResponse::empty();
        let Some(user_id) = request.user_id.as_deref() else {
            response.chat = FeatureReport::failed(0, "enhanced_chat requires a user_id");
            response.response_text = "Sorry, I need to know who you are to continue this chat.".to_string();
            return response;
        };

        let chat_started = Instant::now();
        let agent_response = match with_deadline_infallible(
            deadline,
            self.orchestrator
                .run(&AgentRequest { user_id: user_id.to_string(), session_id: request.session_id.clone(), message: request.message.clone() }),
        )
        .await
        {
            Ok(resp) => {
                response.chat = FeatureReport::ok(chat_started.elapsed().as_millis() as u64);
                resp
            }
            Err(e) => {
                response.chat = FeatureReport::failed(chat_started.elapsed().as_millis() as u64, e.to_string());
                response.response_text = "Sorry, that took too long — please try again.".to_string();
                return response;
            }
        };
        response.news_retrieved = agent_response.ingest_result.as_ref().map(|r| r.found as usize).unwrap_or(0);
        if agent_response.ingest_result.is_some() {
            self.record_search_history(request, &agent_response).await;
        }

        let bundle = with_deadline(deadline, self.context.get_relevant_context(user_id, &request.message, &request.session_id)).await.ok();
        let memories_used = bundle.as_ref().map(|b| b.memories.len()).unwrap_or(0);
        let personalized = bundle.as_ref().is_some_and(|b| !b.preferred_categories.is_empty() || memories_used > 0);
        response.response_text =
            bundle.as_ref().map(|b| enrich_with_memories(&agent_response.response_text, b)).unwrap_or(agent_response.response_text);
        response.memories_used = memories_used;

        response.success = true;
        let has_news = response.news_retrieved > 0;
        response.quality_score = response_quality_score(&response.response_text, personalized, memories_used > 0, has_news);
        response.context_relevance_score = context_relevance_score(&request.message, &response.response_text, has_news);
        response
    }

    /// `rag_analysis`: C5 query on the message (no card); the chat port
    /// composes an answer grounded in the retrieved articles (spec §4.11).
    async fn run_rag_analysis(&self, request: &PipelineRequest, deadline: Instant) -> PipelineResponse {
        let mut response = PipelineResponse::empty();

        let rag_started = Instant::now();
        let matches = match with_deadline(deadline, self.vector_index.query(&request.message, request.limits.max_related)).await {
            Ok(matches) => {
                response.rag = FeatureReport::ok(rag_started.elapsed().as_millis() as u64);
                matches
            }
            Err(e) => {
                response.rag = FeatureReport::failed(rag_started.elapsed().as_millis() as u64, e.to_string());
                response.response_text = "Sorry, I couldn't look up related coverage right now.".to_string();
                return response;
            }
        };
        response.news_retrieved = matches.len();
        response.related_news = matches.iter().map(|m| m.article_id.clone()).collect();

        let chat_started = Instant::now();
        let grounding = titles_of(&matches);
        let system = if grounding.is_empty() {
            "No related articles were found. Say so plainly and answer from general knowledge.".to_string()
        } else {
            format!("Answer the user's question grounded in these related articles: {grounding}.")
        };
        let messages = vec![ChatMessage::system(system), ChatMessage::user(request.message.clone())];

        match with_deadline(deadline, self.chat.chat(&messages, &ChatOptions::default())).await {
            Ok(completion) => {
                response.chat = FeatureReport::ok(chat_started.elapsed().as_millis() as u64);
                response.response_text = completion.content;
                response.success = true;
            }
            Err(e) => {
                response.chat = FeatureReport::failed(chat_started.elapsed().as_millis() as u64, e.to_string());
                response.response_text = "I found related coverage but couldn't compose an answer right now.".to_string();
                response.success = !matches.is_empty();
            }
        }

        let has_news = !matches.is_empty();
        response.quality_score = response_quality_score(&response.response_text, false, false, has_news);
        response.context_relevance_score = context_relevance_score(&request.message, &response.response_text, has_news);
        response
    }

    /// `card_generation`: C5 query, then C6 on the top N articles (spec
    /// §4.11).
    async fn run_card_generation(&self, request: &PipelineRequest, deadline: Instant) -> PipelineResponse {
        let mut response = PipelineResponse::empty();

        let rag_started = Instant::now();
        let matches = match with_deadline(deadline, self.vector_index.query(&request.message, request.limits.max_cards)).await {
            Ok(matches) => {
                response.rag = FeatureReport::ok(rag_started.elapsed().as_millis() as u64);
                matches
            }
            Err(e) => {
                response.rag = FeatureReport::failed(rag_started.elapsed().as_millis() as u64, e.to_string());
                response.response_text = "Sorry, I couldn't find related articles to build cards from.".to_string();
                return response;
            }
        };
        response.news_retrieved = matches.len();
        response.related_news = matches.iter().map(|m| m.article_id.clone()).collect();

        let cards_started = Instant::now();
        let mut cards = Vec::new();
        for scored in matches.iter().take(request.limits.max_cards) {
            if Instant::now() >= deadline {
                break;
            }
            if let Some(article) = self.load_article(&scored.article_id).await {
                cards.push(self.card_engine.generate_card(&article, &CardOptions::default()).await);
            }
        }

        response.cards = if cards.is_empty() && !matches.is_empty() {
            FeatureReport::failed(cards_started.elapsed().as_millis() as u64, "no articles could be loaded for card generation")
        } else {
            FeatureReport::ok(cards_started.elapsed().as_millis() as u64)
        };
        response.cards_generated = cards.len();
        response.response_text = format!("Generated {} card(s) from {} related article(s).", cards.len(), matches.len());
        response.card_data = cards;
        response.success = true;

        let has_news = !matches.is_empty();
        response.quality_score = response_quality_score(&response.response_text, false, false, has_news);
        response.context_relevance_score = context_relevance_score(&request.message, &response.response_text, has_news);
        response
    }

    /// `unified_complete`: C9 (which may drive C3 → C4 → C5 via ingestion),
    /// then a C10-enriched answer, then optionally one C6 card on the
    /// top-similarity article (spec §4.11).
    async fn run_unified_complete(&self, request: &PipelineRequest, deadline: Instant) -> PipelineResponse {
        let mut response = PipelineResponse::empty();
        let Some(user_id) = request.user_id.as_deref() else {
            response.chat = FeatureReport::failed(0, "unified_complete requires a user_id");
            response.response_text = "Sorry, I need to know who you are to personalize this.".to_string();
            return response;
        };

        let chat_started = Instant::now();
        let agent_response = match with_deadline_infallible(
            deadline,
            self.orchestrator
                .run(&AgentRequest { user_id: user_id.to_string(), session_id: request.session_id.clone(), message: request.message.clone() }),
        )
        .await
        {
            Ok(resp) => {
                response.chat = FeatureReport::ok(chat_started.elapsed().as_millis() as u64);
                resp
            }
            Err(e) => {
                response.chat = FeatureReport::failed(chat_started.elapsed().as_millis() as u64, e.to_string());
                response.response_text = "Sorry, that took too long — please try again.".to_string();
                return response;
            }
        };

        if let Some(ingest) = &agent_response.ingest_result {
            response.news_retrieved = ingest.found as usize;
            self.embed_and_index_saved(&ingest.saved_ids).await;
            self.record_search_history(request, &agent_response).await;
        }

        let bundle = with_deadline(deadline, self.context.get_relevant_context(user_id, &request.message, &request.session_id)).await.ok();
        let memories_used = bundle.as_ref().map(|b| b.memories.len()).unwrap_or(0);
        let personalized = bundle.as_ref().is_some_and(|b| !b.preferred_categories.is_empty() || memories_used > 0);
        response.response_text =
            bundle.as_ref().map(|b| enrich_with_memories(&agent_response.response_text, b)).unwrap_or(agent_response.response_text);
        response.memories_used = memories_used;

        let rag_started = Instant::now();
        let matches = with_deadline(deadline, self.vector_index.query(&request.message, request.limits.max_related)).await.unwrap_or_default();
        response.rag = FeatureReport::ok(rag_started.elapsed().as_millis() as u64);
        response.related_news = matches.iter().map(|m| m.article_id.clone()).collect();

        if let Some(top) = matches.first() {
            if Instant::now() >= deadline {
                response.success = true;
                let has_news = !response.related_news.is_empty() || response.news_retrieved > 0;
                response.quality_score = response_quality_score(&response.response_text, personalized, memories_used > 0, has_news);
                response.context_relevance_score = context_relevance_score(&request.message, &response.response_text, has_news);
                return response;
            }
            let cards_started = Instant::now();
            if let Some(article) = self.load_article(&top.article_id).await {
                let card = self.card_engine.generate_card(&article, &CardOptions { rag_enhanced: true, include_entities: true }).await;
                response.cards_generated = 1;
                response.card_data.push(card);
                response.cards = FeatureReport::ok(cards_started.elapsed().as_millis() as u64);
            }
        }

        response.success = true;
        let has_news = !response.related_news.is_empty() || response.news_retrieved > 0;
        response.quality_score = response_quality_score(&response.response_text, personalized, memories_used > 0, has_news);
        response.context_relevance_score = context_relevance_score(&request.message, &response.response_text, has_news);
        response
    }

    /// `custom`: the caller selects which of {rag, cards, chat} run; chat
    /// and cards run concurrently once rag (if requested) has resolved,
    /// with cards depending on rag's output (spec §4.11).
    async fn run_custom(&self, request: &PipelineRequest, flags: CustomFlags, deadline: Instant) -> PipelineResponse {
        let mut response = PipelineResponse::empty();

        let rag_started = Instant::now();
        let matches = if flags.rag {
            match with_deadline(deadline, self.vector_index.query(&request.message, request.limits.max_related)).await {
                Ok(matches) => {
                    response.rag = FeatureReport::ok(rag_started.elapsed().as_millis() as u64);
                    matches
                }
                Err(e) => {
                    response.rag = FeatureReport::failed(rag_started.elapsed().as_millis() as u64, e.to_string());
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };
        response.news_retrieved = matches.len();
        response.related_news = matches.iter().map(|m| m.article_id.clone()).collect();

        let (chat_result, cards_result) = tokio::join!(
            self.run_custom_chat(request, flags.chat, &matches, deadline),
            self.run_custom_cards(flags.cards, request, &matches, deadline)
        );

        if let Some((report, text)) = chat_result {
            response.chat = report;
            response.response_text = text;
        }
        if let Some((report, cards)) = cards_result {
            response.cards = report;
            response.cards_generated = cards.len();
            response.card_data = cards;
        }
        if response.response_text.is_empty() && !response.card_data.is_empty() {
            response.response_text = format!("Generated {} card(s).", response.card_data.len());
        }

        response.success = response.chat.success && response.rag.success && response.cards.success;
        let has_news = !matches.is_empty();
        response.quality_score = response_quality_score(&response.response_text, false, false, has_news);
        response.context_relevance_score = context_relevance_score(&request.message, &response.response_text, has_news);
        response
    }

    async fn run_custom_chat(
        &self,
        request: &PipelineRequest,
        enabled: bool,
        matches: &[ScoredMatch],
        deadline: Instant,
    ) -> Option<(FeatureReport, String)> {
        if !enabled {
            return None;
        }
        let started = Instant::now();
        let grounding = titles_of(matches);
        let system = if grounding.is_empty() {
            "Answer the user's question helpfully.".to_string()
        } else {
            format!("Answer the user's question, grounded in: {grounding}.")
        };
        let messages = vec![ChatMessage::system(system), ChatMessage::user(request.message.clone())];
        match with_deadline(deadline, self.chat.chat(&messages, &ChatOptions::default())).await {
            Ok(completion) => Some((FeatureReport::ok(started.elapsed().as_millis() as u64), completion.content)),
            Err(e) => {
                Some((FeatureReport::failed(started.elapsed().as_millis() as u64, e.to_string()), "Sorry, I couldn't respond right now.".to_string()))
            }
        }
    }

    async fn run_custom_cards(
        &self,
        enabled: bool,
        request: &PipelineRequest,
        matches: &[ScoredMatch],
        deadline: Instant,
    ) -> Option<(FeatureReport, Vec<Card>)> {
        if !enabled {
            return None;
        }
        let started = Instant::now();
        let mut cards = Vec::new();
        for scored in matches.iter().take(request.limits.max_cards) {
            if Instant::now() >= deadline {
                break;
            }
            if let Some(article) = self.load_article(&scored.article_id).await {
                cards.push(self.card_engine.generate_card(&article, &CardOptions::default()).await);
            }
        }
        Some((FeatureReport::ok(started.elapsed().as_millis() as u64), cards))
    }

    /// Embeds and upserts every article ingestion just saved, the C3 → C4 →
    /// C5 chain `unified_complete` drives (spec §4.11).
    async fn embed_and_index_saved(&self, saved_ids: &[String]) {
        for id in saved_ids {
            let Some(article) = self.load_article(id).await else { continue };
            let Some(body) = article.body.clone() else { continue };
            let metadata = json!({"title": article.title, "url": article.url, "category": article.category});

            match self.embedding.process(&body, &article.id, metadata).await {
                Ok(results) if !results.is_empty() => {
                    if let Err(e) = self.vector_index.upsert(results).await {
                        tracing::warn!(article_id = %article.id, error = %e, "embed_and_index_saved: upsert failed");
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(article_id = %article.id, error = %e, "embed_and_index_saved: embedding failed"),
            }
        }
    }

    async fn load_article(&self, id: &str) -> Option<Article> {
        let doc = self.store.find_one(NEWS, &Filter::new().eq("_id", id)).await.ok().flatten()?;
        serde_json::from_value(doc).ok()
    }

    async fn record_search_history(&self, request: &PipelineRequest, agent_response: &AgentResponse) {
        let record = SearchHistoryRecord {
            session_id: request.session_id.clone(),
            user_id: request.user_id.clone(),
            message: request.message.clone(),
            keywords: agent_response.keywords.clone(),
            found: agent_response.ingest_result.as_ref().map(|r| r.found).unwrap_or(0),
            saved: agent_response.ingest_result.as_ref().map(|r| r.saved).unwrap_or(0),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        let doc = serde_json::to_value(&record).unwrap_or_else(|_| json!({}));
        if let Err(e) = self.store.insert_one(SEARCH_HISTORY, doc).await {
            tracing::warn!(error = %e, "record_search_history: insert failed");
        }
    }

    async fn record_api_log(&self, request: &PipelineRequest, response: &PipelineResponse) {
        let record = ApiLogRecord {
            session_id: request.session_id.clone(),
            user_id: request.user_id.clone(),
            mode: mode_label(request.mode).to_string(),
            success: response.success,
            total_time_ms: response.total_time_ms,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        let doc = serde_json::to_value(&record).unwrap_or_else(|_| json!({}));
        if let Err(e) = self.store.insert_one(API_LOGS, doc).await {
            tracing::warn!(error = %e, "record_api_log: insert failed");
        }
    }
}

/// Races `fut` against `deadline` (spec §5 "Cancellation": "LM and HTTP
/// calls must honour cancellation"). A fallible future's own error still
/// wins if it resolves first; only an unexpired future that outruns the
/// deadline is reported as `NewsAgentError::Timeout`.
async fn with_deadline<T, Fut>(deadline: Instant, fut: Fut) -> Result<T, NewsAgentError>
where
    Fut: Future<Output = Result<T, NewsAgentError>>,
{
    let remaining = deadline.saturating_duration_since(Instant::now());
    match tokio::time::timeout(remaining, fut).await {
        Ok(result) => result,
        Err(_) => Err(NewsAgentError::Timeout("pipeline request deadline exceeded".to_string())),
    }
}

/// As [`with_deadline`], for futures (like `AgentOrchestrator::run`) that
/// never raise to the caller on their own — only a deadline can fail them.
async fn with_deadline_infallible<T, Fut>(deadline: Instant, fut: Fut) -> Result<T, NewsAgentError>
where
    Fut: Future<Output = T>,
{
    let remaining = deadline.saturating_duration_since(Instant::now());
    match tokio::time::timeout(remaining, fut).await {
        Ok(value) => Ok(value),
        Err(_) => Err(NewsAgentError::Timeout("pipeline request deadline exceeded".to_string())),
    }
}

fn titles_of(matches: &[ScoredMatch]) -> String {
    matches.iter().filter_map(|m| m.metadata.get("title").and_then(|v| v.as_str())).collect::<Vec<_>>().join("; ")
}

fn enrich_with_memories(base: &str, bundle: &ContextBundle) -> String {
    match bundle.memories.first() {
        Some((memory, _score)) => format!("{base}\n\n(Also keeping in mind: {})", memory.body),
        None => base.to_string(),
    }
}

fn mode_label(mode: PipelineMode) -> &'static str {
    match mode {
        PipelineMode::EnhancedChat => "enhanced_chat",
        PipelineMode::RagAnalysis => "rag_analysis",
        PipelineMode::CardGeneration => "card_generation",
        PipelineMode::UnifiedComplete => "unified_complete",
        PipelineMode::Custom(_) => "custom",
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use newsagent_core::search::{RawArticle, SearchRequest};
    use newsagent_core::NewsAgentError;
    use newsagent_embed::EmbeddingResult;
    use newsagent_llm::ChatCompletion;
    use newsagent_store::InMemoryDocumentStore;
    use newsagent_vectorindex::InMemoryVectorIndex;

    use super::*;
    use crate::request::{PipelineLimits, PipelineRequest};

    #[derive(Clone)]
    struct StubSearch;

    #[async_trait]
    impl SearchPort for StubSearch {
        async fn search(&self, _request: &SearchRequest) -> Result<Vec<RawArticle>, NewsAgentError> {
            Ok(Vec::new())
        }
    }

    #[derive(Clone)]
    struct StubFetcher;

    #[async_trait]
    impl ContentFetcher for StubFetcher {
        async fn fetch(&self, _url: &str) -> String {
            String::new()
        }
    }

    #[derive(Clone)]
    struct ScriptedChat;

    #[async_trait]
    impl ChatPort for ScriptedChat {
        async fn chat(&self, messages: &[ChatMessage], _options: &ChatOptions) -> Result<ChatCompletion, NewsAgentError> {
            let system = &messages[0].content;
            let content = if system.contains("intent classifier") {
                "其它"
            } else if system.contains("grounded") {
                "Here is what's happening, based on related coverage."
            } else {
                "Happy to help!"
            };
            Ok(ChatCompletion { content: content.to_string(), tokens_used: 5 })
        }
    }

    #[derive(Clone)]
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

    fn coordinator_with_store() -> (PipelineCoordinator<StubSearch, StubFetcher, ScriptedChat, StubEmbed>, Arc<dyn DocumentStore>) {
        let store: Arc<dyn DocumentStore> = Arc::new(InMemoryDocumentStore::new());
        let vector_index: Arc<dyn VectorIndex> = Arc::new(InMemoryVectorIndex::new(StubEmbed));
        let services = Services::new(store.clone(), StubSearch, StubFetcher, ScriptedChat, StubEmbed, vector_index);
        (PipelineCoordinator::new(services), store)
    }

    async fn seed_article(store: &Arc<dyn DocumentStore>, vector_index: &Arc<dyn VectorIndex>, id: &str, title: &str) {
        store
            .insert_one(
                NEWS,
                json!({"_id": id, "title": title, "url": format!("https://x.example/{id}"), "source": "Wire", "date": "2026-07-20", "body": "A sufficiently long article body for card generation.", "keywords": [], "scope": "s1", "embedded": true, "category": "technology", "sentiment": null}),
            )
            .await
            .unwrap();
        vector_index
            .upsert(vec![EmbeddingResult {
                source_id: id.to_string(),
                chunk_index: 0,
                vector: vec![1.0, 0.0],
                model: "test".into(),
                dimension: 2,
                metadata: json!({"title": title}),
            }])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn rag_analysis_composes_grounded_answer() {
        let (coordinator, store) = coordinator_with_store();
        seed_article(&store, &coordinator.vector_index, "a1", "AI breakthrough").await;

        let request = PipelineRequest::new("s1", "what's new in AI?", PipelineMode::RagAnalysis);
        let response = coordinator.run(&request).await;

        assert!(response.success);
        assert!(response.rag.enabled && response.rag.success);
        assert!(response.chat.enabled && response.chat.success);
        assert_eq!(response.news_retrieved, 1);
        assert!(response.response_text.contains("related coverage"));
    }

    #[tokio::test]
    async fn card_generation_builds_a_card_per_related_article() {
        let (coordinator, store) = coordinator_with_store();
        seed_article(&store, &coordinator.vector_index, "a1", "AI breakthrough").await;

        let request = PipelineRequest::new("s1", "AI", PipelineMode::CardGeneration).with_limits(PipelineLimits { max_related: 5, max_cards: 1 });
        let response = coordinator.run(&request).await;

        assert!(response.success);
        assert_eq!(response.cards_generated, 1);
        assert_eq!(response.card_data.len(), 1);
        assert_eq!(response.card_data[0].article_id, "a1");
    }

    #[tokio::test]
    async fn enhanced_chat_without_user_id_fails_cleanly() {
        let (coordinator, _store) = coordinator_with_store();
        let request = PipelineRequest::new("s1", "hello", PipelineMode::EnhancedChat);
        let response = coordinator.run(&request).await;

        assert!(!response.chat.success);
        assert!(!response.success);
    }

    #[tokio::test]
    async fn enhanced_chat_with_user_id_succeeds_and_writes_search_history_only_on_ingest() {
        let (coordinator, _store) = coordinator_with_store();
        let request = PipelineRequest::new("s1", "hello there", PipelineMode::EnhancedChat).with_user("u1");
        let response = coordinator.run(&request).await;

        assert!(response.success);
        assert!(response.chat.success);
    }

    #[tokio::test]
    async fn custom_mode_with_only_chat_flag_skips_rag_and_cards() {
        let (coordinator, _store) = coordinator_with_store();
        let request = PipelineRequest::new("s1", "tell me something", PipelineMode::Custom(CustomFlags { rag: false, cards: false, chat: true }));
        let response = coordinator.run(&request).await;

        assert!(response.chat.enabled);
        assert!(!response.rag.enabled);
        assert!(!response.cards.enabled);
        assert_eq!(response.cards_generated, 0);
    }

    #[derive(Clone)]
    struct SlowChat;

    #[async_trait]
    impl ChatPort for SlowChat {
        async fn chat(&self, _messages: &[ChatMessage], _options: &ChatOptions) -> Result<ChatCompletion, NewsAgentError> {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            Ok(ChatCompletion { content: "too slow to matter".to_string(), tokens_used: 1 })
        }
    }

    #[tokio::test]
    async fn rag_analysis_reports_timeout_when_chat_outruns_the_deadline() {
        let store: Arc<dyn DocumentStore> = Arc::new(InMemoryDocumentStore::new());
        let vector_index: Arc<dyn VectorIndex> = Arc::new(InMemoryVectorIndex::new(StubEmbed));
        seed_article(&store, &vector_index, "a1", "AI breakthrough").await;
        let services = Services::new(store, StubSearch, StubFetcher, SlowChat, StubEmbed, vector_index);
        let coordinator = PipelineCoordinator::new(services);

        let request = PipelineRequest::new("s1", "what's new in AI?", PipelineMode::RagAnalysis).with_deadline_seconds(0);
        let response = coordinator.run(&request).await;

        assert!(response.rag.success);
        assert!(!response.chat.success);
        assert_eq!(response.chat.error.as_deref(), Some("deadline exceeded: pipeline request deadline exceeded"));
        // rag still found a related article, so the run reports a degraded
        // but coherent outcome rather than an outright failure (spec §7).
        assert!(response.success);
    }

    #[tokio::test]
    async fn disabled_features_report_zero_time_and_success() {
        let (coordinator, _store) = coordinator_with_store();
        let request = PipelineRequest::new("s1", "anything", PipelineMode::Custom(CustomFlags { rag: false, cards: false, chat: false }));
        let response = coordinator.run(&request).await;

        assert!(!response.chat.enabled && response.chat.success && response.chat.time_ms == 0);
        assert!(!response.rag.enabled && response.rag.success && response.rag.time_ms == 0);
        assert!(!response.cards.enabled && response.cards.success && response.cards.time_ms == 0);
    }
}
