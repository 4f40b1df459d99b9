//! `AgentOrchestrator` (spec §4.9): the state graph that ties intent
//! classification to the rest of the workspace. Routing (spec §4.9
//! "Routing"):
//!
//! ```text
//! 准确搜索 → extract_keywords → search_precise → save_memory
//! 含糊搜索 → search_general → save_memory
//! 兴趣调整 → manage_interests → END (no memory write)
//! 其它     → handle_other → save_memory
//! ```

use std::sync::Arc;

use newsagent_core::search::{IngestResult, SearchRequest, TimeWindow};
use newsagent_fetch::ContentFetcher;
use newsagent_ingest::IngestionEngine;
use newsagent_interests::InterestStore;
use newsagent_llm::{ChatMessage, ChatOptions, ChatPort};
use newsagent_search::SearchPort;
use newsagent_sessionmemory::{SessionMemoryStore, Turn};
use newsagent_store::DocumentStore;

use crate::interests_plan::{parse_plan, InterestOp, InterestOutcome};
use crate::keywords::{broad_keywords, extract_keywords, KeywordExtraction};
use crate::{classify_intent, Intent};

/// History loaded before running the graph is capped to this many recent
/// turns (spec §4.9 "Load history").
const HISTORY_PRELOAD_TURNS: usize = 5;
const PRECISE_SEARCH_COUNT: u32 = 10;
const GENERAL_SEARCH_COUNT: u32 = 15;

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub language: String,
    pub country: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self { language: "zh".to_string(), country: "cn".to_string() }
    }
}

#[derive(Debug, Clone)]
pub struct AgentRequest {
    pub user_id: String,
    pub session_id: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct AgentResponse {
    pub intent: Intent,
    pub response_text: String,
    pub keywords: Vec<String>,
    pub time_window: Option<TimeWindow>,
    pub ingest_result: Option<IngestResult>,
    pub interest_outcomes: Vec<InterestOutcome>,
    pub memory_written: bool,
}

impl AgentResponse {
    fn for_intent(intent: Intent) -> Self {
        Self {
            intent,
            response_text: String::new(),
            keywords: Vec::new(),
            time_window: None,
            ingest_result: None,
            interest_outcomes: Vec::new(),
            memory_written: false,
        }
    }
}

pub struct AgentOrchestrator<S, F, C> {
    chat: C,
    ingestion: IngestionEngine<S, F>,
    interests: InterestStore<C>,
    sessions: SessionMemoryStore,
    config: OrchestratorConfig,
}

impl<S, F, C> AgentOrchestrator<S, F, C>
where
    S: SearchPort,
    F: ContentFetcher,
    C: ChatPort + Clone,
{
    pub fn new(chat: C, search: S, fetcher: F, store: Arc<dyn DocumentStore>, config: OrchestratorConfig) -> Self {
        Self {
            interests: InterestStore::new(store.clone(), Some(chat.clone())),
            sessions: SessionMemoryStore::new(store.clone()),
            ingestion: IngestionEngine::new(search, fetcher, store),
            chat,
            config,
        }
    }

    /// Runs one turn of the state graph: loads recent history, classifies
    /// intent, routes to the matching subflow.
    pub async fn run(&self, request: &AgentRequest) -> AgentResponse {
        let recent_history = self.load_recent_history(&request.session_id).await;
        let intent = classify_intent(&self.chat, &request.message).await;
        let mut response = AgentResponse::for_intent(intent);

        match intent {
            Intent::PreciseSearch => {
                let extraction = extract_keywords(&self.chat, &request.message).await;
                response.keywords = extraction.keywords.clone();
                response.time_window = Some(extraction.time_window);
                let ingest = self.search_precise(&request.user_id, &request.session_id, extraction).await;
                response.response_text = format_ingest_reply(&ingest);
                response.ingest_result = Some(ingest);
                response.memory_written =
                    self.save_memory(&request.session_id, &recent_history, &request.message, &response.response_text).await;
            }
            Intent::VagueSearch => {
                let extraction = broad_keywords(&self.chat).await;
                response.keywords = extraction.keywords.clone();
                response.time_window = Some(extraction.time_window);
                let ingest = self.search_general(&request.session_id, extraction).await;
                response.response_text = format_ingest_reply(&ingest);
                response.ingest_result = Some(ingest);
                response.memory_written =
                    self.save_memory(&request.session_id, &recent_history, &request.message, &response.response_text).await;
            }
            Intent::InterestEdit => {
                let outcomes = self.manage_interests(&request.user_id, &request.message).await;
                response.response_text = format_interest_reply(&outcomes);
                response.interest_outcomes = outcomes;
                // spec §4.9: 兴趣调整 routes straight to END, no memory write.
            }
            Intent::Other => {
                response.response_text = self.handle_other(&request.message, &recent_history).await;
                response.memory_written =
                    self.save_memory(&request.session_id, &recent_history, &request.message, &response.response_text).await;
            }
        }

        response
    }

    async fn load_recent_history(&self, session_id: &str) -> Vec<Turn> {
        match self.sessions.get(session_id).await {
            Ok(Some(memory)) => {
                let history = memory.conversation_history;
                let start = history.len().saturating_sub(HISTORY_PRELOAD_TURNS);
                history[start..].to_vec()
            }
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!(session_id, error = %e, "load_recent_history: failed to read session memory");
                Vec::new()
            }
        }
    }

    /// `search_precise` (spec §4.9): adds extracted keywords to the
    /// Interest Store, then ingests with the derived time window mapped to
    /// expire-days.
    async fn search_precise(&self, user_id: &str, scope: &str, extraction: KeywordExtraction) -> IngestResult {
        if extraction.keywords.is_empty() {
            return IngestResult::empty(newsagent_core::search::IngestStatus::ConfigMissing);
        }

        if let Err(e) = self.interests.add(user_id, extraction.keywords.clone()).await {
            tracing::warn!(user_id, error = %e, "search_precise: failed to record extracted keywords as interests");
        }

        let request = SearchRequest::new(
            scope.to_string(),
            extraction.keywords,
            PRECISE_SEARCH_COUNT,
            self.config.language.clone(),
            self.config.country.clone(),
            extraction.time_window,
            extraction.time_window.expire_days(),
        );
        self.ingestion.ingest(&request).await
    }

    /// `search_general` (spec §4.9): broad-topic keywords, larger result
    /// count, no interest-store write.
    async fn search_general(&self, scope: &str, extraction: KeywordExtraction) -> IngestResult {
        if extraction.keywords.is_empty() {
            return IngestResult::empty(newsagent_core::search::IngestStatus::ConfigMissing);
        }

        let request = SearchRequest::new(
            scope.to_string(),
            extraction.keywords,
            GENERAL_SEARCH_COUNT,
            self.config.language.clone(),
            self.config.country.clone(),
            extraction.time_window,
            extraction.time_window.expire_days(),
        );
        self.ingestion.ingest(&request).await
    }

    /// `manage_interests` (spec §4.9): phase 1 executes each plan line in
    /// order; any `QUERY_RELATED` enqueues a phase-2 `REMOVE` using the
    /// discovered tags, run only after every phase-1 line has completed.
    async fn manage_interests(&self, user_id: &str, message: &str) -> Vec<InterestOutcome> {
        let interests = self.interests.get(user_id).await.unwrap_or_default();
        let plan_text = self.request_interest_plan(&interests, message).await;
        let ops = parse_plan(&plan_text);

        let mut outcomes = Vec::new();
        let mut phase2_removals: Vec<Vec<String>> = Vec::new();

        for op in ops {
            outcomes.push(self.execute_interest_op(user_id, op, &mut phase2_removals).await);
        }

        for tags in phase2_removals {
            outcomes.push(self.apply_remove(user_id, tags).await);
        }

        outcomes
    }

    async fn execute_interest_op(
        &self,
        user_id: &str,
        op: InterestOp,
        phase2_removals: &mut Vec<Vec<String>>,
    ) -> InterestOutcome {
        match op {
            InterestOp::Query => match self.interests.get(user_id).await {
                Ok(tags) => InterestOutcome { op: "QUERY".into(), success: true, detail: tags.join(", ") },
                Err(e) => InterestOutcome { op: "QUERY".into(), success: false, detail: e.to_string() },
            },
            InterestOp::QueryRelated(keyword) => match self.interests.related(user_id, &keyword).await {
                Ok(tags) if !tags.is_empty() => {
                    let detail = tags.join(", ");
                    phase2_removals.push(tags);
                    InterestOutcome { op: format!("QUERY_RELATED:{keyword}"), success: true, detail }
                }
                Ok(_) => InterestOutcome {
                    op: format!("QUERY_RELATED:{keyword}"),
                    success: true,
                    detail: "no related interests found".into(),
                },
                Err(e) => InterestOutcome { op: format!("QUERY_RELATED:{keyword}"), success: false, detail: e.to_string() },
            },
            InterestOp::Add(tags) => {
                let label = format!("ADD:{}", tags.join(","));
                match self.interests.add(user_id, tags).await {
                    Ok(current) => InterestOutcome { op: label, success: true, detail: current.join(", ") },
                    Err(e) => InterestOutcome { op: label, success: false, detail: e.to_string() },
                }
            }
            InterestOp::Remove(tags) => self.apply_remove(user_id, tags).await,
            InterestOp::Clear => match self.interests.clear(user_id).await {
                Ok(()) => InterestOutcome { op: "CLEAR".into(), success: true, detail: "cleared".into() },
                Err(e) => InterestOutcome { op: "CLEAR".into(), success: false, detail: e.to_string() },
            },
            InterestOp::Replace(remove, add) => {
                let label = format!("REPLACE:{}|{}", remove.join(","), add.join(","));
                if let Err(e) = self.interests.remove(user_id, &remove).await {
                    return InterestOutcome { op: label, success: false, detail: e.to_string() };
                }
                match self.interests.add(user_id, add).await {
                    Ok(current) => InterestOutcome { op: label, success: true, detail: current.join(", ") },
                    Err(e) => InterestOutcome { op: label, success: false, detail: e.to_string() },
                }
            }
            InterestOp::Unknown(raw) => InterestOutcome { op: "UNKNOWN".into(), success: false, detail: raw },
        }
    }

    async fn apply_remove(&self, user_id: &str, tags: Vec<String>) -> InterestOutcome {
        let label = format!("REMOVE:{}", tags.join(","));
        match self.interests.remove(user_id, &tags).await {
            Ok(current) => InterestOutcome { op: label, success: true, detail: current.join(", ") },
            Err(e) => InterestOutcome { op: label, success: false, detail: e.to_string() },
        }
    }

    async fn request_interest_plan(&self, interests: &[String], message: &str) -> String {
        let system = format!(
            "You manage a user's news interest tags. Current interests: [{}]. \
            Given the user's message, reply with one or more lines, each exactly one of: \
            QUERY:, QUERY_RELATED:<keyword>, ADD:<comma-separated tags>, REMOVE:<comma-separated tags>, \
            CLEAR:, REPLACE:<remove comma-list>|<add comma-list>, UNKNOWN:. \
            Use QUERY_RELATED when the user wants to act on a semantic group of interests rather than \
            naming exact tags (e.g. \"remove everything about trains\"). No text outside these lines.",
            interests.join(", ")
        );
        let messages = vec![ChatMessage::system(system), ChatMessage::user(message)];
        match self.chat.chat(&messages, &ChatOptions::default()).await {
            Ok(completion) => completion.content,
            Err(e) => {
                tracing::warn!(error = %e, "manage_interests: LM call failed, treating as empty plan");
                String::new()
            }
        }
    }

    /// `handle_other` (spec §4.9): a conversational fallback for messages
    /// that match none of the other three intents.
    async fn handle_other(&self, message: &str, history: &[Turn]) -> String {
        let system = "You are a helpful personalized-news assistant. The user's message doesn't \
            name a specific search, a general news request, or an interest-profile edit. Respond \
            conversationally and helpfully in at most a few sentences.";
        let context = history
            .iter()
            .map(|t| format!("User: {}\nAssistant: {}", t.user, t.assistant))
            .collect::<Vec<_>>()
            .join("\n");
        let user_prompt = if context.is_empty() { message.to_string() } else { format!("{context}\nUser: {message}") };

        let messages = vec![ChatMessage::system(system), ChatMessage::user(user_prompt)];
        match self.chat.chat(&messages, &ChatOptions::default()).await {
            Ok(completion) => completion.content,
            Err(e) => {
                tracing::warn!(error = %e, "handle_other: LM call failed");
                "Sorry, I couldn't process that right now.".to_string()
            }
        }
    }

    /// `save_memory` (spec §4.9): finds the most recent user message not
    /// already present in the transcript, pairs it with the assistant
    /// reply, appends, and truncates.
    async fn save_memory(&self, session_id: &str, history: &[Turn], user_message: &str, assistant_message: &str) -> bool {
        if history.iter().any(|t| t.user == user_message) {
            return false;
        }

        let turn = Turn { ts: chrono::Utc::now().to_rfc3339(), user: user_message.to_string(), assistant: assistant_message.to_string() };
        match self.sessions.save(session_id, Some(turn), None).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(session_id, error = %e, "save_memory: failed to persist turn");
                false
            }
        }
    }
}

fn format_ingest_reply(result: &IngestResult) -> String {
    format!(
        "Found {} articles, saved {} new, enriched {} existing with new keywords.",
        result.found, result.saved, result.updated
    )
}

fn format_interest_reply(outcomes: &[InterestOutcome]) -> String {
    if outcomes.is_empty() {
        return "No interest changes were requested.".to_string();
    }
    outcomes
        .iter()
        .map(|o| format!("{}: {} ({})", o.op, if o.success { "ok" } else { "failed" }, o.detail))
        .collect::<Vec<_>>()
        .join("\n")
}
