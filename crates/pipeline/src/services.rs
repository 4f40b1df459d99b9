//! Explicit `Services` bundle (spec §9 "Global state"): every external port
//! the coordinator needs, constructed once at process start and threaded
//! through by reference — no module-level lazily-initialized singletons.

use std::sync::Arc;

use newsagent_fetch::ContentFetcher;
use newsagent_llm::{ChatPort, EmbedPort};
use newsagent_search::SearchPort;
use newsagent_store::DocumentStore;
use newsagent_vectorindex::VectorIndex;

#[derive(Clone)]
pub struct Services<S, F, C, E> {
    pub store: Arc<dyn DocumentStore>,
    pub search: S,
    pub fetcher: F,
    pub chat: C,
    pub embed: E,
    pub vector_index: Arc<dyn VectorIndex>,
    pub language: String,
    pub country: String,
    /// Default per-request deadline in seconds (spec §6
    /// `PIPELINE_REQUEST_TIMEOUT_SECONDS`, default 120).
    pub request_timeout_seconds: u64,
}

impl<S, F, C, E> Services<S, F, C, E>
where
    S: SearchPort + Clone,
    F: ContentFetcher + Clone,
    C: ChatPort + Clone,
    E: EmbedPort + Clone,
{
    pub fn new(
        store: Arc<dyn DocumentStore>,
        search: S,
        fetcher: F,
        chat: C,
        embed: E,
        vector_index: Arc<dyn VectorIndex>,
    ) -> Self {
        Self {
            store,
            search,
            fetcher,
            chat,
            embed,
            vector_index,
            language: "zh".to_string(),
            country: "cn".to_string(),
            request_timeout_seconds: 120,
        }
    }

    pub fn with_locale(mut self, language: impl Into<String>, country: impl Into<String>) -> Self {
        self.language = language.into();
        self.country = country.into();
        self
    }

    pub fn with_request_timeout_seconds(mut self, seconds: u64) -> Self {
        self.request_timeout_seconds = seconds;
        self
    }
}
