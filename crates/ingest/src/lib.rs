//! Ingestion Engine (spec §4.3): scope-dedup, keyword-set merge, stable IDs,
//! date normalization, eviction and refresh.

use std::time::Instant;

use serde_json::json;

use newsagent_core::article::{article_id, normalize_title, normalize_url};
use newsagent_core::date::{normalize_date, todays_date};
use newsagent_core::search::{IngestResult, IngestStatus, SearchRequest};
use newsagent_core::{Article, NewsAgentError};
use newsagent_fetch::ContentFetcher;
use newsagent_search::SearchPort;
use newsagent_store::collections::NEWS;
use newsagent_store::{DocumentStore, Filter};

const DEFAULT_EXPIRE_DAYS: i64 = 3;
/// Refresh batches keywords into groups of at most this size (spec §4.3).
const REFRESH_BATCH_SIZE: usize = 5;
/// Refresh never issues more than this many ingest batches (spec §4.3).
const REFRESH_MAX_BATCHES: usize = 3;

pub struct IngestionEngine<S, F> {
    search: S,
    fetcher: F,
    store: std::sync::Arc<dyn DocumentStore>,
}

impl<S, F> IngestionEngine<S, F>
where
    S: SearchPort,
    F: ContentFetcher,
{
    pub fn new(search: S, fetcher: F, store: std::sync::Arc<dyn DocumentStore>) -> Self {
        Self { search, fetcher, store }
    }

    /// Delete every article in `scope` whose date is older than
    /// `today - expire_days` (spec §4.3 "Eviction").
    pub async fn evict_expired(&self, scope: &str, expire_days: i64) -> Result<u64, NewsAgentError> {
        let today = newsagent_core::date::today_string(todays_date());
        let docs = self.store.find_many(NEWS, &Filter::new().eq("scope", scope), None, None).await?;

        let mut removed = 0u64;
        for doc in docs {
            let Some(id) = doc.get("_id").and_then(|v| v.as_str()) else { continue };
            let Some(date) = doc.get("date").and_then(|v| v.as_str()) else { continue };
            if is_stale(date, &today, expire_days) {
                self.store.delete_one(NEWS, &Filter::new().eq("_id", id)).await?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// `ingest(scope, keywords, search_params) -> IngestResult` (spec §4.3,
    /// §8: an empty keyword list is rejected before any write, including
    /// eviction).
    pub async fn ingest(&self, request: &SearchRequest) -> IngestResult {
        let started = Instant::now();

        if request.keywords.is_empty() {
            let mut result = IngestResult::empty(IngestStatus::ConfigMissing);
            result.elapsed_ms = started.elapsed().as_millis() as u64;
            return result;
        }

        if let Err(e) = self.evict_expired(&request.scope, DEFAULT_EXPIRE_DAYS).await {
            tracing::warn!(scope = %request.scope, error = %e, "evict_expired failed during ingest");
        }

        let raw = match self.search.search(request).await {
            Ok(raw) => raw,
            Err(NewsAgentError::ConfigMissing(_)) => {
                let mut result = IngestResult::empty(IngestStatus::ConfigMissing);
                result.elapsed_ms = started.elapsed().as_millis() as u64;
                return result;
            }
            Err(e) => {
                tracing::warn!(scope = %request.scope, error = %e, "search adapter failed during ingest");
                let mut result = IngestResult::empty(IngestStatus::UpstreamUnavailable);
                result.elapsed_ms = started.elapsed().as_millis() as u64;
                return result;
            }
        };

        let today = todays_date();
        let mut saved_ids = Vec::new();
        let mut updated_ids = Vec::new();

        for record in &raw {
            let title = normalize_title(&record.title);
            let url = normalize_url(&record.url);

            let existing = match self
                .store
                .find_one(NEWS, &Filter::new().eq("scope", request.scope.clone()).eq("title", title.clone()).eq("url", url.clone()))
                .await
            {
                Ok(existing) => existing,
                Err(e) => {
                    tracing::warn!(title = %title, error = %e, "lookup failed for ingest record, skipping");
                    continue;
                }
            };

            if let Some(existing_doc) = existing {
                let Some(id) = existing_doc.get("_id").and_then(|v| v.as_str()).map(String::from) else { continue };
                let mut article: Article = match serde_json::from_value(existing_doc) {
                    Ok(a) => a,
                    Err(_) => continue,
                };
                let grew = article.merge_keywords(request.keywords.iter().cloned());
                if grew {
                    let patch = json!({ "keywords": article.keywords });
                    if self.store.update_one(NEWS, &Filter::new().eq("_id", id.clone()), patch).await.unwrap_or(false) {
                        updated_ids.push(id);
                    }
                }
                continue;
            }

            let body = self.fetcher.fetch(&url).await;
            if body.is_empty() {
                continue;
            }

            let date = normalize_date(&record.date, today);
            let id = article_id(&title, &url, &request.scope);
            let mut article = Article::new(title, url, record.source.clone(), date, request.scope.clone());
            article.set_body(body);
            article.merge_keywords(request.keywords.iter().cloned());

            let mut doc = match serde_json::to_value(&article) {
                Ok(v) => v,
                Err(_) => continue,
            };
            doc["_id"] = json!(id.clone());

            if self.store.insert_one(NEWS, doc).await.is_ok() {
                saved_ids.push(id);
            }
        }

        IngestResult {
            found: raw.len() as u32,
            saved: saved_ids.len() as u32,
            updated: updated_ids.len() as u32,
            saved_ids,
            updated_ids,
            elapsed_ms: started.elapsed().as_millis() as u64,
            status: IngestStatus::Ok,
        }
    }

    /// Evict what is about to expire, collect its keyword union, and
    /// re-ingest in batches of at most [`REFRESH_BATCH_SIZE`] keywords,
    /// capped at [`REFRESH_MAX_BATCHES`] (spec §4.3 "Refresh").
    pub async fn refresh(&self, scope: &str, expire_days: i64) -> Vec<IngestResult> {
        let today = newsagent_core::date::today_string(todays_date());
        let docs = match self.store.find_many(NEWS, &Filter::new().eq("scope", scope), None, None).await {
            Ok(docs) => docs,
            Err(e) => {
                tracing::warn!(scope, error = %e, "refresh: failed to read articles");
                return Vec::new();
            }
        };

        let mut keywords = std::collections::BTreeSet::new();
        for doc in &docs {
            let Some(date) = doc.get("date").and_then(|v| v.as_str()) else { continue };
            if !is_stale(date, &today, expire_days) {
                continue;
            }
            if let Some(kws) = doc.get("keywords").and_then(|v| v.as_array()) {
                for kw in kws {
                    if let Some(kw) = kw.as_str() {
                        keywords.insert(kw.to_string());
                    }
                }
            }
        }

        if let Err(e) = self.evict_expired(scope, expire_days).await {
            tracing::warn!(scope, error = %e, "refresh: eviction failed");
        }

        let keywords: Vec<String> = keywords.into_iter().collect();
        let mut results = Vec::new();
        for batch in keywords.chunks(REFRESH_BATCH_SIZE).take(REFRESH_MAX_BATCHES) {
            let request = SearchRequest::new(
                scope.to_string(),
                batch.to_vec(),
                10,
                "en".to_string(),
                "us".to_string(),
                newsagent_core::search::TimeWindow::OneWeek,
                expire_days,
            );
            results.push(self.ingest(&request).await);
        }
        results
    }
}

fn is_stale(date: &str, today: &str, expire_days: i64) -> bool {
    use chrono::NaiveDate;
    let Ok(today_parsed) = NaiveDate::parse_from_str(today, "%Y-%m-%d") else { return false };
    let cutoff = today_parsed - chrono::Duration::days(expire_days);
    date < cutoff.format("%Y-%m-%d").to_string().as_str()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use newsagent_core::search::{RawArticle, TimeWindow};
    use newsagent_store::InMemoryDocumentStore;

    use super::*;

    struct StubSearch(Vec<RawArticle>);

    #[async_trait]
    impl SearchPort for StubSearch {
        async fn search(&self, _request: &SearchRequest) -> Result<Vec<RawArticle>, NewsAgentError> {
            Ok(self.0.clone())
        }
    }

    struct StubFetcher(&'static str);

    #[async_trait]
    impl ContentFetcher for StubFetcher {
        async fn fetch(&self, _url: &str) -> String {
            self.0.to_string()
        }
    }

    fn request(scope: &str) -> SearchRequest {
        SearchRequest::new(
            scope.to_string(),
            vec!["ai".into()],
            10,
            "en".into(),
            "us".into(),
            TimeWindow::OneWeek,
            3,
        )
    }

    #[tokio::test]
    async fn new_record_is_saved_with_body() {
        let store: Arc<dyn DocumentStore> = Arc::new(InMemoryDocumentStore::new());
        let search = StubSearch(vec![RawArticle {
            title: "  Big   News  ".into(),
            url: " https://x.example/a ".into(),
            source: "Wire".into(),
            snippet: "ai chips".into(),
            date: "2026-07-27".into(),
        }]);
        let engine = IngestionEngine::new(search, StubFetcher("a long enough body of article text"), store.clone());

        let result = engine.ingest(&request("s1")).await;
        assert_eq!(result.saved, 1);
        assert_eq!(result.updated, 0);
        assert_eq!(result.status, IngestStatus::Ok);

        let count = store.count(NEWS, &Filter::new().eq("scope", "s1")).await.unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn record_with_empty_body_is_skipped() {
        let store: Arc<dyn DocumentStore> = Arc::new(InMemoryDocumentStore::new());
        let search = StubSearch(vec![RawArticle {
            title: "Title".into(),
            url: "https://x.example/a".into(),
            source: "Wire".into(),
            snippet: String::new(),
            date: "2026-07-27".into(),
        }]);
        let engine = IngestionEngine::new(search, StubFetcher(""), store.clone());

        let result = engine.ingest(&request("s1")).await;
        assert_eq!(result.saved, 0);
        assert_eq!(store.count(NEWS, &Filter::new()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn duplicate_identity_merges_keywords_instead_of_resaving() {
        let store: Arc<dyn DocumentStore> = Arc::new(InMemoryDocumentStore::new());
        let search = StubSearch(vec![RawArticle {
            title: "Title".into(),
            url: "https://x.example/a".into(),
            source: "Wire".into(),
            snippet: "chips".into(),
            date: "2026-07-27".into(),
        }]);
        let engine = IngestionEngine::new(search, StubFetcher("enough text to count as a real body here"), store.clone());

        let first = engine.ingest(&request("s1")).await;
        assert_eq!(first.saved, 1);

        let second = engine.ingest(&request("s1")).await;
        assert_eq!(second.saved, 0);
        assert_eq!(second.updated, 1);
        assert_eq!(store.count(NEWS, &Filter::new().eq("scope", "s1")).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn evict_expired_removes_stale_articles_only() {
        let store = Arc::new(InMemoryDocumentStore::new());
        store
            .insert_one(NEWS, json!({"_id": "old", "scope": "s1", "date": "2020-01-01"}))
            .await
            .unwrap();
        store
            .insert_one(NEWS, json!({"_id": "new", "scope": "s1", "date": newsagent_core::date::today_string(todays_date())}))
            .await
            .unwrap();

        let engine = IngestionEngine::new(StubSearch(vec![]), StubFetcher(""), store.clone() as Arc<dyn DocumentStore>);
        let removed = engine.evict_expired("s1", 3).await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.count(NEWS, &Filter::new().eq("scope", "s1")).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn empty_keyword_list_is_rejected_with_no_writes() {
        let store: Arc<dyn DocumentStore> = Arc::new(InMemoryDocumentStore::new());
        store.insert_one(NEWS, json!({"_id": "old", "scope": "s1", "date": "2020-01-01"})).await.unwrap();

        let engine = IngestionEngine::new(StubSearch(vec![]), StubFetcher("a long enough body of article text"), store.clone());
        let empty_request =
            SearchRequest::new("s1".to_string(), Vec::new(), 10, "en".into(), "us".into(), TimeWindow::OneWeek, 3);
        let result = engine.ingest(&empty_request).await;

        assert_eq!(result.status, IngestStatus::ConfigMissing);
        assert_eq!(result.found, 0);
        assert_eq!(result.saved, 0);
        assert_eq!(store.count(NEWS, &Filter::new().eq("scope", "s1")).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn config_missing_short_circuits_with_status() {
        struct Unconfigured;
        #[async_trait]
        impl SearchPort for Unconfigured {
            async fn search(&self, _request: &SearchRequest) -> Result<Vec<RawArticle>, NewsAgentError> {
                Err(NewsAgentError::ConfigMissing("SEARCH_API_KEY".into()))
            }
        }
        let store: Arc<dyn DocumentStore> = Arc::new(InMemoryDocumentStore::new());
        let engine = IngestionEngine::new(Unconfigured, StubFetcher(""), store);
        let result = engine.ingest(&request("s1")).await;
        assert_eq!(result.status, IngestStatus::ConfigMissing);
        assert_eq!(result.found, 0);
    }
}
