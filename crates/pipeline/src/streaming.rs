//! Response streaming surface (spec §9 "Generators / streaming",
//! SPEC_FULL.md §2): a finite, single-consumer sequence of `start`,
//! `content`, then `complete`-or-`error` events, modeled the same way an
//! assistant reply is streamed token-by-token over an `mpsc::Sender<String>`
//! elsewhere in this codebase's lineage.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::Stream;

use newsagent_fetch::ContentFetcher;
use newsagent_llm::{ChatPort, EmbedPort};
use newsagent_search::SearchPort;

use crate::coordinator::PipelineCoordinator;
use crate::request::{PipelineMode, PipelineRequest};

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    Start,
    Content(String),
    Complete { quality_score: f64, memories_used: usize, news_retrieved: usize },
    Error(String),
}

/// Drives one `enhanced_chat` run and streams its lifecycle as
/// `Start -> Content -> Complete` (or `Error` in place of the latter two).
/// The request's mode is forced to `EnhancedChat` regardless of what the
/// caller set, since this is the only mode the streaming surface supports.
pub fn stream_enhanced_chat<S, F, C, E>(
    coordinator: Arc<PipelineCoordinator<S, F, C, E>>,
    mut request: PipelineRequest,
) -> impl Stream<Item = PipelineEvent>
where
    S: SearchPort + Clone + Send + Sync + 'static,
    F: ContentFetcher + Clone + Send + Sync + 'static,
    C: ChatPort + Clone + Send + Sync + 'static,
    E: EmbedPort + Clone + Send + Sync + 'static,
{
    request.mode = PipelineMode::EnhancedChat;
    let (tx, rx) = mpsc::channel(8);

    tokio::spawn(async move {
        if tx.send(PipelineEvent::Start).await.is_err() {
            return;
        }

        let response = coordinator.run(&request).await;

        if !response.chat.success {
            let message = response.chat.error.clone().unwrap_or_else(|| "enhanced chat failed".to_string());
            let _ = tx.send(PipelineEvent::Error(message)).await;
            return;
        }

        if tx.send(PipelineEvent::Content(response.response_text.clone())).await.is_err() {
            return;
        }

        let _ = tx
            .send(PipelineEvent::Complete {
                quality_score: response.quality_score,
                memories_used: response.memories_used,
                news_retrieved: response.news_retrieved,
            })
            .await;
    });

    ReceiverStream::new(rx)
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use tokio_stream::StreamExt;

    use newsagent_core::search::{RawArticle, SearchRequest};
    use newsagent_core::NewsAgentError;
    use newsagent_llm::{ChatCompletion, ChatMessage, ChatOptions};
    use newsagent_store::InMemoryDocumentStore;
    use newsagent_vectorindex::{InMemoryVectorIndex, VectorIndex};

    use super::*;
    use crate::services::Services;

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
    struct StubChat;
    #[async_trait]
    impl ChatPort for StubChat {
        async fn chat(&self, _messages: &[ChatMessage], _options: &ChatOptions) -> Result<ChatCompletion, NewsAgentError> {
            Ok(ChatCompletion { content: "a streamed reply".to_string(), tokens_used: 3 })
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

    #[tokio::test]
    async fn enhanced_chat_stream_emits_start_content_complete() {
        let store: Arc<dyn newsagent_store::DocumentStore> = Arc::new(InMemoryDocumentStore::new());
        let vector_index: Arc<dyn VectorIndex> = Arc::new(InMemoryVectorIndex::new(StubEmbed));
        let services = Services::new(store, StubSearch, StubFetcher, StubChat, StubEmbed, vector_index);
        let coordinator = Arc::new(PipelineCoordinator::new(services));

        let request = PipelineRequest::new("s1", "hi", PipelineMode::EnhancedChat).with_user("u1");
        let mut events: Vec<PipelineEvent> = stream_enhanced_chat(coordinator, request).collect().await;

        assert_eq!(events.remove(0), PipelineEvent::Start);
        assert!(matches!(events.remove(0), PipelineEvent::Content(_)));
        assert!(matches!(events.remove(0), PipelineEvent::Complete { .. }));
        assert!(events.is_empty());
    }
}
