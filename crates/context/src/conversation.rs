//! Conversation Context (spec §3, §4.10): per-session topic tracking —
//! current topic, discussed topics, mentioned entities, outstanding
//! questions. Created on first message, updated after each turn, evicted
//! with the session.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use newsagent_core::NewsAgentError;
use newsagent_store::collections::CONVERSATIONS;
use newsagent_store::{DocumentStore, Filter};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ConversationContext {
    pub current_topic: Option<String>,
    pub discussed_topics: Vec<String>,
    pub mentioned_entities: Vec<String>,
    pub outstanding_questions: Vec<String>,
    pub message_count: u32,
    pub last_updated: Option<DateTime<Utc>>,
}

pub struct ConversationContextStore {
    store: Arc<dyn DocumentStore>,
}

impl ConversationContextStore {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn get(&self, session: &str) -> Result<Option<ConversationContext>, NewsAgentError> {
        let doc = self.store.find_one(CONVERSATIONS, &Filter::new().eq("_id", session)).await?;
        Ok(doc.and_then(|d| serde_json::from_value(d).ok()))
    }

    /// Apply an update to the session's context, creating it on first use.
    /// Each `Some` field replaces its prior value; `None` leaves it as-is.
    /// `discussed_topics` and `mentioned_entities` are unioned (deduplicated),
    /// not replaced, so a session's known topics/entities only grow.
    pub async fn update(
        &self,
        session: &str,
        topic: Option<String>,
        new_topics: Vec<String>,
        new_entities: Vec<String>,
        outstanding_questions: Option<Vec<String>>,
    ) -> Result<ConversationContext, NewsAgentError> {
        let mut context = self.get(session).await?.unwrap_or_default();

        if topic.is_some() {
            context.current_topic = topic;
        }
        for t in new_topics {
            if !context.discussed_topics.iter().any(|existing| existing == &t) {
                context.discussed_topics.push(t);
            }
        }
        for e in new_entities {
            if !context.mentioned_entities.iter().any(|existing| existing == &e) {
                context.mentioned_entities.push(e);
            }
        }
        if let Some(questions) = outstanding_questions {
            context.outstanding_questions = questions;
        }
        context.message_count += 1;
        context.last_updated = Some(Utc::now());

        let mut doc = serde_json::to_value(&context).unwrap_or_else(|_| json!({}));
        doc["_id"] = json!(session);
        let filter = Filter::new().eq("_id", session);
        if !self.store.update_one(CONVERSATIONS, &filter, doc.clone()).await? {
            self.store.insert_one(CONVERSATIONS, doc).await?;
        }
        Ok(context)
    }

    pub async fn clear(&self, session: &str) -> Result<(), NewsAgentError> {
        self.store.delete_one(CONVERSATIONS, &Filter::new().eq("_id", session)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_update_creates_context_with_count_one() {
        let store = ConversationContextStore::new(Arc::new(newsagent_store::InMemoryDocumentStore::new()));
        let ctx = store
            .update("s1", Some("ai policy".into()), vec!["ai policy".into()], vec!["OpenAI".into()], None)
            .await
            .unwrap();
        assert_eq!(ctx.current_topic.as_deref(), Some("ai policy"));
        assert_eq!(ctx.message_count, 1);
        assert_eq!(ctx.discussed_topics, vec!["ai policy".to_string()]);
    }

    #[tokio::test]
    async fn discussed_topics_and_entities_accumulate_without_duplicates() {
        let store = ConversationContextStore::new(Arc::new(newsagent_store::InMemoryDocumentStore::new()));
        store.update("s1", None, vec!["ai".into()], vec!["OpenAI".into()], None).await.unwrap();
        let ctx = store.update("s1", None, vec!["ai".into(), "chips".into()], vec!["OpenAI".into(), "Nvidia".into()], None).await.unwrap();

        assert_eq!(ctx.discussed_topics, vec!["ai".to_string(), "chips".to_string()]);
        assert_eq!(ctx.mentioned_entities, vec!["OpenAI".to_string(), "Nvidia".to_string()]);
        assert_eq!(ctx.message_count, 2);
    }

    #[tokio::test]
    async fn clear_removes_session_context() {
        let store = ConversationContextStore::new(Arc::new(newsagent_store::InMemoryDocumentStore::new()));
        store.update("s1", Some("topic".into()), vec![], vec![], None).await.unwrap();
        store.clear("s1").await.unwrap();
        assert!(store.get("s1").await.unwrap().is_none());
    }
}
