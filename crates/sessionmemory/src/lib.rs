//! Session Memory Store (spec §4.8): per-session rolling transcript bounded
//! to the last 10 turns, plus a free-form user-context blob.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use newsagent_core::NewsAgentError;
use newsagent_store::collections::SESSION_MEMORY;
use newsagent_store::{DocumentStore, Filter};

/// History is truncated to the most recent this-many entries on every save
/// (spec §4.8).
pub const MAX_HISTORY_TURNS: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Turn {
    pub ts: String,
    pub user: String,
    pub assistant: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SessionMemory {
    pub conversation_history: Vec<Turn>,
    pub user_context: Value,
}

pub struct SessionMemoryStore {
    store: Arc<dyn DocumentStore>,
}

impl SessionMemoryStore {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn get(&self, session: &str) -> Result<Option<SessionMemory>, NewsAgentError> {
        let doc = self.store.find_one(SESSION_MEMORY, &Filter::new().eq("_id", session)).await?;
        Ok(doc.map(|d| serde_json::from_value(d).unwrap_or_default()))
    }

    /// Appends `turn`, truncates history to [`MAX_HISTORY_TURNS`], and
    /// replaces `user_context` wholesale when `user_context` is `Some`.
    pub async fn save(
        &self,
        session: &str,
        turn: Option<Turn>,
        user_context: Option<Value>,
    ) -> Result<SessionMemory, NewsAgentError> {
        let mut memory = self.get(session).await?.unwrap_or_default();

        if let Some(turn) = turn {
            memory.conversation_history.push(turn);
            if memory.conversation_history.len() > MAX_HISTORY_TURNS {
                let overflow = memory.conversation_history.len() - MAX_HISTORY_TURNS;
                memory.conversation_history.drain(0..overflow);
            }
        }
        if let Some(context) = user_context {
            memory.user_context = context;
        }

        let mut doc = serde_json::to_value(&memory).unwrap_or_else(|_| json!({}));
        doc["_id"] = json!(session);

        let filter = Filter::new().eq("_id", session);
        if !self.store.update_one(SESSION_MEMORY, &filter, doc.clone()).await? {
            self.store.insert_one(SESSION_MEMORY, doc).await?;
        }
        Ok(memory)
    }

    pub async fn clear(&self, session: &str) -> Result<(), NewsAgentError> {
        self.store.delete_one(SESSION_MEMORY, &Filter::new().eq("_id", session)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use newsagent_store::InMemoryDocumentStore;

    use super::*;

    fn turn(i: usize) -> Turn {
        Turn { ts: format!("t{i}"), user: format!("u{i}"), assistant: format!("a{i}") }
    }

    #[tokio::test]
    async fn get_on_unknown_session_returns_none() {
        let sessions = SessionMemoryStore::new(Arc::new(InMemoryDocumentStore::new()));
        assert!(sessions.get("s1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_appends_and_reads_back() {
        let sessions = SessionMemoryStore::new(Arc::new(InMemoryDocumentStore::new()));
        sessions.save("s1", Some(turn(0)), None).await.unwrap();
        sessions.save("s1", Some(turn(1)), None).await.unwrap();

        let memory = sessions.get("s1").await.unwrap().unwrap();
        assert_eq!(memory.conversation_history.len(), 2);
        assert_eq!(memory.conversation_history[1].user, "u1");
    }

    #[tokio::test]
    async fn history_is_truncated_to_max_turns() {
        let sessions = SessionMemoryStore::new(Arc::new(InMemoryDocumentStore::new()));
        for i in 0..15 {
            sessions.save("s1", Some(turn(i)), None).await.unwrap();
        }
        let memory = sessions.get("s1").await.unwrap().unwrap();
        assert_eq!(memory.conversation_history.len(), MAX_HISTORY_TURNS);
        assert_eq!(memory.conversation_history[0].user, "u5");
        assert_eq!(memory.conversation_history.last().unwrap().user, "u14");
    }

    #[tokio::test]
    async fn user_context_replaces_wholesale() {
        let sessions = SessionMemoryStore::new(Arc::new(InMemoryDocumentStore::new()));
        sessions.save("s1", None, Some(json!({"topic": "ai"}))).await.unwrap();
        sessions.save("s1", None, Some(json!({"topic": "markets"}))).await.unwrap();

        let memory = sessions.get("s1").await.unwrap().unwrap();
        assert_eq!(memory.user_context, json!({"topic": "markets"}));
    }

    #[tokio::test]
    async fn clear_removes_the_session() {
        let sessions = SessionMemoryStore::new(Arc::new(InMemoryDocumentStore::new()));
        sessions.save("s1", Some(turn(0)), None).await.unwrap();
        sessions.clear("s1").await.unwrap();
        assert!(sessions.get("s1").await.unwrap().is_none());
    }
}
