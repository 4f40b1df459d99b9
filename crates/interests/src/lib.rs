//! Interest Store (spec §4.7): per-user tag set with add/remove/clear and a
//! semantic `related` query, LM-assisted with a keyword-map fallback.

use std::sync::Arc;

use serde_json::json;

use newsagent_core::NewsAgentError;
use newsagent_llm::{ChatMessage, ChatOptions, ChatPort};
use newsagent_store::collections::USERS;
use newsagent_store::{DocumentStore, Filter};

/// On add, interests beyond this count are truncated, keeping the most
/// recent (spec §4.7 "Cap").
pub const MAX_INTERESTS: usize = 20;

/// Domain → related-keyword table used when the language model is
/// unavailable or declines to answer (spec §4.7 step 3). Translated from
/// the original's transport/sports/technology/... table.
const FALLBACK_TABLE: &[(&str, &[&str])] = &[
    ("transport", &["transport", "subway", "metro", "train", "railway", "高铁", "地铁", "火车"]),
    ("sports", &["sports", "football", "basketball", "soccer", "olympics"]),
    ("technology", &["technology", "ai", "chips", "software", "internet"]),
    ("entertainment", &["entertainment", "movies", "music", "celebrity"]),
    ("finance", &["finance", "stocks", "economy", "markets", "banking"]),
    ("health", &["health", "medicine", "wellness", "fitness"]),
];

pub struct InterestStore<C> {
    store: Arc<dyn DocumentStore>,
    chat: Option<C>,
}

impl<C: ChatPort> InterestStore<C> {
    pub fn new(store: Arc<dyn DocumentStore>, chat: Option<C>) -> Self {
        Self { store, chat }
    }

    pub async fn get(&self, user: &str) -> Result<Vec<String>, NewsAgentError> {
        let doc = self.store.find_one(USERS, &Filter::new().eq("_id", user)).await?;
        Ok(read_interests(doc.as_ref()))
    }

    /// Unions `tags` into the user's interest set, then truncates to the
    /// most recent [`MAX_INTERESTS`] in insertion order.
    pub async fn add(&self, user: &str, tags: Vec<String>) -> Result<Vec<String>, NewsAgentError> {
        let mut interests = self.get(user).await?;
        for tag in tags {
            if !interests.iter().any(|existing| existing == &tag) {
                interests.push(tag);
            }
        }
        if interests.len() > MAX_INTERESTS {
            let overflow = interests.len() - MAX_INTERESTS;
            interests.drain(0..overflow);
        }
        self.write_interests(user, &interests).await?;
        Ok(interests)
    }

    pub async fn remove(&self, user: &str, tags: &[String]) -> Result<Vec<String>, NewsAgentError> {
        let mut interests = self.get(user).await?;
        interests.retain(|existing| !tags.iter().any(|t| t == existing));
        self.write_interests(user, &interests).await?;
        Ok(interests)
    }

    pub async fn clear(&self, user: &str) -> Result<(), NewsAgentError> {
        self.write_interests(user, &[]).await
    }

    /// `related(user, keyword) -> [tag]` (spec §4.7). Tries an LM-driven
    /// semantic match first, validated against the real interest list to
    /// rule out hallucinated tags; falls back to [`FALLBACK_TABLE`] when the
    /// model is unavailable, fails, or returns nothing usable.
    pub async fn related(&self, user: &str, keyword: &str) -> Result<Vec<String>, NewsAgentError> {
        let interests = self.get(user).await?;
        if interests.is_empty() {
            return Ok(Vec::new());
        }

        if let Some(chat) = &self.chat {
            match self.related_via_llm(chat, &interests, keyword).await {
                Ok(matches) if !matches.is_empty() => return Ok(matches),
                Ok(_) => {}
                Err(e) => tracing::warn!(user, keyword, error = %e, "related: LM call failed, falling back"),
            }
        }

        Ok(fallback_related(&interests, keyword))
    }

    async fn related_via_llm(
        &self,
        chat: &C,
        interests: &[String],
        keyword: &str,
    ) -> Result<Vec<String>, NewsAgentError> {
        let prompt = format!(
            "Interests: {}\nKeyword: {}\nReturn a comma-separated subset of the interests that are semantically related to the keyword. Reply with nothing else.",
            interests.join(", "),
            keyword
        );
        let messages = vec![ChatMessage::user(prompt)];
        let completion = chat.chat(&messages, &ChatOptions::default()).await?;

        Ok(completion
            .content
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .filter_map(|candidate| {
                interests.iter().find(|actual| case_insensitive_substring_match(actual, candidate)).cloned()
            })
            .collect())
    }

    async fn write_interests(&self, user: &str, interests: &[String]) -> Result<(), NewsAgentError> {
        let filter = Filter::new().eq("_id", user);
        let patch = json!({ "interests": interests });
        if !self.store.update_one(USERS, &filter, patch.clone()).await? {
            let mut doc = patch;
            doc["_id"] = json!(user);
            self.store.insert_one(USERS, doc).await?;
        }
        Ok(())
    }
}

fn read_interests(doc: Option<&serde_json::Value>) -> Vec<String> {
    doc.and_then(|d| d.get("interests"))
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_str().map(String::from)).collect())
        .unwrap_or_default()
}

/// Validation step guarding against hallucinated tags: `candidate` counts
/// as a match only if it or `actual` contains the other, case-insensitive.
fn case_insensitive_substring_match(actual: &str, candidate: &str) -> bool {
    let actual_lower = actual.to_lowercase();
    let candidate_lower = candidate.to_lowercase();
    actual_lower.contains(&candidate_lower) || candidate_lower.contains(&actual_lower)
}

fn fallback_related(interests: &[String], keyword: &str) -> Vec<String> {
    let keyword_lower = keyword.to_lowercase();
    let mut synonyms: Vec<&str> = vec![];

    for (_domain, words) in FALLBACK_TABLE {
        if words.iter().any(|w| keyword_lower.contains(&w.to_lowercase())) {
            synonyms.extend(words.iter().copied());
        }
    }

    interests
        .iter()
        .filter(|interest| {
            let interest_lower = interest.to_lowercase();
            interest_lower.contains(&keyword_lower)
                || keyword_lower.contains(&interest_lower)
                || synonyms.iter().any(|s| interest_lower.contains(&s.to_lowercase()))
        })
        .cloned()
        .collect()
}
