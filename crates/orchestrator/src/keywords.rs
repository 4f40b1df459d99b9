//! `extract_keywords` node (spec §4.9): one LM call returns
//! `"kw1,kw2,...|time_window"`; keywords are split, trimmed, capped at 3,
//! and the time window is validated against `{1d, 1w, 1m, 1y}`, defaulting
//! to `1w` on anything else (spec §8 "Boundary behaviours").

use newsagent_core::search::TimeWindow;
use newsagent_llm::{ChatMessage, ChatOptions, ChatPort};

/// Keywords are capped at this many per spec §4.9.
pub const MAX_KEYWORDS: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct KeywordExtraction {
    pub keywords: Vec<String>,
    pub time_window: TimeWindow,
}

fn parse_keyword_line(raw: &str) -> KeywordExtraction {
    let raw = raw.trim();
    let mut parts = raw.splitn(2, '|');
    let keyword_part = parts.next().unwrap_or("");
    let window_part = parts.next().unwrap_or("");

    let keywords = keyword_part
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .take(MAX_KEYWORDS)
        .map(String::from)
        .collect();

    KeywordExtraction { keywords, time_window: TimeWindow::parse_or_default(window_part) }
}

const EXTRACT_SYSTEM_PROMPT: &str = "Extract up to 3 search keywords and a time window from the \
    user's message. Reply with exactly one line in the form `kw1,kw2,kw3|time_window` where \
    time_window is one of 1d, 1w, 1m, 1y. No other text.";

/// `extract_keywords` node, used on the `准确搜索` path.
pub async fn extract_keywords<C: ChatPort>(chat: &C, message: &str) -> KeywordExtraction {
    let messages = vec![ChatMessage::system(EXTRACT_SYSTEM_PROMPT), ChatMessage::user(message)];
    match chat.chat(&messages, &ChatOptions::default()).await {
        Ok(completion) => parse_keyword_line(&completion.content),
        Err(e) => {
            tracing::warn!(error = %e, "extract_keywords: LM call failed, returning no keywords");
            KeywordExtraction { keywords: Vec::new(), time_window: TimeWindow::OneWeek }
        }
    }
}

const BROAD_SYSTEM_PROMPT: &str = "The user wants general news, with no specific topic named. \
    Name 2-3 broad news topics worth searching for today (e.g. politics, technology, markets) \
    and a time window. Reply with exactly one line in the form `kw1,kw2,kw3|time_window` where \
    time_window is one of 1d, 1w, 1m, 1y. No other text.";

/// Keyword+window extraction for the `含糊搜索` / `search_general` path: the
/// LM is asked for broad topics "today" rather than extracting from the
/// user's (topic-less) message.
pub async fn broad_keywords<C: ChatPort>(chat: &C) -> KeywordExtraction {
    let messages = vec![ChatMessage::system(BROAD_SYSTEM_PROMPT), ChatMessage::user("What's broadly newsworthy today?")];
    match chat.chat(&messages, &ChatOptions::default()).await {
        Ok(completion) => parse_keyword_line(&completion.content),
        Err(e) => {
            tracing::warn!(error = %e, "broad_keywords: LM call failed, returning no keywords");
            KeywordExtraction { keywords: Vec::new(), time_window: TimeWindow::OneDay }
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use newsagent_core::NewsAgentError;
    use newsagent_llm::ChatCompletion;

    use super::*;

    struct StubChat(&'static str);

    #[async_trait]
    impl ChatPort for StubChat {
        async fn chat(&self, _messages: &[ChatMessage], _options: &ChatOptions) -> Result<ChatCompletion, NewsAgentError> {
            Ok(ChatCompletion { content: self.0.to_string(), tokens_used: 1 })
        }
    }

    #[tokio::test]
    async fn splits_trims_and_caps_keywords() {
        let extraction = extract_keywords(&StubChat(" AI , chips , markets , extra |1d"), "m").await;
        assert_eq!(extraction.keywords, vec!["AI".to_string(), "chips".to_string(), "markets".to_string()]);
        assert_eq!(extraction.time_window, TimeWindow::OneDay);
    }

    #[tokio::test]
    async fn unknown_window_token_defaults_to_one_week() {
        let extraction = extract_keywords(&StubChat("ai|bogus"), "m").await;
        assert_eq!(extraction.time_window, TimeWindow::OneWeek);
    }

    #[tokio::test]
    async fn missing_window_separator_still_parses_keywords() {
        let extraction = extract_keywords(&StubChat("ai,chips"), "m").await;
        assert_eq!(extraction.keywords, vec!["ai".to_string(), "chips".to_string()]);
        assert_eq!(extraction.time_window, TimeWindow::OneWeek);
    }
}
