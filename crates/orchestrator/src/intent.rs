//! Intent classification (spec §4.9): a fixed closed set of four classes,
//! classified by one LM call against a strict prompt. Invalid or unparseable
//! output defaults to `其它` rather than failing — the orchestrator's entry
//! node never hard-errors on a bad model response.

use newsagent_llm::{ChatMessage, ChatOptions, ChatPort};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// 准确搜索 — specific search with extractable keywords.
    PreciseSearch,
    /// 含糊搜索 — vague request, no specific keywords given.
    VagueSearch,
    /// 兴趣调整 — interest-profile edit.
    InterestEdit,
    /// 其它 — anything else.
    Other,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PreciseSearch => "准确搜索",
            Self::VagueSearch => "含糊搜索",
            Self::InterestEdit => "兴趣调整",
            Self::Other => "其它",
        }
    }

    /// Defaults to [`Intent::Other`] on anything that isn't exactly one of
    /// the four labels (spec §4.9 "invalid outputs default to 其它").
    pub fn parse_or_default(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.contains("准确搜索") {
            Self::PreciseSearch
        } else if trimmed.contains("含糊搜索") {
            Self::VagueSearch
        } else if trimmed.contains("兴趣调整") {
            Self::InterestEdit
        } else {
            Self::Other
        }
    }
}

const CLASSIFY_SYSTEM_PROMPT: &str = "You are an intent classifier for a news assistant. \
    Classify the user's message into exactly one of these four classes and reply with \
    nothing but the class label:\n\
    准确搜索 - the user names a specific topic, event, or entity to search news for\n\
    含糊搜索 - the user asks for news in general, without a specific topic\n\
    兴趣调整 - the user wants to add, remove, list, or change their interest tags\n\
    其它 - anything else (greetings, unrelated questions, unclear intent)\n\
    Reply with exactly one of: 准确搜索, 含糊搜索, 兴趣调整, 其它. No other text.";

/// `classify_intent` node (spec §4.9 entry node).
pub async fn classify_intent<C: ChatPort>(chat: &C, message: &str) -> Intent {
    let messages = vec![ChatMessage::system(CLASSIFY_SYSTEM_PROMPT), ChatMessage::user(message)];
    match chat.chat(&messages, &ChatOptions::default()).await {
        Ok(completion) => Intent::parse_or_default(&completion.content),
        Err(e) => {
            tracing::warn!(error = %e, "classify_intent: LM call failed, defaulting to 其它");
            Intent::Other
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

    struct FailingChat;

    #[async_trait]
    impl ChatPort for FailingChat {
        async fn chat(&self, _messages: &[ChatMessage], _options: &ChatOptions) -> Result<ChatCompletion, NewsAgentError> {
            Err(NewsAgentError::UpstreamUnavailable("down".into()))
        }
    }

    #[tokio::test]
    async fn recognizes_each_canonical_label() {
        assert_eq!(classify_intent(&StubChat("准确搜索"), "m").await, Intent::PreciseSearch);
        assert_eq!(classify_intent(&StubChat("含糊搜索"), "m").await, Intent::VagueSearch);
        assert_eq!(classify_intent(&StubChat("兴趣调整"), "m").await, Intent::InterestEdit);
        assert_eq!(classify_intent(&StubChat("其它"), "m").await, Intent::Other);
    }

    #[tokio::test]
    async fn garbled_output_defaults_to_other() {
        assert_eq!(classify_intent(&StubChat("I'm not sure"), "m").await, Intent::Other);
    }

    #[tokio::test]
    async fn failed_call_defaults_to_other() {
        assert_eq!(classify_intent(&FailingChat, "m").await, Intent::Other);
    }
}
