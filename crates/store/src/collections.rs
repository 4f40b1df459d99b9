//! Collection names recognized by the document datastore port (spec §6).

pub const NEWS: &str = "news";
pub const USERS: &str = "users";
pub const USER_SESSIONS: &str = "user_sessions";
pub const SESSION_MEMORY: &str = "session_memory";
pub const NEWS_EMBEDDINGS: &str = "news_embeddings";
pub const CONVERSATIONS: &str = "conversations";
pub const USER_PREFERENCES: &str = "user_preferences";
pub const SEARCH_HISTORY: &str = "search_history";
pub const API_LOGS: &str = "api_logs";
