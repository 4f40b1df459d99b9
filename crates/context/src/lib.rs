//! Conversation Context Manager (spec §4.10): a per-user memory profile
//! with similarity-weighted retrieval, plus per-session conversation
//! context (current topic, discussed topics, mentioned entities). Fuses
//! both into a single bundle for prompt construction via
//! `get_relevant_context`.

pub mod conversation;
pub mod profile;

pub use conversation::{ConversationContext, ConversationContextStore};
pub use profile::{
    AnalysisDepth, ContextBundle, ContextManager, MemoryItem, MemoryQuery, MemoryType,
    ResponseFormat, ResponseStyle, UserMemoryProfile, MAX_MEMORIES, RETENTION_DAYS,
    SIMILARITY_FLOOR,
};
