pub mod chat;
pub mod embed;
pub mod json;

pub use chat::{ChatCompletion, ChatMessage, ChatOptions, ChatPort, ChatRole, HttpChatClient};
pub use embed::{EmbedPort, HttpEmbedClient};
pub use json::extract_json_output;
