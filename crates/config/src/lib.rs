use std::env;
use std::fs;
use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Upstream news search port configuration (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Absent → the adapter returns an error status rather than calling out.
    pub api_key: Option<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { api_key: None }
    }
}

impl SearchConfig {
    pub fn is_enabled(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }
}

/// Language-model chat port configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmChatConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

impl Default for LlmChatConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }
}

impl LlmChatConfig {
    pub fn is_enabled(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }
}

/// Language-model embedding port configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmEmbedConfig {
    pub model: String,
    pub dimension: usize,
}

impl Default for LlmEmbedConfig {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-small".to_string(),
            dimension: 1536,
        }
    }
}

/// Document datastore + cache port configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub db_url: String,
    pub db_name: String,
    pub cache_url: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_url: "memory://local".to_string(),
            db_name: "newsagent".to_string(),
            cache_url: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub default_expire_days: i64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self { default_expire_days: 3 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 512,
            chunk_overlap: 100,
            batch_size: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub batch_max_concurrent: usize,
    pub request_timeout_seconds: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_max_concurrent: 5,
            request_timeout_seconds: 120,
        }
    }
}

impl PipelineConfig {
    /// Hard cap named in spec §6 — never honour a config value above it.
    pub const MAX_BATCH_CONCURRENT: usize = 10;

    pub fn effective_batch_concurrency(&self) -> usize {
        self.batch_max_concurrent.min(Self::MAX_BATCH_CONCURRENT)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub search: SearchConfig,
    pub llm_chat: LlmChatConfig,
    pub llm_embed: LlmEmbedConfig,
    pub store: StoreConfig,
    pub ingest: IngestConfig,
    pub embedding: EmbeddingConfig,
    pub pipeline: PipelineConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    /// Load defaults, overlay a TOML file if present, then overlay
    /// environment variables (spec §6) — env always wins, matching the
    /// precedence the teacher's config crate gives `OLLAMA_BASE_URL`.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let mut config = Self::default();
        if let Ok(raw) = fs::read_to_string(path) {
            config = toml::from_str(&raw)?;
        }
        config.apply_env();
        Ok(config)
    }

    /// Same as [`Self::load_from`] but without a file, for the common case
    /// of configuring purely via environment (and in tests).
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    fn apply_env(&mut self) {
        if let Ok(v) = env::var("SEARCH_API_KEY") {
            self.search.api_key = Some(v);
        }
        if let Ok(v) = env::var("LM_CHAT_KEY") {
            self.llm_chat.api_key = Some(v);
        }
        if let Ok(v) = env::var("LM_CHAT_MODEL") {
            self.llm_chat.model = v;
        }
        if let Ok(v) = env::var("LM_CHAT_BASE_URL") {
            self.llm_chat.base_url = v;
        }
        if let Ok(v) = env::var("LM_EMBED_MODEL") {
            self.llm_embed.model = v;
        }
        if let Ok(v) = env::var("LM_EMBED_DIMENSION") {
            if let Ok(dim) = v.parse() {
                self.llm_embed.dimension = dim;
            }
        }
        if let Ok(v) = env::var("DB_URL") {
            self.store.db_url = v;
        }
        if let Ok(v) = env::var("DB_NAME") {
            self.store.db_name = v;
        }
        if let Ok(v) = env::var("CACHE_URL") {
            self.store.cache_url = Some(v);
        }
        if let Ok(v) = env::var("NEWS_DEFAULT_EXPIRE_DAYS") {
            if let Ok(days) = v.parse() {
                self.ingest.default_expire_days = days;
            }
        }
        if let Ok(v) = env::var("EMBEDDING_CHUNK_SIZE") {
            if let Ok(n) = v.parse() {
                self.embedding.chunk_size = n;
            }
        }
        if let Ok(v) = env::var("EMBEDDING_CHUNK_OVERLAP") {
            if let Ok(n) = v.parse() {
                self.embedding.chunk_overlap = n;
            }
        }
        if let Ok(v) = env::var("EMBEDDING_BATCH_SIZE") {
            if let Ok(n) = v.parse() {
                self.embedding.batch_size = n;
            }
        }
        if let Ok(v) = env::var("PIPELINE_BATCH_MAX_CONCURRENT") {
            if let Ok(n) = v.parse() {
                self.pipeline.batch_max_concurrent = n;
            }
        }
        if let Ok(v) = env::var("PIPELINE_REQUEST_TIMEOUT_SECONDS") {
            if let Ok(n) = v.parse() {
                self.pipeline.request_timeout_seconds = n;
            }
        }
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }

        let rendered = toml::to_string_pretty(self)?;
        fs::write(path, rendered)?;
        Ok(())
    }
}
