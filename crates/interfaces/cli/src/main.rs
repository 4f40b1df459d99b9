//! Demo binary for the news-intelligence pipeline (SPEC_FULL.md §0): loads
//! `AppConfig`, builds a `Services` bundle (spec §9 "Global state" — no
//! module-level singletons), drives one pipeline request end-to-end, and
//! prints the response as JSON.
//!
//! `spec.md` places CLI/TUI front-ends out of scope, so this crate stays
//! thin: one subcommand, no REPL, no session management UI.

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use newsagent_config::AppConfig;
use newsagent_fetch::HttpContentFetcher;
use newsagent_llm::{HttpChatClient, HttpEmbedClient};
use newsagent_pipeline::{CustomFlags, PipelineCoordinator, PipelineLimits, PipelineMode, PipelineRequest, Services};
use newsagent_search::HttpSearchAdapter;
use newsagent_store::{DocumentStore, InMemoryDocumentStore};
use newsagent_vectorindex::{InMemoryVectorIndex, VectorIndex};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliMode {
    EnhancedChat,
    RagAnalysis,
    CardGeneration,
    UnifiedComplete,
    Custom,
}

#[derive(Debug, Parser)]
#[command(name = "newsagent", version, about = "Personalized news-intelligence pipeline demo")]
struct Cli {
    /// Session (scope) ID. Articles and transcripts are owned by this scope.
    #[arg(long, default_value = "demo-session")]
    session: String,

    /// User ID. Required for enhanced_chat and unified_complete.
    #[arg(long)]
    user: Option<String>,

    /// The natural-language message to run through the pipeline.
    message: String,

    /// Which pipeline mode to dispatch (spec §4.11).
    #[arg(long, value_enum, default_value = "unified-complete")]
    mode: CliMode,

    /// For --mode custom: include the rag sub-feature.
    #[arg(long)]
    custom_rag: bool,
    /// For --mode custom: include the cards sub-feature.
    #[arg(long)]
    custom_cards: bool,
    /// For --mode custom: include the chat sub-feature.
    #[arg(long)]
    custom_chat: bool,

    #[arg(long, default_value_t = 5)]
    max_related: usize,
    #[arg(long, default_value_t = 3)]
    max_cards: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let cli = Cli::parse();
    let config = AppConfig::load_from("config/default.toml")?;

    let store: Arc<dyn DocumentStore> = Arc::new(InMemoryDocumentStore::new());
    let search = HttpSearchAdapter::new("https://serpapi.com/search", config.search.api_key.clone());
    let fetcher = HttpContentFetcher::new();
    let chat = HttpChatClient::new(config.llm_chat.base_url.clone(), config.llm_chat.api_key.clone().unwrap_or_default(), config.llm_chat.model.clone());
    let embed = HttpEmbedClient::new(
        config.llm_chat.base_url.clone(),
        config.llm_chat.api_key.clone().unwrap_or_default(),
        config.llm_embed.model.clone(),
        config.llm_embed.dimension,
    );
    let vector_index: Arc<dyn VectorIndex> = Arc::new(InMemoryVectorIndex::new(embed.clone()));

    let services = Services::new(store, search, fetcher, chat, embed, vector_index)
        .with_request_timeout_seconds(config.pipeline.request_timeout_seconds);
    let coordinator = PipelineCoordinator::new(services);

    let mode = match cli.mode {
        CliMode::EnhancedChat => PipelineMode::EnhancedChat,
        CliMode::RagAnalysis => PipelineMode::RagAnalysis,
        CliMode::CardGeneration => PipelineMode::CardGeneration,
        CliMode::UnifiedComplete => PipelineMode::UnifiedComplete,
        CliMode::Custom => PipelineMode::Custom(CustomFlags { rag: cli.custom_rag, cards: cli.custom_cards, chat: cli.custom_chat }),
    };

    let mut request = PipelineRequest::new(cli.session, cli.message, mode).with_limits(PipelineLimits { max_related: cli.max_related, max_cards: cli.max_cards });
    if let Some(user) = cli.user {
        request = request.with_user(user);
    }

    let response = coordinator.run(&request).await;
    println!("{}", serde_json::to_string_pretty(&response_json(&response))?);
    Ok(())
}

/// The pipeline response carries no `Serialize` impl of its own (it holds
/// `Card`, which does derive one) — project it into JSON directly rather
/// than adding a derive that only this binary would use.
fn response_json(response: &newsagent_pipeline::PipelineResponse) -> serde_json::Value {
    serde_json::json!({
        "success": response.success,
        "response_text": response.response_text,
        "chat": feature_json(&response.chat),
        "rag": feature_json(&response.rag),
        "cards": feature_json(&response.cards),
        "news_retrieved": response.news_retrieved,
        "cards_generated": response.cards_generated,
        "memories_used": response.memories_used,
        "related_news": response.related_news,
        "card_data": response.card_data,
        "quality_score": response.quality_score,
        "context_relevance_score": response.context_relevance_score,
        "total_time_ms": response.total_time_ms,
    })
}

fn feature_json(report: &newsagent_pipeline::FeatureReport) -> serde_json::Value {
    serde_json::json!({
        "enabled": report.enabled,
        "success": report.success,
        "time_ms": report.time_ms,
        "error": report.error,
    })
}
