//! Agent Orchestrator (spec §4.9): intent classification plus the four
//! routed subflows, wired into a single state graph over the other
//! component crates.

pub mod intent;
pub mod interests_plan;
pub mod keywords;
pub mod orchestrator;

pub use intent::{classify_intent, Intent};
pub use interests_plan::{parse_plan, parse_plan_line, InterestOp, InterestOutcome};
pub use keywords::{broad_keywords, extract_keywords, KeywordExtraction};
pub use orchestrator::{AgentOrchestrator, AgentRequest, AgentResponse, OrchestratorConfig};
