pub mod fractional;
pub mod threshold;

pub use fractional::{FractionalAgent, FractionalFinding};
pub use threshold::{ThresholdAgent, ThresholdFinding};

use tracing::info;

use crate::error::{ParseError, ResearchError};
use crate::llm::ResearchApi;

pub trait Agent {
    fn name(&self) -> &str;
    fn system_prompt(&self) -> &str;
}

/// Sends one query on behalf of `agent`.
pub async fn ask(
    agent: &(dyn Agent + Sync),
    research: &dyn ResearchApi,
    query: &str,
) -> Result<String, ResearchError> {
    info!("🤖 [AGENT] Sending request to {}...", agent.name());
    let response = research.research(agent.system_prompt(), query).await?;
    info!("🤖 [AGENT] Response from {}: {}", agent.name(), response.trim());
    Ok(response)
}

/// Pulls the outermost `{...}` object out of a model response and parses it.
pub(crate) fn extract_json(response: &str) -> Result<serde_json::Value, ParseError> {
    let start = response.find('{');
    let end = response.rfind('}');
    let json_str = match (start, end) {
        (Some(s), Some(e)) if s < e => &response[s..=e],
        _ => return Err(ParseError::Response(truncate(response))),
    };
    serde_json::from_str::<serde_json::Value>(json_str)
        .ok()
        .filter(|v| v.is_object())
        .ok_or_else(|| ParseError::Response(truncate(response)))
}

fn truncate(text: &str) -> String {
    text.trim().chars().take(120).collect()
}
