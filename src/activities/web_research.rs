//! Web Research Activity
//!
//! Breaks a topic into focused search queries (via chat), gathers context
//! for each (via web search), synthesizes the findings (via chat again),
//! and stores the result under `web_research` for downstream synthesis.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::activity::{Activity, ActivityResult, ActivitySpec};
use crate::context::SharedContext;
use crate::skills::{
    capability, ChatCompletionApi, SearchDepth, SearchOptions, WebSearchApi,
};

const DEFAULT_TOPIC: &str = "latest developments in artificial intelligence";

const QUERY_GEN_SYSTEM_PROMPT: &str = "You are a research assistant breaking a topic \
into specific search queries. Generate 3-5 focused queries, each targeting a \
different aspect of the topic. Respond with a JSON array of strings and nothing else.";

const SYNTHESIS_SYSTEM_PROMPT: &str = "You are a research assistant synthesizing \
information from multiple sources. Create a comprehensive but concise summary of the \
key findings: highlight the most important points, note conflicting information, and \
identify areas needing further research. Be factual and objective.";

const QUERY_GEN_MAX_TOKENS: usize = 200;
const SYNTHESIS_MAX_TOKENS: usize = 500;
const SEARCH_MAX_TOKENS: usize = 4000;

pub struct WebResearchActivity {
    chat: Arc<dyn ChatCompletionApi>,
    search: Arc<dyn WebSearchApi>,
}

impl WebResearchActivity {
    pub fn new(chat: Arc<dyn ChatCompletionApi>, search: Arc<dyn WebSearchApi>) -> Self {
        Self { chat, search }
    }

    pub fn spec() -> ActivitySpec {
        ActivitySpec::new("web_research", 0.4, Duration::from_secs(1800))
            .requires(capability::WEB_SEARCH)
            .requires(capability::CHAT)
    }

    /// Chat-generate focused queries; fall back to the topic itself when the
    /// response is not a usable JSON string array.
    async fn generate_queries(&self, topic: &str) -> Vec<String> {
        let prompt = format!(
            "Generate specific search queries to research this topic: {}",
            topic
        );

        let response = match self
            .chat
            .chat_completion(&prompt, QUERY_GEN_SYSTEM_PROMPT, QUERY_GEN_MAX_TOKENS)
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!("Query generation failed: {}", e);
                return vec![topic.to_string()];
            }
        };

        match parse_query_list(&response.content) {
            Some(queries) => queries,
            None => {
                warn!("Could not parse generated queries, using topic directly");
                vec![topic.to_string()]
            }
        }
    }

    async fn synthesize(&self, topic: &str, contexts: &[String]) -> Result<String, String> {
        let combined = contexts.join("\n---\n");
        let prompt = format!(
            "Synthesize the following research findings about '{}':\n\n{}",
            topic, combined
        );

        self.chat
            .chat_completion(&prompt, SYNTHESIS_SYSTEM_PROMPT, SYNTHESIS_MAX_TOKENS)
            .await
            .map(|c| c.content)
            .map_err(|e| e.to_string())
    }
}

fn parse_query_list(content: &str) -> Option<Vec<String>> {
    let trimmed = content.trim();
    // Tolerate a fenced code block around the array
    let stripped = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .map(|s| s.trim_end_matches("```").trim())
        .unwrap_or(trimmed);

    let queries: Vec<String> = serde_json::from_str(stripped).ok()?;
    if queries.is_empty() || queries.iter().any(|q| q.trim().is_empty()) {
        return None;
    }
    Some(queries)
}

#[async_trait]
impl Activity for WebResearchActivity {
    async fn execute(&self, ctx: &SharedContext) -> ActivityResult {
        let topic = ctx
            .category_value("activity", "research_topic")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_TOPIC)
            .to_string();
        info!("Starting web research on topic: {}", topic);

        let queries = self.generate_queries(&topic).await;
        info!("Generated {} search queries", queries.len());

        let options = SearchOptions {
            depth: SearchDepth::Advanced,
            topic: "general".to_string(),
            time_range: Some("month".to_string()),
            max_tokens: SEARCH_MAX_TOKENS,
        };

        let mut findings: Vec<Value> = Vec::new();
        let mut contexts: Vec<String> = Vec::new();
        for query in &queries {
            match self.search.search(query, &options).await {
                Ok(result) => {
                    contexts.push(result.context.clone());
                    findings.push(json!({
                        "query": query,
                        "content": result.context,
                    }));
                }
                Err(e) => warn!("Search failed for query '{}': {}", query, e),
            }
        }

        if contexts.is_empty() {
            return ActivityResult::error_result("Failed to gather any research data");
        }

        let synthesis = match self.synthesize(&topic, &contexts).await {
            Ok(s) => s,
            Err(e) => return ActivityResult::error_result(e),
        };

        ctx.memory()
            .store(
                "web_research",
                json!({
                    "topic": topic,
                    "queries": queries,
                    "findings": findings,
                    "synthesis": synthesis,
                    "timestamp": ctx.now().to_rfc3339(),
                }),
            )
            .await;

        ActivityResult::success_result(json!({
            "topic": topic,
            "queries": queries,
            "findings": findings,
            "synthesis": synthesis,
        }))
    }
}
