//! Web Search Skill
//!
//! Tavily search client behind the [`WebSearchApi`] seam, returning a
//! joined context string sized for prompt consumption rather than raw
//! result pages.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

use super::{capability, SkillError, SkillRegistry, WebSearchApi};

const TAVILY_API_URL: &str = "https://api.tavily.com/search";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
// Rough prompt-budget conversion used when trimming context
const CHARS_PER_TOKEN: usize = 4;

/// Search depth accepted by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchDepth {
    Basic,
    Advanced,
}

impl SearchDepth {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Advanced => "advanced",
        }
    }
}

/// Knobs for one search call.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub depth: SearchDepth,
    pub topic: String,
    /// e.g. "day", "week", "month", "year"
    pub time_range: Option<String>,
    /// Budget for the returned context
    pub max_tokens: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            depth: SearchDepth::Basic,
            topic: "general".to_string(),
            time_range: None,
            max_tokens: 8000,
        }
    }
}

/// Search output: a context string plus the options that produced it.
#[derive(Debug, Clone)]
pub struct SearchContext {
    pub context: String,
    pub used_config: SearchOptions,
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    search_depth: &'a str,
    topic: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    time_range: Option<&'a str>,
    include_answer: bool,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    results: Vec<SearchResultItem>,
}

#[derive(Debug, Deserialize)]
struct SearchResultItem {
    title: String,
    url: String,
    content: String,
}

/// Web search skill backed by Tavily.
#[derive(Clone)]
pub struct WebSearchSkill {
    client: Client,
    api_key: Option<String>,
    registry: SkillRegistry,
    initialized: Arc<AtomicBool>,
}

impl WebSearchSkill {
    pub fn new(api_key: Option<&str>, registry: SkillRegistry) -> Self {
        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
            api_key: api_key.map(|s| s.to_string()),
            registry,
            initialized: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Declare the capability and flip it ready when an API key is present.
    pub async fn initialize(&self) -> bool {
        self.registry.register(capability::WEB_SEARCH).await;

        if self.api_key.is_none() {
            error!("No Tavily API key found; web_search capability stays down");
            return false;
        }

        self.initialized.store(true, Ordering::Relaxed);
        self.registry.set_ready(capability::WEB_SEARCH, true).await;
        info!("Web search skill initialized");
        true
    }

    fn build_context(response: SearchResponse, max_tokens: usize) -> String {
        let mut parts = Vec::new();

        if let Some(answer) = response.answer {
            if !answer.is_empty() {
                parts.push(answer);
            }
        }

        for item in response.results {
            parts.push(format!("{} ({})\n{}", item.title, item.url, item.content));
        }

        truncate_chars(&parts.join("\n---\n"), max_tokens * CHARS_PER_TOKEN)
    }
}

fn truncate_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    s.chars().take(max_chars).collect()
}

#[async_trait]
impl WebSearchApi for WebSearchSkill {
    async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<SearchContext, SkillError> {
        if !self.initialized.load(Ordering::Relaxed) {
            return Err(SkillError::NotInitialized(
                capability::WEB_SEARCH.to_string(),
            ));
        }
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| SkillError::MissingApiKey("TAVILY_API_KEY".to_string()))?;

        let request = SearchRequest {
            api_key,
            query,
            search_depth: options.depth.as_str(),
            topic: &options.topic,
            time_range: options.time_range.as_deref(),
            include_answer: true,
        };

        debug!("Searching: {} (depth={})", query, options.depth.as_str());

        let response = self
            .client
            .post(TAVILY_API_URL)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(SkillError::Api {
                service: "tavily".to_string(),
                status,
                message,
            });
        }

        let parsed: SearchResponse = response.json().await?;

        Ok(SearchContext {
            context: Self::build_context(parsed, options.max_tokens),
            used_config: options.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_uninitialized_search_is_rejected() {
        let skill = WebSearchSkill::new(Some("tvly-test"), SkillRegistry::new());
        let err = skill
            .search("rust", &SearchOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SkillError::NotInitialized(_)));
    }

    #[tokio::test]
    async fn test_initialize_without_key_stays_down() {
        let registry = SkillRegistry::new();
        let skill = WebSearchSkill::new(None, registry.clone());

        assert!(!skill.initialize().await);
        assert!(!registry.is_ready(capability::WEB_SEARCH).await);
    }

    #[test]
    fn test_context_assembly_joins_answer_and_results() {
        let response: SearchResponse = serde_json::from_str(
            r#"{
                "answer": "Short answer.",
                "results": [
                    {"title": "A", "url": "https://a.example", "content": "first"},
                    {"title": "B", "url": "https://b.example", "content": "second"}
                ]
            }"#,
        )
        .unwrap();

        let context = WebSearchSkill::build_context(response, 8000);
        assert!(context.starts_with("Short answer."));
        assert!(context.contains("A (https://a.example)\nfirst"));
        assert!(context.contains("---"));
        assert!(context.contains("second"));
    }

    #[test]
    fn test_context_respects_token_budget() {
        let response = SearchResponse {
            answer: None,
            results: vec![SearchResultItem {
                title: "T".to_string(),
                url: "https://t.example".to_string(),
                content: "x".repeat(10_000),
            }],
        };

        let context = WebSearchSkill::build_context(response, 10);
        assert_eq!(context.chars().count(), 10 * CHARS_PER_TOKEN);
    }

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate_chars("héllo wörld", 5), "héllo");
        assert_eq!(truncate_chars("short", 100), "short");
    }
}
