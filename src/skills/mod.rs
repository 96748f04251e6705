//! External Skill Collaborators
//!
//! Each skill wraps one external API the activities depend on:
//! - `chat`: Anthropic chat completion
//! - `web_search`: Tavily search context for RAG
//! - `arxiv`: arXiv paper search (no API key required)
//! - `scraping`: plain page fetch + text extraction
//!
//! Skills expose `initialize() -> bool` and flip their capability flag in
//! the [`SkillRegistry`] on success. Activities depend on the trait seams
//! defined here, never on concrete clients, so they stay testable.

mod registry;

pub mod arxiv;
pub mod chat;
pub mod scraping;
pub mod web_search;

pub use arxiv::ArxivSkill;
pub use chat::{ChatCompletion, ChatSkill};
pub use registry::SkillRegistry;
pub use scraping::{ScrapedPage, ScrapingSkill};
pub use web_search::{SearchContext, SearchDepth, SearchOptions, WebSearchSkill};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Capability names used for activity eligibility gating.
pub mod capability {
    pub const CHAT: &str = "chat";
    pub const WEB_SEARCH: &str = "web_search";
    pub const ARXIV_SEARCH: &str = "arxiv_search";
    pub const WEB_SCRAPING: &str = "web_scraping";
}

/// Errors surfaced by skill calls.
#[derive(Debug, thiserror::Error)]
pub enum SkillError {
    #[error("skill not initialized: {0}")]
    NotInitialized(String),

    #[error("missing API key for {0}")]
    MissingApiKey(String),

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} API error {status}: {message}")]
    Api {
        service: String,
        status: u16,
        message: String,
    },

    #[error("failed to parse {service} response: {message}")]
    Parse { service: String, message: String },
}

/// Chat completion seam.
#[async_trait]
pub trait ChatCompletionApi: Send + Sync {
    async fn chat_completion(
        &self,
        prompt: &str,
        system_prompt: &str,
        max_tokens: usize,
    ) -> Result<ChatCompletion, SkillError>;
}

/// Web search seam.
#[async_trait]
pub trait WebSearchApi: Send + Sync {
    async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<SearchContext, SkillError>;
}

/// Paper search seam.
#[async_trait]
pub trait PaperSearchApi: Send + Sync {
    async fn search_papers(
        &self,
        query: &str,
        max_results: usize,
        category: Option<&str>,
    ) -> Result<Vec<Paper>, SkillError>;
}

/// Page scraping seam.
#[async_trait]
pub trait PageScrapeApi: Send + Sync {
    async fn scrape(&self, url: &str) -> Result<ScrapedPage, SkillError>;
}

/// One academic paper as returned by the paper search skill.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paper {
    pub title: String,
    pub authors: Vec<String>,
    pub summary: String,
    pub published: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub doi: Option<String>,
    pub primary_category: String,
    pub categories: Vec<String>,
    pub links: Vec<String>,
    pub pdf_url: Option<String>,
}
