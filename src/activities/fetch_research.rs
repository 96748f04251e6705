//! Fetch Research Activity
//!
//! Pulls recent papers from arXiv across a fixed category list and stores
//! them under `latest_research` for downstream synthesis.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::activity::{Activity, ActivityResult, ActivitySpec};
use crate::context::SharedContext;
use crate::skills::{capability, Paper, PaperSearchApi};

const CATEGORIES: &[&str] = &["cs.AI", "cs.CL", "cs.LG"];
const MAX_PAPERS_PER_CATEGORY: usize = 5;
const DEFAULT_QUERY: &str = "artificial intelligence OR machine learning OR neural networks";

pub struct FetchResearchActivity {
    papers: Arc<dyn PaperSearchApi>,
}

impl FetchResearchActivity {
    pub fn new(papers: Arc<dyn PaperSearchApi>) -> Self {
        Self { papers }
    }

    pub fn spec() -> ActivitySpec {
        ActivitySpec::new("fetch_research", 0.3, Duration::from_secs(3600))
            .requires(capability::ARXIV_SEARCH)
    }
}

#[async_trait]
impl Activity for FetchResearchActivity {
    async fn execute(&self, ctx: &SharedContext) -> ActivityResult {
        info!("Starting research paper fetch");

        let mut all_papers: Vec<Paper> = Vec::new();
        for category in CATEGORIES {
            match self
                .papers
                .search_papers(DEFAULT_QUERY, MAX_PAPERS_PER_CATEGORY, Some(category))
                .await
            {
                Ok(papers) => all_papers.extend(papers),
                Err(e) => warn!("Paper search failed for {}: {}", category, e),
            }
        }

        let papers_json = match serde_json::to_value(&all_papers) {
            Ok(v) => v,
            Err(e) => return ActivityResult::error_result(format!("serialization failed: {}", e)),
        };

        ctx.memory().store("latest_research", papers_json.clone()).await;

        info!("Fetched {} papers", all_papers.len());
        ActivityResult::success_with_metadata(
            json!({
                "papers": papers_json,
                "count": all_papers.len(),
            }),
            json!({
                "categories": CATEGORIES,
                "max_papers_per_category": MAX_PAPERS_PER_CATEGORY,
                "query": DEFAULT_QUERY,
            }),
        )
    }
}
