//! Fetch News Activity
//!
//! Scrapes a fixed set of news sources per topic and stores headline
//! summaries under `latest_news`.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::activity::{Activity, ActivityResult, ActivitySpec};
use crate::context::SharedContext;
use crate::skills::{capability, PageScrapeApi};

const NEWS_SOURCES: &[(&str, &[&str])] = &[
    ("technology", &["https://techcrunch.com", "https://www.theverge.com"]),
    ("science", &["https://www.sciencedaily.com", "https://www.nature.com/news"]),
    ("art", &["https://news.artnet.com", "https://www.artnews.com"]),
];

const MAX_ARTICLES: usize = 5;
const SUMMARY_CHARS: usize = 200;

pub struct FetchNewsActivity {
    scraper: Arc<dyn PageScrapeApi>,
}

impl FetchNewsActivity {
    pub fn new(scraper: Arc<dyn PageScrapeApi>) -> Self {
        Self { scraper }
    }

    pub fn spec() -> ActivitySpec {
        ActivitySpec::new("fetch_news", 0.3, Duration::from_secs(1800))
            .requires(capability::WEB_SCRAPING)
    }

    async fn fetch_articles(&self) -> Vec<Value> {
        let mut articles = Vec::new();

        'topics: for (topic, sources) in NEWS_SOURCES {
            for source_url in *sources {
                if articles.len() >= MAX_ARTICLES {
                    break 'topics;
                }

                let page = match self.scraper.scrape(source_url).await {
                    Ok(page) => page,
                    Err(e) => {
                        warn!("Failed to scrape {}: {}", source_url, e);
                        continue;
                    }
                };

                let summary: String = page.body_text.chars().take(SUMMARY_CHARS).collect();
                articles.push(json!({
                    "title": page.title.unwrap_or_else(|| "Untitled".to_string()),
                    "topic": topic,
                    "summary": summary,
                    "url": source_url,
                }));
            }
        }

        articles
    }
}

#[async_trait]
impl Activity for FetchNewsActivity {
    async fn execute(&self, ctx: &SharedContext) -> ActivityResult {
        info!("Starting news fetch");

        let articles = self.fetch_articles().await;
        let count = articles.len();

        ctx.memory()
            .store("latest_news", Value::Array(articles.clone()))
            .await;

        info!("Fetched {} articles", count);
        ActivityResult::success_with_metadata(
            json!({
                "articles": articles,
                "count": count,
            }),
            json!({
                "max_articles": MAX_ARTICLES,
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryLog;
    use crate::skills::{ScrapedPage, SkillError};
    use chrono::Utc;

    struct MockScraper {
        failing_host: Option<&'static str>,
    }

    #[async_trait]
    impl PageScrapeApi for MockScraper {
        async fn scrape(&self, url: &str) -> Result<ScrapedPage, SkillError> {
            if let Some(host) = self.failing_host {
                if url.contains(host) {
                    return Err(SkillError::Api {
                        service: "scraping".to_string(),
                        status: 403,
                        message: "blocked".to_string(),
                    });
                }
            }
            Ok(ScrapedPage {
                url: url.to_string(),
                title: Some(format!("Title for {}", url)),
                body_text: "body ".repeat(100),
            })
        }
    }

    #[tokio::test]
    async fn test_fetch_caps_article_count_and_stores() {
        let memory = Arc::new(MemoryLog::in_memory());
        let ctx = SharedContext::new(memory.clone(), Utc::now());

        let activity = FetchNewsActivity::new(Arc::new(MockScraper { failing_host: None }));
        let result = activity.execute(&ctx).await;

        assert!(result.success);
        let data = result.data.unwrap();
        assert_eq!(data["count"], 5);

        let articles = data["articles"].as_array().unwrap();
        assert!(articles[0]["summary"].as_str().unwrap().chars().count() <= SUMMARY_CHARS);
        assert_eq!(articles[0]["topic"], "technology");

        let stored = memory.retrieve("latest_news").await.unwrap();
        assert_eq!(stored.as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_failing_source_is_skipped() {
        let memory = Arc::new(MemoryLog::in_memory());
        let ctx = SharedContext::new(memory.clone(), Utc::now());

        let activity = FetchNewsActivity::new(Arc::new(MockScraper {
            failing_host: Some("techcrunch"),
        }));
        let result = activity.execute(&ctx).await;

        assert!(result.success);
        // One of six sources failed; the cap still limits the rest
        assert_eq!(result.data.unwrap()["count"], 5);
    }

    #[test]
    fn test_spec_shape() {
        let spec = FetchNewsActivity::spec();
        assert_eq!(spec.name, "fetch_news");
        assert_eq!(
            spec.required_skills,
            vec![capability::WEB_SCRAPING.to_string()]
        );
    }
}
