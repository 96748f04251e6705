//! Page Scraping Skill
//!
//! Plain HTTP fetch plus lightweight text extraction behind the
//! [`PageScrapeApi`] seam. Good enough for headline/summary harvesting;
//! no JS rendering, no crawling.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::{capability, PageScrapeApi, SkillError, SkillRegistry};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = concat!("digital-being/", env!("CARGO_PKG_VERSION"));
// Body text is for summaries, not archiving
const MAX_BODY_CHARS: usize = 20_000;

static TITLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("title regex"));
static SCRIPT_STYLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(script|style|noscript)[^>]*>.*?</(script|style|noscript)>")
        .expect("script/style regex")
});
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]+>").expect("tag regex"));

/// Extracted page content.
#[derive(Debug, Clone)]
pub struct ScrapedPage {
    pub url: String,
    pub title: Option<String>,
    pub body_text: String,
}

/// Scraping skill: fetch + strip.
#[derive(Clone)]
pub struct ScrapingSkill {
    client: Client,
    registry: SkillRegistry,
    initialized: Arc<AtomicBool>,
}

impl ScrapingSkill {
    pub fn new(registry: SkillRegistry) -> Self {
        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .user_agent(USER_AGENT)
                .build()
                .unwrap_or_default(),
            registry,
            initialized: Arc::new(AtomicBool::new(false)),
        }
    }

    /// No credentials needed; declare the capability and flip it ready.
    pub async fn initialize(&self) -> bool {
        self.registry.register(capability::WEB_SCRAPING).await;
        self.initialized.store(true, Ordering::Relaxed);
        self.registry
            .set_ready(capability::WEB_SCRAPING, true)
            .await;
        info!("Scraping skill initialized");
        true
    }

    fn extract(url: &str, html: &str) -> ScrapedPage {
        let title = TITLE_RE
            .captures(html)
            .map(|c| decode_entities(c[1].trim()))
            .filter(|t| !t.is_empty());

        let without_scripts = SCRIPT_STYLE_RE.replace_all(html, " ");
        let without_tags = TAG_RE.replace_all(&without_scripts, " ");
        let body_text: String = decode_entities(&without_tags)
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .chars()
            .take(MAX_BODY_CHARS)
            .collect();

        ScrapedPage {
            url: url.to_string(),
            title,
            body_text,
        }
    }
}

fn decode_entities(s: &str) -> String {
    s.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
}

#[async_trait]
impl PageScrapeApi for ScrapingSkill {
    async fn scrape(&self, url: &str) -> Result<ScrapedPage, SkillError> {
        if !self.initialized.load(Ordering::Relaxed) {
            return Err(SkillError::NotInitialized(
                capability::WEB_SCRAPING.to_string(),
            ));
        }

        debug!("Scraping {}", url);
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            return Err(SkillError::Api {
                service: "scraping".to_string(),
                status,
                message: format!("fetch failed for {}", url),
            });
        }

        let html = response.text().await?;
        Ok(Self::extract(url, &html))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_title_and_body() {
        let html = r#"<html><head>
            <title>Breaking: Rust 2.0 &amp; Beyond</title>
            <style>body { color: red; }</style>
        </head><body>
            <script>var x = "<p>not text</p>";</script>
            <h1>Breaking news</h1>
            <p>Something   happened
            today.</p>
        </body></html>"#;

        let page = ScrapingSkill::extract("https://example.com", html);
        assert_eq!(page.title.as_deref(), Some("Breaking: Rust 2.0 & Beyond"));
        assert!(page.body_text.contains("Breaking news Something happened today."));
        assert!(!page.body_text.contains("color: red"));
        assert!(!page.body_text.contains("not text"));
    }

    #[test]
    fn test_extract_without_title() {
        let page = ScrapingSkill::extract("https://example.com", "<p>just text</p>");
        assert!(page.title.is_none());
        assert_eq!(page.body_text, "just text");
    }

    #[tokio::test]
    async fn test_uninitialized_scrape_is_rejected() {
        let skill = ScrapingSkill::new(SkillRegistry::new());
        let err = skill.scrape("https://example.com").await.unwrap_err();
        assert!(matches!(err, SkillError::NotInitialized(_)));
    }
}
