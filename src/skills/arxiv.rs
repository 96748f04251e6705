//! arXiv Paper Search Skill
//!
//! Queries the arXiv Atom API behind the [`PaperSearchApi`] seam. No API
//! key required; initialization always succeeds and flips the capability.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::{capability, Paper, PaperSearchApi, SkillError, SkillRegistry};

const ARXIV_API_URL: &str = "http://export.arxiv.org/api/query";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Paper search skill backed by the arXiv export API.
#[derive(Clone)]
pub struct ArxivSkill {
    client: Client,
    registry: SkillRegistry,
    initialized: Arc<AtomicBool>,
}

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    title: String,
    summary: String,
    published: String,
    updated: String,
    #[serde(rename = "author", default)]
    authors: Vec<AtomAuthor>,
    #[serde(rename = "doi", default)]
    doi: Option<String>,
    #[serde(rename = "arxiv:primary_category", default)]
    primary_category: Option<AtomCategory>,
    #[serde(rename = "category", default)]
    categories: Vec<AtomCategory>,
    #[serde(rename = "link", default)]
    links: Vec<AtomLink>,
}

#[derive(Debug, Deserialize)]
struct AtomAuthor {
    name: String,
}

#[derive(Debug, Deserialize)]
struct AtomCategory {
    #[serde(rename = "@term")]
    term: String,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: String,
    #[serde(rename = "@title", default)]
    title: Option<String>,
    #[serde(rename = "@type", default)]
    content_type: Option<String>,
}

impl ArxivSkill {
    pub fn new(registry: SkillRegistry) -> Self {
        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
            registry,
            initialized: Arc::new(AtomicBool::new(false)),
        }
    }

    /// No credentials needed; declare the capability and flip it ready.
    pub async fn initialize(&self) -> bool {
        self.registry.register(capability::ARXIV_SEARCH).await;
        self.initialized.store(true, Ordering::Relaxed);
        self.registry.set_ready(capability::ARXIV_SEARCH, true).await;
        info!("arXiv skill initialized");
        true
    }

    fn parse_feed(xml: &str) -> Result<Vec<Paper>, SkillError> {
        let feed: AtomFeed = quick_xml::de::from_str(xml).map_err(|e| SkillError::Parse {
            service: "arxiv".to_string(),
            message: e.to_string(),
        })?;

        feed.entries.into_iter().map(Self::entry_to_paper).collect()
    }

    fn entry_to_paper(entry: AtomEntry) -> Result<Paper, SkillError> {
        let published = parse_atom_date(&entry.published)?;
        let updated = parse_atom_date(&entry.updated)?;

        let categories: Vec<String> = entry.categories.iter().map(|c| c.term.clone()).collect();
        let primary_category = entry
            .primary_category
            .map(|c| c.term)
            .or_else(|| categories.first().cloned())
            .unwrap_or_default();

        let pdf_url = entry
            .links
            .iter()
            .find(|l| {
                l.title.as_deref() == Some("pdf")
                    || l.content_type.as_deref() == Some("application/pdf")
            })
            .map(|l| l.href.clone());

        Ok(Paper {
            title: normalize_whitespace(&entry.title),
            authors: entry.authors.into_iter().map(|a| a.name).collect(),
            summary: normalize_whitespace(&entry.summary),
            published,
            updated,
            doi: entry.doi,
            primary_category,
            categories,
            links: entry.links.into_iter().map(|l| l.href).collect(),
            pdf_url,
        })
    }
}

fn parse_atom_date(raw: &str) -> Result<DateTime<Utc>, SkillError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| SkillError::Parse {
            service: "arxiv".to_string(),
            message: format!("bad date {}: {}", raw, e),
        })
}

// Atom feeds wrap long titles/abstracts with newlines and indentation
fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[async_trait]
impl PaperSearchApi for ArxivSkill {
    async fn search_papers(
        &self,
        query: &str,
        max_results: usize,
        category: Option<&str>,
    ) -> Result<Vec<Paper>, SkillError> {
        if !self.initialized.load(Ordering::Relaxed) {
            return Err(SkillError::NotInitialized(
                capability::ARXIV_SEARCH.to_string(),
            ));
        }

        let search_query = match category {
            Some(cat) => format!("cat:{} AND all:{}", cat, query),
            None => format!("all:{}", query),
        };

        debug!("Searching arXiv: {} (max={})", search_query, max_results);

        let response = self
            .client
            .get(ARXIV_API_URL)
            .query(&[
                ("search_query", search_query.as_str()),
                ("start", "0"),
                ("max_results", &max_results.to_string()),
                ("sortBy", "submittedDate"),
                ("sortOrder", "descending"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(SkillError::Api {
                service: "arxiv".to_string(),
                status,
                message,
            });
        }

        let xml = response.text().await?;
        let papers = Self::parse_feed(&xml)?;
        info!("Found {} papers for query: {}", papers.len(), query);
        Ok(papers)
    }
}
