//! Digital Being - Entry Point
//!
//! Boots the skills, registers the built-in activities, and drives the
//! cycle loop until ctrl-c.

use std::sync::Arc;

use digital_being::activities::{
    DailyThoughtActivity, EmergentResearchActivity, FetchNewsActivity, FetchResearchActivity,
    WebResearchActivity,
};
use digital_being::{
    ArxivSkill, BeingConfig, ChatSkill, Config, DigitalBeing, MemoryLog, SchedulerConfig,
    ScrapingSkill, SkillRegistry, WebSearchSkill,
};
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Digital Being v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;

    let memory = Arc::new(match &config.db_path {
        Some(path) => MemoryLog::open(path)?,
        None => MemoryLog::in_memory(),
    });

    let skills = SkillRegistry::new();

    // Skills flip their own capability flags; a failed initialization just
    // leaves the dependent activities ineligible
    let chat = ChatSkill::new(
        config.anthropic_api_key.as_deref(),
        config.chat_model.as_deref(),
        skills.clone(),
    );
    let web_search = WebSearchSkill::new(config.tavily_api_key.as_deref(), skills.clone());
    let arxiv = ArxivSkill::new(skills.clone());
    let scraping = ScrapingSkill::new(skills.clone());

    for (name, ok) in [
        ("chat", chat.initialize().await),
        ("web_search", web_search.initialize().await),
        ("arxiv_search", arxiv.initialize().await),
        ("web_scraping", scraping.initialize().await),
    ] {
        if !ok {
            warn!("Skill {} unavailable; dependent activities stay gated", name);
        }
    }

    let being = DigitalBeing::new(
        BeingConfig {
            tick_interval: config.tick_interval,
            scheduler: SchedulerConfig {
                max_energy: config.max_energy,
                regen_per_sec: config.regen_per_sec,
            },
        },
        skills,
        memory,
    );

    let chat = Arc::new(chat);
    let web_search = Arc::new(web_search);

    being
        .register_activity(
            FetchResearchActivity::spec(),
            Arc::new(FetchResearchActivity::new(Arc::new(arxiv))),
        )
        .await?;
    being
        .register_activity(
            WebResearchActivity::spec(),
            Arc::new(WebResearchActivity::new(chat.clone(), web_search)),
        )
        .await?;
    being
        .register_activity(
            EmergentResearchActivity::spec(),
            Arc::new(EmergentResearchActivity::new(chat.clone())),
        )
        .await?;
    being
        .register_activity(
            DailyThoughtActivity::spec(),
            Arc::new(DailyThoughtActivity::new(chat)),
        )
        .await?;
    being
        .register_activity(
            FetchNewsActivity::spec(),
            Arc::new(FetchNewsActivity::new(Arc::new(scraping))),
        )
        .await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received ctrl-c");
            let _ = shutdown_tx.send(true);
        }
    });

    being.run(shutdown_rx).await?;

    let stats = being.stats().await;
    info!(
        "Being stopped after {} ticks ({} runs, {} failures)",
        stats.ticks, stats.runs, stats.failures
    );

    Ok(())
}
