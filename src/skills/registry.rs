//! Skill Capability Registry
//!
//! Ledger of which named capabilities are currently initialized and usable.
//! The registry never attempts initialization itself; each skill flips its
//! own flag from `initialize()` / teardown.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Shared readiness ledger, cheap to clone.
#[derive(Clone, Default)]
pub struct SkillRegistry {
    capabilities: Arc<RwLock<HashMap<String, bool>>>,
}

impl SkillRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a capability. Idempotent; re-declaring keeps the current flag.
    pub async fn register(&self, name: &str) {
        let mut caps = self.capabilities.write().await;
        caps.entry(name.to_string()).or_insert(false);
    }

    /// Flip readiness. Invoked by the skill's own initialization/teardown.
    pub async fn set_ready(&self, name: &str, ready: bool) {
        let mut caps = self.capabilities.write().await;
        caps.insert(name.to_string(), ready);
        debug!("Capability {} -> ready={}", name, ready);
    }

    /// Whether a capability is currently usable. Unknown names are not ready.
    pub async fn is_ready(&self, name: &str) -> bool {
        self.capabilities
            .read()
            .await
            .get(name)
            .copied()
            .unwrap_or(false)
    }

    /// Names of all currently-ready capabilities, sorted.
    pub async fn ready_capabilities(&self) -> Vec<String> {
        let caps = self.capabilities.read().await;
        let mut ready: Vec<String> = caps
            .iter()
            .filter(|(_, r)| **r)
            .map(|(n, _)| n.clone())
            .collect();
        ready.sort();
        ready
    }
}
