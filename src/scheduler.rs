//! Resource Scheduler
//!
//! Owns the energy budget and per-activity cooldown clocks, and decides
//! which activity may run on a given cycle. Eligibility combines three
//! independent gates:
//! - energy: `budget.current >= spec.energy_cost`
//! - cooldown: `now - last_run_at >= spec.cooldown` (never-run passes)
//! - capabilities: every required skill is ready in the registry
//!
//! Tie-breaking is round-robin over registration order: the scan starts
//! just after the last dispatched activity, so an activity that keeps
//! re-qualifying every cycle cannot starve the others.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

use crate::activity::ActivitySpec;
use crate::skills::SkillRegistry;

/// Scheduler failure modes. Both indicate caller misuse, not runtime
/// conditions: eligibility must be checked before charging.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("activity already registered: {0}")]
    DuplicateActivity(String),

    #[error("insufficient energy for {activity}: cost {cost:.2}, available {available:.2}")]
    InsufficientEnergy {
        activity: String,
        cost: f64,
        available: f64,
    },
}

/// Finite, regenerating resource gating activity execution.
///
/// Regeneration is linear and continuous: `current` grows by
/// `regen_per_sec` for every elapsed second, clamped to `max`. It is
/// applied lazily on every read/charge as a pure function of elapsed time,
/// so the budget is deterministic for a given sequence of observations.
#[derive(Debug, Clone)]
pub struct EnergyBudget {
    current: f64,
    max: f64,
    regen_per_sec: f64,
    last_regen: DateTime<Utc>,
}

impl EnergyBudget {
    /// Start with a full budget.
    pub fn new(max: f64, regen_per_sec: f64, now: DateTime<Utc>) -> Self {
        Self {
            current: max,
            max,
            regen_per_sec,
            last_regen: now,
        }
    }

    fn apply_regen(&mut self, now: DateTime<Utc>) {
        let elapsed = now
            .signed_duration_since(self.last_regen)
            .to_std()
            .unwrap_or(Duration::ZERO);
        self.current = (self.current + elapsed.as_secs_f64() * self.regen_per_sec).min(self.max);
        self.last_regen = now;
    }

    fn can_afford(&self, cost: f64) -> bool {
        self.current >= cost
    }

    fn deduct(&mut self, cost: f64) {
        self.current -= cost;
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

/// Per-activity mutable state, owned exclusively by the scheduler.
#[derive(Debug, Clone, Default)]
struct ActivityState {
    last_run_at: Option<DateTime<Utc>>,
}

/// Scheduler tuning knobs.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Budget ceiling
    pub max_energy: f64,
    /// Linear regeneration rate in energy units per second
    pub regen_per_sec: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_energy: 1.0,
            regen_per_sec: 0.01,
        }
    }
}

/// The admission-control core: energy budget + cooldown clocks + capability
/// gates over a fixed set of registered activity specs.
pub struct ResourceScheduler {
    skills: SkillRegistry,
    /// Registration order defines the round-robin scan order
    specs: RwLock<Vec<ActivitySpec>>,
    states: RwLock<HashMap<String, ActivityState>>,
    budget: RwLock<EnergyBudget>,
    /// Index of the last dispatched spec; scans start just after it
    cursor: RwLock<Option<usize>>,
}

impl ResourceScheduler {
    pub fn new(config: SchedulerConfig, skills: SkillRegistry, now: DateTime<Utc>) -> Self {
        Self {
            skills,
            specs: RwLock::new(Vec::new()),
            states: RwLock::new(HashMap::new()),
            budget: RwLock::new(EnergyBudget::new(config.max_energy, config.regen_per_sec, now)),
            cursor: RwLock::new(None),
        }
    }

    /// Register an activity spec. Specs are immutable once registered.
    pub async fn register(&self, spec: ActivitySpec) -> Result<(), SchedulerError> {
        let mut specs = self.specs.write().await;
        if specs.iter().any(|s| s.name == spec.name) {
            return Err(SchedulerError::DuplicateActivity(spec.name));
        }
        debug!(
            "Registered activity {} (cost={}, cooldown={:?})",
            spec.name, spec.energy_cost, spec.cooldown
        );
        specs.push(spec);
        Ok(())
    }

    /// Current energy after lazy regeneration.
    pub async fn energy(&self, now: DateTime<Utc>) -> f64 {
        let mut budget = self.budget.write().await;
        budget.apply_regen(now);
        budget.current()
    }

    /// Whether `spec` may run at `now`: energy, cooldown, and every required
    /// capability must all pass.
    pub async fn is_eligible(&self, spec: &ActivitySpec, now: DateTime<Utc>) -> bool {
        {
            let mut budget = self.budget.write().await;
            budget.apply_regen(now);
            if !budget.can_afford(spec.energy_cost) {
                return false;
            }
        }

        if let Some(last_run) = self
            .states
            .read()
            .await
            .get(&spec.name)
            .and_then(|s| s.last_run_at)
        {
            let since = now
                .signed_duration_since(last_run)
                .to_std()
                .unwrap_or(Duration::ZERO);
            if since < spec.cooldown {
                return false;
            }
        }

        for skill in &spec.required_skills {
            if !self.skills.is_ready(skill).await {
                return false;
            }
        }

        true
    }

    /// Pick the next eligible activity, or `None` for an idle cycle.
    ///
    /// Deterministic for a given scheduler state: scans registration order
    /// starting after the last dispatched activity and returns the first
    /// eligible spec.
    pub async fn select_next(&self, now: DateTime<Utc>) -> Option<ActivitySpec> {
        let specs = self.specs.read().await.clone();
        if specs.is_empty() {
            return None;
        }

        let start = match *self.cursor.read().await {
            Some(last) => (last + 1) % specs.len(),
            None => 0,
        };

        for offset in 0..specs.len() {
            let idx = (start + offset) % specs.len();
            if self.is_eligible(&specs[idx], now).await {
                *self.cursor.write().await = Some(idx);
                return Some(specs[idx].clone());
            }
        }

        None
    }

    /// Deduct the activity's cost and stamp its cooldown clock. Called only
    /// after a run is actually dispatched, never speculatively; charging an
    /// activity the budget cannot afford is caller misuse.
    pub async fn charge(&self, spec: &ActivitySpec, now: DateTime<Utc>) -> Result<(), SchedulerError> {
        {
            let mut budget = self.budget.write().await;
            budget.apply_regen(now);
            if !budget.can_afford(spec.energy_cost) {
                return Err(SchedulerError::InsufficientEnergy {
                    activity: spec.name.clone(),
                    cost: spec.energy_cost,
                    available: budget.current(),
                });
            }
            budget.deduct(spec.energy_cost);
        }

        let mut states = self.states.write().await;
        states.entry(spec.name.clone()).or_default().last_run_at = Some(now);
        debug!("Charged {} for {:.2} energy", spec.name, spec.energy_cost);
        Ok(())
    }

    /// Timestamp of the last run, if any.
    pub async fn last_run_at(&self, name: &str) -> Option<DateTime<Utc>> {
        self.states.read().await.get(name).and_then(|s| s.last_run_at)
    }
}
