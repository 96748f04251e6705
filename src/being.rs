//! Digital Being Cycle Loop
//!
//! The top-level driver. Each tick asks the scheduler for an eligible
//! activity, builds a fresh shared context, and delegates to the runner.
//! Two states only: Idle (no eligible activity) and Running (exactly one
//! activity executing); there is no concurrent Running state, the loop
//! awaits full completion before the next tick.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tracing::{debug, error, info};

use crate::activity::{Activity, ActivitySpec};
use crate::context::SharedContext;
use crate::memory::MemoryLog;
use crate::runner::ActivityRunner;
use crate::scheduler::{ResourceScheduler, SchedulerConfig, SchedulerError};
use crate::skills::SkillRegistry;

/// Cycle loop states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    Idle,
    Running,
}

/// What one tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// No eligible activity this tick; a normal outcome, not an error
    Idle,
    /// One activity ran to completion
    Ran { activity: String, success: bool },
}

/// Being configuration.
#[derive(Debug, Clone)]
pub struct BeingConfig {
    /// Delay between scheduling attempts
    pub tick_interval: Duration,
    pub scheduler: SchedulerConfig,
}

impl Default for BeingConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(30),
            scheduler: SchedulerConfig::default(),
        }
    }
}

/// Counters for observing the loop.
#[derive(Debug, Default)]
struct CycleCounters {
    ticks: AtomicU64,
    idle_ticks: AtomicU64,
    runs: AtomicU64,
    failures: AtomicU64,
}

/// Snapshot of the loop counters.
#[derive(Debug, Clone)]
pub struct BeingStats {
    pub ticks: u64,
    pub idle_ticks: u64,
    pub runs: u64,
    pub failures: u64,
    pub state: CycleState,
}

/// The autonomous being: registered activities plus the scheduler, memory,
/// and runner they execute against.
pub struct DigitalBeing {
    scheduler: Arc<ResourceScheduler>,
    skills: SkillRegistry,
    memory: Arc<MemoryLog>,
    runner: ActivityRunner,
    activities: RwLock<HashMap<String, Arc<dyn Activity>>>,
    state: RwLock<CycleState>,
    counters: CycleCounters,
    tick_interval: Duration,
}

impl DigitalBeing {
    pub fn new(config: BeingConfig, skills: SkillRegistry, memory: Arc<MemoryLog>) -> Self {
        let scheduler = Arc::new(ResourceScheduler::new(
            config.scheduler,
            skills.clone(),
            Utc::now(),
        ));
        let runner = ActivityRunner::new(memory.clone(), scheduler.clone());

        Self {
            scheduler,
            skills,
            memory,
            runner,
            activities: RwLock::new(HashMap::new()),
            state: RwLock::new(CycleState::Idle),
            counters: CycleCounters::default(),
            tick_interval: config.tick_interval,
        }
    }

    /// Register an activity and its spec. Fails on duplicate names.
    pub async fn register_activity(
        &self,
        spec: ActivitySpec,
        activity: Arc<dyn Activity>,
    ) -> Result<(), SchedulerError> {
        let name = spec.name.clone();
        self.scheduler.register(spec).await?;
        self.activities.write().await.insert(name, activity);
        Ok(())
    }

    pub fn skills(&self) -> &SkillRegistry {
        &self.skills
    }

    pub fn memory(&self) -> &Arc<MemoryLog> {
        &self.memory
    }

    pub fn scheduler(&self) -> &Arc<ResourceScheduler> {
        &self.scheduler
    }

    /// Run one scheduling cycle at the current wall time.
    pub async fn tick(&self) -> Result<CycleOutcome, SchedulerError> {
        self.tick_at(Utc::now()).await
    }

    /// Run one scheduling cycle at an explicit logical time.
    pub async fn tick_at(&self, now: DateTime<Utc>) -> Result<CycleOutcome, SchedulerError> {
        self.counters.ticks.fetch_add(1, Ordering::Relaxed);

        let Some(spec) = self.scheduler.select_next(now).await else {
            self.counters.idle_ticks.fetch_add(1, Ordering::Relaxed);
            debug!("Cycle idle: no eligible activity");
            return Ok(CycleOutcome::Idle);
        };

        let Some(activity) = self.activities.read().await.get(&spec.name).cloned() else {
            // Spec registered without an implementation; treat as idle
            error!("No implementation registered for activity {}", spec.name);
            self.counters.idle_ticks.fetch_add(1, Ordering::Relaxed);
            return Ok(CycleOutcome::Idle);
        };

        info!("Cycle dispatching {}", spec.name);
        *self.state.write().await = CycleState::Running;

        let ctx = SharedContext::new(self.memory.clone(), now);
        let run_result = self.runner.run(&spec, activity.as_ref(), &ctx).await;

        // Running -> Idle unconditionally, success or failure
        *self.state.write().await = CycleState::Idle;

        let result = run_result?;
        self.counters.runs.fetch_add(1, Ordering::Relaxed);
        if !result.success {
            self.counters.failures.fetch_add(1, Ordering::Relaxed);
        }

        Ok(CycleOutcome::Ran {
            activity: spec.name,
            success: result.success,
        })
    }

    /// Drive the loop until the shutdown signal flips.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<(), SchedulerError> {
        info!("Being loop started (tick every {:?})", self.tick_interval);
        let mut ticker = tokio::time::interval(self.tick_interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.tick().await {
                        Ok(CycleOutcome::Idle) => {}
                        Ok(CycleOutcome::Ran { activity, success }) => {
                            debug!("Cycle ran {} (success={})", activity, success);
                        }
                        Err(e) => {
                            // Charge rejection after a positive eligibility
                            // check is a bug in the admission path
                            error!("Cycle failed: {}", e);
                            return Err(e);
                        }
                    }
                }
                changed = shutdown.changed() => {
                    // A dropped sender counts as shutdown too
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Being loop shutting down");
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Counter snapshot.
    pub async fn stats(&self) -> BeingStats {
        BeingStats {
            ticks: self.counters.ticks.load(Ordering::Relaxed),
            idle_ticks: self.counters.idle_ticks.load(Ordering::Relaxed),
            runs: self.counters.runs.load(Ordering::Relaxed),
            failures: self.counters.failures.load(Ordering::Relaxed),
            state: *self.state.read().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::ActivityResult;
    use async_trait::async_trait;
    use serde_json::json;

    struct CountingActivity {
        runs: AtomicU64,
    }

    #[async_trait]
    impl Activity for CountingActivity {
        async fn execute(&self, _ctx: &SharedContext) -> ActivityResult {
            self.runs.fetch_add(1, Ordering::Relaxed);
            ActivityResult::success_result(json!({}))
        }
    }

    /// Reads what a prior cycle stored and echoes it back.
    struct HandOffReader;

    #[async_trait]
    impl Activity for HandOffReader {
        async fn execute(&self, ctx: &SharedContext) -> ActivityResult {
            match ctx.memory().retrieve("seed").await {
                Some(v) => ActivityResult::success_result(json!({"seen": v})),
                None => ActivityResult::error_result("seed not present"),
            }
        }
    }

    struct HandOffWriter;

    #[async_trait]
    impl Activity for HandOffWriter {
        async fn execute(&self, ctx: &SharedContext) -> ActivityResult {
            ctx.memory().store("seed", json!("planted")).await;
            ActivityResult::success_result(json!({}))
        }
    }

    fn being(max_energy: f64) -> DigitalBeing {
        DigitalBeing::new(
            BeingConfig {
                tick_interval: Duration::from_millis(10),
                scheduler: SchedulerConfig {
                    max_energy,
                    regen_per_sec: 0.0,
                },
            },
            SkillRegistry::new(),
            Arc::new(MemoryLog::in_memory()),
        )
    }

    #[tokio::test]
    async fn test_tick_idle_without_activities() {
        let being = being(1.0);
        assert_eq!(being.tick().await.unwrap(), CycleOutcome::Idle);

        let stats = being.stats().await;
        assert_eq!(stats.ticks, 1);
        assert_eq!(stats.idle_ticks, 1);
        assert_eq!(stats.state, CycleState::Idle);
    }

    #[tokio::test]
    async fn test_tick_runs_one_activity_and_returns_to_idle() {
        let being = being(1.0);
        let activity = Arc::new(CountingActivity {
            runs: AtomicU64::new(0),
        });
        being
            .register_activity(
                ActivitySpec::new("counter", 0.3, Duration::from_secs(3600)),
                activity.clone(),
            )
            .await
            .unwrap();

        let outcome = being.tick().await.unwrap();
        assert_eq!(
            outcome,
            CycleOutcome::Ran {
                activity: "counter".to_string(),
                success: true
            }
        );
        assert_eq!(activity.runs.load(Ordering::Relaxed), 1);

        // Cooldown keeps the next tick idle
        assert_eq!(being.tick().await.unwrap(), CycleOutcome::Idle);
        assert_eq!(being.stats().await.state, CycleState::Idle);
        assert_eq!(being.memory().record_count().await, 1);
    }

    #[tokio::test]
    async fn test_memory_mediated_hand_off_across_cycles() {
        let being = being(10.0);
        // Reader registers first so the round-robin hits it before the
        // writer has produced anything
        being
            .register_activity(
                ActivitySpec::new("reader", 0.1, Duration::from_secs(0)),
                Arc::new(HandOffReader),
            )
            .await
            .unwrap();
        being
            .register_activity(
                ActivitySpec::new("writer", 0.1, Duration::from_secs(0)),
                Arc::new(HandOffWriter),
            )
            .await
            .unwrap();

        // Cycle 1: reader finds nothing and fails (recorded, charged)
        assert_eq!(
            being.tick().await.unwrap(),
            CycleOutcome::Ran {
                activity: "reader".to_string(),
                success: false
            }
        );
        // Cycle 2: writer plants the seed
        assert_eq!(
            being.tick().await.unwrap(),
            CycleOutcome::Ran {
                activity: "writer".to_string(),
                success: true
            }
        );
        // Cycle 3: reader now succeeds off the writer's output
        assert_eq!(
            being.tick().await.unwrap(),
            CycleOutcome::Ran {
                activity: "reader".to_string(),
                success: true
            }
        );

        let records = being.memory().recent_activities(10).await;
        assert_eq!(records.len(), 3);
        assert!(records[0].success);
        assert_eq!(records[0].data, Some(json!({"seen": "planted"})));

        let stats = being.stats().await;
        assert_eq!(stats.runs, 3);
        assert_eq!(stats.failures, 1);
    }

    #[tokio::test]
    async fn test_run_loop_stops_on_shutdown() {
        let being = Arc::new(being(1.0));
        let (tx, rx) = watch::channel(false);

        let loop_being = being.clone();
        let handle = tokio::spawn(async move { loop_being.run(rx).await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(true).unwrap();

        handle.await.unwrap().unwrap();
        assert!(being.stats().await.ticks >= 1);
    }
}
