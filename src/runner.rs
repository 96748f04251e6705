//! Activity Runner
//!
//! Executes one activity behind a fault-isolation boundary, then performs
//! the unconditional bookkeeping: record the outcome into the memory log
//! and charge the scheduler. A failing activity still pays its energy cost
//! and still starts its cooldown, so a broken activity cannot spin in a
//! tight retry loop.

use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{info, warn};

use crate::activity::{Activity, ActivityResult, ActivitySpec};
use crate::context::SharedContext;
use crate::memory::{MemoryLog, MemoryRecord};
use crate::scheduler::{ResourceScheduler, SchedulerError};

pub struct ActivityRunner {
    memory: Arc<MemoryLog>,
    scheduler: Arc<ResourceScheduler>,
}

impl ActivityRunner {
    pub fn new(memory: Arc<MemoryLog>, scheduler: Arc<ResourceScheduler>) -> Self {
        Self { memory, scheduler }
    }

    /// Run one activity to completion.
    ///
    /// Panics escaping `execute` are caught here and normalized into failed
    /// results; nothing an activity does may crash the cycle loop. The only
    /// error this returns is a rejected charge, which indicates the caller
    /// skipped the eligibility check.
    pub async fn run(
        &self,
        spec: &ActivitySpec,
        activity: &dyn Activity,
        ctx: &SharedContext,
    ) -> Result<ActivityResult, SchedulerError> {
        let result = match AssertUnwindSafe(activity.execute(ctx)).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => {
                let message = panic_message(panic);
                warn!("Activity {} panicked: {}", spec.name, message);
                ActivityResult::error_result(format!("activity panicked: {}", message))
            }
        };

        if result.success {
            info!("Activity {} completed", spec.name);
        } else {
            warn!(
                "Activity {} failed: {}",
                spec.name,
                result.error.as_deref().unwrap_or("unknown")
            );
        }

        self.memory
            .record(MemoryRecord::from_result(&spec.name, ctx.now(), &result))
            .await;

        self.scheduler.charge(spec, ctx.now()).await?;

        Ok(result)
    }
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
