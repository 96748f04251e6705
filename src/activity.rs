//! Activity Contracts
//!
//! Core data structures for pluggable activities:
//! - `ActivitySpec`: immutable registration record (cost, cooldown, skills)
//! - `ActivityResult`: normalized outcome of one execution attempt
//! - `Activity`: the trait every behavior implements

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use crate::context::SharedContext;

/// Immutable description of an activity, fixed at registration time.
#[derive(Debug, Clone)]
pub struct ActivitySpec {
    /// Unique activity name
    pub name: String,
    /// Energy deducted per execution attempt (success or failure)
    pub energy_cost: f64,
    /// Minimum interval between two runs
    pub cooldown: Duration,
    /// Capabilities that must be ready before the activity is eligible
    pub required_skills: Vec<String>,
}

impl ActivitySpec {
    /// Create a new spec with no skill requirements
    pub fn new(name: &str, energy_cost: f64, cooldown: Duration) -> Self {
        Self {
            name: name.to_string(),
            energy_cost,
            cooldown,
            required_skills: Vec::new(),
        }
    }

    /// Require a capability
    pub fn requires(mut self, skill: &str) -> Self {
        self.required_skills.push(skill.to_string());
        self
    }
}

/// Normalized outcome of one activity execution.
///
/// Exactly one of `data`/`error` is meaningful depending on `success`.
/// `metadata` is advisory and never consumed by the core.
#[derive(Debug, Clone)]
pub struct ActivityResult {
    pub success: bool,
    pub data: Option<Value>,
    pub error: Option<String>,
    pub metadata: Option<Value>,
}

impl ActivityResult {
    /// Successful outcome carrying a data payload
    pub fn success_result(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            metadata: None,
        }
    }

    /// Successful outcome with advisory metadata
    pub fn success_with_metadata(data: Value, metadata: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            metadata: Some(metadata),
        }
    }

    /// Failed outcome with a human-readable error
    pub fn error_result(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            metadata: None,
        }
    }
}

/// A pluggable unit of behavior.
///
/// Implementations return explicit failure results for expected conditions
/// (missing input data, skill call failures) instead of panicking; the
/// runner boundary converts anything that does escape into a failed result.
#[async_trait]
pub trait Activity: Send + Sync {
    async fn execute(&self, ctx: &SharedContext) -> ActivityResult;
}
