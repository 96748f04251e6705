//! Shared Context
//!
//! The short-lived, per-execution view handed to an activity: scoped data
//! partitions, a live memory reference, and the cycle timestamp. Built
//! fresh before each execution and not retained past that call.
//!
//! The memory reference is injected explicitly; activities never reach
//! into process-wide state to find it.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::memory::MemoryLog;

/// Per-cycle execution view.
pub struct SharedContext {
    /// category -> opaque map; unrelated activities cannot collide on key
    /// names unless they explicitly share a category
    categories: HashMap<String, HashMap<String, Value>>,
    memory: Arc<MemoryLog>,
    now: DateTime<Utc>,
}

impl SharedContext {
    pub fn new(memory: Arc<MemoryLog>, now: DateTime<Utc>) -> Self {
        Self {
            categories: HashMap::new(),
            memory,
            now,
        }
    }

    /// Seed one value into a category partition.
    pub fn with_category_value(mut self, category: &str, key: &str, value: Value) -> Self {
        self.categories
            .entry(category.to_string())
            .or_default()
            .insert(key.to_string(), value);
        self
    }

    /// The partition for `category`, if any value was seeded into it.
    pub fn category_data(&self, category: &str) -> Option<&HashMap<String, Value>> {
        self.categories.get(category)
    }

    /// One value from a category partition.
    pub fn category_value(&self, category: &str, key: &str) -> Option<&Value> {
        self.categories.get(category).and_then(|m| m.get(key))
    }

    /// The live memory log for this cycle.
    pub fn memory(&self) -> &Arc<MemoryLog> {
        &self.memory
    }

    /// The timestamp all of this cycle's records share.
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }
}
