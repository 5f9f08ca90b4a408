//! Daily and all-time focus statistics.
//!
//! All durations are seconds. Per-project buckets are keyed by
//! [`project_key`].

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Bucket key for a project: `"{id}-{name}"`. A missing name leaves the
/// suffix empty.
pub fn project_key(project_id: &str, project_name: Option<&str>) -> String {
    format!("{}-{}", project_id, project_name.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyStats {
    pub date: NaiveDate,
    #[serde(default)]
    pub work_time: u64,
    #[serde(default)]
    pub break_time: u64,
    /// Work sessions started today.
    #[serde(default)]
    pub sessions: u32,
    #[serde(default)]
    pub completed_sessions: u32,
    #[serde(default)]
    pub project_breakdown: BTreeMap<String, u64>,
}

impl DailyStats {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            work_time: 0,
            break_time: 0,
            sessions: 0,
            completed_sessions: 0,
            project_breakdown: BTreeMap::new(),
        }
    }

    pub fn is_for(&self, date: NaiveDate) -> bool {
        self.date == date
    }

    pub fn project_time(&self, key: &str) -> u64 {
        self.project_breakdown.get(key).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllTimeStats {
    #[serde(default)]
    pub total_work_time: u64,
    #[serde(default)]
    pub total_break_time: u64,
    #[serde(default)]
    pub total_sessions: u64,
    #[serde(default)]
    pub project_breakdown: BTreeMap<String, u64>,
}

impl AllTimeStats {
    pub fn project_time(&self, key: &str) -> u64 {
        self.project_breakdown.get(key).copied().unwrap_or(0)
    }
}

pub(crate) fn credit(breakdown: &mut BTreeMap<String, u64>, key: &str, secs: u64) {
    let bucket = breakdown.entry(key.to_string()).or_insert(0);
    *bucket = bucket.saturating_add(secs);
}
