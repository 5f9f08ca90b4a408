use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::settings::TimerPhase;

/// Who a work countdown is being spent on. Ids and names are opaque to the
/// timer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attribution {
    pub project_id: Option<String>,
    pub project_name: Option<String>,
    pub task_id: Option<String>,
    pub task_name: Option<String>,
}

impl Attribution {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn project(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            project_id: Some(id.into()),
            project_name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_task(mut self, id: impl Into<String>, name: impl Into<String>) -> Self {
        self.task_id = Some(id.into());
        self.task_name = Some(name.into());
        self
    }
}

/// An in-progress work attribution record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub project_id: Option<String>,
    pub project_name: Option<String>,
    pub task_id: Option<String>,
    pub task_name: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub is_break: bool,
}

impl Session {
    pub(crate) fn open(attribution: Attribution, started_at: DateTime<Utc>) -> Self {
        Self {
            project_id: attribution.project_id,
            project_name: attribution.project_name,
            task_id: attribution.task_id,
            task_name: attribution.task_name,
            started_at,
            is_break: false,
        }
    }

    /// Project id when it is present and non-empty.
    pub fn attributed_project(&self) -> Option<&str> {
        self.project_id.as_deref().filter(|id| !id.is_empty())
    }
}

/// Persisted form of the active session: the record plus where the
/// countdown stood, so a host can resume it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct StoredSession {
    #[serde(flatten)]
    pub session: Session,
    pub phase: TimerPhase,
    pub remaining_secs: u64,
}
