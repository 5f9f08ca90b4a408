use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::{Session, TimerPhase, TimerSettings};

/// Every timer state change produces an Event.
/// Hosts render them; the driver forwards them from the tick task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    TimerStarted {
        phase: TimerPhase,
        remaining_secs: u64,
        /// A new work session was opened by this start.
        session_created: bool,
        at: DateTime<Utc>,
    },
    TimerPaused {
        phase: TimerPhase,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerStopped {
        phase: TimerPhase,
        remaining_secs: u64,
        session_discarded: bool,
        at: DateTime<Utc>,
    },
    TimerReset {
        at: DateTime<Utc>,
    },
    PhaseCompleted {
        completed: TimerPhase,
        next: TimerPhase,
        /// Seconds credited to the statistics.
        credited_secs: u64,
        at: DateTime<Utc>,
    },
    SettingsUpdated {
        settings: TimerSettings,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        phase: TimerPhase,
        running: bool,
        remaining_secs: u64,
        total_secs: u64,
        session: Option<Session>,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn at(&self) -> DateTime<Utc> {
        match self {
            Event::TimerStarted { at, .. }
            | Event::TimerPaused { at, .. }
            | Event::TimerStopped { at, .. }
            | Event::TimerReset { at }
            | Event::PhaseCompleted { at, .. }
            | Event::SettingsUpdated { at, .. }
            | Event::StateSnapshot { at, .. } => *at,
        }
    }
}
