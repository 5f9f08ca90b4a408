//! Timer engine implementation.
//!
//! A Work / ShortBreak / LongBreak state machine with a one-second
//! countdown. The engine owns no thread: the caller invokes `tick()` once
//! per second while the timer runs (see [`TimerDriver`](super::TimerDriver)).
//!
//! ## Phase cycle
//!
//! ```text
//! Work -> ShortBreak -> Work -> ... -> Work -> LongBreak -> Work
//! ```
//!
//! A long break follows every `sessions_until_long_break`-th completed work
//! phase of the day.
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = TimerEngine::load(TimerPorts::new(store), TimerSettings::default())?;
//! engine.start(Attribution::project("7", "X"));
//! // Once per second:
//! engine.tick(); // Returns Some(Event::PhaseCompleted) when a phase ends
//! ```

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use super::ports::TimerPorts;
use super::session::{Attribution, Session, StoredSession};
use super::settings::{TimerPhase, TimerSettings};
use super::stats::{credit, project_key, AllTimeStats, DailyStats};
use crate::error::{StorageError, ValidationError};
use crate::events::Event;
use crate::storage::KvStore;

pub const SETTINGS_KEY: &str = "pomodoro-settings";
pub const DAILY_STATS_KEY: &str = "pomodoro-daily-stats";
pub const ALL_TIME_STATS_KEY: &str = "pomodoro-all-time-stats";
pub const SESSION_KEY: &str = "pomodoro-current-session";

/// Core timer engine.
pub struct TimerEngine {
    ports: TimerPorts,
    settings: TimerSettings,
    phase: TimerPhase,
    running: bool,
    remaining_secs: u64,
    session: Option<Session>,
    daily: DailyStats,
    all_time: AllTimeStats,
}

impl TimerEngine {
    /// Build an engine from whatever the store holds.
    ///
    /// `defaults` are used when no valid settings are stored; invalid
    /// defaults fall back to [`TimerSettings::default`]. Stored daily stats
    /// from another day are replaced by a zeroed record for today, which is
    /// written back. A stored session is restored paused, with its phase and
    /// remaining time.
    ///
    /// # Errors
    /// Returns an error only if the store itself fails; malformed values are
    /// logged and replaced by defaults.
    pub fn load(ports: TimerPorts, defaults: TimerSettings) -> Result<Self, StorageError> {
        let store = ports.store.as_ref();
        let today = ports.clock.today();

        let defaults = match defaults.validate() {
            Ok(()) => defaults,
            Err(e) => {
                warn!("default timer settings rejected ({e}); using built-in defaults");
                TimerSettings::default()
            }
        };

        let settings = match load_json::<TimerSettings>(store, SETTINGS_KEY)? {
            Some(s) => match s.validate() {
                Ok(()) => s,
                Err(e) => {
                    warn!("stored timer settings rejected ({e}); using defaults");
                    defaults
                }
            },
            None => defaults,
        };

        let (daily, daily_stale) = match load_json::<DailyStats>(store, DAILY_STATS_KEY)? {
            Some(stats) if stats.is_for(today) => (stats, false),
            Some(stats) => {
                debug!(stored = %stats.date, %today, "daily stats belong to another day; resetting");
                (DailyStats::new(today), true)
            }
            None => (DailyStats::new(today), false),
        };

        let all_time = load_json::<AllTimeStats>(store, ALL_TIME_STATS_KEY)?.unwrap_or_default();
        let stored_session = load_json::<StoredSession>(store, SESSION_KEY)?;

        let mut engine = Self {
            ports,
            settings,
            phase: TimerPhase::Work,
            running: false,
            remaining_secs: settings.duration_secs(TimerPhase::Work),
            session: None,
            daily,
            all_time,
        };

        if let Some(stored) = stored_session {
            engine.phase = stored.phase;
            engine.remaining_secs = stored
                .remaining_secs
                .min(engine.settings.duration_secs(stored.phase));
            engine.session = Some(stored.session);
        }

        if daily_stale {
            write_json(engine.store(), DAILY_STATS_KEY, &engine.daily)?;
        }

        Ok(engine)
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> TimerPhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    /// Full length of the current phase under the current settings.
    pub fn phase_duration_secs(&self) -> u64 {
        self.settings.duration_secs(self.phase)
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn settings(&self) -> &TimerSettings {
        &self.settings
    }

    /// Today's statistics as last touched. Call [`refresh_day`](Self::refresh_day)
    /// first if the engine may have lived past midnight.
    pub fn daily_stats(&self) -> &DailyStats {
        &self.daily
    }

    pub fn all_time_stats(&self) -> &AllTimeStats {
        &self.all_time
    }

    /// Seconds credited to a project today.
    pub fn project_time_today(&self, project_id: &str, project_name: Option<&str>) -> u64 {
        self.daily
            .project_time(&project_key(project_id, project_name))
    }

    /// Seconds credited to a project overall.
    pub fn project_time_total(&self, project_id: &str, project_name: Option<&str>) -> u64 {
        self.all_time
            .project_time(&project_key(project_id, project_name))
    }

    /// 0.0 .. 1.0 progress within the current phase.
    pub fn phase_progress(&self) -> f64 {
        let total = self.phase_duration_secs();
        if total == 0 {
            return 0.0;
        }
        1.0 - (self.remaining_secs as f64 / total as f64)
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self) -> Event {
        Event::StateSnapshot {
            phase: self.phase,
            running: self.running,
            remaining_secs: self.remaining_secs,
            total_secs: self.phase_duration_secs(),
            session: self.session.clone(),
            at: self.ports.clock.now(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start or resume the countdown.
    ///
    /// Opens a work session with `attribution` only when none exists and
    /// the phase is Work; otherwise the attribution is ignored. Returns
    /// `None` if already running.
    pub fn start(&mut self, attribution: Attribution) -> Option<Event> {
        if self.running {
            return None;
        }
        self.refresh_day();

        let session_created = self.session.is_none() && self.phase == TimerPhase::Work;
        if session_created {
            self.session = Some(Session::open(attribution, self.ports.clock.now()));
            self.daily.sessions += 1;
            self.persist_daily();
        }
        self.running = true;
        self.persist_session();

        debug!(phase = ?self.phase, remaining = self.remaining_secs, session_created, "timer started");
        Some(Event::TimerStarted {
            phase: self.phase,
            remaining_secs: self.remaining_secs,
            session_created,
            at: self.ports.clock.now(),
        })
    }

    /// Stop counting down, keeping the remaining time.
    pub fn pause(&mut self) -> Option<Event> {
        if !self.running {
            return None;
        }
        self.running = false;
        self.persist_session();
        Some(Event::TimerPaused {
            phase: self.phase,
            remaining_secs: self.remaining_secs,
            at: self.ports.clock.now(),
        })
    }

    /// Rewind the current phase. In Work the session is discarded without
    /// crediting any elapsed time.
    pub fn stop(&mut self) -> Option<Event> {
        self.running = false;
        self.remaining_secs = self.phase_duration_secs();
        let session_discarded = self.phase == TimerPhase::Work && self.session.take().is_some();
        if self.phase == TimerPhase::Work {
            self.remove_session();
        } else {
            self.persist_session();
        }
        Some(Event::TimerStopped {
            phase: self.phase,
            remaining_secs: self.remaining_secs,
            session_discarded,
            at: self.ports.clock.now(),
        })
    }

    /// Back to a fresh work phase with no session.
    pub fn reset(&mut self) -> Option<Event> {
        self.running = false;
        self.phase = TimerPhase::Work;
        self.remaining_secs = self.phase_duration_secs();
        self.session = None;
        self.remove_session();
        Some(Event::TimerReset {
            at: self.ports.clock.now(),
        })
    }

    /// Advance the countdown by one second.
    ///
    /// Returns `Some(Event::PhaseCompleted)` when the countdown reaches zero.
    pub fn tick(&mut self) -> Option<Event> {
        if !self.running {
            return None;
        }
        if self.remaining_secs > 0 {
            self.remaining_secs -= 1;
            self.persist_session();
        }
        if self.remaining_secs == 0 {
            return Some(self.complete_phase());
        }
        None
    }

    /// Replace the settings.
    ///
    /// The remaining time is kept, except that it is clamped to the new
    /// duration of the current phase.
    ///
    /// # Errors
    /// Invalid settings are rejected and nothing changes.
    pub fn update_settings(&mut self, settings: TimerSettings) -> Result<Event, ValidationError> {
        settings.validate()?;
        self.settings = settings;
        self.remaining_secs = self.remaining_secs.min(self.phase_duration_secs());
        if let Err(e) = write_json(self.store(), SETTINGS_KEY, &self.settings) {
            warn!("failed to persist timer settings: {e}");
        }
        self.persist_session();
        Ok(Event::SettingsUpdated {
            settings,
            remaining_secs: self.remaining_secs,
            at: self.ports.clock.now(),
        })
    }

    /// Replace today's stats with a zeroed record if the date has changed.
    /// Returns whether a rollover happened.
    pub fn refresh_day(&mut self) -> bool {
        let today = self.ports.clock.today();
        if self.daily.is_for(today) {
            return false;
        }
        debug!(previous = %self.daily.date, %today, "rolling daily stats over");
        self.daily = DailyStats::new(today);
        self.persist_daily();
        true
    }

    /// Write settings, both stats records and the session.
    ///
    /// # Errors
    /// Surfaces the first store failure. Commands only log them.
    pub fn save(&self) -> Result<(), StorageError> {
        let store = self.store();
        write_json(store, SETTINGS_KEY, &self.settings)?;
        write_json(store, DAILY_STATS_KEY, &self.daily)?;
        write_json(store, ALL_TIME_STATS_KEY, &self.all_time)?;
        match self.stored_session() {
            Some(stored) => write_json(store, SESSION_KEY, &stored),
            None => store.remove(SESSION_KEY),
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn complete_phase(&mut self) -> Event {
        self.running = false;
        self.refresh_day();

        if self.settings.sound_enabled {
            if let Err(e) = self.ports.sound.play() {
                debug!("notification sound failed: {e}");
            }
        }

        let completed = self.phase;
        let credited_secs = self.settings.duration_secs(completed);

        if completed.is_break() {
            self.daily.break_time += credited_secs;
            self.all_time.total_break_time += credited_secs;
            self.phase = TimerPhase::Work;
        } else {
            self.daily.completed_sessions += 1;
            self.all_time.total_sessions += 1;
            self.daily.work_time += credited_secs;
            self.all_time.total_work_time += credited_secs;

            if let Some(session) = &self.session {
                if let Some(project_id) = session.attributed_project() {
                    let key = project_key(project_id, session.project_name.as_deref());
                    credit(&mut self.daily.project_breakdown, &key, credited_secs);
                    credit(&mut self.all_time.project_breakdown, &key, credited_secs);
                }
            }

            // The session is kept across the break; stop/reset discard it.
            self.phase = if self.daily.completed_sessions % self.settings.sessions_until_long_break == 0 {
                TimerPhase::LongBreak
            } else {
                TimerPhase::ShortBreak
            };
        }
        self.remaining_secs = self.phase_duration_secs();
        if let Some(session) = self.session.as_mut() {
            session.is_break = self.phase.is_break();
        }

        self.persist_daily();
        if let Err(e) = write_json(self.store(), ALL_TIME_STATS_KEY, &self.all_time) {
            warn!("failed to persist all-time stats: {e}");
        }
        self.persist_session();

        debug!(?completed, next = ?self.phase, credited_secs, "phase completed");
        Event::PhaseCompleted {
            completed,
            next: self.phase,
            credited_secs,
            at: self.ports.clock.now(),
        }
    }

    fn store(&self) -> &dyn KvStore {
        self.ports.store.as_ref()
    }

    fn stored_session(&self) -> Option<StoredSession> {
        self.session.as_ref().map(|session| StoredSession {
            session: session.clone(),
            phase: self.phase,
            remaining_secs: self.remaining_secs,
        })
    }

    fn persist_daily(&self) {
        if let Err(e) = write_json(self.store(), DAILY_STATS_KEY, &self.daily) {
            warn!("failed to persist daily stats: {e}");
        }
    }

    fn persist_session(&self) {
        if let Some(stored) = self.stored_session() {
            if let Err(e) = write_json(self.store(), SESSION_KEY, &stored) {
                warn!("failed to persist current session: {e}");
            }
        }
    }

    fn remove_session(&self) {
        if let Err(e) = self.store().remove(SESSION_KEY) {
            warn!("failed to clear current session: {e}");
        }
    }
}

fn load_json<T: DeserializeOwned>(
    store: &dyn KvStore,
    key: &str,
) -> Result<Option<T>, StorageError> {
    let Some(raw) = store.get(key)? else {
        return Ok(None);
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            warn!(key, "discarding malformed stored value: {e}");
            Ok(None)
        }
    }
}

fn write_json<T: Serialize>(store: &dyn KvStore, key: &str, value: &T) -> Result<(), StorageError> {
    let json = serde_json::to_string(value).map_err(|e| StorageError::Encode {
        key: key.to_string(),
        message: e.to_string(),
    })?;
    store.set(key, &json)
}
