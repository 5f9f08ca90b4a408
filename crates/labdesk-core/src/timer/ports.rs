//! Host capabilities the timer engine is constructed with.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Local, NaiveDate, Utc};

use crate::storage::KvStore;

pub type SoundResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Fire-and-forget notification sound.
pub trait SoundPlayer: Send {
    fn play(&self) -> SoundResult;
}

/// Plays nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSound;

impl SoundPlayer for NullSound {
    fn play(&self) -> SoundResult {
        Ok(())
    }
}

/// Source of "now" and of the host-local calendar day.
pub trait Clock: Send {
    fn now(&self) -> DateTime<Utc>;

    fn today(&self) -> NaiveDate;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Settable clock. Clones share the same instant; `today` is the UTC date.
#[derive(Debug, Clone)]
pub struct FixedClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut guard = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *guard += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Everything a [`TimerEngine`](super::TimerEngine) talks to.
pub struct TimerPorts {
    pub(crate) store: Box<dyn KvStore>,
    pub(crate) sound: Box<dyn SoundPlayer>,
    pub(crate) clock: Box<dyn Clock>,
}

impl TimerPorts {
    /// Silent sound and the system clock.
    pub fn new(store: impl KvStore + 'static) -> Self {
        Self {
            store: Box::new(store),
            sound: Box::new(NullSound),
            clock: Box::new(SystemClock),
        }
    }

    pub fn with_sound(mut self, sound: impl SoundPlayer + 'static) -> Self {
        self.sound = Box::new(sound);
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn fixed_clock_clones_move_together() {
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2026, 10, 19, 23, 0, 0).unwrap());
        let handle = clock.clone();
        handle.advance(chrono::Duration::hours(2));
        assert_eq!(
            clock.today(),
            NaiveDate::from_ymd_opt(2026, 10, 20).unwrap()
        );
    }
}
