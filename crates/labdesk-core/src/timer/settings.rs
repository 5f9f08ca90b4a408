use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// The timer's current mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerPhase {
    Work,
    ShortBreak,
    LongBreak,
}

impl TimerPhase {
    pub fn is_break(self) -> bool {
        !matches!(self, TimerPhase::Work)
    }

    pub fn label(self) -> &'static str {
        match self {
            TimerPhase::Work => "Work",
            TimerPhase::ShortBreak => "Short Break",
            TimerPhase::LongBreak => "Long Break",
        }
    }
}

impl Default for TimerPhase {
    fn default() -> Self {
        TimerPhase::Work
    }
}

/// User-tunable durations. Minutes for the three phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSettings {
    #[serde(default = "default_work_duration")]
    pub work_duration: u32,
    #[serde(default = "default_short_break")]
    pub short_break: u32,
    #[serde(default = "default_long_break")]
    pub long_break: u32,
    #[serde(default = "default_sessions_until_long_break")]
    pub sessions_until_long_break: u32,
    #[serde(default = "default_true")]
    pub sound_enabled: bool,
}

fn default_work_duration() -> u32 {
    25
}
fn default_short_break() -> u32 {
    5
}
fn default_long_break() -> u32 {
    15
}
fn default_sessions_until_long_break() -> u32 {
    4
}
fn default_true() -> bool {
    true
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            work_duration: default_work_duration(),
            short_break: default_short_break(),
            long_break: default_long_break(),
            sessions_until_long_break: default_sessions_until_long_break(),
            sound_enabled: true,
        }
    }
}

impl TimerSettings {
    /// Full length of `phase` in seconds.
    pub fn duration_secs(&self, phase: TimerPhase) -> u64 {
        let minutes = match phase {
            TimerPhase::Work => self.work_duration,
            TimerPhase::ShortBreak => self.short_break,
            TimerPhase::LongBreak => self.long_break,
        };
        u64::from(minutes) * 60
    }

    /// # Errors
    /// Returns the first offending field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in [
            ("work_duration", self.work_duration),
            ("short_break", self.short_break),
            ("long_break", self.long_break),
        ] {
            if value == 0 {
                return Err(ValidationError::NotPositive { field });
            }
        }
        if self.sessions_until_long_break < 2 {
            return Err(ValidationError::BelowMinimum {
                field: "sessions_until_long_break",
                min: 2,
                value: self.sessions_until_long_break,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_are_classic_pomodoro() {
        let s = TimerSettings::default();
        assert_eq!(s.duration_secs(TimerPhase::Work), 25 * 60);
        assert_eq!(s.duration_secs(TimerPhase::ShortBreak), 5 * 60);
        assert_eq!(s.duration_secs(TimerPhase::LongBreak), 15 * 60);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn zero_durations_are_rejected() {
        let s = TimerSettings {
            short_break: 0,
            ..TimerSettings::default()
        };
        assert_eq!(
            s.validate(),
            Err(ValidationError::NotPositive {
                field: "short_break"
            })
        );
    }

    #[test]
    fn long_break_cadence_must_be_at_least_two() {
        let s = TimerSettings {
            sessions_until_long_break: 1,
            ..TimerSettings::default()
        };
        assert!(matches!(
            s.validate(),
            Err(ValidationError::BelowMinimum { min: 2, .. })
        ));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let s: TimerSettings = serde_json::from_str(r#"{"work_duration": 50}"#).unwrap();
        assert_eq!(s.work_duration, 50);
        assert_eq!(s.long_break, 15);
        assert!(s.sound_enabled);
    }

    #[test]
    fn phase_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&TimerPhase::LongBreak).unwrap(),
            "\"long_break\""
        );
        assert!(TimerPhase::ShortBreak.is_break());
        assert!(!TimerPhase::Work.is_break());
    }
}
