mod driver;
mod engine;
mod format;
mod ports;
mod session;
mod settings;
mod stats;

pub use driver::TimerDriver;
pub use engine::{
    TimerEngine, ALL_TIME_STATS_KEY, DAILY_STATS_KEY, SESSION_KEY, SETTINGS_KEY,
};
pub use format::{format_duration, format_time};
pub use ports::{Clock, FixedClock, NullSound, SoundPlayer, SoundResult, SystemClock, TimerPorts};
pub use session::{Attribution, Session};
pub use settings::{TimerPhase, TimerSettings};
pub use stats::{project_key, AllTimeStats, DailyStats};
