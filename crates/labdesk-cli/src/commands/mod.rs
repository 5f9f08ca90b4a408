pub mod config;
pub mod notes;
pub mod stats;
pub mod sync;
pub mod timer;

use std::future::Future;

use labdesk_core::storage::Database;
use labdesk_core::timer::TimerPorts;
use labdesk_core::{Config, TimerEngine};

/// Run `fut` to completion on a fresh multi-threaded runtime.
pub(crate) fn block_on<F: Future>(fut: F) -> Result<F::Output, std::io::Error> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    Ok(runtime.block_on(fut))
}

/// Load the timer from the data directory, seeded from the config file.
pub(crate) fn open_engine(config: &Config) -> Result<TimerEngine, Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let ports = TimerPorts::new(db).with_sound(timer::TerminalBell);
    Ok(TimerEngine::load(ports, config.timer)?)
}
