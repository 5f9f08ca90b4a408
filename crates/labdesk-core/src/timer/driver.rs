//! Owns a [`TimerEngine`] and the one-second tick task that drives it.
//!
//! Every command cancels the running tick task before touching the engine
//! and spawns a fresh one afterwards only if the engine is still running, so
//! at most one task ever ticks a given engine.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::debug;

use super::engine::TimerEngine;
use super::session::Attribution;
use super::settings::TimerSettings;
use crate::error::ValidationError;
use crate::events::Event;

pub struct TimerDriver {
    engine: Arc<Mutex<TimerEngine>>,
    ticker: Option<JoinHandle<()>>,
    period: Duration,
    events: mpsc::UnboundedSender<Event>,
}

impl TimerDriver {
    /// Wrap `engine`, ticking once per `period` while it runs.
    ///
    /// The receiver yields every command result, a snapshot after each tick,
    /// and phase completions.
    pub fn new(engine: TimerEngine, period: Duration) -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (events, rx) = mpsc::unbounded_channel();
        let driver = Self {
            engine: Arc::new(Mutex::new(engine)),
            ticker: None,
            period,
            events,
        };
        (driver, rx)
    }

    /// Shared handle for read access from the host.
    pub fn engine(&self) -> Arc<Mutex<TimerEngine>> {
        Arc::clone(&self.engine)
    }

    /// Whether a tick task is alive.
    pub fn is_ticking(&self) -> bool {
        self.ticker.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub async fn start(&mut self, attribution: Attribution) -> Option<Event> {
        self.command(|engine| engine.start(attribution)).await
    }

    pub async fn pause(&mut self) -> Option<Event> {
        self.command(TimerEngine::pause).await
    }

    pub async fn stop(&mut self) -> Option<Event> {
        self.command(TimerEngine::stop).await
    }

    pub async fn reset(&mut self) -> Option<Event> {
        self.command(TimerEngine::reset).await
    }

    pub async fn update_settings(
        &mut self,
        settings: TimerSettings,
    ) -> Result<Event, ValidationError> {
        self.cancel_ticker();
        let (result, running) = {
            let mut engine = self.engine.lock().await;
            let result = engine.update_settings(settings);
            (result, engine.is_running())
        };
        if let Ok(event) = &result {
            let _ = self.events.send(event.clone());
        }
        if running {
            self.spawn_ticker();
        }
        result
    }

    /// Cancel the tick task and hand back the engine.
    pub async fn shutdown(mut self) -> Option<TimerEngine> {
        if let Some(handle) = self.ticker.take() {
            handle.abort();
            // Wait for the task to drop its engine handle.
            let _ = handle.await;
        }
        let engine = Arc::clone(&self.engine);
        drop(self);
        Arc::try_unwrap(engine).ok().map(Mutex::into_inner)
    }

    async fn command<F>(&mut self, f: F) -> Option<Event>
    where
        F: FnOnce(&mut TimerEngine) -> Option<Event>,
    {
        self.cancel_ticker();
        let (event, running) = {
            let mut engine = self.engine.lock().await;
            let event = f(&mut engine);
            (event, engine.is_running())
        };
        if let Some(event) = &event {
            let _ = self.events.send(event.clone());
        }
        if running {
            self.spawn_ticker();
        }
        event
    }

    fn spawn_ticker(&mut self) {
        let engine = Arc::clone(&self.engine);
        let events = self.events.clone();
        let period = self.period;

        self.ticker = Some(tokio::spawn(async move {
            let mut interval = time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                let mut guard = engine.lock().await;
                if !guard.is_running() {
                    break;
                }
                let completed = guard.tick();
                let _ = events.send(guard.snapshot());
                if let Some(event) = completed {
                    let _ = events.send(event);
                }
                if !guard.is_running() {
                    break;
                }
            }
            debug!("tick task finished");
        }));
    }

    fn cancel_ticker(&mut self) {
        if let Some(handle) = self.ticker.take() {
            handle.abort();
        }
    }
}

impl Drop for TimerDriver {
    fn drop(&mut self) {
        self.cancel_ticker();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::timer::{TimerPhase, TimerPorts};

    fn one_minute_driver() -> (TimerDriver, mpsc::UnboundedReceiver<Event>) {
        let settings = TimerSettings {
            work_duration: 1,
            ..TimerSettings::default()
        };
        let engine = TimerEngine::load(TimerPorts::new(MemoryStore::new()), settings).unwrap();
        TimerDriver::new(engine, Duration::from_secs(1))
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_once_per_period_while_running() {
        let (mut driver, _rx) = one_minute_driver();
        driver.start(Attribution::none()).await;
        assert!(driver.is_ticking());

        time::sleep(Duration::from_millis(5_500)).await;
        assert_eq!(driver.engine().lock().await.remaining_secs(), 55);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_cancels_the_tick_task() {
        let (mut driver, _rx) = one_minute_driver();
        driver.start(Attribution::none()).await;
        time::sleep(Duration::from_millis(3_500)).await;

        driver.pause().await;
        assert!(!driver.is_ticking());
        time::sleep(Duration::from_secs(10)).await;
        assert_eq!(driver.engine().lock().await.remaining_secs(), 57);

        // Resuming does not stack a second ticker on top of the first.
        driver.start(Attribution::none()).await;
        driver.start(Attribution::none()).await;
        time::sleep(Duration::from_millis(2_500)).await;
        assert_eq!(driver.engine().lock().await.remaining_secs(), 55);
    }

    #[tokio::test(start_paused = true)]
    async fn phase_completion_ends_the_tick_task() {
        let (mut driver, mut rx) = one_minute_driver();
        driver.start(Attribution::project("7", "X")).await;
        time::sleep(Duration::from_secs(61)).await;

        assert!(!driver.is_ticking());
        {
            let engine = driver.engine();
            let engine = engine.lock().await;
            assert_eq!(engine.phase(), TimerPhase::ShortBreak);
            assert!(!engine.is_running());
            assert_eq!(engine.project_time_total("7", Some("X")), 60);
        }

        let mut completed = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let Event::PhaseCompleted { completed: phase, .. } = event {
                completed.push(phase);
            }
        }
        assert_eq!(completed, vec![TimerPhase::Work]);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_returns_the_engine() {
        let (mut driver, _rx) = one_minute_driver();
        driver.start(Attribution::none()).await;
        time::sleep(Duration::from_millis(1_500)).await;
        let engine = driver.shutdown().await.unwrap();
        assert_eq!(engine.remaining_secs(), 59);
    }
}
