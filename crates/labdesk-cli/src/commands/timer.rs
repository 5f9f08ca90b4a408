use std::io::Write;
use std::time::Duration;

use clap::{Args, Subcommand};
use labdesk_core::timer::{format_time, Attribution, SoundPlayer, SoundResult, TimerSettings};
use labdesk_core::{Config, Event, TimerDriver, TimerEngine};
use tracing::debug;

use super::{block_on, open_engine};

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start or resume the current phase and count it down in the foreground
    Start(AttributionArgs),
    /// Count down phase after phase, starting each next phase automatically
    Run {
        /// Stop after this many phases (runs until Ctrl-C when omitted)
        #[arg(long)]
        phases: Option<u32>,
        #[command(flatten)]
        attribution: AttributionArgs,
    },
    /// Report the saved paused state; a running `timer run` pauses on Ctrl-C
    Pause,
    /// Rewind the current phase; in a work phase the session is discarded
    Stop,
    /// Back to a fresh work phase
    Reset,
    /// Print current timer state as JSON
    Status,
    /// Show or change the timer settings
    Settings {
        /// Work phase length in minutes
        #[arg(long)]
        work: Option<u32>,
        /// Short break length in minutes
        #[arg(long)]
        short_break: Option<u32>,
        /// Long break length in minutes
        #[arg(long)]
        long_break: Option<u32>,
        /// Completed work phases between long breaks
        #[arg(long)]
        sessions: Option<u32>,
        /// Ring the terminal bell when a phase ends
        #[arg(long)]
        sound: Option<bool>,
    },
}

/// Project and task a new work session is attributed to.
#[derive(Args, Default)]
pub struct AttributionArgs {
    #[arg(long)]
    project_id: Option<String>,
    #[arg(long)]
    project_name: Option<String>,
    #[arg(long)]
    task_id: Option<String>,
    #[arg(long)]
    task_name: Option<String>,
}

impl From<AttributionArgs> for Attribution {
    fn from(args: AttributionArgs) -> Self {
        Attribution {
            project_id: args.project_id,
            project_name: args.project_name,
            task_id: args.task_id,
            task_name: args.task_name,
        }
    }
}

/// Notification sound for terminals.
pub struct TerminalBell;

impl SoundPlayer for TerminalBell {
    fn play(&self) -> SoundResult {
        let mut out = std::io::stderr();
        out.write_all(b"\x07")?;
        out.flush()?;
        Ok(())
    }
}

pub fn run(action: TimerAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let mut engine = open_engine(&config)?;

    match action {
        TimerAction::Start(attribution) => {
            let engine = block_on(foreground(engine, attribution.into(), Some(1)))??;
            engine.save()?;
        }
        TimerAction::Run {
            phases,
            attribution,
        } => {
            let engine = block_on(foreground(engine, attribution.into(), phases))??;
            engine.save()?;
        }
        TimerAction::Pause => {
            // A loaded timer is never running, so this only reports the
            // paused state that was saved.
            let event = engine.pause().unwrap_or_else(|| engine.snapshot());
            println!("{}", serde_json::to_string_pretty(&event)?);
            engine.save()?;
        }
        TimerAction::Stop => {
            if let Some(event) = engine.stop() {
                println!("{}", serde_json::to_string_pretty(&event)?);
            }
            engine.save()?;
        }
        TimerAction::Reset => {
            if let Some(event) = engine.reset() {
                println!("{}", serde_json::to_string_pretty(&event)?);
            }
            engine.save()?;
        }
        TimerAction::Status => {
            println!("{}", serde_json::to_string_pretty(&engine.snapshot())?);
        }
        TimerAction::Settings {
            work,
            short_break,
            long_break,
            sessions,
            sound,
        } => {
            let current = *engine.settings();
            let updated = TimerSettings {
                work_duration: work.unwrap_or(current.work_duration),
                short_break: short_break.unwrap_or(current.short_break),
                long_break: long_break.unwrap_or(current.long_break),
                sessions_until_long_break: sessions.unwrap_or(current.sessions_until_long_break),
                sound_enabled: sound.unwrap_or(current.sound_enabled),
            };
            if updated == current {
                println!("{}", serde_json::to_string_pretty(&current)?);
            } else {
                let event = engine.update_settings(updated)?;
                println!("{}", serde_json::to_string_pretty(&event)?);
            }
        }
    }
    Ok(())
}

/// Drive the timer in the foreground until `phases` phases have completed
/// (forever when `None`) or Ctrl-C, which pauses it. Returns the engine.
async fn foreground(
    engine: TimerEngine,
    attribution: Attribution,
    phases: Option<u32>,
) -> Result<TimerEngine, Box<dyn std::error::Error>> {
    let (mut driver, mut events) = TimerDriver::new(engine, Duration::from_secs(1));
    driver.start(attribution).await;
    let mut completed_phases = 0u32;

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                match event {
                    Event::TimerStarted { phase, remaining_secs, .. } => {
                        eprintln!("{} started, {} left", phase.label(), format_time(remaining_secs));
                    }
                    Event::StateSnapshot { phase, remaining_secs, .. } => {
                        eprint!("\r{} {}  ", phase.label(), format_time(remaining_secs));
                    }
                    Event::PhaseCompleted { completed, next, .. } => {
                        eprintln!("\r{} complete, next: {}", completed.label(), next.label());
                        println!("{}", serde_json::to_string(&event)?);
                        completed_phases += 1;
                        if phases.is_some_and(|limit| completed_phases >= limit) {
                            break;
                        }
                        driver.start(Attribution::none()).await;
                    }
                    other => debug!(?other, "timer event"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                driver.pause().await;
                eprintln!("\npaused");
                break;
            }
        }
    }

    driver
        .shutdown()
        .await
        .ok_or_else(|| "timer task did not release the engine".into())
}
