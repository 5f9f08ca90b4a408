//! # Labdesk Core Library
//!
//! Core logic for labdesk, a research desk with a focus timer and folding
//! notes. Everything the `labdesk` CLI does is available here so other hosts
//! can embed the same behaviour.
//!
//! ## Architecture
//!
//! - **Timer Engine**: a Pomodoro state machine built with injected ports
//!   (key-value store, sound, clock). It advances one second per `tick()`;
//!   [`TimerDriver`] owns the recurring tick task.
//! - **Folding**: parses flat markdown into an H1 ⊃ H2 ⊃ H3 tree and renders
//!   it with per-pane collapse state.
//! - **Storage**: SQLite key-value persistence and TOML configuration.
//! - **Sync**: mirrors the research project list to a file on GitHub.
//!
//! ## Key Components
//!
//! - [`TimerEngine`]: timer state machine and statistics
//! - [`CollapseState`]: host-owned fold state, read by the renderers
//! - [`Database`]: `kv` table persistence
//! - [`Config`]: application configuration management

pub mod error;
pub mod events;
pub mod folding;
pub mod storage;
pub mod sync;
pub mod timer;

pub use error::{ConfigError, CoreError, StorageError, SyncError, ValidationError};
pub use events::Event;
pub use folding::{render_html, render_outline, CollapseState};
pub use storage::{Config, Database, KvStore, MemoryStore};
pub use sync::{GitHubSync, SyncSettings, SyncTracker};
pub use timer::{Attribution, TimerDriver, TimerEngine, TimerPhase, TimerPorts, TimerSettings};
