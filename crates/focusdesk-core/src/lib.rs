//! # Focusdesk Core Library
//!
//! Core logic for the Focusdesk productivity app: a pomodoro focus timer
//! that runs independently for each task. Task, note and tag CRUD lives in
//! the REST backend; this crate only reports focus activity to it.
//!
//! ## Architecture
//!
//! - **Timer Engine**: a registry of per-task session state machines that
//!   requires the caller to invoke `tick()` once per second
//! - **Timer Service**: async driver with one cancellable ticker per running
//!   session
//! - **Tracker**: fire-and-forget delivery of focus/completion intents to
//!   the task backend
//! - **Storage**: TOML-based configuration
//!
//! ## Key Components
//!
//! - [`PomodoroEngine`]: Core timer state machine and session registry
//! - [`TimerService`]: Tokio-driven ticking
//! - [`Config`]: Application configuration management
//! - [`IntentSink`]: Boundary to the task tracking backend

pub mod error;
pub mod events;
pub mod notify;
pub mod storage;
pub mod timer;
pub mod tracker;

pub use error::{ConfigError, CoreError, NotifyError, TimerError, TrackerError};
pub use events::{Event, Intent};
pub use notify::{Notifier, SilentNotifier, TerminalBell};
pub use storage::{BackendConfig, Config, NotificationsConfig};
pub use timer::{
    Phase, PomodoroEngine, SessionHistoryEntry, SessionKey, StartOutcome, TaskId, TickOutcome,
    TimerService, TimerSession, TimerSettings,
};
pub use tracker::{IntentSink, NullSink, RecordingSink, RestTaskTracker, SpawningSink};
