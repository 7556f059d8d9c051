use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::{Phase, SessionKey, TaskId, TimerSettings};

/// Every state change in the engine produces an Event.
/// Observers (the UI shell, the CLI) subscribe to them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    SessionStarted {
        key: SessionKey,
        phase: Phase,
        time_left_secs: u32,
        resumed: bool,
        at: DateTime<Utc>,
    },
    SessionPaused {
        key: SessionKey,
        time_left_secs: u32,
        at: DateTime<Utc>,
    },
    Tick {
        key: SessionKey,
        time_left_secs: u32,
        at: DateTime<Utc>,
    },
    /// A phase ran out naturally.
    PhaseCompleted {
        key: SessionKey,
        finished: Phase,
        next: Phase,
        duration_secs: u32,
        at: DateTime<Utc>,
    },
    PhaseSkipped {
        key: SessionKey,
        skipped: Phase,
        next: Phase,
        at: DateTime<Utc>,
    },
    SessionReset {
        key: SessionKey,
        at: DateTime<Utc>,
    },
    /// Completed focus sessions just hit the configured target.
    TargetReached {
        key: SessionKey,
        completed_focus_sessions: u32,
        target: u32,
        at: DateTime<Utc>,
    },
    SettingsUpdated {
        settings: TimerSettings,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// The session this event concerns, if any.
    pub fn key(&self) -> Option<&SessionKey> {
        match self {
            Event::SessionStarted { key, .. }
            | Event::SessionPaused { key, .. }
            | Event::Tick { key, .. }
            | Event::PhaseCompleted { key, .. }
            | Event::PhaseSkipped { key, .. }
            | Event::SessionReset { key, .. }
            | Event::TargetReached { key, .. } => Some(key),
            Event::SettingsUpdated { .. } => None,
        }
    }
}

/// Side-effect requests for the task tracking backend. Fire-and-forget:
/// the engine never waits on, or reacts to, their delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "intent", content = "task_id", rename_all = "snake_case")]
pub enum Intent {
    FocusStarted(TaskId),
    FocusEnded(TaskId),
    TaskCompleted(TaskId),
}

impl Intent {
    pub fn task_id(&self) -> &TaskId {
        match self {
            Intent::FocusStarted(id) | Intent::FocusEnded(id) | Intent::TaskCompleted(id) => id,
        }
    }
}
