mod engine;
mod service;
mod session;
mod settings;

pub use engine::PomodoroEngine;
pub use service::TimerService;
pub use session::{
    format_clock, Phase, PhaseExit, SessionHistoryEntry, SessionKey, StartOutcome, TaskId,
    TickOutcome, TimerSession,
};
pub use settings::TimerSettings;
