//! Per-key timer session and its phase state machine.
//!
//! A [`TimerSession`] only knows how to move itself between phases. The
//! engine wraps these transitions with history, intents and events.
//!
//! ```text
//! Focus --(expire | skip)--> Break | LongBreak --(expire | skip)--> Focus
//! ```

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::settings::TimerSettings;

/// Identifier of a task in the external task store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for TaskId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<u64> for TaskId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

/// Registry key: one session per task, plus one task-less session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKey {
    Task(TaskId),
    General,
}

impl SessionKey {
    pub fn task(id: impl Into<TaskId>) -> Self {
        SessionKey::Task(id.into())
    }

    pub fn task_id(&self) -> Option<&TaskId> {
        match self {
            SessionKey::Task(id) => Some(id),
            SessionKey::General => None,
        }
    }
}

impl From<Option<TaskId>> for SessionKey {
    fn from(id: Option<TaskId>) -> Self {
        id.map(SessionKey::Task).unwrap_or(SessionKey::General)
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionKey::Task(id) => write!(f, "task {id}"),
            SessionKey::General => f.write_str("general session"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Focus,
    Break,
    LongBreak,
}

impl Phase {
    pub fn is_focus(self) -> bool {
        self == Phase::Focus
    }

    pub fn title(self) -> &'static str {
        match self {
            Phase::Focus => "Focus Time",
            Phase::Break => "Short Break",
            Phase::LongBreak => "Long Break",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// What `start_timer` actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartOutcome {
    /// Fresh run of the current phase.
    Started,
    /// Continued after an explicit pause.
    Resumed,
    /// Was already ticking; nothing changed.
    AlreadyRunning,
}

impl StartOutcome {
    pub fn began_running(self) -> bool {
        !matches!(self, StartOutcome::AlreadyRunning)
    }
}

/// Result of a single tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TickOutcome {
    /// Decremented; still running.
    Counting { time_left_secs: u32 },
    /// Reached zero and ran the completion transition.
    Completed { finished: Phase, next: Phase },
    /// Session is not running; nothing changed.
    Idle,
    /// Tick came from a ticker that has since been cancelled.
    Stale,
}

/// A phase boundary crossed by expiry or skip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseExit {
    pub finished: Phase,
    pub next: Phase,
    /// `total_secs` of the finished phase.
    pub duration_secs: u32,
    /// The session was ticking when the boundary was crossed.
    pub was_running: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSession {
    pub task_id: Option<TaskId>,
    pub phase: Phase,
    pub time_left_secs: u32,
    pub total_secs: u32,
    pub cycle_count: u32,
    pub completed_focus_sessions: u32,
    pub running: bool,
    pub paused: bool,
}

impl TimerSession {
    /// A not-yet-started focus session. Also what callers render for a key
    /// that has no session.
    pub fn fresh(key: &SessionKey, settings: &TimerSettings) -> Self {
        let total = settings.focus_secs();
        Self {
            task_id: key.task_id().cloned(),
            phase: Phase::Focus,
            time_left_secs: total,
            total_secs: total,
            cycle_count: 0,
            completed_focus_sessions: 0,
            running: false,
            paused: false,
        }
    }

    pub fn key(&self) -> SessionKey {
        self.task_id.clone().into()
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// 0.0 .. 100.0 elapsed share of the current phase.
    pub fn progress_pct(&self) -> f64 {
        if self.total_secs == 0 {
            return 0.0;
        }
        let elapsed = self.total_secs.saturating_sub(self.time_left_secs);
        elapsed as f64 / self.total_secs as f64 * 100.0
    }

    /// Focus sessions done relative to `target`, capped at 100.
    pub fn target_progress_pct(&self, target: u32) -> f64 {
        if target == 0 {
            return 100.0;
        }
        (self.completed_focus_sessions as f64 / target as f64 * 100.0).min(100.0)
    }

    /// 1-based number of the cycle in progress.
    pub fn current_cycle(&self) -> u32 {
        self.cycle_count.saturating_add(1)
    }

    /// The start control should read "Resume" rather than "Start".
    pub fn can_resume(&self) -> bool {
        self.paused && !self.running
    }

    pub fn clock(&self) -> String {
        format_clock(self.time_left_secs)
    }

    // ── Transitions ──────────────────────────────────────────────────

    pub(crate) fn begin_run(&mut self) -> StartOutcome {
        if self.running {
            return StartOutcome::AlreadyRunning;
        }
        let resumed = self.paused;
        self.running = true;
        self.paused = false;
        if resumed {
            StartOutcome::Resumed
        } else {
            StartOutcome::Started
        }
    }

    pub(crate) fn halt(&mut self) {
        self.running = false;
        self.paused = true;
    }

    /// Decrement by one second. Returns `true` when the phase just expired.
    pub(crate) fn count_down(&mut self) -> bool {
        if !self.running {
            return false;
        }
        self.time_left_secs = self.time_left_secs.saturating_sub(1);
        self.time_left_secs == 0
    }

    /// Cross the phase boundary, by expiry or by skip. Focus exits bump
    /// both counters before the long-break check.
    pub(crate) fn advance(&mut self, settings: &TimerSettings) -> PhaseExit {
        let finished = self.phase;
        let duration_secs = self.total_secs;
        let was_running = self.running;

        let next = if finished.is_focus() {
            self.cycle_count = self.cycle_count.saturating_add(1);
            self.completed_focus_sessions = self.completed_focus_sessions.saturating_add(1);
            let long = settings.is_long_break(self.cycle_count);
            self.total_secs = settings.break_secs(long);
            if long {
                Phase::LongBreak
            } else {
                Phase::Break
            }
        } else {
            self.total_secs = settings.focus_secs();
            Phase::Focus
        };

        self.phase = next;
        self.time_left_secs = self.total_secs;
        self.running = false;
        self.paused = false;

        PhaseExit {
            finished,
            next,
            duration_secs,
            was_running,
        }
    }
}

/// Immutable log entry written every time a phase ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionHistoryEntry {
    pub phase: Phase,
    pub duration_secs: u32,
    pub completed_at: DateTime<Utc>,
    pub task_name: String,
    pub skipped: bool,
}

/// `MM:SS`, minutes unbounded.
pub fn format_clock(secs: u32) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running(settings: &TimerSettings) -> TimerSession {
        let mut s = TimerSession::fresh(&SessionKey::task(7u64), settings);
        s.begin_run();
        s
    }

    #[test]
    fn fresh_session_is_idle_focus() {
        let s = TimerSession::fresh(&SessionKey::General, &TimerSettings::default());
        assert_eq!(s.phase, Phase::Focus);
        assert_eq!(s.total_secs, 1500);
        assert_eq!(s.time_left_secs, 1500);
        assert!(!s.running && !s.paused);
        assert_eq!(s.key(), SessionKey::General);
        assert_eq!(s.clock(), "25:00");
    }

    #[test]
    fn begin_run_distinguishes_start_and_resume() {
        let settings = TimerSettings::default();
        let mut s = TimerSession::fresh(&SessionKey::General, &settings);
        assert_eq!(s.begin_run(), StartOutcome::Started);
        assert_eq!(s.begin_run(), StartOutcome::AlreadyRunning);
        s.halt();
        assert!(s.can_resume());
        assert_eq!(s.begin_run(), StartOutcome::Resumed);
        assert!(s.running && !s.paused);
    }

    #[test]
    fn count_down_stops_at_zero() {
        let settings = TimerSettings::default();
        let mut s = running(&settings);
        s.time_left_secs = 1;
        assert!(s.count_down());
        assert_eq!(s.time_left_secs, 0);
        assert!(s.count_down());
        assert_eq!(s.time_left_secs, 0);
    }

    #[test]
    fn count_down_ignores_halted_session() {
        let settings = TimerSettings::default();
        let mut s = running(&settings);
        s.halt();
        assert!(!s.count_down());
        assert_eq!(s.time_left_secs, 1500);
    }

    #[test]
    fn break_exit_leaves_counts_alone() {
        let settings = TimerSettings::default();
        let mut s = running(&settings);
        s.advance(&settings);
        assert_eq!(s.phase, Phase::Break);
        let exit = s.advance(&settings);
        assert_eq!(exit.finished, Phase::Break);
        assert_eq!(exit.next, Phase::Focus);
        assert!(!exit.was_running);
        assert_eq!(s.cycle_count, 1);
        assert_eq!(s.completed_focus_sessions, 1);
        assert_eq!(s.total_secs, 1500);
    }

    #[test]
    fn progress_and_labels() {
        let settings = TimerSettings::default();
        let mut s = running(&settings);
        s.time_left_secs = 750;
        assert!((s.progress_pct() - 50.0).abs() < f64::EPSILON);
        s.completed_focus_sessions = 6;
        assert_eq!(s.target_progress_pct(4), 100.0);
        assert_eq!(s.current_cycle(), 1);
        assert_eq!(Phase::LongBreak.title(), "Long Break");
        assert_eq!(format_clock(61), "01:01");
        assert_eq!(format_clock(3600), "60:00");
    }

    #[test]
    fn session_key_serializes_readably() {
        let key = SessionKey::task(12u64);
        assert_eq!(serde_json::to_string(&key).unwrap(), r#"{"task":"12"}"#);
        assert_eq!(serde_json::to_string(&SessionKey::General).unwrap(), r#""general""#);
        assert_eq!(key.to_string(), "task 12");
    }
}
