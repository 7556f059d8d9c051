//! Pomodoro engine: a registry of independent per-task timer sessions.
//!
//! The engine does not own any threads or timers. Something else (see
//! [`super::TimerService`]) calls `tick()` once per elapsed second for every
//! running session. All state math is synchronous and infallible; the only
//! side effects are intents handed to an [`IntentSink`], a best-effort
//! [`Notifier`] cue, and events broadcast to subscribers.
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = PomodoroEngine::new(TimerSettings::default())?;
//! let key = SessionKey::task(42u64);
//! engine.start_timer(&key);
//! // Once per second:
//! engine.tick(&key)?; // TickOutcome::Completed when the phase runs out
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::broadcast;

use super::session::{
    PhaseExit, SessionHistoryEntry, SessionKey, StartOutcome, TaskId, TickOutcome, TimerSession,
};
use super::settings::TimerSettings;
use crate::error::{ConfigError, TimerError};
use crate::events::{Event, Intent};
use crate::notify::{Notifier, SilentNotifier};
use crate::tracker::{IntentSink, NullSink};

const EVENT_CAPACITY: usize = 256;
const GENERAL_SESSION_NAME: &str = "General Session";

/// A registry entry. `epoch` changes whenever the session starts or stops
/// ticking, so ticks issued by a cancelled ticker can be recognised.
#[derive(Debug)]
struct Slot {
    session: TimerSession,
    history: Vec<SessionHistoryEntry>,
    epoch: u64,
    /// `TargetReached` was published for the current target.
    target_announced: bool,
}

pub struct PomodoroEngine {
    settings: TimerSettings,
    slots: HashMap<SessionKey, Slot>,
    task_names: HashMap<TaskId, String>,
    notifier: Box<dyn Notifier>,
    sink: Arc<dyn IntentSink>,
    events: broadcast::Sender<Event>,
    last_epoch: u64,
}

impl PomodoroEngine {
    /// Create an engine with a silent notifier and no task tracker.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any setting is zero.
    pub fn new(settings: TimerSettings) -> Result<Self, ConfigError> {
        settings.validate()?;
        Ok(Self::with_valid_settings(settings))
    }

    fn with_valid_settings(settings: TimerSettings) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            settings,
            slots: HashMap::new(),
            task_names: HashMap::new(),
            notifier: Box::new(SilentNotifier),
            sink: Arc::new(NullSink),
            events,
            last_epoch: 0,
        }
    }

    pub fn with_notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_intent_sink(mut self, sink: Arc<dyn IntentSink>) -> Self {
        self.sink = sink;
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn settings(&self) -> &TimerSettings {
        &self.settings
    }

    /// Snapshot of a session. `None` if it was never started.
    pub fn session(&self, key: &SessionKey) -> Option<TimerSession> {
        self.slots.get(key).map(|slot| slot.session.clone())
    }

    /// Phases ended since the session was created or last reset.
    pub fn history(&self, key: &SessionKey) -> &[SessionHistoryEntry] {
        self.slots
            .get(key)
            .map(|slot| slot.history.as_slice())
            .unwrap_or_default()
    }

    /// Keys of every live session, sorted.
    pub fn sessions(&self) -> Vec<SessionKey> {
        let mut keys: Vec<SessionKey> = self.slots.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Current ticking epoch of a session.
    pub fn epoch(&self, key: &SessionKey) -> Option<u64> {
        self.slots.get(key).map(|slot| slot.epoch)
    }

    pub fn target_reached(&self, key: &SessionKey) -> bool {
        self.slots.get(key).is_some_and(|slot| {
            slot.session.completed_focus_sessions >= self.settings.target_focus_sessions
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Replace the settings. Invalid settings are rejected and the previous
    /// ones kept. Phases already under way keep their assigned length.
    pub fn update_settings(&mut self, settings: TimerSettings) -> Result<(), ConfigError> {
        settings.validate()?;
        self.settings = settings;
        for slot in self.slots.values_mut() {
            if slot.session.completed_focus_sessions < settings.target_focus_sessions {
                slot.target_announced = false;
            }
        }
        tracing::debug!(?settings, "timer settings updated");
        self.publish(Event::SettingsUpdated {
            settings,
            at: Utc::now(),
        });
        Ok(())
    }

    /// Name shown in history entries for this task.
    pub fn set_task_name(&mut self, task_id: TaskId, name: impl Into<String>) {
        self.task_names.insert(task_id, name.into());
    }

    /// Start (creating the session if needed) or resume a timer.
    ///
    /// A fresh focus run on a task emits `FocusStarted`; resuming after a
    /// pause or calling this while already running does not.
    pub fn start_timer(&mut self, key: &SessionKey) -> StartOutcome {
        let epoch = self.next_epoch();
        let settings = self.settings;
        let slot = self.slots.entry(key.clone()).or_insert_with(|| {
            tracing::debug!(%key, "creating timer session");
            Slot {
                session: TimerSession::fresh(key, &settings),
                history: Vec::new(),
                epoch,
                target_announced: false,
            }
        });

        let outcome = slot.session.begin_run();
        if !outcome.began_running() {
            return outcome;
        }
        slot.epoch = epoch;
        let phase = slot.session.phase;
        let time_left_secs = slot.session.time_left_secs;

        if outcome == StartOutcome::Started && phase.is_focus() {
            if let Some(task_id) = key.task_id() {
                self.sink.dispatch(Intent::FocusStarted(task_id.clone()));
            }
        }

        tracing::debug!(%key, ?phase, ?outcome, time_left_secs, "timer running");
        self.publish(Event::SessionStarted {
            key: key.clone(),
            phase,
            time_left_secs,
            resumed: outcome == StartOutcome::Resumed,
            at: Utc::now(),
        });
        outcome
    }

    /// Halt a running session, keeping its remaining time.
    /// A session that is not running is left as it is.
    pub fn pause_timer(&mut self, key: &SessionKey) -> Result<TimerSession, TimerError> {
        let epoch = self.next_epoch();
        let slot = self.slot_mut(key)?;
        if !slot.session.running {
            return Ok(slot.session.clone());
        }
        slot.session.halt();
        slot.epoch = epoch;
        let snapshot = slot.session.clone();

        tracing::debug!(%key, time_left_secs = snapshot.time_left_secs, "timer paused");
        self.publish(Event::SessionPaused {
            key: key.clone(),
            time_left_secs: snapshot.time_left_secs,
            at: Utc::now(),
        });
        Ok(snapshot)
    }

    /// `start_timer` for a session that must already exist.
    pub fn resume_timer(&mut self, key: &SessionKey) -> Result<StartOutcome, TimerError> {
        self.slot_mut(key)?;
        Ok(self.start_timer(key))
    }

    /// Reset: end any running focus interval, clear history and counters and
    /// go back to an idle full-length focus phase.
    pub fn stop_timer(&mut self, key: &SessionKey) -> Result<TimerSession, TimerError> {
        let epoch = self.next_epoch();
        let settings = self.settings;
        let slot = self.slot_mut(key)?;

        let ends_focus = slot.session.phase.is_focus() && slot.session.running;
        slot.session = TimerSession::fresh(key, &settings);
        slot.history.clear();
        slot.epoch = epoch;
        slot.target_announced = false;
        let snapshot = slot.session.clone();

        if ends_focus {
            self.end_focus(key);
        }
        tracing::debug!(%key, "timer reset");
        self.publish(Event::SessionReset {
            key: key.clone(),
            at: Utc::now(),
        });
        Ok(snapshot)
    }

    /// Force the phase boundary now. Counts exactly like natural expiry but
    /// the history entry is marked skipped and no cue is played.
    pub fn skip(&mut self, key: &SessionKey) -> Result<TimerSession, TimerError> {
        let exit = self.cross_boundary(key, true)?;
        if exit.finished.is_focus() && exit.was_running {
            self.end_focus(key);
        }

        tracing::debug!(%key, skipped = ?exit.finished, next = ?exit.next, "phase skipped");
        self.publish(Event::PhaseSkipped {
            key: key.clone(),
            skipped: exit.finished,
            next: exit.next,
            at: Utc::now(),
        });
        self.check_target(key, &exit);
        self.slot_mut(key).map(|slot| slot.session.clone())
    }

    /// Advance a running session by one second using its current epoch.
    pub fn tick(&mut self, key: &SessionKey) -> Result<TickOutcome, TimerError> {
        let epoch = self.slot_mut(key)?.epoch;
        self.tick_at(key, epoch)
    }

    /// Advance by one second on behalf of the ticker started at `epoch`.
    ///
    /// Reaching zero runs the completion transition before returning, so a
    /// phase can complete at most once per run.
    pub fn tick_at(&mut self, key: &SessionKey, epoch: u64) -> Result<TickOutcome, TimerError> {
        let slot = self.slot_mut(key)?;
        if slot.epoch != epoch {
            return Ok(TickOutcome::Stale);
        }
        if !slot.session.running {
            return Ok(TickOutcome::Idle);
        }

        if !slot.session.count_down() {
            let time_left_secs = slot.session.time_left_secs;
            self.publish(Event::Tick {
                key: key.clone(),
                time_left_secs,
                at: Utc::now(),
            });
            return Ok(TickOutcome::Counting { time_left_secs });
        }

        let exit = self.complete(key)?;
        Ok(TickOutcome::Completed {
            finished: exit.finished,
            next: exit.next,
        })
    }

    /// Ask the task store to mark the task done. Only allowed once the
    /// target number of focus sessions has been reached.
    pub fn mark_task_complete(&mut self, task_id: &TaskId) -> Result<(), TimerError> {
        let key = SessionKey::Task(task_id.clone());
        let target = self.settings.target_focus_sessions;
        let completed = self.slot_mut(&key)?.session.completed_focus_sessions;
        if completed < target {
            return Err(TimerError::TargetNotReached { completed, target });
        }
        tracing::debug!(%task_id, completed, "requesting task completion");
        self.sink.dispatch(Intent::TaskCompleted(task_id.clone()));
        Ok(())
    }

    /// Drop a session without emitting anything, e.g. when the view that
    /// owned it goes away for good.
    pub fn discard(&mut self, key: &SessionKey) -> Option<TimerSession> {
        self.slots.remove(key).map(|slot| slot.session)
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn slot_mut(&mut self, key: &SessionKey) -> Result<&mut Slot, TimerError> {
        self.slots
            .get_mut(key)
            .ok_or_else(|| TimerError::NoActiveSession { key: key.clone() })
    }

    fn next_epoch(&mut self) -> u64 {
        self.last_epoch += 1;
        self.last_epoch
    }

    fn task_name(&self, key: &SessionKey) -> String {
        match key {
            SessionKey::Task(id) => self
                .task_names
                .get(id)
                .cloned()
                .unwrap_or_else(|| id.to_string()),
            SessionKey::General => GENERAL_SESSION_NAME.to_string(),
        }
    }

    /// Natural expiry of the current phase.
    fn complete(&mut self, key: &SessionKey) -> Result<PhaseExit, TimerError> {
        let exit = self.cross_boundary(key, false)?;
        if exit.finished.is_focus() {
            self.end_focus(key);
        }

        if let Err(e) = self.notifier.notify(exit.finished) {
            tracing::debug!(error = %e, "completion cue failed");
        }

        tracing::info!(%key, finished = ?exit.finished, next = ?exit.next, "phase completed");
        self.publish(Event::PhaseCompleted {
            key: key.clone(),
            finished: exit.finished,
            next: exit.next,
            duration_secs: exit.duration_secs,
            at: Utc::now(),
        });
        self.check_target(key, &exit);
        Ok(exit)
    }

    /// Shared boundary crossing: history entry, phase advance, new epoch.
    fn cross_boundary(&mut self, key: &SessionKey, skipped: bool) -> Result<PhaseExit, TimerError> {
        let task_name = self.task_name(key);
        let epoch = self.next_epoch();
        let settings = self.settings;
        let slot = self.slot_mut(key)?;

        let exit = slot.session.advance(&settings);
        slot.history.push(SessionHistoryEntry {
            phase: exit.finished,
            duration_secs: exit.duration_secs,
            completed_at: Utc::now(),
            task_name,
            skipped,
        });
        slot.epoch = epoch;
        Ok(exit)
    }

    fn end_focus(&self, key: &SessionKey) {
        if let Some(task_id) = key.task_id() {
            self.sink.dispatch(Intent::FocusEnded(task_id.clone()));
        }
    }

    /// Publish `TargetReached` on the first focus exit at or past the
    /// target. Lowering the target below the count re-arms it.
    fn check_target(&mut self, key: &SessionKey, exit: &PhaseExit) {
        if !exit.finished.is_focus() {
            return;
        }
        let target = self.settings.target_focus_sessions;
        let completed = match self.slots.get_mut(key) {
            Some(slot)
                if !slot.target_announced && slot.session.completed_focus_sessions >= target =>
            {
                slot.target_announced = true;
                slot.session.completed_focus_sessions
            }
            _ => return,
        };
        self.publish(Event::TargetReached {
            key: key.clone(),
            completed_focus_sessions: completed,
            target,
            at: Utc::now(),
        });
    }

    fn publish(&self, event: Event) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

impl Default for PomodoroEngine {
    fn default() -> Self {
        Self::with_valid_settings(TimerSettings::default())
    }
}

impl std::fmt::Debug for PomodoroEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PomodoroEngine")
            .field("settings", &self.settings)
            .field("slots", &self.slots)
            .field("last_epoch", &self.last_epoch)
            .finish_non_exhaustive()
    }
}
