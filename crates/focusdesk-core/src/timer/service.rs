//! Async driver for [`PomodoroEngine`].
//!
//! Runs one periodic ticker task per running session. Tickers are aborted
//! before the session they drive is paused, reset or skipped, and every
//! tick carries the epoch it was started with, so a tick that slips
//! through cancellation cannot touch a newer run.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

use super::engine::PomodoroEngine;
use super::session::{SessionKey, StartOutcome, TaskId, TickOutcome, TimerSession};
use super::settings::TimerSettings;
use crate::error::{ConfigError, TimerError};
use crate::events::Event;

pub struct TimerService {
    engine: Arc<Mutex<PomodoroEngine>>,
    tickers: Mutex<HashMap<SessionKey, JoinHandle<()>>>,
    tick_interval: Duration,
}

impl TimerService {
    pub fn new(engine: PomodoroEngine) -> Self {
        Self {
            engine: Arc::new(Mutex::new(engine)),
            tickers: Mutex::new(HashMap::new()),
            tick_interval: Duration::from_secs(1),
        }
    }

    /// Override the one-second tick period.
    pub fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    /// Read the engine under its lock. Every mutation goes through the
    /// service so a running session always has exactly one ticker.
    pub async fn with_engine<R>(&self, f: impl FnOnce(&PomodoroEngine) -> R) -> R {
        let engine = self.engine.lock().await;
        f(&engine)
    }

    pub async fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.engine.lock().await.subscribe()
    }

    pub async fn session(&self, key: &SessionKey) -> Option<TimerSession> {
        self.engine.lock().await.session(key)
    }

    /// Whether a live ticker is driving this session.
    pub async fn is_ticking(&self, key: &SessionKey) -> bool {
        self.tickers
            .lock()
            .await
            .get(key)
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Start or resume, spawning a ticker only when the session actually
    /// began running.
    pub async fn start(&self, key: &SessionKey) -> StartOutcome {
        let mut tickers = self.tickers.lock().await;
        let (outcome, epoch) = {
            let mut engine = self.engine.lock().await;
            let outcome = engine.start_timer(key);
            (outcome, engine.epoch(key))
        };

        if let (true, Some(epoch)) = (outcome.began_running(), epoch) {
            if let Some(stale) = tickers.remove(key) {
                stale.abort();
            }
            tickers.insert(key.clone(), self.spawn_ticker(key.clone(), epoch));
        }
        outcome
    }

    pub async fn resume(&self, key: &SessionKey) -> Result<StartOutcome, TimerError> {
        if self.session(key).await.is_none() {
            return Err(TimerError::NoActiveSession { key: key.clone() });
        }
        Ok(self.start(key).await)
    }

    pub async fn pause(&self, key: &SessionKey) -> Result<TimerSession, TimerError> {
        let mut tickers = self.tickers.lock().await;
        cancel(&mut tickers, key);
        self.engine.lock().await.pause_timer(key)
    }

    pub async fn stop(&self, key: &SessionKey) -> Result<TimerSession, TimerError> {
        let mut tickers = self.tickers.lock().await;
        cancel(&mut tickers, key);
        self.engine.lock().await.stop_timer(key)
    }

    pub async fn skip(&self, key: &SessionKey) -> Result<TimerSession, TimerError> {
        let mut tickers = self.tickers.lock().await;
        cancel(&mut tickers, key);
        self.engine.lock().await.skip(key)
    }

    pub async fn mark_task_complete(&self, task_id: &TaskId) -> Result<(), TimerError> {
        self.engine.lock().await.mark_task_complete(task_id)
    }

    pub async fn update_settings(&self, settings: TimerSettings) -> Result<(), ConfigError> {
        self.engine.lock().await.update_settings(settings)
    }

    /// Stop driving a session and forget it.
    pub async fn discard(&self, key: &SessionKey) -> Option<TimerSession> {
        let mut tickers = self.tickers.lock().await;
        cancel(&mut tickers, key);
        self.engine.lock().await.discard(key)
    }

    fn spawn_ticker(&self, key: SessionKey, epoch: u64) -> JoinHandle<()> {
        let engine = Arc::clone(&self.engine);
        let period = self.tick_interval;

        tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            loop {
                interval.tick().await;
                let outcome = engine.lock().await.tick_at(&key, epoch);
                match outcome {
                    Ok(TickOutcome::Counting { .. }) => continue,
                    Ok(outcome) => {
                        tracing::debug!(%key, ?outcome, "ticker finished");
                        break;
                    }
                    Err(e) => {
                        tracing::debug!(%key, error = %e, "ticker lost its session");
                        break;
                    }
                }
            }
        })
    }
}

fn cancel(tickers: &mut HashMap<SessionKey, JoinHandle<()>>, key: &SessionKey) {
    if let Some(handle) = tickers.remove(key) {
        handle.abort();
    }
}

impl Drop for TimerService {
    fn drop(&mut self) {
        for (_, handle) in self.tickers.get_mut().drain() {
            handle.abort();
        }
    }
}
