//! REST task tracker -- reports pomodoro activity to the task backend.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tokio::runtime::Handle;
use url::Url;

use super::IntentSink;
use crate::error::TrackerError;
use crate::events::Intent;
use crate::storage::BackendConfig;

pub struct RestTaskTracker {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl RestTaskTracker {
    /// Build a client from the `[backend]` config section.
    pub fn new(config: &BackendConfig) -> Result<Self, TrackerError> {
        let base_url = Url::parse(&config.base_url)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()?;
        Ok(Self {
            client,
            base_url,
            token: config.token.clone().filter(|t| !t.is_empty()),
        })
    }

    /// `{base}/tasks/{id}/{action}/` for the given intent.
    pub fn endpoint(&self, intent: &Intent) -> Result<Url, TrackerError> {
        let action = match intent {
            Intent::FocusStarted(_) => "start_pomodoro",
            Intent::FocusEnded(_) => "end_pomodoro",
            Intent::TaskCompleted(_) => "complete",
        };
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .extend(["tasks", intent.task_id().as_str(), action, ""]);
        Ok(url)
    }

    /// POST the intent and wait for the backend's answer.
    pub async fn deliver(&self, intent: &Intent) -> Result<(), TrackerError> {
        let url = self.endpoint(intent)?;
        let mut request = self.client.post(url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let resp = request.send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let body = resp.text().await.unwrap_or_default();
        Err(TrackerError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

/// Delivers intents on a tokio runtime without blocking the caller.
/// Failures are logged and otherwise ignored.
#[derive(Clone)]
pub struct SpawningSink {
    tracker: Arc<RestTaskTracker>,
    runtime: Handle,
}

impl SpawningSink {
    pub fn new(tracker: RestTaskTracker, runtime: Handle) -> Self {
        Self {
            tracker: Arc::new(tracker),
            runtime,
        }
    }

    /// Bind to the runtime the caller is running on.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn on_current_runtime(tracker: RestTaskTracker) -> Self {
        Self::new(tracker, Handle::current())
    }
}

impl IntentSink for SpawningSink {
    fn dispatch(&self, intent: Intent) {
        let tracker = Arc::clone(&self.tracker);
        self.runtime.spawn(async move {
            match tracker.deliver(&intent).await {
                Ok(()) => tracing::debug!(?intent, "intent delivered"),
                Err(e) => tracing::warn!(?intent, error = %e, "failed to deliver intent"),
            }
        });
    }
}
