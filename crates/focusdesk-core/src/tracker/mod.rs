//! Task tracking collaborator.
//!
//! The engine hands every [`Intent`] to an [`IntentSink`]. Sinks must
//! return immediately: delivery happens elsewhere and its outcome never
//! feeds back into timer state.

mod rest;

use std::sync::{Arc, Mutex};

use crate::events::Intent;

pub use rest::{RestTaskTracker, SpawningSink};

pub trait IntentSink: Send + Sync {
    fn dispatch(&self, intent: Intent);
}

/// Drops every intent. Used when no backend is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl IntentSink for NullSink {
    fn dispatch(&self, intent: Intent) {
        tracing::debug!(?intent, "no task tracker configured, dropping intent");
    }
}

/// Keeps dispatched intents in memory, in order.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    intents: Arc<Mutex<Vec<Intent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intents(&self) -> Vec<Intent> {
        self.intents
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub fn take(&self) -> Vec<Intent> {
        self.intents
            .lock()
            .map(|mut guard| std::mem::take(&mut *guard))
            .unwrap_or_default()
    }
}

impl IntentSink for RecordingSink {
    fn dispatch(&self, intent: Intent) {
        if let Ok(mut guard) = self.intents.lock() {
            guard.push(intent);
        }
    }
}
