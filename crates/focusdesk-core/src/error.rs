//! Core error types for focusdesk-core.
//!
//! This module defines the error hierarchy using thiserror. Timer state
//! math itself never fails; errors come from invalid operations, bad
//! configuration and the task tracker boundary.

use std::path::PathBuf;
use thiserror::Error;

use crate::timer::SessionKey;

/// Core error type for focusdesk-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Invalid timer operation
    #[error("Timer error: {0}")]
    Timer(#[from] TimerError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Task tracker delivery errors
    #[error("Task tracker error: {0}")]
    Tracker(#[from] TrackerError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Invalid-operation errors raised by the pomodoro engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimerError {
    /// The operation needs a session that was never started (or was discarded).
    #[error("no active session for {key}")]
    NoActiveSession { key: SessionKey },

    /// `mark_task_complete` called before enough focus sessions were done.
    #[error("target not reached: {completed}/{target} focus sessions completed")]
    TargetNotReached { completed: u32, target: u32 },
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Key does not exist in the configuration tree
    #[error("unknown config key: {0}")]
    UnknownKey(String),
}

/// Errors delivering an intent to the task tracking backend.
#[derive(Error, Debug)]
pub enum TrackerError {
    /// Transport-level failure
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with a non-success status
    #[error("backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Configured base URL cannot be used
    #[error("invalid backend url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Notification playback failure. Always swallowed by the engine.
#[derive(Error, Debug)]
#[error("notification failed: {0}")]
pub struct NotifyError(pub String);

impl From<std::io::Error> for NotifyError {
    fn from(err: std::io::Error) -> Self {
        NotifyError(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
