use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Durations and cadence for the pomodoro cycle.
///
/// All values are positive integers. UI bounds (1-60 minutes and so on)
/// are not enforced here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSettings {
    #[serde(default = "default_focus_minutes")]
    pub focus_minutes: u32,
    #[serde(default = "default_break_minutes")]
    pub break_minutes: u32,
    #[serde(default = "default_long_break_minutes")]
    pub long_break_minutes: u32,
    #[serde(default = "default_sessions_until_long_break")]
    pub sessions_until_long_break: u32,
    #[serde(default = "default_target_focus_sessions")]
    pub target_focus_sessions: u32,
}

fn default_focus_minutes() -> u32 {
    25
}
fn default_break_minutes() -> u32 {
    5
}
fn default_long_break_minutes() -> u32 {
    15
}
fn default_sessions_until_long_break() -> u32 {
    4
}
fn default_target_focus_sessions() -> u32 {
    4
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            focus_minutes: default_focus_minutes(),
            break_minutes: default_break_minutes(),
            long_break_minutes: default_long_break_minutes(),
            sessions_until_long_break: default_sessions_until_long_break(),
            target_focus_sessions: default_target_focus_sessions(),
        }
    }
}

impl TimerSettings {
    /// Reject any zero value, naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("focus_minutes", self.focus_minutes),
            ("break_minutes", self.break_minutes),
            ("long_break_minutes", self.long_break_minutes),
            ("sessions_until_long_break", self.sessions_until_long_break),
            ("target_focus_sessions", self.target_focus_sessions),
        ];
        for (key, value) in fields {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: "must be a positive integer".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Focus phase length in seconds.
    ///
    /// Uses saturating arithmetic to prevent overflow with large values.
    pub fn focus_secs(&self) -> u32 {
        self.focus_minutes.saturating_mul(60)
    }

    /// Break length in seconds, long or short.
    pub fn break_secs(&self, long: bool) -> u32 {
        let minutes = if long {
            self.long_break_minutes
        } else {
            self.break_minutes
        };
        minutes.saturating_mul(60)
    }

    /// Whether the focus exit that brought `cycle_count` to its current
    /// value earns a long break. Evaluated on the post-increment count.
    pub fn is_long_break(&self, cycle_count: u32) -> bool {
        self.sessions_until_long_break > 0 && cycle_count % self.sessions_until_long_break == 0
    }
}
