//! Phase-completion cues.
//!
//! The engine calls [`Notifier::notify`] after every natural phase expiry
//! and discards the result.

use std::io::Write;

use crate::error::NotifyError;
use crate::timer::Phase;

pub trait Notifier: Send + Sync {
    /// Play a cue for the phase that just ran out.
    fn notify(&self, finished: Phase) -> Result<(), NotifyError>;
}

/// Does nothing. Default for headless engines and tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentNotifier;

impl Notifier for SilentNotifier {
    fn notify(&self, _finished: Phase) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Rings the terminal bell on stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalBell {
    /// Number of BEL characters written; a focus expiry rings once more.
    pub rings: u8,
}

impl Default for TerminalBell {
    fn default() -> Self {
        Self { rings: 1 }
    }
}

impl Notifier for TerminalBell {
    fn notify(&self, finished: Phase) -> Result<(), NotifyError> {
        let extra = u8::from(finished.is_focus());
        let bells = "\x07".repeat(usize::from(self.rings.saturating_add(extra)));
        let mut err = std::io::stderr().lock();
        err.write_all(bells.as_bytes())?;
        err.flush()?;
        Ok(())
    }
}
