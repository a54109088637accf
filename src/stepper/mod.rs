//! Stepping engine
//!
//! [`Tracker`] is the interception half: it keeps the frame/flow model in
//! sync with evaluation. [`Debugger`] is the control surface a UI drives.

pub mod debugger;
pub mod tracker;

use std::fmt;

pub use debugger::Debugger;
pub use tracker::Tracker;

/// Lifecycle state of a debugging session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// No run started
    Idle,
    /// Waiting for an explicit step
    Paused,
    /// Auto-stepping; the step delay timer drives the next step
    Running,
    /// Synchronous work is done, timers or queued jobs remain
    SuspendedAsync,
    /// Nothing left to run
    Ended,
}

impl Status {
    /// A run exists and may still evaluate something
    pub fn is_live(self) -> bool {
        matches!(self, Status::Paused | Status::Running | Status::SuspendedAsync)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::Idle => "idle",
            Status::Paused => "paused",
            Status::Running => "running",
            Status::SuspendedAsync => "suspended-async",
            Status::Ended => "ended",
        };
        f.write_str(name)
    }
}
