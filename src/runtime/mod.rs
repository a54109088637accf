//! Async runtime: event loop, timers and promises

pub mod event_loop;
pub mod promise;

pub use event_loop::{EventLoop, HostTimer, Job, TimerId};
pub use promise::{CombinatorKind, PromiseReaction};
