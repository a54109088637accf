//! Host collaborator traits.
//!
//! The interpreter never talks to the outside world directly. Console output,
//! randomness, source parsing and the UI-facing event feed all go through the
//! traits in this module, so a host can swap any of them out.

mod std_impl;

pub use std_impl::{StdConsoleProvider, StdRandomProvider};

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use thiserror::Error;

use crate::ast::Program;
use crate::error::JsError;
use crate::flow::{Evaluation, FlowModel};
use crate::stepper::Status;

// ═══════════════════════════════════════════════════════════════════════════
// Randomness
// ═══════════════════════════════════════════════════════════════════════════

/// Trait for providing random number generation.
pub trait RandomProvider {
    /// Generate a random f64 in the range [0, 1).
    /// Used for `Math.random()`.
    fn random(&mut self) -> f64;
}

/// A random provider that always returns 0.
pub struct NoOpRandomProvider;

impl RandomProvider for NoOpRandomProvider {
    fn random(&mut self) -> f64 {
        0.0
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Console
// ═══════════════════════════════════════════════════════════════════════════

/// Console output level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleLevel {
    Log,
    Info,
    Debug,
    Warn,
    Error,
}

/// Trait for console output.
pub trait ConsoleProvider {
    /// Write one formatted line at the given level.
    fn write(&self, level: ConsoleLevel, message: &str);

    /// Clear the console (`console.clear()`).
    fn clear(&self) {}
}

/// A console provider that discards all output.
pub struct NoOpConsoleProvider;

impl ConsoleProvider for NoOpConsoleProvider {
    fn write(&self, _level: ConsoleLevel, _message: &str) {}
}

/// Console that keeps every line in memory. Clones share the same buffer, so
/// a host can hand one clone to the interpreter and read from another.
#[derive(Clone, Default)]
pub struct BufferedConsole {
    lines: Rc<RefCell<Vec<(ConsoleLevel, String)>>>,
}

impl BufferedConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<(ConsoleLevel, String)> {
        self.lines.borrow().clone()
    }

    /// Message text of every line, levels dropped
    pub fn messages(&self) -> Vec<String> {
        self.lines.borrow().iter().map(|(_, m)| m.clone()).collect()
    }
}

impl ConsoleProvider for BufferedConsole {
    fn write(&self, level: ConsoleLevel, message: &str) {
        self.lines.borrow_mut().push((level, message.to_string()));
    }

    fn clear(&self) {
        self.lines.borrow_mut().clear();
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Parsing
// ═══════════════════════════════════════════════════════════════════════════

/// Turns source text into a program AST.
pub trait SourceParser {
    fn parse(&self, source: &str) -> Result<Program, JsError>;
}

/// Reads source text that is already an ESTree JSON document, as produced by
/// acorn, espree or esprima.
#[derive(Debug, Default, Clone, Copy)]
pub struct EstreeJsonParser;

impl SourceParser for EstreeJsonParser {
    fn parse(&self, source: &str) -> Result<Program, JsError> {
        Program::from_json(source)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Observer
// ═══════════════════════════════════════════════════════════════════════════

/// Failure inside an observer callback. The stepping engine logs and drops
/// these; they never reach the interpreted program.
#[derive(Debug, Error)]
pub enum ObserverError {
    #[error("observer failed: {0}")]
    Failed(String),
    #[error("observer closed")]
    Closed,
}

/// UI-side consumer of the evaluation feed.
pub trait Observer {
    /// One reported node visit. `flow` already reflects the frame or block
    /// this event opened.
    fn on_evaluation(&mut self, evaluation: &Evaluation, flow: &FlowModel)
    -> Result<(), ObserverError>;

    /// Called after every state-affecting tick of the debugger.
    fn on_update(&mut self, _status: Status, _flow: &FlowModel) -> Result<(), ObserverError> {
        Ok(())
    }

    /// A fatal run error.
    fn on_error(&mut self, _error: &JsError) -> Result<(), ObserverError> {
        Ok(())
    }
}

/// Observer that records what it sees. Clones share the same log.
#[derive(Clone, Default)]
pub struct EventLog {
    inner: Rc<RefCell<EventLogInner>>,
}

#[derive(Default)]
struct EventLogInner {
    evaluations: VecDeque<Evaluation>,
    statuses: Vec<Status>,
    errors: Vec<String>,
    limit: Option<usize>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `limit` evaluations, dropping the oldest first
    pub fn with_limit(limit: Option<usize>) -> Self {
        let log = Self::default();
        log.inner.borrow_mut().limit = limit;
        log
    }

    pub fn evaluations(&self) -> Vec<Evaluation> {
        self.inner.borrow().evaluations.iter().cloned().collect()
    }

    pub fn statuses(&self) -> Vec<Status> {
        self.inner.borrow().statuses.clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.inner.borrow().errors.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().evaluations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.evaluations.clear();
        inner.statuses.clear();
        inner.errors.clear();
    }
}

impl Observer for EventLog {
    fn on_evaluation(
        &mut self,
        evaluation: &Evaluation,
        _flow: &FlowModel,
    ) -> Result<(), ObserverError> {
        let mut inner = self.inner.try_borrow_mut().map_err(|_| ObserverError::Closed)?;
        if inner.limit == Some(0) {
            return Ok(());
        }
        if let Some(limit) = inner.limit {
            while inner.evaluations.len() >= limit {
                inner.evaluations.pop_front();
            }
        }
        inner.evaluations.push_back(evaluation.clone());
        Ok(())
    }

    fn on_update(&mut self, status: Status, _flow: &FlowModel) -> Result<(), ObserverError> {
        let mut inner = self.inner.try_borrow_mut().map_err(|_| ObserverError::Closed)?;
        if inner.statuses.last() != Some(&status) {
            inner.statuses.push(status);
        }
        Ok(())
    }

    fn on_error(&mut self, error: &JsError) -> Result<(), ObserverError> {
        let mut inner = self.inner.try_borrow_mut().map_err(|_| ObserverError::Closed)?;
        inner.errors.push(error.to_string());
        Ok(())
    }
}
