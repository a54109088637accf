//! Control surface of the stepping engine
//!
//! A [`Debugger`] owns one session. Every `start` builds a fresh interpreter
//! (and with it fresh queues, timers and suspended activations); `exit` and
//! `restart` throw that state away. Host time is virtual: the host moves it
//! with [`Debugger::advance`], which fires the auto-step delay and program
//! timers in due order.

use std::cell::{Ref, RefCell};
use std::rc::Rc;

use tracing::{debug, trace};

use crate::ast::Program;
use crate::config::DebuggerConfig;
use crate::error::JsError;
use crate::flow::FlowModel;
use crate::interpreter::intercept::Interceptor;
use crate::interpreter::{Interpreter, StepOutcome};
use crate::platform::{
    ConsoleLevel, ConsoleProvider, EventLog, NoOpConsoleProvider, Observer, SourceParser,
};
use crate::value::{CheapClone, JsValue};

use super::{Status, Tracker};

/// Lets every interpreter of the session write to the same console
struct SharedConsole(Rc<dyn ConsoleProvider>);

impl ConsoleProvider for SharedConsole {
    fn write(&self, level: ConsoleLevel, message: &str) {
        self.0.write(level, message);
    }

    fn clear(&self) {
        self.0.clear();
    }
}

pub struct Debugger {
    parser: Box<dyn SourceParser>,
    config: DebuggerConfig,
    console: Rc<dyn ConsoleProvider>,
    tracker: Rc<RefCell<Tracker>>,
    interpreter: Option<Interpreter>,
    program: Option<Program>,
    status: Status,
    auto_step: bool,
    result: Option<JsValue>,
    last_error: Option<JsError>,
    /// Host time carried across runs
    now: u64,
}

impl Debugger {
    pub fn new(parser: Box<dyn SourceParser>, config: DebuggerConfig) -> Self {
        Debugger {
            parser,
            config,
            console: Rc::new(NoOpConsoleProvider),
            tracker: Rc::new(RefCell::new(Tracker::new())),
            interpreter: None,
            program: None,
            status: Status::Idle,
            auto_step: false,
            result: None,
            last_error: None,
            now: 0,
        }
    }

    pub fn with_observer(self, observer: Box<dyn Observer>) -> Self {
        self.tracker.borrow_mut().set_observer(Some(observer));
        self
    }

    pub fn with_console(mut self, console: Box<dyn ConsoleProvider>) -> Self {
        self.console = Rc::from(console);
        self
    }

    /// Install an [`EventLog`] sized by `history_limit` and return a handle
    /// to it
    pub fn record_events(&mut self) -> EventLog {
        let log = EventLog::with_limit(self.config.history_limit);
        self.tracker
            .borrow_mut()
            .set_observer(Some(Box::new(log.clone())));
        log
    }

    pub fn config(&self) -> &DebuggerConfig {
        &self.config
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Control surface
    // ═══════════════════════════════════════════════════════════════════════

    /// Parse `source` and prepare a new run, discarding any previous one.
    /// Nothing is evaluated until the first step.
    pub fn start(&mut self, source: &str) -> Result<Status, JsError> {
        self.teardown();
        let program = match self.parser.parse(source) {
            Ok(program) => program,
            Err(error) => {
                debug!(%error, "program rejected by parser");
                self.tracker.borrow_mut().notify_error(&error);
                self.last_error = Some(error.clone());
                return Err(error);
            }
        };
        self.launch(program)
    }

    /// Evaluate up to the next pause point
    pub fn step(&mut self) -> Result<Status, JsError> {
        if !self.status.is_live() {
            return Ok(self.status);
        }
        let Some(interpreter) = self.interpreter.as_mut() else {
            return Ok(self.status);
        };
        let outcome = interpreter.step();
        if self.result.is_none() {
            self.result = interpreter.program_result().cloned();
        }
        match outcome {
            Ok(StepOutcome::Paused) => {
                self.status = if self.auto_step {
                    interpreter
                        .event_loop_mut()
                        .arm_step_delay(self.config.step_delay_ms.max(1));
                    Status::Running
                } else {
                    Status::Paused
                };
            }
            Ok(StepOutcome::Idle) => {
                self.status = if interpreter.has_outstanding_work() {
                    Status::SuspendedAsync
                } else {
                    debug!("run ended");
                    interpreter.shutdown();
                    Status::Ended
                };
            }
            Err(error) => {
                debug!(%error, "run failed");
                self.tracker.borrow_mut().notify_error(&error);
                self.last_error = Some(error.clone());
                self.teardown();
                self.status = Status::Ended;
                self.notify();
                return Err(error);
            }
        }
        trace!(status = %self.status, "stepped");
        self.notify();
        Ok(self.status)
    }

    /// Turn auto-stepping on or off. Turning it on steps once right away;
    /// turning it off lets an armed delay fire once more without re-arming.
    pub fn set_auto_stepping(&mut self, enabled: bool) -> Result<Status, JsError> {
        self.auto_step = enabled;
        debug!(enabled, "auto stepping");
        if enabled {
            if self.status == Status::Paused {
                return self.step();
            }
        } else if self.status == Status::Running {
            self.status = Status::Paused;
            self.notify();
        }
        Ok(self.status)
    }

    pub fn pause(&mut self) -> Status {
        self.auto_step = false;
        if self.status == Status::Running {
            self.status = Status::Paused;
            self.notify();
        }
        self.status
    }

    /// Delay between auto steps, in milliseconds. Takes effect from the next
    /// armed delay.
    pub fn set_speed(&mut self, ms: u64) {
        self.config.step_delay_ms = ms;
    }

    /// Start the last program again from scratch
    pub fn restart(&mut self) -> Result<Status, JsError> {
        self.teardown();
        match self.program.clone() {
            Some(program) => self.launch(program),
            None => Ok(self.status),
        }
    }

    /// End the run. Cancels the step delay, every program timer and queued
    /// job. Safe to call at any time, any number of times.
    pub fn exit(&mut self) {
        let had_run = self.interpreter.is_some();
        self.teardown();
        if had_run {
            self.status = Status::Ended;
            self.notify();
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Host time
    // ═══════════════════════════════════════════════════════════════════════

    /// Current host time in milliseconds
    pub fn now(&self) -> u64 {
        self.interpreter
            .as_ref()
            .map_or(self.now, |interpreter| interpreter.event_loop().now())
    }

    /// Due time of the next host timer (step delay or program timer)
    pub fn next_deadline(&self) -> Option<u64> {
        self.interpreter.as_ref()?.event_loop().next_deadline()
    }

    /// Move host time forward by `ms`, firing everything that comes due in
    /// order
    pub fn advance(&mut self, ms: u64) -> Result<Status, JsError> {
        let target = self.now() + ms;
        while let Some(due) = self.next_deadline().filter(|due| *due <= target) {
            if let Some(interpreter) = self.interpreter.as_mut() {
                interpreter.event_loop_mut().set_now(due);
            }
            self.fire_due()?;
        }
        self.now = target;
        if let Some(interpreter) = self.interpreter.as_mut() {
            interpreter.event_loop_mut().set_now(target);
        }
        Ok(self.status)
    }

    /// Step and jump host time until the run ends or `max_steps` steps
    /// were taken
    pub fn run_to_completion(&mut self, max_steps: usize) -> Result<Status, JsError> {
        self.auto_step = false;
        if let Some(interpreter) = self.interpreter.as_mut() {
            interpreter.event_loop_mut().cancel_step_delay();
        }
        for _ in 0..max_steps {
            match self.status {
                Status::Paused | Status::Running => {
                    self.step()?;
                }
                Status::SuspendedAsync => {
                    if let Some(due) = self.next_deadline() {
                        if let Some(interpreter) = self.interpreter.as_mut() {
                            interpreter.event_loop_mut().set_now(due);
                        }
                    }
                    self.step()?;
                }
                Status::Idle | Status::Ended => break,
            }
        }
        self.now = self.now();
        Ok(self.status)
    }

    fn fire_due(&mut self) -> Result<(), JsError> {
        let Some(interpreter) = self.interpreter.as_mut() else {
            return Ok(());
        };
        if interpreter.event_loop_mut().take_step_delay_due() {
            trace!("step delay fired");
            self.step()?;
        }
        match self.status {
            Status::SuspendedAsync => {
                self.step()?;
            }
            // Due timers wait in the queue until stepping reaches them
            _ => {
                if let Some(interpreter) = self.interpreter.as_mut() {
                    interpreter.event_loop_mut().release_due_timers();
                }
            }
        }
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Inspection
    // ═══════════════════════════════════════════════════════════════════════

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn is_auto_stepping(&self) -> bool {
        self.auto_step
    }

    /// Completion value of the program, once its top-level code finished
    pub fn result(&self) -> Option<&JsValue> {
        self.result.as_ref()
    }

    pub fn flow(&self) -> Ref<'_, FlowModel> {
        Ref::map(self.tracker.borrow(), Tracker::flow)
    }

    pub fn outstanding_timers(&self) -> usize {
        self.interpreter
            .as_ref()
            .map_or(0, |interpreter| interpreter.event_loop().outstanding_timers())
    }

    pub fn last_error(&self) -> Option<&JsError> {
        self.last_error.as_ref()
    }

    /// Interpreter of the current run
    pub fn interpreter(&self) -> Option<&Interpreter> {
        self.interpreter.as_ref()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Internals
    // ═══════════════════════════════════════════════════════════════════════

    fn launch(&mut self, program: Program) -> Result<Status, JsError> {
        let mut interpreter = Interpreter::new();
        interpreter.set_console(Box::new(SharedConsole(self.console.cheap_clone())));
        interpreter.set_max_call_depth(self.config.max_call_depth);
        let interceptor: Rc<RefCell<dyn Interceptor>> = self.tracker.clone();
        interpreter.set_interceptor(interceptor);
        interpreter.event_loop_mut().set_now(self.now);
        interpreter.start(&program);

        self.tracker.borrow_mut().begin_run();
        self.interpreter = Some(interpreter);
        self.program = Some(program);
        self.result = None;
        self.last_error = None;
        self.status = Status::Paused;
        debug!("run started");
        self.notify();

        if self.config.auto_step {
            return self.set_auto_stepping(true);
        }
        Ok(self.status)
    }

    /// Drop the execution state of the current run. The flow model stays
    /// readable until the next start.
    fn teardown(&mut self) {
        if let Some(mut interpreter) = self.interpreter.take() {
            self.now = interpreter.event_loop().now();
            interpreter.shutdown();
            debug!("execution state torn down");
        }
        self.auto_step = false;
        if self.status.is_live() {
            self.status = Status::Ended;
        }
    }

    fn notify(&self) {
        self.tracker.borrow_mut().notify_update(self.status);
    }
}
