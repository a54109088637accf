//! Integration tests for the stepping interpreter, organized by feature
//!
//! Programs are built as ESTree JSON with the helpers in [`fixture`], the
//! shape an external parser hands to the interpreter. Tests either run a
//! program straight through [`Interpreter::run`] or drive it step by step
//! through a [`Debugger`] session with an [`EventLog`] attached.

#![allow(clippy::unwrap_used, clippy::panic)]

mod async_runtime;
mod builtins;
mod control_flow;
mod errors;
mod fixture;
mod frames;
mod functions;
mod lifecycle;
mod stepping;

use jsstep::flow::FlowModel;
use jsstep::{
    BufferedConsole, Debugger, DebuggerConfig, EstreeJsonParser, EventLog, Interpreter, JsError,
    JsValue, Phase, Program, Status,
};
use serde_json::Value;

/// Guard against runaway loops in step-driven tests
const MAX_STEPS: usize = 100_000;

pub fn parse(program: Value) -> Program {
    Program::from_value(program).unwrap()
}

/// Run a program to completion and return its completion value
pub fn eval(program: Value) -> JsValue {
    try_eval(program).unwrap()
}

pub fn try_eval(program: Value) -> Result<JsValue, JsError> {
    let mut interp = Interpreter::new();
    interp.run(&parse(program))
}

/// Console lines printed while running a program to completion
pub fn console_output(program: Value) -> Vec<String> {
    let console = BufferedConsole::new();
    let mut interp = Interpreter::new();
    interp.set_console(Box::new(console.clone()));
    interp.run(&parse(program)).unwrap();
    console.messages()
}

pub fn number(n: f64) -> JsValue {
    JsValue::Number(n)
}

pub fn str_val(s: &str) -> JsValue {
    JsValue::from(s)
}

/// A started debugger session with its event log and console
pub struct Session {
    pub debugger: Debugger,
    pub log: EventLog,
    pub console: BufferedConsole,
}

pub fn session(program: Value) -> Session {
    session_with(program, DebuggerConfig::default())
}

pub fn session_with(program: Value, config: DebuggerConfig) -> Session {
    let console = BufferedConsole::new();
    let mut debugger = Debugger::new(Box::new(EstreeJsonParser), config)
        .with_console(Box::new(console.clone()));
    let log = debugger.record_events();
    debugger.start(&program.to_string()).unwrap();
    Session {
        debugger,
        log,
        console,
    }
}

/// Step a session until it ends, returning the number of steps taken
pub fn step_all(debugger: &mut Debugger) -> usize {
    let mut steps = 0;
    while debugger.status().is_live() {
        debugger.step().unwrap();
        steps += 1;
        assert!(steps < MAX_STEPS, "program did not finish");
    }
    steps
}

/// Node type and phase of every recorded evaluation
pub fn trace(log: &EventLog) -> Vec<(String, Phase)> {
    log.evaluations()
        .iter()
        .map(|evaluation| (evaluation.node.node_type().to_string(), evaluation.phase))
        .collect()
}

/// Frame names along the active path, outermost first
pub fn path_names(flow: &FlowModel) -> Vec<String> {
    flow.path()
        .iter()
        .filter_map(|entry| flow.frame(entry.frame))
        .map(|frame| frame.name.clone())
        .collect()
}

/// Names of every frame created during the run, in creation order
pub fn frame_names(debugger: &Debugger) -> Vec<String> {
    debugger
        .flow()
        .frames()
        .iter()
        .map(|frame| frame.name.clone())
        .collect()
}

pub fn assert_ended(debugger: &Debugger) {
    assert_eq!(debugger.status(), Status::Ended);
    assert!(debugger.last_error().is_none(), "{:?}", debugger.last_error());
}
