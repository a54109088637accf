//! Session lifecycle: start, exit, restart and configuration

use jsstep::{Debugger, DebuggerConfig, EstreeJsonParser, Status};

use super::fixture::*;
use super::{frame_names, number, session, session_with, step_all, str_val};

/// `function f() { return 1; } setTimeout(() => console.log("late"), 100); console.log("now"); f() + 1;`
fn timer_program() -> serde_json::Value {
    program(vec![
        func_decl("f", &[], vec![ret(num(1.0))]),
        expr(call_fn(
            "setTimeout",
            vec![arrow(&[], call_method(ident("console"), "log", vec![string("late")])), num(100.0)],
        )),
        log(vec![string("now")]),
        expr(bin("+", call_fn("f", vec![]), num(1.0))),
    ])
}

#[test]
fn test_new_session_is_idle() {
    let mut debugger = Debugger::new(Box::new(EstreeJsonParser), DebuggerConfig::default());
    assert_eq!(debugger.status(), Status::Idle);
    assert_eq!(debugger.step().unwrap(), Status::Idle);
    assert!(debugger.interpreter().is_none());

    // Nothing to exit or restart yet
    debugger.exit();
    assert_eq!(debugger.status(), Status::Idle);
    assert_eq!(debugger.restart().unwrap(), Status::Idle);
}

#[test]
fn test_exit_cancels_pending_work() {
    let mut s = session(timer_program());
    s.debugger.step().unwrap();
    s.debugger.step().unwrap();
    assert_eq!(s.debugger.status(), Status::Paused);
    assert_eq!(s.debugger.outstanding_timers(), 1);

    s.debugger.exit();
    assert_eq!(s.debugger.status(), Status::Ended);
    assert_eq!(s.debugger.outstanding_timers(), 0);
    assert_eq!(s.debugger.next_deadline(), None);

    // A second exit changes nothing and reports nothing
    let statuses = s.log.statuses();
    s.debugger.exit();
    assert_eq!(s.debugger.status(), Status::Ended);
    assert_eq!(s.log.statuses(), statuses);

    // Time passing after exit fires nothing
    s.debugger.advance(1_000).unwrap();
    assert_eq!(s.console.messages(), Vec::<String>::new());
    assert_eq!(s.debugger.step().unwrap(), Status::Ended);

    // Restart right after exit begins clean
    assert_eq!(s.debugger.restart().unwrap(), Status::Paused);
    assert_eq!(s.debugger.outstanding_timers(), 0);
}

#[test]
fn test_exit_while_suspended() {
    let mut s = session(timer_program());
    step_all_sync(&mut s.debugger);
    assert_eq!(s.debugger.status(), Status::SuspendedAsync);
    assert_eq!(s.debugger.result(), Some(&number(2.0)));

    s.debugger.exit();
    assert_eq!(s.debugger.status(), Status::Ended);
    assert_eq!(s.debugger.outstanding_timers(), 0);
    // The completed result stays available
    assert_eq!(s.debugger.result(), Some(&number(2.0)));
    assert_eq!(s.console.messages(), vec!["now"]);
}

/// Step while paused, stopping once only async work remains
fn step_all_sync(debugger: &mut Debugger) {
    while debugger.status() == Status::Paused {
        debugger.step().unwrap();
    }
}

#[test]
fn test_flow_stays_readable_after_exit() {
    let mut s = session(timer_program());
    step_all_sync(&mut s.debugger);
    s.debugger.exit();
    assert_eq!(frame_names(&s.debugger), vec!["Program", "f"]);
    assert_eq!(s.debugger.flow().depth(), 1);
}

#[test]
fn test_restart_runs_the_same_program_again() {
    let mut s = session(program(vec![
        func_decl("f", &[], vec![ret(string("done"))]),
        log(vec![string("hello")]),
        expr(call_fn("f", vec![])),
    ]));
    step_all(&mut s.debugger);
    assert_eq!(s.debugger.result(), Some(&str_val("done")));
    let first_events = s.log.len();

    assert_eq!(s.debugger.restart().unwrap(), Status::Paused);
    assert!(s.debugger.result().is_none());
    assert!(s.debugger.last_error().is_none());
    assert_eq!(frame_names(&s.debugger), vec!["Program"]);

    step_all(&mut s.debugger);
    assert_eq!(s.debugger.result(), Some(&str_val("done")));
    assert_eq!(frame_names(&s.debugger), vec!["Program", "f"]);
    assert_eq!(s.log.len(), first_events * 2);
    assert_eq!(s.console.messages(), vec!["hello", "hello"]);
}

#[test]
fn test_restart_mid_run_discards_timers() {
    let mut s = session(timer_program());
    step_all_sync(&mut s.debugger);
    assert_eq!(s.debugger.outstanding_timers(), 1);

    s.debugger.restart().unwrap();
    assert_eq!(s.debugger.outstanding_timers(), 0);
    assert_eq!(s.debugger.status(), Status::Paused);

    let status = s.debugger.run_to_completion(10_000).unwrap();
    assert_eq!(status, Status::Ended);
    assert_eq!(s.console.messages(), vec!["now", "now", "late"]);
}

#[test]
fn test_start_replaces_previous_run() {
    let mut s = session(timer_program());
    step_all_sync(&mut s.debugger);

    let next = program(vec![expr(bin("*", num(6.0), num(7.0)))]);
    assert_eq!(s.debugger.start(&next.to_string()).unwrap(), Status::Paused);
    assert_eq!(s.debugger.outstanding_timers(), 0);
    assert!(s.debugger.result().is_none());

    step_all(&mut s.debugger);
    assert_eq!(s.debugger.result(), Some(&number(42.0)));
    assert_eq!(s.console.messages(), vec!["now"]);
}

#[test]
fn test_host_time_carries_across_runs() {
    let mut s = session(timer_program());
    step_all_sync(&mut s.debugger);
    s.debugger.advance(40).unwrap();
    assert_eq!(s.debugger.now(), 40);

    s.debugger.restart().unwrap();
    assert_eq!(s.debugger.now(), 40);
    step_all_sync(&mut s.debugger);
    assert_eq!(s.debugger.next_deadline(), Some(140));
}

#[test]
fn test_config_from_json() {
    let config =
        DebuggerConfig::from_json(r#"{"step_delay_ms": 25, "max_call_depth": 8}"#).unwrap();
    assert_eq!(config.step_delay_ms, 25);
    assert_eq!(config.max_call_depth, 8);
    assert!(!config.auto_step);

    let debugger = Debugger::new(Box::new(EstreeJsonParser), config.clone());
    assert_eq!(debugger.config(), &config);
}

#[test]
fn test_history_limit_caps_recorded_events() {
    let config = DebuggerConfig {
        history_limit: Some(3),
        ..DebuggerConfig::default()
    };
    let mut s = session_with(
        program(vec![
            let_("a", num(1.0)),
            let_("b", num(2.0)),
            let_("c", num(3.0)),
        ]),
        config,
    );
    step_all(&mut s.debugger);
    assert_eq!(s.log.len(), 3);

    let last = s.log.evaluations().pop().unwrap();
    assert_eq!(last.node.node_type().to_string(), "Program");
}

#[test]
fn test_status_display() {
    let names: Vec<String> = [
        Status::Idle,
        Status::Paused,
        Status::Running,
        Status::SuspendedAsync,
        Status::Ended,
    ]
    .iter()
    .map(ToString::to_string)
    .collect();
    assert_eq!(names, vec!["idle", "paused", "running", "suspended-async", "ended"]);
    assert!(Status::SuspendedAsync.is_live());
    assert!(!Status::Ended.is_live());
}
