//! Promises, async functions, timers and job ordering

use std::cell::RefCell;
use std::rc::Rc;

use jsstep::flow::{Evaluation, FlowModel};
use jsstep::platform::ObserverError;
use jsstep::{BufferedConsole, Debugger, DebuggerConfig, EstreeJsonParser, Observer, Phase, Status};

use super::fixture::*;
use super::{assert_ended, console_output, path_names, session, step_all, str_val};

/// Records the active path at call entries and at await suspend/resume
#[derive(Clone, Default)]
struct Checkpoints {
    seen: Rc<RefCell<Vec<Checkpoint>>>,
}

#[derive(Debug, Clone)]
struct Checkpoint {
    phase: Phase,
    path: Vec<String>,
    /// `has_returned` of the frame the event belongs to
    returned: bool,
}

impl Observer for Checkpoints {
    fn on_evaluation(
        &mut self,
        evaluation: &Evaluation,
        flow: &FlowModel,
    ) -> Result<(), ObserverError> {
        let Some(frame) = evaluation.context.call else {
            return Ok(());
        };
        if evaluation.phase == Phase::Exit {
            return Ok(());
        }
        self.seen.borrow_mut().push(Checkpoint {
            phase: evaluation.phase,
            path: path_names(flow),
            returned: flow.frame_meta(frame).is_some_and(|meta| meta.has_returned),
        });
        Ok(())
    }
}

impl Checkpoints {
    fn position(&self, phase: Phase, innermost: &str) -> Option<usize> {
        self.seen.borrow().iter().position(|checkpoint| {
            checkpoint.phase == phase && checkpoint.path.last().is_some_and(|name| name == innermost)
        })
    }

    fn with_phase(&self, phase: Phase) -> Vec<Checkpoint> {
        self.seen
            .borrow()
            .iter()
            .filter(|checkpoint| checkpoint.phase == phase)
            .cloned()
            .collect()
    }
}

fn checked(program: serde_json::Value) -> (Debugger, Checkpoints, BufferedConsole) {
    let probe = Checkpoints::default();
    let console = BufferedConsole::new();
    let mut debugger = Debugger::new(Box::new(EstreeJsonParser), DebuggerConfig::default())
        .with_observer(Box::new(probe.clone()))
        .with_console(Box::new(console.clone()));
    debugger.start(&program.to_string()).unwrap();
    (debugger, probe, console)
}

#[test]
fn test_microtasks_run_before_timers() {
    let body = vec![
        expr(call_fn(
            "setTimeout",
            vec![arrow(&[], call_method(ident("console"), "log", vec![string("timeout")])), num(0.0)],
        )),
        expr(call_method(
            call_method(ident("Promise"), "resolve", vec![num(1.0)]),
            "then",
            vec![arrow(
                &["v"],
                call_method(ident("console"), "log", vec![string("then"), ident("v")]),
            )],
        )),
        log(vec![string("sync")]),
    ];
    assert_eq!(console_output(program(body.clone())), vec!["sync", "then 1", "timeout"]);

    // Same order when stepped
    let mut s = session(program(body));
    s.debugger.run_to_completion(10_000).unwrap();
    assert_ended(&s.debugger);
    assert_eq!(s.console.messages(), vec!["sync", "then 1", "timeout"]);
}

#[test]
fn test_timers_fire_in_due_order() {
    let output = console_output(program(vec![
        expr(call_fn(
            "setTimeout",
            vec![arrow(&[], call_method(ident("console"), "log", vec![string("late")])), num(20.0)],
        )),
        expr(call_fn(
            "setTimeout",
            vec![arrow(&[], call_method(ident("console"), "log", vec![string("early")])), num(10.0)],
        )),
        expr(call_fn(
            "setTimeout",
            vec![arrow(&[], call_method(ident("console"), "log", vec![string("tie")])), num(10.0)],
        )),
    ]));
    assert_eq!(output, vec!["early", "tie", "late"]);
}

#[test]
fn test_interval_until_cleared() {
    // let n = 0; const id = setInterval(function () { n++; console.log(n); if (n === 3) clearInterval(id); }, 10);
    let output = console_output(program(vec![
        let_("n", num(0.0)),
        const_(
            "id",
            call_fn(
                "setInterval",
                vec![
                    func_expr(
                        &[],
                        vec![
                            expr(update("++", false, ident("n"))),
                            log(vec![ident("n")]),
                            if_(
                                bin("===", ident("n"), num(3.0)),
                                vec![expr(call_fn("clearInterval", vec![ident("id")]))],
                                None,
                            ),
                        ],
                    ),
                    num(10.0),
                ],
            ),
        ),
    ]));
    assert_eq!(output, vec!["1", "2", "3"]);
}

#[test]
fn test_await_suspends_and_resumes_once() {
    // async function w() { await Promise.resolve(1); return 2; } w();
    let (mut debugger, probe, _) = checked(program(vec![
        async_func_decl(
            "w",
            &[],
            vec![
                expr(await_(call_method(ident("Promise"), "resolve", vec![num(1.0)]))),
                ret(num(2.0)),
            ],
        ),
        expr(call_fn("w", vec![])),
    ]));
    step_all(&mut debugger);
    assert_ended(&debugger);

    let suspends = probe.with_phase(Phase::Suspend);
    let resumes = probe.with_phase(Phase::Resume);
    assert_eq!(suspends.len(), 1);
    assert_eq!(resumes.len(), 1);
    assert!(!suspends[0].returned);
    assert!(!resumes[0].returned);

    let flow = debugger.flow();
    let w = flow.frames().iter().find(|frame| frame.name == "w").unwrap();
    let meta = flow.frame_meta(w.id).unwrap();
    assert!(meta.has_returned);
    assert_eq!(meta.return_value, Some(super::number(2.0)));
    assert_eq!(flow.pending_snapshots(), 0);
    assert_eq!(flow.depth(), 1);
}

#[test]
fn test_resume_restores_path_after_interleaved_timer() {
    let (mut debugger, probe, _) = checked(program(vec![
        async_func_decl(
            "f",
            &[],
            vec![
                expr(await_(call_method(ident("Promise"), "resolve", vec![num(1.0)]))),
                ret(string("f")),
            ],
        ),
        func_decl("g", &[], vec![ret(call_fn("f", vec![]))]),
        func_decl("helper", &[], vec![ret(num(1.0))]),
        func_decl("tick", &[], vec![expr(call_fn("helper", vec![]))]),
        expr(call_fn("setTimeout", vec![ident("tick"), num(0.0)])),
        expr(call_fn("g", vec![])),
    ]));
    step_all(&mut debugger);
    assert_ended(&debugger);

    let suspend = probe.position(Phase::Suspend, "f").unwrap();
    let helper = probe.position(Phase::Enter, "helper").unwrap();
    let resume = probe.position(Phase::Resume, "f").unwrap();
    assert!(suspend < helper && helper < resume);

    let seen = probe.seen.borrow();
    assert_eq!(seen[suspend].path, vec!["Program", "g", "f"]);
    assert_eq!(seen[helper].path, vec!["Program", "tick", "helper"]);
    assert_eq!(seen[resume].path, vec!["Program", "g", "f"]);
    assert_eq!(debugger.flow().depth(), 1);
}

#[test]
fn test_await_non_thenable_continues_immediately() {
    // async function f() { const v = await 5; console.log("in", v); } f(); console.log("after");
    let (mut debugger, probe, console) = checked(program(vec![
        async_func_decl(
            "f",
            &[],
            vec![
                const_("v", await_(num(5.0))),
                log(vec![string("in"), ident("v")]),
            ],
        ),
        expr(call_fn("f", vec![])),
        log(vec![string("after")]),
    ]));
    step_all(&mut debugger);
    assert_ended(&debugger);
    assert_eq!(console.messages(), vec!["in 5", "after"]);
    assert!(probe.with_phase(Phase::Suspend).is_empty());
}

#[test]
fn test_async_results_flow_through_then() {
    // async function g() { return 41; }
    // async function f() { const v = await g(); return v + 1; }
    // f().then(v => console.log(v));
    let output = console_output(program(vec![
        async_func_decl("g", &[], vec![ret(num(41.0))]),
        async_func_decl(
            "f",
            &[],
            vec![
                const_("v", await_(call_fn("g", vec![]))),
                ret(bin("+", ident("v"), num(1.0))),
            ],
        ),
        expr(call_method(
            call_fn("f", vec![]),
            "then",
            vec![arrow(&["v"], call_method(ident("console"), "log", vec![ident("v")]))],
        )),
    ]));
    assert_eq!(output, vec!["42"]);
}

#[test]
fn test_rejected_await_throws_into_async_function() {
    // async function f() { try { await Promise.reject(new Error("nope")); } catch (e) { console.log("caught", e.message); } }
    let output = console_output(program(vec![
        async_func_decl(
            "f",
            &[],
            vec![try_catch(
                vec![expr(await_(call_method(
                    ident("Promise"),
                    "reject",
                    vec![new(ident("Error"), vec![string("nope")])],
                )))],
                Some("e"),
                vec![log(vec![string("caught"), member(ident("e"), "message")])],
                None,
            )],
        ),
        expr(call_fn("f", vec![])),
    ]));
    assert_eq!(output, vec!["caught nope"]);
}

#[test]
fn test_async_throw_rejects_its_promise() {
    // async function f() { throw new Error("bad"); } f().catch(e => console.log(e.message));
    let output = console_output(program(vec![
        async_func_decl("f", &[], vec![throw(new(ident("Error"), vec![string("bad")]))]),
        expr(call_method(
            call_fn("f", vec![]),
            "catch",
            vec![arrow(
                &["e"],
                call_method(ident("console"), "log", vec![member(ident("e"), "message")]),
            )],
        )),
    ]));
    assert_eq!(output, vec!["bad"]);
}

#[test]
fn test_promise_all_collects_in_order() {
    // Promise.all([1, Promise.resolve(2)]).then(v => console.log(JSON.stringify(v)));
    let output = console_output(program(vec![expr(call_method(
        call_method(
            ident("Promise"),
            "all",
            vec![array(vec![
                num(1.0),
                call_method(ident("Promise"), "resolve", vec![num(2.0)]),
            ])],
        ),
        "then",
        vec![arrow(
            &["v"],
            call_method(
                ident("console"),
                "log",
                vec![call_method(ident("JSON"), "stringify", vec![ident("v")])],
            ),
        )],
    ))]));
    assert_eq!(output, vec!["[1,2]"]);
}

#[test]
fn test_promise_race_takes_first_settled() {
    // Promise.race([new Promise(r => setTimeout(() => r("slow"), 50)), Promise.resolve("fast")])
    //     .then(v => console.log(v));
    let slow = new(
        ident("Promise"),
        vec![arrow(
            &["r"],
            call_fn(
                "setTimeout",
                vec![arrow(&[], call_fn("r", vec![string("slow")])), num(50.0)],
            ),
        )],
    );
    let output = console_output(program(vec![expr(call_method(
        call_method(
            ident("Promise"),
            "race",
            vec![array(vec![
                slow,
                call_method(ident("Promise"), "resolve", vec![string("fast")]),
            ])],
        ),
        "then",
        vec![arrow(&["v"], call_method(ident("console"), "log", vec![ident("v")]))],
    ))]));
    assert_eq!(output, vec!["fast"]);
}

#[test]
fn test_pending_timer_leaves_run_suspended() {
    // setTimeout(function tick() { console.log("tick"); }, 50); "scheduled";
    let mut tick = func_expr(&[], vec![log(vec![string("tick")])]);
    tick["id"] = ident("tick");
    let mut s = session(program(vec![
        expr(call_fn("setTimeout", vec![tick, num(50.0)])),
        expr(string("scheduled")),
    ]));
    while s.debugger.status() == Status::Paused {
        s.debugger.step().unwrap();
    }
    assert_eq!(s.debugger.status(), Status::SuspendedAsync);
    assert_eq!(s.debugger.result(), Some(&str_val("scheduled")));
    assert_eq!(s.debugger.outstanding_timers(), 1);
    assert_eq!(s.debugger.next_deadline(), Some(50));

    s.debugger.advance(49).unwrap();
    assert!(s.console.messages().is_empty());
    assert_eq!(s.debugger.status(), Status::SuspendedAsync);

    s.debugger.advance(1).unwrap();
    assert_eq!(s.debugger.status(), Status::Paused);
    step_all(&mut s.debugger);
    assert_ended(&s.debugger);
    assert_eq!(s.console.messages(), vec!["tick"]);
    assert_eq!(
        s.log.statuses(),
        vec![Status::Paused, Status::SuspendedAsync, Status::Paused, Status::Ended]
    );
}
