//! Pause points, step granularity and auto-stepping

use std::cell::RefCell;
use std::rc::Rc;

use jsstep::ast::NodeType;
use jsstep::flow::{BlockKind, Evaluation, FlowModel};
use jsstep::interpreter::policy::{NodePolicy, StepPolicy};
use jsstep::platform::ObserverError;
use jsstep::{
    DebuggerConfig, EventLog, Interpreter, Observer, Phase, StepOutcome, Status, Tracker,
};

use super::fixture::*;
use super::{number, parse, session, session_with, step_all, trace};

fn entries(events: &[(&str, Phase)]) -> Vec<(String, Phase)> {
    events
        .iter()
        .map(|(node, phase)| (node.to_string(), *phase))
        .collect()
}

/// `let x = 1; x = x + 1; x;`
fn reassign_program() -> serde_json::Value {
    program(vec![
        let_("x", num(1.0)),
        expr(assign("x", bin("+", ident("x"), num(1.0)))),
        expr(ident("x")),
    ])
}

#[test]
fn test_start_does_not_evaluate() {
    let s = session(reassign_program());
    assert_eq!(s.debugger.status(), Status::Paused);
    assert!(s.log.evaluations().is_empty());
    assert!(s.debugger.result().is_none());
    assert_eq!(s.log.statuses(), vec![Status::Paused]);
}

#[test]
fn test_each_step_stops_at_next_pause_node() {
    let mut s = session(reassign_program());

    s.debugger.step().unwrap();
    assert_eq!(
        trace(&s.log),
        entries(&[("Program", Phase::Enter), ("VariableDeclarator", Phase::Enter)])
    );
    let paused = s.debugger.interpreter().unwrap().paused_at().unwrap().node_type();
    assert_eq!(paused, NodeType::VariableDeclarator);

    s.debugger.step().unwrap();
    assert_eq!(s.debugger.status(), Status::Paused);
    assert_eq!(
        s.debugger.interpreter().unwrap().paused_at().unwrap().node_type(),
        NodeType::AssignmentExpression
    );

    s.debugger.step().unwrap();
    assert_eq!(s.debugger.status(), Status::Ended);
    assert_eq!(s.debugger.result(), Some(&number(2.0)));
    assert_eq!(
        trace(&s.log),
        entries(&[
            ("Program", Phase::Enter),
            ("VariableDeclarator", Phase::Enter),
            ("VariableDeclarator", Phase::Value),
            ("VariableDeclarator", Phase::Exit),
            ("AssignmentExpression", Phase::Enter),
            ("AssignmentExpression", Phase::Value),
            ("AssignmentExpression", Phase::Exit),
            ("Program", Phase::Exit),
        ])
    );
}

#[test]
fn test_value_events_carry_values() {
    let mut s = session(reassign_program());
    step_all(&mut s.debugger);

    let values: Vec<_> = s
        .log
        .evaluations()
        .into_iter()
        .filter(|e| e.phase == Phase::Value)
        .filter_map(|e| e.value)
        .collect();
    assert_eq!(values, vec![number(1.0), number(2.0)]);

    let exit = s
        .log
        .evaluations()
        .into_iter()
        .find(|e| e.phase == Phase::Exit && e.node.node_type() == NodeType::AssignmentExpression)
        .unwrap();
    assert_eq!(exit.value, Some(number(2.0)));
}

#[test]
fn test_stepping_matches_running() {
    let body = vec![
        func_decl(
            "sum",
            &["n"],
            vec![
                let_("total", num(0.0)),
                for_range(
                    "i",
                    0.0,
                    ident("n"),
                    vec![expr(assign("total", bin("+", ident("total"), ident("i"))))],
                ),
                ret(ident("total")),
            ],
        ),
        let_("result", call_fn("sum", vec![num(5.0)])),
        if_(
            bin(">", ident("result"), num(5.0)),
            vec![expr(assign("result", bin("*", ident("result"), num(2.0))))],
            None,
        ),
        expr(ident("result")),
    ];

    let mut s = session(program(body.clone()));
    step_all(&mut s.debugger);
    assert_eq!(s.debugger.result(), Some(&number(20.0)));

    let log = EventLog::new();
    let tracker = Tracker::with_observer(Box::new(log.clone()));
    let mut interp = Interpreter::new();
    interp.set_interceptor(Rc::new(RefCell::new(tracker)));
    let value = interp.run(&parse(program(body))).unwrap();

    assert_eq!(value, number(20.0));
    assert_eq!(trace(&s.log), trace(&log));
}

#[test]
fn test_debugger_statement_pauses() {
    let mut s = session(program(vec![
        expr(num(1.0)),
        debugger(),
        expr(num(2.0)),
    ]));
    s.debugger.step().unwrap();
    assert_eq!(s.debugger.status(), Status::Paused);
    assert_eq!(
        s.debugger.interpreter().unwrap().paused_at().unwrap().node_type(),
        NodeType::DebuggerStatement
    );
    s.debugger.step().unwrap();
    assert_eq!(s.debugger.status(), Status::Ended);
    assert_eq!(s.debugger.result(), Some(&number(2.0)));
}

#[test]
fn test_loop_body_blocks_pause_each_iteration() {
    let mut s = session(program(vec![
        let_("n", num(0.0)),
        while_(
            bin("<", ident("n"), num(3.0)),
            vec![expr(update("++", false, ident("n")))],
        ),
    ]));
    let steps = step_all(&mut s.debugger);

    let block_enters = s
        .log
        .evaluations()
        .into_iter()
        .filter(|e| e.phase == Phase::Enter && e.context.block_kind.is_some())
        .count();
    assert_eq!(block_enters, 3);
    // declarator, while, 3 x (block, update), then the final step
    assert_eq!(steps, 9);
}

#[test]
fn test_silent_policy_runs_in_one_step() {
    let mut interp = Interpreter::new();
    interp.set_policy(StepPolicy::silent());
    interp.start(&parse(reassign_program()));
    assert_eq!(interp.step().unwrap(), StepOutcome::Idle);
    assert_eq!(interp.program_result(), Some(&number(2.0)));
}

#[test]
fn test_custom_policy_adds_pause_points() {
    let mut interp = Interpreter::new();
    interp.set_policy(
        StepPolicy::silent().with_node(NodeType::ExpressionStatement, NodePolicy::PAUSE),
    );
    interp.start(&parse(reassign_program()));

    let mut pauses = 0;
    while interp.step().unwrap() == StepOutcome::Paused {
        assert_eq!(
            interp.paused_at().unwrap().node_type(),
            NodeType::ExpressionStatement
        );
        pauses += 1;
    }
    assert_eq!(pauses, 2);
    assert_eq!(interp.program_result(), Some(&number(2.0)));
}

#[test]
fn test_block_policy_can_silence_loop_bodies() {
    let body = program(vec![
        let_("n", num(0.0)),
        while_(
            bin("<", ident("n"), num(3.0)),
            vec![expr(update("++", false, ident("n")))],
        ),
    ]);
    let mut interp = Interpreter::new();
    interp.set_policy(StepPolicy::default().with_block(BlockKind::While, NodePolicy::SILENT));
    interp.start(&parse(body));

    let mut pauses = Vec::new();
    while interp.step().unwrap() == StepOutcome::Paused {
        pauses.push(interp.paused_at().unwrap().node_type());
    }
    let mut expected = vec![NodeType::VariableDeclarator, NodeType::WhileStatement];
    expected.extend([NodeType::UpdateExpression; 3]);
    assert_eq!(pauses, expected);
}

#[test]
fn test_auto_stepping_follows_step_delay() {
    let config = DebuggerConfig {
        step_delay_ms: 100,
        ..DebuggerConfig::default()
    };
    let mut s = session_with(
        program(vec![
            let_("a", num(1.0)),
            let_("b", num(2.0)),
            let_("c", num(3.0)),
            let_("d", num(4.0)),
        ]),
        config,
    );

    assert_eq!(s.debugger.set_auto_stepping(true).unwrap(), Status::Running);
    assert_eq!(s.log.len(), 2);
    assert_eq!(s.debugger.next_deadline(), Some(100));

    s.debugger.advance(99).unwrap();
    assert_eq!(s.log.len(), 2);

    s.debugger.advance(1).unwrap();
    assert_eq!(s.debugger.status(), Status::Running);
    assert_eq!(s.log.len(), 5);
    assert_eq!(s.debugger.next_deadline(), Some(200));

    // The armed delay still fires once, but nothing is re-armed
    assert_eq!(s.debugger.pause(), Status::Paused);
    s.debugger.advance(100).unwrap();
    assert_eq!(s.debugger.status(), Status::Paused);
    assert_eq!(s.log.len(), 8);
    assert_eq!(s.debugger.next_deadline(), None);
    assert!(!s.debugger.is_auto_stepping());
}

#[test]
fn test_set_speed_applies_to_next_delay() {
    let mut s = session(program(vec![
        let_("a", num(1.0)),
        let_("b", num(2.0)),
        let_("c", num(3.0)),
    ]));
    s.debugger.set_auto_stepping(true).unwrap();
    assert_eq!(s.debugger.next_deadline(), Some(300));

    s.debugger.set_speed(50);
    s.debugger.advance(300).unwrap();
    assert_eq!(s.debugger.next_deadline(), Some(350));
}

#[test]
fn test_auto_stepping_runs_to_end() {
    let config = DebuggerConfig {
        step_delay_ms: 10,
        auto_step: true,
        ..DebuggerConfig::default()
    };
    let mut s = session_with(reassign_program(), config);
    assert_eq!(s.debugger.status(), Status::Running);

    s.debugger.advance(1_000).unwrap();
    assert_eq!(s.debugger.status(), Status::Ended);
    assert_eq!(s.debugger.result(), Some(&number(2.0)));
    assert_eq!(s.debugger.next_deadline(), None);
}

struct Rejecting;

impl Observer for Rejecting {
    fn on_evaluation(&mut self, _: &Evaluation, _: &FlowModel) -> Result<(), ObserverError> {
        Err(ObserverError::Closed)
    }
}

#[test]
fn test_observer_failures_do_not_stop_the_run() {
    let mut debugger = jsstep::Debugger::new(
        Box::new(jsstep::EstreeJsonParser),
        DebuggerConfig::default(),
    )
    .with_observer(Box::new(Rejecting));
    debugger.start(&reassign_program().to_string()).unwrap();
    step_all(&mut debugger);
    assert_eq!(debugger.status(), Status::Ended);
    assert_eq!(debugger.result(), Some(&number(2.0)));
}
