//! Stack frames, block frames and per-frame bookkeeping

use std::cell::RefCell;
use std::rc::Rc;

use jsstep::ast::NodeType;
use jsstep::flow::{BlockKind, Evaluation, FlowModel, ScopeId};
use jsstep::platform::ObserverError;
use jsstep::{Debugger, DebuggerConfig, EstreeJsonParser, Observer, Phase};

use super::fixture::*;
use super::{assert_ended, frame_names, number, path_names, session, step_all};

/// Checks at every event that the path holds the program frame plus one
/// frame per call that has entered but not yet exited
#[derive(Clone, Default)]
struct DepthProbe {
    state: Rc<RefCell<DepthState>>,
}

#[derive(Default)]
struct DepthState {
    open_calls: usize,
    max_depth: usize,
    violations: Vec<String>,
}

impl Observer for DepthProbe {
    fn on_evaluation(
        &mut self,
        evaluation: &Evaluation,
        flow: &FlowModel,
    ) -> Result<(), ObserverError> {
        let mut state = self.state.borrow_mut();
        let is_call = evaluation.context.call.is_some()
            && matches!(evaluation.phase, Phase::Enter | Phase::Exit);
        if is_call && evaluation.phase == Phase::Enter {
            state.open_calls += 1;
            // A new frame starts without blocks
            if flow.path().last().is_some_and(|entry| !entry.blocks.is_empty()) {
                state.violations.push("call entered with open blocks".to_string());
            }
        }
        let expected = 1 + state.open_calls;
        if flow.depth() != expected {
            let message = format!(
                "{} {} at depth {}, expected {}",
                evaluation.node.node_type(),
                evaluation.phase,
                flow.depth(),
                expected
            );
            state.violations.push(message);
        }
        state.max_depth = state.max_depth.max(flow.depth());
        if is_call && evaluation.phase == Phase::Exit {
            state.open_calls -= 1;
        }
        Ok(())
    }
}

fn probed(program: serde_json::Value) -> (Debugger, DepthProbe) {
    let probe = DepthProbe::default();
    let mut debugger = Debugger::new(Box::new(EstreeJsonParser), DebuggerConfig::default())
        .with_observer(Box::new(probe.clone()));
    debugger.start(&program.to_string()).unwrap();
    (debugger, probe)
}

/// `function inc(n) { return n + 1; } inc(41);`
fn inc_program() -> serde_json::Value {
    program(vec![
        func_decl("inc", &["n"], vec![ret(bin("+", ident("n"), num(1.0)))]),
        expr(call_fn("inc", vec![num(41.0)])),
    ])
}

#[test]
fn test_single_call_frame() {
    let mut s = session(inc_program());

    s.debugger.step().unwrap();
    assert_eq!(path_names(&s.debugger.flow()), vec!["Program"]);

    s.debugger.step().unwrap();
    assert_eq!(path_names(&s.debugger.flow()), vec!["Program", "inc"]);
    assert_eq!(
        s.debugger.interpreter().unwrap().paused_at().unwrap().node_type(),
        NodeType::ReturnStatement
    );

    s.debugger.step().unwrap();
    assert_ended(&s.debugger);
    assert_eq!(s.debugger.result(), Some(&number(42.0)));

    let flow = s.debugger.flow();
    assert_eq!(flow.depth(), 1);
    assert_eq!(flow.frames().len(), 2);
    let root = &flow.frames()[0];
    let inc = &flow.frames()[1];
    assert_eq!(inc.name, "inc");
    assert_eq!(inc.caller, Some(root.id));
    assert_eq!(
        inc.call_site.as_ref().map(|site| site.node_type()),
        Some(NodeType::CallExpression)
    );
    assert_eq!(
        inc.function.as_ref().map(|function| function.node_type()),
        Some(NodeType::FunctionDeclaration)
    );

    let meta = flow.frame_meta(inc.id).unwrap();
    assert!(meta.has_returned);
    assert!(!meta.threw);
    assert_eq!(meta.return_value, Some(number(42.0)));
    assert_eq!(meta.args, vec![number(41.0)]);
    assert_eq!(flow.frame_meta(root.id).unwrap().calls, vec![inc.id]);

    let call_events: Vec<Phase> = s
        .log
        .evaluations()
        .into_iter()
        .filter(|e| e.context.call == Some(inc.id))
        .map(|e| e.phase)
        .collect();
    assert_eq!(call_events, vec![Phase::Enter, Phase::Exit]);
}

#[test]
fn test_path_depth_follows_unmatched_calls() {
    // function fact(n) { if (n <= 1) { return 1; } return n * fact(n - 1); } fact(4);
    let (mut debugger, probe) = probed(program(vec![
        func_decl(
            "fact",
            &["n"],
            vec![
                if_(bin("<=", ident("n"), num(1.0)), vec![ret(num(1.0))], None),
                ret(bin(
                    "*",
                    ident("n"),
                    call_fn("fact", vec![bin("-", ident("n"), num(1.0))]),
                )),
            ],
        ),
        expr(call_fn("fact", vec![num(4.0)])),
    ]));
    step_all(&mut debugger);

    assert_ended(&debugger);
    assert_eq!(debugger.result(), Some(&number(24.0)));
    let state = probe.state.borrow();
    assert!(state.violations.is_empty(), "{:?}", state.violations);
    assert_eq!(state.open_calls, 0);
    assert_eq!(state.max_depth, 5);
    assert_eq!(frame_names(&debugger), vec!["Program", "fact", "fact", "fact", "fact"]);
}

#[test]
fn test_thrown_call_unwinds_its_frame() {
    // function boom() { throw new Error("x"); } try { boom(); } catch (e) {} "after";
    let (mut debugger, probe) = probed(program(vec![
        func_decl("boom", &[], vec![throw(new(ident("Error"), vec![string("x")]))]),
        try_catch(vec![expr(call_fn("boom", vec![]))], Some("e"), vec![], None),
        expr(string("after")),
    ]));
    step_all(&mut debugger);

    assert_ended(&debugger);
    assert_eq!(debugger.result(), Some(&super::str_val("after")));
    let state = probe.state.borrow();
    assert!(state.violations.is_empty(), "{:?}", state.violations);

    let flow = debugger.flow();
    let boom = flow.frames().iter().find(|f| f.name == "boom").unwrap();
    let meta = flow.frame_meta(boom.id).unwrap();
    assert!(meta.threw);
    assert!(!meta.has_returned);
    assert_eq!(meta.return_value, None);
    assert_eq!(flow.depth(), 1);
}

#[test]
fn test_blocks_open_and_close_with_bodies() {
    // let x = 0; for (let i = 0; i < 3; i++) { if (i > 0) { x = x + i; } } x;
    let mut s = session(program(vec![
        let_("x", num(0.0)),
        for_range(
            "i",
            0.0,
            num(3.0),
            vec![if_(
                bin(">", ident("i"), num(0.0)),
                vec![expr(assign("x", bin("+", ident("x"), ident("i"))))],
                None,
            )],
        ),
        expr(ident("x")),
    ]));
    step_all(&mut s.debugger);
    assert_ended(&s.debugger);
    assert_eq!(s.debugger.result(), Some(&number(3.0)));

    let flow = s.debugger.flow();
    let root = &flow.frames()[0];
    let kinds: Vec<BlockKind> = root.blocks.iter().map(|block| block.kind).collect();
    assert_eq!(
        kinds,
        vec![BlockKind::For, BlockKind::For, BlockKind::If, BlockKind::For, BlockKind::If]
    );
    assert!(flow.path()[0].blocks.is_empty());

    // If blocks nest inside the loop body that opened them
    let root_meta = flow.frame_meta(root.id).unwrap();
    assert_eq!(root_meta.blocks.len(), 3);
    let second_body = root.blocks[1].id;
    let nested = &flow.meta(ScopeId::Block(second_body)).unwrap().blocks;
    assert_eq!(nested, &vec![root.blocks[2].id]);

    // Every block enter has a matching exit
    let evaluations = s.log.evaluations();
    let enters = evaluations
        .iter()
        .filter(|e| e.context.block_kind.is_some() && e.phase == Phase::Enter)
        .count();
    let exits = evaluations
        .iter()
        .filter(|e| e.context.block_kind.is_some() && e.phase == Phase::Exit)
        .count();
    assert_eq!((enters, exits), (5, 5));
}

#[test]
fn test_break_closes_loop_block() {
    // for (let i = 0; i < 10; i++) { if (i === 2) { break; } } "done";
    let mut s = session(program(vec![
        for_range(
            "i",
            0.0,
            num(10.0),
            vec![if_(bin("===", ident("i"), num(2.0)), vec![break_()], None)],
        ),
        expr(string("done")),
    ]));
    step_all(&mut s.debugger);
    assert_ended(&s.debugger);

    let flow = s.debugger.flow();
    assert!(flow.path()[0].blocks.is_empty());
    let abrupt_exits = s
        .log
        .evaluations()
        .into_iter()
        .filter(|e| e.context.block_kind.is_some() && e.phase == Phase::Exit && e.context.abrupt)
        .count();
    // The if block and the loop body it sits in
    assert_eq!(abrupt_exits, 2);
}

#[test]
fn test_assignments_link_to_declaring_scope() {
    // let x = 1; function bump() { x = x + 1; } bump(); x;
    let mut s = session(program(vec![
        let_("x", num(1.0)),
        func_decl("bump", &[], vec![expr(assign("x", bin("+", ident("x"), num(1.0))))]),
        expr(call_fn("bump", vec![])),
        expr(ident("x")),
    ]));
    step_all(&mut s.debugger);
    assert_eq!(s.debugger.result(), Some(&number(2.0)));

    let assignment = s
        .log
        .evaluations()
        .into_iter()
        .find(|e| e.node.node_type() == NodeType::AssignmentExpression && e.phase == Phase::Enter)
        .unwrap();
    let origin = assignment.context.origin.unwrap();
    assert_eq!(origin.node_type(), NodeType::VariableDeclarator);

    let flow = s.debugger.flow();
    let root = flow.frames()[0].id;
    let bump = flow.frames()[1].id;
    let recorded: Vec<_> = flow
        .frame_meta(root)
        .unwrap()
        .assignments
        .iter()
        .map(|record| (record.name.to_string(), record.value.clone()))
        .collect();
    assert_eq!(
        recorded,
        vec![("x".to_string(), number(1.0)), ("x".to_string(), number(2.0))]
    );
    assert!(flow.frame_meta(bump).unwrap().assignments.is_empty());
    assert!(flow.frame_meta(root).unwrap().origins.contains_key("x"));
}

#[test]
fn test_frame_names_from_call_sites() {
    let mut s = session(program(vec![
        class_decl(
            "Counter",
            None,
            vec![
                method(
                    "constructor",
                    &[],
                    vec![expr(assign_to("=", member(this(), "n"), num(0.0)))],
                ),
                method(
                    "inc",
                    &[],
                    vec![
                        expr(call_method(this(), "bump", vec![])),
                        ret(member(this(), "n")),
                    ],
                ),
                method(
                    "bump",
                    &[],
                    vec![expr(assign_to(
                        "=",
                        member(this(), "n"),
                        bin("+", member(this(), "n"), num(1.0)),
                    ))],
                ),
            ],
        ),
        const_("c", new(ident("Counter"), vec![])),
        expr(call_method(ident("c"), "inc", vec![])),
    ]));
    step_all(&mut s.debugger);
    assert_ended(&s.debugger);
    assert_eq!(s.debugger.result(), Some(&number(1.0)));
    assert_eq!(
        frame_names(&s.debugger),
        vec!["Program", "new Counter", "c.inc", "this.bump"]
    );

    let flow = s.debugger.flow();
    let inc = &flow.frames()[2];
    let bump = &flow.frames()[3];
    assert_eq!(bump.caller, Some(inc.id));
}

#[test]
fn test_callbacks_from_native_code_get_frames() {
    // [1, 2].map(function double(v) { return v * 2; });
    let mut double = func_expr(&["v"], vec![ret(bin("*", ident("v"), num(2.0)))]);
    double["id"] = ident("double");
    let (mut debugger, probe) = probed(program(vec![expr(call_method(
        array(vec![num(1.0), num(2.0)]),
        "map",
        vec![double],
    ))]));
    step_all(&mut debugger);
    assert_ended(&debugger);

    let state = probe.state.borrow();
    assert!(state.violations.is_empty(), "{:?}", state.violations);
    assert_eq!(frame_names(&debugger), vec!["Program", "double", "double"]);
}
