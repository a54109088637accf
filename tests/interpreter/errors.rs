//! Uncaught errors, runtime error kinds and unsupported syntax

use jsstep::{Debugger, DebuggerConfig, EstreeJsonParser, Interpreter, JsError, JsValue, Status};
use serde_json::json;

use super::fixture::*;
use super::{number, parse, session, str_val, try_eval};

/// Step until the run fails, returning the error
fn step_until_error(debugger: &mut Debugger) -> JsError {
    for _ in 0..10_000 {
        match debugger.step() {
            Ok(status) if status.is_live() => {}
            Ok(status) => panic!("run finished with {status} instead of failing"),
            Err(error) => return error,
        }
    }
    panic!("program did not fail");
}

#[test]
fn test_uncaught_throw_ends_the_run() {
    // console.log("before"); throw new Error("boom"); console.log("after");
    let mut s = session(program(vec![
        log(vec![string("before")]),
        throw(new(ident("Error"), vec![string("boom")])),
        log(vec![string("after")]),
    ]));

    let error = step_until_error(&mut s.debugger);
    assert!(matches!(error, JsError::Thrown(_)));
    assert_eq!(error.to_string(), "Uncaught Error: boom");

    assert_eq!(s.debugger.status(), Status::Ended);
    assert!(s.debugger.last_error().is_some());
    assert_eq!(s.log.errors(), vec!["Uncaught Error: boom".to_string()]);
    assert_eq!(s.log.statuses().last(), Some(&Status::Ended));
    assert_eq!(s.console.messages(), vec!["before"]);

    // Further steps are no-ops
    assert_eq!(s.debugger.step().unwrap(), Status::Ended);
}

#[test]
fn test_thrown_primitives_keep_their_value() {
    let error = try_eval(program(vec![throw(string("plain"))])).unwrap_err();
    match &error {
        JsError::Thrown(value) => assert_eq!(value, &str_val("plain")),
        other => panic!("expected a thrown value, got {other:?}"),
    }
    assert_eq!(error.to_string(), "Uncaught plain");
}

#[test]
fn test_undeclared_identifier_is_a_reference_error() {
    let error = try_eval(program(vec![expr(ident("missing"))])).unwrap_err();
    assert!(matches!(&error, JsError::ReferenceError { name } if name == "missing"));
    assert_eq!(error.to_string(), "ReferenceError: missing is not defined");
}

#[test]
fn test_runtime_errors_are_catchable_as_objects() {
    // const n = 1; let r; try { n(); } catch (e) { r = e.name + "," + (e instanceof TypeError); } r;
    let result = try_eval(program(vec![
        const_("n", num(1.0)),
        let_uninit("r"),
        try_catch(
            vec![expr(call_fn("n", vec![]))],
            Some("e"),
            vec![expr(assign(
                "r",
                bin(
                    "+",
                    bin("+", member(ident("e"), "name"), string(",")),
                    bin("instanceof", ident("e"), ident("TypeError")),
                ),
            ))],
            None,
        ),
        expr(ident("r")),
    ]))
    .unwrap();
    assert_eq!(result, str_val("TypeError,true"));
}

#[test]
fn test_const_reassignment_is_a_type_error() {
    let error = try_eval(program(vec![
        const_("c", num(1.0)),
        expr(assign("c", num(2.0))),
    ]))
    .unwrap_err();
    assert!(matches!(error, JsError::TypeError { .. }), "{error:?}");
}

#[test]
fn test_labeled_statements_are_not_implemented() {
    let labeled = json!({
        "type": "LabeledStatement",
        "label": ident("outer"),
        "body": while_(boolean(false), vec![])
    });
    let error = try_eval(program(vec![labeled])).unwrap_err();
    assert!(error.is_not_implemented(), "{error:?}");
}

#[test]
fn test_default_parameters_are_not_implemented() {
    // function f(a = 1) { return a; } f();
    let default_param = json!({"type": "AssignmentPattern", "left": ident("a"), "right": num(1.0)});
    let error = try_eval(program(vec![
        func_decl_with("f", vec![default_param], vec![ret(ident("a"))]),
        expr(call_fn("f", vec![])),
    ]))
    .unwrap_err();
    assert!(error.is_not_implemented(), "{error:?}");
}

#[test]
fn test_unknown_node_types_are_not_implemented() {
    let error = try_eval(program(vec![expr(unsupported("ImportExpression"))])).unwrap_err();
    assert!(error.is_not_implemented(), "{error:?}");
}

#[test]
fn test_unbounded_recursion_is_a_range_error() {
    // function down(n) { return down(n + 1); } down(0);
    let config = DebuggerConfig {
        max_call_depth: 50,
        ..DebuggerConfig::default()
    };
    let mut debugger = Debugger::new(Box::new(EstreeJsonParser), config);
    let source = program(vec![
        func_decl(
            "down",
            &["n"],
            vec![ret(call_fn("down", vec![bin("+", ident("n"), num(1.0))]))],
        ),
        expr(call_fn("down", vec![num(0.0)])),
    ]);
    debugger.start(&source.to_string()).unwrap();

    let error = debugger.run_to_completion(100_000).unwrap_err();
    assert!(matches!(&error, JsError::RangeError { .. }), "{error:?}");
    assert_eq!(error.to_string(), "RangeError: Maximum call stack size exceeded");
    assert_eq!(debugger.status(), Status::Ended);
}

#[test]
fn test_malformed_source_is_rejected_at_start() {
    let mut s = session(program(vec![expr(num(1.0))]));
    let error = s.debugger.start("{\"type\": ").unwrap_err();
    assert!(matches!(error, JsError::SyntaxError { .. }), "{error:?}");
    assert!(s.debugger.last_error().is_some());
    assert_eq!(s.log.errors().len(), 1);
    assert!(s.debugger.interpreter().is_none());

    let error = s.debugger.start(&json!({"type": "Literal", "value": 1}).to_string());
    assert!(matches!(error, Err(JsError::SyntaxError { .. })));
}

#[test]
fn test_throw_from_timer_callback_ends_the_run() {
    // setTimeout(() => { throw new Error("late"); }, 10); setTimeout(() => {}, 20); "ok";
    let mut s = session(program(vec![
        expr(call_fn(
            "setTimeout",
            vec![
                arrow_block(&[], vec![throw(new(ident("Error"), vec![string("late")]))]),
                num(10.0),
            ],
        )),
        expr(call_fn("setTimeout", vec![arrow_block(&[], vec![]), num(20.0)])),
        expr(string("ok")),
    ]));

    let error = s.debugger.run_to_completion(10_000).unwrap_err();
    assert_eq!(error.to_string(), "Uncaught Error: late");
    assert_eq!(s.debugger.status(), Status::Ended);
    assert_eq!(s.debugger.outstanding_timers(), 0);
    assert_eq!(s.debugger.result(), Some(&JsValue::from("ok")));
}

#[test]
fn test_errors_inside_catch_replace_the_original() {
    // try { throw 1; } catch (e) { throw 2; }
    let error = try_eval(program(vec![try_catch(
        vec![throw(num(1.0))],
        Some("e"),
        vec![throw(num(2.0))],
        None,
    )]))
    .unwrap_err();
    assert_eq!(error.to_string(), "Uncaught 2");
}

/// `function f(n) { return n ? [n].map(x => f(x - 1))[0] : 0; } f(depth);`
///
/// Every level passes through a native `map`, so the recursion nests on the
/// host stack rather than the interpreter's frame stack.
fn recurse_through_map(depth: f64) -> serde_json::Value {
    program(vec![
        func_decl(
            "f",
            &["n"],
            vec![ret(cond(
                ident("n"),
                index(
                    call_method(
                        array(vec![ident("n")]),
                        "map",
                        vec![arrow(&["x"], call_fn("f", vec![bin("-", ident("x"), num(1.0))]))],
                    ),
                    num(0.0),
                ),
                num(0.0),
            ))],
        ),
        expr(call_fn("f", vec![num(depth)])),
    ])
}

#[test]
fn test_deep_recursion_through_native_callbacks() {
    let result = try_eval(recurse_through_map(3_000.0)).unwrap();
    assert_eq!(result, number(0.0));
}

#[test]
fn test_recursion_through_native_callbacks_hits_the_depth_limit() {
    let mut interp = Interpreter::new();
    interp.set_max_call_depth(100);
    let error = interp.run(&parse(recurse_through_map(3_000.0))).unwrap_err();
    assert!(matches!(&error, JsError::RangeError { .. }), "{error:?}");
    assert_eq!(error.to_string(), "RangeError: Maximum call stack size exceeded");
}
