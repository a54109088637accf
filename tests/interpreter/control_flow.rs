//! Statements: branches, loops, switch, try/finally and operators

use super::fixture::*;
use super::{console_output, eval, number, str_val};

#[test]
fn test_if_else_chain() {
    // function grade(n) { if (n > 89) { return "a"; } else { if (n > 79) { return "b"; } } return "c"; }
    let program_for = |n: f64| {
        program(vec![
            func_decl(
                "grade",
                &["n"],
                vec![
                    if_(
                        bin(">", ident("n"), num(89.0)),
                        vec![ret(string("a"))],
                        Some(vec![if_(
                            bin(">", ident("n"), num(79.0)),
                            vec![ret(string("b"))],
                            None,
                        )]),
                    ),
                    ret(string("c")),
                ],
            ),
            expr(call_fn("grade", vec![num(n)])),
        ])
    };
    assert_eq!(eval(program_for(95.0)), str_val("a"));
    assert_eq!(eval(program_for(85.0)), str_val("b"));
    assert_eq!(eval(program_for(10.0)), str_val("c"));
}

#[test]
fn test_while_and_do_while() {
    // let n = 0; while (n < 5) { n = n + 2; } let runs = 0; do { runs++; } while (false); n * 10 + runs;
    let result = eval(program(vec![
        let_("n", num(0.0)),
        while_(
            bin("<", ident("n"), num(5.0)),
            vec![expr(assign("n", bin("+", ident("n"), num(2.0))))],
        ),
        let_("runs", num(0.0)),
        do_while(vec![expr(update("++", false, ident("runs")))], boolean(false)),
        expr(bin("+", bin("*", ident("n"), num(10.0)), ident("runs"))),
    ]));
    assert_eq!(result, number(61.0));
}

#[test]
fn test_continue_and_break() {
    // let s = 0;
    // for (let i = 0; i < 10; i++) { if (i % 2 === 0) { continue; } if (i > 7) { break; } s = s + i; }
    // s;
    let result = eval(program(vec![
        let_("s", num(0.0)),
        for_range(
            "i",
            0.0,
            num(10.0),
            vec![
                if_(
                    bin("===", bin("%", ident("i"), num(2.0)), num(0.0)),
                    vec![continue_()],
                    None,
                ),
                if_(bin(">", ident("i"), num(7.0)), vec![break_()], None),
                expr(assign("s", bin("+", ident("s"), ident("i")))),
            ],
        ),
        expr(ident("s")),
    ]));
    assert_eq!(result, number(16.0));
}

#[test]
fn test_loop_closures_capture_each_iteration() {
    // const fns = []; for (let i = 0; i < 3; i++) { fns.push(() => i); } fns[0]() + fns[1]() + fns[2]();
    let result = eval(program(vec![
        const_("fns", array(vec![])),
        for_range(
            "i",
            0.0,
            num(3.0),
            vec![expr(call_method(ident("fns"), "push", vec![arrow(&[], ident("i"))]))],
        ),
        expr(bin(
            "+",
            bin(
                "+",
                call(index(ident("fns"), num(0.0)), vec![]),
                call(index(ident("fns"), num(1.0)), vec![]),
            ),
            call(index(ident("fns"), num(2.0)), vec![]),
        )),
    ]));
    assert_eq!(result, number(3.0));
}

#[test]
fn test_for_of_and_for_in() {
    // let total = 0; for (const v of [1, 2, 3]) { total = total + v; }
    // let keys = ""; for (const k in { a: 1, b: 2 }) { keys = keys + k; }
    // keys + total;
    let result = eval(program(vec![
        let_("total", num(0.0)),
        for_of(
            "const",
            "v",
            array(vec![num(1.0), num(2.0), num(3.0)]),
            vec![expr(assign("total", bin("+", ident("total"), ident("v"))))],
        ),
        let_("keys", string("")),
        for_in(
            "k",
            object(vec![("a", num(1.0)), ("b", num(2.0))]),
            vec![expr(assign("keys", bin("+", ident("keys"), ident("k"))))],
        ),
        expr(bin("+", ident("keys"), ident("total"))),
    ]));
    assert_eq!(result, str_val("ab6"));
}

#[test]
fn test_for_of_iterates_maps_and_strings() {
    // const m = new Map(); m.set("x", 1); m.set("y", 2);
    // for (const entry of m) { console.log(entry[0], entry[1]); }
    // for (const ch of "hi") { console.log(ch); }
    let output = console_output(program(vec![
        const_("m", new(ident("Map"), vec![])),
        expr(call_method(ident("m"), "set", vec![string("x"), num(1.0)])),
        expr(call_method(ident("m"), "set", vec![string("y"), num(2.0)])),
        for_of(
            "const",
            "entry",
            ident("m"),
            vec![log(vec![
                index(ident("entry"), num(0.0)),
                index(ident("entry"), num(1.0)),
            ])],
        ),
        for_of("const", "ch", string("hi"), vec![log(vec![ident("ch")])]),
    ]));
    assert_eq!(output, vec!["x 1", "y 2", "h", "i"]);
}

#[test]
fn test_switch_fallthrough_and_default() {
    // function f(x) { let r = ""; switch (x) { case 1: r = r + "one"; case 2: r = r + "two"; break; default: r = "other"; } return r; }
    // f(1) + "," + f(2) + "," + f(3);
    let append = |s: &str| expr(assign("r", bin("+", ident("r"), string(s))));
    let result = eval(program(vec![
        func_decl(
            "f",
            &["x"],
            vec![
                let_("r", string("")),
                switch(
                    ident("x"),
                    vec![
                        (Some(num(1.0)), vec![append("one")]),
                        (Some(num(2.0)), vec![append("two"), break_()]),
                        (None, vec![expr(assign("r", string("other")))]),
                    ],
                ),
                ret(ident("r")),
            ],
        ),
        expr(bin(
            "+",
            bin(
                "+",
                bin(
                    "+",
                    bin("+", call_fn("f", vec![num(1.0)]), string(",")),
                    call_fn("f", vec![num(2.0)]),
                ),
                string(","),
            ),
            call_fn("f", vec![num(3.0)]),
        )),
    ]));
    assert_eq!(result, str_val("onetwo,two,other"));
}

#[test]
fn test_finally_runs_before_return_completes() {
    // function f() { try { console.log("try"); return "ret"; } finally { console.log("finally"); } }
    // console.log(f());
    let output = console_output(program(vec![
        func_decl(
            "f",
            &[],
            vec![try_finally(
                vec![log(vec![string("try")]), ret(string("ret"))],
                vec![log(vec![string("finally")])],
            )],
        ),
        log(vec![call_fn("f", vec![])]),
    ]));
    assert_eq!(output, vec!["try", "finally", "ret"]);
}

#[test]
fn test_catch_then_finally() {
    // try { throw new Error("boom"); } catch (e) { console.log("caught", e.message); } finally { console.log("cleanup"); }
    let output = console_output(program(vec![try_catch(
        vec![throw(new(ident("Error"), vec![string("boom")]))],
        Some("e"),
        vec![log(vec![string("caught"), member(ident("e"), "message")])],
        Some(vec![log(vec![string("cleanup")])]),
    )]));
    assert_eq!(output, vec!["caught boom", "cleanup"]);
}

#[test]
fn test_break_out_of_try_runs_finally() {
    // while (true) { try { break; } finally { console.log("left"); } } console.log("after");
    let output = console_output(program(vec![
        while_(
            boolean(true),
            vec![try_finally(vec![break_()], vec![log(vec![string("left")])])],
        ),
        log(vec![string("after")]),
    ]));
    assert_eq!(output, vec!["left", "after"]);
}

#[test]
fn test_update_and_compound_assignment() {
    // let a = 1; const b = a++; const c = ++a; a += 10; JSON.stringify([a, b, c]);
    let result = eval(program(vec![
        let_("a", num(1.0)),
        const_("b", update("++", false, ident("a"))),
        const_("c", update("++", true, ident("a"))),
        expr(assign_to("+=", ident("a"), num(10.0))),
        expr(call_method(
            ident("JSON"),
            "stringify",
            vec![array(vec![ident("a"), ident("b"), ident("c")])],
        )),
    ]));
    assert_eq!(result, str_val("[13,1,3]"));
}

#[test]
fn test_logical_operators_short_circuit() {
    // let calls = 0; function hit() { calls++; return true; }
    // const a = false && hit(); const b = true || hit(); const c = null ?? "d"; const d = 0 || "x";
    // calls + a.toString() + b + c + d;
    let result = eval(program(vec![
        let_("calls", num(0.0)),
        func_decl(
            "hit",
            &[],
            vec![expr(update("++", false, ident("calls"))), ret(boolean(true))],
        ),
        const_("a", logical("&&", boolean(false), call_fn("hit", vec![]))),
        const_("b", logical("||", boolean(true), call_fn("hit", vec![]))),
        const_("c", logical("??", null(), string("d"))),
        const_("d", logical("||", num(0.0), string("x"))),
        expr(bin(
            "+",
            bin(
                "+",
                bin(
                    "+",
                    bin("+", ident("calls"), call_method(ident("a"), "toString", vec![])),
                    ident("b"),
                ),
                ident("c"),
            ),
            ident("d"),
        )),
    ]));
    assert_eq!(result, str_val("0falsetruedx"));
}

#[test]
fn test_conditional_and_equality() {
    // (1 == "1") && !(1 === "1") ? "loose" : "strict";
    let result = eval(program(vec![expr(cond(
        logical(
            "&&",
            bin("==", num(1.0), string("1")),
            unary("!", bin("===", num(1.0), string("1"))),
        ),
        string("loose"),
        string("strict"),
    ))]));
    assert_eq!(result, str_val("loose"));
}

#[test]
fn test_typeof_and_delete() {
    // const o = { a: 1 }; delete o.a; typeof o.a + "," + typeof o + "," + typeof null;
    let result = eval(program(vec![
        const_("o", object(vec![("a", num(1.0))])),
        expr(unary("delete", member(ident("o"), "a"))),
        expr(bin(
            "+",
            bin(
                "+",
                bin("+", unary("typeof", member(ident("o"), "a")), string(",")),
                bin("+", unary("typeof", ident("o")), string(",")),
            ),
            unary("typeof", null()),
        )),
    ]));
    assert_eq!(result, str_val("undefined,object,object"));
}
