//! Standard library surface: arrays, strings, objects, collections and console

use jsstep::platform::ConsoleLevel;
use jsstep::{BufferedConsole, Interpreter, JsError};

use super::fixture::*;
use super::{console_output, eval, number, parse, str_val, try_eval};

fn stringify(value: serde_json::Value) -> serde_json::Value {
    call_method(ident("JSON"), "stringify", vec![value])
}

#[test]
fn test_array_pipeline() {
    // [3, 1, 2].map(x => x * 2).filter(x => x > 2).join("-");
    let result = eval(program(vec![expr(call_method(
        call_method(
            call_method(
                array(vec![num(3.0), num(1.0), num(2.0)]),
                "map",
                vec![arrow(&["x"], bin("*", ident("x"), num(2.0)))],
            ),
            "filter",
            vec![arrow(&["x"], bin(">", ident("x"), num(2.0)))],
        ),
        "join",
        vec![string("-")],
    ))]));
    assert_eq!(result, str_val("6-4"));
}

#[test]
fn test_array_reduce_and_find() {
    // const xs = [1, 2, 3, 4];
    // xs.reduce((a, b) => a + b, 0) * 10 + xs.find(x => x > 2) + xs.indexOf(4);
    let xs = || ident("xs");
    let result = eval(program(vec![
        const_("xs", array(vec![num(1.0), num(2.0), num(3.0), num(4.0)])),
        expr(bin(
            "+",
            bin(
                "+",
                bin(
                    "*",
                    call_method(
                        xs(),
                        "reduce",
                        vec![arrow(&["a", "b"], bin("+", ident("a"), ident("b"))), num(0.0)],
                    ),
                    num(10.0),
                ),
                call_method(xs(), "find", vec![arrow(&["x"], bin(">", ident("x"), num(2.0)))]),
            ),
            call_method(xs(), "indexOf", vec![num(4.0)]),
        )),
    ]));
    assert_eq!(result, number(106.0));
}

#[test]
fn test_array_sort_orders() {
    // [10, 9, 1].sort().join() + "|" + [10, 9, 1].sort((a, b) => a - b).join();
    let items = || array(vec![num(10.0), num(9.0), num(1.0)]);
    let result = eval(program(vec![expr(bin(
        "+",
        bin("+", call_method(call_method(items(), "sort", vec![]), "join", vec![]), string("|")),
        call_method(
            call_method(
                items(),
                "sort",
                vec![arrow(&["a", "b"], bin("-", ident("a"), ident("b")))],
            ),
            "join",
            vec![],
        ),
    ))]));
    assert_eq!(result, str_val("1,10,9|1,9,10"));
}

#[test]
fn test_array_mutators() {
    // const a = [1, 2]; a.push(3); a.unshift(0); a.pop(); a.splice(1, 1); JSON.stringify(a);
    let result = eval(program(vec![
        const_("a", array(vec![num(1.0), num(2.0)])),
        expr(call_method(ident("a"), "push", vec![num(3.0)])),
        expr(call_method(ident("a"), "unshift", vec![num(0.0)])),
        expr(call_method(ident("a"), "pop", vec![])),
        expr(call_method(ident("a"), "splice", vec![num(1.0), num(1.0)])),
        expr(stringify(ident("a"))),
    ]));
    assert_eq!(result, str_val("[0,2]"));
}

#[test]
fn test_string_methods() {
    let output = console_output(program(vec![
        log(vec![call_method(string("Hello"), "toUpperCase", vec![])]),
        log(vec![call_method(string("  x "), "trim", vec![])]),
        log(vec![call_method(string("abc"), "slice", vec![num(1.0)])]),
        log(vec![member(call_method(string("a,b,c"), "split", vec![string(",")]), "length")]),
        log(vec![call_method(string("5"), "padStart", vec![num(3.0), string("0")])]),
        log(vec![call_method(string("banana"), "indexOf", vec![string("an")])]),
        log(vec![call_method(string("ab"), "repeat", vec![num(2.0)])]),
        log(vec![call_method(string("a-b-c"), "replaceAll", vec![string("-"), string("+")])]),
    ]));
    assert_eq!(output, vec!["HELLO", "x", "bc", "3", "005", "1", "abab", "a+b+c"]);
}

#[test]
fn test_object_helpers() {
    // const o = Object.assign({}, { a: 1 }, { b: 2 });
    // JSON.stringify(Object.keys(o)) + JSON.stringify(Object.entries(o)) + o.hasOwnProperty("a");
    let result = eval(program(vec![
        const_(
            "o",
            call_method(
                ident("Object"),
                "assign",
                vec![
                    object(vec![]),
                    object(vec![("a", num(1.0))]),
                    object(vec![("b", num(2.0))]),
                ],
            ),
        ),
        expr(bin(
            "+",
            bin(
                "+",
                stringify(call_method(ident("Object"), "keys", vec![ident("o")])),
                stringify(call_method(ident("Object"), "entries", vec![ident("o")])),
            ),
            call_method(ident("o"), "hasOwnProperty", vec![string("a")]),
        )),
    ]));
    assert_eq!(result, str_val(r#"["a","b"][["a",1],["b",2]]true"#));
}

#[test]
fn test_frozen_objects_ignore_writes() {
    // const o = Object.freeze({ a: 1 }); o.a = 2; Object.isFrozen(o) + ":" + o.a;
    let result = eval(program(vec![
        const_(
            "o",
            call_method(ident("Object"), "freeze", vec![object(vec![("a", num(1.0))])]),
        ),
        expr(assign_to("=", member(ident("o"), "a"), num(2.0))),
        expr(bin(
            "+",
            bin(
                "+",
                call_method(ident("Object"), "isFrozen", vec![ident("o")]),
                string(":"),
            ),
            member(ident("o"), "a"),
        )),
    ]));
    assert_eq!(result, str_val("true:1"));
}

#[test]
fn test_map_and_set() {
    // const m = new Map([["a", 1]]); m.set("b", 2); m.set("a", 3);
    // const s = new Set([1, 2, 2, 3]); s.delete(1);
    // m.size + "," + m.get("a") + "," + m.has("z") + "," + s.size + "," + s.has(2);
    let result = eval(program(vec![
        const_(
            "m",
            new(ident("Map"), vec![array(vec![array(vec![string("a"), num(1.0)])])]),
        ),
        expr(call_method(ident("m"), "set", vec![string("b"), num(2.0)])),
        expr(call_method(ident("m"), "set", vec![string("a"), num(3.0)])),
        const_(
            "s",
            new(
                ident("Set"),
                vec![array(vec![num(1.0), num(2.0), num(2.0), num(3.0)])],
            ),
        ),
        expr(call_method(ident("s"), "delete", vec![num(1.0)])),
        expr(call_method(
            array(vec![
                member(ident("m"), "size"),
                call_method(ident("m"), "get", vec![string("a")]),
                call_method(ident("m"), "has", vec![string("z")]),
                member(ident("s"), "size"),
                call_method(ident("s"), "has", vec![num(2.0)]),
            ]),
            "join",
            vec![string(",")],
        )),
    ]));
    assert_eq!(result, str_val("2,3,false,2,true"));
}

#[test]
fn test_math_functions() {
    // Math.max(1, 5, 3) + Math.min(2, 0) + Math.floor(2.7) + Math.abs(-3) + Math.round(2.5) + Math.pow(2, 3);
    let math = |name: &str, args: Vec<serde_json::Value>| call_method(ident("Math"), name, args);
    let result = eval(program(vec![expr(bin(
        "+",
        bin(
            "+",
            bin(
                "+",
                bin(
                    "+",
                    bin(
                        "+",
                        math("max", vec![num(1.0), num(5.0), num(3.0)]),
                        math("min", vec![num(2.0), num(0.0)]),
                    ),
                    math("floor", vec![num(2.7)]),
                ),
                math("abs", vec![num(-3.0)]),
            ),
            math("round", vec![num(2.5)]),
        ),
        math("pow", vec![num(2.0), num(3.0)]),
    ))]));
    assert_eq!(result, number(21.0));
}

#[test]
fn test_json_parse_and_stringify() {
    // const data = JSON.parse('{"a":[1,{"b":null}],"c":"x"}'); data.a[0] + ":" + JSON.stringify(data);
    let text = r#"{"a":[1,{"b":null}],"c":"x"}"#;
    let result = eval(program(vec![
        const_("data", call_method(ident("JSON"), "parse", vec![string(text)])),
        expr(bin(
            "+",
            bin("+", index(member(ident("data"), "a"), num(0.0)), string(":")),
            stringify(ident("data")),
        )),
    ]));
    assert_eq!(result, str_val(&format!("1:{}", text)));
}

#[test]
fn test_numbers() {
    let output = console_output(program(vec![
        log(vec![call_method(num(3.14159), "toFixed", vec![num(2.0)])]),
        log(vec![call_fn("parseInt", vec![string("42px")])]),
        log(vec![call_method(ident("Number"), "isInteger", vec![num(5.0)])]),
        log(vec![bin("/", num(1.0), num(0.0))]),
        log(vec![bin("+", num(0.1), num(0.2))]),
    ]));
    assert_eq!(output, vec!["3.14", "42", "true", "Infinity", "0.30000000000000004"]);
}

#[test]
fn test_console_levels_and_formatting() {
    let console = BufferedConsole::new();
    let mut interp = Interpreter::new();
    interp.set_console(Box::new(console.clone()));
    interp
        .run(&parse(program(vec![
            log(vec![
                string("obj"),
                object(vec![("a", num(1.0))]),
                array(vec![num(1.0), string("two")]),
            ]),
            expr(call_method(member(ident("console"), "warn"), "call", vec![null(), string("w")])),
            expr(call_method(ident("console"), "error", vec![string("e"), num(2.0)])),
            expr(call_method(ident("console"), "info", vec![boolean(true)])),
        ])))
        .unwrap();

    assert_eq!(
        console.lines(),
        vec![
            (ConsoleLevel::Log, "obj { a: 1 } [ 1, 'two' ]".to_string()),
            (ConsoleLevel::Warn, "w".to_string()),
            (ConsoleLevel::Error, "e 2".to_string()),
            (ConsoleLevel::Info, "true".to_string()),
        ]
    );
}

#[test]
fn test_console_clear_empties_the_buffer() {
    let output = console_output(program(vec![
        log(vec![string("gone")]),
        expr(call_method(ident("console"), "clear", vec![])),
        log(vec![string("kept")]),
    ]));
    assert_eq!(output, vec!["kept"]);
}

fn assert_range_error(program: serde_json::Value, message: &str) {
    let error = try_eval(program).unwrap_err();
    assert!(matches!(&error, JsError::RangeError { .. }), "{error:?}");
    assert!(error.to_string().contains(message), "{error}");
}

#[test]
fn test_huge_array_lengths_are_range_errors() {
    // const a = []; a.length = 1e18;
    assert_range_error(
        program(vec![
            const_("a", array(vec![])),
            expr(assign_to("=", member(ident("a"), "length"), num(1e18))),
        ]),
        "Invalid array length",
    );
    // const a = []; a[4294967294] = 1;
    assert_range_error(
        program(vec![
            const_("a", array(vec![])),
            expr(assign_to("=", index(ident("a"), num(4_294_967_294.0)), num(1.0))),
        ]),
        "Invalid array length",
    );
    // Array.from({ length: 1e18 });
    assert_range_error(
        program(vec![expr(call_method(
            ident("Array"),
            "from",
            vec![object(vec![("length", num(1e18))])],
        ))]),
        "Invalid array length",
    );
    // new Array(4294967295);
    assert_range_error(
        program(vec![expr(new(ident("Array"), vec![num(4_294_967_295.0)]))]),
        "Invalid array length",
    );
}

#[test]
fn test_invalid_array_length_is_catchable() {
    // const a = [1, 2]; let r; try { a.length = -1; } catch (e) { r = e.name; } r + a.length;
    let result = eval(program(vec![
        const_("a", array(vec![num(1.0), num(2.0)])),
        let_uninit("r"),
        try_catch(
            vec![expr(assign_to("=", member(ident("a"), "length"), num(-1.0)))],
            Some("e"),
            vec![expr(assign("r", member(ident("e"), "name")))],
            None,
        ),
        expr(bin("+", ident("r"), member(ident("a"), "length"))),
    ]));
    assert_eq!(result, str_val("RangeError2"));
}

#[test]
fn test_keys_past_the_index_range_are_plain_properties() {
    // const a = [1]; a[4294967295] = "x"; a.length + a[4294967295];
    let result = eval(program(vec![
        const_("a", array(vec![num(1.0)])),
        expr(assign_to("=", index(ident("a"), num(4_294_967_295.0)), string("x"))),
        expr(bin(
            "+",
            member(ident("a"), "length"),
            index(ident("a"), num(4_294_967_295.0)),
        )),
    ]));
    assert_eq!(result, str_val("1x"));
}

#[test]
fn test_huge_strings_are_range_errors() {
    // "x".padStart(1e18);
    assert_range_error(
        program(vec![expr(call_method(string("x"), "padStart", vec![num(1e18)]))]),
        "Invalid string length",
    );
    // "ab".repeat(1e12);
    assert_range_error(
        program(vec![expr(call_method(string("ab"), "repeat", vec![num(1e12)]))]),
        "Invalid string length",
    );
    // Targets within reach still pad
    let result = eval(program(vec![expr(call_method(
        string("x"),
        "padEnd",
        vec![num(3.5), string("-")],
    ))]));
    assert_eq!(result, str_val("x--"));
}
