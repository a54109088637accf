//! Functions, closures, parameters and classes

use serde_json::json;

use super::fixture::*;
use super::{eval, number, str_val};

#[test]
fn test_closure_keeps_its_scope() {
    // function makeCounter() { let c = 0; return function () { c = c + 1; return c; }; }
    // const next = makeCounter(); next(); next(); next();
    let result = eval(program(vec![
        func_decl(
            "makeCounter",
            &[],
            vec![
                let_("c", num(0.0)),
                ret(func_expr(
                    &[],
                    vec![expr(assign("c", bin("+", ident("c"), num(1.0)))), ret(ident("c"))],
                )),
            ],
        ),
        const_("next", call_fn("makeCounter", vec![])),
        expr(call_fn("next", vec![])),
        expr(call_fn("next", vec![])),
        expr(call_fn("next", vec![])),
    ]));
    assert_eq!(result, number(3.0));
}

#[test]
fn test_missing_arguments_are_undefined() {
    let result = eval(program(vec![
        func_decl("second", &["a", "b"], vec![ret(unary("typeof", ident("b")))]),
        expr(call_fn("second", vec![num(1.0)])),
    ]));
    assert_eq!(result, str_val("undefined"));
}

#[test]
fn test_rest_parameters() {
    // function count(first, ...rest) { return rest.length; } count(1, 2, 3, 4);
    let result = eval(program(vec![
        func_decl("count", &["first", "...rest"], vec![ret(member(ident("rest"), "length"))]),
        expr(call_fn("count", vec![num(1.0), num(2.0), num(3.0), num(4.0)])),
    ]));
    assert_eq!(result, number(3.0));
}

#[test]
fn test_object_pattern_parameters() {
    // function area({ w, h }) { return w * h; } area({ w: 3, h: 4 });
    let result = eval(program(vec![
        func_decl_with(
            "area",
            vec![object_pattern(&["w", "h"])],
            vec![ret(bin("*", ident("w"), ident("h")))],
        ),
        expr(call_fn("area", vec![object(vec![("w", num(3.0)), ("h", num(4.0))])])),
    ]));
    assert_eq!(result, number(12.0));
}

#[test]
fn test_object_pattern_declaration() {
    // const { a, b } = { a: 1, b: 2, c: 3 }; a + b;
    let result = eval(program(vec![
        const_pattern(
            &["a", "b"],
            object(vec![("a", num(1.0)), ("b", num(2.0)), ("c", num(3.0))]),
        ),
        expr(bin("+", ident("a"), ident("b"))),
    ]));
    assert_eq!(result, number(3.0));
}

#[test]
fn test_declarations_are_hoisted() {
    // later(); function later() { return "hoisted"; }
    let result = eval(program(vec![
        expr(call_fn("later", vec![])),
        func_decl("later", &[], vec![ret(string("hoisted"))]),
    ]));
    assert_eq!(result, str_val("hoisted"));

    // const before = typeof v; var v = 1; before;
    let result = eval(program(vec![
        const_("before", unary("typeof", ident("v"))),
        var("v", num(1.0)),
        expr(ident("before")),
    ]));
    assert_eq!(result, str_val("undefined"));
}

#[test]
fn test_anonymous_functions_take_binding_name() {
    // const f = function () {}; const g = () => 1; f.name + "," + g.name;
    let result = eval(program(vec![
        const_("f", func_expr(&[], vec![])),
        const_("g", arrow(&[], num(1.0))),
        expr(bin(
            "+",
            bin("+", member(ident("f"), "name"), string(",")),
            member(ident("g"), "name"),
        )),
    ]));
    assert_eq!(result, str_val("f,g"));
}

#[test]
fn test_arrow_functions_capture_this() {
    // const o = { v: 7, get: function () { const inner = () => this.v; return inner(); } }; o.get();
    let result = eval(program(vec![
        const_(
            "o",
            object(vec![
                ("v", num(7.0)),
                (
                    "get",
                    func_expr(
                        &[],
                        vec![
                            const_("inner", arrow(&[], member(this(), "v"))),
                            ret(call_fn("inner", vec![])),
                        ],
                    ),
                ),
            ]),
        ),
        expr(call_method(ident("o"), "get", vec![])),
    ]));
    assert_eq!(result, number(7.0));
}

#[test]
fn test_call_apply_bind() {
    // function add(a, b) { return this.base + a + b; } const o = { base: 10 };
    // add.call(o, 1, 2) + add.apply(o, [3, 4]) + add.bind(o, 5)(6);
    let result = eval(program(vec![
        func_decl(
            "add",
            &["a", "b"],
            vec![ret(bin(
                "+",
                bin("+", member(this(), "base"), ident("a")),
                ident("b"),
            ))],
        ),
        const_("o", object(vec![("base", num(10.0))])),
        expr(bin(
            "+",
            bin(
                "+",
                call_method(ident("add"), "call", vec![ident("o"), num(1.0), num(2.0)]),
                call_method(
                    ident("add"),
                    "apply",
                    vec![ident("o"), array(vec![num(3.0), num(4.0)])],
                ),
            ),
            call(
                call_method(ident("add"), "bind", vec![ident("o"), num(5.0)]),
                vec![num(6.0)],
            ),
        )),
    ]));
    assert_eq!(result, number(51.0));
}

#[test]
fn test_class_inheritance_and_super() {
    // class Animal { constructor(name) { this.name = name; } speak() { return this.name + " makes a sound"; } }
    // class Dog extends Animal { constructor(name) { super(name); } speak() { return super.speak() + " (woof)"; } }
    // new Dog("Rex").speak();
    let result = eval(program(vec![
        class_decl(
            "Animal",
            None,
            vec![
                method(
                    "constructor",
                    &["name"],
                    vec![expr(assign_to("=", member(this(), "name"), ident("name")))],
                ),
                method(
                    "speak",
                    &[],
                    vec![ret(bin("+", member(this(), "name"), string(" makes a sound")))],
                ),
            ],
        ),
        class_decl(
            "Dog",
            Some(ident("Animal")),
            vec![
                method("constructor", &["name"], vec![expr(super_call(vec![ident("name")]))]),
                method(
                    "speak",
                    &[],
                    vec![ret(bin("+", super_method("speak", vec![]), string(" (woof)")))],
                ),
            ],
        ),
        expr(call_method(new(ident("Dog"), vec![string("Rex")]), "speak", vec![])),
    ]));
    assert_eq!(result, str_val("Rex makes a sound (woof)"));
}

#[test]
fn test_instances_and_static_methods() {
    // class M { static twice(x) { return x * 2; } } const m = new M();
    // (m instanceof M) && M.twice(21);
    let result = eval(program(vec![
        class_decl(
            "M",
            None,
            vec![static_method("twice", &["x"], vec![ret(bin("*", ident("x"), num(2.0)))])],
        ),
        const_("m", new(ident("M"), vec![])),
        expr(logical(
            "&&",
            bin("instanceof", ident("m"), ident("M")),
            call_method(ident("M"), "twice", vec![num(21.0)]),
        )),
    ]));
    assert_eq!(result, number(42.0));
}

#[test]
fn test_constructor_functions() {
    // function Point(x) { this.x = x; } Point.prototype.double = function () { return this.x * 2; };
    // new Point(4).double();
    let result = eval(program(vec![
        func_decl(
            "Point",
            &["x"],
            vec![expr(assign_to("=", member(this(), "x"), ident("x")))],
        ),
        expr(assign_to(
            "=",
            member(member(ident("Point"), "prototype"), "double"),
            func_expr(&[], vec![ret(bin("*", member(this(), "x"), num(2.0)))]),
        )),
        expr(call_method(new(ident("Point"), vec![num(4.0)]), "double", vec![])),
    ]));
    assert_eq!(result, number(8.0));
}

#[test]
fn test_template_literals() {
    // const who = "world"; `hello ${who}!`;
    let template = json!({
        "type": "TemplateLiteral",
        "quasis": [
            {"type": "TemplateElement", "value": {"raw": "hello ", "cooked": "hello "}, "tail": false},
            {"type": "TemplateElement", "value": {"raw": "!", "cooked": "!"}, "tail": true}
        ],
        "expressions": [ident("who")]
    });
    let result = eval(program(vec![const_("who", string("world")), expr(template)]));
    assert_eq!(result, str_val("hello world!"));
}
