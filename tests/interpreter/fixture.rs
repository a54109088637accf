//! ESTree builders for test programs
//!
//! Each helper returns the JSON an ESTree parser would produce for the
//! corresponding source construct. Positions are left out unless a test
//! needs them.

use serde_json::{Value, json};

pub fn program(body: Vec<Value>) -> Value {
    json!({"type": "Program", "body": body})
}

// ═══════════════════════════════════════════════════════════════════════════
// Literals and names
// ═══════════════════════════════════════════════════════════════════════════

pub fn ident(name: &str) -> Value {
    json!({"type": "Identifier", "name": name})
}

pub fn num(n: f64) -> Value {
    json!({"type": "Literal", "value": n})
}

pub fn string(s: &str) -> Value {
    json!({"type": "Literal", "value": s})
}

pub fn boolean(b: bool) -> Value {
    json!({"type": "Literal", "value": b})
}

pub fn null() -> Value {
    json!({"type": "Literal", "value": null})
}

pub fn this() -> Value {
    json!({"type": "ThisExpression"})
}

pub fn array(items: Vec<Value>) -> Value {
    json!({"type": "ArrayExpression", "elements": items})
}

pub fn object(props: Vec<(&str, Value)>) -> Value {
    let properties: Vec<Value> = props
        .into_iter()
        .map(|(key, value)| {
            json!({"type": "Property", "key": ident(key), "value": value, "kind": "init"})
        })
        .collect();
    json!({"type": "ObjectExpression", "properties": properties})
}

/// Node of a type the interpreter has no model for
pub fn unsupported(node_type: &str) -> Value {
    json!({"type": node_type})
}

// ═══════════════════════════════════════════════════════════════════════════
// Expressions
// ═══════════════════════════════════════════════════════════════════════════

pub fn bin(op: &str, left: Value, right: Value) -> Value {
    json!({"type": "BinaryExpression", "operator": op, "left": left, "right": right})
}

pub fn logical(op: &str, left: Value, right: Value) -> Value {
    json!({"type": "LogicalExpression", "operator": op, "left": left, "right": right})
}

pub fn assign(name: &str, value: Value) -> Value {
    assign_to("=", ident(name), value)
}

pub fn assign_to(op: &str, left: Value, right: Value) -> Value {
    json!({"type": "AssignmentExpression", "operator": op, "left": left, "right": right})
}

pub fn update(op: &str, prefix: bool, argument: Value) -> Value {
    json!({"type": "UpdateExpression", "operator": op, "prefix": prefix, "argument": argument})
}

pub fn unary(op: &str, argument: Value) -> Value {
    json!({"type": "UnaryExpression", "operator": op, "prefix": true, "argument": argument})
}

pub fn cond(test: Value, consequent: Value, alternate: Value) -> Value {
    json!({
        "type": "ConditionalExpression",
        "test": test, "consequent": consequent, "alternate": alternate
    })
}

pub fn call(callee: Value, args: Vec<Value>) -> Value {
    json!({"type": "CallExpression", "callee": callee, "arguments": args})
}

/// `name(args)`
pub fn call_fn(name: &str, args: Vec<Value>) -> Value {
    call(ident(name), args)
}

/// `object.method(args)`
pub fn call_method(object: Value, method: &str, args: Vec<Value>) -> Value {
    call(member(object, method), args)
}

pub fn new(callee: Value, args: Vec<Value>) -> Value {
    json!({"type": "NewExpression", "callee": callee, "arguments": args})
}

pub fn member(object: Value, property: &str) -> Value {
    json!({"type": "MemberExpression", "object": object, "property": ident(property), "computed": false})
}

pub fn index(object: Value, key: Value) -> Value {
    json!({"type": "MemberExpression", "object": object, "property": key, "computed": true})
}

/// `console.log(args)`
pub fn log(args: Vec<Value>) -> Value {
    expr(call_method(ident("console"), "log", args))
}

pub fn await_(argument: Value) -> Value {
    json!({"type": "AwaitExpression", "argument": argument})
}

// ═══════════════════════════════════════════════════════════════════════════
// Functions and classes
// ═══════════════════════════════════════════════════════════════════════════

fn params(names: &[&str]) -> Vec<Value> {
    names
        .iter()
        .map(|name| match name.strip_prefix("...") {
            Some(rest) => json!({"type": "RestElement", "argument": ident(rest)}),
            None => ident(name),
        })
        .collect()
}

fn function(kind: &str, name: Option<&str>, param_list: Vec<Value>, body: Vec<Value>, is_async: bool) -> Value {
    json!({
        "type": kind,
        "id": name.map(ident),
        "params": param_list,
        "body": block(body),
        "async": is_async,
        "generator": false,
        "expression": false
    })
}

/// `function name(params) { body }`; a `...rest` entry becomes a rest parameter
pub fn func_decl(name: &str, param_names: &[&str], body: Vec<Value>) -> Value {
    function("FunctionDeclaration", Some(name), params(param_names), body, false)
}

pub fn async_func_decl(name: &str, param_names: &[&str], body: Vec<Value>) -> Value {
    function("FunctionDeclaration", Some(name), params(param_names), body, true)
}

/// Declaration with explicit parameter nodes (patterns)
pub fn func_decl_with(name: &str, param_list: Vec<Value>, body: Vec<Value>) -> Value {
    function("FunctionDeclaration", Some(name), param_list, body, false)
}

pub fn func_expr(param_names: &[&str], body: Vec<Value>) -> Value {
    function("FunctionExpression", None, params(param_names), body, false)
}

pub fn async_func_expr(param_names: &[&str], body: Vec<Value>) -> Value {
    function("FunctionExpression", None, params(param_names), body, true)
}

/// `(params) => body` with an expression body
pub fn arrow(param_names: &[&str], body: Value) -> Value {
    json!({
        "type": "ArrowFunctionExpression",
        "id": null,
        "params": params(param_names),
        "body": body,
        "async": false,
        "generator": false,
        "expression": true
    })
}

/// `(params) => { body }`
pub fn arrow_block(param_names: &[&str], body: Vec<Value>) -> Value {
    function("ArrowFunctionExpression", None, params(param_names), body, false)
}

pub fn async_arrow_block(param_names: &[&str], body: Vec<Value>) -> Value {
    function("ArrowFunctionExpression", None, params(param_names), body, true)
}

/// `{ a, b }` parameter or binding pattern
pub fn object_pattern(names: &[&str]) -> Value {
    let properties: Vec<Value> = names
        .iter()
        .map(|name| {
            json!({
                "type": "Property", "key": ident(name), "value": ident(name),
                "kind": "init", "shorthand": true
            })
        })
        .collect();
    json!({"type": "ObjectPattern", "properties": properties})
}

pub fn method(name: &str, param_names: &[&str], body: Vec<Value>) -> Value {
    let kind = if name == "constructor" { "constructor" } else { "method" };
    json!({
        "type": "MethodDefinition",
        "key": ident(name),
        "value": function("FunctionExpression", None, params(param_names), body, false),
        "kind": kind,
        "static": false,
        "computed": false
    })
}

pub fn static_method(name: &str, param_names: &[&str], body: Vec<Value>) -> Value {
    let mut value = method(name, param_names, body);
    value["static"] = json!(true);
    value
}

pub fn class_decl(name: &str, super_class: Option<Value>, methods: Vec<Value>) -> Value {
    json!({
        "type": "ClassDeclaration",
        "id": ident(name),
        "superClass": super_class,
        "body": {"type": "ClassBody", "body": methods}
    })
}

pub fn super_call(args: Vec<Value>) -> Value {
    call(json!({"type": "Super"}), args)
}

pub fn super_method(name: &str, args: Vec<Value>) -> Value {
    call(member(json!({"type": "Super"}), name), args)
}

// ═══════════════════════════════════════════════════════════════════════════
// Statements
// ═══════════════════════════════════════════════════════════════════════════

pub fn expr(expression: Value) -> Value {
    json!({"type": "ExpressionStatement", "expression": expression})
}

fn declaration(kind: &str, name: &str, init: Option<Value>) -> Value {
    json!({
        "type": "VariableDeclaration",
        "kind": kind,
        "declarations": [{"type": "VariableDeclarator", "id": ident(name), "init": init}]
    })
}

pub fn let_(name: &str, init: Value) -> Value {
    declaration("let", name, Some(init))
}

pub fn let_uninit(name: &str) -> Value {
    declaration("let", name, None)
}

pub fn const_(name: &str, init: Value) -> Value {
    declaration("const", name, Some(init))
}

pub fn var(name: &str, init: Value) -> Value {
    declaration("var", name, Some(init))
}

/// `const { names } = init`
pub fn const_pattern(names: &[&str], init: Value) -> Value {
    json!({
        "type": "VariableDeclaration",
        "kind": "const",
        "declarations": [{"type": "VariableDeclarator", "id": object_pattern(names), "init": init}]
    })
}

pub fn block(body: Vec<Value>) -> Value {
    json!({"type": "BlockStatement", "body": body})
}

pub fn ret(argument: Value) -> Value {
    json!({"type": "ReturnStatement", "argument": argument})
}

pub fn if_(test: Value, consequent: Vec<Value>, alternate: Option<Vec<Value>>) -> Value {
    json!({
        "type": "IfStatement",
        "test": test,
        "consequent": block(consequent),
        "alternate": alternate.map(block)
    })
}

/// `for (let name = from; name < to; name++) { body }`
pub fn for_range(name: &str, from: f64, to: Value, body: Vec<Value>) -> Value {
    json!({
        "type": "ForStatement",
        "init": let_(name, num(from)),
        "test": bin("<", ident(name), to),
        "update": update("++", false, ident(name)),
        "body": block(body)
    })
}

pub fn for_of(kind: &str, name: &str, right: Value, body: Vec<Value>) -> Value {
    json!({
        "type": "ForOfStatement",
        "left": {
            "type": "VariableDeclaration",
            "kind": kind,
            "declarations": [{"type": "VariableDeclarator", "id": ident(name), "init": null}]
        },
        "right": right,
        "body": block(body),
        "await": false
    })
}

pub fn for_in(name: &str, right: Value, body: Vec<Value>) -> Value {
    json!({
        "type": "ForInStatement",
        "left": {
            "type": "VariableDeclaration",
            "kind": "const",
            "declarations": [{"type": "VariableDeclarator", "id": ident(name), "init": null}]
        },
        "right": right,
        "body": block(body)
    })
}

pub fn while_(test: Value, body: Vec<Value>) -> Value {
    json!({"type": "WhileStatement", "test": test, "body": block(body)})
}

pub fn do_while(body: Vec<Value>, test: Value) -> Value {
    json!({"type": "DoWhileStatement", "body": block(body), "test": test})
}

pub fn break_() -> Value {
    json!({"type": "BreakStatement", "label": null})
}

pub fn continue_() -> Value {
    json!({"type": "ContinueStatement", "label": null})
}

pub fn throw(argument: Value) -> Value {
    json!({"type": "ThrowStatement", "argument": argument})
}

pub fn try_catch(
    body: Vec<Value>,
    param: Option<&str>,
    handler: Vec<Value>,
    finalizer: Option<Vec<Value>>,
) -> Value {
    json!({
        "type": "TryStatement",
        "block": block(body),
        "handler": {"type": "CatchClause", "param": param.map(ident), "body": block(handler)},
        "finalizer": finalizer.map(block)
    })
}

pub fn try_finally(body: Vec<Value>, finalizer: Vec<Value>) -> Value {
    json!({
        "type": "TryStatement",
        "block": block(body),
        "handler": null,
        "finalizer": block(finalizer)
    })
}

pub fn switch(discriminant: Value, cases: Vec<(Option<Value>, Vec<Value>)>) -> Value {
    let cases: Vec<Value> = cases
        .into_iter()
        .map(|(test, consequent)| json!({"type": "SwitchCase", "test": test, "consequent": consequent}))
        .collect();
    json!({"type": "SwitchStatement", "discriminant": discriminant, "cases": cases})
}

pub fn debugger() -> Value {
    json!({"type": "DebuggerStatement"})
}
