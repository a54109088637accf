//! Error constructor and the derived error kinds

use crate::error::JsError;
use crate::interpreter::{Interpreter, Realm};
use crate::value::{CheapClone, JsObject, JsValue, NativeFn, Property};

use super::{Globals, add_global, arg};

/// Error kinds with their own constructor and prototype
const DERIVED_KINDS: [(&str, NativeFn); 5] = [
    ("TypeError", type_error_constructor),
    ("ReferenceError", reference_error_constructor),
    ("RangeError", range_error_constructor),
    ("SyntaxError", syntax_error_constructor),
    ("EvalError", eval_error_constructor),
];

pub fn init_error(realm: &mut Realm, globals: &mut Globals) {
    let error_proto = realm.error_prototype.cheap_clone();
    init_prototype(&error_proto, "Error");
    realm.register_method(&error_proto, "toString", error_to_string, 0);
    let error_fn = realm.constructor("Error", error_constructor, 1, &error_proto);
    realm.error_prototypes.insert("Error", error_proto.cheap_clone());
    add_global(globals, "Error", error_fn.cheap_clone());

    for (name, constructor) in DERIVED_KINDS {
        let proto = JsObject::with_prototype(Some(error_proto.cheap_clone())).into_ref();
        init_prototype(&proto, name);
        let ctor = realm.constructor(name, constructor, 1, &proto);
        // TypeError.__proto__ === Error
        ctor.borrow_mut().prototype = Some(error_fn.cheap_clone());
        realm.error_prototypes.insert(name, proto);
        add_global(globals, name, ctor);
    }
}

fn init_prototype(proto: &crate::value::JsObjectRef, name: &str) {
    let mut proto = proto.borrow_mut();
    proto.define_property("name", Property::hidden(JsValue::from(name)));
    proto.define_property("message", Property::hidden(JsValue::from("")));
}

/// `new Kind(message, { cause })`
fn construct_error(interp: &Interpreter, kind: &str, args: &[JsValue]) -> JsValue {
    let error = match arg(args, 0) {
        JsValue::Undefined => interp.create_error(kind, ""),
        message => interp.create_error(kind, message.to_js_string().as_str()),
    };
    if let (JsValue::Object(obj), JsValue::Object(options)) = (&error, arg(args, 1)) {
        let cause = options.borrow().get_own_property("cause");
        if let Some(cause) = cause {
            obj.borrow_mut()
                .define_property("cause", Property::hidden(cause));
        }
    }
    error
}

pub fn error_constructor(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    Ok(construct_error(interp, "Error", args))
}

pub fn type_error_constructor(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    Ok(construct_error(interp, "TypeError", args))
}

pub fn reference_error_constructor(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    Ok(construct_error(interp, "ReferenceError", args))
}

pub fn range_error_constructor(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    Ok(construct_error(interp, "RangeError", args))
}

pub fn syntax_error_constructor(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    Ok(construct_error(interp, "SyntaxError", args))
}

pub fn eval_error_constructor(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    Ok(construct_error(interp, "EvalError", args))
}

pub fn error_to_string(
    interp: &mut Interpreter,
    this: JsValue,
    _args: &[JsValue],
) -> Result<JsValue, JsError> {
    if !matches!(this, JsValue::Object(_)) {
        return Err(JsError::type_error(
            "Error.prototype.toString requires that 'this' be an Object",
        ));
    }
    let name = match interp.get_value_property(&this, "name")? {
        JsValue::Undefined => "Error".to_string(),
        other => other.to_js_string().to_string(),
    };
    let message = match interp.get_value_property(&this, "message")? {
        JsValue::Undefined => String::new(),
        other => other.to_js_string().to_string(),
    };
    let text = match (name.is_empty(), message.is_empty()) {
        (_, true) => name,
        (true, false) => message,
        (false, false) => format!("{}: {}", name, message),
    };
    Ok(JsValue::from(text))
}
