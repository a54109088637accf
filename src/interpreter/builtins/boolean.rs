//! Boolean constructor and Boolean.prototype

use crate::error::JsError;
use crate::interpreter::{Interpreter, Realm};
use crate::value::{CheapClone, JsValue};

use super::{Globals, add_global, arg};

pub fn init_boolean(realm: &mut Realm, globals: &mut Globals) {
    let proto = realm.boolean_prototype.cheap_clone();
    realm.register_method(&proto, "toString", boolean_to_string, 0);
    realm.register_method(&proto, "valueOf", boolean_value_of, 0);
    let ctor = realm.constructor("Boolean", boolean_constructor, 1, &proto);
    add_global(globals, "Boolean", ctor);
}

pub fn boolean_constructor(
    _interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    Ok(JsValue::Boolean(arg(args, 0).to_boolean()))
}

fn this_boolean(this: &JsValue, method: &str) -> Result<bool, JsError> {
    match this {
        JsValue::Boolean(b) => Ok(*b),
        _ => Err(JsError::type_error(format!(
            "Boolean.prototype.{} requires that 'this' be a Boolean",
            method
        ))),
    }
}

pub fn boolean_to_string(
    _interp: &mut Interpreter,
    this: JsValue,
    _args: &[JsValue],
) -> Result<JsValue, JsError> {
    let b = this_boolean(&this, "toString")?;
    Ok(JsValue::from(if b { "true" } else { "false" }))
}

pub fn boolean_value_of(
    _interp: &mut Interpreter,
    this: JsValue,
    _args: &[JsValue],
) -> Result<JsValue, JsError> {
    Ok(JsValue::Boolean(this_boolean(&this, "valueOf")?))
}
