//! Function.prototype methods

use crate::error::JsError;
use crate::interpreter::{Interpreter, Realm};
use crate::value::{
    BoundFunctionData, CheapClone, ExoticObject, JsFunction, JsObject, JsString, JsValue, Property,
    function_name,
};

use super::{arg, not_a_function};

pub fn init_function(realm: &mut Realm) {
    let proto = realm.function_prototype.cheap_clone();
    realm.register_method(&proto, "call", function_call, 1);
    realm.register_method(&proto, "apply", function_apply, 2);
    realm.register_method(&proto, "bind", function_bind, 1);
    realm.register_method(&proto, "toString", function_to_string, 0);
}

/// `fn.call(this, ...args)`; the callee runs to completion
pub fn function_call(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    if !this.is_callable() {
        return Err(not_a_function(&this));
    }
    let rest = args.get(1..).unwrap_or_default();
    interp.call_function(this, arg(args, 0), rest)
}

pub fn function_apply(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    if !this.is_callable() {
        return Err(not_a_function(&this));
    }
    let list = match arg(args, 1) {
        JsValue::Undefined | JsValue::Null => Vec::new(),
        JsValue::Object(obj) if obj.borrow().is_array() => interp.iterate_values(&JsValue::Object(obj))?,
        _ => {
            return Err(JsError::type_error(
                "CreateListFromArrayLike called on non-object",
            ));
        }
    };
    interp.call_function(this, arg(args, 0), &list)
}

pub fn function_bind(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let JsValue::Object(target) = &this else {
        return Err(JsError::type_error("Bind must be called on a function"));
    };
    if !target.borrow().is_callable() {
        return Err(JsError::type_error("Bind must be called on a function"));
    }
    let name = function_name(&target.borrow())
        .map(|name| JsString::from("bound ") + &name)
        .unwrap_or_else(|| JsString::from("bound "));
    let mut bound = JsObject::with_prototype(Some(interp.realm.function_prototype.cheap_clone()));
    bound.define_property("name", Property::readonly(JsValue::String(name)));
    bound.exotic = ExoticObject::Function(JsFunction::Bound(Box::new(BoundFunctionData {
        target: target.cheap_clone(),
        this_arg: arg(args, 0),
        bound_args: args.get(1..).unwrap_or_default().to_vec(),
    })));
    Ok(JsValue::Object(bound.into_ref()))
}

pub fn function_to_string(
    _interp: &mut Interpreter,
    this: JsValue,
    _args: &[JsValue],
) -> Result<JsValue, JsError> {
    if !this.is_callable() {
        return Err(JsError::type_error(
            "Function.prototype.toString requires that 'this' be a Function",
        ));
    }
    Ok(JsValue::String(this.to_js_string()))
}
