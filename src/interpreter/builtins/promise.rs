//! Promise constructor, Promise.prototype and the combinators
//!
//! `new Promise(executor)` is recognized by the call machinery so the
//! executor runs as a steppable call; the native constructor below only
//! handles calls without `new`.

use crate::error::JsError;
use crate::interpreter::{Interpreter, Realm};
use crate::runtime::promise::CombinatorKind;
use crate::value::{CheapClone, JsObjectRef, JsValue};

use super::object::this_object;
use super::{Globals, add_global, arg};

pub fn init_promise(realm: &mut Realm, globals: &mut Globals) {
    let proto = realm.promise_prototype.cheap_clone();
    realm.register_method(&proto, "then", promise_then, 2);
    realm.register_method(&proto, "catch", promise_catch, 1);
    realm.register_method(&proto, "finally", promise_finally, 1);

    let ctor = realm.constructor("Promise", promise_constructor, 1, &proto);
    realm.register_method(&ctor, "resolve", promise_resolve, 1);
    realm.register_method(&ctor, "reject", promise_reject, 1);
    realm.register_method(&ctor, "all", promise_all, 1);
    realm.register_method(&ctor, "allSettled", promise_all_settled, 1);
    realm.register_method(&ctor, "race", promise_race, 1);
    realm.promise_constructor = Some(ctor.cheap_clone());
    add_global(globals, "Promise", ctor);
}

pub fn promise_constructor(
    _interp: &mut Interpreter,
    _this: JsValue,
    _args: &[JsValue],
) -> Result<JsValue, JsError> {
    Err(JsError::type_error(
        "Promise constructor cannot be invoked without 'new'",
    ))
}

fn this_promise(this: &JsValue, method: &str) -> Result<JsObjectRef, JsError> {
    let obj = this_object(this, method)?;
    if crate::runtime::promise::promise_state(&obj).is_none() {
        return Err(JsError::type_error(format!(
            "Method Promise.prototype.{} called on incompatible receiver {}",
            method,
            this.display_string()
        )));
    }
    Ok(obj)
}

pub fn promise_then(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let promise = this_promise(&this, "then")?;
    let derived = interp.promise_then(&promise, arg(args, 0), arg(args, 1))?;
    Ok(JsValue::Object(derived))
}

pub fn promise_catch(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let promise = this_promise(&this, "catch")?;
    let derived = interp.promise_then(&promise, JsValue::Undefined, arg(args, 0))?;
    Ok(JsValue::Object(derived))
}

pub fn promise_finally(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let promise = this_promise(&this, "finally")?;
    let derived = interp.promise_finally(&promise, arg(args, 0))?;
    Ok(JsValue::Object(derived))
}

pub fn promise_resolve(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    Ok(JsValue::Object(interp.promise_resolve(arg(args, 0))))
}

pub fn promise_reject(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let promise = interp.create_promise();
    interp.reject_promise(&promise, arg(args, 0));
    Ok(JsValue::Object(promise))
}

fn combinator(
    interp: &mut Interpreter,
    kind: CombinatorKind,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let items = interp.iterate_values(&arg(args, 0))?;
    Ok(JsValue::Object(interp.promise_combinator(kind, items)))
}

pub fn promise_all(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    combinator(interp, CombinatorKind::All, args)
}

pub fn promise_all_settled(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    combinator(interp, CombinatorKind::AllSettled, args)
}

pub fn promise_race(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    combinator(interp, CombinatorKind::Race, args)
}
