//! Set constructor and Set.prototype

use crate::error::JsError;
use crate::interpreter::{Interpreter, Realm};
use crate::value::{CheapClone, ExoticObject, JsObject, JsValue};

use super::{Globals, add_global, arg, not_a_function};

pub fn init_set(realm: &mut Realm, globals: &mut Globals) {
    let proto = realm.set_prototype.cheap_clone();
    realm.register_method(&proto, "add", set_add, 1);
    realm.register_method(&proto, "has", set_has, 1);
    realm.register_method(&proto, "delete", set_delete, 1);
    realm.register_method(&proto, "clear", set_clear, 0);
    realm.register_method(&proto, "forEach", set_for_each, 1);
    realm.register_method(&proto, "values", set_values, 0);
    realm.register_method(&proto, "keys", set_values, 0);
    realm.register_method(&proto, "entries", set_entries, 0);
    let ctor = realm.constructor("Set", set_constructor, 0, &proto);
    add_global(globals, "Set", ctor);
}

fn with_items<R>(
    this: &JsValue,
    method: &str,
    f: impl FnOnce(&mut Vec<JsValue>) -> R,
) -> Result<R, JsError> {
    if let JsValue::Object(obj) = this {
        if let ExoticObject::Set(items) = &mut obj.borrow_mut().exotic {
            return Ok(f(items));
        }
    }
    Err(JsError::type_error(format!(
        "Method Set.prototype.{} called on incompatible receiver {}",
        method,
        this.display_string()
    )))
}

fn add(items: &mut Vec<JsValue>, value: JsValue) {
    let value = match value {
        JsValue::Number(n) if n == 0.0 => JsValue::Number(0.0),
        other => other,
    };
    if !items.iter().any(|item| item.same_value_zero(&value)) {
        items.push(value);
    }
}

pub fn set_constructor(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let mut items = Vec::new();
    let source = arg(args, 0);
    if !source.is_null_or_undefined() {
        for value in interp.iterate_values(&source)? {
            add(&mut items, value);
        }
    }
    let set = JsObject {
        prototype: Some(interp.realm.set_prototype.cheap_clone()),
        exotic: ExoticObject::Set(items),
        ..JsObject::default()
    };
    Ok(JsValue::Object(set.into_ref()))
}

pub fn set_add(
    _interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    with_items(&this, "add", |items| add(items, arg(args, 0)))?;
    Ok(this)
}

pub fn set_has(
    _interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let value = arg(args, 0);
    let has = with_items(&this, "has", |items| {
        items.iter().any(|item| item.same_value_zero(&value))
    })?;
    Ok(JsValue::Boolean(has))
}

pub fn set_delete(
    _interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let value = arg(args, 0);
    let removed = with_items(&this, "delete", |items| {
        let before = items.len();
        items.retain(|item| !item.same_value_zero(&value));
        items.len() != before
    })?;
    Ok(JsValue::Boolean(removed))
}

pub fn set_clear(
    _interp: &mut Interpreter,
    this: JsValue,
    _args: &[JsValue],
) -> Result<JsValue, JsError> {
    with_items(&this, "clear", Vec::clear)?;
    Ok(JsValue::Undefined)
}

pub fn set_for_each(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let callback = arg(args, 0);
    if !callback.is_callable() {
        return Err(not_a_function(&callback));
    }
    let items = with_items(&this, "forEach", |items| items.clone())?;
    for item in items {
        interp.call_function(
            callback.clone(),
            arg(args, 1),
            &[item.clone(), item, this.clone()],
        )?;
    }
    Ok(JsValue::Undefined)
}

pub fn set_values(
    interp: &mut Interpreter,
    this: JsValue,
    _args: &[JsValue],
) -> Result<JsValue, JsError> {
    let items = with_items(&this, "values", |items| items.clone())?;
    Ok(interp.create_array(items))
}

pub fn set_entries(
    interp: &mut Interpreter,
    this: JsValue,
    _args: &[JsValue],
) -> Result<JsValue, JsError> {
    let items = with_items(&this, "entries", |items| items.clone())?;
    let pairs = items
        .into_iter()
        .map(|item| interp.create_array(vec![item.clone(), item]))
        .collect();
    Ok(interp.create_array(pairs))
}
