//! Map constructor and Map.prototype
//!
//! Entries keep insertion order; keys compare with SameValueZero.

use crate::error::JsError;
use crate::interpreter::{Interpreter, Realm};
use crate::value::{CheapClone, ExoticObject, JsObject, JsValue};

use super::{Globals, add_global, arg, not_a_function};

pub fn init_map(realm: &mut Realm, globals: &mut Globals) {
    let proto = realm.map_prototype.cheap_clone();
    realm.register_method(&proto, "get", map_get, 1);
    realm.register_method(&proto, "set", map_set, 2);
    realm.register_method(&proto, "has", map_has, 1);
    realm.register_method(&proto, "delete", map_delete, 1);
    realm.register_method(&proto, "clear", map_clear, 0);
    realm.register_method(&proto, "forEach", map_for_each, 1);
    realm.register_method(&proto, "keys", map_keys, 0);
    realm.register_method(&proto, "values", map_values, 0);
    realm.register_method(&proto, "entries", map_entries, 0);
    let ctor = realm.constructor("Map", map_constructor, 0, &proto);
    add_global(globals, "Map", ctor);
}

fn with_entries<R>(
    this: &JsValue,
    method: &str,
    f: impl FnOnce(&mut Vec<(JsValue, JsValue)>) -> R,
) -> Result<R, JsError> {
    if let JsValue::Object(obj) = this {
        if let ExoticObject::Map(entries) = &mut obj.borrow_mut().exotic {
            return Ok(f(entries));
        }
    }
    Err(JsError::type_error(format!(
        "Method Map.prototype.{} called on incompatible receiver {}",
        method,
        this.display_string()
    )))
}

pub fn map_constructor(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let mut entries: Vec<(JsValue, JsValue)> = Vec::new();
    let source = arg(args, 0);
    if !source.is_null_or_undefined() {
        for entry in interp.iterate_values(&source)? {
            if !matches!(entry, JsValue::Object(_)) {
                return Err(JsError::type_error(format!(
                    "Iterator value {} is not an entry object",
                    entry.display_string()
                )));
            }
            let key = interp.get_value_property(&entry, "0")?;
            let value = interp.get_value_property(&entry, "1")?;
            insert(&mut entries, key, value);
        }
    }
    let map = JsObject {
        prototype: Some(interp.realm.map_prototype.cheap_clone()),
        exotic: ExoticObject::Map(entries),
        ..JsObject::default()
    };
    Ok(JsValue::Object(map.into_ref()))
}

fn insert(entries: &mut Vec<(JsValue, JsValue)>, key: JsValue, value: JsValue) {
    // -0 keys are normalized to +0
    let key = match key {
        JsValue::Number(n) if n == 0.0 => JsValue::Number(0.0),
        other => other,
    };
    match entries.iter_mut().find(|(k, _)| k.same_value_zero(&key)) {
        Some(entry) => entry.1 = value,
        None => entries.push((key, value)),
    }
}

pub fn map_get(
    _interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let key = arg(args, 0);
    with_entries(&this, "get", |entries| {
        entries
            .iter()
            .find(|(k, _)| k.same_value_zero(&key))
            .map(|(_, v)| v.clone())
            .unwrap_or_default()
    })
}

pub fn map_set(
    _interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    with_entries(&this, "set", |entries| {
        insert(entries, arg(args, 0), arg(args, 1))
    })?;
    Ok(this)
}

pub fn map_has(
    _interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let key = arg(args, 0);
    let has = with_entries(&this, "has", |entries| {
        entries.iter().any(|(k, _)| k.same_value_zero(&key))
    })?;
    Ok(JsValue::Boolean(has))
}

pub fn map_delete(
    _interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let key = arg(args, 0);
    let removed = with_entries(&this, "delete", |entries| {
        let before = entries.len();
        entries.retain(|(k, _)| !k.same_value_zero(&key));
        entries.len() != before
    })?;
    Ok(JsValue::Boolean(removed))
}

pub fn map_clear(
    _interp: &mut Interpreter,
    this: JsValue,
    _args: &[JsValue],
) -> Result<JsValue, JsError> {
    with_entries(&this, "clear", Vec::clear)?;
    Ok(JsValue::Undefined)
}

pub fn map_for_each(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let callback = arg(args, 0);
    if !callback.is_callable() {
        return Err(not_a_function(&callback));
    }
    let entries = with_entries(&this, "forEach", |entries| entries.clone())?;
    for (key, value) in entries {
        interp.call_function(callback.clone(), arg(args, 1), &[value, key, this.clone()])?;
    }
    Ok(JsValue::Undefined)
}

pub fn map_keys(
    interp: &mut Interpreter,
    this: JsValue,
    _args: &[JsValue],
) -> Result<JsValue, JsError> {
    let keys = with_entries(&this, "keys", |entries| {
        entries.iter().map(|(k, _)| k.clone()).collect()
    })?;
    Ok(interp.create_array(keys))
}

pub fn map_values(
    interp: &mut Interpreter,
    this: JsValue,
    _args: &[JsValue],
) -> Result<JsValue, JsError> {
    let values = with_entries(&this, "values", |entries| {
        entries.iter().map(|(_, v)| v.clone()).collect()
    })?;
    Ok(interp.create_array(values))
}

pub fn map_entries(
    interp: &mut Interpreter,
    this: JsValue,
    _args: &[JsValue],
) -> Result<JsValue, JsError> {
    with_entries(&this, "entries", |_| ())?;
    let pairs = interp.iterate_values(&this)?;
    Ok(interp.create_array(pairs))
}
