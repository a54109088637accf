//! Object constructor and Object.prototype

use crate::error::JsError;
use crate::interpreter::{Interpreter, Realm};
use crate::value::{CheapClone, ExoticObject, JsObjectRef, JsString, JsValue, Property};

use super::{Globals, add_global, arg};

pub fn init_object(realm: &mut Realm, globals: &mut Globals) {
    let proto = realm.object_prototype.cheap_clone();
    realm.register_method(&proto, "hasOwnProperty", object_has_own_property, 1);
    realm.register_method(&proto, "toString", object_to_string, 0);
    realm.register_method(&proto, "valueOf", object_value_of, 0);

    let ctor = realm.constructor("Object", object_constructor, 1, &proto);
    realm.register_method(&ctor, "keys", object_keys, 1);
    realm.register_method(&ctor, "values", object_values, 1);
    realm.register_method(&ctor, "entries", object_entries, 1);
    realm.register_method(&ctor, "assign", object_assign, 2);
    realm.register_method(&ctor, "freeze", object_freeze, 1);
    realm.register_method(&ctor, "isFrozen", object_is_frozen, 1);
    realm.register_method(&ctor, "create", object_create, 2);
    realm.register_method(&ctor, "getPrototypeOf", object_get_prototype_of, 1);
    realm.register_method(&ctor, "fromEntries", object_from_entries, 1);
    realm.register_method(&ctor, "defineProperty", object_define_property, 3);
    add_global(globals, "Object", ctor);
}

pub fn object_constructor(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    match arg(args, 0) {
        value @ JsValue::Object(_) => Ok(value),
        _ => Ok(JsValue::Object(interp.create_object())),
    }
}

/// Own enumerable string keys of any value
pub(crate) fn own_keys(value: &JsValue) -> Result<Vec<JsString>, JsError> {
    match value {
        JsValue::Object(obj) => Ok(obj.borrow().own_keys()),
        JsValue::String(s) => Ok((0..s.as_str().chars().count())
            .map(|i| JsString::from(i.to_string()))
            .collect()),
        JsValue::Undefined | JsValue::Null => Err(JsError::type_error(
            "Cannot convert undefined or null to object",
        )),
        _ => Ok(Vec::new()),
    }
}

pub fn object_keys(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let keys = own_keys(&arg(args, 0))?;
    Ok(interp.create_array(keys.into_iter().map(JsValue::String).collect()))
}

pub fn object_values(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let target = arg(args, 0);
    let mut values = Vec::new();
    for key in own_keys(&target)? {
        values.push(interp.get_value_property(&target, key.as_str())?);
    }
    Ok(interp.create_array(values))
}

pub fn object_entries(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let target = arg(args, 0);
    let mut entries = Vec::new();
    for key in own_keys(&target)? {
        let value = interp.get_value_property(&target, key.as_str())?;
        entries.push(interp.create_array(vec![JsValue::String(key), value]));
    }
    Ok(interp.create_array(entries))
}

pub fn object_assign(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let target = arg(args, 0);
    if target.is_null_or_undefined() {
        return Err(JsError::type_error("Cannot convert undefined or null to object"));
    }
    for source in args.iter().skip(1).filter(|s| !s.is_null_or_undefined()) {
        for key in own_keys(source)? {
            let value = interp.get_value_property(source, key.as_str())?;
            interp.set_value_property(&target, key, value)?;
        }
    }
    Ok(target)
}

pub fn object_freeze(
    _interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let target = arg(args, 0);
    if let JsValue::Object(obj) = &target {
        for property in obj.borrow_mut().properties.values_mut() {
            property.writable = false;
        }
    }
    Ok(target)
}

pub fn object_is_frozen(
    _interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let frozen = match arg(args, 0) {
        JsValue::Object(obj) => {
            let obj = obj.borrow();
            !obj.properties.is_empty() && obj.properties.values().all(|p| !p.writable)
        }
        _ => true,
    };
    Ok(JsValue::Boolean(frozen))
}

pub fn object_create(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let prototype = match arg(args, 0) {
        JsValue::Object(proto) => Some(proto),
        JsValue::Null => None,
        other => {
            return Err(JsError::type_error(format!(
                "Object prototype may only be an Object or null: {}",
                other.display_string()
            )));
        }
    };
    let obj = interp.create_object();
    obj.borrow_mut().prototype = prototype;
    let value = JsValue::Object(obj);
    if let props @ JsValue::Object(_) = arg(args, 1) {
        define_properties(interp, &value, &props)?;
    }
    Ok(value)
}

pub fn object_get_prototype_of(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let prototype = match arg(args, 0) {
        JsValue::Object(obj) => obj.borrow().prototype.clone(),
        JsValue::String(_) => Some(interp.realm.string_prototype.cheap_clone()),
        JsValue::Number(_) => Some(interp.realm.number_prototype.cheap_clone()),
        JsValue::Boolean(_) => Some(interp.realm.boolean_prototype.cheap_clone()),
        JsValue::Undefined | JsValue::Null => {
            return Err(JsError::type_error("Cannot convert undefined or null to object"));
        }
    };
    Ok(prototype.map(JsValue::Object).unwrap_or(JsValue::Null))
}

pub fn object_from_entries(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let obj = interp.create_object();
    for entry in interp.iterate_values(&arg(args, 0))? {
        let key = interp.get_value_property(&entry, "0")?.to_js_string();
        let value = interp.get_value_property(&entry, "1")?;
        obj.borrow_mut().set_property(key, value);
    }
    Ok(JsValue::Object(obj))
}

pub fn object_define_property(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let target = arg(args, 0);
    let JsValue::Object(obj) = &target else {
        return Err(JsError::type_error("Object.defineProperty called on non-object"));
    };
    let key = arg(args, 1).to_js_string();
    let property = descriptor(interp, &arg(args, 2))?;
    obj.borrow_mut().define_property(key, property);
    Ok(target)
}

fn define_properties(interp: &mut Interpreter, target: &JsValue, props: &JsValue) -> Result<(), JsError> {
    let JsValue::Object(obj) = target else {
        return Ok(());
    };
    for key in own_keys(props)? {
        let desc = interp.get_value_property(props, key.as_str())?;
        let property = descriptor(interp, &desc)?;
        obj.borrow_mut().define_property(key, property);
    }
    Ok(())
}

/// Data descriptor; accessors are not modelled
fn descriptor(interp: &Interpreter, desc: &JsValue) -> Result<Property, JsError> {
    if !matches!(desc, JsValue::Object(_)) {
        return Err(JsError::type_error(format!(
            "Property description must be an object: {}",
            desc.display_string()
        )));
    }
    let flag = |name: &str| -> Result<bool, JsError> {
        Ok(interp.get_value_property(desc, name)?.to_boolean())
    };
    Ok(Property {
        value: interp.get_value_property(desc, "value")?,
        writable: flag("writable")?,
        enumerable: flag("enumerable")?,
    })
}

pub fn object_has_own_property(
    _interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let key = arg(args, 0).to_js_string();
    let has = match &this {
        JsValue::Object(obj) => obj.borrow().has_own_property(key.as_str()),
        JsValue::String(s) => crate::value::array_index(key.as_str())
            .is_some_and(|index| index < s.as_str().chars().count()),
        _ => false,
    };
    Ok(JsValue::Boolean(has))
}

pub fn object_to_string(
    _interp: &mut Interpreter,
    this: JsValue,
    _args: &[JsValue],
) -> Result<JsValue, JsError> {
    let tag = match &this {
        JsValue::Undefined => "Undefined",
        JsValue::Null => "Null",
        JsValue::Object(obj) => match &obj.borrow().exotic {
            ExoticObject::Array(_) => "Array",
            ExoticObject::Function(_) => "Function",
            ExoticObject::Error => "Error",
            _ => "Object",
        },
        JsValue::String(_) => "String",
        JsValue::Number(_) => "Number",
        JsValue::Boolean(_) => "Boolean",
    };
    Ok(JsValue::from(format!("[object {}]", tag)))
}

pub fn object_value_of(
    _interp: &mut Interpreter,
    this: JsValue,
    _args: &[JsValue],
) -> Result<JsValue, JsError> {
    Ok(this)
}

/// Target object of a `this`-based native, or a TypeError naming `method`
pub(crate) fn this_object(this: &JsValue, method: &str) -> Result<JsObjectRef, JsError> {
    match this {
        JsValue::Object(obj) => Ok(obj.cheap_clone()),
        other => Err(JsError::type_error(format!(
            "{} called on incompatible receiver {}",
            method,
            other.display_string()
        ))),
    }
}
