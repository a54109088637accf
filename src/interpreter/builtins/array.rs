//! Array constructor and Array.prototype

use std::cmp::Ordering;

use crate::error::JsError;
use crate::interpreter::{Interpreter, Realm};
use crate::value::{
    CheapClone, ExoticObject, JsObjectRef, JsValue, MAX_ARRAY_LENGTH, array_length, dense_length,
};

use super::{Globals, add_global, arg, not_a_function, relative_index};

pub fn init_array(realm: &mut Realm, globals: &mut Globals) {
    let proto = realm.array_prototype.cheap_clone();

    // Mutators
    realm.register_method(&proto, "push", array_push, 1);
    realm.register_method(&proto, "pop", array_pop, 0);
    realm.register_method(&proto, "shift", array_shift, 0);
    realm.register_method(&proto, "unshift", array_unshift, 1);
    realm.register_method(&proto, "splice", array_splice, 2);
    realm.register_method(&proto, "reverse", array_reverse, 0);
    realm.register_method(&proto, "sort", array_sort, 1);
    realm.register_method(&proto, "fill", array_fill, 1);

    // Accessors
    realm.register_method(&proto, "slice", array_slice, 2);
    realm.register_method(&proto, "concat", array_concat, 1);
    realm.register_method(&proto, "join", array_join, 1);
    realm.register_method(&proto, "toString", array_to_string, 0);
    realm.register_method(&proto, "indexOf", array_index_of, 1);
    realm.register_method(&proto, "lastIndexOf", array_last_index_of, 1);
    realm.register_method(&proto, "includes", array_includes, 1);
    realm.register_method(&proto, "at", array_at, 1);
    realm.register_method(&proto, "flat", array_flat, 0);

    // Iteration
    realm.register_method(&proto, "forEach", array_for_each, 1);
    realm.register_method(&proto, "map", array_map, 1);
    realm.register_method(&proto, "filter", array_filter, 1);
    realm.register_method(&proto, "find", array_find, 1);
    realm.register_method(&proto, "findIndex", array_find_index, 1);
    realm.register_method(&proto, "some", array_some, 1);
    realm.register_method(&proto, "every", array_every, 1);
    realm.register_method(&proto, "reduce", array_reduce, 1);
    realm.register_method(&proto, "reduceRight", array_reduce_right, 1);
    realm.register_method(&proto, "flatMap", array_flat_map, 1);

    let ctor = realm.constructor("Array", array_constructor, 1, &proto);
    realm.register_method(&ctor, "isArray", array_is_array, 1);
    realm.register_method(&ctor, "from", array_from, 1);
    realm.register_method(&ctor, "of", array_of, 0);
    add_global(globals, "Array", ctor);
}

/// Snapshot of the elements of `this`
fn items_of(this: &JsValue, method: &str) -> Result<Vec<JsValue>, JsError> {
    with_items(this, method, |items| items.clone())
}

/// Run `f` on the element vector of `this`
fn with_items<R>(
    this: &JsValue,
    method: &str,
    f: impl FnOnce(&mut Vec<JsValue>) -> R,
) -> Result<R, JsError> {
    let obj = array_object(this, method)?;
    let mut obj = obj.borrow_mut();
    match &mut obj.exotic {
        ExoticObject::Array(items) => Ok(f(items)),
        _ => Err(JsError::type_error(format!(
            "Array.prototype.{} called on a non-array",
            method
        ))),
    }
}

fn array_object(this: &JsValue, method: &str) -> Result<JsObjectRef, JsError> {
    match this {
        JsValue::Object(obj) => Ok(obj.cheap_clone()),
        _ => Err(JsError::type_error(format!(
            "Array.prototype.{} called on {}",
            method,
            this.display_string()
        ))),
    }
}

fn callback_arg(args: &[JsValue]) -> Result<JsValue, JsError> {
    let callback = arg(args, 0);
    if callback.is_callable() {
        Ok(callback)
    } else {
        Err(not_a_function(&callback))
    }
}

/// Call `callback(item, index, array)` for each element until `visit`
/// returns `Some`
fn scan<R>(
    interp: &mut Interpreter,
    this: &JsValue,
    args: &[JsValue],
    method: &str,
    mut visit: impl FnMut(usize, &JsValue, JsValue) -> Option<R>,
) -> Result<Option<R>, JsError> {
    let callback = callback_arg(args)?;
    let this_arg = arg(args, 1);
    let items = items_of(this, method)?;
    for (index, item) in items.into_iter().enumerate() {
        let result = interp.call_function(
            callback.clone(),
            this_arg.clone(),
            &[item.clone(), JsValue::from(index as f64), this.clone()],
        )?;
        if let Some(found) = visit(index, &item, result) {
            return Ok(Some(found));
        }
    }
    Ok(None)
}

pub fn array_constructor(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    if let [len @ JsValue::Number(_)] = args {
        let len = array_length(len)?;
        return Ok(interp.create_array(vec![JsValue::Undefined; len]));
    }
    Ok(interp.create_array(args.to_vec()))
}

pub fn array_is_array(
    _interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let is_array = matches!(arg(args, 0), JsValue::Object(obj) if obj.borrow().is_array());
    Ok(JsValue::Boolean(is_array))
}

pub fn array_from(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let source = arg(args, 0);
    let items = match &source {
        JsValue::Object(obj)
            if matches!(obj.borrow().exotic, ExoticObject::Ordinary)
                && obj.borrow().get_property("length").is_some() =>
        {
            // Array-like `{ length: n }`
            let len = interp.get_value_property(&source, "length")?.to_number();
            let len = if len.is_nan() || len <= 0.0 {
                0
            } else if len > MAX_ARRAY_LENGTH as f64 {
                return Err(JsError::range_error("Invalid array length"));
            } else {
                dense_length(len as usize)?
            };
            let mut items = Vec::with_capacity(len);
            for index in 0..len {
                items.push(interp.get_value_property(&source, &index.to_string())?);
            }
            items
        }
        _ => interp.iterate_values(&source)?,
    };
    let mapper = arg(args, 1);
    if matches!(mapper, JsValue::Undefined) {
        return Ok(interp.create_array(items));
    }
    if !mapper.is_callable() {
        return Err(not_a_function(&mapper));
    }
    let mut mapped = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        mapped.push(interp.call_function(
            mapper.clone(),
            JsValue::Undefined,
            &[item, JsValue::from(index as f64)],
        )?);
    }
    Ok(interp.create_array(mapped))
}

pub fn array_of(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    Ok(interp.create_array(args.to_vec()))
}

// ═══════════════════════════════════════════════════════════════════════════
// Mutators
// ═══════════════════════════════════════════════════════════════════════════

pub fn array_push(
    _interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let len = with_items(&this, "push", |items| {
        items.extend_from_slice(args);
        items.len()
    })?;
    Ok(JsValue::Number(len as f64))
}

pub fn array_pop(
    _interp: &mut Interpreter,
    this: JsValue,
    _args: &[JsValue],
) -> Result<JsValue, JsError> {
    with_items(&this, "pop", |items| items.pop().unwrap_or_default())
}

pub fn array_shift(
    _interp: &mut Interpreter,
    this: JsValue,
    _args: &[JsValue],
) -> Result<JsValue, JsError> {
    with_items(&this, "shift", |items| {
        if items.is_empty() {
            JsValue::Undefined
        } else {
            items.remove(0)
        }
    })
}

pub fn array_unshift(
    _interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let len = with_items(&this, "unshift", |items| {
        items.splice(0..0, args.iter().cloned());
        items.len()
    })?;
    Ok(JsValue::Number(len as f64))
}

pub fn array_splice(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let removed = with_items(&this, "splice", |items| {
        let len = items.len();
        let start = relative_index(&arg(args, 0), len, 0);
        let count = match args.get(1) {
            None => len - start,
            Some(count) => {
                let count = count.to_number();
                let count = if count.is_nan() { 0.0 } else { count.trunc() };
                (count.max(0.0) as usize).min(len - start)
            }
        };
        let inserted = args.get(2..).unwrap_or_default().iter().cloned();
        items.splice(start..start + count, inserted).collect::<Vec<_>>()
    })?;
    Ok(interp.create_array(removed))
}

pub fn array_reverse(
    _interp: &mut Interpreter,
    this: JsValue,
    _args: &[JsValue],
) -> Result<JsValue, JsError> {
    with_items(&this, "reverse", |items| items.reverse())?;
    Ok(this)
}

pub fn array_fill(
    _interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let value = arg(args, 0);
    with_items(&this, "fill", |items| {
        let len = items.len();
        let start = relative_index(&arg(args, 1), len, 0);
        let end = relative_index(&arg(args, 2), len, len);
        for slot in items.iter_mut().take(end).skip(start) {
            *slot = value.clone();
        }
    })?;
    Ok(this)
}

pub fn array_sort(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let comparator = arg(args, 0);
    if !matches!(comparator, JsValue::Undefined) && !comparator.is_callable() {
        return Err(JsError::type_error(
            "The comparison function must be either a function or undefined",
        ));
    }
    let items = items_of(&this, "sort")?;
    // undefined always sorts last
    let (defined, undefined): (Vec<_>, Vec<_>) = items
        .into_iter()
        .partition(|item| !matches!(item, JsValue::Undefined));
    let mut sorted = merge_sort(defined, &mut |a, b| {
        if comparator.is_callable() {
            let order = interp
                .call_function(comparator.clone(), JsValue::Undefined, &[a.clone(), b.clone()])?
                .to_number();
            Ok(if order > 0.0 {
                Ordering::Greater
            } else if order < 0.0 {
                Ordering::Less
            } else {
                Ordering::Equal
            })
        } else {
            Ok(a.to_js_string().cmp(&b.to_js_string()))
        }
    })?;
    sorted.extend(undefined);
    with_items(&this, "sort", |items| *items = sorted)?;
    Ok(this)
}

/// Stable merge sort with a fallible comparator
fn merge_sort(
    items: Vec<JsValue>,
    compare: &mut dyn FnMut(&JsValue, &JsValue) -> Result<Ordering, JsError>,
) -> Result<Vec<JsValue>, JsError> {
    if items.len() <= 1 {
        return Ok(items);
    }
    let mut left = items;
    let right = left.split_off(left.len() / 2);
    let left = merge_sort(left, compare)?;
    let right = merge_sort(right, compare)?;
    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    loop {
        let take_right = match (left.peek(), right.peek()) {
            (Some(a), Some(b)) => compare(a, b)? == Ordering::Greater,
            _ => break,
        };
        let next = if take_right { right.next() } else { left.next() };
        merged.extend(next);
    }
    merged.extend(left);
    merged.extend(right);
    Ok(merged)
}

// ═══════════════════════════════════════════════════════════════════════════
// Accessors
// ═══════════════════════════════════════════════════════════════════════════

pub fn array_slice(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let items = items_of(&this, "slice")?;
    let start = relative_index(&arg(args, 0), items.len(), 0);
    let end = relative_index(&arg(args, 1), items.len(), items.len());
    let slice = items.get(start..end.max(start)).unwrap_or_default().to_vec();
    Ok(interp.create_array(slice))
}

pub fn array_concat(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let mut items = items_of(&this, "concat")?;
    for value in args {
        match value {
            JsValue::Object(obj) if obj.borrow().is_array() => items.extend(items_of(value, "concat")?),
            other => items.push(other.clone()),
        }
    }
    Ok(interp.create_array(items))
}

pub fn array_join(
    _interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let separator = match arg(args, 0) {
        JsValue::Undefined => ",".to_string(),
        other => other.to_js_string().to_string(),
    };
    let joined = items_of(&this, "join")?
        .iter()
        .map(|item| {
            if item.is_null_or_undefined() {
                String::new()
            } else {
                item.to_js_string().to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(&separator);
    Ok(JsValue::from(joined))
}

pub fn array_to_string(
    interp: &mut Interpreter,
    this: JsValue,
    _args: &[JsValue],
) -> Result<JsValue, JsError> {
    array_join(interp, this, &[])
}

pub fn array_index_of(
    _interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let target = arg(args, 0);
    let items = items_of(&this, "indexOf")?;
    let from = relative_index(&arg(args, 1), items.len(), 0);
    let found = items
        .iter()
        .enumerate()
        .skip(from)
        .find(|(_, item)| item.strict_equals(&target))
        .map(|(index, _)| index as f64);
    Ok(JsValue::Number(found.unwrap_or(-1.0)))
}

pub fn array_last_index_of(
    _interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let target = arg(args, 0);
    let found = items_of(&this, "lastIndexOf")?
        .iter()
        .rposition(|item| item.strict_equals(&target))
        .map(|index| index as f64);
    Ok(JsValue::Number(found.unwrap_or(-1.0)))
}

pub fn array_includes(
    _interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let target = arg(args, 0);
    let found = items_of(&this, "includes")?
        .iter()
        .any(|item| item.same_value_zero(&target));
    Ok(JsValue::Boolean(found))
}

pub fn array_at(
    _interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let items = items_of(&this, "at")?;
    let index = arg(args, 0).to_number();
    let index = if index.is_nan() { 0.0 } else { index.trunc() };
    let index = if index < 0.0 { items.len() as f64 + index } else { index };
    if index < 0.0 {
        return Ok(JsValue::Undefined);
    }
    Ok(items.get(index as usize).cloned().unwrap_or_default())
}

pub fn array_flat(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let depth = match arg(args, 0) {
        JsValue::Undefined => 1.0,
        other => other.to_number(),
    };
    let mut out = Vec::new();
    flatten_into(&items_of(&this, "flat")?, depth, &mut out)?;
    Ok(interp.create_array(out))
}

fn flatten_into(items: &[JsValue], depth: f64, out: &mut Vec<JsValue>) -> Result<(), JsError> {
    for item in items {
        match item {
            JsValue::Object(obj) if depth >= 1.0 && obj.borrow().is_array() => {
                flatten_into(&items_of(item, "flat")?, depth - 1.0, out)?
            }
            other => out.push(other.clone()),
        }
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════
// Iteration
// ═══════════════════════════════════════════════════════════════════════════

pub fn array_for_each(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    scan(interp, &this, args, "forEach", |_, _, _| None::<()>)?;
    Ok(JsValue::Undefined)
}

pub fn array_map(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let mut mapped = Vec::new();
    scan(interp, &this, args, "map", |_, _, result| {
        mapped.push(result);
        None::<()>
    })?;
    Ok(interp.create_array(mapped))
}

pub fn array_filter(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let mut kept = Vec::new();
    scan(interp, &this, args, "filter", |_, item, result| {
        if result.to_boolean() {
            kept.push(item.clone());
        }
        None::<()>
    })?;
    Ok(interp.create_array(kept))
}

pub fn array_find(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let found = scan(interp, &this, args, "find", |_, item, result| {
        result.to_boolean().then(|| item.clone())
    })?;
    Ok(found.unwrap_or_default())
}

pub fn array_find_index(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let found = scan(interp, &this, args, "findIndex", |index, _, result| {
        result.to_boolean().then_some(index as f64)
    })?;
    Ok(JsValue::Number(found.unwrap_or(-1.0)))
}

pub fn array_some(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let found = scan(interp, &this, args, "some", |_, _, result| {
        result.to_boolean().then_some(())
    })?;
    Ok(JsValue::Boolean(found.is_some()))
}

pub fn array_every(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let failed = scan(interp, &this, args, "every", |_, _, result| {
        (!result.to_boolean()).then_some(())
    })?;
    Ok(JsValue::Boolean(failed.is_none()))
}

pub fn array_flat_map(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let mut mapped = Vec::new();
    scan(interp, &this, args, "flatMap", |_, _, result| {
        mapped.push(result);
        None::<()>
    })?;
    let mut out = Vec::new();
    flatten_into(&mapped, 1.0, &mut out)?;
    Ok(interp.create_array(out))
}

pub fn array_reduce(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let items = items_of(&this, "reduce")?;
    reduce(interp, &this, args, items.into_iter().enumerate().collect())
}

pub fn array_reduce_right(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let items = items_of(&this, "reduceRight")?;
    reduce(interp, &this, args, items.into_iter().enumerate().rev().collect())
}

fn reduce(
    interp: &mut Interpreter,
    this: &JsValue,
    args: &[JsValue],
    items: Vec<(usize, JsValue)>,
) -> Result<JsValue, JsError> {
    let callback = callback_arg(args)?;
    let mut items = items.into_iter();
    let mut acc = match args.get(1) {
        Some(initial) => initial.clone(),
        None => match items.next() {
            Some((_, first)) => first,
            None => {
                return Err(JsError::type_error(
                    "Reduce of empty array with no initial value",
                ));
            }
        },
    };
    for (index, item) in items {
        acc = interp.call_function(
            callback.clone(),
            JsValue::Undefined,
            &[acc, item, JsValue::from(index as f64), this.clone()],
        )?;
    }
    Ok(acc)
}
