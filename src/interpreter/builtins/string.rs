//! String constructor and String.prototype
//!
//! Indices count Unicode scalar values, matching how strings are indexed and
//! iterated elsewhere in the interpreter.

use crate::error::JsError;
use crate::interpreter::{Interpreter, Realm};
use crate::value::{CheapClone, JsString, JsValue, string_length};

use super::{Globals, add_global, arg, relative_index};

pub fn init_string(realm: &mut Realm, globals: &mut Globals) {
    let proto = realm.string_prototype.cheap_clone();

    // Access
    realm.register_method(&proto, "charAt", string_char_at, 1);
    realm.register_method(&proto, "charCodeAt", string_char_code_at, 1);
    realm.register_method(&proto, "at", string_at, 1);
    realm.register_method(&proto, "indexOf", string_index_of, 1);
    realm.register_method(&proto, "lastIndexOf", string_last_index_of, 1);
    realm.register_method(&proto, "includes", string_includes, 1);
    realm.register_method(&proto, "startsWith", string_starts_with, 1);
    realm.register_method(&proto, "endsWith", string_ends_with, 1);

    // Extraction
    realm.register_method(&proto, "slice", string_slice, 2);
    realm.register_method(&proto, "substring", string_substring, 2);
    realm.register_method(&proto, "split", string_split, 2);
    realm.register_method(&proto, "concat", string_concat, 1);

    // Transformation
    realm.register_method(&proto, "toUpperCase", string_to_upper_case, 0);
    realm.register_method(&proto, "toLowerCase", string_to_lower_case, 0);
    realm.register_method(&proto, "trim", string_trim, 0);
    realm.register_method(&proto, "trimStart", string_trim_start, 0);
    realm.register_method(&proto, "trimEnd", string_trim_end, 0);
    realm.register_method(&proto, "repeat", string_repeat, 1);
    realm.register_method(&proto, "padStart", string_pad_start, 2);
    realm.register_method(&proto, "padEnd", string_pad_end, 2);
    realm.register_method(&proto, "replace", string_replace, 2);
    realm.register_method(&proto, "replaceAll", string_replace_all, 2);
    realm.register_method(&proto, "toString", string_to_string, 0);
    realm.register_method(&proto, "valueOf", string_to_string, 0);

    let ctor = realm.constructor("String", string_constructor, 1, &proto);
    realm.register_method(&ctor, "fromCharCode", string_from_char_code, 1);
    add_global(globals, "String", ctor);
}

fn this_string(this: &JsValue, method: &str) -> Result<JsString, JsError> {
    if this.is_null_or_undefined() {
        return Err(JsError::type_error(format!(
            "String.prototype.{} called on null or undefined",
            method
        )));
    }
    Ok(this.to_js_string())
}

fn chars(s: &JsString) -> Vec<char> {
    s.as_str().chars().collect()
}

fn from_chars(chars: &[char]) -> JsValue {
    JsValue::from(chars.iter().collect::<String>())
}

/// Char index of the first occurrence of `needle` at or after `from`
fn find_from(haystack: &[char], needle: &[char], from: usize) -> Option<usize> {
    if needle.is_empty() {
        return Some(from.min(haystack.len()));
    }
    (from..haystack.len())
        .find(|&start| haystack.get(start..start + needle.len()) == Some(needle))
}

pub fn string_constructor(
    _interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    match args.first() {
        None => Ok(JsValue::from("")),
        Some(value) => Ok(JsValue::String(value.to_js_string())),
    }
}

pub fn string_from_char_code(
    _interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let units: Vec<u16> = args
        .iter()
        .map(|v| super::super::operators::to_uint32(v) as u16)
        .collect();
    Ok(JsValue::from(String::from_utf16_lossy(&units)))
}

pub fn string_char_at(
    _interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let s = this_string(&this, "charAt")?;
    let index = arg(args, 0).to_number();
    let index = if index.is_nan() { 0.0 } else { index.trunc() };
    if index < 0.0 {
        return Ok(JsValue::from(""));
    }
    let c = s.as_str().chars().nth(index as usize);
    Ok(JsValue::from(c.map(String::from).unwrap_or_default()))
}

pub fn string_char_code_at(
    _interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let s = this_string(&this, "charCodeAt")?;
    let index = arg(args, 0).to_number();
    let index = if index.is_nan() { 0.0 } else { index.trunc() };
    if index < 0.0 {
        return Ok(JsValue::Number(f64::NAN));
    }
    let code = s
        .as_str()
        .chars()
        .nth(index as usize)
        .map(|c| f64::from(u32::from(c)));
    Ok(JsValue::Number(code.unwrap_or(f64::NAN)))
}

pub fn string_at(
    _interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let chars = chars(&this_string(&this, "at")?);
    let index = arg(args, 0).to_number();
    let index = if index.is_nan() { 0.0 } else { index.trunc() };
    let index = if index < 0.0 { chars.len() as f64 + index } else { index };
    if index < 0.0 {
        return Ok(JsValue::Undefined);
    }
    Ok(chars
        .get(index as usize)
        .map(|c| JsValue::from(c.to_string()))
        .unwrap_or_default())
}

pub fn string_index_of(
    _interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let haystack = chars(&this_string(&this, "indexOf")?);
    let needle = chars(&arg(args, 0).to_js_string());
    let from = relative_index(&arg(args, 1), haystack.len(), 0);
    let found = find_from(&haystack, &needle, from).map(|i| i as f64);
    Ok(JsValue::Number(found.unwrap_or(-1.0)))
}

pub fn string_last_index_of(
    _interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let haystack = chars(&this_string(&this, "lastIndexOf")?);
    let needle = chars(&arg(args, 0).to_js_string());
    let found = (0..=haystack.len().saturating_sub(needle.len()))
        .rev()
        .find(|&start| haystack.get(start..start + needle.len()) == Some(&needle[..]))
        .map(|i| i as f64);
    Ok(JsValue::Number(found.unwrap_or(-1.0)))
}

pub fn string_includes(
    _interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let s = this_string(&this, "includes")?;
    let needle = arg(args, 0).to_js_string();
    Ok(JsValue::Boolean(s.as_str().contains(needle.as_str())))
}

pub fn string_starts_with(
    _interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let chars = chars(&this_string(&this, "startsWith")?);
    let prefix = arg(args, 0).to_js_string();
    let from = relative_index(&arg(args, 1), chars.len(), 0);
    let rest: String = chars.get(from..).unwrap_or_default().iter().collect();
    Ok(JsValue::Boolean(rest.starts_with(prefix.as_str())))
}

pub fn string_ends_with(
    _interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let chars = chars(&this_string(&this, "endsWith")?);
    let suffix = arg(args, 0).to_js_string();
    let end = relative_index(&arg(args, 1), chars.len(), chars.len());
    let head: String = chars.get(..end).unwrap_or_default().iter().collect();
    Ok(JsValue::Boolean(head.ends_with(suffix.as_str())))
}

pub fn string_slice(
    _interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let chars = chars(&this_string(&this, "slice")?);
    let start = relative_index(&arg(args, 0), chars.len(), 0);
    let end = relative_index(&arg(args, 1), chars.len(), chars.len());
    Ok(from_chars(chars.get(start..end.max(start)).unwrap_or_default()))
}

pub fn string_substring(
    _interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let chars = chars(&this_string(&this, "substring")?);
    // Negative and NaN bounds clamp to zero, then the bounds are ordered
    let clamp = |value: JsValue, default: usize| match value {
        JsValue::Undefined => default,
        value => {
            let n = value.to_number();
            if n.is_nan() || n < 0.0 {
                0
            } else {
                (n.trunc() as usize).min(chars.len())
            }
        }
    };
    let a = clamp(arg(args, 0), 0);
    let b = clamp(arg(args, 1), chars.len());
    let (start, end) = if a <= b { (a, b) } else { (b, a) };
    Ok(from_chars(chars.get(start..end).unwrap_or_default()))
}

pub fn string_split(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let s = this_string(&this, "split")?;
    let limit = match arg(args, 1) {
        JsValue::Undefined => usize::MAX,
        other => super::super::operators::to_uint32(&other) as usize,
    };
    let parts: Vec<JsValue> = match arg(args, 0) {
        JsValue::Undefined => vec![JsValue::String(s)],
        separator => {
            let separator = separator.to_js_string();
            if separator.is_empty() {
                s.as_str().chars().map(|c| JsValue::from(c.to_string())).collect()
            } else {
                s.as_str()
                    .split(separator.as_str())
                    .map(JsValue::from)
                    .collect()
            }
        }
    };
    Ok(interp.create_array(parts.into_iter().take(limit).collect()))
}

pub fn string_concat(
    _interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let mut s = this_string(&this, "concat")?;
    for value in args {
        s = s + &value.to_js_string();
    }
    Ok(JsValue::String(s))
}

pub fn string_to_upper_case(
    _interp: &mut Interpreter,
    this: JsValue,
    _args: &[JsValue],
) -> Result<JsValue, JsError> {
    Ok(JsValue::from(this_string(&this, "toUpperCase")?.as_str().to_uppercase()))
}

pub fn string_to_lower_case(
    _interp: &mut Interpreter,
    this: JsValue,
    _args: &[JsValue],
) -> Result<JsValue, JsError> {
    Ok(JsValue::from(this_string(&this, "toLowerCase")?.as_str().to_lowercase()))
}

pub fn string_trim(
    _interp: &mut Interpreter,
    this: JsValue,
    _args: &[JsValue],
) -> Result<JsValue, JsError> {
    Ok(JsValue::from(this_string(&this, "trim")?.as_str().trim()))
}

pub fn string_trim_start(
    _interp: &mut Interpreter,
    this: JsValue,
    _args: &[JsValue],
) -> Result<JsValue, JsError> {
    Ok(JsValue::from(this_string(&this, "trimStart")?.as_str().trim_start()))
}

pub fn string_trim_end(
    _interp: &mut Interpreter,
    this: JsValue,
    _args: &[JsValue],
) -> Result<JsValue, JsError> {
    Ok(JsValue::from(this_string(&this, "trimEnd")?.as_str().trim_end()))
}

pub fn string_repeat(
    _interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let s = this_string(&this, "repeat")?;
    let count = arg(args, 0).to_number();
    let count = if count.is_nan() { 0.0 } else { count.trunc() };
    if count < 0.0 || count.is_infinite() {
        return Err(JsError::range_error(format!(
            "Invalid count value: {}",
            crate::value::number_to_string(count)
        )));
    }
    string_length(count * s.as_str().chars().count() as f64)?;
    Ok(JsValue::from(s.as_str().repeat(count as usize)))
}

fn pad(this: &JsValue, args: &[JsValue], method: &str, at_start: bool) -> Result<JsValue, JsError> {
    let s = this_string(this, method)?;
    let target = arg(args, 0).to_number();
    let filler: Vec<char> = match arg(args, 1) {
        JsValue::Undefined => vec![' '],
        other => chars(&other.to_js_string()),
    };
    let len = s.as_str().chars().count();
    if target.is_nan() || target <= len as f64 || filler.is_empty() {
        return Ok(JsValue::String(s));
    }
    let target = string_length(target.trunc())?;
    let padding: String = filler.iter().cycle().take(target - len).collect();
    let padded = if at_start {
        padding + s.as_str()
    } else {
        format!("{}{}", s, padding)
    };
    Ok(JsValue::from(padded))
}

pub fn string_pad_start(
    _interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    pad(&this, args, "padStart", true)
}

pub fn string_pad_end(
    _interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    pad(&this, args, "padEnd", false)
}

/// Shared body of `replace`/`replaceAll` for string patterns
fn replace(
    interp: &mut Interpreter,
    this: &JsValue,
    args: &[JsValue],
    method: &str,
    all: bool,
) -> Result<JsValue, JsError> {
    let s = this_string(this, method)?;
    let pattern = arg(args, 0).to_js_string();
    let replacement = arg(args, 1);
    let source = s.as_str();
    let mut out = String::with_capacity(source.len());
    let mut last = 0;
    let mut search_from = 0;
    while let Some(offset) = source.get(search_from..).and_then(|rest| rest.find(pattern.as_str())) {
        let at = search_from + offset;
        out.push_str(source.get(last..at).unwrap_or_default());
        let matched = if replacement.is_callable() {
            let position = source.get(..at).unwrap_or_default().chars().count();
            interp
                .call_function(
                    replacement.clone(),
                    JsValue::Undefined,
                    &[
                        JsValue::String(pattern.cheap_clone()),
                        JsValue::from(position as f64),
                        JsValue::String(s.cheap_clone()),
                    ],
                )?
                .to_js_string()
        } else {
            replacement.to_js_string()
        };
        out.push_str(matched.as_str());
        last = at + pattern.len();
        if !all {
            break;
        }
        // An empty pattern matches between every character
        search_from = if pattern.is_empty() {
            match source.get(at..).and_then(|rest| rest.chars().next()) {
                Some(c) => {
                    out.push(c);
                    last = at + c.len_utf8();
                    at + c.len_utf8()
                }
                None => break,
            }
        } else {
            last
        };
    }
    out.push_str(source.get(last..).unwrap_or_default());
    Ok(JsValue::from(out))
}

pub fn string_replace(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    replace(interp, &this, args, "replace", false)
}

pub fn string_replace_all(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    replace(interp, &this, args, "replaceAll", true)
}

pub fn string_to_string(
    _interp: &mut Interpreter,
    this: JsValue,
    _args: &[JsValue],
) -> Result<JsValue, JsError> {
    Ok(JsValue::String(this_string(&this, "toString")?))
}
