//! Global functions and value properties

use crate::error::JsError;
use crate::interpreter::{Interpreter, Realm};
use crate::value::{CheapClone, JsString, JsValue};

use super::{Globals, add_global, arg};

pub fn init_global(realm: &mut Realm, globals: &mut Globals) {
    for (name, func, arity) in [
        ("parseInt", global_parse_int as crate::value::NativeFn, 2),
        ("parseFloat", global_parse_float, 1),
        ("isNaN", global_is_nan, 1),
        ("isFinite", global_is_finite, 1),
    ] {
        let function = realm.native_function(name, func, arity);
        add_global(globals, name, function);
    }
    globals.push((JsString::from("undefined"), JsValue::Undefined));
    globals.push((JsString::from("NaN"), JsValue::Number(f64::NAN)));
    globals.push((JsString::from("Infinity"), JsValue::Number(f64::INFINITY)));
    add_global(globals, "globalThis", realm.global.cheap_clone());
}

pub fn global_parse_int(
    _interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let text = arg(args, 0).to_js_string();
    let radix = match arg(args, 1) {
        JsValue::Undefined => 0,
        other => super::super::operators::to_int32(&other),
    };
    Ok(JsValue::Number(parse_int(text.as_str(), radix)))
}

fn parse_int(text: &str, radix: i32) -> f64 {
    let text = text.trim_start();
    let (negative, text) = match text.as_bytes().first() {
        Some(b'-') => (true, text.get(1..).unwrap_or_default()),
        Some(b'+') => (false, text.get(1..).unwrap_or_default()),
        _ => (false, text),
    };
    let has_hex_prefix = text.starts_with("0x") || text.starts_with("0X");
    let (radix, text) = match radix {
        0 if has_hex_prefix => (16, text.get(2..).unwrap_or_default()),
        0 => (10, text),
        16 if has_hex_prefix => (16, text.get(2..).unwrap_or_default()),
        r if (2..=36).contains(&r) => (r as u32, text),
        _ => return f64::NAN,
    };
    let digits: Vec<u32> = text.chars().map_while(|c| c.to_digit(radix)).collect();
    if digits.is_empty() {
        return f64::NAN;
    }
    let value = digits
        .iter()
        .fold(0.0, |acc, d| acc * f64::from(radix) + f64::from(*d));
    if negative { -value } else { value }
}

pub fn global_parse_float(
    _interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let text = arg(args, 0).to_js_string();
    Ok(JsValue::Number(parse_float(text.as_str())))
}

/// Longest prefix that reads as a decimal literal
fn parse_float(text: &str) -> f64 {
    let text = text.trim_start();
    for (literal, value) in [
        ("Infinity", f64::INFINITY),
        ("+Infinity", f64::INFINITY),
        ("-Infinity", f64::NEG_INFINITY),
    ] {
        if text.starts_with(literal) {
            return value;
        }
    }
    let bytes = text.as_bytes();
    let mut end = 0;
    let mut best = None;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    let mut seen_dot = false;
    let mut seen_exp = false;
    while let Some(&b) = bytes.get(end) {
        match b {
            b'0'..=b'9' => {}
            b'.' if !seen_dot && !seen_exp => seen_dot = true,
            b'e' | b'E' if !seen_exp && best.is_some() => {
                seen_exp = true;
                if matches!(bytes.get(end + 1), Some(b'+' | b'-')) {
                    end += 1;
                }
            }
            _ => break,
        }
        end += 1;
        if let Some(value) = text.get(..end).and_then(|s| s.parse::<f64>().ok()) {
            best = Some(value);
        }
    }
    best.unwrap_or(f64::NAN)
}

pub fn global_is_nan(
    _interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    Ok(JsValue::Boolean(arg(args, 0).to_number().is_nan()))
}

pub fn global_is_finite(
    _interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    Ok(JsValue::Boolean(arg(args, 0).to_number().is_finite()))
}
