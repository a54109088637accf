//! Number constructor and Number.prototype

use crate::error::JsError;
use crate::interpreter::{Interpreter, Realm};
use crate::value::{CheapClone, JsValue, Property, number_to_string};

use super::global::{global_parse_float, global_parse_int};
use super::{Globals, add_global, arg};

pub fn init_number(realm: &mut Realm, globals: &mut Globals) {
    let proto = realm.number_prototype.cheap_clone();
    realm.register_method(&proto, "toFixed", number_to_fixed, 1);
    realm.register_method(&proto, "toString", number_to_string_method, 1);
    realm.register_method(&proto, "valueOf", number_value_of, 0);

    let ctor = realm.constructor("Number", number_constructor, 1, &proto);
    realm.register_method(&ctor, "isInteger", number_is_integer, 1);
    realm.register_method(&ctor, "isSafeInteger", number_is_safe_integer, 1);
    realm.register_method(&ctor, "isFinite", number_is_finite, 1);
    realm.register_method(&ctor, "isNaN", number_is_nan, 1);
    realm.register_method(&ctor, "parseFloat", global_parse_float, 1);
    realm.register_method(&ctor, "parseInt", global_parse_int, 2);
    {
        let mut ctor = ctor.borrow_mut();
        for (name, value) in [
            ("MAX_SAFE_INTEGER", 9_007_199_254_740_991.0),
            ("MIN_SAFE_INTEGER", -9_007_199_254_740_991.0),
            ("EPSILON", f64::EPSILON),
            ("MAX_VALUE", f64::MAX),
            ("MIN_VALUE", 5e-324),
            ("POSITIVE_INFINITY", f64::INFINITY),
            ("NEGATIVE_INFINITY", f64::NEG_INFINITY),
            ("NaN", f64::NAN),
        ] {
            ctor.define_property(name, Property::readonly(JsValue::Number(value)));
        }
    }
    add_global(globals, "Number", ctor);
}

fn this_number(this: &JsValue, method: &str) -> Result<f64, JsError> {
    match this {
        JsValue::Number(n) => Ok(*n),
        other => Err(JsError::type_error(format!(
            "Number.prototype.{} requires that 'this' be a Number, got {}",
            method,
            other.display_string()
        ))),
    }
}

pub fn number_constructor(
    _interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    Ok(JsValue::Number(args.first().map(|v| v.to_number()).unwrap_or(0.0)))
}

pub fn number_is_integer(
    _interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let is_integer = matches!(arg(args, 0), JsValue::Number(n) if n.is_finite() && n.trunc() == n);
    Ok(JsValue::Boolean(is_integer))
}

pub fn number_is_safe_integer(
    _interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let safe = matches!(
        arg(args, 0),
        JsValue::Number(n) if n.is_finite() && n.trunc() == n && n.abs() <= 9_007_199_254_740_991.0
    );
    Ok(JsValue::Boolean(safe))
}

pub fn number_is_finite(
    _interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    Ok(JsValue::Boolean(matches!(arg(args, 0), JsValue::Number(n) if n.is_finite())))
}

pub fn number_is_nan(
    _interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    Ok(JsValue::Boolean(matches!(arg(args, 0), JsValue::Number(n) if n.is_nan())))
}

pub fn number_to_fixed(
    _interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let n = this_number(&this, "toFixed")?;
    let digits = arg(args, 0).to_number();
    let digits = if digits.is_nan() { 0.0 } else { digits.trunc() };
    if !(0.0..=100.0).contains(&digits) {
        return Err(JsError::range_error(
            "toFixed() digits argument must be between 0 and 100",
        ));
    }
    if !n.is_finite() || n.abs() >= 1e21 {
        return Ok(JsValue::from(number_to_string(n)));
    }
    Ok(JsValue::from(format!("{:.*}", digits as usize, n)))
}

pub fn number_to_string_method(
    _interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let n = this_number(&this, "toString")?;
    let radix = match arg(args, 0) {
        JsValue::Undefined => 10.0,
        other => other.to_number().trunc(),
    };
    if !(2.0..=36.0).contains(&radix) {
        return Err(JsError::range_error(
            "toString() radix must be between 2 and 36",
        ));
    }
    if radix == 10.0 || !n.is_finite() || n.trunc() != n {
        return Ok(JsValue::from(number_to_string(n)));
    }
    Ok(JsValue::from(integer_to_radix(n, radix as u32)))
}

fn integer_to_radix(n: f64, radix: u32) -> String {
    let mut magnitude = n.abs();
    let mut digits = Vec::new();
    while magnitude >= 1.0 {
        let digit = (magnitude % f64::from(radix)) as u32;
        digits.extend(char::from_digit(digit, radix));
        magnitude = (magnitude / f64::from(radix)).trunc();
    }
    if digits.is_empty() {
        digits.push('0');
    }
    if n < 0.0 {
        digits.push('-');
    }
    digits.iter().rev().collect()
}

pub fn number_value_of(
    _interp: &mut Interpreter,
    this: JsValue,
    _args: &[JsValue],
) -> Result<JsValue, JsError> {
    Ok(JsValue::Number(this_number(&this, "valueOf")?))
}
