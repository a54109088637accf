//! Math namespace object

use crate::error::JsError;
use crate::interpreter::{Interpreter, Realm};
use crate::value::{JsValue, Property};

use super::{Globals, add_global};

/// Declare a one-argument Math method backed by an `f64` method
macro_rules! unary_math {
    ($($name:ident => $op:expr;)*) => {
        $(
            pub fn $name(
                _interp: &mut Interpreter,
                _this: JsValue,
                args: &[JsValue],
            ) -> Result<JsValue, JsError> {
                let op: fn(f64) -> f64 = $op;
                Ok(JsValue::Number(op(first_number(args))))
            }
        )*
    };
}

pub fn init_math(realm: &mut Realm, globals: &mut Globals) {
    let math = realm.namespace_object();
    {
        let mut math = math.borrow_mut();
        for (name, value) in [
            ("PI", std::f64::consts::PI),
            ("E", std::f64::consts::E),
            ("LN2", std::f64::consts::LN_2),
            ("LN10", std::f64::consts::LN_10),
            ("LOG2E", std::f64::consts::LOG2_E),
            ("LOG10E", std::f64::consts::LOG10_E),
            ("SQRT2", std::f64::consts::SQRT_2),
            ("SQRT1_2", std::f64::consts::FRAC_1_SQRT_2),
        ] {
            math.define_property(name, Property::readonly(JsValue::Number(value)));
        }
    }

    // Rounding methods
    realm.register_method(&math, "abs", math_abs, 1);
    realm.register_method(&math, "floor", math_floor, 1);
    realm.register_method(&math, "ceil", math_ceil, 1);
    realm.register_method(&math, "round", math_round, 1);
    realm.register_method(&math, "trunc", math_trunc, 1);
    realm.register_method(&math, "sign", math_sign, 1);

    // Min/max
    realm.register_method(&math, "min", math_min, 2);
    realm.register_method(&math, "max", math_max, 2);

    // Power, root and logarithm
    realm.register_method(&math, "pow", math_pow, 2);
    realm.register_method(&math, "sqrt", math_sqrt, 1);
    realm.register_method(&math, "cbrt", math_cbrt, 1);
    realm.register_method(&math, "hypot", math_hypot, 2);
    realm.register_method(&math, "log", math_log, 1);
    realm.register_method(&math, "log10", math_log10, 1);
    realm.register_method(&math, "log2", math_log2, 1);
    realm.register_method(&math, "exp", math_exp, 1);

    // Trigonometric
    realm.register_method(&math, "sin", math_sin, 1);
    realm.register_method(&math, "cos", math_cos, 1);
    realm.register_method(&math, "tan", math_tan, 1);
    realm.register_method(&math, "atan", math_atan, 1);
    realm.register_method(&math, "atan2", math_atan2, 2);

    // Random
    realm.register_method(&math, "random", math_random, 0);

    add_global(globals, "Math", math);
}

fn first_number(args: &[JsValue]) -> f64 {
    args.first().map(|v| v.to_number()).unwrap_or(f64::NAN)
}

unary_math! {
    math_abs => f64::abs;
    math_floor => f64::floor;
    math_ceil => f64::ceil;
    math_trunc => f64::trunc;
    math_sqrt => f64::sqrt;
    math_cbrt => f64::cbrt;
    math_log => f64::ln;
    math_log10 => f64::log10;
    math_log2 => f64::log2;
    math_exp => f64::exp;
    math_sin => f64::sin;
    math_cos => f64::cos;
    math_tan => f64::tan;
    math_atan => f64::atan;
}

/// Rounds half up, unlike `f64::round`
pub fn math_round(
    _interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let n = first_number(args);
    if !n.is_finite() || n.fract() == 0.0 {
        return Ok(JsValue::Number(n));
    }
    Ok(JsValue::Number((n + 0.5).floor()))
}

pub fn math_sign(
    _interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let n = first_number(args);
    let result = if n.is_nan() || n == 0.0 {
        n
    } else if n > 0.0 {
        1.0
    } else {
        -1.0
    };
    Ok(JsValue::Number(result))
}

pub fn math_min(
    _interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let mut min = f64::INFINITY;
    for n in args.iter().map(JsValue::to_number) {
        if n.is_nan() {
            return Ok(JsValue::Number(f64::NAN));
        }
        min = min.min(n);
    }
    Ok(JsValue::Number(min))
}

pub fn math_max(
    _interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let mut max = f64::NEG_INFINITY;
    for n in args.iter().map(JsValue::to_number) {
        if n.is_nan() {
            return Ok(JsValue::Number(f64::NAN));
        }
        max = max.max(n);
    }
    Ok(JsValue::Number(max))
}

pub fn math_pow(
    _interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let base = first_number(args);
    let exponent = args.get(1).map(|v| v.to_number()).unwrap_or(f64::NAN);
    if exponent.is_nan() {
        return Ok(JsValue::Number(f64::NAN));
    }
    Ok(JsValue::Number(base.powf(exponent)))
}

pub fn math_hypot(
    _interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let sum: f64 = args.iter().map(|v| v.to_number().powi(2)).sum();
    Ok(JsValue::Number(sum.sqrt()))
}

pub fn math_atan2(
    _interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let y = first_number(args);
    let x = args.get(1).map(|v| v.to_number()).unwrap_or(f64::NAN);
    Ok(JsValue::Number(y.atan2(x)))
}

pub fn math_random(
    interp: &mut Interpreter,
    _this: JsValue,
    _args: &[JsValue],
) -> Result<JsValue, JsError> {
    Ok(JsValue::Number(interp.random.random()))
}
