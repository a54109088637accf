//! Unary and binary operator semantics

use crate::ast::{BinaryOperator, UnaryOperator};
use crate::error::JsError;
use crate::value::{CheapClone, JsFunction, JsString, JsValue};

use super::Interpreter;

impl Interpreter {
    pub(crate) fn binary_op(
        &self,
        op: BinaryOperator,
        left: &JsValue,
        right: &JsValue,
    ) -> Result<JsValue, JsError> {
        Ok(match op {
            BinaryOperator::Add => add(left, right),
            BinaryOperator::Sub => JsValue::Number(left.to_number() - right.to_number()),
            BinaryOperator::Mul => JsValue::Number(left.to_number() * right.to_number()),
            BinaryOperator::Div => JsValue::Number(left.to_number() / right.to_number()),
            BinaryOperator::Mod => JsValue::Number(left.to_number() % right.to_number()),
            BinaryOperator::Exp => JsValue::Number(power(left.to_number(), right.to_number())),
            BinaryOperator::Eq => JsValue::Boolean(left.loose_equals(right)),
            BinaryOperator::NotEq => JsValue::Boolean(!left.loose_equals(right)),
            BinaryOperator::StrictEq => JsValue::Boolean(left.strict_equals(right)),
            BinaryOperator::StrictNotEq => JsValue::Boolean(!left.strict_equals(right)),
            BinaryOperator::Lt => JsValue::Boolean(less_than(left, right)),
            BinaryOperator::Gt => JsValue::Boolean(less_than(right, left)),
            BinaryOperator::LtEq => JsValue::Boolean(less_or_equal(left, right)),
            BinaryOperator::GtEq => JsValue::Boolean(less_or_equal(right, left)),
            BinaryOperator::BitAnd => int32(to_int32(left) & to_int32(right)),
            BinaryOperator::BitOr => int32(to_int32(left) | to_int32(right)),
            BinaryOperator::BitXor => int32(to_int32(left) ^ to_int32(right)),
            BinaryOperator::LShift => int32(to_int32(left).wrapping_shl(shift_count(right))),
            BinaryOperator::RShift => int32(to_int32(left).wrapping_shr(shift_count(right))),
            BinaryOperator::URShift => {
                JsValue::Number(f64::from(to_uint32(left).wrapping_shr(shift_count(right))))
            }
            BinaryOperator::In => JsValue::Boolean(has_property(left, right)?),
            BinaryOperator::Instanceof => JsValue::Boolean(instance_of(left, right)?),
        })
    }

    pub(crate) fn unary_op(&self, op: UnaryOperator, operand: &JsValue) -> JsValue {
        match op {
            UnaryOperator::Minus => JsValue::Number(-operand.to_number()),
            UnaryOperator::Plus => JsValue::Number(operand.to_number()),
            UnaryOperator::Not => JsValue::Boolean(!operand.to_boolean()),
            UnaryOperator::BitNot => int32(!to_int32(operand)),
            UnaryOperator::Typeof => JsValue::from(operand.type_of()),
            UnaryOperator::Void => JsValue::Undefined,
            // Only member deletes reach the object; anything else is a no-op
            UnaryOperator::Delete => JsValue::Boolean(true),
        }
    }
}

fn add(left: &JsValue, right: &JsValue) -> JsValue {
    let stringy = |v: &JsValue| matches!(v, JsValue::String(_) | JsValue::Object(_));
    if stringy(left) || stringy(right) {
        JsValue::String(left.to_js_string() + &right.to_js_string())
    } else {
        JsValue::Number(left.to_number() + right.to_number())
    }
}

fn power(base: f64, exponent: f64) -> f64 {
    // `1 ** NaN` is NaN in JS, 1 in IEEE pow
    if exponent.is_nan() {
        f64::NAN
    } else {
        base.powf(exponent)
    }
}

fn less_than(left: &JsValue, right: &JsValue) -> bool {
    match (left, right) {
        (JsValue::String(a), JsValue::String(b)) => a < b,
        _ => left.to_number() < right.to_number(),
    }
}

fn less_or_equal(left: &JsValue, right: &JsValue) -> bool {
    match (left, right) {
        (JsValue::String(a), JsValue::String(b)) => a <= b,
        _ => left.to_number() <= right.to_number(),
    }
}

fn int32(n: i32) -> JsValue {
    JsValue::Number(f64::from(n))
}

/// ToInt32: modulo 2^32, reinterpreted as signed
pub(crate) fn to_int32(value: &JsValue) -> i32 {
    to_uint32(value) as i32
}

pub(crate) fn to_uint32(value: &JsValue) -> u32 {
    let n = value.to_number();
    if !n.is_finite() {
        return 0;
    }
    let modulo = n.trunc().rem_euclid(4_294_967_296.0);
    modulo as u32
}

fn shift_count(value: &JsValue) -> u32 {
    to_uint32(value) & 0x1f
}

fn has_property(key: &JsValue, target: &JsValue) -> Result<bool, JsError> {
    let JsValue::Object(obj) = target else {
        return Err(JsError::type_error(format!(
            "Cannot use 'in' operator to search for '{}' in {}",
            key.to_js_string(),
            target.display_string()
        )));
    };
    let key: JsString = key.to_js_string();
    Ok(obj.borrow().has_property(key.as_str()))
}

fn instance_of(value: &JsValue, target: &JsValue) -> Result<bool, JsError> {
    let JsValue::Object(ctor) = target else {
        return Err(JsError::type_error("Right-hand side of 'instanceof' is not callable"));
    };
    let bound_target = match ctor.borrow().as_function() {
        None => {
            return Err(JsError::type_error("Right-hand side of 'instanceof' is not callable"));
        }
        Some(JsFunction::Bound(bound)) => Some(bound.target.cheap_clone()),
        Some(_) => None,
    };
    if let Some(bound_target) = bound_target {
        return instance_of(value, &JsValue::Object(bound_target));
    }
    let JsValue::Object(obj) = value else {
        return Ok(false);
    };
    let Some(JsValue::Object(prototype)) = ctor.borrow().get_property("prototype") else {
        return Ok(false);
    };
    let mut current = obj.borrow().prototype.clone();
    while let Some(proto) = current {
        if std::rc::Rc::ptr_eq(&proto, &prototype) {
            return Ok(true);
        }
        current = proto.borrow().prototype.clone();
    }
    Ok(false)
}
