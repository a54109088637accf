//! setTimeout/setInterval and their clear functions
//!
//! Timers live on the event loop's virtual clock; callbacks run as their own
//! tasks once the clock reaches the due time.

use crate::error::JsError;
use crate::interpreter::{Interpreter, Realm};
use crate::runtime::TimerId;
use crate::value::JsValue;

use super::{Globals, add_global, arg, not_a_function};

pub fn init_timers(realm: &mut Realm, globals: &mut Globals) {
    for (name, func, arity) in [
        ("setTimeout", set_timeout as crate::value::NativeFn, 2),
        ("setInterval", set_interval, 2),
        ("clearTimeout", clear_timer, 1),
        ("clearInterval", clear_timer, 1),
    ] {
        let function = realm.native_function(name, func, arity);
        add_global(globals, name, function);
    }
}

fn add_timer(interp: &mut Interpreter, args: &[JsValue], repeat: bool) -> Result<JsValue, JsError> {
    let callback = arg(args, 0);
    if !callback.is_callable() {
        return Err(not_a_function(&callback));
    }
    let delay = arg(args, 1).to_number();
    let delay = if delay.is_finite() && delay > 0.0 { delay as u64 } else { 0 };
    let extra = args.get(2..).unwrap_or_default().to_vec();
    let id = interp.event_loop.add_timer(callback, extra, delay, repeat);
    Ok(JsValue::Number(f64::from(id.0)))
}

pub fn set_timeout(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    add_timer(interp, args, false)
}

pub fn set_interval(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    add_timer(interp, args, true)
}

/// Unknown or already fired ids are ignored
pub fn clear_timer(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    if let JsValue::Number(n) = arg(args, 0) {
        if n.fract() == 0.0 && n >= 0.0 && n <= f64::from(u32::MAX) {
            interp.event_loop.clear_timer(TimerId(n as u32));
        }
    }
    Ok(JsValue::Undefined)
}
