//! Built-in function implementations for the JavaScript standard library

pub mod array;
pub mod boolean;
pub mod console;
pub mod error;
pub mod function;
pub mod global;
pub mod json;
pub mod map;
pub mod math;
pub mod number;
pub mod object;
pub mod promise;
pub mod set;
pub mod string;
pub mod timers;

use crate::error::JsError;
use crate::value::{JsObjectRef, JsString, JsValue};

use super::Realm;

/// Global bindings collected while the builtins are installed
pub type Globals = Vec<(JsString, JsValue)>;

/// Populate the realm's prototypes and return the global bindings
pub fn install(realm: &mut Realm) -> Globals {
    let mut globals = Globals::new();
    object::init_object(realm, &mut globals);
    function::init_function(realm);
    array::init_array(realm, &mut globals);
    string::init_string(realm, &mut globals);
    number::init_number(realm, &mut globals);
    boolean::init_boolean(realm, &mut globals);
    error::init_error(realm, &mut globals);
    map::init_map(realm, &mut globals);
    set::init_set(realm, &mut globals);
    promise::init_promise(realm, &mut globals);
    math::init_math(realm, &mut globals);
    json::init_json(realm, &mut globals);
    console::init_console(realm, &mut globals);
    timers::init_timers(realm, &mut globals);
    global::init_global(realm, &mut globals);
    globals
}

/// Argument `index`, `undefined` when missing
pub(crate) fn arg(args: &[JsValue], index: usize) -> JsValue {
    args.get(index).cloned().unwrap_or_default()
}

/// Integer argument clamped into `0..=len`, counting negatives from the end
pub(crate) fn relative_index(value: &JsValue, len: usize, default: usize) -> usize {
    if matches!(value, JsValue::Undefined) {
        return default;
    }
    let n = value.to_number();
    let n = if n.is_nan() { 0.0 } else { n.trunc() };
    if n < 0.0 {
        (len as f64 + n).max(0.0) as usize
    } else {
        n.min(len as f64) as usize
    }
}

pub(crate) fn add_global(globals: &mut Globals, name: &str, value: JsObjectRef) {
    globals.push((JsString::from(name), JsValue::Object(value)));
}

pub(crate) fn not_a_function(value: &JsValue) -> JsError {
    JsError::type_error(format!("{} is not a function", value.display_string()))
}
