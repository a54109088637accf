//! console namespace, routed through the installed ConsoleProvider

use crate::error::JsError;
use crate::interpreter::{Interpreter, Realm};
use crate::platform::ConsoleLevel;
use crate::value::JsValue;

use super::{Globals, add_global};

pub fn init_console(realm: &mut Realm, globals: &mut Globals) {
    let console = realm.namespace_object();
    realm.register_method(&console, "log", console_log, 0);
    realm.register_method(&console, "info", console_info, 0);
    realm.register_method(&console, "debug", console_debug, 0);
    realm.register_method(&console, "warn", console_warn, 0);
    realm.register_method(&console, "error", console_error, 0);
    realm.register_method(&console, "clear", console_clear, 0);
    add_global(globals, "console", console);
}

/// Space-separated rendering of console arguments
pub fn format_args(args: &[JsValue]) -> String {
    args.iter()
        .map(JsValue::display_string)
        .collect::<Vec<_>>()
        .join(" ")
}

fn write(interp: &Interpreter, level: ConsoleLevel, args: &[JsValue]) -> Result<JsValue, JsError> {
    interp.console_write(level, &format_args(args));
    Ok(JsValue::Undefined)
}

pub fn console_log(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    write(interp, ConsoleLevel::Log, args)
}

pub fn console_info(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    write(interp, ConsoleLevel::Info, args)
}

pub fn console_debug(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    write(interp, ConsoleLevel::Debug, args)
}

pub fn console_warn(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    write(interp, ConsoleLevel::Warn, args)
}

pub fn console_error(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    write(interp, ConsoleLevel::Error, args)
}

pub fn console_clear(
    interp: &mut Interpreter,
    _this: JsValue,
    _args: &[JsValue],
) -> Result<JsValue, JsError> {
    interp.console.clear();
    Ok(JsValue::Undefined)
}
