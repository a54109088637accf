//! JSON namespace: parse via serde_json, stringify with JS formatting rules

use crate::error::JsError;
use crate::interpreter::{Interpreter, Realm};
use crate::value::{CheapClone, ExoticObject, JsObjectRef, JsValue, number_to_string};

use super::{Globals, add_global, arg};

pub fn init_json(realm: &mut Realm, globals: &mut Globals) {
    let json = realm.namespace_object();
    realm.register_method(&json, "parse", json_parse, 2);
    realm.register_method(&json, "stringify", json_stringify, 3);
    add_global(globals, "JSON", json);
}

pub fn json_parse(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let text = arg(args, 0).to_js_string();
    let parsed: serde_json::Value = serde_json::from_str(text.as_str()).map_err(|err| {
        JsError::syntax_error(
            format!("Unexpected token in JSON: {}", err),
            err.line() as u32,
            err.column() as u32,
        )
    })?;
    Ok(from_json(interp, &parsed))
}

/// Convert a parsed JSON document into interpreter values
pub fn from_json(interp: &Interpreter, value: &serde_json::Value) -> JsValue {
    match value {
        serde_json::Value::Null => JsValue::Null,
        serde_json::Value::Bool(b) => JsValue::Boolean(*b),
        serde_json::Value::Number(n) => JsValue::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => JsValue::from(s.as_str()),
        serde_json::Value::Array(items) => {
            interp.create_array(items.iter().map(|item| from_json(interp, item)).collect())
        }
        serde_json::Value::Object(map) => {
            let obj = interp.create_object();
            {
                let mut obj = obj.borrow_mut();
                for (key, item) in map {
                    obj.set_property(key.as_str(), from_json(interp, item));
                }
            }
            JsValue::Object(obj)
        }
    }
}

pub fn json_stringify(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let indent = match arg(args, 2) {
        JsValue::Number(n) => " ".repeat(n.clamp(0.0, 10.0) as usize),
        JsValue::String(s) => s.as_str().chars().take(10).collect(),
        _ => String::new(),
    };
    let mut writer = JsonWriter {
        interp,
        indent,
        stack: Vec::new(),
    };
    match writer.write(&arg(args, 0), "")? {
        Some(text) => Ok(JsValue::from(text)),
        None => Ok(JsValue::Undefined),
    }
}

struct JsonWriter<'a> {
    interp: &'a mut Interpreter,
    indent: String,
    /// Objects being serialized, for cycle detection
    stack: Vec<JsObjectRef>,
}

impl JsonWriter<'_> {
    /// Serialized form of `value`, `None` for values JSON skips
    fn write(&mut self, value: &JsValue, current: &str) -> Result<Option<String>, JsError> {
        let value = self.to_json_value(value)?;
        let obj = match &value {
            JsValue::Undefined => return Ok(None),
            JsValue::Null => return Ok(Some("null".to_string())),
            JsValue::Boolean(b) => return Ok(Some(b.to_string())),
            JsValue::Number(n) if n.is_finite() => return Ok(Some(number_to_string(*n))),
            JsValue::Number(_) => return Ok(Some("null".to_string())),
            JsValue::String(s) => return Ok(Some(quote(s.as_str()))),
            JsValue::Object(obj) => obj.cheap_clone(),
        };
        if obj.borrow().is_callable() {
            return Ok(None);
        }
        if self.stack.iter().any(|seen| std::rc::Rc::ptr_eq(seen, &obj)) {
            return Err(JsError::type_error("Converting circular structure to JSON"));
        }
        self.stack.push(obj.cheap_clone());
        let inner = format!("{}{}", current, self.indent);
        let items = match &obj.borrow().exotic {
            ExoticObject::Array(items) => Some(items.clone()),
            _ => None,
        };
        let result = match items {
            Some(items) => {
                let mut parts = Vec::with_capacity(items.len());
                for item in &items {
                    parts.push(self.write(item, &inner)?.unwrap_or_else(|| "null".to_string()));
                }
                self.wrap('[', parts, ']', current, &inner)
            }
            None => {
                let keys = obj.borrow().own_keys();
                let mut parts = Vec::with_capacity(keys.len());
                let separator = if self.indent.is_empty() { ":" } else { ": " };
                for key in keys {
                    let item = obj.borrow().get_property(key.as_str()).unwrap_or_default();
                    if let Some(text) = self.write(&item, &inner)? {
                        parts.push(format!("{}{}{}", quote(key.as_str()), separator, text));
                    }
                }
                self.wrap('{', parts, '}', current, &inner)
            }
        };
        self.stack.pop();
        Ok(Some(result))
    }

    /// Apply `toJSON` when the object has one
    fn to_json_value(&mut self, value: &JsValue) -> Result<JsValue, JsError> {
        let JsValue::Object(obj) = value else {
            return Ok(value.clone());
        };
        let to_json = obj.borrow().get_property("toJSON");
        match to_json {
            Some(method) if method.is_callable() => {
                self.interp.call_function(method, value.clone(), &[])
            }
            _ => Ok(value.clone()),
        }
    }

    fn wrap(&self, open: char, parts: Vec<String>, close: char, current: &str, inner: &str) -> String {
        if parts.is_empty() {
            return format!("{}{}", open, close);
        }
        if self.indent.is_empty() {
            return format!("{}{}{}", open, parts.join(","), close);
        }
        let body = parts.join(&format!(",\n{}", inner));
        format!("{}\n{}{}\n{}{}", open, inner, body, current, close)
    }
}

fn quote(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| format!("\"{}\"", s))
}
