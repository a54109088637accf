//! JavaScript value representation
//!
//! The core JsValue type and related structures for representing JavaScript values at runtime.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use serde::{Deserialize, Deserializer};

use crate::error::JsError;
use crate::interpreter::Interpreter;
use crate::interpreter::function::{ClassConstructor, MetaFunction};
use crate::runtime::promise::PromiseReaction;

/// Trait for types that have cheap (O(1), reference-counted) clones.
///
/// Makes it explicit at the call site that a clone only bumps a reference
/// count. Regular `.clone()` still works.
pub trait CheapClone: Clone {
    fn cheap_clone(&self) -> Self {
        self.clone()
    }
}

// Rc<RefCell<T>> is covered by this
impl<T: ?Sized> CheapClone for Rc<T> {}

/// A JavaScript value
#[derive(Clone, Default)]
pub enum JsValue {
    #[default]
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(JsString),
    Object(JsObjectRef),
}

impl JsValue {
    /// Check if this value is null or undefined
    pub fn is_null_or_undefined(&self) -> bool {
        matches!(self, JsValue::Null | JsValue::Undefined)
    }

    /// Check if this value is callable (a function)
    pub fn is_callable(&self) -> bool {
        match self {
            JsValue::Object(obj) => obj.borrow().is_callable(),
            _ => false,
        }
    }

    pub fn as_object(&self) -> Option<&JsObjectRef> {
        match self {
            JsValue::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// The promise state, when this value is a native promise
    pub fn as_promise(&self) -> Option<PromiseRef> {
        match self {
            JsValue::Object(obj) => match &obj.borrow().exotic {
                ExoticObject::Promise(state) => Some(state.cheap_clone()),
                _ => None,
            },
            _ => None,
        }
    }

    /// Get the typeof result for this value
    pub fn type_of(&self) -> &'static str {
        match self {
            JsValue::Undefined => "undefined",
            JsValue::Null => "object",
            JsValue::Boolean(_) => "boolean",
            JsValue::Number(_) => "number",
            JsValue::String(_) => "string",
            JsValue::Object(obj) => {
                if obj.borrow().is_callable() {
                    "function"
                } else {
                    "object"
                }
            }
        }
    }

    /// Convert to boolean (ToBoolean)
    pub fn to_boolean(&self) -> bool {
        match self {
            JsValue::Undefined | JsValue::Null => false,
            JsValue::Boolean(b) => *b,
            JsValue::Number(n) => *n != 0.0 && !n.is_nan(),
            JsValue::String(s) => !s.is_empty(),
            JsValue::Object(_) => true,
        }
    }

    /// Convert to number (ToNumber)
    pub fn to_number(&self) -> f64 {
        match self {
            JsValue::Undefined => f64::NAN,
            JsValue::Null => 0.0,
            JsValue::Boolean(true) => 1.0,
            JsValue::Boolean(false) => 0.0,
            JsValue::Number(n) => *n,
            JsValue::String(s) => string_to_number(s.as_str()),
            JsValue::Object(obj) => {
                let obj = obj.borrow();
                match &obj.exotic {
                    ExoticObject::Array(items) if items.is_empty() => 0.0,
                    ExoticObject::Array(items) if items.len() == 1 => {
                        items.first().map(|v| v.to_number()).unwrap_or(0.0)
                    }
                    _ => f64::NAN,
                }
            }
        }
    }

    /// Convert to string (ToString)
    pub fn to_js_string(&self) -> JsString {
        match self {
            JsValue::Undefined => JsString::from("undefined"),
            JsValue::Null => JsString::from("null"),
            JsValue::Boolean(true) => JsString::from("true"),
            JsValue::Boolean(false) => JsString::from("false"),
            JsValue::Number(n) => JsString::from(number_to_string(*n)),
            JsValue::String(s) => s.cheap_clone(),
            JsValue::Object(obj) => JsString::from(object_to_string(obj)),
        }
    }

    /// Strict equality (===)
    pub fn strict_equals(&self, other: &JsValue) -> bool {
        match (self, other) {
            (JsValue::Undefined, JsValue::Undefined) => true,
            (JsValue::Null, JsValue::Null) => true,
            (JsValue::Boolean(a), JsValue::Boolean(b)) => a == b,
            // NaN !== NaN
            (JsValue::Number(a), JsValue::Number(b)) => a == b,
            (JsValue::String(a), JsValue::String(b)) => a == b,
            (JsValue::Object(a), JsValue::Object(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// SameValueZero, used by Map/Set keys and `includes`
    pub fn same_value_zero(&self, other: &JsValue) -> bool {
        match (self, other) {
            (JsValue::Number(a), JsValue::Number(b)) if a.is_nan() && b.is_nan() => true,
            _ => self.strict_equals(other),
        }
    }

    /// Abstract equality (==)
    pub fn loose_equals(&self, other: &JsValue) -> bool {
        match (self, other) {
            (a, b) if a.is_null_or_undefined() && b.is_null_or_undefined() => true,
            (JsValue::Undefined | JsValue::Null, _) | (_, JsValue::Undefined | JsValue::Null) => {
                false
            }
            (JsValue::Object(a), JsValue::Object(b)) => Rc::ptr_eq(a, b),
            (JsValue::Object(_), JsValue::String(s)) | (JsValue::String(s), JsValue::Object(_)) => {
                let obj = if matches!(self, JsValue::Object(_)) {
                    self
                } else {
                    other
                };
                obj.to_js_string() == *s
            }
            (JsValue::String(a), JsValue::String(b)) => a == b,
            _ => self.to_number() == other.to_number(),
        }
    }

    /// Human readable form used by `console.log`: strings are printed raw at
    /// the top level, everything else is inspected.
    pub fn display_string(&self) -> String {
        match self {
            JsValue::String(s) => s.to_string(),
            other => inspect(other),
        }
    }
}

impl fmt::Debug for JsValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", inspect(self))
    }
}

impl PartialEq for JsValue {
    fn eq(&self, other: &Self) -> bool {
        self.strict_equals(other)
    }
}

// Conversions from Rust types

impl From<bool> for JsValue {
    fn from(b: bool) -> Self {
        JsValue::Boolean(b)
    }
}

impl From<f64> for JsValue {
    fn from(n: f64) -> Self {
        JsValue::Number(n)
    }
}

impl From<i32> for JsValue {
    fn from(n: i32) -> Self {
        JsValue::Number(n as f64)
    }
}

impl From<&str> for JsValue {
    fn from(s: &str) -> Self {
        JsValue::String(JsString::from(s))
    }
}

impl From<String> for JsValue {
    fn from(s: String) -> Self {
        JsValue::String(JsString::from(s))
    }
}

impl From<JsString> for JsValue {
    fn from(s: JsString) -> Self {
        JsValue::String(s)
    }
}

impl From<JsObjectRef> for JsValue {
    fn from(obj: JsObjectRef) -> Self {
        JsValue::Object(obj)
    }
}

/// Format a number the way `Number.prototype.toString` does
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    let abs = n.abs();
    if !(1e-6..1e21).contains(&abs) {
        // Rust prints `1e21`, JS prints `1e+21`
        let formatted = format!("{:e}", n);
        return match formatted.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => format!("{}e+{}", mantissa, exp),
            _ => formatted,
        };
    }
    format!("{}", n)
}

/// StringToNumber: whitespace-trimmed decimal, hex, or empty (0)
pub fn string_to_number(s: &str) -> f64 {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        return i64::from_str_radix(hex, 16)
            .map(|v| v as f64)
            .unwrap_or(f64::NAN);
    }
    match trimmed {
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        // Rust accepts "inf"/"nan" spellings that JS rejects
        other if other.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') => {
            f64::NAN
        }
        other => other.parse::<f64>().unwrap_or(f64::NAN),
    }
}

/// Reference-counted string for efficient string handling
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JsString(Rc<str>);

impl CheapClone for JsString {}

impl JsString {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn parse<F: std::str::FromStr>(&self) -> Result<F, F::Err> {
        self.0.parse()
    }
}

impl AsRef<str> for JsString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for JsString {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for JsString {
    fn eq(&self, other: &str) -> bool {
        self.0.as_ref() == other
    }
}

impl PartialEq<&str> for JsString {
    fn eq(&self, other: &&str) -> bool {
        self.0.as_ref() == *other
    }
}

impl From<&str> for JsString {
    fn from(s: &str) -> Self {
        JsString(s.into())
    }
}

impl From<String> for JsString {
    fn from(s: String) -> Self {
        JsString(s.into())
    }
}

impl fmt::Debug for JsString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.0)
    }
}

impl fmt::Display for JsString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for JsString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(JsString::from)
    }
}

impl std::ops::Add<&str> for JsString {
    type Output = JsString;

    fn add(self, other: &str) -> JsString {
        let mut s = String::from(&*self.0);
        s.push_str(other);
        JsString::from(s)
    }
}

impl std::ops::Add<&JsString> for JsString {
    type Output = JsString;

    fn add(self, other: &JsString) -> JsString {
        self + other.as_str()
    }
}

/// Reference to a heap-allocated object
pub type JsObjectRef = Rc<RefCell<JsObject>>;

/// Insertion-ordered property table
pub type PropertyMap = IndexMap<JsString, Property, FxBuildHasher>;

/// A JavaScript object
#[derive(Debug, Default)]
pub struct JsObject {
    /// Prototype link
    pub prototype: Option<JsObjectRef>,
    /// Object properties
    pub properties: PropertyMap,
    /// Exotic object behavior
    pub exotic: ExoticObject,
}

impl JsObject {
    /// Create a new ordinary object
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new ordinary object with a prototype
    pub fn with_prototype(prototype: Option<JsObjectRef>) -> Self {
        Self {
            prototype,
            ..Self::default()
        }
    }

    /// Allocate the object behind a shared reference
    pub fn into_ref(self) -> JsObjectRef {
        Rc::new(RefCell::new(self))
    }

    /// Check if this object is callable
    pub fn is_callable(&self) -> bool {
        matches!(self.exotic, ExoticObject::Function(_))
    }

    pub fn as_function(&self) -> Option<&JsFunction> {
        match &self.exotic {
            ExoticObject::Function(func) => Some(func),
            _ => None,
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self.exotic, ExoticObject::Array(_))
    }

    /// Own property value, including virtual array/function slots
    pub fn get_own_property(&self, key: &str) -> Option<JsValue> {
        match &self.exotic {
            ExoticObject::Array(items) => {
                if key == "length" {
                    return Some(JsValue::Number(items.len() as f64));
                }
                if let Some(index) = element_index(key) {
                    return items.get(index).cloned();
                }
            }
            ExoticObject::Map(entries) if key == "size" => {
                return Some(JsValue::Number(entries.len() as f64));
            }
            ExoticObject::Set(items) if key == "size" => {
                return Some(JsValue::Number(items.len() as f64));
            }
            _ => {}
        }
        self.properties.get(key).map(|prop| prop.value.clone())
    }

    /// Get a property, searching the prototype chain
    pub fn get_property(&self, key: &str) -> Option<JsValue> {
        if let Some(value) = self.get_own_property(key) {
            return Some(value);
        }
        let mut proto = self.prototype.clone();
        while let Some(current) = proto {
            let current = current.borrow();
            if let Some(value) = current.get_own_property(key) {
                return Some(value);
            }
            proto = current.prototype.clone();
        }
        None
    }

    /// Set a property. Array lengths and indices past what the array can
    /// hold are dropped; use [`JsObject::try_set_property`] to report them.
    pub fn set_property(&mut self, key: impl Into<JsString>, value: JsValue) {
        let key = key.into();
        if let ExoticObject::Array(items) = &mut self.exotic {
            if key == "length" {
                if let Ok(len) = array_length(&value) {
                    items.resize(len, JsValue::Undefined);
                }
                return;
            }
            if let Some(index) = element_index(key.as_str()) {
                if index >= items.len() {
                    if index >= MAX_DENSE_LENGTH {
                        return;
                    }
                    items.resize(index + 1, JsValue::Undefined);
                }
                if let Some(slot) = items.get_mut(index) {
                    *slot = value;
                }
                return;
            }
        }
        match self.properties.get_mut(key.as_str()) {
            Some(prop) if !prop.writable => {}
            Some(prop) => prop.value = value,
            None => {
                self.properties.insert(key, Property::data(value));
            }
        }
    }

    /// Set a property on behalf of running code, throwing a `RangeError`
    /// where an array write would need an invalid length
    pub fn try_set_property(&mut self, key: impl Into<JsString>, value: JsValue) -> Result<(), JsError> {
        let key = key.into();
        if let ExoticObject::Array(items) = &self.exotic {
            if key == "length" {
                array_length(&value)?;
            } else if let Some(index) = element_index(key.as_str()) {
                if index >= items.len() {
                    dense_length(index + 1)?;
                }
            }
        }
        self.set_property(key, value);
        Ok(())
    }

    /// Define a property with attributes
    pub fn define_property(&mut self, key: impl Into<JsString>, prop: Property) {
        self.properties.insert(key.into(), prop);
    }

    /// Check if object has own property
    pub fn has_own_property(&self, key: &str) -> bool {
        if let ExoticObject::Array(items) = &self.exotic {
            if key == "length" {
                return true;
            }
            if let Some(index) = element_index(key) {
                return index < items.len();
            }
        }
        self.properties.contains_key(key)
    }

    /// `in` operator: own or inherited
    pub fn has_property(&self, key: &str) -> bool {
        if self.has_own_property(key) {
            return true;
        }
        match &self.prototype {
            Some(proto) => proto.borrow().has_property(key),
            None => false,
        }
    }

    pub fn delete_property(&mut self, key: &str) -> bool {
        if let ExoticObject::Array(items) = &mut self.exotic {
            if let Some(index) = element_index(key) {
                if let Some(slot) = items.get_mut(index) {
                    *slot = JsValue::Undefined;
                }
                return true;
            }
        }
        self.properties.shift_remove(key);
        true
    }

    /// Enumerable own string keys, array indices first
    pub fn own_keys(&self) -> Vec<JsString> {
        let mut keys = Vec::new();
        if let ExoticObject::Array(items) = &self.exotic {
            keys.extend((0..items.len()).map(|i| JsString::from(i.to_string())));
        }
        keys.extend(
            self.properties
                .iter()
                .filter(|(_, prop)| prop.enumerable)
                .map(|(key, _)| key.cheap_clone()),
        );
        keys
    }
}

/// Parse a canonical array index ("0", "17", not "01")
pub fn array_index(key: &str) -> Option<usize> {
    let first = key.bytes().next()?;
    if !first.is_ascii_digit() || (key.len() > 1 && first == b'0') {
        return None;
    }
    key.parse::<usize>().ok()
}

/// Largest `length` an array may report
pub const MAX_ARRAY_LENGTH: usize = u32::MAX as usize;

/// Arrays are stored densely, so lengths past this are refused
pub const MAX_DENSE_LENGTH: usize = 1 << 24;

/// Longest string a builtin will build
pub const MAX_STRING_LENGTH: usize = 1 << 28;

/// Index of an array element; keys at or past `2^32 - 1` are plain properties
fn element_index(key: &str) -> Option<usize> {
    array_index(key).filter(|index| *index < MAX_ARRAY_LENGTH)
}

/// Validate a value written to `length` or passed to `Array(n)`
pub fn array_length(value: &JsValue) -> Result<usize, JsError> {
    let len = value.to_number();
    if len.fract() != 0.0 || !(0.0..=MAX_ARRAY_LENGTH as f64).contains(&len) {
        return Err(JsError::range_error("Invalid array length"));
    }
    dense_length(len as usize)
}

/// Refuse lengths the dense element store cannot hold
pub fn dense_length(len: usize) -> Result<usize, JsError> {
    if len > MAX_DENSE_LENGTH {
        return Err(JsError::range_error(format!(
            "Invalid array length: {} exceeds the supported maximum of {}",
            len, MAX_DENSE_LENGTH
        )));
    }
    Ok(len)
}

/// Refuse string lengths past [`MAX_STRING_LENGTH`]
pub fn string_length(len: f64) -> Result<usize, JsError> {
    if !(0.0..=MAX_STRING_LENGTH as f64).contains(&len) {
        return Err(JsError::range_error("Invalid string length"));
    }
    Ok(len as usize)
}

/// Object property descriptor
#[derive(Debug, Clone)]
pub struct Property {
    pub value: JsValue,
    pub writable: bool,
    pub enumerable: bool,
}

impl Property {
    pub fn data(value: JsValue) -> Self {
        Self {
            value,
            writable: true,
            enumerable: true,
        }
    }

    /// Writable but hidden from enumeration (methods, `constructor`, ...)
    pub fn hidden(value: JsValue) -> Self {
        Self {
            value,
            writable: true,
            enumerable: false,
        }
    }

    pub fn readonly(value: JsValue) -> Self {
        Self {
            value,
            writable: false,
            enumerable: false,
        }
    }
}

/// Exotic object behavior
#[derive(Debug, Default)]
pub enum ExoticObject {
    /// Ordinary object
    #[default]
    Ordinary,
    /// Array exotic object, elements stored densely
    Array(Vec<JsValue>),
    /// Function exotic object
    Function(JsFunction),
    /// Error instance (`name`/`message` live in properties)
    Error,
    /// Map exotic object - stores key-value pairs preserving insertion order
    Map(Vec<(JsValue, JsValue)>),
    /// Set exotic object - stores unique values preserving insertion order
    Set(Vec<JsValue>),
    /// Promise exotic object - stores promise state
    Promise(PromiseRef),
}

/// Shared promise state
pub type PromiseRef = Rc<RefCell<PromiseState>>;

/// Promise internal state
#[derive(Debug, Default)]
pub struct PromiseState {
    /// Current state of the promise
    pub status: PromiseStatus,
    /// Resolved value or rejection reason
    pub result: JsValue,
    /// Reactions to schedule when the promise settles
    pub reactions: Vec<PromiseReaction>,
    /// Whether a handler was ever attached
    pub handled: bool,
}

/// Promise status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PromiseStatus {
    #[default]
    Pending,
    Fulfilled,
    Rejected,
}

/// Function representation
#[derive(Debug, Clone)]
pub enum JsFunction {
    /// Interpreted function (declaration, expression, arrow, or method)
    Interpreted(Rc<MetaFunction>),
    /// Class constructor
    Class(Rc<ClassConstructor>),
    /// Native Rust function
    Native(NativeFunction),
    /// Bound function (created by Function.prototype.bind)
    Bound(Box<BoundFunctionData>),
    /// Promise resolve function (has internal [[Promise]] slot)
    PromiseResolve(JsObjectRef),
    /// Promise reject function (has internal [[Promise]] slot)
    PromiseReject(JsObjectRef),
}

/// Data for a bound function
#[derive(Debug, Clone)]
pub struct BoundFunctionData {
    /// The target function to call
    pub target: JsObjectRef,
    /// The bound this value
    pub this_arg: JsValue,
    /// Pre-filled arguments
    pub bound_args: Vec<JsValue>,
}

/// Native function signature
pub type NativeFn = fn(&mut Interpreter, JsValue, &[JsValue]) -> Result<JsValue, JsError>;

/// Native function wrapper
#[derive(Clone)]
pub struct NativeFunction {
    pub name: JsString,
    pub func: NativeFn,
    pub arity: usize,
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

/// Name of a function object, from its `name` property
pub fn function_name(obj: &JsObject) -> Option<JsString> {
    match obj.properties.get("name").map(|prop| &prop.value) {
        Some(JsValue::String(name)) if !name.is_empty() => Some(name.cheap_clone()),
        _ => match obj.as_function()? {
            JsFunction::Native(native) => Some(native.name.cheap_clone()),
            _ => None,
        },
    }
}

fn object_to_string(obj: &JsObjectRef) -> String {
    let obj = obj.borrow();
    match &obj.exotic {
        ExoticObject::Array(items) => items
            .iter()
            .map(|item| {
                if item.is_null_or_undefined() {
                    String::new()
                } else {
                    item.to_js_string().to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(","),
        ExoticObject::Function(_) => {
            let name = function_name(&obj).map(|n| n.to_string()).unwrap_or_default();
            format!("function {}() {{ [code] }}", name)
        }
        ExoticObject::Error => error_summary(&obj),
        ExoticObject::Map(_) => "[object Map]".to_string(),
        ExoticObject::Set(_) => "[object Set]".to_string(),
        ExoticObject::Promise(_) => "[object Promise]".to_string(),
        ExoticObject::Ordinary => "[object Object]".to_string(),
    }
}

fn error_summary(obj: &JsObject) -> String {
    let name = obj
        .get_property("name")
        .map(|v| v.to_js_string().to_string())
        .unwrap_or_else(|| "Error".to_string());
    let message = obj
        .get_property("message")
        .map(|v| v.to_js_string().to_string())
        .unwrap_or_default();
    if message.is_empty() {
        name
    } else {
        format!("{}: {}", name, message)
    }
}

/// Node-style inspection of a value (`[ 1, 'a' ]`, `{ x: 1 }`, ...)
pub fn inspect(value: &JsValue) -> String {
    let mut seen = Vec::new();
    inspect_inner(value, &mut seen, 0)
}

fn inspect_inner(value: &JsValue, seen: &mut Vec<*const RefCell<JsObject>>, depth: usize) -> String {
    let obj_ref = match value {
        JsValue::String(s) => return format!("'{}'", s),
        JsValue::Object(obj) => obj,
        other => return other.to_js_string().to_string(),
    };
    let ptr = Rc::as_ptr(obj_ref);
    if seen.contains(&ptr) {
        return "[Circular]".to_string();
    }
    let obj = obj_ref.borrow();
    if let ExoticObject::Function(func) = &obj.exotic {
        let name = function_name(&obj);
        return match (func, name) {
            (JsFunction::Class(_), Some(name)) => format!("[class {}]", name),
            (JsFunction::Class(_), None) => "[class (anonymous)]".to_string(),
            (_, Some(name)) => format!("[Function: {}]", name),
            (_, None) => "[Function (anonymous)]".to_string(),
        };
    }
    if let ExoticObject::Error = &obj.exotic {
        return error_summary(&obj);
    }
    if depth > 2 {
        return match &obj.exotic {
            ExoticObject::Array(_) => "[Array]".to_string(),
            _ => "[Object]".to_string(),
        };
    }

    seen.push(ptr);
    let entries: Vec<String> = obj
        .properties
        .iter()
        .filter(|(_, prop)| prop.enumerable)
        .map(|(key, prop)| format!("{}: {}", key, inspect_inner(&prop.value, seen, depth + 1)))
        .collect();
    let rendered = match &obj.exotic {
        ExoticObject::Array(items) => {
            let mut parts: Vec<String> = items
                .iter()
                .map(|item| inspect_inner(item, seen, depth + 1))
                .collect();
            parts.extend(entries);
            wrap("[", &parts, "]")
        }
        ExoticObject::Map(map) => {
            let parts: Vec<String> = map
                .iter()
                .map(|(k, v)| {
                    format!(
                        "{} => {}",
                        inspect_inner(k, seen, depth + 1),
                        inspect_inner(v, seen, depth + 1)
                    )
                })
                .collect();
            format!("Map({}) {}", map.len(), wrap("{", &parts, "}"))
        }
        ExoticObject::Set(set) => {
            let parts: Vec<String> = set
                .iter()
                .map(|item| inspect_inner(item, seen, depth + 1))
                .collect();
            format!("Set({}) {}", set.len(), wrap("{", &parts, "}"))
        }
        ExoticObject::Promise(state) => {
            let state = state.borrow();
            let inner = match state.status {
                PromiseStatus::Pending => "<pending>".to_string(),
                PromiseStatus::Fulfilled => inspect_inner(&state.result, seen, depth + 1),
                PromiseStatus::Rejected => {
                    format!("<rejected> {}", inspect_inner(&state.result, seen, depth + 1))
                }
            };
            format!("Promise {{ {} }}", inner)
        }
        _ => wrap("{", &entries, "}"),
    };
    seen.pop();
    rendered
}

fn wrap(open: &str, parts: &[String], close: &str) -> String {
    if parts.is_empty() {
        format!("{}{}", open, close)
    } else {
        format!("{} {} {}", open, parts.join(", "), close)
    }
}
