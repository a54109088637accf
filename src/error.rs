//! Error types for the stepping interpreter

use thiserror::Error;

use crate::value::{JsString, JsValue};

/// Source location information for error messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Main error type for the interpreter
///
/// Everything except [`JsError::Thrown`] originates in the runtime. When one of
/// these crosses an interpreted `try/catch` it is materialized as an Error
/// object (`name` + `message`) before being bound to the catch parameter.
#[derive(Debug, Clone, Error)]
pub enum JsError {
    #[error("SyntaxError: {message} at {location}")]
    SyntaxError {
        message: String,
        location: SourceLocation,
    },

    #[error("TypeError: {message}")]
    TypeError { message: String },

    #[error("ReferenceError: {name} is not defined")]
    ReferenceError { name: String },

    #[error("RangeError: {message}")]
    RangeError { message: String },

    /// A recognized syntax form the interpreter does not model
    #[error("NotImplemented: {construct} is not supported")]
    NotImplemented { construct: String },

    /// A value raised by interpreted `throw` (or a rejected await)
    #[error("Uncaught {}", describe_thrown(.0))]
    Thrown(JsValue),

    #[error("Internal error: {0}")]
    Internal(String),
}

fn describe_thrown(value: &JsValue) -> String {
    if let JsValue::Object(obj) = value {
        let obj = obj.borrow();
        let name = obj.get_property("name");
        let message = obj.get_property("message");
        if let (Some(JsValue::String(name)), Some(message)) = (name, message) {
            return format!("{}: {}", name, message.to_js_string());
        }
    }
    value.display_string()
}

impl JsError {
    pub fn syntax_error(message: impl Into<String>, line: u32, column: u32) -> Self {
        JsError::SyntaxError {
            message: message.into(),
            location: SourceLocation { line, column },
        }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        JsError::TypeError {
            message: message.into(),
        }
    }

    pub fn reference_error(name: impl Into<String>) -> Self {
        JsError::ReferenceError { name: name.into() }
    }

    pub fn range_error(message: impl Into<String>) -> Self {
        JsError::RangeError {
            message: message.into(),
        }
    }

    pub fn not_implemented(construct: impl Into<String>) -> Self {
        JsError::NotImplemented {
            construct: construct.into(),
        }
    }

    /// Create an internal error for unexpected interpreter states
    pub fn internal_error(message: impl Into<String>) -> Self {
        JsError::Internal(message.into())
    }

    /// Wrap a value raised by interpreted code
    pub fn thrown(value: JsValue) -> Self {
        JsError::Thrown(value)
    }

    /// Error constructor name (`TypeError`, ...) and message for
    /// materializing this error inside interpreted code. `None` for thrown
    /// values, which are passed through untouched.
    pub fn kind_and_message(&self) -> Option<(&'static str, String)> {
        match self {
            JsError::SyntaxError { message, .. } => Some(("SyntaxError", message.clone())),
            JsError::TypeError { message } => Some(("TypeError", message.clone())),
            JsError::ReferenceError { name } => {
                Some(("ReferenceError", format!("{} is not defined", name)))
            }
            JsError::RangeError { message } => Some(("RangeError", message.clone())),
            JsError::NotImplemented { construct } => {
                Some(("Error", format!("{} is not supported", construct)))
            }
            JsError::Internal(message) => Some(("Error", message.clone())),
            JsError::Thrown(_) => None,
        }
    }

    /// Whether this is a recognized-but-unsupported construct
    pub fn is_not_implemented(&self) -> bool {
        matches!(self, JsError::NotImplemented { .. })
    }

    /// Plain-string form of the error as seen by interpreted code, used when
    /// no realm is at hand to build an Error object.
    pub fn to_value(&self) -> JsValue {
        match self {
            JsError::Thrown(value) => value.clone(),
            other => JsValue::String(JsString::from(other.to_string())),
        }
    }
}
