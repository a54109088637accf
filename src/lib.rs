//! Stepping JavaScript interpreter for visual debuggers
//!
//! Programs arrive as ESTree ASTs from an external parser and are evaluated
//! one interesting node at a time. Between steps the host can inspect the
//! live call stack, block stack and per-frame history kept in the
//! [`flow::FlowModel`].
//!
//! # Example
//!
//! ```
//! use jsstep::{Debugger, DebuggerConfig, EstreeJsonParser, JsValue, Status};
//!
//! let source = r#"{"type": "Program", "body": [{
//!     "type": "ExpressionStatement",
//!     "expression": {
//!         "type": "BinaryExpression", "operator": "+",
//!         "left": {"type": "Literal", "value": 1},
//!         "right": {"type": "Literal", "value": 2}
//!     }
//! }]}"#;
//!
//! let mut debugger = Debugger::new(Box::new(EstreeJsonParser), DebuggerConfig::default());
//! debugger.start(source).unwrap();
//! let status = debugger.run_to_completion(1_000).unwrap();
//! assert_eq!(status, Status::Ended);
//! assert_eq!(debugger.result(), Some(&JsValue::Number(3.0)));
//! ```

pub mod ast;
pub mod config;
pub mod environment;
pub mod error;
pub mod flow;
pub mod interpreter;
pub mod platform;
pub mod runtime;
pub mod stepper;
pub mod value;

pub use ast::Program;
pub use config::DebuggerConfig;
pub use error::JsError;
pub use flow::{Evaluation, FlowModel, Phase};
pub use interpreter::{Interpreter, StepOutcome};
pub use platform::{BufferedConsole, EstreeJsonParser, EventLog, Observer, SourceParser};
pub use stepper::{Debugger, Status, Tracker};
pub use value::CheapClone;
pub use value::JsString;
pub use value::JsValue;
