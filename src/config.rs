//! Debugger configuration

use serde::{Deserialize, Serialize};

/// Tunables of one debugging session. Every field has a default, so a JSON
/// document only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebuggerConfig {
    /// Delay between auto steps, in milliseconds
    pub step_delay_ms: u64,
    /// Start in auto-stepping mode
    pub auto_step: bool,
    /// Interpreted recursion limit
    pub max_call_depth: usize,
    /// Cap on evaluation events kept by the bundled event log
    pub history_limit: Option<usize>,
}

impl Default for DebuggerConfig {
    fn default() -> Self {
        DebuggerConfig {
            step_delay_ms: 300,
            auto_step: false,
            max_call_depth: crate::interpreter::DEFAULT_MAX_CALL_DEPTH,
            history_limit: None,
        }
    }
}

impl DebuggerConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
