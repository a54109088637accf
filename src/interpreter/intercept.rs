//! Interception side-channel
//!
//! Every node visit the step policy reports is handed to an [`Interceptor`]
//! before the evaluator moves on. The interceptor never influences evaluation
//! results; it only observes, and it owns the frame path snapshots taken when
//! an async function suspends.

use std::rc::Rc;

use crate::ast::NodeRef;
use crate::environment::Environment;
use crate::flow::{BlockKind, PathToken, Phase};
use crate::value::{JsString, JsValue};

use super::eval_stack::EvalConfig;

/// Where an event was emitted from
#[derive(Debug, Clone)]
pub enum Site {
    /// A plain node visit
    Node,
    /// Entry/exit of a control-flow body
    Block(BlockKind),
    /// Entry/exit of an interpreted function activation; the event node is
    /// the function node
    Call(Rc<CallInfo>),
}

/// Description of one interpreted call
#[derive(Debug, Clone)]
pub struct CallInfo {
    /// The `CallExpression`/`NewExpression` that made the call, if any
    pub call_site: Option<NodeRef>,
    /// Name of the callee function object
    pub function_name: Option<JsString>,
    pub args: Vec<JsValue>,
    pub construct: bool,
}

/// One event handed to the interceptor
#[derive(Debug)]
pub struct Interception<'a> {
    pub node: &'a NodeRef,
    pub phase: Phase,
    pub value: Option<&'a JsValue>,
    pub env: &'a Environment,
    pub config: &'a EvalConfig,
    pub site: &'a Site,
    /// Emitted while unwinding
    pub abrupt: bool,
}

pub trait Interceptor {
    /// Observe a node event
    fn intercept(&mut self, event: &Interception<'_>);

    /// An await suspended the innermost activation. `pops_frame` is set when
    /// that activation is an interpreted call whose frame must leave the path.
    /// The returned token is handed back to [`Interceptor::resume`].
    fn suspend(&mut self, event: &Interception<'_>, pops_frame: bool) -> PathToken;

    /// A suspended activation continues
    fn resume(&mut self, event: &Interception<'_>, token: PathToken);

    /// The current top-level task ran to its end
    fn task_finished(&mut self) {}
}

/// Interceptor that observes nothing
#[derive(Debug, Default)]
pub struct NoopInterceptor;

impl Interceptor for NoopInterceptor {
    fn intercept(&mut self, _event: &Interception<'_>) {}

    fn suspend(&mut self, _event: &Interception<'_>, _pops_frame: bool) -> PathToken {
        PathToken::default()
    }

    fn resume(&mut self, _event: &Interception<'_>, _token: PathToken) {}
}
