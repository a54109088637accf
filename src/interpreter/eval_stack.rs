//! Evaluation stack types
//!
//! The evaluator never recurses on the host stack. Every pending operation is
//! a [`Frame`] on the task's frame stack, intermediate results live on the
//! value stack, and the interpreter pops one frame per step. Suspending at an
//! await is a matter of moving the top part of both stacks aside.

use std::rc::Rc;

use crate::ast::{BinaryOperator, NodeRef, UnaryOperator, VariableKind};
use crate::environment::Environment;
use crate::error::JsError;
use crate::flow::{BlockKind, PathToken};
use crate::value::{JsObjectRef, JsString, JsValue, PromiseStatus};

use super::intercept::Site;

/// Result of executing one frame
pub enum StepResult {
    /// More frames to process
    Continue,
    /// An interesting node was reached; the host decides when to continue
    Pause,
    /// The task's root frame completed
    Done(JsValue),
    /// The task ended with an uncaught error
    Error(JsError),
}

/// Abrupt completion travelling down the frame stack
#[derive(Debug, Clone)]
pub enum Abrupt {
    Return(JsValue),
    Throw(JsError),
    Break,
    Continue,
    /// Optional chain hit a nullish base
    ShortCircuit,
}

/// Evaluation configuration, captured by closures at creation time
#[derive(Debug, Clone, Default)]
pub struct EvalConfig {
    /// `await` is legal in the current body
    pub allow_await: bool,
    /// Object a method was defined on, for `super` lookups
    pub home: Option<Rc<HomeObject>>,
}

#[derive(Debug)]
pub struct HomeObject {
    pub object: JsObjectRef,
    /// Where `super.x` starts looking
    pub parent: Option<JsObjectRef>,
    /// Target of `super(...)` inside a derived constructor
    pub super_constructor: Option<JsObjectRef>,
}

/// A frame on the evaluation stack
///
/// Each frame represents a pending operation. The interpreter processes
/// frames in LIFO order, pushing new frames when sub-nodes need to be
/// evaluated.
pub enum Frame {
    // ═══════════════════════════════════════════════════════════════════════
    // Node Entry
    // ═══════════════════════════════════════════════════════════════════════
    /// Visit a node: announce it, then dispatch
    Eval(NodeRef),

    /// Dispatch a node whose enter event was already announced
    Dispatch(NodeRef),

    /// Visit a declarator of a declaration of the given kind
    Declarator { node: NodeRef, kind: VariableKind },

    DispatchDeclarator { node: NodeRef, kind: VariableKind },

    /// Run a control-flow body inside a block frame
    EnterBlock { node: NodeRef, kind: BlockKind },

    /// Emit the exit event of a reported node
    Exit { node: NodeRef, site: Site },

    // ═══════════════════════════════════════════════════════════════════════
    // Statements
    // ═══════════════════════════════════════════════════════════════════════
    /// Execute remaining statements of a program or block
    Statements {
        node: NodeRef,
        index: usize,
        /// Keep the value of top-level expression statements
        record: bool,
    },

    /// Top-level expression statement finished
    RecordCompletion,

    /// Expression statement: store result
    StatementValue,

    /// Drop the top value
    Discard,

    /// Leave a scope
    RestoreEnv(Environment),

    /// Multiple declarators
    Declarators { node: NodeRef, index: usize },

    /// Declarator: init done, bind
    Bind { node: NodeRef, kind: VariableKind },

    /// If: condition done, pick branch
    IfBranch(NodeRef),

    /// Any loop, between stages
    Loop(Box<LoopFrame>),

    /// Return: value done
    Return,

    /// Throw: value done
    Throw,

    /// Try: protected region or catch clause running
    TryHandler {
        node: NodeRef,
        stage: TryStage,
        values_len: usize,
        env: Environment,
    },

    /// Finally block running, with the completion it interrupted
    Finally { pending: Option<Abrupt> },

    /// Switch: discriminant done
    SwitchStart(NodeRef),

    /// Switch: look for a matching case from `index`
    SwitchMatch {
        node: NodeRef,
        discriminant: JsValue,
        index: usize,
    },

    /// Switch: case test done
    SwitchCompare {
        node: NodeRef,
        discriminant: JsValue,
        index: usize,
    },

    /// Switch: run case bodies, falling through
    SwitchBody {
        node: NodeRef,
        case: usize,
        statement: usize,
    },

    // ═══════════════════════════════════════════════════════════════════════
    // Expressions
    // ═══════════════════════════════════════════════════════════════════════
    /// Binary: both sides done
    Binary(BinaryOperator),

    /// Logical: left done, maybe short-circuit
    Logical(NodeRef),

    /// Unary: operand done
    Unary(UnaryOperator),

    /// Conditional: test done, pick branch
    Conditional(NodeRef),

    /// Member access: object done
    MemberAccess(NodeRef),

    /// Computed member access: object and key done
    MemberGet(NodeRef),

    /// End of an optional chain
    ChainEnd { values_len: usize },

    /// Method call: object done, read the method
    CallMember(NodeRef),

    /// Computed method call: object and key done
    CallMemberComputed(NodeRef),

    /// Plain call: callee done
    CallCallee(NodeRef),

    /// New: constructor done
    NewCallee(NodeRef),

    /// Call/new arguments
    Arguments(Box<ArgumentList>),

    /// Assignment target: object done, push the key
    MemberKey(NodeRef),

    /// Compound assignment: object and key done, push current value
    LoadMember,

    /// Compound assignment: push current value of a binding
    LoadBinding(JsString),

    /// Assignment: value (and current value, when compound) done
    AssignComplete {
        node: NodeRef,
        target: AssignTarget,
        compound: Option<BinaryOperator>,
    },

    /// Logical assignment: current value done, maybe short-circuit
    LogicalAssign { node: NodeRef, target: AssignTarget },

    /// Update (++/--): current value done
    UpdateComplete { node: NodeRef, target: AssignTarget },

    /// delete obj[key]: object and key done
    DeleteMember,

    /// Array literal elements
    ArrayElements(Box<ElementList>),

    /// Object literal properties
    ObjectProperties(Box<PropertyList>),

    /// Template literal: all expressions done
    Template(NodeRef),

    /// Await: operand done
    AwaitValue(NodeRef),

    /// Class: superclass (if any) done
    ClassDefine(NodeRef),

    // ═══════════════════════════════════════════════════════════════════════
    // Calls and Tasks
    // ═══════════════════════════════════════════════════════════════════════
    /// Call a value with already evaluated arguments
    Invoke(Box<Invocation>),

    /// Interpreted function activation
    CallBoundary(Box<CallBoundary>),

    /// `new Promise(executor)`: executor running
    PromiseExecutor(JsObjectRef),

    /// Bottom of a task
    TaskRoot(TaskRoot),
}

impl Frame {
    /// Rebase recorded value-stack heights after the stack below `offset`
    /// was split off
    pub(crate) fn rebase_values(&mut self, offset: usize) {
        match self {
            Frame::TryHandler { values_len, .. } | Frame::ChainEnd { values_len } => {
                *values_len = values_len.saturating_sub(offset);
            }
            Frame::CallBoundary(boundary) => {
                boundary.values_len = boundary.values_len.saturating_sub(offset);
            }
            _ => {}
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopStage {
    Start,
    Test,
    AfterTest,
    Body,
    AfterBody,
    /// for-in/for-of: bind the next item
    Iterate,
}

pub struct LoopFrame {
    pub node: NodeRef,
    pub stage: LoopStage,
    /// for-in keys or for-of values
    pub items: Vec<JsValue>,
    pub index: usize,
    /// Scope the loop was entered in
    pub env: Environment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TryStage {
    Block,
    Catch,
}

/// Where an assignment stores its value
#[derive(Debug, Clone)]
pub enum AssignTarget {
    Binding(JsString),
    /// Object and key are on the value stack
    Member,
    /// Destructuring pattern
    Pattern(NodeRef),
}

pub enum CallTarget {
    Call { callee: JsValue, this: JsValue },
    New { callee: JsValue },
    /// `super(...)` in a derived constructor
    Super,
}

pub struct ArgumentList {
    /// The call/new expression
    pub node: NodeRef,
    pub index: usize,
    pub args: Vec<JsValue>,
    /// A value is waiting on the stack; `true` when it is spread
    pub pending: Option<bool>,
    pub target: CallTarget,
}

pub struct ElementList {
    pub node: NodeRef,
    pub index: usize,
    pub items: Vec<JsValue>,
    pub pending: Option<bool>,
}

pub enum PendingProperty {
    /// Computed key on the stack
    Key,
    /// Value for this key on the stack
    Value(JsString),
    /// Spread source on the stack
    Spread,
}

pub struct PropertyList {
    pub node: NodeRef,
    pub index: usize,
    pub object: JsObjectRef,
    pub pending: Option<PendingProperty>,
}

pub struct Invocation {
    pub callee: JsValue,
    pub this: JsValue,
    pub args: Vec<JsValue>,
}

#[derive(Debug)]
pub enum CallKind {
    Sync,
    /// Settles `promise` when the body completes
    Async { promise: JsObjectRef },
    /// Evaluates to `this` unless the body returns an object
    Construct { this: JsObjectRef },
}

/// An interpreted activation in progress
pub struct CallBoundary {
    pub function: NodeRef,
    pub site: Site,
    pub saved_env: Environment,
    pub saved_config: EvalConfig,
    pub values_len: usize,
    /// Arrow function with an expression body
    pub expression_body: bool,
    pub kind: CallKind,
    /// The activation was suspended at least once; its caller already
    /// received the promise
    pub resumed: bool,
}

/// What completes a task
#[derive(Debug)]
pub enum TaskRoot {
    /// The main program
    Program,
    /// Timer callback or resumed async function
    Callback,
    /// Promise reaction handler; the result settles `derived`
    Settle {
        derived: Option<JsObjectRef>,
        /// `finally` handler: outcome to pass through
        passthrough: Option<(PromiseStatus, JsValue)>,
    },
    /// Adopting a foreign thenable
    Thenable { promise: JsObjectRef },
    /// Run-to-completion call from native code
    External,
}

/// One synchronous unit of work
pub struct Task {
    pub frames: Vec<Frame>,
    pub values: Vec<JsValue>,
    pub env: Environment,
    pub config: EvalConfig,
    /// Value of the last expression statement
    pub statement_value: Option<JsValue>,
    /// Value of the last top-level expression statement
    pub completion: Option<JsValue>,
}

impl Task {
    pub fn new(env: Environment, config: EvalConfig) -> Self {
        Self {
            frames: Vec::new(),
            values: Vec::new(),
            env,
            config,
            statement_value: None,
            completion: None,
        }
    }

    pub fn with_root(env: Environment, config: EvalConfig, root: TaskRoot) -> Self {
        let mut task = Self::new(env, config);
        task.frames.push(Frame::TaskRoot(root));
        task
    }

    pub fn is_idle(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn push_frame(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    pub fn push_value(&mut self, value: JsValue) {
        self.values.push(value);
    }

    pub fn pop_value(&mut self) -> JsValue {
        self.values.pop().unwrap_or(JsValue::Undefined)
    }

    pub fn peek_value(&self) -> Option<&JsValue> {
        self.values.last()
    }
}

/// An async activation waiting for a promise
pub struct Suspended {
    pub frames: Vec<Frame>,
    pub values: Vec<JsValue>,
    pub env: Environment,
    pub config: EvalConfig,
    pub token: PathToken,
    /// The await expression
    pub node: NodeRef,
}

/// Identity of a suspended activation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SuspensionId(pub u64);
