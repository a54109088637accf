//! Stepping interpreter for ESTree programs
//!
//! The interpreter owns one [`Task`] at a time: the program itself, a timer
//! callback, a promise reaction or a resumed async activation. A task is a
//! stack of [`Frame`]s that [`Interpreter::step`] pops until the step policy
//! asks for a pause, the task ends, or an uncaught error ends the run. Between
//! tasks the event loop supplies the next job.

pub mod builtins;
mod dispatch;
pub mod eval_stack;
pub mod function;
pub mod intercept;
mod operators;
pub mod policy;
mod stack;

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use tracing::{debug, trace, warn};

use crate::ast::{NodeRef, Program};
use crate::environment::Environment;
use crate::error::JsError;
use crate::flow::Phase;
use crate::platform::{ConsoleLevel, ConsoleProvider, NoOpConsoleProvider, RandomProvider, StdRandomProvider};
use crate::runtime::event_loop::{EventLoop, Job};
use crate::value::{
    CheapClone, ExoticObject, JsFunction, JsObject, JsObjectRef, JsString, JsValue, NativeFn,
    NativeFunction, Property,
};

use eval_stack::{
    EvalConfig, Frame, Invocation, StepResult, Suspended, SuspensionId, Task, TaskRoot,
};
use intercept::{Interception, Interceptor, NoopInterceptor, Site};
use policy::{StepAction, StepPolicy};

/// Default limit on nested interpreted calls
pub const DEFAULT_MAX_CALL_DEPTH: usize = 10_000;

/// Remaining host stack below which a native re-entry switches to a fresh segment
const STACK_RED_ZONE: usize = 512 * 1024;

/// Size of each host stack segment allocated for native re-entry
const STACK_SEGMENT: usize = 4 * 1024 * 1024;

/// Where [`Interpreter::step`] stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// About to evaluate a node the policy pauses on
    Paused,
    /// No task is running and no job is queued. Program timers may still be
    /// outstanding.
    Idle,
}

/// Intrinsic objects shared by every task of a run
pub struct Realm {
    /// `globalThis`
    pub global: JsObjectRef,
    pub object_prototype: JsObjectRef,
    pub function_prototype: JsObjectRef,
    pub array_prototype: JsObjectRef,
    pub string_prototype: JsObjectRef,
    pub number_prototype: JsObjectRef,
    pub boolean_prototype: JsObjectRef,
    pub error_prototype: JsObjectRef,
    pub map_prototype: JsObjectRef,
    pub set_prototype: JsObjectRef,
    pub promise_prototype: JsObjectRef,
    /// `Promise`, whose construction runs the executor steppably
    pub promise_constructor: Option<JsObjectRef>,
    /// `TypeError.prototype`, `RangeError.prototype`, ... by name
    pub error_prototypes: FxHashMap<&'static str, JsObjectRef>,
}

impl Realm {
    pub fn new() -> Self {
        let object_prototype = JsObject::new().into_ref();
        let derived = || JsObject::with_prototype(Some(object_prototype.cheap_clone())).into_ref();
        let function_prototype = derived();
        let array_prototype = derived();
        let string_prototype = derived();
        let number_prototype = derived();
        let boolean_prototype = derived();
        let error_prototype = derived();
        let map_prototype = derived();
        let set_prototype = derived();
        let promise_prototype = derived();
        let global = derived();
        Realm {
            global,
            object_prototype,
            function_prototype,
            array_prototype,
            string_prototype,
            number_prototype,
            boolean_prototype,
            error_prototype,
            map_prototype,
            set_prototype,
            promise_prototype,
            promise_constructor: None,
            error_prototypes: FxHashMap::default(),
        }
    }

    /// A native function object
    pub fn native_function(&self, name: &str, func: NativeFn, arity: usize) -> JsObjectRef {
        let name = JsString::from(name);
        let mut object = JsObject::with_prototype(Some(self.function_prototype.cheap_clone()));
        object.define_property("name", Property::readonly(JsValue::String(name.cheap_clone())));
        object.define_property("length", Property::readonly(JsValue::Number(arity as f64)));
        object.exotic = ExoticObject::Function(JsFunction::Native(NativeFunction { name, func, arity }));
        object.into_ref()
    }

    /// Register a native method on a prototype or namespace object
    pub fn register_method(&self, obj: &JsObjectRef, name: &str, func: NativeFn, arity: usize) {
        let method = self.native_function(name, func, arity);
        obj.borrow_mut()
            .define_property(name, Property::hidden(JsValue::Object(method)));
    }

    /// Plain object holding static members (`Math`, `JSON`, `console`)
    pub fn namespace_object(&self) -> JsObjectRef {
        JsObject::with_prototype(Some(self.object_prototype.cheap_clone())).into_ref()
    }

    /// A native constructor linked with its prototype object
    pub fn constructor(
        &self,
        name: &str,
        func: NativeFn,
        arity: usize,
        prototype: &JsObjectRef,
    ) -> JsObjectRef {
        let ctor = self.native_function(name, func, arity);
        ctor.borrow_mut().define_property(
            "prototype",
            Property::readonly(JsValue::Object(prototype.cheap_clone())),
        );
        prototype
            .borrow_mut()
            .define_property("constructor", Property::hidden(JsValue::Object(ctor.cheap_clone())));
        ctor
    }
}

impl Default for Realm {
    fn default() -> Self {
        Self::new()
    }
}

/// The interpreter state
pub struct Interpreter {
    pub realm: Realm,
    /// Scope holding the program-visible globals
    pub(crate) root_env: Environment,
    /// Task being evaluated
    pub(crate) task: Task,
    pub(crate) event_loop: EventLoop,
    /// Async activations waiting for a promise
    pub(crate) suspended: FxHashMap<SuspensionId, Suspended>,
    pub(crate) next_suspension: u64,
    pub(crate) policy: StepPolicy,
    pub(crate) interceptor: Rc<RefCell<dyn Interceptor>>,
    pub(crate) console: Box<dyn ConsoleProvider>,
    pub(crate) random: Box<dyn RandomProvider>,

    // ═══════════════════════════════════════════════════════════════
    // Call tracking
    // ═══════════════════════════════════════════════════════════════
    pub(crate) call_depth: usize,
    pub(crate) max_call_depth: usize,
    /// Nesting of run-to-completion calls from native code; pauses are
    /// suppressed while it is non-zero
    no_pause: usize,
    paused_at: Option<NodeRef>,
    pub(crate) program_result: Option<JsValue>,
}

impl Interpreter {
    /// Create an interpreter with the builtin globals installed
    pub fn new() -> Self {
        let mut realm = Realm::new();
        let globals = builtins::install(&mut realm);
        {
            let mut global = realm.global.borrow_mut();
            for (name, value) in &globals {
                global.define_property(name.cheap_clone(), Property::hidden(value.clone()));
            }
        }
        let root_env = Environment::root(JsValue::Object(realm.global.cheap_clone()), globals);
        let task = Task::new(root_env.cheap_clone(), EvalConfig::default());
        Interpreter {
            realm,
            root_env,
            task,
            event_loop: EventLoop::new(),
            suspended: FxHashMap::default(),
            next_suspension: 0,
            policy: StepPolicy::default(),
            interceptor: Rc::new(RefCell::new(NoopInterceptor)),
            console: Box::new(NoOpConsoleProvider),
            random: Box::new(StdRandomProvider::new()),
            call_depth: 0,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            no_pause: 0,
            paused_at: None,
            program_result: None,
        }
    }

    pub fn set_console(&mut self, console: Box<dyn ConsoleProvider>) {
        self.console = console;
    }

    pub fn set_random(&mut self, random: Box<dyn RandomProvider>) {
        self.random = random;
    }

    pub fn set_interceptor(&mut self, interceptor: Rc<RefCell<dyn Interceptor>>) {
        self.interceptor = interceptor;
    }

    pub fn set_policy(&mut self, policy: StepPolicy) {
        self.policy = policy;
    }

    pub fn policy(&self) -> &StepPolicy {
        &self.policy
    }

    pub fn set_max_call_depth(&mut self, depth: usize) {
        self.max_call_depth = depth;
    }

    /// Scope holding the program-visible globals
    pub fn global_env(&self) -> &Environment {
        &self.root_env
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Driving
    // ═══════════════════════════════════════════════════════════════════════

    /// Make `program` the current task. Nothing is evaluated until the first
    /// [`Interpreter::step`].
    pub fn start(&mut self, program: &Program) {
        self.shutdown();
        self.task = Task::with_root(self.root_env.child(), EvalConfig::default(), TaskRoot::Program);
        self.task.push_frame(Frame::Eval(program.root.cheap_clone()));
        debug!("program started");
    }

    /// Evaluate until the next pause, or until nothing is left to run.
    /// An uncaught error from any task ends the run and is returned.
    pub fn step(&mut self) -> Result<StepOutcome, JsError> {
        self.paused_at = None;
        loop {
            if self.task.is_idle() {
                if self.handle_tick() {
                    continue;
                }
                return Ok(StepOutcome::Idle);
            }
            match self.step_frame() {
                StepResult::Continue => {}
                StepResult::Pause => return Ok(StepOutcome::Paused),
                StepResult::Done(_) => self.finish_task(),
                StepResult::Error(error) => {
                    debug!(%error, "task failed");
                    self.finish_task();
                    return Err(error);
                }
            }
        }
    }

    /// Start the next queued job as the current task. Returns whether a job
    /// was taken from the queues.
    pub fn handle_tick(&mut self) -> bool {
        self.event_loop.release_due_timers();
        let Some(job) = self.event_loop.next_job() else {
            return false;
        };
        match job {
            Job::Reaction {
                reaction,
                status,
                value,
            } => self.start_reaction(reaction, status, value),
            Job::Thenable {
                promise,
                thenable,
                then,
            } => self.start_thenable(promise, thenable, then),
            Job::Timer(id) => {
                if let Some((callback, args)) = self.event_loop.take_timer_callback(id) {
                    trace!(timer = id.0, "timer fired");
                    self.start_call_task(TaskRoot::Callback, callback, args);
                }
            }
            Job::Resume { id, status, value } => self.resume_suspended(id, status, value),
        }
        true
    }

    /// Run `program` without pausing, jumping the virtual clock to each
    /// timer deadline. Returns the program's completion value.
    pub fn run(&mut self, program: &Program) -> Result<JsValue, JsError> {
        self.start(program);
        self.no_pause += 1;
        let result = self.run_until_quiet();
        self.no_pause = self.no_pause.saturating_sub(1);
        result?;
        Ok(self.program_result.clone().unwrap_or_default())
    }

    fn run_until_quiet(&mut self) -> Result<(), JsError> {
        loop {
            match self.step()? {
                StepOutcome::Paused => {}
                StepOutcome::Idle => match self.event_loop.next_deadline() {
                    Some(due) if self.event_loop.has_outstanding_work() => {
                        self.event_loop.set_now(due)
                    }
                    _ => return Ok(()),
                },
            }
        }
    }

    /// Call a function to completion from native code. Interpreted callees
    /// still report their events but never pause.
    pub fn call_function(
        &mut self,
        callee: JsValue,
        this: JsValue,
        args: &[JsValue],
    ) -> Result<JsValue, JsError> {
        let env = self.task.env.cheap_clone();
        let saved = std::mem::replace(
            &mut self.task,
            Task::with_root(env, EvalConfig::default(), TaskRoot::External),
        );
        let saved_depth = self.call_depth;
        self.no_pause += 1;
        self.push_invoke(callee, this, args.to_vec());
        // Callbacks can call back into natives (`map` inside `map`), so each
        // level nests a step loop on the host stack
        let result = stacker::maybe_grow(STACK_RED_ZONE, STACK_SEGMENT, || loop {
            match self.step_frame() {
                StepResult::Continue | StepResult::Pause => {}
                StepResult::Done(value) => break Ok(value),
                StepResult::Error(error) => break Err(error),
            }
        });
        self.no_pause = self.no_pause.saturating_sub(1);
        self.task = saved;
        self.call_depth = saved_depth;
        result
    }

    /// Cancel everything in flight: the current task, suspended activations,
    /// queued jobs and program timers
    pub fn shutdown(&mut self) {
        self.event_loop.clear();
        self.suspended.clear();
        self.task = Task::new(self.root_env.cheap_clone(), EvalConfig::default());
        self.call_depth = 0;
        self.paused_at = None;
        self.program_result = None;
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Inspection
    // ═══════════════════════════════════════════════════════════════════════

    /// Completion value of the program task, once it has finished
    pub fn program_result(&self) -> Option<&JsValue> {
        self.program_result.as_ref()
    }

    /// Node the last [`Interpreter::step`] paused on
    pub fn paused_at(&self) -> Option<&NodeRef> {
        self.paused_at.as_ref()
    }

    pub fn event_loop(&self) -> &EventLoop {
        &self.event_loop
    }

    pub fn event_loop_mut(&mut self) -> &mut EventLoop {
        &mut self.event_loop
    }

    /// A task is mid-evaluation
    pub fn is_task_active(&self) -> bool {
        !self.task.is_idle()
    }

    /// Async activations waiting for a promise to settle
    pub fn suspended_count(&self) -> usize {
        self.suspended.len()
    }

    /// Anything left that could run: the current task, queued jobs or
    /// program timers
    pub fn has_outstanding_work(&self) -> bool {
        !self.task.is_idle() || self.event_loop.has_outstanding_work()
    }

    /// Write one console line through the installed provider
    pub fn console_write(&self, level: ConsoleLevel, message: &str) {
        self.console.write(level, message);
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Events
    // ═══════════════════════════════════════════════════════════════════════

    /// Report an event that may pause. Returns `true` when evaluation should
    /// stop before the node is dispatched.
    pub(crate) fn announce(
        &mut self,
        node: &NodeRef,
        phase: Phase,
        value: Option<&JsValue>,
        site: &Site,
    ) -> bool {
        let action = self.policy.action(node.node_type(), phase, site);
        if action == StepAction::Skip {
            return false;
        }
        self.emit(node, phase, value, site, false);
        let pause = action == StepAction::Pause && self.no_pause == 0;
        if pause {
            trace!(node = %node.node_type(), "paused");
            self.paused_at = Some(node.cheap_clone());
        }
        pause
    }

    /// Report an event that never pauses
    pub(crate) fn report(
        &mut self,
        node: &NodeRef,
        phase: Phase,
        value: Option<&JsValue>,
        site: &Site,
        abrupt: bool,
    ) {
        if self.policy.action(node.node_type(), phase, site) != StepAction::Skip {
            self.emit(node, phase, value, site, abrupt);
        }
    }

    fn emit(&mut self, node: &NodeRef, phase: Phase, value: Option<&JsValue>, site: &Site, abrupt: bool) {
        let interceptor = self.interceptor.cheap_clone();
        let Ok(mut interceptor) = interceptor.try_borrow_mut() else {
            warn!(node = %node.node_type(), %phase, "interceptor busy, event dropped");
            return;
        };
        interceptor.intercept(&Interception {
            node,
            phase,
            value,
            env: &self.task.env,
            config: &self.task.config,
            site,
            abrupt,
        });
    }

    fn finish_task(&mut self) {
        let interceptor = self.interceptor.cheap_clone();
        if let Ok(mut interceptor) = interceptor.try_borrow_mut() {
            interceptor.task_finished();
        }
        self.task = Task::new(self.root_env.cheap_clone(), EvalConfig::default());
        self.call_depth = 0;
    }

    pub(crate) fn push_invoke(&mut self, callee: JsValue, this: JsValue, args: Vec<JsValue>) {
        self.task
            .push_frame(Frame::Invoke(Box::new(Invocation { callee, this, args })));
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Bindings and properties
    // ═══════════════════════════════════════════════════════════════════════

    pub(crate) fn lookup(&self, name: &JsString) -> Result<JsValue, JsError> {
        self.task
            .env
            .get(name.as_str())
            .ok_or_else(|| JsError::reference_error(name.as_str()))
    }

    /// `value[key]` for any value; primitives read through their prototypes
    pub fn get_value_property(&self, value: &JsValue, key: &str) -> Result<JsValue, JsError> {
        let prototype = match value {
            JsValue::Object(obj) => return Ok(obj.borrow().get_property(key).unwrap_or_default()),
            JsValue::String(s) => {
                if key == "length" {
                    return Ok(JsValue::Number(s.as_str().chars().count() as f64));
                }
                if let Some(index) = crate::value::array_index(key) {
                    return Ok(s
                        .as_str()
                        .chars()
                        .nth(index)
                        .map(|c| JsValue::from(c.to_string()))
                        .unwrap_or_default());
                }
                &self.realm.string_prototype
            }
            JsValue::Number(_) => &self.realm.number_prototype,
            JsValue::Boolean(_) => &self.realm.boolean_prototype,
            JsValue::Undefined | JsValue::Null => {
                return Err(JsError::type_error(format!(
                    "Cannot read properties of {} (reading '{}')",
                    value.display_string(),
                    key
                )));
            }
        };
        Ok(prototype.borrow().get_property(key).unwrap_or_default())
    }

    /// `value[key] = v`; writes to primitives are dropped
    pub fn set_value_property(&self, value: &JsValue, key: JsString, v: JsValue) -> Result<(), JsError> {
        match value {
            JsValue::Object(obj) => obj.borrow_mut().try_set_property(key, v),
            JsValue::Undefined | JsValue::Null => Err(JsError::type_error(format!(
                "Cannot set properties of {} (setting '{}')",
                value.display_string(),
                key
            ))),
            _ => Ok(()),
        }
    }

    /// Values a for-of loop or spread visits
    pub fn iterate_values(&self, value: &JsValue) -> Result<Vec<JsValue>, JsError> {
        if let JsValue::String(s) = value {
            return Ok(s.as_str().chars().map(|c| JsValue::from(c.to_string())).collect());
        }
        let entries = match value {
            JsValue::Object(obj) => match &obj.borrow().exotic {
                ExoticObject::Array(items) => return Ok(items.clone()),
                ExoticObject::Set(items) => return Ok(items.clone()),
                ExoticObject::Map(entries) => entries.clone(),
                _ => return Err(not_iterable(value)),
            },
            _ => return Err(not_iterable(value)),
        };
        Ok(entries
            .into_iter()
            .map(|(key, value)| self.create_array(vec![key, value]))
            .collect())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Object creation
    // ═══════════════════════════════════════════════════════════════════════

    pub fn create_object(&self) -> JsObjectRef {
        JsObject::with_prototype(Some(self.realm.object_prototype.cheap_clone())).into_ref()
    }

    pub fn create_array(&self, items: Vec<JsValue>) -> JsValue {
        JsValue::Object(
            JsObject {
                prototype: Some(self.realm.array_prototype.cheap_clone()),
                exotic: ExoticObject::Array(items),
                ..JsObject::default()
            }
            .into_ref(),
        )
    }

    /// An Error instance of the named kind (`TypeError`, ...)
    pub fn create_error(&self, kind: &str, message: &str) -> JsValue {
        let prototype = self
            .realm
            .error_prototypes
            .get(kind)
            .unwrap_or(&self.realm.error_prototype)
            .cheap_clone();
        let mut error = JsObject::with_prototype(Some(prototype));
        error.exotic = ExoticObject::Error;
        error.define_property("message", Property::hidden(JsValue::from(message)));
        JsValue::Object(error.into_ref())
    }

    /// The value interpreted code sees for an error: thrown values as they
    /// were, runtime errors as Error objects
    pub fn error_value(&self, error: &JsError) -> JsValue {
        match error.kind_and_message() {
            Some((kind, message)) => self.create_error(kind, &message),
            None => error.to_value(),
        }
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

fn not_iterable(value: &JsValue) -> JsError {
    JsError::type_error(format!("{} is not iterable", value.display_string()))
}
