//! Promise state machine
//!
//! Promises settle once. Settling moves every registered reaction into the
//! microtask queue; reactions registered on an already settled promise are
//! queued immediately. Handlers run as tasks of their own so interpreted
//! handler bodies stay steppable, native handlers simply return their result.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;

use crate::error::JsError;
use crate::interpreter::Interpreter;
use crate::interpreter::eval_stack::{EvalConfig, SuspensionId, Task, TaskRoot};
use crate::value::{
    CheapClone, ExoticObject, JsFunction, JsObject, JsObjectRef, JsValue, PromiseRef,
    PromiseState, PromiseStatus,
};

use super::event_loop::Job;

/// What happens when a promise settles
#[derive(Debug, Clone)]
pub enum PromiseReaction {
    /// `then`/`catch`: run the matching handler, settle `derived` with its result
    Then {
        derived: Option<JsObjectRef>,
        on_fulfilled: JsValue,
        on_rejected: JsValue,
    },
    /// `finally`: run the handler, then pass the outcome through to `derived`
    Finally {
        derived: JsObjectRef,
        on_finally: JsValue,
    },
    /// Resume a suspended async activation
    Await(SuspensionId),
    /// Settle another promise the same way
    Forward(JsObjectRef),
    /// One input of `Promise.all`/`allSettled`/`race`
    Combinator {
        aggregate: Rc<RefCell<Aggregate>>,
        index: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombinatorKind {
    All,
    AllSettled,
    Race,
}

/// Shared state of a promise combinator
#[derive(Debug)]
pub struct Aggregate {
    pub kind: CombinatorKind,
    pub derived: JsObjectRef,
    pub values: Vec<JsValue>,
    pub remaining: usize,
    pub settled: bool,
}

/// Promise state behind an object, if it is a promise
pub fn promise_state(obj: &JsObjectRef) -> Option<PromiseRef> {
    match &obj.borrow().exotic {
        ExoticObject::Promise(state) => Some(state.cheap_clone()),
        _ => None,
    }
}

impl Interpreter {
    /// Create a new pending promise
    pub fn create_promise(&self) -> JsObjectRef {
        JsObject {
            prototype: Some(self.realm.promise_prototype.cheap_clone()),
            exotic: ExoticObject::Promise(Rc::new(RefCell::new(PromiseState::default()))),
            ..JsObject::default()
        }
        .into_ref()
    }

    /// The resolve/reject pair handed to an executor
    pub fn resolving_functions(&self, promise: &JsObjectRef) -> (JsValue, JsValue) {
        let make = |func: JsFunction| {
            JsValue::Object(
                JsObject {
                    prototype: Some(self.realm.function_prototype.cheap_clone()),
                    exotic: ExoticObject::Function(func),
                    ..JsObject::default()
                }
                .into_ref(),
            )
        };
        (
            make(JsFunction::PromiseResolve(promise.cheap_clone())),
            make(JsFunction::PromiseReject(promise.cheap_clone())),
        )
    }

    /// Resolve: adopt promises and thenables, fulfill with anything else
    pub fn resolve_promise(&mut self, promise: &JsObjectRef, value: JsValue) {
        if let JsValue::Object(obj) = &value {
            if Rc::ptr_eq(obj, promise) {
                let error = self.error_value(&JsError::type_error(
                    "Chaining cycle detected for promise #<Promise>",
                ));
                self.reject_promise(promise, error);
                return;
            }
            if let Some(state) = promise_state(obj) {
                self.add_reaction(&state, PromiseReaction::Forward(promise.cheap_clone()));
                return;
            }
            let then = obj.borrow().get_property("then");
            if let Some(then) = then.filter(JsValue::is_callable) {
                self.event_loop.enqueue_microtask(Job::Thenable {
                    promise: promise.cheap_clone(),
                    thenable: value,
                    then,
                });
                return;
            }
        }
        self.settle_promise(promise, PromiseStatus::Fulfilled, value);
    }

    pub fn reject_promise(&mut self, promise: &JsObjectRef, reason: JsValue) {
        self.settle_promise(promise, PromiseStatus::Rejected, reason);
    }

    fn settle_promise(&mut self, promise: &JsObjectRef, status: PromiseStatus, value: JsValue) {
        let Some(state) = promise_state(promise) else {
            return;
        };
        let (reactions, handled) = {
            let mut state = state.borrow_mut();
            if state.status != PromiseStatus::Pending {
                return;
            }
            state.status = status;
            state.result = value.clone();
            (std::mem::take(&mut state.reactions), state.handled)
        };
        if status == PromiseStatus::Rejected && !handled {
            debug!(reason = %value.display_string(), "promise rejected without a handler");
        }
        for reaction in reactions {
            self.event_loop.enqueue_microtask(Job::Reaction {
                reaction,
                status,
                value: value.clone(),
            });
        }
    }

    /// Register a reaction; queue it right away if the promise has settled
    pub(crate) fn add_reaction(&mut self, state: &PromiseRef, reaction: PromiseReaction) {
        let settled = {
            let mut state = state.borrow_mut();
            state.handled = true;
            match state.status {
                PromiseStatus::Pending => {
                    state.reactions.push(reaction);
                    return;
                }
                status => (status, state.result.clone()),
            }
        };
        let (status, value) = settled;
        self.event_loop.enqueue_microtask(Job::Reaction {
            reaction,
            status,
            value,
        });
    }

    /// `promise.then(on_fulfilled, on_rejected)`; returns the derived promise
    pub fn promise_then(
        &mut self,
        promise: &JsObjectRef,
        on_fulfilled: JsValue,
        on_rejected: JsValue,
    ) -> Result<JsObjectRef, JsError> {
        let state = promise_state(promise)
            .ok_or_else(|| JsError::type_error("Promise.prototype.then called on a non-promise"))?;
        let derived = self.create_promise();
        self.add_reaction(
            &state,
            PromiseReaction::Then {
                derived: Some(derived.cheap_clone()),
                on_fulfilled,
                on_rejected,
            },
        );
        Ok(derived)
    }

    pub fn promise_finally(
        &mut self,
        promise: &JsObjectRef,
        on_finally: JsValue,
    ) -> Result<JsObjectRef, JsError> {
        let state = promise_state(promise).ok_or_else(|| {
            JsError::type_error("Promise.prototype.finally called on a non-promise")
        })?;
        let derived = self.create_promise();
        self.add_reaction(
            &state,
            PromiseReaction::Finally {
                derived: derived.cheap_clone(),
                on_finally,
            },
        );
        Ok(derived)
    }

    /// `Promise.resolve(value)`: promises pass through unchanged
    pub fn promise_resolve(&mut self, value: JsValue) -> JsObjectRef {
        if let JsValue::Object(obj) = &value {
            if promise_state(obj).is_some() {
                return obj.cheap_clone();
            }
        }
        let promise = self.create_promise();
        self.resolve_promise(&promise, value);
        promise
    }

    /// `Promise.all`, `Promise.allSettled` and `Promise.race`
    pub fn promise_combinator(&mut self, kind: CombinatorKind, items: Vec<JsValue>) -> JsObjectRef {
        let derived = self.create_promise();
        if items.is_empty() {
            if kind != CombinatorKind::Race {
                let empty = self.create_array(Vec::new());
                self.resolve_promise(&derived, empty);
            }
            return derived;
        }
        let aggregate = Rc::new(RefCell::new(Aggregate {
            kind,
            derived: derived.cheap_clone(),
            values: vec![JsValue::Undefined; items.len()],
            remaining: items.len(),
            settled: false,
        }));
        for (index, item) in items.into_iter().enumerate() {
            let input = self.promise_resolve(item);
            if let Some(state) = promise_state(&input) {
                self.add_reaction(
                    &state,
                    PromiseReaction::Combinator {
                        aggregate: aggregate.cheap_clone(),
                        index,
                    },
                );
            }
        }
        derived
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Jobs
    // ═══════════════════════════════════════════════════════════════════════

    /// Run a reaction job. Handlers that need evaluation become the current
    /// task; everything else completes immediately.
    pub(crate) fn start_reaction(
        &mut self,
        reaction: PromiseReaction,
        status: PromiseStatus,
        value: JsValue,
    ) {
        match reaction {
            PromiseReaction::Then {
                derived,
                on_fulfilled,
                on_rejected,
            } => {
                let handler = match status {
                    PromiseStatus::Rejected => on_rejected,
                    _ => on_fulfilled,
                };
                if handler.is_callable() {
                    self.start_call_task(
                        TaskRoot::Settle {
                            derived,
                            passthrough: None,
                        },
                        handler,
                        vec![value],
                    );
                } else if let Some(derived) = derived {
                    self.pass_through(&derived, status, value);
                }
            }
            PromiseReaction::Finally {
                derived,
                on_finally,
            } => {
                if on_finally.is_callable() {
                    self.start_call_task(
                        TaskRoot::Settle {
                            derived: Some(derived),
                            passthrough: Some((status, value)),
                        },
                        on_finally,
                        Vec::new(),
                    );
                } else {
                    self.pass_through(&derived, status, value);
                }
            }
            PromiseReaction::Await(id) => {
                self.event_loop
                    .enqueue_callback(Job::Resume { id, status, value });
            }
            PromiseReaction::Forward(target) => self.pass_through(&target, status, value),
            PromiseReaction::Combinator { aggregate, index } => {
                self.combine(&aggregate, index, status, value)
            }
        }
    }

    /// Adopt a foreign thenable by calling its `then` with fresh resolvers
    pub(crate) fn start_thenable(&mut self, promise: JsObjectRef, thenable: JsValue, then: JsValue) {
        let (resolve, reject) = self.resolving_functions(&promise);
        self.task = Task::with_root(
            self.root_env.cheap_clone(),
            EvalConfig::default(),
            TaskRoot::Thenable { promise },
        );
        self.push_invoke(then, thenable, vec![resolve, reject]);
    }

    pub(crate) fn start_call_task(&mut self, root: TaskRoot, callee: JsValue, args: Vec<JsValue>) {
        self.task = Task::with_root(self.root_env.cheap_clone(), EvalConfig::default(), root);
        self.push_invoke(callee, JsValue::Undefined, args);
    }

    pub(crate) fn pass_through(&mut self, derived: &JsObjectRef, status: PromiseStatus, value: JsValue) {
        match status {
            PromiseStatus::Rejected => self.reject_promise(derived, value),
            _ => self.resolve_promise(derived, value),
        }
    }

    fn combine(
        &mut self,
        aggregate: &Rc<RefCell<Aggregate>>,
        index: usize,
        status: PromiseStatus,
        value: JsValue,
    ) {
        let kind = aggregate.borrow().kind;
        if aggregate.borrow().settled {
            return;
        }
        let entry = match (kind, status) {
            (CombinatorKind::AllSettled, PromiseStatus::Rejected) => {
                self.settled_record("rejected", "reason", value)
            }
            (CombinatorKind::AllSettled, _) => self.settled_record("fulfilled", "value", value),
            (CombinatorKind::All, PromiseStatus::Fulfilled) => value,
            (_, status) => {
                let derived = {
                    let mut aggregate = aggregate.borrow_mut();
                    aggregate.settled = true;
                    aggregate.derived.cheap_clone()
                };
                self.pass_through(&derived, status, value);
                return;
            }
        };
        let finished = {
            let mut aggregate = aggregate.borrow_mut();
            if let Some(slot) = aggregate.values.get_mut(index) {
                *slot = entry;
            }
            aggregate.remaining = aggregate.remaining.saturating_sub(1);
            if aggregate.remaining == 0 {
                aggregate.settled = true;
                Some((
                    aggregate.derived.cheap_clone(),
                    std::mem::take(&mut aggregate.values),
                ))
            } else {
                None
            }
        };
        if let Some((derived, values)) = finished {
            let array = self.create_array(values);
            self.resolve_promise(&derived, array);
        }
    }

    fn settled_record(&mut self, status: &str, key: &str, value: JsValue) -> JsValue {
        let record = self.create_object();
        {
            let mut record = record.borrow_mut();
            record.set_property("status", JsValue::from(status));
            record.set_property(key, value);
        }
        JsValue::Object(record)
    }
}
