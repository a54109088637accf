//! Step engine
//!
//! [`Interpreter::step_frame`] pops one frame and executes it. Abrupt
//! completions (return, throw, break, continue, optional-chain short circuits)
//! unwind the frame stack until a frame that handles them; awaits move the
//! innermost async activation aside until its promise settles.

use crate::ast::{LogicalOperator, NodeKind, NodeRef, UpdateOperator, VariableKind};
use crate::error::JsError;
use crate::flow::{BlockKind, PathToken, Phase};
use crate::runtime::promise::{PromiseReaction, promise_state};
use crate::value::{CheapClone, JsValue, PromiseStatus};

use super::Interpreter;
use super::dispatch::{is_anonymous_function, statement_list};
use super::eval_stack::{
    Abrupt, ArgumentList, AssignTarget, CallKind, CallTarget, ElementList, Frame, Invocation,
    LoopFrame, LoopStage, PendingProperty, PropertyList, StepResult, Suspended, SuspensionId, Task,
    TaskRoot, TryStage,
};
use super::function::{BindMode, pattern_names, property_key_name};
use super::intercept::{Interception, Site};

impl Interpreter {
    /// Execute the top frame of the current task
    pub(crate) fn step_frame(&mut self) -> StepResult {
        let Some(frame) = self.task.frames.pop() else {
            return StepResult::Done(JsValue::Undefined);
        };
        match self.execute_frame(frame) {
            Ok(result) => result,
            Err(error) => self.unwind(Abrupt::Throw(error)),
        }
    }

    fn execute_frame(&mut self, frame: Frame) -> Result<StepResult, JsError> {
        match frame {
            // ═══════════════════════════════════════════════════════════════
            // Node Entry
            // ═══════════════════════════════════════════════════════════════
            Frame::Eval(node) => return self.step_eval(node),
            Frame::Dispatch(node) => return self.dispatch(&node),
            Frame::Declarator { node, kind } => return self.step_declarator(node, kind),
            Frame::DispatchDeclarator { node, kind } => {
                return self.dispatch_declarator(node, kind);
            }
            Frame::EnterBlock { node, kind } => return self.step_enter_block(node, kind),
            Frame::Exit { node, site } => {
                let value = if node.node_type().is_expression() {
                    self.task.peek_value().cloned()
                } else {
                    None
                };
                self.report(&node, Phase::Exit, value.as_ref(), &site, false);
            }

            // ═══════════════════════════════════════════════════════════════
            // Statements
            // ═══════════════════════════════════════════════════════════════
            Frame::Statements { node, index, record } => {
                if let Some(statement) = statement_list(&node).get(index).cloned() {
                    let expression = matches!(statement.kind, NodeKind::ExpressionStatement { .. });
                    self.task.push_frame(Frame::Statements {
                        node,
                        index: index + 1,
                        record,
                    });
                    if record && expression {
                        self.task.push_frame(Frame::RecordCompletion);
                    }
                    self.task.push_frame(Frame::Eval(statement));
                }
            }
            Frame::RecordCompletion => {
                if let Some(value) = self.task.statement_value.take() {
                    self.task.completion = Some(value);
                }
            }
            Frame::StatementValue => {
                let value = self.task.pop_value();
                self.task.statement_value = Some(value);
            }
            Frame::Discard => {
                self.task.pop_value();
            }
            Frame::RestoreEnv(env) => self.task.env = env,
            Frame::Declarators { node, index } => {
                if let NodeKind::VariableDeclaration { declarations, kind } = &node.kind {
                    if let Some(declarator) = declarations.get(index).cloned() {
                        let kind = *kind;
                        self.task.push_frame(Frame::Declarators {
                            node: node.cheap_clone(),
                            index: index + 1,
                        });
                        self.task.push_frame(Frame::Declarator {
                            node: declarator,
                            kind,
                        });
                    }
                }
            }
            Frame::Bind { node, kind } => self.bind_declarator(&node, kind)?,
            Frame::IfBranch(node) => {
                let test = self.task.pop_value();
                if let NodeKind::IfStatement {
                    consequent,
                    alternate,
                    ..
                } = &node.kind
                {
                    if test.to_boolean() {
                        self.task.push_frame(Frame::EnterBlock {
                            node: consequent.cheap_clone(),
                            kind: BlockKind::If,
                        });
                    } else if let Some(alternate) = alternate {
                        self.task.push_frame(Frame::EnterBlock {
                            node: alternate.cheap_clone(),
                            kind: BlockKind::Else,
                        });
                    }
                }
            }
            Frame::Loop(state) => return self.step_loop(state),
            Frame::Return => {
                let value = self.task.pop_value();
                return Ok(self.unwind(Abrupt::Return(value)));
            }
            Frame::Throw => {
                let value = self.task.pop_value();
                return Ok(self.unwind(Abrupt::Throw(JsError::thrown(value))));
            }
            Frame::TryHandler { node, .. } => {
                if let NodeKind::TryStatement {
                    finalizer: Some(finalizer),
                    ..
                } = &node.kind
                {
                    self.task.push_frame(Frame::Finally { pending: None });
                    self.task.push_frame(Frame::Eval(finalizer.cheap_clone()));
                }
            }
            Frame::Finally { pending } => {
                if let Some(abrupt) = pending {
                    return Ok(self.unwind(abrupt));
                }
            }
            Frame::SwitchStart(node) => {
                let discriminant = self.task.pop_value();
                self.task.push_frame(Frame::SwitchMatch {
                    node,
                    discriminant,
                    index: 0,
                });
            }
            Frame::SwitchMatch {
                node,
                discriminant,
                index,
            } => self.switch_match(node, discriminant, index),
            Frame::SwitchCompare {
                node,
                discriminant,
                index,
            } => {
                let test = self.task.pop_value();
                if discriminant.strict_equals(&test) {
                    self.task.push_frame(Frame::SwitchBody {
                        node,
                        case: index,
                        statement: 0,
                    });
                } else {
                    self.task.push_frame(Frame::SwitchMatch {
                        node,
                        discriminant,
                        index: index + 1,
                    });
                }
            }
            Frame::SwitchBody {
                node,
                case,
                statement,
            } => self.switch_body(node, case, statement),

            // ═══════════════════════════════════════════════════════════════
            // Expressions
            // ═══════════════════════════════════════════════════════════════
            Frame::Binary(op) => {
                let right = self.task.pop_value();
                let left = self.task.pop_value();
                let value = self.binary_op(op, &left, &right)?;
                self.task.push_value(value);
            }
            Frame::Logical(node) => {
                let NodeKind::LogicalExpression {
                    operator, right, ..
                } = &node.kind
                else {
                    return Err(JsError::internal_error("expected a logical expression"));
                };
                let left = self.task.pop_value();
                if short_circuits(*operator, &left) {
                    self.task.push_value(left);
                } else {
                    self.task.push_frame(Frame::Eval(right.cheap_clone()));
                }
            }
            Frame::Unary(op) => {
                let operand = self.task.pop_value();
                let value = self.unary_op(op, &operand);
                self.task.push_value(value);
            }
            Frame::Conditional(node) => {
                if let NodeKind::ConditionalExpression {
                    consequent,
                    alternate,
                    ..
                } = &node.kind
                {
                    let branch = if self.task.pop_value().to_boolean() {
                        consequent
                    } else {
                        alternate
                    };
                    self.task.push_frame(Frame::Eval(branch.cheap_clone()));
                }
            }
            Frame::MemberAccess(node) => return self.member_access(&node),
            Frame::MemberGet(_) => {
                let key = self.task.pop_value();
                let object = self.task.pop_value();
                let value = self.get_value_property(&object, key.to_js_string().as_str())?;
                self.task.push_value(value);
            }
            Frame::ChainEnd { .. } => {}
            Frame::CallMember(node) => return self.call_member(&node),
            Frame::CallMemberComputed(node) => {
                let key = self.task.pop_value();
                let object = self.task.pop_value();
                let method = self.get_value_property(&object, key.to_js_string().as_str())?;
                return Ok(self.prepare_call(&node, method, object));
            }
            Frame::CallCallee(node) => {
                let callee = self.task.pop_value();
                return Ok(self.prepare_call(&node, callee, JsValue::Undefined));
            }
            Frame::NewCallee(node) => {
                let callee = self.task.pop_value();
                self.push_arguments(&node, CallTarget::New { callee });
            }
            Frame::Arguments(list) => self.step_arguments(list)?,
            Frame::MemberKey(node) => {
                if let NodeKind::MemberExpression {
                    property, computed, ..
                } = &node.kind
                {
                    if *computed {
                        self.task.push_frame(Frame::Eval(property.cheap_clone()));
                    } else {
                        let name = property
                            .identifier_name()
                            .ok_or_else(|| JsError::internal_error("member without a name"))?;
                        self.task.push_value(JsValue::String(name.cheap_clone()));
                    }
                }
            }
            Frame::LoadMember => {
                let len = self.task.values.len();
                let reference = len
                    .checked_sub(2)
                    .and_then(|at| self.task.values.get(at..))
                    .and_then(|pair| match pair {
                        [object, key] => Some((object.clone(), key.clone())),
                        _ => None,
                    });
                let Some((object, key)) = reference else {
                    return Err(JsError::internal_error("member reference missing"));
                };
                let value = self.get_value_property(&object, key.to_js_string().as_str())?;
                self.task.push_value(value);
            }
            Frame::LoadBinding(name) => {
                let value = self.lookup(&name)?;
                self.task.push_value(value);
            }
            Frame::AssignComplete {
                node,
                target,
                compound,
            } => {
                let mut value = self.task.pop_value();
                if let Some(op) = compound {
                    let current = self.task.pop_value();
                    value = self.binary_op(op, &current, &value)?;
                } else if let (
                    AssignTarget::Binding(name),
                    NodeKind::AssignmentExpression { right, .. },
                ) = (&target, &node.kind)
                {
                    if is_anonymous_function(right) {
                        self.set_function_name(&value, name);
                    }
                }
                self.report(&node, Phase::Value, Some(&value), &Site::Node, false);
                self.store(target, value.clone())?;
                self.task.push_value(value);
            }
            Frame::LogicalAssign { node, target } => {
                let NodeKind::AssignmentExpression {
                    operator, right, ..
                } = &node.kind
                else {
                    return Err(JsError::internal_error("expected an assignment"));
                };
                let current = self.task.pop_value();
                let short = operator
                    .logical()
                    .is_some_and(|op| short_circuits(op, &current));
                if short {
                    if matches!(target, AssignTarget::Member) {
                        self.task.pop_value();
                        self.task.pop_value();
                    }
                    self.task.push_value(current);
                } else {
                    let right = right.cheap_clone();
                    self.task.push_frame(Frame::AssignComplete {
                        node,
                        target,
                        compound: None,
                    });
                    self.task.push_frame(Frame::Eval(right));
                }
            }
            Frame::UpdateComplete { node, target } => {
                let NodeKind::UpdateExpression {
                    operator, prefix, ..
                } = &node.kind
                else {
                    return Err(JsError::internal_error("expected an update expression"));
                };
                let old = self.task.pop_value().to_number();
                let new = match operator {
                    UpdateOperator::Increment => old + 1.0,
                    UpdateOperator::Decrement => old - 1.0,
                };
                let result = if *prefix { new } else { old };
                self.report(&node, Phase::Value, Some(&JsValue::Number(new)), &Site::Node, false);
                self.store(target, JsValue::Number(new))?;
                self.task.push_value(JsValue::Number(result));
            }
            Frame::DeleteMember => {
                let key = self.task.pop_value();
                let object = self.task.pop_value();
                let deleted = match &object {
                    JsValue::Object(obj) => obj.borrow_mut().delete_property(key.to_js_string().as_str()),
                    JsValue::Undefined | JsValue::Null => {
                        return Err(JsError::type_error("Cannot convert undefined or null to object"));
                    }
                    _ => true,
                };
                self.task.push_value(JsValue::Boolean(deleted));
            }
            Frame::ArrayElements(list) => self.step_array_elements(list)?,
            Frame::ObjectProperties(list) => self.step_object_properties(list)?,
            Frame::Template(node) => {
                let NodeKind::TemplateLiteral {
                    quasis,
                    expressions,
                } = &node.kind
                else {
                    return Err(JsError::internal_error("expected a template literal"));
                };
                let split = self.task.values.len().saturating_sub(expressions.len());
                let values = self.task.values.split_off(split);
                let mut text = String::new();
                for (index, quasi) in quasis.iter().enumerate() {
                    if let NodeKind::TemplateElement { value } = &quasi.kind {
                        text.push_str(value.cooked.as_deref().unwrap_or(&value.raw));
                    }
                    if let Some(value) = values.get(index) {
                        text.push_str(value.to_js_string().as_str());
                    }
                }
                self.task.push_value(JsValue::from(text));
            }
            Frame::AwaitValue(node) => return self.step_await(node),
            Frame::ClassDefine(node) => {
                let (declaration, class) = match &node.kind {
                    NodeKind::ClassDeclaration(class) => (true, class),
                    NodeKind::ClassExpression(class) => (false, class),
                    _ => return Err(JsError::internal_error("expected a class")),
                };
                let name = class.id.as_ref().and_then(|id| id.identifier_name()).cloned();
                let parent = class.super_class.is_some().then(|| self.task.pop_value());
                let value = self.define_class(&node, parent)?;
                match (declaration, name) {
                    (true, Some(name)) => self.task.env.declare(name, value, true),
                    (true, None) => {}
                    (false, _) => self.task.push_value(value),
                }
            }

            // ═══════════════════════════════════════════════════════════════
            // Calls and Tasks
            // ═══════════════════════════════════════════════════════════════
            Frame::Invoke(invocation) => {
                let Invocation { callee, this, args } = *invocation;
                self.begin_call(callee, this, args, None)?;
            }
            Frame::CallBoundary(boundary) => {
                let value = if boundary.expression_body {
                    self.task.pop_value()
                } else {
                    JsValue::Undefined
                };
                self.finish_call(*boundary, value);
            }
            Frame::PromiseExecutor(promise) => {
                self.task.pop_value();
                self.task.push_value(JsValue::Object(promise));
            }
            Frame::TaskRoot(root) => return Ok(self.complete_task(root)),
        }
        Ok(StepResult::Continue)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Unwinding
    // ═══════════════════════════════════════════════════════════════════════

    /// Propagate an abrupt completion down the frame stack
    pub(crate) fn unwind(&mut self, mut abrupt: Abrupt) -> StepResult {
        loop {
            let Some(frame) = self.task.frames.pop() else {
                return match abrupt {
                    Abrupt::Throw(error) => StepResult::Error(error),
                    other => StepResult::Error(JsError::internal_error(format!(
                        "{:?} escaped its task",
                        other
                    ))),
                };
            };
            match frame {
                Frame::Exit { node, site } => {
                    self.report(&node, Phase::Exit, None, &site, true);
                }
                Frame::RestoreEnv(env) => self.task.env = env,
                Frame::Loop(mut state) => match abrupt {
                    Abrupt::Break => return StepResult::Continue,
                    Abrupt::Continue => {
                        state.stage = match state.node.kind {
                            NodeKind::ForInStatement { .. } | NodeKind::ForOfStatement { .. } => {
                                LoopStage::Iterate
                            }
                            _ => LoopStage::AfterBody,
                        };
                        self.task.push_frame(Frame::Loop(state));
                        return StepResult::Continue;
                    }
                    other => abrupt = other,
                },
                Frame::SwitchBody { .. } if matches!(abrupt, Abrupt::Break) => {
                    return StepResult::Continue;
                }
                Frame::ChainEnd { values_len } if matches!(abrupt, Abrupt::ShortCircuit) => {
                    self.task.values.truncate(values_len);
                    self.task.push_value(JsValue::Undefined);
                    return StepResult::Continue;
                }
                Frame::TryHandler {
                    node,
                    stage,
                    values_len,
                    env,
                } => {
                    let NodeKind::TryStatement {
                        handler, finalizer, ..
                    } = &node.kind
                    else {
                        continue;
                    };
                    self.task.values.truncate(values_len);
                    self.task.env = env.cheap_clone();
                    if let (TryStage::Block, Abrupt::Throw(error), Some(handler)) =
                        (stage, &abrupt, handler)
                    {
                        let value = self.error_value(error);
                        let handler = handler.cheap_clone();
                        self.task.push_frame(Frame::TryHandler {
                            node: node.cheap_clone(),
                            stage: TryStage::Catch,
                            values_len,
                            env,
                        });
                        self.task.push_value(value);
                        self.task.push_frame(Frame::Eval(handler));
                        return StepResult::Continue;
                    }
                    if let Some(finalizer) = finalizer {
                        let finalizer = finalizer.cheap_clone();
                        self.task.push_frame(Frame::Finally {
                            pending: Some(abrupt),
                        });
                        self.task.push_frame(Frame::Eval(finalizer));
                        return StepResult::Continue;
                    }
                }
                Frame::CallBoundary(boundary) => {
                    let error = match abrupt {
                        Abrupt::Return(value) => {
                            self.finish_call(*boundary, value);
                            return StepResult::Continue;
                        }
                        Abrupt::Throw(error) => error,
                        Abrupt::Break | Abrupt::Continue | Abrupt::ShortCircuit => {
                            JsError::syntax_error("Illegal break statement", 0, 0)
                        }
                    };
                    match self.fail_call(*boundary, error) {
                        Some(error) => abrupt = Abrupt::Throw(error),
                        None => return StepResult::Continue,
                    }
                }
                Frame::PromiseExecutor(promise) => {
                    if let Abrupt::Throw(error) = &abrupt {
                        let reason = self.error_value(error);
                        self.reject_promise(&promise, reason);
                        self.task.push_value(JsValue::Object(promise));
                        return StepResult::Continue;
                    }
                }
                Frame::TaskRoot(root) => return self.fail_task(root, abrupt),
                _ => {}
            }
        }
    }

    fn complete_task(&mut self, root: TaskRoot) -> StepResult {
        match root {
            TaskRoot::Program => {
                let result = self.task.completion.take().unwrap_or_default();
                self.program_result = Some(result.clone());
                StepResult::Done(result)
            }
            TaskRoot::Callback | TaskRoot::Thenable { .. } => StepResult::Done(JsValue::Undefined),
            TaskRoot::Settle {
                derived,
                passthrough,
            } => {
                let value = self.task.pop_value();
                match (derived, passthrough) {
                    (Some(derived), Some((status, original))) => {
                        self.pass_through(&derived, status, original)
                    }
                    (Some(derived), None) => self.resolve_promise(&derived, value),
                    (None, _) => {}
                }
                StepResult::Done(JsValue::Undefined)
            }
            TaskRoot::External => StepResult::Done(self.task.pop_value()),
        }
    }

    fn fail_task(&mut self, root: TaskRoot, abrupt: Abrupt) -> StepResult {
        let error = match abrupt {
            Abrupt::Throw(error) => error,
            Abrupt::Return(_) => JsError::syntax_error("Illegal return statement", 0, 0),
            Abrupt::Break => JsError::syntax_error("Illegal break statement", 0, 0),
            Abrupt::Continue => JsError::syntax_error("Illegal continue statement", 0, 0),
            Abrupt::ShortCircuit => JsError::internal_error("optional chain outside of a chain"),
        };
        match root {
            TaskRoot::Program | TaskRoot::Callback | TaskRoot::External => StepResult::Error(error),
            TaskRoot::Settle {
                derived: Some(derived),
                ..
            }
            | TaskRoot::Thenable { promise: derived } => {
                let reason = self.error_value(&error);
                self.reject_promise(&derived, reason);
                StepResult::Done(JsValue::Undefined)
            }
            TaskRoot::Settle { derived: None, .. } => StepResult::Done(JsValue::Undefined),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Statements
    // ═══════════════════════════════════════════════════════════════════════

    fn bind_declarator(&mut self, node: &NodeRef, kind: VariableKind) -> Result<(), JsError> {
        let value = self.task.pop_value();
        let NodeKind::VariableDeclarator { id, init } = &node.kind else {
            return Err(JsError::internal_error("expected a variable declarator"));
        };
        if let (Some(init), Some(name)) = (init, id.identifier_name()) {
            if is_anonymous_function(init) {
                self.set_function_name(&value, name);
            }
        }
        self.report(node, Phase::Value, Some(&value), &Site::Node, false);
        if init.is_none() && kind == VariableKind::Var {
            return Ok(());
        }
        let env = self.task.env.cheap_clone();
        self.destructure(id, value, &env, BindMode::for_kind(kind))
    }

    fn step_loop(&mut self, mut state: Box<LoopFrame>) -> Result<StepResult, JsError> {
        let node = state.node.cheap_clone();
        match &node.kind {
            NodeKind::ForStatement {
                init,
                test,
                update,
                body,
            } => loop {
                match state.stage {
                    LoopStage::Start => {
                        self.copy_iteration_env(init.as_ref());
                        state.stage = LoopStage::Test;
                    }
                    LoopStage::Test => match test {
                        Some(test) => {
                            state.stage = LoopStage::AfterTest;
                            self.task.push_frame(Frame::Loop(state));
                            self.task.push_frame(Frame::Eval(test.cheap_clone()));
                            return Ok(StepResult::Continue);
                        }
                        None => state.stage = LoopStage::Body,
                    },
                    LoopStage::AfterTest => {
                        if !self.task.pop_value().to_boolean() {
                            return Ok(StepResult::Continue);
                        }
                        state.stage = LoopStage::Body;
                    }
                    LoopStage::Body => {
                        state.stage = LoopStage::AfterBody;
                        self.task.push_frame(Frame::Loop(state));
                        self.task.push_frame(Frame::EnterBlock {
                            node: body.cheap_clone(),
                            kind: BlockKind::For,
                        });
                        return Ok(StepResult::Continue);
                    }
                    LoopStage::AfterBody => {
                        self.copy_iteration_env(init.as_ref());
                        state.stage = LoopStage::Test;
                        if let Some(update) = update {
                            self.task.push_frame(Frame::Loop(state));
                            self.task.push_frame(Frame::Discard);
                            self.task.push_frame(Frame::Eval(update.cheap_clone()));
                            return Ok(StepResult::Continue);
                        }
                    }
                    LoopStage::Iterate => {
                        return Err(JsError::internal_error("for loop in iteration stage"));
                    }
                }
            },

            NodeKind::WhileStatement { test, body } => {
                match state.stage {
                    LoopStage::AfterTest => {
                        if !self.task.pop_value().to_boolean() {
                            return Ok(StepResult::Continue);
                        }
                        state.stage = LoopStage::AfterBody;
                        self.task.push_frame(Frame::Loop(state));
                        self.task.push_frame(Frame::EnterBlock {
                            node: body.cheap_clone(),
                            kind: BlockKind::While,
                        });
                    }
                    _ => {
                        state.stage = LoopStage::AfterTest;
                        self.task.push_frame(Frame::Loop(state));
                        self.task.push_frame(Frame::Eval(test.cheap_clone()));
                    }
                }
                Ok(StepResult::Continue)
            }

            NodeKind::DoWhileStatement { body, test } => {
                match state.stage {
                    LoopStage::AfterBody => {
                        state.stage = LoopStage::AfterTest;
                        self.task.push_frame(Frame::Loop(state));
                        self.task.push_frame(Frame::Eval(test.cheap_clone()));
                    }
                    LoopStage::AfterTest if !self.task.pop_value().to_boolean() => {}
                    _ => {
                        state.stage = LoopStage::AfterBody;
                        self.task.push_frame(Frame::Loop(state));
                        self.task.push_frame(Frame::EnterBlock {
                            node: body.cheap_clone(),
                            kind: BlockKind::DoWhile,
                        });
                    }
                }
                Ok(StepResult::Continue)
            }

            NodeKind::ForInStatement { left, body, .. } | NodeKind::ForOfStatement { left, body, .. } => {
                let of = matches!(node.kind, NodeKind::ForOfStatement { .. });
                if state.stage == LoopStage::Start {
                    let source = self.task.pop_value();
                    state.items = if of {
                        self.iterate_values(&source)?
                    } else {
                        enumerable_keys(&source)
                    };
                    state.stage = LoopStage::Iterate;
                }
                let Some(item) = state.items.get(state.index).cloned() else {
                    return Ok(StepResult::Continue);
                };
                state.index += 1;
                let outer = state.env.cheap_clone();
                self.task.env = outer.child();
                self.task.push_frame(Frame::Loop(state));
                self.task.push_frame(Frame::RestoreEnv(outer));
                self.bind_loop_target(left, item)?;
                self.task.push_frame(Frame::EnterBlock {
                    node: body.cheap_clone(),
                    kind: if of { BlockKind::ForOf } else { BlockKind::ForIn },
                });
                Ok(StepResult::Continue)
            }

            _ => Err(JsError::internal_error("loop frame without a loop node")),
        }
    }

    /// Fresh scope per iteration for `let` loop variables, seeded with the
    /// current values
    fn copy_iteration_env(&mut self, init: Option<&NodeRef>) {
        let Some(NodeKind::VariableDeclaration {
            declarations,
            kind: VariableKind::Let,
        }) = init.map(|init| &init.kind)
        else {
            return;
        };
        let current = self.task.env.cheap_clone();
        let Some(parent) = current.parent() else {
            return;
        };
        let mut names = Vec::new();
        for declarator in declarations {
            if let NodeKind::VariableDeclarator { id, .. } = &declarator.kind {
                pattern_names(id, &mut names);
            }
        }
        let next = parent.child();
        for name in names {
            let value = current.get(name.as_str()).unwrap_or_default();
            next.declare(name, value, true);
        }
        self.task.env = next;
    }

    fn bind_loop_target(&mut self, left: &NodeRef, value: JsValue) -> Result<(), JsError> {
        let env = self.task.env.cheap_clone();
        match &left.kind {
            NodeKind::VariableDeclaration { declarations, kind } => {
                let Some(NodeKind::VariableDeclarator { id, .. }) =
                    declarations.first().map(|d| &d.kind)
                else {
                    return Err(JsError::internal_error("loop declaration without a declarator"));
                };
                self.destructure(id, value, &env, BindMode::for_kind(*kind))
            }
            NodeKind::MemberExpression { .. } => {
                Err(JsError::not_implemented("member expressions as loop targets"))
            }
            _ => self.destructure(left, value, &env, BindMode::Assign),
        }
    }

    fn switch_match(&mut self, node: NodeRef, discriminant: JsValue, index: usize) {
        let NodeKind::SwitchStatement { cases, .. } = &node.kind else {
            return;
        };
        let next = cases.iter().enumerate().skip(index).find_map(|(at, case)| match &case.kind {
            NodeKind::SwitchCase {
                test: Some(test), ..
            } => Some((at, test.cheap_clone())),
            _ => None,
        });
        match next {
            Some((at, test)) => {
                self.task.push_frame(Frame::SwitchCompare {
                    node: node.cheap_clone(),
                    discriminant,
                    index: at,
                });
                self.task.push_frame(Frame::Eval(test));
            }
            None => {
                let default = cases
                    .iter()
                    .position(|case| matches!(case.kind, NodeKind::SwitchCase { test: None, .. }));
                if let Some(case) = default {
                    self.task.push_frame(Frame::SwitchBody {
                        node: node.cheap_clone(),
                        case,
                        statement: 0,
                    });
                }
            }
        }
    }

    fn switch_body(&mut self, node: NodeRef, case: usize, statement: usize) {
        let NodeKind::SwitchStatement { cases, .. } = &node.kind else {
            return;
        };
        let Some(NodeKind::SwitchCase { consequent, .. }) = cases.get(case).map(|c| &c.kind) else {
            return;
        };
        match consequent.get(statement).cloned() {
            Some(next) => {
                self.task.push_frame(Frame::SwitchBody {
                    node: node.cheap_clone(),
                    case,
                    statement: statement + 1,
                });
                self.task.push_frame(Frame::Eval(next));
            }
            // Fall through into the next case
            None if case + 1 < cases.len() => {
                self.task.push_frame(Frame::SwitchBody {
                    node: node.cheap_clone(),
                    case: case + 1,
                    statement: 0,
                });
            }
            None => {}
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Expressions
    // ═══════════════════════════════════════════════════════════════════════

    fn member_access(&mut self, node: &NodeRef) -> Result<StepResult, JsError> {
        let NodeKind::MemberExpression {
            property,
            computed,
            optional,
            ..
        } = &node.kind
        else {
            return Err(JsError::internal_error("expected a member expression"));
        };
        if *optional && self.task.peek_value().is_some_and(JsValue::is_null_or_undefined) {
            self.task.pop_value();
            return Ok(self.unwind(Abrupt::ShortCircuit));
        }
        if *computed {
            self.task.push_frame(Frame::MemberGet(node.cheap_clone()));
            self.task.push_frame(Frame::Eval(property.cheap_clone()));
        } else {
            let object = self.task.pop_value();
            let name = property
                .identifier_name()
                .ok_or_else(|| JsError::internal_error("member without a name"))?;
            let value = self.get_value_property(&object, name.as_str())?;
            self.task.push_value(value);
        }
        Ok(StepResult::Continue)
    }

    fn call_member(&mut self, node: &NodeRef) -> Result<StepResult, JsError> {
        let NodeKind::CallExpression { callee, .. } = &node.kind else {
            return Err(JsError::internal_error("expected a call expression"));
        };
        let NodeKind::MemberExpression {
            property,
            computed,
            optional,
            ..
        } = &callee.kind
        else {
            return Err(JsError::internal_error("expected a member callee"));
        };
        if *optional && self.task.peek_value().is_some_and(JsValue::is_null_or_undefined) {
            self.task.pop_value();
            return Ok(self.unwind(Abrupt::ShortCircuit));
        }
        if *computed {
            self.task.push_frame(Frame::CallMemberComputed(node.cheap_clone()));
            self.task.push_frame(Frame::Eval(property.cheap_clone()));
            return Ok(StepResult::Continue);
        }
        let object = self.task.pop_value();
        let name = property
            .identifier_name()
            .ok_or_else(|| JsError::internal_error("member without a name"))?;
        let method = self.get_value_property(&object, name.as_str())?;
        Ok(self.prepare_call(node, method, object))
    }

    fn prepare_call(&mut self, node: &NodeRef, callee: JsValue, this: JsValue) -> StepResult {
        let optional = matches!(node.kind, NodeKind::CallExpression { optional: true, .. });
        if optional && callee.is_null_or_undefined() {
            return self.unwind(Abrupt::ShortCircuit);
        }
        self.push_arguments(node, CallTarget::Call { callee, this });
        StepResult::Continue
    }

    fn step_arguments(&mut self, mut list: Box<ArgumentList>) -> Result<(), JsError> {
        if let Some(spread) = list.pending.take() {
            let value = self.task.pop_value();
            if spread {
                let items = self.iterate_values(&value)?;
                list.args.extend(items);
            } else {
                list.args.push(value);
            }
        }
        let node = list.node.cheap_clone();
        let arguments = match &node.kind {
            NodeKind::CallExpression { arguments, .. } | NodeKind::NewExpression { arguments, .. } => {
                arguments.as_slice()
            }
            _ => &[],
        };
        if let Some(argument) = arguments.get(list.index) {
            list.index += 1;
            let (expression, spread) = match &argument.kind {
                NodeKind::SpreadElement { argument } => (argument.cheap_clone(), true),
                _ => (argument.cheap_clone(), false),
            };
            list.pending = Some(spread);
            self.task.push_frame(Frame::Arguments(list));
            self.task.push_frame(Frame::Eval(expression));
            return Ok(());
        }
        let ArgumentList { args, target, .. } = *list;
        match target {
            CallTarget::Call { callee, this } => self.begin_call(callee, this, args, Some(&node)),
            CallTarget::New { callee } => self.construct(callee, args, &node),
            CallTarget::Super => self.super_call(args, &node),
        }
    }

    fn step_array_elements(&mut self, mut list: Box<ElementList>) -> Result<(), JsError> {
        if let Some(spread) = list.pending.take() {
            let value = self.task.pop_value();
            if spread {
                let items = self.iterate_values(&value)?;
                list.items.extend(items);
            } else {
                list.items.push(value);
            }
        }
        let node = list.node.cheap_clone();
        let NodeKind::ArrayExpression { elements } = &node.kind else {
            return Err(JsError::internal_error("expected an array literal"));
        };
        while let Some(element) = elements.get(list.index) {
            list.index += 1;
            let Some(element) = element else {
                list.items.push(JsValue::Undefined);
                continue;
            };
            let (expression, spread) = match &element.kind {
                NodeKind::SpreadElement { argument } => (argument.cheap_clone(), true),
                _ => (element.cheap_clone(), false),
            };
            list.pending = Some(spread);
            self.task.push_frame(Frame::ArrayElements(list));
            self.task.push_frame(Frame::Eval(expression));
            return Ok(());
        }
        let array = self.create_array(std::mem::take(&mut list.items));
        self.task.push_value(array);
        Ok(())
    }

    fn step_object_properties(&mut self, mut list: Box<PropertyList>) -> Result<(), JsError> {
        let node = list.node.cheap_clone();
        let NodeKind::ObjectExpression { properties } = &node.kind else {
            return Err(JsError::internal_error("expected an object literal"));
        };
        match list.pending.take() {
            Some(PendingProperty::Key) => {
                let key = self.task.pop_value().to_js_string();
                let value_node = match list.index.checked_sub(1).and_then(|at| properties.get(at)) {
                    Some(property) => match &property.kind {
                        NodeKind::Property { value, .. } => value.cheap_clone(),
                        _ => return Err(JsError::internal_error("expected a property")),
                    },
                    None => return Err(JsError::internal_error("property index out of range")),
                };
                list.pending = Some(PendingProperty::Value(key));
                self.task.push_frame(Frame::ObjectProperties(list));
                self.task.push_frame(Frame::Eval(value_node));
                return Ok(());
            }
            Some(PendingProperty::Value(key)) => {
                let value = self.task.pop_value();
                let anonymous = list
                    .index
                    .checked_sub(1)
                    .and_then(|at| properties.get(at))
                    .is_some_and(|property| match &property.kind {
                        NodeKind::Property { value, .. } => is_anonymous_function(value),
                        _ => false,
                    });
                if anonymous {
                    self.set_function_name(&value, &key);
                }
                list.object.borrow_mut().set_property(key, value);
            }
            Some(PendingProperty::Spread) => {
                let source = self.task.pop_value();
                if let JsValue::Object(source) = &source {
                    let entries: Vec<_> = {
                        let source = source.borrow();
                        source
                            .own_keys()
                            .into_iter()
                            .map(|key| {
                                let value = source.get_own_property(key.as_str()).unwrap_or_default();
                                (key, value)
                            })
                            .collect()
                    };
                    let mut object = list.object.borrow_mut();
                    for (key, value) in entries {
                        object.set_property(key, value);
                    }
                }
            }
            None => {}
        }

        let Some(property) = properties.get(list.index) else {
            self.task.push_value(JsValue::Object(list.object.cheap_clone()));
            return Ok(());
        };
        list.index += 1;
        match &property.kind {
            NodeKind::Property {
                key,
                value,
                kind,
                computed,
                ..
            } => {
                if *kind != crate::ast::PropertyKind::Init {
                    return Err(JsError::not_implemented("getters and setters"));
                }
                let next = if *computed {
                    list.pending = Some(PendingProperty::Key);
                    key.cheap_clone()
                } else {
                    list.pending = Some(PendingProperty::Value(property_key_name(key)?));
                    value.cheap_clone()
                };
                self.task.push_frame(Frame::ObjectProperties(list));
                self.task.push_frame(Frame::Eval(next));
            }
            NodeKind::SpreadElement { argument } => {
                list.pending = Some(PendingProperty::Spread);
                self.task.push_frame(Frame::ObjectProperties(list));
                self.task.push_frame(Frame::Eval(argument.cheap_clone()));
            }
            _ => return Err(JsError::internal_error("unexpected object literal member")),
        }
        Ok(())
    }

    /// Write a value to an assignment target; member targets take their
    /// object and key from the value stack
    fn store(&mut self, target: AssignTarget, value: JsValue) -> Result<(), JsError> {
        match target {
            AssignTarget::Binding(name) => self.task.env.assign(name.as_str(), value),
            AssignTarget::Member => {
                let key = self.task.pop_value();
                let object = self.task.pop_value();
                self.set_value_property(&object, key.to_js_string(), value)
            }
            AssignTarget::Pattern(pattern) => {
                let env = self.task.env.cheap_clone();
                self.destructure(&pattern, value, &env, BindMode::Assign)
            }
        }
    }

    pub(crate) fn super_property(&self, property: &NodeRef, computed: bool) -> Result<JsValue, JsError> {
        if computed {
            return Err(JsError::not_implemented("computed super properties"));
        }
        let name = property
            .identifier_name()
            .ok_or_else(|| JsError::internal_error("super member without a name"))?;
        let parent = self
            .task
            .config
            .home
            .as_ref()
            .and_then(|home| home.parent.clone())
            .ok_or_else(|| self.syntax_error_at(property, "'super' keyword unexpected here"))?;
        let value = parent.borrow().get_property(name.as_str());
        Ok(value.unwrap_or_default())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Await
    // ═══════════════════════════════════════════════════════════════════════

    /// Suspend the innermost async activation until its operand settles.
    /// Non-thenable operands continue immediately.
    fn step_await(&mut self, node: NodeRef) -> Result<StepResult, JsError> {
        let value = self.task.pop_value();
        if !self.task.config.allow_await {
            return Err(self.syntax_error_at(&node, "await is only valid in async functions"));
        }
        let promise = match &value {
            JsValue::Object(obj) if promise_state(obj).is_some() => obj.cheap_clone(),
            JsValue::Object(obj) => {
                let then = obj.borrow().get_property("then");
                if !then.is_some_and(|then| then.is_callable()) {
                    self.task.push_value(value);
                    return Ok(StepResult::Continue);
                }
                let wrapper = self.create_promise();
                self.resolve_promise(&wrapper, value.clone());
                wrapper
            }
            _ => {
                self.task.push_value(value);
                return Ok(StepResult::Continue);
            }
        };

        let Some(index) = self
            .task
            .frames
            .iter()
            .rposition(|frame| matches!(frame, Frame::CallBoundary(_) | Frame::TaskRoot(_)))
        else {
            return Err(JsError::internal_error("await outside of any task"));
        };
        let mut frames = self.task.frames.split_off(index);
        let boundary = match frames.first_mut() {
            Some(Frame::CallBoundary(boundary)) => match &boundary.kind {
                CallKind::Async { promise } => {
                    let call_promise = promise.cheap_clone();
                    let first_suspension = !boundary.resumed;
                    boundary.resumed = true;
                    Some((
                        call_promise,
                        first_suspension,
                        boundary.values_len,
                        boundary.saved_env.cheap_clone(),
                        boundary.saved_config.clone(),
                    ))
                }
                _ => None,
            },
            _ => None,
        };
        let Some((call_promise, first_suspension, values_len, caller_env, caller_config)) = boundary
        else {
            self.task.frames.append(&mut frames);
            return Err(self.syntax_error_at(&node, "await is only valid in async functions"));
        };

        for frame in frames.iter_mut() {
            frame.rebase_values(values_len);
        }
        let split = values_len.min(self.task.values.len());
        let values = self.task.values.split_off(split);
        let env = std::mem::replace(&mut self.task.env, caller_env);
        let config = std::mem::replace(&mut self.task.config, caller_config);
        self.call_depth = self.call_depth.saturating_sub(1);

        let interceptor = self.interceptor.cheap_clone();
        let token = match interceptor.try_borrow_mut() {
            Ok(mut interceptor) => interceptor.suspend(
                &Interception {
                    node: &node,
                    phase: Phase::Suspend,
                    value: Some(&value),
                    env: &env,
                    config: &config,
                    site: &Site::Node,
                    abrupt: false,
                },
                true,
            ),
            Err(_) => PathToken::default(),
        };

        self.next_suspension += 1;
        let id = SuspensionId(self.next_suspension);
        tracing::trace!(suspension = id.0, "async activation suspended");
        self.suspended.insert(
            id,
            Suspended {
                frames,
                values,
                env,
                config,
                token,
                node,
            },
        );
        if let Some(state) = promise_state(&promise) {
            self.add_reaction(&state, PromiseReaction::Await(id));
        }
        if first_suspension {
            self.task.push_value(JsValue::Object(call_promise));
        }
        Ok(StepResult::Continue)
    }

    /// Make a suspended activation the current task again
    pub(crate) fn resume_suspended(&mut self, id: SuspensionId, status: PromiseStatus, value: JsValue) {
        let Some(suspended) = self.suspended.remove(&id) else {
            return;
        };
        let Suspended {
            frames: saved,
            values,
            env,
            config,
            token,
            node,
        } = suspended;
        let mut frames = Vec::with_capacity(saved.len() + 1);
        frames.push(Frame::TaskRoot(TaskRoot::Callback));
        frames.extend(saved);
        self.task = Task {
            frames,
            values,
            env,
            config,
            statement_value: None,
            completion: None,
        };
        self.call_depth += 1;
        tracing::trace!(suspension = id.0, ?status, "async activation resumed");

        let interceptor = self.interceptor.cheap_clone();
        if let Ok(mut interceptor) = interceptor.try_borrow_mut() {
            interceptor.resume(
                &Interception {
                    node: &node,
                    phase: Phase::Resume,
                    value: Some(&value),
                    env: &self.task.env,
                    config: &self.task.config,
                    site: &Site::Node,
                    abrupt: status == PromiseStatus::Rejected,
                },
                token,
            );
        }

        self.task.push_value(value);
        if status == PromiseStatus::Rejected {
            self.task.push_frame(Frame::Throw);
        }
    }
}

fn short_circuits(op: LogicalOperator, left: &JsValue) -> bool {
    match op {
        LogicalOperator::And => !left.to_boolean(),
        LogicalOperator::Or => left.to_boolean(),
        LogicalOperator::Nullish => !left.is_null_or_undefined(),
    }
}

/// Keys a for-in loop visits: own enumerable keys, then inherited ones
fn enumerable_keys(value: &JsValue) -> Vec<JsValue> {
    match value {
        JsValue::Object(obj) => {
            let mut keys = obj.borrow().own_keys();
            let mut proto = obj.borrow().prototype.clone();
            while let Some(current) = proto {
                for key in current.borrow().own_keys() {
                    if !keys.contains(&key) {
                        keys.push(key);
                    }
                }
                proto = current.borrow().prototype.clone();
            }
            keys.into_iter().map(JsValue::String).collect()
        }
        JsValue::String(s) => (0..s.as_str().chars().count())
            .map(|i| JsValue::from(i.to_string()))
            .collect(),
        _ => Vec::new(),
    }
}
