//! Node dispatch
//!
//! Turns one visited node into the frames and values that evaluate it. Most
//! nodes push a continuation frame followed by `Eval` frames for their
//! children; leaves push their value directly.

use crate::ast::{AssignmentOperator, Node, NodeKind, NodeRef, UnaryOperator, VariableKind};
use crate::error::JsError;
use crate::flow::{BlockKind, Phase};
use crate::value::{CheapClone, JsString, JsValue};

use super::Interpreter;
use super::eval_stack::{
    Abrupt, ArgumentList, AssignTarget, CallTarget, ElementList, Frame, LoopFrame, LoopStage,
    PropertyList, StepResult, TryStage,
};
use super::function::BindMode;
use super::intercept::Site;

impl Interpreter {
    // ═══════════════════════════════════════════════════════════════════════
    // Node entry
    // ═══════════════════════════════════════════════════════════════════════

    /// Visit a node: announce its entry, schedule its exit event and
    /// dispatch it, or stop here when the policy pauses on it
    pub(crate) fn step_eval(&mut self, node: NodeRef) -> Result<StepResult, JsError> {
        let site = Site::Node;
        if self.policy.reports(node.node_type(), &site) {
            let pause = self.announce(&node, Phase::Enter, None, &site);
            self.task.push_frame(Frame::Exit {
                node: node.cheap_clone(),
                site,
            });
            if pause {
                self.task.push_frame(Frame::Dispatch(node));
                return Ok(StepResult::Pause);
            }
        }
        self.dispatch(&node)
    }

    pub(crate) fn step_declarator(
        &mut self,
        node: NodeRef,
        kind: VariableKind,
    ) -> Result<StepResult, JsError> {
        let site = Site::Node;
        if self.policy.reports(node.node_type(), &site) {
            let pause = self.announce(&node, Phase::Enter, None, &site);
            self.task.push_frame(Frame::Exit {
                node: node.cheap_clone(),
                site,
            });
            if pause {
                self.task.push_frame(Frame::DispatchDeclarator { node, kind });
                return Ok(StepResult::Pause);
            }
        }
        self.dispatch_declarator(node, kind)
    }

    pub(crate) fn dispatch_declarator(
        &mut self,
        node: NodeRef,
        kind: VariableKind,
    ) -> Result<StepResult, JsError> {
        let NodeKind::VariableDeclarator { init, .. } = &node.kind else {
            return Err(JsError::internal_error("expected a variable declarator"));
        };
        let init = init.clone();
        self.task.push_frame(Frame::Bind { node, kind });
        match init {
            Some(init) => self.task.push_frame(Frame::Eval(init)),
            None => self.task.push_value(JsValue::Undefined),
        }
        Ok(StepResult::Continue)
    }

    /// Run a control-flow body inside a block frame
    pub(crate) fn step_enter_block(
        &mut self,
        node: NodeRef,
        kind: BlockKind,
    ) -> Result<StepResult, JsError> {
        let site = Site::Block(kind);
        let mut pause = false;
        if self.policy.reports(node.node_type(), &site) {
            pause = self.announce(&node, Phase::Enter, None, &site);
            self.task.push_frame(Frame::Exit {
                node: node.cheap_clone(),
                site,
            });
        }
        self.task.push_frame(Frame::Eval(node));
        Ok(if pause {
            StepResult::Pause
        } else {
            StepResult::Continue
        })
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Dispatch
    // ═══════════════════════════════════════════════════════════════════════

    pub(crate) fn dispatch(&mut self, node: &NodeRef) -> Result<StepResult, JsError> {
        match &node.kind {
            NodeKind::Program { body } => {
                let env = self.task.env.cheap_clone();
                self.hoist_declarations(body, &env, true)?;
                self.task.push_frame(Frame::Statements {
                    node: node.cheap_clone(),
                    index: 0,
                    record: true,
                });
            }

            NodeKind::ExpressionStatement { expression } => {
                self.task.push_frame(Frame::StatementValue);
                self.task.push_frame(Frame::Eval(expression.cheap_clone()));
            }

            NodeKind::BlockStatement { body } => {
                let outer = self.task.env.cheap_clone();
                let inner = outer.child();
                self.hoist_declarations(body, &inner, false)?;
                self.task.push_frame(Frame::RestoreEnv(outer));
                self.task.env = inner;
                self.task.push_frame(Frame::Statements {
                    node: node.cheap_clone(),
                    index: 0,
                    record: false,
                });
            }

            // Function declarations are bound while hoisting
            NodeKind::EmptyStatement {}
            | NodeKind::DebuggerStatement {}
            | NodeKind::FunctionDeclaration(_) => {}

            NodeKind::VariableDeclaration { .. } => {
                self.task.push_frame(Frame::Declarators {
                    node: node.cheap_clone(),
                    index: 0,
                });
            }

            NodeKind::ClassDeclaration(class) | NodeKind::ClassExpression(class) => {
                self.task.push_frame(Frame::ClassDefine(node.cheap_clone()));
                if let Some(super_class) = &class.super_class {
                    self.task.push_frame(Frame::Eval(super_class.cheap_clone()));
                }
            }

            NodeKind::ReturnStatement { argument } => {
                self.task.push_frame(Frame::Return);
                match argument {
                    Some(argument) => self.task.push_frame(Frame::Eval(argument.cheap_clone())),
                    None => self.task.push_value(JsValue::Undefined),
                }
            }

            NodeKind::IfStatement { test, .. } => {
                self.task.push_frame(Frame::IfBranch(node.cheap_clone()));
                self.task.push_frame(Frame::Eval(test.cheap_clone()));
            }

            NodeKind::ForStatement { init, .. } => {
                let outer = self.task.env.cheap_clone();
                let loop_env = outer.child();
                self.task.push_frame(Frame::RestoreEnv(outer));
                self.task.env = loop_env.cheap_clone();
                self.task.push_frame(Frame::Loop(Box::new(LoopFrame {
                    node: node.cheap_clone(),
                    stage: LoopStage::Start,
                    items: Vec::new(),
                    index: 0,
                    env: loop_env,
                })));
                if let Some(init) = init {
                    if !matches!(init.kind, NodeKind::VariableDeclaration { .. }) {
                        self.task.push_frame(Frame::Discard);
                    }
                    self.task.push_frame(Frame::Eval(init.cheap_clone()));
                }
            }

            NodeKind::ForOfStatement { is_await: true, .. } => {
                return Err(JsError::not_implemented("for await loops"));
            }

            NodeKind::ForInStatement { right, .. } | NodeKind::ForOfStatement { right, .. } => {
                self.push_loop(node, LoopStage::Start);
                self.task.push_frame(Frame::Eval(right.cheap_clone()));
            }

            NodeKind::WhileStatement { .. } => self.push_loop(node, LoopStage::Test),

            NodeKind::DoWhileStatement { .. } => self.push_loop(node, LoopStage::Body),

            NodeKind::BreakStatement { label } => {
                if label.is_some() {
                    return Err(JsError::not_implemented("labeled break"));
                }
                return Ok(self.unwind(Abrupt::Break));
            }

            NodeKind::ContinueStatement { label } => {
                if label.is_some() {
                    return Err(JsError::not_implemented("labeled continue"));
                }
                return Ok(self.unwind(Abrupt::Continue));
            }

            NodeKind::ThrowStatement { argument } => {
                self.task.push_frame(Frame::Throw);
                self.task.push_frame(Frame::Eval(argument.cheap_clone()));
            }

            NodeKind::TryStatement { block, .. } => {
                self.task.push_frame(Frame::TryHandler {
                    node: node.cheap_clone(),
                    stage: TryStage::Block,
                    values_len: self.task.values.len(),
                    env: self.task.env.cheap_clone(),
                });
                self.task.push_frame(Frame::Eval(block.cheap_clone()));
            }

            NodeKind::CatchClause { param, body } => {
                let error = self.task.pop_value();
                let outer = self.task.env.cheap_clone();
                let bridge = outer.internal_child();
                bridge.declare(JsString::from("%error"), error.clone(), false);
                let scope = bridge.child();
                if let Some(param) = param {
                    self.destructure(param, error, &scope, BindMode::Declare { mutable: true })?;
                }
                self.task.push_frame(Frame::RestoreEnv(outer));
                self.task.env = scope;
                self.task.push_frame(Frame::Eval(body.cheap_clone()));
            }

            NodeKind::SwitchStatement { discriminant, .. } => {
                let outer = self.task.env.cheap_clone();
                let inner = outer.child();
                self.task.push_frame(Frame::RestoreEnv(outer));
                self.task.env = inner;
                self.task.push_frame(Frame::SwitchStart(node.cheap_clone()));
                self.task.push_frame(Frame::Eval(discriminant.cheap_clone()));
            }

            NodeKind::LabeledStatement {} => {
                return Err(JsError::not_implemented("labeled statements"));
            }

            NodeKind::Identifier { name } => {
                let value = self.lookup(name)?;
                self.task.push_value(value);
            }

            NodeKind::Literal { value, regex } => {
                if regex.is_some() {
                    return Err(JsError::not_implemented("regular expressions"));
                }
                self.task.push_value(literal_value(value));
            }

            NodeKind::TemplateLiteral { expressions, .. } => {
                self.task.push_frame(Frame::Template(node.cheap_clone()));
                for expression in expressions.iter().rev() {
                    self.task.push_frame(Frame::Eval(expression.cheap_clone()));
                }
            }

            NodeKind::ThisExpression {} => {
                let this = self.task.env.get("this").unwrap_or_default();
                self.task.push_value(this);
            }

            NodeKind::ArrayExpression { .. } => {
                self.task.push_frame(Frame::ArrayElements(Box::new(ElementList {
                    node: node.cheap_clone(),
                    index: 0,
                    items: Vec::new(),
                    pending: None,
                })));
            }

            NodeKind::ObjectExpression { .. } => {
                let object = self.create_object();
                self.task.push_frame(Frame::ObjectProperties(Box::new(PropertyList {
                    node: node.cheap_clone(),
                    index: 0,
                    object,
                    pending: None,
                })));
            }

            NodeKind::FunctionExpression(_) | NodeKind::ArrowFunctionExpression(_) => {
                let env = self.task.env.cheap_clone();
                let function = self.create_function(node, &env, None)?;
                self.task.push_value(function);
            }

            NodeKind::MemberExpression {
                object,
                property,
                computed,
                ..
            } => {
                if matches!(object.kind, NodeKind::Super {}) {
                    let value = self.super_property(property, *computed)?;
                    self.task.push_value(value);
                } else {
                    self.task.push_frame(Frame::MemberAccess(node.cheap_clone()));
                    self.task.push_frame(Frame::Eval(object.cheap_clone()));
                }
            }

            NodeKind::ChainExpression { expression } => {
                self.task.push_frame(Frame::ChainEnd {
                    values_len: self.task.values.len(),
                });
                self.task.push_frame(Frame::Eval(expression.cheap_clone()));
            }

            NodeKind::CallExpression { callee, .. } => self.dispatch_call(node, callee)?,

            NodeKind::NewExpression { callee, .. } => {
                self.task.push_frame(Frame::NewCallee(node.cheap_clone()));
                self.task.push_frame(Frame::Eval(callee.cheap_clone()));
            }

            NodeKind::UnaryExpression { operator, argument } => {
                match (operator, &argument.kind) {
                    (UnaryOperator::Typeof, NodeKind::Identifier { name }) => {
                        // Undeclared names are not an error under typeof
                        let value = self.task.env.get(name.as_str());
                        let type_name = value.map(|v| v.type_of()).unwrap_or("undefined");
                        self.task.push_value(JsValue::from(type_name));
                    }
                    (UnaryOperator::Delete, NodeKind::MemberExpression { object, .. }) => {
                        self.task.push_frame(Frame::DeleteMember);
                        self.task.push_frame(Frame::MemberKey(argument.cheap_clone()));
                        self.task.push_frame(Frame::Eval(object.cheap_clone()));
                    }
                    _ => {
                        self.task.push_frame(Frame::Unary(*operator));
                        self.task.push_frame(Frame::Eval(argument.cheap_clone()));
                    }
                }
            }

            NodeKind::UpdateExpression { argument, .. } => match &argument.kind {
                NodeKind::Identifier { name } => {
                    self.task.push_frame(Frame::UpdateComplete {
                        node: node.cheap_clone(),
                        target: AssignTarget::Binding(name.cheap_clone()),
                    });
                    self.task.push_frame(Frame::LoadBinding(name.cheap_clone()));
                }
                NodeKind::MemberExpression { object, .. } if !is_super(object) => {
                    self.task.push_frame(Frame::UpdateComplete {
                        node: node.cheap_clone(),
                        target: AssignTarget::Member,
                    });
                    self.push_member_target(argument, object, true);
                }
                _ => {
                    return Err(self.syntax_error_at(
                        node,
                        "Invalid left-hand side expression in postfix operation",
                    ));
                }
            },

            NodeKind::BinaryExpression {
                operator,
                left,
                right,
            } => {
                self.task.push_frame(Frame::Binary(*operator));
                self.task.push_frame(Frame::Eval(right.cheap_clone()));
                self.task.push_frame(Frame::Eval(left.cheap_clone()));
            }

            NodeKind::LogicalExpression { left, .. } => {
                self.task.push_frame(Frame::Logical(node.cheap_clone()));
                self.task.push_frame(Frame::Eval(left.cheap_clone()));
            }

            NodeKind::AssignmentExpression {
                operator,
                left,
                right,
            } => self.dispatch_assignment(node, *operator, left, right)?,

            NodeKind::ConditionalExpression { test, .. } => {
                self.task.push_frame(Frame::Conditional(node.cheap_clone()));
                self.task.push_frame(Frame::Eval(test.cheap_clone()));
            }

            NodeKind::SequenceExpression { expressions } => {
                if expressions.is_empty() {
                    self.task.push_value(JsValue::Undefined);
                }
                for (index, expression) in expressions.iter().enumerate().rev() {
                    self.task.push_frame(Frame::Eval(expression.cheap_clone()));
                    if index > 0 {
                        // Drop the previous expression's value before this one runs
                        self.task.push_frame(Frame::Discard);
                    }
                }
            }

            NodeKind::AwaitExpression { argument } => {
                self.task.push_frame(Frame::AwaitValue(node.cheap_clone()));
                self.task.push_frame(Frame::Eval(argument.cheap_clone()));
            }

            NodeKind::Super {} => {
                return Err(self.syntax_error_at(node, "'super' keyword unexpected here"));
            }

            NodeKind::ObjectPattern { .. }
            | NodeKind::ArrayPattern {}
            | NodeKind::RestElement { .. }
            | NodeKind::AssignmentPattern {} => {
                return Err(self.syntax_error_at(node, "Invalid destructuring assignment target"));
            }

            NodeKind::VariableDeclarator { .. }
            | NodeKind::SwitchCase { .. }
            | NodeKind::TemplateElement { .. }
            | NodeKind::Property { .. }
            | NodeKind::SpreadElement { .. }
            | NodeKind::ClassBody { .. }
            | NodeKind::MethodDefinition { .. } => {
                return Err(JsError::internal_error(format!(
                    "{} visited outside of its parent",
                    node.node_type()
                )));
            }

            NodeKind::Unsupported => {
                return Err(JsError::not_implemented("this syntax"));
            }
        }
        Ok(StepResult::Continue)
    }

    fn push_loop(&mut self, node: &NodeRef, stage: LoopStage) {
        let env = self.task.env.cheap_clone();
        self.task.push_frame(Frame::Loop(Box::new(LoopFrame {
            node: node.cheap_clone(),
            stage,
            items: Vec::new(),
            index: 0,
            env,
        })));
    }

    /// Schedule object and key of a member target; with `load` also its
    /// current value
    fn push_member_target(&mut self, member: &NodeRef, object: &NodeRef, load: bool) {
        if load {
            self.task.push_frame(Frame::LoadMember);
        }
        self.task.push_frame(Frame::MemberKey(member.cheap_clone()));
        self.task.push_frame(Frame::Eval(object.cheap_clone()));
    }

    fn dispatch_call(&mut self, node: &NodeRef, callee: &NodeRef) -> Result<(), JsError> {
        match &callee.kind {
            NodeKind::Super {} => {
                self.push_arguments(node, CallTarget::Super);
            }
            NodeKind::MemberExpression {
                object,
                property,
                computed,
                ..
            } if is_super(object) => {
                let method = self.super_property(property, *computed)?;
                let this = self.task.env.get("this").unwrap_or_default();
                self.push_arguments(node, CallTarget::Call { callee: method, this });
            }
            NodeKind::MemberExpression { object, .. } => {
                self.task.push_frame(Frame::CallMember(node.cheap_clone()));
                self.task.push_frame(Frame::Eval(object.cheap_clone()));
            }
            _ => {
                self.task.push_frame(Frame::CallCallee(node.cheap_clone()));
                self.task.push_frame(Frame::Eval(callee.cheap_clone()));
            }
        }
        Ok(())
    }

    pub(crate) fn push_arguments(&mut self, node: &NodeRef, target: CallTarget) {
        self.task.push_frame(Frame::Arguments(Box::new(ArgumentList {
            node: node.cheap_clone(),
            index: 0,
            args: Vec::new(),
            pending: None,
            target,
        })));
    }

    fn dispatch_assignment(
        &mut self,
        node: &NodeRef,
        operator: AssignmentOperator,
        left: &NodeRef,
        right: &NodeRef,
    ) -> Result<(), JsError> {
        let target = match &left.kind {
            NodeKind::Identifier { name } => AssignTarget::Binding(name.cheap_clone()),
            NodeKind::MemberExpression { object, .. } if !is_super(object) => AssignTarget::Member,
            NodeKind::ObjectPattern { .. } if operator == AssignmentOperator::Assign => {
                AssignTarget::Pattern(left.cheap_clone())
            }
            NodeKind::MemberExpression { .. } => {
                return Err(JsError::not_implemented("assignment to super properties"));
            }
            NodeKind::ArrayPattern {} => {
                return Err(JsError::not_implemented("array destructuring"));
            }
            _ => {
                return Err(self.syntax_error_at(node, "Invalid left-hand side in assignment"));
            }
        };

        if operator.logical().is_some() {
            self.task.push_frame(Frame::LogicalAssign {
                node: node.cheap_clone(),
                target: target.clone(),
            });
            self.push_current_value(left, &target);
            return Ok(());
        }

        let compound = operator.binary();
        self.task.push_frame(Frame::AssignComplete {
            node: node.cheap_clone(),
            target: target.clone(),
            compound,
        });
        self.task.push_frame(Frame::Eval(right.cheap_clone()));
        if compound.is_some() {
            self.push_current_value(left, &target);
        } else if let (AssignTarget::Member, NodeKind::MemberExpression { object, .. }) =
            (&target, &left.kind)
        {
            self.push_member_target(left, object, false);
        }
        Ok(())
    }

    /// Schedule the target's reference and current value
    fn push_current_value(&mut self, left: &NodeRef, target: &AssignTarget) {
        match (target, &left.kind) {
            (AssignTarget::Binding(name), _) => {
                self.task.push_frame(Frame::LoadBinding(name.cheap_clone()));
            }
            (AssignTarget::Member, NodeKind::MemberExpression { object, .. }) => {
                self.push_member_target(left, object, true);
            }
            _ => {}
        }
    }

    pub(crate) fn syntax_error_at(&self, node: &Node, message: &str) -> JsError {
        let (line, column) = node.line_column().unwrap_or((0, 0));
        JsError::syntax_error(message, line, column)
    }
}

fn is_super(node: &Node) -> bool {
    matches!(node.kind, NodeKind::Super {})
}

/// Runtime value of a literal's JSON `value`
pub(crate) fn literal_value(value: &serde_json::Value) -> JsValue {
    match value {
        serde_json::Value::Null => JsValue::Null,
        serde_json::Value::Bool(b) => JsValue::Boolean(*b),
        serde_json::Value::Number(n) => JsValue::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => JsValue::from(s.as_str()),
        // Only regex and bigint literals carry structured values
        _ => JsValue::Undefined,
    }
}

/// Statements of a program or block node
pub(crate) fn statement_list(node: &Node) -> &[NodeRef] {
    match &node.kind {
        NodeKind::Program { body } | NodeKind::BlockStatement { body } => body,
        _ => &[],
    }
}

/// Function, arrow or class expression without an own name
pub(crate) fn is_anonymous_function(node: &Node) -> bool {
    match &node.kind {
        NodeKind::FunctionExpression(func) | NodeKind::ArrowFunctionExpression(func) => {
            func.id.is_none()
        }
        NodeKind::ClassExpression(class) => class.id.is_none(),
        _ => false,
    }
}
