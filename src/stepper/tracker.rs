//! Interception half of the stepping engine
//!
//! The tracker sits behind the interpreter's interceptor hook and keeps the
//! [`FlowModel`] in step with evaluation: call enter/exit push and pop stack
//! frames, block enter/exit push and pop block frames, declarations record
//! origins and assignments are linked back to them. Every event is then
//! forwarded to the observer, if one is installed.

use tracing::{trace, warn};

use crate::ast::{Class, Function, NodeKind, NodeRef};
use crate::error::JsError;
use crate::flow::{
    AssignmentRecord, Evaluation, EvaluationContext, FlowModel, FrameId, PathEntry, PathToken,
    Phase,
};
use crate::interpreter::intercept::{CallInfo, Interception, Interceptor, Site};
use crate::platform::Observer;
use crate::value::{CheapClone, JsString};

use super::Status;

/// Name of the synthetic frame at the bottom of every path
pub const ROOT_FRAME_NAME: &str = "Program";

#[derive(Default)]
pub struct Tracker {
    flow: FlowModel,
    observer: Option<Box<dyn Observer>>,
    root: Option<FrameId>,
}

impl Tracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_observer(observer: Box<dyn Observer>) -> Self {
        Tracker {
            observer: Some(observer),
            ..Self::default()
        }
    }

    pub fn set_observer(&mut self, observer: Option<Box<dyn Observer>>) {
        self.observer = observer;
    }

    pub fn flow(&self) -> &FlowModel {
        &self.flow
    }

    /// Frame id of the synthetic program frame of the current run
    pub fn root_frame(&self) -> Option<FrameId> {
        self.root
    }

    /// Drop the previous run and open the program frame of a new one
    pub fn begin_run(&mut self) {
        self.flow.clear();
        self.root = Some(self.flow.push_frame(ROOT_FRAME_NAME, None, None, Vec::new()));
    }

    pub fn notify_update(&mut self, status: Status) {
        if let Some(observer) = self.observer.as_mut() {
            if let Err(err) = observer.on_update(status, &self.flow) {
                warn!(%err, "observer rejected update");
            }
        }
    }

    pub fn notify_error(&mut self, error: &JsError) {
        if let Some(observer) = self.observer.as_mut() {
            if let Err(err) = observer.on_error(error) {
                warn!(%err, "observer rejected error report");
            }
        }
    }

    fn emit(&mut self, event: &Interception<'_>, context: EvaluationContext) {
        let Some(observer) = self.observer.as_mut() else {
            return;
        };
        let evaluation = Evaluation {
            node: event.node.cheap_clone(),
            phase: event.phase,
            value: event.value.cloned(),
            env: event.env.cheap_clone(),
            frame: self.flow.current_frame(),
            block: self.flow.current_block(),
            context,
        };
        if let Err(err) = observer.on_evaluation(&evaluation, &self.flow) {
            warn!(%err, node = %event.node.node_type(), "observer rejected evaluation");
        }
    }

    fn ensure_root(&mut self) {
        if self.flow.depth() == 0 {
            self.begin_run();
        }
    }

    fn on_call(&mut self, event: &Interception<'_>, info: &CallInfo) {
        let mut context = EvaluationContext {
            abrupt: event.abrupt,
            ..EvaluationContext::default()
        };
        match event.phase {
            Phase::Enter => {
                self.ensure_root();
                let id = self.flow.push_frame(
                    frame_name(info),
                    info.call_site.clone(),
                    Some(event.node.cheap_clone()),
                    info.args.clone(),
                );
                trace!(frame = %id, depth = self.flow.depth(), "call enter");
                context.call = Some(id);
                self.emit(event, context);
            }
            Phase::Exit => {
                let frame = self.flow.current_frame().filter(|id| Some(*id) != self.root);
                if let Some(frame) = frame {
                    let value = if event.abrupt { None } else { event.value.cloned() };
                    self.flow.record_return(frame, value, event.abrupt);
                }
                context.call = frame;
                self.emit(event, context);
                if frame.is_some() {
                    self.flow.pop_frame();
                    trace!(depth = self.flow.depth(), "call exit");
                }
            }
            _ => self.emit(event, context),
        }
    }

    fn on_node(&mut self, event: &Interception<'_>) {
        let mut context = EvaluationContext {
            abrupt: event.abrupt,
            ..EvaluationContext::default()
        };
        let node = event.node;
        match (&node.kind, event.phase) {
            (NodeKind::Program { .. }, Phase::Enter) => self.ensure_root(),
            (NodeKind::Program { .. }, Phase::Exit) => {
                if let Some(root) = self.root {
                    self.flow.record_return(root, event.value.cloned(), event.abrupt);
                }
            }
            (NodeKind::VariableDeclarator { id, .. }, Phase::Enter) => {
                if let Some(name) = id.identifier_name() {
                    self.record_origin(name, node);
                }
            }
            (NodeKind::VariableDeclarator { id, .. }, Phase::Value) => {
                if let Some(name) = id.identifier_name() {
                    context.origin = Some(node.cheap_clone());
                    self.record_assignment(name, event);
                }
            }
            (NodeKind::FunctionDeclaration(Function { id: Some(id), .. }), Phase::Enter)
            | (NodeKind::ClassDeclaration(Class { id: Some(id), .. }), Phase::Enter) => {
                if let Some(name) = id.identifier_name() {
                    self.record_origin(name, node);
                }
            }
            (NodeKind::CatchClause { param: Some(param), .. }, Phase::Enter) => {
                if let Some(name) = param.identifier_name() {
                    self.record_origin(name, node);
                }
            }
            (NodeKind::AssignmentExpression { left, .. }, phase)
            | (NodeKind::UpdateExpression { argument: left, .. }, phase) => {
                if let Some(name) = left.identifier_name() {
                    context.origin = self.flow.find_origin(name.as_str()).map(|(_, origin)| origin);
                    if phase == Phase::Value {
                        self.record_assignment(name, event);
                    }
                }
            }
            _ => {}
        }
        self.emit(event, context);
    }

    fn record_origin(&mut self, name: &JsString, node: &NodeRef) {
        self.ensure_root();
        if let Some(scope) = self.flow.current_scope() {
            self.flow
                .record_origin(scope, name.cheap_clone(), node.cheap_clone());
        }
    }

    /// Assignments land in the scope that declared the name, or the current
    /// scope for names declared outside the tracked path
    fn record_assignment(&mut self, name: &JsString, event: &Interception<'_>) {
        let Some(value) = event.value else {
            return;
        };
        let scope = self
            .flow
            .find_origin(name.as_str())
            .map(|(scope, _)| scope)
            .or_else(|| self.flow.current_scope());
        if let Some(scope) = scope {
            self.flow.record_assignment(
                scope,
                AssignmentRecord {
                    name: name.cheap_clone(),
                    node: event.node.cheap_clone(),
                    value: value.clone(),
                },
            );
        }
    }

    /// Path with only the program frame left open
    fn root_path(&self) -> Vec<PathEntry> {
        self.root
            .map(|frame| {
                vec![PathEntry {
                    frame,
                    blocks: Vec::new(),
                }]
            })
            .unwrap_or_default()
    }
}

impl Interceptor for Tracker {
    fn intercept(&mut self, event: &Interception<'_>) {
        match event.site {
            Site::Call(info) => self.on_call(event, info),
            Site::Block(kind) => {
                let context = EvaluationContext {
                    block_kind: Some(*kind),
                    abrupt: event.abrupt,
                    ..EvaluationContext::default()
                };
                match event.phase {
                    Phase::Enter => {
                        self.ensure_root();
                        self.flow.push_block(*kind, event.node.cheap_clone());
                        self.emit(event, context);
                    }
                    Phase::Exit => {
                        self.emit(event, context);
                        self.flow.pop_block();
                    }
                    _ => self.emit(event, context),
                }
            }
            Site::Node => self.on_node(event),
        }
    }

    fn suspend(&mut self, event: &Interception<'_>, pops_frame: bool) -> PathToken {
        let context = EvaluationContext {
            call: self.flow.current_frame(),
            ..EvaluationContext::default()
        };
        self.emit(event, context);
        let token = self.flow.snapshot_path();
        if pops_frame && self.flow.current_frame() != self.root {
            self.flow.pop_frame();
        }
        trace!(token = token.0, depth = self.flow.depth(), "path snapshot taken");
        token
    }

    fn resume(&mut self, event: &Interception<'_>, token: PathToken) {
        match self.flow.take_snapshot(token) {
            Some(path) => {
                self.flow.replace_path(path);
            }
            None => warn!(token = token.0, "no path snapshot to restore"),
        }
        let context = EvaluationContext {
            call: self.flow.current_frame(),
            abrupt: event.abrupt,
            ..EvaluationContext::default()
        };
        self.emit(event, context);
    }

    fn task_finished(&mut self) {
        let path = self.root_path();
        self.flow.replace_path(path);
    }
}

/// Display name of a call, derived from the shape of the callee expression
fn frame_name(info: &CallInfo) -> String {
    let fallback = || {
        info.function_name
            .as_ref()
            .filter(|name| !name.as_str().is_empty())
            .map(|name| name.to_string())
            .unwrap_or_else(|| "<anonymous>".to_string())
    };
    match info.call_site.as_ref().map(|site| &site.kind) {
        Some(NodeKind::CallExpression { callee, .. }) => callee_name(callee).unwrap_or_else(fallback),
        Some(NodeKind::NewExpression { callee, .. }) => {
            format!("new {}", callee_name(callee).unwrap_or_else(fallback))
        }
        _ => fallback(),
    }
}

fn callee_name(callee: &NodeRef) -> Option<String> {
    match &callee.kind {
        NodeKind::Identifier { name } => Some(name.to_string()),
        NodeKind::Super {} => Some("super".to_string()),
        NodeKind::ChainExpression { expression } => callee_name(expression),
        NodeKind::MemberExpression {
            object,
            property,
            computed: false,
            ..
        } => {
            let property = property.identifier_name()?;
            Some(match &object.kind {
                NodeKind::ThisExpression {} => format!("this.{}", property),
                NodeKind::Super {} => format!("super.{}", property),
                NodeKind::Identifier { name } => format!("{}.{}", name, property),
                _ => property.to_string(),
            })
        }
        _ => None,
    }
}
