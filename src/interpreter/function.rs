//! Metafunction runtime
//!
//! Interpreted functions are reified as [`MetaFunction`] values: the defining
//! node, the closure scope and the evaluation config captured at creation.
//! The same `Rc<MetaFunction>` is reachable through two entry points:
//! [`Interpreter::begin_call`] pushes a steppable activation onto the current
//! task, [`Interpreter::call_function`] runs one to completion for host code.

use std::fmt;
use std::rc::Rc;

use crate::ast::{Function, MethodKind, Node, NodeKind, NodeRef, VariableKind};
use crate::environment::Environment;
use crate::error::JsError;
use crate::flow::Phase;
use crate::value::{
    CheapClone, ExoticObject, JsFunction, JsObject, JsObjectRef, JsString, JsValue, Property,
    function_name,
};

use super::Interpreter;
use super::eval_stack::{CallBoundary, CallKind, EvalConfig, Frame, HomeObject};
use super::intercept::{CallInfo, Site};

/// An interpreted function: node, closure and config
pub struct MetaFunction {
    pub node: NodeRef,
    pub closure: Environment,
    pub config: EvalConfig,
}

impl MetaFunction {
    pub fn function(&self) -> Result<&Function, JsError> {
        self.node
            .as_function()
            .ok_or_else(|| JsError::internal_error("function value without a function node"))
    }

    pub fn is_arrow(&self) -> bool {
        self.node.is_arrow()
    }

    pub fn is_async(&self) -> bool {
        self.node.as_function().is_some_and(|f| f.is_async)
    }
}

impl fmt::Debug for MetaFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetaFunction")
            .field("node", &self.node.node_type())
            .field("range", &self.node.range())
            .finish()
    }
}

/// A class value: optional explicit constructor plus parent constructor
pub struct ClassConstructor {
    pub node: NodeRef,
    pub name: Option<JsString>,
    pub constructor: Option<Rc<MetaFunction>>,
    pub parent: Option<JsObjectRef>,
}

impl fmt::Debug for ClassConstructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassConstructor")
            .field("name", &self.name)
            .field("derived", &self.parent.is_some())
            .finish()
    }
}

/// How a pattern stores the names it binds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindMode {
    /// `let`/`const`/parameters: new binding in the target scope
    Declare { mutable: bool },
    /// `var`: write the hoisted binding
    Var,
    /// Assignment to existing bindings
    Assign,
}

impl BindMode {
    pub fn for_kind(kind: VariableKind) -> Self {
        match kind {
            VariableKind::Var => BindMode::Var,
            VariableKind::Let => BindMode::Declare { mutable: true },
            VariableKind::Const => BindMode::Declare { mutable: false },
        }
    }
}

impl Interpreter {
    // ═══════════════════════════════════════════════════════════════════════
    // Creation
    // ═══════════════════════════════════════════════════════════════════════

    /// Create a callable value for a function/arrow node closing over `env`.
    /// Methods pass the object they are defined on as `home`.
    pub fn create_function(
        &mut self,
        node: &NodeRef,
        env: &Environment,
        home: Option<Rc<HomeObject>>,
    ) -> Result<JsValue, JsError> {
        let func = node
            .as_function()
            .ok_or_else(|| JsError::internal_error("not a function node"))?;
        if func.generator {
            return Err(JsError::not_implemented("generator functions"));
        }
        let arrow = node.is_arrow();
        let config = if arrow {
            EvalConfig {
                allow_await: func.is_async,
                home: self.task.config.home.clone(),
            }
        } else {
            EvalConfig {
                allow_await: func.is_async,
                home: home.clone(),
            }
        };
        let name = func
            .id
            .as_ref()
            .and_then(|id| id.identifier_name())
            .cloned()
            .unwrap_or_else(|| JsString::from(""));
        let arity = func
            .params
            .iter()
            .take_while(|p| matches!(p.kind, NodeKind::Identifier { .. } | NodeKind::ObjectPattern { .. }))
            .count();
        let constructible = !arrow && !func.is_async && home.is_none();

        let meta = Rc::new(MetaFunction {
            node: node.cheap_clone(),
            closure: env.cheap_clone(),
            config,
        });
        let mut object = JsObject::with_prototype(Some(self.realm.function_prototype.cheap_clone()));
        object.exotic = ExoticObject::Function(JsFunction::Interpreted(meta));
        object.define_property("name", Property::readonly(JsValue::String(name)));
        object.define_property("length", Property::readonly(JsValue::Number(arity as f64)));
        let object = object.into_ref();

        if constructible {
            let prototype = self.create_object();
            prototype
                .borrow_mut()
                .define_property("constructor", Property::hidden(JsValue::Object(object.cheap_clone())));
            object
                .borrow_mut()
                .define_property("prototype", Property::hidden(JsValue::Object(prototype)));
        }
        Ok(JsValue::Object(object))
    }

    /// Give an anonymous function the name it is bound to
    pub(crate) fn set_function_name(&self, value: &JsValue, name: &JsString) {
        let JsValue::Object(obj) = value else {
            return;
        };
        let mut obj = obj.borrow_mut();
        if !obj.is_callable() {
            return;
        }
        let unnamed = match obj.properties.get("name").map(|p| &p.value) {
            Some(JsValue::String(current)) => current.is_empty(),
            Some(_) => false,
            None => true,
        };
        if unnamed {
            obj.define_property("name", Property::readonly(JsValue::String(name.cheap_clone())));
        }
    }

    /// Build a class from its node and evaluated superclass
    pub(crate) fn define_class(
        &mut self,
        node: &NodeRef,
        parent: Option<JsValue>,
    ) -> Result<JsValue, JsError> {
        let class = match &node.kind {
            NodeKind::ClassDeclaration(class) | NodeKind::ClassExpression(class) => class,
            _ => return Err(JsError::internal_error("not a class node")),
        };
        let name = class
            .id
            .as_ref()
            .and_then(|id| id.identifier_name())
            .cloned();

        let (parent_ctor, parent_proto) = match parent {
            None => (None, Some(self.realm.object_prototype.cheap_clone())),
            Some(JsValue::Null) => (None, None),
            Some(JsValue::Object(ctor)) if ctor.borrow().is_callable() => {
                let proto = ctor.borrow().get_property("prototype");
                match proto {
                    Some(JsValue::Object(proto)) => (Some(ctor), Some(proto)),
                    Some(JsValue::Null) => (Some(ctor), None),
                    _ => {
                        return Err(JsError::type_error(
                            "Class extends value does not have valid prototype property",
                        ));
                    }
                }
            }
            Some(other) => {
                return Err(JsError::type_error(format!(
                    "Class extends value {} is not a constructor or null",
                    other.display_string()
                )));
            }
        };

        let prototype = JsObject::with_prototype(parent_proto.clone()).into_ref();
        let ctor_object = JsObject::with_prototype(Some(
            parent_ctor
                .clone()
                .unwrap_or_else(|| self.realm.function_prototype.cheap_clone()),
        ))
        .into_ref();
        let instance_home = Rc::new(HomeObject {
            object: prototype.cheap_clone(),
            parent: parent_proto,
            super_constructor: parent_ctor.clone(),
        });
        let static_home = Rc::new(HomeObject {
            object: ctor_object.cheap_clone(),
            parent: parent_ctor.clone(),
            super_constructor: None,
        });

        let NodeKind::ClassBody { body } = &class.body.kind else {
            return Err(JsError::internal_error("class without a body"));
        };
        let env = self.task.env.cheap_clone();
        let mut constructor = None;
        for member in body {
            let NodeKind::MethodDefinition {
                key,
                value,
                kind,
                is_static,
                computed,
            } = &member.kind
            else {
                return Err(JsError::not_implemented("class fields"));
            };
            if *computed {
                return Err(JsError::not_implemented("computed method names"));
            }
            let key = property_key_name(key)?;
            match kind {
                MethodKind::Constructor => {
                    constructor = Some(Rc::new(MetaFunction {
                        node: value.cheap_clone(),
                        closure: env.cheap_clone(),
                        config: EvalConfig {
                            allow_await: false,
                            home: Some(instance_home.cheap_clone()),
                        },
                    }));
                }
                MethodKind::Method => {
                    let (target, home) = if *is_static {
                        (&ctor_object, static_home.cheap_clone())
                    } else {
                        (&prototype, instance_home.cheap_clone())
                    };
                    let method = self.create_function(value, &env, Some(home))?;
                    self.set_function_name(&method, &key);
                    target.borrow_mut().define_property(key, Property::hidden(method));
                }
                MethodKind::Get | MethodKind::Set => {
                    return Err(JsError::not_implemented("getters and setters"));
                }
            }
        }

        {
            let mut ctor = ctor_object.borrow_mut();
            ctor.exotic = ExoticObject::Function(JsFunction::Class(Rc::new(ClassConstructor {
                node: node.cheap_clone(),
                name: name.clone(),
                constructor,
                parent: parent_ctor,
            })));
            ctor.define_property(
                "name",
                Property::readonly(JsValue::String(name.unwrap_or_else(|| JsString::from("")))),
            );
            ctor.define_property("prototype", Property::readonly(JsValue::Object(prototype.cheap_clone())));
        }
        prototype.borrow_mut().define_property(
            "constructor",
            Property::hidden(JsValue::Object(ctor_object.cheap_clone())),
        );
        Ok(JsValue::Object(ctor_object))
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Steppable calls
    // ═══════════════════════════════════════════════════════════════════════

    /// Start a call on the current task. Interpreted callees push an
    /// activation, everything else pushes its result right away.
    pub(crate) fn begin_call(
        &mut self,
        callee: JsValue,
        this: JsValue,
        args: Vec<JsValue>,
        site: Option<&NodeRef>,
    ) -> Result<(), JsError> {
        let JsValue::Object(object) = &callee else {
            return Err(not_a_function(site, &callee));
        };
        let function = object.borrow().as_function().cloned();
        let Some(function) = function else {
            return Err(not_a_function(site, &callee));
        };
        match function {
            JsFunction::Interpreted(meta) => {
                let info = call_info(site, object, &args, false);
                self.invoke(meta, this, args, info, CallKind::Sync)
            }
            JsFunction::Class(class) => Err(JsError::type_error(format!(
                "Class constructor {} cannot be invoked without 'new'",
                class.name.as_ref().map(|n| n.as_str()).unwrap_or("")
            ))),
            JsFunction::Native(native) => {
                let value = (native.func)(self, this, &args)?;
                self.task.push_value(value);
                Ok(())
            }
            JsFunction::Bound(bound) => {
                let mut full = bound.bound_args.clone();
                full.extend(args);
                self.begin_call(
                    JsValue::Object(bound.target.cheap_clone()),
                    bound.this_arg.clone(),
                    full,
                    site,
                )
            }
            JsFunction::PromiseResolve(promise) => {
                self.resolve_promise(&promise, args.into_iter().next().unwrap_or_default());
                self.task.push_value(JsValue::Undefined);
                Ok(())
            }
            JsFunction::PromiseReject(promise) => {
                self.reject_promise(&promise, args.into_iter().next().unwrap_or_default());
                self.task.push_value(JsValue::Undefined);
                Ok(())
            }
        }
    }

    /// `new callee(...args)` on the current task
    pub(crate) fn construct(
        &mut self,
        callee: JsValue,
        args: Vec<JsValue>,
        site: &NodeRef,
    ) -> Result<(), JsError> {
        let JsValue::Object(ctor) = &callee else {
            return Err(not_a_constructor(&callee));
        };
        if self
            .realm
            .promise_constructor
            .as_ref()
            .is_some_and(|promise| std::rc::Rc::ptr_eq(promise, ctor))
        {
            return self.construct_promise(args, site);
        }
        let function = ctor.borrow().as_function().cloned();
        match function {
            Some(JsFunction::Interpreted(meta)) => {
                if meta.is_arrow() || meta.is_async() {
                    return Err(not_a_constructor(&callee));
                }
                let this = self.instance_for(ctor);
                let info = call_info(Some(site), ctor, &args, true);
                self.invoke(
                    meta,
                    JsValue::Object(this.cheap_clone()),
                    args,
                    info,
                    CallKind::Construct { this },
                )
            }
            Some(JsFunction::Class(class)) => {
                let this = self.instance_for(ctor);
                self.construct_class(&class, this, args, site)
            }
            Some(JsFunction::Native(native)) => {
                let value = (native.func)(self, JsValue::Undefined, &args)?;
                self.task.push_value(value);
                Ok(())
            }
            Some(JsFunction::Bound(bound)) => {
                let mut full = bound.bound_args.clone();
                full.extend(args);
                self.construct(JsValue::Object(bound.target.cheap_clone()), full, site)
            }
            _ => Err(not_a_constructor(&callee)),
        }
    }

    /// `super(...args)` inside a derived constructor
    pub(crate) fn super_call(&mut self, args: Vec<JsValue>, site: &NodeRef) -> Result<(), JsError> {
        let parent = self
            .task
            .config
            .home
            .as_ref()
            .and_then(|home| home.super_constructor.clone())
            .ok_or_else(|| {
                JsError::syntax_error("'super' keyword unexpected here", 0, 0)
            })?;
        let this = match self.task.env.get("this") {
            Some(JsValue::Object(this)) => this,
            _ => return Err(JsError::reference_error("this")),
        };
        self.construct_with_this(parent, this, args, site)
    }

    fn construct_class(
        &mut self,
        class: &ClassConstructor,
        this: JsObjectRef,
        args: Vec<JsValue>,
        site: &NodeRef,
    ) -> Result<(), JsError> {
        match (&class.constructor, &class.parent) {
            (Some(meta), _) => {
                let info = CallInfo {
                    call_site: Some(site.cheap_clone()),
                    function_name: class.name.clone(),
                    args: args.clone(),
                    construct: true,
                };
                self.invoke(
                    meta.cheap_clone(),
                    JsValue::Object(this.cheap_clone()),
                    args,
                    info,
                    CallKind::Construct { this },
                )
            }
            // Implicit `constructor(...args) { super(...args) }`
            (None, Some(parent)) => self.construct_with_this(parent.cheap_clone(), this, args, site),
            (None, None) => {
                self.task.push_value(JsValue::Object(this));
                Ok(())
            }
        }
    }

    /// Run a parent constructor against an existing instance
    fn construct_with_this(
        &mut self,
        parent: JsObjectRef,
        this: JsObjectRef,
        args: Vec<JsValue>,
        site: &NodeRef,
    ) -> Result<(), JsError> {
        let function = parent.borrow().as_function().cloned();
        match function {
            Some(JsFunction::Class(class)) => self.construct_class(&class, this, args, site),
            Some(JsFunction::Interpreted(meta)) => {
                let info = call_info(Some(site), &parent, &args, true);
                self.invoke(
                    meta,
                    JsValue::Object(this.cheap_clone()),
                    args,
                    info,
                    CallKind::Construct { this },
                )
            }
            Some(JsFunction::Native(native)) => {
                let result = (native.func)(self, JsValue::Undefined, &args)?;
                adopt_instance(&this, &result);
                self.task.push_value(JsValue::Object(this));
                Ok(())
            }
            Some(JsFunction::Bound(bound)) => {
                let mut full = bound.bound_args.clone();
                full.extend(args);
                self.construct_with_this(bound.target.cheap_clone(), this, full, site)
            }
            _ => Err(JsError::type_error("Super constructor is not a constructor")),
        }
    }

    /// `new Promise(executor)`: the executor runs steppably
    fn construct_promise(&mut self, args: Vec<JsValue>, site: &NodeRef) -> Result<(), JsError> {
        let executor = args.into_iter().next().unwrap_or_default();
        if !executor.is_callable() {
            return Err(JsError::type_error(format!(
                "Promise resolver {} is not a function",
                executor.display_string()
            )));
        }
        let promise = self.create_promise();
        let (resolve, reject) = self.resolving_functions(&promise);
        self.task.push_frame(Frame::PromiseExecutor(promise));
        self.begin_call(executor, JsValue::Undefined, vec![resolve, reject], Some(site))
    }

    fn instance_for(&self, ctor: &JsObjectRef) -> JsObjectRef {
        let prototype = match ctor.borrow().get_property("prototype") {
            Some(JsValue::Object(proto)) => proto,
            _ => self.realm.object_prototype.cheap_clone(),
        };
        JsObject::with_prototype(Some(prototype)).into_ref()
    }

    /// Push an activation of `meta`: announce the call, switch scope, bind
    /// parameters, hoist declarations and schedule the body
    pub(crate) fn invoke(
        &mut self,
        meta: Rc<MetaFunction>,
        this: JsValue,
        args: Vec<JsValue>,
        info: CallInfo,
        kind: CallKind,
    ) -> Result<(), JsError> {
        if self.call_depth >= self.max_call_depth {
            return Err(JsError::range_error("Maximum call stack size exceeded"));
        }
        let func = meta.function()?;
        let kind = if func.is_async {
            CallKind::Async {
                promise: self.create_promise(),
            }
        } else {
            kind
        };
        let site = Site::Call(Rc::new(info));
        self.report(&meta.node, Phase::Enter, None, &site, false);
        self.call_depth += 1;

        let fn_env = meta.closure.child();
        if !meta.is_arrow() {
            fn_env.declare(JsString::from("this"), this, false);
        }
        let config = EvalConfig {
            allow_await: func.is_async,
            home: meta.config.home.clone(),
        };
        let saved_env = std::mem::replace(&mut self.task.env, fn_env.cheap_clone());
        let saved_config = std::mem::replace(&mut self.task.config, config);
        let values_len = self.task.values.len();
        self.task.push_frame(Frame::CallBoundary(Box::new(CallBoundary {
            function: meta.node.cheap_clone(),
            site,
            saved_env,
            saved_config,
            values_len,
            expression_body: func.expression,
            kind,
            resumed: false,
        })));

        let body_env = self.bind_parameters(&func.params, &fn_env, args)?;
        self.task.env = body_env.cheap_clone();
        if func.expression {
            self.task.push_frame(Frame::Eval(func.body.cheap_clone()));
        } else {
            if let NodeKind::BlockStatement { body } = &func.body.kind {
                self.hoist_declarations(body, &body_env, true)?;
            }
            self.task.push_frame(Frame::Statements {
                node: func.body.cheap_clone(),
                index: 0,
                record: false,
            });
        }
        Ok(())
    }

    /// Body of an activation completed with `value`
    pub(crate) fn finish_call(&mut self, boundary: CallBoundary, value: JsValue) {
        let CallBoundary {
            function,
            site,
            saved_env,
            saved_config,
            values_len,
            kind,
            resumed,
            ..
        } = boundary;
        self.task.values.truncate(values_len);
        self.report(&function, Phase::Exit, Some(&value), &site, false);
        self.task.env = saved_env;
        self.task.config = saved_config;
        self.call_depth = self.call_depth.saturating_sub(1);

        match kind {
            CallKind::Sync => self.task.push_value(value),
            CallKind::Construct { this } => {
                let result = match value {
                    JsValue::Object(obj) => JsValue::Object(obj),
                    _ => JsValue::Object(this),
                };
                self.task.push_value(result);
            }
            CallKind::Async { promise } => {
                self.resolve_promise(&promise, value);
                if !resumed {
                    self.task.push_value(JsValue::Object(promise));
                }
            }
        }
    }

    /// An exception left the activation. Async activations turn it into a
    /// rejection and stop it; for the rest it keeps propagating.
    pub(crate) fn fail_call(&mut self, boundary: CallBoundary, error: JsError) -> Option<JsError> {
        let CallBoundary {
            function,
            site,
            saved_env,
            saved_config,
            values_len,
            kind,
            resumed,
            ..
        } = boundary;
        self.task.values.truncate(values_len);
        self.report(&function, Phase::Exit, None, &site, true);
        self.task.env = saved_env;
        self.task.config = saved_config;
        self.call_depth = self.call_depth.saturating_sub(1);

        match kind {
            CallKind::Async { promise } => {
                let reason = self.error_value(&error);
                self.reject_promise(&promise, reason);
                if !resumed {
                    self.task.push_value(JsValue::Object(promise));
                }
                None
            }
            _ => Some(error),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Parameters and patterns
    // ═══════════════════════════════════════════════════════════════════════

    /// Bind call arguments. Object patterns read their argument through an
    /// internal bridging scope; the returned scope is the body scope.
    fn bind_parameters(
        &mut self,
        params: &[NodeRef],
        fn_env: &Environment,
        args: Vec<JsValue>,
    ) -> Result<Environment, JsError> {
        let has_pattern = params
            .iter()
            .any(|p| matches!(p.kind, NodeKind::ObjectPattern { .. }));
        let bridge = has_pattern.then(|| fn_env.internal_child());
        let body_env = match &bridge {
            Some(bridge) => bridge.child(),
            None => fn_env.cheap_clone(),
        };

        for (index, param) in params.iter().enumerate() {
            match &param.kind {
                NodeKind::Identifier { name } => {
                    let value = args.get(index).cloned().unwrap_or_default();
                    body_env.declare(name.cheap_clone(), value, true);
                }
                NodeKind::RestElement { argument } => {
                    let Some(name) = argument.identifier_name() else {
                        return Err(JsError::not_implemented("destructuring rest parameters"));
                    };
                    let rest = args.get(index..).map(<[JsValue]>::to_vec).unwrap_or_default();
                    let rest = self.create_array(rest);
                    body_env.declare(name.cheap_clone(), rest, true);
                }
                NodeKind::ObjectPattern { .. } => {
                    let slot = JsString::from(format!("%arg{}", index));
                    let value = args.get(index).cloned().unwrap_or_default();
                    let source = match &bridge {
                        Some(bridge) => {
                            bridge.declare(slot.cheap_clone(), value, false);
                            bridge.get(slot.as_str()).unwrap_or_default()
                        }
                        None => value,
                    };
                    self.destructure(param, source, &body_env, BindMode::Declare { mutable: true })?;
                }
                NodeKind::AssignmentPattern {} => {
                    return Err(JsError::not_implemented("default parameter values"));
                }
                NodeKind::ArrayPattern {} => {
                    return Err(JsError::not_implemented("array destructuring parameters"));
                }
                _ => {
                    return Err(JsError::not_implemented(format!(
                        "{} parameters",
                        param.node_type()
                    )));
                }
            }
        }
        Ok(body_env)
    }

    /// Bind `value` to every name in `pattern`
    pub(crate) fn destructure(
        &mut self,
        pattern: &NodeRef,
        value: JsValue,
        env: &Environment,
        mode: BindMode,
    ) -> Result<(), JsError> {
        match &pattern.kind {
            NodeKind::Identifier { name } => bind_name(env, name, value, mode),
            NodeKind::ObjectPattern { properties } => {
                if value.is_null_or_undefined() {
                    return Err(JsError::type_error(format!(
                        "Cannot destructure '{}' as it is {}.",
                        value.to_js_string(),
                        value.to_js_string()
                    )));
                }
                let mut used = Vec::new();
                for property in properties {
                    match &property.kind {
                        NodeKind::Property {
                            key,
                            value: target,
                            computed,
                            ..
                        } => {
                            if *computed {
                                return Err(JsError::not_implemented("computed keys in patterns"));
                            }
                            let key = property_key_name(key)?;
                            let item = self.get_value_property(&value, key.as_str())?;
                            used.push(key);
                            self.destructure(target, item, env, mode)?;
                        }
                        NodeKind::RestElement { argument } => {
                            let rest = self.create_object();
                            if let JsValue::Object(source) = &value {
                                let source = source.borrow();
                                for key in source.own_keys() {
                                    if !used.contains(&key) {
                                        let item = source.get_own_property(key.as_str()).unwrap_or_default();
                                        rest.borrow_mut().set_property(key, item);
                                    }
                                }
                            }
                            self.destructure(argument, JsValue::Object(rest), env, mode)?;
                        }
                        _ => return Err(JsError::syntax_error("Invalid destructuring target", 0, 0)),
                    }
                }
                Ok(())
            }
            NodeKind::AssignmentPattern {} => {
                Err(JsError::not_implemented("default values in patterns"))
            }
            NodeKind::ArrayPattern {} => Err(JsError::not_implemented("array destructuring")),
            NodeKind::MemberExpression { .. } => {
                Err(JsError::not_implemented("member expressions in patterns"))
            }
            _ => Err(JsError::syntax_error("Invalid destructuring target", 0, 0)),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Hoisting
    // ═══════════════════════════════════════════════════════════════════════

    /// Declare function declarations of `body` in `env`, and with `vars`
    /// also every `var` name of the enclosing function body
    pub(crate) fn hoist_declarations(
        &mut self,
        body: &[NodeRef],
        env: &Environment,
        vars: bool,
    ) -> Result<(), JsError> {
        let mut names = Vec::new();
        for statement in body {
            if vars {
                collect_var_names(statement, &mut names);
            }
            if let NodeKind::FunctionDeclaration(func) = &statement.kind {
                if let Some(name) = func.id.as_ref().and_then(|id| id.identifier_name()) {
                    let value = self.create_function(statement, env, None)?;
                    env.declare(name.cheap_clone(), value, true);
                }
            }
        }
        for name in names {
            env.declare_var(name);
        }
        Ok(())
    }
}

fn bind_name(env: &Environment, name: &JsString, value: JsValue, mode: BindMode) -> Result<(), JsError> {
    match mode {
        BindMode::Declare { mutable } => {
            env.declare(name.cheap_clone(), value, mutable);
            Ok(())
        }
        BindMode::Var => {
            if env.assign(name.as_str(), value.clone()).is_err() {
                env.declare(name.cheap_clone(), value, true);
            }
            Ok(())
        }
        BindMode::Assign => env.assign(name.as_str(), value),
    }
}

/// Move the state of a natively constructed object into `this`
fn adopt_instance(this: &JsObjectRef, result: &JsValue) {
    let JsValue::Object(result) = result else {
        return;
    };
    if std::rc::Rc::ptr_eq(this, result) {
        return;
    }
    let (exotic, properties) = {
        let mut result = result.borrow_mut();
        (
            std::mem::take(&mut result.exotic),
            std::mem::take(&mut result.properties),
        )
    };
    let mut this = this.borrow_mut();
    this.exotic = exotic;
    for (key, property) in properties {
        this.properties.insert(key, property);
    }
}

fn call_info(site: Option<&NodeRef>, callee: &JsObjectRef, args: &[JsValue], construct: bool) -> CallInfo {
    CallInfo {
        call_site: site.cloned(),
        function_name: function_name(&callee.borrow()),
        args: args.to_vec(),
        construct,
    }
}

/// Static key of a property or pattern entry
pub(crate) fn property_key_name(key: &Node) -> Result<JsString, JsError> {
    match &key.kind {
        NodeKind::Identifier { name } => Ok(name.cheap_clone()),
        NodeKind::Literal { value, .. } => Ok(match value {
            serde_json::Value::String(s) => JsString::from(s.as_str()),
            serde_json::Value::Number(n) => {
                JsValue::Number(n.as_f64().unwrap_or(f64::NAN)).to_js_string()
            }
            other => JsString::from(other.to_string()),
        }),
        _ => Err(JsError::syntax_error("Unexpected property key", 0, 0)),
    }
}

/// Names bound by a pattern
pub(crate) fn pattern_names(pattern: &Node, out: &mut Vec<JsString>) {
    match &pattern.kind {
        NodeKind::Identifier { name } => out.push(name.cheap_clone()),
        NodeKind::ObjectPattern { properties } => {
            for property in properties {
                match &property.kind {
                    NodeKind::Property { value, .. } => pattern_names(value, out),
                    NodeKind::RestElement { argument } => pattern_names(argument, out),
                    _ => {}
                }
            }
        }
        NodeKind::RestElement { argument } => pattern_names(argument, out),
        _ => {}
    }
}

/// `var` names declared anywhere in a statement, not looking into nested
/// functions
fn collect_var_names(statement: &Node, out: &mut Vec<JsString>) {
    match &statement.kind {
        NodeKind::VariableDeclaration {
            declarations,
            kind: VariableKind::Var,
        } => {
            for declarator in declarations {
                if let NodeKind::VariableDeclarator { id, .. } = &declarator.kind {
                    pattern_names(id, out);
                }
            }
        }
        NodeKind::BlockStatement { body } => {
            for child in body {
                collect_var_names(child, out);
            }
        }
        NodeKind::IfStatement {
            consequent,
            alternate,
            ..
        } => {
            collect_var_names(consequent, out);
            if let Some(alternate) = alternate {
                collect_var_names(alternate, out);
            }
        }
        NodeKind::ForStatement { init, body, .. } => {
            if let Some(init) = init {
                collect_var_names(init, out);
            }
            collect_var_names(body, out);
        }
        NodeKind::ForInStatement { left, body, .. } | NodeKind::ForOfStatement { left, body, .. } => {
            collect_var_names(left, out);
            collect_var_names(body, out);
        }
        NodeKind::WhileStatement { body, .. } | NodeKind::DoWhileStatement { body, .. } => {
            collect_var_names(body, out);
        }
        NodeKind::TryStatement {
            block,
            handler,
            finalizer,
        } => {
            collect_var_names(block, out);
            if let Some(handler) = handler {
                collect_var_names(handler, out);
            }
            if let Some(finalizer) = finalizer {
                collect_var_names(finalizer, out);
            }
        }
        NodeKind::CatchClause { body, .. } => collect_var_names(body, out),
        NodeKind::SwitchStatement { cases, .. } => {
            for case in cases {
                if let NodeKind::SwitchCase { consequent, .. } = &case.kind {
                    for child in consequent {
                        collect_var_names(child, out);
                    }
                }
            }
        }
        _ => {}
    }
}

/// Source-shaped description of a callee for error messages
pub(crate) fn describe_callee(site: Option<&NodeRef>) -> Option<String> {
    let callee = match &site?.kind {
        NodeKind::CallExpression { callee, .. } | NodeKind::NewExpression { callee, .. } => callee,
        _ => return None,
    };
    expression_text(callee)
}

fn expression_text(node: &Node) -> Option<String> {
    match &node.kind {
        NodeKind::Identifier { name } => Some(name.to_string()),
        NodeKind::ThisExpression {} => Some("this".to_string()),
        NodeKind::Super {} => Some("super".to_string()),
        NodeKind::MemberExpression {
            object,
            property,
            computed: false,
            ..
        } => {
            let object = expression_text(object).unwrap_or_else(|| "(intermediate value)".to_string());
            let property = property.identifier_name()?;
            Some(format!("{}.{}", object, property))
        }
        _ => None,
    }
}

fn not_a_function(site: Option<&NodeRef>, callee: &JsValue) -> JsError {
    let description = describe_callee(site).unwrap_or_else(|| callee.display_string());
    JsError::type_error(format!("{} is not a function", description))
}

fn not_a_constructor(callee: &JsValue) -> JsError {
    JsError::type_error(format!("{} is not a constructor", callee.display_string()))
}
