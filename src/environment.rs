//! Lexical environments
//!
//! A singly linked chain of scopes. Every chain ends in the root scope built by
//! [`Environment::root`], which binds the program-visible globals and a `this`
//! that refers to the global object.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::error::JsError;
use crate::value::{CheapClone, JsString, JsValue};

/// Variable binding
#[derive(Debug, Clone)]
pub struct Binding {
    pub value: JsValue,
    pub mutable: bool,
}

#[derive(Debug)]
struct Scope {
    vars: FxHashMap<JsString, Binding>,
    parent: Option<Environment>,
    /// Bridging scope that assignment lookups skip over
    internal: bool,
}

/// Shared handle to one scope of the chain
#[derive(Debug, Clone)]
pub struct Environment(Rc<RefCell<Scope>>);

impl CheapClone for Environment {}

impl Environment {
    /// Build the root scope. `this` is bound to `global`, so the root is a
    /// complete value from the moment it exists.
    pub fn root(global: JsValue, bindings: impl IntoIterator<Item = (JsString, JsValue)>) -> Self {
        let mut vars: FxHashMap<JsString, Binding> = bindings
            .into_iter()
            .map(|(name, value)| {
                (
                    name,
                    Binding {
                        value,
                        mutable: true,
                    },
                )
            })
            .collect();
        vars.insert(
            JsString::from("this"),
            Binding {
                value: global,
                mutable: false,
            },
        );
        Environment(Rc::new(RefCell::new(Scope {
            vars,
            parent: None,
            internal: false,
        })))
    }

    /// New ordinary child scope
    pub fn child(&self) -> Self {
        self.make_child(false)
    }

    /// New non-writable bridging scope (parameter destructuring, catch values)
    pub fn internal_child(&self) -> Self {
        self.make_child(true)
    }

    fn make_child(&self, internal: bool) -> Self {
        Environment(Rc::new(RefCell::new(Scope {
            vars: FxHashMap::default(),
            parent: Some(self.cheap_clone()),
            internal,
        })))
    }

    pub fn parent(&self) -> Option<Environment> {
        self.0.borrow().parent.clone()
    }

    pub fn is_internal(&self) -> bool {
        self.0.borrow().internal
    }

    pub fn ptr_eq(&self, other: &Environment) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Create (or overwrite) a binding in this scope
    pub fn declare(&self, name: JsString, value: JsValue, mutable: bool) {
        self.0
            .borrow_mut()
            .vars
            .insert(name, Binding { value, mutable });
    }

    /// Declare a `var`-style binding without clobbering an existing one
    pub fn declare_var(&self, name: JsString) {
        self.0
            .borrow_mut()
            .vars
            .entry(name)
            .or_insert(Binding {
                value: JsValue::Undefined,
                mutable: true,
            });
    }

    pub fn has_own(&self, name: &str) -> bool {
        self.0.borrow().vars.contains_key(name)
    }

    /// Resolve a name through the whole chain
    pub fn get(&self, name: &str) -> Option<JsValue> {
        let mut current = Some(self.cheap_clone());
        while let Some(env) = current {
            let scope = env.0.borrow();
            if let Some(binding) = scope.vars.get(name) {
                return Some(binding.value.clone());
            }
            current = scope.parent.clone();
        }
        None
    }

    /// Assign to an existing binding, skipping internal scopes
    pub fn assign(&self, name: &str, value: JsValue) -> Result<(), JsError> {
        let mut current = Some(self.cheap_clone());
        while let Some(env) = current {
            let mut scope = env.0.borrow_mut();
            if !scope.internal {
                if let Some(binding) = scope.vars.get_mut(name) {
                    if !binding.mutable {
                        return Err(JsError::type_error("Assignment to constant variable."));
                    }
                    binding.value = value;
                    return Ok(());
                }
            }
            current = scope.parent.clone();
        }
        Err(JsError::reference_error(name))
    }

    /// Own bindings of this scope, sorted by name, for display
    pub fn bindings(&self) -> Vec<(JsString, JsValue)> {
        let scope = self.0.borrow();
        let mut out: Vec<(JsString, JsValue)> = scope
            .vars
            .iter()
            .map(|(name, binding)| (name.cheap_clone(), binding.value.clone()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    /// Number of scopes between this one and the root
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut current = self.parent();
        while let Some(env) = current {
            depth += 1;
            current = env.parent();
        }
        depth
    }
}
