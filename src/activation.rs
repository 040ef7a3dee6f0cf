// Lexical scoping and resource-slot invalidation (§4.2.1, §9.1).
//
// Generalizes the teacher's `Env<T>` (a `RefCell`-backed scope plus a
// parent chain) from a single interned-value map into the variable
// model the interpreter needs: `get` peeks a slot's current value
// (cheap, repeatable, used for ordinary reads like `self.field`),
// while `take` is the one operation that actually empties a slot, the
// way Rust's own move semantics work, so a later `get`/`take` of the
// same name fails with `InvalidatedResource` rather than returning a
// stale value. The interpreter calls `take` only at the handful of
// syntactic positions Cadence treats as a move of a bare identifier
// (see `Interpreter::eval_for_transfer`); everywhere else it peeks.
// Every program location gets its own base activation
// (`Activation::root`), chained by `Activation::chain` for nested
// scopes and function calls.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::elaboration::TypeRegistry;
use crate::errors::{InterpreterError, Result, ValueError};
use crate::value::{Slot, Value};

pub struct Activation {
    scope: RefCell<HashMap<String, Slot>>,
    parent: Option<Rc<Activation>>,
}

impl Activation {
    pub fn root() -> Rc<Activation> {
        Rc::new(Activation { scope: RefCell::new(HashMap::new()), parent: None })
    }

    pub fn chain(parent: &Rc<Activation>) -> Rc<Activation> {
        Rc::new(Activation { scope: RefCell::new(HashMap::new()), parent: Some(Rc::clone(parent)) })
    }

    /// Binds `name` to a fresh slot in the current scope, shadowing
    /// any outer binding of the same name.
    pub fn define(&self, name: &str, value: Value) {
        self.scope.borrow_mut().insert(name.to_string(), Rc::new(RefCell::new(Some(value))));
    }

    fn find_slot(&self, name: &str) -> Option<Slot> {
        if let Some(slot) = self.scope.borrow().get(name) {
            return Some(Rc::clone(slot));
        }
        self.parent.as_ref().and_then(|p| p.find_slot(name))
    }

    /// A reference-taking expression (`&x`) wants the slot itself,
    /// not its current contents, so the reference observes later
    /// assignments and is correctly "dangling" after a move (§4.3).
    pub fn slot(&self, name: &str) -> Option<Slot> {
        self.find_slot(name)
    }

    /// Reads `name` without consuming it: a shared, cloned handle to
    /// whatever is currently bound (cheap for everything but a
    /// struct, since containers and composites are `Rc`-backed).
    /// Used for every read except the narrow set of positions that
    /// actually transfer a value (see `take`).
    pub fn get(&self, name: &str, _registry: &TypeRegistry) -> Result<Value> {
        let slot = self
            .find_slot(name)
            .ok_or_else(|| InterpreterError::UndefinedIdentifier(name.to_string()))?;
        let value = slot.borrow().clone();
        value.ok_or_else(|| ValueError::InvalidatedResource.into())
    }

    /// Removes and returns `name`'s value, leaving the slot empty.
    /// This is the operation that actually implements resource
    /// linearity (§9.1): it's called only at the specific positions
    /// where Cadence requires moving a named variable — the RHS of a
    /// `let`/assignment, a call argument, a `return` expression — not
    /// for every read (`self.field`, `a.b.c` never take).
    pub fn take(&self, name: &str, _registry: &TypeRegistry) -> Result<Value> {
        let slot = self
            .find_slot(name)
            .ok_or_else(|| InterpreterError::UndefinedIdentifier(name.to_string()))?;
        let value = slot.borrow_mut().take();
        value.ok_or_else(|| ValueError::InvalidatedResource.into())
    }

    /// Overwrites an existing binding (assignment statements), as
    /// opposed to `define`, which introduces a new one.
    pub fn assign(&self, name: &str, value: Value) -> Result<()> {
        let slot = self
            .find_slot(name)
            .ok_or_else(|| InterpreterError::UndefinedIdentifier(name.to_string()))?;
        *slot.borrow_mut() = Some(value);
        Ok(())
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.find_slot(name).is_some()
    }

    /// Names bound directly in this scope, not counting parents. Used
    /// to copy every export out of a freshly-evaluated location's
    /// globals for a bare `import Location` (§5 "program import").
    pub fn defined_names(&self) -> Vec<String> {
        self.scope.borrow().keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::{Location, TypeID};
    use crate::static_type::CompositeKind;
    use crate::value::CompositeValue;
    use indexmap::IndexMap;

    fn resource_value() -> Value {
        let composite = CompositeValue::new(
            Location::Test,
            TypeID("T.test.R".to_string()),
            CompositeKind::Resource,
            Rc::new(IndexMap::new()),
            Some(1),
        );
        Value::Composite(Rc::new(RefCell::new(composite)))
    }

    #[test]
    fn taking_a_resource_identifier_invalidates_its_slot() {
        let registry = TypeRegistry::new();
        let root = Activation::root();
        root.define("r", resource_value());
        assert!(root.take("r", &registry).is_ok());
        let second_read = root.get("r", &registry);
        assert!(matches!(second_read, Err(InterpreterError::Value(ValueError::InvalidatedResource))));
    }

    #[test]
    fn peeking_a_resource_does_not_consume_it() {
        let registry = TypeRegistry::new();
        let root = Activation::root();
        root.define("r", resource_value());
        assert!(root.get("r", &registry).is_ok());
        assert!(root.get("r", &registry).is_ok());
    }

    #[test]
    fn nested_scope_sees_parent_bindings() {
        let registry = TypeRegistry::new();
        let root = Activation::root();
        root.define("x", Value::Bool(true));
        let child = Activation::chain(&root);
        assert!(matches!(child.get("x", &registry), Ok(Value::Bool(true))));
    }

    #[test]
    fn assignment_requires_existing_binding() {
        let root = Activation::root();
        assert!(root.assign("missing", Value::Void).is_err());
    }
}
