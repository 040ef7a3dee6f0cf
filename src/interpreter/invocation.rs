// Calling a function and constructing/destroying a composite (§4.2.4,
// §3.2 "Composite").
//
// Condition ordering follows the linearized supertype list the
// registry precomputes (`TypeRegistry::freeze`, §4.2.5): a composite's
// functions are "baked" once at `construct` time with their full,
// ordered pre/post-condition lists already spliced in, so the actual
// call path (`call_interpreted`) never has to walk the conformance
// graph itself — it just runs `decl.pre_conditions`/`post_conditions`
// in the order they were assembled.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::activation::Activation;
use crate::ast::{Condition, FunctionDecl};
use crate::elaboration::{Conditions, TypeRegistry};
use crate::errors::{ConditionKind, InterpreterError, Result};
use crate::location::TypeID;
use crate::static_type::StaticType;
use crate::value::{CompositeValue, FunctionRepr, FunctionValue, Value};

use super::{Flow, Interpreter};

/// Gathers the conditions a composite method must run, super-first for
/// preconditions and sub-first for postconditions (§4.2.5).
pub struct ConditionContext;

impl ConditionContext {
    /// Walks `type_id`'s linearized supertype list (interfaces before
    /// the concrete type itself) collecting whatever `conditions`
    /// entry each ancestor declares for `function_name`, pre-order for
    /// preconditions and reverse order for postconditions.
    pub fn linearized(registry: &TypeRegistry, type_id: &TypeID, function_name: &str) -> Conditions {
        let chain = registry
            .get(type_id)
            .map(|def| def.linearized_supertypes.clone())
            .filter(|chain| !chain.is_empty())
            .unwrap_or_else(|| vec![type_id.clone()]);

        let mut pre = Vec::new();
        for ancestor in &chain {
            if let Some(conditions) = registry.get(ancestor).and_then(|def| def.conditions.get(function_name)) {
                pre.extend(conditions.pre.iter().cloned());
            }
        }
        let mut post = Vec::new();
        for ancestor in chain.iter().rev() {
            if let Some(conditions) = registry.get(ancestor).and_then(|def| def.conditions.get(function_name)) {
                post.extend(conditions.post.iter().cloned());
            }
        }
        Conditions { pre, post }
    }
}

impl<'a> Interpreter<'a> {
    /// Dispatches a call to whichever `FunctionRepr` the callee holds.
    pub fn call_function(&mut self, function: &FunctionValue, arguments: Vec<Value>) -> Result<Value> {
        match &function.repr {
            FunctionRepr::Host(host) => host(&arguments),
            FunctionRepr::Constructor { type_id } => {
                self.observer.on_function_invocation(&Some(type_id.clone()));
                self.construct(type_id, arguments)
            }
            FunctionRepr::Bound { receiver, function: inner } => {
                let type_id = match &**receiver {
                    Value::Composite(c) => Some(c.borrow().type_id.clone()),
                    _ => None,
                };
                self.observer.on_function_invocation(&type_id);
                self.call_interpreted(inner, Some((**receiver).clone()), arguments)
            }
            FunctionRepr::Interpreter { .. } => {
                self.observer.on_function_invocation(&None);
                self.call_interpreted(function, None, arguments)
            }
        }
    }

    /// Runs an interpreted closure or method: binds parameters into a
    /// fresh scope chained from the closure's defining activation,
    /// runs preconditions, executes the body, runs postconditions
    /// (with `before()` support), and transfers the return value out.
    fn call_interpreted(&mut self, function: &FunctionValue, receiver: Option<Value>, arguments: Vec<Value>) -> Result<Value> {
        let (decl, closure, location) = match &function.repr {
            FunctionRepr::Interpreter { decl, closure, location } => (Rc::clone(decl), Rc::clone(closure), location.clone()),
            _ => return Err(InterpreterError::NotCallable),
        };
        if arguments.len() != decl.parameters.len() {
            return Err(InterpreterError::ArityMismatch { expected: decl.parameters.len(), actual: arguments.len() });
        }

        let call_activation = Activation::chain(&closure);
        if let Some(receiver) = receiver {
            call_activation.define("self", receiver);
        }
        for (parameter, argument) in decl.parameters.iter().zip(arguments.into_iter()) {
            let coerced = crate::dynamic_cast::try_cast(&argument, &parameter.declared_type, self.registry).ok_or_else(|| {
                crate::errors::CastError::ForceCastTypeMismatch {
                    expected: parameter.declared_type.clone(),
                    actual: argument.static_type(self.registry),
                }
            })?;
            let bound = coerced.transfer(None, self.registry)?;
            call_activation.define(&parameter.name, bound);
        }

        let snapshots = self.collect_before_snapshots(&call_activation, &decl.post_conditions)?;
        *self.before_snapshots.borrow_mut() = Some(snapshots);
        let result = self.run_call_body(&call_activation, &decl, &location);
        *self.before_snapshots.borrow_mut() = None;
        result
    }

    fn run_call_body(&mut self, call_activation: &Rc<Activation>, decl: &FunctionDecl, location: &crate::location::Location) -> Result<Value> {
        self.run_conditions(call_activation, &decl.pre_conditions, ConditionKind::Pre)?;

        let saved_location = std::mem::replace(&mut self.location, location.clone());
        let flow = match &decl.body {
            Some(block) => self.exec_block(call_activation, block),
            None => Ok(Flow::Normal),
        };
        self.location = saved_location;

        let return_value = match flow? {
            Flow::Return(Some(v)) => v,
            Flow::Return(None) | Flow::Normal => Value::Void,
            Flow::Break => return Err(InterpreterError::BreakOutsideLoop),
            Flow::Continue => return Err(InterpreterError::ReturnOutsideFunction),
        };
        let return_value = crate::dynamic_cast::try_cast(&return_value, &decl.return_type, self.registry).ok_or_else(|| {
            crate::errors::CastError::ForceCastTypeMismatch {
                expected: decl.return_type.clone(),
                actual: return_value.static_type(self.registry),
            }
        })?;
        call_activation.define("result", return_value.clone());
        self.run_conditions(call_activation, &decl.post_conditions, ConditionKind::Post)?;
        return_value.transfer(None, self.registry)
    }

    fn run_conditions(&mut self, activation: &Rc<Activation>, conditions: &[Condition], kind: ConditionKind) -> Result<()> {
        for condition in conditions {
            match self.eval_expression(activation, &condition.expression)? {
                Value::Bool(true) => {}
                _ => return Err(InterpreterError::Condition(kind)),
            }
        }
        Ok(())
    }

    /// Evaluates every `before(expr)` argument appearing in
    /// `post_conditions` against the pre-call activation, keyed by the
    /// argument node's address (§4.2.4 "before()"). Recognizing
    /// `before` here rather than in the parser keeps the distinction
    /// an evaluation-time concern: nothing about `before`'s AST shape
    /// differs from an ordinary call.
    fn collect_before_snapshots(&mut self, activation: &Rc<Activation>, post_conditions: &[Condition]) -> Result<HashMap<usize, Value>> {
        let mut snapshots = HashMap::new();
        for condition in post_conditions {
            self.collect_before_in(activation, &condition.expression, &mut snapshots)?;
            if let Some(message) = &condition.message {
                self.collect_before_in(activation, message, &mut snapshots)?;
            }
        }
        Ok(snapshots)
    }

    fn collect_before_in(&mut self, activation: &Rc<Activation>, expr: &crate::ast::Node<crate::ast::Expression>, out: &mut HashMap<usize, Value>) -> Result<()> {
        use crate::ast::Expression::*;
        match &**expr {
            Invocation { function, arguments } => {
                if let Identifier(name) = &**function {
                    if name == "before" && arguments.len() == 1 {
                        let value = self.eval_expression(activation, &arguments[0])?;
                        out.insert(Rc::as_ptr(&arguments[0]) as usize, value);
                        return Ok(());
                    }
                }
                self.collect_before_in(activation, function, out)?;
                for argument in arguments {
                    self.collect_before_in(activation, argument, out)?;
                }
            }
            Binary(_, lhs, rhs) | NilCoalescing(lhs, rhs) => {
                self.collect_before_in(activation, lhs, out)?;
                self.collect_before_in(activation, rhs, out)?;
            }
            Unary(_, operand) | ForceUnwrap(operand) | Destroy(operand) => {
                self.collect_before_in(activation, operand, out)?;
            }
            MemberAccess(base, _) => self.collect_before_in(activation, base, out)?,
            Index(base, index) => {
                self.collect_before_in(activation, base, out)?;
                self.collect_before_in(activation, index, out)?;
            }
            Conditional { condition, then_branch, else_branch } => {
                self.collect_before_in(activation, condition, out)?;
                self.collect_before_in(activation, then_branch, out)?;
                self.collect_before_in(activation, else_branch, out)?;
            }
            Cast { expression, .. } => self.collect_before_in(activation, expression, out)?,
            _ => {}
        }
        Ok(())
    }

    /// Allocates a new composite (§3.2): assigns a uuid for resource
    /// kinds, bakes each function's inherited conditions in via
    /// `ConditionContext`, then runs `init` with the fresh value bound
    /// as `self` if the type declares one.
    pub fn construct(&mut self, type_id: &TypeID, arguments: Vec<Value>) -> Result<Value> {
        let def = self
            .registry
            .get(type_id)
            .cloned()
            .ok_or_else(|| InterpreterError::ResourceConstruction(type_id.clone()))?;

        let uuid = if def.kind.is_resource() { Some(self.uuid_handler.next_uuid()) } else { None };

        let mut functions = IndexMap::new();
        for (name, decl) in def.functions.iter() {
            let conditions = ConditionContext::linearized(self.registry, type_id, name);
            let mut baked = decl.clone();
            baked.pre_conditions = conditions.pre;
            baked.post_conditions = conditions.post;
            let signature = StaticType::Function {
                parameters: baked.parameters.iter().map(|p| p.declared_type.clone()).collect(),
                return_type: Rc::new(baked.return_type.clone()),
            };
            functions.insert(
                name.clone(),
                FunctionValue {
                    signature,
                    repr: FunctionRepr::Interpreter { decl: Rc::new(baked), closure: Rc::clone(&self.globals), location: self.location.clone() },
                },
            );
        }
        let init = functions.get("init").cloned();

        let composite = CompositeValue::new(self.location.clone(), type_id.clone(), def.kind, Rc::new(functions), uuid);
        let value = Value::Composite(Rc::new(RefCell::new(composite)));

        if let Some(init) = init {
            self.call_interpreted(&init, Some(value.clone()), arguments)?;
        }
        Ok(value)
    }

    /// Runs a resource's destructor, if it declared one, then lets it
    /// go out of scope (§3.2 "Composite", destruction). Non-resource
    /// values have nothing to run and are simply dropped.
    pub fn destroy(&mut self, value: Value) -> Result<()> {
        let destructor = match &value {
            Value::Composite(c) => c.borrow().function("destroy"),
            _ => return Ok(()),
        };
        if let Some(destructor) = destructor {
            self.call_interpreted(&destructor, Some(value), Vec::new())?;
        }
        Ok(())
    }
}
