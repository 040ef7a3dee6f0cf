// Statement execution (§4.2.2, §4.2.3).

use std::rc::Rc;

use crate::activation::Activation;
use crate::ast::{Block, IfCondition, Statement};
use crate::dynamic_cast::try_cast;
use crate::errors::{CastError, InterpreterError, Result};
use crate::value::Value;

use super::Interpreter;

/// What a block did, threaded back up through nested statements so a
/// `return`/`break`/`continue` inside an `if` or `switch` arm
/// propagates out of the enclosing loop or function (§4.2.2).
pub enum Flow {
    Normal,
    Return(Option<Value>),
    Break,
    Continue,
}

impl<'a> Interpreter<'a> {
    pub fn exec_block(&mut self, activation: &Rc<Activation>, block: &Block) -> Result<Flow> {
        let scope = Activation::chain(activation);
        for statement in block {
            match self.exec_statement(&scope, statement)? {
                Flow::Normal => continue,
                other => return Ok(other),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_statement(&mut self, activation: &Rc<Activation>, statement: &Statement) -> Result<Flow> {
        self.observer.on_statement(&self.location);
        match statement {
            Statement::Expression(expr) => {
                self.eval_expression(activation, expr)?;
                Ok(Flow::Normal)
            }
            Statement::VariableDecl { name, value, declared_type, .. } => {
                let mut v = self.eval_for_transfer(activation, value)?;
                if let Some(declared) = declared_type {
                    v = self.coerce_to_declared(v, declared)?;
                }
                v = v.transfer(None, self.registry)?;
                activation.define(name, v);
                Ok(Flow::Normal)
            }
            Statement::Assignment { target, value } => {
                let v = self.eval_for_transfer(activation, value)?;
                self.assign(activation, target, v)?;
                Ok(Flow::Normal)
            }
            Statement::If { condition, then_branch, else_branch } => {
                let scope = Activation::chain(activation);
                let taken = match condition {
                    IfCondition::Expression(expr) => match self.eval_expression(&scope, expr)? {
                        Value::Bool(b) => b,
                        _ => return Err(InterpreterError::NotCallable),
                    },
                    IfCondition::IfLet { name, declared_type, value } => {
                        let v = self.eval_expression(&scope, value)?;
                        match v {
                            Value::Some(inner) => {
                                let bound = match declared_type {
                                    Some(declared) => self.coerce_to_declared(*inner, declared)?,
                                    None => *inner,
                                };
                                scope.define(name, bound);
                                true
                            }
                            _ => false,
                        }
                    }
                };
                if taken {
                    self.exec_block(&scope, then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.exec_block(&scope, else_branch)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Statement::Switch { subject, cases } => {
                let scope = Activation::chain(activation);
                let subject_value = self.eval_expression(&scope, subject)?;
                for (case_expr, body) in cases {
                    let matched = match case_expr {
                        Some(expr) => {
                            let case_value = self.eval_expression(&scope, expr)?;
                            subject_value.equals(&case_value)
                        }
                        None => true, // default case
                    };
                    if matched {
                        // `break` only terminates the switch itself; it
                        // must not escape into an enclosing loop.
                        return match self.exec_block(&scope, body)? {
                            Flow::Break => Ok(Flow::Normal),
                            other => Ok(other),
                        };
                    }
                }
                Ok(Flow::Normal)
            }
            Statement::While { condition, body } => {
                loop {
                    let cond_value = self.eval_expression(activation, condition)?;
                    match cond_value {
                        Value::Bool(true) => {}
                        Value::Bool(false) => break,
                        _ => return Err(InterpreterError::NotCallable),
                    }
                    self.observer.on_loop_iteration(&self.location);
                    match self.exec_block(activation, body)? {
                        Flow::Break => break,
                        Flow::Continue | Flow::Normal => continue,
                        returned @ Flow::Return(_) => return Ok(returned),
                    }
                }
                Ok(Flow::Normal)
            }
            Statement::ForIn { index_name, value_name, iterable, body } => {
                let collection = self.eval_expression(activation, iterable)?;
                let elements = self.iterate(&collection)?;
                for (index, element) in elements.into_iter().enumerate() {
                    // Fresh scope per iteration: a closure captured in
                    // one iteration must not observe a later
                    // iteration's binding (§4.2.3 "for-in").
                    let scope = Activation::chain(activation);
                    if let Some(index_name) = index_name {
                        scope.define(index_name, Value::Numeric(crate::numeric::Numeric::from_u64(crate::numeric::NumericKind::Int, index as u64)?));
                    }
                    scope.define(value_name, element);
                    self.observer.on_loop_iteration(&self.location);
                    match self.exec_block(&scope, body)? {
                        Flow::Break => break,
                        Flow::Continue | Flow::Normal => continue,
                        returned @ Flow::Return(_) => return Ok(returned),
                    }
                }
                Ok(Flow::Normal)
            }
            Statement::Return(expr) => {
                let value = match expr {
                    Some(expr) => Some(self.eval_for_transfer(activation, expr)?),
                    None => None,
                };
                Ok(Flow::Return(value))
            }
            Statement::Break => Ok(Flow::Break),
            Statement::Continue => Ok(Flow::Continue),
            Statement::Emit { arguments, .. } => {
                for argument in arguments {
                    self.eval_expression(activation, argument)?;
                }
                Ok(Flow::Normal)
            }
        }
    }

    /// Applies a `let`/`if let` declared type the same way the static
    /// cast operator does: not just a subtype check, but an actual
    /// relabel, so an empty `[]`/`{}` literal (typed `Never`) picks up
    /// the binding's real element/key/value type instead of staying
    /// stuck at the bottom type it was constructed with.
    fn coerce_to_declared(&self, value: Value, declared: &crate::static_type::StaticType) -> Result<Value> {
        try_cast(&value, declared, self.registry).ok_or_else(|| {
            CastError::ForceCastTypeMismatch { expected: declared.clone(), actual: value.static_type(self.registry) }.into()
        })
    }

    fn iterate(&self, value: &Value) -> Result<Vec<Value>> {
        match value {
            Value::Array(arr) => Ok(arr.borrow().elements.clone()),
            Value::InclusiveRange(range) => Ok(range.iter().map(Value::Numeric).collect()),
            _ => Err(InterpreterError::NotCallable),
        }
    }
}
