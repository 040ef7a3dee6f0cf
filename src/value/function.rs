// Function values: host-provided functions, interpreted closures,
// bound methods and composite constructors (§3.2 "Function").

use std::fmt;
use std::rc::Rc;

use crate::ast::{FunctionDecl, Node};
use crate::errors::Result;
use crate::location::{Location, TypeID};
use crate::static_type::StaticType;

use super::Value;

pub type HostFunction = dyn Fn(&[Value]) -> Result<Value>;

#[derive(Clone)]
pub struct FunctionValue {
    pub signature: StaticType,
    pub repr: FunctionRepr,
}

#[derive(Clone)]
pub enum FunctionRepr {
    Host(Rc<HostFunction>),
    Interpreter {
        decl: Node<FunctionDecl>,
        closure: Rc<crate::activation::Activation>,
        location: Location,
    },
    Bound {
        receiver: Box<Value>,
        function: Box<FunctionValue>,
    },
    Constructor {
        type_id: TypeID,
    },
}

impl FunctionValue {
    pub fn host(signature: StaticType, f: impl Fn(&[Value]) -> Result<Value> + 'static) -> FunctionValue {
        FunctionValue { signature, repr: FunctionRepr::Host(Rc::new(f)) }
    }

    pub fn bind(self, receiver: Value) -> FunctionValue {
        FunctionValue {
            signature: self.signature.clone(),
            repr: FunctionRepr::Bound { receiver: Box::new(receiver), function: Box::new(self) },
        }
    }
}

impl fmt::Debug for FunctionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.repr {
            FunctionRepr::Host(_) => write!(f, "<host function: {}>", self.signature),
            FunctionRepr::Interpreter { location, .. } => write!(f, "<function {} @ {}>", self.signature, location),
            FunctionRepr::Bound { .. } => write!(f, "<bound method: {}>", self.signature),
            FunctionRepr::Constructor { type_id } => write!(f, "<constructor {}>", type_id),
        }
    }
}

impl PartialEq for FunctionValue {
    fn eq(&self, other: &Self) -> bool {
        match (&self.repr, &other.repr) {
            (FunctionRepr::Host(a), FunctionRepr::Host(b)) => Rc::ptr_eq(a, b),
            (FunctionRepr::Interpreter { decl: a, closure: ca, .. }, FunctionRepr::Interpreter { decl: b, closure: cb, .. }) => {
                Rc::ptr_eq(a, b) && Rc::ptr_eq(ca, cb)
            }
            (FunctionRepr::Bound { receiver: ra, function: fa }, FunctionRepr::Bound { receiver: rb, function: fb }) => {
                ra.equals(rb) && fa == fb
            }
            (FunctionRepr::Constructor { type_id: a }, FunctionRepr::Constructor { type_id: b }) => a == b,
            _ => false,
        }
    }
}
