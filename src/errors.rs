// Structured runtime errors (§7).
//
// Every failure domain gets its own leaf enum; `Error` aggregates
// them with `#[from]` so the `invoke` entry point (§6.2) can hand the
// host one matchable type without losing which subsystem raised it.

use thiserror::Error;

use crate::location::{Location, TypeID};
use crate::static_type::StaticType;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum ValueError {
    #[error("overflow")]
    Overflow,
    #[error("underflow")]
    Underflow,
    #[error("division by zero")]
    DivisionByZero,
    #[error("value transfer type error: expected {expected}, got {actual}")]
    ValueTransferType {
        expected: StaticType,
        actual: StaticType,
    },
    #[error("container mutation error: expected {expected}, got {actual}")]
    ContainerMutation {
        expected: StaticType,
        actual: StaticType,
    },
    #[error("invalidated resource")]
    InvalidatedResource,
    #[error("invalid path domain: {0}")]
    InvalidPathDomain(String),
    #[error("inclusive range construction error: {0}")]
    InclusiveRangeConstruction(&'static str),
    #[error("invalid operands for {op}: {left} {op} {right}")]
    InvalidOperands {
        op: &'static str,
        left: StaticType,
        right: StaticType,
    },
    #[error("stringification error: {0}")]
    Stringification(&'static str),
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum CastError {
    #[error("force cast type mismatch: expected {expected}, got {actual}")]
    ForceCastTypeMismatch {
        expected: StaticType,
        actual: StaticType,
    },
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum InterpreterError {
    #[error(transparent)]
    Value(#[from] ValueError),
    #[error(transparent)]
    Cast(#[from] CastError),
    #[error("condition failed: {0:?}")]
    Condition(ConditionKind),
    #[error("resource construction error: {0}")]
    ResourceConstruction(TypeID),
    #[error("undefined identifier: {0}")]
    UndefinedIdentifier(String),
    #[error("not callable")]
    NotCallable,
    #[error("wrong number of arguments: expected {expected}, got {actual}")]
    ArityMismatch { expected: usize, actual: usize },
    #[error("break outside loop")]
    BreakOutsideLoop,
    #[error("continue outside loop")]
    ContinueOutsideLoop,
    #[error("return outside function")]
    ReturnOutsideFunction,
    #[error(transparent)]
    Host(#[from] HostError),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ConditionKind {
    Pre,
    Post,
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum HostError {
    #[error("unresolved import: {0}")]
    UnresolvedImport(Location),
    #[error("overwrite error at storage path")]
    Overwrite,
    #[error("storage read/write rejected by host: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, InterpreterError>;
