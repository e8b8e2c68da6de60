//! Errors raised by the evaluator and its collaborators.
//!
//! An unbound symbol is *not* an error: evaluation reports it as an unknown
//! value (`Ok(None)`). Everything here signals caller misuse or a request
//! that cannot be satisfied, and none of it is retryable.

use crate::graph::NodeId;
use crate::view::ShapeError;
use fusor_types::TypeError;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error, Diagnostic)]
pub enum EvalError {
    /// A value disagrees with the declared type it is bound or converted to.
    #[error("type mismatch: expected {expected}, found {found}")]
    #[diagnostic(code(fusor::type_mismatch))]
    TypeMismatch { expected: String, found: String },

    /// External binding of a node that has a structural definition.
    #[error("cannot bind {node}: {reason}")]
    #[diagnostic(
        code(fusor::binding_conflict),
        help("only free symbols and tensor slots can be bound; use an override binding to replace a derived value")
    )]
    BindingConflict { node: NodeId, reason: String },

    /// An attached precomputed snapshot does not match the session's bindings.
    #[error("precomputed values cannot be attached: {reason}")]
    #[diagnostic(code(fusor::cache_mismatch))]
    CacheMismatch { reason: String },

    #[error("index {index} out of range for array of length {len}")]
    #[diagnostic(code(fusor::index_out_of_range))]
    IndexOutOfRange { index: i64, len: usize },

    #[error("`{owner}` has no field `{field}`")]
    #[diagnostic(code(fusor::unknown_field))]
    UnknownField { owner: String, field: String },

    /// A literal or operator node built inconsistently with its declared type.
    #[error("invalid construction: {0}")]
    #[diagnostic(code(fusor::construction))]
    Construction(String),

    #[error("node {node} does not belong to this graph")]
    #[diagnostic(code(fusor::unknown_node))]
    UnknownNode { node: NodeId },

    #[error("`{op}` cannot be applied to {found}")]
    #[diagnostic(code(fusor::invalid_operand))]
    InvalidOperand { op: &'static str, found: String },

    #[error("integer division by zero in `{op}`")]
    #[diagnostic(code(fusor::division_by_zero))]
    DivisionByZero { op: &'static str },

    #[error("evaluation depth {depth} exceeds maximum of {max_depth}")]
    #[diagnostic(
        code(fusor::stack_overflow),
        help("raise `EvaluatorOptions::max_depth` for very deep graphs")
    )]
    StackOverflow { depth: usize, max_depth: usize },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Shape(#[from] ShapeError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Type(#[from] TypeError),
}

impl EvalError {
    pub(crate) fn type_mismatch(expected: impl ToString, found: impl ToString) -> Self {
        EvalError::TypeMismatch {
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    pub(crate) fn construction(message: impl Into<String>) -> Self {
        EvalError::Construction(message.into())
    }
}
