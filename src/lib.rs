//! Fusor - symbolic expression evaluation for tensor-program graphs
//!
//! # Overview
//!
//! A fusion compiler describes kernels with symbolic scalars: tensor extents,
//! split factors, launch parameters. Fusor holds those expressions in an
//! append-only [`Graph`] and evaluates them on demand once the caller binds
//! concrete values to the free symbols and tensor inputs.
//!
//! - Bind tensors and their extents follow: binding a [`TensorMetadata`] to a
//!   tensor slot also binds the slot's symbolic sizes
//! - View operations (permute, reshape, flatten, expand) compute the
//!   resulting sizes and strides without copying data
//! - [`PrecomputedValues`] snapshots can be shared across sessions that bind
//!   the same inputs
//!
//! # Quick Start
//!
//! ```
//! use fusor::{Evaluator, Graph, Pointer, TensorMetadata, Value};
//! use fusor::types::PrimDataType;
//!
//! let mut graph = Graph::new();
//! let tv = graph.symbolic_tensor(2, PrimDataType::Float).unwrap();
//! let rows = graph.size(tv, 0).unwrap();
//! let four = graph.int(4);
//! let blocks = graph.ceil_div(rows, four).unwrap();
//!
//! let mut evaluator = Evaluator::new(&graph);
//! let input = TensorMetadata::contiguous(Pointer::new(0x1000, PrimDataType::Float), &[6, 128])
//!     .unwrap();
//! evaluator.bind(tv, input).unwrap();
//! assert_eq!(evaluator.evaluate(blocks).unwrap(), Some(Value::Int(2)));
//! ```
//!
//! # Errors
//!
//! Every fallible operation returns [`EvalError`], which implements
//! `miette::Diagnostic` and can be reported with a `miette::Report`.
//! An unbound input is not an error: evaluation returns `Ok(None)`.

pub use fusor_core::{
    BindMode, BindingTable, EvalError, Evaluator, EvaluatorOptions, NodeId, Pointer,
    PrecomputedValues, Provenance, ShapeError, StructValue, TensorBuilder, TensorMetadata,
    TensorMetadataField, Value, ViewFallback, graph::Graph,
};

pub mod graph {
    pub use fusor_core::graph::*;
}

pub mod view {
    pub use fusor_core::view::*;
}

pub mod types {
    pub use fusor_types::*;
}
