//! Expression evaluation over symbolic tensor-program graphs.
//!
//! - [`graph`]: append-only arena of immutable nodes
//! - [`values`]: the closed [`Value`] algebra
//! - [`BindingTable`]: per-session leaf bindings
//! - [`Evaluator`]: demand-driven evaluation with a per-call memo
//! - [`PrecomputedValues`]: attachable snapshot of scalar values
//! - [`view`]: zero-copy size/stride algebra for permute, reshape, flatten
//!   and expand

pub mod binding;
pub mod error;
pub mod evaluator;
pub mod graph;
pub mod precomputed;
pub mod values;
pub mod view;

pub use binding::{BindMode, BindingTable, Provenance};
pub use error::EvalError;
pub use evaluator::{Evaluator, EvaluatorOptions, ViewFallback};
pub use graph::{Graph, NodeId, TensorBuilder};
pub use precomputed::PrecomputedValues;
pub use values::{Pointer, StructValue, TensorMetadata, TensorMetadataField, Value};
pub use view::ShapeError;
