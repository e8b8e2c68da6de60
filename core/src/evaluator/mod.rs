//! Demand-driven evaluator over a [`Graph`](crate::graph::Graph).
//!
//! An [`Evaluator`] is one session: it owns a [`BindingTable`](crate::BindingTable)
//! and optionally an attached [`PrecomputedValues`](crate::PrecomputedValues)
//! snapshot, and borrows the graph. Nothing is computed until a node is
//! requested.
//!
//! ## Design Principles
//!
//! - **Unknown is not an error**: a node that depends on an unbound leaf
//!   evaluates to `Ok(None)`
//! - **Stack-safe**: depth tracking turns runaway recursion into
//!   [`EvalError::StackOverflow`](crate::EvalError::StackOverflow)
//! - **Never stale**: any bind marks an attached snapshot stale, and stale
//!   snapshots are never consulted
//!
//! ## Example
//!
//! ```
//! use fusor_core::{Evaluator, Value, graph::Graph};
//! use fusor_types::DataType;
//!
//! let mut graph = Graph::new();
//! let a = graph.symbol(DataType::Int).unwrap();
//! let b = graph.symbol(DataType::Int).unwrap();
//! let c = graph.add(a, b).unwrap();
//!
//! let mut evaluator = Evaluator::new(&graph);
//! assert_eq!(evaluator.evaluate(c).unwrap(), None);
//!
//! evaluator.bind(a, 7i64).unwrap();
//! evaluator.bind(b, 3i64).unwrap();
//! assert_eq!(evaluator.evaluate(c).unwrap(), Some(Value::Int(10)));
//! ```

mod eval;
mod operators;
mod options;


pub use eval::Evaluator;
pub use options::{EvaluatorOptions, ViewFallback};
