//! Declared types for fusor graph nodes.
//!
//! This crate describes the *shape* of every quantity the evaluator deals
//! with: scalar kinds, fixed-length arrays, structs with a declared field
//! table, tensor slots and their metadata records, and data pointers.
//!
//! # Example
//!
//! ```
//! use fusor_types::{DataType, FieldInfo, PrimDataType, StructType, TensorType};
//!
//! let sizes = DataType::array(DataType::Int, 2);
//! assert_eq!(sizes.to_string(), "array<int, 2>");
//!
//! let tensor = DataType::Tensor(TensorType::new(PrimDataType::Float, 2));
//! assert_eq!(tensor.to_string(), "tensor<float, 2>");
//!
//! let ty = StructType::new("A", [FieldInfo::new("a", DataType::Int)]).unwrap();
//! assert_eq!(ty.field("a").unwrap().index, 0);
//! ```

mod error;
mod scalar;
mod structs;
mod ty;

pub use error::TypeError;
pub use scalar::PrimDataType;
pub use structs::{FieldAccessor, FieldInfo, StructType};
pub use ty::{ArrayType, DataType, TensorType};
