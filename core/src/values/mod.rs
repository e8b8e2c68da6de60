//! Runtime values.
//!
//! [`Value`] is the closed sum of everything the evaluator can produce:
//! scalars, arrays, struct instances, tensor metadata records and opaque data
//! pointers.

mod structs;
mod tensor;
mod value;

pub use structs::StructValue;
pub use tensor::{Dims, Pointer, TensorMetadata, TensorMetadataField, contiguous_strides};
pub use value::Value;

pub(crate) use tensor::{check_sizes, numel};

#[cfg(test)]
mod value_test;
