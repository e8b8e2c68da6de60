//! Primitive element types for tensor buffers.
//!
//! Tensor slots and data pointers carry a `PrimDataType` describing the
//! element layout of the buffer they refer to. Scalar graph values (int,
//! double, bool) are described by [`DataType`](crate::DataType) instead.

use std::fmt;

/// Element type of a tensor buffer.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PrimDataType {
    Double,
    Float,
    Half,
    BFloat16,
    /// 64-bit signed integer.
    Int,
    Int32,
    /// Index type used for extents and strides.
    Index,
    Bool,
    ComplexFloat,
    ComplexDouble,
}

impl PrimDataType {
    /// Size of one element in bytes.
    pub fn size_in_bytes(self) -> usize {
        match self {
            PrimDataType::Bool => 1,
            PrimDataType::Half | PrimDataType::BFloat16 => 2,
            PrimDataType::Float | PrimDataType::Int32 => 4,
            PrimDataType::Double | PrimDataType::Int | PrimDataType::Index => 8,
            PrimDataType::ComplexFloat => 8,
            PrimDataType::ComplexDouble => 16,
        }
    }

    pub fn is_floating_point(self) -> bool {
        matches!(
            self,
            PrimDataType::Double | PrimDataType::Float | PrimDataType::Half | PrimDataType::BFloat16
        )
    }

    pub fn is_integral(self) -> bool {
        matches!(
            self,
            PrimDataType::Int | PrimDataType::Int32 | PrimDataType::Index
        )
    }

    pub fn is_complex(self) -> bool {
        matches!(
            self,
            PrimDataType::ComplexFloat | PrimDataType::ComplexDouble
        )
    }
}

impl fmt::Display for PrimDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PrimDataType::Double => "double",
            PrimDataType::Float => "float",
            PrimDataType::Half => "half",
            PrimDataType::BFloat16 => "bfloat16",
            PrimDataType::Int => "int64",
            PrimDataType::Int32 => "int32",
            PrimDataType::Index => "index",
            PrimDataType::Bool => "bool",
            PrimDataType::ComplexFloat => "cfloat",
            PrimDataType::ComplexDouble => "cdouble",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sizes() {
        assert_eq!(PrimDataType::Float.size_in_bytes(), 4);
        assert_eq!(PrimDataType::BFloat16.size_in_bytes(), 2);
        assert_eq!(PrimDataType::ComplexDouble.size_in_bytes(), 16);
    }

    #[test]
    fn test_categories() {
        assert!(PrimDataType::Half.is_floating_point());
        assert!(!PrimDataType::Half.is_integral());
        assert!(PrimDataType::Index.is_integral());
        assert!(PrimDataType::ComplexFloat.is_complex());
        assert!(!PrimDataType::Bool.is_floating_point());
    }
}
