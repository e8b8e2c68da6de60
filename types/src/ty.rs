use crate::{PrimDataType, StructType};
use std::sync::Arc;
use std::fmt;

/// Declared type of a graph node.
///
/// Every value the evaluator produces conforms to exactly one `DataType`;
/// bindings are checked against it before they are recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataType {
    /// 64-bit signed integer.
    Int,
    /// 64-bit float.
    Double,
    Bool,
    /// Fixed-length homogeneous array.
    Array(ArrayType),
    /// Struct with a statically declared field table.
    Struct(Arc<StructType>),
    /// A tensor slot. Its value is the tensor's metadata record.
    Tensor(TensorType),
    /// The metadata record extracted from a tensor.
    TensorMetadata(TensorType),
    /// Opaque data pointer to elements of the given type.
    Pointer(PrimDataType),
}

impl DataType {
    /// Int, Double or Bool.
    pub fn is_scalar(&self) -> bool {
        matches!(self, DataType::Int | DataType::Double | DataType::Bool)
    }

    /// Int or Double.
    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Int | DataType::Double)
    }

    pub fn is_integral(&self) -> bool {
        matches!(self, DataType::Int)
    }

    pub fn array(elem: DataType, len: usize) -> Self {
        DataType::Array(ArrayType::new(elem, len))
    }

    pub fn as_array(&self) -> Option<&ArrayType> {
        match self {
            DataType::Array(array) => Some(array),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&Arc<StructType>> {
        match self {
            DataType::Struct(ty) => Some(ty),
            _ => None,
        }
    }

    /// The tensor type behind a tensor slot or a metadata record.
    pub fn as_tensor(&self) -> Option<TensorType> {
        match self {
            DataType::Tensor(tt) | DataType::TensorMetadata(tt) => Some(*tt),
            _ => None,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Int => write!(f, "int"),
            DataType::Double => write!(f, "double"),
            DataType::Bool => write!(f, "bool"),
            DataType::Array(array) => write!(f, "{}", array),
            DataType::Struct(ty) => write!(f, "{}", ty),
            DataType::Tensor(tt) => write!(f, "tensor<{}, {}>", tt.dtype, tt.rank),
            DataType::TensorMetadata(tt) => write!(f, "metadata<{}, {}>", tt.dtype, tt.rank),
            DataType::Pointer(dtype) => write!(f, "ptr<{}>", dtype),
        }
    }
}

/// Fixed-length array type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayType {
    elem: Arc<DataType>,
    len: usize,
}

impl ArrayType {
    pub fn new(elem: DataType, len: usize) -> Self {
        Self {
            elem: Arc::new(elem),
            len,
        }
    }

    pub fn elem(&self) -> &DataType {
        &self.elem
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl fmt::Display for ArrayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "array<{}, {}>", self.elem, self.len)
    }
}

/// Element type and rank of a tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TensorType {
    pub dtype: PrimDataType,
    pub rank: usize,
}

impl TensorType {
    pub fn new(dtype: PrimDataType, rank: usize) -> Self {
        Self { dtype, rank }
    }
}
