//! Tensor metadata records and opaque data pointers.
//!
//! The evaluator never touches buffer memory. A bound tensor is described
//! entirely by where its data lives, its element type, and one
//! `(size, stride)` pair per axis. Strides are counted in elements.

use crate::{values::Value, view::ShapeError};
use fusor_types::{DataType, PrimDataType, TensorType};
use smallvec::SmallVec;
use std::fmt;

/// Inline storage for per-axis sizes and strides.
pub type Dims = SmallVec<[i64; 6]>;

/// Opaque, non-owning handle to a tensor buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pointer {
    addr: usize,
    dtype: PrimDataType,
}

impl Pointer {
    pub fn new(addr: usize, dtype: PrimDataType) -> Self {
        Self { addr, dtype }
    }

    /// Placeholder for a buffer that has not been allocated yet.
    pub fn null(dtype: PrimDataType) -> Self {
        Self { addr: 0, dtype }
    }

    pub fn addr(&self) -> usize {
        self.addr
    }

    pub fn dtype(&self) -> PrimDataType {
        self.dtype
    }

    pub fn is_null(&self) -> bool {
        self.addr == 0
    }
}

impl fmt::Display for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ptr<{}>({:#x})", self.dtype, self.addr)
    }
}

/// Fields of a tensor metadata record reachable through attribute-get.
///
/// The allocation domain is not modeled separately, so `alloc_*` report the
/// same layout as `logical_*`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TensorMetadataField {
    Data,
    LogicalSize,
    LogicalStride,
    AllocSize,
    AllocStride,
}

impl TensorMetadataField {
    pub const ALL: [TensorMetadataField; 5] = [
        TensorMetadataField::Data,
        TensorMetadataField::LogicalSize,
        TensorMetadataField::LogicalStride,
        TensorMetadataField::AllocSize,
        TensorMetadataField::AllocStride,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            TensorMetadataField::Data => "data",
            TensorMetadataField::LogicalSize => "logical_size",
            TensorMetadataField::LogicalStride => "logical_stride",
            TensorMetadataField::AllocSize => "alloc_size",
            TensorMetadataField::AllocStride => "alloc_stride",
        }
    }

    /// Declared type of this field for a tensor of type `tt`.
    pub fn ty(self, tt: TensorType) -> DataType {
        match self {
            TensorMetadataField::Data => DataType::Pointer(tt.dtype),
            _ => DataType::array(DataType::Int, tt.rank),
        }
    }
}

/// Data pointer, element type and per-axis sizes/strides of a tensor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorMetadata {
    data: Pointer,
    sizes: Dims,
    strides: Dims,
}

impl TensorMetadata {
    pub fn new(data: Pointer, sizes: &[i64], strides: &[i64]) -> Result<Self, ShapeError> {
        if sizes.len() != strides.len() {
            return Err(ShapeError::LayoutLengthMismatch {
                sizes: sizes.len(),
                strides: strides.len(),
            });
        }
        check_sizes(sizes)?;
        Ok(Self::from_parts(data, sizes.into(), strides.into()))
    }

    /// Row-major contiguous layout over `sizes`.
    pub fn contiguous(data: Pointer, sizes: &[i64]) -> Result<Self, ShapeError> {
        check_sizes(sizes)?;
        Ok(Self::from_parts(data, sizes.into(), contiguous_strides(sizes)))
    }

    pub(crate) fn from_parts(data: Pointer, sizes: Dims, strides: Dims) -> Self {
        debug_assert_eq!(sizes.len(), strides.len());
        Self {
            data,
            sizes,
            strides,
        }
    }

    pub fn data(&self) -> Pointer {
        self.data
    }

    pub fn dtype(&self) -> PrimDataType {
        self.data.dtype
    }

    pub fn rank(&self) -> usize {
        self.sizes.len()
    }

    pub fn sizes(&self) -> &[i64] {
        &self.sizes
    }

    pub fn strides(&self) -> &[i64] {
        &self.strides
    }

    pub fn size(&self, axis: usize) -> Option<i64> {
        self.sizes.get(axis).copied()
    }

    pub fn stride(&self, axis: usize) -> Option<i64> {
        self.strides.get(axis).copied()
    }

    pub fn numel(&self) -> i64 {
        // Sizes are checked on construction, so the product fits.
        self.sizes
            .iter()
            .fold(1i64, |acc, &size| acc.saturating_mul(size))
    }

    pub fn tensor_type(&self) -> TensorType {
        TensorType::new(self.dtype(), self.rank())
    }

    /// Whether the layout is row-major contiguous. Size-1 axes may carry any
    /// stride, and an empty tensor is always contiguous.
    pub fn is_contiguous(&self) -> bool {
        if self.numel() == 0 {
            return true;
        }
        let mut expected = 1;
        for (&size, &stride) in self.sizes.iter().zip(&self.strides).rev() {
            if size == 1 {
                continue;
            }
            if stride != expected {
                return false;
            }
            expected *= size;
        }
        true
    }

    /// Axes with stride 0 and size greater than 1.
    pub fn expanded_axes(&self) -> impl Iterator<Item = usize> + '_ {
        self.sizes
            .iter()
            .zip(&self.strides)
            .enumerate()
            .filter(|(_, (size, stride))| **size > 1 && **stride == 0)
            .map(|(axis, _)| axis)
    }

    pub fn field(&self, field: TensorMetadataField) -> Value {
        match field {
            TensorMetadataField::Data => Value::Pointer(self.data),
            TensorMetadataField::LogicalSize | TensorMetadataField::AllocSize => {
                Value::from(self.sizes.to_vec())
            }
            TensorMetadataField::LogicalStride | TensorMetadataField::AllocStride => {
                Value::from(self.strides.to_vec())
            }
        }
    }
}

impl fmt::Display for TensorMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "tensor<{}>(sizes={:?}, strides={:?})",
            self.dtype(),
            self.sizes.as_slice(),
            self.strides.as_slice()
        )
    }
}

/// Row-major strides for `sizes`. Zero-sized axes count as size 1.
pub fn contiguous_strides(sizes: &[i64]) -> Dims {
    let mut strides: Dims = SmallVec::from_elem(0, sizes.len());
    let mut stride = 1i64;
    for axis in (0..sizes.len()).rev() {
        strides[axis] = stride;
        stride = stride.saturating_mul(sizes[axis].max(1));
    }
    strides
}

/// Element count of non-negative `sizes`.
pub(crate) fn numel(sizes: &[i64]) -> Result<i64, ShapeError> {
    if sizes.contains(&0) {
        return Ok(0);
    }
    sizes
        .iter()
        .try_fold(1i64, |acc, &size| acc.checked_mul(size))
        .ok_or_else(|| ShapeError::ElementCountOverflow {
            sizes: sizes.to_vec(),
        })
}

/// Sizes must be non-negative and their product must fit in an `i64`.
pub(crate) fn check_sizes(sizes: &[i64]) -> Result<(), ShapeError> {
    if let Some(axis) = sizes.iter().position(|&size| size < 0) {
        return Err(ShapeError::NegativeSize {
            axis,
            size: sizes[axis],
        });
    }
    numel(sizes).map(|_| ())
}
