//! View-transform algebra.
//!
//! Every function here maps an input [`TensorMetadata`] to an output layout
//! without touching buffer memory. The output always shares the input's data
//! pointer, except [`materialized`], which describes the layout a copy would
//! have and leaves allocation to the caller.

mod reshape;


use crate::values::{Dims, Pointer, TensorMetadata, check_sizes, contiguous_strides, numel};
use miette::Diagnostic;
use smallvec::SmallVec;
use thiserror::Error;

pub use reshape::view_strides;

#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum ShapeError {
    #[error("expected rank {expected}, found rank {found}")]
    #[diagnostic(code(fusor::shape::rank_mismatch))]
    RankMismatch { expected: usize, found: usize },

    #[error("{order:?} is not a permutation of the axes of a rank-{rank} tensor")]
    #[diagnostic(code(fusor::shape::invalid_permutation))]
    InvalidPermutation { order: Vec<usize>, rank: usize },

    #[error("cannot reshape {numel} elements into {target:?}")]
    #[diagnostic(code(fusor::shape::element_count_mismatch))]
    ElementCountMismatch { numel: i64, target: Vec<i64> },

    #[error("element count of {sizes:?} does not fit in 64 bits")]
    #[diagnostic(code(fusor::shape::element_count_overflow))]
    ElementCountOverflow { sizes: Vec<i64> },

    #[error("no zero-copy view of sizes {sizes:?} with strides {strides:?} has shape {target:?}")]
    #[diagnostic(
        code(fusor::shape::not_viewable),
        help("materialize the input into a contiguous buffer first, or evaluate with `ViewFallback::Materialize`")
    )]
    NotViewable {
        sizes: Vec<i64>,
        strides: Vec<i64>,
        target: Vec<i64>,
    },

    #[error("cannot expand axis {axis} of size {size} to {target}")]
    #[diagnostic(
        code(fusor::shape::invalid_expand),
        help("only size-1 axes can be broadcast")
    )]
    InvalidExpand { axis: usize, size: i64, target: i64 },

    #[error("axis {axis} has negative size {size}")]
    #[diagnostic(code(fusor::shape::negative_size))]
    NegativeSize { axis: usize, size: i64 },

    #[error("dimension range {start}..={end} is invalid for a rank-{rank} tensor")]
    #[diagnostic(code(fusor::shape::invalid_dim_range))]
    InvalidDimRange { start: usize, end: usize, rank: usize },

    #[error("layout has {sizes} sizes but {strides} strides")]
    #[diagnostic(code(fusor::shape::layout_length_mismatch))]
    LayoutLengthMismatch { sizes: usize, strides: usize },
}

/// Reorder axes: output axis `i` is input axis `order[i]`.
pub fn permute(input: &TensorMetadata, order: &[usize]) -> Result<TensorMetadata, ShapeError> {
    check_permutation(order, input.rank())?;
    let sizes = order.iter().map(|&axis| input.sizes()[axis]).collect();
    let strides = order.iter().map(|&axis| input.strides()[axis]).collect();
    Ok(TensorMetadata::from_parts(input.data(), sizes, strides))
}

pub(crate) fn check_permutation(order: &[usize], rank: usize) -> Result<(), ShapeError> {
    let mut seen: SmallVec<[bool; 8]> = SmallVec::from_elem(false, rank);
    let valid = order.len() == rank
        && order
            .iter()
            .all(|&axis| axis < rank && !std::mem::replace(&mut seen[axis], true));
    if valid {
        Ok(())
    } else {
        Err(ShapeError::InvalidPermutation {
            order: order.to_vec(),
            rank,
        })
    }
}

/// Zero-copy reshape to `target`.
///
/// Fails with [`ShapeError::NotViewable`] when the input strides admit no
/// view of the requested shape.
pub fn reshape(input: &TensorMetadata, target: &[i64]) -> Result<TensorMetadata, ShapeError> {
    check_sizes(target)?;
    if numel(target)? != input.numel() {
        return Err(ShapeError::ElementCountMismatch {
            numel: input.numel(),
            target: target.to_vec(),
        });
    }
    match view_strides(input.sizes(), input.strides(), target) {
        Some(strides) => Ok(TensorMetadata::from_parts(input.data(), target.into(), strides)),
        None => Err(ShapeError::NotViewable {
            sizes: input.sizes().to_vec(),
            strides: input.strides().to_vec(),
            target: target.to_vec(),
        }),
    }
}

/// Merge axes `start..=end` into one.
pub fn flatten(
    input: &TensorMetadata,
    start: usize,
    end: usize,
) -> Result<TensorMetadata, ShapeError> {
    let target = flattened_sizes(input.sizes(), start, end)?;
    reshape(input, &target)
}

/// Sizes after merging axes `start..=end`. A rank-0 tensor flattens to one axis.
pub(crate) fn flattened_sizes(sizes: &[i64], start: usize, end: usize) -> Result<Dims, ShapeError> {
    let rank = sizes.len();
    if rank == 0 && start == 0 && end == 0 {
        return Ok(SmallVec::from_slice(&[1]));
    }
    if start > end || end >= rank {
        return Err(ShapeError::InvalidDimRange { start, end, rank });
    }
    let mut target: Dims = SmallVec::with_capacity(rank - (end - start));
    target.extend_from_slice(&sizes[..start]);
    target.push(numel(&sizes[start..=end])?);
    target.extend_from_slice(&sizes[end + 1..]);
    Ok(target)
}

/// Broadcast size-1 axes to `target`, giving them stride 0.
///
/// `target` may have more axes than the input; the extra leading axes are new
/// broadcast axes.
pub fn expand(input: &TensorMetadata, target: &[i64]) -> Result<TensorMetadata, ShapeError> {
    check_sizes(target)?;
    let rank = input.rank();
    if target.len() < rank {
        return Err(ShapeError::RankMismatch {
            expected: rank,
            found: target.len(),
        });
    }
    let offset = target.len() - rank;
    let mut strides: Dims = SmallVec::from_elem(0, target.len());
    for (axis, (&size, &stride)) in input.sizes().iter().zip(input.strides()).enumerate() {
        let want = target[offset + axis];
        if want == size {
            strides[offset + axis] = stride;
        } else if size != 1 {
            return Err(ShapeError::InvalidExpand {
                axis,
                size,
                target: want,
            });
        }
    }
    Ok(TensorMetadata::from_parts(input.data(), target.into(), strides))
}

/// The contiguous layout a copy of `input` reshaped to `target` would have.
///
/// The returned data pointer is null.
pub fn materialized(input: &TensorMetadata, target: &[i64]) -> Result<TensorMetadata, ShapeError> {
    check_sizes(target)?;
    if numel(target)? != input.numel() {
        return Err(ShapeError::ElementCountMismatch {
            numel: input.numel(),
            target: target.to_vec(),
        });
    }
    Ok(TensorMetadata::from_parts(
        Pointer::null(input.dtype()),
        target.into(),
        contiguous_strides(target),
    ))
}
