use crate::values::{Dims, contiguous_strides};
use smallvec::SmallVec;

/// Strides that let `new_sizes` view the memory described by `sizes` and
/// `strides`, or `None` if no such view exists.
///
/// The input is split into chunks of axes that are mutually contiguous. Each
/// chunk must be covered exactly by a run of output axes, which then inherit
/// the chunk's innermost stride. A stride-0 chunk therefore yields stride-0
/// output axes, so broadcast axes survive splits. Size-1 axes never start a
/// chunk and may take any stride.
///
/// Callers must ensure both shapes have the same element count. Products
/// that overflow an `i64` yield `None`.
pub fn view_strides(sizes: &[i64], strides: &[i64], new_sizes: &[i64]) -> Option<Dims> {
    debug_assert_eq!(sizes.len(), strides.len());

    if sizes.contains(&0) {
        return if sizes == new_sizes {
            Some(strides.into())
        } else {
            Some(contiguous_strides(new_sizes))
        };
    }
    let Some(&innermost) = strides.last() else {
        // Rank 0: every target axis has size 1.
        return Some(contiguous_strides(new_sizes));
    };

    let mut new_strides: Dims = SmallVec::from_elem(0, new_sizes.len());
    let mut view_d = new_sizes.len() as isize - 1;
    let mut chunk_base_stride = innermost;
    let mut tensor_numel = 1i64;
    let mut view_numel = 1i64;

    for tensor_d in (0..sizes.len()).rev() {
        tensor_numel = tensor_numel.checked_mul(sizes[tensor_d])?;
        // An overflowing span cannot equal any stride.
        let chunk_ends = tensor_d == 0
            || (sizes[tensor_d - 1] != 1
                && tensor_numel.checked_mul(chunk_base_stride)
                    != Some(strides[tensor_d - 1]));
        if !chunk_ends {
            continue;
        }

        while view_d >= 0
            && (view_numel < tensor_numel || new_sizes[view_d as usize] == 1)
        {
            new_strides[view_d as usize] = view_numel.checked_mul(chunk_base_stride)?;
            view_numel = view_numel.checked_mul(new_sizes[view_d as usize])?;
            view_d -= 1;
        }
        if view_numel != tensor_numel {
            return None;
        }
        if tensor_d > 0 {
            chunk_base_stride = strides[tensor_d - 1];
            tensor_numel = 1;
            view_numel = 1;
        }
    }

    (view_d == -1).then_some(new_strides)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strides(sizes: &[i64], strides: &[i64], new_sizes: &[i64]) -> Option<Vec<i64>> {
        view_strides(sizes, strides, new_sizes).map(|s| s.to_vec())
    }

    #[test]
    fn test_contiguous_split_and_merge() {
        assert_eq!(strides(&[6, 4], &[4, 1], &[2, 3, 4]), Some(vec![12, 4, 1]));
        assert_eq!(strides(&[2, 3, 4], &[12, 4, 1], &[24]), Some(vec![1]));
    }

    #[test]
    fn test_padded_rows_cannot_merge() {
        assert_eq!(strides(&[9, 6], &[8, 1], &[54]), None);
        assert_eq!(strides(&[9, 6], &[8, 1], &[9, 2, 3]), Some(vec![8, 3, 1]));
    }

    #[test]
    fn test_size_one_axes_take_any_stride() {
        assert_eq!(strides(&[4, 1, 5], &[5, 99, 1], &[20]), Some(vec![1]));
        assert_eq!(strides(&[20], &[1], &[4, 1, 5]), Some(vec![5, 5, 1]));
    }

    #[test]
    fn test_broadcast_chunks() {
        assert_eq!(strides(&[9, 6], &[0, 1], &[9, 2, 3]), Some(vec![0, 3, 1]));
        assert_eq!(strides(&[9, 6], &[1, 0], &[9, 2, 3]), Some(vec![1, 0, 0]));
        assert_eq!(strides(&[9, 6], &[0, 0], &[54]), Some(vec![0]));
        assert_eq!(strides(&[9, 6], &[1, 0], &[54]), None);
    }

    #[test]
    fn test_empty_and_scalar() {
        assert_eq!(strides(&[0, 3], &[3, 1], &[3, 0]), Some(vec![1, 1]));
        assert_eq!(strides(&[], &[], &[1, 1]), Some(vec![1, 1]));
    }
}
