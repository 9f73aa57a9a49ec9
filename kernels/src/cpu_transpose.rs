use crate::{KernelElem, KernelError, Result, check_len, contiguous_strides};
use rayon::prelude::*;

/// Swaps two axes of a row-major tensor, producing a new contiguous buffer.
///
/// Works for any rank. Each output row (the innermost axis of the output) is
/// filled independently, reading the input with the stride the swapped layout
/// implies, so rows can be produced in parallel.
pub fn cpu_swap_axes<T, const RANK: usize>(
    data: &[T],
    shape: &[usize; RANK],
    axis1: usize,
    axis2: usize,
) -> Result<Vec<T>>
where
    T: KernelElem,
{
    for axis in [axis1, axis2] {
        if axis >= RANK {
            return Err(KernelError::AxisOutOfRange { axis, rank: RANK });
        }
    }
    let size: usize = shape.iter().product();
    check_len(data.len(), size)?;
    if axis1 == axis2 || size == 0 {
        return Ok(data.to_vec());
    }

    let mut out_shape = *shape;
    out_shape.swap(axis1, axis2);
    // Input stride to follow when stepping along each output axis.
    let mut src_strides = contiguous_strides(shape);
    src_strides.swap(axis1, axis2);

    let row_len = out_shape[RANK - 1];
    let row_stride = src_strides[RANK - 1];
    let mut out_data = vec![T::zero(); size];

    out_data
        .par_chunks_mut(row_len)
        .enumerate()
        .for_each(|(row, out_row)| {
            let mut rem = row;
            let mut base = 0;
            for axis in (0..RANK - 1).rev() {
                base += (rem % out_shape[axis]) * src_strides[axis];
                rem /= out_shape[axis];
            }
            for (j, out) in out_row.iter_mut().enumerate() {
                *out = data[base + j * row_stride];
            }
        });

    Ok(out_data)
}

/// Swaps the last two axes.
pub fn cpu_transpose<T, const RANK: usize>(data: &[T], shape: &[usize; RANK]) -> Result<Vec<T>>
where
    T: KernelElem,
{
    if RANK < 2 {
        return Err(KernelError::AxisOutOfRange {
            axis: 1,
            rank: RANK,
        });
    }
    cpu_swap_axes(data, shape, RANK - 2, RANK - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transpose_simple() {
        let data = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]; // 2x3
        let result = cpu_transpose(&data, &[2, 3]).unwrap();
        assert_eq!(result, vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
    }

    #[test]
    fn test_transpose_batch() {
        let data = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        let result = cpu_transpose(&data, &[2, 2, 2]).unwrap();
        assert_eq!(result, vec![1.0, 3.0, 2.0, 4.0, 5.0, 7.0, 6.0, 8.0]);
    }

    #[test]
    fn test_swap_heads_and_time() {
        // [b=1, t=2, h=3, e=2] -> [b=1, h=3, t=2, e=2]
        let data: Vec<f32> = (0..12).map(|v| v as f32).collect();
        let result = cpu_swap_axes(&data, &[1, 2, 3, 2], 1, 2).unwrap();
        // Element (t, h, e) sits at t*6 + h*2 + e in the input.
        let expected = vec![
            0.0, 1.0, 6.0, 7.0, // h = 0
            2.0, 3.0, 8.0, 9.0, // h = 1
            4.0, 5.0, 10.0, 11.0, // h = 2
        ];
        assert_eq!(result, expected);
    }

    #[test]
    fn test_swap_is_an_involution() {
        let data: Vec<f64> = (0..24).map(|v| v as f64).collect();
        let once = cpu_swap_axes(&data, &[2, 3, 4], 0, 2).unwrap();
        let twice = cpu_swap_axes(&once, &[4, 3, 2], 0, 2).unwrap();
        assert_eq!(twice, data);
    }

    #[test]
    fn test_swap_same_axis_is_copy() {
        let data = vec![1, 2, 3, 4];
        assert_eq!(cpu_swap_axes(&data, &[2, 2], 1, 1).unwrap(), data);
    }

    #[test]
    fn test_swap_axis_out_of_range() {
        let data = vec![1.0; 4];
        let err = cpu_swap_axes(&data, &[2, 2], 0, 2);
        assert_eq!(err, Err(KernelError::AxisOutOfRange { axis: 2, rank: 2 }));
    }

    #[test]
    fn test_transpose_rank_one_rejected() {
        let data = vec![1.0, 2.0];
        assert!(cpu_transpose(&data, &[2]).is_err());
    }
}
