//! Single-tensor operations: unary einsum rules and the tensor's own
//! reductions and layout changes.

use einsum_core::algebra::Standard;
use einsum_core::{einsum, Error, Tensor, TensorBuilder};

#[cfg(feature = "tropical")]
use einsum_core::{MaxPlus, MinPlus};

fn matrix_3x3() -> Tensor<f64> {
    // [[1, 2, 3],
    //  [4, 5, 6],
    //  [7, 8, 9]]
    Tensor::from_data((1..=9).map(f64::from).collect(), &[3, 3]).unwrap()
}

// ============================================================================
// Trace and Diagonal (ii -> , ii -> i)
// ============================================================================

#[test]
fn test_unary_trace_5x5() {
    let mut b = TensorBuilder::zeros::<Standard<f64>>(&[5, 5]).unwrap();
    for i in 0..5 {
        b.set(&[i, i], (i + 1) as f64).unwrap();
    }
    let a = b.build();
    let result = einsum::<Standard<f64>>("ii->", &[&a]).unwrap();
    assert_eq!(result.shape(), &[] as &[usize]);
    assert_eq!(result.to_vec(), vec![15.0]);
}

#[test]
fn test_unary_diagonal_3x3() {
    let a = matrix_3x3();
    let result = einsum::<Standard<f64>>("ii->i", &[&a]).unwrap();
    assert_eq!(result.to_vec(), vec![1.0, 5.0, 9.0]);
}

#[test]
fn test_unary_diagonal_3d() {
    // iii -> i picks A[i,i,i]
    let a = Tensor::from_data((0..27).collect::<Vec<i32>>(), &[3, 3, 3]).unwrap();
    let result = einsum::<Standard<i32>>("iii->i", &[&a]).unwrap();
    assert_eq!(result.to_vec(), vec![0, 13, 26]);
}

#[test]
fn test_unary_diagonal_with_free_axis() {
    // iij -> ji
    let a = Tensor::from_data((0..8).collect::<Vec<i32>>(), &[2, 2, 2]).unwrap();
    let result = einsum::<Standard<i32>>("iij->ji", &[&a]).unwrap();
    assert_eq!(result.shape(), &[2, 2]);
    for i in 0..2 {
        for j in 0..2 {
            assert_eq!(result.get(&[j, i]).unwrap(), a.get(&[i, i, j]).unwrap());
        }
    }
}

#[cfg(feature = "tropical")]
#[test]
fn test_unary_trace_tropical() {
    // max-plus trace = max of the diagonal
    let a = matrix_3x3();
    let result = einsum::<MaxPlus<f64>>("ii->", &[&a]).unwrap();
    assert_eq!(result.to_scalar(), Some(9.0));

    let result = einsum::<MinPlus<f64>>("ii->", &[&a]).unwrap();
    assert_eq!(result.to_scalar(), Some(1.0));
}

#[cfg(feature = "tropical")]
#[test]
fn test_unary_row_max() {
    let a = matrix_3x3();
    let result = einsum::<MaxPlus<f64>>("ij->i", &[&a]).unwrap();
    assert_eq!(result.to_vec(), vec![3.0, 6.0, 9.0]);
}

// ============================================================================
// Tensor Reductions
// ============================================================================

#[test]
fn test_sum_matches_einsum() {
    let a = matrix_3x3();
    let via_einsum = einsum::<Standard<f64>>("ij->", &[&a]).unwrap();
    assert_eq!(via_einsum.to_scalar(), Some(a.sum::<Standard<f64>>()));
}

#[test]
fn test_sum_axis_matches_einsum() {
    let a = matrix_3x3();
    assert_eq!(
        a.sum_axis::<Standard<f64>>(0).unwrap(),
        einsum::<Standard<f64>>("ij->j", &[&a]).unwrap()
    );
    assert_eq!(
        a.sum_axis::<Standard<f64>>(1).unwrap(),
        einsum::<Standard<f64>>("ij->i", &[&a]).unwrap()
    );
}

#[test]
fn test_sum_axis_out_of_range() {
    let a = matrix_3x3();
    let err = a.sum_axis::<Standard<f64>>(2).unwrap_err();
    assert!(matches!(err, Error::IndexOutOfRange { .. }));
}

#[cfg(feature = "tropical")]
#[test]
fn test_sum_tropical() {
    let a = matrix_3x3();
    assert_eq!(a.sum::<MaxPlus<f64>>(), 9.0);
    assert_eq!(a.sum::<MinPlus<f64>>(), 1.0);
    assert_eq!(a.sum_axis::<MaxPlus<f64>>(0).unwrap().to_vec(), vec![7.0, 8.0, 9.0]);
}

// ============================================================================
// Layout
// ============================================================================

#[test]
fn test_permute_matches_einsum() {
    let a = Tensor::from_data((0..24).collect::<Vec<i64>>(), &[2, 3, 4]).unwrap();
    let via_einsum = einsum::<Standard<i64>>("ijk->jki", &[&a]).unwrap();
    assert_eq!(a.permute(&[1, 2, 0]).unwrap(), via_einsum);
}

#[test]
fn test_transpose_requires_matrix() {
    let v = Tensor::from_data(vec![1, 2, 3], &[3]).unwrap();
    assert!(matches!(v.transpose(), Err(Error::ShapeMismatch(_))));
}

#[test]
fn test_reshape_keeps_row_major_order() {
    let a = matrix_3x3();
    let flat = a.reshape(&[9]).unwrap();
    assert_eq!(flat.to_vec(), a.to_vec());
    let back = flat.reshape(&[3, 3]).unwrap();
    assert_eq!(back, a);
    assert!(matches!(a.reshape(&[2, 4]), Err(Error::ShapeMismatch(_))));
}

// ============================================================================
// Element-wise
// ============================================================================

#[test]
fn test_scale_and_map() {
    let a = matrix_3x3();
    let doubled = a.scale::<Standard<f64>>(2.0);
    assert_eq!(doubled.get(&[2, 2]).unwrap(), 18.0);

    let as_int = a.map(|v| v as i64);
    assert_eq!(as_int.shape(), a.shape());
    assert_eq!(as_int.to_vec(), (1..=9).collect::<Vec<i64>>());
}

#[test]
fn test_builder_round_trip() {
    let a = matrix_3x3();
    let mut b = TensorBuilder::from_tensor(&a);
    b.set(&[0, 0], 100.0).unwrap();
    assert!(matches!(
        b.set(&[3, 0], 0.0),
        Err(Error::IndexOutOfRange { .. })
    ));
    let edited = b.build();
    assert_eq!(edited.get(&[0, 0]).unwrap(), 100.0);
    // The source tensor is untouched
    assert_eq!(a.get(&[0, 0]).unwrap(), 1.0);
}

// ============================================================================
// Sub-blocks
// ============================================================================

#[test]
fn test_slice_then_trace() {
    let a = matrix_3x3();
    // Lower-right 2x2 block: [[5, 6], [8, 9]]
    let block = a.slice(&[1, 1], &[2, 2]).unwrap();
    assert_eq!(block.to_vec(), vec![5.0, 6.0, 8.0, 9.0]);
    let tr = einsum::<Standard<f64>>("ii->", &[&block]).unwrap();
    assert_eq!(tr.to_scalar(), Some(14.0));
}

#[test]
fn test_slice_out_of_bounds() {
    let a = matrix_3x3();
    assert!(matches!(
        a.slice(&[1, 2], &[2, 2]),
        Err(Error::IndexOutOfRange { .. })
    ));
}
