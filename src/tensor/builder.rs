//! Mutable staging buffer for tensors that have not been published yet.

use super::{checked_numel, compute_contiguous_strides, flat_index, Tensor};
use crate::algebra::{Scalar, Semiring};
use crate::error::Result;

/// A tensor under construction.
///
/// `TensorBuilder` is the only place element-wise writes are allowed. Once
/// [`build`](TensorBuilder::build) is called the data is frozen into an
/// immutable [`Tensor`].
///
/// # Example
///
/// ```rust
/// use einsum_core::algebra::Standard;
/// use einsum_core::TensorBuilder;
///
/// let mut eye = TensorBuilder::zeros::<Standard<i32>>(&[3, 3]).unwrap();
/// for i in 0..3 {
///     eye.set(&[i, i], 1).unwrap();
/// }
/// let eye = eye.build();
/// assert_eq!(eye.to_vec(), vec![1, 0, 0, 0, 1, 0, 0, 0, 1]);
/// ```
#[derive(Clone, Debug)]
pub struct TensorBuilder<T: Scalar> {
    data: Vec<T>,
    shape: Vec<usize>,
    strides: Vec<usize>,
}

impl<T: Scalar> TensorBuilder<T> {
    /// Start from a buffer with every element set to `value`.
    pub fn filled(shape: &[usize], value: T) -> Result<Self> {
        let numel = checked_numel(shape)?;
        Ok(Self {
            data: vec![value; numel],
            shape: shape.to_vec(),
            strides: compute_contiguous_strides(shape),
        })
    }

    /// Start from the semiring's additive identity.
    pub fn zeros<A: Semiring<Scalar = T>>(shape: &[usize]) -> Result<Self> {
        Self::filled(shape, A::zero().to_scalar())
    }

    /// Start from a copy of an existing tensor.
    pub fn from_tensor(tensor: &Tensor<T>) -> Self {
        Self {
            data: tensor.to_vec(),
            shape: tensor.shape().to_vec(),
            strides: tensor.strides().to_vec(),
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Read the element at `index`.
    pub fn get(&self, index: &[usize]) -> Result<T> {
        let pos = flat_index(&self.shape, &self.strides, index)?;
        Ok(self.data[pos])
    }

    /// Overwrite the element at `index`.
    pub fn set(&mut self, index: &[usize], value: T) -> Result<()> {
        let pos = flat_index(&self.shape, &self.strides, index)?;
        self.data[pos] = value;
        Ok(())
    }

    /// Freeze into an immutable tensor.
    pub fn build(self) -> Tensor<T> {
        Tensor::from_parts(self.data, self.shape)
    }
}
