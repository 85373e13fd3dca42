//! Dense row-major tensors.
//!
//! A [`Tensor`] owns a flat buffer of `product(shape)` elements laid out in
//! row-major order and never changes after construction. Values that are
//! still being filled in live in a [`TensorBuilder`], the only type that
//! exposes `set`.

mod builder;
mod ops;

use crate::algebra::{Scalar, Semiring};
use crate::error::{Error, Result};

pub use builder::TensorBuilder;

/// An immutable multi-dimensional array with row-major layout.
///
/// # Type Parameters
///
/// * `T` - The stored element type. Arithmetic is supplied per operation by a
///   [`Semiring`] whose `Scalar` is `T`.
///
/// # Example
///
/// ```rust
/// use einsum_core::Tensor;
///
/// let t = Tensor::from_data(vec![1, 2, 3, 4, 5, 6], &[2, 3]).unwrap();
/// assert_eq!(t.strides(), &[3, 1]);
/// assert_eq!(t.get(&[1, 0]).unwrap(), 4);
/// ```
#[derive(Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(
        try_from = "TensorRepr<T>",
        into = "TensorRepr<T>",
        bound(
            serialize = "T: Scalar + serde::Serialize",
            deserialize = "T: Scalar + serde::Deserialize<'de>"
        )
    )
)]
pub struct Tensor<T: Scalar> {
    /// Owned storage, row-major
    data: Vec<T>,

    /// Extent of each dimension (empty for scalars)
    shape: Vec<usize>,

    /// Row-major strides derived from `shape`
    strides: Vec<usize>,
}

impl<T: Scalar> Tensor<T> {
    // ========================================================================
    // Constructors
    // ========================================================================

    /// Create a tensor from data with the given shape, taking ownership of
    /// the buffer.
    ///
    /// Data is interpreted in row-major (C) order. Fails with
    /// [`Error::ShapeMismatch`] when `data.len()` differs from the product of
    /// the extents or when an extent is zero.
    pub fn from_data(data: Vec<T>, shape: &[usize]) -> Result<Self> {
        let numel = checked_numel(shape)?;
        if data.len() != numel {
            return Err(Error::shape(format!(
                "data length {} doesn't match shape {:?} (expected {})",
                data.len(),
                shape,
                numel
            )));
        }
        Ok(Self::from_parts(data, shape.to_vec()))
    }

    /// Create a tensor by copying a slice.
    pub fn from_slice(data: &[T], shape: &[usize]) -> Result<Self> {
        Self::from_data(data.to_vec(), shape)
    }

    /// Create a rank-0 tensor holding one value.
    pub fn scalar(value: T) -> Self {
        Self::from_parts(vec![value], Vec::new())
    }

    /// Create a tensor with every element set to `value`.
    pub fn filled(shape: &[usize], value: T) -> Result<Self> {
        let numel = checked_numel(shape)?;
        Ok(Self::from_parts(vec![value; numel], shape.to_vec()))
    }

    /// Create a tensor filled with the semiring's additive identity.
    pub fn zeros<A: Semiring<Scalar = T>>(shape: &[usize]) -> Result<Self> {
        Self::filled(shape, A::zero().to_scalar())
    }

    /// Assemble a tensor whose buffer length is already known to match.
    pub(crate) fn from_parts(data: Vec<T>, shape: Vec<usize>) -> Self {
        debug_assert_eq!(data.len(), shape.iter().product::<usize>());
        let strides = compute_contiguous_strides(&shape);
        Self {
            data,
            shape,
            strides,
        }
    }

    // ========================================================================
    // Metadata
    // ========================================================================

    /// Get the shape of the tensor.
    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Get the strides of the tensor (in elements).
    #[inline]
    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    /// Get the number of dimensions.
    #[inline]
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Get the total number of elements (1 for a scalar).
    #[inline]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// True for rank-0 tensors.
    #[inline]
    pub fn is_scalar(&self) -> bool {
        self.shape.is_empty()
    }

    // ========================================================================
    // Data Access
    // ========================================================================

    /// Read the element at `index`.
    ///
    /// Fails with [`Error::IndexOutOfRange`] when `index.len() != rank()` or
    /// any component is outside its dimension.
    pub fn get(&self, index: &[usize]) -> Result<T> {
        let pos = self.flat_index(index)?;
        Ok(self.data[pos])
    }

    /// Flat storage position of a multi-index.
    pub fn flat_index(&self, index: &[usize]) -> Result<usize> {
        flat_index(&self.shape, &self.strides, index)
    }

    /// The value of a rank-0 tensor, or `None` for higher ranks.
    pub fn to_scalar(&self) -> Option<T> {
        if self.is_scalar() {
            Some(self.data[0])
        } else {
            None
        }
    }

    /// Borrow the row-major storage.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Copy all data to a Vec.
    pub fn to_vec(&self) -> Vec<T> {
        self.data.clone()
    }

    /// Give up the tensor and keep its storage.
    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    /// Iterate over elements in storage order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.data.iter()
    }
}

/// Compute contiguous strides for row-major (C) layout.
///
/// For shape [m, n], returns strides [n, 1] (last dimension is contiguous).
pub fn compute_contiguous_strides(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![1; shape.len()];
    for i in (0..shape.len().saturating_sub(1)).rev() {
        strides[i] = strides[i + 1] * shape[i + 1];
    }
    strides
}

/// Number of elements for `shape`, rejecting zero extents and overflow.
pub(crate) fn checked_numel(shape: &[usize]) -> Result<usize> {
    shape.iter().enumerate().try_fold(1usize, |acc, (axis, &extent)| {
        if extent == 0 {
            return Err(Error::shape(format!(
                "dimension {} of shape {:?} has zero extent",
                axis, shape
            )));
        }
        acc.checked_mul(extent)
            .ok_or_else(|| Error::shape(format!("shape {:?} overflows usize", shape)))
    })
}

pub(crate) fn flat_index(shape: &[usize], strides: &[usize], index: &[usize]) -> Result<usize> {
    let out_of_range = || Error::IndexOutOfRange {
        index: index.to_vec(),
        shape: shape.to_vec(),
    };
    if index.len() != shape.len() {
        return Err(out_of_range());
    }
    let mut pos = 0;
    for ((&i, &extent), &stride) in index.iter().zip(shape).zip(strides) {
        if i >= extent {
            return Err(out_of_range());
        }
        pos += i * stride;
    }
    Ok(pos)
}

impl<T: Scalar> std::fmt::Debug for Tensor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tensor")
            .field("shape", &self.shape)
            .field("strides", &self.strides)
            .field("size", &self.size())
            .finish()
    }
}

/// One-line summary; element values are not printed.
impl<T: Scalar> std::fmt::Display for Tensor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Tensor(shape={:?}, size={})", self.shape, self.size())
    }
}

impl<'a, T: Scalar> IntoIterator for &'a Tensor<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(feature = "serde")]
#[derive(serde::Serialize, serde::Deserialize)]
struct TensorRepr<T> {
    shape: Vec<usize>,
    data: Vec<T>,
}

#[cfg(feature = "serde")]
impl<T: Scalar> From<Tensor<T>> for TensorRepr<T> {
    fn from(tensor: Tensor<T>) -> Self {
        Self {
            shape: tensor.shape,
            data: tensor.data,
        }
    }
}

#[cfg(feature = "serde")]
impl<T: Scalar> TryFrom<TensorRepr<T>> for Tensor<T> {
    type Error = Error;

    fn try_from(repr: TensorRepr<T>) -> Result<Self> {
        Tensor::from_data(repr.data, &repr.shape)
    }
}
