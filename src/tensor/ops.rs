//! Element-wise arithmetic, reductions and layout changes.
//!
//! Every operation returns a new tensor. Arithmetic goes through the
//! semiring named by the caller, so the same `Tensor<f32>` can be added with
//! `Standard<f32>` or with `MaxPlus<f32>`.

use rayon::prelude::*;

use super::{checked_numel, compute_contiguous_strides, Tensor};
use crate::algebra::{Ring, Scalar, Semiring};
use crate::config::DEFAULT_PARALLEL_THRESHOLD;
use crate::error::{Error, Result};

impl<T: Scalar> Tensor<T> {
    /// Element-wise ⊕ of two tensors with identical shapes.
    ///
    /// # Example
    ///
    /// ```rust
    /// use einsum_core::algebra::Standard;
    /// use einsum_core::Tensor;
    ///
    /// let a = Tensor::from_data(vec![1, 2, 3], &[3]).unwrap();
    /// let b = Tensor::from_data(vec![10, 20, 30], &[3]).unwrap();
    /// assert_eq!(a.add::<Standard<i32>>(&b).unwrap().to_vec(), vec![11, 22, 33]);
    /// ```
    pub fn add<A: Semiring<Scalar = T>>(&self, other: &Self) -> Result<Self> {
        self.zip_with(other, "add", |a, b| {
            A::from_scalar(a).add(A::from_scalar(b)).to_scalar()
        })
    }

    /// Element-wise ⊗ (Hadamard product) of two tensors with identical shapes.
    pub fn mul<A: Semiring<Scalar = T>>(&self, other: &Self) -> Result<Self> {
        self.zip_with(other, "mul", |a, b| {
            A::from_scalar(a).mul(A::from_scalar(b)).to_scalar()
        })
    }

    /// Element-wise subtraction of two tensors with identical shapes.
    ///
    /// Needs a [`Ring`]; tropical semirings have no subtraction.
    pub fn sub<A: Ring<Scalar = T>>(&self, other: &Self) -> Result<Self> {
        self.zip_with(other, "sub", |a, b| {
            A::from_scalar(a).sub(A::from_scalar(b)).to_scalar()
        })
    }

    /// Multiply every element by `factor` using the semiring's ⊗.
    pub fn scale<A: Semiring<Scalar = T>>(&self, factor: T) -> Self {
        let factor = A::from_scalar(factor);
        self.map(|v| A::from_scalar(v).mul(factor).to_scalar())
    }

    /// Apply `f` to every element, producing a tensor of the same shape.
    pub fn map<U, F>(&self, f: F) -> Tensor<U>
    where
        U: Scalar,
        F: Fn(T) -> U + Send + Sync,
    {
        let data: Vec<U> = if self.size() >= DEFAULT_PARALLEL_THRESHOLD {
            self.data.par_iter().map(|&v| f(v)).collect()
        } else {
            self.data.iter().map(|&v| f(v)).collect()
        };
        Tensor::from_parts(data, self.shape.clone())
    }

    fn zip_with<F>(&self, other: &Self, op: &str, f: F) -> Result<Self>
    where
        F: Fn(T, T) -> T + Send + Sync,
    {
        if self.shape != other.shape {
            return Err(Error::shape(format!(
                "{} requires equal shapes, got {:?} and {:?}",
                op, self.shape, other.shape
            )));
        }
        let data: Vec<T> = if self.size() >= DEFAULT_PARALLEL_THRESHOLD {
            self.data
                .par_iter()
                .zip(other.data.par_iter())
                .map(|(&a, &b)| f(a, b))
                .collect()
        } else {
            self.data
                .iter()
                .zip(other.data.iter())
                .map(|(&a, &b)| f(a, b))
                .collect()
        };
        Ok(Self::from_parts(data, self.shape.clone()))
    }

    // ========================================================================
    // Reduction Operations
    // ========================================================================

    /// Sum all elements using the semiring's addition.
    ///
    /// ```rust
    /// use einsum_core::algebra::Standard;
    /// use einsum_core::Tensor;
    ///
    /// let t = Tensor::from_data(vec![1.0f32, 2.0, 3.0, 4.0], &[2, 2]).unwrap();
    /// assert_eq!(t.sum::<Standard<f32>>(), 10.0);
    /// ```
    pub fn sum<A: Semiring<Scalar = T>>(&self) -> T {
        let fold = |acc: A, &v: &T| acc.add(A::from_scalar(v));
        if self.size() >= DEFAULT_PARALLEL_THRESHOLD {
            self.data
                .par_iter()
                .fold(A::zero, fold)
                .reduce(A::zero, |a, b| a.add(b))
                .to_scalar()
        } else {
            self.data.iter().fold(A::zero(), fold).to_scalar()
        }
    }

    /// Sum along one axis using the semiring's addition.
    ///
    /// The result has one fewer dimension than the input; reducing the only
    /// axis of a vector gives a rank-0 tensor.
    pub fn sum_axis<A: Semiring<Scalar = T>>(&self, axis: usize) -> Result<Self> {
        if axis >= self.rank() {
            return Err(Error::IndexOutOfRange {
                index: vec![axis],
                shape: self.shape.clone(),
            });
        }

        let mut new_shape = self.shape.clone();
        let extent = new_shape.remove(axis);
        let inner = self.strides[axis];
        let outer_len = inner * extent;

        let mut acc = vec![A::zero(); self.size() / extent];
        for (flat, &v) in self.data.iter().enumerate() {
            let out = (flat / outer_len) * inner + flat % inner;
            acc[out] = acc[out].add(A::from_scalar(v));
        }

        let data = acc.into_iter().map(|v| v.to_scalar()).collect();
        Ok(Self::from_parts(data, new_shape))
    }

    // ========================================================================
    // Layout Operations (copying)
    // ========================================================================

    /// Reorder dimensions; `axes[i]` names the source axis of output axis `i`.
    ///
    /// ```rust
    /// use einsum_core::Tensor;
    ///
    /// let t = Tensor::from_data(vec![1, 2, 3, 4, 5, 6], &[2, 3]).unwrap();
    /// let p = t.permute(&[1, 0]).unwrap();
    /// assert_eq!(p.shape(), &[3, 2]);
    /// assert_eq!(p.to_vec(), vec![1, 4, 2, 5, 3, 6]);
    /// ```
    pub fn permute(&self, axes: &[usize]) -> Result<Self> {
        if axes.len() != self.rank() {
            return Err(Error::shape(format!(
                "permutation {:?} has length {} but tensor rank is {}",
                axes,
                axes.len(),
                self.rank()
            )));
        }
        let mut seen = vec![false; self.rank()];
        for &ax in axes {
            if ax >= self.rank() || seen[ax] {
                return Err(Error::shape(format!(
                    "{:?} is not a permutation of 0..{}",
                    axes,
                    self.rank()
                )));
            }
            seen[ax] = true;
        }

        let new_shape: Vec<usize> = axes.iter().map(|&i| self.shape[i]).collect();
        let src_strides: Vec<usize> = axes.iter().map(|&i| self.strides[i]).collect();
        let data = gather_strided(&self.data, &new_shape, &src_strides);
        Ok(Self::from_parts(data, new_shape))
    }

    /// Copy out the block `starts[d] .. starts[d] + sizes[d]` of every axis.
    ///
    /// Fails with [`Error::ShapeMismatch`] when the argument lengths differ
    /// from the rank or a size is zero, and with [`Error::IndexOutOfRange`]
    /// when the block leaves the tensor.
    ///
    /// ```rust
    /// use einsum_core::Tensor;
    ///
    /// let t = Tensor::from_data((0..12).collect::<Vec<i32>>(), &[3, 4]).unwrap();
    /// let s = t.slice(&[1, 1], &[2, 2]).unwrap();
    /// assert_eq!(s.to_vec(), vec![5, 6, 9, 10]);
    /// ```
    pub fn slice(&self, starts: &[usize], sizes: &[usize]) -> Result<Self> {
        if starts.len() != self.rank() || sizes.len() != self.rank() {
            return Err(Error::shape(format!(
                "slice of a rank-{} tensor needs {} starts and sizes, got {} and {}",
                self.rank(),
                self.rank(),
                starts.len(),
                sizes.len()
            )));
        }
        checked_numel(sizes)?;

        let mut offset = 0;
        for (d, (&start, &size)) in starts.iter().zip(sizes).enumerate() {
            match start.checked_add(size) {
                Some(end) if end <= self.shape[d] => offset += start * self.strides[d],
                _ => {
                    return Err(Error::IndexOutOfRange {
                        index: starts.to_vec(),
                        shape: self.shape.clone(),
                    })
                }
            }
        }

        let data = gather_strided(&self.data[offset..], sizes, &self.strides);
        Ok(Self::from_parts(data, sizes.to_vec()))
    }

    /// Transpose (2D shorthand for permute).
    pub fn transpose(&self) -> Result<Self> {
        if self.rank() != 2 {
            return Err(Error::shape(format!(
                "transpose requires a rank-2 tensor, got rank {}",
                self.rank()
            )));
        }
        self.permute(&[1, 0])
    }

    /// Reinterpret the same elements under a new shape.
    pub fn reshape(&self, new_shape: &[usize]) -> Result<Self> {
        let new_numel = checked_numel(new_shape)?;
        if new_numel != self.size() {
            return Err(Error::shape(format!(
                "cannot reshape {:?} ({} elements) to {:?} ({} elements)",
                self.shape,
                self.size(),
                new_shape,
                new_numel
            )));
        }
        Ok(Self {
            data: self.data.clone(),
            shape: new_shape.to_vec(),
            strides: compute_contiguous_strides(new_shape),
        })
    }
}

/// Copy `src` into a contiguous row-major buffer of `shape`, reading
/// element `idx` from `Σ idx[d] * strides[d]`.
fn gather_strided<T: Scalar>(src: &[T], shape: &[usize], strides: &[usize]) -> Vec<T> {
    let numel: usize = shape.iter().product();
    let mut dst = Vec::with_capacity(numel);

    let mut indices = vec![0usize; shape.len()];
    let mut offset = 0usize;
    for _ in 0..numel {
        dst.push(src[offset]);

        // Increment indices (row-major order: last dimension first)
        for dim in (0..shape.len()).rev() {
            indices[dim] += 1;
            offset += strides[dim];
            if indices[dim] < shape[dim] {
                break;
            }
            offset -= strides[dim] * shape[dim];
            indices[dim] = 0;
        }
    }
    dst
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::Standard;

    #[test]
    fn test_add_and_mul() {
        let a = Tensor::from_data(vec![1.0f64, 2.0, 3.0, 4.0], &[2, 2]).unwrap();
        let b = Tensor::from_data(vec![10.0, 20.0, 30.0, 40.0], &[2, 2]).unwrap();

        let sum = a.add::<Standard<f64>>(&b).unwrap();
        assert_eq!(sum.to_vec(), vec![11.0, 22.0, 33.0, 44.0]);

        let prod = a.mul::<Standard<f64>>(&b).unwrap();
        assert_eq!(prod.to_vec(), vec![10.0, 40.0, 90.0, 160.0]);
    }

    #[test]
    fn test_elementwise_shape_mismatch() {
        let a = Tensor::from_data(vec![1, 2, 3, 4], &[2, 2]).unwrap();
        let b = Tensor::from_data(vec![1, 2, 3, 4], &[4]).unwrap();
        assert!(matches!(
            a.add::<Standard<i32>>(&b),
            Err(Error::ShapeMismatch(_))
        ));
        assert!(matches!(
            a.mul::<Standard<i32>>(&b),
            Err(Error::ShapeMismatch(_))
        ));
    }

    #[test]
    fn test_large_elementwise_matches_sequential() {
        let n = DEFAULT_PARALLEL_THRESHOLD * 3;
        let a = Tensor::from_data((0..n as i64).collect(), &[n]).unwrap();
        let b = a.add::<Standard<i64>>(&a).unwrap();
        assert!(b.iter().enumerate().all(|(i, &v)| v == 2 * i as i64));
        assert_eq!(a.sum::<Standard<i64>>(), (n as i64 - 1) * n as i64 / 2);
    }

    #[test]
    fn test_sub() {
        let a = Tensor::from_data(vec![5, 7, 9], &[3]).unwrap();
        let b = Tensor::from_data(vec![1, 2, 10], &[3]).unwrap();
        assert_eq!(a.sub::<Standard<i32>>(&b).unwrap().to_vec(), vec![4, 5, -1]);
        assert!(matches!(
            a.sub::<Standard<i32>>(&Tensor::scalar(1)),
            Err(Error::ShapeMismatch(_))
        ));
    }

    #[test]
    fn test_slice_block() {
        // [[ 0,  1,  2,  3],
        //  [ 4,  5,  6,  7],
        //  [ 8,  9, 10, 11]]
        let t = Tensor::from_data((0..12).collect::<Vec<i32>>(), &[3, 4]).unwrap();
        let s = t.slice(&[1, 2], &[2, 2]).unwrap();
        assert_eq!(s.shape(), &[2, 2]);
        assert_eq!(s.to_vec(), vec![6, 7, 10, 11]);

        assert_eq!(t.slice(&[0, 0], &[3, 4]).unwrap(), t);
        assert_eq!(t.slice(&[2, 0], &[1, 4]).unwrap().to_vec(), vec![8, 9, 10, 11]);
    }

    #[test]
    fn test_slice_errors() {
        let t = Tensor::from_data((0..12).collect::<Vec<i32>>(), &[3, 4]).unwrap();
        assert!(matches!(
            t.slice(&[2, 0], &[2, 1]),
            Err(Error::IndexOutOfRange { .. })
        ));
        assert!(matches!(
            t.slice(&[usize::MAX, 0], &[2, 1]),
            Err(Error::IndexOutOfRange { .. })
        ));
        assert!(matches!(t.slice(&[0], &[1]), Err(Error::ShapeMismatch(_))));
        assert!(matches!(
            t.slice(&[0, 0], &[0, 1]),
            Err(Error::ShapeMismatch(_))
        ));
    }

    #[test]
    fn test_slice_of_scalar() {
        let s = Tensor::scalar(3.5f64);
        assert_eq!(s.slice(&[], &[]).unwrap(), s);
    }

    #[test]
    fn test_scale() {
        let a = Tensor::from_data(vec![1, -2, 3], &[3]).unwrap();
        assert_eq!(a.scale::<Standard<i32>>(3).to_vec(), vec![3, -6, 9]);
    }

    #[test]
    fn test_sum() {
        let t = Tensor::from_data(vec![1.0f32, 2.0, 3.0, 4.0], &[2, 2]).unwrap();
        assert_eq!(t.sum::<Standard<f32>>(), 10.0);
    }

    #[test]
    fn test_sum_axis() {
        // [[1, 2],
        //  [3, 4]]
        let t = Tensor::from_data(vec![1.0f32, 2.0, 3.0, 4.0], &[2, 2]).unwrap();

        // Sum over axis 1 (within each row): [1+2, 3+4] = [3, 7]
        let rows = t.sum_axis::<Standard<f32>>(1).unwrap();
        assert_eq!(rows.shape(), &[2]);
        assert_eq!(rows.to_vec(), vec![3.0, 7.0]);

        // Sum over axis 0 (down each column): [1+3, 2+4] = [4, 6]
        let cols = t.sum_axis::<Standard<f32>>(0).unwrap();
        assert_eq!(cols.to_vec(), vec![4.0, 6.0]);
    }

    #[test]
    fn test_sum_axis_3d_middle() {
        let t = Tensor::from_data((1..=24).collect::<Vec<i32>>(), &[2, 3, 4]).unwrap();
        let r = t.sum_axis::<Standard<i32>>(1).unwrap();
        assert_eq!(r.shape(), &[2, 4]);
        // r[0][0] = 1 + 5 + 9
        assert_eq!(r.get(&[0, 0]).unwrap(), 15);
        // r[1][3] = 16 + 20 + 24
        assert_eq!(r.get(&[1, 3]).unwrap(), 60);
    }

    #[test]
    fn test_sum_axis_vector_to_scalar() {
        let v = Tensor::from_data(vec![1, 2, 3], &[3]).unwrap();
        let s = v.sum_axis::<Standard<i32>>(0).unwrap();
        assert!(s.is_scalar());
        assert_eq!(s.to_scalar(), Some(6));
        assert!(matches!(
            v.sum_axis::<Standard<i32>>(1),
            Err(Error::IndexOutOfRange { .. })
        ));
    }

    #[test]
    fn test_permute_3d() {
        let t = Tensor::from_data((0..24).collect::<Vec<u32>>(), &[2, 3, 4]).unwrap();
        let p = t.permute(&[2, 0, 1]).unwrap();
        assert_eq!(p.shape(), &[4, 2, 3]);
        for i in 0..2 {
            for j in 0..3 {
                for k in 0..4 {
                    assert_eq!(p.get(&[k, i, j]).unwrap(), t.get(&[i, j, k]).unwrap());
                }
            }
        }
    }

    #[test]
    fn test_permute_rejects_bad_axes() {
        let t = Tensor::from_data(vec![1, 2, 3, 4], &[2, 2]).unwrap();
        assert!(t.permute(&[0, 0]).is_err());
        assert!(t.permute(&[0]).is_err());
        assert!(t.permute(&[0, 2]).is_err());
    }

    #[test]
    fn test_transpose_and_reshape() {
        let t = Tensor::from_data(vec![1, 2, 3, 4, 5, 6], &[2, 3]).unwrap();
        let tt = t.transpose().unwrap();
        assert_eq!(tt.to_vec(), vec![1, 4, 2, 5, 3, 6]);
        assert_eq!(tt.transpose().unwrap(), t);

        let r = t.reshape(&[3, 2]).unwrap();
        assert_eq!(r.strides(), &[2, 1]);
        assert_eq!(r.to_vec(), t.to_vec());
        assert!(t.reshape(&[4, 2]).is_err());
    }

    #[test]
    fn test_map_changes_type() {
        let t = Tensor::from_data(vec![1u8, 2, 3], &[3]).unwrap();
        let f = t.map(|v| v as f64 / 2.0);
        assert_eq!(f.to_vec(), vec![0.5, 1.0, 1.5]);
    }
}
