//! Standard arithmetic semiring `(+, ×)`.

use std::ops::{Add, Mul, Sub};

use num_traits::{One, Zero};

use super::semiring::{Ring, Semiring};
use super::Scalar;

/// Standard arithmetic semiring with addition and multiplication.
///
/// This represents the usual `(+, ×)` operations used in linear algebra and
/// works for any scalar with `num-traits` identities, including the complex
/// types re-exported from [`crate::algebra`].
///
/// # Example
///
/// ```rust
/// use einsum_core::algebra::{Semiring, Standard};
///
/// let a = Standard(2.0f32);
/// let b = Standard(3.0f32);
///
/// assert_eq!(a.add(b).to_scalar(), 5.0);  // 2 + 3 = 5
/// assert_eq!(a.mul(b).to_scalar(), 6.0);  // 2 × 3 = 6
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(transparent)]
pub struct Standard<T: Scalar>(pub T);

impl<T> Semiring for Standard<T>
where
    T: Scalar + Zero + One + Add<Output = T> + Mul<Output = T>,
{
    type Scalar = T;

    #[inline]
    fn zero() -> Self {
        Standard(T::zero())
    }

    #[inline]
    fn one() -> Self {
        Standard(T::one())
    }

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Standard(self.0 + rhs.0)
    }

    #[inline]
    fn mul(self, rhs: Self) -> Self {
        Standard(self.0 * rhs.0)
    }

    #[inline]
    fn from_scalar(s: T) -> Self {
        Standard(s)
    }

    #[inline]
    fn to_scalar(self) -> T {
        self.0
    }

    #[inline]
    fn is_zero(&self) -> bool {
        self.0 == T::zero()
    }
}

impl<T> Ring for Standard<T>
where
    T: Scalar + Zero + One + Add<Output = T> + Mul<Output = T> + Sub<Output = T>,
{
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Standard(self.0 - rhs.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::Complex64;

    #[test]
    fn test_standard_f32() {
        let a = Standard(2.0f32);
        let b = Standard(3.0f32);

        assert_eq!(a.add(b).to_scalar(), 5.0);
        assert_eq!(a.mul(b).to_scalar(), 6.0);
        assert_eq!(Standard::<f32>::zero().to_scalar(), 0.0);
        assert_eq!(Standard::<f32>::one().to_scalar(), 1.0);
    }

    #[test]
    fn test_standard_integers() {
        let a = Standard(7i64);
        let b = Standard(-3i64);
        assert_eq!(a.add(b).to_scalar(), 4);
        assert_eq!(a.mul(b).to_scalar(), -21);
        assert!(Standard::<u32>::zero().is_zero());
        assert!(!Standard::<u32>::one().is_zero());
    }

    #[test]
    fn test_standard_sub() {
        assert_eq!(Standard(7i32).sub(Standard(10)).to_scalar(), -3);
        let a = Standard(1.5f64);
        assert_eq!(a.add(Standard(2.0)).sub(Standard(2.0)), a);
    }

    #[test]
    fn test_standard_complex() {
        let i = Standard(Complex64::new(0.0, 1.0));
        // i * i = -1
        assert_eq!(i.mul(i).to_scalar(), Complex64::new(-1.0, 0.0));
        assert_eq!(
            Standard::<Complex64>::one().to_scalar(),
            Complex64::new(1.0, 0.0)
        );
    }
}
