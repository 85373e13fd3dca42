//! Tropical semiring implementations.
//!
//! - [`MaxPlus<T>`]: `(max, +)` semiring for longest path, Viterbi
//! - [`MinPlus<T>`]: `(min, +)` semiring for shortest path
//! - [`MaxMul<T>`]: `(max, ×)` semiring for max probability
//!
//! The zero elements come from [`TropicalBound`]: `-∞` / `+∞` for floats,
//! `MIN` / `MAX` for integers. ⊗ absorbs the zero element instead of adding
//! to it, so integer bounds never overflow.

use std::ops::{Add, Mul};

use num_traits::{One, Zero};

use super::semiring::Semiring;
use super::Scalar;

/// Least and greatest values of a scalar, used as tropical zeros.
pub trait TropicalBound: Copy {
    /// `-∞` for floats, `MIN` for integers.
    fn neg_infinity() -> Self;

    /// `+∞` for floats, `MAX` for integers.
    fn pos_infinity() -> Self;
}

macro_rules! impl_tropical_bound {
    (float: $($t:ty),*) => {
        $(impl TropicalBound for $t {
            #[inline]
            fn neg_infinity() -> Self {
                <$t>::NEG_INFINITY
            }

            #[inline]
            fn pos_infinity() -> Self {
                <$t>::INFINITY
            }
        })*
    };
    (int: $($t:ty),*) => {
        $(impl TropicalBound for $t {
            #[inline]
            fn neg_infinity() -> Self {
                <$t>::MIN
            }

            #[inline]
            fn pos_infinity() -> Self {
                <$t>::MAX
            }
        })*
    };
}

impl_tropical_bound!(float: f32, f64);
impl_tropical_bound!(int: i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

// ============================================================================
// MaxPlus: (max, +) semiring
// ============================================================================

/// Tropical max-plus semiring `(max, +)`.
///
/// Operations:
/// - Addition (⊕): `max(a, b)`
/// - Multiplication (⊗): `a + b`
/// - Zero: `-∞` (`MIN` for integers)
/// - One: `0`
///
/// # Example
///
/// ```rust
/// use einsum_core::algebra::{MaxPlus, Semiring};
///
/// let a = MaxPlus(2.0f32);
/// let b = MaxPlus(3.0f32);
///
/// assert_eq!(a.add(b).to_scalar(), 3.0);  // max(2, 3) = 3
/// assert_eq!(a.mul(b).to_scalar(), 5.0);  // 2 + 3 = 5
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(transparent)]
pub struct MaxPlus<T: Scalar>(pub T);

impl<T> Semiring for MaxPlus<T>
where
    T: Scalar + TropicalBound + Zero + PartialOrd + Add<Output = T>,
{
    type Scalar = T;

    #[inline]
    fn zero() -> Self {
        MaxPlus(T::neg_infinity())
    }

    #[inline]
    fn one() -> Self {
        MaxPlus(T::zero())
    }

    #[inline]
    fn add(self, rhs: Self) -> Self {
        if self.0 >= rhs.0 {
            self
        } else {
            rhs
        }
    }

    #[inline]
    fn mul(self, rhs: Self) -> Self {
        if self.is_zero() || rhs.is_zero() {
            Self::zero()
        } else {
            MaxPlus(self.0 + rhs.0)
        }
    }

    #[inline]
    fn from_scalar(s: T) -> Self {
        MaxPlus(s)
    }

    #[inline]
    fn to_scalar(self) -> T {
        self.0
    }

    #[inline]
    fn is_zero(&self) -> bool {
        self.0 == T::neg_infinity()
    }
}

// ============================================================================
// MinPlus: (min, +) semiring
// ============================================================================

/// Tropical min-plus semiring `(min, +)`.
///
/// Operations:
/// - Addition (⊕): `min(a, b)`
/// - Multiplication (⊗): `a + b`
/// - Zero: `+∞` (`MAX` for integers)
/// - One: `0`
///
/// Used for: shortest path, min-cost problems
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(transparent)]
pub struct MinPlus<T: Scalar>(pub T);

impl<T> Semiring for MinPlus<T>
where
    T: Scalar + TropicalBound + Zero + PartialOrd + Add<Output = T>,
{
    type Scalar = T;

    #[inline]
    fn zero() -> Self {
        MinPlus(T::pos_infinity())
    }

    #[inline]
    fn one() -> Self {
        MinPlus(T::zero())
    }

    #[inline]
    fn add(self, rhs: Self) -> Self {
        if self.0 <= rhs.0 {
            self
        } else {
            rhs
        }
    }

    #[inline]
    fn mul(self, rhs: Self) -> Self {
        if self.is_zero() || rhs.is_zero() {
            Self::zero()
        } else {
            MinPlus(self.0 + rhs.0)
        }
    }

    #[inline]
    fn from_scalar(s: T) -> Self {
        MinPlus(s)
    }

    #[inline]
    fn to_scalar(self) -> T {
        self.0
    }

    #[inline]
    fn is_zero(&self) -> bool {
        self.0 == T::pos_infinity()
    }
}

// ============================================================================
// MaxMul: (max, ×) semiring
// ============================================================================

/// Tropical max-times semiring `(max, ×)`.
///
/// Operations:
/// - Addition (⊕): `max(a, b)`
/// - Multiplication (⊗): `a × b`
/// - Zero: `0`
/// - One: `1`
///
/// Used for: most probable path over non-negative weights
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(transparent)]
pub struct MaxMul<T: Scalar>(pub T);

impl<T> Semiring for MaxMul<T>
where
    T: Scalar + Zero + One + PartialOrd + Mul<Output = T>,
{
    type Scalar = T;

    #[inline]
    fn zero() -> Self {
        MaxMul(T::zero())
    }

    #[inline]
    fn one() -> Self {
        MaxMul(T::one())
    }

    #[inline]
    fn add(self, rhs: Self) -> Self {
        if self.0 >= rhs.0 {
            self
        } else {
            rhs
        }
    }

    #[inline]
    fn mul(self, rhs: Self) -> Self {
        MaxMul(self.0 * rhs.0)
    }

    #[inline]
    fn from_scalar(s: T) -> Self {
        MaxMul(s)
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
