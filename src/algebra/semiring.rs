//! The algebraic capability the tensor core is generic over.

use super::Scalar;

/// A semiring defines two binary operations (⊕, ⊗) with identities.
///
/// # Semiring Laws
///
/// For a semiring (S, ⊕, ⊗, 0, 1):
/// - (S, ⊕, 0) is a commutative monoid
/// - (S, ⊗, 1) is a monoid
/// - ⊗ distributes over ⊕
/// - 0 annihilates: a ⊗ 0 = 0 ⊗ a = 0
///
/// Einsum results are only independent of the backend's accumulation order
/// when ⊕ is associative and commutative. Floating point addition is not
/// exactly associative, so parallel and vectorised backends may differ from
/// the scalar CPU backend in the last bits.
///
/// # Examples
///
/// | Semiring | ⊕ | ⊗ | 0 | 1 |
/// |----------|---|---|---|---|
/// | Standard | + | × | 0 | 1 |
/// | MaxPlus  | max | + | -∞ | 0 |
/// | MinPlus  | min | + | +∞ | 0 |
/// | MaxMul   | max | × | 0 | 1 |
pub trait Semiring: Copy + Clone + Send + Sync + 'static {
    /// The value type stored in tensors.
    type Scalar: Scalar;

    /// Additive identity (zero element for ⊕)
    fn zero() -> Self;

    /// Multiplicative identity (one element for ⊗)
    fn one() -> Self;

    /// Addition operation (⊕)
    fn add(self, rhs: Self) -> Self;

    /// Multiplication operation (⊗)
    fn mul(self, rhs: Self) -> Self;

    /// Wrap a stored value.
    fn from_scalar(s: Self::Scalar) -> Self;

    /// Unwrap into a stored value.
    fn to_scalar(self) -> Self::Scalar;

    /// Check if this is the zero element
    fn is_zero(&self) -> bool;
}

/// A semiring whose ⊕ can be undone.
///
/// Only [`Standard`](super::Standard) is a ring; the tropical semirings have
/// no additive inverses.
pub trait Ring: Semiring {
    /// Subtraction, the inverse of ⊕.
    fn sub(self, rhs: Self) -> Self;
}
