//! Element capabilities for tensor operations.
//!
//! Tensors store plain [`Scalar`] values; the arithmetic applied to them is
//! chosen at the call site through a [`Semiring`]:
//! - [`Standard<T>`]: ordinary `(+, ×)` over integers, floats and complex numbers
//! - [`MaxPlus<T>`]: tropical `(max, +)`
//! - [`MinPlus<T>`]: tropical `(min, +)`
//! - [`MaxMul<T>`]: tropical `(max, ×)`

mod semiring;
mod standard;
#[cfg(feature = "tropical")]
mod tropical;

pub use num_complex::{Complex32, Complex64};
pub use semiring::{Ring, Semiring};
pub use standard::Standard;
#[cfg(feature = "tropical")]
pub use tropical::{MaxMul, MaxPlus, MinPlus, TropicalBound};

/// Marker trait for values that can be stored in a tensor.
///
/// Any `Copy` type with value equality qualifies, so element types supplied
/// by other crates work without registration.
pub trait Scalar: Copy + Send + Sync + PartialEq + std::fmt::Debug + 'static {}

impl<T> Scalar for T where T: Copy + Send + Sync + PartialEq + std::fmt::Debug + 'static {}
