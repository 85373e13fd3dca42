//! # einsum-core
//!
//! Dense tensors, string-driven Einstein summation over arbitrary semirings,
//! and pluggable execution backends.
//!
//! ## Features
//!
//! - **Algebra-agnostic**: Works with standard arithmetic `(+, ×)` and tropical semirings `(max, +)`, `(min, +)`
//! - **One contraction algorithm**: matmul, dot, trace, diagonal, transpose, outer products and
//!   n-way contractions all come from the same label-driven loop
//! - **Backend discovery**: providers ranked by priority, availability probed lazily and cached,
//!   selection that always degrades to the CPU
//! - **Scoped contexts**: backend resources are released on every exit path
//!
//! ## Quick Start
//!
//! ```rust
//! use einsum_core::{einsum, Tensor};
//! use einsum_core::algebra::{MaxPlus, Standard};
//!
//! // Row-major: [[1, 2], [3, 4]]
//! let a = Tensor::from_data(vec![1.0f32, 2.0, 3.0, 4.0], &[2, 2]).unwrap();
//! let b = Tensor::from_data(vec![1.0f32, 2.0, 3.0, 4.0], &[2, 2]).unwrap();
//!
//! // C[i,k] = Σ_j A[i,j] × B[j,k]
//! let c = einsum::<Standard<f32>>("ij,jk->ik", &[&a, &b]).unwrap();
//! assert_eq!(c.to_vec(), vec![7.0, 10.0, 15.0, 22.0]);
//!
//! // Tropical (max-plus) matrix multiplication
//! // C[i,k] = max_j (A[i,j] + B[j,k])
//! let c_tropical = einsum::<MaxPlus<f32>>("ij,jk->ik", &[&a, &b]).unwrap();
//! assert_eq!(c_tropical.to_vec(), vec![5.0, 6.0, 7.0, 8.0]);
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         User API                            │
//! │   einsum::<A>("ij,jk->ik", &[&a, &b]) → Result<Tensor>      │
//! │   Einsum::bind(&spec, shapes)?.execute::<A>(&mut ctx, ..)   │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Einsum Engine                          │
//! │   parse → bind extents → free / contracted partition        │
//! │   one unit of work per output chunk, ⊗ then ⊕ per element   │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Backend registry & contexts                 │
//! │   cpu (0) · cpu-parallel (10) · cpu-simd (20) · external    │
//! │   select(category) → create_context() → run() → close()     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//!
//! The global registry and evaluation settings read `EINSUM_*` environment
//! variables on first use; see [`config`].

pub mod algebra;
pub mod backend;
pub mod config;
pub mod einsum;
pub mod error;
pub mod tensor;

// Re-exports
pub use algebra::{Complex32, Complex64, Ring, Scalar, Semiring, Standard};
pub use backend::{Backend, BackendRegistry, CpuBackend, ExecutionContext};
pub use einsum::{einsum, einsum_in, EinBuilder, Einsum, EinsumSpec};
pub use error::{Error, Result};
pub use tensor::{Tensor, TensorBuilder};

#[cfg(feature = "tropical")]
pub use algebra::{MaxMul, MaxPlus, MinPlus};
