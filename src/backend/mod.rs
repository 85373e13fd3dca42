//! Execution backends: discovery, selection and scoped contexts.
//!
//! - [`Backend`]: a provider with a descriptor, an availability probe and a
//!   context factory
//! - [`BackendRegistry`]: ranks providers per category and degrades to the CPU
//! - [`ExecutionContext`]: exclusive, released-on-every-path handle that runs
//!   a [`UnitOfWork`]
//!
//! Built-in providers are all CPU based. Device backends implement
//! [`Backend`] and [`Executor`] in the host application and are added with
//! [`register_backend`].

mod context;
mod cpu;
pub mod registry;
mod traits;

pub use context::{ExecutionContext, Executor, UnitOfWork, Units};
pub use cpu::{CpuBackend, ParallelCpuBackend, SimdCapability, SimdCpuBackend};
pub use registry::{discover, refresh, register_backend, select, BackendRegistry};
pub use traits::{Backend, BackendDescriptor, Capabilities};

/// Category served by backends that evaluate tensor operations.
pub const CATEGORY_TENSOR: &str = "tensor";

/// Category for general numeric kernels.
pub const CATEGORY_MATH: &str = "math";
