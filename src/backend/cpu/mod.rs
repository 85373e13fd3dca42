//! CPU backends.
//!
//! - [`CpuBackend`]: sequential, always available, the selection fallback
//! - [`ParallelCpuBackend`]: rayon thread pool per context
//! - [`SimdCpuBackend`]: thread pool plus lane-split inner accumulation

mod parallel;
mod simd;

pub use parallel::ParallelCpuBackend;
pub use simd::{SimdCapability, SimdCpuBackend};

use super::context::{Executor, UnitOfWork};
use super::traits::{Backend, BackendDescriptor, Capabilities};
use super::{CATEGORY_MATH, CATEGORY_TENSOR};
use crate::error::{BoxError, Result};

/// Scalar sequential CPU backend.
///
/// Priority 0 and always available, so selection can always fall back to it.
#[derive(Debug, Clone)]
pub struct CpuBackend {
    descriptor: BackendDescriptor,
}

impl CpuBackend {
    pub const ID: &'static str = "cpu";

    pub fn new() -> Self {
        Self {
            descriptor: BackendDescriptor::new(Self::ID, "CPU")
                .with_description("Sequential scalar execution on the calling thread")
                .with_priority(0)
                .with_capabilities(Capabilities {
                    parallel: false,
                    floating_point: true,
                    complex: true,
                })
                .with_categories(&[CATEGORY_TENSOR, CATEGORY_MATH]),
        }
    }
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for CpuBackend {
    fn descriptor(&self) -> &BackendDescriptor {
        &self.descriptor
    }

    fn is_available(&self) -> bool {
        true
    }

    fn open_executor(&self) -> Result<Box<dyn Executor>> {
        Ok(Box::new(SequentialExecutor))
    }
}

/// Runs units one after another on the calling thread.
struct SequentialExecutor;

impl Executor for SequentialExecutor {
    fn execute(&mut self, work: &dyn UnitOfWork) -> std::result::Result<(), BoxError> {
        for unit in 0..work.units() {
            work.run_unit(unit)?;
        }
        Ok(())
    }
}
