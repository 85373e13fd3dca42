//! Vector-lane CPU backend with runtime SIMD detection.

use std::sync::OnceLock;

use super::parallel::PoolExecutor;
use crate::backend::context::Executor;
use crate::backend::traits::{Backend, BackendDescriptor, Capabilities};
use crate::backend::{CATEGORY_MATH, CATEGORY_TENSOR};
use crate::config::hardware_threads;
use crate::error::{Error, Result};

/// SIMD features detected on the running CPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimdCapability {
    pub avx2: bool,
    pub neon: bool,
    pub fma: bool,
}

static DETECTED: OnceLock<SimdCapability> = OnceLock::new();

impl SimdCapability {
    pub fn detect() -> &'static SimdCapability {
        DETECTED.get_or_init(|| {
            #[cfg(target_arch = "x86_64")]
            {
                SimdCapability {
                    avx2: is_x86_feature_detected!("avx2"),
                    neon: false,
                    fma: is_x86_feature_detected!("fma"),
                }
            }

            #[cfg(target_arch = "aarch64")]
            {
                SimdCapability {
                    avx2: false,
                    neon: std::arch::is_aarch64_feature_detected!("neon"),
                    fma: false,
                }
            }

            #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
            {
                SimdCapability {
                    avx2: false,
                    neon: false,
                    fma: false,
                }
            }
        })
    }

    /// 32-bit lanes per vector register, `None` without SIMD.
    pub fn lanes(&self) -> Option<usize> {
        if self.avx2 {
            Some(8)
        } else if self.neon {
            Some(4)
        } else {
            None
        }
    }
}

/// Thread pool backend whose inner sums keep one accumulator per lane.
///
/// When the innermost contracted label is contiguous in every operand, the
/// inner sum runs over slices: `f32`/`f64` dot products use AVX2+FMA or NEON
/// and other semirings use fixed-width lane arrays. Partial sums are folded
/// once per output element, so the accumulation order differs from
/// [`CpuBackend`](super::CpuBackend).
#[derive(Debug, Clone)]
pub struct SimdCpuBackend {
    descriptor: BackendDescriptor,
    num_threads: usize,
}

impl SimdCpuBackend {
    pub const ID: &'static str = "cpu-simd";

    pub fn new(num_threads: usize) -> Self {
        Self {
            descriptor: BackendDescriptor::new(Self::ID, "CPU (SIMD)")
                .with_description("Thread pool with lane-split accumulation (AVX2 / NEON)")
                .with_priority(20)
                .with_capabilities(Capabilities {
                    parallel: true,
                    floating_point: true,
                    complex: true,
                })
                .with_categories(&[CATEGORY_TENSOR, CATEGORY_MATH]),
            num_threads: num_threads.max(1),
        }
    }
}

impl Default for SimdCpuBackend {
    fn default() -> Self {
        Self::new(hardware_threads())
    }
}

impl Backend for SimdCpuBackend {
    fn descriptor(&self) -> &BackendDescriptor {
        &self.descriptor
    }

    fn is_available(&self) -> bool {
        SimdCapability::detect().lanes().is_some()
    }

    fn open_executor(&self) -> Result<Box<dyn Executor>> {
        let lanes = SimdCapability::detect()
            .lanes()
            .ok_or_else(|| Error::BackendUnavailable(self.descriptor.id.clone()))?;
        let executor = PoolExecutor::new(&self.descriptor.id, self.num_threads, lanes)?;
        Ok(Box::new(executor))
    }
}
