//! Thread-pool CPU backend.

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::backend::context::{Executor, UnitOfWork};
use crate::backend::traits::{Backend, BackendDescriptor, Capabilities};
use crate::backend::{CATEGORY_MATH, CATEGORY_TENSOR};
use crate::config::hardware_threads;
use crate::error::{BoxError, Error, Result};

/// CPU backend that runs units on a rayon pool owned by each context.
///
/// Available when the machine exposes more than one hardware thread.
#[derive(Debug, Clone)]
pub struct ParallelCpuBackend {
    descriptor: BackendDescriptor,
    num_threads: usize,
}

impl ParallelCpuBackend {
    pub const ID: &'static str = "cpu-parallel";

    /// Backend whose contexts own `num_threads` workers (at least one).
    pub fn new(num_threads: usize) -> Self {
        Self {
            descriptor: BackendDescriptor::new(Self::ID, "CPU (thread pool)")
                .with_description("Output coordinates split across a rayon thread pool")
                .with_priority(10)
                .with_capabilities(Capabilities {
                    parallel: true,
                    floating_point: true,
                    complex: true,
                })
                .with_categories(&[CATEGORY_TENSOR, CATEGORY_MATH]),
            num_threads: num_threads.max(1),
        }
    }

    pub fn num_threads(&self) -> usize {
        self.num_threads
    }
}

impl Default for ParallelCpuBackend {
    fn default() -> Self {
        Self::new(hardware_threads())
    }
}

impl Backend for ParallelCpuBackend {
    fn descriptor(&self) -> &BackendDescriptor {
        &self.descriptor
    }

    fn is_available(&self) -> bool {
        hardware_threads() > 1
    }

    fn open_executor(&self) -> Result<Box<dyn Executor>> {
        let executor = PoolExecutor::new(&self.descriptor.id, self.num_threads, 1)?;
        Ok(Box::new(executor))
    }
}

/// Executor backed by a dedicated rayon pool.
pub(super) struct PoolExecutor {
    pool: Option<ThreadPool>,
    threads: usize,
    lanes: usize,
}

impl PoolExecutor {
    pub(super) fn new(backend_id: &str, threads: usize, lanes: usize) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("einsum-worker-{i}"))
            .build()
            .map_err(|e| Error::failed(backend_id, e))?;
        tracing::debug!(backend = backend_id, threads, lanes, "built worker pool");
        Ok(Self {
            pool: Some(pool),
            threads,
            lanes,
        })
    }
}

impl Executor for PoolExecutor {
    fn parallelism(&self) -> usize {
        self.threads
    }

    fn vector_lanes(&self) -> usize {
        self.lanes
    }

    fn execute(&mut self, work: &dyn UnitOfWork) -> std::result::Result<(), BoxError> {
        let pool = self.pool.as_ref().ok_or("worker pool already released")?;
        let units = work.units();
        if units <= 1 {
            return (0..units).try_for_each(|u| work.run_unit(u));
        }
        pool.install(|| (0..units).into_par_iter().try_for_each(|u| work.run_unit(u)))
    }

    fn release(&mut self) -> std::result::Result<(), BoxError> {
        // Dropping the pool joins nothing; workers exit once idle.
        self.pool = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Units;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_pool_runs_every_unit() {
        let backend = ParallelCpuBackend::new(3);
        // Bypass availability so the test also runs on single-core machines.
        let mut executor = backend.open_executor().unwrap();
        assert_eq!(executor.parallelism(), 3);

        let sum = AtomicUsize::new(0);
        let work = Units::new(100, |u| {
            sum.fetch_add(u, Ordering::Relaxed);
            Ok(())
        });
        executor.execute(&work).unwrap();
        assert_eq!(sum.load(Ordering::Relaxed), 99 * 100 / 2);
        executor.release().unwrap();
        assert!(executor.execute(&work).is_err());
    }

    #[test]
    fn test_pool_reports_failure() {
        let mut executor = ParallelCpuBackend::new(2).open_executor().unwrap();
        let err = executor
            .execute(&Units::new(50, |u| {
                if u == 17 {
                    Err("unit 17".into())
                } else {
                    Ok(())
                }
            }))
            .unwrap_err();
        assert_eq!(err.to_string(), "unit 17");
    }

    #[test]
    fn test_zero_threads_clamped() {
        assert_eq!(ParallelCpuBackend::new(0).num_threads(), 1);
    }
}
