//! Scoped execution contexts and the units of work they run.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::error::{BoxError, Error, Result};

/// A batch of independent units, addressed `0..units()`.
///
/// Units may run concurrently and in any order, so implementations must only
/// touch state that is disjoint per unit or synchronised.
pub trait UnitOfWork: Sync {
    fn units(&self) -> usize;

    fn run_unit(&self, unit: usize) -> std::result::Result<(), BoxError>;
}

/// Adapts a closure into a [`UnitOfWork`].
///
/// ```rust
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use einsum_core::backend::{Backend, CpuBackend, Units};
///
/// let hits = AtomicUsize::new(0);
/// let mut ctx = CpuBackend::new().create_context().unwrap();
/// ctx.run(&Units::new(4, |_| {
///     hits.fetch_add(1, Ordering::Relaxed);
///     Ok(())
/// }))
/// .unwrap();
/// assert_eq!(hits.load(Ordering::Relaxed), 4);
/// ```
pub struct Units<F> {
    count: usize,
    f: F,
}

impl<F> Units<F>
where
    F: Fn(usize) -> std::result::Result<(), BoxError> + Sync,
{
    pub fn new(count: usize, f: F) -> Self {
        Self { count, f }
    }
}

impl<F> UnitOfWork for Units<F>
where
    F: Fn(usize) -> std::result::Result<(), BoxError> + Sync,
{
    fn units(&self) -> usize {
        self.count
    }

    fn run_unit(&self, unit: usize) -> std::result::Result<(), BoxError> {
        (self.f)(unit)
    }
}

/// Backend-owned resources behind an [`ExecutionContext`].
///
/// Implemented by providers; callers only ever see the context wrapper.
pub trait Executor: Send {
    /// Number of units that may run at once.
    fn parallelism(&self) -> usize {
        1
    }

    /// Independent accumulators the inner reduction may keep.
    fn vector_lanes(&self) -> usize {
        1
    }

    /// Run every unit of `work`, returning the first failure.
    fn execute(&mut self, work: &dyn UnitOfWork) -> std::result::Result<(), BoxError>;

    /// Free the resources. Called exactly once.
    fn release(&mut self) -> std::result::Result<(), BoxError> {
        Ok(())
    }
}

/// Exclusive handle on one backend's execution resources.
///
/// Obtained from [`Backend::create_context`](super::Backend::create_context).
/// Resources are released by [`close`](Self::close) or, failing that, when the
/// context is dropped.
pub struct ExecutionContext {
    backend_id: String,
    executor: Option<Box<dyn Executor>>,
}

impl ExecutionContext {
    pub(crate) fn new(backend_id: String, executor: Box<dyn Executor>) -> Self {
        Self {
            backend_id,
            executor: Some(executor),
        }
    }

    /// Id of the backend that opened this context.
    pub fn backend_id(&self) -> &str {
        &self.backend_id
    }

    pub fn is_closed(&self) -> bool {
        self.executor.is_none()
    }

    /// Units the backend runs concurrently (1 once closed).
    pub fn parallelism(&self) -> usize {
        self.executor
            .as_ref()
            .map_or(1, |e| e.parallelism().max(1))
    }

    /// Lane count for split accumulation (1 once closed).
    pub fn vector_lanes(&self) -> usize {
        self.executor
            .as_ref()
            .map_or(1, |e| e.vector_lanes().max(1))
    }

    /// Execute all units of `work`.
    ///
    /// A failing or panicking unit becomes [`Error::OperationFailed`]; the
    /// context stays open and can run further work. Fails with
    /// [`Error::ContextClosed`] after [`close`](Self::close).
    pub fn run(&mut self, work: &dyn UnitOfWork) -> Result<()> {
        let executor = self
            .executor
            .as_mut()
            .ok_or_else(|| Error::ContextClosed(self.backend_id.clone()))?;

        tracing::trace!(backend = %self.backend_id, units = work.units(), "running work");
        match catch_unwind(AssertUnwindSafe(|| executor.execute(work))) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(cause)) => Err(Error::failed(&self.backend_id, cause)),
            Err(payload) => Err(Error::failed(&self.backend_id, panic_message(payload))),
        }
    }

    /// Release the backend resources. Closing twice is a no-op.
    pub fn close(&mut self) -> Result<()> {
        let Some(mut executor) = self.executor.take() else {
            return Ok(());
        };
        tracing::debug!(backend = %self.backend_id, "releasing execution context");
        match catch_unwind(AssertUnwindSafe(|| executor.release())) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(cause)) => Err(Error::failed(&self.backend_id, cause)),
            Err(payload) => Err(Error::failed(&self.backend_id, panic_message(payload))),
        }
    }
}

impl Drop for ExecutionContext {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            tracing::warn!(backend = %self.backend_id, error = %err, "release on drop failed");
        }
    }
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("backend_id", &self.backend_id)
            .field("closed", &self.is_closed())
            .finish()
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("unit of work panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("unit of work panicked: {}", s)
    } else {
        "unit of work panicked".to_string()
    }
}
