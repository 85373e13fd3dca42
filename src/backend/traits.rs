//! Backend trait definitions.

use super::context::{ExecutionContext, Executor};
use crate::error::{Error, Result};

/// Feature flags a backend advertises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Capabilities {
    /// Runs units concurrently.
    pub parallel: bool,
    pub floating_point: bool,
    pub complex: bool,
}

/// Static description of a backend.
///
/// # Example
///
/// ```rust
/// use einsum_core::backend::{BackendDescriptor, Capabilities};
///
/// let d = BackendDescriptor::new("opencl", "OpenCL")
///     .with_priority(30)
///     .with_capabilities(Capabilities { parallel: true, floating_point: true, complex: false })
///     .with_categories(&["tensor"]);
/// assert!(d.supports("tensor"));
/// assert!(!d.supports("math"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BackendDescriptor {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Higher wins; the CPU fallback is 0.
    pub priority: i32,
    pub capabilities: Capabilities,
    /// Operation families this backend serves.
    pub categories: Vec<String>,
}

impl BackendDescriptor {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            priority: 0,
            capabilities: Capabilities::default(),
            categories: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_categories(mut self, categories: &[&str]) -> Self {
        self.categories = categories.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn supports(&self, category: &str) -> bool {
        self.categories.iter().any(|c| c == category)
    }
}

/// A provider of execution contexts.
///
/// Implementations are registered with a
/// [`BackendRegistry`](super::BackendRegistry), which ranks them by priority
/// and probes availability lazily.
pub trait Backend: Send + Sync {
    fn descriptor(&self) -> &BackendDescriptor;

    /// Whether the environment can run this backend.
    ///
    /// Must not panic or block for long; a failed probe means `false`.
    fn is_available(&self) -> bool;

    /// Allocate the resources for one context.
    fn open_executor(&self) -> Result<Box<dyn Executor>>;

    /// Open an exclusive execution context.
    ///
    /// Fails with [`Error::BackendUnavailable`] when the backend is not
    /// available.
    fn create_context(&self) -> Result<ExecutionContext> {
        let id = &self.descriptor().id;
        if !self.is_available() {
            return Err(Error::BackendUnavailable(id.clone()));
        }
        let executor = self.open_executor()?;
        tracing::debug!(backend = %id, "opened execution context");
        Ok(ExecutionContext::new(id.clone(), executor))
    }

    fn id(&self) -> &str {
        &self.descriptor().id
    }

    fn priority(&self) -> i32 {
        self.descriptor().priority
    }

    fn supports(&self, category: &str) -> bool {
        self.descriptor().supports(category)
    }
}
