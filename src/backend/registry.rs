//! Backend discovery and selection.
//!
//! Providers are registered explicitly. `discover` ranks the providers of a
//! category once and caches the list; availability is probed lazily and, by
//! default, remembered. Both caches survive until [`BackendRegistry::refresh`].

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, OnceLock};

use parking_lot::{Mutex, RwLock};

use super::cpu::{CpuBackend, ParallelCpuBackend, SimdCpuBackend};
use super::traits::Backend;
use crate::config::{AvailabilityPolicy, RegistryConfig};

/// A set of backend providers with cached discovery.
///
/// # Example
///
/// ```rust
/// use einsum_core::backend::{BackendRegistry, CATEGORY_TENSOR};
/// use einsum_core::config::RegistryConfig;
///
/// let registry = BackendRegistry::with_defaults(RegistryConfig::default());
/// let ranked = registry.discover(CATEGORY_TENSOR);
/// assert!(ranked.iter().any(|b| b.id() == "cpu"));
///
/// // Never fails: the CPU backend is the floor.
/// let backend = registry.select(CATEGORY_TENSOR);
/// assert!(backend.is_available());
/// ```
pub struct BackendRegistry {
    config: RegistryConfig,
    providers: RwLock<Vec<Arc<dyn Backend>>>,
    discovered: RwLock<HashMap<String, Vec<Arc<dyn Backend>>>>,
    availability: Mutex<HashMap<String, bool>>,
    fallback: Arc<dyn Backend>,
}

impl BackendRegistry {
    /// An empty registry. Selection still falls back to [`CpuBackend`].
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            config,
            providers: RwLock::new(Vec::new()),
            discovered: RwLock::new(HashMap::new()),
            availability: Mutex::new(HashMap::new()),
            fallback: Arc::new(CpuBackend::new()),
        }
    }

    /// A registry holding the built-in CPU providers.
    pub fn with_defaults(config: RegistryConfig) -> Self {
        let threads = config.worker_threads();
        let registry = Self::new(config);
        registry.register(Arc::new(CpuBackend::new()));
        registry.register(Arc::new(ParallelCpuBackend::new(threads)));
        registry.register(Arc::new(SimdCpuBackend::new(threads)));
        registry
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Add a provider.
    ///
    /// Lists already cached by [`discover`](Self::discover) are not updated
    /// until [`refresh`](Self::refresh).
    pub fn register(&self, backend: Arc<dyn Backend>) {
        tracing::debug!(
            backend = backend.id(),
            priority = backend.priority(),
            "registered backend"
        );
        self.providers.write().push(backend);
    }

    /// Ids of every registered provider, in registration order.
    pub fn backend_ids(&self) -> Vec<String> {
        self.providers
            .read()
            .iter()
            .map(|b| b.id().to_string())
            .collect()
    }

    /// Providers serving `category`, highest priority first.
    ///
    /// Ties keep registration order. The first call per category scans the
    /// providers; later calls return the cached list.
    pub fn discover(&self, category: &str) -> Vec<Arc<dyn Backend>> {
        if let Some(cached) = self.discovered.read().get(category) {
            return cached.clone();
        }

        let mut discovered = self.discovered.write();
        let ranked = discovered.entry(category.to_string()).or_insert_with(|| {
            let mut ranked: Vec<Arc<dyn Backend>> = self
                .providers
                .read()
                .iter()
                .filter(|b| b.supports(category))
                .cloned()
                .collect();
            ranked.sort_by_key(|b| std::cmp::Reverse(b.priority()));
            tracing::debug!(
                category,
                backends = ?ranked.iter().map(|b| b.id()).collect::<Vec<_>>(),
                "discovered backends"
            );
            ranked
        });
        ranked.clone()
    }

    /// The best available provider for `category`.
    ///
    /// Tries the configured preferred backend, then the discovered providers
    /// by priority, and finally the CPU fallback. Never fails.
    pub fn select(&self, category: &str) -> Arc<dyn Backend> {
        let ranked = self.discover(category);

        if let Some(preferred) = self.config.preferred.as_deref() {
            match ranked.iter().find(|b| b.id() == preferred) {
                Some(b) if self.check_available(b.as_ref()) => {
                    tracing::debug!(category, backend = preferred, "selected preferred backend");
                    return b.clone();
                }
                Some(_) => {
                    tracing::warn!(category, backend = preferred, "preferred backend unavailable");
                }
                None => {
                    tracing::warn!(category, backend = preferred, "preferred backend not registered");
                }
            }
        }

        for backend in &ranked {
            if self.check_available(backend.as_ref()) {
                tracing::debug!(category, backend = backend.id(), "selected backend");
                return backend.clone();
            }
            tracing::debug!(category, backend = backend.id(), "skipping unavailable backend");
        }

        tracing::warn!(
            category,
            fallback = self.fallback.id(),
            "no available backend, falling back"
        );
        self.fallback.clone()
    }

    /// Forget discovered lists and availability answers.
    pub fn refresh(&self) {
        self.discovered.write().clear();
        self.availability.lock().clear();
        tracing::debug!("backend caches cleared");
    }

    fn check_available(&self, backend: &dyn Backend) -> bool {
        match self.config.availability {
            AvailabilityPolicy::Recheck => probe(backend),
            AvailabilityPolicy::Cached => {
                if let Some(&known) = self.availability.lock().get(backend.id()) {
                    return known;
                }
                // Probe without holding the lock.
                let available = probe(backend);
                self.availability
                    .lock()
                    .insert(backend.id().to_string(), available);
                available
            }
        }
    }
}

impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("config", &self.config)
            .field("backends", &self.backend_ids())
            .finish()
    }
}

/// Availability of `backend`, treating a panicking probe as unavailable.
fn probe(backend: &dyn Backend) -> bool {
    match catch_unwind(AssertUnwindSafe(|| backend.is_available())) {
        Ok(available) => {
            tracing::trace!(backend = backend.id(), available, "probed availability");
            available
        }
        Err(_) => {
            tracing::warn!(backend = backend.id(), "availability probe panicked");
            false
        }
    }
}

static GLOBAL_REGISTRY: OnceLock<BackendRegistry> = OnceLock::new();

/// The process-wide registry, created on first use from
/// [`RegistryConfig::from_env`] with the built-in providers.
pub fn global() -> &'static BackendRegistry {
    GLOBAL_REGISTRY.get_or_init(|| BackendRegistry::with_defaults(RegistryConfig::from_env()))
}

pub fn register_backend(backend: Arc<dyn Backend>) {
    global().register(backend);
}

pub fn discover(category: &str) -> Vec<Arc<dyn Backend>> {
    global().discover(category)
}

pub fn select(category: &str) -> Arc<dyn Backend> {
    global().select(category)
}

pub fn refresh() {
    global().refresh();
}
