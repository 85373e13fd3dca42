//! Runtime configuration for backend selection and evaluation.
//!
//! Both configurations have sensible defaults and can be overridden from the
//! process environment:
//!
//! | Variable | Effect |
//! |----------|--------|
//! | `EINSUM_BACKEND` | Preferred backend id, used when available |
//! | `EINSUM_NUM_THREADS` | Worker threads per parallel context |
//! | `EINSUM_RECHECK_AVAILABILITY` | `1`/`true` re-probes availability on every selection |
//! | `EINSUM_PARALLEL_THRESHOLD` | Index-space size at which evaluation splits into chunks |
//!
//! Values that fail to parse are logged and ignored.

use std::str::FromStr;

/// Index-space or element count at which work is split across workers.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 1000;

/// Output chunks handed to each worker thread.
pub const DEFAULT_CHUNKS_PER_WORKER: usize = 4;

pub const ENV_BACKEND: &str = "EINSUM_BACKEND";
pub const ENV_NUM_THREADS: &str = "EINSUM_NUM_THREADS";
pub const ENV_RECHECK_AVAILABILITY: &str = "EINSUM_RECHECK_AVAILABILITY";
pub const ENV_PARALLEL_THRESHOLD: &str = "EINSUM_PARALLEL_THRESHOLD";

/// How often backend availability is probed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AvailabilityPolicy {
    /// Probe once per backend and remember the answer until `refresh`.
    #[default]
    Cached,
    /// Probe again on every selection.
    Recheck,
}

/// Configuration of a [`BackendRegistry`](crate::backend::BackendRegistry).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryConfig {
    pub availability: AvailabilityPolicy,
    /// Backend id tried before the priority order.
    pub preferred: Option<String>,
    /// Worker threads for pooled CPU contexts; `None` uses every core.
    pub num_threads: Option<usize>,
}

impl RegistryConfig {
    /// Defaults overridden by `EINSUM_*` environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(id) = env_string(ENV_BACKEND) {
            config.preferred = Some(id);
        }
        if let Some(n) = env_parse::<usize>(ENV_NUM_THREADS) {
            if n == 0 {
                tracing::warn!(var = ENV_NUM_THREADS, "ignoring zero thread count");
            } else {
                config.num_threads = Some(n);
            }
        }
        if let Some(recheck) = env_flag(ENV_RECHECK_AVAILABILITY) {
            config.availability = if recheck {
                AvailabilityPolicy::Recheck
            } else {
                AvailabilityPolicy::Cached
            };
        }
        config
    }

    pub fn with_preferred(mut self, id: impl Into<String>) -> Self {
        self.preferred = Some(id.into());
        self
    }

    pub fn with_availability(mut self, policy: AvailabilityPolicy) -> Self {
        self.availability = policy;
        self
    }

    pub fn with_num_threads(mut self, n: usize) -> Self {
        self.num_threads = Some(n.max(1));
        self
    }

    /// Thread count for a pooled context.
    pub fn worker_threads(&self) -> usize {
        self.num_threads.unwrap_or_else(hardware_threads)
    }
}

/// Tuning of how an einsum evaluation is split into units of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalConfig {
    /// Index spaces smaller than this run as a single unit.
    pub parallel_threshold: usize,
    pub chunks_per_worker: usize,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
            chunks_per_worker: DEFAULT_CHUNKS_PER_WORKER,
        }
    }
}

impl EvalConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(t) = env_parse::<usize>(ENV_PARALLEL_THRESHOLD) {
            config.parallel_threshold = t;
        }
        config
    }
}

/// Number of hardware threads, 1 when unknown.
pub fn hardware_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn env_string(var: &str) -> Option<String> {
    let value = std::env::var(var).ok()?;
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn env_parse<T: FromStr>(var: &str) -> Option<T> {
    let raw = env_string(var)?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(var, value = %raw, "ignoring unparseable environment value");
            None
        }
    }
}

fn env_flag(var: &str) -> Option<bool> {
    let raw = env_string(var)?;
    match parse_flag(&raw) {
        Some(b) => Some(b),
        None => {
            tracing::warn!(var, value = %raw, "ignoring unparseable boolean flag");
            None
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
