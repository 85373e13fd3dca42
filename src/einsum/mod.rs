//! String-driven Einstein summation over any semiring.
//!
//! This module provides the parsed [`EinsumSpec`], the bound plan [`Einsum`]
//! and the one-shot entry points [`einsum`] and [`einsum_in`].

mod builder;
mod engine;
mod spec;
mod vector;

pub use builder::EinBuilder;
pub use engine::Einsum;
pub use spec::EinsumSpec;

use std::sync::OnceLock;

use crate::algebra::{Scalar, Semiring};
use crate::backend::{registry, Backend, CpuBackend, ExecutionContext, CATEGORY_TENSOR};
use crate::config::EvalConfig;
use crate::error::Result;
use crate::tensor::Tensor;

static EVAL_CONFIG: OnceLock<EvalConfig> = OnceLock::new();

/// Evaluation settings read once from the environment.
pub(crate) fn eval_config() -> &'static EvalConfig {
    EVAL_CONFIG.get_or_init(EvalConfig::from_env)
}

/// One-shot einsum on the best available backend.
///
/// Validates `spec` against the operand shapes, selects a `tensor` backend
/// from the global registry, evaluates in a fresh context and releases the
/// context before returning, whether or not evaluation succeeded.
///
/// # Example
///
/// ```rust
/// use einsum_core::{einsum, Tensor};
/// use einsum_core::algebra::{MinPlus, Standard};
///
/// let a = Tensor::from_data(vec![1.0, 2.0, 3.0, 4.0], &[2, 2]).unwrap();
/// let b = Tensor::from_data(vec![2.0, 0.0, 1.0, 2.0], &[2, 2]).unwrap();
///
/// // C[i,k] = Σ_j A[i,j] × B[j,k]
/// let c = einsum::<Standard<f64>>("ij,jk->ik", &[&a, &b]).unwrap();
/// assert_eq!(c.to_vec(), vec![4.0, 4.0, 10.0, 8.0]);
///
/// // C[i,k] = min_j (A[i,j] + B[j,k])
/// let d = einsum::<MinPlus<f64>>("ij,jk->ik", &[&a, &b]).unwrap();
/// assert_eq!(d.to_vec(), vec![3.0, 1.0, 5.0, 3.0]);
/// ```
pub fn einsum<A: Semiring>(
    spec: &str,
    operands: &[&Tensor<A::Scalar>],
) -> Result<Tensor<A::Scalar>> {
    let plan = plan(spec, operands)?;

    let backend = registry::select(CATEGORY_TENSOR);
    let mut ctx = match backend.create_context() {
        Ok(ctx) => ctx,
        Err(err) => {
            tracing::warn!(
                backend = backend.id(),
                error = %err,
                "could not open context, using the cpu backend"
            );
            CpuBackend::new().create_context()?
        }
    };
    tracing::debug!(spec = %plan, backend = ctx.backend_id(), "evaluating einsum");

    let result = plan.execute::<A>(&mut ctx, operands);
    let released = ctx.close();
    let output = result?;
    released?;
    Ok(output)
}

/// Einsum on a caller-owned context.
///
/// Useful for evaluating many expressions on one context. The context is
/// left open.
pub fn einsum_in<A: Semiring>(
    ctx: &mut ExecutionContext,
    spec: &str,
    operands: &[&Tensor<A::Scalar>],
) -> Result<Tensor<A::Scalar>> {
    plan(spec, operands)?.execute::<A>(ctx, operands)
}

fn plan<T: Scalar>(spec: &str, operands: &[&Tensor<T>]) -> Result<Einsum> {
    let spec = EinsumSpec::parse(spec)?;
    let shapes: Vec<&[usize]> = operands.iter().map(|t| t.shape()).collect();
    Einsum::bind(&spec, &shapes)
}
