//! Einsum planning and execution.
//!
//! Every contraction runs through one algorithm: for each output coordinate,
//! walk the contracted index space, multiply the addressed operand elements
//! with ⊗ and accumulate with ⊕. Repeated labels within an operand share one
//! index, which gives traces and diagonals without special cases.
//!
//! Vector contexts fold a contiguous innermost label slice by slice through
//! the `vector` module.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

use parking_lot::Mutex;

use super::spec::EinsumSpec;
use super::vector;
use crate::algebra::{Scalar, Semiring};
use crate::backend::{ExecutionContext, UnitOfWork};
use crate::config::EvalConfig;
use crate::error::{BoxError, Error, Result};
use crate::tensor::{compute_contiguous_strides, Tensor};

/// Upper bound on split accumulators per output element.
const MAX_LANES: usize = 16;

/// An einsum specification bound to concrete label extents.
///
/// Binding performs all validation, so executing a plan only fails on
/// backend faults or on operands whose shapes differ from the bound ones.
///
/// # Example
///
/// ```rust
/// use einsum_core::algebra::Standard;
/// use einsum_core::backend::{Backend, CpuBackend};
/// use einsum_core::{Einsum, EinsumSpec, Tensor};
///
/// let a = Tensor::from_data(vec![1.0, 2.0, 3.0, 4.0], &[2, 2]).unwrap();
/// let b = Tensor::from_data(vec![2.0, 0.0, 1.0, 2.0], &[2, 2]).unwrap();
///
/// let spec: EinsumSpec = "ij,jk->ik".parse().unwrap();
/// let plan = Einsum::bind(&spec, &[a.shape(), b.shape()]).unwrap();
/// assert_eq!(plan.output_shape(), vec![2, 2]);
/// assert_eq!(plan.contracted_labels(), &['j']);
///
/// let mut ctx = CpuBackend::new().create_context().unwrap();
/// let c = plan.execute::<Standard<f64>>(&mut ctx, &[&a, &b]).unwrap();
/// assert_eq!(c.to_vec(), vec![4.0, 4.0, 10.0, 8.0]);
/// ```
#[derive(Debug, Clone)]
pub struct Einsum {
    spec: EinsumSpec,
    size_dict: HashMap<char, usize>,
    contracted: Vec<char>,
}

impl Einsum {
    /// Bind `spec` to the shapes of its operands.
    ///
    /// Checks, in order: operand count and ranks ([`Error::ShapeMismatch`]),
    /// consistent label extents ([`Error::DimensionMismatch`], the first
    /// occurrence of a label fixes its extent) and output labels
    /// ([`Error::UnboundOutputSymbol`]).
    pub fn bind(spec: &EinsumSpec, shapes: &[&[usize]]) -> Result<Self> {
        check_arity(spec, shapes)?;

        let mut size_dict = HashMap::new();
        for (operand, (labels, shape)) in spec.inputs().iter().zip(shapes).enumerate() {
            for (axis, (&label, &extent)) in labels.iter().zip(shape.iter()).enumerate() {
                match size_dict.entry(label) {
                    Entry::Vacant(e) => {
                        e.insert(extent);
                    }
                    Entry::Occupied(e) if *e.get() != extent => {
                        return Err(Error::DimensionMismatch {
                            label,
                            expected: *e.get(),
                            found: extent,
                            operand,
                            axis,
                        });
                    }
                    Entry::Occupied(_) => {}
                }
            }
        }

        Self::from_parts(spec.clone(), size_dict)
    }

    /// Plan from explicit label extents, without operands.
    ///
    /// Every input label needs a positive extent; entries for labels that no
    /// input mentions are ignored.
    pub fn from_sizes(spec: EinsumSpec, mut size_dict: HashMap<char, usize>) -> Result<Self> {
        let labels = spec.labels();
        for label in &labels {
            match size_dict.get(label) {
                None => {
                    return Err(Error::shape(format!("no extent given for label '{}'", label)))
                }
                Some(0) => {
                    return Err(Error::shape(format!("label '{}' has zero extent", label)))
                }
                Some(_) => {}
            }
        }
        size_dict.retain(|label, _| labels.contains(label));
        Self::from_parts(spec, size_dict)
    }

    fn from_parts(spec: EinsumSpec, size_dict: HashMap<char, usize>) -> Result<Self> {
        if let Some(&missing) = spec.output().iter().find(|c| !size_dict.contains_key(*c)) {
            return Err(Error::UnboundOutputSymbol(missing));
        }
        let contracted = spec
            .labels()
            .into_iter()
            .filter(|c| !spec.output().contains(c))
            .collect();
        Ok(Self {
            spec,
            size_dict,
            contracted,
        })
    }

    // ========================================================================
    // Plan inspection
    // ========================================================================

    pub fn spec(&self) -> &EinsumSpec {
        &self.spec
    }

    /// Labels that survive into the output, in output order.
    pub fn free_labels(&self) -> &[char] {
        self.spec.output()
    }

    /// Labels summed away, in order of first appearance.
    pub fn contracted_labels(&self) -> &[char] {
        &self.contracted
    }

    /// Extent bound to each label.
    pub fn size_dict(&self) -> &HashMap<char, usize> {
        &self.size_dict
    }

    /// Shape of the result (empty for a scalar).
    pub fn output_shape(&self) -> Vec<usize> {
        self.extents(self.free_labels())
    }

    /// Shape the operand at `index` must have.
    pub fn operand_shape(&self, index: usize) -> Option<Vec<usize>> {
        self.spec.inputs().get(index).map(|labels| self.extents(labels))
    }

    /// Number of (free, contracted) assignments the evaluation visits.
    pub fn index_space(&self) -> usize {
        self.free_labels()
            .iter()
            .chain(&self.contracted)
            .map(|c| self.size_dict[c])
            .fold(1usize, usize::saturating_mul)
    }

    fn extents(&self, labels: &[char]) -> Vec<usize> {
        labels.iter().map(|c| self.size_dict[c]).collect()
    }

    // ========================================================================
    // Execution
    // ========================================================================

    /// Evaluate on `ctx` with the process-wide [`EvalConfig`].
    pub fn execute<A: Semiring>(
        &self,
        ctx: &mut ExecutionContext,
        operands: &[&Tensor<A::Scalar>],
    ) -> Result<Tensor<A::Scalar>> {
        self.execute_with::<A>(ctx, operands, super::eval_config())
    }

    /// Evaluate on `ctx` with an explicit work-splitting configuration.
    ///
    /// The output is returned only when every unit succeeded.
    pub fn execute_with<A: Semiring>(
        &self,
        ctx: &mut ExecutionContext,
        operands: &[&Tensor<A::Scalar>],
        config: &EvalConfig,
    ) -> Result<Tensor<A::Scalar>> {
        self.check_operands(operands)?;

        let out_shape = self.output_shape();
        let numel: usize = out_shape.iter().product();
        let kernel = Kernel::<A>::new(self, operands, ctx.vector_lanes());
        let chunk = chunk_len(numel, self.index_space(), ctx.parallelism(), config);

        let mut out = vec![A::zero().to_scalar(); numel];
        {
            let work = ContractionWork {
                kernel: &kernel,
                chunk,
                slots: out.chunks_mut(chunk).map(Mutex::new).collect(),
            };
            tracing::trace!(
                spec = %self.spec,
                backend = ctx.backend_id(),
                units = work.slots.len(),
                lanes = kernel.lanes,
                "executing einsum"
            );
            ctx.run(&work)?;
        }
        Ok(Tensor::from_parts(out, out_shape))
    }

    fn check_operands<T: Scalar>(&self, operands: &[&Tensor<T>]) -> Result<()> {
        let shapes: Vec<&[usize]> = operands.iter().map(|t| t.shape()).collect();
        check_arity(&self.spec, &shapes)?;
        for (operand, (labels, shape)) in self.spec.inputs().iter().zip(&shapes).enumerate() {
            for (axis, (label, &found)) in labels.iter().zip(shape.iter()).enumerate() {
                let expected = self.size_dict[label];
                if expected != found {
                    return Err(Error::DimensionMismatch {
                        label: *label,
                        expected,
                        found,
                        operand,
                        axis,
                    });
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for Einsum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.spec, f)
    }
}

fn check_arity(spec: &EinsumSpec, shapes: &[&[usize]]) -> Result<()> {
    if shapes.len() != spec.num_inputs() {
        return Err(Error::shape(format!(
            "'{}' names {} operands but {} were given",
            spec,
            spec.num_inputs(),
            shapes.len()
        )));
    }
    for (operand, (labels, shape)) in spec.inputs().iter().zip(shapes).enumerate() {
        if labels.len() != shape.len() {
            return Err(Error::shape(format!(
                "operand {} has rank {} but its labels {:?} name {} axes",
                operand,
                shape.len(),
                labels.iter().collect::<String>(),
                labels.len()
            )));
        }
    }
    Ok(())
}

/// Output elements per unit of work.
fn chunk_len(numel: usize, index_space: usize, parallelism: usize, config: &EvalConfig) -> usize {
    if parallelism <= 1 || index_space < config.parallel_threshold {
        return numel;
    }
    let chunks = parallelism.saturating_mul(config.chunks_per_worker.max(1));
    numel.div_ceil(chunks).max(1)
}

/// Precomputed addressing for one evaluation.
struct Kernel<'a, A: Semiring> {
    operands: Vec<&'a [A::Scalar]>,
    out_shape: Vec<usize>,
    inner_shape: Vec<usize>,
    inner_len: usize,
    /// `out_strides[d][k]`: offset step in operand `k` for free label `d`.
    out_strides: Vec<Vec<usize>>,
    inner_strides: Vec<Vec<usize>>,
    lanes: usize,
    /// Length of the contiguous innermost run, 0 when not vectorised.
    run: usize,
    _semiring: PhantomData<A>,
}

impl<'a, A: Semiring> Kernel<'a, A> {
    fn new(plan: &Einsum, operands: &[&'a Tensor<A::Scalar>], lanes: usize) -> Self {
        // A label's step in an operand is the sum of the strides of every
        // axis it labels, so repeated labels walk the diagonal.
        let operand_strides: Vec<Vec<usize>> = operands
            .iter()
            .map(|t| compute_contiguous_strides(t.shape()))
            .collect();
        let label_strides = |label: char| -> Vec<usize> {
            plan.spec
                .inputs()
                .iter()
                .zip(&operand_strides)
                .map(|(labels, strides)| {
                    labels
                        .iter()
                        .zip(strides)
                        .filter(|&(&l, _)| l == label)
                        .map(|(_, &s)| s)
                        .sum::<usize>()
                })
                .collect()
        };

        let inner_shape = plan.extents(&plan.contracted);
        let inner_strides: Vec<Vec<usize>> =
            plan.contracted.iter().map(|&c| label_strides(c)).collect();
        let lanes = lanes.clamp(1, MAX_LANES);

        // Vector contexts fold the innermost contracted label as contiguous
        // runs when it has unit stride in every operand.
        let run = match (inner_strides.last(), inner_shape.last()) {
            (Some(steps), Some(&extent)) if lanes > 1 && steps.iter().all(|&s| s == 1) => extent,
            _ => 0,
        };

        Self {
            operands: operands.iter().map(|t| t.as_slice()).collect(),
            out_shape: plan.output_shape(),
            inner_len: inner_shape.iter().product(),
            inner_shape,
            out_strides: plan.free_labels().iter().map(|&c| label_strides(c)).collect(),
            inner_strides,
            lanes,
            run,
            _semiring: PhantomData,
        }
    }

    /// Compute the output elements `start..start + out.len()`.
    fn fill(&self, start: usize, out: &mut [A::Scalar]) {
        let n_ops = self.operands.len();

        let mut out_idx = vec![0usize; self.out_shape.len()];
        let mut rem = start;
        for d in (0..self.out_shape.len()).rev() {
            out_idx[d] = rem % self.out_shape[d];
            rem /= self.out_shape[d];
        }
        let mut base = vec![0usize; n_ops];
        for (&i, steps) in out_idx.iter().zip(&self.out_strides) {
            for (b, &s) in base.iter_mut().zip(steps) {
                *b += i * s;
            }
        }

        let mut offsets = vec![0usize; n_ops];
        let mut inner_idx = vec![0usize; self.inner_shape.len()];
        let mut rows = Vec::with_capacity(n_ops);
        for slot in out.iter_mut() {
            let acc = if self.run > 0 {
                self.reduce_runs(&base, &mut offsets, &mut inner_idx, &mut rows)
            } else {
                self.reduce(&base, &mut offsets, &mut inner_idx)
            };
            *slot = acc.to_scalar();
            advance(&mut out_idx, &mut base, &self.out_shape, &self.out_strides);
        }
    }

    /// ⊕ over the contracted space of the ⊗-product of the operands.
    fn reduce(&self, base: &[usize], offsets: &mut [usize], idx: &mut [usize]) -> A {
        offsets.copy_from_slice(base);
        idx.fill(0);

        let mut acc = [A::zero(); MAX_LANES];
        let mut lane = 0;
        for _ in 0..self.inner_len {
            let mut prod = A::one();
            for (data, &o) in self.operands.iter().zip(offsets.iter()) {
                prod = prod.mul(A::from_scalar(data[o]));
            }
            acc[lane] = acc[lane].add(prod);
            lane += 1;
            if lane == self.lanes {
                lane = 0;
            }
            advance(idx, offsets, &self.inner_shape, &self.inner_strides);
        }

        acc[1..self.lanes].iter().fold(acc[0], |sum, &part| sum.add(part))
    }

    /// Same as [`reduce`](Self::reduce), with the innermost label folded by
    /// [`vector::reduce_run`] over contiguous slices.
    fn reduce_runs(
        &self,
        base: &[usize],
        offsets: &mut [usize],
        idx: &mut [usize],
        rows: &mut Vec<&'a [A::Scalar]>,
    ) -> A {
        offsets.copy_from_slice(base);
        idx.fill(0);

        let outer = self.inner_shape.len() - 1;
        let mut acc = A::zero();
        for _ in 0..self.inner_len / self.run {
            rows.clear();
            rows.extend(
                self.operands
                    .iter()
                    .zip(offsets.iter())
                    .map(|(&data, &o)| &data[o..o + self.run]),
            );
            acc = acc.add(vector::reduce_run::<A>(rows));
            advance(
                &mut idx[..outer],
                offsets,
                &self.inner_shape[..outer],
                &self.inner_strides[..outer],
            );
        }
        acc
    }
}

/// Step a row-major multi-index by one, keeping per-operand offsets in sync.
fn advance(idx: &mut [usize], offsets: &mut [usize], shape: &[usize], steps: &[Vec<usize>]) {
    for d in (0..shape.len()).rev() {
        idx[d] += 1;
        for (o, &s) in offsets.iter_mut().zip(&steps[d]) {
            *o += s;
        }
        if idx[d] < shape[d] {
            return;
        }
        for (o, &s) in offsets.iter_mut().zip(&steps[d]) {
            *o -= s * shape[d];
        }
        idx[d] = 0;
    }
}

/// The output buffer split into disjoint chunks, one per unit.
struct ContractionWork<'a, A: Semiring> {
    kernel: &'a Kernel<'a, A>,
    chunk: usize,
    slots: Vec<Mutex<&'a mut [A::Scalar]>>,
}

impl<A: Semiring> UnitOfWork for ContractionWork<'_, A> {
    fn units(&self) -> usize {
        self.slots.len()
    }

    fn run_unit(&self, unit: usize) -> std::result::Result<(), BoxError> {
        let slot = self
            .slots
            .get(unit)
            .ok_or_else(|| format!("unit {} out of range", unit))?;
        let mut out = slot.lock();
        self.kernel.fill(unit * self.chunk, &mut out);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::Standard;
    use crate::backend::{Backend, CpuBackend, ParallelCpuBackend};

    fn plan(spec: &str, shapes: &[&[usize]]) -> Result<Einsum> {
        Einsum::bind(&spec.parse()?, shapes)
    }

    #[test]
    fn test_plan_partition() {
        let p = plan("ij,jk->ik", &[&[2, 3], &[3, 4]]).unwrap();
        assert_eq!(p.free_labels(), &['i', 'k']);
        assert_eq!(p.contracted_labels(), &['j']);
        assert_eq!(p.output_shape(), vec![2, 4]);
        assert_eq!(p.index_space(), 24);
        assert_eq!(p.operand_shape(1), Some(vec![3, 4]));
        assert_eq!(p.to_string(), "ij,jk->ik");
    }

    #[test]
    fn test_bind_error_order() {
        // Count is checked before anything else
        let err = plan("ij,jk->ik", &[&[2, 3]]).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch(_)));

        // Rank before extents
        let err = plan("ij,jk->ik", &[&[2, 3], &[3]]).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch(_)));

        // Extents before unbound output
        let err = plan("ij,jk->iz", &[&[2, 3], &[4, 4]]).unwrap_err();
        assert!(matches!(
            err,
            Error::DimensionMismatch {
                label: 'j',
                expected: 3,
                found: 4,
                operand: 1,
                axis: 0
            }
        ));

        let err = plan("ij->ijk", &[&[2, 3]]).unwrap_err();
        assert!(matches!(err, Error::UnboundOutputSymbol('k')));
    }

    #[test]
    fn test_diagonal_extent_check() {
        let err = plan("ii->i", &[&[2, 3]]).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { label: 'i', .. }));
    }

    #[test]
    fn test_from_sizes() {
        let spec: EinsumSpec = "ij,jk->ik".parse().unwrap();
        let sizes: HashMap<char, usize> = [('i', 2), ('j', 3), ('k', 4), ('z', 9)].into();
        let p = Einsum::from_sizes(spec.clone(), sizes).unwrap();
        assert_eq!(p.output_shape(), vec![2, 4]);
        assert!(!p.size_dict().contains_key(&'z'));

        let missing: HashMap<char, usize> = [('i', 2), ('j', 3)].into();
        assert!(matches!(
            Einsum::from_sizes(spec, missing),
            Err(Error::ShapeMismatch(_))
        ));
    }

    #[test]
    fn test_chunk_len() {
        let config = EvalConfig::default();
        // Small index spaces stay in one unit
        assert_eq!(chunk_len(16, 64, 8, &config), 16);
        // Sequential contexts never split
        assert_eq!(chunk_len(10_000, 1_000_000, 1, &config), 10_000);
        // 4 workers × 4 chunks
        assert_eq!(chunk_len(1600, 1_000_000, 4, &config), 100);
        assert_eq!(chunk_len(3, 1_000_000, 4, &config), 1);
    }

    #[test]
    fn test_execute_rejects_wrong_operands() {
        let p = plan("ij->ji", &[&[2, 3]]).unwrap();
        let wrong = Tensor::from_data(vec![0.0f32; 6], &[3, 2]).unwrap();
        let mut ctx = CpuBackend::new().create_context().unwrap();
        let err = p.execute::<Standard<f32>>(&mut ctx, &[&wrong]).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { .. }));
    }

    #[test]
    fn test_split_work_matches_single_unit() {
        let n = 40;
        let a = Tensor::from_data((0..n * n).map(|v| v as i64 % 7).collect(), &[n, n]).unwrap();
        let b = Tensor::from_data((0..n * n).map(|v| v as i64 % 5).collect(), &[n, n]).unwrap();
        let p = plan("ij,jk->ik", &[a.shape(), b.shape()]).unwrap();

        let mut seq = CpuBackend::new().create_context().unwrap();
        let expected = p.execute::<Standard<i64>>(&mut seq, &[&a, &b]).unwrap();

        // Open directly so the split path runs even on single-core machines.
        let executor = ParallelCpuBackend::new(4).open_executor().unwrap();
        let mut par = ExecutionContext::new(ParallelCpuBackend::ID.to_string(), executor);
        let config = EvalConfig {
            parallel_threshold: 1,
            chunks_per_worker: 3,
        };
        let got = p.execute_with::<Standard<i64>>(&mut par, &[&a, &b], &config).unwrap();
        assert_eq!(got, expected);
    }

    #[test]
    fn test_lanes_do_not_change_integer_results() {
        let a = Tensor::from_data((1..=30).collect::<Vec<i32>>(), &[30]).unwrap();
        let p = plan("i,i->", &[a.shape(), a.shape()]).unwrap();
        let expected: i32 = (1..=30).map(|v| v * v).sum();
        for lanes in [1, 3, 4, 8, 64] {
            let kernel = Kernel::<Standard<i32>>::new(&p, &[&a, &a], lanes);
            let mut out = [0];
            kernel.fill(0, &mut out);
            assert_eq!(out[0], expected, "lanes = {lanes}");
        }
    }

    #[test]
    fn test_contiguous_run_detection() {
        let a = Tensor::from_data(vec![1i64; 12], &[3, 4]).unwrap();
        let b = Tensor::from_data(vec![1i64; 20], &[5, 4]).unwrap();
        let rows = plan("ik,jk->ij", &[a.shape(), b.shape()]).unwrap();
        assert_eq!(Kernel::<Standard<i64>>::new(&rows, &[&a, &b], 8).run, 4);
        // Sequential contexts keep the reference order
        assert_eq!(Kernel::<Standard<i64>>::new(&rows, &[&a, &b], 1).run, 0);

        // `j` strides by 4 in the right operand
        let c = Tensor::from_data(vec![1i64; 20], &[4, 5]).unwrap();
        let mm = plan("ij,jk->ik", &[a.shape(), c.shape()]).unwrap();
        assert_eq!(Kernel::<Standard<i64>>::new(&mm, &[&a, &c], 8).run, 0);

        // A diagonal steps by rows + 1
        let sq = Tensor::from_data(vec![1i64; 16], &[4, 4]).unwrap();
        let tr = plan("ii->", &[sq.shape()]).unwrap();
        assert_eq!(Kernel::<Standard<i64>>::new(&tr, &[&sq], 8).run, 0);
    }

    #[test]
    fn test_runs_match_reference_order() {
        let a = Tensor::from_data((0..60).map(|v| v % 7 - 3).collect::<Vec<i64>>(), &[3, 4, 5])
            .unwrap();
        let b = Tensor::from_data((0..60).map(|v| v % 4 - 1).collect::<Vec<i64>>(), &[3, 4, 5])
            .unwrap();
        for spec in ["ijk,ijk->i", "ijk,ijk->", "ijk,ijk->ij", "ijk,ljk->il"] {
            let p = plan(spec, &[a.shape(), b.shape()]).unwrap();
            let out_len = p.output_shape().iter().product::<usize>();

            let reference = Kernel::<Standard<i64>>::new(&p, &[&a, &b], 1);
            let vector = Kernel::<Standard<i64>>::new(&p, &[&a, &b], 8);
            assert!(vector.run > 0 || p.contracted_labels().is_empty(), "{spec}");

            let mut expected = vec![0; out_len];
            let mut got = vec![0; out_len];
            reference.fill(0, &mut expected);
            vector.fill(0, &mut got);
            assert_eq!(got, expected, "{spec}");
        }
    }
}
