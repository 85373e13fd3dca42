//! Vectorised reduction of contiguous runs.
//!
//! When the innermost contracted label has unit stride in every operand, the
//! inner sum is a ⊕-fold over aligned slices. `Standard<f32>` and
//! `Standard<f64>` dot products go to AVX2+FMA or NEON intrinsics; every
//! other semiring keeps [`LANES`] independent accumulators over
//! `chunks_exact`, which the compiler lowers to vector instructions.

use std::any::TypeId;

use crate::algebra::{Semiring, Standard};
use crate::backend::SimdCapability;

/// Accumulators per run in the portable path.
pub(super) const LANES: usize = 8;

/// ⊕ over `t` of `rows[0][t] ⊗ rows[1][t] ⊗ ...`. All rows have equal length.
pub(super) fn reduce_run<A: Semiring>(rows: &[&[A::Scalar]]) -> A {
    if let [a, b] = rows {
        if TypeId::of::<A>() == TypeId::of::<Standard<f32>>() {
            // SAFETY: A::Scalar is f32 when A is Standard<f32>
            return unsafe {
                let (a, b) = (cast::<A::Scalar, f32>(a), cast::<A::Scalar, f32>(b));
                wrap(dot_f32(a, b))
            };
        }
        if TypeId::of::<A>() == TypeId::of::<Standard<f64>>() {
            // SAFETY: A::Scalar is f64 when A is Standard<f64>
            return unsafe {
                let (a, b) = (cast::<A::Scalar, f64>(a), cast::<A::Scalar, f64>(b));
                wrap(dot_f64(a, b))
            };
        }
        return binary_lanes::<A>(a, b);
    }
    nary_lanes::<A>(rows)
}

/// # Safety
/// `U` must be the same type as `T`.
unsafe fn cast<T, U>(s: &[T]) -> &[U] {
    std::slice::from_raw_parts(s.as_ptr().cast::<U>(), s.len())
}

/// # Safety
/// `U` must be the same type as `A::Scalar`.
unsafe fn wrap<U: Copy, A: Semiring>(v: U) -> A {
    A::from_scalar(std::mem::transmute_copy(&v))
}

fn binary_lanes<A: Semiring>(a: &[A::Scalar], b: &[A::Scalar]) -> A {
    let mut acc = [A::zero(); LANES];
    let a_chunks = a.chunks_exact(LANES);
    let b_chunks = b.chunks_exact(LANES);
    let (a_tail, b_tail) = (a_chunks.remainder(), b_chunks.remainder());

    for (ca, cb) in a_chunks.zip(b_chunks) {
        for l in 0..LANES {
            acc[l] = acc[l].add(A::from_scalar(ca[l]).mul(A::from_scalar(cb[l])));
        }
    }

    let mut sum = fold_lanes(acc);
    for (&x, &y) in a_tail.iter().zip(b_tail) {
        sum = sum.add(A::from_scalar(x).mul(A::from_scalar(y)));
    }
    sum
}

fn nary_lanes<A: Semiring>(rows: &[&[A::Scalar]]) -> A {
    let len = rows.first().map_or(0, |r| r.len());
    let product = |t: usize| {
        rows.iter()
            .fold(A::one(), |p, row| p.mul(A::from_scalar(row[t])))
    };

    let mut acc = [A::zero(); LANES];
    let full = len - len % LANES;
    for base in (0..full).step_by(LANES) {
        for (l, slot) in acc.iter_mut().enumerate() {
            *slot = slot.add(product(base + l));
        }
    }

    let mut sum = fold_lanes(acc);
    for t in full..len {
        sum = sum.add(product(t));
    }
    sum
}

fn fold_lanes<A: Semiring>(acc: [A; LANES]) -> A {
    acc[1..].iter().fold(acc[0], |sum, &part| sum.add(part))
}

fn dot_f32(a: &[f32], b: &[f32]) -> f32 {
    #[cfg(target_arch = "x86_64")]
    {
        let cap = SimdCapability::detect();
        if cap.avx2 && cap.fma {
            // SAFETY: AVX2 and FMA were detected at runtime
            return unsafe { dot_f32_avx2(a, b) };
        }
    }
    #[cfg(target_arch = "aarch64")]
    {
        if SimdCapability::detect().neon {
            // SAFETY: NEON was detected at runtime
            return unsafe { dot_f32_neon(a, b) };
        }
    }
    binary_lanes::<Standard<f32>>(a, b).0
}

fn dot_f64(a: &[f64], b: &[f64]) -> f64 {
    #[cfg(target_arch = "x86_64")]
    {
        let cap = SimdCapability::detect();
        if cap.avx2 && cap.fma {
            // SAFETY: AVX2 and FMA were detected at runtime
            return unsafe { dot_f64_avx2(a, b) };
        }
    }
    #[cfg(target_arch = "aarch64")]
    {
        if SimdCapability::detect().neon {
            // SAFETY: NEON was detected at runtime
            return unsafe { dot_f64_neon(a, b) };
        }
    }
    binary_lanes::<Standard<f64>>(a, b).0
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2,fma")]
unsafe fn dot_f32_avx2(a: &[f32], b: &[f32]) -> f32 {
    use std::arch::x86_64::*;

    let n = a.len().min(b.len());
    let mut acc = _mm256_setzero_ps();
    let mut i = 0;
    while i + 8 <= n {
        let va = _mm256_loadu_ps(a.as_ptr().add(i));
        let vb = _mm256_loadu_ps(b.as_ptr().add(i));
        acc = _mm256_fmadd_ps(va, vb, acc);
        i += 8;
    }

    let mut lanes = [0.0f32; 8];
    _mm256_storeu_ps(lanes.as_mut_ptr(), acc);
    let mut sum: f32 = lanes.iter().sum();

    // Scalar tail
    while i < n {
        sum += a[i] * b[i];
        i += 1;
    }
    sum
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2,fma")]
unsafe fn dot_f64_avx2(a: &[f64], b: &[f64]) -> f64 {
    use std::arch::x86_64::*;

    let n = a.len().min(b.len());
    let mut acc = _mm256_setzero_pd();
    let mut i = 0;
    while i + 4 <= n {
        let va = _mm256_loadu_pd(a.as_ptr().add(i));
        let vb = _mm256_loadu_pd(b.as_ptr().add(i));
        acc = _mm256_fmadd_pd(va, vb, acc);
        i += 4;
    }

    let mut lanes = [0.0f64; 4];
    _mm256_storeu_pd(lanes.as_mut_ptr(), acc);
    let mut sum: f64 = lanes.iter().sum();

    while i < n {
        sum += a[i] * b[i];
        i += 1;
    }
    sum
}

#[cfg(target_arch = "aarch64")]
#[target_feature(enable = "neon")]
unsafe fn dot_f32_neon(a: &[f32], b: &[f32]) -> f32 {
    use std::arch::aarch64::*;

    let n = a.len().min(b.len());
    let mut acc = vdupq_n_f32(0.0);
    let mut i = 0;
    while i + 4 <= n {
        acc = vfmaq_f32(acc, vld1q_f32(a.as_ptr().add(i)), vld1q_f32(b.as_ptr().add(i)));
        i += 4;
    }

    let mut sum = vaddvq_f32(acc);
    while i < n {
        sum += a[i] * b[i];
        i += 1;
    }
    sum
}

#[cfg(target_arch = "aarch64")]
#[target_feature(enable = "neon")]
unsafe fn dot_f64_neon(a: &[f64], b: &[f64]) -> f64 {
    use std::arch::aarch64::*;

    let n = a.len().min(b.len());
    let mut acc = vdupq_n_f64(0.0);
    let mut i = 0;
    while i + 2 <= n {
        acc = vfmaq_f64(acc, vld1q_f64(a.as_ptr().add(i)), vld1q_f64(b.as_ptr().add(i)));
        i += 2;
    }

    let mut sum = vaddvq_f64(acc);
    while i < n {
        sum += a[i] * b[i];
        i += 1;
    }
    sum
}

#[cfg(test)]
mod tests {
    use super::*;

    fn naive_dot(a: &[f64], b: &[f64]) -> f64 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn test_dot_f64_every_tail_length() {
        for n in 1..=37 {
            let a: Vec<f64> = (0..n).map(|i| i as f64 * 0.5 - 3.0).collect();
            let b: Vec<f64> = (0..n).map(|i| (i % 5) as f64).collect();
            let got: Standard<f64> = reduce_run(&[&a[..], &b[..]]);
            assert!((got.0 - naive_dot(&a, &b)).abs() < 1e-9, "n = {n}");
        }
    }

    #[test]
    fn test_dot_f32_matches_portable_lanes() {
        // Small integers are exact in f32 whatever the summation order
        let a: Vec<f32> = (0..101).map(|i| (i % 7) as f32).collect();
        let b: Vec<f32> = (0..101).map(|i| (i % 3) as f32).collect();
        let fast: Standard<f32> = reduce_run(&[&a[..], &b[..]]);
        let portable = binary_lanes::<Standard<f32>>(&a, &b);
        assert_eq!(fast, portable);
    }

    #[test]
    fn test_integer_runs_are_exact() {
        let a: Vec<i64> = (1..=30).collect();
        let expected: i64 = (1..=30).map(|v| v * v * v).sum();
        let got: Standard<i64> = reduce_run(&[&a[..], &a[..], &a[..]]);
        assert_eq!(got.0, expected);

        let single: Standard<i64> = reduce_run(&[&a[..]]);
        assert_eq!(single.0, 465);
    }

    #[cfg(feature = "tropical")]
    #[test]
    fn test_tropical_runs() {
        use crate::algebra::{MaxPlus, MinPlus};

        let a: Vec<f32> = (0..19).map(|i| (i * 7 % 11) as f32).collect();
        let b: Vec<f32> = (0..19).map(|i| (i * 3 % 5) as f32).collect();
        let sums: Vec<f32> = a.iter().zip(&b).map(|(x, y)| x + y).collect();

        let max: MaxPlus<f32> = reduce_run(&[&a[..], &b[..]]);
        let min: MinPlus<f32> = reduce_run(&[&a[..], &b[..]]);
        assert_eq!(max.0, sums.iter().cloned().fold(f32::NEG_INFINITY, f32::max));
        assert_eq!(min.0, sums.iter().cloned().fold(f32::INFINITY, f32::min));
    }
}
