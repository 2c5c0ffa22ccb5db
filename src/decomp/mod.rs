//! Orthogonal decompositions and reductions.
//!
//! | Type | Result | Built from |
//! |------|--------|------------|
//! | [`QrDecomp`] | `A P = Q R` | dense matrix, optional column pivoting |
//! | [`CoDecomp`] | `A P = Q [T 0; 0 0] Zᴴ` | dense matrix or a [`QrDecomp`] |
//! | [`BalanceDecomp`] | `A = B A' B⁻¹` | dense matrix |
//! | [`HessenbergDecomp`] | `A = B Q H Qᵀ B⁻¹` | dense matrix or a [`BalanceDecomp`] |
//! | [`SchurDecomp`] | `A = B Z T Zᵀ B⁻¹` | dense matrix, [`BalanceDecomp`] or [`HessenbergDecomp`] |
//! | [`DenseTriDiagDecomp`] | `A = Q T Qᴴ`, `T` real tridiagonal | [`HermMatrix`](crate::HermMatrix) / [`SymMatrix`](crate::SymMatrix) |
//! | [`BandTriDiagDecomp`] | same, from banded storage | [`HermBandMatrix`](crate::HermBandMatrix) / [`SymBandMatrix`](crate::SymBandMatrix) |
//!
//! A higher-level decomposition built from a lower-level one takes it by
//! value and keeps working on its data.

mod balance;
mod co;
mod hessenberg;
mod qr;
mod schur;
mod tridiag;

pub use balance::BalanceDecomp;
pub use co::CoDecomp;
pub use hessenberg::HessenbergDecomp;
pub use qr::QrDecomp;
pub use schur::SchurDecomp;
pub use tridiag::{
    BandTriDiagDecomp, DenseTriDiagDecomp, DiscardQ, KeepQ, QPolicy, TriDiagDecomp, TriDiagTransform,
};

use num_traits::{Float, Zero};

use crate::dynmatrix::{norm2, DynVector};
use crate::error::MatrixError;
use crate::traits::{LinalgScalar, Scalar};

/// Householder reflector `H = I - τ v vᴴ`, `v = [1, x[1..]]`, with
/// `H x = β e₀`.
///
/// On return `x[0]` holds `β` and `x[1..]` the tail of `v`; `τ` is returned
/// and is real-valued. A zero tail gives `τ = 0` and leaves `x` alone.
pub(crate) fn householder<T: LinalgScalar>(x: &mut [T]) -> T {
    if x.len() < 2 {
        return T::zero();
    }
    let tail = norm2(&x[1..]);
    if tail == T::Real::zero() {
        return T::zero();
    }
    let x0 = x[0];
    let alpha = x0.modulus();
    let norm = alpha.hypot(tail);

    // sigma carries the phase of x0 so that v0 = x0 + sigma does not cancel
    let sigma = if alpha == T::Real::zero() {
        T::from_real(norm)
    } else {
        T::from_real(norm) * (x0 / T::from_real(alpha))
    };
    let v0 = x0 + sigma;
    for xi in x[1..].iter_mut() {
        *xi = *xi / v0;
    }
    x[0] = T::zero() - sigma;
    v0 / sigma
}

/// `x ← (I - τ v vᴴ) x` where `v = [1, tail]` and `x.len() == tail.len() + 1`.
#[inline]
pub(crate) fn reflect<T: LinalgScalar>(x: &mut [T], tail: &[T], tau: T) {
    if tau == T::zero() {
        return;
    }
    let mut dot = x[0];
    for (vi, xi) in tail.iter().zip(&x[1..]) {
        dot = dot + vi.conj() * *xi;
    }
    dot = dot * tau;
    x[0] = x[0] - dot;
    for (vi, xi) in tail.iter().zip(x[1..].iter_mut()) {
        *xi = *xi - dot * *vi;
    }
}

pub(crate) fn check_len<T: Scalar>(x: &DynVector<T>, expected: usize) -> Result<(), MatrixError> {
    if x.len() != expected {
        return Err(MatrixError::Dimension {
            expected,
            got: x.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex;

    #[test]
    fn reflector_annihilates_tail() {
        let orig = [3.0_f64, 4.0, 0.0, 12.0];
        let mut x = orig;
        let tau = householder(&mut x);
        assert!((x[0].abs() - 13.0).abs() < 1e-12);
        let tail = x[1..].to_vec();
        let mut y = orig;
        reflect(&mut y, &tail, tau);
        assert!((y[0] - x[0]).abs() < 1e-12);
        for v in &y[1..] {
            assert!(v.abs() < 1e-12);
        }
    }

    #[test]
    fn complex_reflector() {
        let c = |re, im| Complex::new(re, im);
        let orig = [c(1.0, 1.0), c(0.0, 2.0), c(-1.0, 0.5)];
        let mut x = orig;
        let tau = householder(&mut x);
        assert!(tau.im.abs() < 1e-12);
        let tail = x[1..].to_vec();
        let mut y = orig;
        reflect(&mut y, &tail, tau);
        assert!((y[0] - x[0]).norm() < 1e-12);
        assert!(y[1].norm() < 1e-12 && y[2].norm() < 1e-12);
    }

    #[test]
    fn zero_tail_is_identity() {
        let mut x = [2.0_f64, 0.0, 0.0];
        assert_eq!(householder(&mut x), 0.0);
        assert_eq!(x, [2.0, 0.0, 0.0]);
    }
}
