use num_traits::{Float, Zero};

use crate::traits::LinalgScalar;

use super::vector::DynVector;
use super::DynMatrix;

// ── Vector norms ────────────────────────────────────────────────────

impl<T: LinalgScalar> DynVector<T> {
    /// L2 (Euclidean) norm.
    ///
    /// ```
    /// use structmat::DynVector;
    /// let v = DynVector::from_slice(&[3.0_f64, 4.0]);
    /// assert!((v.norm() - 5.0).abs() < 1e-12);
    /// ```
    pub fn norm(&self) -> T::Real {
        norm2(self.as_slice())
    }

    /// L1 norm (sum of moduli).
    pub fn norm_l1(&self) -> T::Real {
        self.as_slice()
            .iter()
            .fold(<T::Real as Zero>::zero(), |acc, x| acc + x.modulus())
    }

    /// Largest modulus.
    pub fn norm_inf(&self) -> T::Real {
        self.as_slice()
            .iter()
            .fold(<T::Real as Zero>::zero(), |acc, x| acc.max(x.modulus()))
    }
}

// ── Matrix norms ────────────────────────────────────────────────────

impl<T: LinalgScalar> DynMatrix<T> {
    /// Maximum absolute column sum.
    ///
    /// ```
    /// use structmat::DynMatrix;
    /// let a = DynMatrix::from_rows(2, 2, &[1.0_f64, -4.0, 2.0, 3.0]);
    /// assert_eq!(a.norm_one(), 7.0);
    /// ```
    pub fn norm_one(&self) -> T::Real {
        let mut best = <T::Real as Zero>::zero();
        for j in 0..self.ncols() {
            let s = self
                .col(j)
                .iter()
                .fold(<T::Real as Zero>::zero(), |acc, x| acc + x.modulus());
            best = best.max(s);
        }
        best
    }

    /// Maximum absolute row sum.
    pub fn norm_inf(&self) -> T::Real {
        let mut best = <T::Real as Zero>::zero();
        for i in 0..self.nrows() {
            let mut s = <T::Real as Zero>::zero();
            for j in 0..self.ncols() {
                s = s + self[(i, j)].modulus();
            }
            best = best.max(s);
        }
        best
    }

    /// Frobenius norm.
    pub fn frobenius_norm(&self) -> T::Real {
        norm2(self.as_slice())
    }
}

/// Overflow-safe Euclidean norm of a slice (scaled sum of squares).
pub(crate) fn norm2<T: LinalgScalar>(x: &[T]) -> T::Real {
    let zero = <T::Real as Zero>::zero();
    let scale = x.iter().fold(zero, |acc, v| acc.max(v.modulus()));
    if scale == zero {
        return zero;
    }
    let ssq = x.iter().fold(zero, |acc, v| {
        let r = v.modulus() / scale;
        acc + r * r
    });
    scale * ssq.sqrt()
}
