use core::ops::{Mul, Sub};

use crate::traits::{LinalgScalar, Scalar};

use super::vector::DynVector;
use super::DynMatrix;

// ── Matrix multiplication: (M×N) * (N×P) → (M×P) ──────────────────

impl<T: Scalar> Mul<&DynMatrix<T>> for &DynMatrix<T> {
    type Output = DynMatrix<T>;

    fn mul(self, rhs: &DynMatrix<T>) -> DynMatrix<T> {
        assert_eq!(
            self.ncols(),
            rhs.nrows(),
            "dimension mismatch: {}x{} * {}x{}",
            self.nrows(),
            self.ncols(),
            rhs.nrows(),
            rhs.ncols(),
        );
        let m = self.nrows();
        let mut out = DynMatrix::zeros(m, rhs.ncols(), T::zero());
        for j in 0..rhs.ncols() {
            for k in 0..self.ncols() {
                let b_kj = rhs[(k, j)];
                if b_kj == T::zero() {
                    continue;
                }
                let a_k = self.col(k);
                let c_j = out.col_mut(j);
                for i in 0..m {
                    c_j[i] = c_j[i] + a_k[i] * b_kj;
                }
            }
        }
        out
    }
}

impl<T: Scalar> Mul for DynMatrix<T> {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        &self * &rhs
    }
}

// ── Matrix-vector multiplication ────────────────────────────────────

impl<T: Scalar> Mul<&DynVector<T>> for &DynMatrix<T> {
    type Output = DynVector<T>;

    fn mul(self, rhs: &DynVector<T>) -> DynVector<T> {
        assert_eq!(self.ncols(), rhs.len(), "dimension mismatch in matrix * vector");
        let mut out = vec![T::zero(); self.nrows()];
        for k in 0..self.ncols() {
            let x = rhs[k];
            for (o, &a) in out.iter_mut().zip(self.col(k)) {
                *o = *o + a * x;
            }
        }
        DynVector::from_vec(out)
    }
}

// ── Subtraction ─────────────────────────────────────────────────────

impl<T: Scalar> Sub<&DynMatrix<T>> for &DynMatrix<T> {
    type Output = DynMatrix<T>;

    fn sub(self, rhs: &DynMatrix<T>) -> DynMatrix<T> {
        assert!(
            self.nrows() == rhs.nrows() && self.ncols() == rhs.ncols(),
            "dimension mismatch: {}x{} - {}x{}",
            self.nrows(),
            self.ncols(),
            rhs.nrows(),
            rhs.ncols(),
        );
        let data = self
            .as_slice()
            .iter()
            .zip(rhs.as_slice())
            .map(|(&a, &b)| a - b)
            .collect();
        DynMatrix::from_vec(self.nrows(), self.ncols(), data)
    }
}

impl<T: Scalar> Sub<&DynVector<T>> for &DynVector<T> {
    type Output = DynVector<T>;

    fn sub(self, rhs: &DynVector<T>) -> DynVector<T> {
        assert_eq!(self.len(), rhs.len(), "vector length mismatch");
        DynVector::from_vec(
            self.as_slice()
                .iter()
                .zip(rhs.as_slice())
                .map(|(&a, &b)| a - b)
                .collect(),
        )
    }
}

// ── Transpose / adjoint ─────────────────────────────────────────────

impl<T: Scalar> DynMatrix<T> {
    /// Transpose: (M×N) → (N×M).
    ///
    /// ```
    /// use structmat::DynMatrix;
    /// let a = DynMatrix::from_rows(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    /// let t = a.transpose();
    /// assert_eq!(t.nrows(), 3);
    /// assert_eq!(t[(2, 1)], 6.0);
    /// ```
    pub fn transpose(&self) -> Self {
        DynMatrix::from_fn(self.ncols(), self.nrows(), |i, j| self[(j, i)])
    }
}

impl<T: LinalgScalar> DynMatrix<T> {
    /// Conjugate transpose (plain transpose for reals).
    pub fn adjoint(&self) -> Self {
        DynMatrix::from_fn(self.ncols(), self.nrows(), |i, j| self[(j, i)].conj())
    }
}
