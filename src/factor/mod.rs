//! Factorizations of structured matrices.
//!
//! One type per matrix structure, each owning a private copy of the factored
//! data. A factorization never fails to construct: a numerically singular or
//! indefinite input is recorded as [`FactorStatus::Singular`], and only
//! becomes an error when a solve or inverse is requested.
//!
//! | Type | Input | Kernel |
//! |------|-------|--------|
//! | [`GenFact`] | [`DynMatrix`] | LU with partial pivoting |
//! | [`SymFact`] / [`HermFact`] | [`SymMatrix`] / [`HermMatrix`] | Bunch-Kaufman, packed |
//! | [`PdFact`] | [`SymMatrix`] / [`HermMatrix`] | Cholesky, packed |
//! | [`BandFact`] | [`BandMatrix`] | banded LU with partial pivoting |
//! | [`PdBandFact`] | [`SymBandMatrix`] / [`HermBandMatrix`] | banded Cholesky |
//! | [`TriDiagFact`] | [`TriDiagMatrix`] | tridiagonal LU with partial pivoting |
//!
//! [`SymMatrix`]: crate::SymMatrix
//! [`HermMatrix`]: crate::HermMatrix
//! [`BandMatrix`]: crate::BandMatrix
//! [`SymBandMatrix`]: crate::SymBandMatrix
//! [`HermBandMatrix`]: crate::HermBandMatrix
//! [`TriDiagMatrix`]: crate::TriDiagMatrix

mod band;
mod bunch_kaufman;
mod cholesky;
mod condition;
mod general;
mod tridiag;

pub use band::{BandFact, PdBandFact};
pub use bunch_kaufman::{BlockPivot, HermFact, IndefiniteFact, SymFact};
pub use cholesky::PdFact;
pub use general::GenFact;
pub(crate) use general::{lu_in_place, lu_solve};
pub use tridiag::TriDiagFact;

use crate::dynmatrix::{DynMatrix, DynVector};
use crate::error::MatrixError;
use crate::packed::{Packed, TriangleSelfAdjoint};
use crate::traits::LinalgScalar;

/// Outcome of the last factorization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FactorStatus {
    /// Never factored.
    #[default]
    Unfactored,
    /// Factored successfully.
    Factored,
    /// The kernel stopped or met a zero pivot at this 1-based position
    /// (for positive-definite kernels: the leading minor that is not
    /// positive definite).
    Singular { pivot: usize },
}

impl FactorStatus {
    /// LAPACK-style `info`: `-1` unfactored, `0` success, `k > 0` failed at `k`.
    pub fn info(&self) -> i64 {
        match *self {
            FactorStatus::Unfactored => -1,
            FactorStatus::Factored => 0,
            FactorStatus::Singular { pivot } => pivot as i64,
        }
    }

    pub(crate) fn from_info(info: usize) -> Self {
        if info == 0 {
            FactorStatus::Factored
        } else {
            FactorStatus::Singular { pivot: info }
        }
    }
}

/// Shared contract of every factorization.
///
/// Implementors supply the unchecked kernels (`solve_in_place`,
/// `solve_adjoint_in_place`) plus determinant and inverse; the checked
/// operations are provided.
pub trait Factorization<T: LinalgScalar> {
    /// Type returned by [`inverse`](Self::inverse).
    type Inverse;

    /// Order of the factored matrix.
    fn order(&self) -> usize;

    /// Outcome of the last factorization.
    fn status(&self) -> FactorStatus;

    /// Reciprocal condition estimate, if one was requested.
    fn rcond(&self) -> Option<T::Real>;

    /// Overwrite `b` with `A⁻¹ b`. Assumes `good()` and `b.len() == order()`.
    fn solve_in_place(&self, b: &mut [T]);

    /// Overwrite `b` with `A⁻ᴴ b`. Assumes `good()` and `b.len() == order()`.
    fn solve_adjoint_in_place(&self, b: &mut [T]);

    /// Determinant of the factored matrix.
    fn determinant(&self) -> Result<T, MatrixError>;

    /// Inverse of the factored matrix.
    fn inverse(&self) -> Result<Self::Inverse, MatrixError>;

    /// LAPACK-style status code.
    fn info(&self) -> i64 {
        self.status().info()
    }

    fn good(&self) -> bool {
        self.status() == FactorStatus::Factored
    }

    fn fail(&self) -> bool {
        !self.good()
    }

    fn is_singular(&self) -> bool {
        self.fail()
    }

    /// Reciprocal condition number in the 1-norm, in `[0, 1]`.
    fn condition(&self) -> Result<T::Real, MatrixError> {
        self.rcond().ok_or(MatrixError::NoConditionEstimate)
    }

    /// `Err(CannotSolve)` unless the factorization is usable.
    fn ensure_good(&self) -> Result<(), MatrixError> {
        if self.fail() {
            return Err(MatrixError::CannotSolve { info: self.info() });
        }
        Ok(())
    }

    /// Solve `A x = b`; `b` is not modified.
    fn solve(&self, b: &DynVector<T>) -> Result<DynVector<T>, MatrixError> {
        if b.len() != self.order() {
            return Err(MatrixError::Dimension {
                expected: self.order(),
                got: b.len(),
            });
        }
        self.ensure_good()?;
        let mut x = b.clone();
        self.solve_in_place(x.as_mut_slice());
        Ok(x)
    }

    /// Solve `A X = B` column by column.
    fn solve_matrix(&self, b: &DynMatrix<T>) -> Result<DynMatrix<T>, MatrixError> {
        if b.nrows() != self.order() {
            return Err(MatrixError::Dimension {
                expected: self.order(),
                got: b.nrows(),
            });
        }
        self.ensure_good()?;
        let mut x = b.clone();
        for j in 0..x.ncols() {
            self.solve_in_place(x.col_mut(j));
        }
        Ok(x)
    }
}

/// Dense inverse by solving against the identity.
pub(crate) fn inverse_columns<T: LinalgScalar, F: Factorization<T> + ?Sized>(
    f: &F,
) -> Result<DynMatrix<T>, MatrixError> {
    f.ensure_good()?;
    f.solve_matrix(&DynMatrix::eye(f.order(), T::zero()))
}

/// Inverse of a self-adjoint factorization, kept in packed form.
pub(crate) fn packed_inverse<S: TriangleSelfAdjoint, T: LinalgScalar, F: Factorization<T>>(
    f: &F,
) -> Result<Packed<S, T>, MatrixError> {
    let dense = inverse_columns(f)?;
    let mut inv = Packed::from_dense_with(S::default(), &dense)?;
    let data = inv.data_mut();
    for i in 0..f.order() {
        let k = i + i * (i + 1) / 2;
        data[k] = S::diagonal(data[k]);
    }
    Ok(inv)
}

/// Condition estimate taken right after a kernel ran.
pub(crate) fn estimate_rcond<T: LinalgScalar, F: Factorization<T>>(
    f: &F,
    anorm: T::Real,
) -> T::Real {
    if f.fail() {
        return <T::Real as num_traits::Zero>::zero();
    }
    condition::reciprocal_condition(
        f.order(),
        anorm,
        |x: &mut [T]| f.solve_in_place(x),
        |x: &mut [T]| f.solve_adjoint_in_place(x),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_info_codes() {
        assert_eq!(FactorStatus::default().info(), -1);
        assert_eq!(FactorStatus::from_info(0), FactorStatus::Factored);
        assert_eq!(FactorStatus::from_info(3).info(), 3);
    }
}
