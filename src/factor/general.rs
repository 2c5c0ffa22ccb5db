use num_traits::Zero;

use super::{estimate_rcond, inverse_columns, FactorStatus, Factorization};
use crate::dynmatrix::DynMatrix;
use crate::error::MatrixError;
use crate::traits::LinalgScalar;

/// LU decomposition with partial pivoting, in place (unblocked `getf2`).
///
/// On return `a` holds `U` in its upper triangle and the unit-lower `L`
/// below the diagonal; `ipiv[k]` is the row exchanged with row `k`.
/// Returns the 1-based position of the first exactly-zero pivot, or 0.
/// Elimination continues past a zero pivot so `U` is complete.
pub(crate) fn lu_in_place<T: LinalgScalar>(a: &mut DynMatrix<T>, ipiv: &mut [usize]) -> usize {
    let n = a.nrows();
    let mut info = 0;

    for col in 0..n {
        let mut max_row = col;
        let mut max_val = a[(col, col)].abs1();
        for row in (col + 1)..n {
            let val = a[(row, col)].abs1();
            if val > max_val {
                max_val = val;
                max_row = row;
            }
        }
        ipiv[col] = max_row;

        if max_val == T::Real::zero() {
            if info == 0 {
                info = col + 1;
            }
            continue;
        }
        if max_row != col {
            log::trace!("getf2: column {} pivots on row {}", col, max_row);
            a.swap_rows(col, max_row);
        }

        let inv_pivot = T::one() / a[(col, col)];
        for x in a.col_mut(col)[col + 1..].iter_mut() {
            *x = *x * inv_pivot;
        }

        // a[col+1:n, j] -= a[col, j] * a[col+1:n, col]
        for j in (col + 1)..n {
            let a_col_j = a[(col, j)];
            if a_col_j == T::zero() {
                continue;
            }
            let (left, right) = a.col_pair_mut(col, j);
            for i in (col + 1)..n {
                right[i] = right[i] - a_col_j * left[i];
            }
        }
    }
    info
}

/// Solve `A x = b` in place from the packed `L\U` factors.
pub(crate) fn lu_solve<T: LinalgScalar>(lu: &DynMatrix<T>, ipiv: &[usize], b: &mut [T]) {
    let n = lu.nrows();
    for k in 0..n {
        b.swap(k, ipiv[k]);
    }
    for k in 0..n {
        let bk = b[k];
        if bk != T::zero() {
            let col = lu.col(k);
            for i in (k + 1)..n {
                b[i] = b[i] - col[i] * bk;
            }
        }
    }
    for k in (0..n).rev() {
        let col = lu.col(k);
        b[k] = b[k] / col[k];
        let bk = b[k];
        for i in 0..k {
            b[i] = b[i] - col[i] * bk;
        }
    }
}

/// Solve `Aᴴ x = b` in place from the packed `L\U` factors.
pub(crate) fn lu_solve_adjoint<T: LinalgScalar>(lu: &DynMatrix<T>, ipiv: &[usize], b: &mut [T]) {
    let n = lu.nrows();
    // Uᴴ y = b
    for k in 0..n {
        let col = lu.col(k);
        let mut sum = b[k];
        for i in 0..k {
            sum = sum - col[i].conj() * b[i];
        }
        b[k] = sum / col[k].conj();
    }
    // Lᴴ z = y
    for k in (0..n).rev() {
        let col = lu.col(k);
        let mut sum = b[k];
        for i in (k + 1)..n {
            sum = sum - col[i].conj() * b[i];
        }
        b[k] = sum;
    }
    for k in (0..n).rev() {
        b.swap(k, ipiv[k]);
    }
}

/// Factorization of a general square matrix, `A = P L U`.
///
/// # Example
///
/// ```
/// use structmat::{DynMatrix, DynVector, GenFact, Factorization};
///
/// let a = DynMatrix::from_rows(3, 3, &[
///     2.0_f64, 1.0, -1.0,
///     -3.0, -1.0, 2.0,
///     -2.0, 1.0, 2.0,
/// ]);
/// let lu = GenFact::new(&a, true).unwrap();
/// assert!(lu.good());
/// let x = lu.solve(&DynVector::from_slice(&[8.0, -11.0, -3.0])).unwrap();
/// assert!((x[0] - 2.0).abs() < 1e-12);
/// assert!((x[1] - 3.0).abs() < 1e-12);
/// assert!((x[2] + 1.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct GenFact<T: LinalgScalar> {
    lu: DynMatrix<T>,
    ipiv: Vec<usize>,
    status: FactorStatus,
    rcond: Option<T::Real>,
}

impl<T: LinalgScalar> Default for GenFact<T> {
    fn default() -> Self {
        Self {
            lu: DynMatrix::zeros(0, 0, T::zero()),
            ipiv: Vec::new(),
            status: FactorStatus::Unfactored,
            rcond: None,
        }
    }
}

impl<T: LinalgScalar> GenFact<T> {
    /// Factor `a`; fails only if `a` is not square.
    pub fn new(a: &DynMatrix<T>, estimate_condition: bool) -> Result<Self, MatrixError> {
        let mut f = Self::default();
        f.factor(a, estimate_condition)?;
        Ok(f)
    }

    /// Replace the content with the factorization of `a`.
    pub fn factor(&mut self, a: &DynMatrix<T>, estimate_condition: bool) -> Result<(), MatrixError> {
        if !a.is_square() {
            return Err(MatrixError::Shape {
                rows: a.nrows(),
                cols: a.ncols(),
            });
        }
        let n = a.nrows();
        log::debug!("GenFact: factoring order {}", n);
        let anorm = a.norm_one();
        self.lu = a.clone();
        self.ipiv = vec![0; n];
        let info = lu_in_place(&mut self.lu, &mut self.ipiv);
        self.status = FactorStatus::from_info(info);
        self.rcond = None;
        if estimate_condition {
            self.rcond = Some(estimate_rcond(&*self, anorm));
        }
        log::debug!("GenFact: info = {}", self.status.info());
        Ok(())
    }

    /// Packed `L\U` factors.
    pub fn factors(&self) -> &DynMatrix<T> {
        &self.lu
    }

    /// Row interchanges, `ipiv[k]` exchanged with `k`.
    pub fn pivots(&self) -> &[usize] {
        &self.ipiv
    }
}

impl<T: LinalgScalar> Factorization<T> for GenFact<T> {
    type Inverse = DynMatrix<T>;

    fn order(&self) -> usize {
        self.lu.nrows()
    }

    fn status(&self) -> FactorStatus {
        self.status
    }

    fn rcond(&self) -> Option<T::Real> {
        self.rcond
    }

    fn solve_in_place(&self, b: &mut [T]) {
        lu_solve(&self.lu, &self.ipiv, b);
    }

    fn solve_adjoint_in_place(&self, b: &mut [T]) {
        lu_solve_adjoint(&self.lu, &self.ipiv, b);
    }

    /// Product of the `U` diagonal with the sign of the row permutation;
    /// zero for a singular matrix.
    fn determinant(&self) -> Result<T, MatrixError> {
        if self.status == FactorStatus::Unfactored {
            return Err(MatrixError::CannotSolve { info: -1 });
        }
        let mut det = T::one();
        for (k, &p) in self.ipiv.iter().enumerate() {
            det = det * self.lu[(k, k)];
            if p != k {
                det = T::zero() - det;
            }
        }
        Ok(det)
    }

    fn inverse(&self) -> Result<DynMatrix<T>, MatrixError> {
        inverse_columns(self)
    }
}
