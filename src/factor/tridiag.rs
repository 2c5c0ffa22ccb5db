use super::{estimate_rcond, inverse_columns, FactorStatus, Factorization};
use crate::dynmatrix::DynMatrix;
use crate::error::MatrixError;
use crate::packed::TriDiagMatrix;
use crate::traits::LinalgScalar;

/// LU of a tridiagonal matrix with partial pivoting (`gttrf`).
///
/// On return `dl` holds the multipliers of `L`, `d`, `du` and `du2` the
/// diagonal and two superdiagonals of `U`; `ipiv[i]` is `i` or `i + 1`.
/// Returns the 1-based position of the first zero on the diagonal of `U`.
pub(crate) fn tridiag_lu_in_place<T: LinalgScalar>(
    dl: &mut [T],
    d: &mut [T],
    du: &mut [T],
    du2: &mut [T],
    ipiv: &mut [usize],
) -> usize {
    let n = d.len();
    for (i, p) in ipiv.iter_mut().enumerate() {
        *p = i;
    }
    du2.iter_mut().for_each(|x| *x = T::zero());

    for i in 0..n.saturating_sub(1) {
        if d[i].abs1() >= dl[i].abs1() {
            if d[i] != T::zero() {
                let fact = dl[i] / d[i];
                dl[i] = fact;
                d[i + 1] = d[i + 1] - fact * du[i];
            }
        } else {
            log::trace!("gttrf: row {} interchanged with {}", i, i + 1);
            let fact = d[i] / dl[i];
            d[i] = dl[i];
            dl[i] = fact;
            let temp = du[i];
            du[i] = d[i + 1];
            d[i + 1] = temp - fact * d[i + 1];
            if i + 2 < n {
                du2[i] = du[i + 1];
                du[i + 1] = T::zero() - fact * du[i + 1];
            }
            ipiv[i] = i + 1;
        }
    }

    d.iter()
        .position(|x| *x == T::zero())
        .map_or(0, |i| i + 1)
}

/// Factorization of a tridiagonal matrix, `A = P L U`.
#[derive(Debug, Clone)]
pub struct TriDiagFact<T: LinalgScalar> {
    dl: Vec<T>,
    d: Vec<T>,
    du: Vec<T>,
    du2: Vec<T>,
    ipiv: Vec<usize>,
    status: FactorStatus,
    rcond: Option<T::Real>,
}

impl<T: LinalgScalar> Default for TriDiagFact<T> {
    fn default() -> Self {
        Self {
            dl: Vec::new(),
            d: Vec::new(),
            du: Vec::new(),
            du2: Vec::new(),
            ipiv: Vec::new(),
            status: FactorStatus::Unfactored,
            rcond: None,
        }
    }
}

impl<T: LinalgScalar> TriDiagFact<T> {
    pub fn new(a: &TriDiagMatrix<T>, estimate_condition: bool) -> Self {
        let mut f = Self::default();
        f.factor(a, estimate_condition);
        f
    }

    pub fn factor(&mut self, a: &TriDiagMatrix<T>, estimate_condition: bool) {
        let n = a.order();
        log::debug!("TriDiagFact: factoring order {}", n);
        let anorm = a.norm_one();

        // (i - j + 1) + 3j band storage
        let data = a.data();
        self.d = (0..n).map(|i| data[1 + 3 * i]).collect();
        self.dl = (0..n.saturating_sub(1)).map(|i| data[2 + 3 * i]).collect();
        self.du = (0..n.saturating_sub(1)).map(|i| data[3 + 3 * i]).collect();
        self.du2 = vec![T::zero(); n.saturating_sub(2)];
        self.ipiv = vec![0; n];

        let info = tridiag_lu_in_place(
            &mut self.dl,
            &mut self.d,
            &mut self.du,
            &mut self.du2,
            &mut self.ipiv,
        );
        self.status = FactorStatus::from_info(info);
        self.rcond = None;
        if estimate_condition {
            self.rcond = Some(estimate_rcond(&*self, anorm));
        }
        log::debug!("TriDiagFact: info = {}", info);
    }

    /// Multipliers of `L`.
    pub fn lower(&self) -> &[T] {
        &self.dl
    }

    /// Diagonal of `U`.
    pub fn diagonal(&self) -> &[T] {
        &self.d
    }

    /// First and second superdiagonals of `U`.
    pub fn upper(&self) -> (&[T], &[T]) {
        (&self.du, &self.du2)
    }

    pub fn pivots(&self) -> &[usize] {
        &self.ipiv
    }
}

impl<T: LinalgScalar> Factorization<T> for TriDiagFact<T> {
    type Inverse = DynMatrix<T>;

    fn order(&self) -> usize {
        self.d.len()
    }

    fn status(&self) -> FactorStatus {
        self.status
    }

    fn rcond(&self) -> Option<T::Real> {
        self.rcond
    }

    fn solve_in_place(&self, b: &mut [T]) {
        let n = self.order();
        if n == 0 {
            return;
        }
        // L y = P b
        for i in 0..n - 1 {
            let ip = self.ipiv[i];
            let temp = b[2 * i + 1 - ip];
            b[i] = b[ip];
            b[i + 1] = temp - self.dl[i] * b[i];
        }
        // U x = y
        b[n - 1] = b[n - 1] / self.d[n - 1];
        if n > 1 {
            b[n - 2] = (b[n - 2] - self.du[n - 2] * b[n - 1]) / self.d[n - 2];
        }
        for i in (0..n.saturating_sub(2)).rev() {
            b[i] = (b[i] - self.du[i] * b[i + 1] - self.du2[i] * b[i + 2]) / self.d[i];
        }
    }

    fn solve_adjoint_in_place(&self, b: &mut [T]) {
        let n = self.order();
        if n == 0 {
            return;
        }
        // Uᴴ y = b
        b[0] = b[0] / self.d[0].conj();
        if n > 1 {
            b[1] = (b[1] - self.du[0].conj() * b[0]) / self.d[1].conj();
        }
        for i in 2..n {
            b[i] = (b[i] - self.du[i - 1].conj() * b[i - 1] - self.du2[i - 2].conj() * b[i - 2])
                / self.d[i].conj();
        }
        // Lᴴ Pᵀ x = y
        for i in (0..n - 1).rev() {
            if self.ipiv[i] == i {
                b[i] = b[i] - self.dl[i].conj() * b[i + 1];
            } else {
                let temp = b[i + 1];
                b[i + 1] = b[i] - self.dl[i].conj() * temp;
                b[i] = temp;
            }
        }
    }

    fn determinant(&self) -> Result<T, MatrixError> {
        if self.status == FactorStatus::Unfactored {
            return Err(MatrixError::CannotSolve { info: -1 });
        }
        let mut det = T::one();
        for (i, (&di, &p)) in self.d.iter().zip(&self.ipiv).enumerate() {
            det = det * di;
            if p != i {
                det = T::zero() - det;
            }
        }
        Ok(det)
    }

    fn inverse(&self) -> Result<DynMatrix<T>, MatrixError> {
        inverse_columns(self)
    }
}
