use super::{check_len, householder, reflect};
use crate::dynmatrix::{norm2, DynMatrix, DynVector};
use crate::error::MatrixError;
use crate::traits::LinalgScalar;

/// Householder QR in place, optionally choosing at each step the remaining
/// column of largest norm (`geqpf`).
///
/// On return the upper trapezoid of `a` holds `R`, the part below the
/// diagonal the reflector tails; `tau` has `min(m, n)` entries and
/// `pivots[j]` is the original index of column `j`.
pub(crate) fn qr_in_place<T: LinalgScalar>(
    a: &mut DynMatrix<T>,
    tau: &mut [T],
    pivots: &mut [usize],
    pivot: bool,
) {
    let m = a.nrows();
    let n = a.ncols();
    for (j, p) in pivots.iter_mut().enumerate() {
        *p = j;
    }

    for col in 0..m.min(n) {
        if pivot {
            let mut best = col;
            let mut best_norm = norm2(&a.col(col)[col..]);
            for j in (col + 1)..n {
                let nj = norm2(&a.col(j)[col..]);
                if nj > best_norm {
                    best = j;
                    best_norm = nj;
                }
            }
            if best != col {
                log::trace!("geqpf: column {} takes column {}", col, best);
                a.swap_cols(col, best);
                pivots.swap(col, best);
            }
        }

        let t = householder(&mut a.col_mut(col)[col..]);
        tau[col] = t;
        for j in (col + 1)..n {
            let (v, target) = a.col_pair_mut(col, j);
            reflect(&mut target[col..], &v[col + 1..], t);
        }
    }
}

/// QR decomposition of a general `m x n` matrix, `A P = Q R`.
///
/// `Q` is `m x m` unitary and kept as Householder reflectors; `R` is
/// `m x n` upper trapezoidal. Without pivoting `P = I`.
///
/// # Example
///
/// ```
/// use structmat::{DynMatrix, QrDecomp};
///
/// let a = DynMatrix::from_rows(3, 3, &[
///     12.0_f64, -51.0, 4.0,
///     6.0, 167.0, -68.0,
///     -4.0, 24.0, -41.0,
/// ]);
/// let qr = QrDecomp::new(&a);
/// let prod = &qr.q() * &qr.r();
/// assert!((&prod - &a).frobenius_norm() < 1e-10);
/// ```
#[derive(Debug, Clone)]
pub struct QrDecomp<T: LinalgScalar> {
    qr: DynMatrix<T>,
    tau: Vec<T>,
    pivots: Vec<usize>,
}

impl<T: LinalgScalar> QrDecomp<T> {
    /// Decompose without column pivoting.
    pub fn new(a: &DynMatrix<T>) -> Self {
        Self::factor(a, false)
    }

    /// Decompose with column pivoting, so that `|R(k, k)|` does not increase.
    pub fn with_pivoting(a: &DynMatrix<T>) -> Self {
        Self::factor(a, true)
    }

    fn factor(a: &DynMatrix<T>, pivot: bool) -> Self {
        log::debug!("QrDecomp: {}x{} (pivoting: {})", a.nrows(), a.ncols(), pivot);
        let mut qr = a.clone();
        let mut tau = vec![T::zero(); a.nrows().min(a.ncols())];
        let mut pivots = vec![0; a.ncols()];
        qr_in_place(&mut qr, &mut tau, &mut pivots, pivot);
        Self { qr, tau, pivots }
    }

    pub fn rows(&self) -> usize {
        self.qr.nrows()
    }

    pub fn cols(&self) -> usize {
        self.qr.ncols()
    }

    /// Column `j` of `A P` is column `pivots()[j]` of `A`.
    pub fn pivots(&self) -> &[usize] {
        &self.pivots
    }

    /// The `m x n` upper trapezoidal factor.
    pub fn r(&self) -> DynMatrix<T> {
        DynMatrix::from_fn(self.rows(), self.cols(), |i, j| {
            if i <= j {
                self.qr[(i, j)]
            } else {
                T::zero()
            }
        })
    }

    /// The `m x m` unitary factor.
    pub fn q(&self) -> DynMatrix<T> {
        let mut q = DynMatrix::eye(self.rows(), T::zero());
        for j in 0..self.rows() {
            self.apply_q(q.col_mut(j));
        }
        q
    }

    /// `Q x`.
    pub fn qx(&self, x: &DynVector<T>) -> Result<DynVector<T>, MatrixError> {
        check_len(x, self.rows())?;
        let mut y = x.clone();
        self.apply_q(y.as_mut_slice());
        Ok(y)
    }

    /// `Qᴴ x`.
    pub fn qtx(&self, x: &DynVector<T>) -> Result<DynVector<T>, MatrixError> {
        check_len(x, self.rows())?;
        let mut y = x.clone();
        self.apply_qt(y.as_mut_slice());
        Ok(y)
    }

    /// Packed `R` and reflector tails.
    pub(crate) fn packed(&self) -> &DynMatrix<T> {
        &self.qr
    }

    /// `Q = H₀ H₁ ⋯`, so the last reflector goes first.
    pub(crate) fn apply_q(&self, x: &mut [T]) {
        for k in (0..self.tau.len()).rev() {
            reflect(&mut x[k..], &self.qr.col(k)[k + 1..], self.tau[k]);
        }
    }

    pub(crate) fn apply_qt(&self, x: &mut [T]) {
        for k in 0..self.tau.len() {
            reflect(&mut x[k..], &self.qr.col(k)[k + 1..], self.tau[k].conj());
        }
    }
}
