use super::{check_len, householder, reflect, QrDecomp};
use crate::dynmatrix::{DynMatrix, DynVector};
use crate::error::MatrixError;
use crate::traits::LinalgScalar;

/// Complete orthogonal decomposition, `A P = Q [T 0; 0 0] Zᴴ`.
///
/// `T` is `r x r` upper triangular where `r` is the numerical rank: the
/// trailing diagonal elements of a pivoted QR that fall below `tol` are
/// dropped, then the remaining `r x n` trapezoid is reduced to `[T 0]` by
/// reflectors from the right (`tzrzf`).
///
/// ```
/// use structmat::{CoDecomp, DynMatrix};
///
/// // third column is the sum of the first two
/// let a = DynMatrix::from_rows(3, 3, &[
///     1.0_f64, 2.0, 3.0,
///     4.0, 5.0, 9.0,
///     7.0, 8.0, 15.0,
/// ]);
/// let co = CoDecomp::new(&a, 1e-10);
/// assert_eq!(co.rank(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct CoDecomp<T: LinalgScalar> {
    qr: QrDecomp<T>,
    t: DynMatrix<T>,
    // row k: tail of the reflector that cleared row k of the trapezoid
    zv: DynMatrix<T>,
    ztau: Vec<T>,
    rank: usize,
}

impl<T: LinalgScalar> CoDecomp<T> {
    /// Pivoted QR of `a`, then the rank-revealing step with `tol`.
    pub fn new(a: &DynMatrix<T>, tol: T::Real) -> Self {
        Self::from_qr(QrDecomp::with_pivoting(a), tol)
    }

    /// Continue from an existing QR decomposition, taking ownership of it.
    pub fn from_qr(qr: QrDecomp<T>, tol: T::Real) -> Self {
        let mut co = Self {
            qr,
            t: DynMatrix::zeros(0, 0, T::zero()),
            zv: DynMatrix::zeros(0, 0, T::zero()),
            ztau: Vec::new(),
            rank: 0,
        };
        co.factor(tol);
        co
    }

    /// Redo the rank decision and the `Z` reduction with a new tolerance.
    pub fn factor(&mut self, tol: T::Real) {
        let r = self.qr.packed();
        let (m, n) = (r.nrows(), r.ncols());
        let mut rank = m.min(n);
        while rank > 0 && r[(rank - 1, rank - 1)].modulus() < tol {
            rank -= 1;
        }
        log::debug!("CoDecomp: {}x{}, rank {}", m, n, rank);

        let mut w = DynMatrix::from_fn(rank, n, |i, j| if i <= j { r[(i, j)] } else { T::zero() });
        let mut zv = DynMatrix::zeros(rank, n - rank, T::zero());
        let mut ztau = vec![T::zero(); rank];

        if rank < n {
            for k in (0..rank).rev() {
                // reflector G with w[k, :] G = [β, 0, ...] over columns k, rank..n
                let mut x: Vec<T> = core::iter::once(w[(k, k)])
                    .chain((rank..n).map(|j| w[(k, j)]))
                    .map(|v| v.conj())
                    .collect();
                let tau = householder(&mut x);
                ztau[k] = tau;
                log::trace!("tzrzf: row {} tau = {:?}", k, tau);

                for i in 0..k {
                    let mut dot = w[(i, k)];
                    for (p, j) in (rank..n).enumerate() {
                        dot = dot + w[(i, j)] * x[p + 1];
                    }
                    dot = dot * tau;
                    w[(i, k)] = w[(i, k)] - dot;
                    for (p, j) in (rank..n).enumerate() {
                        w[(i, j)] = w[(i, j)] - dot * x[p + 1].conj();
                    }
                }
                w[(k, k)] = x[0].conj();
                for (p, j) in (rank..n).enumerate() {
                    w[(k, j)] = T::zero();
                    zv[(k, p)] = x[p + 1];
                }
            }
        }

        self.t = DynMatrix::from_fn(rank, rank, |i, j| w[(i, j)]);
        self.zv = zv;
        self.ztau = ztau;
        self.rank = rank;
    }

    pub fn rows(&self) -> usize {
        self.qr.rows()
    }

    pub fn cols(&self) -> usize {
        self.qr.cols()
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Column `j` of `A P` is column `pivots()[j]` of `A`.
    pub fn pivots(&self) -> &[usize] {
        self.qr.pivots()
    }

    /// The `r x r` upper triangular factor.
    pub fn t(&self) -> &DynMatrix<T> {
        &self.t
    }

    /// The `m x m` unitary left factor.
    pub fn q(&self) -> DynMatrix<T> {
        self.qr.q()
    }

    /// The `n x n` unitary right factor.
    pub fn z(&self) -> DynMatrix<T> {
        let n = self.cols();
        let mut z = DynMatrix::eye(n, T::zero());
        for j in 0..n {
            self.apply_z(z.col_mut(j));
        }
        z
    }

    pub fn qx(&self, x: &DynVector<T>) -> Result<DynVector<T>, MatrixError> {
        self.qr.qx(x)
    }

    pub fn qtx(&self, x: &DynVector<T>) -> Result<DynVector<T>, MatrixError> {
        self.qr.qtx(x)
    }

    /// `T x`.
    pub fn tx(&self, x: &DynVector<T>) -> Result<DynVector<T>, MatrixError> {
        check_len(x, self.rank)?;
        Ok(&self.t * x)
    }

    /// `Tᴴ x`.
    pub fn ttx(&self, x: &DynVector<T>) -> Result<DynVector<T>, MatrixError> {
        check_len(x, self.rank)?;
        Ok(&self.t.adjoint() * x)
    }

    /// `T⁻¹ x` by back substitution.
    pub fn tinvx(&self, x: &DynVector<T>) -> Result<DynVector<T>, MatrixError> {
        check_len(x, self.rank)?;
        let mut y = x.clone();
        let t = &self.t;
        for i in (0..self.rank).rev() {
            let mut s = y[i];
            for j in (i + 1)..self.rank {
                s = s - t[(i, j)] * y[j];
            }
            y[i] = s / t[(i, i)];
        }
        Ok(y)
    }

    /// `T⁻ᴴ x` by forward substitution.
    pub fn ttinvx(&self, x: &DynVector<T>) -> Result<DynVector<T>, MatrixError> {
        check_len(x, self.rank)?;
        let mut y = x.clone();
        let t = &self.t;
        for i in 0..self.rank {
            let mut s = y[i];
            for j in 0..i {
                s = s - t[(j, i)].conj() * y[j];
            }
            y[i] = s / t[(i, i)].conj();
        }
        Ok(y)
    }

    /// `Z x`.
    pub fn zx(&self, x: &DynVector<T>) -> Result<DynVector<T>, MatrixError> {
        check_len(x, self.cols())?;
        let mut y = x.clone();
        self.apply_z(y.as_mut_slice());
        Ok(y)
    }

    /// `Zᴴ x`.
    pub fn ztx(&self, x: &DynVector<T>) -> Result<DynVector<T>, MatrixError> {
        check_len(x, self.cols())?;
        let mut y = x.clone();
        self.apply_zt(y.as_mut_slice());
        Ok(y)
    }

    /// Apply reflector `k` (conjugated if `adjoint`) on entries `k, r..n`.
    fn reflect_k(&self, x: &mut [T], k: usize, adjoint: bool) {
        let r = self.rank;
        let tau = if adjoint { self.ztau[k].conj() } else { self.ztau[k] };
        let mut y: Vec<T> = core::iter::once(x[k]).chain(x[r..].iter().copied()).collect();
        let tail: Vec<T> = (0..self.zv.ncols()).map(|p| self.zv[(k, p)]).collect();
        reflect(&mut y, &tail, tau);
        x[k] = y[0];
        x[r..].copy_from_slice(&y[1..]);
    }

    // Z = G_{r-1} ⋯ G_0
    fn apply_z(&self, x: &mut [T]) {
        if self.rank == self.cols() {
            return;
        }
        for k in 0..self.rank {
            self.reflect_k(x, k, false);
        }
    }

    fn apply_zt(&self, x: &mut [T]) {
        if self.rank == self.cols() {
            return;
        }
        for k in (0..self.rank).rev() {
            self.reflect_k(x, k, true);
        }
    }
}
