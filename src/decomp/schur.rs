use core::ops::Range;

use num_complex::Complex;

use super::{check_len, BalanceDecomp, HessenbergDecomp, QrDecomp};
use crate::dynmatrix::{DynMatrix, DynVector};
use crate::error::MatrixError;
use crate::factor::{lu_in_place, lu_solve};
use crate::traits::{real, real_from_usize, FloatScalar};

/// Francis double-shift QR iteration on an upper Hessenberg matrix.
///
/// Transforms `h` to real Schur form (quasi-upper-triangular) in place and
/// accumulates the orthogonal similarity transform into `z`. Returns `false`
/// if `max_iter` sweeps were not enough.
///
/// Real eigenvalues appear as 1×1 diagonal blocks, complex conjugate pairs
/// as 2×2 blocks; 2×2 blocks are not yet standardized.
pub(crate) fn francis_qr<T: FloatScalar>(h: &mut DynMatrix<T>, z: &mut DynMatrix<T>, max_iter: usize) -> bool {
    let n = h.nrows();
    if n <= 1 {
        return true;
    }

    let eps = T::epsilon();
    let mut iter = 0usize;
    // active submatrix is h[0..p, 0..p]
    let mut p = n;

    while p > 2 {
        if negligible(h, p - 1) {
            h[(p - 1, p - 2)] = T::zero();
            log::trace!("hqr: 1x1 block deflated at {}", p - 1);
            p -= 1;
            continue;
        }
        if negligible(h, p - 2) {
            h[(p - 2, p - 3)] = T::zero();
            log::trace!("hqr: 2x2 block deflated at {}", p - 2);
            p -= 2;
            continue;
        }

        iter += 1;
        if iter > max_iter {
            return false;
        }

        // start of the unreduced block ending at p - 1
        let mut lo = p - 1;
        while lo > 0 {
            if negligible(h, lo) {
                h[(lo, lo - 1)] = T::zero();
                break;
            }
            lo -= 1;
        }

        let (s, t) = if iter % 10 == 0 {
            // exceptional shift
            let w = h[(p - 1, p - 2)].abs() + h[(p - 2, p - 3)].abs();
            (w + w, w * w)
        } else {
            let a11 = h[(p - 2, p - 2)];
            let a12 = h[(p - 2, p - 1)];
            let a21 = h[(p - 1, p - 2)];
            let a22 = h[(p - 1, p - 1)];
            (a11 + a22, a11 * a22 - a12 * a21)
        };

        // first column of H² - s H + t I
        let h00 = h[(lo, lo)];
        let h10 = h[(lo + 1, lo)];
        let h01 = h[(lo, lo + 1)];
        let h11 = h[(lo + 1, lo + 1)];
        let mut x = h00 * h00 + h01 * h10 - s * h00 + t;
        let mut y = h10 * (h00 + h11 - s);
        let mut w = if lo + 2 < p { h10 * h[(lo + 2, lo + 1)] } else { T::zero() };

        // chase the bulge
        for k in lo..(p - 1) {
            let three = k + 2 < p;
            let v = if three {
                householder3(x, y, w)
            } else {
                let (v1, tau) = householder2(x, y);
                (v1, T::zero(), tau)
            };
            let width = if three { 3 } else { 2 };

            let first = if k > lo { k - 1 } else { k };
            small_reflect_rows(h, k, width, v, first..n);
            let last = if three { (k + 4).min(p) } else { p };
            small_reflect_cols(h, k, width, v, 0..last);
            small_reflect_cols(z, k, width, v, 0..n);

            if k + 2 < p - 1 {
                x = h[(k + 1, k)];
                y = h[(k + 2, k)];
                w = h[(k + 3, k)];
            } else if k + 1 < p - 1 {
                x = h[(k + 1, k)];
                y = h[(k + 2, k)];
                w = T::zero();
            }
        }

        for i in 0..n {
            for j in 0..i.saturating_sub(1) {
                if h[(i, j)].abs() < eps * (h[(i, i)].abs() + h[(j, j)].abs()) {
                    h[(i, j)] = T::zero();
                }
            }
        }
    }

    if p == 2 && negligible(h, 1) {
        h[(1, 0)] = T::zero();
    }
    log::trace!("hqr: converged after {} sweeps", iter);
    true
}

/// Whether the subdiagonal entry `h[(i, i - 1)]` can be set to zero.
#[inline]
fn negligible<T: FloatScalar>(h: &DynMatrix<T>, i: usize) -> bool {
    h[(i, i - 1)].abs() <= T::epsilon() * (h[(i - 1, i - 1)].abs() + h[(i, i)].abs())
}

/// `(v1, v2, tau)` of the reflector `I - τ v vᵀ`, `v = [1, v1, v2]`, that
/// annihilates `y` and `z`.
#[inline]
fn householder3<T: FloatScalar>(x: T, y: T, z: T) -> (T, T, T) {
    let norm = (x * x + y * y + z * z).sqrt();
    if norm <= T::epsilon() {
        return (T::zero(), T::zero(), T::zero());
    }
    let u0 = if x >= T::zero() { x + norm } else { x - norm };
    let v1 = y / u0;
    let v2 = z / u0;
    let two = T::one() + T::one();
    (v1, v2, two / (T::one() + v1 * v1 + v2 * v2))
}

#[inline]
fn householder2<T: FloatScalar>(x: T, y: T) -> (T, T) {
    let norm = (x * x + y * y).sqrt();
    if norm <= T::epsilon() {
        return (T::zero(), T::zero());
    }
    let u0 = if x >= T::zero() { x + norm } else { x - norm };
    let v1 = y / u0;
    let two = T::one() + T::one();
    (v1, two / (T::one() + v1 * v1))
}

/// Rows `k..k + width` of `m` over `cols`, times the small reflector from the left.
fn small_reflect_rows<T: FloatScalar>(m: &mut DynMatrix<T>, k: usize, width: usize, v: (T, T, T), cols: Range<usize>) {
    let (v1, v2, tau) = v;
    for j in cols {
        let mut dot = m[(k, j)] + v1 * m[(k + 1, j)];
        if width == 3 {
            dot = dot + v2 * m[(k + 2, j)];
        }
        dot = tau * dot;
        m[(k, j)] = m[(k, j)] - dot;
        m[(k + 1, j)] = m[(k + 1, j)] - dot * v1;
        if width == 3 {
            m[(k + 2, j)] = m[(k + 2, j)] - dot * v2;
        }
    }
}

/// Columns `k..k + width` of `m` over `rows`, times the small reflector from the right.
fn small_reflect_cols<T: FloatScalar>(m: &mut DynMatrix<T>, k: usize, width: usize, v: (T, T, T), rows: Range<usize>) {
    let (v1, v2, tau) = v;
    for i in rows {
        let mut dot = m[(i, k)] + v1 * m[(i, k + 1)];
        if width == 3 {
            dot = dot + v2 * m[(i, k + 2)];
        }
        dot = tau * dot;
        m[(i, k)] = m[(i, k)] - dot;
        m[(i, k + 1)] = m[(i, k + 1)] - dot * v1;
        if width == 3 {
            m[(i, k + 2)] = m[(i, k + 2)] - dot * v2;
        }
    }
}

/// `[x_p; x_q] ← [c s; -s c] [x_p; x_q]` on rows `p`, `q` over `cols`.
fn rotate_rows<T: FloatScalar>(m: &mut DynMatrix<T>, p: usize, q: usize, c: T, s: T, cols: Range<usize>) {
    for j in cols {
        let x = m[(p, j)];
        let y = m[(q, j)];
        m[(p, j)] = c * x + s * y;
        m[(q, j)] = c * y - s * x;
    }
}

/// `[x_p x_q] ← [x_p x_q] [c -s; s c]` on columns `p`, `q` over `rows`.
fn rotate_cols<T: FloatScalar>(m: &mut DynMatrix<T>, p: usize, q: usize, c: T, s: T, rows: Range<usize>) {
    for i in rows {
        let x = m[(i, p)];
        let y = m[(i, q)];
        m[(i, p)] = c * x + s * y;
        m[(i, q)] = c * y - s * x;
    }
}

/// Real Schur decomposition, `A = B Z T Zᵀ B⁻¹`.
///
/// `B` is the balancing transform, `Z` orthogonal and `T` quasi upper
/// triangular: 1×1 diagonal blocks hold real eigenvalues, 2×2 blocks complex
/// conjugate pairs. Eigenvalues are listed in the order they appear on the
/// diagonal of `T`, the one with positive imaginary part first.
///
/// ```
/// use structmat::{DynMatrix, SchurDecomp};
///
/// let a = DynMatrix::from_rows(2, 2, &[0.0_f64, -1.0, 1.0, 0.0]);
/// let schur = SchurDecomp::new(&a).unwrap();
/// assert!(schur.good());
/// let l = schur.eigenvalue(0).unwrap();
/// assert!(l.re.abs() < 1e-12 && (l.im - 1.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct SchurDecomp<T: FloatScalar> {
    balance: BalanceDecomp<T>,
    t: DynMatrix<T>,
    z: DynMatrix<T>,
    eigenvalues: Vec<Complex<T>>,
}

impl<T: FloatScalar> SchurDecomp<T> {
    /// Balance, reduce to Hessenberg form, then iterate.
    pub fn new(a: &DynMatrix<T>) -> Result<Self, MatrixError> {
        Ok(Self::from_hessenberg(HessenbergDecomp::new(a)?))
    }

    pub fn from_balance(balance: BalanceDecomp<T>) -> Self {
        Self::from_hessenberg(HessenbergDecomp::from_balance(balance))
    }

    /// Continue from a Hessenberg decomposition, taking over its factors.
    pub fn from_hessenberg(hess: HessenbergDecomp<T>) -> Self {
        let (balance, t, z) = hess.into_parts();
        let mut schur = Self {
            balance,
            t,
            z,
            eigenvalues: Vec::new(),
        };
        let n = schur.order();
        log::debug!("SchurDecomp: order {}", n);
        if francis_qr(&mut schur.t, &mut schur.z, 30 * n) {
            let mut i = 0;
            while i < n {
                if schur.block_size(i) == 2 {
                    schur.standardize(i);
                }
                i += schur.block_size(i);
            }
            schur.collect_eigenvalues();
        } else {
            log::warn!("SchurDecomp: QR iteration did not converge in {} sweeps", 30 * n);
        }
        schur
    }

    pub fn order(&self) -> usize {
        self.t.nrows()
    }

    /// Whether every eigenvalue was found.
    pub fn good(&self) -> bool {
        self.eigenvalues.len() == self.order()
    }

    pub fn eigenvalues(&self) -> &[Complex<T>] {
        &self.eigenvalues
    }

    pub fn eigenvalue(&self, i: usize) -> Result<Complex<T>, MatrixError> {
        self.eigenvalues.get(i).copied().ok_or(MatrixError::Bounds {
            i,
            j: 0,
            n: self.eigenvalues.len(),
        })
    }

    /// The quasi upper triangular factor.
    pub fn t(&self) -> &DynMatrix<T> {
        &self.t
    }

    /// The orthogonal Schur vectors.
    pub fn z(&self) -> &DynMatrix<T> {
        &self.z
    }

    pub fn balance(&self) -> &BalanceDecomp<T> {
        &self.balance
    }

    pub fn b(&self) -> DynMatrix<T> {
        self.balance.b()
    }

    pub fn bx(&self, x: &DynVector<T>) -> Result<DynVector<T>, MatrixError> {
        self.balance.bx(x)
    }

    pub fn binvx(&self, x: &DynVector<T>) -> Result<DynVector<T>, MatrixError> {
        self.balance.binvx(x)
    }

    /// `Z x`.
    pub fn zx(&self, x: &DynVector<T>) -> Result<DynVector<T>, MatrixError> {
        check_len(x, self.order())?;
        Ok(&self.z * x)
    }

    /// `Zᵀ x`.
    pub fn ztx(&self, x: &DynVector<T>) -> Result<DynVector<T>, MatrixError> {
        check_len(x, self.order())?;
        Ok(&self.z.transpose() * x)
    }

    /// Move the eigenvalue (or conjugate pair) at position `from` to position
    /// `to` of the diagonal of `T`, updating `Z` and the eigenvalue list.
    ///
    /// Returns the position actually reached: `to` (adjusted to the start of
    /// a 2×2 block) on success, or where the move stopped because a swap
    /// would have been too ill-conditioned. Fails if the decomposition is not
    /// [`good`](Self::good).
    pub fn move_eigenvalue(&mut self, from: usize, to: usize) -> Result<usize, MatrixError> {
        let n = self.order();
        if !self.good() {
            return Err(MatrixError::CannotSolve { info: 1 });
        }
        for &i in &[from, to] {
            if i >= n {
                return Err(MatrixError::Bounds { i, j: 0, n });
            }
        }
        let reached = self.reorder(from, to);
        self.collect_eigenvalues();
        Ok(reached)
    }

    /// Move the selected eigenvalues to the top left of `T`, keeping their
    /// relative order. Selecting either half of a conjugate pair selects the
    /// pair. Returns `false` if a swap was rejected as ill-conditioned; the
    /// decomposition is still valid, but only partially reordered.
    pub fn move_to_front(&mut self, indices: &[usize]) -> Result<bool, MatrixError> {
        let n = self.order();
        if !self.good() {
            return Err(MatrixError::CannotSolve { info: 1 });
        }
        let mut select = vec![false; n];
        for &i in indices {
            if i >= n {
                return Err(MatrixError::Bounds { i, j: 0, n });
            }
            select[i] = true;
        }

        let mut front = 0;
        let mut k = 0;
        let mut ok = true;
        while k < n {
            let nb = self.block_size(k);
            if select[k] || (nb == 2 && select[k + 1]) {
                if k != front && self.reorder(k, front) != front {
                    log::warn!("SchurDecomp: reordering rejected moving {} to {}", k, front);
                    ok = false;
                    break;
                }
                front += nb;
            }
            k += nb;
        }
        self.collect_eigenvalues();
        Ok(ok)
    }

    fn block_size(&self, i: usize) -> usize {
        if i + 1 < self.order() && self.t[(i + 1, i)] != T::zero() {
            2
        } else {
            1
        }
    }

    fn collect_eigenvalues(&mut self) {
        let n = self.order();
        let t = &self.t;
        let mut ev = Vec::with_capacity(n);
        let mut i = 0;
        while i < n {
            if self.block_size(i) == 2 {
                let (a, b, c, d) = (t[(i, i)], t[(i, i + 1)], t[(i + 1, i)], t[(i + 1, i + 1)]);
                let half: T = real(0.5);
                let mid = (a + d) * half;
                let p = (a - d) * half;
                let im = (-(p * p + b * c)).max(T::zero()).sqrt();
                ev.push(Complex::new(mid, im));
                ev.push(Complex::new(mid, -im));
                i += 2;
            } else {
                ev.push(Complex::new(t[(i, i)], T::zero()));
                i += 1;
            }
        }
        self.eigenvalues = ev;
    }

    /// Split the 2×2 block at `i` into two 1×1 blocks if its eigenvalues
    /// are real.
    fn standardize(&mut self, i: usize) {
        let n = self.order();
        let t = &self.t;
        let (a, b, c, d) = (t[(i, i)], t[(i, i + 1)], t[(i + 1, i)], t[(i + 1, i + 1)]);
        let half: T = real(0.5);
        let p = (a - d) * half;
        let disc = p * p + b * c;
        if disc < T::zero() {
            return;
        }
        let root = disc.sqrt();
        let lambda = (a + d) * half + if p >= T::zero() { root } else { -root };

        // eigenvector for lambda, the better conditioned of two candidates
        let (v0, v1) = {
            let (x0, x1) = (b, lambda - a);
            let (y0, y1) = (lambda - d, c);
            if x0.hypot(x1) >= y0.hypot(y1) {
                (x0, x1)
            } else {
                (y0, y1)
            }
        };
        let r = v0.hypot(v1);
        if r == T::zero() {
            return;
        }
        let (cs, sn) = (v0 / r, v1 / r);
        log::trace!("hqr: 2x2 block at {} split into real eigenvalues", i);
        rotate_rows(&mut self.t, i, i + 1, cs, sn, i..n);
        rotate_cols(&mut self.t, i, i + 1, cs, sn, 0..i + 2);
        rotate_cols(&mut self.z, i, i + 1, cs, sn, 0..n);
        self.t[(i + 1, i)] = T::zero();
    }

    /// Block-wise move of the block containing `from` toward `to` (`trexc`).
    fn reorder(&mut self, from: usize, to: usize) -> usize {
        let n = self.order();
        let mut ifst = from;
        if ifst > 0 && self.t[(ifst, ifst - 1)] != T::zero() {
            ifst -= 1;
        }
        let mut ilst = to;
        if ilst > 0 && self.t[(ilst, ilst - 1)] != T::zero() {
            ilst -= 1;
        }
        let mut nbf = self.block_size(ifst);
        let nbl = self.block_size(ilst);
        if ifst == ilst {
            return ilst;
        }

        let mut here = ifst;
        if ifst < ilst {
            if nbf == 2 && nbl == 1 {
                ilst -= 1;
            }
            if nbf == 1 && nbl == 2 {
                ilst += 1;
            }
            while here < ilst {
                if here + nbf >= n {
                    break;
                }
                let nbnext = self.block_size(here + nbf);
                if !self.swap_blocks(here, nbf, nbnext) {
                    return here;
                }
                here += nbnext;
                nbf = self.block_size(here);
            }
        } else {
            while here > ilst {
                let nbnext = if here >= 2 && self.t[(here - 1, here - 2)] != T::zero() {
                    2
                } else {
                    1
                };
                if !self.swap_blocks(here - nbnext, nbnext, nbf) {
                    return here;
                }
                here -= nbnext;
                nbf = self.block_size(here);
            }
        }
        here
    }

    /// Swap the adjacent diagonal blocks of sizes `n1` and `n2` starting at
    /// `j` (`laexc`). Returns `false`, leaving `T` and `Z` unchanged, if the
    /// swap would be too inaccurate.
    fn swap_blocks(&mut self, j: usize, n1: usize, n2: usize) -> bool {
        let n = self.order();
        log::trace!("trexc: swapping {}x{} and {}x{} blocks at {}", n1, n1, n2, n2, j);

        if n1 == 1 && n2 == 1 {
            let t11 = self.t[(j, j)];
            let t22 = self.t[(j + 1, j + 1)];
            let f = self.t[(j, j + 1)];
            let g = t22 - t11;
            let r = f.hypot(g);
            let (cs, sn) = if r == T::zero() { (T::one(), T::zero()) } else { (f / r, g / r) };
            rotate_rows(&mut self.t, j, j + 1, cs, sn, j + 2..n);
            rotate_cols(&mut self.t, j, j + 1, cs, sn, 0..j);
            self.t[(j, j)] = t22;
            self.t[(j + 1, j + 1)] = t11;
            rotate_cols(&mut self.z, j, j + 1, cs, sn, 0..n);
            return true;
        }

        let nd = n1 + n2;
        let d = DynMatrix::from_fn(nd, nd, |r, c| self.t[(j + r, j + c)]);
        let dnorm = (0..nd)
            .flat_map(|c| (0..nd).map(move |r| (r, c)))
            .fold(T::zero(), |acc, (r, c)| acc.max(d[(r, c)].abs()));
        let eps = T::epsilon();
        let thresh = (real_from_usize::<T>(10) * eps * dnorm).max(T::min_positive_value() / eps);

        // T11 X - X T22 = T12 as a Kronecker system on vec(X)
        let m = n1 * n2;
        let mut k = DynMatrix::zeros(m, m, T::zero());
        let mut rhs = vec![T::zero(); m];
        for q in 0..n2 {
            for p in 0..n1 {
                let row = p + q * n1;
                rhs[row] = d[(p, n1 + q)];
                for s in 0..n1 {
                    k[(row, s + q * n1)] = k[(row, s + q * n1)] + d[(p, s)];
                }
                for s in 0..n2 {
                    k[(row, p + s * n1)] = k[(row, p + s * n1)] - d[(n1 + s, n1 + q)];
                }
            }
        }
        let mut ipiv = vec![0; m];
        if lu_in_place(&mut k, &mut ipiv) > 0 {
            log::trace!("trexc: blocks share an eigenvalue, swap rejected");
            return false;
        }
        lu_solve(&k, &ipiv, &mut rhs);

        // the columns of [-X; I] span the invariant subspace of T22
        let basis = DynMatrix::from_fn(nd, n2, |r, c| {
            if r < n1 {
                T::zero() - rhs[r + c * n1]
            } else if r - n1 == c {
                T::one()
            } else {
                T::zero()
            }
        });
        let q = QrDecomp::new(&basis).q();
        let qt = q.transpose();
        let swapped = &(&qt * &d) * &q;
        let mut resid = T::zero();
        for c in 0..n2 {
            for r in n2..nd {
                resid = resid.max(swapped[(r, c)].abs());
            }
        }
        if resid > thresh {
            log::trace!("trexc: swap rejected, residual {:?} > {:?}", resid, thresh);
            return false;
        }

        // T ← Qᵀ T Q on the affected rows and columns, Z ← Z Q
        let rows = DynMatrix::from_fn(nd, n - j, |r, c| self.t[(j + r, j + c)]);
        let rows = &qt * &rows;
        for r in 0..nd {
            for c in 0..(n - j) {
                self.t[(j + r, j + c)] = rows[(r, c)];
            }
        }
        let cols = DynMatrix::from_fn(j + nd, nd, |r, c| self.t[(r, j + c)]);
        let cols = &cols * &q;
        for r in 0..(j + nd) {
            for c in 0..nd {
                self.t[(r, j + c)] = cols[(r, c)];
            }
        }
        let zc = DynMatrix::from_fn(n, nd, |r, c| self.z[(r, j + c)]);
        let zc = &zc * &q;
        for r in 0..n {
            for c in 0..nd {
                self.z[(r, j + c)] = zc[(r, c)];
            }
        }
        for c in 0..n2 {
            for r in n2..nd {
                self.t[(j + r, j + c)] = T::zero();
            }
        }

        if n2 == 2 {
            self.standardize(j);
        }
        if n1 == 2 {
            self.standardize(j + n2);
        }
        true
    }
}
