use super::check_len;
use crate::dynmatrix::{DynMatrix, DynVector};
use crate::error::MatrixError;
use crate::traits::{real, FloatScalar};

/// Balancing transform of a square matrix, `A = B A' B⁻¹` with `B = P D`.
///
/// `P` is a permutation that isolates eigenvalues already visible in the
/// structure of `A`, so that `A'` is upper triangular outside the rows and
/// columns `lo..=hi`. `D` is a diagonal scaling by powers of two that makes
/// the rows and columns of that central block comparable in norm (`gebal`).
/// Both steps are exact in floating point.
#[derive(Debug, Clone)]
pub struct BalanceDecomp<T: FloatScalar> {
    balanced: DynMatrix<T>,
    lo: usize,
    hi: usize,
    // swaps[j]: the index interchanged with j, for j outside lo..=hi
    swaps: Vec<usize>,
    scale: Vec<T>,
}

impl<T: FloatScalar> BalanceDecomp<T> {
    /// Balance `a`, optionally permuting and/or scaling.
    pub fn new(a: &DynMatrix<T>, permute: bool, scale: bool) -> Result<Self, MatrixError> {
        if !a.is_square() {
            return Err(MatrixError::Shape {
                rows: a.nrows(),
                cols: a.ncols(),
            });
        }
        let n = a.nrows();
        let mut b = Self {
            balanced: a.clone(),
            lo: 0,
            hi: n.saturating_sub(1),
            swaps: (0..n).collect(),
            scale: vec![T::one(); n],
        };
        if n > 0 {
            if permute {
                b.isolate();
            }
            if scale {
                b.equilibrate()?;
            }
        }
        log::debug!("BalanceDecomp: order {}, lo = {}, hi = {}", n, b.lo, b.hi);
        Ok(b)
    }

    /// Swap index `j` with `m` in the current active window.
    fn exchange(&mut self, j: usize, m: usize) {
        if j == m {
            return;
        }
        let a = &mut self.balanced;
        let n = a.nrows();
        for i in 0..=self.hi {
            let t = a[(i, j)];
            a[(i, j)] = a[(i, m)];
            a[(i, m)] = t;
        }
        for i in self.lo..n {
            let t = a[(j, i)];
            a[(j, i)] = a[(m, i)];
            a[(m, i)] = t;
        }
    }

    fn isolate(&mut self) {
        // rows with no off-diagonal entries in the window go to the bottom
        loop {
            let l = self.hi;
            let a = &self.balanced;
            let found = (0..=l)
                .rev()
                .find(|&j| (0..=l).all(|i| i == j || a[(j, i)] == T::zero()));
            let Some(j) = found else { break };
            log::trace!("gebal: row {} isolated, moved to {}", j, l);
            self.swaps[l] = j;
            self.exchange(j, l);
            if l == 0 {
                return;
            }
            self.hi -= 1;
        }

        // columns with no off-diagonal entries in the window go to the left
        while self.lo < self.hi {
            let (k, l) = (self.lo, self.hi);
            let a = &self.balanced;
            let found = (k..=l).find(|&j| (k..=l).all(|i| i == j || a[(i, j)] == T::zero()));
            let Some(j) = found else { break };
            log::trace!("gebal: column {} isolated, moved to {}", j, k);
            self.swaps[k] = j;
            self.exchange(j, k);
            self.lo += 1;
        }
    }

    fn equilibrate(&mut self) -> Result<(), MatrixError> {
        let radix: T = real(2.0);
        let sqrdx = radix * radix;
        let factor: T = real(0.95);
        let sfmin = T::min_positive_value() / T::epsilon() * radix;
        let sfmax = T::one() / sfmin;
        let (k, l) = (self.lo, self.hi);
        let n = self.balanced.nrows();

        let mut sweeps = 0;
        loop {
            let mut noconv = false;
            for i in k..=l {
                let a = &self.balanced;
                let mut c = T::zero();
                let mut r = T::zero();
                for j in (k..=l).filter(|&j| j != i) {
                    c = c + a[(j, i)].abs();
                    r = r + a[(i, j)].abs();
                }
                if !(c + r).is_finite() {
                    log::debug!("gebal: row/column {} norm is not finite", i);
                    return Err(MatrixError::NotFinite);
                }
                if c == T::zero() || r == T::zero() {
                    continue;
                }
                let s = c + r;
                let mut f = T::one();
                let mut g = r / radix;
                while c < g && f.max(c) < sfmax {
                    f = f * radix;
                    c = c * sqrdx;
                }
                g = r * radix;
                while c >= g && f.min(c) > sfmin {
                    f = f / radix;
                    c = c / sqrdx;
                }
                if (c + r) / f < factor * s {
                    let g = T::one() / f;
                    self.scale[i] = self.scale[i] * f;
                    noconv = true;
                    let a = &mut self.balanced;
                    for j in k..n {
                        a[(i, j)] = a[(i, j)] * g;
                    }
                    for j in 0..=l {
                        a[(j, i)] = a[(j, i)] * f;
                    }
                }
            }
            sweeps += 1;
            if !noconv {
                break;
            }
        }
        log::trace!("gebal: scaling converged after {} sweeps", sweeps);
        Ok(())
    }

    pub fn order(&self) -> usize {
        self.balanced.nrows()
    }

    /// The balanced matrix `A'`.
    pub fn balanced(&self) -> &DynMatrix<T> {
        &self.balanced
    }

    /// First row/column of the central block.
    pub fn lo(&self) -> usize {
        self.lo
    }

    /// Last row/column of the central block (inclusive).
    pub fn hi(&self) -> usize {
        self.hi
    }

    /// Diagonal of `D`; `1` outside the central block.
    pub fn scaling(&self) -> &[T] {
        &self.scale
    }

    /// `B` as a dense matrix.
    pub fn b(&self) -> DynMatrix<T> {
        let n = self.order();
        let mut b = DynMatrix::eye(n, T::zero());
        for j in 0..n {
            self.apply_b(b.col_mut(j));
        }
        b
    }

    /// `B x`.
    pub fn bx(&self, x: &DynVector<T>) -> Result<DynVector<T>, MatrixError> {
        check_len(x, self.order())?;
        let mut y = x.clone();
        self.apply_b(y.as_mut_slice());
        Ok(y)
    }

    /// `B⁻¹ x`.
    pub fn binvx(&self, x: &DynVector<T>) -> Result<DynVector<T>, MatrixError> {
        check_len(x, self.order())?;
        let mut y = x.clone();
        self.apply_binv(y.as_mut_slice());
        Ok(y)
    }

    pub(crate) fn apply_b(&self, x: &mut [T]) {
        let n = self.order();
        if n == 0 {
            return;
        }
        for i in self.lo..=self.hi {
            x[i] = x[i] * self.scale[i];
        }
        for i in (0..self.lo).rev().chain(self.hi + 1..n) {
            x.swap(i, self.swaps[i]);
        }
    }

    pub(crate) fn apply_binv(&self, x: &mut [T]) {
        let n = self.order();
        if n == 0 {
            return;
        }
        for i in (self.hi + 1..n).rev().chain(0..self.lo) {
            x.swap(i, self.swaps[i]);
        }
        for i in self.lo..=self.hi {
            x[i] = x[i] / self.scale[i];
        }
    }
}
