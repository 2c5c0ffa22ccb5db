use num_traits::{Float, One, Zero};

use super::{estimate_rcond, packed_inverse, FactorStatus, Factorization};
use crate::error::MatrixError;
use crate::packed::{Hermitian, Packed, SelfAdjoint, Symmetric, TriangleSelfAdjoint};
use crate::traits::{real, LinalgScalar};

/// One entry of the Bunch-Kaufman pivot record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockPivot {
    /// 1x1 diagonal block; row and column were exchanged with this index.
    Single(usize),
    /// One of the two indices of a 2x2 block; the leading row and column of
    /// the block were exchanged with this index.
    Pair(usize),
}

#[inline]
fn ap(i: usize, j: usize) -> usize {
    i + j * (j + 1) / 2
}

/// Swap rows and columns `kp < kk` of the leading `(kk+1) x (kk+1)` block.
fn interchange<S: SelfAdjoint, T: LinalgScalar>(a: &mut [T], kp: usize, kk: usize) {
    for i in 0..kp {
        a.swap(ap(i, kk), ap(i, kp));
    }
    for j in (kp + 1)..kk {
        let t = S::mirror(a[ap(j, kk)]);
        a[ap(j, kk)] = S::mirror(a[ap(kp, j)]);
        a[ap(kp, j)] = t;
    }
    a[ap(kp, kk)] = S::mirror(a[ap(kp, kk)]);
    let d = S::diagonal(a[ap(kk, kk)]);
    a[ap(kk, kk)] = S::diagonal(a[ap(kp, kp)]);
    a[ap(kp, kp)] = d;
}

/// Bunch-Kaufman diagonal pivoting on an upper packed self-adjoint matrix,
/// in place (`sptrf` / `hptrf`, `uplo = 'U'`).
///
/// On return `a` holds `U` and the block diagonal `D` of `A = U D Uᴴ`
/// (`U D Uᵀ` for symmetric storage). Returns the 1-based index of the first
/// exactly-singular diagonal block, or 0.
pub(crate) fn bunch_kaufman_in_place<S: SelfAdjoint, T: LinalgScalar>(
    a: &mut [T],
    n: usize,
    piv: &mut [BlockPivot],
) -> usize {
    let zero = T::Real::zero();
    let alpha: T::Real = (T::Real::one() + real::<T::Real>(17.0).sqrt()) / real(8.0);
    let mut info = 0;

    // Columns k.. are done; kc is the column being eliminated.
    let mut k = n;
    while k > 0 {
        let kc = k - 1;
        let mut kstep = 1;
        let absakk = S::diagonal(a[ap(kc, kc)]).abs1();

        let mut imax = 0;
        let mut colmax = zero;
        for i in 0..kc {
            let v = a[ap(i, kc)].abs1();
            if v > colmax {
                colmax = v;
                imax = i;
            }
        }

        if absakk.max(colmax) == zero {
            if info == 0 {
                info = k;
            }
            a[ap(kc, kc)] = S::diagonal(a[ap(kc, kc)]);
            piv[kc] = BlockPivot::Single(kc);
            k -= 1;
            continue;
        }

        let kp = if absakk >= alpha * colmax {
            kc
        } else {
            let mut rowmax = zero;
            for j in (imax + 1)..=kc {
                rowmax = rowmax.max(a[ap(imax, j)].abs1());
            }
            for j in 0..imax {
                rowmax = rowmax.max(a[ap(j, imax)].abs1());
            }
            if absakk >= alpha * colmax * (colmax / rowmax) {
                kc
            } else if S::diagonal(a[ap(imax, imax)]).abs1() >= alpha * rowmax {
                imax
            } else {
                kstep = 2;
                imax
            }
        };

        let kk = kc + 1 - kstep;
        if kp != kk {
            log::trace!("bunch-kaufman: {}x{} pivot at {} from {}", kstep, kstep, kk, kp);
            interchange::<S, T>(a, kp, kk);
            if kstep == 2 {
                a.swap(ap(kc - 1, kc), ap(kp, kc));
            }
        }
        a[ap(kc, kc)] = S::diagonal(a[ap(kc, kc)]);
        if kstep == 2 {
            a[ap(kc - 1, kc - 1)] = S::diagonal(a[ap(kc - 1, kc - 1)]);
        }

        if kstep == 1 {
            // A := A - U(k) D(k)⁻¹ U(k)ᴴ over the leading kc x kc block
            let r1 = T::one() / a[ap(kc, kc)];
            for j in 0..kc {
                let t = r1 * S::mirror(a[ap(j, kc)]);
                if t != T::zero() {
                    for i in 0..=j {
                        a[ap(i, j)] = a[ap(i, j)] - a[ap(i, kc)] * t;
                    }
                }
                a[ap(j, j)] = S::diagonal(a[ap(j, j)]);
            }
            for i in 0..kc {
                a[ap(i, kc)] = a[ap(i, kc)] * r1;
            }
            piv[kc] = BlockPivot::Single(kp);
        } else {
            // A := A - [U(k-1) U(k)] D(k)⁻¹ [U(k-1) U(k)]ᴴ
            let d11 = a[ap(kc - 1, kc - 1)];
            let d12 = a[ap(kc - 1, kc)];
            let d22 = a[ap(kc, kc)];
            let det = d11 * d22 - d12 * S::mirror(d12);
            for j in (0..kc - 1).rev() {
                let ajkm1 = a[ap(j, kc - 1)];
                let ajk = a[ap(j, kc)];
                let wkm1 = (d22 * ajkm1 - S::mirror(d12) * ajk) / det;
                let wk = (d11 * ajk - d12 * ajkm1) / det;
                for i in (0..=j).rev() {
                    a[ap(i, j)] = a[ap(i, j)]
                        - a[ap(i, kc)] * S::mirror(wk)
                        - a[ap(i, kc - 1)] * S::mirror(wkm1);
                }
                a[ap(j, kc)] = wk;
                a[ap(j, kc - 1)] = wkm1;
                a[ap(j, j)] = S::diagonal(a[ap(j, j)]);
            }
            piv[kc] = BlockPivot::Pair(kp);
            piv[kc - 1] = BlockPivot::Pair(kp);
        }
        k -= kstep;
    }
    info
}

/// Solve `A x = b` from the factors of [`bunch_kaufman_in_place`].
pub(crate) fn bunch_kaufman_solve<S: SelfAdjoint, T: LinalgScalar>(
    a: &[T],
    n: usize,
    piv: &[BlockPivot],
    b: &mut [T],
) {
    // U D y = b, last block first
    let mut k = n;
    while k > 0 {
        let kc = k - 1;
        match piv[kc] {
            BlockPivot::Single(kp) => {
                if kp != kc {
                    b.swap(kc, kp);
                }
                let bk = b[kc];
                for i in 0..kc {
                    b[i] = b[i] - a[ap(i, kc)] * bk;
                }
                b[kc] = bk / a[ap(kc, kc)];
                k -= 1;
            }
            BlockPivot::Pair(kp) => {
                if kp != kc - 1 {
                    b.swap(kc - 1, kp);
                }
                let bk = b[kc];
                let bkm1 = b[kc - 1];
                for i in 0..kc - 1 {
                    b[i] = b[i] - a[ap(i, kc)] * bk - a[ap(i, kc - 1)] * bkm1;
                }
                let akm1k = a[ap(kc - 1, kc)];
                let akm1 = a[ap(kc - 1, kc - 1)] / akm1k;
                let ak = a[ap(kc, kc)] / S::mirror(akm1k);
                let denom = akm1 * ak - T::one();
                let bkm1 = bkm1 / akm1k;
                let bk = bk / S::mirror(akm1k);
                b[kc - 1] = (ak * bkm1 - bk) / denom;
                b[kc] = (akm1 * bk - bkm1) / denom;
                k -= 2;
            }
        }
    }

    // Uᴴ x = y, first block first
    let mut k = 0;
    while k < n {
        match piv[k] {
            BlockPivot::Single(kp) => {
                let mut s = b[k];
                for i in 0..k {
                    s = s - S::mirror(a[ap(i, k)]) * b[i];
                }
                b[k] = s;
                if kp != k {
                    b.swap(k, kp);
                }
                k += 1;
            }
            BlockPivot::Pair(kp) => {
                let mut s0 = b[k];
                let mut s1 = b[k + 1];
                for i in 0..k {
                    s0 = s0 - S::mirror(a[ap(i, k)]) * b[i];
                    s1 = s1 - S::mirror(a[ap(i, k + 1)]) * b[i];
                }
                b[k] = s0;
                b[k + 1] = s1;
                if kp != k {
                    b.swap(k, kp);
                }
                k += 2;
            }
        }
    }
}

/// Diagonal-pivoting factorization of a symmetric or Hermitian indefinite
/// matrix in packed storage, `A = U D Uᵀ` or `A = U D Uᴴ`.
///
/// `D` is block diagonal with 1x1 and 2x2 blocks; the pivot record says
/// which is which.
///
/// ```
/// use structmat::{SymMatrix, SymFact, DynVector, Factorization};
///
/// let a = SymMatrix::<f64>::from_vec(vec![2.0, 1.0, 2.0, 0.0, 1.0, 2.0], 3, 3).unwrap();
/// let f = SymFact::new(&a, false);
/// let x = f.solve(&DynVector::from_slice(&[1.0, 2.0, 3.0])).unwrap();
/// assert!((x[0] - 0.5).abs() < 1e-12);
/// assert!(x[1].abs() < 1e-12);
/// assert!((x[2] - 1.5).abs() < 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct IndefiniteFact<S: TriangleSelfAdjoint, T: LinalgScalar> {
    factors: Packed<S, T>,
    pivots: Vec<BlockPivot>,
    status: FactorStatus,
    rcond: Option<T::Real>,
}

/// Factorization of a symmetric indefinite matrix.
pub type SymFact<T> = IndefiniteFact<Symmetric, T>;

/// Factorization of a Hermitian indefinite matrix.
pub type HermFact<T> = IndefiniteFact<Hermitian, T>;

impl<S: TriangleSelfAdjoint, T: LinalgScalar> Default for IndefiniteFact<S, T> {
    fn default() -> Self {
        Self {
            factors: Packed::empty(S::default()),
            pivots: Vec::new(),
            status: FactorStatus::Unfactored,
            rcond: None,
        }
    }
}

impl<S: TriangleSelfAdjoint, T: LinalgScalar> IndefiniteFact<S, T> {
    pub fn new(a: &Packed<S, T>, estimate_condition: bool) -> Self {
        let mut f = Self::default();
        f.factor(a, estimate_condition);
        f
    }

    /// Replace the content with the factorization of `a`.
    pub fn factor(&mut self, a: &Packed<S, T>, estimate_condition: bool) {
        let n = a.order();
        log::debug!("{}: factoring order {}", S::NAME, n);
        let anorm = a.norm_one();

        let mut factors = a.copy();
        let mut pivots = vec![BlockPivot::Single(0); n];
        let info = bunch_kaufman_in_place::<S, T>(factors.data_mut(), n, &mut pivots);

        self.factors = factors;
        self.pivots = pivots;
        self.status = FactorStatus::from_info(info);
        self.rcond = None;
        if estimate_condition {
            self.rcond = Some(estimate_rcond(&*self, anorm));
        }
        log::debug!("{}: info = {}", S::NAME, info);
    }

    /// Packed `U` and `D`.
    pub fn factors(&self) -> &Packed<S, T> {
        &self.factors
    }

    pub fn pivots(&self) -> &[BlockPivot] {
        &self.pivots
    }
}

impl<S: TriangleSelfAdjoint, T: LinalgScalar> Factorization<T> for IndefiniteFact<S, T> {
    type Inverse = Packed<S, T>;

    fn order(&self) -> usize {
        self.factors.order()
    }

    fn status(&self) -> FactorStatus {
        self.status
    }

    fn rcond(&self) -> Option<T::Real> {
        self.rcond
    }

    fn solve_in_place(&self, b: &mut [T]) {
        bunch_kaufman_solve::<S, T>(self.factors.data(), self.order(), &self.pivots, b);
    }

    fn solve_adjoint_in_place(&self, b: &mut [T]) {
        if S::CONJUGATE {
            self.solve_in_place(b);
        } else {
            // Aᴴ = conj(A) for symmetric A
            b.iter_mut().for_each(|x| *x = x.conj());
            self.solve_in_place(b);
            b.iter_mut().for_each(|x| *x = x.conj());
        }
    }

    /// Product of the block determinants, last block first; a 2x2 block
    /// `[a b; b' c]` contributes `a c - b b'`.
    fn determinant(&self) -> Result<T, MatrixError> {
        if self.status == FactorStatus::Unfactored {
            return Err(MatrixError::CannotSolve { info: -1 });
        }
        let a = self.factors.data();
        let mut det = T::one();
        let mut k = self.order();
        while k > 0 {
            let kc = k - 1;
            match self.pivots[kc] {
                BlockPivot::Single(_) => {
                    det = det * a[ap(kc, kc)];
                    k -= 1;
                }
                BlockPivot::Pair(_) => {
                    let b = a[ap(kc - 1, kc)];
                    det = det * (a[ap(kc - 1, kc - 1)] * a[ap(kc, kc)] - b * S::mirror(b));
                    k -= 2;
                }
            }
        }
        Ok(det)
    }

    /// Inverse in the same packed shape.
    fn inverse(&self) -> Result<Packed<S, T>, MatrixError> {
        packed_inverse(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynmatrix::{DynMatrix, DynVector};
    use crate::packed::{HermMatrix, SymMatrix};
    use num_complex::Complex;

    fn residual<S: TriangleSelfAdjoint>(a: &Packed<S, f64>, b: &[f64]) -> f64 {
        let f = IndefiniteFact::new(a, false);
        assert!(f.good());
        let x = f.solve(&DynVector::from_slice(b)).unwrap();
        let r = &a.to_dense() * &x;
        r.as_slice()
            .iter()
            .zip(b)
            .map(|(ri, bi)| (ri - bi).abs())
            .fold(0.0, f64::max)
    }

    #[test]
    fn tridiagonal_spd_system() {
        let a = SymMatrix::from_dense(&DynMatrix::from_rows(
            3,
            3,
            &[2.0, 1.0, 0.0, 1.0, 2.0, 1.0, 0.0, 1.0, 2.0],
        ))
        .unwrap();
        let f = SymFact::new(&a, true);
        assert!(f.good());
        let x = f.solve(&DynVector::from_slice(&[1.0, 2.0, 3.0])).unwrap();
        assert!((x[0] - 0.5).abs() < 1e-12);
        assert!(x[1].abs() < 1e-12);
        assert!((x[2] - 1.5).abs() < 1e-12);
        assert!((f.determinant().unwrap() - 4.0).abs() < 1e-12);
        let rc = f.condition().unwrap();
        assert!(rc > 0.0 && rc <= 1.0);
    }

    #[test]
    fn two_by_two_pivot() {
        let a = SymMatrix::from_vec(vec![0.0, 1.0, 0.0], 2, 2).unwrap();
        let f = SymFact::new(&a, false);
        assert!(f.good());
        assert_eq!(f.pivots(), &[BlockPivot::Pair(0), BlockPivot::Pair(0)]);
        assert!((f.determinant().unwrap() + 1.0).abs() < 1e-12);
        let x = f.solve(&DynVector::from_slice(&[3.0, 5.0])).unwrap();
        assert!((x[0] - 5.0).abs() < 1e-12);
        assert!((x[1] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn interchange_one_by_one() {
        let a = SymMatrix::from_dense(&DynMatrix::from_rows(
            3,
            3,
            &[4.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 0.01],
        ))
        .unwrap();
        let f = SymFact::new(&a, false);
        assert_eq!(f.pivots()[2], BlockPivot::Single(0));
        assert!(residual(&a, &[1.0, -1.0, 2.0]) < 1e-10);
        // det = 4*1*0.01 - 1*1*1 = -0.96
        assert!((f.determinant().unwrap() + 0.96).abs() < 1e-12);
    }

    #[test]
    fn indefinite_four_by_four() {
        let a = SymMatrix::from_dense(&DynMatrix::from_rows(
            4,
            4,
            &[
                0.0, 2.0, 1.0, 3.0, //
                2.0, 0.0, 4.0, 1.0, //
                1.0, 4.0, 0.0, 2.0, //
                3.0, 1.0, 2.0, 0.0,
            ],
        ))
        .unwrap();
        assert!(residual(&a, &[1.0, 2.0, 3.0, 4.0]) < 1e-10);

        let f = SymFact::new(&a, false);
        let inv = f.inverse().unwrap().to_dense();
        let id = &a.to_dense() * &inv;
        let diff = &id - &DynMatrix::eye(4, 0.0);
        assert!(diff.frobenius_norm() < 1e-10);
    }

    #[test]
    fn hermitian_determinant() {
        let c = |re, im| Complex::new(re, im);
        let a = HermMatrix::from_vec(vec![c(2.0, 0.0), c(1.0, 1.0), c(3.0, 0.0)], 2, 2).unwrap();
        let f = HermFact::new(&a, true);
        assert!(f.good());
        let det = f.determinant().unwrap();
        assert!((det - c(4.0, 0.0)).norm() < 1e-12);
        let inv = f.inverse().unwrap();
        // inverse of [[2, 1+i], [1-i, 3]] is [[3, -1-i], [-1+i, 2]] / 4
        assert!((inv.value(0, 0).unwrap() - c(0.75, 0.0)).norm() < 1e-12);
        assert!((inv.value(0, 1).unwrap() - c(-0.25, -0.25)).norm() < 1e-12);
        assert!((inv.value(1, 0).unwrap() - c(-0.25, 0.25)).norm() < 1e-12);
    }

    #[test]
    fn complex_symmetric_adjoint_solve() {
        let c = |re, im| Complex::new(re, im);
        let a = SymMatrix::from_vec(vec![c(1.0, 1.0), c(2.0, -1.0), c(0.0, 3.0)], 2, 2).unwrap();
        let f = SymFact::new(&a, true);
        let b = [c(1.0, 0.0), c(0.0, 2.0)];
        let mut x = b;
        f.solve_adjoint_in_place(&mut x);
        let ah = a.to_dense().adjoint();
        let r = &ah * &DynVector::from_slice(&x);
        for i in 0..2 {
            assert!((r[i] - b[i]).norm() < 1e-12);
        }
    }

    #[test]
    fn singular_zero_column() {
        let a = SymMatrix::from_vec(vec![1.0, 0.0, 0.0], 2, 2).unwrap();
        let f = SymFact::new(&a, true);
        assert!(f.fail());
        assert_eq!(f.info(), 2);
        assert_eq!(f.condition().unwrap(), 0.0);
        assert_eq!(f.determinant().unwrap(), 0.0);
        assert!(matches!(f.inverse(), Err(MatrixError::CannotSolve { info: 2 })));
    }

    #[test]
    fn input_is_not_aliased() {
        let a = SymMatrix::from_vec(vec![4.0, 1.0, 3.0], 2, 2).unwrap();
        let f = SymFact::new(&a, false);
        assert!(!f.factors().shares_storage_with(&a));
        assert_eq!(a.data(), &[4.0, 1.0, 3.0]);
    }
}
