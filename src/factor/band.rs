use super::cholesky::{adjoint_via_conj, cholesky_solve, positive_pivot};
use super::{estimate_rcond, inverse_columns, packed_inverse, FactorStatus, Factorization};
use crate::dynmatrix::DynMatrix;
use crate::error::MatrixError;
use crate::packed::{BandMatrix, BandSelfAdjoint, GeneralBand, Layout, Packed};
use crate::traits::LinalgScalar;

/// Banded LU with partial pivoting, in place (`gbtf2`).
///
/// `ab` is band storage with `kl` sub- and `kl + ku` superdiagonals, leading
/// dimension `2 kl + ku + 1`; the top `kl` rows receive the fill-in of `U`.
/// Returns the 1-based position of the first exactly-zero pivot, or 0.
pub(crate) fn band_lu_in_place<T: LinalgScalar>(
    ab: &mut [T],
    n: usize,
    kl: usize,
    ku: usize,
    ipiv: &mut [usize],
) -> usize {
    let kv = kl + ku;
    let ld = 2 * kl + ku + 1;
    let at = |i: usize, j: usize| kv + i - j + j * ld;
    let mut info = 0;
    // last column touched by the row interchanges so far
    let mut ju = 0;

    for j in 0..n {
        let km = kl.min(n - 1 - j);
        let mut jp = 0;
        let mut pmax = ab[at(j, j)].abs1();
        for p in 1..=km {
            let v = ab[at(j + p, j)].abs1();
            if v > pmax {
                pmax = v;
                jp = p;
            }
        }
        ipiv[j] = j + jp;

        if ab[at(j + jp, j)] == T::zero() {
            if info == 0 {
                info = j + 1;
            }
            continue;
        }

        ju = ju.max((j + ku + jp).min(n - 1));
        if jp != 0 {
            log::trace!("gbtf2: column {} pivots on row {}", j, j + jp);
            for c in j..=ju {
                ab.swap(at(j, c), at(j + jp, c));
            }
        }
        if km > 0 {
            let r = T::one() / ab[at(j, j)];
            for p in 1..=km {
                ab[at(j + p, j)] = ab[at(j + p, j)] * r;
            }
            for c in (j + 1)..=ju {
                let t = ab[at(j, c)];
                if t == T::zero() {
                    continue;
                }
                for p in 1..=km {
                    ab[at(j + p, c)] = ab[at(j + p, c)] - ab[at(j + p, j)] * t;
                }
            }
        }
    }
    info
}

/// Factorization of a general banded matrix, `A = P L U`.
///
/// The factors live in a [`BandMatrix`] whose upper bandwidth is widened by
/// the lower one to make room for the fill-in from pivoting.
///
/// ```
/// use structmat::{BandMatrix, BandFact, DynVector, Factorization};
///
/// // [[2, 1, 0], [1, 2, 1], [0, 1, 2]] with one sub- and superdiagonal
/// let mut a = BandMatrix::<f64>::with_bandwidths(3, 3, 1, 1).unwrap();
/// for i in 0..3 {
///     a.set(i, i, 2.0).unwrap();
/// }
/// for i in 0..2 {
///     a.set(i, i + 1, 1.0).unwrap();
///     a.set(i + 1, i, 1.0).unwrap();
/// }
/// let f = BandFact::new(&a, true);
/// assert!(f.good());
/// assert!((f.determinant().unwrap() - 4.0).abs() < 1e-12);
/// let x = f.solve(&DynVector::from_slice(&[1.0, 2.0, 3.0])).unwrap();
/// assert!((x[0] - 0.5).abs() < 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct BandFact<T: LinalgScalar> {
    factors: BandMatrix<T>,
    ipiv: Vec<usize>,
    kl: usize,
    status: FactorStatus,
    rcond: Option<T::Real>,
}

impl<T: LinalgScalar> Default for BandFact<T> {
    fn default() -> Self {
        Self {
            factors: Packed::empty(GeneralBand { lower: 0, upper: 0 }),
            ipiv: Vec::new(),
            kl: 0,
            status: FactorStatus::Unfactored,
            rcond: None,
        }
    }
}

impl<T: LinalgScalar> BandFact<T> {
    pub fn new(a: &BandMatrix<T>, estimate_condition: bool) -> Self {
        let mut f = Self::default();
        f.factor(a, estimate_condition);
        f
    }

    pub fn factor(&mut self, a: &BandMatrix<T>, estimate_condition: bool) {
        let n = a.order();
        let (kl, ku) = (a.lower_bandwidth(), a.upper_bandwidth());
        log::debug!("BandFact: factoring order {} (kl = {}, ku = {})", n, kl, ku);
        let anorm = a.norm_one();

        let layout = GeneralBand {
            lower: kl,
            upper: kl + ku,
        };
        let mut work = vec![T::zero(); layout.len(n)];
        let src = a.data();
        let ld = kl + ku + 1;
        for j in 0..n {
            for i in a.layout().stored_rows(j, n) {
                work[kl + ku + i - j + j * layout.ld()] = src[ku + i - j + j * ld];
            }
        }
        let mut ipiv = vec![0; n];
        let info = band_lu_in_place(&mut work, n, kl, ku, &mut ipiv);

        self.factors = Packed::from_raw(layout, work, n);
        self.ipiv = ipiv;
        self.kl = kl;
        self.status = FactorStatus::from_info(info);
        self.rcond = None;
        if estimate_condition {
            self.rcond = Some(estimate_rcond(&*self, anorm));
        }
        log::debug!("BandFact: info = {}", info);
    }

    /// `U` in the upper band and the multipliers of `L` below it.
    pub fn factors(&self) -> &BandMatrix<T> {
        &self.factors
    }

    pub fn pivots(&self) -> &[usize] {
        &self.ipiv
    }

    #[inline]
    fn at(&self, i: usize, j: usize) -> T {
        let l = self.factors.layout();
        self.factors.data()[l.upper + i - j + j * l.ld()]
    }
}

impl<T: LinalgScalar> Factorization<T> for BandFact<T> {
    type Inverse = DynMatrix<T>;

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
        let n = self.order();
        let kv = self.factors.layout().upper;
        for j in 0..n.saturating_sub(1) {
            let l = self.ipiv[j];
            if l != j {
                b.swap(l, j);
            }
            let bj = b[j];
            for p in 1..=self.kl.min(n - 1 - j) {
                b[j + p] = b[j + p] - self.at(j + p, j) * bj;
            }
        }
        for j in (0..n).rev() {
            b[j] = b[j] / self.at(j, j);
            let bj = b[j];
            for i in j.saturating_sub(kv)..j {
                b[i] = b[i] - self.at(i, j) * bj;
            }
        }
    }

    fn solve_adjoint_in_place(&self, b: &mut [T]) {
        let n = self.order();
        let kv = self.factors.layout().upper;
        for j in 0..n {
            let mut s = b[j];
            for i in j.saturating_sub(kv)..j {
                s = s - self.at(i, j).conj() * b[i];
            }
            b[j] = s / self.at(j, j).conj();
        }
        for j in (0..n.saturating_sub(1)).rev() {
            let mut s = b[j];
            for p in 1..=self.kl.min(n - 1 - j) {
                s = s - self.at(j + p, j).conj() * b[j + p];
            }
            b[j] = s;
            let l = self.ipiv[j];
            if l != j {
                b.swap(l, j);
            }
        }
    }

    /// Product of the `U` diagonal with the sign of the interchanges.
    fn determinant(&self) -> Result<T, MatrixError> {
        if self.status == FactorStatus::Unfactored {
            return Err(MatrixError::CannotSolve { info: -1 });
        }
        let mut det = T::one();
        for (j, &p) in self.ipiv.iter().enumerate() {
            det = det * self.at(j, j);
            if p != j {
                det = T::zero() - det;
            }
        }
        Ok(det)
    }

    fn inverse(&self) -> Result<DynMatrix<T>, MatrixError> {
        inverse_columns(self)
    }
}

/// Banded Cholesky, in place (`pbtf2`, `uplo = 'U'`), over `'U'` band
/// storage with `kd` superdiagonals.
pub(crate) fn band_cholesky_in_place<S: BandSelfAdjoint, T: LinalgScalar>(
    ab: &mut [T],
    n: usize,
    kd: usize,
) -> usize {
    let ld = kd + 1;
    let at = |i: usize, j: usize| kd + i - j + j * ld;
    for j in 0..n {
        let ajj = S::diagonal(ab[at(j, j)]);
        if !positive_pivot(ajj) {
            log::trace!("pbtf2: leading minor {} is not positive definite", j + 1);
            ab[at(j, j)] = ajj;
            return j + 1;
        }
        let ujj = ajj.lsqrt();
        ab[at(j, j)] = ujj;

        let kn = kd.min(n - 1 - j);
        let r = T::one() / ujj;
        for c in (j + 1)..=(j + kn) {
            ab[at(j, c)] = ab[at(j, c)] * r;
        }
        for c in (j + 1)..=(j + kn) {
            let ujc = ab[at(j, c)];
            for i in (j + 1)..=c {
                ab[at(i, c)] = ab[at(i, c)] - S::mirror(ab[at(j, i)]) * ujc;
            }
            ab[at(c, c)] = S::diagonal(ab[at(c, c)]);
        }
    }
    0
}

/// Cholesky factorization of a positive-definite banded matrix.
///
/// Accepts [`SymBandMatrix`](crate::SymBandMatrix) and
/// [`HermBandMatrix`](crate::HermBandMatrix); `U` keeps the half bandwidth
/// of the input.
#[derive(Debug, Clone)]
pub struct PdBandFact<S: BandSelfAdjoint, T: LinalgScalar> {
    factors: Packed<S, T>,
    status: FactorStatus,
    rcond: Option<T::Real>,
}

impl<S: BandSelfAdjoint, T: LinalgScalar> Default for PdBandFact<S, T> {
    fn default() -> Self {
        Self {
            factors: Packed::empty(S::with_bandwidths(0, 0)),
            status: FactorStatus::Unfactored,
            rcond: None,
        }
    }
}

impl<S: BandSelfAdjoint, T: LinalgScalar> PdBandFact<S, T> {
    pub fn new(a: &Packed<S, T>, estimate_condition: bool) -> Self {
        let mut f = Self::default();
        f.factor(a, estimate_condition);
        f
    }

    pub fn factor(&mut self, a: &Packed<S, T>, estimate_condition: bool) {
        let n = a.order();
        let (_, kd) = a.layout().bandwidths();
        log::debug!("PdBandFact<{}>: factoring order {} (kd = {})", S::NAME, n, kd);
        let anorm = a.norm_one();
        let mut factors = a.copy();
        let info = band_cholesky_in_place::<S, T>(factors.data_mut(), n, kd);
        self.factors = factors;
        self.status = FactorStatus::from_info(info);
        self.rcond = None;
        if estimate_condition {
            self.rcond = Some(estimate_rcond(&*self, anorm));
        }
        log::debug!("PdBandFact<{}>: info = {}", S::NAME, info);
    }

    pub fn is_pd(&self) -> bool {
        self.good()
    }

    /// The banded upper factor `U`.
    pub fn factors(&self) -> &Packed<S, T> {
        &self.factors
    }
}

impl<S: BandSelfAdjoint, T: LinalgScalar> Factorization<T> for PdBandFact<S, T> {
    /// The inverse of a band matrix is full, but keeps the mirror rule.
    type Inverse = Packed<S::Full, T>;

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
        let (_, kd) = self.factors.layout().bandwidths();
        let u = self.factors.data();
        cholesky_solve::<S, T>(
            self.order(),
            |i, j| u[kd + i - j + j * (kd + 1)],
            |j| j.saturating_sub(kd),
            b,
        );
    }

    fn solve_adjoint_in_place(&self, b: &mut [T]) {
        adjoint_via_conj::<S, T>(b, |x| self.solve_in_place(x));
    }

    fn determinant(&self) -> Result<T, MatrixError> {
        self.ensure_good()?;
        let p = self.factors.diagonal().into_iter().fold(T::one(), |acc, d| acc * d);
        Ok(p * p)
    }

    fn inverse(&self) -> Result<Packed<S::Full, T>, MatrixError> {
        packed_inverse(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynmatrix::DynVector;
    use crate::packed::{HermBandMatrix, HermMatrix, HermitianBand, SymBandMatrix, SymMatrix};
    use num_complex::Complex;

    fn band_from_rows(n: usize, kl: usize, ku: usize, rows: &[f64]) -> BandMatrix<f64> {
        let mut a = BandMatrix::with_bandwidths(n, n, kl, ku).unwrap();
        for i in 0..n {
            for j in 0..n {
                let v = rows[i * n + j];
                if v != 0.0 {
                    a.set(i, j, v).unwrap();
                }
            }
        }
        a
    }

    fn max_residual(a: &DynMatrix<f64>, x: &DynVector<f64>, b: &[f64]) -> f64 {
        let r = a * x;
        (0..b.len()).map(|i| (r[i] - b[i]).abs()).fold(0.0, f64::max)
    }

    #[test]
    fn band_lu_with_pivoting() {
        // small diagonal forces row interchanges and fill-in
        #[rustfmt::skip]
        let rows = [
            0.1, 2.0, 0.0, 0.0, 0.0,
            3.0, 0.2, 1.0, 0.0, 0.0,
            1.0, 4.0, 0.3, 2.0, 0.0,
            0.0, 1.0, 5.0, 0.4, 1.0,
            0.0, 0.0, 2.0, 6.0, 0.5,
        ];
        let a = band_from_rows(5, 2, 1, &rows);
        let f = BandFact::new(&a, true);
        assert!(f.good());
        assert!(f.pivots().iter().enumerate().any(|(k, &p)| p != k));
        let b = [1.0, -2.0, 3.0, 0.5, 4.0];
        let x = f.solve(&DynVector::from_slice(&b)).unwrap();
        assert!(max_residual(&a.to_dense(), &x, &b) < 1e-10);

        let mut y = b;
        f.solve_adjoint_in_place(&mut y);
        assert!(max_residual(&a.to_dense().transpose(), &DynVector::from_slice(&y), &b) < 1e-10);

        let inv = f.inverse().unwrap();
        let diff = &(&a.to_dense() * &inv) - &DynMatrix::eye(5, 0.0);
        assert!(diff.frobenius_norm() < 1e-10);
    }

    #[test]
    fn band_determinant_matches_dense() {
        #[rustfmt::skip]
        let rows = [
            1.0, 2.0, 0.0,
            3.0, 4.0, 5.0,
            0.0, 6.0, 7.0,
        ];
        let a = band_from_rows(3, 1, 1, &rows);
        let f = BandFact::new(&a, false);
        // 1(28-30) - 2(21-0) = -44
        assert!((f.determinant().unwrap() + 44.0).abs() < 1e-12);
    }

    #[test]
    fn band_singular() {
        let a = band_from_rows(2, 1, 1, &[0.0, 1.0, 0.0, 1.0]);
        let f = BandFact::new(&a, true);
        assert!(f.fail());
        assert_eq!(f.info(), 1);
        assert_eq!(f.determinant().unwrap(), 0.0);
        assert!(matches!(f.inverse(), Err(MatrixError::CannotSolve { .. })));
        assert_eq!(BandFact::<f64>::default().info(), -1);
    }

    #[test]
    fn pd_band_tridiagonal() {
        let mut a = SymBandMatrix::<f64>::with_bandwidth(3, 3, 1).unwrap();
        for i in 0..3 {
            a.set(i, i, 2.0).unwrap();
        }
        a.set(0, 1, 1.0).unwrap();
        a.set(1, 2, 1.0).unwrap();
        let f = PdBandFact::new(&a, true);
        assert!(f.is_pd());
        assert!((f.determinant().unwrap() - 4.0).abs() < 1e-12);
        let x = f.solve(&DynVector::from_slice(&[1.0, 2.0, 3.0])).unwrap();
        assert!((x[0] - 0.5).abs() < 1e-12);
        assert!(x[1].abs() < 1e-12);
        assert!((x[2] - 1.5).abs() < 1e-12);
        let rc = f.condition().unwrap();
        assert!(rc > 0.0 && rc <= 1.0);

        // [[2,1,0],[1,2,1],[0,1,2]]⁻¹ = [[3,-2,1],[-2,4,-2],[1,-2,3]] / 4
        let inv: SymMatrix<f64> = f.inverse().unwrap();
        assert!((inv.value(0, 2).unwrap() - 0.25).abs() < 1e-12);
        assert!((inv.value(2, 0).unwrap() - 0.25).abs() < 1e-12);
        assert!((inv.value(1, 1).unwrap() - 1.0).abs() < 1e-12);
        let prod = &a.to_dense() * &inv.to_dense();
        assert!((&prod - &DynMatrix::eye(3, 0.0)).frobenius_norm() < 1e-12);
    }

    #[test]
    fn pd_band_hermitian_and_failure() {
        let c = |re, im| Complex::new(re, im);
        let mut a = HermBandMatrix::with_bandwidth(2, 2, 1).unwrap();
        a.set(0, 0, c(2.0, 0.0)).unwrap();
        a.set(0, 1, c(1.0, 1.0)).unwrap();
        a.set(1, 1, c(3.0, 0.0)).unwrap();
        let f = PdBandFact::<HermitianBand, _>::new(&a, false);
        assert!(f.good());
        assert!((f.determinant().unwrap() - c(4.0, 0.0)).norm() < 1e-12);
        let inv: HermMatrix<Complex<f64>> = f.inverse().unwrap();
        assert_eq!(inv.value(1, 0).unwrap(), inv.value(0, 1).unwrap().conj());
        let prod = &a.to_dense() * &inv.to_dense();
        assert!((&prod - &DynMatrix::eye(2, c(0.0, 0.0))).frobenius_norm() < 1e-12);

        a.set(1, 1, c(0.5, 0.0)).unwrap();
        let g = PdBandFact::new(&a, false);
        assert!(!g.is_pd());
        assert_eq!(g.info(), 2);
    }
}
