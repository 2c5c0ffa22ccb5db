use num_traits::{Float, Zero};

use super::{estimate_rcond, packed_inverse, FactorStatus, Factorization};
use crate::error::MatrixError;
use crate::packed::{Packed, SelfAdjoint, TriangleSelfAdjoint};
use crate::traits::LinalgScalar;

#[inline]
fn ap(i: usize, j: usize) -> usize {
    i + j * (j + 1) / 2
}

/// A pivot passes when its real part is positive and finite.
#[inline]
pub(crate) fn positive_pivot<T: LinalgScalar>(x: T) -> bool {
    let re = x.re();
    re > T::Real::zero() && re.is_finite()
}

/// Cholesky factorization `A = Uᴴ U` of upper packed storage, in place
/// (`pptrf`, `uplo = 'U'`). Returns the 1-based order of the first leading
/// minor that is not positive definite, or 0.
pub(crate) fn cholesky_in_place<S: SelfAdjoint, T: LinalgScalar>(a: &mut [T], n: usize) -> usize {
    for j in 0..n {
        // Uᴴ(0..j, 0..j) u = a(0..j, j)
        for i in 0..j {
            let mut s = a[ap(i, j)];
            for k in 0..i {
                s = s - S::mirror(a[ap(k, i)]) * a[ap(k, j)];
            }
            a[ap(i, j)] = s / a[ap(i, i)];
        }
        let mut ajj = S::diagonal(a[ap(j, j)]);
        for k in 0..j {
            ajj = ajj - S::mirror(a[ap(k, j)]) * a[ap(k, j)];
        }
        let ajj = S::diagonal(ajj);
        if !positive_pivot(ajj) {
            log::trace!("pptrf: leading minor {} is not positive definite", j + 1);
            a[ap(j, j)] = ajj;
            return j + 1;
        }
        a[ap(j, j)] = ajj.lsqrt();
    }
    0
}

/// Solve `Uᴴ U x = b` where `u(i, j)` reads the factor and `first(j)` is the
/// first stored row of column `j`.
pub(crate) fn cholesky_solve<S: SelfAdjoint, T: LinalgScalar>(
    n: usize,
    u: impl Fn(usize, usize) -> T,
    first: impl Fn(usize) -> usize,
    b: &mut [T],
) {
    for j in 0..n {
        let mut s = b[j];
        for i in first(j)..j {
            s = s - S::mirror(u(i, j)) * b[i];
        }
        b[j] = s / S::mirror(u(j, j));
    }
    for j in (0..n).rev() {
        b[j] = b[j] / u(j, j);
        let bj = b[j];
        for i in first(j)..j {
            b[i] = b[i] - u(i, j) * bj;
        }
    }
}

/// Solve `Aᴴ x = b`; symmetric storage goes through `Aᴴ = conj(A)`.
pub(crate) fn adjoint_via_conj<S: SelfAdjoint, T: LinalgScalar>(b: &mut [T], solve: impl Fn(&mut [T])) {
    if S::CONJUGATE {
        solve(b);
    } else {
        b.iter_mut().for_each(|x| *x = x.conj());
        solve(b);
        b.iter_mut().for_each(|x| *x = x.conj());
    }
}

/// Cholesky factorization of a positive-definite matrix in packed storage.
///
/// Works on [`SymMatrix`](crate::SymMatrix) and
/// [`HermMatrix`](crate::HermMatrix). A matrix that turns out not to be
/// positive definite leaves the factorization in the failed state with the
/// order of the offending leading minor as `info`.
#[derive(Debug, Clone)]
pub struct PdFact<S: TriangleSelfAdjoint, T: LinalgScalar> {
    factors: Packed<S, T>,
    status: FactorStatus,
    rcond: Option<T::Real>,
}

impl<S: TriangleSelfAdjoint, T: LinalgScalar> Default for PdFact<S, T> {
    fn default() -> Self {
        Self {
            factors: Packed::empty(S::default()),
            status: FactorStatus::Unfactored,
            rcond: None,
        }
    }
}

impl<S: TriangleSelfAdjoint, T: LinalgScalar> PdFact<S, T> {
    pub fn new(a: &Packed<S, T>, estimate_condition: bool) -> Self {
        let mut f = Self::default();
        f.factor(a, estimate_condition);
        f
    }

    pub fn factor(&mut self, a: &Packed<S, T>, estimate_condition: bool) {
        let n = a.order();
        log::debug!("PdFact<{}>: factoring order {}", S::NAME, n);
        let anorm = a.norm_one();
        let mut factors = a.copy();
        let info = cholesky_in_place::<S, T>(factors.data_mut(), n);
        self.factors = factors;
        self.status = FactorStatus::from_info(info);
        self.rcond = None;
        if estimate_condition {
            self.rcond = Some(estimate_rcond(&*self, anorm));
        }
        log::debug!("PdFact<{}>: info = {}", S::NAME, info);
    }

    /// Whether the factored matrix was positive definite.
    pub fn is_pd(&self) -> bool {
        self.good()
    }

    /// The upper Cholesky factor `U`, packed.
    pub fn factors(&self) -> &Packed<S, T> {
        &self.factors
    }
}

impl<S: TriangleSelfAdjoint, T: LinalgScalar> Factorization<T> for PdFact<S, T> {
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
        let u = self.factors.data();
        cholesky_solve::<S, T>(self.order(), |i, j| u[ap(i, j)], |_| 0, b);
    }

    fn solve_adjoint_in_place(&self, b: &mut [T]) {
        adjoint_via_conj::<S, T>(b, |x| self.solve_in_place(x));
    }

    /// Square of the product of the diagonal of `U`.
    fn determinant(&self) -> Result<T, MatrixError> {
        self.ensure_good()?;
        let u = self.factors.data();
        let p = (0..self.order()).fold(T::one(), |acc, i| acc * u[ap(i, i)]);
        Ok(p * p)
    }

    fn inverse(&self) -> Result<Packed<S, T>, MatrixError> {
        packed_inverse(self)
    }
}
