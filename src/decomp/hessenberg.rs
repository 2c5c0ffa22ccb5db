use super::{check_len, householder, reflect, BalanceDecomp};
use crate::dynmatrix::{DynMatrix, DynVector};
use crate::error::MatrixError;
use crate::traits::FloatScalar;

/// Reduce rows/columns `lo..=hi` of `a` to upper Hessenberg form with
/// Householder similarity transforms, `Qᵀ A Q = H`, accumulating into `q`.
///
/// Outside `lo..=hi` the matrix must already be upper triangular, as it is
/// after balancing.
pub(crate) fn hessenberg_in_place<T: FloatScalar>(
    a: &mut DynMatrix<T>,
    q: &mut DynMatrix<T>,
    lo: usize,
    hi: usize,
) {
    let n = a.nrows();
    for k in lo..hi.saturating_sub(1) {
        let tau = householder(&mut a.col_mut(k)[k + 1..=hi]);
        if tau == T::zero() {
            continue;
        }
        let tail: Vec<T> = a.col(k)[k + 2..=hi].to_vec();

        // H A
        for j in (k + 1)..n {
            reflect(&mut a.col_mut(j)[k + 1..=hi], &tail, tau);
        }
        // (H A) H, and Q H
        for i in 0..n {
            reflect_row(a, i, k + 1, &tail, tau);
            reflect_row(q, i, k + 1, &tail, tau);
        }

        for i in (k + 2)..=hi {
            a[(i, k)] = T::zero();
        }
    }
}

/// Row `i` of `m`, columns `c..c + tail.len() + 1`, times `I - τ v vᵀ`.
fn reflect_row<T: FloatScalar>(m: &mut DynMatrix<T>, i: usize, c: usize, tail: &[T], tau: T) {
    let mut dot = m[(i, c)];
    for (p, &v) in tail.iter().enumerate() {
        dot = dot + m[(i, c + 1 + p)] * v;
    }
    dot = dot * tau;
    m[(i, c)] = m[(i, c)] - dot;
    for (p, &v) in tail.iter().enumerate() {
        m[(i, c + 1 + p)] = m[(i, c + 1 + p)] - dot * v;
    }
}

/// Hessenberg decomposition of a balanced matrix, `A = B Q H Qᵀ B⁻¹`.
///
/// ```
/// use structmat::{DynMatrix, HessenbergDecomp};
///
/// let a = DynMatrix::from_rows(4, 4, &[
///     1.0_f64, 2.0, 3.0, 4.0,
///     5.0, 6.0, 7.0, 8.0,
///     9.0, 10.0, 11.0, 12.0,
///     13.0, 14.0, 15.0, 16.0,
/// ]);
/// let hess = HessenbergDecomp::new(&a).unwrap();
/// assert!(hess.h()[(3, 0)].abs() < 1e-12);
/// assert!(hess.h()[(3, 1)].abs() < 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct HessenbergDecomp<T: FloatScalar> {
    balance: BalanceDecomp<T>,
    h: DynMatrix<T>,
    q: DynMatrix<T>,
}

impl<T: FloatScalar> HessenbergDecomp<T> {
    /// Balance (permute and scale) `a`, then reduce it.
    pub fn new(a: &DynMatrix<T>) -> Result<Self, MatrixError> {
        Ok(Self::from_balance(BalanceDecomp::new(a, true, true)?))
    }

    /// Reduce an already balanced matrix, taking over the balance.
    pub fn from_balance(balance: BalanceDecomp<T>) -> Self {
        let n = balance.order();
        log::debug!("HessenbergDecomp: order {}", n);
        let mut h = balance.balanced().clone();
        let mut q = DynMatrix::eye(n, T::zero());
        if n > 0 {
            hessenberg_in_place(&mut h, &mut q, balance.lo(), balance.hi());
        }
        Self { balance, h, q }
    }

    pub fn order(&self) -> usize {
        self.h.nrows()
    }

    /// The upper Hessenberg factor.
    pub fn h(&self) -> &DynMatrix<T> {
        &self.h
    }

    /// The orthogonal factor.
    pub fn q(&self) -> &DynMatrix<T> {
        &self.q
    }

    pub fn balance(&self) -> &BalanceDecomp<T> {
        &self.balance
    }

    /// The balancing transform `B`.
    pub fn b(&self) -> DynMatrix<T> {
        self.balance.b()
    }

    pub fn bx(&self, x: &DynVector<T>) -> Result<DynVector<T>, MatrixError> {
        self.balance.bx(x)
    }

    pub fn binvx(&self, x: &DynVector<T>) -> Result<DynVector<T>, MatrixError> {
        self.balance.binvx(x)
    }

    /// `Q x`.
    pub fn qx(&self, x: &DynVector<T>) -> Result<DynVector<T>, MatrixError> {
        check_len(x, self.order())?;
        Ok(&self.q * x)
    }

    /// `Qᵀ x`.
    pub fn qtx(&self, x: &DynVector<T>) -> Result<DynVector<T>, MatrixError> {
        check_len(x, self.order())?;
        Ok(&self.q.transpose() * x)
    }

    pub(crate) fn into_parts(self) -> (BalanceDecomp<T>, DynMatrix<T>, DynMatrix<T>) {
        (self.balance, self.h, self.q)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-10;

    fn assert_hessenberg(h: &DynMatrix<f64>) {
        let n = h.nrows();
        for i in 0..n {
            for j in 0..i.saturating_sub(1) {
                assert!(h[(i, j)].abs() < TOL, "H[({},{})] = {}", i, j, h[(i, j)]);
            }
        }
    }

    fn rebuild(hess: &HessenbergDecomp<f64>) -> DynMatrix<f64> {
        let n = hess.order();
        let q = hess.q();
        let inner = &(q * hess.h()) * &q.transpose();
        let b = hess.b();
        let binv = DynMatrix::from_fn(n, n, |i, j| {
            let mut e = DynVector::zeros(n, 0.0);
            e[j] = 1.0;
            hess.binvx(&e).unwrap()[i]
        });
        &(&b * &inner) * &binv
    }

    #[test]
    fn unbalanced_3x3() {
        let a = DynMatrix::from_rows(3, 3, &[4.0, 1.0, -2.0, 1.0, 2.0, 0.0, -2.0, 0.0, 3.0]);
        let bal = BalanceDecomp::new(&a, false, false).unwrap();
        let hess = HessenbergDecomp::from_balance(bal);
        assert_hessenberg(hess.h());
        let q = hess.q();
        let qtaq = &(&q.transpose() * &a) * q;
        assert!((&qtaq - hess.h()).frobenius_norm() < TOL);
        let qtq = &q.transpose() * q;
        assert!((&qtq - &DynMatrix::eye(3, 0.0)).frobenius_norm() < TOL);
    }

    #[test]
    fn balanced_4x4() {
        let a = DynMatrix::from_rows(
            4,
            4,
            &[
                1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0, 13.0, 14.0, 15.0,
                16.0,
            ],
        );
        let hess = HessenbergDecomp::new(&a).unwrap();
        assert_hessenberg(hess.h());
        assert!((&rebuild(&hess) - &a).frobenius_norm() < 1e-9);
    }

    #[test]
    fn isolated_eigenvalues_are_kept() {
        let a = DynMatrix::from_rows(
            4,
            4,
            &[
                2.0, 1.0, 3.0, 1.0, 0.0, 5.0, 0.0, 0.0, 1.0, 4.0, 1.0, 2.0, 3.0, 1.0, 1.0, 6.0,
            ],
        );
        let hess = HessenbergDecomp::new(&a).unwrap();
        assert!(hess.balance().hi() < 3);
        assert_hessenberg(hess.h());
        assert!((&rebuild(&hess) - &a).frobenius_norm() < 1e-9);
    }

    #[test]
    fn vector_products() {
        let a = DynMatrix::<f64>::from_rows(3, 3, &[1.0, 2.0, 0.5, 3.0, 1.0, 2.0, 1.0, 1.0, 1.0]);
        let hess = HessenbergDecomp::new(&a).unwrap();
        let x = DynVector::from_slice(&[1.0, 2.0, 3.0]);
        let y = hess.qtx(&hess.qx(&x).unwrap()).unwrap();
        for i in 0..3 {
            assert!((y[i] - x[i]).abs() < TOL);
        }
        assert!(matches!(
            hess.qx(&DynVector::zeros(2, 0.0)),
            Err(MatrixError::Dimension { expected: 3, got: 2 })
        ));
        assert!(HessenbergDecomp::new(&DynMatrix::zeros(2, 3, 0.0)).is_err());
    }
}
