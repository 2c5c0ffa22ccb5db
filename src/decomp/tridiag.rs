use core::marker::PhantomData;

use num_traits::{Float, Zero};

use super::{check_len, householder, reflect};
use crate::dynmatrix::{DynMatrix, DynVector};
use crate::error::MatrixError;
use crate::packed::{
    HermBandMatrix, HermMatrix, Layout, Packed, SymBandMatrix, SymMatrix, TriDiagMatrix, TriDiagonal,
};
use crate::traits::{FloatScalar, LinalgScalar};

/// Reduction of a symmetric or Hermitian matrix to real symmetric
/// tridiagonal form, `A = Q T Qᴴ`.
pub trait TriDiagDecomp<T: LinalgScalar> {
    /// Order of `A` and `T`.
    fn rows(&self) -> usize;

    /// Diagonal of `T`.
    fn diagonal(&self) -> &[T::Real];

    /// Subdiagonal (equal to the superdiagonal) of `T`, length `n - 1`.
    fn off_diagonal(&self) -> &[T::Real];

    /// `T` in tridiagonal storage.
    fn tridiagonal(&self) -> TriDiagMatrix<T::Real> {
        let n = self.rows();
        let mut data = vec![<T::Real as Zero>::zero(); 3 * n];
        for (i, &d) in self.diagonal().iter().enumerate() {
            data[1 + 3 * i] = d;
        }
        for (i, &e) in self.off_diagonal().iter().enumerate() {
            data[2 + 3 * i] = e;
            data[3 + 3 * i] = e;
        }
        Packed::from_raw(TriDiagonal, data, n)
    }
}

/// A tridiagonal reduction that kept `Q`.
pub trait TriDiagTransform<T: LinalgScalar>: TriDiagDecomp<T> {
    /// The unitary factor.
    fn q(&self) -> &DynMatrix<T>;

    /// `Q x`.
    fn transform(&self, x: &DynVector<T>) -> Result<DynVector<T>, MatrixError> {
        check_len(x, self.rows())?;
        Ok(self.q() * x)
    }

    /// `Q C`, e.g. eigenvectors of `T` to eigenvectors of `A`.
    fn transform_matrix(&self, c: &DynMatrix<T>) -> Result<DynMatrix<T>, MatrixError> {
        if c.nrows() != self.rows() {
            return Err(MatrixError::Dimension {
                expected: self.rows(),
                got: c.nrows(),
            });
        }
        Ok(self.q() * c)
    }
}

/// Make the off-diagonal of a Hermitian tridiagonal with diagonal `diag`
/// and subdiagonal `sub` real and nonnegative by a diagonal unitary
/// similarity, folded into the columns of `q` if given.
fn real_tridiagonal<T: LinalgScalar>(
    diag: &[T],
    sub: &[T],
    q: Option<&mut DynMatrix<T>>,
) -> (Vec<T::Real>, Vec<T::Real>) {
    let d: Vec<T::Real> = diag.iter().map(|x| x.re()).collect();
    let mut e = Vec::with_capacity(sub.len());
    let mut phase = vec![T::one(); diag.len()];
    for (k, &s) in sub.iter().enumerate() {
        let m = s.modulus();
        e.push(m);
        phase[k + 1] = if m == <T::Real as Zero>::zero() {
            phase[k]
        } else {
            phase[k] * (s / T::from_real(m))
        };
    }
    if let Some(q) = q {
        for (j, &p) in phase.iter().enumerate() {
            if p != T::one() {
                for x in q.col_mut(j) {
                    *x = *x * p;
                }
            }
        }
    }
    (d, e)
}

/// Tridiagonal reduction of a dense symmetric or Hermitian matrix by
/// Householder reflectors (`sytrd`/`hetrd`), always keeping `Q`.
///
/// ```
/// use structmat::{DenseTriDiagDecomp, SymMatrix, TriDiagDecomp, TriDiagTransform};
///
/// let mut a = SymMatrix::<f64>::new(3, 3).unwrap();
/// a.set(0, 0, 4.0).unwrap();
/// a.set(0, 1, 1.0).unwrap();
/// a.set(0, 2, -2.0).unwrap();
/// a.set(1, 1, 2.0).unwrap();
/// a.set(2, 2, 3.0).unwrap();
/// let td = DenseTriDiagDecomp::from_symmetric(&a);
/// let trace: f64 = td.diagonal().iter().sum();
/// assert!((trace - 9.0).abs() < 1e-12);
/// assert_eq!(td.q().nrows(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct DenseTriDiagDecomp<T: LinalgScalar> {
    diag: Vec<T::Real>,
    off: Vec<T::Real>,
    q: DynMatrix<T>,
}

impl<T: LinalgScalar> DenseTriDiagDecomp<T> {
    pub fn new(a: &HermMatrix<T>) -> Self {
        Self::reduce(a.to_dense())
    }

    fn reduce(mut a: DynMatrix<T>) -> Self {
        let n = a.nrows();
        log::debug!("DenseTriDiagDecomp: order {}", n);
        let mut q = DynMatrix::eye(n, T::zero());

        for k in 0..n.saturating_sub(2) {
            let tau = householder(&mut a.col_mut(k)[k + 1..]);
            let beta = a[(k + 1, k)];
            a[(k, k + 1)] = beta.conj();
            for i in (k + 2)..n {
                a[(k, i)] = T::zero();
            }
            if tau == T::zero() {
                continue;
            }
            let tail: Vec<T> = a.col(k)[k + 2..].to_vec();
            for i in (k + 2)..n {
                a[(i, k)] = T::zero();
            }

            // H A H on the trailing block, Q H
            for j in (k + 1)..n {
                reflect(&mut a.col_mut(j)[k + 1..], &tail, tau);
            }
            for i in (k + 1)..n {
                reflect_row(&mut a, i, k + 1, &tail, tau);
            }
            for i in 0..n {
                reflect_row(&mut q, i, k + 1, &tail, tau);
            }
        }

        let diag: Vec<T> = (0..n).map(|i| a[(i, i)]).collect();
        let sub: Vec<T> = (1..n).map(|i| a[(i, i - 1)]).collect();
        let (diag, off) = real_tridiagonal(&diag, &sub, Some(&mut q));
        Self { diag, off, q }
    }
}

impl<R: FloatScalar> DenseTriDiagDecomp<R> {
    /// Real symmetric input; `Q` is orthogonal.
    pub fn from_symmetric(a: &SymMatrix<R>) -> Self {
        Self::reduce(a.to_dense())
    }
}

impl<T: LinalgScalar> TriDiagDecomp<T> for DenseTriDiagDecomp<T> {
    fn rows(&self) -> usize {
        self.diag.len()
    }

    fn diagonal(&self) -> &[T::Real] {
        &self.diag
    }

    fn off_diagonal(&self) -> &[T::Real] {
        &self.off
    }
}

impl<T: LinalgScalar> TriDiagTransform<T> for DenseTriDiagDecomp<T> {
    fn q(&self) -> &DynMatrix<T> {
        &self.q
    }
}

/// Row `i` of `m`, columns `c..`, times `I - τ v vᴴ` with `v = [1, tail]`.
fn reflect_row<T: LinalgScalar>(m: &mut DynMatrix<T>, i: usize, c: usize, tail: &[T], tau: T) {
    let mut dot = m[(i, c)];
    for (p, &v) in tail.iter().enumerate() {
        dot = dot + m[(i, c + 1 + p)] * v;
    }
    dot = dot * tau;
    m[(i, c)] = m[(i, c)] - dot;
    for (p, &v) in tail.iter().enumerate() {
        m[(i, c + 1 + p)] = m[(i, c + 1 + p)] - dot * v.conj();
    }
}

/// Whether a band reduction accumulates `Q`.
pub trait QPolicy {
    const KEEP: bool;
}

/// Keep `Q`; the decomposition implements [`TriDiagTransform`].
#[derive(Debug, Clone, Copy, Default)]
pub struct KeepQ;

/// Discard `Q`; only `T` is available.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardQ;

impl QPolicy for KeepQ {
    const KEEP: bool = true;
}

impl QPolicy for DiscardQ {
    const KEEP: bool = false;
}

/// Tridiagonal reduction of a banded symmetric or Hermitian matrix by
/// Givens rotations and bulge chasing (`sbtrd`/`hbtrd`).
///
/// With [`DiscardQ`] the rotations are not accumulated and the result has no
/// [`transform`](TriDiagTransform::transform).
#[derive(Debug, Clone)]
pub struct BandTriDiagDecomp<T: LinalgScalar, Q: QPolicy = KeepQ> {
    diag: Vec<T::Real>,
    off: Vec<T::Real>,
    q: DynMatrix<T>,
    _policy: PhantomData<Q>,
}

impl<T: LinalgScalar> BandTriDiagDecomp<T, KeepQ> {
    pub fn new(a: &HermBandMatrix<T>) -> Self {
        Self::reduce(a, a.half_bandwidth())
    }
}

impl<T: LinalgScalar> BandTriDiagDecomp<T, DiscardQ> {
    pub fn without_q(a: &HermBandMatrix<T>) -> Self {
        Self::reduce(a, a.half_bandwidth())
    }
}

impl<R: FloatScalar> BandTriDiagDecomp<R, KeepQ> {
    pub fn from_symmetric(a: &SymBandMatrix<R>) -> Self {
        Self::reduce(a, a.half_bandwidth())
    }
}

impl<R: FloatScalar> BandTriDiagDecomp<R, DiscardQ> {
    pub fn from_symmetric_without_q(a: &SymBandMatrix<R>) -> Self {
        Self::reduce(a, a.half_bandwidth())
    }
}

impl<T: LinalgScalar, Q: QPolicy> BandTriDiagDecomp<T, Q> {
    fn reduce<L: Layout>(a: &Packed<L, T>, kd: usize) -> Self {
        let n = a.order();
        let kd = kd.min(n.saturating_sub(1));
        log::debug!("BandTriDiagDecomp: order {}, half bandwidth {}, keep Q: {}", n, kd, Q::KEEP);
        let mut w = WorkBand::new(a, kd);
        let mut q = if Q::KEEP {
            DynMatrix::eye(n, T::zero())
        } else {
            DynMatrix::zeros(0, 0, T::zero())
        };

        let mut rotations = 0usize;
        for j in 0..n.saturating_sub(2) {
            for i in ((j + 2)..=(j + kd).min(n - 1)).rev() {
                w.rotate_out(&mut q, i, j);
                rotations += 1;
                // the rotation filled (i + kd, i - 1); chase it down
                let (mut r, mut c) = (i + kd, i - 1);
                while r < n {
                    w.rotate_out(&mut q, r, c);
                    rotations += 1;
                    c = r - 1;
                    r += kd;
                }
            }
        }
        log::trace!("sbtrd: {} rotations", rotations);

        let diag: Vec<T> = (0..n).map(|i| w.get(i, i)).collect();
        let sub: Vec<T> = (1..n).map(|i| w.get(i, i - 1)).collect();
        let (diag, off) = real_tridiagonal(&diag, &sub, if Q::KEEP { Some(&mut q) } else { None });
        Self {
            diag,
            off,
            q,
            _policy: PhantomData,
        }
    }
}

/// Lower band of a self-adjoint matrix with `kd + 1` subdiagonals, the
/// extra one holding the bulge. Column `j` holds `(j + d, j)` at
/// `d + j * ld` for `d < ld = kd + 2`; everything further out is zero.
struct WorkBand<T> {
    data: Vec<T>,
    ld: usize,
    n: usize,
}

impl<T: LinalgScalar> WorkBand<T> {
    fn new<L: Layout>(a: &Packed<L, T>, kd: usize) -> Self {
        let n = a.order();
        let ld = kd + 2;
        let mut data = vec![T::zero(); ld * n];
        for j in 0..n {
            for d in 0..=kd.min(n - 1 - j) {
                data[d + j * ld] = a.at(j + d, j);
            }
        }
        Self { data, ld, n }
    }

    #[inline]
    fn get(&self, i: usize, j: usize) -> T {
        if i >= j {
            let d = i - j;
            if d < self.ld {
                return self.data[d + j * self.ld];
            }
        } else {
            let d = j - i;
            if d < self.ld {
                return self.data[d + i * self.ld].conj();
            }
        }
        T::zero()
    }

    /// Positions outside the band only ever receive exact zeros and are
    /// skipped.
    #[inline]
    fn set(&mut self, i: usize, j: usize, v: T) {
        if i >= j {
            let d = i - j;
            if d < self.ld {
                self.data[d + j * self.ld] = v;
            }
        } else {
            let d = j - i;
            if d < self.ld {
                self.data[d + i * self.ld] = v.conj();
            }
        }
    }

    /// Zero `(r, c)` (and its mirror) with a rotation `G` of rows and
    /// columns `r - 1, r`, applied as `G A Gᴴ`; `q ← q Gᴴ` unless `q` is
    /// empty.
    fn rotate_out(&mut self, q: &mut DynMatrix<T>, r: usize, c: usize) {
        let p = r - 1;
        let f = self.get(p, c);
        let g = self.get(r, c);
        if g == T::zero() {
            return;
        }
        let fm = f.modulus();
        let gm = g.modulus();
        let norm = fm.hypot(gm);
        let (cs, sn) = if fm == <T::Real as Zero>::zero() {
            (<T::Real as Zero>::zero(), g.conj() / T::from_real(gm))
        } else {
            (fm / norm, (f / T::from_real(fm)) * g.conj() / T::from_real(norm))
        };
        let cz = T::from_real(cs);

        // rows p and r outside the 2x2 block; the mirrors follow
        let reach = self.ld - 1;
        for k in p.saturating_sub(reach)..(r + reach + 1).min(self.n) {
            if k == p || k == r {
                continue;
            }
            let x = self.get(p, k);
            let y = self.get(r, k);
            self.set(p, k, cz * x + sn * y);
            self.set(r, k, cz * y - sn.conj() * x);
        }

        // the 2x2 block, G B then (G B) Gᴴ
        let (bpp, brp, brr) = (self.get(p, p), self.get(r, p), self.get(r, r));
        let bpr = brp.conj();
        let mpp = cz * bpp + sn * brp;
        let mpr = cz * bpr + sn * brr;
        let mrp = cz * brp - sn.conj() * bpp;
        let mrr = cz * brr - sn.conj() * bpr;
        self.set(p, p, cz * mpp + sn.conj() * mpr);
        self.set(r, p, cz * mrp + sn.conj() * mrr);
        self.set(r, r, cz * mrr - sn * mrp);
        self.set(r, c, T::zero());

        for i in 0..q.nrows() {
            let x = q[(i, p)];
            let y = q[(i, r)];
            q[(i, p)] = cz * x + sn.conj() * y;
            q[(i, r)] = cz * y - sn * x;
        }
    }
}

impl<T: LinalgScalar, Q: QPolicy> TriDiagDecomp<T> for BandTriDiagDecomp<T, Q> {
    fn rows(&self) -> usize {
        self.diag.len()
    }

    fn diagonal(&self) -> &[T::Real] {
        &self.diag
    }

    fn off_diagonal(&self) -> &[T::Real] {
        &self.off
    }
}

impl<T: LinalgScalar> TriDiagTransform<T> for BandTriDiagDecomp<T, KeepQ> {
    fn q(&self) -> &DynMatrix<T> {
        &self.q
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packed::{HermitianBand, SymmetricBand};
    use num_complex::Complex;

    const TOL: f64 = 1e-10;

    fn dense_t<T: LinalgScalar<Real = f64>>(td: &impl TriDiagDecomp<T>) -> DynMatrix<T> {
        let n = td.rows();
        DynMatrix::from_fn(n, n, |i, j| {
            if i == j {
                T::from_real(td.diagonal()[i])
            } else if i == j + 1 {
                T::from_real(td.off_diagonal()[j])
            } else if j == i + 1 {
                T::from_real(td.off_diagonal()[i])
            } else {
                T::zero()
            }
        })
    }

    fn residual<T: LinalgScalar<Real = f64>>(td: &impl TriDiagTransform<T>, a: &DynMatrix<T>) -> f64 {
        let q = td.q();
        let rebuilt = &(q * &dense_t(td)) * &q.adjoint();
        (&rebuilt - a).frobenius_norm()
    }

    fn sym_4x4() -> DynMatrix<f64> {
        DynMatrix::from_rows(
            4,
            4,
            &[4.0, 1.0, -2.0, 2.0, 1.0, 2.0, 0.0, 1.0, -2.0, 0.0, 3.0, -2.0, 2.0, 1.0, -2.0, -1.0],
        )
    }

    #[test]
    fn dense_symmetric() {
        let a = sym_4x4();
        let td = DenseTriDiagDecomp::from_symmetric(&SymMatrix::from_dense(&a).unwrap());
        assert_eq!(td.rows(), 4);
        assert!(residual(&td, &a) < TOL);
        assert!(td.off_diagonal().iter().all(|&e| e >= 0.0));
        let q = td.q();
        assert!((&(&q.transpose() * q) - &DynMatrix::eye(4, 0.0)).frobenius_norm() < TOL);
    }

    #[test]
    fn dense_hermitian() {
        let c = |re, im| Complex::new(re, im);
        let a = DynMatrix::from_rows(
            3,
            3,
            &[
                c(2.0, 0.0),
                c(1.0, 1.0),
                c(0.0, -2.0),
                c(1.0, -1.0),
                c(3.0, 0.0),
                c(1.0, 0.5),
                c(0.0, 2.0),
                c(1.0, -0.5),
                c(1.0, 0.0),
            ],
        );
        let td = DenseTriDiagDecomp::new(&HermMatrix::from_dense(&a).unwrap());
        assert!(residual(&td, &a) < TOL);
        let qhq = &td.q().adjoint() * td.q();
        assert!((&qhq - &DynMatrix::eye(3, c(0.0, 0.0))).frobenius_norm() < TOL);
    }

    #[test]
    fn band_matches_dense() {
        let n = 6;
        let a = DynMatrix::from_fn(n, n, |i, j| {
            let d = if i > j { i - j } else { j - i };
            match d {
                0 => 4.0 + i as f64,
                1 => 1.0 + 0.5 * (i + j) as f64,
                2 => -0.5,
                _ => 0.0,
            }
        });
        let band = SymBandMatrix::from_dense_with(SymmetricBand { half_bandwidth: 2 }, &a).unwrap();
        let td = BandTriDiagDecomp::from_symmetric(&band);
        assert!(residual(&td, &a) < 1e-9);

        let dense = DenseTriDiagDecomp::from_symmetric(&SymMatrix::from_dense(&a).unwrap());
        let t1 = dense_t(&td);
        let t2 = dense_t(&dense);
        let trace = |t: &DynMatrix<f64>| (0..n).map(|i| t[(i, i)]).sum::<f64>();
        assert!((trace(&t1) - trace(&t2)).abs() < 1e-9);
        assert!((t1.frobenius_norm() - t2.frobenius_norm()).abs() < 1e-9);

        let without = BandTriDiagDecomp::from_symmetric_without_q(&band);
        assert_eq!(without.diagonal().len(), n);
        for (x, y) in without.diagonal().iter().zip(td.diagonal()) {
            assert!((x - y).abs() < 1e-12);
        }
    }

    #[test]
    fn band_hermitian() {
        let c = |re, im| Complex::new(re, im);
        let n = 5;
        let a = DynMatrix::from_fn(n, n, |i, j| {
            if i == j {
                c(3.0 + i as f64, 0.0)
            } else if j == i + 1 {
                c(1.0, 0.5)
            } else if i == j + 1 {
                c(1.0, -0.5)
            } else if j == i + 2 {
                c(0.0, 1.0)
            } else if i == j + 2 {
                c(0.0, -1.0)
            } else {
                c(0.0, 0.0)
            }
        });
        let band = HermBandMatrix::from_dense_with(HermitianBand { half_bandwidth: 2 }, &a).unwrap();
        let td = BandTriDiagDecomp::new(&band);
        assert!(residual(&td, &a) < 1e-9);
        assert!(td.off_diagonal().iter().all(|&e| e >= 0.0));
    }

    #[test]
    fn transform_and_tridiagonal() {
        let a = sym_4x4();
        let td = DenseTriDiagDecomp::from_symmetric(&SymMatrix::from_dense(&a).unwrap());
        let t = td.tridiagonal();
        for i in 0..3 {
            assert_eq!(t.value(i + 1, i).unwrap(), td.off_diagonal()[i]);
            assert_eq!(t.value(i, i + 1).unwrap(), td.off_diagonal()[i]);
        }
        let x = DynVector::from_slice(&[1.0, 0.0, 0.0, 0.0]);
        let qx = td.transform(&x).unwrap();
        for i in 0..4 {
            assert!((qx[i] - td.q()[(i, 0)]).abs() < 1e-15);
        }
        assert!(matches!(
            td.transform(&DynVector::zeros(3, 0.0)),
            Err(MatrixError::Dimension { expected: 4, got: 3 })
        ));
        assert!(td.transform_matrix(&DynMatrix::zeros(2, 2, 0.0)).is_err());
    }

    #[test]
    fn large_band_without_q() {
        // a dense copy at this order would be 18 MB
        let (n, kd) = (1500, 3);
        let mut band = SymBandMatrix::<f64>::with_bandwidth(n, n, kd).unwrap();
        let mut trace = 0.0;
        let mut frob2 = 0.0;
        for j in 0..n {
            let d = 2.0 + (j % 7) as f64;
            band.set(j, j, d).unwrap();
            trace += d;
            frob2 += d * d;
            for i in j.saturating_sub(kd)..j {
                let v = 1.0 / (1 + j - i + j % 3) as f64;
                band.set(i, j, v).unwrap();
                frob2 += 2.0 * v * v;
            }
        }
        let td = BandTriDiagDecomp::from_symmetric_without_q(&band);
        assert_eq!(td.rows(), n);
        assert_eq!(td.off_diagonal().len(), n - 1);
        let t_trace: f64 = td.diagonal().iter().sum();
        let t_frob2: f64 = td.diagonal().iter().map(|d| d * d).sum::<f64>()
            + 2.0 * td.off_diagonal().iter().map(|e| e * e).sum::<f64>();
        assert!((t_trace - trace).abs() < 1e-8 * trace);
        assert!((t_frob2 - frob2).abs() < 1e-8 * frob2);
    }

    #[test]
    fn band_wider_than_order() {
        let a = sym_4x4();
        let band = SymBandMatrix::from_dense_with(SymmetricBand { half_bandwidth: 6 }, &a).unwrap();
        let td = BandTriDiagDecomp::from_symmetric(&band);
        assert!(residual(&td, &a) < 1e-9);
    }

    #[test]
    fn trivial_orders() {
        let empty = DenseTriDiagDecomp::from_symmetric(&SymMatrix::<f64>::new(0, 0).unwrap());
        assert_eq!(empty.rows(), 0);
        assert!(empty.off_diagonal().is_empty());
        let one = SymBandMatrix::from_vec_with_bandwidth(vec![0.0, 7.0], 1, 1, 1).unwrap();
        let td = BandTriDiagDecomp::from_symmetric(&one);
        assert_eq!(td.diagonal(), &[7.0]);
        assert_eq!(td.tridiagonal().value(0, 0).unwrap(), 7.0);
    }
}
