//! Packed storage for structured square matrices.
//!
//! A [`Packed<L, T>`] stores only the distinct elements of an `n x n` matrix
//! whose shape `L` is known: the canonical triangle of a symmetric, Hermitian
//! or skew matrix, the nonzero triangle of a triangular matrix, or the band of
//! a tridiagonal or banded matrix. Element access goes through the index
//! arithmetic of the [`Layout`], which also decides whether an off-canonical
//! position is a mirror (plain, conjugated, negated) or a structural zero.
//!
//! | Type | Layout | Stored elements |
//! |------|--------|-----------------|
//! | [`SymMatrix`] | [`Symmetric`] | `n(n+1)/2` |
//! | [`HermMatrix`] | [`Hermitian`] | `n(n+1)/2` |
//! | [`SkewMatrix`] | [`Skew`] | `n(n+1)/2` |
//! | [`UpperTriMatrix`] | [`Upper`] | `n(n+1)/2` |
//! | [`LowerTriMatrix`] | [`Lower`] | `n(n+1)/2` |
//! | [`TriDiagMatrix`] | [`TriDiagonal`] | `3n` |
//! | [`SymBandMatrix`] | [`SymmetricBand`] | `n(h+1)` |
//! | [`HermBandMatrix`] | [`HermitianBand`] | `n(h+1)` |
//! | [`BandMatrix`] | [`GeneralBand`] | `n(l+u+1)` |
//!
//! The backing vector is shared copy-on-write: `clone()` and
//! [`reference`](Packed::reference) share it, the first write detaches.

mod entry;
mod io;
mod layout;
#[cfg(feature = "persist")]
mod persist;
mod storage;

pub use entry::{Entry, EntryKind};
pub use layout::{
    BandSelfAdjoint, GeneralBand, Hermitian, HermitianBand, Layout, Lower, SelfAdjoint, Skew,
    Slot, Symmetric, SymmetricBand, TriDiagonal, TriangleSelfAdjoint, Upper,
};

use num_traits::{Float, Zero};

use crate::dynmatrix::DynMatrix;
use crate::error::MatrixError;
use crate::traits::LinalgScalar;
use storage::SharedVec;

/// Structured `n x n` matrix in packed storage.
#[derive(Debug, Clone)]
pub struct Packed<L, T> {
    data: SharedVec<T>,
    n: usize,
    layout: L,
}

pub type SymMatrix<T> = Packed<Symmetric, T>;
pub type HermMatrix<T> = Packed<Hermitian, T>;
pub type SkewMatrix<T> = Packed<Skew, T>;
pub type UpperTriMatrix<T> = Packed<Upper, T>;
pub type LowerTriMatrix<T> = Packed<Lower, T>;
pub type TriDiagMatrix<T> = Packed<TriDiagonal, T>;
pub type SymBandMatrix<T> = Packed<SymmetricBand, T>;
pub type HermBandMatrix<T> = Packed<HermitianBand, T>;
pub type BandMatrix<T> = Packed<GeneralBand, T>;

fn square(rows: usize, cols: usize) -> Result<usize, MatrixError> {
    if rows != cols {
        return Err(MatrixError::Shape { rows, cols });
    }
    Ok(rows)
}

// ── Constructors ────────────────────────────────────────────────────

impl<L: Layout, T: LinalgScalar> Packed<L, T> {
    /// The `0 x 0` matrix of a layout.
    pub fn empty(layout: L) -> Self {
        Self {
            data: SharedVec::new(Vec::new()),
            n: 0,
            layout,
        }
    }

    /// Zero matrix of the given layout.
    pub fn zeros_with(layout: L, rows: usize, cols: usize) -> Result<Self, MatrixError> {
        Self::filled_with(layout, rows, cols, T::zero())
    }

    /// Every stored element set to `value`.
    pub fn filled_with(layout: L, rows: usize, cols: usize, value: T) -> Result<Self, MatrixError> {
        let n = square(rows, cols)?;
        Ok(Self {
            data: SharedVec::new(vec![value; layout.len(n)]),
            n,
            layout,
        })
    }

    /// Take ownership of an already-packed vector.
    ///
    /// The vector must hold exactly `layout.len(n)` elements.
    pub fn from_vec_with(layout: L, data: Vec<T>, rows: usize, cols: usize) -> Result<Self, MatrixError> {
        let n = square(rows, cols)?;
        let expected = layout.checked_len(n).unwrap_or(usize::MAX);
        if data.len() != expected {
            return Err(MatrixError::Length {
                order: n,
                expected,
                got: data.len(),
            });
        }
        let mut data = data;
        real_diagonal(&layout, n, &mut data);
        Ok(Self {
            data: SharedVec::new(data),
            n,
            layout,
        })
    }

    /// Wrap a vector already sized for `layout` at order `n`.
    pub(crate) fn from_raw(layout: L, data: Vec<T>, n: usize) -> Self {
        debug_assert_eq!(data.len(), layout.len(n));
        Self {
            data: SharedVec::new(data),
            n,
            layout,
        }
    }

    /// Pack the canonical part of a dense square matrix.
    ///
    /// Elements outside the stored part are ignored.
    pub fn from_dense_with(layout: L, a: &DynMatrix<T>) -> Result<Self, MatrixError> {
        let n = square(a.nrows(), a.ncols())?;
        let mut data = vec![T::zero(); layout.len(n)];
        for j in 0..n {
            for i in layout.stored_rows(j, n) {
                match layout.slot(i, j) {
                    Slot::Direct(k) => data[k] = a[(i, j)],
                    Slot::Real(k) => data[k] = T::from_real(a[(i, j)].re()),
                    _ => {}
                }
            }
        }
        Ok(Self {
            data: SharedVec::new(data),
            n,
            layout,
        })
    }
}

/// Drop the imaginary part of diagonal elements the layout keeps real.
pub(crate) fn real_diagonal<L: Layout, T: LinalgScalar>(layout: &L, n: usize, data: &mut [T]) {
    for j in 0..n {
        if let Slot::Real(k) = layout.slot(j, j) {
            data[k] = T::from_real(data[k].re());
        }
    }
}

impl<L: Layout + Default, T: LinalgScalar> Packed<L, T> {
    /// Zero `rows x cols` matrix; `rows` must equal `cols`.
    ///
    /// ```
    /// use structmat::SymMatrix;
    /// let s = SymMatrix::<f64>::new(3, 3).unwrap();
    /// assert_eq!(s.data().len(), 6);
    /// assert!(SymMatrix::<f64>::new(2, 3).is_err());
    /// ```
    pub fn new(rows: usize, cols: usize) -> Result<Self, MatrixError> {
        Self::zeros_with(L::default(), rows, cols)
    }

    /// Every stored element set to `value`.
    pub fn filled(rows: usize, cols: usize, value: T) -> Result<Self, MatrixError> {
        Self::filled_with(L::default(), rows, cols, value)
    }

    /// Take ownership of an already-packed vector.
    pub fn from_vec(data: Vec<T>, rows: usize, cols: usize) -> Result<Self, MatrixError> {
        Self::from_vec_with(L::default(), data, rows, cols)
    }

    /// Pack the canonical part of a dense square matrix.
    pub fn from_dense(a: &DynMatrix<T>) -> Result<Self, MatrixError> {
        Self::from_dense_with(L::default(), a)
    }
}

macro_rules! self_adjoint_band_ctors {
    ($layout:ident) => {
        impl<T: LinalgScalar> Packed<$layout, T> {
            /// Zero matrix with `half_bandwidth` superdiagonals.
            pub fn with_bandwidth(rows: usize, cols: usize, half_bandwidth: usize) -> Result<Self, MatrixError> {
                Self::zeros_with($layout { half_bandwidth }, rows, cols)
            }

            /// Take ownership of a vector in `'U'` band layout.
            pub fn from_vec_with_bandwidth(
                data: Vec<T>,
                rows: usize,
                cols: usize,
                half_bandwidth: usize,
            ) -> Result<Self, MatrixError> {
                Self::from_vec_with($layout { half_bandwidth }, data, rows, cols)
            }

            /// Number of stored superdiagonals.
            pub fn half_bandwidth(&self) -> usize {
                self.layout.half_bandwidth
            }
        }
    };
}

self_adjoint_band_ctors!(SymmetricBand);
self_adjoint_band_ctors!(HermitianBand);

impl<T: LinalgScalar> BandMatrix<T> {
    /// Zero matrix with `lower` subdiagonals and `upper` superdiagonals.
    pub fn with_bandwidths(rows: usize, cols: usize, lower: usize, upper: usize) -> Result<Self, MatrixError> {
        Self::zeros_with(GeneralBand { lower, upper }, rows, cols)
    }

    /// Take ownership of a vector in LAPACK band layout.
    pub fn from_vec_with_bandwidths(
        data: Vec<T>,
        rows: usize,
        cols: usize,
        lower: usize,
        upper: usize,
    ) -> Result<Self, MatrixError> {
        Self::from_vec_with(GeneralBand { lower, upper }, data, rows, cols)
    }

    pub fn lower_bandwidth(&self) -> usize {
        self.layout.lower
    }

    pub fn upper_bandwidth(&self) -> usize {
        self.layout.upper
    }
}

// ── Accessors ───────────────────────────────────────────────────────

impl<L: Layout, T: LinalgScalar> Packed<L, T> {
    /// Order `n` of the matrix.
    #[inline]
    pub fn order(&self) -> usize {
        self.n
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.n
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.n
    }

    #[inline]
    pub fn layout(&self) -> L {
        self.layout
    }

    /// The packed data vector.
    #[inline]
    pub fn data(&self) -> &[T] {
        self.data.prefix(self.layout.len(self.n))
    }

    /// Exclusive mutable access to the packed data, detaching shared storage.
    #[inline]
    pub fn data_mut(&mut self) -> &mut [T] {
        let len = self.layout.len(self.n);
        self.data.prefix_mut(len)
    }

    fn check(&self, i: usize, j: usize) -> Result<(), MatrixError> {
        if i >= self.n || j >= self.n {
            return Err(MatrixError::Bounds { i, j, n: self.n });
        }
        Ok(())
    }

    /// Element `(i, j)` without bounds checking beyond slice indexing.
    #[inline]
    pub(crate) fn at(&self, i: usize, j: usize) -> T {
        let data = self.data();
        match self.layout.slot(i, j) {
            Slot::Direct(k) => data[k],
            Slot::Conjugate(k) => data[k].conj(),
            Slot::Negate(k) => T::zero() - data[k],
            Slot::Real(k) => T::from_real(data[k].re()),
            Slot::Zero => T::zero(),
        }
    }

    /// Element `(i, j)`, reading mirrors and structural zeros as the shape
    /// dictates.
    ///
    /// ```
    /// use structmat::SkewMatrix;
    /// let mut k = SkewMatrix::<f64>::new(2, 2).unwrap();
    /// k.set(0, 1, 3.0).unwrap();
    /// assert_eq!(k.value(1, 0).unwrap(), -3.0);
    /// assert!(k.value(2, 0).is_err());
    /// ```
    pub fn value(&self, i: usize, j: usize) -> Result<T, MatrixError> {
        self.check(i, j)?;
        Ok(self.at(i, j))
    }

    /// Writable view of element `(i, j)`.
    pub fn entry(&mut self, i: usize, j: usize) -> Result<Entry<'_, T>, MatrixError> {
        self.check(i, j)?;
        let (index, kind) = match self.layout.slot(i, j) {
            Slot::Direct(k) => (k, EntryKind::Direct),
            Slot::Conjugate(k) => (k, EntryKind::Conjugate),
            Slot::Negate(k) => (k, EntryKind::Negate),
            Slot::Real(k) => (k, EntryKind::Real),
            Slot::Zero => return Ok(Entry::zero(i, j)),
        };
        Ok(Entry::new(&mut self.data_mut()[index], kind, i, j))
    }

    /// Assign element `(i, j)`, returning the value written to storage.
    ///
    /// ```
    /// use structmat::LowerTriMatrix;
    /// let mut l = LowerTriMatrix::<f64>::new(3, 3).unwrap();
    /// assert!(l.set(2, 0, 1.0).is_ok());
    /// assert!(l.set(0, 1, 1.0).is_err());
    /// ```
    pub fn set(&mut self, i: usize, j: usize, x: T) -> Result<T, MatrixError> {
        self.entry(i, j)?.set(x)
    }

    /// Visit every physically stored element as `(i, j, index)`.
    pub(crate) fn for_each_stored(&self, mut f: impl FnMut(usize, usize, usize)) {
        for j in 0..self.n {
            for i in self.layout.stored_rows(j, self.n) {
                if let Slot::Direct(k) | Slot::Real(k) = self.layout.slot(i, j) {
                    f(i, j, k);
                }
            }
        }
    }
}

// ── Sharing, copying, resizing ──────────────────────────────────────

impl<L: Layout, T: LinalgScalar> Packed<L, T> {
    /// Share `other`'s backing storage.
    pub fn reference(&mut self, other: &Self) {
        self.data = other.data.clone();
        self.n = other.n;
        self.layout = other.layout;
    }

    /// A copy with private storage.
    pub fn copy(&self) -> Self {
        Self {
            data: self.data.deep_copy(self.layout.len(self.n)),
            n: self.n,
            layout: self.layout,
        }
    }

    /// Make sure the storage is not shared with any other matrix.
    pub fn deepen(&mut self) {
        if self.data.is_shared() {
            *self = self.copy();
        }
    }

    /// Whether `self` and `other` currently share storage.
    pub fn shares_storage_with(&self, other: &Self) -> bool {
        self.data.ptr_eq(&other.data)
    }

    /// Change the order, keeping the leading submatrix.
    ///
    /// New elements are zero. Band padding outside the new band is zeroed.
    pub fn resize(&mut self, rows: usize, cols: usize) -> Result<(), MatrixError> {
        let n = square(rows, cols)?;
        let old = self.data();
        let len = self.layout.len(n);
        let keep = old.len().min(len);
        let mut data = Vec::with_capacity(len);
        data.extend_from_slice(&old[..keep]);
        data.resize(len, T::zero());

        // keep only slots live at both the old and the new order
        let live_old = self.live_slots(self.n, len);
        let live_new = self.live_slots(n, len);
        for (k, x) in data.iter_mut().enumerate() {
            if !(live_old[k] && live_new[k]) {
                *x = T::zero();
            }
        }
        log::trace!("{} resized from order {} to {}", L::NAME, self.n, n);
        self.data = SharedVec::new(data);
        self.n = n;
        Ok(())
    }

    /// Which of the first `len` slots hold an element at order `n`.
    fn live_slots(&self, n: usize, len: usize) -> Vec<bool> {
        let mut live = vec![false; len];
        for j in 0..n {
            for i in self.layout.stored_rows(j, n) {
                if let Slot::Direct(k) | Slot::Real(k) = self.layout.slot(i, j) {
                    if k < len {
                        live[k] = true;
                    }
                }
            }
        }
        live
    }

    /// View of the leading `k x k` submatrix sharing this matrix's storage.
    pub fn leading_submatrix(&self, k: usize) -> Result<Self, MatrixError> {
        if k > self.n {
            return Err(MatrixError::Bounds { i: k, j: k, n: self.n });
        }
        Ok(Self {
            data: self.data.clone(),
            n: k,
            layout: self.layout,
        })
    }
}

// ── Conversions and norms ───────────────────────────────────────────

impl<L: Layout, T: LinalgScalar> Packed<L, T> {
    /// Expand to a dense matrix.
    pub fn to_dense(&self) -> DynMatrix<T> {
        DynMatrix::from_fn(self.n, self.n, |i, j| self.at(i, j))
    }

    /// Maximum absolute column sum.
    pub fn norm_one(&self) -> T::Real {
        let mut best = <T::Real as Zero>::zero();
        for j in 0..self.n {
            let mut s = <T::Real as Zero>::zero();
            for i in self.layout.nonzero_rows(j, self.n) {
                s = s + self.at(i, j).modulus();
            }
            best = best.max(s);
        }
        best
    }

    /// Diagonal elements.
    pub fn diagonal(&self) -> Vec<T> {
        (0..self.n).map(|i| self.at(i, i)).collect()
    }
}

impl<L: Layout, T: LinalgScalar> PartialEq for Packed<L, T> {
    /// Compares stored elements only; band padding is ignored.
    fn eq(&self, other: &Self) -> bool {
        if self.n != other.n || self.layout != other.layout {
            return false;
        }
        let (a, b) = (self.data(), other.data());
        let mut same = true;
        self.for_each_stored(|_, _, k| same &= a[k] == b[k]);
        same
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex;

    #[test]
    fn packed_sizes() {
        for n in 0..6 {
            let t = n * (n + 1) / 2;
            assert_eq!(SymMatrix::<f64>::new(n, n).unwrap().data().len(), t);
            assert_eq!(HermMatrix::<Complex<f64>>::new(n, n).unwrap().data().len(), t);
            assert_eq!(SkewMatrix::<f64>::new(n, n).unwrap().data().len(), t);
            assert_eq!(UpperTriMatrix::<f64>::new(n, n).unwrap().data().len(), t);
            assert_eq!(LowerTriMatrix::<f64>::new(n, n).unwrap().data().len(), t);
            assert_eq!(TriDiagMatrix::<f64>::new(n, n).unwrap().data().len(), 3 * n);
            assert_eq!(SymBandMatrix::<f64>::with_bandwidth(n, n, 2).unwrap().data().len(), 3 * n);
            assert_eq!(BandMatrix::<f64>::with_bandwidths(n, n, 1, 2).unwrap().data().len(), 4 * n);
        }
    }

    #[test]
    fn shape_and_length_errors() {
        assert!(matches!(
            SymMatrix::<f64>::new(2, 3),
            Err(MatrixError::Shape { rows: 2, cols: 3 })
        ));
        assert!(matches!(
            SymMatrix::from_vec(vec![1.0; 5], 3, 3),
            Err(MatrixError::Length { expected: 6, got: 5, .. })
        ));
        assert!(SymMatrix::from_vec(vec![1.0; 6], 3, 3).is_ok());
    }

    #[test]
    fn symmetric_mirror() {
        let mut s = SymMatrix::<f64>::new(3, 3).unwrap();
        s.set(2, 0, 5.0).unwrap();
        assert_eq!(s.value(0, 2).unwrap(), 5.0);
        assert_eq!(s.value(2, 0).unwrap(), 5.0);
    }

    #[test]
    fn hermitian_set_below_diagonal() {
        let mut h = HermMatrix::<Complex<f64>>::new(2, 2).unwrap();
        let stored = h.set(1, 0, Complex::new(1.0, -1.0)).unwrap();
        assert_eq!(stored, Complex::new(1.0, 1.0));
        assert_eq!(h.value(0, 1).unwrap(), Complex::new(1.0, 1.0));
        assert_eq!(h.value(1, 0).unwrap(), Complex::new(1.0, -1.0));
    }

    #[test]
    fn triangular_zeros() {
        let u = UpperTriMatrix::filled(3, 3, 2.0_f64).unwrap();
        assert_eq!(u.value(2, 0).unwrap(), 0.0);
        assert_eq!(u.value(0, 2).unwrap(), 2.0);
        let mut l = LowerTriMatrix::<f64>::new(3, 3).unwrap();
        assert!(matches!(l.set(0, 1, 1.0), Err(MatrixError::NotSettable { i: 0, j: 1 })));
        assert!(matches!(l.value(3, 0), Err(MatrixError::Bounds { .. })));
    }

    #[test]
    fn copy_on_write() {
        let a = SymMatrix::filled(3, 3, 1.0_f64).unwrap();
        let mut b = a.clone();
        assert!(b.shares_storage_with(&a));
        b.set(0, 0, a.value(0, 0).unwrap() + 1.0).unwrap();
        assert!(!b.shares_storage_with(&a));
        assert_eq!(a.value(0, 0).unwrap(), 1.0);
        assert_eq!(b.value(0, 0).unwrap(), 2.0);
    }

    #[test]
    fn reference_then_deepen() {
        let a = SymMatrix::filled(2, 2, 1.0_f64).unwrap();
        let mut b = SymMatrix::<f64>::new(0, 0).unwrap();
        b.reference(&a);
        assert!(b.shares_storage_with(&a));
        b.deepen();
        assert!(!b.shares_storage_with(&a));
        assert_eq!(a, b);
    }

    #[test]
    fn leading_submatrix_shares_prefix() {
        let mut a = TriDiagMatrix::<f64>::new(4, 4).unwrap();
        for i in 0..4 {
            a.set(i, i, (i + 1) as f64).unwrap();
        }
        a.set(1, 2, 7.0).unwrap();
        let sub = a.leading_submatrix(2).unwrap();
        assert!(sub.shares_storage_with(&a));
        assert_eq!(sub.order(), 2);
        assert_eq!(sub.value(1, 1).unwrap(), 2.0);
        assert_eq!(sub.data().len(), 6);
        assert!(a.leading_submatrix(5).is_err());
    }

    #[test]
    fn resize_zeroes_band_padding() {
        let mut t = TriDiagMatrix::filled(3, 3, 1.0_f64).unwrap();
        t.resize(2, 2).unwrap();
        assert_eq!(t.data(), &[0.0, 1.0, 1.0, 1.0, 1.0, 0.0]);
        t.resize(3, 3).unwrap();
        assert_eq!(t.value(2, 2).unwrap(), 0.0);
        assert_eq!(t.value(1, 1).unwrap(), 1.0);
        assert!(t.resize(3, 4).is_err());
    }

    #[test]
    fn equality_ignores_padding() {
        let a = BandMatrix::from_vec_with_bandwidths(vec![9.0, 1.0, 2.0, 3.0, 4.0, 8.0], 2, 2, 1, 1)
            .unwrap();
        let b = BandMatrix::from_vec_with_bandwidths(vec![0.0, 1.0, 2.0, 3.0, 4.0, 0.0], 2, 2, 1, 1)
            .unwrap();
        assert_eq!(a, b);
        let wider = BandMatrix::<f64>::with_bandwidths(2, 2, 1, 2).unwrap();
        let zero = BandMatrix::<f64>::with_bandwidths(2, 2, 1, 1).unwrap();
        assert!(wider != zero);
        assert!(zero != b);
        assert!(SymMatrix::<f64>::new(2, 2).unwrap() != SymMatrix::<f64>::new(3, 3).unwrap());
    }

    #[test]
    fn dense_round_trip_and_norm() {
        let a = DynMatrix::from_rows(3, 3, &[2.0, -1.0, 0.0, -1.0, 2.0, -1.0, 0.0, -1.0, 2.0]);
        let s = SymMatrix::from_dense(&a).unwrap();
        assert_eq!(s.to_dense(), a);
        assert_eq!(s.norm_one(), 4.0);
        let t = TriDiagMatrix::from_dense(&a).unwrap();
        assert_eq!(t.to_dense(), a);
        assert_eq!(t.norm_one(), 4.0);
    }
}
