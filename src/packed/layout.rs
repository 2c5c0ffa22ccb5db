use core::fmt::Debug;
use core::ops::Range;

use crate::traits::LinalgScalar;

/// Where element `(i, j)` of a structured matrix lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// Stored as-is at this index of the packed vector.
    Direct(usize),
    /// Conjugate of the element stored at this index (Hermitian mirror).
    Conjugate(usize),
    /// Negation of the element stored at this index (skew mirror).
    Negate(usize),
    /// Real part of the element stored at this index (Hermitian diagonal).
    Real(usize),
    /// Structural zero; not stored and not settable.
    Zero,
}

/// Index arithmetic for one packed shape.
///
/// Every layout keeps the leading `k x k` submatrix at the front of the
/// vector, so shrinking the order only truncates the storage.
pub trait Layout: Copy + Debug + PartialEq {
    /// Class name printed by `Display`.
    const NAME: &'static str;

    /// Whether the shape carries explicit bandwidths.
    const BANDED: bool = false;

    /// Number of stored elements for order `n`, or `None` if it does not
    /// fit in `usize`.
    fn checked_len(&self, n: usize) -> Option<usize>;

    /// Number of stored elements for order `n`.
    ///
    /// Saturates; only orders read from untrusted input can overflow, and
    /// those go through [`checked_len`](Layout::checked_len).
    fn len(&self, n: usize) -> usize {
        self.checked_len(n).unwrap_or(usize::MAX)
    }

    /// Location of element `(i, j)`; both indices are assumed `< n`.
    fn slot(&self, i: usize, j: usize) -> Slot;

    /// Rows of column `j` that are physically stored.
    fn stored_rows(&self, j: usize, n: usize) -> Range<usize>;

    /// Rows of column `j` that may be nonzero, mirrors included.
    fn nonzero_rows(&self, j: usize, n: usize) -> Range<usize>;

    /// `(lower, upper)` bandwidths; `(0, 0)` for unbanded shapes.
    fn bandwidths(&self) -> (usize, usize) {
        (0, 0)
    }

    /// Rebuild a layout from persisted bandwidths.
    fn with_bandwidths(lower: usize, upper: usize) -> Self;

    /// Smallest layout of this shape covering every nonzero of an `n x n`
    /// matrix, used when scanning text.
    fn fit(n: usize, nonzero: &dyn Fn(usize, usize) -> bool) -> Self;
}

/// Mirror rule shared by the self-adjoint shapes.
///
/// Symmetric storage mirrors elements unchanged; Hermitian storage mirrors
/// them conjugated and keeps a real diagonal. The factorization kernels are
/// written once over this trait.
pub trait SelfAdjoint: Layout {
    /// Whether the mirror conjugates (the matrix equals its adjoint).
    const CONJUGATE: bool;

    /// Value of `(j, i)` given the value of `(i, j)`.
    fn mirror<T: LinalgScalar>(x: T) -> T;

    /// Normalise a diagonal element.
    fn diagonal<T: LinalgScalar>(x: T) -> T;
}

#[inline]
fn upper_packed(i: usize, j: usize) -> usize {
    i + j * (j + 1) / 2
}

#[inline]
fn lower_packed(i: usize, j: usize) -> usize {
    j + i * (i + 1) / 2
}

#[inline]
fn triangle_len(n: usize) -> Option<usize> {
    if n % 2 == 0 {
        (n / 2).checked_mul(n.checked_add(1)?)
    } else {
        n.checked_mul(n / 2 + 1)
    }
}

macro_rules! triangle_layout {
    ($name:ident, $label:literal, $diag:ident, $mirror:ident) => {
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
        pub struct $name;

        impl Layout for $name {
            const NAME: &'static str = $label;

            fn checked_len(&self, n: usize) -> Option<usize> {
                triangle_len(n)
            }

            #[inline]
            fn slot(&self, i: usize, j: usize) -> Slot {
                if i == j {
                    Slot::$diag(upper_packed(i, j))
                } else if i < j {
                    Slot::Direct(upper_packed(i, j))
                } else {
                    Slot::$mirror(upper_packed(j, i))
                }
            }

            fn stored_rows(&self, j: usize, _n: usize) -> Range<usize> {
                0..j + 1
            }

            fn nonzero_rows(&self, _j: usize, n: usize) -> Range<usize> {
                0..n
            }

            fn with_bandwidths(_lower: usize, _upper: usize) -> Self {
                $name
            }

            fn fit(_n: usize, _nonzero: &dyn Fn(usize, usize) -> bool) -> Self {
                $name
            }
        }
    };
}

triangle_layout!(Symmetric, "SymMatrix", Direct, Direct);
triangle_layout!(Hermitian, "HermMatrix", Real, Conjugate);
triangle_layout!(Skew, "SkewMatrix", Direct, Negate);

/// Upper triangle, LAPACK `'U'` packed by column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Upper;

impl Layout for Upper {
    const NAME: &'static str = "UpperTriMatrix";

    fn checked_len(&self, n: usize) -> Option<usize> {
        triangle_len(n)
    }

    #[inline]
    fn slot(&self, i: usize, j: usize) -> Slot {
        if i <= j {
            Slot::Direct(upper_packed(i, j))
        } else {
            Slot::Zero
        }
    }

    fn stored_rows(&self, j: usize, _n: usize) -> Range<usize> {
        0..j + 1
    }

    fn nonzero_rows(&self, j: usize, _n: usize) -> Range<usize> {
        0..j + 1
    }

    fn with_bandwidths(_lower: usize, _upper: usize) -> Self {
        Upper
    }

    fn fit(_n: usize, _nonzero: &dyn Fn(usize, usize) -> bool) -> Self {
        Upper
    }
}

/// Lower triangle packed by row, so a leading submatrix is a prefix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Lower;

impl Layout for Lower {
    const NAME: &'static str = "LowerTriMatrix";

    fn checked_len(&self, n: usize) -> Option<usize> {
        triangle_len(n)
    }

    #[inline]
    fn slot(&self, i: usize, j: usize) -> Slot {
        if i >= j {
            Slot::Direct(lower_packed(i, j))
        } else {
            Slot::Zero
        }
    }

    fn stored_rows(&self, j: usize, n: usize) -> Range<usize> {
        j..n
    }

    fn nonzero_rows(&self, j: usize, n: usize) -> Range<usize> {
        j..n
    }

    fn with_bandwidths(_lower: usize, _upper: usize) -> Self {
        Lower
    }

    fn fit(_n: usize, _nonzero: &dyn Fn(usize, usize) -> bool) -> Self {
        Lower
    }
}

/// Tridiagonal band storage with leading dimension 3.
///
/// Column `j` holds `(j-1, j)`, `(j, j)`, `(j+1, j)` at `3j`, `3j+1`, `3j+2`.
/// Index `0` and index `3n-1` are padding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TriDiagonal;

impl Layout for TriDiagonal {
    const NAME: &'static str = "TriDiagMatrix";

    fn checked_len(&self, n: usize) -> Option<usize> {
        n.checked_mul(3)
    }

    #[inline]
    fn slot(&self, i: usize, j: usize) -> Slot {
        if i + 1 >= j && j + 1 >= i {
            Slot::Direct(i + 1 - j + 3 * j)
        } else {
            Slot::Zero
        }
    }

    fn stored_rows(&self, j: usize, n: usize) -> Range<usize> {
        j.saturating_sub(1)..(j + 2).min(n)
    }

    fn nonzero_rows(&self, j: usize, n: usize) -> Range<usize> {
        self.stored_rows(j, n)
    }

    fn with_bandwidths(_lower: usize, _upper: usize) -> Self {
        TriDiagonal
    }

    fn fit(_n: usize, _nonzero: &dyn Fn(usize, usize) -> bool) -> Self {
        TriDiagonal
    }
}

fn widest(n: usize, nonzero: &dyn Fn(usize, usize) -> bool) -> (usize, usize) {
    let (mut lower, mut upper) = (0, 0);
    for j in 0..n {
        for i in 0..n {
            if nonzero(i, j) {
                if i > j {
                    lower = lower.max(i - j);
                } else {
                    upper = upper.max(j - i);
                }
            }
        }
    }
    (lower, upper)
}

macro_rules! self_adjoint_band_layout {
    ($name:ident, $label:literal, $diag:ident, $mirror:ident) => {
        /// LAPACK `'U'` band storage with `half_bandwidth` superdiagonals.
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct $name {
            pub half_bandwidth: usize,
        }

        impl Layout for $name {
            const NAME: &'static str = $label;
            const BANDED: bool = true;

            fn checked_len(&self, n: usize) -> Option<usize> {
                self.half_bandwidth.checked_add(1)?.checked_mul(n)
            }

            #[inline]
            fn slot(&self, i: usize, j: usize) -> Slot {
                let h = self.half_bandwidth;
                if i == j {
                    Slot::$diag(h + j * (h + 1))
                } else if i < j {
                    if j - i <= h {
                        Slot::Direct(h + i - j + j * (h + 1))
                    } else {
                        Slot::Zero
                    }
                } else if i - j <= h {
                    Slot::$mirror(h + j - i + i * (h + 1))
                } else {
                    Slot::Zero
                }
            }

            fn stored_rows(&self, j: usize, _n: usize) -> Range<usize> {
                j.saturating_sub(self.half_bandwidth)..j + 1
            }

            fn nonzero_rows(&self, j: usize, n: usize) -> Range<usize> {
                j.saturating_sub(self.half_bandwidth)..(j + self.half_bandwidth + 1).min(n)
            }

            fn bandwidths(&self) -> (usize, usize) {
                (self.half_bandwidth, self.half_bandwidth)
            }

            fn with_bandwidths(_lower: usize, upper: usize) -> Self {
                $name {
                    half_bandwidth: upper,
                }
            }

            fn fit(n: usize, nonzero: &dyn Fn(usize, usize) -> bool) -> Self {
                let (lower, upper) = widest(n, nonzero);
                $name {
                    half_bandwidth: lower.max(upper),
                }
            }
        }
    };
}

self_adjoint_band_layout!(SymmetricBand, "SymBandMatrix", Direct, Direct);
self_adjoint_band_layout!(HermitianBand, "HermBandMatrix", Real, Conjugate);

/// General band storage: `lower` subdiagonals and `upper` superdiagonals,
/// leading dimension `lower + upper + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneralBand {
    pub lower: usize,
    pub upper: usize,
}

impl GeneralBand {
    #[inline]
    pub(crate) fn ld(&self) -> usize {
        self.lower + self.upper + 1
    }
}

impl Layout for GeneralBand {
    const NAME: &'static str = "BandMatrix";
    const BANDED: bool = true;

    fn checked_len(&self, n: usize) -> Option<usize> {
        self.lower.checked_add(self.upper)?.checked_add(1)?.checked_mul(n)
    }

    #[inline]
    fn slot(&self, i: usize, j: usize) -> Slot {
        if j <= i + self.upper && i <= j + self.lower {
            Slot::Direct(self.upper + i - j + j * self.ld())
        } else {
            Slot::Zero
        }
    }

    fn stored_rows(&self, j: usize, n: usize) -> Range<usize> {
        j.saturating_sub(self.upper)..(j + self.lower + 1).min(n)
    }

    fn nonzero_rows(&self, j: usize, n: usize) -> Range<usize> {
        self.stored_rows(j, n)
    }

    fn bandwidths(&self) -> (usize, usize) {
        (self.lower, self.upper)
    }

    fn with_bandwidths(lower: usize, upper: usize) -> Self {
        GeneralBand { lower, upper }
    }

    fn fit(n: usize, nonzero: &dyn Fn(usize, usize) -> bool) -> Self {
        let (lower, upper) = widest(n, nonzero);
        GeneralBand { lower, upper }
    }
}

/// Self-adjoint shapes stored as a full `'U'` packed triangle.
pub trait TriangleSelfAdjoint: SelfAdjoint + Default {}

impl TriangleSelfAdjoint for Symmetric {}
impl TriangleSelfAdjoint for Hermitian {}

/// Self-adjoint shapes stored in `'U'` band layout.
pub trait BandSelfAdjoint: SelfAdjoint {
    /// The unbanded shape with the same mirror rule.
    type Full: TriangleSelfAdjoint;
}

impl BandSelfAdjoint for SymmetricBand {
    type Full = Symmetric;
}

impl BandSelfAdjoint for HermitianBand {
    type Full = Hermitian;
}

impl SelfAdjoint for Symmetric {
    const CONJUGATE: bool = false;

    #[inline]
    fn mirror<T: LinalgScalar>(x: T) -> T {
        x
    }

    #[inline]
    fn diagonal<T: LinalgScalar>(x: T) -> T {
        x
    }
}

impl SelfAdjoint for SymmetricBand {
    const CONJUGATE: bool = false;

    #[inline]
    fn mirror<T: LinalgScalar>(x: T) -> T {
        x
    }

    #[inline]
    fn diagonal<T: LinalgScalar>(x: T) -> T {
        x
    }
}

impl SelfAdjoint for Hermitian {
    const CONJUGATE: bool = true;

    #[inline]
    fn mirror<T: LinalgScalar>(x: T) -> T {
        x.conj()
    }

    #[inline]
    fn diagonal<T: LinalgScalar>(x: T) -> T {
        T::from_real(x.re())
    }
}

impl SelfAdjoint for HermitianBand {
    const CONJUGATE: bool = true;

    #[inline]
    fn mirror<T: LinalgScalar>(x: T) -> T {
        x.conj()
    }

    #[inline]
    fn diagonal<T: LinalgScalar>(x: T) -> T {
        T::from_real(x.re())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upper_packed_order() {
        // (0,0) (0,1) (1,1) (0,2) (1,2) (2,2)
        let l = Symmetric;
        assert_eq!(l.slot(0, 0), Slot::Direct(0));
        assert_eq!(l.slot(0, 1), Slot::Direct(1));
        assert_eq!(l.slot(1, 1), Slot::Direct(2));
        assert_eq!(l.slot(1, 2), Slot::Direct(4));
        assert_eq!(l.slot(2, 1), Slot::Direct(4));
        assert_eq!(Hermitian.slot(2, 0), Slot::Conjugate(3));
        assert_eq!(Hermitian.slot(1, 1), Slot::Real(2));
        assert_eq!(HermitianBand { half_bandwidth: 1 }.slot(1, 1), Slot::Real(3));
        assert_eq!(Skew.slot(1, 0), Slot::Negate(1));
    }

    #[test]
    fn lower_packed_by_row() {
        // (0,0) (1,0) (1,1) (2,0) (2,1) (2,2)
        assert_eq!(Lower.slot(1, 0), Slot::Direct(1));
        assert_eq!(Lower.slot(2, 1), Slot::Direct(4));
        assert_eq!(Lower.slot(0, 1), Slot::Zero);
    }

    #[test]
    fn tridiagonal_slots() {
        let t = TriDiagonal;
        assert_eq!(t.slot(0, 0), Slot::Direct(1));
        assert_eq!(t.slot(1, 0), Slot::Direct(2));
        assert_eq!(t.slot(0, 1), Slot::Direct(3));
        assert_eq!(t.slot(2, 0), Slot::Zero);
        assert_eq!(t.len(4), 12);
    }

    #[test]
    fn band_slots() {
        let b = SymmetricBand { half_bandwidth: 1 };
        assert_eq!(b.len(3), 6);
        assert_eq!(b.slot(0, 0), Slot::Direct(1));
        assert_eq!(b.slot(0, 1), Slot::Direct(2));
        assert_eq!(b.slot(1, 0), Slot::Direct(2));
        assert_eq!(b.slot(0, 2), Slot::Zero);

        let g = GeneralBand { lower: 1, upper: 2 };
        assert_eq!(g.len(4), 16);
        assert_eq!(g.slot(0, 0), Slot::Direct(2));
        assert_eq!(g.slot(1, 0), Slot::Direct(3));
        assert_eq!(g.slot(0, 2), Slot::Direct(8));
        assert_eq!(g.slot(2, 0), Slot::Zero);
        assert_eq!(g.slot(0, 3), Slot::Zero);
    }

    #[test]
    fn checked_len_overflow() {
        assert_eq!(Symmetric.checked_len(5), Some(15));
        assert_eq!(Symmetric.checked_len(6), Some(21));
        assert_eq!(Symmetric.checked_len(1 << 40), None);
        assert_eq!(Symmetric.checked_len(usize::MAX), None);
        assert_eq!(TriDiagonal.checked_len(usize::MAX / 2), None);
        assert_eq!(SymmetricBand { half_bandwidth: usize::MAX }.checked_len(1), None);
        assert_eq!(GeneralBand { lower: usize::MAX, upper: 0 }.checked_len(2), None);
        assert_eq!(Symmetric.len(1 << 40), usize::MAX);
    }

    #[test]
    fn fit_band() {
        let nz = |i: usize, j: usize| (i as isize - j as isize).abs() <= 2 && i <= j + 1;
        let g = GeneralBand::fit(5, &nz);
        assert_eq!(g, GeneralBand { lower: 1, upper: 2 });
        let s = SymmetricBand::fit(5, &nz);
        assert_eq!(s.half_bandwidth, 2);
    }
}
