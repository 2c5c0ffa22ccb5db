use crate::error::MatrixError;
use crate::traits::LinalgScalar;

/// How an [`Entry`] maps values onto its stored element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Reads and writes go straight to the stored element.
    Direct,
    /// Hermitian mirror: reads and writes are conjugated.
    Conjugate,
    /// Skew mirror: reads and writes are negated.
    Negate,
    /// Hermitian diagonal: only the real part is read or written.
    Real,
    /// Structural zero: reads give zero, writes fail.
    ReadOnly,
}

/// Mutable view of one element of a structured matrix.
///
/// Returned by `entry(i, j)`. It borrows the matrix mutably, so it lives no
/// longer than the statement that uses it, and it applies the mirror rule of
/// the matrix shape on both read and write.
///
/// ```
/// use structmat::{HermMatrix, Complex};
///
/// let mut h = HermMatrix::<Complex<f64>>::new(2, 2).unwrap();
/// h.entry(1, 0).unwrap().set(Complex::new(1.0, 2.0)).unwrap();
/// assert_eq!(h.value(0, 1).unwrap(), Complex::new(1.0, -2.0));
/// ```
#[derive(Debug)]
pub struct Entry<'a, T> {
    target: Option<&'a mut T>,
    kind: EntryKind,
    i: usize,
    j: usize,
}

impl<'a, T: LinalgScalar> Entry<'a, T> {
    pub(crate) fn new(target: &'a mut T, kind: EntryKind, i: usize, j: usize) -> Self {
        Self {
            target: Some(target),
            kind,
            i,
            j,
        }
    }

    pub(crate) fn zero(i: usize, j: usize) -> Self {
        Self {
            target: None,
            kind: EntryKind::ReadOnly,
            i,
            j,
        }
    }

    /// The mapping this entry applies.
    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    /// Current value as seen at `(i, j)`.
    pub fn get(&self) -> T {
        match (&self.target, self.kind) {
            (Some(t), EntryKind::Direct) => **t,
            (Some(t), EntryKind::Conjugate) => t.conj(),
            (Some(t), EntryKind::Negate) => T::zero() - **t,
            (Some(t), EntryKind::Real) => T::from_real(t.re()),
            _ => T::zero(),
        }
    }

    /// Assign `x` at `(i, j)`, returning what was written to storage.
    ///
    /// Fails with [`MatrixError::NotSettable`] on a structural zero.
    pub fn set(self, x: T) -> Result<T, MatrixError> {
        let stored = match self.kind {
            EntryKind::Direct => x,
            EntryKind::Conjugate => x.conj(),
            EntryKind::Negate => T::zero() - x,
            EntryKind::Real => T::from_real(x.re()),
            EntryKind::ReadOnly => {
                return Err(MatrixError::NotSettable {
                    i: self.i,
                    j: self.j,
                })
            }
        };
        match self.target {
            Some(t) => {
                *t = stored;
                Ok(stored)
            }
            None => Err(MatrixError::NotSettable {
                i: self.i,
                j: self.j,
            }),
        }
    }

    /// Apply `f` to the current value and store the result.
    pub fn update(self, f: impl FnOnce(T) -> T) -> Result<T, MatrixError> {
        let v = f(self.get());
        self.set(v)
    }
}
