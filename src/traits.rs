use core::fmt::Debug;
use num_complex::Complex;
use num_traits::{Float, Num, One, Zero};

/// Trait for types that can be used as matrix elements.
///
/// Blanket-implemented for all types satisfying the bounds.
pub trait Scalar: Copy + PartialEq + Debug + Zero + One + Num {}

impl<T: Copy + PartialEq + Debug + Zero + One + Num> Scalar for T {}

/// Trait for real floating-point matrix elements.
///
/// Implies `LinalgScalar<Real = Self>` since real floats are their own real type.
/// Used by the inherently-real algorithms (balancing, Schur, Givens rotations).
pub trait FloatScalar: Scalar + Float + LinalgScalar<Real = Self> {}

impl<T: Scalar + Float + LinalgScalar<Real = T>> FloatScalar for T {}

/// Trait for matrix elements that support linear algebra operations.
///
/// Covers both real floats (`f32`, `f64`) and complex numbers (`Complex<f32>`,
/// `Complex<f64>`). Conjugation is the identity for reals, so one generic
/// kernel serves both the symmetric and Hermitian cases.
pub trait LinalgScalar: Scalar {
    /// The real component type (`Self` for reals, `T` for `Complex<T>`).
    type Real: FloatScalar;

    /// Absolute value / modulus: `|z|` for complex, `.abs()` for real.
    fn modulus(self) -> Self::Real;

    /// `|re| + |im|`, the cheap magnitude LAPACK uses for pivot selection.
    fn abs1(self) -> Self::Real;

    /// Complex conjugate (identity for reals).
    fn conj(self) -> Self;

    /// Real part.
    fn re(self) -> Self::Real;

    /// Square root.
    fn lsqrt(self) -> Self;

    /// Promote a real value into `Self`.
    fn from_real(r: Self::Real) -> Self;
}

/// Concrete impls for real floats: trivial delegation.
macro_rules! impl_linalg_scalar_real {
    ($($t:ty),*) => {
        $(
            impl LinalgScalar for $t {
                type Real = $t;

                #[inline] fn modulus(self) -> $t { Float::abs(self) }
                #[inline] fn abs1(self) -> $t { Float::abs(self) }
                #[inline] fn conj(self) -> $t { self }
                #[inline] fn re(self) -> $t { self }
                #[inline] fn lsqrt(self) -> $t { Float::sqrt(self) }
                #[inline] fn from_real(r: $t) -> $t { r }
            }
        )*
    };
}

impl_linalg_scalar_real!(f32, f64);

impl<T: FloatScalar> LinalgScalar for Complex<T> {
    type Real = T;

    #[inline]
    fn modulus(self) -> T {
        self.norm()
    }

    #[inline]
    fn abs1(self) -> T {
        self.re.abs() + self.im.abs()
    }

    #[inline]
    fn conj(self) -> Self {
        Complex::conj(&self)
    }

    #[inline]
    fn re(self) -> T {
        self.re
    }

    #[inline]
    fn lsqrt(self) -> Self {
        self.sqrt()
    }

    #[inline]
    fn from_real(r: T) -> Self {
        Complex::new(r, T::zero())
    }
}

/// Convert an `f64` constant into a real scalar.
#[inline]
pub(crate) fn real<R: FloatScalar>(x: f64) -> R {
    num_traits::cast(x).unwrap_or_else(R::nan)
}

/// Integer to real conversion for counts and orders.
#[inline]
pub(crate) fn real_from_usize<R: FloatScalar>(n: usize) -> R {
    num_traits::cast(n).unwrap_or_else(R::nan)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn real_conj_is_identity() {
        assert_eq!(LinalgScalar::conj(3.5_f64), 3.5);
        assert_eq!(LinalgScalar::re(-2.0_f64), -2.0);
    }

    #[test]
    fn complex_parts() {
        let z = Complex::new(3.0_f64, -4.0);
        assert_eq!(z.modulus(), 5.0);
        assert_eq!(z.abs1(), 7.0);
        assert_eq!(LinalgScalar::conj(z), Complex::new(3.0, 4.0));
        assert_eq!(LinalgScalar::re(z), 3.0);
    }

    #[test]
    fn constants() {
        let a: f64 = real(0.125);
        assert_eq!(a, 0.125);
        let n: f32 = real_from_usize(7);
        assert_eq!(n, 7.0);
    }
}
