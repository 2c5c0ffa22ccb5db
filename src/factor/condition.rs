use num_traits::{Float, One, Zero};

use crate::traits::{real_from_usize, LinalgScalar};

const ITMAX: usize = 5;

fn sum_abs<T: LinalgScalar>(x: &[T]) -> T::Real {
    x.iter().fold(T::Real::zero(), |acc, v| acc + v.modulus())
}

fn sign<T: LinalgScalar>(v: T) -> T {
    let m = v.modulus();
    if m == T::Real::zero() {
        T::one()
    } else {
        v * T::from_real(T::Real::one() / m)
    }
}

/// Estimate `‖A⁻¹‖₁` from `solve` (`x ← A⁻¹x`) and `solve_adjoint`
/// (`x ← A⁻ᴴx`), Hager's iteration with Higham's alternating-sign fallback.
pub(crate) fn inverse_norm_one<T: LinalgScalar>(
    n: usize,
    solve: impl Fn(&mut [T]),
    solve_adjoint: impl Fn(&mut [T]),
) -> T::Real {
    if n == 0 {
        return T::Real::zero();
    }
    let inv_n = T::from_real(T::Real::one() / real_from_usize::<T::Real>(n));
    let mut x = vec![inv_n; n];
    solve(&mut x);
    if n == 1 {
        return x[0].modulus();
    }

    let mut est = sum_abs(&x);
    let mut last_j = None;
    for iter in 0..ITMAX {
        let mut z: Vec<T> = x.iter().map(|&v| sign(v)).collect();
        solve_adjoint(&mut z);

        let mut j = 0;
        let mut zmax = T::Real::zero();
        for (i, v) in z.iter().enumerate() {
            if v.modulus() > zmax {
                zmax = v.modulus();
                j = i;
            }
        }
        if iter > 0 && last_j == Some(j) {
            break;
        }
        last_j = Some(j);

        x.iter_mut().for_each(|v| *v = T::zero());
        x[j] = T::one();
        solve(&mut x);
        let next = sum_abs(&x);
        log::trace!("condition estimate iteration {}: {:?}", iter, next);
        if next <= est {
            break;
        }
        est = next;
    }

    // x_i = (-1)^i (1 + i/(n-1))
    let denom = real_from_usize::<T::Real>(n - 1);
    let mut alt: Vec<T> = (0..n)
        .map(|i| {
            let mag = T::Real::one() + real_from_usize::<T::Real>(i) / denom;
            let v = T::from_real(mag);
            if i % 2 == 0 {
                v
            } else {
                T::zero() - v
            }
        })
        .collect();
    solve(&mut alt);
    let three_n = real_from_usize::<T::Real>(3 * n);
    let two = T::Real::one() + T::Real::one();
    let alt_est = two * sum_abs(&alt) / three_n;
    est.max(alt_est)
}

/// `1 / (‖A‖₁ · est‖A⁻¹‖₁)` in `[0, 1]`, zero for a zero matrix.
pub(crate) fn reciprocal_condition<T: LinalgScalar>(
    n: usize,
    anorm: T::Real,
    solve: impl Fn(&mut [T]),
    solve_adjoint: impl Fn(&mut [T]),
) -> T::Real {
    if n == 0 {
        return T::Real::one();
    }
    if anorm == T::Real::zero() {
        return T::Real::zero();
    }
    let ainvnm = inverse_norm_one(n, solve, solve_adjoint);
    if ainvnm == T::Real::zero() || !ainvnm.is_finite() {
        return T::Real::zero();
    }
    // rounding in the two norms can push a perfectly conditioned estimate past one
    ((T::Real::one() / ainvnm) / anorm).min(T::Real::one())
}
