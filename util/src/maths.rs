//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Clamp a value into the range `[min, max]`.
pub fn clamp<T>(value: T, min: T, max: T) -> T
where
    T: Float
{
    value.max(min).min(max)
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
///
/// This function is taken from the std library as num is missing it.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float
{
    let r = lhs % rhs;
    if r < T::zero() { r + rhs.abs() } else { r }
}

/// Wrap an angle into the range `[-pi, pi)`.
pub fn wrap_to_pi<T>(angle: T) -> T
where
    T: Float
{
    let pi = T::from(std::f64::consts::PI).unwrap_or_else(T::zero);
    let tau = pi + pi;

    rem_euclid(angle + pi, tau) - pi
}

/// Quantile function of the exponential distribution with rate `lambda`.
///
/// `p` is the cumulative probability. The exponential distribution with rate
/// 0.5 is the chi-squared distribution with two degrees of freedom.
pub fn exponential_quantile<T>(lambda: T, p: T) -> T
where
    T: Float
{
    -(T::one() - p).ln() / lambda
}
