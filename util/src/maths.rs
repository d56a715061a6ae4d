//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Clamp a value into the symmetric range `[-limit, limit]`.
///
/// A negative limit is treated as its magnitude.
pub fn clamp_sym<T>(value: T, limit: T) -> T
where
    T: Float
{
    let limit = limit.abs();
    value.max(-limit).min(limit)
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
/// 
/// This function is taken from the std library as num is missing it.
///
/// In particular, the return value `r` satisfies `0.0 <= r < rhs.abs()` in
/// most cases. However, due to a floating point round-off error it can
/// result in `r == rhs.abs()`, violating the mathematical definition, if
/// `self` is much smaller than `rhs.abs()` in magnitude and `self < 0.0`.
/// This result is not an element of the function's codomain, but it is the
/// closest floating point number in the real numbers and thus fulfills the
/// property `self == self.div_euclid(rhs) * rhs + self.rem_euclid(rhs)`
/// approximatively.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float
{
    let r = lhs % rhs;
    if r < T::zero() { r + rhs.abs() } else { r }
}

/// Map any angle in degrees into the range [0, 360).
pub fn wrap_360<T>(value: T) -> T
where
    T: Float
{
    let full: T = T::from(360.0).unwrap_or_else(T::zero);
    let r = rem_euclid(value, full);

    // Round-off can leave r == 360 for tiny negative inputs
    if r >= full { T::zero() } else { r }
}

/// Map any angle in degrees into the range (-180, 180].
pub fn wrap_180<T>(value: T) -> T
where
    T: Float
{
    let half: T = T::from(180.0).unwrap_or_else(T::zero);
    let full: T = half + half;
    let r = wrap_360(value);

    if r > half { r - full } else { r }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_wrapping() {
        assert_eq!(wrap_360(-10f64), 350f64);
        assert_eq!(wrap_360(720f64), 0f64);
        assert_eq!(wrap_360(-1e-18f64), 0f64);
        assert_eq!(wrap_180(190f64), -170f64);
        assert_eq!(wrap_180(-180f64), 180f64);
        assert_eq!(wrap_180(45f64), 45f64);
    }

    #[test]
    fn test_clamp_sym() {
        assert_eq!(clamp_sym(5f64, 4f64), 4f64);
        assert_eq!(clamp_sym(-5f64, -4f64), -4f64);
        assert_eq!(clamp_sym(1f64, 4f64), 1f64);
    }
}
