use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{Add, Div, Mul, Neg, Sub};

/// Numeric primitive. Integers and floats share one representation, the
/// distinction only survives in the IR constants.
#[derive(Debug, Clone, Copy, Default)]
pub struct Number(f64);

impl Number {
    pub const ZERO: Number = Number(0.0);

    pub fn new(value: f64) -> Self {
        Number(value)
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// Truncates toward zero.
    pub fn to_int(self) -> i64 {
        self.0 as i64
    }

    pub fn is_int(&self) -> bool {
        self.0.is_finite() && self.0.fract() == 0.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0.0
    }

    /// Returns the number as an array index when it is a non-negative integer.
    pub fn as_index(&self) -> Option<usize> {
        (self.is_int() && self.0 >= 0.0).then_some(self.0 as usize)
    }

    pub fn floor(self) -> Self {
        Number(self.0.floor())
    }

    /// Bit pattern used for structural hashing, `-0.0` and `0.0` collapse and
    /// every NaN hashes alike.
    fn canonical_bits(&self) -> u64 {
        if self.0.is_nan() {
            f64::NAN.to_bits()
        } else if self.0 == 0.0 {
            0
        } else {
            self.0.to_bits()
        }
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Number {}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Number {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.0.is_nan(), other.0.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => self.0.partial_cmp(&other.0).unwrap_or(Ordering::Equal),
        }
    }
}

impl Hash for Number {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical_bits().hash(state);
    }
}

impl Neg for Number {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Number(-self.0)
    }
}

impl Add for Number {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Number(self.0 + other.0)
    }
}

impl Sub for Number {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Number(self.0 - other.0)
    }
}

impl Mul for Number {
    type Output = Self;

    fn mul(self, other: Self) -> Self {
        Number(self.0 * other.0)
    }
}

impl Div for Number {
    type Output = Self;

    fn div(self, other: Self) -> Self {
        Number(self.0 / other.0)
    }
}

impl From<i64> for Number {
    fn from(value: i64) -> Self {
        Number(value as f64)
    }
}

impl From<i32> for Number {
    fn from(value: i32) -> Self {
        Number(value as f64)
    }
}

impl From<usize> for Number {
    fn from(value: usize) -> Self {
        Number(value as f64)
    }
}

impl From<u64> for Number {
    fn from(value: u64) -> Self {
        Number(value as f64)
    }
}

impl From<f64> for Number {
    fn from(value: f64) -> Self {
        Number(value)
    }
}

/// Integral values with magnitude below 2^63 print through `i64`.
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_int() && self.0.abs() < I64_BOUND {
            write!(f, "{}", self.0 as i64)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::hash::DefaultHasher;

    fn hash_of(n: Number) -> u64 {
        let mut hasher = DefaultHasher::new();
        n.hash(&mut hasher);
        hasher.finish()
    }

    #[rstest]
    #[case::int(42.0, "42")]
    #[case::negative(-3.0, "-3")]
    #[case::fraction(1.5, "1.5")]
    #[case::small(0.125, "0.125")]
    #[case::beyond_i64(1e20, "100000000000000000000")]
    #[case::tiny(1e-16, "0.0000000000000001")]
    fn test_display(#[case] value: f64, #[case] expected: &str) {
        assert_eq!(Number::new(value).to_string(), expected);
    }

    #[rstest]
    #[case::zero(0.0, Some(0))]
    #[case::positive(7.0, Some(7))]
    #[case::negative(-1.0, None)]
    #[case::fraction(1.5, None)]
    fn test_as_index(#[case] value: f64, #[case] expected: Option<usize>) {
        assert_eq!(Number::new(value).as_index(), expected);
    }

    #[rstest]
    #[case::zero(0.0, true)]
    #[case::negative_zero(-0.0, true)]
    #[case::tiny(1e-16, false)]
    #[case::subnormal(f64::MIN_POSITIVE / 2.0, false)]
    fn test_is_zero(#[case] value: f64, #[case] expected: bool) {
        assert_eq!(Number::new(value).is_zero(), expected);
    }

    #[test]
    fn test_signed_zero_hashes_alike() {
        assert_eq!(Number::new(0.0), Number::new(-0.0));
        assert_eq!(hash_of(Number::new(0.0)), hash_of(Number::new(-0.0)));
    }

    #[test]
    fn test_nan_sorts_last() {
        let mut numbers = vec![Number::new(f64::NAN), Number::new(1.0), Number::new(-2.0)];
        numbers.sort();
        assert_eq!(numbers[0], Number::new(-2.0));
        assert_eq!(numbers[1], Number::new(1.0));
        assert!(numbers[2].value().is_nan());
    }
}
