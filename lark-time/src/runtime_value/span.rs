use std::{
    fmt,
    ops::{Add, Neg, Sub},
};

use derive_more::{From, Into};

use crate::{compiler::lexer::TokenKind, error::RuntimeError};

use super::{hash_string, RuntimeValue, Side, ValueProtocol};

/// A signed amount of elapsed time with nanosecond granularity.
///
/// Arithmetic wraps around at the bounds of [`i64`] instead of saturating or panicking.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord, From, Into)]
pub struct Span(i64);

impl Span {
    pub const ZERO: Self = Self(0);
    pub const NANOSECOND: Self = Self(1);
    pub const MICROSECOND: Self = Self(1_000);
    pub const MILLISECOND: Self = Self(1_000_000);
    pub const SECOND: Self = Self(1_000_000_000);
    pub const MINUTE: Self = Self(60_000_000_000);
    pub const HOUR: Self = Self(3_600_000_000_000);

    pub const MIN: Self = Self(i64::MIN);
    pub const MAX: Self = Self(i64::MAX);

    pub const fn from_nanos(nanos: i64) -> Self {
        Self(nanos)
    }

    pub const fn as_nanos(self) -> i64 {
        self.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Multiplies by a plain factor, wrapping on overflow.
    pub const fn wrapping_mul(self, factor: i64) -> Self {
        Self(self.0.wrapping_mul(factor))
    }
}

impl Add for Span {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0.wrapping_add(rhs.0))
    }
}

impl Sub for Span {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0.wrapping_sub(rhs.0))
    }
}

impl Neg for Span {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self(self.0.wrapping_neg())
    }
}

/// Formats like `1h2m3.5s`, `1.5µs` or `0s`.
///
/// Spans of at least a second use hours, minutes and seconds, omitting leading zero units. Shorter
/// spans use the largest of `ms`, `µs` and `ns` that keeps the whole part non-zero.
impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let nanos = self.0.unsigned_abs();
        if nanos == 0 {
            return f.write_str("0s");
        }
        if self.0 < 0 {
            f.write_str("-")?;
        }

        if nanos < Self::SECOND.as_nanos().unsigned_abs() {
            let (digits, unit) = if nanos < Self::MICROSECOND.as_nanos().unsigned_abs() {
                (0, "ns")
            } else if nanos < Self::MILLISECOND.as_nanos().unsigned_abs() {
                (3, "µs")
            } else {
                (6, "ms")
            };
            let (whole, fraction) = split_fraction(nanos, digits);
            return write!(f, "{whole}{fraction}{unit}");
        }

        let (seconds, fraction) = split_fraction(nanos, 9);
        let (hours, minutes, seconds) = (seconds / 3600, seconds / 60 % 60, seconds % 60);
        if hours > 0 {
            write!(f, "{hours}h{minutes}m")?;
        } else if minutes > 0 {
            write!(f, "{minutes}m")?;
        }
        write!(f, "{seconds}{fraction}s")
    }
}

/// Splits `value` into its whole part and the decimal fraction of the last `digits` digits.
///
/// The fraction includes the leading `.` and drops trailing zeros; it is empty if zero.
fn split_fraction(value: u64, digits: u32) -> (u64, String) {
    let scale = 10u64.pow(digits);
    let fraction = value % scale;
    let fraction = if fraction == 0 {
        String::new()
    } else {
        format!(".{fraction:0width$}", width = digits as usize)
            .trim_end_matches('0')
            .to_owned()
    };
    (value / scale, fraction)
}

impl ValueProtocol for Span {
    fn type_name(&self) -> &'static str {
        "duration"
    }

    fn freeze(&self) {}

    fn truth(&self) -> bool {
        !self.is_zero()
    }

    fn hash(&self) -> Result<u32, RuntimeError> {
        Ok(hash_string(&self.to_string()))
    }

    fn compare_same_type(&self, op: TokenKind, other: &Self) -> bool {
        let (lhs, rhs) = (self.0, other.0);
        match op {
            TokenKind::EqEq => lhs == rhs,
            TokenKind::Ne => lhs != rhs,
            TokenKind::Le => lhs <= rhs,
            TokenKind::Lt => lhs < rhs,
            TokenKind::Ge => lhs >= rhs,
            TokenKind::Gt => lhs > rhs,
            _ => unreachable!("unexpected comparison operator {}", op.name()),
        }
    }

    fn binary(
        &self,
        op: TokenKind,
        other: &RuntimeValue,
        side: Side,
    ) -> Result<Option<RuntimeValue>, RuntimeError> {
        if side == Side::Right {
            return Ok(None);
        }
        let RuntimeValue::Span(other) = other else {
            return Ok(None);
        };
        Ok(match op {
            TokenKind::Plus => Some(RuntimeValue::Span(*self + *other)),
            TokenKind::Minus => Some(RuntimeValue::Span(*self - *other)),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn display(nanos: i64) -> String {
        Span::from_nanos(nanos).to_string()
    }

    #[test]
    fn display_zero() {
        assert_eq!(display(0), "0s");
    }

    #[test]
    fn display_sub_second() {
        assert_eq!(display(1), "1ns");
        assert_eq!(display(999), "999ns");
        assert_eq!(display(1_000), "1µs");
        assert_eq!(Span::MICROSECOND.to_string(), "1µs");
        assert_eq!(Span::MILLISECOND.to_string(), "1ms");
        assert_eq!(display(1_500), "1.5µs");
        assert_eq!(display(100_000_000), "100ms");
        assert_eq!(display(1_100_000), "1.1ms");
        assert_eq!(display(-1_500), "-1.5µs");
    }

    #[test]
    fn display_seconds_and_up() {
        assert_eq!(display(1_000_000_000), "1s");
        assert_eq!(display(2_500_000_000), "2.5s");
        assert_eq!(display(60_000_000_000), "1m0s");
        assert_eq!(display(3_723_000_000_000), "1h2m3s");
        assert_eq!(display(3_600_000_000_000), "1h0m0s");
        assert_eq!(display(-3_600_000_000_000), "-1h0m0s");
        assert_eq!(display(1_000_000_001), "1.000000001s");
    }

    #[test]
    fn display_extremes() {
        assert_eq!(Span::MAX.to_string(), "2562047h47m16.854775807s");
        assert_eq!(Span::MIN.to_string(), "-2562047h47m16.854775808s");
    }

    #[test]
    fn arithmetic_wraps_around() {
        assert_eq!(Span::MAX + Span::NANOSECOND, Span::MIN);
        assert_eq!(Span::MIN - Span::NANOSECOND, Span::MAX);
        assert_eq!(-Span::MIN, Span::MIN);
        assert_eq!(
            Span::HOUR.wrapping_mul(i64::MAX),
            Span::from_nanos(i64::MAX.wrapping_mul(3_600_000_000_000))
        );
    }

    #[test]
    fn truthiness() {
        assert!(!Span::ZERO.truth());
        assert!(Span::NANOSECOND.truth());
        assert!((-Span::SECOND).truth());
    }

    #[test]
    fn compares_numerically() {
        let (one, two) = (Span::SECOND, Span::SECOND + Span::SECOND);

        assert!(one.compare_same_type(TokenKind::Lt, &two));
        assert!(one.compare_same_type(TokenKind::Le, &one));
        assert!(two.compare_same_type(TokenKind::Gt, &one));
        assert!(two.compare_same_type(TokenKind::Ge, &two));
        assert!(one.compare_same_type(TokenKind::Ne, &two));
        assert!(!one.compare_same_type(TokenKind::EqEq, &two));
    }

    #[test]
    #[should_panic(expected = "unexpected comparison operator")]
    fn compare_rejects_arithmetic_operator() {
        Span::ZERO.compare_same_type(TokenKind::Plus, &Span::ZERO);
    }

    #[test]
    fn binary_only_applies_on_left_to_spans() {
        let span = RuntimeValue::Span(Span::SECOND);

        assert_eq!(
            Span::MINUTE.binary(TokenKind::Minus, &span, Side::Left),
            Ok(Some(RuntimeValue::Span(Span::from_nanos(59_000_000_000))))
        );
        assert_eq!(Span::MINUTE.binary(TokenKind::Plus, &span, Side::Right), Ok(None));
        assert_eq!(
            Span::MINUTE.binary(TokenKind::Plus, &RuntimeValue::Int(1.into()), Side::Left),
            Ok(None)
        );
        assert_eq!(Span::MINUTE.binary(TokenKind::Lt, &span, Side::Left), Ok(None));
    }

    #[test]
    fn hash_follows_text() {
        assert_eq!(Span::SECOND.hash(), Ok(hash_string("1s")));
        assert_eq!(Span::MINUTE.hash(), Span::SECOND.wrapping_mul(60).hash());
    }
}
