use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use derive_more::{From, Into};
use lazy_static::lazy_static;

use crate::{compiler::lexer::TokenKind, error::RuntimeError};

use super::{hash_string, RuntimeValue, Side, Span, ValueProtocol};

/// Unix timestamp of `0001-01-01 00:00:00 UTC`.
const ZERO_UNIX_SECONDS: i64 = -62_135_596_800;

lazy_static! {
    static ref ZERO: DateTime<Utc> =
        DateTime::from_timestamp(ZERO_UNIX_SECONDS, 0).expect("year 1 should be representable");
}

/// An absolute point in time with nanosecond precision.
///
/// [`Instant::zero()`] acts as a sentinel for "no time" and is the only falsy instant.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, From, Into)]
pub struct Instant(DateTime<Utc>);

impl Instant {
    /// The zero instant, `0001-01-01 00:00:00 UTC`.
    pub fn zero() -> Self {
        Self(*ZERO)
    }

    /// Reads the current time from the system clock.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    pub fn from_unix_nanos(nanos: i64) -> Self {
        Self(DateTime::from_timestamp_nanos(nanos))
    }

    pub fn is_zero(self) -> bool {
        self.0 == *ZERO
    }

    pub fn is_before(self, other: Self) -> bool {
        self.0 < other.0
    }

    pub fn is_after(self, other: Self) -> bool {
        self.0 > other.0
    }

    /// The span elapsed since `earlier`, saturating at the bounds of [`Span`].
    pub fn since(self, earlier: Self) -> Span {
        match self.0.signed_duration_since(earlier.0).num_nanoseconds() {
            Some(nanos) => Span::from_nanos(nanos),
            None if self.is_after(earlier) => Span::MAX,
            None => Span::MIN,
        }
    }

    /// Shifts the instant forwards by `span`, or [`None`] if the result is out of range.
    pub fn checked_add(self, span: Span) -> Option<Self> {
        self.0
            .checked_add_signed(TimeDelta::nanoseconds(span.as_nanos()))
            .map(Self)
    }

    /// Shifts the instant backwards by `span`, or [`None`] if the result is out of range.
    pub fn checked_sub(self, span: Span) -> Option<Self> {
        self.0
            .checked_sub_signed(TimeDelta::nanoseconds(span.as_nanos()))
            .map(Self)
    }

    fn shift(self, op: TokenKind, span: Span) -> Result<Self, RuntimeError> {
        let shifted = match op {
            TokenKind::Plus => self.checked_add(span),
            _ => self.checked_sub(span),
        };
        shifted.ok_or_else(|| RuntimeError::InstantOutOfRange {
            instant: self.to_string(),
            op: op.symbol(),
            span: span.to_string(),
        })
    }
}

/// Formats like `2009-11-10 23:00:00.5 +0000 UTC`.
impl fmt::Display for Instant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d %H:%M:%S"))?;
        let nanos = self.0.timestamp_subsec_nanos();
        if nanos != 0 {
            f.write_str(format!(".{nanos:09}").trim_end_matches('0'))?;
        }
        f.write_str(" +0000 UTC")
    }
}

impl ValueProtocol for Instant {
    fn type_name(&self) -> &'static str {
        "time"
    }

    fn freeze(&self) {}

    fn truth(&self) -> bool {
        !self.is_zero()
    }

    fn hash(&self) -> Result<u32, RuntimeError> {
        Ok(hash_string(&self.to_string()))
    }

    fn compare_same_type(&self, op: TokenKind, other: &Self) -> bool {
        let (lhs, rhs) = (*self, *other);
        match op {
            TokenKind::EqEq => lhs == rhs,
            TokenKind::Ne => lhs != rhs,
            TokenKind::Le => lhs == rhs || lhs.is_before(rhs),
            TokenKind::Lt => lhs.is_before(rhs),
            TokenKind::Ge => lhs == rhs || lhs.is_after(rhs),
            TokenKind::Gt => lhs.is_after(rhs),
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
        match (op, other) {
            (TokenKind::Minus, RuntimeValue::Instant(other)) => {
                Ok(Some(RuntimeValue::Span(self.since(*other))))
            }
            (TokenKind::Plus | TokenKind::Minus, RuntimeValue::Span(span)) => {
                Ok(Some(RuntimeValue::Instant(self.shift(op, *span)?)))
            }
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_year_one() {
        assert_eq!(Instant::zero().to_string(), "0001-01-01 00:00:00 +0000 UTC");
        assert!(Instant::zero().is_zero());
        assert!(!Instant::zero().truth());
    }

    #[test]
    fn unix_epoch_is_truthy() {
        let epoch = Instant::from_unix_nanos(0);

        assert_eq!(epoch.to_string(), "1970-01-01 00:00:00 +0000 UTC");
        assert!(epoch.truth());
    }

    #[test]
    fn display_trims_fraction() {
        assert_eq!(
            Instant::from_unix_nanos(1_500_000_000).to_string(),
            "1970-01-01 00:00:01.5 +0000 UTC"
        );
        assert_eq!(
            Instant::from_unix_nanos(-1).to_string(),
            "1969-12-31 23:59:59.999999999 +0000 UTC"
        );
    }

    #[test]
    fn compares_chronologically() {
        let earlier = Instant::from_unix_nanos(10);
        let later = Instant::from_unix_nanos(20);

        assert!(earlier.compare_same_type(TokenKind::Lt, &later));
        assert!(earlier.compare_same_type(TokenKind::Le, &later));
        assert!(earlier.compare_same_type(TokenKind::Le, &earlier));
        assert!(later.compare_same_type(TokenKind::Gt, &earlier));
        assert!(later.compare_same_type(TokenKind::Ge, &later));
        assert!(earlier.compare_same_type(TokenKind::Ne, &later));
        assert!(!earlier.compare_same_type(TokenKind::EqEq, &later));
        assert!(!later.compare_same_type(TokenKind::Lt, &earlier));
    }

    #[test]
    #[should_panic(expected = "unexpected comparison operator")]
    fn compare_rejects_arithmetic_operator() {
        let now = Instant::from_unix_nanos(0);
        now.compare_same_type(TokenKind::Minus, &now);
    }

    #[test]
    fn subtracting_instants_yields_span() {
        let earlier = Instant::from_unix_nanos(1_000);
        let later = Instant::from_unix_nanos(5_000);

        assert_eq!(
            later.binary(TokenKind::Minus, &RuntimeValue::Instant(earlier), Side::Left),
            Ok(Some(RuntimeValue::Span(Span::from_nanos(4_000))))
        );
        assert_eq!(
            earlier.binary(TokenKind::Minus, &RuntimeValue::Instant(later), Side::Left),
            Ok(Some(RuntimeValue::Span(Span::from_nanos(-4_000))))
        );
        assert_eq!(
            later.binary(TokenKind::Plus, &RuntimeValue::Instant(earlier), Side::Left),
            Ok(None)
        );
    }

    #[test]
    fn difference_saturates() {
        assert_eq!(Instant::from_unix_nanos(0).since(Instant::zero()), Span::MAX);
        assert_eq!(Instant::zero().since(Instant::from_unix_nanos(0)), Span::MIN);
    }

    #[test]
    fn shifting_by_span() {
        let instant = Instant::from_unix_nanos(0);
        let span = RuntimeValue::Span(Span::SECOND);

        assert_eq!(
            instant.binary(TokenKind::Plus, &span, Side::Left),
            Ok(Some(RuntimeValue::Instant(Instant::from_unix_nanos(
                1_000_000_000
            ))))
        );
        assert_eq!(
            instant.binary(TokenKind::Minus, &span, Side::Left),
            Ok(Some(RuntimeValue::Instant(Instant::from_unix_nanos(
                -1_000_000_000
            ))))
        );
        assert_eq!(instant.binary(TokenKind::Plus, &span, Side::Right), Ok(None));
    }

    #[test]
    fn shifting_out_of_range_fails() {
        let min = Instant::from(DateTime::<Utc>::MIN_UTC);
        let span = RuntimeValue::Span(Span::NANOSECOND);

        let result = min.binary(TokenKind::Minus, &span, Side::Left);

        let Err(error) = result else {
            panic!("expected an overflow, got {result:?}");
        };
        assert_eq!(error.kind(), crate::error::ErrorKind::Overflow);
    }

    #[test]
    fn hash_follows_text() {
        let instant = Instant::from_unix_nanos(42);

        assert_eq!(instant.hash(), Ok(hash_string(&instant.to_string())));
        assert_eq!(instant.hash(), Instant::from_unix_nanos(42).hash());
    }
}
