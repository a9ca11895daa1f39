use std::sync::Arc;

use thiserror::Error;

/// Errors raised while evaluating code or calling builtins.
///
/// All of them are caused by the script itself and are reported back to its author. Broken
/// invariants of the host panic instead.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("{function}: got {count} positional argument(s), want {expected}")]
    UnexpectedPositional {
        function: Arc<str>,
        count: usize,
        expected: usize,
    },
    #[error("{function}: got {count} keyword argument(s), want 0")]
    UnexpectedKeywords { function: Arc<str>, count: usize },
    #[error("{function}: keyword argument name must be a string, got {type_name}")]
    InvalidKeywordName {
        function: Arc<str>,
        type_name: &'static str,
    },
    #[error("invalid value for timedelta arg `{unit}`, must be int, got {type_name}")]
    InvalidUnitValue {
        unit: String,
        type_name: &'static str,
    },
    #[error("numeric value for `{unit}` overflows int64")]
    UnitOverflow { unit: String },
    #[error("invalid duration unit: {0}")]
    UnknownUnit(String),
    #[error("time out of range: {instant} {op} {span}")]
    InstantOutOfRange {
        instant: String,
        op: &'static str,
        span: String,
    },
    #[error("unsupported binary operation: {lhs} {op} {rhs}")]
    UnsupportedBinary {
        op: &'static str,
        lhs: &'static str,
        rhs: &'static str,
    },
    #[error("unsupported comparison: {lhs} {op} {rhs}")]
    UnsupportedComparison {
        op: &'static str,
        lhs: &'static str,
        rhs: &'static str,
    },
    #[error("unsupported unary operation: {op}{operand}")]
    UnsupportedUnary {
        op: &'static str,
        operand: &'static str,
    },
    #[error("invalid call of non-function ({0})")]
    NotCallable(&'static str),
    #[error("undefined: {0}")]
    Undefined(String),
}

/// The broad category of a [`RuntimeError`].
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum ErrorKind {
    /// A builtin received arguments it does not accept.
    Arity,
    /// A value has the wrong type for the operation.
    Type,
    /// A number does not fit the range required by the operation.
    Overflow,
    /// A `timedelta` keyword that is not a known unit.
    UnknownUnit,
    /// A name that is not bound.
    Name,
}

impl RuntimeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnexpectedPositional { .. } | Self::UnexpectedKeywords { .. } => {
                ErrorKind::Arity
            }
            Self::InvalidKeywordName { .. }
            | Self::InvalidUnitValue { .. }
            | Self::UnsupportedBinary { .. }
            | Self::UnsupportedComparison { .. }
            | Self::UnsupportedUnary { .. }
            | Self::NotCallable(_) => ErrorKind::Type,
            Self::UnitOverflow { .. } | Self::InstantOutOfRange { .. } => ErrorKind::Overflow,
            Self::UnknownUnit(_) => ErrorKind::UnknownUnit,
            Self::Undefined(_) => ErrorKind::Name,
        }
    }
}
