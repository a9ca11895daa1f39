mod builtin;
mod instant;
mod span;

use std::{cmp::Ordering, fmt, sync::Arc};

use num_bigint::BigInt;
use num_traits::Zero;

use crate::{compiler::lexer::TokenKind, error::RuntimeError};

pub use self::{
    builtin::{Arguments, Builtin, DynFunction},
    instant::Instant,
    span::Span,
};

/// The capabilities every value kind that plugs into the interpreter provides.
pub trait ValueProtocol: fmt::Display {
    /// The name scripts see for this kind of value.
    fn type_name(&self) -> &'static str;

    /// Makes the value safe to share between threads.
    ///
    /// Values that are immutable from the start have nothing to do.
    fn freeze(&self);

    fn truth(&self) -> bool;

    /// A hash that is equal for equal values.
    fn hash(&self) -> Result<u32, RuntimeError>;

    /// Compares two values of the same kind.
    ///
    /// # Panics
    ///
    /// Panics if `op` is not a comparison operator.
    fn compare_same_type(&self, op: TokenKind, other: &Self) -> bool;

    /// Applies a binary operator with this value on the given `side`.
    ///
    /// Returns `Ok(None)` if the operator is not applicable to the operands, which allows the other
    /// operand to handle it instead.
    fn binary(
        &self,
        op: TokenKind,
        other: &RuntimeValue,
        side: Side,
    ) -> Result<Option<RuntimeValue>, RuntimeError>;
}

/// Which operand of a binary operator a value is.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// A type that can store any runtime value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum RuntimeValue {
    #[default]
    None,
    Bool(bool),
    Int(BigInt),
    String(Arc<str>),
    Instant(Instant),
    Span(Span),
    Builtin(Builtin),
}

impl RuntimeValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::None => "NoneType",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::String(_) => "string",
            Self::Instant(instant) => instant.type_name(),
            Self::Span(span) => span.type_name(),
            Self::Builtin(_) => "builtin_function_or_method",
        }
    }

    pub fn freeze(&self) {
        match self {
            Self::Instant(instant) => instant.freeze(),
            Self::Span(span) => span.freeze(),
            _ => {}
        }
    }

    pub fn truth(&self) -> bool {
        match self {
            Self::None => false,
            Self::Bool(value) => *value,
            Self::Int(value) => !value.is_zero(),
            Self::String(value) => !value.is_empty(),
            Self::Instant(instant) => instant.truth(),
            Self::Span(span) => span.truth(),
            Self::Builtin(_) => true,
        }
    }

    pub fn hash(&self) -> Result<u32, RuntimeError> {
        match self {
            Self::String(value) => Ok(hash_string(value)),
            Self::Instant(instant) => instant.hash(),
            Self::Span(span) => span.hash(),
            _ => Ok(hash_string(&self.to_string())),
        }
    }

    /// Applies `+` or `-` to two values.
    ///
    /// Numbers and strings are handled directly. Anything else is offered to the left operand
    /// first and then to the right one.
    pub fn binary(&self, op: TokenKind, rhs: &RuntimeValue) -> Result<RuntimeValue, RuntimeError> {
        match (op, self, rhs) {
            (TokenKind::Plus, Self::Int(lhs), Self::Int(rhs)) => return Ok(Self::Int(lhs + rhs)),
            (TokenKind::Minus, Self::Int(lhs), Self::Int(rhs)) => return Ok(Self::Int(lhs - rhs)),
            (TokenKind::Plus, Self::String(lhs), Self::String(rhs)) => {
                return Ok(Self::String(format!("{lhs}{rhs}").into()))
            }
            _ => {}
        }

        if let Some(result) = self.protocol_binary(op, rhs, Side::Left)? {
            return Ok(result);
        }
        tracing::trace!(
            op = op.symbol(),
            lhs = self.type_name(),
            rhs = rhs.type_name(),
            "left operand declined, trying right operand"
        );
        if let Some(result) = rhs.protocol_binary(op, self, Side::Right)? {
            return Ok(result);
        }

        Err(RuntimeError::UnsupportedBinary {
            op: op.symbol(),
            lhs: self.type_name(),
            rhs: rhs.type_name(),
        })
    }

    fn protocol_binary(
        &self,
        op: TokenKind,
        other: &RuntimeValue,
        side: Side,
    ) -> Result<Option<RuntimeValue>, RuntimeError> {
        match self {
            Self::Instant(instant) => instant.binary(op, other, side),
            Self::Span(span) => span.binary(op, other, side),
            _ => Ok(None),
        }
    }

    /// Compares two values using one of the six comparison operators.
    ///
    /// Values of different kinds are never equal and cannot be ordered.
    ///
    /// # Panics
    ///
    /// Panics if `op` is not a comparison operator.
    pub fn compare(&self, op: TokenKind, rhs: &RuntimeValue) -> Result<bool, RuntimeError> {
        let ordering = match (self, rhs) {
            (Self::Instant(lhs), Self::Instant(rhs)) => return Ok(lhs.compare_same_type(op, rhs)),
            (Self::Span(lhs), Self::Span(rhs)) => return Ok(lhs.compare_same_type(op, rhs)),
            (Self::Bool(lhs), Self::Bool(rhs)) => Some(lhs.cmp(rhs)),
            (Self::Int(lhs), Self::Int(rhs)) => Some(lhs.cmp(rhs)),
            (Self::String(lhs), Self::String(rhs)) => Some(lhs.cmp(rhs)),
            _ => None,
        };

        match (ordering, op) {
            (Some(ordering), _) => Ok(compare_ordering(op, ordering)),
            (None, TokenKind::EqEq) => Ok(self == rhs),
            (None, TokenKind::Ne) => Ok(self != rhs),
            (None, _) => {
                assert!(op.is_comparison(), "unexpected comparison operator {}", op.name());
                Err(RuntimeError::UnsupportedComparison {
                    op: op.symbol(),
                    lhs: self.type_name(),
                    rhs: rhs.type_name(),
                })
            }
        }
    }

    /// Applies unary `-`, which is only defined for ints.
    pub fn negate(&self) -> Result<RuntimeValue, RuntimeError> {
        match self {
            Self::Int(value) => Ok(Self::Int(-value)),
            _ => Err(RuntimeError::UnsupportedUnary {
                op: TokenKind::Minus.symbol(),
                operand: self.type_name(),
            }),
        }
    }
}

impl fmt::Display for RuntimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Bool(true) => f.write_str("True"),
            Self::Bool(false) => f.write_str("False"),
            Self::Int(value) => fmt::Display::fmt(value, f),
            Self::String(value) => f.write_str(value),
            Self::Instant(instant) => fmt::Display::fmt(instant, f),
            Self::Span(span) => fmt::Display::fmt(span, f),
            Self::Builtin(builtin) => fmt::Display::fmt(builtin, f),
        }
    }
}

impl From<Instant> for RuntimeValue {
    fn from(value: Instant) -> Self {
        Self::Instant(value)
    }
}

impl From<Span> for RuntimeValue {
    fn from(value: Span) -> Self {
        Self::Span(value)
    }
}

impl From<BigInt> for RuntimeValue {
    fn from(value: BigInt) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for RuntimeValue {
    fn from(value: &str) -> Self {
        Self::String(value.into())
    }
}

impl From<Builtin> for RuntimeValue {
    fn from(value: Builtin) -> Self {
        Self::Builtin(value)
    }
}

/// Hashes a string using 32-bit FNV-1a without an offset basis.
pub fn hash_string(string: &str) -> u32 {
    string.bytes().fold(0, |hash: u32, byte| {
        (hash ^ u32::from(byte)).wrapping_mul(16_777_619)
    })
}

fn compare_ordering(op: TokenKind, ordering: Ordering) -> bool {
    match op {
        TokenKind::EqEq => ordering.is_eq(),
        TokenKind::Ne => ordering.is_ne(),
        TokenKind::Le => ordering.is_le(),
        TokenKind::Lt => ordering.is_lt(),
        TokenKind::Ge => ordering.is_ge(),
        TokenKind::Gt => ordering.is_gt(),
        _ => unreachable!("unexpected comparison operator {}", op.name()),
    }
}
