use std::ops::Range;

use num_bigint::BigInt;

use super::lexer::TokenKind;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Statement {
    Assign {
        name: String,
        value: Expression,
    },
    Expression(Expression),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Expression {
    pub kind: ExpressionKind,
    /// Byte range of the whole expression within the code.
    pub range: Range<usize>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExpressionKind {
    None,
    Bool(bool),
    Int(BigInt),
    String(String),
    Name(String),
    Not(Box<Expression>),
    Negate(Box<Expression>),
    /// Either `+` or `-`.
    Binary {
        op: TokenKind,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },
    /// One of the six comparison operators; comparisons do not chain.
    Compare {
        op: TokenKind,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },
    Call {
        callee: Box<Expression>,
        positional: Vec<Expression>,
        keywords: Vec<(String, Expression)>,
    },
}

impl Expression {
    pub fn new(kind: ExpressionKind, range: Range<usize>) -> Self {
        Self { kind, range }
    }
}
