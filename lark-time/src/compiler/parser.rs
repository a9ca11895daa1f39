use std::ops::Range;

use num_bigint::BigInt;
use thiserror::Error;

use super::{
    ast::{Expression, ExpressionKind, Statement},
    diagnostic::Diagnostic,
    lexer::{unescape, LexError, Token, TokenKind, TokenStream},
};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("expected {0}")]
    Expected(&'static str),
    #[error("unexpected {}", .0.name())]
    UnexpectedToken(TokenKind),
    #[error("unexpected end of code")]
    UnexpectedEof,
    #[error("positional argument follows keyword argument")]
    PositionalAfterKeyword,
    #[error("keyword argument `{0}` repeated")]
    RepeatedKeyword(String),
    #[error("expression nested too deeply")]
    TooDeep,
}

/// How deeply expressions may nest before parsing gives up.
///
/// Parsing and evaluation both recurse along the nesting, so this bounds their stack usage.
pub const MAX_DEPTH: usize = 200;

/// Parses a whole program into its statements.
///
/// Parsing stops at the first error.
pub fn parse(code: &str) -> Result<Vec<Statement>, Diagnostic> {
    Parser::new(code).program()
}

/// Parses a single expression, which must span the entire code.
pub fn parse_expression(code: &str) -> Result<Expression, Diagnostic> {
    let mut parser = Parser::new(code);
    let expression = parser.expression()?;
    parser.skip_separators()?;
    match parser.peek()? {
        None => Ok(expression),
        Some(token) => Err(parser.unexpected(token)),
    }
}

struct Parser<'code> {
    code: &'code str,
    token_stream: TokenStream,
    /// How many parentheses are currently open; newlines are insignificant inside of them.
    nesting: usize,
    /// How many nested subexpressions are currently being parsed.
    depth: usize,
}

impl<'code> Parser<'code> {
    fn new(code: &'code str) -> Self {
        Self {
            code,
            token_stream: TokenStream::new(),
            nesting: 0,
            depth: 0,
        }
    }

    fn program(mut self) -> Result<Vec<Statement>, Diagnostic> {
        let mut statements = Vec::new();
        loop {
            self.skip_separators()?;
            if self.peek()?.is_none() {
                return Ok(statements);
            }
            statements.push(self.statement()?);
            match self.peek()? {
                None => {}
                Some(token) if matches!(token.token_kind, TokenKind::Newline | TokenKind::Semi) => {
                    self.advance(token);
                }
                Some(token) => return Err(self.unexpected(token)),
            }
        }
    }

    fn skip_separators(&mut self) -> Result<(), Diagnostic> {
        while let Some(token) = self.peek()? {
            if !matches!(token.token_kind, TokenKind::Newline | TokenKind::Semi) {
                break;
            }
            self.advance(token);
        }
        Ok(())
    }

    fn statement(&mut self) -> Result<Statement, Diagnostic> {
        if let Some(name) = self.assignee()? {
            let value = self.expression()?;
            return Ok(Statement::Assign { name, value });
        }
        Ok(Statement::Expression(self.expression()?))
    }

    /// Consumes `name =` if present, returning the name.
    fn assignee(&mut self) -> Result<Option<String>, Diagnostic> {
        let before = self.token_stream;
        if let Some(token) = self.eat(TokenKind::Ident)? {
            let name = self.text(&token).to_owned();
            if self.eat(TokenKind::Eq)?.is_some() {
                return Ok(Some(name));
            }
        }
        self.token_stream = before;
        Ok(None)
    }

    fn expression(&mut self) -> Result<Expression, Diagnostic> {
        if let Some(not) = self.eat(TokenKind::Not)? {
            let start = self.token_stream.index() - not.len.get();
            self.descend(start)?;
            let operand = self.expression()?;
            self.depth -= 1;
            let range = start..operand.range.end;
            return Ok(Expression::new(
                ExpressionKind::Not(Box::new(operand)),
                range,
            ));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expression, Diagnostic> {
        let lhs = self.additive()?;
        match self.peek()? {
            Some(token) if token.token_kind.is_comparison() => {
                self.advance(token);
                let rhs = self.additive()?;
                let range = lhs.range.start..rhs.range.end;
                Ok(Expression::new(
                    ExpressionKind::Compare {
                        op: token.token_kind,
                        lhs: Box::new(lhs),
                        rhs: Box::new(rhs),
                    },
                    range,
                ))
            }
            _ => Ok(lhs),
        }
    }

    fn additive(&mut self) -> Result<Expression, Diagnostic> {
        let depth = self.depth;
        let mut lhs = self.unary()?;
        while let Some(token) = self.peek()? {
            if !matches!(token.token_kind, TokenKind::Plus | TokenKind::Minus) {
                break;
            }
            self.advance(token);
            // the tree grows to the left, one level per operator
            self.descend(lhs.range.start)?;
            let rhs = self.unary()?;
            let range = lhs.range.start..rhs.range.end;
            lhs = Expression::new(
                ExpressionKind::Binary {
                    op: token.token_kind,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                range,
            );
        }
        self.depth = depth;
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expression, Diagnostic> {
        if let Some(minus) = self.eat(TokenKind::Minus)? {
            let start = self.token_stream.index() - minus.len.get();
            self.descend(start)?;
            let operand = self.unary()?;
            self.depth -= 1;
            let range = start..operand.range.end;
            return Ok(Expression::new(
                ExpressionKind::Negate(Box::new(operand)),
                range,
            ));
        }
        self.call()
    }

    fn call(&mut self) -> Result<Expression, Diagnostic> {
        let depth = self.depth;
        let mut callee = self.primary()?;
        while self.eat(TokenKind::LParen)?.is_some() {
            self.descend(callee.range.start)?;
            self.nesting += 1;
            let (positional, keywords) = self.arguments()?;
            self.nesting -= 1;
            let end = self.token_stream.index();
            let range = callee.range.start..end;
            callee = Expression::new(
                ExpressionKind::Call {
                    callee: Box::new(callee),
                    positional,
                    keywords,
                },
                range,
            );
        }
        self.depth = depth;
        Ok(callee)
    }

    /// Parses the arguments of a call up to and including the closing parenthesis.
    #[allow(clippy::type_complexity)]
    fn arguments(
        &mut self,
    ) -> Result<(Vec<Expression>, Vec<(String, Expression)>), Diagnostic> {
        let mut positional = Vec::new();
        let mut keywords: Vec<(String, Expression)> = Vec::new();
        loop {
            if self.eat(TokenKind::RParen)?.is_some() {
                return Ok((positional, keywords));
            }

            let start = self.peek_index()?;
            if let Some(name) = self.assignee()? {
                if keywords.iter().any(|(existing, _)| *existing == name) {
                    let end = start + name.len();
                    return Err(Diagnostic::error(
                        ParseError::RepeatedKeyword(name),
                        start..end,
                    ));
                }
                keywords.push((name, self.expression()?));
            } else {
                let argument = self.expression()?;
                if !keywords.is_empty() {
                    return Err(Diagnostic::error(
                        ParseError::PositionalAfterKeyword,
                        argument.range,
                    ));
                }
                positional.push(argument);
            }

            if self.eat(TokenKind::Comma)?.is_none() {
                self.expect(TokenKind::RParen, "`,` or `)`")?;
                return Ok((positional, keywords));
            }
        }
    }

    fn primary(&mut self) -> Result<Expression, Diagnostic> {
        let Some(token) = self.peek()? else {
            return Err(Diagnostic::error(
                ParseError::UnexpectedEof,
                self.code.len(),
            ));
        };
        let start = self.peek_index()?;
        let range = start..start + token.len.get();
        let text = &self.code[range.clone()];

        let kind = match token.token_kind {
            TokenKind::None => ExpressionKind::None,
            TokenKind::True => ExpressionKind::Bool(true),
            TokenKind::False => ExpressionKind::Bool(false),
            TokenKind::Integer => ExpressionKind::Int(
                text.parse::<BigInt>()
                    .map_err(|_| Diagnostic::error(ParseError::Expected("integer"), range.clone()))?,
            ),
            TokenKind::String => ExpressionKind::String(unescape(text)),
            TokenKind::Ident => ExpressionKind::Name(text.to_owned()),
            TokenKind::LParen => {
                self.advance(token);
                self.descend(start)?;
                self.nesting += 1;
                let inner = self.expression()?;
                let close = self.expect(TokenKind::RParen, "`)`")?;
                self.nesting -= 1;
                self.depth -= 1;
                return Ok(Expression::new(inner.kind, start..close.end));
            }
            _ => return Err(self.unexpected(token)),
        };
        self.advance(token);
        Ok(Expression::new(kind, range))
    }

    /// Enters a subexpression starting at `start`, failing once [`MAX_DEPTH`] is exceeded.
    fn descend(&mut self, start: usize) -> Result<(), Diagnostic> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            let end = self.token_stream.index().max(start);
            return Err(Diagnostic::error(ParseError::TooDeep, start..end));
        }
        Ok(())
    }

    /// Returns the next significant token without consuming it.
    fn peek(&mut self) -> Result<Option<Token>, Diagnostic> {
        self.token_stream
            .skip_whitespace_tokens(self.code, self.nesting > 0);
        match self.token_stream.peek(self.code) {
            None => Ok(None),
            Some(Ok(token)) => Ok(Some(token)),
            Some(Err(error)) => Err(self.lex_error(error)),
        }
    }

    /// The byte offset of the next significant token.
    fn peek_index(&mut self) -> Result<usize, Diagnostic> {
        self.peek()?;
        Ok(self.token_stream.index())
    }

    fn advance(&mut self, token: Token) {
        self.token_stream.advance_token(token);
    }

    /// Consumes the next token if it is of the given kind.
    fn eat(&mut self, token_kind: TokenKind) -> Result<Option<Token>, Diagnostic> {
        match self.peek()? {
            Some(token) if token.token_kind == token_kind => {
                self.advance(token);
                Ok(Some(token))
            }
            _ => Ok(None),
        }
    }

    /// Consumes a token of the given kind, returning its range.
    fn expect(
        &mut self,
        token_kind: TokenKind,
        description: &'static str,
    ) -> Result<Range<usize>, Diagnostic> {
        let start = self.peek_index()?;
        match self.eat(token_kind)? {
            Some(token) => Ok(start..start + token.len.get()),
            None => Err(Diagnostic::error(ParseError::Expected(description), start)),
        }
    }

    fn text(&self, token: &Token) -> &'code str {
        let end = self.token_stream.index();
        &self.code[end - token.len.get()..end]
    }

    fn unexpected(&self, token: Token) -> Diagnostic {
        let start = self.token_stream.index();
        let range = start..start + token.len.get();
        if token.token_kind == TokenKind::Newline {
            Diagnostic::error(ParseError::UnexpectedEof, range)
        } else {
            Diagnostic::error(ParseError::UnexpectedToken(token.token_kind), range)
        }
    }

    fn lex_error(&self, error: LexError) -> Diagnostic {
        let start = self.token_stream.index();
        let range = match error {
            LexError::InvalidToken(char) => start..start + char.len_utf8(),
            LexError::UnterminatedString => start..self.code.len(),
        };
        Diagnostic::error(error, range)
    }
}
