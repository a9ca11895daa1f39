use std::num::NonZeroUsize;

use thiserror::Error;

#[derive(Clone, Copy, Debug, Default)]
pub struct TokenStream {
    index: usize,
}

#[derive(Clone, Copy, Debug)]
pub struct Token {
    pub token_kind: TokenKind,
    pub len: NonZeroUsize,
}

#[derive(Debug, Error)]
pub enum LexError {
    #[error("invalid token: {0}")]
    InvalidToken(char),
    #[error("unterminated string")]
    UnterminatedString,
}

impl TokenStream {
    /// Creates a new [`TokenStream`] positioned at the start of the code.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the byte offset where a [`TokenStream::peek()`] call would be processed.
    pub fn index(self) -> usize {
        self.index
    }

    /// Returns a slice to all remaining characters that still need to be processed.
    pub fn rest(self, code: &str) -> &str {
        &code[self.index..]
    }

    /// Returns if this [`TokenStream`] reached the end of the code.
    pub fn is_at_end_of_code(self, code: &str) -> bool {
        self.rest(code).is_empty()
    }

    /// Returns the next [`Token`] without advancing the stream.
    pub fn peek(self, code: &str) -> Option<Result<Token, LexError>> {
        let rest = self.rest(code);
        if rest.is_empty() {
            None
        } else if rest.starts_with(is_inline_whitespace) {
            Some(Ok(Token {
                token_kind: TokenKind::Whitespace,
                len: NonZeroUsize::new(
                    rest.find(|char| !is_inline_whitespace(char))
                        .unwrap_or(rest.len()),
                )
                .expect("token should not be empty"),
            }))
        } else if rest.starts_with('\n') {
            Some(Ok(Token {
                token_kind: TokenKind::Newline,
                len: new_non_zero_usize(1),
            }))
        } else if rest.starts_with('#') {
            Some(Ok(Token {
                token_kind: TokenKind::Comment,
                len: NonZeroUsize::new(find_line_break(rest)).expect("token should not be empty"),
            }))
        } else if rest.starts_with(is_digit) {
            let len = NonZeroUsize::new(rest.find(|char| !is_digit(char)).unwrap_or(rest.len()))
                .expect("token should not be empty");
            Some(Ok(Token {
                token_kind: TokenKind::Integer,
                len,
            }))
        } else if rest.starts_with(is_ident_start_char) {
            let len =
                NonZeroUsize::new(rest.find(|char| !is_ident_char(char)).unwrap_or(rest.len()))
                    .expect("token should not be empty");
            if let Some(keyword) = self.keyword_token(&rest[0..len.get()]) {
                Some(Ok(keyword))
            } else {
                Some(Ok(Token {
                    token_kind: TokenKind::Ident,
                    len,
                }))
            }
        } else if rest.starts_with(['"', '\'']) {
            Some(string_token(rest))
        } else if let Some(token) = self.punctuation_token(code) {
            Some(Ok(token))
        } else {
            Some(self.ascii_token(code))
        }
    }

    /// Skips over all consecutive whitespace and comment tokens, returning the number of skipped
    /// bytes.
    ///
    /// Newlines are only skipped if `skip_newlines` is set.
    pub fn skip_whitespace_tokens(&mut self, code: &str, skip_newlines: bool) -> usize {
        let before = self.index;
        while let Some(Ok(token)) = self.peek(code) {
            let skip = is_whitespace_token(token.token_kind)
                || (skip_newlines && token.token_kind == TokenKind::Newline);
            if !skip {
                break;
            }
            self.advance_token(token);
        }
        self.index - before
    }

    /// Advances over the given token, returning the number of advanced bytes.
    pub fn advance_token(&mut self, token: Token) -> NonZeroUsize {
        self.index += token.len.get();
        token.len
    }

    fn keyword_token(self, ident: &str) -> Option<Token> {
        macro_rules! tokens {
            ( $( $string:literal => $TK:ident, )* ) => {
                $( if ident == $string {
                    const LEN: NonZeroUsize = new_non_zero_usize($string.len());
                    Some(Token { token_kind: TokenKind::$TK, len: LEN })
                } else )+ {
                    None
                }
            };
        }

        tokens! {
            "False" => False,
            "None" => None,
            "True" => True,
            "not" => Not,
        }
    }

    fn punctuation_token(self, code: &str) -> Option<Token> {
        let current = self.rest(code);

        macro_rules! check_punctutation_tokens {
            ( $( $string:literal => $TK:ident, )* ) => {
                $( if current.starts_with($string) {
                    const LEN: NonZeroUsize = new_non_zero_usize($string.len());
                    Some(Token { token_kind: TokenKind::$TK, len: LEN })
                } else )+ {
                    None
                }
            };
        }

        check_punctutation_tokens! {
            "!=" => Ne,
            "<=" => Le,
            "==" => EqEq,
            ">=" => Ge,
        }
    }

    fn ascii_token(self, code: &str) -> Result<Token, LexError> {
        let char = self.rest(code).chars().next().expect("should not be empty");
        let token_kind = match char {
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semi,
            '=' => TokenKind::Eq,
            '<' => TokenKind::Lt,
            '>' => TokenKind::Gt,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            _ => return Err(LexError::InvalidToken(char)),
        };
        Ok(Token {
            token_kind,
            len: new_non_zero_usize(1),
        })
    }
}

/// Lexes a quoted string, including both quotes.
///
/// Escapes are only skipped over here; [`unescape`] resolves them.
fn string_token(rest: &str) -> Result<Token, LexError> {
    let mut chars = rest.char_indices();
    let (_, quote) = chars.next().expect("should not be empty");
    while let Some((index, char)) = chars.next() {
        match char {
            '\\' => {
                chars.next();
            }
            '\n' => break,
            _ if char == quote => {
                return Ok(Token {
                    token_kind: TokenKind::String,
                    len: NonZeroUsize::new(index + char.len_utf8())
                        .expect("token should not be empty"),
                });
            }
            _ => {}
        }
    }
    Err(LexError::UnterminatedString)
}

/// Resolves the escapes of a string token, stripping the surrounding quotes.
pub fn unescape(token: &str) -> String {
    let inner = &token[1..token.len() - 1];
    let mut result = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(char) = chars.next() {
        if char != '\\' {
            result.push(char);
            continue;
        }
        match chars.next() {
            Some('n') => result.push('\n'),
            Some('t') => result.push('\t'),
            Some(escaped @ ('\\' | '"' | '\'')) => result.push(escaped),
            // unknown escapes are kept verbatim
            Some(other) => {
                result.push('\\');
                result.push(other);
            }
            None => result.push('\\'),
        }
    }
    result
}

fn is_inline_whitespace(char: char) -> bool {
    matches!(char, ' ' | '\t' | '\r')
}

fn is_digit(char: char) -> bool {
    char.is_ascii_digit()
}

fn is_ident_start_char(char: char) -> bool {
    char.is_ascii_alphabetic() || char == '_'
}

fn is_ident_char(char: char) -> bool {
    char.is_ascii_alphanumeric() || char == '_'
}

fn find_line_break(current: &str) -> usize {
    current.find('\n').unwrap_or(current.len())
}

fn is_whitespace_token(token_kind: TokenKind) -> bool {
    matches!(token_kind, TokenKind::Whitespace | TokenKind::Comment)
}

const fn new_non_zero_usize(value: usize) -> NonZeroUsize {
    if let Some(value) = NonZeroUsize::new(value) {
        value
    } else {
        panic!("value should be non-zero")
    }
}

macro_rules! tokens {
    ( $( $Variant:ident = $name:literal, )* ) => {
        #[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
        pub enum TokenKind {
            $( $Variant, )*
        }

        impl TokenKind {
            pub fn name(self) -> &'static str {
                match self {
                    $( Self::$Variant => $name, )*
                }
            }
        }
    };
}

tokens! {
    Whitespace = "whitespace",
    Newline = "newline",
    Comment = "comment",

    Ident = "identifier",
    Integer = "integer",
    String = "string",

    False = "`False`",
    None = "`None`",
    True = "`True`",
    Not = "`not`",

    LParen = "`(`",
    RParen = "`)`",
    Comma = "`,`",
    Semi = "`;`",
    Eq = "`=`",
    EqEq = "`==`",
    Ne = "`!=`",
    Le = "`<=`",
    Lt = "`<`",
    Ge = "`>=`",
    Gt = "`>`",
    Plus = "`+`",
    Minus = "`-`",
}

impl TokenKind {
    /// Whether this token is one of the six comparison operators.
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::EqEq | Self::Ne | Self::Le | Self::Lt | Self::Ge | Self::Gt
        )
    }

    /// The operator as it is written in code, without the surrounding backticks.
    pub fn symbol(self) -> &'static str {
        let name = self.name();
        name.strip_prefix('`')
            .and_then(|name| name.strip_suffix('`'))
            .unwrap_or(name)
    }
}
