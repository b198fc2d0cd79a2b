/// #Notes
/// `+` and `-` could be operators or the starts of numbers (`-.1`). This lexer
///  does not attempt to distinguish: they always become Plus and Minus tokens.
///  The parser should use its increased context to disambiguate these usages.
///
/// A dotted name like `u.createdAt` is lexed as a single Path token rather
///  than Identifier, Dot, Identifier. Function extensions match on Identifier
///  positionally, so a path showing up where a keyword was expected is
///  reported as a mismatch instead of being half-consumed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, strum_macros::Display)]
pub enum TokenType {
    #[strum(serialize = "'('")]
    ParenLeft,
    #[strum(serialize = "')'")]
    ParenRight,
    #[strum(serialize = "','")]
    Comma,
    #[strum(serialize = "'+'")]
    Plus,
    #[strum(serialize = "'-'")]
    Minus,
    #[strum(serialize = "'*'")]
    Asterisk,
    #[strum(serialize = "'/'")]
    ForwardSlash,
    #[strum(serialize = "integer")]
    Integer,
    #[strum(serialize = "float")]
    Float,
    #[strum(serialize = "string")]
    String,
    #[strum(serialize = "identifier")]
    Identifier,
    #[strum(serialize = "path expression")]
    Path,
    #[strum(serialize = "input parameter")]
    InputParameter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub ty: TokenType,

    // Byte indexes into the source
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("Unterminated string literal starting at {0}")]
    UnterminatedStringLiteral(usize),
    #[error("Unexpected character at {0}")]
    UnexpectedCharacter(usize),
}

#[inline]
fn is_ident_start(b: u8) -> bool {
    matches!(b, b'a'..=b'z' | b'A'..=b'Z' | b'_')
}

#[inline]
fn is_ident_continuation(b: u8) -> bool {
    matches!(b, b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_')
}

/// This type simply holds a reference to the source and an index, so it's
///  cheap to copy, making lookahead operations in the parser very easy.
#[derive(Clone)]
pub struct Lexer<'input> {
    source: &'input str,
    current: usize,
}

impl<'input> Lexer<'input> {
    pub fn new(source: &'input str) -> Self {
        Self { source, current: 0 }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.current >= self.source.len()
    }

    /// Byte offset of the next unconsumed byte.
    #[inline]
    pub fn position(&self) -> usize {
        self.current
    }

    #[inline]
    pub fn peek(&self) -> Option<u8> {
        self.source.as_bytes().get(self.current).copied()
    }

    #[inline]
    pub fn peek_at(&self, at: usize) -> Option<u8> {
        self.source.as_bytes().get(self.current + at).copied()
    }

    /// If current starts with [prefix], consume it and return true.
    pub fn consume1(&mut self, prefix: u8) -> bool {
        if let Some(c) = self.peek()
            && c == prefix
        {
            self.current += 1;
            true
        } else {
            false
        }
    }

    #[inline]
    fn consume_while(&mut self, predicate: impl Fn(u8) -> bool) {
        while let Some(c) = self.peek()
            && predicate(c)
        {
            self.current += 1;
        }
    }

    #[inline]
    fn consume_whitespace(&mut self) {
        self.consume_while(|b| matches!(b, b' ' | b'\t' | b'\r' | b'\n'));
    }

    /// Consumes the fractional part of a number if present. Returns true if a
    ///  dot was consumed.
    fn consume_fraction(&mut self) -> bool {
        if self.peek() == Some(b'.') && self.peek_at(1).is_some_and(|b| b.is_ascii_digit()) {
            self.current += 1;
            self.consume_while(|b| b.is_ascii_digit());
            true
        } else {
            false
        }
    }

    /// Returns the slice of the source that this token was lexed from.
    #[inline]
    pub fn source_of(&self, token: &Token) -> &'input str {
        &self.source[token.start..token.end]
    }

    /// Like [source_of] but omits the opening and closing quotes of string
    ///  literal tokens. Doubled quotes inside the literal are left as written.
    #[inline]
    pub fn contents(&self, token: &Token) -> &'input str {
        let s = self.source_of(token);
        match token.ty {
            TokenType::String => &s[1..s.len() - 1],
            _ => s,
        }
    }

    /// Returns the next token without advancing.
    pub fn peek_token(&self) -> Result<Option<Token>, Error> {
        self.clone().next_token()
    }

    /// Returns the token after the next one without advancing.
    pub fn peek_second_token(&self) -> Result<Option<Token>, Error> {
        let mut lookahead = self.clone();
        if lookahead.next_token()?.is_none() {
            return Ok(None);
        }
        lookahead.next_token()
    }

    pub fn next_token(&mut self) -> Result<Option<Token>, Error> {
        self.consume_whitespace();

        let Some(first) = self.peek() else {
            return Ok(None);
        };
        let start = self.current;
        self.current += 1;

        // Convenience macro for returning a token from `start` to `self.current`
        macro_rules! tok {
            ($name:ident) => {{
                Token {
                    ty: TokenType::$name,
                    start,
                    end: self.current,
                }
            }};
        }

        Ok(Some(match first {
            b'(' => tok!(ParenLeft),
            b')' => tok!(ParenRight),
            b',' => tok!(Comma),
            b'+' => tok!(Plus),
            b'-' => tok!(Minus),
            b'*' => tok!(Asterisk),
            b'/' => tok!(ForwardSlash),

            // Single-quoted strings, '' is an escaped quote
            b'\'' => loop {
                self.consume_while(|b| b != b'\'');
                if self.is_empty() {
                    return Err(Error::UnterminatedStringLiteral(start));
                }
                // consume closing quote
                self.current += 1;
                if !self.consume1(b'\'') {
                    break tok!(String);
                }
            },

            b if is_ident_start(b) => {
                self.consume_while(is_ident_continuation);
                let mut ty = TokenType::Identifier;
                while self.peek() == Some(b'.') && self.peek_at(1).is_some_and(is_ident_start) {
                    self.current += 1;
                    self.consume_while(is_ident_continuation);
                    ty = TokenType::Path;
                }
                Token {
                    ty,
                    start,
                    end: self.current,
                }
            }

            b'0'..=b'9' => {
                self.consume_while(|b| b.is_ascii_digit());
                if self.consume_fraction() {
                    tok!(Float)
                } else {
                    tok!(Integer)
                }
            }

            // A leading dot is only valid as the start of a float
            b'.' if self.peek().is_some_and(|b| b.is_ascii_digit()) => {
                self.consume_while(|b| b.is_ascii_digit());
                tok!(Float)
            }

            // Named parameter
            b':' if self.peek().is_some_and(is_ident_start) => {
                self.consume_while(is_ident_continuation);
                tok!(InputParameter)
            }

            // Positional parameter
            b'?' if self.peek().is_some_and(|b| b.is_ascii_digit()) => {
                self.consume_while(|b| b.is_ascii_digit());
                tok!(InputParameter)
            }

            _ => return Err(Error::UnexpectedCharacter(start)),
        }))
    }
}
