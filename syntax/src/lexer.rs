/// Streaming lexer for the scripting language.
///
/// The [`Lexer`] consumes bytes from any [`std::io::Read`] source (a file,
/// `stdin`, or an in-memory buffer) and implements [`Iterator`] over
/// [`Token`]s, tracking byte offset, line and column for each one.
///
/// Lexical errors never stop the stream: an unknown character or an
/// unterminated string becomes a [`TokenKind::Error`] token and lexing
/// resumes right after it. The stream always ends with exactly one
/// [`TokenKind::Eof`].
///
/// | Syntax      | Kind          | Notes                        |
/// |-------------|---------------|------------------------------|
/// | `// …`      | Line comment  | Runs to end of line          |
/// | `/* … */`   | Block comment | **Nestable** (`/* /* */ */`) |
/// | `"…"`       | String        | May span lines, no escapes   |
/// | `12`, `1.5` | Number        | Always a double              |
use std::io::Read;

use crate::span::{Pos, Span};
use crate::token::{Token, TokenKind};

// ═══════════════════════════════════════════════════════════════════
// Read buffer
// ═══════════════════════════════════════════════════════════════════

/// Enough look-ahead for two-character operators, comment openers and
/// the digit after a decimal point.
const LOOKAHEAD: usize = 4;

struct ReadBuf<R: Read> {
    reader: R,
    buf: [u8; LOOKAHEAD],
    /// How many valid bytes are in `buf` starting from index 0.
    filled: usize,
    reader_eof: bool,
    offset: usize,
    line: usize,
    column: usize,
}

impl<R: Read> ReadBuf<R> {
    fn new(reader: R) -> Self {
        let mut rb = Self {
            reader,
            buf: [0u8; LOOKAHEAD],
            filled: 0,
            reader_eof: false,
            offset: 0,
            line: 1,
            column: 1,
        };
        rb.fill();
        rb
    }

    fn fill(&mut self) {
        while !self.reader_eof && self.filled < LOOKAHEAD {
            let mut one = [0u8; 1];
            match self.reader.read(&mut one) {
                Ok(0) => self.reader_eof = true,
                Ok(_) => {
                    self.buf[self.filled] = one[0];
                    self.filled += 1;
                }
                Err(err) if err.kind() == std::io::ErrorKind::Interrupted => {}
                Err(err) => {
                    log::warn!("lexer input failed, treating as end: {err}");
                    self.reader_eof = true;
                }
            }
        }
    }

    fn pos(&self) -> Pos {
        Pos::new(self.offset, self.line, self.column)
    }

    fn peek_ahead(&self, n: usize) -> Option<u8> {
        (n < self.filled).then(|| self.buf[n])
    }

    fn advance(&mut self) -> Option<u8> {
        if self.filled == 0 {
            return None;
        }
        let b = self.buf[0];
        self.buf.copy_within(1..self.filled, 0);
        self.filled -= 1;
        self.fill();

        self.offset += 1;
        if b == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(b)
    }
}

// ═══════════════════════════════════════════════════════════════════
// Lexer
// ═══════════════════════════════════════════════════════════════════

/// A streaming lexer.
///
/// ```rust
/// use syntax::{Lexer, TokenKind};
///
/// let kinds: Vec<TokenKind> =
///     Lexer::from_str("var a = 1;").map(|t| t.kind).collect();
/// assert_eq!(kinds.len(), 6);
/// ```
pub struct Lexer<R: Read> {
    rb: ReadBuf<R>,
    emitted_eof: bool,
}

impl<R: Read> Lexer<R> {
    /// Create a new lexer over the given readable stream.
    pub fn new(reader: R) -> Self {
        Self {
            rb: ReadBuf::new(reader),
            emitted_eof: false,
        }
    }
}

impl<'a> Lexer<&'a [u8]> {
    pub fn from_str(source: &'a str) -> Self {
        Self::new(source.as_bytes())
    }
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

impl<R: Read> Lexer<R> {
    fn pos(&self) -> Pos {
        self.rb.pos()
    }

    fn peek(&self) -> Option<u8> {
        self.rb.peek_ahead(0)
    }

    fn peek_ahead(&self, n: usize) -> Option<u8> {
        self.rb.peek_ahead(n)
    }

    fn advance(&mut self) -> Option<u8> {
        self.rb.advance()
    }

    fn skip_whitespace(&mut self) {
        while let Some(b' ' | b'\t' | b'\n' | b'\r') = self.peek() {
            self.advance();
        }
    }

    /// Consume `len` bytes of an already-recognised fixed token.
    fn fixed(&mut self, start: Pos, len: usize, kind: TokenKind) -> Token {
        let mut raw = Vec::with_capacity(len);
        for _ in 0..len {
            if let Some(b) = self.advance() {
                raw.push(b);
            }
        }
        Token::new(
            kind,
            Span::new(start, self.pos()),
            String::from_utf8_lossy(&raw),
        )
    }

    /// One- or two-byte operator: `two` if the next byte is `=`.
    fn with_equal(
        &mut self,
        start: Pos,
        one: TokenKind,
        two: TokenKind,
    ) -> Token {
        if self.peek_ahead(1) == Some(b'=') {
            self.fixed(start, 2, two)
        } else {
            self.fixed(start, 1, one)
        }
    }

    // ───────────────────────────────────────────────────────────
    //  Comments
    // ───────────────────────────────────────────────────────────

    fn lex_line_comment(&mut self) -> Token {
        let start = self.pos();
        self.advance();
        self.advance();
        let mut text = Vec::new();
        while let Some(b) = self.peek() {
            if b == b'\n' {
                break;
            }
            text.push(b);
            self.advance();
        }
        let text = String::from_utf8_lossy(&text).into_owned();
        let raw = format!("//{text}");
        Token::new(
            TokenKind::LineComment(text),
            Span::new(start, self.pos()),
            raw,
        )
    }

    fn lex_block_comment(&mut self) -> Token {
        let start = self.pos();
        self.advance();
        self.advance();
        let mut text = Vec::new();
        let mut depth: usize = 1;

        loop {
            match self.peek() {
                None => {
                    let raw = format!("/*{}", String::from_utf8_lossy(&text));
                    return Token::new(
                        TokenKind::Error("unterminated block comment".into()),
                        Span::new(start, self.pos()),
                        raw,
                    );
                }
                Some(b'/') if self.peek_ahead(1) == Some(b'*') => {
                    depth += 1;
                    text.extend_from_slice(b"/*");
                    self.advance();
                    self.advance();
                }
                Some(b'*') if self.peek_ahead(1) == Some(b'/') => {
                    depth -= 1;
                    self.advance();
                    self.advance();
                    if depth == 0 {
                        break;
                    }
                    text.extend_from_slice(b"*/");
                }
                Some(b) => {
                    text.push(b);
                    self.advance();
                }
            }
        }
        let text = String::from_utf8_lossy(&text).into_owned();
        let raw = format!("/*{text}*/");
        Token::new(
            TokenKind::BlockComment(text),
            Span::new(start, self.pos()),
            raw,
        )
    }

    // ───────────────────────────────────────────────────────────
    //  Literals and identifiers
    // ───────────────────────────────────────────────────────────

    fn lex_string(&mut self) -> Token {
        let start = self.pos();
        self.advance();
        let mut value = Vec::new();
        loop {
            match self.advance() {
                Some(b'"') => break,
                Some(b) => value.push(b),
                None => {
                    let raw = format!("\"{}", String::from_utf8_lossy(&value));
                    return Token::new(
                        TokenKind::Error("unterminated string".into()),
                        Span::new(start, self.pos()),
                        raw,
                    );
                }
            }
        }
        let value = String::from_utf8_lossy(&value).into_owned();
        let raw = format!("\"{value}\"");
        Token::new(TokenKind::String(value), Span::new(start, self.pos()), raw)
    }

    fn lex_number(&mut self) -> Token {
        let start = self.pos();
        let mut raw = String::new();
        while let Some(b @ b'0'..=b'9') = self.peek() {
            raw.push(b as char);
            self.advance();
        }
        let fraction_follows =
            matches!(self.peek_ahead(1), Some(d) if d.is_ascii_digit());
        if self.peek() == Some(b'.') && fraction_follows {
            raw.push('.');
            self.advance();
            while let Some(b @ b'0'..=b'9') = self.peek() {
                raw.push(b as char);
                self.advance();
            }
        }
        let span = Span::new(start, self.pos());
        match raw.parse::<f64>() {
            Ok(value) => Token::new(TokenKind::Number(value), span, raw),
            Err(err) => Token::new(
                TokenKind::Error(format!("invalid number: {err}")),
                span,
                raw,
            ),
        }
    }

    fn lex_identifier(&mut self) -> Token {
        let start = self.pos();
        let mut raw = String::new();
        while let Some(b) = self.peek() {
            if !is_ident_continue(b) {
                break;
            }
            raw.push(b as char);
            self.advance();
        }
        let kind = TokenKind::keyword(&raw)
            .unwrap_or_else(|| TokenKind::Identifier(raw.clone()));
        Token::new(kind, Span::new(start, self.pos()), raw)
    }

    fn lex_unknown(&mut self) -> Token {
        let start = self.pos();
        let mut raw = Vec::new();
        if let Some(b) = self.advance() {
            raw.push(b);
        }
        // Swallow UTF-8 continuation bytes so one character yields one error.
        while let Some(b) = self.peek() {
            if b & 0xC0 != 0x80 {
                break;
            }
            raw.push(b);
            self.advance();
        }
        let raw = String::from_utf8_lossy(&raw).into_owned();
        Token::new(
            TokenKind::Error(format!("unexpected character: {raw:?}")),
            Span::new(start, self.pos()),
            raw,
        )
    }

    // ───────────────────────────────────────────────────────────
    //  Main dispatch
    // ───────────────────────────────────────────────────────────

    /// Produce the next token from the stream.
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        let start = self.pos();
        let Some(b) = self.peek() else {
            self.emitted_eof = true;
            return Token::new(TokenKind::Eof, Span::point(start), "");
        };

        match b {
            b'/' if self.peek_ahead(1) == Some(b'/') => self.lex_line_comment(),
            b'/' if self.peek_ahead(1) == Some(b'*') => {
                self.lex_block_comment()
            }
            b'(' => self.fixed(start, 1, TokenKind::LParen),
            b')' => self.fixed(start, 1, TokenKind::RParen),
            b'{' => self.fixed(start, 1, TokenKind::LBrace),
            b'}' => self.fixed(start, 1, TokenKind::RBrace),
            b',' => self.fixed(start, 1, TokenKind::Comma),
            b'.' => self.fixed(start, 1, TokenKind::Dot),
            b'-' => self.fixed(start, 1, TokenKind::Minus),
            b'+' => self.fixed(start, 1, TokenKind::Plus),
            b';' => self.fixed(start, 1, TokenKind::Semicolon),
            b'/' => self.fixed(start, 1, TokenKind::Slash),
            b'*' => self.fixed(start, 1, TokenKind::Star),
            b'!' => self.with_equal(start, TokenKind::Bang, TokenKind::BangEqual),
            b'=' => {
                self.with_equal(start, TokenKind::Equal, TokenKind::EqualEqual)
            }
            b'>' => self.with_equal(
                start,
                TokenKind::Greater,
                TokenKind::GreaterEqual,
            ),
            b'<' => {
                self.with_equal(start, TokenKind::Less, TokenKind::LessEqual)
            }
            b'"' => self.lex_string(),
            b'0'..=b'9' => self.lex_number(),
            _ if is_ident_start(b) => self.lex_identifier(),
            _ => self.lex_unknown(),
        }
    }
}

impl<R: Read> Iterator for Lexer<R> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.emitted_eof {
            return None;
        }
        let tok = self.next_token();
        if tok.is_eof() {
            self.emitted_eof = true;
        }
        Some(tok)
    }
}

// ═══════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════
