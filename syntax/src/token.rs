/// Token types produced by the lexer.
use crate::span::Span;

/// The kind of a lexical token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `,`
    Comma,
    /// `.`
    Dot,
    /// `-`
    Minus,
    /// `+`
    Plus,
    /// `;`
    Semicolon,
    /// `/`
    Slash,
    /// `*`
    Star,

    /// `!`
    Bang,
    /// `!=`
    BangEqual,
    /// `=`
    Equal,
    /// `==`
    EqualEqual,
    /// `>`
    Greater,
    /// `>=`
    GreaterEqual,
    /// `<`
    Less,
    /// `<=`
    LessEqual,

    /// An identifier, e.g. `counter`, `Point`, `_tmp`.
    Identifier(std::string::String),
    /// String literal (contents without surrounding quotes).
    String(std::string::String),
    /// Number literal. All numbers are doubles.
    Number(f64),

    And,
    Break,
    Class,
    Continue,
    Else,
    False,
    For,
    Fun,
    If,
    Nil,
    Or,
    Print,
    Return,
    Super,
    This,
    True,
    Var,
    While,

    /// A line comment: `// ...` (text does NOT include the leading `//`).
    LineComment(std::string::String),
    /// A block comment: `/* ... */`. Block comments may nest.
    BlockComment(std::string::String),

    /// End of input.
    Eof,
    /// An unrecognized character or malformed token.
    Error(std::string::String),
}

impl TokenKind {
    /// Reserved word for `ident`, if it is one.
    pub fn keyword(ident: &str) -> Option<TokenKind> {
        let kind = match ident {
            "and" => Self::And,
            "break" => Self::Break,
            "class" => Self::Class,
            "continue" => Self::Continue,
            "else" => Self::Else,
            "false" => Self::False,
            "for" => Self::For,
            "fun" => Self::Fun,
            "if" => Self::If,
            "nil" => Self::Nil,
            "or" => Self::Or,
            "print" => Self::Print,
            "return" => Self::Return,
            "super" => Self::Super,
            "this" => Self::This,
            "true" => Self::True,
            "var" => Self::Var,
            "while" => Self::While,
            _ => return None,
        };
        Some(kind)
    }

    /// Human-readable name for error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::LParen => "`(`",
            Self::RParen => "`)`",
            Self::LBrace => "`{`",
            Self::RBrace => "`}`",
            Self::Comma => "`,`",
            Self::Dot => "`.`",
            Self::Minus => "`-`",
            Self::Plus => "`+`",
            Self::Semicolon => "`;`",
            Self::Slash => "`/`",
            Self::Star => "`*`",
            Self::Bang => "`!`",
            Self::BangEqual => "`!=`",
            Self::Equal => "`=`",
            Self::EqualEqual => "`==`",
            Self::Greater => "`>`",
            Self::GreaterEqual => "`>=`",
            Self::Less => "`<`",
            Self::LessEqual => "`<=`",
            Self::Identifier(_) => "identifier",
            Self::String(_) => "string",
            Self::Number(_) => "number",
            Self::And => "`and`",
            Self::Break => "`break`",
            Self::Class => "`class`",
            Self::Continue => "`continue`",
            Self::Else => "`else`",
            Self::False => "`false`",
            Self::For => "`for`",
            Self::Fun => "`fun`",
            Self::If => "`if`",
            Self::Nil => "`nil`",
            Self::Or => "`or`",
            Self::Print => "`print`",
            Self::Return => "`return`",
            Self::Super => "`super`",
            Self::This => "`this`",
            Self::True => "`true`",
            Self::Var => "`var`",
            Self::While => "`while`",
            Self::LineComment(_) => "line comment",
            Self::BlockComment(_) => "block comment",
            Self::Eof => "end of input",
            Self::Error(_) => "error",
        }
    }

    /// Returns `true` if this token is any kind of comment.
    pub fn is_comment(&self) -> bool {
        matches!(self, Self::LineComment(_) | Self::BlockComment(_))
    }
}

/// A token with its source span.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    /// The original source text of this token.
    pub lexeme: std::string::String,
}

impl Token {
    pub fn new(
        kind: TokenKind,
        span: Span,
        lexeme: impl Into<std::string::String>,
    ) -> Self {
        Self {
            kind,
            span,
            lexeme: lexeme.into(),
        }
    }

    pub fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }

    pub fn is_comment(&self) -> bool {
        self.kind.is_comment()
    }
}
