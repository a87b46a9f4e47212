use crate::span::Span;
use crate::token::Token;

/// Which rule a program broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolveErrorKind {
    /// A variable read inside its own initializer.
    SelfReference,
    /// The same name and declaration kind twice in one scope.
    DuplicateDeclaration,
    /// A name bound in no enclosing scope.
    Unresolved,
    /// `this`, `super`, `return`, `break` or `continue` where it isn't
    /// allowed, or a value returned from an initializer.
    Context,
    /// A class that names itself as its superclass.
    Inheritance,
}

/// Coarse grouping of [`ResolveErrorKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Scope,
    Context,
    Inheritance,
}

impl ResolveErrorKind {
    pub fn category(self) -> ErrorCategory {
        match self {
            Self::SelfReference | Self::DuplicateDeclaration | Self::Unresolved => {
                ErrorCategory::Scope
            }
            Self::Context => ErrorCategory::Context,
            Self::Inheritance => ErrorCategory::Inheritance,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolveError {
    pub kind: ResolveErrorKind,
    pub message: String,
    pub span: Span,
    /// Display text of the offending token.
    pub lexeme: String,
}

impl ResolveError {
    pub fn new(kind: ResolveErrorKind, token: &Token, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            span: token.span,
            lexeme: token.lexeme.clone(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        self.kind.category()
    }
}

impl std::fmt::Display for ResolveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at {}", self.message, self.span)
    }
}

impl std::error::Error for ResolveError {}
